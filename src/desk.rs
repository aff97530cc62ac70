use crate::avatars;
use crate::board;
use crate::db::Database;
use crate::errors::{DeskError, DeskResult};
use crate::forecast;
use crate::models::{
    ColumnStats, Deal, DeskEvent, DragEvent, ListDealsFilters, NewDealPayload, OwnerProfile,
    PipelineSettings, ProductProfile, Stage, UpdateDealPayload,
};
use crate::parser::parse_quick_add;
use crate::store::DealStore;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Central pipeline engine: owns the in-memory deal list (the board's local
/// state), the active pipeline settings, and the change feed. All mutations
/// flow through here; persistence goes through the `DealStore` seam.
pub struct DeskCore {
    store: Arc<dyn DealStore>,
    deals: RwLock<Vec<Deal>>,
    settings: RwLock<PipelineSettings>,
    events: broadcast::Sender<DeskEvent>,
}

impl DeskCore {
    pub fn new(store: Arc<dyn DealStore>) -> DeskResult<Self> {
        let settings = store.load_settings()?;
        let deals = store.list(&ListDealsFilters::default())?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            store,
            deals: RwLock::new(deals),
            settings: RwLock::new(settings),
            events,
        })
    }

    /// Opens (or creates) the SQLite-backed desk at `path`.
    pub fn open(path: &Path) -> DeskResult<Self> {
        let db = Database::new(path)?;
        Self::new(Arc::new(db))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeskEvent> {
        self.events.subscribe()
    }

    pub async fn list_deals(&self) -> Vec<Deal> {
        self.deals.read().await.clone()
    }

    pub async fn deals_for_stage(&self, stage: Stage) -> Vec<Deal> {
        board::column_deals(&self.deals.read().await, stage)
    }

    /// Full refetch from the store. Last completed refresh wins; there is no
    /// sequencing against in-flight local mutations.
    pub async fn refresh(&self) -> DeskResult<()> {
        let fresh = self.store.list(&ListDealsFilters::default())?;
        *self.deals.write().await = fresh;
        Ok(())
    }

    pub async fn add_deal(&self, payload: NewDealPayload) -> DeskResult<Deal> {
        let settings = self.settings.read().await.clone();
        validate_company(&payload.company)?;
        validate_owner(&settings, &payload.owner)?;
        validate_product(&settings, &payload.product)?;

        let now = Utc::now();
        let deal = Deal {
            id: Uuid::new_v4().to_string(),
            company: payload.company.trim().to_string(),
            amount: payload.amount,
            raas: payload.raas,
            owner: payload.owner,
            product: payload.product,
            stage: payload.stage.unwrap_or(Stage::Demoed),
            demo_date: payload.demo_date.or(Some(now)),
            summary: payload.summary,
            updated_at: now,
        };

        self.store.insert(&deal)?;

        let mut deals = self.deals.write().await;
        deals.insert(0, deal.clone());
        drop(deals);

        let _ = self.events.send(DeskEvent::DealsChanged);
        tracing::info!(deal_id = %deal.id, company = %deal.company, "deal added");
        Ok(deal)
    }

    /// Free-text entry: `"Acme Corp $50000 Hasan Kayako"`. Missing owner,
    /// product, or amount blocks the submission; nothing is saved partially.
    pub async fn quick_add(&self, input: &str) -> DeskResult<Deal> {
        let settings = self.settings.read().await.clone();
        let parsed = parse_quick_add(input, &settings);

        let owner = parsed
            .owner
            .ok_or_else(|| DeskError::Validation("Quick add needs a sales rep name".to_string()))?;
        let product = parsed
            .product
            .ok_or_else(|| DeskError::Validation("Quick add needs a product name".to_string()))?;
        let amount = parsed
            .amount
            .ok_or_else(|| DeskError::Validation("Quick add needs a dollar amount".to_string()))?;

        self.add_deal(NewDealPayload {
            company: parsed.company,
            amount,
            raas: 0.0,
            owner,
            product,
            stage: None,
            demo_date: None,
            summary: None,
        })
        .await
    }

    pub async fn update_deal(&self, payload: UpdateDealPayload) -> DeskResult<Deal> {
        let settings = self.settings.read().await.clone();
        if let Some(owner) = &payload.owner {
            validate_owner(&settings, owner)?;
        }
        if let Some(product) = &payload.product {
            validate_product(&settings, product)?;
        }

        let mut deals = self.deals.write().await;
        let current = deals
            .iter()
            .find(|deal| deal.id == payload.id)
            .cloned()
            .ok_or_else(|| DeskError::NotFound(format!("No deal with id {}", payload.id)))?;

        let mut updated = current;
        if let Some(company) = payload.company {
            validate_company(&company)?;
            updated.company = company.trim().to_string();
        }
        if let Some(amount) = payload.amount {
            updated.amount = amount;
        }
        if let Some(raas) = payload.raas {
            updated.raas = raas;
        }
        if let Some(owner) = payload.owner {
            updated.owner = owner;
        }
        if let Some(product) = payload.product {
            updated.product = product;
        }
        if let Some(stage) = payload.stage {
            updated.stage = stage;
        }
        if payload.demo_date.is_some() {
            updated.demo_date = payload.demo_date;
        }
        if payload.summary.is_some() {
            updated.summary = payload.summary;
        }
        updated.updated_at = Utc::now();

        self.store.update(&updated)?;
        if let Some(slot) = deals.iter_mut().find(|deal| deal.id == updated.id) {
            *slot = updated.clone();
        }
        drop(deals);

        let _ = self.events.send(DeskEvent::DealsChanged);
        Ok(updated)
    }

    pub async fn delete_deal(&self, deal_id: &str) -> DeskResult<bool> {
        let removed = self.store.delete(deal_id)?;
        if removed {
            let mut deals = self.deals.write().await;
            deals.retain(|deal| deal.id != deal_id);
            drop(deals);
            let _ = self.events.send(DeskEvent::DealsChanged);
        }
        Ok(removed)
    }

    /// Stage-transition handler for a completed drag. Applies the move to the
    /// local list first (optimistic, zero-latency for the board), then
    /// persists; a store failure restores the pre-drag snapshot exactly.
    pub async fn move_deal(&self, event: DragEvent) -> DeskResult<Option<Deal>> {
        let mut deals = self.deals.write().await;

        let Some(updated) = board::resolve_drag(&deals, &event, Utc::now()) else {
            let real_move = event
                .destination
                .map(|destination| destination != event.source)
                .unwrap_or(false);
            if real_move && !deals.iter().any(|deal| deal.id == event.deal_id) {
                tracing::warn!(deal_id = %event.deal_id, "drag references a deal not in the local list");
            }
            return Ok(None);
        };

        let snapshot = deals.clone();
        if let Some(slot) = deals.iter_mut().find(|deal| deal.id == updated.id) {
            *slot = updated.clone();
        }

        if let Err(error) = self.store.update(&updated) {
            *deals = snapshot;
            tracing::error!(
                deal_id = %updated.id,
                destination = %updated.stage.as_str(),
                error = %error,
                "failed to persist stage move, rolled back local state"
            );
            return Err(error);
        }
        drop(deals);

        let _ = self.events.send(DeskEvent::DealsChanged);
        Ok(Some(updated))
    }

    pub async fn stage_stats(&self, stage: Stage) -> ColumnStats {
        let deals = self.deals.read().await;
        let settings = self.settings.read().await;
        forecast::column_stats(&deals, stage, &settings)
    }

    pub async fn all_stage_stats(&self) -> Vec<(Stage, ColumnStats)> {
        let deals = self.deals.read().await;
        let settings = self.settings.read().await;
        Stage::ALL
            .iter()
            .map(|&stage| (stage, forecast::column_stats(&deals, stage, &settings)))
            .collect()
    }

    pub async fn owner_profiles(&self) -> Vec<OwnerProfile> {
        let deals = self.deals.read().await;
        let settings = self.settings.read().await;
        settings
            .owners
            .iter()
            .map(|owner| OwnerProfile {
                name: owner.clone(),
                image_url: avatars::owner_image_url(&settings.asset_base_url, owner),
                stats: forecast::owner_rollup(&deals, owner),
                deals: deals.iter().filter(|deal| &deal.owner == owner).cloned().collect(),
            })
            .collect()
    }

    pub async fn product_profiles(&self) -> Vec<ProductProfile> {
        let deals = self.deals.read().await;
        let settings = self.settings.read().await;
        settings
            .products
            .iter()
            .map(|product| ProductProfile {
                name: product.clone(),
                image_url: avatars::product_image_url(&settings.asset_base_url, product),
                stats: forecast::product_rollup(&deals, product),
                deals: deals.iter().filter(|deal| &deal.product == product).cloned().collect(),
            })
            .collect()
    }

    pub async fn settings(&self) -> PipelineSettings {
        self.settings.read().await.clone()
    }

    pub async fn update_settings(&self, settings: PipelineSettings) -> DeskResult<()> {
        if settings.owners.is_empty() {
            return Err(DeskError::Validation("Owner roster cannot be empty".to_string()));
        }
        if settings.products.is_empty() {
            return Err(DeskError::Validation("Product catalog cannot be empty".to_string()));
        }

        self.store.save_settings(&settings)?;
        *self.settings.write().await = settings;
        let _ = self.events.send(DeskEvent::SettingsChanged);
        Ok(())
    }
}

fn validate_company(company: &str) -> DeskResult<()> {
    if company.trim().is_empty() {
        return Err(DeskError::Validation("Company name cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_owner(settings: &PipelineSettings, owner: &str) -> DeskResult<()> {
    if !settings.owners.iter().any(|known| known == owner) {
        return Err(DeskError::Validation(format!("Unknown sales rep '{}'", owner)));
    }
    Ok(())
}

fn validate_product(settings: &PipelineSettings, product: &str) -> DeskResult<()> {
    if !settings.products.iter().any(|known| known == product) {
        return Err(DeskError::Validation(format!("Unknown product '{}'", product)));
    }
    Ok(())
}
