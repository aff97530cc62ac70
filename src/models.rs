use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "Demo'd")]
    Demoed,
    Closing,
    Won,
    Lost,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Demoed, Stage::Closing, Stage::Won, Stage::Lost];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Demoed => "Demo'd",
            Self::Closing => "Closing",
            Self::Won => "Won",
            Self::Lost => "Lost",
        }
    }

    pub fn parse(raw: &str) -> Option<Stage> {
        match raw {
            "Demo'd" => Some(Self::Demoed),
            "Closing" => Some(Self::Closing),
            "Won" => Some(Self::Won),
            "Lost" => Some(Self::Lost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub company: String,
    pub amount: f64,
    pub raas: f64,
    pub owner: String,
    pub product: String,
    pub stage: Stage,
    pub demo_date: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDealPayload {
    pub company: String,
    pub amount: f64,
    pub raas: f64,
    pub owner: String,
    pub product: String,
    pub stage: Option<Stage>,
    pub demo_date: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDealPayload {
    pub id: String,
    pub company: Option<String>,
    pub amount: Option<f64>,
    pub raas: Option<f64>,
    pub owner: Option<String>,
    pub product: Option<String>,
    pub stage: Option<Stage>,
    pub demo_date: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListDealsFilters {
    pub stage: Option<Stage>,
    pub owner: Option<String>,
    pub product: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Derived per-stage statistics; recomputed on every read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    pub deals: usize,
    pub arr: f64,
    pub raas: f64,
    pub forecast: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RollupStats {
    pub total_deals: usize,
    pub total_amount: f64,
    pub won_deals: usize,
    pub lost_deals: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProfile {
    pub name: String,
    pub image_url: String,
    pub stats: RollupStats,
    pub deals: Vec<Deal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductProfile {
    pub name: String,
    pub image_url: String,
    pub stats: RollupStats,
    pub deals: Vec<Deal>,
}

/// Completed drag gesture as reported by the board front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragEvent {
    pub deal_id: String,
    pub source: Stage,
    pub destination: Option<Stage>,
}

/// Change notifications on the desk's broadcast feed. Subscribers react by
/// refetching the full list, matching the backend-subscription semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum DeskEvent {
    DealsChanged,
    SettingsChanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineSettings {
    pub owners: Vec<String>,
    pub products: Vec<String>,
    pub forecast_percentages: BTreeMap<Stage, f64>,
    pub asset_base_url: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let mut forecast_percentages = BTreeMap::new();
        forecast_percentages.insert(Stage::Demoed, 0.2);
        forecast_percentages.insert(Stage::Closing, 0.5);
        forecast_percentages.insert(Stage::Won, 1.0);
        forecast_percentages.insert(Stage::Lost, 0.02);

        Self {
            owners: ["Hasan", "Jared", "Guillermo", "Ricardo", "Kamran"]
                .map(str::to_string)
                .to_vec(),
            products: ["Kayako", "Influitive", "Agents", "CRMagic", "Ephor", "AI Caller"]
                .map(str::to_string)
                .to_vec(),
            forecast_percentages,
            asset_base_url: "https://storage.dealdesk.local".to_string(),
        }
    }
}

impl PipelineSettings {
    pub fn stage_percentage(&self, stage: Stage) -> f64 {
        self.forecast_percentages.get(&stage).copied().unwrap_or(0.0)
    }
}
