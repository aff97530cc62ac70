use crate::errors::DeskResult;
use crate::models::{Deal, ListDealsFilters, PipelineSettings};

/// Persistence boundary for the deals collection. The desk core never assumes
/// these calls are instantaneous; every call after an optimistic local
/// mutation goes through this seam so its failure can be caught and the
/// mutation rolled back.
pub trait DealStore: Send + Sync {
    fn list(&self, filters: &ListDealsFilters) -> DeskResult<Vec<Deal>>;
    fn get(&self, deal_id: &str) -> DeskResult<Option<Deal>>;
    fn insert(&self, deal: &Deal) -> DeskResult<()>;
    fn update(&self, deal: &Deal) -> DeskResult<()>;
    fn delete(&self, deal_id: &str) -> DeskResult<bool>;

    fn load_settings(&self) -> DeskResult<PipelineSettings>;
    fn save_settings(&self, settings: &PipelineSettings) -> DeskResult<()>;
}
