pub mod avatars;
pub mod board;
pub mod db;
pub mod desk;
pub mod errors;
pub mod forecast;
pub mod models;
pub mod parser;
pub mod store;

pub use crate::db::Database;
pub use crate::desk::DeskCore;
pub use crate::errors::{DeskError, DeskResult};
pub use crate::models::{
    ColumnStats, Deal, DeskEvent, DragEvent, ListDealsFilters, NewDealPayload, OwnerProfile,
    PipelineSettings, ProductProfile, RollupStats, Stage, UpdateDealPayload,
};
pub use crate::parser::{parse_quick_add, ParsedDeal};
pub use crate::store::DealStore;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dealdesk.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
