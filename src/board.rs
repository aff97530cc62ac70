use crate::models::{Deal, DragEvent, Stage};
use chrono::{DateTime, Utc};

/// Resolves a completed drag gesture against the current deal list.
///
/// Returns the updated deal record, or `None` when the gesture is a no-op:
/// the drag was cancelled (no destination), the deal was dropped back on its
/// source column, or the id no longer matches any deal.
pub fn resolve_drag(deals: &[Deal], event: &DragEvent, now: DateTime<Utc>) -> Option<Deal> {
    let destination = event.destination?;
    if destination == event.source {
        return None;
    }

    let deal = deals.iter().find(|deal| deal.id == event.deal_id)?;

    let mut updated = deal.clone();
    updated.stage = destination;
    updated.updated_at = now;
    Some(updated)
}

pub fn column_deals(deals: &[Deal], stage: Stage) -> Vec<Deal> {
    deals
        .iter()
        .filter(|deal| deal.stage == stage)
        .cloned()
        .collect()
}
