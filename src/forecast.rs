use crate::models::{ColumnStats, Deal, PipelineSettings, RollupStats, Stage};

/// Won's forecast rolls up the weighted potential of the still-open (and
/// lost) columns rather than Won's own totals.
const ROLLUP_STAGES: [Stage; 3] = [Stage::Demoed, Stage::Closing, Stage::Lost];

pub fn column_stats(deals: &[Deal], stage: Stage, settings: &PipelineSettings) -> ColumnStats {
    let column: Vec<&Deal> = deals.iter().filter(|deal| deal.stage == stage).collect();
    let arr: f64 = column.iter().map(|deal| deal.amount).sum();
    let raas: f64 = column.iter().map(|deal| deal.raas).sum();

    let forecast = if stage == Stage::Won {
        ROLLUP_STAGES
            .iter()
            .map(|&other| {
                let total: f64 = deals
                    .iter()
                    .filter(|deal| deal.stage == other)
                    .map(|deal| deal.amount + deal.raas)
                    .sum();
                total * settings.stage_percentage(other)
            })
            .sum()
    } else {
        (arr + raas) * settings.stage_percentage(stage)
    };

    ColumnStats {
        deals: column.len(),
        arr,
        raas,
        forecast,
    }
}

pub fn owner_rollup(deals: &[Deal], owner: &str) -> RollupStats {
    rollup(deals.iter().filter(|deal| deal.owner == owner))
}

pub fn product_rollup(deals: &[Deal], product: &str) -> RollupStats {
    rollup(deals.iter().filter(|deal| deal.product == product))
}

fn rollup<'a>(deals: impl Iterator<Item = &'a Deal>) -> RollupStats {
    let mut stats = RollupStats::default();
    for deal in deals {
        stats.total_deals += 1;
        stats.total_amount += deal.amount;
        match deal.stage {
            Stage::Won => stats.won_deals += 1,
            Stage::Lost => stats.lost_deals += 1,
            _ => {}
        }
    }
    stats
}
