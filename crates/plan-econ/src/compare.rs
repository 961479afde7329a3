//! Cross-channel what-if comparison.

use crate::{allocate_with, plan_budget, resolve, PlanError};
use plan_core::{
    ChannelId, DerivedMetrics, FeeProfile, FeeProfileTable, FunnelAllocation, FunnelPlanTable,
    PlanInputs,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Pipeline result for one sales channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformReportEntry {
    pub channel_id: ChannelId,
    pub fee_profile: FeeProfile,
    pub metrics: DerivedMetrics,
    pub allocation: FunnelAllocation,
}

/// Aggregates across all compared channels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTotals {
    pub channel_count: usize,
    pub total_revenue: Decimal,
    pub total_ad_budget: Decimal,
    pub total_orders: Decimal,
    pub average_net_profit_per_unit: Decimal,
    /// Channel with the highest net profit per unit; ties go to the lowest id.
    pub best_channel: Option<ChannelId>,
}

/// Side-by-side report, entries ordered by channel id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelComparison {
    pub entries: Vec<PlatformReportEntry>,
    pub totals: ComparisonTotals,
}

/// Run the pipeline once per fee profile in `profiles`.
pub fn compare_across_channels(
    base: &PlanInputs,
    profiles: &FeeProfileTable,
    plans: &FunnelPlanTable,
) -> Result<ChannelComparison, PlanError> {
    let selected: Vec<(&ChannelId, &FeeProfile)> = profiles.iter().collect();
    compare(base, selected, plans)
}

/// Like [`compare_across_channels`], restricted to `ids`.
pub fn compare_selected(
    base: &PlanInputs,
    profiles: &FeeProfileTable,
    ids: &[ChannelId],
    plans: &FunnelPlanTable,
) -> Result<ChannelComparison, PlanError> {
    let mut selected = Vec::with_capacity(ids.len());
    for id in ids {
        let profile = profiles
            .get(id)
            .ok_or_else(|| PlanError::UnknownChannel(id.clone()))?;
        selected.push((id, profile));
    }
    selected.sort_by(|a, b| a.0.cmp(b.0));
    selected.dedup_by(|a, b| a.0 == b.0);
    compare(base, selected, plans)
}

fn compare(
    base: &PlanInputs,
    selected: Vec<(&ChannelId, &FeeProfile)>,
    plans: &FunnelPlanTable,
) -> Result<ChannelComparison, PlanError> {
    let plan = plans
        .get(&base.funnel_plan)
        .ok_or_else(|| PlanError::UnknownFunnelPlan(base.funnel_plan.clone()))?;

    let mut entries: Vec<PlatformReportEntry> = selected
        .into_par_iter()
        .map(|(id, profile)| {
            let inputs = profile.apply(base);
            let metrics = plan_budget(&inputs, &resolve(&inputs));
            let allocation = allocate_with(
                metrics.ad_budget,
                &inputs.funnel_plan,
                plan,
                inputs.number_of_accounts,
            );
            PlatformReportEntry {
                channel_id: id.clone(),
                fee_profile: *profile,
                metrics,
                allocation,
            }
        })
        .collect();
    entries.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));

    let totals = summarize(&entries);
    info!(
        channels = totals.channel_count,
        total_ad_budget = %totals.total_ad_budget,
        best = ?totals.best_channel,
        "compared channels"
    );
    Ok(ChannelComparison { entries, totals })
}

fn summarize(entries: &[PlatformReportEntry]) -> ComparisonTotals {
    let mut totals = ComparisonTotals {
        channel_count: entries.len(),
        ..ComparisonTotals::default()
    };
    let mut net_sum = Decimal::ZERO;
    let mut best: Option<&PlatformReportEntry> = None;
    for e in entries {
        totals.total_revenue += e.metrics.target_revenue;
        totals.total_ad_budget += e.metrics.ad_budget;
        totals.total_orders += e.metrics.target_orders;
        net_sum += e.metrics.net_profit_per_unit;
        best = match best {
            Some(b)
                if b.metrics.net_profit_per_unit > e.metrics.net_profit_per_unit
                    || (b.metrics.net_profit_per_unit == e.metrics.net_profit_per_unit
                        && b.channel_id <= e.channel_id) =>
            {
                Some(b)
            }
            _ => Some(e),
        };
    }
    if !entries.is_empty() {
        totals.average_net_profit_per_unit = net_sum / Decimal::from(entries.len());
    }
    totals.best_channel = best.map(|e| e.channel_id.clone());
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{approx, scenario_a};

    #[test]
    fn one_entry_per_profile() {
        let table = FeeProfileTable::builtin();
        let cmp = compare_across_channels(&scenario_a(), &table, &FunnelPlanTable::builtin())
            .unwrap();
        assert_eq!(cmp.entries.len(), table.len());
        assert_eq!(cmp.totals.channel_count, table.len());
        let ids: Vec<&str> = cmp.entries.iter().map(|e| e.channel_id.0.as_str()).collect();
        assert_eq!(ids, ["lazada", "other", "shopee", "tiktok_shop", "website"]);
    }

    #[test]
    fn profiles_override_only_fees() {
        let base = scenario_a();
        let cmp = compare_across_channels(
            &base,
            &FeeProfileTable::builtin(),
            &FunnelPlanTable::builtin(),
        )
        .unwrap();
        let other = cmp
            .entries
            .iter()
            .find(|e| e.channel_id.0 == "other")
            .unwrap();
        let direct = plan_budget(&base, &resolve(&base));
        assert_eq!(other.metrics, direct);
        let website = cmp
            .entries
            .iter()
            .find(|e| e.channel_id.0 == "website")
            .unwrap();
        // no platform fee, so more profit per unit than the passthrough 5%
        assert!(website.metrics.net_profit_per_unit > other.metrics.net_profit_per_unit);
        assert_eq!(cmp.totals.best_channel, Some(ChannelId::new("website")));
    }

    #[test]
    fn totals_match_entries() {
        let cmp = compare_across_channels(
            &scenario_a(),
            &FeeProfileTable::builtin(),
            &FunnelPlanTable::builtin(),
        )
        .unwrap();
        let revenue: Decimal = cmp.entries.iter().map(|e| e.metrics.target_revenue).sum();
        let budget: Decimal = cmp.entries.iter().map(|e| e.metrics.ad_budget).sum();
        let orders: Decimal = cmp.entries.iter().map(|e| e.metrics.target_orders).sum();
        let tol = Decimal::new(1, 9);
        assert!(approx(cmp.totals.total_revenue, revenue, tol));
        assert!(approx(cmp.totals.total_ad_budget, budget, tol));
        assert!(approx(cmp.totals.total_orders, orders, tol));
        let mean: Decimal = cmp
            .entries
            .iter()
            .map(|e| e.metrics.net_profit_per_unit)
            .sum::<Decimal>()
            / Decimal::from(cmp.entries.len());
        assert!(approx(cmp.totals.average_net_profit_per_unit, mean, tol));
    }

    #[test]
    fn selection_order_does_not_matter() {
        let table = FeeProfileTable::builtin();
        let plans = FunnelPlanTable::builtin();
        let ab = [ChannelId::new("shopee"), ChannelId::new("lazada")];
        let ba = [ChannelId::new("lazada"), ChannelId::new("shopee")];
        let x = compare_selected(&scenario_a(), &table, &ab, &plans).unwrap();
        let y = compare_selected(&scenario_a(), &table, &ba, &plans).unwrap();
        assert_eq!(x, y);
        assert_eq!(x.entries.len(), 2);
    }

    #[test]
    fn unknown_channel_is_error() {
        let err = compare_selected(
            &scenario_a(),
            &FeeProfileTable::builtin(),
            &[ChannelId::new("amazon")],
            &FunnelPlanTable::builtin(),
        );
        assert_eq!(err, Err(PlanError::UnknownChannel(ChannelId::new("amazon"))));
    }

    #[test]
    fn empty_table_gives_zero_totals() {
        let cmp = compare_across_channels(
            &scenario_a(),
            &FeeProfileTable::default(),
            &FunnelPlanTable::builtin(),
        )
        .unwrap();
        assert!(cmp.entries.is_empty());
        assert_eq!(cmp.totals, ComparisonTotals::default());
    }
}
