#![deny(warnings)]

//! Profit and ad-budget planning.
//!
//! The pipeline runs in three pure stages:
//! - [`resolve`]: unit economics, break-even values and the two derived targets
//! - [`plan_budget`]: order volume, revenue and ad budget for a profit goal
//! - [`allocate`]: split of the ad budget over funnel stages and ad accounts
//!
//! [`compare_across_channels`] runs the pipeline once per fee profile.

use plan_core::{
    ChannelId, DerivedMetrics, FunnelAllocation, FunnelPlanId, FunnelPlanTable, PlanInputs,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

mod budget;
mod compare;
mod funnel;
mod resolver;

pub use budget::plan_budget;
pub use compare::{
    compare_across_channels, compare_selected, ChannelComparison, ComparisonTotals,
    PlatformReportEntry,
};
pub use funnel::{allocate, allocate_with};
pub use resolver::{price_before_vat, resolve};

/// Configuration errors surfaced by the planning engine.
///
/// Degenerate numeric input never produces an error; it yields zeroed output.
#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    /// Funnel plan id not present in the configured table.
    #[error("unknown funnel plan: {0}")]
    UnknownFunnelPlan(FunnelPlanId),
    /// Channel id not present in the fee-profile table.
    #[error("unknown channel: {0}")]
    UnknownChannel(ChannelId),
}

/// Metrics and funnel split for one set of inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub metrics: DerivedMetrics,
    pub allocation: FunnelAllocation,
}

/// Run resolve, budget and allocation for `inputs`.
pub fn run_pipeline(
    inputs: &PlanInputs,
    plans: &FunnelPlanTable,
) -> Result<PlanOutcome, PlanError> {
    let unit = resolve(inputs);
    let metrics = plan_budget(inputs, &unit);
    let allocation = allocate(
        metrics.ad_budget,
        &inputs.funnel_plan,
        inputs.number_of_accounts,
        plans,
    )?;
    Ok(PlanOutcome {
        metrics,
        allocation,
    })
}

/// `num / den`, or zero when the denominator is not positive.
pub(crate) fn ratio(num: Decimal, den: Decimal) -> Decimal {
    if den <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    num.checked_div(den).unwrap_or_else(|| {
        warn!(%num, %den, "division overflow, using zero");
        Decimal::ZERO
    })
}

/// `pct` percent of `base`, or zero (with a warning) on overflow.
pub(crate) fn percent_of(base: Decimal, pct: Decimal) -> Decimal {
    match base.checked_mul(pct) {
        Some(v) => v / Decimal::ONE_HUNDRED,
        None => {
            warn!(%base, %pct, "percentage overflow, using zero");
            Decimal::ZERO
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use plan_core::{DriverTarget, FunnelStage, ProfitStatus, Timeframe};

    pub(crate) fn scenario_a() -> PlanInputs {
        PlanInputs {
            selling_price: Decimal::new(500, 0),
            vat_percent: Decimal::new(7, 0),
            cogs: Decimal::new(150, 0),
            platform_fee_percent: Decimal::new(5, 0),
            payment_fee_percent: Decimal::new(3, 0),
            kol_fee_percent: Decimal::ZERO,
            packaging_cost: Decimal::new(20, 0),
            shipping_cost: Decimal::new(30, 0),
            profit_goal: Decimal::new(50_000, 0),
            profit_goal_timeframe: Timeframe::Monthly,
            fixed_costs: Decimal::new(10_000, 0),
            target: DriverTarget::Roas(Decimal::new(3, 0)),
            funnel_plan: FunnelPlanId::new("awareness"),
            number_of_accounts: 2,
        }
    }

    pub(crate) fn approx(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn ratio_guards_non_positive_denominator() {
        assert_eq!(ratio(Decimal::TEN, Decimal::ZERO), Decimal::ZERO);
        assert_eq!(ratio(Decimal::TEN, Decimal::NEGATIVE_ONE), Decimal::ZERO);
        assert_eq!(ratio(Decimal::TEN, Decimal::TWO), Decimal::new(5, 0));
    }

    #[test]
    fn overflow_yields_zero_instead_of_panic() {
        assert_eq!(ratio(Decimal::MAX, Decimal::new(1, 28)), Decimal::ZERO);
        assert_eq!(percent_of(Decimal::MAX, Decimal::MAX), Decimal::ZERO);
        assert_eq!(
            percent_of(Decimal::new(200, 0), Decimal::new(15, 0)),
            Decimal::new(30, 0)
        );
    }

    #[test]
    fn pipeline_end_to_end() {
        let out = run_pipeline(&scenario_a(), &FunnelPlanTable::builtin()).unwrap();
        let m = &out.metrics;
        assert_eq!(m.status, ProfitStatus::Profitable);
        assert!(approx(
            out.allocation.total_monthly_budget(),
            m.ad_budget,
            Decimal::new(1, 6)
        ));
        let tofu = out.allocation.stage(FunnelStage::Tofu);
        assert_eq!(tofu.percent, Decimal::new(60, 0));
        assert!(approx(
            tofu.per_account_monthly_budget * Decimal::TWO,
            tofu.monthly_budget,
            Decimal::new(1, 6)
        ));
    }

    #[test]
    fn pipeline_reports_unknown_plan() {
        let mut p = scenario_a();
        p.funnel_plan = FunnelPlanId::new("nope");
        assert_eq!(
            run_pipeline(&p, &FunnelPlanTable::builtin()),
            Err(PlanError::UnknownFunnelPlan(FunnelPlanId::new("nope")))
        );
    }
}
