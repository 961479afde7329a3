//! Volume and budget calculator.

use crate::ratio;
use plan_core::{DerivedMetrics, PlanInputs, ProfitStatus, Timeframe, DAYS_PER_MONTH};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Orders, revenue and ad budget needed to reach the profit goal.
///
/// Takes the output of [`crate::resolve`] and returns a new value with the
/// budget fields filled in. Non-profitable plans report zero orders.
pub fn plan_budget(inputs: &PlanInputs, metrics: &DerivedMetrics) -> DerivedMetrics {
    let days = Decimal::from(DAYS_PER_MONTH);
    let net_profit_per_unit = metrics.gross_profit_per_unit - metrics.resolved_cpa;

    let monthly_goal = match inputs.profit_goal_timeframe {
        Timeframe::Daily => inputs.profit_goal * days,
        Timeframe::Monthly => inputs.profit_goal,
    };
    let total_profit_target = monthly_goal + inputs.fixed_costs;

    let target_orders = ratio(total_profit_target, net_profit_per_unit).max(Decimal::ZERO);
    let target_revenue = target_orders * inputs.selling_price;
    let target_orders_per_day = target_orders / days;
    let ad_budget = target_orders * metrics.resolved_cpa;
    let ad_budget_with_vat = ad_budget * (Decimal::ONE + inputs.vat_percent / Decimal::ONE_HUNDRED);

    let status = match metrics.status {
        ProfitStatus::Unprofitable => ProfitStatus::Unprofitable,
        _ if net_profit_per_unit <= Decimal::ZERO => ProfitStatus::BelowTarget,
        _ => ProfitStatus::Profitable,
    };
    if status != ProfitStatus::Profitable {
        warn!(net_profit = %net_profit_per_unit, ?status, "plan yields no orders");
    }
    debug!(
        orders = %target_orders,
        revenue = %target_revenue,
        ad_budget = %ad_budget,
        "planned budget"
    );

    DerivedMetrics {
        net_profit_per_unit,
        target_orders,
        target_orders_per_day,
        target_revenue,
        ad_budget,
        ad_budget_with_vat,
        status,
        ..metrics.clone()
    }
}
