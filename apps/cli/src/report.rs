//! Plain-text rendering. Rounding happens here and nowhere else.

use plan_core::{DerivedMetrics, FunnelAllocation, PlanInputs, ProfitStatus};
use plan_econ::{ChannelComparison, PlanOutcome};
use plan_rules::{AutomationRule, EvaluationResult};
use rust_decimal::Decimal;
use std::fmt::Write;

fn money(d: Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

fn status(s: ProfitStatus) -> &'static str {
    match s {
        ProfitStatus::Profitable => "profitable",
        ProfitStatus::BelowTarget => "target CPA exceeds unit profit",
        ProfitStatus::Unprofitable => "NOT profitable",
    }
}

fn metrics_block(out: &mut String, m: &DerivedMetrics) {
    let rows = [
        ("price before VAT", m.price_before_vat),
        ("variable cost / unit", m.total_variable_cost),
        ("gross profit / unit", m.gross_profit_per_unit),
        ("break-even ROAS", m.breakeven_roas),
        ("break-even CPA", m.breakeven_cpa),
        ("break-even ad cost %", m.breakeven_ad_cost_percent),
        ("ROAS", m.resolved_roas),
        ("CPA", m.resolved_cpa),
        ("ad cost %", m.resolved_ad_cost_percent),
        ("net profit / unit", m.net_profit_per_unit),
        ("orders / month", m.target_orders),
        ("orders / day", m.target_orders_per_day),
        ("revenue / month", m.target_revenue),
        ("ad budget", m.ad_budget),
        ("ad budget incl. VAT", m.ad_budget_with_vat),
    ];
    for (label, v) in rows {
        let _ = writeln!(out, "  {label:<22} {:>14}", money(v));
    }
    let _ = writeln!(out, "  {:<22} {:>14}", "status", status(m.status));
}

pub fn allocation(a: &FunnelAllocation) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Funnel plan `{}` across {} account(s)",
        a.plan, a.number_of_accounts
    );
    let _ = writeln!(
        out,
        "  {:<6} {:>6} {:>14} {:>14} {:>12}",
        "stage", "%", "monthly", "per account", "per day"
    );
    for s in a.stages() {
        let _ = writeln!(
            out,
            "  {:<6} {:>6} {:>14} {:>14} {:>12}",
            s.stage.label(),
            s.percent,
            money(s.monthly_budget),
            money(s.per_account_monthly_budget),
            money(s.per_account_daily_budget)
        );
    }
    out
}

pub fn plan(inputs: &PlanInputs, o: &PlanOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Plan driven by {:?} = {}",
        inputs.target.driver(),
        inputs.target.value()
    );
    metrics_block(&mut out, &o.metrics);
    out.push('\n');
    out.push_str(&allocation(&o.allocation));
    out
}

pub fn comparison(c: &ChannelComparison) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<14} {:>8} {:>8} {:>12} {:>10} {:>14} {:>14}",
        "channel", "plat %", "pay %", "net/unit", "orders", "revenue", "ad budget"
    );
    for e in &c.entries {
        let (plat, pay) = if e.fee_profile.passthrough {
            ("input".to_string(), "input".to_string())
        } else {
            (
                e.fee_profile.platform_fee_percent.to_string(),
                e.fee_profile.payment_fee_percent.to_string(),
            )
        };
        let _ = writeln!(
            out,
            "  {:<14} {:>8} {:>8} {:>12} {:>10} {:>14} {:>14}",
            e.channel_id.0,
            plat,
            pay,
            money(e.metrics.net_profit_per_unit),
            e.metrics.target_orders.round_dp(1),
            money(e.metrics.target_revenue),
            money(e.metrics.ad_budget)
        );
    }
    let t = &c.totals;
    let _ = writeln!(
        out,
        "Totals over {} channel(s): revenue {} | ad budget {} | orders {} | avg net/unit {}",
        t.channel_count,
        money(t.total_revenue),
        money(t.total_ad_budget),
        t.total_orders.round_dp(1),
        money(t.average_net_profit_per_unit)
    );
    if let Some(best) = &t.best_channel {
        let _ = writeln!(out, "Best net profit per unit: {best}");
    }
    out
}

pub fn rules(rules: &[AutomationRule], results: &[EvaluationResult]) -> String {
    let mut out = String::from("Dry run (no actions executed)\n");
    for (rule, res) in rules.iter().zip(results) {
        let name = rule.name.as_deref().unwrap_or("-");
        let mark = if res.condition_held { "FIRE" } else { "skip" };
        let _ = writeln!(
            out,
            "  [{mark}] {name}: {} | observed {:.4} | {}",
            rule.describe(),
            res.observed_value,
            res.described_action
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::{FunnelPlanId, FunnelPlanTable};

    #[test]
    fn money_rounds_to_cents() {
        assert_eq!(money(Decimal::new(46728971, 5)), "467.29");
        assert_eq!(money(Decimal::new(5, 0)), "5.00");
    }

    #[test]
    fn allocation_table_lists_stages() {
        let a = plan_econ::allocate(
            Decimal::new(100_000, 0),
            &FunnelPlanId::new("awareness"),
            2,
            &FunnelPlanTable::builtin(),
        )
        .unwrap();
        let text = allocation(&a);
        assert!(text.contains("TOFU"));
        assert!(text.contains("60000.00"));
        assert!(text.contains("1000.00"));
    }
}
