#![deny(warnings)]

//! Core domain models and invariants for ad-budget planning.
//!
//! This crate defines the serializable inputs and outputs of the planning
//! engine, the fee-profile and funnel-plan tables it is configured with, and
//! validation helpers that guard configuration invariants.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod fees;
mod funnel;

pub use fees::{ChannelId, FeeProfile, FeeProfileTable};
pub use funnel::{
    FunnelAllocation, FunnelPlan, FunnelPlanId, FunnelPlanTable, FunnelStage, StageAllocation,
    StageSplit,
};

/// Planning convention: every month has 30 days.
pub const DAYS_PER_MONTH: u32 = 30;

/// Default VAT rate in percent.
pub const DEFAULT_VAT_PERCENT: Decimal = Decimal::from_parts(7, 0, 0, false, 0);

/// Time frame a profit goal is expressed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// Goal is per day; scaled by [`DAYS_PER_MONTH`].
    Daily,
    /// Goal is per month.
    #[default]
    Monthly,
}

/// Which of the three target metrics is authoritative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Driver {
    /// Target return on ad spend.
    Roas,
    /// Target cost per acquisition.
    Cpa,
    /// Target ad cost as percent of pre-VAT price.
    AdCostPercent,
}

/// The single authoritative target of an evaluation, tagged by its driver.
///
/// The two other target metrics are never read as input; they are derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "driver", content = "value", rename_all = "snake_case")]
pub enum DriverTarget {
    /// Target ROAS (ratio).
    Roas(Decimal),
    /// Target CPA (money).
    Cpa(Decimal),
    /// Target ad cost (percent).
    AdCostPercent(Decimal),
}

impl DriverTarget {
    pub fn driver(&self) -> Driver {
        match self {
            DriverTarget::Roas(_) => Driver::Roas,
            DriverTarget::Cpa(_) => Driver::Cpa,
            DriverTarget::AdCostPercent(_) => Driver::AdCostPercent,
        }
    }

    pub fn value(&self) -> Decimal {
        match *self {
            DriverTarget::Roas(v) | DriverTarget::Cpa(v) | DriverTarget::AdCostPercent(v) => v,
        }
    }
}

/// Unit economics, profit goal and targets for one planning evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanInputs {
    /// Selling price per unit, VAT included.
    pub selling_price: Decimal,
    /// VAT rate in percent.
    #[serde(default = "default_vat_percent")]
    pub vat_percent: Decimal,
    /// Cost of goods per unit.
    pub cogs: Decimal,
    /// Marketplace commission, percent of pre-VAT price.
    #[serde(default)]
    pub platform_fee_percent: Decimal,
    /// Payment processing fee, percent of full selling price.
    #[serde(default)]
    pub payment_fee_percent: Decimal,
    /// Influencer commission, percent of pre-VAT price.
    #[serde(default)]
    pub kol_fee_percent: Decimal,
    /// Flat packaging cost per unit.
    #[serde(default)]
    pub packaging_cost: Decimal,
    /// Flat shipping cost per unit.
    #[serde(default)]
    pub shipping_cost: Decimal,
    /// Profit goal in `profit_goal_timeframe` units.
    pub profit_goal: Decimal,
    #[serde(default)]
    pub profit_goal_timeframe: Timeframe,
    /// Fixed costs per month.
    #[serde(default)]
    pub fixed_costs: Decimal,
    /// Authoritative target metric.
    pub target: DriverTarget,
    #[serde(default)]
    pub funnel_plan: FunnelPlanId,
    #[serde(default = "default_accounts")]
    pub number_of_accounts: u32,
}

fn default_vat_percent() -> Decimal {
    DEFAULT_VAT_PERCENT
}

fn default_accounts() -> u32 {
    1
}

impl PlanInputs {
    /// Copy of these inputs with the two channel fee rates replaced.
    pub fn with_fees(&self, platform_fee_percent: Decimal, payment_fee_percent: Decimal) -> Self {
        Self {
            platform_fee_percent,
            payment_fee_percent,
            ..self.clone()
        }
    }

    /// Copy of these inputs with a different authoritative target.
    pub fn with_target(&self, target: DriverTarget) -> Self {
        Self {
            target,
            ..self.clone()
        }
    }
}

/// Health of a plan's unit economics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitStatus {
    /// Positive profit per unit after ad cost.
    #[default]
    Profitable,
    /// Unit is profitable before ads, but the target CPA consumes it.
    BelowTarget,
    /// Price does not cover variable costs (or is zero).
    Unprofitable,
}

/// Outputs of the planning pipeline. Recomputed on every evaluation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub price_before_vat: Decimal,
    pub total_variable_cost: Decimal,
    pub gross_profit_per_unit: Decimal,
    pub breakeven_roas: Decimal,
    pub breakeven_cpa: Decimal,
    pub breakeven_ad_cost_percent: Decimal,
    pub resolved_roas: Decimal,
    pub resolved_cpa: Decimal,
    pub resolved_ad_cost_percent: Decimal,
    pub net_profit_per_unit: Decimal,
    pub target_orders: Decimal,
    pub target_orders_per_day: Decimal,
    pub target_revenue: Decimal,
    pub ad_budget: Decimal,
    pub ad_budget_with_vat: Decimal,
    pub status: ProfitStatus,
}

/// Editable copy of the three target fields, as held by a form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverFields {
    pub roas: Decimal,
    pub cpa: Decimal,
    pub ad_cost_percent: Decimal,
}

impl DriverFields {
    /// Build the authoritative target from the field selected by `driver`.
    pub fn target(&self, driver: Driver) -> DriverTarget {
        match driver {
            Driver::Roas => DriverTarget::Roas(self.roas),
            Driver::Cpa => DriverTarget::Cpa(self.cpa),
            Driver::AdCostPercent => DriverTarget::AdCostPercent(self.ad_cost_percent),
        }
    }

    /// Overwrite the two non-authoritative fields with resolved values.
    pub fn sync(&mut self, target: &DriverTarget, metrics: &DerivedMetrics) {
        match target {
            DriverTarget::Roas(_) => {
                self.cpa = metrics.resolved_cpa;
                self.ad_cost_percent = metrics.resolved_ad_cost_percent;
            }
            DriverTarget::Cpa(_) => {
                self.roas = metrics.resolved_roas;
                self.ad_cost_percent = metrics.resolved_ad_cost_percent;
            }
            DriverTarget::AdCostPercent(_) => {
                self.roas = metrics.resolved_roas;
                self.cpa = metrics.resolved_cpa;
            }
        }
    }
}

/// Validation errors for planning inputs and configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Monetary field must be non-negative.
    #[error("negative monetary value in `{0}`")]
    NegativeMoney(&'static str),
    /// Percent field must be non-negative.
    #[error("negative percentage in `{0}`")]
    NegativePercent(&'static str),
    /// At least one ad account is required.
    #[error("number of accounts must be >= 1")]
    NoAccounts,
    /// Funnel stage percentages must add up to exactly 100.
    #[error("funnel stages sum to {0}, expected 100")]
    FunnelPlanSum(Decimal),
    /// A named funnel plan failed validation.
    #[error("funnel plan `{id}`: {source}")]
    InvalidFunnelPlan {
        id: String,
        #[source]
        source: Box<ValidationError>,
    },
    /// Table identifiers must be non-empty.
    #[error("empty identifier")]
    EmptyId,
}

/// Validate plan inputs for callers that want to reject malformed forms.
///
/// The planning engine itself never calls this; it clamps degenerate input.
pub fn validate_plan_inputs(p: &PlanInputs) -> Result<(), ValidationError> {
    let money = [
        ("selling_price", p.selling_price),
        ("cogs", p.cogs),
        ("packaging_cost", p.packaging_cost),
        ("shipping_cost", p.shipping_cost),
        ("profit_goal", p.profit_goal),
        ("fixed_costs", p.fixed_costs),
    ];
    for (field, v) in money {
        if v < Decimal::ZERO {
            return Err(ValidationError::NegativeMoney(field));
        }
    }
    let percents = [
        ("vat_percent", p.vat_percent),
        ("platform_fee_percent", p.platform_fee_percent),
        ("payment_fee_percent", p.payment_fee_percent),
        ("kol_fee_percent", p.kol_fee_percent),
    ];
    for (field, v) in percents {
        if v < Decimal::ZERO {
            return Err(ValidationError::NegativePercent(field));
        }
    }
    if p.target.value() < Decimal::ZERO {
        return Err(match p.target {
            DriverTarget::Cpa(_) => ValidationError::NegativeMoney("target"),
            _ => ValidationError::NegativePercent("target"),
        });
    }
    if p.number_of_accounts == 0 {
        return Err(ValidationError::NoAccounts);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    pub(crate) fn inputs() -> PlanInputs {
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
            funnel_plan: FunnelPlanId::default(),
            number_of_accounts: 1,
        }
    }

    #[test]
    fn default_vat_constant_is_seven() {
        assert_eq!(DEFAULT_VAT_PERCENT, Decimal::new(7, 0));
    }

    #[test]
    fn yaml_inputs_take_defaults() {
        let yaml = r#"
selling_price: 500
cogs: 150
profit_goal: 50000
target: { driver: cpa, value: 120.5 }
"#;
        let p: PlanInputs = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(p.vat_percent, Decimal::new(7, 0));
        assert_eq!(p.profit_goal_timeframe, Timeframe::Monthly);
        assert_eq!(p.number_of_accounts, 1);
        assert_eq!(p.funnel_plan, FunnelPlanId::default());
        assert_eq!(p.target, DriverTarget::Cpa(Decimal::new(1205, 1)));
        validate_plan_inputs(&p).unwrap();
    }

    #[test]
    fn json_roundtrip_keeps_target_tag() {
        let p = inputs();
        let s = serde_json::to_string(&p).unwrap();
        assert!(s.contains("\"driver\":\"roas\""));
        let back: PlanInputs = serde_json::from_str(&s).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn with_fees_only_touches_fee_rates() {
        let p = inputs();
        let q = p.with_fees(Decimal::new(8, 0), Decimal::new(2, 0));
        assert_eq!(q.platform_fee_percent, Decimal::new(8, 0));
        assert_eq!(q.payment_fee_percent, Decimal::new(2, 0));
        assert_eq!(q.selling_price, p.selling_price);
        assert_eq!(q.target, p.target);
        assert_eq!(p.platform_fee_percent, Decimal::new(5, 0));
    }

    #[test]
    fn sync_leaves_authoritative_field() {
        let metrics = DerivedMetrics {
            resolved_roas: Decimal::new(4, 0),
            resolved_cpa: Decimal::new(100, 0),
            resolved_ad_cost_percent: Decimal::new(25, 0),
            ..DerivedMetrics::default()
        };
        let mut fields = DriverFields {
            roas: Decimal::new(9, 0),
            cpa: Decimal::new(1, 0),
            ad_cost_percent: Decimal::new(1, 0),
        };
        let target = fields.target(Driver::Cpa);
        assert_eq!(target, DriverTarget::Cpa(Decimal::new(1, 0)));
        fields.sync(&target, &metrics);
        assert_eq!(fields.cpa, Decimal::new(1, 0));
        assert_eq!(fields.roas, Decimal::new(4, 0));
        assert_eq!(fields.ad_cost_percent, Decimal::new(25, 0));
    }

    #[test]
    fn validation_rejects_bad_fields() {
        let mut p = inputs();
        p.cogs = Decimal::new(-1, 0);
        assert_eq!(
            validate_plan_inputs(&p),
            Err(ValidationError::NegativeMoney("cogs"))
        );
        let mut p = inputs();
        p.kol_fee_percent = Decimal::new(-5, 0);
        assert_eq!(
            validate_plan_inputs(&p),
            Err(ValidationError::NegativePercent("kol_fee_percent"))
        );
        let mut p = inputs();
        p.number_of_accounts = 0;
        assert_eq!(validate_plan_inputs(&p), Err(ValidationError::NoAccounts));
    }

    proptest! {
        #[test]
        fn target_value_matches_driver(cents in 0i64..10_000_000) {
            let v = Decimal::new(cents, 2);
            for t in [DriverTarget::Roas(v), DriverTarget::Cpa(v), DriverTarget::AdCostPercent(v)] {
                prop_assert_eq!(t.value(), v);
                let fields = DriverFields { roas: v, cpa: v, ad_cost_percent: v };
                prop_assert_eq!(fields.target(t.driver()), t);
            }
        }
    }
}
