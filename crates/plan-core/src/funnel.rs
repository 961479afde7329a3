//! Funnel stages, named allocation plans and allocation results.

use crate::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of a funnel plan, e.g. "awareness".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunnelPlanId(pub String);

impl FunnelPlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Default for FunnelPlanId {
    fn default() -> Self {
        Self("balanced".to_string())
    }
}

impl fmt::Display for FunnelPlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marketing funnel stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FunnelStage {
    /// Top of funnel (awareness).
    Tofu,
    /// Middle of funnel (consideration).
    Mofu,
    /// Bottom of funnel (conversion).
    Bofu,
}

impl FunnelStage {
    pub const ALL: [FunnelStage; 3] = [FunnelStage::Tofu, FunnelStage::Mofu, FunnelStage::Bofu];

    pub fn label(&self) -> &'static str {
        match self {
            FunnelStage::Tofu => "TOFU",
            FunnelStage::Mofu => "MOFU",
            FunnelStage::Bofu => "BOFU",
        }
    }
}

/// Stage split of a funnel plan in percent. Always sums to 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StageSplit", into = "StageSplit")]
pub struct FunnelPlan {
    tofu: Decimal,
    mofu: Decimal,
    bofu: Decimal,
}

/// Unvalidated stage split as written in configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StageSplit {
    pub tofu: Decimal,
    pub mofu: Decimal,
    pub bofu: Decimal,
}

impl FunnelPlan {
    /// Build a plan; stage percentages must be non-negative and sum to 100.
    pub fn new(tofu: Decimal, mofu: Decimal, bofu: Decimal) -> Result<Self, ValidationError> {
        for (field, v) in [("tofu", tofu), ("mofu", mofu), ("bofu", bofu)] {
            if v < Decimal::ZERO {
                return Err(ValidationError::NegativePercent(field));
            }
        }
        let sum = tofu + mofu + bofu;
        if sum != Decimal::ONE_HUNDRED {
            return Err(ValidationError::FunnelPlanSum(sum));
        }
        Ok(Self { tofu, mofu, bofu })
    }

    pub fn percent(&self, stage: FunnelStage) -> Decimal {
        match stage {
            FunnelStage::Tofu => self.tofu,
            FunnelStage::Mofu => self.mofu,
            FunnelStage::Bofu => self.bofu,
        }
    }
}

impl TryFrom<StageSplit> for FunnelPlan {
    type Error = ValidationError;

    fn try_from(r: StageSplit) -> Result<Self, Self::Error> {
        FunnelPlan::new(r.tofu, r.mofu, r.bofu)
    }
}

impl From<FunnelPlan> for StageSplit {
    fn from(p: FunnelPlan) -> Self {
        StageSplit {
            tofu: p.tofu,
            mofu: p.mofu,
            bofu: p.bofu,
        }
    }
}

/// Named funnel plans, validated when built.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<FunnelPlanId, StageSplit>")]
#[serde(into = "BTreeMap<FunnelPlanId, FunnelPlan>")]
pub struct FunnelPlanTable {
    plans: BTreeMap<FunnelPlanId, FunnelPlan>,
}

impl FunnelPlanTable {
    /// Built-in plans.
    pub fn builtin() -> Self {
        let d = |v: i64| Decimal::new(v, 0);
        let mut plans = BTreeMap::new();
        plans.insert(
            FunnelPlanId::new("awareness"),
            FunnelPlan {
                tofu: d(60),
                mofu: d(30),
                bofu: d(10),
            },
        );
        plans.insert(
            FunnelPlanId::new("balanced"),
            FunnelPlan {
                tofu: d(40),
                mofu: d(35),
                bofu: d(25),
            },
        );
        plans.insert(
            FunnelPlanId::new("conversion"),
            FunnelPlan {
                tofu: d(20),
                mofu: d(30),
                bofu: d(50),
            },
        );
        plans.insert(
            FunnelPlanId::new("retargeting"),
            FunnelPlan {
                tofu: d(10),
                mofu: d(20),
                bofu: d(70),
            },
        );
        Self { plans }
    }

    pub fn insert(&mut self, id: FunnelPlanId, plan: FunnelPlan) -> Result<(), ValidationError> {
        if id.0.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        self.plans.insert(id, plan);
        Ok(())
    }

    pub fn get(&self, id: &FunnelPlanId) -> Option<&FunnelPlan> {
        self.plans.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FunnelPlanId, &FunnelPlan)> {
        self.plans.iter()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

impl TryFrom<BTreeMap<FunnelPlanId, StageSplit>> for FunnelPlanTable {
    type Error = ValidationError;

    fn try_from(map: BTreeMap<FunnelPlanId, StageSplit>) -> Result<Self, Self::Error> {
        let mut table = FunnelPlanTable::default();
        for (id, raw) in map {
            let plan = FunnelPlan::try_from(raw).map_err(|e| ValidationError::InvalidFunnelPlan {
                id: id.0.clone(),
                source: Box::new(e),
            })?;
            table.insert(id, plan)?;
        }
        Ok(table)
    }
}

impl From<FunnelPlanTable> for BTreeMap<FunnelPlanId, FunnelPlan> {
    fn from(t: FunnelPlanTable) -> Self {
        t.plans
    }
}

/// Budget assigned to one funnel stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageAllocation {
    pub stage: FunnelStage,
    pub percent: Decimal,
    pub monthly_budget: Decimal,
    pub per_account_monthly_budget: Decimal,
    pub per_account_daily_budget: Decimal,
}

/// Ad budget split across the three funnel stages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunnelAllocation {
    pub plan: FunnelPlanId,
    pub number_of_accounts: u32,
    pub tofu: StageAllocation,
    pub mofu: StageAllocation,
    pub bofu: StageAllocation,
}

impl FunnelAllocation {
    pub fn stage(&self, stage: FunnelStage) -> &StageAllocation {
        match stage {
            FunnelStage::Tofu => &self.tofu,
            FunnelStage::Mofu => &self.mofu,
            FunnelStage::Bofu => &self.bofu,
        }
    }

    pub fn stages(&self) -> [&StageAllocation; 3] {
        [&self.tofu, &self.mofu, &self.bofu]
    }

    pub fn total_monthly_budget(&self) -> Decimal {
        self.stages().iter().map(|s| s.monthly_budget).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn builtin_plans_sum_to_hundred() {
        let t = FunnelPlanTable::builtin();
        assert_eq!(t.len(), 4);
        for (id, plan) in t.iter() {
            let sum: Decimal = FunnelStage::ALL.iter().map(|s| plan.percent(*s)).sum();
            assert_eq!(sum, Decimal::ONE_HUNDRED, "plan {id}");
        }
        assert!(t.get(&FunnelPlanId::default()).is_some());
    }

    #[test]
    fn plan_not_summing_to_hundred_is_rejected() {
        let err = FunnelPlan::new(Decimal::new(50, 0), Decimal::new(30, 0), Decimal::new(10, 0));
        assert_eq!(err, Err(ValidationError::FunnelPlanSum(Decimal::new(90, 0))));
    }

    #[test]
    fn yaml_table_reports_offending_plan() {
        let yaml = "launch: { tofu: 70, mofu: 20, bofu: 5 }\n";
        let err = serde_yaml::from_str::<FunnelPlanTable>(yaml).unwrap_err();
        assert!(err.to_string().contains("launch"), "{err}");
        let ok = "launch: { tofu: 70, mofu: 20, bofu: 10 }\n";
        let t: FunnelPlanTable = serde_yaml::from_str(ok).unwrap();
        assert_eq!(
            t.get(&FunnelPlanId::new("launch")).unwrap().percent(FunnelStage::Tofu),
            Decimal::new(70, 0)
        );
    }

    proptest! {
        #[test]
        fn any_split_summing_to_hundred_is_accepted(a in 0i64..=100, b in 0i64..=100) {
            prop_assume!(a + b <= 100);
            let plan = FunnelPlan::new(Decimal::new(a, 0), Decimal::new(b, 0), Decimal::new(100 - a - b, 0));
            prop_assert!(plan.is_ok());
        }
    }
}
