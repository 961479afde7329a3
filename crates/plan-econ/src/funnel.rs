//! Funnel allocator.

use crate::PlanError;
use plan_core::{
    FunnelAllocation, FunnelPlan, FunnelPlanId, FunnelPlanTable, FunnelStage, StageAllocation,
    DAYS_PER_MONTH,
};
use rust_decimal::Decimal;

/// Split `ad_budget` by the named plan, then per account and per day.
///
/// No rounding is applied; formatting is left to the caller.
pub fn allocate(
    ad_budget: Decimal,
    plan_id: &FunnelPlanId,
    number_of_accounts: u32,
    plans: &FunnelPlanTable,
) -> Result<FunnelAllocation, PlanError> {
    let plan = plans
        .get(plan_id)
        .ok_or_else(|| PlanError::UnknownFunnelPlan(plan_id.clone()))?;
    Ok(allocate_with(ad_budget, plan_id, plan, number_of_accounts))
}

/// Allocate with an already resolved plan.
pub fn allocate_with(
    ad_budget: Decimal,
    plan_id: &FunnelPlanId,
    plan: &FunnelPlan,
    number_of_accounts: u32,
) -> FunnelAllocation {
    let accounts = Decimal::from(number_of_accounts.max(1));
    let days = Decimal::from(DAYS_PER_MONTH);
    let stage = |stage: FunnelStage| {
        let percent = plan.percent(stage);
        let monthly_budget = ad_budget * percent / Decimal::ONE_HUNDRED;
        let per_account_monthly_budget = monthly_budget / accounts;
        StageAllocation {
            stage,
            percent,
            monthly_budget,
            per_account_monthly_budget,
            per_account_daily_budget: per_account_monthly_budget / days,
        }
    };
    FunnelAllocation {
        plan: plan_id.clone(),
        number_of_accounts,
        tofu: stage(FunnelStage::Tofu),
        mofu: stage(FunnelStage::Mofu),
        bofu: stage(FunnelStage::Bofu),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::approx;
    use proptest::prelude::*;

    #[test]
    fn scenario_b_awareness_split() {
        let a = allocate(
            Decimal::new(100_000, 0),
            &FunnelPlanId::new("awareness"),
            1,
            &FunnelPlanTable::builtin(),
        )
        .unwrap();
        assert_eq!(a.tofu.monthly_budget, Decimal::new(60_000, 0));
        assert_eq!(a.mofu.monthly_budget, Decimal::new(30_000, 0));
        assert_eq!(a.bofu.monthly_budget, Decimal::new(10_000, 0));
        assert_eq!(a.tofu.per_account_daily_budget, Decimal::new(2_000, 0));
    }

    #[test]
    fn zero_accounts_treated_as_one() {
        let table = FunnelPlanTable::builtin();
        let id = FunnelPlanId::new("balanced");
        let zero = allocate(Decimal::new(9_000, 0), &id, 0, &table).unwrap();
        let one = allocate(Decimal::new(9_000, 0), &id, 1, &table).unwrap();
        assert_eq!(
            zero.mofu.per_account_monthly_budget,
            one.mofu.per_account_monthly_budget
        );
    }

    #[test]
    fn unknown_plan_is_error() {
        let err = allocate(
            Decimal::ONE,
            &FunnelPlanId::new("missing"),
            1,
            &FunnelPlanTable::builtin(),
        );
        assert_eq!(
            err,
            Err(PlanError::UnknownFunnelPlan(FunnelPlanId::new("missing")))
        );
    }

    proptest! {
        #[test]
        fn stages_sum_to_budget(cents in 0i64..1_000_000_000, accounts in 1u32..50, which in 0usize..4) {
            let table = FunnelPlanTable::builtin();
            let (id, _) = table.iter().nth(which).unwrap();
            let budget = Decimal::new(cents, 2);
            let a = allocate(budget, id, accounts, &table).unwrap();
            prop_assert!(approx(a.total_monthly_budget(), budget, Decimal::new(1, 9)));
            for s in a.stages() {
                prop_assert!(approx(
                    s.per_account_monthly_budget * Decimal::from(accounts),
                    s.monthly_budget,
                    Decimal::new(1, 9)
                ));
            }
        }
    }
}
