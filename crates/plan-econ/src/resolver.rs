//! Metric resolver: unit economics, break-even values and driver resolution.

use crate::{percent_of, ratio};
use plan_core::{DerivedMetrics, DriverTarget, PlanInputs, ProfitStatus};
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Price with VAT removed: `price / (1 + vat/100)`.
///
/// Returns zero when the VAT divisor is not positive.
pub fn price_before_vat(selling_price: Decimal, vat_percent: Decimal) -> Decimal {
    ratio(
        selling_price,
        Decimal::ONE + vat_percent / Decimal::ONE_HUNDRED,
    )
}

/// Resolve unit economics and the three target metrics.
///
/// Only the target carried by `inputs.target` is read; the other two are
/// derived from it. Budget fields of the result are left at zero; see
/// [`crate::plan_budget`].
pub fn resolve(inputs: &PlanInputs) -> DerivedMetrics {
    let pbv = price_before_vat(inputs.selling_price, inputs.vat_percent);
    let hundred = Decimal::ONE_HUNDRED;

    // KOL and platform fees apply to the pre-VAT price, payment fee to the full price.
    let platform_fee = percent_of(pbv, inputs.platform_fee_percent);
    let kol_fee = percent_of(pbv, inputs.kol_fee_percent);
    let payment_fee = percent_of(inputs.selling_price, inputs.payment_fee_percent);
    let total_variable_cost = inputs.cogs
        + platform_fee
        + kol_fee
        + payment_fee
        + inputs.packaging_cost
        + inputs.shipping_cost;
    let gross = pbv - total_variable_cost;

    if pbv <= Decimal::ZERO {
        warn!(selling_price = %inputs.selling_price, "non-positive price before VAT");
        return DerivedMetrics {
            price_before_vat: pbv,
            total_variable_cost,
            gross_profit_per_unit: gross,
            status: ProfitStatus::Unprofitable,
            ..DerivedMetrics::default()
        };
    }

    // Break-even CPA keeps its sign so callers can show the shortfall.
    let breakeven_cpa = gross;
    let breakeven_ad_cost_percent = ratio(breakeven_cpa, pbv) * hundred;
    let (breakeven_roas, status) = if gross > Decimal::ZERO {
        (ratio(pbv, gross), ProfitStatus::Profitable)
    } else {
        warn!(gross_profit = %gross, "unit economics not profitable before ad spend");
        (Decimal::ZERO, ProfitStatus::Unprofitable)
    };

    let (resolved_roas, resolved_cpa, resolved_ad_cost_percent) = match inputs.target {
        DriverTarget::Roas(roas) => {
            let cpa = ratio(pbv, roas);
            (roas, cpa, ratio(cpa, pbv) * hundred)
        }
        DriverTarget::Cpa(cpa) => (ratio(pbv, cpa), cpa, ratio(cpa, pbv) * hundred),
        DriverTarget::AdCostPercent(pct) => {
            let cpa = percent_of(pbv, pct);
            (ratio(pbv, cpa), cpa, pct)
        }
    };

    debug!(
        driver = ?inputs.target.driver(),
        price_before_vat = %pbv,
        gross_profit = %gross,
        roas = %resolved_roas,
        cpa = %resolved_cpa,
        "resolved targets"
    );

    DerivedMetrics {
        price_before_vat: pbv,
        total_variable_cost,
        gross_profit_per_unit: gross,
        breakeven_roas,
        breakeven_cpa,
        breakeven_ad_cost_percent,
        resolved_roas,
        resolved_cpa,
        resolved_ad_cost_percent,
        status,
        ..DerivedMetrics::default()
    }
}
