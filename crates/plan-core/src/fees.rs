//! Sales-channel fee profiles.

use crate::{PlanInputs, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sales-channel identifier, e.g. "shopee" or "website".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fee rates charged by a sales channel.
///
/// A passthrough profile keeps whatever fees the caller supplied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeProfile {
    #[serde(default)]
    pub platform_fee_percent: Decimal,
    #[serde(default)]
    pub payment_fee_percent: Decimal,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub passthrough: bool,
}

impl FeeProfile {
    pub fn fixed(platform_fee_percent: Decimal, payment_fee_percent: Decimal) -> Self {
        Self {
            platform_fee_percent,
            payment_fee_percent,
            passthrough: false,
        }
    }

    pub fn passthrough() -> Self {
        Self {
            passthrough: true,
            ..Self::default()
        }
    }

    /// Inputs as they would look when selling through this channel.
    pub fn apply(&self, base: &PlanInputs) -> PlanInputs {
        if self.passthrough {
            base.clone()
        } else {
            base.with_fees(self.platform_fee_percent, self.payment_fee_percent)
        }
    }
}

/// Mapping from channel id to fee profile, ordered by id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<ChannelId, FeeProfile>")]
#[serde(into = "BTreeMap<ChannelId, FeeProfile>")]
pub struct FeeProfileTable {
    profiles: BTreeMap<ChannelId, FeeProfile>,
}

impl FeeProfileTable {
    /// Built-in marketplace fee table.
    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            ChannelId::new("shopee"),
            FeeProfile::fixed(Decimal::new(6, 0), Decimal::new(3, 0)),
        );
        profiles.insert(
            ChannelId::new("lazada"),
            FeeProfile::fixed(Decimal::new(5, 0), Decimal::new(3, 0)),
        );
        profiles.insert(
            ChannelId::new("tiktok_shop"),
            FeeProfile::fixed(Decimal::new(4, 0), Decimal::new(3, 0)),
        );
        profiles.insert(
            ChannelId::new("website"),
            FeeProfile::fixed(Decimal::ZERO, Decimal::new(3, 0)),
        );
        profiles.insert(ChannelId::new("other"), FeeProfile::passthrough());
        Self { profiles }
    }

    /// Insert a profile after validating its rates.
    pub fn insert(&mut self, id: ChannelId, profile: FeeProfile) -> Result<(), ValidationError> {
        validate_fee_profile(&id, &profile)?;
        self.profiles.insert(id, profile);
        Ok(())
    }

    pub fn get(&self, id: &ChannelId) -> Option<&FeeProfile> {
        self.profiles.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelId, &FeeProfile)> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn validate_fee_profile(id: &ChannelId, p: &FeeProfile) -> Result<(), ValidationError> {
    if id.0.trim().is_empty() {
        return Err(ValidationError::EmptyId);
    }
    if p.platform_fee_percent < Decimal::ZERO {
        return Err(ValidationError::NegativePercent("platform_fee_percent"));
    }
    if p.payment_fee_percent < Decimal::ZERO {
        return Err(ValidationError::NegativePercent("payment_fee_percent"));
    }
    Ok(())
}

impl TryFrom<BTreeMap<ChannelId, FeeProfile>> for FeeProfileTable {
    type Error = ValidationError;

    fn try_from(map: BTreeMap<ChannelId, FeeProfile>) -> Result<Self, Self::Error> {
        let mut table = FeeProfileTable::default();
        for (id, profile) in map {
            table.insert(id, profile)?;
        }
        Ok(table)
    }
}

impl From<FeeProfileTable> for BTreeMap<ChannelId, FeeProfile> {
    fn from(t: FeeProfileTable) -> Self {
        t.profiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::inputs;

    #[test]
    fn builtin_has_passthrough_other() {
        let t = FeeProfileTable::builtin();
        assert_eq!(t.len(), 5);
        assert!(t.get(&ChannelId::new("other")).unwrap().passthrough);
        assert!(!t.get(&ChannelId::new("shopee")).unwrap().passthrough);
    }

    #[test]
    fn passthrough_keeps_caller_fees() {
        let base = inputs();
        let kept = FeeProfile::passthrough().apply(&base);
        assert_eq!(kept, base);
        let replaced = FeeProfile::fixed(Decimal::new(10, 0), Decimal::ONE).apply(&base);
        assert_eq!(replaced.platform_fee_percent, Decimal::new(10, 0));
        assert_eq!(replaced.payment_fee_percent, Decimal::ONE);
    }

    #[test]
    fn yaml_table_rejects_negative_rates() {
        let ok = "shopee: { platform_fee_percent: 6, payment_fee_percent: 3 }\nother: { passthrough: true }\n";
        let t: FeeProfileTable = serde_yaml::from_str(ok).unwrap();
        assert_eq!(t.len(), 2);
        let bad = "shopee: { platform_fee_percent: -1, payment_fee_percent: 3 }\n";
        assert!(serde_yaml::from_str::<FeeProfileTable>(bad).is_err());
    }
}
