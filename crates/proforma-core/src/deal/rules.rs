//! Statutory constants used by the tax and depreciation models.
//!
//! Everything here is data rather than code so a run can pin the rules it
//! was evaluated under. `TaxRules::default()` reflects current federal law:
//! IRC 469(i) special allowance, IRC 1(h)(1)(E) unrecaptured section 1250
//! rate, IRC 1411 NIIT, and the IRC 168(k) bonus phase-down.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::deal::investor::FilingStatus;
use crate::types::{Money, Rate};

/// Active-participation special allowance and its phase-out band.
///
/// The allowance is reduced linearly from `max_allowance` at
/// `phase_out_floor` to zero at `phase_out_ceiling`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialAllowanceRule {
    pub max_allowance: Money,
    pub phase_out_floor: Money,
    pub phase_out_ceiling: Money,
}

impl SpecialAllowanceRule {
    /// Allowance available to a taxpayer with the given AGI.
    pub fn allowance_for(&self, agi: Money) -> Money {
        if agi <= self.phase_out_floor {
            return self.max_allowance;
        }
        if agi >= self.phase_out_ceiling {
            return Decimal::ZERO;
        }
        let band = self.phase_out_ceiling - self.phase_out_floor;
        if band <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let reduction = (agi - self.phase_out_floor) * self.max_allowance / band;
        (self.max_allowance - reduction).max(Decimal::ZERO)
    }
}

/// NIIT modified-AGI thresholds by filing status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NiitThresholds {
    pub single: Money,
    pub married_filing_jointly: Money,
    pub married_filing_separately: Money,
    pub head_of_household: Money,
}

impl NiitThresholds {
    pub fn for_status(&self, status: FilingStatus) -> Money {
        match status {
            FilingStatus::Single => self.single,
            FilingStatus::MarriedFilingJointly => self.married_filing_jointly,
            FilingStatus::MarriedFilingSeparately => self.married_filing_separately,
            FilingStatus::HeadOfHousehold => self.head_of_household,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxRules {
    /// Special allowance for single, joint and head-of-household filers
    pub special_allowance: SpecialAllowanceRule,
    /// Special allowance for married filing separately (living apart)
    pub special_allowance_separate: SpecialAllowanceRule,
    /// Rate on unrecaptured section 1250 gain
    pub recapture_rate: Rate,
    pub niit_rate: Rate,
    pub niit_thresholds: NiitThresholds,
    /// Bonus depreciation rate keyed by placed-in-service year
    pub bonus_depreciation: BTreeMap<i32, Rate>,
}

impl Default for TaxRules {
    fn default() -> Self {
        let bonus_depreciation = BTreeMap::from([
            (2022, dec!(1.00)),
            (2023, dec!(0.80)),
            (2024, dec!(0.60)),
            (2025, dec!(1.00)),
            (2026, dec!(1.00)),
            (2027, dec!(0.80)),
        ]);

        TaxRules {
            special_allowance: SpecialAllowanceRule {
                max_allowance: dec!(25000),
                phase_out_floor: dec!(100000),
                phase_out_ceiling: dec!(150000),
            },
            special_allowance_separate: SpecialAllowanceRule {
                max_allowance: dec!(12500),
                phase_out_floor: dec!(50000),
                phase_out_ceiling: dec!(75000),
            },
            recapture_rate: dec!(0.25),
            niit_rate: dec!(0.038),
            niit_thresholds: NiitThresholds {
                single: dec!(200000),
                married_filing_jointly: dec!(250000),
                married_filing_separately: dec!(125000),
                head_of_household: dec!(200000),
            },
            bonus_depreciation,
        }
    }
}

impl TaxRules {
    pub fn special_allowance_rule(&self, status: FilingStatus) -> &SpecialAllowanceRule {
        match status {
            FilingStatus::MarriedFilingSeparately => &self.special_allowance_separate,
            _ => &self.special_allowance,
        }
    }

    /// Bonus rate for property placed in service in `year`; zero when the
    /// year is not in the table.
    pub fn bonus_rate_for_year(&self, year: i32) -> Rate {
        self.bonus_depreciation
            .get(&year)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}
