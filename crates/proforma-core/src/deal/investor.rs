use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::rules::TaxRules;
use crate::error::ProformaError;
use crate::types::{Money, Rate};
use crate::ProformaResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Single,
    MarriedFilingJointly,
    MarriedFilingSeparately,
    HeadOfHousehold,
}

/// The investor's tax situation for the life of the deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestorTaxProfile {
    pub filing_status: FilingStatus,
    /// Adjusted gross income before this deal
    pub agi: Money,
    /// Federal marginal rate on ordinary income
    pub marginal_ordinary_rate: Rate,
    /// Federal long-term capital gains rate
    pub ltcg_rate: Rate,
    /// Marginal state income tax rate
    pub state_rate: Rate,
    /// Whether the 3.8% net investment income tax can apply at all
    pub niit_applicable: bool,
    /// IRC 469(c)(7) real estate professional status
    #[serde(default)]
    pub real_estate_professional: bool,
    /// Passive income from other activities that rental losses may absorb
    #[serde(default)]
    pub other_passive_income: Money,
    #[serde(default)]
    pub rules: TaxRules,
}

impl InvestorTaxProfile {
    pub fn validate(&self) -> ProformaResult<()> {
        if self.agi < Decimal::ZERO {
            return Err(ProformaError::assumption("agi", "AGI cannot be negative"));
        }
        if self.other_passive_income < Decimal::ZERO {
            return Err(ProformaError::assumption(
                "other_passive_income",
                "Other passive income cannot be negative",
            ));
        }
        for (field, rate) in [
            ("marginal_ordinary_rate", self.marginal_ordinary_rate),
            ("ltcg_rate", self.ltcg_rate),
            ("state_rate", self.state_rate),
            ("rules.recapture_rate", self.rules.recapture_rate),
            ("rules.niit_rate", self.rules.niit_rate),
        ] {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(ProformaError::assumption(
                    field,
                    "Tax rate must be between 0 and 1",
                ));
            }
        }
        Ok(())
    }

    /// Federal marginal plus state rate; the rate at which operating income
    /// and ordinary deductions move the investor's tax bill.
    pub fn combined_ordinary_rate(&self) -> Rate {
        self.marginal_ordinary_rate + self.state_rate
    }

    /// Rental loss deductible under the active-participation exception.
    /// Real estate professionals do not need it and get zero here.
    pub fn special_allowance(&self) -> Money {
        if self.real_estate_professional {
            return Decimal::ZERO;
        }
        self.rules
            .special_allowance_rule(self.filing_status)
            .allowance_for(self.agi)
    }

    pub fn niit_threshold(&self) -> Money {
        self.rules.niit_thresholds.for_status(self.filing_status)
    }
}
