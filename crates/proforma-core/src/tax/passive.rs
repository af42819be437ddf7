use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::InvestorTaxProfile;
use crate::types::{round_money, Money};

/// Passive losses disallowed in earlier years and carried forward.
///
/// Threaded by value through the year fold. The balance only falls when
/// passive income absorbs it or when the property is sold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendedLossState {
    pub balance: Money,
}

impl SuspendedLossState {
    pub fn new(balance: Money) -> Self {
        SuspendedLossState { balance }
    }

    /// Release the whole balance, leaving nothing suspended.
    pub fn release(self) -> (Money, SuspendedLossState) {
        (self.balance, SuspendedLossState::default())
    }
}

/// One year of the passive-activity ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveActivityEntry {
    pub year: u32,
    /// NOI less mortgage interest and depreciation; negative is a loss
    pub rental_income: Money,
    pub other_passive_income: Money,
    pub suspended_in: Money,
    /// Suspended losses absorbed by this year's net passive income
    pub offset_used: Money,
    /// Loss deducted against non-passive income this year
    pub deductible_loss: Money,
    pub suspended_added: Money,
    pub suspended_out: Money,
    /// Change in the investor's taxable income caused by the deal
    pub taxable_income: Money,
    /// Positive is tax owed, negative is a tax saving
    pub tax_liability: Money,
}

pub fn taxable_rental_income(noi: Money, interest: Money, depreciation: Money) -> Money {
    noi - interest - depreciation
}

/// Apply IRC 469 to one year's rental result.
///
/// A real estate professional deducts the loss in full. Otherwise rental
/// income is netted with the investor's other passive income: a net gain
/// is first sheltered by suspended losses, a net loss is deductible up to
/// the active-participation allowance and the rest is suspended.
pub fn apply_passive_rules(
    year: u32,
    rental_income: Money,
    profile: &InvestorTaxProfile,
    state: SuspendedLossState,
) -> (PassiveActivityEntry, SuspendedLossState) {
    let suspended_in = state.balance;
    let other_passive = profile.other_passive_income;

    let (offset_used, deductible_loss, suspended_added, taxable_income) =
        if profile.real_estate_professional {
            let deductible = (-rental_income).max(Decimal::ZERO);
            (Decimal::ZERO, deductible, Decimal::ZERO, rental_income)
        } else {
            let net_passive = rental_income + other_passive;
            if net_passive >= Decimal::ZERO {
                let offset = suspended_in.min(net_passive);
                (offset, Decimal::ZERO, Decimal::ZERO, rental_income - offset)
            } else {
                let net_loss = -net_passive;
                let deductible = net_loss.min(profile.special_allowance());
                (
                    Decimal::ZERO,
                    deductible,
                    net_loss - deductible,
                    Decimal::ZERO - other_passive - deductible,
                )
            }
        };

    let next = SuspendedLossState::new(suspended_in - offset_used + suspended_added);
    let tax_liability = round_money(taxable_income * profile.combined_ordinary_rate());

    let entry = PassiveActivityEntry {
        year,
        rental_income,
        other_passive_income: other_passive,
        suspended_in,
        offset_used,
        deductible_loss,
        suspended_added,
        suspended_out: next.balance,
        taxable_income,
        tax_liability,
    };
    (entry, next)
}
