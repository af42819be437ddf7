use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::deal::InvestorTaxProfile;
use crate::depreciation::ClassAmounts;
use crate::error::ProformaError;
use crate::tax::passive::SuspendedLossState;
use crate::types::{round_money, Money, Rate};
use crate::ProformaResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispositionInput {
    pub sale_year: u32,
    pub sale_price: Money,
    pub selling_costs_pct: Rate,
    /// Loan balance retired at closing
    pub loan_payoff: Money,
    /// Purchase price, closing costs and capitalised rehab
    pub original_basis: Money,
    pub accumulated_depreciation: ClassAmounts,
    pub suspended: SuspendedLossState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispositionResult {
    pub sale_year: u32,
    pub sale_price: Money,
    pub selling_costs: Money,
    pub net_sale_price: Money,
    pub loan_payoff: Money,
    pub gross_equity_proceeds: Money,
    pub original_basis: Money,
    pub accumulated_depreciation: Money,
    pub depreciation_by_class: ClassAmounts,
    pub adjusted_basis: Money,
    /// Negative on a sale below adjusted basis
    pub gain_on_sale: Money,
    pub depreciation_recapture: Money,
    pub capital_gain: Money,
    /// Ordinary section 1231 loss when the sale is below basis
    pub loss_on_sale: Money,
    pub suspended_loss_released: Money,
    pub release_against_recapture: Money,
    pub release_against_capital_gain: Money,
    pub release_against_ordinary_income: Money,
    pub recapture_tax: Money,
    pub capital_gains_tax: Money,
    pub niit: Money,
    pub state_tax: Money,
    /// Tax saved on ordinary income by the released losses and any 1231 loss
    pub ordinary_income_tax_benefit: Money,
    pub total_tax: Money,
    pub after_tax_proceeds: Money,
    /// Difference in total tax with and without the release
    pub tax_benefit_from_release: Money,
    pub suspended_after_sale: SuspendedLossState,
}

/// Tax components on the sale for a given split of taxable gain.
#[derive(Debug, Clone, Copy, Default)]
struct SaleTaxes {
    recapture: Money,
    capital_gains: Money,
    niit: Money,
    state: Money,
    ordinary_benefit: Money,
}

impl SaleTaxes {
    fn total(&self) -> Money {
        self.recapture + self.capital_gains + self.niit + self.state - self.ordinary_benefit
    }
}

fn sale_taxes(
    taxable_recapture: Money,
    taxable_capital_gain: Money,
    ordinary_deduction: Money,
    profile: &InvestorTaxProfile,
) -> SaleTaxes {
    let rules = &profile.rules;
    let taxable_gain = taxable_recapture + taxable_capital_gain;

    // NIIT falls on the smaller of the gain and MAGI above the threshold,
    // with the gain itself counted in MAGI.
    let niit = if profile.niit_applicable && taxable_gain > Decimal::ZERO {
        let excess = (profile.agi + taxable_gain - profile.niit_threshold()).max(Decimal::ZERO);
        round_money(taxable_gain.min(excess) * rules.niit_rate)
    } else {
        Decimal::ZERO
    };

    SaleTaxes {
        recapture: round_money(taxable_recapture * rules.recapture_rate),
        capital_gains: round_money(taxable_capital_gain * profile.ltcg_rate),
        niit,
        state: round_money(taxable_gain.max(Decimal::ZERO) * profile.state_rate),
        ordinary_benefit: round_money(ordinary_deduction * profile.combined_ordinary_rate()),
    }
}

/// Analyse the sale of the property at the end of the hold.
///
/// Gain up to accumulated depreciation is unrecaptured section 1250 gain;
/// the rest is long-term capital gain. The suspended-loss balance is
/// released in full: it reduces recapture first, then capital gain, and
/// any excess offsets ordinary income.
pub fn analyze_disposition(
    input: &DispositionInput,
    profile: &InvestorTaxProfile,
) -> ProformaResult<DispositionResult> {
    if input.sale_price < Decimal::ZERO {
        return Err(ProformaError::assumption(
            "sale_price",
            "Sale price cannot be negative",
        ));
    }

    let selling_costs = round_money(input.sale_price * input.selling_costs_pct);
    let net_sale_price = input.sale_price - selling_costs;
    let gross_equity_proceeds = net_sale_price - input.loan_payoff;

    let accumulated_depreciation = input.accumulated_depreciation.total();
    let adjusted_basis = input.original_basis - accumulated_depreciation;
    if adjusted_basis < Decimal::ZERO {
        return Err(ProformaError::NegativeBasis { adjusted_basis });
    }

    let gain_on_sale = net_sale_price - adjusted_basis;
    let (depreciation_recapture, capital_gain, loss_on_sale) = if gain_on_sale > Decimal::ZERO {
        let recapture = gain_on_sale.min(accumulated_depreciation);
        (recapture, gain_on_sale - recapture, Decimal::ZERO)
    } else {
        (Decimal::ZERO, Decimal::ZERO, -gain_on_sale)
    };

    let (released, suspended_after_sale) = input.suspended.release();
    let release_against_recapture = released.min(depreciation_recapture);
    let release_against_capital_gain = (released - release_against_recapture).min(capital_gain);
    let release_against_ordinary_income =
        released - release_against_recapture - release_against_capital_gain;

    let with_release = sale_taxes(
        depreciation_recapture - release_against_recapture,
        capital_gain - release_against_capital_gain,
        release_against_ordinary_income + loss_on_sale,
        profile,
    );
    let without_release = sale_taxes(depreciation_recapture, capital_gain, loss_on_sale, profile);

    let total_tax = with_release.total();
    let tax_benefit_from_release = without_release.total() - total_tax;

    log::debug!(
        "Disposition year {}: gain {}, released {}, total tax {}",
        input.sale_year,
        gain_on_sale,
        released,
        total_tax
    );

    Ok(DispositionResult {
        sale_year: input.sale_year,
        sale_price: input.sale_price,
        selling_costs,
        net_sale_price,
        loan_payoff: input.loan_payoff,
        gross_equity_proceeds,
        original_basis: input.original_basis,
        accumulated_depreciation,
        depreciation_by_class: input.accumulated_depreciation,
        adjusted_basis,
        gain_on_sale,
        depreciation_recapture,
        capital_gain,
        loss_on_sale,
        suspended_loss_released: released,
        release_against_recapture,
        release_against_capital_gain,
        release_against_ordinary_income,
        recapture_tax: with_release.recapture,
        capital_gains_tax: with_release.capital_gains,
        niit: with_release.niit,
        state_tax: with_release.state,
        ordinary_income_tax_benefit: with_release.ordinary_benefit,
        total_tax,
        after_tax_proceeds: gross_equity_proceeds - total_tax,
        tax_benefit_from_release,
        suspended_after_sale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::{FilingStatus, TaxRules};
    use rust_decimal_macros::dec;

    fn profile(agi: Money) -> InvestorTaxProfile {
        InvestorTaxProfile {
            filing_status: FilingStatus::MarriedFilingJointly,
            agi,
            marginal_ordinary_rate: dec!(0.35),
            ltcg_rate: dec!(0.20),
            state_rate: dec!(0.093),
            niit_applicable: true,
            real_estate_professional: false,
            other_passive_income: Decimal::ZERO,
            rules: TaxRules::default(),
        }
    }

    fn sale(suspended: Money) -> DispositionInput {
        DispositionInput {
            sale_year: 5,
            sale_price: dec!(600000),
            selling_costs_pct: dec!(0.06),
            loan_payoff: dec!(350000),
            original_basis: dec!(500000),
            accumulated_depreciation: ClassAmounts {
                residential: dec!(70000),
                ..ClassAmounts::default()
            },
            suspended: SuspendedLossState::new(suspended),
        }
    }

    #[test]
    fn test_gain_split_without_suspended_losses() {
        let result = analyze_disposition(&sale(Decimal::ZERO), &profile(dec!(400000))).unwrap();
        assert_eq!(result.selling_costs, dec!(36000));
        assert_eq!(result.net_sale_price, dec!(564000));
        assert_eq!(result.gross_equity_proceeds, dec!(214000));
        assert_eq!(result.adjusted_basis, dec!(430000));
        assert_eq!(result.gain_on_sale, dec!(134000));
        assert_eq!(result.depreciation_recapture, dec!(70000));
        assert_eq!(result.capital_gain, dec!(64000));
        assert_eq!(result.recapture_tax, dec!(17500));
        assert_eq!(result.capital_gains_tax, dec!(12800));
        // AGI already above the threshold: NIIT on the whole gain
        assert_eq!(result.niit, dec!(5092));
        assert_eq!(result.state_tax, dec!(12462));
        assert_eq!(result.total_tax, dec!(47854));
        assert_eq!(result.after_tax_proceeds, dec!(166146));
        assert_eq!(result.tax_benefit_from_release, Decimal::ZERO);
    }

    #[test]
    fn test_release_reduces_recapture_first() {
        let result = analyze_disposition(&sale(dec!(30000)), &profile(dec!(400000))).unwrap();
        assert_eq!(result.suspended_loss_released, dec!(30000));
        assert_eq!(result.release_against_recapture, dec!(30000));
        assert_eq!(result.release_against_capital_gain, Decimal::ZERO);
        // 40,000 of recapture left at 25%
        assert_eq!(result.recapture_tax, dec!(10000));
        assert!(result.tax_benefit_from_release > Decimal::ZERO);
        assert_eq!(result.suspended_after_sale.balance, Decimal::ZERO);
    }

    #[test]
    fn test_release_larger_than_gain_offsets_ordinary_income() {
        let result = analyze_disposition(&sale(dec!(150000)), &profile(dec!(400000))).unwrap();
        assert_eq!(result.release_against_recapture, dec!(70000));
        assert_eq!(result.release_against_capital_gain, dec!(64000));
        assert_eq!(result.release_against_ordinary_income, dec!(16000));
        assert_eq!(result.recapture_tax, Decimal::ZERO);
        assert_eq!(result.niit, Decimal::ZERO);
        // 16,000 at the combined 44.3% rate
        assert_eq!(result.ordinary_income_tax_benefit, dec!(7088));
        assert_eq!(result.total_tax, dec!(-7088));
    }

    #[test]
    fn test_niit_limited_by_threshold_excess() {
        let result = analyze_disposition(&sale(Decimal::ZERO), &profile(dec!(200000))).unwrap();
        // MAGI 334,000 exceeds 250,000 by 84,000 < 134,000 gain
        assert_eq!(result.niit, dec!(3192));
    }

    #[test]
    fn test_loss_on_sale_is_ordinary() {
        let mut input = sale(Decimal::ZERO);
        input.sale_price = dec!(420000);
        let result = analyze_disposition(&input, &profile(dec!(400000))).unwrap();
        // 394,800 net against 430,000 adjusted basis
        assert_eq!(result.gain_on_sale, dec!(-35200));
        assert_eq!(result.loss_on_sale, dec!(35200));
        assert_eq!(result.depreciation_recapture, Decimal::ZERO);
        assert_eq!(result.total_tax, dec!(-15593.60));
    }

    #[test]
    fn test_over_depreciation_is_rejected() {
        let mut input = sale(Decimal::ZERO);
        input.accumulated_depreciation.residential = dec!(600000);
        assert!(matches!(
            analyze_disposition(&input, &profile(dec!(400000))),
            Err(ProformaError::NegativeBasis { .. })
        ));
    }
}
