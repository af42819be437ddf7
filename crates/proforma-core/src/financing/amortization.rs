use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::types::{round_money, Money, Rate};
use crate::ProformaResult;

/// Longest loan term accepted, in years.
pub const MAX_LOAN_TERM_YEARS: u32 = 50;

/// How the loan repays principal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmortizationType {
    /// Level monthly payment that retires the loan over the term
    #[default]
    Amortizing,
    /// Interest only, with the full principal as a balloon in the last period
    InterestOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_years: u32,
    #[serde(default)]
    pub amortization: AmortizationType,
    /// Months between closing and the first payment
    #[serde(default)]
    pub first_payment_offset_months: u32,
}

/// A single monthly payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationPayment {
    pub period: u32,
    /// Hold year in which this payment falls (1-indexed)
    pub year: u32,
    pub payment: Money,
    pub principal: Money,
    pub interest: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub payments: Vec<AmortizationPayment>,
    pub periodic_payment: Money,
    pub total_interest: Money,
    pub total_principal: Money,
}

/// Principal and interest rolled up by hold year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtYear {
    pub year: u32,
    pub principal: Money,
    pub interest: Money,
    pub debt_service: Money,
    pub ending_balance: Money,
}

impl DebtYear {
    pub fn no_debt(year: u32) -> Self {
        DebtYear {
            year,
            principal: Decimal::ZERO,
            interest: Decimal::ZERO,
            debt_service: Decimal::ZERO,
            ending_balance: Decimal::ZERO,
        }
    }
}

fn validate_terms(terms: &LoanTerms) -> ProformaResult<()> {
    if terms.principal <= Decimal::ZERO {
        return Err(ProformaError::InvalidTerm {
            field: "principal".into(),
            reason: "Loan principal must be positive".into(),
        });
    }
    if terms.annual_rate <= Decimal::ZERO {
        return Err(ProformaError::InvalidTerm {
            field: "annual_rate".into(),
            reason: "Interest rate must be positive".into(),
        });
    }
    if terms.annual_rate > Decimal::ONE {
        return Err(ProformaError::InvalidTerm {
            field: "annual_rate".into(),
            reason: "Interest rate cannot exceed 100%".into(),
        });
    }
    if terms.term_years == 0 {
        return Err(ProformaError::InvalidTerm {
            field: "term_years".into(),
            reason: "Loan term must be at least 1 year".into(),
        });
    }
    if terms.term_years > MAX_LOAN_TERM_YEARS {
        return Err(ProformaError::InvalidTerm {
            field: "term_years".into(),
            reason: format!("Loan term cannot exceed {MAX_LOAN_TERM_YEARS} years"),
        });
    }
    Ok(())
}

/// Fixed monthly payment: P * r(1+r)^n / ((1+r)^n - 1), rounded to cents.
pub fn monthly_payment(principal: Money, annual_rate: Rate, term_years: u32) -> ProformaResult<Money> {
    validate_terms(&LoanTerms {
        principal,
        annual_rate,
        term_years,
        amortization: AmortizationType::Amortizing,
        first_payment_offset_months: 0,
    })?;

    let r = annual_rate / dec!(12);
    let n = u64::from(term_years) * 12;
    let factor = (Decimal::ONE + r)
        .checked_powu(n)
        .ok_or_else(|| ProformaError::InvalidTerm {
            field: "term_years".into(),
            reason: "Compounding over the term overflows".into(),
        })?;
    let denominator = factor - Decimal::ONE;

    if denominator.is_zero() {
        return Err(ProformaError::InvalidTerm {
            field: "annual_rate".into(),
            reason: "Rate too small to amortise over the term".into(),
        });
    }

    Ok(round_money(principal * r * factor / denominator))
}

/// Full-term monthly amortisation schedule.
///
/// Interest is rounded to cents each period and the final payment absorbs
/// whatever balance remains, so principal portions always sum to the
/// original principal exactly.
pub fn amortization_schedule(terms: &LoanTerms) -> ProformaResult<AmortizationSchedule> {
    validate_terms(terms)?;

    let r = terms.annual_rate / dec!(12);
    let n_periods = terms.term_years * 12;
    let periodic_payment = match terms.amortization {
        AmortizationType::Amortizing => {
            monthly_payment(terms.principal, terms.annual_rate, terms.term_years)?
        }
        AmortizationType::InterestOnly => round_money(terms.principal * r),
    };

    let mut payments = Vec::with_capacity(n_periods as usize);
    let mut balance = terms.principal;
    let mut total_interest = Decimal::ZERO;
    let mut total_principal = Decimal::ZERO;

    for period in 1..=n_periods {
        let interest = round_money(balance * r);
        let scheduled_principal = match terms.amortization {
            AmortizationType::Amortizing => periodic_payment - interest,
            AmortizationType::InterestOnly => Decimal::ZERO,
        };

        let principal = if period == n_periods || scheduled_principal > balance {
            balance
        } else {
            scheduled_principal
        };

        balance -= principal;
        total_interest += interest;
        total_principal += principal;

        payments.push(AmortizationPayment {
            period,
            year: (terms.first_payment_offset_months + period - 1) / 12 + 1,
            payment: interest + principal,
            principal,
            interest,
            balance,
        });

        if balance.is_zero() {
            break;
        }
    }

    Ok(AmortizationSchedule {
        payments,
        periodic_payment,
        total_interest,
        total_principal,
    })
}

/// Roll the schedule up into exactly `hold_years` rows. Years after the
/// loan is retired report zeros; years before the first payment carry the
/// original principal as their ending balance.
pub fn yearly_summary(schedule: &AmortizationSchedule, principal: Money, hold_years: u32) -> Vec<DebtYear> {
    let mut balance = principal;
    (1..=hold_years)
        .map(|year| {
            let mut row = DebtYear::no_debt(year);
            for p in schedule.payments.iter().filter(|p| p.year == year) {
                row.principal += p.principal;
                row.interest += p.interest;
                row.debt_service += p.payment;
                balance = p.balance;
            }
            row.ending_balance = balance;
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thirty_year(principal: Money) -> LoanTerms {
        LoanTerms {
            principal,
            annual_rate: dec!(0.07),
            term_years: 30,
            amortization: AmortizationType::Amortizing,
            first_payment_offset_months: 0,
        }
    }

    #[test]
    fn test_monthly_payment_reference() {
        // $375,000 at 7% over 30 years: $2,494.88/month
        let pmt = monthly_payment(dec!(375000), dec!(0.07), 30).unwrap();
        assert_eq!(pmt, dec!(2494.88));
    }

    #[test]
    fn test_principal_sums_to_original() {
        for principal in [dec!(375000), dec!(123456.78), dec!(1000.01)] {
            let schedule = amortization_schedule(&thirty_year(principal)).unwrap();
            let sum: Money = schedule.payments.iter().map(|p| p.principal).sum();
            assert_eq!(sum, principal);
            assert_eq!(schedule.total_principal, principal);
            assert_eq!(schedule.payments.last().unwrap().balance, Decimal::ZERO);
        }
    }

    #[test]
    fn test_final_payment_absorbs_rounding() {
        let schedule = amortization_schedule(&thirty_year(dec!(375000))).unwrap();
        assert_eq!(schedule.payments.len(), 360);
        let last = schedule.payments.last().unwrap();
        // Residual rounding is cents, not dollars
        assert!((last.payment - schedule.periodic_payment).abs() < dec!(5));
    }

    #[test]
    fn test_first_payment_interest() {
        let schedule = amortization_schedule(&thirty_year(dec!(375000))).unwrap();
        // 375,000 * 0.07 / 12 = 2,187.50
        assert_eq!(schedule.payments[0].interest, dec!(2187.50));
        assert_eq!(schedule.payments[0].principal, dec!(307.38));
    }

    #[test]
    fn test_yearly_summary_has_exactly_hold_years() {
        let terms = thirty_year(dec!(375000));
        let schedule = amortization_schedule(&terms).unwrap();
        let years = yearly_summary(&schedule, terms.principal, 5);
        assert_eq!(years.len(), 5);
        assert_eq!(years[0].debt_service, dec!(2494.88) * dec!(12));
        assert_eq!(years[0].principal + years[0].interest, years[0].debt_service);
        assert!(years[4].ending_balance < years[0].ending_balance);
    }

    #[test]
    fn test_summary_past_payoff_is_zero() {
        let terms = LoanTerms {
            term_years: 2,
            ..thirty_year(dec!(10000))
        };
        let schedule = amortization_schedule(&terms).unwrap();
        let years = yearly_summary(&schedule, terms.principal, 4);
        assert_eq!(years[1].ending_balance, Decimal::ZERO);
        assert_eq!(years[2].debt_service, Decimal::ZERO);
        assert_eq!(years[3].ending_balance, Decimal::ZERO);
    }

    #[test]
    fn test_first_payment_offset_shortens_year_one() {
        let terms = LoanTerms {
            first_payment_offset_months: 2,
            ..thirty_year(dec!(375000))
        };
        let schedule = amortization_schedule(&terms).unwrap();
        let years = yearly_summary(&schedule, terms.principal, 2);
        assert_eq!(schedule.payments.iter().filter(|p| p.year == 1).count(), 10);
        assert_eq!(years[0].debt_service, dec!(2494.88) * dec!(10));
        assert_eq!(years[1].debt_service, dec!(2494.88) * dec!(12));
    }

    #[test]
    fn test_interest_only_balloon() {
        let terms = LoanTerms {
            amortization: AmortizationType::InterestOnly,
            term_years: 5,
            ..thirty_year(dec!(100000))
        };
        let schedule = amortization_schedule(&terms).unwrap();
        assert_eq!(schedule.periodic_payment, dec!(583.33));
        let sum: Money = schedule.payments.iter().map(|p| p.principal).sum();
        assert_eq!(sum, dec!(100000));
        assert_eq!(schedule.payments[0].principal, Decimal::ZERO);
        assert_eq!(schedule.payments.last().unwrap().principal, dec!(100000));
    }

    #[test]
    fn test_non_positive_inputs_rejected() {
        assert!(matches!(
            monthly_payment(Decimal::ZERO, dec!(0.07), 30),
            Err(ProformaError::InvalidTerm { .. })
        ));
        assert!(matches!(
            monthly_payment(dec!(1000), Decimal::ZERO, 30),
            Err(ProformaError::InvalidTerm { .. })
        ));
        assert!(matches!(
            monthly_payment(dec!(1000), dec!(0.07), 0),
            Err(ProformaError::InvalidTerm { .. })
        ));
    }

    #[test]
    fn test_excessive_terms_rejected() {
        let mut terms = thirty_year(dec!(375000));
        terms.term_years = 1000;
        match amortization_schedule(&terms) {
            Err(ProformaError::InvalidTerm { field, .. }) => assert_eq!(field, "term_years"),
            other => panic!("Expected InvalidTerm, got {other:?}"),
        }

        let mut terms = thirty_year(dec!(375000));
        terms.annual_rate = dec!(5);
        match amortization_schedule(&terms) {
            Err(ProformaError::InvalidTerm { field, .. }) => assert_eq!(field, "annual_rate"),
            other => panic!("Expected InvalidTerm, got {other:?}"),
        }
    }

    #[test]
    fn test_longest_term_at_highest_rate_is_computed() {
        let payment = monthly_payment(dec!(375000), Decimal::ONE, MAX_LOAN_TERM_YEARS).unwrap();
        // principal share is below a cent over 600 periods
        assert_eq!(payment, dec!(31250.00));
    }
}
