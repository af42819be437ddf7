use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::types::{round_ratio, Money, Multiple, Rate};
use crate::ProformaResult;

/// Lowest discount rate searched for an IRR.
const IRR_LOWER_BOUND: Decimal = dec!(-0.99);
/// Highest discount rate searched for an IRR.
const IRR_UPPER_BOUND: Decimal = dec!(10);
const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const BRACKET_WIDTH_THRESHOLD: Decimal = dec!(0.0000000001);
const MAX_IRR_ITERATIONS: u32 = 200;

/// Net Present Value of a series of annual cash flows, the first at t = 0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ProformaResult<Money> {
    if rate <= dec!(-1) {
        return Err(ProformaError::assumption(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }
    checked_npv(rate, cash_flows).ok_or_else(|| {
        ProformaError::assumption("rate", format!("NPV overflows at a discount rate of {rate}"))
    })
}

/// NPV with checked arithmetic; `None` if any step overflows or the
/// discount factor underflows to zero.
fn checked_npv(rate: Rate, cash_flows: &[Money]) -> Option<Money> {
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut result = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        if discount.is_zero() {
            return None;
        }
        result = result.checked_add(cf.checked_div(discount)?)?;
    }
    Some(result)
}

/// Candidate rates scanned for a sign change, ascending.
fn search_grid() -> Vec<Rate> {
    let mut grid = vec![IRR_LOWER_BOUND, dec!(-0.95)];
    // -0.90 to 1.00 in 5% steps
    grid.extend((-18..=20).map(|i| Decimal::from(i) * dec!(0.05)));
    grid.extend([
        dec!(1.25),
        dec!(1.5),
        dec!(2),
        dec!(3),
        dec!(5),
        dec!(7.5),
        IRR_UPPER_BOUND,
    ]);
    grid
}

/// Internal Rate of Return over a fixed bracket.
///
/// Scans the bracket for the lowest interval where NPV changes sign, then
/// narrows it with secant steps, falling back to bisection every other
/// iteration so the interval always shrinks. Fails with `NoRealIrr` when
/// NPV never changes sign inside the bracket.
pub fn irr(cash_flows: &[Money]) -> ProformaResult<Rate> {
    let no_real_irr = || ProformaError::NoRealIrr {
        periods: cash_flows.len(),
    };

    if cash_flows.len() < 2 {
        return Err(no_real_irr());
    }
    let has_inflow = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    let has_outflow = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    if !has_inflow || !has_outflow {
        return Err(no_real_irr());
    }

    let (mut lo, mut f_lo, mut hi, mut f_hi) = find_bracket(cash_flows).ok_or_else(no_real_irr)?;
    if f_lo.is_zero() {
        return Ok(lo);
    }
    if f_hi.is_zero() {
        return Ok(hi);
    }

    for i in 0..MAX_IRR_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let secant = f_hi
            .checked_sub(f_lo)
            .filter(|d| !d.is_zero())
            .and_then(|d| f_lo.checked_mul(hi - lo)?.checked_div(d))
            .map(|step| lo - step)
            .filter(|x| *x > lo && *x < hi);

        let candidate = match secant {
            Some(x) if i % 2 == 0 => x,
            _ => mid,
        };
        let (x, fx) = match checked_npv(candidate, cash_flows) {
            Some(fx) => (candidate, fx),
            None => match checked_npv(mid, cash_flows) {
                Some(fx) => (mid, fx),
                None => return Ok(mid),
            },
        };

        if fx.abs() < CONVERGENCE_THRESHOLD {
            return Ok(x);
        }
        if fx.is_sign_negative() == f_lo.is_sign_negative() {
            lo = x;
            f_lo = fx;
        } else {
            hi = x;
            f_hi = fx;
        }
        if hi - lo < BRACKET_WIDTH_THRESHOLD {
            return Ok((lo + hi) / dec!(2));
        }
    }

    Ok((lo + hi) / dec!(2))
}

/// First adjacent pair of usable grid rates whose NPVs straddle zero.
fn find_bracket(cash_flows: &[Money]) -> Option<(Rate, Money, Rate, Money)> {
    let mut previous: Option<(Rate, Money)> = None;
    for rate in search_grid() {
        let value = match checked_npv(rate, cash_flows) {
            Some(v) => v,
            None => continue,
        };
        if value.is_zero() {
            return Some((rate, value, rate, value));
        }
        if let Some((prev_rate, prev_value)) = previous {
            if prev_value.is_sign_negative() != value.is_sign_negative() {
                return Some((prev_rate, prev_value, rate, value));
            }
        }
        previous = Some((rate, value));
    }
    None
}

/// Total distributions divided by total equity invested.
///
/// Every positive flow counts as a distribution and every negative flow,
/// including a later operating shortfall, as invested equity. This is a
/// gross MOIC, not net flows after year 0 over the initial outlay:
/// `[-100, -10, 150]` gives 150 / 110, not 140 / 100. `None` when nothing
/// was invested.
pub fn equity_multiple(cash_flows: &[Money]) -> Option<Multiple> {
    let invested: Money = cash_flows
        .iter()
        .filter(|cf| **cf < Decimal::ZERO)
        .map(|cf| cf.abs())
        .sum();
    if invested.is_zero() {
        return None;
    }
    let distributions: Money = cash_flows.iter().filter(|cf| **cf > Decimal::ZERO).sum();
    Some(distributions / invested)
}

/// IRR as reported: a rate, or the explicit absence of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum IrrOutcome {
    Rate(Rate),
    NoRealIrr,
}

impl IrrOutcome {
    /// Solve for the IRR, turning a missing root into the sentinel.
    pub fn solve(cash_flows: &[Money]) -> ProformaResult<IrrOutcome> {
        match irr(cash_flows) {
            Ok(rate) => Ok(IrrOutcome::Rate(round_ratio(rate))),
            Err(ProformaError::NoRealIrr { .. }) => Ok(IrrOutcome::NoRealIrr),
            Err(e) => Err(e),
        }
    }

    pub fn rate(&self) -> Option<Rate> {
        match self {
            IrrOutcome::Rate(r) => Some(*r),
            IrrOutcome::NoRealIrr => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    pub irr: IrrOutcome,
    pub equity_multiple: Option<Multiple>,
    pub total_invested: Money,
    pub total_distributions: Money,
    pub net_profit: Money,
}

/// IRR and equity multiple for one cash-flow series.
pub fn return_metrics(cash_flows: &[Money]) -> ProformaResult<ReturnMetrics> {
    let total_invested: Money = cash_flows
        .iter()
        .filter(|cf| **cf < Decimal::ZERO)
        .map(|cf| cf.abs())
        .sum();
    let total_distributions: Money = cash_flows.iter().filter(|cf| **cf > Decimal::ZERO).sum();

    Ok(ReturnMetrics {
        irr: IrrOutcome::solve(cash_flows)?,
        equity_multiple: equity_multiple(cash_flows).map(round_ratio),
        total_invested,
        total_distributions,
        net_profit: total_distributions - total_invested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 = -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(Decimal::ZERO, &cfs).unwrap(), dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_one() {
        assert!(npv(dec!(-1), &[dec!(-100), dec!(110)]).is_err());
    }

    #[test]
    fn test_irr_single_period() {
        let rate = irr(&[dec!(-1000), dec!(1100)]).unwrap();
        assert_eq!(round_ratio(rate), dec!(0.1000));
    }

    #[test]
    fn test_irr_annuity() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let rate = irr(&cfs).unwrap();
        assert_eq!(round_ratio(rate), dec!(0.0970));
        assert!(npv(rate, &cfs).unwrap().abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_two_period() {
        // 100 = 60/(1+r) + 60/(1+r)^2
        let rate = irr(&[dec!(-100), dec!(60), dec!(60)]).unwrap();
        assert_eq!(round_ratio(rate), dec!(0.1307));
    }

    #[test]
    fn test_irr_negative_rate() {
        // Half the money back after one year
        let rate = irr(&[dec!(-1000), dec!(500)]).unwrap();
        assert_eq!(round_ratio(rate), dec!(-0.5000));
    }

    #[test]
    fn test_irr_all_outflows_has_no_root() {
        let err = irr(&[dec!(-1000), dec!(-100), dec!(-50)]).unwrap_err();
        assert!(matches!(err, ProformaError::NoRealIrr { periods: 3 }));
    }

    #[test]
    fn test_irr_never_breaks_even() {
        // NPV = -1000 + 200x - 500x^2 stays below zero for every rate
        let outcome = IrrOutcome::solve(&[dec!(-1000), dec!(200), dec!(-500)]).unwrap();
        assert_eq!(outcome, IrrOutcome::NoRealIrr);
        assert_eq!(outcome.rate(), None);
    }

    #[test]
    fn test_equity_multiple() {
        assert_eq!(
            equity_multiple(&[dec!(-100000), dec!(5000), dec!(145000)]),
            Some(dec!(1.5))
        );
        // A later capital call counts as invested equity
        assert_eq!(
            equity_multiple(&[dec!(-100000), dec!(-20000), dec!(180000)]),
            Some(dec!(1.5))
        );
        assert_eq!(
            equity_multiple(&[dec!(-100), dec!(-10), dec!(150)]).map(round_ratio),
            Some(dec!(1.3636))
        );
        assert_eq!(equity_multiple(&[dec!(100), dec!(50)]), None);
    }

    #[test]
    fn test_return_metrics() {
        let metrics = return_metrics(&[dec!(-1000), dec!(1100)]).unwrap();
        assert_eq!(metrics.irr, IrrOutcome::Rate(dec!(0.1000)));
        assert_eq!(metrics.equity_multiple, Some(dec!(1.1000)));
        assert_eq!(metrics.net_profit, dec!(100));
    }
}
