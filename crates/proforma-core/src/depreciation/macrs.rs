//! IRS Publication 946 GDS percentage tables, half-year convention
//! (Table A-1). 5- and 7-year property use 200% declining balance, 15-year
//! property uses 150% declining balance.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::depreciation::schedule::AssetClass;

const FIVE_YEAR: [Decimal; 6] = [
    dec!(0.2000),
    dec!(0.3200),
    dec!(0.1920),
    dec!(0.1152),
    dec!(0.1152),
    dec!(0.0576),
];

const SEVEN_YEAR: [Decimal; 8] = [
    dec!(0.1429),
    dec!(0.2449),
    dec!(0.1749),
    dec!(0.1249),
    dec!(0.0893),
    dec!(0.0892),
    dec!(0.0893),
    dec!(0.0446),
];

const FIFTEEN_YEAR: [Decimal; 16] = [
    dec!(0.0500),
    dec!(0.0950),
    dec!(0.0855),
    dec!(0.0770),
    dec!(0.0693),
    dec!(0.0623),
    dec!(0.0590),
    dec!(0.0590),
    dec!(0.0591),
    dec!(0.0590),
    dec!(0.0591),
    dec!(0.0590),
    dec!(0.0591),
    dec!(0.0590),
    dec!(0.0591),
    dec!(0.0295),
];

/// Table percentages for a short-life class; empty for residential
/// property, which is never depreciated from these tables.
pub fn table_for(class: AssetClass) -> &'static [Decimal] {
    match class {
        AssetClass::FiveYear => &FIVE_YEAR,
        AssetClass::SevenYear => &SEVEN_YEAR,
        AssetClass::FifteenYear => &FIFTEEN_YEAR,
        AssetClass::Residential => &[],
    }
}

/// Table rate for recovery year `year` (1-indexed); zero past the table.
pub fn rate_for(class: AssetClass, year: u32) -> Decimal {
    let table = table_for(class);
    match year.checked_sub(1) {
        Some(idx) => table.get(idx as usize).copied().unwrap_or(Decimal::ZERO),
        None => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_sum_to_one() {
        for class in [AssetClass::FiveYear, AssetClass::SevenYear, AssetClass::FifteenYear] {
            let sum: Decimal = table_for(class).iter().sum();
            assert_eq!(sum, Decimal::ONE, "{class:?} table sums to {sum}");
        }
    }

    #[test]
    fn test_rate_lookup_bounds() {
        assert_eq!(rate_for(AssetClass::FiveYear, 1), dec!(0.20));
        assert_eq!(rate_for(AssetClass::FiveYear, 7), Decimal::ZERO);
        assert_eq!(rate_for(AssetClass::FiveYear, 0), Decimal::ZERO);
        assert_eq!(rate_for(AssetClass::Residential, 1), Decimal::ZERO);
    }
}
