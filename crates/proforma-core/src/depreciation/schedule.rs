use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::depreciation::macrs;
use crate::error::ProformaError;
use crate::types::{round_money, Money, Rate};
use crate::ProformaResult;

/// Statutory recovery classes a building's basis can be split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// 27.5-year residential rental property
    Residential,
    /// Personal property: appliances, carpet, fixtures
    FiveYear,
    /// Furniture and similar
    SevenYear,
    /// Land improvements: paving, landscaping, fencing
    FifteenYear,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [
        AssetClass::Residential,
        AssetClass::FiveYear,
        AssetClass::SevenYear,
        AssetClass::FifteenYear,
    ];

    pub fn recovery_years(self) -> Decimal {
        match self {
            AssetClass::Residential => dec!(27.5),
            AssetClass::FiveYear => dec!(5),
            AssetClass::SevenYear => dec!(7),
            AssetClass::FifteenYear => dec!(15),
        }
    }

    /// Bonus depreciation only reaches property with a recovery period
    /// under 20 years.
    pub fn bonus_eligible(self) -> bool {
        self.recovery_years() < dec!(20)
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetClass::Residential => "27.5-year residential",
            AssetClass::FiveYear => "5-year",
            AssetClass::SevenYear => "7-year",
            AssetClass::FifteenYear => "15-year",
        }
    }
}

/// One amount per asset class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassAmounts {
    pub residential: Money,
    pub five_year: Money,
    pub seven_year: Money,
    pub fifteen_year: Money,
}

impl ClassAmounts {
    pub fn get(&self, class: AssetClass) -> Money {
        match class {
            AssetClass::Residential => self.residential,
            AssetClass::FiveYear => self.five_year,
            AssetClass::SevenYear => self.seven_year,
            AssetClass::FifteenYear => self.fifteen_year,
        }
    }

    pub fn set(&mut self, class: AssetClass, value: Money) {
        match class {
            AssetClass::Residential => self.residential = value,
            AssetClass::FiveYear => self.five_year = value,
            AssetClass::SevenYear => self.seven_year = value,
            AssetClass::FifteenYear => self.fifteen_year = value,
        }
    }

    pub fn total(&self) -> Money {
        self.residential + self.five_year + self.seven_year + self.fifteen_year
    }

    pub fn plus(&self, other: &ClassAmounts) -> ClassAmounts {
        ClassAmounts {
            residential: self.residential + other.residential,
            five_year: self.five_year + other.five_year,
            seven_year: self.seven_year + other.seven_year,
            fifteen_year: self.fifteen_year + other.fifteen_year,
        }
    }
}

/// Cost-segregation study: fraction of the depreciable basis moved into
/// each short-life class. The remainder stays residential.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSegregation {
    #[serde(default)]
    pub five_year: Rate,
    #[serde(default)]
    pub seven_year: Rate,
    #[serde(default)]
    pub fifteen_year: Rate,
}

impl CostSegregation {
    pub fn reclassified(&self) -> Rate {
        self.five_year + self.seven_year + self.fifteen_year
    }

    fn validate(&self) -> ProformaResult<()> {
        for (class, pct) in [
            (AssetClass::FiveYear, self.five_year),
            (AssetClass::SevenYear, self.seven_year),
            (AssetClass::FifteenYear, self.fifteen_year),
        ] {
            if pct < Decimal::ZERO {
                return Err(ProformaError::InvalidAllocation {
                    class: class.label().into(),
                    reason: format!("Allocation {pct} cannot be negative"),
                });
            }
        }
        if self.reclassified() > Decimal::ONE {
            return Err(ProformaError::InvalidAllocation {
                class: "cost segregation".into(),
                reason: format!(
                    "Reclassified share {} exceeds the building basis",
                    self.reclassified()
                ),
            });
        }
        Ok(())
    }
}

/// How the 5/7/15-year classes recover their post-bonus basis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortLifeMethod {
    /// Straight-line over the recovery period, half-year convention
    #[default]
    StraightLine,
    /// Pub 946 GDS accelerated percentage tables
    MacrsTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepreciationInput {
    pub building_basis: Money,
    #[serde(default)]
    pub cost_segregation: Option<CostSegregation>,
    #[serde(default)]
    pub bonus_rate: Rate,
    #[serde(default)]
    pub short_life_method: ShortLifeMethod,
    /// Month (1-12) the property was placed in service
    pub placed_in_service_month: u32,
    /// Number of years to schedule
    pub years: u32,
    /// Month of sale in the last scheduled year; `None` means no sale
    #[serde(default)]
    pub disposition_month: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyDepreciation {
    pub year: u32,
    /// Deduction by class, bonus included
    pub deductions: ClassAmounts,
    /// Portion of `total` that is bonus depreciation
    pub bonus: Money,
    pub total: Money,
    pub cumulative: ClassAmounts,
    pub remaining_basis: ClassAmounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepreciationSchedule {
    pub allocated_basis: ClassAmounts,
    pub bonus_by_class: ClassAmounts,
    pub years: Vec<YearlyDepreciation>,
    pub total_depreciation: Money,
}

impl DepreciationSchedule {
    /// Cumulative depreciation by class at the end of `year`.
    pub fn cumulative_through(&self, year: u32) -> ClassAmounts {
        self.years
            .iter()
            .take_while(|y| y.year <= year)
            .last()
            .map(|y| y.cumulative)
            .unwrap_or_default()
    }
}

/// Per-class recovery state carried from one year to the next.
#[derive(Debug, Clone, Copy)]
struct ClassTrack {
    class: AssetClass,
    /// Basis left after bonus, recovered by the regular method
    recovery_base: Money,
    /// Full-year straight-line amount
    annual: Money,
    /// Years of recovery consumed so far (fractional)
    elapsed: Decimal,
    remaining: Money,
    cumulative: Money,
}

/// Build a year-by-year schedule across all asset classes.
///
/// Residential property uses straight-line mid-month; short-life classes use
/// the half-year convention. The final recovery year takes whatever basis
/// remains, so a fully recovered class depreciates exactly its allocation.
pub fn build_depreciation_schedule(input: &DepreciationInput) -> ProformaResult<DepreciationSchedule> {
    validate_input(input)?;

    let allocated_basis = allocate(input.building_basis, input.cost_segregation.as_ref());

    let mut bonus_by_class = ClassAmounts::default();
    let mut tracks: Vec<ClassTrack> = AssetClass::ALL
        .iter()
        .map(|&class| {
            let basis = allocated_basis.get(class);
            let bonus = if class.bonus_eligible() {
                round_money(basis * input.bonus_rate)
            } else {
                Decimal::ZERO
            };
            bonus_by_class.set(class, bonus);
            let recovery_base = basis - bonus;
            ClassTrack {
                class,
                recovery_base,
                annual: recovery_base / class.recovery_years(),
                elapsed: Decimal::ZERO,
                remaining: basis,
                cumulative: Decimal::ZERO,
            }
        })
        .collect();

    let mut years = Vec::with_capacity(input.years as usize);
    let mut total_depreciation = Decimal::ZERO;

    for year in 1..=input.years {
        let selling = input.disposition_month.filter(|_| year == input.years);
        let mut deductions = ClassAmounts::default();
        let mut cumulative = ClassAmounts::default();
        let mut remaining_basis = ClassAmounts::default();
        let mut bonus = Decimal::ZERO;

        for track in tracks.iter_mut() {
            let mut deduction = Decimal::ZERO;
            if year == 1 {
                let class_bonus = bonus_by_class.get(track.class);
                deduction += class_bonus;
                bonus += class_bonus;
                track.remaining -= class_bonus;
            }
            deduction += regular_deduction(track, year, input, selling);

            track.cumulative += deduction;
            deductions.set(track.class, deduction);
            cumulative.set(track.class, track.cumulative);
            remaining_basis.set(track.class, track.remaining);
        }

        let total = deductions.total();
        total_depreciation += total;
        years.push(YearlyDepreciation {
            year,
            deductions,
            bonus,
            total,
            cumulative,
            remaining_basis,
        });
    }

    Ok(DepreciationSchedule {
        allocated_basis,
        bonus_by_class,
        years,
        total_depreciation,
    })
}

fn validate_input(input: &DepreciationInput) -> ProformaResult<()> {
    if input.building_basis < Decimal::ZERO {
        return Err(ProformaError::InvalidAllocation {
            class: "building".into(),
            reason: "Building basis cannot be negative".into(),
        });
    }
    if let Some(seg) = &input.cost_segregation {
        seg.validate()?;
    }
    if input.bonus_rate < Decimal::ZERO || input.bonus_rate > Decimal::ONE {
        return Err(ProformaError::assumption(
            "bonus_rate",
            "Bonus depreciation rate must be between 0 and 1",
        ));
    }
    if !(1..=12).contains(&input.placed_in_service_month) {
        return Err(ProformaError::assumption(
            "placed_in_service_month",
            "Month must be between 1 and 12",
        ));
    }
    if let Some(month) = input.disposition_month {
        if !(1..=12).contains(&month) {
            return Err(ProformaError::assumption(
                "disposition_month",
                "Month must be between 1 and 12",
            ));
        }
    }
    Ok(())
}

/// Split the building basis into classes; residential takes the remainder
/// so the allocation always sums to the basis.
fn allocate(building_basis: Money, seg: Option<&CostSegregation>) -> ClassAmounts {
    let seg = match seg {
        Some(s) => s,
        None => {
            return ClassAmounts {
                residential: building_basis,
                ..ClassAmounts::default()
            }
        }
    };
    let five_year = round_money(building_basis * seg.five_year);
    let seven_year = round_money(building_basis * seg.seven_year);
    let fifteen_year = round_money(building_basis * seg.fifteen_year);
    ClassAmounts {
        residential: building_basis - five_year - seven_year - fifteen_year,
        five_year,
        seven_year,
        fifteen_year,
    }
}

/// Regular (non-bonus) deduction for one class in one year.
fn regular_deduction(
    track: &mut ClassTrack,
    year: u32,
    input: &DepreciationInput,
    selling: Option<u32>,
) -> Money {
    if track.remaining <= Decimal::ZERO || track.recovery_base <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let use_table = track.class != AssetClass::Residential
        && input.short_life_method == ShortLifeMethod::MacrsTable;

    let deduction = if use_table {
        let table_len = macrs::table_for(track.class).len() as u32;
        let mut pct = macrs::rate_for(track.class, year);
        if selling.is_some() && year > 1 {
            pct /= dec!(2);
        }
        if year >= table_len && selling.is_none() {
            track.remaining
        } else {
            round_money(track.recovery_base * pct).min(track.remaining)
        }
    } else {
        let fraction = year_fraction(track.class, year, input.placed_in_service_month, selling);
        let elapsed = track.elapsed + fraction;
        track.elapsed = elapsed;
        if elapsed >= track.class.recovery_years() {
            track.remaining
        } else {
            round_money(track.annual * fraction).min(track.remaining)
        }
    };

    track.remaining -= deduction;
    deduction
}

/// Fraction of a full straight-line year allowed in `year`.
fn year_fraction(class: AssetClass, year: u32, placed_month: u32, selling: Option<u32>) -> Decimal {
    let placed = Decimal::from(placed_month);
    match (class, year, selling) {
        // Mid-month: placed in service and sold in the same year
        (AssetClass::Residential, 1, Some(sale)) => {
            (Decimal::from(sale) - placed).max(Decimal::ZERO) / dec!(12)
        }
        (AssetClass::Residential, 1, None) => (dec!(12.5) - placed) / dec!(12),
        (AssetClass::Residential, _, Some(sale)) => (Decimal::from(sale) - dec!(0.5)) / dec!(12),
        (AssetClass::Residential, _, None) => Decimal::ONE,
        // Half-year convention on acquisition and on disposition
        (_, 1, _) => dec!(0.5),
        (_, _, Some(_)) => dec!(0.5),
        (_, _, None) => Decimal::ONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residential_only(basis: Money, month: u32, years: u32) -> DepreciationInput {
        DepreciationInput {
            building_basis: basis,
            cost_segregation: None,
            bonus_rate: Decimal::ZERO,
            short_life_method: ShortLifeMethod::StraightLine,
            placed_in_service_month: month,
            years,
            disposition_month: None,
        }
    }

    #[test]
    fn test_residential_full_recovery_equals_basis() {
        for month in 1..=12 {
            for basis in [dec!(400000), dec!(287654.33)] {
                let schedule = build_depreciation_schedule(&residential_only(basis, month, 30)).unwrap();
                assert_eq!(
                    schedule.total_depreciation, basis,
                    "month {month}: total {} != basis {basis}",
                    schedule.total_depreciation
                );
                assert_eq!(schedule.years.last().unwrap().remaining_basis.total(), Decimal::ZERO);
            }
        }
    }

    #[test]
    fn test_residential_mid_month_first_year() {
        // January: 11.5 months of 400,000 / 27.5 = 13,939.39
        let schedule = build_depreciation_schedule(&residential_only(dec!(400000), 1, 2)).unwrap();
        assert_eq!(schedule.years[0].deductions.residential, dec!(13939.39));
        // Full year: 400,000 / 27.5 = 14,545.45
        assert_eq!(schedule.years[1].deductions.residential, dec!(14545.45));
    }

    #[test]
    fn test_disposition_year_is_partial() {
        let mut input = residential_only(dec!(400000), 1, 5);
        input.disposition_month = Some(12);
        let schedule = build_depreciation_schedule(&input).unwrap();
        // Sold in December: 11.5 months
        assert_eq!(schedule.years[4].deductions.residential, dec!(13939.39));
        assert!(schedule.years[4].total < schedule.years[3].total);
    }

    #[test]
    fn test_cost_seg_with_bonus_front_loads_year_one() {
        let input = DepreciationInput {
            building_basis: dec!(400000),
            cost_segregation: Some(CostSegregation {
                five_year: dec!(0.15),
                seven_year: Decimal::ZERO,
                fifteen_year: dec!(0.10),
            }),
            bonus_rate: Decimal::ONE,
            short_life_method: ShortLifeMethod::StraightLine,
            placed_in_service_month: 1,
            years: 5,
            disposition_month: None,
        };
        let schedule = build_depreciation_schedule(&input).unwrap();
        assert_eq!(schedule.allocated_basis.five_year, dec!(60000));
        assert_eq!(schedule.allocated_basis.fifteen_year, dec!(40000));
        assert_eq!(schedule.allocated_basis.residential, dec!(300000));
        assert_eq!(schedule.years[0].bonus, dec!(100000));
        // With 100% bonus, nothing is left for later years in the short classes
        assert_eq!(schedule.years[1].deductions.five_year, Decimal::ZERO);
        assert_eq!(schedule.years[1].deductions.fifteen_year, Decimal::ZERO);
    }

    #[test]
    fn test_partial_bonus_reduces_straight_line_base() {
        let input = DepreciationInput {
            building_basis: dec!(100000),
            cost_segregation: Some(CostSegregation {
                five_year: dec!(0.50),
                ..CostSegregation::default()
            }),
            bonus_rate: dec!(0.60),
            short_life_method: ShortLifeMethod::StraightLine,
            placed_in_service_month: 1,
            years: 7,
            disposition_month: None,
        };
        let schedule = build_depreciation_schedule(&input).unwrap();
        // 50,000 five-year basis: 30,000 bonus, 20,000 over 5 years half-year
        assert_eq!(schedule.bonus_by_class.five_year, dec!(30000));
        assert_eq!(schedule.years[0].deductions.five_year, dec!(32000));
        assert_eq!(schedule.years[1].deductions.five_year, dec!(4000));
        assert_eq!(schedule.years[5].deductions.five_year, dec!(2000));
        assert_eq!(schedule.years[6].deductions.five_year, Decimal::ZERO);
        assert_eq!(schedule.years[6].cumulative.five_year, dec!(50000));
    }

    #[test]
    fn test_macrs_table_method() {
        let input = DepreciationInput {
            building_basis: dec!(100000),
            cost_segregation: Some(CostSegregation {
                five_year: dec!(0.10),
                ..CostSegregation::default()
            }),
            bonus_rate: Decimal::ZERO,
            short_life_method: ShortLifeMethod::MacrsTable,
            placed_in_service_month: 1,
            years: 6,
            disposition_month: None,
        };
        let schedule = build_depreciation_schedule(&input).unwrap();
        assert_eq!(schedule.years[0].deductions.five_year, dec!(2000));
        assert_eq!(schedule.years[1].deductions.five_year, dec!(3200));
        assert_eq!(schedule.years[5].cumulative.five_year, dec!(10000));
    }

    fn five_year_sold_in_year_three(method: ShortLifeMethod) -> DepreciationInput {
        DepreciationInput {
            building_basis: dec!(100000),
            cost_segregation: Some(CostSegregation {
                five_year: dec!(0.10),
                ..CostSegregation::default()
            }),
            bonus_rate: Decimal::ZERO,
            short_life_method: method,
            placed_in_service_month: 1,
            years: 3,
            disposition_month: Some(12),
        }
    }

    #[test]
    fn test_short_life_straight_line_half_year_on_sale() {
        let input = five_year_sold_in_year_three(ShortLifeMethod::StraightLine);
        let schedule = build_depreciation_schedule(&input).unwrap();
        // 10,000 / 5 = 2,000 a year
        assert_eq!(schedule.years[0].deductions.five_year, dec!(1000));
        assert_eq!(schedule.years[1].deductions.five_year, dec!(2000));
        assert_eq!(schedule.years[2].deductions.five_year, dec!(1000));
        assert_eq!(schedule.years[2].remaining_basis.five_year, dec!(6000));
    }

    #[test]
    fn test_short_life_macrs_half_rate_on_sale() {
        let input = five_year_sold_in_year_three(ShortLifeMethod::MacrsTable);
        let schedule = build_depreciation_schedule(&input).unwrap();
        assert_eq!(schedule.years[1].deductions.five_year, dec!(3200));
        // 10,000 * 19.20% / 2
        assert_eq!(schedule.years[2].deductions.five_year, dec!(960));
        assert_eq!(schedule.years[2].cumulative.five_year, dec!(6160));
    }

    #[test]
    fn test_class_cumulative_never_exceeds_allocation() {
        let input = DepreciationInput {
            building_basis: dec!(333333.33),
            cost_segregation: Some(CostSegregation {
                five_year: dec!(0.13),
                seven_year: dec!(0.07),
                fifteen_year: dec!(0.11),
            }),
            bonus_rate: dec!(0.80),
            short_life_method: ShortLifeMethod::MacrsTable,
            placed_in_service_month: 7,
            years: 35,
            disposition_month: None,
        };
        let schedule = build_depreciation_schedule(&input).unwrap();
        for y in &schedule.years {
            for class in AssetClass::ALL {
                assert!(y.cumulative.get(class) <= schedule.allocated_basis.get(class));
                assert!(y.remaining_basis.get(class) >= Decimal::ZERO);
            }
        }
        assert_eq!(schedule.total_depreciation, dec!(333333.33));
    }

    #[test]
    fn test_negative_allocation_rejected() {
        let mut input = residential_only(dec!(100000), 1, 5);
        input.cost_segregation = Some(CostSegregation {
            five_year: dec!(-0.1),
            ..CostSegregation::default()
        });
        assert!(matches!(
            build_depreciation_schedule(&input),
            Err(ProformaError::InvalidAllocation { .. })
        ));
    }

    #[test]
    fn test_over_allocation_rejected() {
        let mut input = residential_only(dec!(100000), 1, 5);
        input.cost_segregation = Some(CostSegregation {
            five_year: dec!(0.6),
            seven_year: dec!(0.3),
            fifteen_year: dec!(0.2),
        });
        assert!(matches!(
            build_depreciation_schedule(&input),
            Err(ProformaError::InvalidAllocation { .. })
        ));
    }

    #[test]
    fn test_cumulative_through_year() {
        let schedule = build_depreciation_schedule(&residential_only(dec!(400000), 1, 5)).unwrap();
        let through_two = schedule.cumulative_through(2);
        assert_eq!(through_two.residential, dec!(13939.39) + dec!(14545.45));
        assert_eq!(schedule.cumulative_through(0), ClassAmounts::default());
    }
}
