use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::types::{round_money, Money, Rate};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Physical condition of the unit at acquisition. Each grade selects a row
/// of the per-square-foot cost table and a default rehab duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionGrade {
    Turnkey,
    Light,
    Medium,
    Heavy,
    FullGut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RehabCategory {
    Paint,
    Flooring,
    Kitchen,
    Bathrooms,
    Hvac,
    Electrical,
    Plumbing,
    Roof,
    Windows,
    Exterior,
    Contingency,
}

impl RehabCategory {
    pub const ALL: [RehabCategory; 11] = [
        RehabCategory::Paint,
        RehabCategory::Flooring,
        RehabCategory::Kitchen,
        RehabCategory::Bathrooms,
        RehabCategory::Hvac,
        RehabCategory::Electrical,
        RehabCategory::Plumbing,
        RehabCategory::Roof,
        RehabCategory::Windows,
        RehabCategory::Exterior,
        RehabCategory::Contingency,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RehabLineItem {
    pub category: RehabCategory,
    /// Table-driven estimate
    pub estimated_cost: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_cost: Option<Money>,
}

impl RehabLineItem {
    pub fn cost(&self) -> Money {
        self.override_cost.unwrap_or(self.estimated_cost)
    }
}

/// Rehab plan consumed by the proforma. Can be estimated with
/// [`estimate_rehab_budget`] or supplied directly by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RehabBudget {
    pub condition_grade: ConditionGrade,
    #[serde(default)]
    pub line_items: Vec<RehabLineItem>,
    /// Months of year 1 during which the unit produces no rent
    pub rehab_months: u32,
    /// Takes precedence over the line-item sum when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_override: Option<Money>,
}

impl RehabBudget {
    /// No work, no downtime.
    pub fn turnkey() -> Self {
        RehabBudget {
            condition_grade: ConditionGrade::Turnkey,
            line_items: Vec::new(),
            rehab_months: 0,
            total_override: None,
        }
    }

    pub fn total_cost(&self) -> Money {
        match self.total_override {
            Some(total) => total,
            None => self.line_items.iter().map(RehabLineItem::cost).sum(),
        }
    }

    /// Rent-producing months in year 1.
    pub fn rent_months(&self) -> u32 {
        12 - self.rehab_months.min(12)
    }

    /// Share of year 1 during which rent is collectible, `(12 - months) / 12`.
    pub fn rent_fraction(&self) -> Rate {
        Decimal::from(self.rent_months()) / dec!(12)
    }

    pub fn validate(&self) -> ProformaResult<()> {
        if let Some(total) = self.total_override {
            if total < Decimal::ZERO {
                return Err(ProformaError::assumption(
                    "rehab.total_override",
                    "Rehab cost cannot be negative",
                ));
            }
        }
        if self.line_items.iter().any(|item| item.cost() < Decimal::ZERO) {
            return Err(ProformaError::assumption(
                "rehab.line_items",
                "Line-item cost cannot be negative",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RehabEstimateInput {
    pub square_feet: Decimal,
    pub year_built: i32,
    pub condition_grade: ConditionGrade,
    /// Overrides the grade's default duration
    #[serde(default)]
    pub rehab_months: Option<u32>,
    #[serde(default)]
    pub line_item_overrides: BTreeMap<RehabCategory, Money>,
    #[serde(default)]
    pub total_override: Option<Money>,
}

// ---------------------------------------------------------------------------
// Cost tables
// ---------------------------------------------------------------------------

/// Dollars per square foot by grade, in `RehabCategory::ALL` order.
const COST_TABLE: [[Decimal; 11]; 5] = [
    // TURNKEY
    [dec!(0); 11],
    // LIGHT
    [
        dec!(2.00), dec!(2.50), dec!(0), dec!(0), dec!(0), dec!(0),
        dec!(0), dec!(0), dec!(0), dec!(0.50), dec!(1.00),
    ],
    // MEDIUM
    [
        dec!(2.50), dec!(4.00), dec!(5.00), dec!(3.50), dec!(1.50), dec!(0),
        dec!(0), dec!(0), dec!(1.00), dec!(1.00), dec!(2.50),
    ],
    // HEAVY
    [
        dec!(3.00), dec!(5.00), dec!(8.00), dec!(6.00), dec!(4.00), dec!(3.00),
        dec!(2.50), dec!(3.00), dec!(2.50), dec!(2.00), dec!(4.00),
    ],
    // FULL_GUT
    [
        dec!(3.50), dec!(7.00), dec!(12.00), dec!(9.00), dec!(6.00), dec!(5.00),
        dec!(4.00), dec!(5.00), dec!(4.00), dec!(3.50), dec!(6.00),
    ],
];

impl ConditionGrade {
    fn cost_row(self) -> &'static [Decimal; 11] {
        let row = match self {
            ConditionGrade::Turnkey => 0,
            ConditionGrade::Light => 1,
            ConditionGrade::Medium => 2,
            ConditionGrade::Heavy => 3,
            ConditionGrade::FullGut => 4,
        };
        &COST_TABLE[row]
    }

    pub fn default_months(self) -> u32 {
        match self {
            ConditionGrade::Turnkey => 0,
            ConditionGrade::Light => 1,
            ConditionGrade::Medium => 3,
            ConditionGrade::Heavy => 6,
            ConditionGrade::FullGut => 9,
        }
    }

    pub fn cost_per_sqft(self, category: RehabCategory) -> Decimal {
        self.cost_row()[category.index()]
    }
}

/// Older housing stock costs more to bring up to standard.
pub fn age_multiplier(year_built: i32) -> Decimal {
    match year_built {
        y if y >= 2000 => dec!(1.00),
        y if y >= 1970 => dec!(1.10),
        y if y >= 1950 => dec!(1.20),
        _ => dec!(1.30),
    }
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Estimate a rehab budget from the unit's size, age and condition.
pub fn estimate_rehab_budget(input: &RehabEstimateInput) -> ProformaResult<RehabBudget> {
    if input.square_feet <= Decimal::ZERO {
        return Err(ProformaError::assumption(
            "square_feet",
            "Square footage must be positive",
        ));
    }
    if let Some((category, _)) = input
        .line_item_overrides
        .iter()
        .find(|(_, cost)| **cost < Decimal::ZERO)
    {
        return Err(ProformaError::assumption(
            "line_item_overrides",
            format!("Override for {category:?} cannot be negative"),
        ));
    }

    let multiplier = age_multiplier(input.year_built);
    let line_items = RehabCategory::ALL
        .iter()
        .map(|&category| RehabLineItem {
            category,
            estimated_cost: round_money(
                input.square_feet * input.condition_grade.cost_per_sqft(category) * multiplier,
            ),
            override_cost: input.line_item_overrides.get(&category).copied(),
        })
        .collect();

    let budget = RehabBudget {
        condition_grade: input.condition_grade,
        line_items,
        rehab_months: input
            .rehab_months
            .unwrap_or_else(|| input.condition_grade.default_months())
            .min(12),
        total_override: input.total_override,
    };
    budget.validate()?;
    Ok(budget)
}
