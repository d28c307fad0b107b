use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub(crate) use iso_date::option as iso_date_option;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaxBands {
    pub personal_allowance: f64,
    pub basic_rate_limit: f64,
    pub higher_rate_limit: f64,
    pub allowance_taper_start: f64,
    pub basic_rate: f64,
    pub higher_rate: f64,
    pub additional_rate: f64,
}

impl Default for TaxBands {
    fn default() -> Self {
        Self {
            personal_allowance: 12_570.0,
            basic_rate_limit: 50_270.0,
            higher_rate_limit: 125_140.0,
            allowance_taper_start: 100_000.0,
            basic_rate: 0.20,
            higher_rate: 0.40,
            additional_rate: 0.45,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NiBands {
    pub primary_threshold: f64,
    pub upper_earnings_limit: f64,
    pub main_rate: f64,
    pub upper_rate: f64,
}

impl Default for NiBands {
    fn default() -> Self {
        Self {
            primary_threshold: 12_570.0,
            upper_earnings_limit: 50_270.0,
            main_rate: 0.12,
            upper_rate: 0.02,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatePensionRules {
    pub pension_age: u32,
    pub full_weekly_rate: f64,
    pub min_qualifying_years: u32,
    pub full_qualifying_years: u32,
}

impl Default for StatePensionRules {
    fn default() -> Self {
        Self {
            pension_age: 67,
            full_weekly_rate: 203.85,
            min_qualifying_years: 10,
            full_qualifying_years: 35,
        }
    }
}

/// Fixed-rate economic assumptions shared by every calculation in one run.
///
/// Rates are fractions (0.02 = 2%). Nothing here changes during a projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Assumptions {
    pub inflation_rate: f64,
    pub pension_growth_rate: f64,
    pub mortgage_interest_rate: f64,
    pub employer_contribution_rate: f64,
    pub tax: TaxBands,
    pub ni: NiBands,
    pub state_pension: StatePensionRules,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            inflation_rate: 0.02,
            pension_growth_rate: 0.05,
            mortgage_interest_rate: 0.02,
            employer_contribution_rate: 0.08,
            tax: TaxBands::default(),
            ni: NiBands::default(),
            state_pension: StatePensionRules::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inputs {
    #[serde(with = "iso_date")]
    pub birth_date: Date,
    pub expected_death_age: u32,
    pub retirement_age: u32,
    pub initial_savings: f64,
    pub salary: f64,
    pub additional_income: f64,
    pub living_expenses: f64,
    pub mortgage_remaining_liability: f64,
    pub annual_mortgage_repayment: f64,
    #[serde(rename = "currentNIYears")]
    pub current_ni_years: u32,
    /// Employee contribution as a percentage of salary, 0..=100.
    pub pension_contribution_rate: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InputError {
    #[error("birth date {birth_date} is after the projection date {today}")]
    BirthDateInFuture { birth_date: Date, today: Date },
    #[error("expectedDeathAge must be > 0")]
    DeathAgeNotPositive,
    #[error("expectedDeathAge must be <= {max}")]
    DeathAgeTooHigh { max: u32 },
    #[error("expectedDeathAge ({death_age}) must be >= current age ({current_age})")]
    DeathAgeBeforeCurrentAge { death_age: u32, current_age: u32 },
    #[error("retirementAge must be > 0")]
    RetirementAgeNotPositive,
    #[error("retirementAge ({retirement_age}) must be < expectedDeathAge ({death_age})")]
    RetirementNotBeforeDeath { retirement_age: u32, death_age: u32 },
    #[error("{field} must be a finite amount >= 0")]
    NegativeAmount { field: &'static str },
    #[error("currentNIYears must be between 0 and {max}")]
    NiYearsOutOfRange { max: u32 },
    #[error("pensionContributionRate must be between 0 and 100")]
    ContributionRateOutOfRange,
}

/// One simulated year. Serialized field names are the contract with result consumers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRow {
    pub year: i32,
    pub age: u32,
    pub total_income: f64,
    pub additional_income: f64,
    pub income_tax: f64,
    pub national_insurance: f64,
    pub net_incoming: f64,
    pub pension_contributions: f64,
    pub pension_withdrawals: f64,
    /// Drawdown the year needed but the fund could not cover.
    pub pension_withdrawal_shortfall: f64,
    pub pension_fund_balance: f64,
    pub state_pension: f64,
    pub living_expenses: f64,
    pub mortgage_repayment: f64,
    pub mortgage_remaining_balance: f64,
    pub cash_flow: f64,
    pub total_savings: f64,
    pub net_worth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub rows: Vec<SimulationRow>,
    #[serde(rename = "hasWon")]
    pub survived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_age: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PensionSuggestion {
    pub additional_contribution: f64,
    pub tax_saving: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IsaSuggestion {
    pub recommended_contribution: f64,
    pub projected_growth: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSuggestion {
    pub recommended_reduction: f64,
    pub impact: f64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSuggestions {
    pub pension_optimization: Option<PensionSuggestion>,
    pub isa_optimization: Option<IsaSuggestion>,
    pub expense_optimization: Option<ExpenseSuggestion>,
}

impl OptimizationSuggestions {
    pub fn is_empty(&self) -> bool {
        self.pension_optimization.is_none()
            && self.isa_optimization.is_none()
            && self.expense_optimization.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseReduction {
    pub amount: f64,
    pub annual_impact: f64,
    pub ten_year_impact: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalarySacrifice {
    pub original_salary: f64,
    pub sacrificed_amount: f64,
    pub new_salary: f64,
    pub tax_saving: f64,
    pub additional_pension_contribution: f64,
    pub total_pension_contribution: f64,
    pub ni_saving: f64,
    pub total_benefit: f64,
    pub expense_reduction: ExpenseReduction,
}
