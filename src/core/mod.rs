mod advisor;
mod engine;
mod pension;
mod tax;
mod types;
mod validate;

pub use advisor::{
    apply_expense_suggestion, apply_isa_suggestion, apply_pension_suggestion, format_gbp,
    optimize, salary_sacrifice,
};
pub use engine::{age_on, simulate};
pub use pension::{compute_mortgage_balance, compute_state_pension, mortgage_balance, state_pension};
pub use tax::{compute_income_tax, compute_ni, income_tax, national_insurance, personal_allowance};
pub(crate) use types::iso_date_option;
pub use types::{
    Assumptions, ExpenseReduction, ExpenseSuggestion, InputError, Inputs, IsaSuggestion, NiBands,
    OptimizationSuggestions, PensionSuggestion, SalarySacrifice, SimulationResult, SimulationRow,
    StatePensionRules, TaxBands,
};
