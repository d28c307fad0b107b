use super::types::{Assumptions, StatePensionRules};

const WEEKS_PER_YEAR: f64 = 52.0;

/// Annual state pension for `age`, pro-rated by qualifying NI years and
/// inflated from today's rate by `year_index` years. Rounded to whole pounds.
pub fn state_pension(age: u32, ni_years: u32, year_index: u32, assumptions: &Assumptions) -> f64 {
    let rules = &assumptions.state_pension;
    if age < rules.pension_age || ni_years < rules.min_qualifying_years {
        return 0.0;
    }

    let annual = rules.full_weekly_rate * entitlement_fraction(ni_years, rules) * WEEKS_PER_YEAR;
    (annual * inflation_multiplier(assumptions.inflation_rate, year_index)).round()
}

pub fn compute_state_pension(age: u32, ni_years: u32, year_index: u32) -> f64 {
    state_pension(age, ni_years, year_index, &Assumptions::default())
}

fn entitlement_fraction(ni_years: u32, rules: &StatePensionRules) -> f64 {
    if rules.full_qualifying_years == 0 {
        return 1.0;
    }
    (ni_years as f64 / rules.full_qualifying_years as f64).min(1.0)
}

/// Balance after one year of interest and one annual payment. Overpayment is
/// absorbed, never refunded.
pub fn mortgage_balance(previous_balance: f64, annual_payment: f64, interest_rate: f64) -> f64 {
    if previous_balance <= 0.0 {
        return 0.0;
    }
    (previous_balance * (1.0 + interest_rate) - annual_payment).max(0.0)
}

pub fn compute_mortgage_balance(previous_balance: f64, annual_payment: f64) -> f64 {
    mortgage_balance(
        previous_balance,
        annual_payment,
        Assumptions::default().mortgage_interest_rate,
    )
}

pub(crate) fn inflation_multiplier(rate: f64, year_index: u32) -> f64 {
    (1.0 + rate).powi(year_index as i32)
}
