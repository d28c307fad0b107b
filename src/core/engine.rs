use time::Date;
use tracing::debug;

use super::pension::{inflation_multiplier, mortgage_balance, state_pension};
use super::tax::{income_tax, national_insurance};
use super::types::{Assumptions, InputError, Inputs, SimulationResult, SimulationRow};

#[derive(Debug)]
struct Balances {
    savings: f64,
    pension: f64,
    mortgage: f64,
    ni_years: u32,
}

#[derive(Debug, Clone, Copy)]
struct PensionFlow {
    salary: f64,
    contributions: f64,
    withdrawals: f64,
    shortfall: f64,
}

/// Whole years between `birth_date` and `today`.
pub fn age_on(birth_date: Date, today: Date) -> u32 {
    let mut years = today.year() - birth_date.year();
    if (today.month() as u8, today.day()) < (birth_date.month() as u8, birth_date.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Projects `inputs` one year at a time from `today` until the expected age of
/// death, stopping at the first year savings are negative and the pension fund
/// cannot cover that year's living expenses.
pub fn simulate(
    inputs: &Inputs,
    assumptions: &Assumptions,
    today: Date,
) -> Result<SimulationResult, InputError> {
    inputs.validate(today)?;

    let current_age = age_on(inputs.birth_date, today);
    let years_to_simulate = inputs.expected_death_age - current_age;

    let mut balances = Balances {
        savings: inputs.initial_savings,
        pension: 0.0,
        mortgage: inputs.mortgage_remaining_liability,
        ni_years: inputs.current_ni_years,
    };
    let mut rows = Vec::with_capacity(years_to_simulate as usize + 1);

    for year_index in 0..=years_to_simulate {
        let age = current_age + year_index;
        let row = project_year(
            inputs,
            assumptions,
            &mut balances,
            year_index,
            age,
            today.year() + year_index as i32,
        );
        rows.push(row);

        if balances.savings < 0.0 && balances.pension < row.living_expenses {
            debug!(
                failure_age = age,
                savings = balances.savings,
                pension = balances.pension,
                "projection ran out of money"
            );
            return Ok(SimulationResult {
                rows,
                survived: false,
                failure_age: Some(age),
            });
        }
    }

    debug!(
        years = rows.len(),
        final_net_worth = rows.last().map(|r| r.net_worth).unwrap_or(0.0),
        "projection survived to expected death age"
    );
    Ok(SimulationResult {
        rows,
        survived: true,
        failure_age: None,
    })
}

fn project_year(
    inputs: &Inputs,
    assumptions: &Assumptions,
    balances: &mut Balances,
    year_index: u32,
    age: u32,
    year: i32,
) -> SimulationRow {
    let is_retired = age >= inputs.retirement_age;
    let full_years = assumptions.state_pension.full_qualifying_years;
    if !is_retired && balances.ni_years < full_years {
        balances.ni_years += 1;
    }

    let multiplier = inflation_multiplier(assumptions.inflation_rate, year_index);
    let living_expenses = inputs.living_expenses * multiplier;
    let additional_income = inputs.additional_income * multiplier;
    let state_pension = state_pension(age, balances.ni_years, year_index, assumptions);

    let flow = if is_retired {
        draw_pension(
            assumptions,
            &mut balances.pension,
            living_expenses,
            state_pension + additional_income,
        )
    } else {
        accrue_pension(inputs, assumptions, &mut balances.pension, multiplier)
    };

    let total_income = flow.salary + additional_income + state_pension + flow.withdrawals;
    let income_tax = income_tax(total_income, &assumptions.tax);
    let national_insurance = national_insurance(flow.salary, is_retired, &assumptions.ni);
    let net_incoming = total_income - income_tax - national_insurance;

    let mortgage_repayment = if balances.mortgage > 0.0 {
        inputs.annual_mortgage_repayment
    } else {
        0.0
    };
    balances.mortgage = mortgage_balance(
        balances.mortgage,
        mortgage_repayment,
        assumptions.mortgage_interest_rate,
    );

    let cash_flow = net_incoming - living_expenses - mortgage_repayment;
    apply_cash_flow(&mut balances.savings, cash_flow, assumptions.inflation_rate);

    SimulationRow {
        year,
        age,
        total_income,
        additional_income,
        income_tax,
        national_insurance,
        net_incoming,
        pension_contributions: flow.contributions,
        pension_withdrawals: flow.withdrawals,
        pension_withdrawal_shortfall: flow.shortfall,
        pension_fund_balance: balances.pension,
        state_pension,
        living_expenses,
        mortgage_repayment,
        mortgage_remaining_balance: balances.mortgage,
        cash_flow,
        total_savings: balances.savings,
        net_worth: balances.savings + balances.pension - balances.mortgage,
    }
}

fn accrue_pension(
    inputs: &Inputs,
    assumptions: &Assumptions,
    pension: &mut f64,
    multiplier: f64,
) -> PensionFlow {
    let salary = inputs.salary * multiplier;
    let employer = salary * assumptions.employer_contribution_rate;
    let employee = salary * (inputs.pension_contribution_rate / 100.0);
    let contributions = employer + employee;
    *pension = (*pension + contributions) * (1.0 + assumptions.pension_growth_rate);

    PensionFlow {
        salary,
        contributions,
        withdrawals: 0.0,
        shortfall: 0.0,
    }
}

fn draw_pension(
    assumptions: &Assumptions,
    pension: &mut f64,
    living_expenses: f64,
    other_income: f64,
) -> PensionFlow {
    let required = (living_expenses - other_income).max(0.0);
    let withdrawals = required.min(*pension);
    *pension = (*pension - withdrawals) * (1.0 + assumptions.pension_growth_rate);

    PensionFlow {
        salary: 0.0,
        contributions: 0.0,
        withdrawals,
        shortfall: required - withdrawals,
    }
}

// A deficit is covered from positive savings without growth that year;
// otherwise the post-cash-flow balance grows at inflation.
fn apply_cash_flow(savings: &mut f64, cash_flow: f64, growth_rate: f64) {
    if cash_flow < 0.0 && *savings > 0.0 {
        *savings -= (-cash_flow).min(*savings);
    } else {
        *savings = (*savings + cash_flow) * (1.0 + growth_rate);
    }
}
