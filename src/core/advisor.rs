use super::tax::{compute_income_tax, compute_ni};
use super::types::{
    ExpenseReduction, ExpenseSuggestion, Inputs, IsaSuggestion, OptimizationSuggestions,
    PensionSuggestion, SalarySacrifice, SimulationRow,
};

// Fixed heuristics, independent of `Assumptions`.
const HIGHER_RATE_THRESHOLD: f64 = 50_270.0;
const MAX_EXTRA_PENSION_SHARE: f64 = 0.40;
const PENSION_RELIEF_RATE: f64 = 0.40;

const ISA_ANNUAL_LIMIT: f64 = 20_000.0;
const ISA_ILLUSTRATIVE_GROWTH: f64 = 0.05;
const ISA_ILLUSTRATIVE_YEARS: i32 = 10;

const MIN_SALARY_TO_EXPENSE_RATIO: f64 = 2.0;
const EXPENSE_REDUCTION_SHARE: f64 = 0.20;
const EXPENSE_IMPACT_MULTIPLIER: f64 = 12.0;

// The comparison dialog uses a rounder threshold than the advisor trigger.
const SACRIFICE_THRESHOLD: f64 = 50_000.0;
const MAX_PENSION_CONTRIBUTION: f64 = 60_000.0;
const SACRIFICE_EXPENSE_TARGET: f64 = 1_000.0;
const SACRIFICE_INFLATION: f64 = 0.02;
const SACRIFICE_HORIZON_YEARS: i32 = 10;

/// Up to three independent suggestions for a projection that ran out of money.
pub fn optimize(inputs: &Inputs, rows: &[SimulationRow]) -> OptimizationSuggestions {
    OptimizationSuggestions {
        pension_optimization: pension_suggestion(inputs),
        isa_optimization: isa_suggestion(rows),
        expense_optimization: expense_suggestion(inputs),
    }
}

fn pension_suggestion(inputs: &Inputs) -> Option<PensionSuggestion> {
    if inputs.salary <= HIGHER_RATE_THRESHOLD {
        return None;
    }

    let additional_contribution =
        (inputs.salary - HIGHER_RATE_THRESHOLD).min(inputs.salary * MAX_EXTRA_PENSION_SHARE);
    let tax_saving = additional_contribution * PENSION_RELIEF_RATE;

    Some(PensionSuggestion {
        additional_contribution,
        tax_saving,
        message: format!(
            "Increasing your pension contribution by {} could save you {} in tax.",
            format_gbp(additional_contribution),
            format_gbp(tax_saving)
        ),
    })
}

fn isa_suggestion(rows: &[SimulationRow]) -> Option<IsaSuggestion> {
    if rows.is_empty() {
        return None;
    }

    let mean_cash_flow = rows.iter().map(|r| r.cash_flow).sum::<f64>() / rows.len() as f64;
    if mean_cash_flow <= 0.0 {
        return None;
    }

    let recommended_contribution = mean_cash_flow.min(ISA_ANNUAL_LIMIT);
    let projected_growth =
        recommended_contribution * (1.0 + ISA_ILLUSTRATIVE_GROWTH).powi(ISA_ILLUSTRATIVE_YEARS);

    Some(IsaSuggestion {
        recommended_contribution,
        projected_growth,
        message: format!(
            "Contributing {} annually to an ISA could grow to {} in {} years.",
            format_gbp(recommended_contribution),
            format_gbp(projected_growth),
            ISA_ILLUSTRATIVE_YEARS
        ),
    })
}

fn expense_suggestion(inputs: &Inputs) -> Option<ExpenseSuggestion> {
    // With no expenses the ratio is unbounded and never triggers.
    if inputs.living_expenses <= 0.0 {
        return None;
    }
    if inputs.salary / inputs.living_expenses >= MIN_SALARY_TO_EXPENSE_RATIO {
        return None;
    }

    let recommended_reduction = inputs.living_expenses * EXPENSE_REDUCTION_SHARE;
    let impact = recommended_reduction * EXPENSE_IMPACT_MULTIPLIER;

    Some(ExpenseSuggestion {
        recommended_reduction,
        impact,
        message: format!(
            "Reducing your annual expenses by {} could increase your savings by {} per year.",
            format_gbp(recommended_reduction),
            format_gbp(impact)
        ),
    })
}

pub fn apply_pension_suggestion(
    inputs: &Inputs,
    rows: &[SimulationRow],
    suggestion: &PensionSuggestion,
) -> Inputs {
    let mut updated = inputs.clone();
    if let Some(first) = rows.first().filter(|r| r.total_income > 0.0) {
        updated.pension_contribution_rate =
            (suggestion.additional_contribution / first.total_income * 100.0).clamp(0.0, 100.0);
    }
    updated
}

pub fn apply_isa_suggestion(
    inputs: &Inputs,
    rows: &[SimulationRow],
    suggestion: &IsaSuggestion,
) -> Inputs {
    let mut updated = inputs.clone();
    if let Some(first) = rows.first() {
        updated.initial_savings =
            (first.total_savings + suggestion.recommended_contribution).max(0.0);
    }
    updated
}

pub fn apply_expense_suggestion(
    inputs: &Inputs,
    rows: &[SimulationRow],
    suggestion: &ExpenseSuggestion,
) -> Inputs {
    let mut updated = inputs.clone();
    if let Some(first) = rows.first() {
        updated.living_expenses = (first.living_expenses - suggestion.recommended_reduction).max(0.0);
    }
    updated
}

/// Before/after comparison of sacrificing salary above £50,000 into the pension.
pub fn salary_sacrifice(salary: f64, pension_contribution_rate: f64) -> Option<SalarySacrifice> {
    if salary <= SACRIFICE_THRESHOLD {
        return None;
    }

    let current_contribution = salary * (pension_contribution_rate / 100.0);
    let headroom = (MAX_PENSION_CONTRIBUTION - current_contribution).max(0.0);
    let sacrificed_amount = (salary - SACRIFICE_THRESHOLD).min(headroom);
    let new_salary = salary - sacrificed_amount;

    let tax_saving = compute_income_tax(salary) - compute_income_tax(new_salary);
    let ni_saving = compute_ni(salary, false) - compute_ni(new_salary, false);

    let ten_year_impact = (0..SACRIFICE_HORIZON_YEARS)
        .map(|year| SACRIFICE_EXPENSE_TARGET * (1.0 + SACRIFICE_INFLATION).powi(year))
        .sum();

    Some(SalarySacrifice {
        original_salary: salary,
        sacrificed_amount,
        new_salary,
        tax_saving,
        additional_pension_contribution: sacrificed_amount,
        total_pension_contribution: current_contribution + sacrificed_amount,
        ni_saving,
        total_benefit: tax_saving + ni_saving,
        expense_reduction: ExpenseReduction {
            amount: SACRIFICE_EXPENSE_TARGET,
            annual_impact: SACRIFICE_EXPENSE_TARGET * (1.0 + SACRIFICE_INFLATION),
            ten_year_impact,
        },
    })
}

/// Whole-pound sterling with thousands separators, e.g. `£12,345` or `-£80`.
pub fn format_gbp(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-£{grouped}")
    } else {
        format!("£{grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Assumptions, simulate};
    use proptest::prelude::{prop_assert, proptest};
    use time::macros::date;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_inputs() -> Inputs {
        Inputs {
            birth_date: date!(1990 - 01 - 01),
            expected_death_age: 85,
            retirement_age: 65,
            initial_savings: 10_000.0,
            salary: 50_000.0,
            additional_income: 0.0,
            living_expenses: 25_000.0,
            mortgage_remaining_liability: 200_000.0,
            annual_mortgage_repayment: 12_000.0,
            current_ni_years: 5,
            pension_contribution_rate: 5.0,
        }
    }

    fn row_with_cash_flow(cash_flow: f64) -> SimulationRow {
        SimulationRow {
            year: 2025,
            age: 35,
            total_income: 50_000.0,
            additional_income: 0.0,
            income_tax: 0.0,
            national_insurance: 0.0,
            net_incoming: 0.0,
            pension_contributions: 0.0,
            pension_withdrawals: 0.0,
            pension_withdrawal_shortfall: 0.0,
            pension_fund_balance: 0.0,
            state_pension: 0.0,
            living_expenses: 25_000.0,
            mortgage_repayment: 0.0,
            mortgage_remaining_balance: 0.0,
            cash_flow,
            total_savings: 4_000.0,
            net_worth: 4_000.0,
        }
    }

    #[test]
    fn pension_suggestion_targets_income_above_higher_rate_threshold() {
        let mut inputs = sample_inputs();
        inputs.salary = 70_000.0;
        let suggestion = pension_suggestion(&inputs).expect("salary above threshold");
        assert_approx(suggestion.additional_contribution, 19_730.0);
        assert_approx(suggestion.tax_saving, 7_892.0);
        assert!(suggestion.message.contains("£19,730"));
        assert!(suggestion.message.contains("£7,892"));
    }

    #[test]
    fn pension_suggestion_is_capped_at_forty_percent_of_salary() {
        let mut inputs = sample_inputs();
        inputs.salary = 200_000.0;
        let suggestion = pension_suggestion(&inputs).expect("salary above threshold");
        assert_approx(suggestion.additional_contribution, 80_000.0);
    }

    #[test]
    fn pension_suggestion_not_offered_at_threshold() {
        let mut inputs = sample_inputs();
        inputs.salary = 50_270.0;
        assert!(pension_suggestion(&inputs).is_none());
    }

    #[test]
    fn isa_suggestion_uses_mean_cash_flow_capped_at_allowance() {
        let rows = [row_with_cash_flow(3_000.0), row_with_cash_flow(1_000.0)];
        let suggestion = isa_suggestion(&rows).expect("positive mean cash flow");
        assert_approx(suggestion.recommended_contribution, 2_000.0);
        assert_approx(suggestion.projected_growth, 2_000.0 * 1.05_f64.powi(10));

        let rich = [row_with_cash_flow(45_000.0)];
        let capped = isa_suggestion(&rich).expect("positive mean cash flow");
        assert_approx(capped.recommended_contribution, 20_000.0);
    }

    #[test]
    fn isa_suggestion_skipped_for_empty_or_negative_cash_flow() {
        assert!(isa_suggestion(&[]).is_none());
        let rows = [row_with_cash_flow(1_000.0), row_with_cash_flow(-3_000.0)];
        assert!(isa_suggestion(&rows).is_none());
    }

    #[test]
    fn expense_suggestion_triggers_below_two_times_cover() {
        let mut inputs = sample_inputs();
        inputs.salary = 40_000.0;
        let suggestion = expense_suggestion(&inputs).expect("ratio below two");
        assert_approx(suggestion.recommended_reduction, 5_000.0);
        assert_approx(suggestion.impact, 60_000.0);

        inputs.salary = 50_000.0;
        assert!(expense_suggestion(&inputs).is_none());

        inputs.living_expenses = 0.0;
        assert!(expense_suggestion(&inputs).is_none());
    }

    #[test]
    fn no_suggestions_when_nothing_triggers() {
        let mut inputs = sample_inputs();
        inputs.salary = 50_000.0;
        inputs.living_expenses = 25_000.0;
        let rows = [row_with_cash_flow(-500.0), row_with_cash_flow(-100.0)];

        let suggestions = optimize(&inputs, &rows);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn all_three_suggestions_can_fire_together() {
        let mut inputs = sample_inputs();
        inputs.salary = 60_000.0;
        inputs.living_expenses = 40_000.0;
        let rows = [row_with_cash_flow(2_000.0)];

        let suggestions = optimize(&inputs, &rows);
        assert!(suggestions.pension_optimization.is_some());
        assert!(suggestions.isa_optimization.is_some());
        assert!(suggestions.expense_optimization.is_some());
    }

    #[test]
    fn applying_suggestions_returns_adjusted_copies() {
        let inputs = sample_inputs();
        let rows = [row_with_cash_flow(2_000.0)];

        let pension = PensionSuggestion {
            additional_contribution: 5_000.0,
            tax_saving: 2_000.0,
            message: String::new(),
        };
        let updated = apply_pension_suggestion(&inputs, &rows, &pension);
        assert_approx(updated.pension_contribution_rate, 10.0);

        let isa = IsaSuggestion {
            recommended_contribution: 2_000.0,
            projected_growth: 0.0,
            message: String::new(),
        };
        let updated = apply_isa_suggestion(&inputs, &rows, &isa);
        assert_approx(updated.initial_savings, 6_000.0);

        let expense = ExpenseSuggestion {
            recommended_reduction: 5_000.0,
            impact: 0.0,
            message: String::new(),
        };
        let updated = apply_expense_suggestion(&inputs, &rows, &expense);
        assert_approx(updated.living_expenses, 20_000.0);

        assert_eq!(inputs, sample_inputs());
    }

    #[test]
    fn applied_expense_cut_rescues_failing_projection() {
        let today = date!(2025 - 06 - 15);
        let mut inputs = sample_inputs();
        inputs.salary = 30_000.0;
        inputs.living_expenses = 24_000.0;
        inputs.mortgage_remaining_liability = 0.0;
        inputs.initial_savings = 0.0;
        let assumptions = Assumptions::default();

        let baseline = simulate(&inputs, &assumptions, today).expect("valid inputs");
        assert!(!baseline.survived);

        let suggestions = optimize(&inputs, &baseline.rows);
        let expense = suggestions
            .expense_optimization
            .expect("salary under twice expenses");
        let adjusted = apply_expense_suggestion(&inputs, &baseline.rows, &expense);
        let rerun = simulate(&adjusted, &assumptions, today).expect("valid inputs");
        assert!(rerun.rows.len() > baseline.rows.len() || rerun.survived);
    }

    #[test]
    fn salary_sacrifice_reruns_tax_on_both_salaries() {
        let result = salary_sacrifice(70_000.0, 5.0).expect("above threshold");
        assert_approx(result.sacrificed_amount, 20_000.0);
        assert_approx(result.new_salary, 50_000.0);
        assert_approx(result.tax_saving, 15_432.0 - 7_486.0);
        assert_approx(result.ni_saving, 4_919.0 - 4_492.0);
        assert_approx(result.total_benefit, result.tax_saving + result.ni_saving);
        assert_approx(result.total_pension_contribution, 3_500.0 + 20_000.0);
        assert_approx(result.expense_reduction.annual_impact, 1_020.0);
        assert!((result.expense_reduction.ten_year_impact - 10_949.72).abs() < 0.01);
    }

    #[test]
    fn salary_sacrifice_respects_annual_contribution_limit() {
        let result = salary_sacrifice(200_000.0, 20.0).expect("above threshold");
        // 60,000 limit less the existing 40,000
        assert_approx(result.sacrificed_amount, 20_000.0);
        assert!(salary_sacrifice(50_000.0, 5.0).is_none());
    }

    #[test]
    fn format_gbp_groups_thousands() {
        assert_eq!(format_gbp(0.0), "£0");
        assert_eq!(format_gbp(999.4), "£999");
        assert_eq!(format_gbp(1_000.0), "£1,000");
        assert_eq!(format_gbp(1_234_567.8), "£1,234,568");
        assert_eq!(format_gbp(-80.0), "-£80");
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_suggestions_never_mutate_inputs(salary in 0u32..300_000, expenses in 0u32..100_000) {
            let mut inputs = sample_inputs();
            inputs.salary = salary as f64;
            inputs.living_expenses = expenses as f64;
            let snapshot = inputs.clone();
            let rows = [row_with_cash_flow(1_000.0)];

            let suggestions = optimize(&inputs, &rows);
            prop_assert!(inputs == snapshot);
            if let Some(p) = suggestions.pension_optimization {
                prop_assert!(p.additional_contribution > 0.0);
                prop_assert!(p.additional_contribution <= inputs.salary * 0.4 + EPS);
            }
        }
    }
}
