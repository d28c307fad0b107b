use time::Date;

use super::engine::age_on;
use super::types::{InputError, Inputs};

const MAX_NI_YEARS: u32 = 35;
const MAX_DEATH_AGE: u32 = 150;

impl Inputs {
    /// Rejects snapshots the projection has no meaningful answer for.
    pub fn validate(&self, today: Date) -> Result<(), InputError> {
        if self.birth_date > today {
            return Err(InputError::BirthDateInFuture {
                birth_date: self.birth_date,
                today,
            });
        }

        if self.expected_death_age == 0 {
            return Err(InputError::DeathAgeNotPositive);
        }

        if self.expected_death_age > MAX_DEATH_AGE {
            return Err(InputError::DeathAgeTooHigh { max: MAX_DEATH_AGE });
        }

        if self.retirement_age == 0 {
            return Err(InputError::RetirementAgeNotPositive);
        }

        if self.retirement_age >= self.expected_death_age {
            return Err(InputError::RetirementNotBeforeDeath {
                retirement_age: self.retirement_age,
                death_age: self.expected_death_age,
            });
        }

        let current_age = age_on(self.birth_date, today);
        if self.expected_death_age < current_age {
            return Err(InputError::DeathAgeBeforeCurrentAge {
                death_age: self.expected_death_age,
                current_age,
            });
        }

        for (field, amount) in [
            ("initialSavings", self.initial_savings),
            ("salary", self.salary),
            ("additionalIncome", self.additional_income),
            ("livingExpenses", self.living_expenses),
            ("mortgageRemainingLiability", self.mortgage_remaining_liability),
            ("annualMortgageRepayment", self.annual_mortgage_repayment),
        ] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(InputError::NegativeAmount { field });
            }
        }

        if self.current_ni_years > MAX_NI_YEARS {
            return Err(InputError::NiYearsOutOfRange { max: MAX_NI_YEARS });
        }

        if !(0.0..=100.0).contains(&self.pension_contribution_rate) {
            return Err(InputError::ContributionRateOutOfRange);
        }

        Ok(())
    }
}
