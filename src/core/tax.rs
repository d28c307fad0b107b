use super::types::{NiBands, TaxBands};

/// Income tax on `gross_income` with the default UK bands, rounded to whole pounds.
pub fn compute_income_tax(gross_income: f64) -> f64 {
    income_tax(gross_income, &TaxBands::default())
}

/// National Insurance on earned salary with the default bands, rounded to whole pounds.
pub fn compute_ni(earned_income: f64, is_retired: bool) -> f64 {
    national_insurance(earned_income, is_retired, &NiBands::default())
}

/// Allowance remaining after the high-income taper (£1 lost per whole £2 over the taper start).
pub fn personal_allowance(gross_income: f64, bands: &TaxBands) -> f64 {
    let full = bands.personal_allowance.max(0.0);
    if gross_income <= bands.allowance_taper_start {
        return full;
    }
    let reduction = ((gross_income - bands.allowance_taper_start) / 2.0).floor();
    full - reduction.min(full)
}

// Band widths are measured from the full allowance, so a tapered allowance
// shifts the whole ladder down rather than widening the basic band.
pub fn income_tax(gross_income: f64, bands: &TaxBands) -> f64 {
    let mut remaining = gross_income - personal_allowance(gross_income, bands);
    let mut tax = 0.0;

    let basic_width = (bands.basic_rate_limit - bands.personal_allowance).max(0.0);
    let higher_width = (bands.higher_rate_limit - bands.basic_rate_limit).max(0.0);

    if remaining > 0.0 {
        let basic_taxable = remaining.min(basic_width);
        tax += basic_taxable * bands.basic_rate;
        remaining -= basic_taxable;
    }
    if remaining > 0.0 {
        let higher_taxable = remaining.min(higher_width);
        tax += higher_taxable * bands.higher_rate;
        remaining -= higher_taxable;
    }
    if remaining > 0.0 {
        tax += remaining * bands.additional_rate;
    }

    tax.round()
}

/// Employee NI on salary only. Retired years and pension income never attract NI.
pub fn national_insurance(earned_income: f64, is_retired: bool, bands: &NiBands) -> f64 {
    if is_retired || earned_income <= bands.primary_threshold {
        return 0.0;
    }

    let main_band = earned_income.min(bands.upper_earnings_limit) - bands.primary_threshold;
    let upper_band = (earned_income - bands.upper_earnings_limit).max(0.0);

    (main_band.max(0.0) * bands.main_rate + upper_band * bands.upper_rate).round()
}
