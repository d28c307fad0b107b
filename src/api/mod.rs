use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use time::macros::{date, format_description};
use time::{Date, OffsetDateTime};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    Assumptions, Inputs, OptimizationSuggestions, SalarySacrifice, SimulationResult,
    iso_date_option, optimize, salary_sacrifice, simulate,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    #[serde(with = "iso_date_option")]
    birth_date: Option<Date>,
    expected_death_age: Option<u32>,
    retirement_age: Option<u32>,
    initial_savings: Option<f64>,
    salary: Option<f64>,
    additional_income: Option<f64>,
    living_expenses: Option<f64>,
    mortgage_remaining_liability: Option<f64>,
    annual_mortgage_repayment: Option<f64>,
    #[serde(rename = "currentNIYears", alias = "currentNiYears")]
    current_ni_years: Option<u32>,
    pension_contribution_rate: Option<f64>,

    inflation_rate: Option<f64>,
    pension_growth_rate: Option<f64>,
    mortgage_interest_rate: Option<f64>,
    employer_contribution_rate: Option<f64>,

    assumptions: Option<Assumptions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SalarySacrificePayload {
    salary: f64,
    #[serde(default)]
    pension_contribution_rate: f64,
}

/// Lifetime cash-flow projection from the present to an assumed age of death.
#[derive(Parser, Debug, Clone)]
#[command(name = "lifeplan")]
pub struct Cli {
    #[arg(long, value_parser = parse_date, help = "Date of birth, YYYY-MM-DD")]
    birth_date: Date,
    #[arg(long, default_value_t = 85)]
    expected_death_age: u32,
    #[arg(long, default_value_t = 65)]
    retirement_age: u32,
    #[arg(long, default_value_t = 0.0)]
    initial_savings: f64,
    #[arg(long, default_value_t = 0.0, help = "Gross annual salary in today's money")]
    salary: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Non-employment annual income in today's money"
    )]
    additional_income: f64,
    #[arg(long)]
    living_expenses: f64,
    #[arg(long, default_value_t = 0.0)]
    mortgage_remaining_liability: f64,
    #[arg(long, default_value_t = 0.0)]
    annual_mortgage_repayment: f64,
    #[arg(long, default_value_t = 0, help = "National Insurance qualifying years so far")]
    current_ni_years: u32,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Employee pension contribution in percent of salary"
    )]
    pension_contribution_rate: f64,
    #[arg(long, default_value_t = 2.0, help = "Annual inflation in percent")]
    inflation_rate: f64,
    #[arg(long, default_value_t = 5.0, help = "Annual pension fund growth in percent")]
    pension_growth_rate: f64,
    #[arg(long, default_value_t = 2.0, help = "Mortgage interest rate in percent")]
    mortgage_interest_rate: f64,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Employer pension contribution in percent of salary"
    )]
    employer_contribution_rate: f64,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: Inputs,
    assumptions: Assumptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    inputs: Inputs,
    assumptions: Assumptions,
    result: SimulationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestions: Option<OptimizationSuggestions>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("invalid date `{raw}`: {e}"))
}

fn build_request(cli: Cli) -> Result<ApiRequest, String> {
    for (name, rate) in [
        ("--inflation-rate", cli.inflation_rate),
        ("--pension-growth-rate", cli.pension_growth_rate),
        ("--mortgage-interest-rate", cli.mortgage_interest_rate),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(format!("{name} must be > -100"));
        }
    }

    if !(0.0..=100.0).contains(&cli.employer_contribution_rate) {
        return Err("--employer-contribution-rate must be between 0 and 100".to_string());
    }

    let assumptions = Assumptions {
        inflation_rate: cli.inflation_rate / 100.0,
        pension_growth_rate: cli.pension_growth_rate / 100.0,
        mortgage_interest_rate: cli.mortgage_interest_rate / 100.0,
        employer_contribution_rate: cli.employer_contribution_rate / 100.0,
        ..Assumptions::default()
    };

    let inputs = Inputs {
        birth_date: cli.birth_date,
        expected_death_age: cli.expected_death_age,
        retirement_age: cli.retirement_age,
        initial_savings: cli.initial_savings,
        salary: cli.salary,
        additional_income: cli.additional_income,
        living_expenses: cli.living_expenses,
        mortgage_remaining_liability: cli.mortgage_remaining_liability,
        annual_mortgage_repayment: cli.annual_mortgage_repayment,
        current_ni_years: cli.current_ni_years,
        pension_contribution_rate: cli.pension_contribution_rate,
    };

    Ok(ApiRequest {
        inputs,
        assumptions,
    })
}

fn build_simulate_response(request: &ApiRequest, today: Date) -> Result<SimulateResponse, String> {
    let result =
        simulate(&request.inputs, &request.assumptions, today).map_err(|e| e.to_string())?;
    let suggestions = (!result.survived).then(|| optimize(&request.inputs, &result.rows));

    Ok(SimulateResponse {
        inputs: request.inputs.clone(),
        assumptions: request.assumptions,
        result,
        suggestions,
    })
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Runs one projection from command-line flags and renders it as pretty JSON.
pub fn run_projection_cli(cli: Cli) -> Result<String, String> {
    let request = build_request(cli)?;
    let response = build_simulate_response(&request, today())?;
    serde_json::to_string_pretty(&response).map_err(|e| format!("failed to render result: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/optimize", post(optimize_handler))
        .route("/api/salary-sacrifice", post(salary_sacrifice_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "lifeplan HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return rejected(&msg),
    };

    match build_simulate_response(&request, today()) {
        Ok(response) => {
            info!(
                survived = response.result.survived,
                failure_age = response.result.failure_age,
                rows = response.result.rows.len(),
                "projection complete"
            );
            json_response(StatusCode::OK, response)
        }
        Err(msg) => rejected(&msg),
    }
}

async fn optimize_handler(Json(payload): Json<SimulatePayload>) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return rejected(&msg),
    };

    match simulate(&request.inputs, &request.assumptions, today()) {
        Ok(result) => {
            let suggestions = optimize(&request.inputs, &result.rows);
            info!(
                survived = result.survived,
                empty = suggestions.is_empty(),
                "optimization suggestions computed"
            );
            json_response(StatusCode::OK, suggestions)
        }
        Err(e) => rejected(&e.to_string()),
    }
}

async fn salary_sacrifice_handler(Json(payload): Json<SalarySacrificePayload>) -> Response {
    if !payload.salary.is_finite() || payload.salary < 0.0 {
        return rejected("salary must be a finite amount >= 0");
    }
    if !(0.0..=100.0).contains(&payload.pension_contribution_rate) {
        return rejected("pensionContributionRate must be between 0 and 100");
    }

    let comparison: Option<SalarySacrifice> =
        salary_sacrifice(payload.salary, payload.pension_contribution_rate);
    json_response(StatusCode::OK, comparison)
}

fn rejected(msg: &str) -> Response {
    warn!(error = msg, "rejected request");
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.birth_date {
        cli.birth_date = v;
    }
    if let Some(v) = payload.expected_death_age {
        cli.expected_death_age = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.initial_savings {
        cli.initial_savings = v;
    }
    if let Some(v) = payload.salary {
        cli.salary = v;
    }
    if let Some(v) = payload.additional_income {
        cli.additional_income = v;
    }
    if let Some(v) = payload.living_expenses {
        cli.living_expenses = v;
    }
    if let Some(v) = payload.mortgage_remaining_liability {
        cli.mortgage_remaining_liability = v;
    }
    if let Some(v) = payload.annual_mortgage_repayment {
        cli.annual_mortgage_repayment = v;
    }
    if let Some(v) = payload.current_ni_years {
        cli.current_ni_years = v;
    }
    if let Some(v) = payload.pension_contribution_rate {
        cli.pension_contribution_rate = v;
    }

    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.pension_growth_rate {
        cli.pension_growth_rate = v;
    }
    if let Some(v) = payload.mortgage_interest_rate {
        cli.mortgage_interest_rate = v;
    }
    if let Some(v) = payload.employer_contribution_rate {
        cli.employer_contribution_rate = v;
    }

    let mut request = build_request(cli)?;
    if let Some(overrides) = payload.assumptions {
        // flat percent fields win over the nested fractions
        request.assumptions = Assumptions {
            inflation_rate: payload
                .inflation_rate
                .map_or(overrides.inflation_rate, |v| v / 100.0),
            pension_growth_rate: payload
                .pension_growth_rate
                .map_or(overrides.pension_growth_rate, |v| v / 100.0),
            mortgage_interest_rate: payload
                .mortgage_interest_rate
                .map_or(overrides.mortgage_interest_rate, |v| v / 100.0),
            employer_contribution_rate: payload
                .employer_contribution_rate
                .map_or(overrides.employer_contribution_rate, |v| v / 100.0),
            ..overrides
        };
        check_assumptions(&request.assumptions)?;
    }

    Ok(request)
}

fn check_assumptions(assumptions: &Assumptions) -> Result<(), String> {
    for (name, rate) in [
        ("assumptions.inflationRate", assumptions.inflation_rate),
        ("assumptions.pensionGrowthRate", assumptions.pension_growth_rate),
        ("assumptions.mortgageInterestRate", assumptions.mortgage_interest_rate),
    ] {
        if !rate.is_finite() || rate <= -1.0 {
            return Err(format!("{name} must be > -1"));
        }
    }

    let tax = &assumptions.tax;
    let ni = &assumptions.ni;
    for (name, rate) in [
        ("assumptions.employerContributionRate", assumptions.employer_contribution_rate),
        ("assumptions.tax.basicRate", tax.basic_rate),
        ("assumptions.tax.higherRate", tax.higher_rate),
        ("assumptions.tax.additionalRate", tax.additional_rate),
        ("assumptions.ni.mainRate", ni.main_rate),
        ("assumptions.ni.upperRate", ni.upper_rate),
    ] {
        if !(0.0..=1.0).contains(&rate) {
            return Err(format!("{name} must be between 0 and 1"));
        }
    }

    for (name, amount) in [
        ("assumptions.tax.personalAllowance", tax.personal_allowance),
        ("assumptions.tax.basicRateLimit", tax.basic_rate_limit),
        ("assumptions.tax.higherRateLimit", tax.higher_rate_limit),
        ("assumptions.tax.allowanceTaperStart", tax.allowance_taper_start),
        ("assumptions.ni.primaryThreshold", ni.primary_threshold),
        ("assumptions.ni.upperEarningsLimit", ni.upper_earnings_limit),
        (
            "assumptions.statePension.fullWeeklyRate",
            assumptions.state_pension.full_weekly_rate,
        ),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(format!("{name} must be a finite amount >= 0"));
        }
    }

    Ok(())
}

fn default_cli_for_api() -> Cli {
    Cli {
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
        inflation_rate: 2.0,
        pension_growth_rate: 5.0,
        mortgage_interest_rate: 2.0,
        employer_contribution_rate: 8.0,
    }
}
