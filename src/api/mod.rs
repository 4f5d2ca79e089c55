mod report;

use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    ContributionLimits, DEFAULT_RMD_START_AGE, RetirementSummary, SimulationError,
    SimulationInput, SimulationParams, YearRecord, simulate, summarize,
};

pub use report::{CSV_FILE_NAME, csv_bytes, format_summary, format_table, round_cents, write_csv};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    end_age: Option<u32>,
    base_year: Option<i32>,

    current_balance: Option<f64>,
    annual_contribution: Option<f64>,
    max_out_contributions: Option<bool>,
    employer_match_rate: Option<f64>,
    employer_match_cap: Option<f64>,

    growth_rate: Option<f64>,
    conservative_growth_rate: Option<f64>,
    withdrawal_rate: Option<f64>,
    rmd_enabled: Option<bool>,
    rmd_start_age: Option<u32>,

    limit_reference_year: Option<i32>,
    base_limit: Option<f64>,
    base_limit_increment: Option<f64>,
    catch_up_limit: Option<f64>,
    catch_up_increment: Option<f64>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "nestegg",
    about = "Year-by-year 401(k) projection with IRS contribution limits, employer match and RMDs",
    after_help = "Run `nestegg serve [port]` to start the HTTP API instead."
)]
pub struct Cli {
    #[arg(long, default_value_t = 40)]
    current_age: u32,
    #[arg(long, default_value_t = 65)]
    retirement_age: u32,
    #[arg(long, default_value_t = 100, help = "Last age to project, inclusive")]
    end_age: u32,
    #[arg(
        long,
        default_value_t = 2024,
        help = "Calendar year in which the saver is --current-age"
    )]
    base_year: i32,
    #[arg(long, default_value_t = 10_000.0)]
    current_balance: f64,
    #[arg(
        long,
        default_value_t = 12_000.0,
        help = "Requested employee contribution per year, capped at the IRS limit"
    )]
    annual_contribution: f64,
    #[arg(long, help = "Contribute the full IRS limit (including catch-up) every working year")]
    max_out_contributions: bool,
    #[arg(
        long,
        default_value_t = 50.0,
        help = "Employer match as percent of the employee contribution"
    )]
    employer_match_rate: f64,
    #[arg(
        long,
        default_value_t = 5_000.0,
        help = "Maximum employer match in dollars per year"
    )]
    employer_match_cap: f64,
    #[arg(long, default_value_t = 7.0, help = "Expected annual growth in percent, may be negative")]
    growth_rate: f64,
    #[arg(
        long,
        help = "Growth in percent used from five years before retirement onwards; defaults to --growth-rate"
    )]
    conservative_growth_rate: Option<f64>,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Annual withdrawal in retirement as percent of the balance"
    )]
    withdrawal_rate: f64,
    #[arg(long, help = "Skip required minimum distributions")]
    no_rmd: bool,
    #[arg(long, default_value_t = DEFAULT_RMD_START_AGE, help = "First age subject to RMDs (72-75)")]
    rmd_start_age: u32,
    #[arg(long, default_value_t = ContributionLimits::IRS_2024.reference_year)]
    limit_reference_year: i32,
    #[arg(
        long,
        default_value_t = ContributionLimits::IRS_2024.base_limit,
        help = "Elective deferral limit in the reference year"
    )]
    base_limit: f64,
    #[arg(long, default_value_t = ContributionLimits::IRS_2024.base_annual_increment)]
    base_limit_increment: f64,
    #[arg(
        long,
        default_value_t = ContributionLimits::IRS_2024.catch_up_limit,
        help = "Extra allowance from age 50 in the reference year"
    )]
    catch_up_limit: f64,
    #[arg(long, default_value_t = ContributionLimits::IRS_2024.catch_up_annual_increment)]
    catch_up_increment: f64,
    #[arg(long, help = "Write the projection as CSV to stdout")]
    csv: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    summary: RetirementSummary,
    records: Vec<YearRecord>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn percent(value: f64) -> f64 {
    value / 100.0
}

pub fn build_input(cli: &Cli) -> Result<SimulationInput, SimulationError> {
    SimulationInput::new(SimulationParams {
        current_age: cli.current_age,
        retirement_age: cli.retirement_age,
        end_age: cli.end_age,
        base_year: cli.base_year,
        current_balance: cli.current_balance,
        annual_contribution: cli.annual_contribution,
        max_out_contributions: cli.max_out_contributions,
        employer_match_rate: percent(cli.employer_match_rate),
        employer_match_cap: cli.employer_match_cap,
        annual_growth_rate: percent(cli.growth_rate),
        conservative_growth_rate: cli.conservative_growth_rate.map(percent),
        withdrawal_rate: percent(cli.withdrawal_rate),
        rmd_enabled: !cli.no_rmd,
        rmd_start_age: cli.rmd_start_age,
        limits: ContributionLimits {
            reference_year: cli.limit_reference_year,
            base_limit: cli.base_limit,
            base_annual_increment: cli.base_limit_increment,
            catch_up_limit: cli.catch_up_limit,
            catch_up_annual_increment: cli.catch_up_increment,
        },
    })
}

pub fn run_cli(cli: &Cli) -> anyhow::Result<()> {
    let input = build_input(cli)?;
    let records = simulate(&input);

    if cli.csv {
        write_csv(&records, std::io::stdout().lock())?;
        return Ok(());
    }

    let summary = summarize(&input, &records);
    print!("{}", format_table(&records));
    println!();
    print!("{}", format_summary(&summary));
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "401(k) projection API listening");
    info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route(
            "/api/simulate.csv",
            get(csv_get_handler).post(csv_post_handler),
        )
        .fallback(not_found_handler)
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    payload: Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_json(payload),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

async fn simulate_post_handler(payload: Result<Json<SimulatePayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_json(payload),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

async fn csv_get_handler(payload: Result<Query<SimulatePayload>, QueryRejection>) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_csv(payload),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

async fn csv_post_handler(payload: Result<Json<SimulatePayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_csv(payload),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

fn simulate_json(payload: SimulatePayload) -> Response {
    let input = match input_from_payload(payload) {
        Ok(input) => input,
        Err(e) => return bad_request(e.to_string()),
    };

    let records = simulate(&input);
    let summary = summarize(&input, &records);
    debug!(
        years = records.len(),
        final_balance = summary.final_balance,
        "projection served"
    );
    json_response(StatusCode::OK, SimulateResponse { summary, records })
}

fn simulate_csv(payload: SimulatePayload) -> Response {
    let input = match input_from_payload(payload) {
        Ok(input) => input,
        Err(e) => return bad_request(e.to_string()),
    };

    let records = simulate(&input);
    match csv_bytes(&records) {
        Ok(body) => with_cache_control((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{CSV_FILE_NAME}\""),
                ),
            ],
            body,
        )),
        Err(e) => {
            warn!(error = %e, "failed to render CSV");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to render CSV")
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn bad_request(msg: String) -> Response {
    warn!(error = %msg, "rejected projection request");
    error_response(StatusCode::BAD_REQUEST, &msg)
}

#[cfg(test)]
fn input_from_json(json: &str) -> Result<SimulationInput, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    input_from_payload(payload).map_err(|e| e.to_string())
}

fn input_from_payload(payload: SimulatePayload) -> Result<SimulationInput, SimulationError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.end_age {
        cli.end_age = v;
    }
    if let Some(v) = payload.base_year {
        cli.base_year = v;
    }

    if let Some(v) = payload.current_balance {
        cli.current_balance = v;
    }
    if let Some(v) = payload.annual_contribution {
        cli.annual_contribution = v;
    }
    if let Some(v) = payload.max_out_contributions {
        cli.max_out_contributions = v;
    }
    if let Some(v) = payload.employer_match_rate {
        cli.employer_match_rate = v;
    }
    if let Some(v) = payload.employer_match_cap {
        cli.employer_match_cap = v;
    }

    if let Some(v) = payload.growth_rate {
        cli.growth_rate = v;
    }
    if let Some(v) = payload.conservative_growth_rate {
        cli.conservative_growth_rate = Some(v);
    }
    if let Some(v) = payload.withdrawal_rate {
        cli.withdrawal_rate = v;
    }
    if let Some(v) = payload.rmd_enabled {
        cli.no_rmd = !v;
    }
    if let Some(v) = payload.rmd_start_age {
        cli.rmd_start_age = v;
    }

    if let Some(v) = payload.limit_reference_year {
        cli.limit_reference_year = v;
    }
    if let Some(v) = payload.base_limit {
        cli.base_limit = v;
    }
    if let Some(v) = payload.base_limit_increment {
        cli.base_limit_increment = v;
    }
    if let Some(v) = payload.catch_up_limit {
        cli.catch_up_limit = v;
    }
    if let Some(v) = payload.catch_up_increment {
        cli.catch_up_increment = v;
    }

    build_input(&cli)
}

fn default_cli_for_api() -> Cli {
    let limits = ContributionLimits::IRS_2024;
    Cli {
        current_age: 40,
        retirement_age: 65,
        end_age: 100,
        base_year: 2024,
        current_balance: 10_000.0,
        annual_contribution: 12_000.0,
        max_out_contributions: false,
        employer_match_rate: 50.0,
        employer_match_cap: 5_000.0,
        growth_rate: 7.0,
        conservative_growth_rate: None,
        withdrawal_rate: 4.0,
        no_rmd: false,
        rmd_start_age: DEFAULT_RMD_START_AGE,
        limit_reference_year: limits.reference_year,
        base_limit: limits.base_limit,
        base_limit_increment: limits.base_annual_increment,
        catch_up_limit: limits.catch_up_limit,
        catch_up_increment: limits.catch_up_annual_increment,
        csv: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[test]
    fn cli_defaults_match_api_defaults() {
        let parsed = Cli::try_parse_from(["nestegg"]).expect("defaults parse");
        let from_cli = build_input(&parsed).expect("valid");
        let from_api = build_input(&sample_cli()).expect("valid");
        assert_eq!(from_cli, from_api);
    }

    #[test]
    fn build_input_converts_percent_flags_to_fractions() {
        let mut cli = sample_cli();
        cli.employer_match_rate = 100.0;
        cli.growth_rate = -3.5;
        cli.conservative_growth_rate = Some(4.0);
        cli.withdrawal_rate = 4.5;

        let input = build_input(&cli).expect("valid input");
        let p = input.params();
        assert_approx(p.employer_match_rate, 1.0);
        assert_approx(p.annual_growth_rate, -0.035);
        assert_eq!(p.conservative_growth_rate.map(|r| (r * 100.0).round()), Some(4.0));
        assert_approx(p.withdrawal_rate, 0.045);
        assert!(p.rmd_enabled);
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::try_parse_from([
            "nestegg",
            "--current-age",
            "30",
            "--retirement-age",
            "60",
            "--max-out-contributions",
            "--no-rmd",
            "--catch-up-increment",
            "100",
            "--csv",
        ])
        .expect("flags parse");
        assert!(cli.csv);

        let input = build_input(&cli).expect("valid input");
        let p = input.params();
        assert_eq!(p.current_age, 30);
        assert_eq!(p.retirement_age, 60);
        assert!(p.max_out_contributions);
        assert!(!p.rmd_enabled);
        assert_approx(p.limits.catch_up_annual_increment, 100.0);
    }

    #[test]
    fn build_input_rejects_retirement_before_current_age() {
        let mut cli = sample_cli();
        cli.current_age = 50;
        cli.retirement_age = 45;

        let err = build_input(&cli).expect_err("must reject retirement age");
        assert!(err.to_string().contains("retirement_age"));
    }

    #[test]
    fn build_input_rejects_withdrawal_above_hundred_percent() {
        let mut cli = sample_cli();
        cli.withdrawal_rate = 150.0;

        let err = build_input(&cli).expect_err("must reject withdrawal rate");
        assert!(err.to_string().contains("withdrawal_rate"));
    }

    #[test]
    fn input_from_json_parses_web_keys() {
        let json = r#"{
          "currentAge": 35,
          "retirementAge": 62,
          "endAge": 95,
          "baseYear": 2026,
          "currentBalance": 85000,
          "annualContribution": 20000,
          "maxOutContributions": true,
          "employerMatchRate": 100,
          "employerMatchCap": 6000,
          "growthRate": 8,
          "conservativeGrowthRate": 4,
          "withdrawalRate": 3.5,
          "rmdEnabled": false,
          "rmdStartAge": 75
        }"#;
        let input = input_from_json(json).expect("json should parse");
        let p = input.params();

        assert_eq!(p.current_age, 35);
        assert_eq!(p.retirement_age, 62);
        assert_eq!(p.end_age, 95);
        assert_eq!(p.base_year, 2026);
        assert_approx(p.current_balance, 85_000.0);
        assert_approx(p.annual_contribution, 20_000.0);
        assert!(p.max_out_contributions);
        assert_approx(p.employer_match_rate, 1.0);
        assert_approx(p.employer_match_cap, 6_000.0);
        assert_approx(p.annual_growth_rate, 0.08);
        assert_approx(p.conservative_growth_rate.expect("set"), 0.04);
        assert_approx(p.withdrawal_rate, 0.035);
        assert!(!p.rmd_enabled);
        assert_eq!(p.rmd_start_age, 75);
    }

    #[test]
    fn input_from_json_reports_invalid_input() {
        let err = input_from_json(r#"{"currentAge": 70, "retirementAge": 65}"#)
            .expect_err("must reject");
        assert!(err.contains("invalid input"));

        let err = input_from_json(r#"{"currentAge": "forty"}"#).expect_err("must reject");
        assert!(err.starts_with("Invalid API JSON payload"));
    }

    #[test]
    fn web_form_exposes_every_engine_setting() {
        for key in [
            "currentAge",
            "retirementAge",
            "endAge",
            "baseYear",
            "currentBalance",
            "annualContribution",
            "maxOutContributions",
            "employerMatchRate",
            "employerMatchCap",
            "growthRate",
            "conservativeGrowthRate",
            "withdrawalRate",
            "rmdEnabled",
            "rmdStartAge",
        ] {
            assert!(
                INDEX_HTML.contains(&format!("name=\"{key}\"")),
                "form is missing {key}"
            );
        }
        // A blank optional field must be left out rather than sent as 0.
        let input = input_from_json(r#"{"growthRate": 6}"#).expect("valid");
        assert_eq!(input.params().conservative_growth_rate, None);
        assert!(APP_JS.contains("el.value.trim() !== \"\""));
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let input = build_input(&sample_cli()).expect("valid input");
        let records = simulate(&input);
        let summary = summarize(&input, &records);
        let json = serde_json::to_string(&SimulateResponse { summary, records })
            .expect("response should serialize");

        assert!(json.contains("\"records\""));
        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"balanceAtRetirement\""));
        assert!(json.contains("\"firstRmd\""));
        assert!(json.contains("\"isMilestone\""));
        assert!(json.contains("\"balanceEnd\""));
        assert!(json.contains("\"contributionLimit\""));
    }

    #[tokio::test]
    async fn simulate_json_returns_records_for_horizon() {
        let payload = SimulatePayload {
            current_age: Some(60),
            retirement_age: Some(65),
            end_age: Some(70),
            ..SimulatePayload::default()
        };
        let response = simulate_json(payload);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );

        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).expect("json body");
        let records = body["records"].as_array().expect("records array");
        assert_eq!(records.len(), 11);
        assert_eq!(records[0]["age"], 60);
        assert_eq!(records[4]["isMilestone"], true);
    }

    #[tokio::test]
    async fn simulate_json_rejects_invalid_input_with_400() {
        let payload = SimulatePayload {
            current_age: Some(70),
            retirement_age: Some(65),
            ..SimulatePayload::default()
        };
        let response = simulate_json(payload);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).expect("json body");
        assert!(
            body["error"]
                .as_str()
                .expect("error string")
                .contains("retirement_age")
        );
    }

    #[tokio::test]
    async fn simulate_json_rejects_out_of_range_years_and_ages() {
        let payload = SimulatePayload {
            base_year: Some(i32::MAX - 1),
            ..SimulatePayload::default()
        };
        let response = simulate_json(payload);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).expect("json body");
        assert!(
            body["error"]
                .as_str()
                .expect("error string")
                .contains("base_year")
        );

        let payload = SimulatePayload {
            current_age: Some(u32::MAX - 2),
            retirement_age: Some(u32::MAX - 1),
            end_age: Some(u32::MAX),
            ..SimulatePayload::default()
        };
        assert_eq!(simulate_json(payload).status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn simulate_csv_is_an_attachment() {
        let response = simulate_csv(SimulatePayload::default());
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .expect("content disposition")
            .to_string();
        assert!(disposition.contains(CSV_FILE_NAME));

        let body = body_string(response).await;
        assert!(body.starts_with("Year,Age,"));
        assert_eq!(body.lines().count(), 62);
    }
}
