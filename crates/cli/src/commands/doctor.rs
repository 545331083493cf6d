use serde::Serialize;
use thunai_core::config::{AppConfig, LoadOptions};
use thunai_core::RecordStore;
use thunai_db::connect_with_settings;
use thunai_server::backend::HttpRecordStore;
use tokio::runtime::Runtime;

use crate::commands::CommandResult;

const BACKEND_PROBE_NAME: &str = "thunai-doctor-probe";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            checks.push(check_llm_readiness(&config));
            match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => {
                    checks.push(check_database_connectivity(&runtime, &config));
                    checks.push(check_backend_reachability(&runtime, &config));
                }
                Err(error) => {
                    let details = format!("failed to initialize async runtime: {error}");
                    checks.push(DoctorCheck::fail("database_connectivity", details.clone()));
                    checks.push(DoctorCheck::fail("backend_reachability", details));
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            for name in ["llm_readiness", "database_connectivity", "backend_reachability"] {
                checks.push(DoctorCheck::skipped(
                    name,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let (overall_status, summary) = if any_failed {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

/// A missing model is not a failure: the assistant degrades to keyword routing.
fn check_llm_readiness(config: &AppConfig) -> DoctorCheck {
    if config.llm.is_available() {
        DoctorCheck::pass(
            "llm_readiness",
            format!(
                "{} model `{}` at {}",
                config.llm.provider.as_str(),
                config.llm.model,
                config.llm.endpoint()
            ),
        )
    } else {
        DoctorCheck::skipped(
            "llm_readiness",
            format!(
                "no api key for {}; keyword routing and canned replies will be used",
                config.llm.provider.as_str()
            ),
        )
    }
}

fn check_database_connectivity(runtime: &Runtime, config: &AppConfig) -> DoctorCheck {
    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        ),
        Err(error) => DoctorCheck::fail("database_connectivity", error),
    }
}

fn check_backend_reachability(runtime: &Runtime, config: &AppConfig) -> DoctorCheck {
    let store = match HttpRecordStore::new(&config.backend) {
        Ok(store) => store,
        Err(error) => return DoctorCheck::fail("backend_reachability", error.to_string()),
    };

    match runtime.block_on(store.find_user_by_name(BACKEND_PROBE_NAME)) {
        Ok(_) => DoctorCheck::pass(
            "backend_reachability",
            format!("records api answered at {}", config.backend.base_url),
        ),
        Err(error) => DoctorCheck::fail(
            "backend_reachability",
            format!("records api at {} failed: {error}", config.backend.base_url),
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
