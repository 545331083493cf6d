use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use thunai_cli::commands::chat::{session, ChatOptions};
use thunai_cli::commands::{config, doctor, migrate};
use thunai_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use thunai_transport::ConsoleTransport;
use tokio::io::BufReader;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("THUNAI_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_database_url() {
    with_env(&[("THUNAI_DATABASE_URL", "postgres://nope")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_redacts_api_key_and_attributes_env_sources() {
    with_env(
        &[
            ("THUNAI_DATABASE_URL", "sqlite::memory:"),
            ("THUNAI_LLM_API_KEY", "gsk-super-secret"),
        ],
        || {
            let output = config::run();

            assert!(output
                .contains("- llm.api_key = <redacted> (source: env (THUNAI_LLM_API_KEY))"));
            assert!(output.contains(
                "- database.url = sqlite::memory: (source: env (THUNAI_DATABASE_URL))"
            ));
            assert!(!output.contains("gsk-super-secret"));
        },
    );
}

#[test]
fn doctor_json_skips_missing_model_and_fails_unreachable_backend() {
    with_env(
        &[
            ("THUNAI_DATABASE_URL", "sqlite::memory:"),
            ("THUNAI_BACKEND_BASE_URL", "http://127.0.0.1:9/api/v1"),
            ("THUNAI_BACKEND_TIMEOUT_SECS", "1"),
        ],
        || {
            let result = doctor::run(true);
            let report = parse_payload(&result.output);

            assert_eq!(result.exit_code, 1);
            assert_eq!(report["overall_status"], "fail");
            let status = |name: &str| {
                report["checks"]
                    .as_array()
                    .expect("checks")
                    .iter()
                    .find(|check| check["name"] == name)
                    .map(|check| check["status"].clone())
                    .expect("check present")
            };
            assert_eq!(status("config_validation"), "pass");
            assert_eq!(status("database_connectivity"), "pass");
            assert_eq!(status("llm_readiness"), "skipped");
            assert_eq!(status("backend_reachability"), "fail");
        },
    );
}

#[test]
fn offline_chat_confirms_and_saves_a_celebration() {
    with_env(&[], || {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config");
        let options = ChatOptions { user_id: "U-LOCAL".to_string(), offline: true };
        let input = BufReader::new("Priya's bday is nov 15th\n1\n/quit\n".as_bytes());
        let transport = ConsoleTransport::new("U-LOCAL", input, Vec::new());

        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let transport =
            runtime.block_on(session(&config, &options, transport)).expect("chat session");
        let output = String::from_utf8(transport.into_output()).expect("utf8");

        assert!(output.contains("[1] Yes  [2] No"));
        assert!(output.contains("thunai> 🎂 Done!"));
        assert!(output.trim_end().ends_with("Bye! 👋"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "THUNAI_DATABASE_URL",
        "THUNAI_DATABASE_MAX_CONNECTIONS",
        "THUNAI_DATABASE_TIMEOUT_SECS",
        "THUNAI_LLM_PROVIDER",
        "THUNAI_LLM_API_KEY",
        "GROQ_API_KEY",
        "THUNAI_LLM_BASE_URL",
        "THUNAI_LLM_MODEL",
        "THUNAI_LLM_TIMEOUT_SECS",
        "THUNAI_LLM_MAX_RETRIES",
        "THUNAI_BACKEND_BASE_URL",
        "THUNAI_BACKEND_TIMEOUT_SECS",
        "THUNAI_CONVERSATION_STATE_STORE",
        "THUNAI_SERVER_BIND_ADDRESS",
        "THUNAI_SERVER_HEALTH_CHECK_PORT",
        "THUNAI_LOGGING_LEVEL",
        "THUNAI_LOGGING_FORMAT",
        "THUNAI_LOG_LEVEL",
        "THUNAI_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
