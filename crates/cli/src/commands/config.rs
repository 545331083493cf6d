use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thunai_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// One reported setting: dotted key path, env override and rendered value.
struct Field {
    key: &'static str,
    env: &'static [&'static str],
    value: String,
}

impl Field {
    fn new(key: &'static str, env: &'static [&'static str], value: impl ToString) -> Self {
        Self { key, env, value: value.to_string() }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }
    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let admins = if config.conversation.admin_user_ids.is_empty() {
        "<none>".to_string()
    } else {
        config.conversation.admin_user_ids.join(",")
    };

    vec![
        Field::new("database.url", &["THUNAI_DATABASE_URL"], &config.database.url),
        Field::new(
            "database.max_connections",
            &["THUNAI_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections,
        ),
        Field::new(
            "database.timeout_secs",
            &["THUNAI_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs,
        ),
        Field::new("llm.provider", &["THUNAI_LLM_PROVIDER"], config.llm.provider.as_str()),
        Field::new("llm.model", &["THUNAI_LLM_MODEL"], &config.llm.model),
        Field::new(
            "llm.base_url",
            &["THUNAI_LLM_BASE_URL"],
            config.llm.base_url.as_deref().unwrap_or("<unset>"),
        ),
        Field::new("llm.api_key", &["THUNAI_LLM_API_KEY", "GROQ_API_KEY"], llm_api_key),
        Field::new("llm.temperature", &["THUNAI_LLM_TEMPERATURE"], config.llm.temperature),
        Field::new("llm.max_tokens", &["THUNAI_LLM_MAX_TOKENS"], config.llm.max_tokens),
        Field::new("llm.timeout_secs", &["THUNAI_LLM_TIMEOUT_SECS"], config.llm.timeout_secs),
        Field::new("llm.max_retries", &["THUNAI_LLM_MAX_RETRIES"], config.llm.max_retries),
        Field::new("backend.base_url", &["THUNAI_BACKEND_BASE_URL"], &config.backend.base_url),
        Field::new(
            "backend.availability_url",
            &["THUNAI_BACKEND_AVAILABILITY_URL"],
            &config.backend.availability_url,
        ),
        Field::new(
            "backend.email_domain",
            &["THUNAI_BACKEND_EMAIL_DOMAIN"],
            &config.backend.email_domain,
        ),
        Field::new(
            "backend.dashboard_name",
            &["THUNAI_BACKEND_DASHBOARD_NAME"],
            &config.backend.dashboard_name,
        ),
        Field::new(
            "conversation.state_store",
            &["THUNAI_CONVERSATION_STATE_STORE"],
            config.conversation.state_store.as_str(),
        ),
        Field::new(
            "conversation.max_clarification_attempts",
            &["THUNAI_CONVERSATION_MAX_CLARIFICATION_ATTEMPTS"],
            config.conversation.max_clarification_attempts,
        ),
        Field::new(
            "conversation.state_ttl_secs",
            &["THUNAI_CONVERSATION_STATE_TTL_SECS"],
            config.conversation.state_ttl_secs,
        ),
        Field::new(
            "conversation.min_office_days",
            &["THUNAI_CONVERSATION_MIN_OFFICE_DAYS"],
            config.conversation.min_office_days,
        ),
        Field::new("conversation.admin_user_ids", &["THUNAI_CONVERSATION_ADMIN_USER_IDS"], admins),
        Field::new(
            "collection.max_attempts",
            &["THUNAI_COLLECTION_MAX_ATTEMPTS"],
            config.collection.max_attempts,
        ),
        Field::new(
            "server.bind_address",
            &["THUNAI_SERVER_BIND_ADDRESS"],
            &config.server.bind_address,
        ),
        Field::new(
            "server.health_check_port",
            &["THUNAI_SERVER_HEALTH_CHECK_PORT"],
            config.server.health_check_port,
        ),
        Field::new(
            "logging.level",
            &["THUNAI_LOGGING_LEVEL", "THUNAI_LOG_LEVEL"],
            &config.logging.level,
        ),
        Field::new(
            "logging.format",
            &["THUNAI_LOGGING_FORMAT", "THUNAI_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_lowercase(),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["thunai.toml", "config/thunai.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn file_values_are_attributed_to_the_file() {
        let doc: Value = "[backend]\nbase_url = \"http://records\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "backend.base_url"));
        assert!(!contains_path(&doc, "backend.email_domain"));

        let source = field_source("backend.base_url", &["THUNAI_TEST_UNSET_KEY"], Some(&doc), None);
        assert_eq!(source, "file (config file)");
    }

    #[test]
    fn missing_values_fall_back_to_default() {
        assert_eq!(field_source("llm.model", &["THUNAI_TEST_UNSET_KEY"], None, None), "default");
    }
}
