use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collection::CollectionPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub backend: BackendConfig,
    pub conversation: ConversationConfig,
    pub collection: CollectionConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl LlmConfig {
    /// Whether a remote model can be called at all. Without one the assistant
    /// runs on the keyword classifier and canned replies.
    pub fn is_available(&self) -> bool {
        match self.provider {
            LlmProvider::Ollama => self.base_url.is_some(),
            LlmProvider::OpenAi | LlmProvider::Groq => self
                .api_key
                .as_ref()
                .map(|value| !value.expose_secret().trim().is_empty())
                .unwrap_or(false),
        }
    }

    pub fn endpoint(&self) -> String {
        let base =
            self.base_url.clone().unwrap_or_else(|| self.provider.default_base_url().to_owned());
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub availability_url: String,
    pub timeout_secs: u64,
    pub email_domain: String,
    pub dashboard_name: String,
}

#[derive(Clone, Debug)]
pub struct ConversationConfig {
    pub state_store: StateStoreKind,
    pub max_clarification_attempts: u32,
    pub state_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub routing_threshold: f64,
    pub proactive_threshold: f64,
    pub min_office_days: usize,
    pub admin_user_ids: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct CollectionConfig {
    pub max_attempts: u32,
    pub stop_on_decline: bool,
    pub stop_on_complete: bool,
}

impl CollectionConfig {
    pub fn policy(&self) -> CollectionPolicy {
        CollectionPolicy {
            max_attempts: self.max_attempts,
            stop_on_decline: self.stop_on_decline,
            stop_on_complete: self.stop_on_complete,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Groq,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Ollama => "ollama",
        }
    }

    /// All supported providers speak the OpenAI chat completions dialect.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateStoreKind {
    Memory,
    Sqlite,
}

impl StateStoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub backend_base_url: Option<String>,
    pub state_store: Option<StateStoreKind>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://thunai.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Groq,
                api_key: None,
                base_url: None,
                model: "llama-3.1-8b-instant".to_string(),
                temperature: 0.7,
                max_tokens: 1000,
                timeout_secs: 30,
                max_retries: 2,
            },
            backend: BackendConfig {
                base_url: "http://127.0.0.1:8000/api/v1".to_string(),
                availability_url: "http://localhost:8001/api/v1".to_string(),
                timeout_secs: 10,
                email_domain: "company.com".to_string(),
                dashboard_name: "Thunai Dashboard".to_string(),
            },
            conversation: ConversationConfig {
                state_store: StateStoreKind::Memory,
                max_clarification_attempts: 2,
                state_ttl_secs: 1800,
                sweep_interval_secs: 60,
                routing_threshold: 0.6,
                proactive_threshold: 0.7,
                min_office_days: 3,
                admin_user_ids: Vec::new(),
            },
            collection: CollectionConfig {
                max_attempts: 3,
                stop_on_decline: true,
                stop_on_complete: true,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "groq" => Ok(Self::Groq),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|groq|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for StateStoreKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Validation(format!(
                "unsupported state store `{other}` (expected memory|sqlite)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("thunai.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(backend) = patch.backend {
            if let Some(base_url) = backend.base_url {
                self.backend.base_url = base_url;
            }
            if let Some(availability_url) = backend.availability_url {
                self.backend.availability_url = availability_url;
            }
            if let Some(timeout_secs) = backend.timeout_secs {
                self.backend.timeout_secs = timeout_secs;
            }
            if let Some(email_domain) = backend.email_domain {
                self.backend.email_domain = email_domain;
            }
            if let Some(dashboard_name) = backend.dashboard_name {
                self.backend.dashboard_name = dashboard_name;
            }
        }

        if let Some(conversation) = patch.conversation {
            if let Some(state_store) = conversation.state_store {
                self.conversation.state_store = state_store;
            }
            if let Some(max_clarification_attempts) = conversation.max_clarification_attempts {
                self.conversation.max_clarification_attempts = max_clarification_attempts;
            }
            if let Some(state_ttl_secs) = conversation.state_ttl_secs {
                self.conversation.state_ttl_secs = state_ttl_secs;
            }
            if let Some(sweep_interval_secs) = conversation.sweep_interval_secs {
                self.conversation.sweep_interval_secs = sweep_interval_secs;
            }
            if let Some(routing_threshold) = conversation.routing_threshold {
                self.conversation.routing_threshold = routing_threshold;
            }
            if let Some(proactive_threshold) = conversation.proactive_threshold {
                self.conversation.proactive_threshold = proactive_threshold;
            }
            if let Some(min_office_days) = conversation.min_office_days {
                self.conversation.min_office_days = min_office_days;
            }
            if let Some(admin_user_ids) = conversation.admin_user_ids {
                self.conversation.admin_user_ids = admin_user_ids;
            }
        }

        if let Some(collection) = patch.collection {
            if let Some(max_attempts) = collection.max_attempts {
                self.collection.max_attempts = max_attempts;
            }
            if let Some(stop_on_decline) = collection.stop_on_decline {
                self.collection.stop_on_decline = stop_on_decline;
            }
            if let Some(stop_on_complete) = collection.stop_on_complete {
                self.collection.stop_on_complete = stop_on_complete;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("THUNAI_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("THUNAI_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("THUNAI_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("THUNAI_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("THUNAI_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("THUNAI_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let api_key = read_env("THUNAI_LLM_API_KEY").or_else(|| read_env("GROQ_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("THUNAI_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("THUNAI_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("THUNAI_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("THUNAI_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("THUNAI_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("THUNAI_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("THUNAI_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("THUNAI_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("THUNAI_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("THUNAI_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("THUNAI_BACKEND_BASE_URL") {
            self.backend.base_url = value;
        }
        if let Some(value) = read_env("THUNAI_BACKEND_AVAILABILITY_URL") {
            self.backend.availability_url = value;
        }
        if let Some(value) = read_env("THUNAI_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_u64("THUNAI_BACKEND_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("THUNAI_BACKEND_EMAIL_DOMAIN") {
            self.backend.email_domain = value;
        }
        if let Some(value) = read_env("THUNAI_BACKEND_DASHBOARD_NAME") {
            self.backend.dashboard_name = value;
        }

        if let Some(value) = read_env("THUNAI_CONVERSATION_STATE_STORE") {
            self.conversation.state_store = value.parse()?;
        }
        if let Some(value) = read_env("THUNAI_CONVERSATION_MAX_CLARIFICATION_ATTEMPTS") {
            self.conversation.max_clarification_attempts =
                parse_u32("THUNAI_CONVERSATION_MAX_CLARIFICATION_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("THUNAI_CONVERSATION_STATE_TTL_SECS") {
            self.conversation.state_ttl_secs =
                parse_u64("THUNAI_CONVERSATION_STATE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("THUNAI_CONVERSATION_SWEEP_INTERVAL_SECS") {
            self.conversation.sweep_interval_secs =
                parse_u64("THUNAI_CONVERSATION_SWEEP_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("THUNAI_CONVERSATION_ROUTING_THRESHOLD") {
            self.conversation.routing_threshold =
                parse_f64("THUNAI_CONVERSATION_ROUTING_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("THUNAI_CONVERSATION_PROACTIVE_THRESHOLD") {
            self.conversation.proactive_threshold =
                parse_f64("THUNAI_CONVERSATION_PROACTIVE_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("THUNAI_CONVERSATION_MIN_OFFICE_DAYS") {
            self.conversation.min_office_days =
                parse_u32("THUNAI_CONVERSATION_MIN_OFFICE_DAYS", &value)? as usize;
        }
        if let Some(value) = read_env("THUNAI_CONVERSATION_ADMIN_USER_IDS") {
            self.conversation.admin_user_ids = value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(value) = read_env("THUNAI_COLLECTION_MAX_ATTEMPTS") {
            self.collection.max_attempts = parse_u32("THUNAI_COLLECTION_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("THUNAI_COLLECTION_STOP_ON_DECLINE") {
            self.collection.stop_on_decline =
                parse_bool("THUNAI_COLLECTION_STOP_ON_DECLINE", &value)?;
        }
        if let Some(value) = read_env("THUNAI_COLLECTION_STOP_ON_COMPLETE") {
            self.collection.stop_on_complete =
                parse_bool("THUNAI_COLLECTION_STOP_ON_COMPLETE", &value)?;
        }

        if let Some(value) = read_env("THUNAI_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("THUNAI_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("THUNAI_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("THUNAI_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("THUNAI_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("THUNAI_LOGGING_LEVEL").or_else(|| read_env("THUNAI_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("THUNAI_LOGGING_FORMAT").or_else(|| read_env("THUNAI_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(backend_base_url) = overrides.backend_base_url {
            self.backend.base_url = backend_base_url;
        }
        if let Some(state_store) = overrides.state_store {
            self.conversation.state_store = state_store;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_backend(&self.backend)?;
        validate_conversation(&self.conversation)?;
        validate_collection(&self.collection)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("thunai.toml"), PathBuf::from("config/thunai.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if let Some(base_url) = &llm.base_url {
        validate_http_url("llm.base_url", base_url)?;
    }

    Ok(())
}

fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    validate_http_url("backend.base_url", &backend.base_url)?;
    validate_http_url("backend.availability_url", &backend.availability_url)?;

    if backend.timeout_secs == 0 || backend.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "backend.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    let domain = backend.email_domain.trim();
    if domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(ConfigError::Validation(
            "backend.email_domain must be a bare domain such as `company.com`".to_string(),
        ));
    }

    Ok(())
}

fn validate_conversation(conversation: &ConversationConfig) -> Result<(), ConfigError> {
    if conversation.max_clarification_attempts == 0 {
        return Err(ConfigError::Validation(
            "conversation.max_clarification_attempts must be greater than zero".to_string(),
        ));
    }

    if conversation.state_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "conversation.state_ttl_secs must be greater than zero".to_string(),
        ));
    }

    if conversation.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "conversation.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }

    for (key, value) in [
        ("conversation.routing_threshold", conversation.routing_threshold),
        ("conversation.proactive_threshold", conversation.proactive_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!("{key} must be in range 0.0..=1.0")));
        }
    }

    if conversation.min_office_days > 5 {
        return Err(ConfigError::Validation(
            "conversation.min_office_days must be in range 0..=5".to_string(),
        ));
    }

    Ok(())
}

fn validate_collection(collection: &CollectionConfig) -> Result<(), ConfigError> {
    if collection.max_attempts == 0 {
        return Err(ConfigError::Validation(
            "collection.max_attempts must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    backend: Option<BackendPatch>,
    conversation: Option<ConversationPatch>,
    collection: Option<CollectionPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    base_url: Option<String>,
    availability_url: Option<String>,
    timeout_secs: Option<u64>,
    email_domain: Option<String>,
    dashboard_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationPatch {
    state_store: Option<StateStoreKind>,
    max_clarification_attempts: Option<u32>,
    state_ttl_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    routing_threshold: Option<f64>,
    proactive_threshold: Option<f64>,
    min_office_days: Option<usize>,
    admin_user_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct CollectionPatch {
    max_attempts: Option<u32>,
    stop_on_decline: Option<bool>,
    stop_on_complete: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat,
        StateStoreKind,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_file_or_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["THUNAI_LLM_API_KEY", "GROQ_API_KEY"]);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.llm.provider == LlmProvider::Groq, "groq is the default provider")?;
        ensure(!config.llm.is_available(), "no api key means no remote model")?;
        ensure(
            config.llm.endpoint() == "https://api.groq.com/openai/v1/chat/completions",
            "endpoint should use the provider default base url",
        )?;
        ensure(config.backend.timeout_secs == 10, "backend timeout defaults to 10s")?;
        ensure(config.conversation.max_clarification_attempts == 2, "two clarifications")?;
        ensure(config.collection.policy().max_attempts == 3, "three collection asks")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_THUNAI_LLM_KEY", "gsk-from-env");
        env::set_var("TEST_THUNAI_BACKEND", "http://records.internal:8000/api/v1");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("thunai.toml");
            fs::write(
                &path,
                r#"
[llm]
api_key = "${TEST_THUNAI_LLM_KEY}"

[backend]
base_url = "${TEST_THUNAI_BACKEND}"

[conversation]
state_store = "sqlite"
admin_user_ids = ["U-ADMIN"]
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "gsk-from-env")
                    == Some(true),
                "api key should be interpolated from environment",
            )?;
            ensure(config.llm.is_available(), "configured key makes the model available")?;
            ensure(
                config.backend.base_url == "http://records.internal:8000/api/v1",
                "backend url should be interpolated from environment",
            )?;
            ensure(
                config.conversation.state_store == StateStoreKind::Sqlite,
                "state store should come from file",
            )?;
            ensure(
                config.conversation.admin_user_ids == ["U-ADMIN"],
                "admin list should come from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_THUNAI_LLM_KEY", "TEST_THUNAI_BACKEND"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("THUNAI_LOG_LEVEL", "warn");
        env::set_var("THUNAI_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["THUNAI_LOG_LEVEL", "THUNAI_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("THUNAI_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("THUNAI_CONVERSATION_STATE_TTL_SECS", "600");
        env::set_var("THUNAI_CONVERSATION_ADMIN_USER_IDS", "U1, U2,");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("thunai.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[conversation]
state_ttl_secs = 900
routing_threshold = 0.5

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.conversation.state_ttl_secs == 600, "env ttl should win over file")?;
            ensure(
                (config.conversation.routing_threshold - 0.5).abs() < f64::EPSILON,
                "file threshold should win over default",
            )?;
            ensure(
                config.conversation.admin_user_ids == vec!["U1".to_string(), "U2".to_string()],
                "admin ids are split on commas",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "THUNAI_DATABASE_URL",
            "THUNAI_CONVERSATION_STATE_TTL_SECS",
            "THUNAI_CONVERSATION_ADMIN_USER_IDS",
        ]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("THUNAI_CONVERSATION_PROACTIVE_THRESHOLD", "1.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message)
                    if message.contains("conversation.proactive_threshold")
            );
            ensure(has_message, "validation failure should mention the threshold key")
        })();

        clear_vars(&["THUNAI_CONVERSATION_PROACTIVE_THRESHOLD"]);
        result
    }

    #[test]
    fn malformed_env_value_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("THUNAI_BACKEND_TIMEOUT_SECS", "ten");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, value }) => ensure(
                key == "THUNAI_BACKEND_TIMEOUT_SECS" && value == "ten",
                "error should carry key and value",
            ),
            Ok(_) => Err("expected an invalid override error".to_string()),
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["THUNAI_BACKEND_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("THUNAI_LLM_API_KEY", "gsk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("gsk-secret-value"), "debug output should not contain api key")
        })();

        clear_vars(&["THUNAI_LLM_API_KEY"]);
        result
    }
}
