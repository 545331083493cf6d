use std::sync::Arc;

use thunai_agent::{AgentPorts, AgentRuntime, AgentSettings, LlmClient, SystemClock};
use thunai_core::config::{AppConfig, ConfigError, LoadOptions, StateStoreKind};
use thunai_core::{CollectionLedger, ConversationStateStore, RecordStoreError};
use thunai_db::{
    connect_with_settings, migrations, DbPool, InMemoryCollectionLedger,
    InMemoryConversationStateStore, SqlCollectionLedger, SqlConversationStateStore,
};
use thunai_transport::{dispatcher_for, EventDispatcher, SocketModeRunner};
use thiserror::Error;
use tracing::info;

use crate::audit::TracingAuditSink;
use crate::backend::HttpRecordStore;
use crate::llm::OpenAiCompatibleClient;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<AgentRuntime>,
    /// Dispatcher behind the HTTP ingress.
    pub dispatcher: Arc<EventDispatcher>,
    pub socket_runner: SocketModeRunner,
    pub llm_configured: bool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("backend client setup failed: {0}")]
    Backend(#[source] RecordStoreError),
    #[error("language model client setup failed: {0}")]
    Llm(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        state_store = config.conversation.state_store.as_str(),
        llm_provider = config.llm.provider.as_str(),
        "starting application bootstrap"
    );

    let db_pool = connect_database(&config).await?;
    let (runtime, llm_configured) = build_runtime(&config, &db_pool)?;
    let runtime = Arc::new(runtime);

    Ok(Application {
        dispatcher: Arc::new(dispatcher_for(runtime.clone())),
        socket_runner: SocketModeRunner::idle(dispatcher_for(runtime.clone())),
        config,
        db_pool,
        runtime,
        llm_configured,
    })
}

/// Connects and applies pending migrations.
pub async fn connect_database(config: &AppConfig) -> Result<DbPool, BootstrapError> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );
    Ok(db_pool)
}

/// Wires the runtime's ports from configuration. The flag reports whether a
/// language model client was configured.
pub fn build_runtime(
    config: &AppConfig,
    db_pool: &DbPool,
) -> Result<(AgentRuntime, bool), BootstrapError> {
    let (states, ledger): (Arc<dyn ConversationStateStore>, Arc<dyn CollectionLedger>) =
        match config.conversation.state_store {
            StateStoreKind::Memory => (
                Arc::new(InMemoryConversationStateStore::default()),
                Arc::new(InMemoryCollectionLedger::default()),
            ),
            StateStoreKind::Sqlite => (
                Arc::new(SqlConversationStateStore::new(db_pool.clone())),
                Arc::new(SqlCollectionLedger::new(db_pool.clone())),
            ),
        };

    let records = Arc::new(HttpRecordStore::new(&config.backend).map_err(BootstrapError::Backend)?);
    let llm = OpenAiCompatibleClient::from_config(&config.llm)
        .map_err(|error| BootstrapError::Llm(error.to_string()))?
        .map(|client| Arc::new(client) as Arc<dyn LlmClient>);
    let llm_configured = llm.is_some();
    info!(
        event_name = "system.bootstrap.ports_ready",
        correlation_id = "bootstrap",
        llm_configured,
        backend_url = %config.backend.base_url,
        "runtime ports wired"
    );

    let runtime = AgentRuntime::new(
        AgentPorts {
            states,
            ledger,
            records: records.clone(),
            schedules: records,
            audit: Arc::new(TracingAuditSink),
            llm,
            clock: Arc::new(SystemClock),
        },
        AgentSettings::from_config(config),
    );
    Ok((runtime, llm_configured))
}
