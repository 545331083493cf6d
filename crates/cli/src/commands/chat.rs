//! Local terminal chat: the same runtime and dispatcher the server uses, fed
//! line by line from a console transport.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use thunai_agent::{AgentPorts, AgentRuntime, AgentSettings, LlmClient, SystemClock};
use thunai_core::config::{AppConfig, LoadOptions};
use thunai_db::{InMemoryCollectionLedger, InMemoryConversationStateStore, InMemoryRecordStore};
use thunai_server::audit::TracingAuditSink;
use thunai_server::bootstrap::connect_database;
use thunai_server::llm::OpenAiCompatibleClient;
use thunai_server::{build_runtime, init_logging};
use thunai_transport::{dispatcher_for, ConsoleTransport, ReconnectPolicy, SocketModeRunner};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::commands::CommandResult;

#[derive(Clone, Debug)]
pub struct ChatOptions {
    pub user_id: String,
    /// Keep users, moments and schedules in memory instead of the backend API.
    pub offline: bool,
}

pub fn run(options: ChatOptions) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config.logging);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let user_id = options.user_id.clone();
    let outcome = runtime.block_on(async {
        let transport = ConsoleTransport::stdio(user_id);
        session(&config, &options, transport).await.map(drop)
    });

    match outcome {
        Ok(()) => CommandResult { exit_code: 0, output: String::new() },
        Err(error) => CommandResult::failure("chat", "chat_session", format!("{error:#}"), 4),
    }
}

/// Runs one chat session to completion and hands the transport back so the
/// caller can inspect what was written.
pub async fn session<R, W>(
    config: &AppConfig,
    options: &ChatOptions,
    transport: ConsoleTransport<R, W>,
) -> Result<ConsoleTransport<R, W>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let runtime = if options.offline {
        offline_runtime(config)?
    } else {
        let pool = connect_database(config).await?;
        build_runtime(config, &pool)?.0
    };

    let transport = Arc::new(transport);
    let runner = SocketModeRunner::new(
        transport.clone(),
        dispatcher_for(Arc::new(runtime)),
        ReconnectPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 },
    );
    runner.start().await.context("chat session ended with an error")?;
    drop(runner);

    Arc::try_unwrap(transport).map_err(|_| anyhow!("console transport is still shared"))
}

fn offline_runtime(config: &AppConfig) -> Result<AgentRuntime> {
    let records = Arc::new(InMemoryRecordStore::default());
    let llm = OpenAiCompatibleClient::from_config(&config.llm)?
        .map(|client| Arc::new(client) as Arc<dyn LlmClient>);

    Ok(AgentRuntime::new(
        AgentPorts {
            states: Arc::new(InMemoryConversationStateStore::default()),
            ledger: Arc::new(InMemoryCollectionLedger::default()),
            records: records.clone(),
            schedules: records,
            audit: Arc::new(TracingAuditSink),
            llm,
            clock: Arc::new(SystemClock),
        },
        AgentSettings::from_config(config),
    ))
}
