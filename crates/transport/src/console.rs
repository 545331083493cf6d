use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

use crate::blocks::{Block, MessageTemplate};
use crate::events::{ChatEnvelope, ChatEvent, MessageEvent};
use crate::socket::{SocketTransport, TransportError};

pub const CONSOLE_CHANNEL: &str = "console";
const QUIT_COMMANDS: [&str; 3] = ["/quit", "/exit", "/q"];

/// Line-oriented transport: each input line is a direct message from one user,
/// replies are written back as text.
pub struct ConsoleTransport<R, W> {
    user_id: String,
    lines: Mutex<Lines<R>>,
    output: Mutex<W>,
    sequence: AtomicU64,
}

impl ConsoleTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    pub fn stdio(user_id: impl Into<String>) -> Self {
        Self::new(user_id, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(user_id: impl Into<String>, input: R, output: W) -> Self {
        Self {
            user_id: user_id.into(),
            lines: Mutex::new(input.lines()),
            output: Mutex::new(output),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn into_output(self) -> W {
        self.output.into_inner()
    }

    async fn write_line(&self, line: &str) -> Result<(), TransportError> {
        let mut output = self.output.lock().await;
        output
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|error| TransportError::Send(error.to_string()))?;
        output.flush().await.map_err(|error| TransportError::Send(error.to_string()))
    }
}

#[async_trait]
impl<R, W> SocketTransport for ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn connect(&self) -> Result<(), TransportError> {
        self.write_line("Chatting with Thunai. Type /quit to leave.").await
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        let mut lines = self.lines.lock().await;
        loop {
            let next =
                lines.next_line().await.map_err(|error| TransportError::Receive(error.to_string()));
            let Some(line) = next? else {
                return Ok(None);
            };
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if QUIT_COMMANDS.contains(&text) {
                return Ok(None);
            }

            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
            return Ok(Some(ChatEnvelope {
                envelope_id: format!("console-{sequence}"),
                event: ChatEvent::Message(MessageEvent {
                    channel_id: CONSOLE_CHANNEL.to_owned(),
                    user_id: self.user_id.clone(),
                    display_name: None,
                    text: text.to_owned(),
                    is_group: false,
                    mentions_bot: false,
                }),
            }));
        }
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(
        &self,
        _channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<(), TransportError> {
        self.write_line(&format!("thunai> {}", message.fallback_text)).await?;
        for block in &message.blocks {
            if let Block::Actions { elements, .. } = block {
                let labels: Vec<String> = elements
                    .iter()
                    .map(|button| {
                        let value = button.value.as_deref().unwrap_or("?");
                        format!("[{value}] {}", button.text.as_str())
                    })
                    .collect();
                self.write_line(&format!("        {}", labels.join("  "))).await?;
            }
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.write_line("Bye! 👋").await
    }
}
