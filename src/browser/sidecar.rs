//! External automation driver spoken to over stdin/stdout.
//!
//! The sidecar owns the real browser (Playwright, WebDriver, anything):
//! this side spawns the configured driver command and exchanges exactly one
//! JSON request line for one JSON reply line per operation. Every exchange
//! is bounded by a hard timeout and the child is killed when the session is
//! dropped, so a wedged driver can never hang the pipeline.
//!
//! Protocol: requests are `{"id": N, "op": "...", ...}`; replies are
//! `{"id": N, "ok": true, ...}` or `{"id": N, "ok": false, "kind":
//! "timeout"|"operation", "error": "..."}`. A `find` that matches nothing
//! replies `ok: true` with no `element`; absence is not a failure.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, instrument, warn};

use super::{BrowserError, BrowserSession, ElementHandle};

/// Hard bound on a single driver exchange that carries no wait of its own.
const REPLY_TIMEOUT: Duration = Duration::from_secs(60);

/// Grace added on top of a wait operation's own timeout before the
/// exchange itself is considered dead.
const WAIT_GRACE: Duration = Duration::from_secs(15);

/// Bound on the launch handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct DriverRequest<'a> {
    id: u64,
    #[serde(flatten)]
    command: DriverCommand<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DriverCommand<'a> {
    Ping,
    Goto { url: &'a str },
    CurrentUrl,
    Find { selector: &'a str },
    FindAll { selector: &'a str },
    Attribute { element: &'a str, name: &'a str },
    Click { element: &'a str },
    WaitForElement { selector: &'a str, timeout_ms: u64 },
    WaitForContextCount { count: usize, timeout_ms: u64 },
    FocusLatestContext,
    CloseExtraContexts,
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    element: Option<String>,
    #[serde(default)]
    elements: Option<Vec<String>>,
    #[serde(default)]
    value: Option<String>,
}

struct DriverIo {
    // Held so the child is killed when the session drops.
    _child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

/// Browser session backed by a spawned automation driver process.
pub struct SidecarBrowser {
    command: String,
    io: tokio::sync::Mutex<DriverIo>,
}

impl std::fmt::Debug for SidecarBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SidecarBrowser")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl SidecarBrowser {
    /// Spawns the driver command (split on whitespace) and performs the
    /// protocol handshake.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Launch`] when the process cannot be spawned
    /// or does not answer the handshake. Session initialization failure is
    /// fatal to the enclosing run.
    #[instrument(skip_all, fields(command = %command))]
    pub async fn launch(command: &str) -> Result<Self, BrowserError> {
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(BrowserError::Launch {
                command: command.to_string(),
                reason: "empty driver command".to_string(),
            });
        };

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::Launch {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| BrowserError::Launch {
            command: command.to_string(),
            reason: "driver stdin unavailable".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| BrowserError::Launch {
            command: command.to_string(),
            reason: "driver stdout unavailable".to_string(),
        })?;

        let session = Self {
            command: command.to_string(),
            io: tokio::sync::Mutex::new(DriverIo {
                _child: child,
                stdin,
                lines: BufReader::new(stdout).lines(),
                next_id: 0,
            }),
        };

        session
            .call(DriverCommand::Ping, HANDSHAKE_TIMEOUT)
            .await
            .map_err(|e| BrowserError::Launch {
                command: command.to_string(),
                reason: format!("handshake failed: {e}"),
            })?;

        debug!("browser driver launched");
        Ok(session)
    }

    async fn call(
        &self,
        command: DriverCommand<'_>,
        reply_timeout: Duration,
    ) -> Result<DriverReply, BrowserError> {
        let mut io = self.io.lock().await;
        let id = io.next_id;
        io.next_id += 1;

        let line = serde_json::to_string(&DriverRequest { id, command })?;
        debug!(request = %line, "driver request");
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.write_all(b"\n").await?;
        io.stdin.flush().await?;

        let reply_line = tokio::time::timeout(reply_timeout, io.lines.next_line())
            .await
            .map_err(|_| BrowserError::Timeout {
                what: "driver reply".to_string(),
                timeout: reply_timeout,
            })??
            .ok_or(BrowserError::Closed)?;

        let reply: DriverReply = serde_json::from_str(&reply_line)?;
        if reply.id != id {
            return Err(BrowserError::Protocol(format!(
                "reply id {} does not match request id {id}",
                reply.id
            )));
        }

        if reply.ok {
            Ok(reply)
        } else {
            let message = reply.error.unwrap_or_else(|| "unspecified".to_string());
            match reply.kind.as_deref() {
                Some("timeout") => Err(BrowserError::Timeout {
                    what: message,
                    timeout: reply_timeout,
                }),
                _ => Err(BrowserError::Operation(message)),
            }
        }
    }
}

#[async_trait]
impl BrowserSession for SidecarBrowser {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.call(DriverCommand::Goto { url }, REPLY_TIMEOUT).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let reply = self.call(DriverCommand::CurrentUrl, REPLY_TIMEOUT).await?;
        reply
            .url
            .ok_or_else(|| BrowserError::Protocol("current_url reply missing url".to_string()))
    }

    async fn find(&self, selector: &str) -> Result<Option<ElementHandle>, BrowserError> {
        let reply = self.call(DriverCommand::Find { selector }, REPLY_TIMEOUT).await?;
        Ok(reply.element.map(ElementHandle::new))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<ElementHandle>, BrowserError> {
        let reply = self
            .call(DriverCommand::FindAll { selector }, REPLY_TIMEOUT)
            .await?;
        Ok(reply
            .elements
            .unwrap_or_default()
            .into_iter()
            .map(ElementHandle::new)
            .collect())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let reply = self
            .call(
                DriverCommand::Attribute {
                    element: element.id(),
                    name,
                },
                REPLY_TIMEOUT,
            )
            .await?;
        Ok(reply.value)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.call(
            DriverCommand::Click {
                element: element.id(),
            },
            REPLY_TIMEOUT,
        )
        .await?;
        Ok(())
    }

    async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let reply = self
            .call(
                DriverCommand::WaitForElement {
                    selector,
                    timeout_ms,
                },
                timeout + WAIT_GRACE,
            )
            .await?;
        reply.element.map(ElementHandle::new).ok_or_else(|| {
            BrowserError::Timeout {
                what: format!("element matching `{selector}`"),
                timeout,
            }
        })
    }

    async fn wait_for_context_count(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.call(
            DriverCommand::WaitForContextCount { count, timeout_ms },
            timeout + WAIT_GRACE,
        )
        .await?;
        Ok(())
    }

    async fn focus_latest_context(&self) -> Result<(), BrowserError> {
        self.call(DriverCommand::FocusLatestContext, REPLY_TIMEOUT)
            .await?;
        Ok(())
    }

    async fn close_extra_contexts(&self) -> Result<(), BrowserError> {
        if let Err(e) = self
            .call(DriverCommand::CloseExtraContexts, REPLY_TIMEOUT)
            .await
        {
            warn!(error = %e, "failed to close extra browser contexts");
            return Err(e);
        }
        Ok(())
    }
}
