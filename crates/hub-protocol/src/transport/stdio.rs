//! Server-side stdio transport: the Hub as a child process speaking
//! newline-delimited JSON-RPC over its own stdin/stdout, for launch modes
//! where the Hub is spawned directly instead of addressed over HTTP.
//!
//! Framing mirrors the teacher's `StdioTransport`, with the roles
//! reversed: stdin carries inbound requests, stdout is reserved
//! exclusively for JSON-RPC frames, and diagnostics go to stderr via
//! `tracing`. The `MAX_SKIP_LINES` cap and "stdout is sacred" discipline
//! are unchanged — a misbehaving embedder writing logs to stdout must not
//! be allowed to desync the frame stream forever.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use hub_domain::Result;

use crate::context::RequestContext;
use crate::dispatch::Dispatcher;
use crate::protocol::JsonRpcRequest;

/// Maximum number of non-JSON lines to skip before declaring the peer
/// broken, same cap the teacher's client-side transport uses.
const MAX_SKIP_LINES: usize = 1000;

pub struct StdioServer {
    stdin: Mutex<BufReader<Stdin>>,
    stdout: Mutex<Stdout>,
    alive: AtomicBool,
    dispatcher: Dispatcher,
    session_token: Option<String>,
}

impl StdioServer {
    pub fn new(dispatcher: Dispatcher, session_token: Option<String>) -> Self {
        Self {
            stdin: Mutex::new(BufReader::new(tokio::io::stdin())),
            stdout: Mutex::new(tokio::io::stdout()),
            alive: AtomicBool::new(true),
            dispatcher,
            session_token,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Reads requests until stdin closes or the non-JSON-line budget is
    /// exhausted, dispatching each one and writing its response back as a
    /// single line before reading the next.
    pub async fn serve(&self, pipeline: &crate::middleware::Pipeline) -> Result<()> {
        let mut next_request_id = 1u64;
        loop {
            let Some(line) = self.read_line().await? else {
                return Ok(());
            };

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(req) => req,
                Err(err) => {
                    tracing::warn!(%err, "skipping malformed JSON-RPC request on stdin");
                    continue;
                }
            };

            let mut ctx = RequestContext::new(next_request_id, self.session_token.clone());
            next_request_id += 1;

            let response = match pipeline.run(&mut ctx, &request).await {
                Ok(()) => self.dispatcher.dispatch(&ctx, &request).await,
                Err(err) => crate::protocol::JsonRpcResponse::failure(request.id, crate::protocol::JsonRpcError::from_hub_error(&err)),
            };

            self.write_line(&serde_json::to_string(&response)?).await?;
        }
    }

    async fn write_line(&self, json: &str) -> Result<()> {
        let mut stdout = self.stdout.lock().await;
        stdout.write_all(json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        Ok(())
    }

    /// Returns `Ok(None)` on clean EOF. Skips blank and non-JSON lines
    /// (e.g. a dependency that leaks logging onto stdin's peer side),
    /// giving up past `MAX_SKIP_LINES`.
    async fn read_line(&self) -> Result<Option<String>> {
        let mut stdin = self.stdin.lock().await;
        let mut skipped = 0usize;
        loop {
            let mut line = String::new();
            let bytes_read = stdin.read_line(&mut line).await?;
            if bytes_read == 0 {
                self.alive.store(false, Ordering::SeqCst);
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('{') {
                return Ok(Some(trimmed.to_string()));
            }
            skipped += 1;
            if skipped >= MAX_SKIP_LINES {
                self.alive.store(false, Ordering::SeqCst);
                return Err(hub_domain::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "too many non-JSON lines on stdin",
                )));
            }
            tracing::debug!(line = %trimmed, "skipping non-JSON line on stdin");
        }
    }
}
