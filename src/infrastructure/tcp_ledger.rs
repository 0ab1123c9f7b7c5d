use crate::domain::command::SubmitRequest;
use crate::domain::event::LedgerOffset;
use crate::domain::ports::{LedgerClient, TransactionStream};
use crate::error::{BridgeError, Result};
use crate::interfaces::json::transaction_reader::{MAX_LINE_LENGTH, TransactionReader};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::debug;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One request per connection, written as a single JSON line.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerRequest {
    Ping,
    Subscribe { party: String, begin: LedgerOffset },
    Submit(SubmitRequest),
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LedgerReply {
    Ok,
    Error { message: String },
}

/// Ledger client speaking newline-delimited JSON over TCP.
///
/// `ping` and `submit` read a single [`LedgerReply`] line. `subscribe` turns the connection into
/// a stream of transaction lines that lasts until either side closes it.
pub struct TcpLedgerClient {
    addr: String,
    closed: AtomicBool,
}

impl TcpLedgerClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            closed: AtomicBool::new(false),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn open(&self, request: &LedgerRequest) -> Result<TcpStream> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ConnectionError("ledger client closed".into()));
        }
        let mut stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                BridgeError::ConnectionError(format!(
                    "{}: no answer within {CONNECT_TIMEOUT:?}",
                    self.addr
                ))
            })?
            .map_err(|e| BridgeError::ConnectionError(format!("{}: {e}", self.addr)))?;

        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        stream.write_all(&line).await?;
        stream.flush().await?;
        Ok(stream)
    }

    async fn call(&self, request: &LedgerRequest) -> Result<LedgerReply> {
        let stream = self.open(request).await?;
        let mut lines = FramedRead::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let line = lines.next().await.ok_or_else(|| {
            BridgeError::ConnectionError("ledger closed the connection without replying".into())
        })??;
        Ok(serde_json::from_str(&line)?)
    }
}

#[async_trait]
impl LedgerClient for TcpLedgerClient {
    async fn connect(&self) -> Result<()> {
        match self.call(&LedgerRequest::Ping).await? {
            LedgerReply::Ok => Ok(()),
            LedgerReply::Error { message } => Err(BridgeError::ConnectionError(message)),
        }
    }

    async fn transactions(&self, party: &str, begin: LedgerOffset) -> Result<TransactionStream> {
        let request = LedgerRequest::Subscribe {
            party: party.to_string(),
            begin,
        };
        let stream = self.open(&request).await?;
        debug!(addr = %self.addr, party, "Transaction stream opened");
        Ok(Box::pin(TransactionReader::new(stream).transactions()))
    }

    async fn submit(&self, request: SubmitRequest) -> Result<()> {
        let command_id = request.command_id.clone();
        match self.call(&LedgerRequest::Submit(request)).await? {
            LedgerReply::Ok => Ok(()),
            LedgerReply::Error { message } => Err(BridgeError::CommandRejected {
                command_id,
                reason: message,
            }),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
