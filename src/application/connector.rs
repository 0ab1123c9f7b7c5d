use crate::domain::command::{Command, SubmitRequest};
use crate::domain::event::LedgerOffset;
use crate::domain::ports::{EventHandler, LedgerClientBox, OffsetStoreBox};
use crate::error::{BridgeError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Owns the ledger connection and the single subscription feeding the dispatcher.
///
/// `connect` and `subscribe` block their task until they finish; `stop` may be called from any
/// other task, any number of times, and makes both return.
pub struct LedgerConnector {
    client: LedgerClientBox,
    offsets: OffsetStoreBox,
    retry_delay: Duration,
    shutdown: CancellationToken,
    stopped: AtomicBool,
}

impl LedgerConnector {
    pub fn new(client: LedgerClientBox, offsets: OffsetStoreBox) -> Self {
        Self {
            client,
            offsets,
            retry_delay: DEFAULT_RETRY_DELAY,
            shutdown: CancellationToken::new(),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Connects, retrying with a fixed delay until the ledger answers.
    ///
    /// Returns [`BridgeError::Shutdown`] if `stop` is called before a connection is made, even
    /// while an attempt is still in flight.
    pub async fn connect(&self) -> Result<()> {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let outcome = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(BridgeError::Shutdown),
                outcome = self.client.connect() => outcome,
            };
            match outcome {
                Ok(()) => {
                    info!(attempt, "Connected to ledger");
                    return Ok(());
                }
                Err(err) => {
                    info!(attempt, error = %err, "Connecting to ledger");
                }
            }

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(BridgeError::Shutdown),
                _ = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }

    /// Streams every event visible to `party` into `handler` until stopped.
    ///
    /// Starts from the committed checkpoint when there is one, otherwise from the beginning of
    /// the ledger. Returns `Ok` only after `stop`. Stream errors, handler errors and a stream
    /// that the ledger closes on its own end the subscription and are returned.
    ///
    /// # Arguments
    ///
    /// * `party` - The party whose visible transactions are followed.
    /// * `handler` - Receives every event, in delivery order. The offset of a transaction is
    ///   committed only after all of its events were accepted.
    pub async fn subscribe(&self, party: &str, handler: &dyn EventHandler) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(BridgeError::Shutdown);
        }

        let begin = match self.offsets.load(party).await? {
            Some(offset) => LedgerOffset::Absolute(offset),
            None => LedgerOffset::Begin,
        };
        info!(party, begin = ?begin, "Subscribing to transactions");

        let mut transactions = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                info!(party, "Subscription cancelled while opening");
                return Ok(());
            }
            opened = self.client.transactions(party, begin) => opened?,
        };
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!(party, "Subscription cancelled");
                    return Ok(());
                }
                next = transactions.next() => next,
            };

            let Some(transaction) = next else {
                error!(party, "Transaction stream ended without a stop request");
                return Err(BridgeError::StreamError("transaction stream ended".into()));
            };
            let transaction = transaction?;
            debug!(
                transaction_id = %transaction.transaction_id,
                offset = %transaction.offset,
                events = transaction.events.len(),
                "Transaction received"
            );

            for event in transaction.events {
                handler.accept(event).await?;
            }
            self.offsets.commit(party, &transaction.offset).await?;
        }
    }

    /// Submits a command as `party` and waits for the ledger to confirm it.
    ///
    /// Returns the generated command id.
    pub async fn submit(&self, party: &str, command: Command) -> Result<String> {
        let command_id = Uuid::new_v4().to_string();
        let request = SubmitRequest::new(command_id.clone(), party, command);
        debug!(command_id = %command_id, party, "Submitting command");
        self.client.submit(request).await?;
        Ok(command_id)
    }

    /// Cancels the subscription and closes the client. Only the first call has an effect.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Ledger connector already stopped");
            return;
        }

        self.shutdown.cancel();
        if let Err(err) = self.client.close().await {
            warn!(error = %err, "Error closing ledger connection");
        }
        info!("Ledger connector stopped");
    }
}
