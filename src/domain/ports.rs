use super::command::SubmitRequest;
use super::event::{ContractEvent, LedgerOffset, Transaction};
use super::settlement::SettlementMessage;
use crate::error::Result;
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// Transactions in ledger delivery order. Dropping the stream releases the subscription.
pub type TransactionStream = Pin<Box<dyn Stream<Item = Result<Transaction>> + Send>>;

/// Client side of the ledger API.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Checks that the ledger is reachable. A failure here is transient and may be retried.
    async fn connect(&self) -> Result<()>;

    /// Opens a stream of the transactions visible to a party.
    ///
    /// # Arguments
    ///
    /// * `party` - Only events this party witnesses are delivered; transactions left empty
    ///   by that filter are skipped.
    /// * `begin` - Where the stream starts in the ledger history.
    ///
    /// # Returns
    ///
    /// A stream that replays the history and then follows new commits. It ends only when the
    /// ledger closes it.
    async fn transactions(&self, party: &str, begin: LedgerOffset) -> Result<TransactionStream>;

    /// Submits a command and waits for the ledger to accept or reject it.
    ///
    /// # Errors
    ///
    /// [`crate::error::BridgeError::CommandRejected`] when the ledger refuses the command.
    async fn submit(&self, request: SubmitRequest) -> Result<()>;

    /// Releases the client. Requests made afterwards fail.
    async fn close(&self) -> Result<()>;
}

/// Receives every event of a subscription, one at a time.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles one event. An error is fatal to the subscription delivering it.
    async fn accept(&self, event: ContractEvent) -> Result<()>;
}

/// Best-effort text delivery. Implementations swallow their own failures.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, text: &str);
}

/// Persists settlement messages keyed by UETR. Implementations swallow their own failures.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn write(&self, message: &SettlementMessage);
}

/// Last fully handled transaction offset per party.
#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// The committed offset, or `None` when the party was never subscribed.
    async fn load(&self, party: &str) -> Result<Option<String>>;

    /// Records that every event up to and including `offset` was handled.
    async fn commit(&self, party: &str, offset: &str) -> Result<()>;
}

pub type LedgerClientBox = Box<dyn LedgerClient>;
pub type NotificationSinkBox = Box<dyn NotificationSink>;
pub type OutputSinkBox = Box<dyn OutputSink>;
pub type OffsetStoreBox = Box<dyn OffsetStore>;
