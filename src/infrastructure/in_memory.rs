use crate::domain::command::{Command, SubmitRequest};
use crate::domain::event::{ArchivedEvent, ContractEvent, CreatedEvent, LedgerOffset, Transaction};
use crate::domain::ports::{
    LedgerClient, NotificationSink, OffsetStore, OutputSink, TransactionStream,
};
use crate::domain::settlement::SettlementMessage;
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

const LIVE_CAPACITY: usize = 1024;

/// A ledger held in memory.
///
/// Transactions appended with [`InMemoryLedger::append`] or created through `submit` are
/// replayed to every new subscription and, when the ledger is live, pushed to open ones.
/// A ledger that is not live closes each subscription once its replay is delivered.
/// Failure knobs let tests exercise the connector's retry and error paths.
#[derive(Clone)]
pub struct InMemoryLedger {
    state: Arc<LedgerState>,
}

struct LedgerState {
    log: RwLock<Vec<Transaction>>,
    live_tx: broadcast::Sender<Transaction>,
    live: AtomicBool,
    observers: RwLock<Vec<String>>,
    submitted: RwLock<Vec<SubmitRequest>>,
    connect_failures: AtomicUsize,
    connect_attempts: AtomicUsize,
    fail_stream_after: AtomicUsize,
    close_calls: AtomicUsize,
    close_fails: AtomicBool,
    released: Arc<AtomicUsize>,
    closed: AtomicBool,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        let (live_tx, _) = broadcast::channel(LIVE_CAPACITY);
        Self {
            state: Arc::new(LedgerState {
                log: RwLock::new(Vec::new()),
                live_tx,
                live: AtomicBool::new(false),
                observers: RwLock::new(Vec::new()),
                submitted: RwLock::new(Vec::new()),
                connect_failures: AtomicUsize::new(0),
                connect_attempts: AtomicUsize::new(0),
                fail_stream_after: AtomicUsize::new(usize::MAX),
                close_calls: AtomicUsize::new(0),
                close_fails: AtomicBool::new(false),
                released: Arc::new(AtomicUsize::new(0)),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Keeps subscriptions open after the replay instead of ending them.
    pub fn set_live(&self, live: bool) {
        self.state.live.store(live, Ordering::SeqCst);
    }

    /// The next `count` connect attempts fail.
    pub fn fail_connects(&self, count: usize) {
        self.state.connect_failures.store(count, Ordering::SeqCst);
    }

    /// Subscriptions yield an error after delivering `count` transactions.
    pub fn fail_stream_after(&self, count: usize) {
        self.state.fail_stream_after.store(count, Ordering::SeqCst);
    }

    /// `close` reports an error. The client still ends up closed.
    pub fn fail_close(&self, fail: bool) {
        self.state.close_fails.store(fail, Ordering::SeqCst);
    }

    /// Parties that witness every contract created through `submit`, besides the submitter.
    pub async fn add_observer(&self, party: impl Into<String>) {
        self.state.observers.write().await.push(party.into());
    }

    /// Commits a transaction and returns its offset.
    pub async fn append(&self, events: Vec<ContractEvent>) -> String {
        let mut log = self.state.log.write().await;
        let offset = (log.len() + 1).to_string();
        let transaction = Transaction {
            transaction_id: format!("tx-{offset}"),
            offset: offset.clone(),
            effective_at: Utc::now(),
            events,
        };
        log.push(transaction.clone());
        // No receivers is fine; the log still has it for the next replay.
        let _ = self.state.live_tx.send(transaction);
        offset
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.state.close_calls.load(Ordering::SeqCst)
    }

    pub fn released_subscriptions(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    pub async fn submitted(&self) -> Vec<SubmitRequest> {
        self.state.submitted.read().await.clone()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ConnectionError("ledger client closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn connect(&self) -> Result<()> {
        self.state.connect_attempts.fetch_add(1, Ordering::SeqCst);
        self.ensure_open()?;
        let failing = self
            .state
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(BridgeError::ConnectionError("ledger unavailable".into()));
        }
        Ok(())
    }

    async fn transactions(&self, party: &str, begin: LedgerOffset) -> Result<TransactionStream> {
        self.ensure_open()?;

        // Subscribing under the log lock keeps replay and live delivery gap free.
        let log = self.state.log.read().await;
        let receiver = self.state.live_tx.subscribe();
        let start = match &begin {
            LedgerOffset::Begin => 0,
            LedgerOffset::Absolute(offset) => log
                .iter()
                .position(|tx| &tx.offset == offset)
                .map(|i| i + 1)
                .ok_or_else(|| BridgeError::StreamError(format!("unknown offset {offset}")))?,
        };
        let mut replay: Vec<Result<Transaction>> = log[start..]
            .iter()
            .filter_map(|tx| visible_to(tx.clone(), party))
            .map(Ok)
            .collect();
        drop(log);

        let fail_after = self.state.fail_stream_after.load(Ordering::SeqCst);
        let failing = fail_after != usize::MAX;
        if failing {
            replay.truncate(fail_after);
            replay.push(Err(BridgeError::StreamError("connection reset".into())));
        }

        let replay = tokio_stream::iter(replay);
        let inner: TransactionStream = if self.state.live.load(Ordering::SeqCst) && !failing {
            let party = party.to_string();
            let live = BroadcastStream::new(receiver).filter_map(move |item| match item {
                Ok(tx) => visible_to(tx, &party).map(Ok),
                Err(e) => Some(Err(BridgeError::StreamError(e.to_string()))),
            });
            Box::pin(replay.chain(live))
        } else {
            Box::pin(replay)
        };

        Ok(Box::pin(Subscription {
            inner,
            _release: ReleaseGuard(self.state.released.clone()),
        }))
    }

    async fn submit(&self, request: SubmitRequest) -> Result<()> {
        self.ensure_open()?;
        let mut witnesses = vec![request.party.clone()];
        witnesses.extend(self.state.observers.read().await.iter().cloned());

        let event = match &request.command {
            Command::Create {
                template_id,
                arguments,
            } => Some(ContractEvent::Created(CreatedEvent {
                event_id: format!("#{}:0", request.command_id),
                contract_id: format!("{}:0", request.command_id),
                template_id: template_id.clone(),
                witness_parties: witnesses,
                arguments: arguments.clone(),
            })),
            Command::Exercise {
                template_id,
                contract_id,
                choice,
                ..
            } if choice == "Archive" => Some(ContractEvent::Archived(ArchivedEvent {
                event_id: format!("#{}:0", request.command_id),
                contract_id: contract_id.clone(),
                template_id: template_id.clone(),
                witness_parties: witnesses,
            })),
            Command::Exercise { .. } => None,
        };

        self.state.submitted.write().await.push(request);
        if let Some(event) = event {
            self.append(vec![event]).await;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
        if self.state.close_fails.load(Ordering::SeqCst) {
            return Err(BridgeError::ConnectionError("close handshake failed".into()));
        }
        Ok(())
    }
}

fn visible_to(mut tx: Transaction, party: &str) -> Option<Transaction> {
    tx.events.retain(|e| e.is_visible_to(party));
    (!tx.events.is_empty()).then_some(tx)
}

/// Counts a subscription as released when its stream is dropped.
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct Subscription {
    inner: TransactionStream,
    _release: ReleaseGuard,
}

impl Stream for Subscription {
    type Item = Result<Transaction>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Keeps every notification in memory, in delivery order.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    messages: Arc<RwLock<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn send(&self, text: &str) {
        self.messages.write().await.push(text.to_string());
    }
}

/// Records every write attempt and keeps rendered messages by storage key.
#[derive(Default, Clone)]
pub struct InMemoryOutputSink {
    attempts: Arc<RwLock<Vec<SettlementMessage>>>,
    persisted: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryOutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message handed to `write`, valid or not.
    pub async fn messages(&self) -> Vec<SettlementMessage> {
        self.attempts.read().await.clone()
    }

    pub async fn persisted(&self) -> HashMap<String, String> {
        self.persisted.read().await.clone()
    }
}

#[async_trait]
impl OutputSink for InMemoryOutputSink {
    async fn write(&self, message: &SettlementMessage) {
        self.attempts.write().await.push(message.clone());
        match message.storage_key() {
            Ok(key) => {
                self.persisted.write().await.insert(key, message.render());
            }
            Err(err) => warn!(error = %err, "Not storing settlement message"),
        }
    }
}

/// Checkpoints that live as long as the process.
#[derive(Default, Clone)]
pub struct InMemoryOffsetStore {
    offsets: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OffsetStore for InMemoryOffsetStore {
    async fn load(&self, party: &str) -> Result<Option<String>> {
        Ok(self.offsets.read().await.get(party).cloned())
    }

    async fn commit(&self, party: &str, offset: &str) -> Result<()> {
        self.offsets
            .write()
            .await
            .insert(party.to_string(), offset.to_string());
        Ok(())
    }
}
