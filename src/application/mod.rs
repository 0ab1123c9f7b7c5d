//! Application layer: the ledger connection lifecycle and the event dispatcher.
//!
//! `LedgerConnector` drives a single subscription on one task and hands every event to an
//! `EventHandler`, normally the `EventDispatcher`. Handling is sequential, so a slow sink slows
//! the subscription down instead of queueing events.

pub mod connector;
pub mod dispatcher;
