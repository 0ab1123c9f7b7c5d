//! Domain model: ledger events, instrument records, settlement messages and the ports
//! the application layer talks through.

pub mod command;
pub mod event;
pub mod instrument;
pub mod ports;
pub mod settlement;
