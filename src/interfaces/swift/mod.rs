//! SWIFT FIN encoding of settlement messages.

pub mod codec;
