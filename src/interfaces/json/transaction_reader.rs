use crate::domain::event::Transaction;
use crate::error::{BridgeError, Result};
use tokio::io::AsyncRead;
use tokio_stream::{Stream, StreamExt};
use tokio_util::codec::{FramedRead, LinesCodec};

/// Longest frame accepted from the ledger, in bytes.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Reads ledger transactions from a newline-delimited JSON source.
///
/// Blank lines are keep-alives and are skipped. Every other line must hold one transaction.
/// Lines longer than the configured limit are reported as errors instead of being buffered.
pub struct TransactionReader<R> {
    reader: R,
    max_line_length: usize,
}

impl<R> TransactionReader<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Creates a new `TransactionReader` from any async source (e.g. a socket), capped at
    /// [`MAX_LINE_LENGTH`] per line.
    pub fn new(source: R) -> Self {
        Self::with_max_line_length(source, MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(source: R, max_line_length: usize) -> Self {
        Self {
            reader: source,
            max_line_length,
        }
    }

    /// Returns a stream that lazily reads and deserializes transactions.
    pub fn transactions(self) -> impl Stream<Item = Result<Transaction>> + Send + 'static {
        FramedRead::new(
            self.reader,
            LinesCodec::new_with_max_length(self.max_line_length),
        )
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
        .map(|line| {
            let line = line?;
            serde_json::from_str(&line).map_err(|e| BridgeError::StreamError(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::ContractEvent;
    use std::io::Cursor;

    const TX: &str = r##"{"transactionId":"tx-1","offset":"1","effectiveAt":"2026-10-16T10:00:00Z","events":[{"kind":"archived","eventId":"#1:0","contractId":"c1","templateId":{"packageId":"p","moduleName":"M","entityName":"E"}}]}"##;

    #[tokio::test]
    async fn test_reader_valid_stream() {
        let data = format!("{TX}\n\n{}\n", TX.replace("tx-1", "tx-2"));
        let reader = TransactionReader::new(Cursor::new(data.into_bytes()));
        let results: Vec<Result<Transaction>> = reader.transactions().collect().await;

        assert_eq!(results.len(), 2);
        let tx1 = results[0].as_ref().unwrap();
        assert_eq!(tx1.transaction_id, "tx-1");
        assert!(matches!(tx1.events[0], ContractEvent::Archived(_)));
        assert_eq!(results[1].as_ref().unwrap().transaction_id, "tx-2");
    }

    #[tokio::test]
    async fn test_reader_malformed_line() {
        let data = format!("{TX}\n{{\"transactionId\": 3}}\n");
        let reader = TransactionReader::new(Cursor::new(data.into_bytes()));
        let results: Vec<Result<Transaction>> = reader.transactions().collect().await;

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(BridgeError::StreamError(_))));
    }

    #[tokio::test]
    async fn test_reader_rejects_oversized_line() {
        let data = format!("{}\n{TX}\n", "x".repeat(64));
        let reader = TransactionReader::with_max_line_length(Cursor::new(data.into_bytes()), 32);
        let mut transactions = Box::pin(reader.transactions());
        let first = transactions.next().await.unwrap();

        assert!(matches!(first, Err(BridgeError::FrameError(_))));
    }
}
