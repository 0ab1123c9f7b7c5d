use crate::domain::ports::OutputSink;
use crate::domain::settlement::SettlementMessage;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Writes each settlement message to `<dir>/MT202_<uetr>.txt`.
///
/// The directory is expected to exist; it is created at startup, not here.
#[derive(Clone)]
pub struct FileOutputSink {
    dir: PathBuf,
}

impl FileOutputSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validates the UETR and writes the message, returning the file written.
    pub async fn try_write(&self, message: &SettlementMessage) -> Result<PathBuf> {
        let path = self.dir.join(message.storage_key()?);
        tokio::fs::write(&path, message.render()).await?;
        Ok(path)
    }
}

#[async_trait]
impl OutputSink for FileOutputSink {
    async fn write(&self, message: &SettlementMessage) {
        match self.try_write(message).await {
            Ok(path) => info!(path = %path.display(), "Settlement message written"),
            Err(err) => warn!(
                uetr = %message.uetr,
                error = %err,
                "Could not write the settlement message into a file"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::{AccountDetails, PaymentInstruction};
    use crate::error::BridgeError;
    use crate::interfaces::swift::codec;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn message() -> SettlementMessage {
        let details = |name: &str| AccountDetails {
            name: name.into(),
            bic: format!("{name}Bic"),
            iban: format!("{name}Iban"),
        };
        codec::encode(&PaymentInstruction {
            payer_details: details("payer"),
            payee_details: details("payee"),
            transaction_reference: "txRefCode".into(),
            amount: dec!(10),
            currency: "USD".into(),
            payment_date: Utc::now(),
            regulator: "regulator".into(),
        })
    }

    #[tokio::test]
    async fn test_writes_file_named_after_uetr() {
        let dir = tempdir().unwrap();
        let sink = FileOutputSink::new(dir.path());
        let msg = message();

        sink.write(&msg).await;

        let path = dir.path().join(format!("MT202_{}.txt", msg.uetr));
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, msg.render());
    }

    #[tokio::test]
    async fn test_malformed_uetr_not_written() {
        let dir = tempdir().unwrap();
        let sink = FileOutputSink::new(dir.path());
        let mut msg = message();
        msg.uetr = "definitely-not-a-uuid".into();

        let err = sink.try_write(&msg).await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidUetr(_)));

        sink.write(&msg).await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let sink = FileOutputSink::new(&missing);
        let msg = message();

        assert!(matches!(
            sink.try_write(&msg).await,
            Err(BridgeError::IoError(_))
        ));
        sink.write(&msg).await;
        assert!(!missing.exists());
    }
}
