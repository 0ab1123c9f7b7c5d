use clap::Parser;
use miette::{IntoDiagnostic, Result};
use settlement_bridge::application::connector::LedgerConnector;
use settlement_bridge::application::dispatcher::EventDispatcher;
use settlement_bridge::config::{BridgeConfig, Cli};
use settlement_bridge::domain::ports::{NotificationSink, NotificationSinkBox, OffsetStoreBox};
use settlement_bridge::error::BridgeError;
use settlement_bridge::infrastructure::file_sink::FileOutputSink;
use settlement_bridge::infrastructure::in_memory::InMemoryOffsetStore;
use settlement_bridge::infrastructure::notifier::{LogNotifier, TelegramNotifier};
use settlement_bridge::infrastructure::tcp_ledger::TcpLedgerClient;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn build_notifier(config: &BridgeConfig) -> NotificationSinkBox {
    let Some(telegram) = &config.telegram else {
        warn!("Telegram is not configured. Notifications will be printed in the logs instead.");
        return Box::new(LogNotifier);
    };

    match TelegramNotifier::new(&telegram.bot_token, telegram.chat_id.clone()) {
        Ok(notifier) => {
            notifier.send("Bot started").await;
            Box::new(notifier)
        }
        Err(e) => {
            warn!(error = %e, "Error setting up the Telegram bot. Notifications will be printed in the logs instead.");
            Box::new(LogNotifier)
        }
    }
}

fn build_offset_store(config: &BridgeConfig) -> Result<OffsetStoreBox> {
    let Some(path) = &config.checkpoint_db else {
        return Ok(Box::new(InMemoryOffsetStore::new()));
    };

    #[cfg(feature = "storage-rocksdb")]
    {
        use settlement_bridge::infrastructure::rocksdb::RocksDBOffsetStore;
        let store = RocksDBOffsetStore::open(path).into_diagnostic()?;
        Ok(Box::new(store))
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    {
        warn!(
            path = %path.display(),
            "WARNING: Persistent checkpoints requested via --checkpoint-db, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory checkpoints."
        );
        Ok(Box::new(InMemoryOffsetStore::new()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = BridgeConfig::from(Cli::parse());

    config.ensure_output_dir().into_diagnostic()?;
    let notifier = build_notifier(&config).await;
    let output = FileOutputSink::new(&config.output_dir);
    let dispatcher = EventDispatcher::new(notifier, Box::new(output));

    let client = TcpLedgerClient::new(&config.ledger_host, config.ledger_port);
    info!(addr = client.addr(), party = %config.party, "Starting settlement bridge");
    let connector = Arc::new(LedgerConnector::new(
        Box::new(client),
        build_offset_store(&config)?,
    ));

    {
        let connector = connector.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                connector.stop().await;
            }
        });
    }

    match connector.connect().await {
        Ok(()) => {}
        Err(BridgeError::Shutdown) => return Ok(()),
        Err(e) => return Err(e).into_diagnostic(),
    }

    info!("Application started... Press Ctrl+C to stop it.");
    let result = connector.subscribe(&config.party, &dispatcher).await;
    connector.stop().await;
    result.into_diagnostic()
}
