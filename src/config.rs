use crate::error::Result;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_OUTPUT_DIR: &str = "./output_messages";
pub const DEFAULT_PARTY: &str = "Intermediary";

/// Listens to the ledger as one party, announces DCN lifecycle events and writes MT202 files
/// for payment instructions.
#[derive(Parser, Debug)]
#[command(name = "settlement-bridge", author, version, about, long_about = None)]
pub struct Cli {
    /// Ledger host
    #[arg(long, env = "LEDGER_HOST", default_value = "localhost")]
    pub ledger_host: String,

    /// Ledger port
    #[arg(long, env = "LEDGER_PORT", default_value_t = 7600)]
    pub ledger_port: u16,

    /// Party whose transactions are followed
    #[arg(long, env = "LEDGER_PARTY", default_value = DEFAULT_PARTY)]
    pub party: String,

    /// Directory receiving the MT202_<uetr>.txt files (created if absent)
    #[arg(long, env = "OUTPUT_PATH", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Telegram bot token. Without it (or the chat id) notifications are only logged.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    /// Telegram chat receiving the notifications
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// Path to a persistent checkpoint database. Requires the `storage-rocksdb` feature.
    #[arg(long, env = "CHECKPOINT_DB")]
    pub checkpoint_db: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub ledger_host: String,
    pub ledger_port: u16,
    pub party: String,
    pub output_dir: PathBuf,
    pub telegram: Option<TelegramConfig>,
    pub checkpoint_db: Option<PathBuf>,
}

impl BridgeConfig {
    pub fn ensure_output_dir(&self) -> Result<()> {
        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir)?;
        }
        Ok(())
    }
}

impl From<Cli> for BridgeConfig {
    fn from(cli: Cli) -> Self {
        let telegram = match (cli.telegram_bot_token, cli.telegram_chat_id) {
            (Some(bot_token), Some(chat_id)) if !bot_token.is_empty() && !chat_id.is_empty() => {
                Some(TelegramConfig { bot_token, chat_id })
            }
            _ => None,
        };
        Self {
            ledger_host: cli.ledger_host,
            ledger_port: cli.ledger_port,
            party: cli.party,
            output_dir: cli.output_dir,
            telegram,
            checkpoint_db: cli.checkpoint_db,
        }
    }
}
