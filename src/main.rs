use clap::Parser;
use credit_purchase::application::engine::TransactionEngine;
use credit_purchase::application::wallets::WalletService;
use credit_purchase::application::webhooks::{RegisterWebhookRequest, WebhookService};
use credit_purchase::config::Config;
use credit_purchase::domain::partner::PartnerCredentials;
use credit_purchase::domain::ports::{Authenticator, TransactionNotifierArc};
use credit_purchase::domain::wallet::Wallet;
use credit_purchase::domain::webhook::KNOWN_EVENTS;
use credit_purchase::infrastructure::Ledger;
use credit_purchase::infrastructure::in_memory::{InMemoryPartnerStore, InMemoryWebhookStore};
use credit_purchase::infrastructure::jwt::JwtAuthenticator;
use credit_purchase::infrastructure::notifier::{LogNotifier, WebhookNotifier};
use credit_purchase::interfaces::csv::request_reader::RequestReader;
use credit_purchase::interfaces::csv::wallet_reader::WalletReader;
use credit_purchase::interfaces::jsonl::ResponseWriter;
use credit_purchase::{logging, seed};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Purchase requests CSV file
    input: PathBuf,

    /// Wallet seed CSV file. Demo wallets are used when omitted.
    #[arg(long)]
    wallets: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Partner API key
    #[arg(long, default_value = "bella_mobile_prod")]
    client_id: String,

    /// Partner API secret
    #[arg(long, default_value = "secret_bella_123")]
    client_secret: String,

    /// Webhook URL subscribed to transaction events for the session's partner
    #[arg(long)]
    webhook: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().into_diagnostic()?;
    logging::init_logging(&config);
    if config.uses_dev_secret() {
        warn!("JWT_SECRET is not set, using the development secret");
    }

    let ledger = open_ledger(cli.db_path.as_deref()).into_diagnostic()?;

    let seeds = match &cli.wallets {
        Some(path) => load_wallets(path)?,
        None => seed::demo_wallets(),
    };
    let seeded = seed::seed_wallets(ledger.wallets.as_ref(), seeds)
        .await
        .into_diagnostic()?;
    info!(seeded, "wallets ready");

    // Authenticate the partner
    let partners = Arc::new(InMemoryPartnerStore::new());
    seed::seed_partners(partners.as_ref()).await.into_diagnostic()?;
    let auth = JwtAuthenticator::new(partners, &config.jwt_secret, config.token_ttl());
    let token = auth
        .authenticate(&PartnerCredentials {
            api_key: cli.client_id,
            api_secret: cli.client_secret,
        })
        .await
        .into_diagnostic()?;
    let partner = auth.verify(&token.access_token).await.into_diagnostic()?;

    let notifier: TransactionNotifierArc = match cli.webhook {
        Some(url) => {
            let webhooks = Arc::new(InMemoryWebhookStore::new());
            WebhookService::new(webhooks.clone())
                .register(
                    &partner.partner_id,
                    RegisterWebhookRequest {
                        url,
                        events: KNOWN_EVENTS.iter().map(|e| e.to_string()).collect(),
                        secret: String::new(),
                    },
                )
                .await
                .into_diagnostic()?;
            Arc::new(WebhookNotifier::new(webhooks))
        }
        None => Arc::new(LogNotifier),
    };
    let engine = TransactionEngine::start(ledger.clone(), notifier, config.settlement_timeout());

    // Submit requests; settlement runs in the background
    let file = File::open(&cli.input).into_diagnostic()?;
    let mut outcomes = Vec::new();
    for (row, request) in RequestReader::new(file).requests().enumerate() {
        match request {
            Ok(request) => outcomes.push(engine.create_transaction(&partner, request).await),
            Err(e) => warn!(row = row + 1, error = %e, "Error reading request"),
        }
    }
    engine.wait_idle().await.into_diagnostic()?;

    // Output final state
    let stdout = io::stdout();
    let mut writer = ResponseWriter::new(stdout.lock());
    for outcome in outcomes {
        match outcome {
            Ok(created) => {
                let current = engine.get_transaction(&created.id).await.into_diagnostic()?;
                writer.write_transaction(&current)
            }
            Err(e) => writer.write_error(&e),
        }
        .into_diagnostic()?;
    }
    for wallet in WalletService::new(ledger.wallets).all().await.into_diagnostic()? {
        writer.write_wallet(&wallet).into_diagnostic()?;
    }
    writer.flush().into_diagnostic()?;

    Ok(())
}

fn open_ledger(db_path: Option<&Path>) -> credit_purchase::error::Result<Ledger> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ledger::rocksdb(path),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Ledger::in_memory())
        }
        None => Ok(Ledger::in_memory()),
    }
}

fn load_wallets(path: &Path) -> Result<Vec<Wallet>> {
    let file = File::open(path).into_diagnostic()?;
    WalletReader::new(file)
        .wallets()
        .collect::<credit_purchase::error::Result<Vec<_>>>()
        .into_diagnostic()
}
