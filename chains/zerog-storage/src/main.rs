use anyhow::Result;
use clap::Parser;
use core_logic::config::WalletSource;
use core_logic::{
    setup_logger, CoreError, EnvKeyLoader, FileKeyLoader, InputError, KeyLoader, KeyStore,
    ShutdownSignal, Sleeper, TokioSleeper,
};
use dialoguer::{theme::ColorfulTheme, Input};
use dotenv::dotenv;
use ethers::signers::Signer;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use zerog_storage::chain::{credential_to_wallet, ChainClient, EvmChainClient};
use zerog_storage::config::StorageConfig;
use zerog_storage::content::{ContentAddresser, HttpContentSource};
use zerog_storage::http::build_client;
use zerog_storage::indexer::HttpIndexer;
use zerog_storage::scheduler::{log_summary, parse_upload_count, RunDelays, RunScheduler};
use zerog_storage::uploader::{UploadOrchestrator, UploadSettings};

#[derive(Parser, Debug)]
#[command(author, version, about = "Automated uploads to 0G storage", long_about = None)]
struct Args {
    #[arg(short, long, default_value = StorageConfig::DEFAULT_PATH)]
    config: String,
    /// Uploads per wallet. Prompts when omitted.
    #[arg(short = 'n', long)]
    count: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _log_guard = setup_logger();
    dotenv().ok();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Main process error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Loading config from: {}", args.config);
    let config = StorageConfig::load(&args.config)?;

    let loader: Box<dyn KeyLoader> = match config.wallet_source() {
        WalletSource::Env { prefix } => Box::new(EnvKeyLoader::new(&prefix)),
        WalletSource::File { path } => Box::new(FileKeyLoader::new(path)),
    };
    let store = KeyStore::load(loader.as_ref()).await?;

    let http = build_client()?;
    let chain = Arc::new(
        EvmChainClient::new(&config.rpc_url, http.clone())?
            .with_poll_interval(config.receipt_poll_interval()),
    );
    let network = config.chain_config();

    info!("Checking network status...");
    chain
        .verify_network(network.chain_id)
        .await
        .map_err(CoreError::from)?;
    info!(
        "Connected to network: chainId {} ({})",
        network.chain_id, network.name
    );

    info!("Checking network sync...");
    let block = chain.ensure_synced().await.map_err(CoreError::from)?;
    info!("Network synced at block {}", block);

    info!("==== Available wallets ====");
    for (i, credential) in store.iter().enumerate() {
        match credential_to_wallet(credential, network.chain_id) {
            Ok(wallet) => info!("[{}] {:?}", i + 1, wallet.address()),
            Err(e) => warn!("[{}] {}", i + 1, e),
        }
    }

    let answer = match args.count {
        Some(count) => count,
        None => prompt_count().map_err(CoreError::from)?,
    };
    let count = parse_upload_count(&answer).map_err(CoreError::from)?;

    let indexer = Arc::new(HttpIndexer::new(http.clone(), &config.indexer_url));
    let source = Arc::new(HttpContentSource::new(http, config.image_sources.clone())?);
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

    let addresser =
        ContentAddresser::new(indexer.clone()).with_max_attempts(config.max_addressing_attempts);
    let orchestrator = UploadOrchestrator::new(
        chain,
        indexer,
        sleeper.clone(),
        UploadSettings::from_config(&config)?,
    );
    let scheduler = RunScheduler::new(source, addresser, orchestrator, sleeper, network.chain_id)
        .with_delays(RunDelays::from_config(&config));

    let token = ShutdownSignal::install();
    let result = scheduler.run(&store, count, &token).await;
    log_summary(&result);

    Ok(())
}

fn prompt_count() -> Result<String, InputError> {
    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt("How many files to upload per wallet?")
        .interact_text()
        .map_err(|e| InputError::Unavailable {
            reason: e.to_string(),
        })
}
