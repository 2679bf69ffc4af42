use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Returns a token that is cancelled on the first Ctrl+C.
    pub fn install() -> CancellationToken {
        let token = CancellationToken::new();
        let cloned_token = token.clone();

        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    warn!("🛑 Received Ctrl+C. Stopping after the current step...");
                    cloned_token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        token
    }
}
