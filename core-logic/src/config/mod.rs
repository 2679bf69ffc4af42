use serde::{Deserialize, Serialize};

/// Where signing keys come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletSource {
    /// Indexed environment slots (`PRIVATE_KEY_1`, `PRIVATE_KEY_2`, ...).
    Env { prefix: String },
    /// One raw key per line.
    File { path: String },
}

impl Default for WalletSource {
    fn default() -> Self {
        WalletSource::Env {
            prefix: "PRIVATE_KEY".to_string(),
        }
    }
}

impl WalletSource {
    pub fn from_key_file(key_file: Option<&str>) -> Self {
        match key_file {
            Some(path) if !path.trim().is_empty() => WalletSource::File {
                path: path.trim().to_string(),
            },
            _ => WalletSource::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_endpoint: String,
    pub chain_id: u64,
}
