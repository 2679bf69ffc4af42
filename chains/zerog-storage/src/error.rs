//! Per-upload failure kinds. None of these stop the run; the scheduler counts
//! them as failed units.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Insufficient balance: {balance} OG. Minimum required: {required} OG")]
    InsufficientBalance { balance: String, required: String },

    #[error("Error fetching image from {source_url}: {reason}")]
    Fetch { source_url: String, reason: String },

    #[error("Failed to generate unique hash after {attempts} attempts")]
    AddressingExhausted { attempts: u32 },

    #[error("Segment upload failed: {reason}")]
    SegmentUpload { reason: String },

    #[error("Transaction submission failed: {reason}")]
    Submission { reason: String },

    #[error("Transaction failed or remains pending after {waited_secs}s timeout: {link}")]
    Timeout { waited_secs: u64, link: String },

    #[error("Transaction failed: {link}. Status: {status}")]
    TransactionReverted { link: String, status: String },

    #[error("RPC query failed: {reason}")]
    Chain { reason: String },

    #[error("Wallet cannot sign: {reason}")]
    Wallet { reason: String },
}

impl UploadError {
    /// Funding and key problems will not go away by trying again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            UploadError::InsufficientBalance { .. } | UploadError::Wallet { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        let balance = UploadError::InsufficientBalance {
            balance: "0.0".into(),
            required: "0.0015".into(),
        };
        assert!(!balance.is_retryable());
        assert!(!UploadError::Wallet { reason: "zero key".into() }.is_retryable());

        assert!(UploadError::SegmentUpload { reason: "503".into() }.is_retryable());
        assert!(UploadError::Timeout {
            waited_secs: 10,
            link: String::new()
        }
        .is_retryable());
        assert!(UploadError::TransactionReverted {
            link: String::new(),
            status: "0".into()
        }
        .is_retryable());
    }
}
