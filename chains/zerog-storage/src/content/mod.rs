pub mod addresser;
pub mod source;

pub use addresser::{content_digest, ContentAddresser};
pub use source::{ContentSource, HttpContentSource};

/// Addressed payload, ready for the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDescriptor {
    /// `0x`-prefixed SHA-256 hex digest, unique at creation time
    pub root: String,
    /// Base64 of the raw payload
    pub data: String,
}
