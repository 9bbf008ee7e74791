//! Store errors

/// Failure of a store backend.
///
/// The in-memory stores never fail; durable backends map their I/O errors here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Backend unavailable or rejected the operation
    #[error("store backend error: {0}")]
    Backend(String),
}
