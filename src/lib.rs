//! # docroute - Declaration routes for documentation browsers
//!
//! Enumerates every declaration in an opaque, pre-built declaration store and
//! produces the complete, deduplicated set of documentation page routes.
//!
//! docroute provides:
//! - A read-only `DeclStore` capability over a handle-addressed graph
//! - Alias resolution with cycle and broken-link detection
//! - Category-driven assembly of `DeclarationRecord`s
//! - Concurrent, globally deduplicated route enumeration
//! - A JSON route cache that round-trips 64-bit identifiers exactly

pub mod ids;
pub mod category;
pub mod store;
pub mod modules;
pub mod resolve;
pub mod record;
pub mod enumerate;
pub mod cache;
pub mod session;
pub mod config;
pub mod server;
pub mod ui;

// Re-exports for convenient access
pub use ids::{DeclHandle, ErrorNodeId};
pub use category::Category;
pub use store::{DeclStore, MemoryStore, SqliteDeclStore};
pub use modules::ModuleEntry;
pub use record::{DeclarationRecord, RecordAssembler};
pub use enumerate::{RouteDescriptor, RouteEnumerator};
pub use cache::RouteCache;
pub use session::Session;

/// Result type alias for docroute operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for docroute operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Declaration not found: {0}")]
    NotFound(String),

    #[error("Alias chain from handle {0} could not be resolved")]
    AliasUnresolved(DeclHandle),

    #[error("No data for {what} of handle {handle}")]
    OutOfBounds { handle: DeclHandle, what: &'static str },

    #[error("Unknown category for handle {0}")]
    UnknownCategory(DeclHandle),

    #[error("Failed to process module {module}: {reason}")]
    ModuleProcessing { module: String, reason: String },

    #[error("Failed to persist route cache: {0}")]
    CachePersist(String),

    #[error("Failed to read route cache: {0}")]
    CacheRead(String),

    #[error("Declaration store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    Snapshot(String),
}

impl Error {
    /// Whether this error invalidates every later store operation.
    ///
    /// Everything else is isolated to the declaration or module that hit it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}
