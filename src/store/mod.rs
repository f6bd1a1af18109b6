//! Declaration Store - read-only capability over the declaration graph
//!
//! The store is built once per session by an external tool and is treated
//! as an untyped graph addressed by `DeclHandle`. Two backends are provided:
//! - `MemoryStore`: loaded from a JSON snapshot, or built in tests
//! - `SqliteDeclStore`: a SQLite snapshot database

pub mod memory;
pub mod schema;
pub mod snapshot;
pub mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStore;
pub use snapshot::{DeclSnapshot, ModuleSnapshot, StoreSnapshot};
pub use sqlite::SqliteDeclStore;

use crate::Result;
use crate::category::Category;
use crate::ids::{DeclHandle, ErrorNodeId};
use std::path::Path;
use std::sync::Arc;

/// Which rendering of a documentation or prototype fragment to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocLength {
    /// First paragraph / one-line form
    Short,
    Full,
}

/// Member visibility filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Members shown on rendered pages
    PublicOnly,
    /// Every member, for whole-graph accounting
    IncludePrivate,
}

/// An error set anchored to a base declaration.
///
/// Error-node lists are only meaningful relative to `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorSetRef {
    pub base: DeclHandle,
    pub node: ErrorNodeId,
}

/// Read-only access to declaration facts.
///
/// All operations are synchronous reads against a structure built once at
/// session start. `Error::StoreUnavailable` from any method means the store
/// itself is gone; every other error is scoped to the requested handle.
pub trait DeclStore: Send + Sync {
    /// Category of `handle`, or `None` if the store reports a code outside
    /// the known set.
    fn category(&self, handle: DeclHandle) -> Result<Option<Category>>;

    /// Target of an alias declaration, `None` for "not found".
    fn alias_target(&self, handle: DeclHandle) -> Result<Option<DeclHandle>>;

    fn name(&self, handle: DeclHandle) -> Result<String>;

    /// Fully-qualified name, `None` when it cannot be determined.
    fn fqn(&self, handle: DeclHandle) -> Result<Option<String>>;

    fn docs_html(&self, handle: DeclHandle, length: DocLength) -> Result<String>;

    fn type_html(&self, handle: DeclHandle) -> Result<String>;

    fn source_html(&self, handle: DeclHandle) -> Result<String>;

    fn file_path(&self, handle: DeclHandle) -> Result<String>;

    fn params(&self, handle: DeclHandle) -> Result<Vec<DeclHandle>>;

    fn fields(&self, handle: DeclHandle) -> Result<Vec<DeclHandle>>;

    fn members(&self, handle: DeclHandle, visibility: Visibility) -> Result<Vec<DeclHandle>>;

    fn fn_proto_html(&self, handle: DeclHandle, length: DocLength) -> Result<String>;

    fn doctest_html(&self, handle: DeclHandle) -> Result<String>;

    /// Error set of a function's return type, `None` when empty.
    fn error_set(&self, handle: DeclHandle) -> Result<Option<ErrorSetRef>>;

    fn error_nodes(&self, error_set: &ErrorSetRef) -> Result<Vec<ErrorNodeId>>;

    /// Find a declaration by fully-qualified name.
    fn lookup(&self, fqn: &str) -> Result<Option<DeclHandle>>;

    /// Name of the module at `index`; an empty name means no more modules.
    fn module_name(&self, index: u32) -> Result<String>;

    /// Root declaration of the named module.
    fn module_root(&self, name: &str) -> Result<Option<DeclHandle>>;
}

/// Open a store by file extension: `.db`/`.sqlite` is a SQLite snapshot,
/// anything else a JSON snapshot.
pub fn open_store(path: &Path) -> Result<Arc<dyn DeclStore>> {
    if !path.is_file() {
        return Err(crate::Error::StoreUnavailable(format!("{} does not exist", path.display())));
    }
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    match ext {
        "db" | "sqlite" | "sqlite3" => Ok(Arc::new(SqliteDeclStore::open(path)?)),
        _ => Ok(Arc::new(MemoryStore::load(path)?)),
    }
}
