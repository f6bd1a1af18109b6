//! Serializable store snapshots
//!
//! A snapshot is the exchange format between the external tool that builds
//! the declaration store and the backends here. Category codes and the raw
//! handle sentinel appear only in this module and the backends.

use crate::category::Category;
use crate::ids::{DeclHandle, ErrorNodeId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A complete dump of a declaration store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Modules in enumeration order
    #[serde(default)]
    pub modules: Vec<ModuleSnapshot>,
    #[serde(default)]
    pub decls: Vec<DeclSnapshot>,
    /// Error-node lists, keyed by (base, node)
    #[serde(default)]
    pub error_nodes: Vec<ErrorNodesSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSnapshot {
    pub name: String,
    /// Raw root handle; absent or the sentinel when the root is unknown
    #[serde(default)]
    pub root: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSnapshot {
    pub handle: u32,
    #[serde(default = "default_true")]
    pub public: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ErrorSetSnapshot {
    pub base: u32,
    pub node: ErrorNodeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorNodesSnapshot {
    pub base: u32,
    pub node: ErrorNodeId,
    #[serde(default)]
    pub errors: Vec<ErrorNodeId>,
}

/// Facts about one declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclSnapshot {
    pub handle: u32,
    /// Numeric category code as emitted by the store builder
    pub category: u8,
    #[serde(default)]
    pub alias_target: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub fqn: Option<String>,
    #[serde(default)]
    pub docs_short: String,
    #[serde(default)]
    pub docs_full: String,
    #[serde(default)]
    pub type_html: String,
    #[serde(default)]
    pub source_html: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub proto_short: String,
    #[serde(default)]
    pub proto_full: String,
    #[serde(default)]
    pub doctest: String,
    #[serde(default)]
    pub params: Vec<u32>,
    #[serde(default)]
    pub fields: Vec<u32>,
    #[serde(default)]
    pub members: Vec<MemberSnapshot>,
    #[serde(default)]
    pub error_set: Option<ErrorSetSnapshot>,
}

impl DeclSnapshot {
    pub fn new(handle: u32, category: Category, name: impl Into<String>, fqn: impl Into<String>) -> Self {
        Self {
            handle,
            category: category.code(),
            alias_target: None,
            name: name.into(),
            fqn: Some(fqn.into()),
            docs_short: String::new(),
            docs_full: String::new(),
            type_html: String::new(),
            source_html: String::new(),
            file_path: String::new(),
            proto_short: String::new(),
            proto_full: String::new(),
            doctest: String::new(),
            params: Vec::new(),
            fields: Vec::new(),
            members: Vec::new(),
            error_set: None,
        }
    }

    /// An alias declaration pointing at `target` (a raw handle, so tests can
    /// use the sentinel).
    pub fn alias(handle: u32, target: u32, name: impl Into<String>, fqn: impl Into<String>) -> Self {
        let mut decl = Self::new(handle, Category::Alias, name, fqn);
        decl.alias_target = Some(target);
        decl
    }

    pub fn with_raw_category(mut self, code: u8) -> Self {
        self.category = code;
        self
    }

    pub fn without_fqn(mut self) -> Self {
        self.fqn = None;
        self
    }

    pub fn with_members(mut self, handles: &[u32]) -> Self {
        self.members
            .extend(handles.iter().map(|&handle| MemberSnapshot { handle, public: true }));
        self
    }

    pub fn with_private_members(mut self, handles: &[u32]) -> Self {
        self.members
            .extend(handles.iter().map(|&handle| MemberSnapshot { handle, public: false }));
        self
    }

    pub fn with_params(mut self, handles: &[u32]) -> Self {
        self.params.extend_from_slice(handles);
        self
    }

    pub fn with_fields(mut self, handles: &[u32]) -> Self {
        self.fields.extend_from_slice(handles);
        self
    }

    pub fn with_docs(mut self, short: impl Into<String>, full: impl Into<String>) -> Self {
        self.docs_short = short.into();
        self.docs_full = full.into();
        self
    }

    pub fn with_proto(mut self, short: impl Into<String>, full: impl Into<String>) -> Self {
        self.proto_short = short.into();
        self.proto_full = full.into();
        self
    }

    pub fn with_doctest(mut self, html: impl Into<String>) -> Self {
        self.doctest = html.into();
        self
    }

    pub fn with_source(mut self, file_path: impl Into<String>, source_html: impl Into<String>) -> Self {
        self.file_path = file_path.into();
        self.source_html = source_html.into();
        self
    }

    pub fn with_type_html(mut self, html: impl Into<String>) -> Self {
        self.type_html = html.into();
        self
    }

    pub fn with_error_set(mut self, base: u32, node: u64) -> Self {
        self.error_set = Some(ErrorSetSnapshot { base, node: ErrorNodeId(node) });
        self
    }
}

impl StoreSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON snapshot from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&contents)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn module(mut self, name: impl Into<String>, root: u32) -> Self {
        self.modules.push(ModuleSnapshot { name: name.into(), root: Some(root) });
        self
    }

    /// A module whose root the store cannot resolve
    pub fn module_without_root(mut self, name: impl Into<String>) -> Self {
        self.modules.push(ModuleSnapshot { name: name.into(), root: None });
        self
    }

    pub fn decl(mut self, decl: DeclSnapshot) -> Self {
        self.decls.push(decl);
        self
    }

    pub fn error_nodes(mut self, base: u32, node: u64, errors: &[u64]) -> Self {
        self.error_nodes.push(ErrorNodesSnapshot {
            base,
            node: ErrorNodeId(node),
            errors: errors.iter().copied().map(ErrorNodeId).collect(),
        });
        self
    }

    /// Reject snapshots that would make handles ambiguous.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for decl in &self.decls {
            if decl.handle == DeclHandle::SENTINEL {
                return Err(Error::Snapshot(format!(
                    "declaration {:?} uses the reserved handle value",
                    decl.name
                )));
            }
            if !seen.insert(decl.handle) {
                return Err(Error::Snapshot(format!("duplicate handle {}", decl.handle)));
            }
        }

        let mut names = HashSet::new();
        for module in &self.modules {
            if module.name.is_empty() {
                return Err(Error::Snapshot("module with empty name".to_string()));
            }
            if !names.insert(module.name.as_str()) {
                return Err(Error::Snapshot(format!("duplicate module {:?}", module.name)));
            }
        }
        Ok(())
    }
}
