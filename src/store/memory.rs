//! In-memory declaration store

use std::collections::HashMap;
use std::path::Path;

use super::snapshot::{DeclSnapshot, ModuleSnapshot, StoreSnapshot};
use super::{DeclStore, DocLength, ErrorSetRef, Visibility};
use crate::category::Category;
use crate::ids::{DeclHandle, ErrorNodeId};
use crate::{Error, Result};

/// Declaration store held entirely in memory.
///
/// Built from a `StoreSnapshot`, either loaded from a JSON file or
/// assembled with the snapshot builders in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    decls: HashMap<DeclHandle, DeclSnapshot>,
    by_fqn: HashMap<String, DeclHandle>,
    modules: Vec<ModuleSnapshot>,
    error_nodes: HashMap<(DeclHandle, ErrorNodeId), Vec<ErrorNodeId>>,
}

impl MemoryStore {
    /// Load a JSON snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_snapshot(StoreSnapshot::load(path)?)
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        snapshot.validate()?;

        let mut store = Self {
            modules: snapshot.modules,
            ..Self::default()
        };

        for decl in snapshot.decls {
            let handle = DeclHandle(decl.handle);
            if let Some(fqn) = &decl.fqn {
                store.by_fqn.entry(fqn.clone()).or_insert(handle);
            }
            store.decls.insert(handle, decl);
        }

        for list in snapshot.error_nodes {
            store
                .error_nodes
                .insert((DeclHandle(list.base), list.node), list.errors);
        }

        Ok(store)
    }

    /// Number of declarations held
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    fn decl(&self, handle: DeclHandle) -> Result<&DeclSnapshot> {
        self.decls.get(&handle).ok_or(Error::OutOfBounds {
            handle,
            what: "declaration",
        })
    }
}

fn to_handles(raw: &[u32]) -> Vec<DeclHandle> {
    raw.iter().copied().filter_map(DeclHandle::from_raw).collect()
}

impl DeclStore for MemoryStore {
    fn category(&self, handle: DeclHandle) -> Result<Option<Category>> {
        Ok(Category::from_code(self.decl(handle)?.category))
    }

    fn alias_target(&self, handle: DeclHandle) -> Result<Option<DeclHandle>> {
        Ok(self.decl(handle)?.alias_target.and_then(DeclHandle::from_raw))
    }

    fn name(&self, handle: DeclHandle) -> Result<String> {
        Ok(self.decl(handle)?.name.clone())
    }

    fn fqn(&self, handle: DeclHandle) -> Result<Option<String>> {
        Ok(self
            .decl(handle)?
            .fqn
            .clone()
            .filter(|fqn| !fqn.is_empty()))
    }

    fn docs_html(&self, handle: DeclHandle, length: DocLength) -> Result<String> {
        let decl = self.decl(handle)?;
        Ok(match length {
            DocLength::Short => decl.docs_short.clone(),
            DocLength::Full => decl.docs_full.clone(),
        })
    }

    fn type_html(&self, handle: DeclHandle) -> Result<String> {
        Ok(self.decl(handle)?.type_html.clone())
    }

    fn source_html(&self, handle: DeclHandle) -> Result<String> {
        Ok(self.decl(handle)?.source_html.clone())
    }

    fn file_path(&self, handle: DeclHandle) -> Result<String> {
        Ok(self.decl(handle)?.file_path.clone())
    }

    fn params(&self, handle: DeclHandle) -> Result<Vec<DeclHandle>> {
        Ok(to_handles(&self.decl(handle)?.params))
    }

    fn fields(&self, handle: DeclHandle) -> Result<Vec<DeclHandle>> {
        Ok(to_handles(&self.decl(handle)?.fields))
    }

    fn members(&self, handle: DeclHandle, visibility: Visibility) -> Result<Vec<DeclHandle>> {
        Ok(self
            .decl(handle)?
            .members
            .iter()
            .filter(|m| m.public || visibility == Visibility::IncludePrivate)
            .filter_map(|m| DeclHandle::from_raw(m.handle))
            .collect())
    }

    fn fn_proto_html(&self, handle: DeclHandle, length: DocLength) -> Result<String> {
        let decl = self.decl(handle)?;
        Ok(match length {
            DocLength::Short => decl.proto_short.clone(),
            DocLength::Full => decl.proto_full.clone(),
        })
    }

    fn doctest_html(&self, handle: DeclHandle) -> Result<String> {
        Ok(self.decl(handle)?.doctest.clone())
    }

    fn error_set(&self, handle: DeclHandle) -> Result<Option<ErrorSetRef>> {
        Ok(self.decl(handle)?.error_set.and_then(|set| {
            let base = DeclHandle::from_raw(set.base)?;
            (!set.node.is_empty()).then_some(ErrorSetRef { base, node: set.node })
        }))
    }

    fn error_nodes(&self, error_set: &ErrorSetRef) -> Result<Vec<ErrorNodeId>> {
        self.error_nodes
            .get(&(error_set.base, error_set.node))
            .cloned()
            .ok_or(Error::OutOfBounds {
                handle: error_set.base,
                what: "error nodes",
            })
    }

    fn lookup(&self, fqn: &str) -> Result<Option<DeclHandle>> {
        Ok(self.by_fqn.get(fqn).copied())
    }

    fn module_name(&self, index: u32) -> Result<String> {
        Ok(self
            .modules
            .get(index as usize)
            .map(|m| m.name.clone())
            .unwrap_or_default())
    }

    fn module_root(&self, name: &str) -> Result<Option<DeclHandle>> {
        Ok(self
            .modules
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.root)
            .and_then(DeclHandle::from_raw))
    }
}
