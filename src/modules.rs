//! Module Index - discovers the top-level modules of a store
//!
//! The store exposes modules by sequential index. The scan stops at the
//! first empty name, or at a safety bound for stores that never report one.

use serde::{Deserialize, Serialize};

use crate::ids::DeclHandle;
use crate::store::DeclStore;
use crate::Result;

/// Module indices tried before discovery gives up.
pub const DEFAULT_MODULE_SCAN_LIMIT: u32 = 10_000;

/// A top-level module and its root declaration.
///
/// The name is unique and prefixes every FQN inside the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    pub root: DeclHandle,
}

/// Discover every module, sorted by name.
///
/// Modules whose name or root cannot be read are dropped with a warning.
/// Only fatal store errors are returned.
pub fn discover_modules(store: &dyn DeclStore, scan_limit: u32) -> Result<Vec<ModuleEntry>> {
    let mut modules = Vec::new();
    let mut exhausted = false;

    for index in 0..scan_limit {
        let name = match store.module_name(index) {
            Ok(name) => name,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("Skipping module #{}: {}", index, e);
                continue;
            }
        };
        if name.is_empty() {
            exhausted = true;
            break;
        }

        match store.module_root(&name) {
            Ok(Some(root)) => modules.push(ModuleEntry { name, root }),
            Ok(None) => tracing::warn!("Module {:?} has no resolvable root, dropping it", name),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => tracing::warn!("Module {:?} dropped: {}", name, e),
        }
    }

    if !exhausted {
        tracing::warn!(
            "Module discovery stopped after {} indices; the module list may be incomplete",
            scan_limit
        );
    }

    modules.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::info!("Discovered {} modules", modules.len());
    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::store::testing::TestStore;
    use crate::store::{DeclSnapshot, MemoryStore, StoreSnapshot};
    use crate::Error;

    #[test]
    fn test_discovery_sorts_and_drops_rootless() {
        let store = MemoryStore::from_snapshot(
            StoreSnapshot::new()
                .module("std", 1)
                .module_without_root("ghost")
                .module("builtin", 2)
                .decl(DeclSnapshot::new(1, Category::Namespace, "std", "std"))
                .decl(DeclSnapshot::new(2, Category::Namespace, "builtin", "builtin")),
        )
        .unwrap();

        let modules = discover_modules(&store, DEFAULT_MODULE_SCAN_LIMIT).unwrap();
        assert_eq!(
            modules,
            vec![
                ModuleEntry { name: "builtin".into(), root: DeclHandle(2) },
                ModuleEntry { name: "std".into(), root: DeclHandle(1) },
            ]
        );
    }

    fn three_modules() -> MemoryStore {
        MemoryStore::from_snapshot(
            StoreSnapshot::new()
                .module("std", 1)
                .module("ghost", 2)
                .module("core", 3)
                .decl(DeclSnapshot::new(1, Category::Namespace, "std", "std"))
                .decl(DeclSnapshot::new(2, Category::Namespace, "ghost", "ghost"))
                .decl(DeclSnapshot::new(3, Category::Namespace, "core", "core")),
        )
        .unwrap()
    }

    #[test]
    fn test_failed_root_lookup_drops_only_that_module() {
        let store = TestStore::new(three_modules())
            .failing(|op, key| (op == "module_root" && key == "ghost").then(|| Error::NotFound(key.into())));

        let modules = discover_modules(&store, DEFAULT_MODULE_SCAN_LIMIT).unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["core", "std"]);
    }

    #[test]
    fn test_unreadable_module_name_is_skipped() {
        let store = TestStore::new(three_modules())
            .failing(|op, key| (op == "module_name" && key == "1").then(|| Error::NotFound(key.into())));

        let modules = discover_modules(&store, DEFAULT_MODULE_SCAN_LIMIT).unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["core", "std"]);
    }

    #[test]
    fn test_fatal_error_aborts_discovery() {
        let store = TestStore::new(three_modules())
            .failing(|op, _| (op == "module_root").then(|| Error::StoreUnavailable("closed".into())));

        assert!(matches!(
            discover_modules(&store, DEFAULT_MODULE_SCAN_LIMIT),
            Err(Error::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_scan_limit_truncates() {
        let snapshot = (0..5).fold(StoreSnapshot::new(), |s, i| {
            s.module(format!("m{i}"), i)
                .decl(DeclSnapshot::new(i, Category::Namespace, format!("m{i}"), format!("m{i}")))
        });
        let store = MemoryStore::from_snapshot(snapshot).unwrap();

        let modules = discover_modules(&store, 3).unwrap();
        let names: Vec<_> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["m0", "m1", "m2"]);
    }

    #[test]
    fn test_empty_store() {
        let store = MemoryStore::default();
        assert!(discover_modules(&store, DEFAULT_MODULE_SCAN_LIMIT).unwrap().is_empty());
    }
}
