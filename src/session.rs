//! Session - the explicit context threaded through every operation
//!
//! Holds the store, the lazily discovered module list and the tuning
//! options. Nothing here is global; two sessions over two stores are
//! fully independent.

use std::sync::{Arc, OnceLock};

use crossbeam::channel::Sender;

use crate::cache::RouteCache;
use crate::enumerate::{default_workers, EnumerationStats, RouteDescriptor, RouteEnumerator};
use crate::modules::{discover_modules, ModuleEntry, DEFAULT_MODULE_SCAN_LIMIT};
use crate::record::{DeclarationRecord, RecordAssembler};
use crate::resolve::DEFAULT_MAX_ALIAS_CHAIN;
use crate::store::{DeclStore, Visibility};
use crate::ui::{ProgressMessage, ProgressPhase};
use crate::Result;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub workers: usize,
    pub max_alias_chain: usize,
    pub module_scan_limit: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_alias_chain: DEFAULT_MAX_ALIAS_CHAIN,
            module_scan_limit: DEFAULT_MODULE_SCAN_LIMIT,
        }
    }
}

/// Where a route set came from
#[derive(Debug, Clone)]
pub enum RouteSource {
    Cache,
    Enumerated(EnumerationStats),
}

#[derive(Debug, Clone)]
pub struct RouteSet {
    pub routes: Vec<RouteDescriptor>,
    pub source: RouteSource,
}

impl RouteSet {
    pub fn from_cache(&self) -> bool {
        matches!(self.source, RouteSource::Cache)
    }
}

pub struct Session {
    store: Arc<dyn DeclStore>,
    options: SessionOptions,
    modules: OnceLock<Vec<ModuleEntry>>,
    progress: Option<Sender<ProgressMessage>>,
}

impl Session {
    pub fn new(store: Arc<dyn DeclStore>) -> Self {
        Self::with_options(store, SessionOptions::default())
    }

    pub fn with_options(store: Arc<dyn DeclStore>, options: SessionOptions) -> Self {
        Self {
            store,
            options,
            modules: OnceLock::new(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, tx: Sender<ProgressMessage>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn store(&self) -> &dyn DeclStore {
        self.store.as_ref()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Module list, discovered on first use
    pub fn modules(&self) -> Result<&[ModuleEntry]> {
        if let Some(modules) = self.modules.get() {
            return Ok(modules);
        }
        self.report(ProgressMessage::Started {
            phase: ProgressPhase::Discovery,
            total: 0,
        });
        let discovered = discover_modules(self.store(), self.options.module_scan_limit)?;
        self.report(ProgressMessage::Finished {
            phase: ProgressPhase::Discovery,
        });
        Ok(self.modules.get_or_init(|| discovered))
    }

    /// Page record for one declaration, members filtered to public ones
    pub fn record(&self, fqn: &str) -> Result<DeclarationRecord> {
        RecordAssembler::with_max_alias_chain(self.store(), self.options.max_alias_chain)
            .assemble_by_name(fqn, Visibility::PublicOnly)
    }

    /// Walk the whole store, bypassing any cache.
    pub fn enumerate(&self) -> Result<(Vec<RouteDescriptor>, EnumerationStats)> {
        let modules = self.modules()?;
        let mut enumerator = RouteEnumerator::new(self.store())
            .with_workers(self.options.workers)
            .with_max_alias_chain(self.options.max_alias_chain);
        if let Some(tx) = &self.progress {
            enumerator = enumerator.with_progress(tx.clone());
        }
        let result = enumerator.enumerate(modules)?;
        Ok((result.routes, result.stats))
    }

    /// Load the route set from `cache`, or enumerate and persist it.
    ///
    /// Unless `force` is set, a usable cache is returned without touching
    /// the store. A cache that can't be written is logged and ignored.
    pub fn routes(&self, cache: &RouteCache, force: bool, fingerprint: Option<&str>) -> Result<RouteSet> {
        if force {
            tracing::info!("Forced regeneration, ignoring {}", cache.path().display());
        } else if let Some(routes) = cache.load(fingerprint) {
            return Ok(RouteSet {
                routes,
                source: RouteSource::Cache,
            });
        }

        let (routes, stats) = self.enumerate()?;
        self.report(ProgressMessage::Started {
            phase: ProgressPhase::Cache,
            total: routes.len(),
        });
        if let Err(e) = cache.store(&routes, fingerprint) {
            tracing::warn!("{}; returning routes without caching them", e);
            self.report(ProgressMessage::Warning(e.to_string()));
        }
        self.report(ProgressMessage::Finished {
            phase: ProgressPhase::Cache,
        });

        Ok(RouteSet {
            routes,
            source: RouteSource::Enumerated(stats),
        })
    }

    fn report(&self, msg: ProgressMessage) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::ids::{DeclHandle, ErrorNodeId};
    use crate::store::testing::TestStore;
    use crate::store::{DeclSnapshot, MemoryStore, StoreSnapshot};
    use tempfile::tempdir;

    fn store() -> MemoryStore {
        MemoryStore::from_snapshot(
            StoreSnapshot::new()
                .module("a", 1)
                .decl(DeclSnapshot::new(1, Category::Namespace, "a", "a").with_members(&[2, 3]))
                .decl(
                    DeclSnapshot::new(2, Category::Function, "f", "a.f")
                        .with_error_set(2, u64::MAX)
                        .with_proto("f()", "pub fn f() !void"),
                )
                .decl(DeclSnapshot::new(3, Category::Container, "B", "a.B").with_members(&[4]))
                .decl(DeclSnapshot::new(4, Category::GlobalConst, "max", "a.B.max"))
                .error_nodes(2, u64::MAX, &[u64::MAX - 1, 7]),
        )
        .unwrap()
    }

    #[test]
    fn test_cache_hit_skips_store() {
        let dir = tempdir().unwrap();
        let cache = RouteCache::new(dir.path().join("routes.json"));

        let first = Session::new(Arc::new(store())).routes(&cache, false, None).unwrap();
        assert!(!first.from_cache());
        assert_eq!(first.routes.len(), 3);

        let counting = Arc::new(TestStore::new(store()));
        let session = Session::new(counting.clone());
        let second = session.routes(&cache, false, None).unwrap();

        assert!(second.from_cache());
        assert_eq!(second.routes, first.routes);
        assert_eq!(counting.calls(), 0);
    }

    #[test]
    fn test_force_regenerates() {
        let dir = tempdir().unwrap();
        let cache = RouteCache::new(dir.path().join("routes.json"));
        std::fs::write(cache.path(), r#"{"version": 1, "routes": []}"#).unwrap();

        let counting = Arc::new(TestStore::new(store()));
        let session = Session::new(counting.clone());
        let set = session.routes(&cache, true, None).unwrap();

        assert!(!set.from_cache());
        assert_eq!(set.routes.len(), 3);
        assert!(counting.calls() > 0);
        assert_eq!(cache.load(None).unwrap(), set.routes);
    }

    #[test]
    fn test_corrupt_cache_regenerates() {
        let dir = tempdir().unwrap();
        let cache = RouteCache::new(dir.path().join("routes.json"));
        std::fs::write(cache.path(), "garbage").unwrap();

        let set = Session::new(Arc::new(store())).routes(&cache, false, None).unwrap();
        assert!(!set.from_cache());
        assert_eq!(set.routes.len(), 3);
    }

    #[test]
    fn test_failed_persist_still_returns_routes() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let cache = RouteCache::new(blocker.join("routes.json"));

        let set = Session::new(Arc::new(store())).routes(&cache, false, None).unwrap();
        assert_eq!(set.routes.len(), 3);
    }

    #[test]
    fn test_stale_fingerprint_regenerates() {
        let dir = tempdir().unwrap();
        let cache = RouteCache::new(dir.path().join("routes.json"));
        cache.store(&[], Some("old")).unwrap();

        let set = Session::new(Arc::new(store())).routes(&cache, false, Some("new")).unwrap();
        assert!(!set.from_cache());
        assert_eq!(set.routes.len(), 3);
    }

    #[test]
    fn test_large_error_nodes_survive_cache() {
        let dir = tempdir().unwrap();
        let cache = RouteCache::new(dir.path().join("routes.json"));
        Session::new(Arc::new(store())).routes(&cache, false, None).unwrap();

        let cached = Session::new(Arc::new(MemoryStore::default()))
            .routes(&cache, false, None)
            .unwrap();
        let f = cached.routes.iter().find(|r| r.fqn() == "a.f").unwrap();
        let set = f.record.error_set.as_ref().unwrap();
        assert_eq!(set.node, ErrorNodeId(18446744073709551615));
        assert_eq!(set.errors, vec![ErrorNodeId(u64::MAX - 1), ErrorNodeId(7)]);
    }

    #[test]
    fn test_modules_discovered_once() {
        let counting = Arc::new(TestStore::new(store()));
        let session = Session::new(counting.clone());

        assert_eq!(session.modules().unwrap().len(), 1);
        let after_first = counting.calls();
        assert_eq!(session.modules().unwrap().len(), 1);
        assert_eq!(counting.calls(), after_first);
    }

    #[test]
    fn test_record_lookup() {
        let session = Session::new(Arc::new(store()));
        let record = session.record("a.B").unwrap();
        assert_eq!(record.category, Some(Category::Container));
        assert_eq!(record.members, vec![DeclHandle(4)]);
        assert!(matches!(session.record("a.missing"), Err(crate::Error::NotFound(_))));
    }
}
