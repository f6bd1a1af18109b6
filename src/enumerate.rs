//! Recursive Route Enumerator
//!
//! Walks the declaration graph below every module root and emits one
//! `RouteDescriptor` per distinct FQN. Module roots themselves never get a
//! route.
//!
//! The walk advances one depth level at a time, in three steps:
//! 1. every candidate of the level is named (FQN and name), in parallel
//! 2. candidates claim their FQN serially, in rank order
//! 3. the claimed records are assembled in parallel and their members form
//!    the next level
//!
//! A declaration reachable along several paths belongs to the shallowest
//! candidate. At equal depth the candidate inside the module its FQN starts
//! with wins, then the smallest `(module, subpath)`. Ownership is decided
//! before any thread races, so the same store always yields the same routes.
//!
//! Parallel steps run on a bounded pool of scoped worker threads pulling
//! from a crossbeam channel.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam::channel::{self, Sender};
use serde::{Deserialize, Serialize};

use crate::ids::DeclHandle;
use crate::modules::ModuleEntry;
use crate::record::{DeclarationRecord, RecordAssembler};
use crate::resolve::DEFAULT_MAX_ALIAS_CHAIN;
use crate::store::{DeclStore, Visibility};
use crate::ui::{ProgressMessage, ProgressPhase};
use crate::{Error, Result};

/// Joins subpath segments below a module root.
pub const SUBPATH_SEPARATOR: char = '/';

/// One documentation page: where it lives and what it shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub module: String,
    /// Path below the module root, e.g. `mem/Allocator`
    pub subpath: String,
    pub record: DeclarationRecord,
}

impl RouteDescriptor {
    pub fn fqn(&self) -> &str {
        &self.record.fqn
    }

    /// Route key as the renderer addresses it: `module/subpath`
    pub fn key(&self) -> String {
        format!("{}{}{}", self.module, SUBPATH_SEPARATOR, self.subpath)
    }
}

/// Counters collected during one enumeration
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnumerationStats {
    pub modules: usize,
    pub failed_modules: usize,
    pub routes: usize,
    /// Declarations reached again through another path
    pub duplicates: usize,
    /// Declarations skipped because the store could not name them
    pub unnamed: usize,
    /// Declarations whose assembly failed
    pub failed: usize,
}

impl fmt::Display for EnumerationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Route Enumeration Stats:")?;
        writeln!(f, "  Modules: {} ({} failed)", self.modules, self.failed_modules)?;
        writeln!(f, "  Routes: {}", self.routes)?;
        writeln!(f, "  Duplicates skipped: {}", self.duplicates)?;
        writeln!(f, "  Unnamed skipped: {}", self.unnamed)?;
        writeln!(f, "  Failed declarations: {}", self.failed)
    }
}

/// Routes produced by one enumeration, sorted by module then subpath.
#[derive(Debug, Clone)]
pub struct Enumeration {
    pub routes: Vec<RouteDescriptor>,
    pub stats: EnumerationStats,
}

struct Job {
    module: String,
    prefix: String,
    handle: DeclHandle,
}

/// A named job competing for its FQN
struct Candidate {
    job: Job,
    fqn: String,
    subpath: String,
}

impl Candidate {
    fn new(job: Job, fqn: String, name: &str) -> Self {
        let subpath = if job.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", job.prefix, SUBPATH_SEPARATOR, name)
        };
        Self { job, fqn, subpath }
    }

    fn in_home_module(&self) -> bool {
        self.fqn.split('.').next() == Some(self.job.module.as_str())
    }

    fn rank(&self, other: &Self) -> CmpOrdering {
        other
            .in_home_module()
            .cmp(&self.in_home_module())
            .then_with(|| self.job.module.cmp(&other.job.module))
            .then_with(|| self.subpath.cmp(&other.subpath))
            .then_with(|| self.job.handle.raw().cmp(&other.job.handle.raw()))
    }
}

pub struct RouteEnumerator<'a> {
    store: &'a dyn DeclStore,
    workers: usize,
    max_alias_chain: usize,
    progress: Option<Sender<ProgressMessage>>,
}

impl<'a> RouteEnumerator<'a> {
    pub fn new(store: &'a dyn DeclStore) -> Self {
        Self {
            store,
            workers: default_workers(),
            max_alias_chain: DEFAULT_MAX_ALIAS_CHAIN,
            progress: None,
        }
    }

    /// Cap on simultaneous in-flight store calls
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_alias_chain(mut self, max_chain: usize) -> Self {
        self.max_alias_chain = max_chain;
        self
    }

    pub fn with_progress(mut self, tx: Sender<ProgressMessage>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Enumerate the routes of every module.
    ///
    /// Failures are isolated to the declaration or module that hit them;
    /// only a fatal store error aborts the walk.
    pub fn enumerate(&self, modules: &[ModuleEntry]) -> Result<Enumeration> {
        let mut stats = EnumerationStats {
            modules: modules.len(),
            ..EnumerationStats::default()
        };
        let mut visited = HashSet::new();
        let mut frontier = Vec::new();

        self.report(ProgressMessage::Started {
            phase: ProgressPhase::Enumeration,
            total: modules.len(),
        });

        for module in modules {
            // Roots are owned by their module page, never by a route
            match self.store.fqn(module.root) {
                Ok(Some(fqn)) => {
                    visited.insert(fqn);
                }
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!("No FQN for root of module {}: {}", module.name, e),
            }

            let members = match self.store.members(module.root, Visibility::IncludePrivate) {
                Ok(members) => members,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let err = Error::ModuleProcessing {
                        module: module.name.clone(),
                        reason: e.to_string(),
                    };
                    tracing::error!("{}", err);
                    self.report(ProgressMessage::Warning(err.to_string()));
                    stats.failed_modules += 1;
                    continue;
                }
            };

            tracing::debug!("Module {} has {} top-level members", module.name, members.len());
            frontier.extend(members.into_iter().map(|handle| Job {
                module: module.name.clone(),
                prefix: String::new(),
                handle,
            }));
        }

        let assembler = RecordAssembler::with_max_alias_chain(self.store, self.max_alias_chain);
        let aborted = AtomicBool::new(false);
        let mut routes = Vec::new();
        let mut depth = 0;

        while !frontier.is_empty() {
            tracing::debug!("Depth {}: {} candidates", depth, frontier.len());

            let named = self.run_parallel(frontier, |job| {
                let result = self.guarded(&aborted, || self.name(&job));
                (job, result)
            });
            let mut candidates = Vec::new();
            for (job, result) in named {
                match result {
                    None => {}
                    Some(Ok(Some((fqn, name)))) => candidates.push(Candidate::new(job, fqn, &name)),
                    Some(Ok(None)) => stats.unnamed += 1,
                    Some(Err(e)) => self.isolate(e, &job, &mut stats)?,
                }
            }

            candidates.sort_by(|a, b| a.rank(b));
            let claimed: Vec<Candidate> = candidates
                .into_iter()
                .filter(|candidate| {
                    let fresh = visited.insert(candidate.fqn.clone());
                    if !fresh {
                        stats.duplicates += 1;
                    }
                    fresh
                })
                .collect();

            let assembled = self.run_parallel(claimed, |candidate| {
                let result = self.guarded(&aborted, || {
                    assembler.assemble(candidate.job.handle, Visibility::PublicOnly)
                });
                (candidate, result)
            });
            let mut next = Vec::new();
            for (candidate, result) in assembled {
                let record = match result {
                    None => continue,
                    Some(Ok(Some(record))) => record,
                    Some(Ok(None)) => {
                        stats.unnamed += 1;
                        continue;
                    }
                    Some(Err(e)) => {
                        self.isolate(e, &candidate.job, &mut stats)?;
                        continue;
                    }
                };

                let Candidate { job, fqn, subpath } = candidate;
                if record.has_child_routes() {
                    next.extend(record.members.iter().map(|&handle| Job {
                        module: job.module.clone(),
                        prefix: subpath.clone(),
                        handle,
                    }));
                }

                tracing::debug!("Route {}/{} -> {}", job.module, subpath, fqn);
                routes.push(RouteDescriptor {
                    module: job.module,
                    subpath,
                    record,
                });
                self.report(ProgressMessage::Progress {
                    phase: ProgressPhase::Enumeration,
                    current: routes.len(),
                    item: Some(fqn),
                });
            }

            frontier = next;
            depth += 1;
        }

        routes.sort_by(|a, b| (&a.module, &a.subpath).cmp(&(&b.module, &b.subpath)));
        stats.routes = routes.len();

        self.report(ProgressMessage::Finished {
            phase: ProgressPhase::Enumeration,
        });
        tracing::info!("Enumerated {} routes across {} modules", stats.routes, stats.modules);

        Ok(Enumeration { routes, stats })
    }

    /// FQN and name of a job's declaration, `None` when it has no FQN
    fn name(&self, job: &Job) -> Result<Option<(String, String)>> {
        let Some(fqn) = self.store.fqn(job.handle)? else {
            return Ok(None);
        };
        let name = self.store.name(job.handle)?;
        Ok(Some((fqn, name)))
    }

    /// Run `f` unless an earlier fatal error stopped the walk.
    fn guarded<T>(&self, aborted: &AtomicBool, f: impl FnOnce() -> Result<T>) -> Option<Result<T>> {
        if aborted.load(Ordering::SeqCst) {
            return None;
        }
        let result = f();
        if matches!(&result, Err(e) if e.is_fatal()) {
            aborted.store(true, Ordering::SeqCst);
        }
        Some(result)
    }

    /// Count a non-fatal failure; fatal ones end the walk.
    fn isolate(&self, err: Error, job: &Job, stats: &mut EnumerationStats) -> Result<()> {
        if err.is_fatal() {
            tracing::error!("Aborting enumeration: {}", err);
            return Err(err);
        }
        tracing::error!("Skipping {} in module {}: {}", job.handle, job.module, err);
        stats.failed += 1;
        Ok(())
    }

    /// Map `f` over `items` on the worker pool, keeping input order.
    fn run_parallel<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let workers = self.workers.min(items.len());
        if workers <= 1 {
            return items.into_iter().map(f).collect();
        }

        let (job_tx, job_rx) = channel::unbounded();
        for item in items.into_iter().enumerate() {
            // The receiver is alive in this scope, so send cannot fail
            let _ = job_tx.send(item);
        }
        drop(job_tx);

        let (result_tx, result_rx) = channel::unbounded();
        thread::scope(|scope| {
            for _ in 0..workers {
                let (jobs, results, f) = (job_rx.clone(), result_tx.clone(), &f);
                scope.spawn(move || {
                    for (index, item) in jobs.iter() {
                        let _ = results.send((index, f(item)));
                    }
                });
            }
        });
        drop(result_tx);

        let mut results: Vec<(usize, R)> = result_rx.try_iter().collect();
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    fn report(&self, msg: ProgressMessage) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(msg);
        }
    }
}

/// Worker count used when none is configured
pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::modules::{discover_modules, DEFAULT_MODULE_SCAN_LIMIT};
    use crate::store::testing::TestStore;
    use crate::store::{DeclSnapshot, MemoryStore, StoreSnapshot};
    use std::collections::HashMap;

    fn enumerate(store: &MemoryStore, workers: usize) -> Enumeration {
        let modules = discover_modules(store, DEFAULT_MODULE_SCAN_LIMIT).unwrap();
        RouteEnumerator::new(store)
            .with_workers(workers)
            .enumerate(&modules)
            .unwrap()
    }

    #[test]
    fn test_single_function_route() {
        let store = MemoryStore::from_snapshot(
            StoreSnapshot::new()
                .module("a", 1)
                .decl(DeclSnapshot::new(1, Category::Namespace, "a", "a").with_members(&[2]))
                .decl(DeclSnapshot::new(2, Category::Function, "f", "a.f")),
        )
        .unwrap();

        let result = enumerate(&store, 2);
        assert_eq!(result.routes.len(), 1);
        let route = &result.routes[0];
        assert_eq!(route.module, "a");
        assert_eq!(route.subpath, "f");
        assert_eq!(route.record.category, Some(Category::Function));
        assert_eq!(route.fqn(), "a.f");
        assert_eq!(route.key(), "a/f");
    }

    #[test]
    fn test_empty_module_yields_nothing() {
        let store = MemoryStore::from_snapshot(
            StoreSnapshot::new()
                .module("empty", 1)
                .decl(DeclSnapshot::new(1, Category::Namespace, "empty", "empty")),
        )
        .unwrap();

        let result = enumerate(&store, 4);
        assert!(result.routes.is_empty());
        assert_eq!(result.stats.modules, 1);
        assert_eq!(result.stats.failed_modules, 0);
    }

    /// Two modules that share a container, an alias back into it, a private
    /// root member and a namespace cycle.
    fn graph_store() -> MemoryStore {
        MemoryStore::from_snapshot(
            StoreSnapshot::new()
                .module("std", 1)
                .module("core", 20)
                .decl(
                    DeclSnapshot::new(1, Category::Namespace, "std", "std")
                        .with_members(&[2, 5])
                        .with_private_members(&[9]),
                )
                .decl(DeclSnapshot::new(2, Category::Namespace, "mem", "std.mem").with_members(&[3, 1]))
                .decl(
                    DeclSnapshot::new(3, Category::Container, "Allocator", "std.mem.Allocator")
                        .with_members(&[4])
                        .with_private_members(&[8]),
                )
                .decl(DeclSnapshot::new(4, Category::Function, "alloc", "std.mem.Allocator.alloc"))
                .decl(DeclSnapshot::alias(5, 3, "Allocator", "std.Allocator"))
                .decl(DeclSnapshot::new(8, Category::Function, "hidden", "std.mem.Allocator.hidden"))
                .decl(DeclSnapshot::new(9, Category::GlobalConst, "private_const", "std.private_const"))
                .decl(DeclSnapshot::new(20, Category::Namespace, "core", "core").with_members(&[21, 3]))
                .decl(DeclSnapshot::new(21, Category::Type, "Int", "core.Int").with_members(&[22]))
                .decl(DeclSnapshot::new(22, Category::Function, "max", "core.Int.max")),
        )
        .unwrap()
    }

    fn by_fqn(routes: &[RouteDescriptor]) -> HashMap<&str, &RouteDescriptor> {
        routes.iter().map(|r| (r.fqn(), r)).collect()
    }

    #[test]
    fn test_graph_is_complete_and_unique() {
        for workers in [1, 2, 8] {
            let result = enumerate(&graph_store(), workers);
            let routes = by_fqn(&result.routes);

            // No duplicate FQNs
            assert_eq!(routes.len(), result.routes.len(), "workers={workers}");

            let mut fqns: Vec<_> = routes.keys().copied().collect();
            fqns.sort();
            assert_eq!(
                fqns,
                vec![
                    "core.Int",
                    "core.Int.max",
                    "std.Allocator",
                    "std.mem",
                    "std.mem.Allocator",
                    "std.mem.Allocator.alloc",
                    "std.private_const",
                ],
                "workers={workers}"
            );
        }
    }

    #[test]
    fn test_alias_route_and_subpaths() {
        let result = enumerate(&graph_store(), 4);
        let routes = by_fqn(&result.routes);

        let alias = routes["std.Allocator"];
        assert_eq!(alias.module, "std");
        assert_eq!(alias.subpath, "Allocator");
        assert!(alias.record.is_alias);
        assert_eq!(alias.record.category, Some(Category::Container));
        assert_eq!(alias.record.target_fqn, "std.mem.Allocator");

        assert_eq!(routes["core.Int.max"].subpath, "Int/max");
        assert_eq!(routes["core.Int.max"].module, "core");
        assert!(result.stats.duplicates > 0);
    }

    #[test]
    fn test_routes_are_sorted() {
        let result = enumerate(&graph_store(), 8);
        let keys: Vec<_> = result.routes.iter().map(|r| (r.module.clone(), r.subpath.clone())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_unnamed_members_are_skipped() {
        let store = MemoryStore::from_snapshot(
            StoreSnapshot::new()
                .module("a", 1)
                .decl(DeclSnapshot::new(1, Category::Namespace, "a", "a").with_members(&[2, 3]))
                .decl(DeclSnapshot::new(2, Category::Function, "anon", "").without_fqn())
                .decl(DeclSnapshot::new(3, Category::Function, "g", "a.g")),
        )
        .unwrap();

        let result = enumerate(&store, 2);
        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.stats.unnamed, 1);
    }

    #[test]
    fn test_module_roots_are_not_routes() {
        let store = MemoryStore::from_snapshot(
            StoreSnapshot::new()
                .module("std", 1)
                .decl(DeclSnapshot::new(1, Category::Namespace, "std", "std").with_members(&[2]))
                .decl(DeclSnapshot::new(2, Category::Namespace, "mem", "std.mem").with_members(&[1, 3]))
                .decl(DeclSnapshot::new(3, Category::Function, "copy", "std.mem.copy")),
        )
        .unwrap();

        let result = enumerate(&store, 1);
        let keys: Vec<_> = result.routes.iter().map(RouteDescriptor::key).collect();
        assert_eq!(keys, vec!["std/mem", "std/mem/copy"]);
        assert_eq!(result.stats.duplicates, 1);

        let store = graph_store();
        let result = enumerate(&store, 4);
        for module in discover_modules(&store, DEFAULT_MODULE_SCAN_LIMIT).unwrap() {
            let root = store.fqn(module.root).unwrap().unwrap();
            assert!(result.routes.iter().all(|r| r.fqn() != root), "{root} has a route");
        }
    }

    /// Two modules that reach the same declarations through sibling namespaces.
    fn shared_store() -> MemoryStore {
        MemoryStore::from_snapshot(
            StoreSnapshot::new()
                .module("a", 1)
                .module("b", 10)
                .decl(DeclSnapshot::new(1, Category::Namespace, "a", "a").with_members(&[2]))
                .decl(DeclSnapshot::new(2, Category::Namespace, "x", "a.x").with_members(&[3, 4]))
                .decl(DeclSnapshot::new(10, Category::Namespace, "b", "b").with_members(&[11]))
                .decl(DeclSnapshot::new(11, Category::Namespace, "y", "b.y").with_members(&[3, 4]))
                .decl(DeclSnapshot::new(3, Category::Function, "shared", "b.y.shared"))
                .decl(DeclSnapshot::new(4, Category::Function, "other", "lib.other")),
        )
        .unwrap()
    }

    #[test]
    fn test_shared_declaration_owner_is_stable() {
        let store = shared_store();
        for workers in [1, 2, 8] {
            for run in 0..30 {
                let result = enumerate(&store, workers);
                let routes = by_fqn(&result.routes);
                // Home module wins, otherwise the smallest key
                assert_eq!(routes["b.y.shared"].key(), "b/y/shared", "workers={workers} run={run}");
                assert_eq!(routes["lib.other"].key(), "a/x/other", "workers={workers} run={run}");
                assert_eq!(result.stats.duplicates, 2, "workers={workers} run={run}");
            }
        }
    }

    #[test]
    fn test_shallowest_path_owns_declaration() {
        for workers in [1, 8] {
            let result = enumerate(&graph_store(), workers);
            let routes = by_fqn(&result.routes);
            assert_eq!(routes["std.mem.Allocator"].key(), "core/Allocator", "workers={workers}");
            assert_eq!(routes["std.mem"].key(), "std/mem", "workers={workers}");
        }
    }

    #[test]
    fn test_declaration_failure_is_isolated() {
        let store = TestStore::new(graph_store())
            .failing(|op, key| (op == "name" && key == "#21").then(|| Error::NotFound(key.into())));
        let modules = discover_modules(&store, DEFAULT_MODULE_SCAN_LIMIT).unwrap();
        let result = RouteEnumerator::new(&store).with_workers(3).enumerate(&modules).unwrap();

        let routes = by_fqn(&result.routes);
        assert!(!routes.contains_key("core.Int"));
        assert!(!routes.contains_key("core.Int.max"));
        assert!(routes.contains_key("std.mem.Allocator.alloc"));
        assert_eq!(result.stats.failed, 1);
    }

    #[test]
    fn test_module_failure_is_isolated() {
        let store = TestStore::new(graph_store())
            .failing(|op, key| (op == "members" && key == "#20").then(|| Error::NotFound(key.into())));
        let modules = discover_modules(&store, DEFAULT_MODULE_SCAN_LIMIT).unwrap();
        let result = RouteEnumerator::new(&store).enumerate(&modules).unwrap();

        assert_eq!(result.stats.failed_modules, 1);
        assert!(result.routes.iter().all(|r| r.module == "std"));
        assert!(!result.routes.is_empty());
    }

    #[test]
    fn test_fatal_store_error_aborts() {
        let store = TestStore::new(graph_store())
            .failing(|op, key| (op == "name" && key == "#4").then(|| Error::StoreUnavailable("gone".into())));
        let modules = discover_modules(&store, DEFAULT_MODULE_SCAN_LIMIT).unwrap();
        let result = RouteEnumerator::new(&store).with_workers(2).enumerate(&modules);
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    }

    #[test]
    fn test_progress_messages() {
        let store = graph_store();
        let modules = discover_modules(&store, DEFAULT_MODULE_SCAN_LIMIT).unwrap();
        let (tx, rx) = crossbeam::channel::unbounded();
        let result = RouteEnumerator::new(&store)
            .with_progress(tx)
            .enumerate(&modules)
            .unwrap();

        let messages: Vec<_> = rx.try_iter().collect();
        assert!(matches!(
            messages.first(),
            Some(ProgressMessage::Started { phase: ProgressPhase::Enumeration, total: 2 })
        ));
        assert!(matches!(
            messages.last(),
            Some(ProgressMessage::Finished { phase: ProgressPhase::Enumeration })
        ));
        let progress = messages
            .iter()
            .filter(|m| matches!(m, ProgressMessage::Progress { .. }))
            .count();
        assert_eq!(progress, result.routes.len());
    }
}
