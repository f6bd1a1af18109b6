//! Store wrapper for tests: counts calls and injects failures

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{DeclStore, DocLength, ErrorSetRef, MemoryStore, Visibility};
use crate::category::Category;
use crate::ids::{DeclHandle, ErrorNodeId};
use crate::{Error, Result};

type Fault = Box<dyn Fn(&str, &str) -> Option<Error> + Send + Sync>;

/// Delegates to a `MemoryStore`.
///
/// The fault hook sees the operation name and its key (`#<handle>`, a
/// module name, a module index or an FQN) and may return an error instead.
pub(crate) struct TestStore {
    inner: MemoryStore,
    calls: AtomicUsize,
    fault: Option<Fault>,
}

impl TestStore {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            fault: None,
        }
    }

    pub(crate) fn failing(mut self, fault: impl Fn(&str, &str) -> Option<Error> + Send + Sync + 'static) -> Self {
        self.fault = Some(Box::new(fault));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, op: &str, key: impl ToString) -> Result<&MemoryStore> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = &self.fault {
            if let Some(err) = fault(op, &key.to_string()) {
                return Err(err);
            }
        }
        Ok(&self.inner)
    }
}

impl DeclStore for TestStore {
    fn category(&self, h: DeclHandle) -> Result<Option<Category>> {
        self.enter("category", h)?.category(h)
    }
    fn alias_target(&self, h: DeclHandle) -> Result<Option<DeclHandle>> {
        self.enter("alias_target", h)?.alias_target(h)
    }
    fn name(&self, h: DeclHandle) -> Result<String> {
        self.enter("name", h)?.name(h)
    }
    fn fqn(&self, h: DeclHandle) -> Result<Option<String>> {
        self.enter("fqn", h)?.fqn(h)
    }
    fn docs_html(&self, h: DeclHandle, l: DocLength) -> Result<String> {
        self.enter("docs_html", h)?.docs_html(h, l)
    }
    fn type_html(&self, h: DeclHandle) -> Result<String> {
        self.enter("type_html", h)?.type_html(h)
    }
    fn source_html(&self, h: DeclHandle) -> Result<String> {
        self.enter("source_html", h)?.source_html(h)
    }
    fn file_path(&self, h: DeclHandle) -> Result<String> {
        self.enter("file_path", h)?.file_path(h)
    }
    fn params(&self, h: DeclHandle) -> Result<Vec<DeclHandle>> {
        self.enter("params", h)?.params(h)
    }
    fn fields(&self, h: DeclHandle) -> Result<Vec<DeclHandle>> {
        self.enter("fields", h)?.fields(h)
    }
    fn members(&self, h: DeclHandle, v: Visibility) -> Result<Vec<DeclHandle>> {
        self.enter("members", h)?.members(h, v)
    }
    fn fn_proto_html(&self, h: DeclHandle, l: DocLength) -> Result<String> {
        self.enter("fn_proto_html", h)?.fn_proto_html(h, l)
    }
    fn doctest_html(&self, h: DeclHandle) -> Result<String> {
        self.enter("doctest_html", h)?.doctest_html(h)
    }
    fn error_set(&self, h: DeclHandle) -> Result<Option<ErrorSetRef>> {
        self.enter("error_set", h)?.error_set(h)
    }
    fn error_nodes(&self, s: &ErrorSetRef) -> Result<Vec<ErrorNodeId>> {
        self.enter("error_nodes", s.base)?.error_nodes(s)
    }
    fn lookup(&self, fqn: &str) -> Result<Option<DeclHandle>> {
        self.enter("lookup", fqn)?.lookup(fqn)
    }
    fn module_name(&self, i: u32) -> Result<String> {
        self.enter("module_name", i)?.module_name(i)
    }
    fn module_root(&self, n: &str) -> Result<Option<DeclHandle>> {
        self.enter("module_root", n)?.module_root(n)
    }
}
