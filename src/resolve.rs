//! Alias Resolver
//!
//! Follows alias links from a requested handle to the first non-alias
//! declaration. Resolution never raises on bad data: broken links,
//! self-references and over-long chains stop at the last valid handle and
//! are reported through `ResolutionStatus`.

use crate::category::Category;
use crate::ids::DeclHandle;
use crate::store::DeclStore;
use crate::{Error, Result};

/// Maximum number of alias hops followed before giving up.
pub const DEFAULT_MAX_ALIAS_CHAIN: usize = 64;

/// How an alias chain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStatus {
    /// Reached a non-alias declaration
    Resolved,
    /// The alias at `at` points to nothing the store knows about
    Broken { at: DeclHandle },
    /// The alias at `at` points to itself
    SelfCycle { at: DeclHandle },
    /// Gave up after `limit` hops
    DepthExceeded { limit: usize },
}

/// Outcome of resolving one handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub requested: DeclHandle,
    /// The resolved handle, or the last valid one when resolution failed
    pub handle: DeclHandle,
    /// Alias links followed
    pub hops: usize,
    pub status: ResolutionStatus,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }

    /// The failure as an error value, for reporting.
    pub fn error(&self) -> Option<Error> {
        (!self.is_resolved()).then_some(Error::AliasUnresolved(self.requested))
    }
}

pub struct AliasResolver<'a> {
    store: &'a dyn DeclStore,
    max_chain: usize,
}

impl<'a> AliasResolver<'a> {
    pub fn new(store: &'a dyn DeclStore) -> Self {
        Self {
            store,
            max_chain: DEFAULT_MAX_ALIAS_CHAIN,
        }
    }

    pub fn with_max_chain(mut self, max_chain: usize) -> Self {
        self.max_chain = max_chain;
        self
    }

    /// Resolve `handle` to its concrete target.
    ///
    /// Only store failures are returned as `Err`; a target the store has no
    /// data for counts as a broken link.
    pub fn resolve(&self, handle: DeclHandle) -> Result<Resolution> {
        let mut current = handle;
        let mut hops = 0;

        loop {
            if self.store.category(current)? != Some(Category::Alias) {
                return Ok(self.finish(handle, current, hops, ResolutionStatus::Resolved));
            }

            if hops >= self.max_chain {
                let status = ResolutionStatus::DepthExceeded { limit: self.max_chain };
                return Ok(self.finish(handle, current, hops, status));
            }

            let target = match self.store.alias_target(current)? {
                None => {
                    let status = ResolutionStatus::Broken { at: current };
                    return Ok(self.finish(handle, current, hops, status));
                }
                Some(target) if target == current => {
                    let status = ResolutionStatus::SelfCycle { at: current };
                    return Ok(self.finish(handle, current, hops, status));
                }
                Some(target) => target,
            };

            // A dangling target is a broken link, not a store failure
            match self.store.category(target) {
                Ok(_) => {}
                Err(Error::OutOfBounds { .. }) => {
                    let status = ResolutionStatus::Broken { at: current };
                    return Ok(self.finish(handle, current, hops, status));
                }
                Err(e) => return Err(e),
            }

            current = target;
            hops += 1;
        }
    }

    fn finish(
        &self,
        requested: DeclHandle,
        handle: DeclHandle,
        hops: usize,
        status: ResolutionStatus,
    ) -> Resolution {
        if status != ResolutionStatus::Resolved {
            tracing::debug!("Alias chain from {} stopped at {}: {:?}", requested, handle, status);
        }
        Resolution {
            requested,
            handle,
            hops,
            status,
        }
    }
}
