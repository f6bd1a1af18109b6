//! Declaration records - category-driven assembly
//!
//! A `DeclarationRecord` is everything a documentation page needs about one
//! declaration. Identity fields (`name`, `fqn`) come from the handle that was
//! requested; everything else comes from the alias-resolved target.

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::ids::{DeclHandle, ErrorNodeId};
use crate::resolve::{AliasResolver, DEFAULT_MAX_ALIAS_CHAIN};
use crate::store::{DeclStore, DocLength, Visibility};
use crate::{Error, Result};

/// Function prototype, rendered as HTML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prototype {
    pub short_html: String,
    pub full_html: String,
}

/// Error set of a function, anchored to its base declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSetRecord {
    pub base: DeclHandle,
    pub node: ErrorNodeId,
    #[serde(default)]
    pub errors: Vec<ErrorNodeId>,
}

/// A fully assembled declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRecord {
    pub original_handle: DeclHandle,
    pub target_handle: DeclHandle,
    pub name: String,
    /// FQN of the requested handle
    pub fqn: String,
    /// FQN of the resolved target
    pub target_fqn: String,
    /// Category of the target; absent when the store reported an unknown one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub is_alias: bool,
    pub docs_short_html: String,
    pub docs_full_html: String,
    pub type_html: String,
    pub source_html: String,
    pub file_path: String,

    // Function / TypeFunction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype: Option<Prototype>,
    #[serde(default)]
    pub params: Vec<DeclHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_set: Option<ErrorSetRecord>,

    // Container / Type / Namespace
    #[serde(default)]
    pub fields: Vec<DeclHandle>,
    #[serde(default)]
    pub members: Vec<DeclHandle>,

    /// Function, TypeFunction, Container, Type and Namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctest_html: Option<String>,

    // ErrorSet
    #[serde(default)]
    pub error_nodes: Vec<ErrorNodeId>,
}

impl DeclarationRecord {
    pub(crate) fn base(original: DeclHandle, target: DeclHandle, name: String, fqn: String) -> Self {
        Self {
            original_handle: original,
            target_handle: target,
            name,
            target_fqn: fqn.clone(),
            fqn,
            category: None,
            is_alias: false,
            docs_short_html: String::new(),
            docs_full_html: String::new(),
            type_html: String::new(),
            source_html: String::new(),
            file_path: String::new(),
            prototype: None,
            params: Vec::new(),
            error_set: None,
            fields: Vec::new(),
            members: Vec::new(),
            doctest_html: None,
            error_nodes: Vec::new(),
        }
    }

    /// Whether the enumerator should descend into this record's members
    pub fn has_child_routes(&self) -> bool {
        self.category.is_some_and(|c| c.has_members()) && !self.members.is_empty()
    }
}

/// Builds `DeclarationRecord`s from a store.
pub struct RecordAssembler<'a> {
    store: &'a dyn DeclStore,
    resolver: AliasResolver<'a>,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(store: &'a dyn DeclStore) -> Self {
        Self::with_max_alias_chain(store, DEFAULT_MAX_ALIAS_CHAIN)
    }

    pub fn with_max_alias_chain(store: &'a dyn DeclStore, max_chain: usize) -> Self {
        Self {
            store,
            resolver: AliasResolver::new(store).with_max_chain(max_chain),
        }
    }

    /// Assemble the record for the declaration named `fqn`.
    pub fn assemble_by_name(&self, fqn: &str, visibility: Visibility) -> Result<DeclarationRecord> {
        let handle = self
            .store
            .lookup(fqn)?
            .ok_or_else(|| Error::NotFound(fqn.to_string()))?;
        self.assemble(handle, visibility)?
            .ok_or_else(|| Error::NotFound(fqn.to_string()))
    }

    /// Assemble the record for `handle`.
    ///
    /// Returns `None` when the store cannot name the declaration.
    /// `visibility` applies to member lists.
    pub fn assemble(&self, handle: DeclHandle, visibility: Visibility) -> Result<Option<DeclarationRecord>> {
        let Some(fqn) = self.store.fqn(handle)? else {
            tracing::debug!("No FQN for {}, skipping", handle);
            return Ok(None);
        };
        let name = self.store.name(handle)?;
        let is_alias = self.store.category(handle)? == Some(Category::Alias);

        let resolution = self.resolver.resolve(handle)?;
        if let Some(err) = resolution.error() {
            tracing::warn!("{} ({}): {:?}; using {}", err, fqn, resolution.status, resolution.handle);
        }
        let target = resolution.handle;

        let mut record = DeclarationRecord::base(handle, target, name, fqn);
        record.is_alias = is_alias;
        if target != handle {
            if let Some(target_fqn) = self.degrade(self.store.fqn(target), target, "target fqn")? {
                record.target_fqn = target_fqn;
            }
        }

        record.docs_short_html = self.degrade(self.store.docs_html(target, DocLength::Short), target, "short docs")?;
        record.docs_full_html = self.degrade(self.store.docs_html(target, DocLength::Full), target, "full docs")?;
        record.type_html = self.degrade(self.store.type_html(target), target, "type")?;
        record.source_html = self.degrade(self.store.source_html(target), target, "source")?;
        record.file_path = self.degrade(self.store.file_path(target), target, "file path")?;

        record.category = self.store.category(target)?;
        match record.category {
            Some(Category::Function | Category::TypeFunction) => {
                self.fill_callable(&mut record)?;
            }
            Some(Category::Container | Category::Type | Category::Namespace) => {
                self.fill_container(&mut record, visibility)?;
            }
            Some(Category::ErrorSet) => {
                self.fill_error_set(&mut record)?;
            }
            Some(
                Category::GlobalVariable
                | Category::Primitive
                | Category::GlobalConst
                | Category::Alias
                | Category::TypeType,
            ) => {}
            None => {
                tracing::warn!("{}; {} assembled with base fields only", Error::UnknownCategory(target), record.fqn);
            }
        }

        Ok(Some(record))
    }

    fn fill_callable(&self, record: &mut DeclarationRecord) -> Result<()> {
        let target = record.target_handle;
        record.prototype = Some(Prototype {
            short_html: self.degrade(self.store.fn_proto_html(target, DocLength::Short), target, "prototype")?,
            full_html: self.degrade(self.store.fn_proto_html(target, DocLength::Full), target, "prototype")?,
        });
        record.params = self.degrade(self.store.params(target), target, "params")?;
        record.doctest_html = Some(self.degrade(self.store.doctest_html(target), target, "doctest")?);

        if let Some(set) = self.degrade(self.store.error_set(target), target, "error set")? {
            let errors = self.degrade(self.store.error_nodes(&set), set.base, "error nodes")?;
            record.error_set = Some(ErrorSetRecord {
                base: set.base,
                node: set.node,
                errors,
            });
        }
        Ok(())
    }

    fn fill_container(&self, record: &mut DeclarationRecord, visibility: Visibility) -> Result<()> {
        let target = record.target_handle;
        record.fields = self.degrade(self.store.fields(target), target, "fields")?;
        record.members = self.degrade(self.store.members(target, visibility), target, "members")?;
        record.doctest_html = Some(self.degrade(self.store.doctest_html(target), target, "doctest")?);
        Ok(())
    }

    fn fill_error_set(&self, record: &mut DeclarationRecord) -> Result<()> {
        let target = record.target_handle;
        if let Some(set) = self.degrade(self.store.error_set(target), target, "error set")? {
            record.error_nodes = self.degrade(self.store.error_nodes(&set), set.base, "error nodes")?;
        }
        Ok(())
    }

    /// Missing data degrades to an empty value; anything else propagates.
    fn degrade<T: Default>(&self, result: Result<T>, handle: DeclHandle, what: &str) -> Result<T> {
        match result {
            Err(err @ Error::OutOfBounds { .. }) => {
                tracing::warn!("{} ({}), using empty {}", err, handle, what);
                Ok(T::default())
            }
            other => other,
        }
    }
}
