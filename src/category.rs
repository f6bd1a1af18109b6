//! Declaration categories
//!
//! The store classifies every handle into exactly one of eleven categories.
//! Backends report them as numeric codes; `Category::from_code` is the only
//! place those codes are interpreted.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Category of a declaration at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A file or module namespace
    Namespace,
    /// A struct, union, enum or opaque type with members
    Container,
    GlobalVariable,
    Function,
    /// A builtin type such as `u8` or `bool`
    Primitive,
    ErrorSet,
    GlobalConst,
    /// Equivalent to another declaration; must be resolved first
    Alias,
    /// An expression whose value is a type
    Type,
    /// The type of types
    TypeType,
    /// A function returning a type
    TypeFunction,
}

impl Category {
    /// Map a store code to a category. Codes outside the closed set are
    /// unknown and yield `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::all().get(code as usize).copied()
    }

    /// The store code for this category.
    pub fn code(&self) -> u8 {
        match self {
            Category::Namespace => 0,
            Category::Container => 1,
            Category::GlobalVariable => 2,
            Category::Function => 3,
            Category::Primitive => 4,
            Category::ErrorSet => 5,
            Category::GlobalConst => 6,
            Category::Alias => 7,
            Category::Type => 8,
            Category::TypeType => 9,
            Category::TypeFunction => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Namespace => "namespace",
            Category::Container => "container",
            Category::GlobalVariable => "global_variable",
            Category::Function => "function",
            Category::Primitive => "primitive",
            Category::ErrorSet => "error_set",
            Category::GlobalConst => "global_const",
            Category::Alias => "alias",
            Category::Type => "type",
            Category::TypeType => "type_type",
            Category::TypeFunction => "type_function",
        }
    }

    /// All categories, in code order
    pub fn all() -> &'static [Category] {
        &[
            Category::Namespace,
            Category::Container,
            Category::GlobalVariable,
            Category::Function,
            Category::Primitive,
            Category::ErrorSet,
            Category::GlobalConst,
            Category::Alias,
            Category::Type,
            Category::TypeType,
            Category::TypeFunction,
        ]
    }

    /// Categories whose members get their own pages
    pub fn has_members(&self) -> bool {
        matches!(self, Category::Namespace | Category::Container | Category::Type)
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "namespace" | "ns" | "module" => Ok(Category::Namespace),
            "container" | "struct" => Ok(Category::Container),
            "global_variable" | "var" => Ok(Category::GlobalVariable),
            "function" | "fn" => Ok(Category::Function),
            "primitive" => Ok(Category::Primitive),
            "error_set" => Ok(Category::ErrorSet),
            "global_const" | "const" => Ok(Category::GlobalConst),
            "alias" => Ok(Category::Alias),
            "type" => Ok(Category::Type),
            "type_type" => Ok(Category::TypeType),
            "type_function" => Ok(Category::TypeFunction),
            _ => Err(Error::NotFound(format!("category {}", s))),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
