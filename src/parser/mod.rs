//
//  mod.rs
//  RouteLens
//

//! Semantic source models.
//!
//! A [`LanguageAdapter`] exposes the declarations of one source language in
//! a uniform shape: types carrying markers (annotations), member routines
//! carrying markers, and marker arguments already lowered to [`PathExpr`].
//! Route extraction only ever talks to this trait.

mod java;

use std::path::Path;

pub use java::JavaModel;

use crate::model::HttpMethod;
use crate::resolve::{PathExpr, Scope, SymbolLookup};
use crate::source::SupportedLanguage;

/// An annotation (or equivalent) attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Simple name, e.g. `GetMapping`.
    pub name: String,
    /// Fully qualified names this marker may refer to, derived from the
    /// written name and the file's imports. Empty when nothing qualifies it.
    pub candidates: Vec<String>,
    /// The path-bearing argument, if any.
    pub path: Option<PathExpr>,
    /// Verbs named by an explicit method attribute.
    pub methods: Vec<HttpMethod>,
}

impl Marker {
    /// True when this marker resolves to `<package>.<name>` for one of the
    /// given packages. An empty package list accepts any marker.
    pub fn is_from(&self, packages: &[&str]) -> bool {
        packages.is_empty()
            || self.candidates.iter().any(|c| {
                packages.iter().any(|p| {
                    c.strip_prefix(p).and_then(|r| r.strip_prefix('.')) == Some(self.name.as_str())
                })
            })
    }
}

/// A routine declared inside a type.
#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub name: String,
    pub markers: Vec<Marker>,
    pub line: usize,
}

/// A class-like declaration and the routines it declares directly.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    /// Scope of the type body: its file and the chain of enclosing types,
    /// ending with this one.
    pub scope: Scope,
    pub markers: Vec<Marker>,
    pub members: Vec<MemberDecl>,
    pub line: usize,
}

/// Uniform view of one language's declarations.
pub trait LanguageAdapter: SymbolLookup {
    fn language(&self) -> SupportedLanguage;

    /// Every type declaration, nested ones included, in file order.
    fn types(&self) -> &[TypeDecl];

    /// Path of the file a [`Scope::file`] index refers to.
    fn file_path(&self, file: usize) -> &Path;
}
