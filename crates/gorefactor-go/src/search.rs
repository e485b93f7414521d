//! Occurrence search.
//!
//! [`SearchEngine::find_occurrences`] maps an identifier to every identifier
//! in the program that denotes the same entity. Identity is object identity
//! from the resolver, so a shadowed name never matches its shadow.
//!
//! Package names have no object of their own. A package is matched
//! structurally: its `package` clauses, plus the qualifiers of files that
//! import it under its default name.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use gorefactor_core::Span;
use gorefactor_syntax::{NodeId, NodeKind};

use crate::program::{PackageId, Program};
use crate::types::{ObjectId, ObjectKind, Type};

/// Occurrences per file path, each list in ascending offset order.
pub type Occurrences = BTreeMap<String, Vec<Span>>;

/// Errors from occurrence search.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("the selected node is not an identifier")]
    NotAnIdentifier,

    #[error("unable to find declaration of selected identifier")]
    Unresolved { name: String },

    /// A package that was not loaded as part of the program.
    #[error("package {name} is not part of the program")]
    ExternalPackage { name: String },
}

/// What an identifier denotes, for the purpose of searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    Object(ObjectId),
    Package(PackageId),
}

/// Finds the occurrences of declared entities across a [`Program`].
pub struct SearchEngine<'p> {
    program: &'p Program,
}

impl<'p> SearchEngine<'p> {
    pub fn new(program: &'p Program) -> Self {
        SearchEngine { program }
    }

    /// Work out what `ident` denotes.
    pub fn target(&self, ident: NodeId) -> Result<SearchTarget, SearchError> {
        let ast = self.program.ast();
        let Some(name) = ast.ident_name(ident) else {
            return Err(SearchError::NotAnIdentifier);
        };
        if let Some(package) = self.is_package_name(ident)? {
            return Ok(SearchTarget::Package(package));
        }
        self.program
            .info()
            .object_of(ident)
            .map(SearchTarget::Object)
            .ok_or_else(|| SearchError::Unresolved {
                name: name.to_string(),
            })
    }

    /// The package `ident` names, if it names one.
    ///
    /// That is the case for the name in a `package` clause and for a
    /// qualifier that refers to an import under the package's own name.
    /// An explicitly named import is an ordinary object: renaming it only
    /// touches the importing file.
    pub fn is_package_name(&self, ident: NodeId) -> Result<Option<PackageId>, SearchError> {
        let ast = self.program.ast();
        let file = self.program.file_of(ident);
        if let NodeKind::File { name, .. } = ast.kind(file.root) {
            if *name == ident {
                return Ok(Some(file.package));
            }
        }

        let info = self.program.info();
        let Some(obj) = info.object_of(ident) else {
            return Ok(None);
        };
        let object = info.object(obj);
        if object.kind != ObjectKind::PkgName || object.decl.is_some() {
            return Ok(None);
        }
        match object.imported {
            Some(package) => Ok(Some(package)),
            None => Err(SearchError::ExternalPackage {
                name: object.name.clone(),
            }),
        }
    }

    /// Every occurrence of whatever `ident` denotes, grouped by file.
    pub fn find_occurrences(&self, ident: NodeId) -> Result<Occurrences, SearchError> {
        let idents = match self.target(ident)? {
            SearchTarget::Object(obj) => self.object_idents(obj),
            SearchTarget::Package(package) => self.package_idents(package),
        };

        let mut occurrences = Occurrences::new();
        for id in idents {
            let path = self.program.file_of(id).path.clone();
            occurrences
                .entry(path)
                .or_default()
                .push(self.program.ast().span(id));
        }
        for spans in occurrences.values_mut() {
            spans.sort();
            spans.dedup();
        }

        debug!(
            files = occurrences.len(),
            occurrences = occurrences.values().map(Vec::len).sum::<usize>(),
            "found occurrences"
        );
        Ok(occurrences)
    }

    fn object_idents(&self, obj: ObjectId) -> Vec<NodeId> {
        let info = self.program.info();
        let mut idents: Vec<NodeId> = info.idents_of(obj).collect();

        // A field embedded as `T` is named after the type, so selectors
        // reaching it through the field name rename along with `T`.
        if info.object(obj).kind == ObjectKind::TypeName {
            let embedded = info.objects().filter(|(_, o)| {
                o.embedded && o.ty.as_ref().map(Type::strip_pointer) == Some(&Type::Named(obj))
            });
            for (field, _) in embedded {
                idents.extend(info.idents_of(field));
            }
        }
        idents
    }

    fn package_idents(&self, package: PackageId) -> Vec<NodeId> {
        let ast = self.program.ast();
        let info = self.program.info();

        let mut idents = Vec::new();
        for &file in &self.program.package(package).files {
            if let NodeKind::File { name, .. } = ast.kind(self.program.file(file).root) {
                idents.push(*name);
            }
        }
        idents.extend(info.uses.iter().filter_map(|(&id, &obj)| {
            let object = info.object(obj);
            (object.kind == ObjectKind::PkgName
                && object.decl.is_none()
                && object.imported == Some(package))
            .then_some(id)
        }));
        idents
    }
}

// ============================================================================
// Tests
// ============================================================================
