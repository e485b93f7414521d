//! Name resolution.
//!
//! The resolver walks every parsed file and fills an [`Info`]: scopes,
//! objects, the identifier tables and the types of expressions it can work
//! out. It runs in phases so that package-level names, methods, struct
//! members and signatures exist before any function body is visited:
//!
//! 1. package-level declarations and imports
//! 2. methods, attached to their receiver base types
//! 3. fields and interface methods of every struct and interface literal
//! 4. type declarations, then signatures, then package-level values
//! 5. function bodies
//!
//! Type inference is deliberately partial. It tracks enough to resolve
//! selectors through fields, methods and package qualifiers; anything it
//! cannot type is left unknown rather than reported.

use std::collections::HashMap;

use gorefactor_core::{LogEntry, Severity};
use gorefactor_syntax::ast::{DeclKeyword, LitKind, NodeKind};
use gorefactor_syntax::{Ast, FileId, NodeId, TokenKind};

use crate::program::{FileSet, Package, SourceFile};
use crate::types::{
    Info, Object, ObjectId, ObjectKind, Owner, Scope, ScopeId, ScopeKind, Signature, Type,
};

/// Predeclared type names.
pub const PREDECLARED_TYPES: &[&str] = &[
    "any", "bool", "byte", "complex64", "complex128", "error", "float32", "float64", "int", "int8",
    "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16", "uint32", "uint64",
    "uintptr",
];

/// Built-in functions.
pub const BUILTINS: &[&str] = &[
    "append", "cap", "clear", "close", "complex", "copy", "delete", "imag", "len", "make", "max",
    "min", "new", "panic", "print", "println", "real", "recover",
];

/// Resolve every file of a program.
pub(crate) fn resolve(ast: &Ast, files: &FileSet, packages: &[Package]) -> (Info, Vec<LogEntry>) {
    let mut resolver = Resolver {
        ast,
        files,
        packages,
        info: Info::default(),
        diagnostics: Vec::new(),
        labels: Vec::new(),
    };
    resolver.run();
    (resolver.info, resolver.diagnostics)
}

struct Resolver<'a> {
    ast: &'a Ast,
    files: &'a FileSet,
    packages: &'a [Package],
    info: Info,
    diagnostics: Vec<LogEntry>,
    /// Labels of the functions being walked, innermost last.
    labels: Vec<HashMap<String, ObjectId>>,
}

impl<'a> Resolver<'a> {
    fn run(&mut self) {
        let universe = self.declare_universe();
        let (files, packages) = (self.files, self.packages);

        for package in packages {
            let scope = self
                .info
                .add_scope(Scope::new(ScopeKind::Package, Some(universe), None));
            self.info.package_scopes.push(scope);
            for &file in &package.files {
                let root = files.get(file).root;
                let file_scope = self
                    .info
                    .add_scope(Scope::new(ScopeKind::File, Some(scope), Some(root)));
                self.info.file_scopes.insert(file, file_scope);
                self.collect_top_level(file, scope);
            }
        }

        for file in files.iter() {
            self.collect_imports(file);
        }
        for file in files.iter() {
            self.collect_methods(file);
        }
        for file in files.iter() {
            self.collect_members(file.root);
        }
        for file in files.iter() {
            self.walk_type_decls(file);
        }
        for file in files.iter() {
            self.walk_signatures(file);
        }
        for file in files.iter() {
            self.walk_value_decls(file);
        }
        for file in files.iter() {
            self.walk_bodies(file);
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn decls(&self, file: &SourceFile) -> &'a [NodeId] {
        let ast = self.ast;
        match ast.kind(file.root) {
            NodeKind::File { decls, .. } => decls,
            _ => &[],
        }
    }

    fn file_scope(&self, file: FileId) -> ScopeId {
        self.info.file_scopes[&file]
    }

    fn error(&mut self, node: NodeId, message: String) {
        let file = self.files.get(self.ast.file(node));
        self.diagnostics.push(LogEntry {
            severity: Severity::Error,
            message,
            position: Some(file.location(self.ast.span(node))),
        });
    }

    fn new_scope(&mut self, kind: ScopeKind, parent: ScopeId, node: Option<NodeId>) -> ScopeId {
        self.info.add_scope(Scope::new(kind, Some(parent), node))
    }

    /// Declare the identifier `ident` in `scope`. Blank identifiers declare
    /// nothing.
    fn declare(&mut self, scope: ScopeId, ident: NodeId, kind: ObjectKind) -> Option<ObjectId> {
        let ast = self.ast;
        let name = ast.ident_name(ident)?;
        if name == "_" {
            return None;
        }
        let mut object = Object::new(name, kind);
        object.parent = Some(scope);
        object.decl = Some(ident);
        let id = self.info.add_object(object);
        self.info.defs.insert(ident, id);
        if self.info.scope_mut(scope).insert(name, id).is_some() {
            self.error(ident, format!("{} redeclared in this block", name));
        }
        Some(id)
    }

    fn predeclare(&mut self, scope: ScopeId, name: &str, kind: ObjectKind, ty: Option<Type>) {
        let mut object = Object::new(name, kind);
        object.parent = Some(scope);
        object.ty = ty;
        let id = self.info.add_object(object);
        self.info.scope_mut(scope).insert(name, id);
    }

    /// A predeclared type by name.
    fn basic(&self, name: &str) -> Type {
        self.info
            .universe()
            .and_then(|u| self.info.scope(u).lookup(name))
            .map_or(Type::Invalid, Type::Named)
    }

    fn is_basic(&self, ty: &Type, names: &[&str]) -> bool {
        match ty {
            Type::Named(obj) => {
                self.info.is_universe_object(*obj)
                    && names.contains(&self.info.object(*obj).name.as_str())
            }
            _ => false,
        }
    }

    fn lookup(&self, scope: ScopeId, name: &str) -> Option<ObjectId> {
        self.info.lookup_parent(scope, name)
    }

    fn kind_of(&self, obj: ObjectId) -> ObjectKind {
        self.info.object(obj).kind
    }

    /// Resolve an identifier use, reporting it when nothing is in scope.
    fn use_ident(&mut self, ident: NodeId, scope: ScopeId) -> Option<ObjectId> {
        let ast = self.ast;
        let name = ast.ident_name(ident)?;
        if name == "_" {
            return None;
        }
        match self.lookup(scope, name) {
            Some(obj) => {
                self.info.uses.insert(ident, obj);
                Some(obj)
            }
            None => {
                self.error(ident, format!("undeclared name: {}", name));
                None
            }
        }
    }

    /// Exported member of the in-program package `pkg_name` refers to.
    fn package_member(&self, pkg_name: ObjectId, name: &str) -> Option<ObjectId> {
        let package = self.info.object(pkg_name).imported?;
        let scope = self.info.package_scope(package)?;
        self.info
            .scope(scope)
            .lookup(name)
            .filter(|&obj| self.info.object(obj).exported)
    }

    /// Package name object an identifier refers to, without recording a use.
    fn peek_package(&self, ident: NodeId, scope: ScopeId) -> Option<ObjectId> {
        let name = self.ast.ident_name(ident)?;
        self.lookup(scope, name)
            .filter(|&obj| self.kind_of(obj) == ObjectKind::PkgName)
    }

    /// Check if an expression denotes a type rather than a value.
    fn denotes_type(&self, node: NodeId, scope: ScopeId) -> bool {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::Ident { name } => self
                .lookup(scope, name)
                .is_some_and(|obj| self.kind_of(obj) == ObjectKind::TypeName),
            NodeKind::SelectorExpr { x, sel } => self
                .peek_package(*x, scope)
                .and_then(|pkg| self.package_member(pkg, ast.ident_name(*sel)?))
                .is_some_and(|obj| self.kind_of(obj) == ObjectKind::TypeName),
            NodeKind::ParenExpr { x } | NodeKind::StarExpr { x } => self.denotes_type(*x, scope),
            NodeKind::ArrayType { .. }
            | NodeKind::MapType { .. }
            | NodeKind::ChanType { .. }
            | NodeKind::FuncType { .. }
            | NodeKind::StructType { .. }
            | NodeKind::InterfaceType { .. } => true,
            _ => false,
        }
    }

    /// Type of a use of `obj` as a value.
    fn value_type(&self, obj: ObjectId, scope: ScopeId) -> Option<Type> {
        match self.kind_of(obj) {
            ObjectKind::Var | ObjectKind::Const | ObjectKind::Field | ObjectKind::Func => {
                self.info.object_type(obj, scope)
            }
            _ => None,
        }
    }

    // ========================================================================
    // Phase 1: package-level declarations and imports
    // ========================================================================

    fn declare_universe(&mut self) -> ScopeId {
        let universe = self
            .info
            .add_scope(Scope::new(ScopeKind::Universe, None, None));
        self.info.universe = Some(universe);

        for name in PREDECLARED_TYPES {
            self.predeclare(universe, name, ObjectKind::TypeName, None);
        }
        let (bool_ty, int_ty) = (self.basic("bool"), self.basic("int"));
        self.predeclare(universe, "true", ObjectKind::Const, Some(bool_ty.clone()));
        self.predeclare(universe, "false", ObjectKind::Const, Some(bool_ty));
        self.predeclare(universe, "iota", ObjectKind::Const, Some(int_ty));
        self.predeclare(universe, "nil", ObjectKind::Nil, None);
        for name in BUILTINS {
            self.predeclare(universe, name, ObjectKind::Builtin, None);
        }
        universe
    }

    fn collect_top_level(&mut self, file: FileId, scope: ScopeId) {
        let ast = self.ast;
        for &decl in self.decls(self.files.get(file)) {
            match ast.kind(decl) {
                NodeKind::GenDecl { keyword, specs } => {
                    for &spec in specs {
                        match (keyword, ast.kind(spec)) {
                            (DeclKeyword::Const, NodeKind::ValueSpec { names, .. }) => {
                                for &name in names {
                                    self.declare(scope, name, ObjectKind::Const);
                                }
                            }
                            (DeclKeyword::Var, NodeKind::ValueSpec { names, .. }) => {
                                for &name in names {
                                    self.declare(scope, name, ObjectKind::Var);
                                }
                            }
                            (_, NodeKind::TypeSpec { name, ty, .. }) => {
                                if let Some(obj) = self.declare(scope, *name, ObjectKind::TypeName) {
                                    self.note_type_literal(obj, *ty);
                                }
                            }
                            _ => {}
                        }
                    }
                }
                NodeKind::FuncDecl {
                    recv: None, name, ..
                } => {
                    if ast.ident_name(*name) == Some("init") {
                        // init functions are never in scope
                        let mut object = Object::new("init", ObjectKind::Func);
                        object.decl = Some(*name);
                        let id = self.info.add_object(object);
                        self.info.defs.insert(*name, id);
                    } else {
                        self.declare(scope, *name, ObjectKind::Func);
                    }
                }
                _ => {}
            }
        }
    }

    fn note_type_literal(&mut self, obj: ObjectId, ty: NodeId) {
        if matches!(
            self.ast.kind(ty),
            NodeKind::StructType { .. } | NodeKind::InterfaceType { .. }
        ) {
            self.info.named_literals.insert(ty, obj);
        }
    }

    fn collect_imports(&mut self, file: &SourceFile) {
        let ast = self.ast;
        let file_scope = self.file_scope(file.id);
        for &decl in self.decls(file) {
            let NodeKind::GenDecl {
                keyword: DeclKeyword::Import,
                specs,
            } = ast.kind(decl)
            else {
                continue;
            };
            for &spec in specs {
                let NodeKind::ImportSpec { name, path } = ast.kind(spec) else {
                    continue;
                };
                let import_path = match ast.kind(*path) {
                    NodeKind::BasicLit { value, .. } => unquote(value),
                    _ => continue,
                };
                let target = self
                    .packages
                    .iter()
                    .find(|p| p.import_path == import_path)
                    .map(|p| p.id);
                let explicit = name.and_then(|n| ast.ident_name(n));

                match explicit {
                    Some("_") => continue,
                    Some(".") => {
                        if let Some(scope) = target.and_then(|t| self.info.package_scope(t)) {
                            let exported: Vec<(String, ObjectId)> = self
                                .info
                                .scope(scope)
                                .names()
                                .filter(|&(_, obj)| self.info.object(obj).exported)
                                .map(|(n, obj)| (n.to_string(), obj))
                                .collect();
                            for (n, obj) in exported {
                                self.info.scope_mut(file_scope).insert(&n, obj);
                            }
                        }
                        continue;
                    }
                    _ => {}
                }

                let local_name = match (explicit, target) {
                    (Some(n), _) => n.to_string(),
                    (None, Some(t)) => self.packages[t.index()].name.clone(),
                    (None, None) => import_path
                        .rsplit('/')
                        .next()
                        .unwrap_or(&import_path)
                        .to_string(),
                };
                let mut object = Object::new(local_name.as_str(), ObjectKind::PkgName);
                object.parent = Some(file_scope);
                object.decl = *name;
                object.exported = false;
                object.imported = target;
                object.import_spec = Some(spec);
                let id = self.info.add_object(object);
                if let Some(n) = name {
                    self.info.defs.insert(*n, id);
                }
                if self
                    .info
                    .scope_mut(file_scope)
                    .insert(&local_name, id)
                    .is_some()
                {
                    self.error(spec, format!("{} redeclared in this block", local_name));
                }
            }
        }
    }

    // ========================================================================
    // Phases 2 and 3: methods and members
    // ========================================================================

    fn collect_methods(&mut self, file: &SourceFile) {
        let ast = self.ast;
        let Some(package_scope) = self.info.package_scope(file.package) else {
            return;
        };
        for &decl in self.decls(file) {
            let NodeKind::FuncDecl {
                recv: Some(recv),
                name,
                ..
            } = ast.kind(decl)
            else {
                continue;
            };
            let Some(method_name) = ast.ident_name(*name) else {
                continue;
            };
            let mut object = Object::new(method_name, ObjectKind::Func);
            object.decl = Some(*name);

            if let Some((base_ident, pointer)) = receiver_base(ast, *recv) {
                let base = ast
                    .ident_name(base_ident)
                    .and_then(|n| self.info.scope(package_scope).lookup(n))
                    .filter(|&obj| self.kind_of(obj) == ObjectKind::TypeName);
                match base {
                    Some(base) => {
                        self.info.uses.insert(base_ident, base);
                        if self
                            .info
                            .methods_of(base)
                            .iter()
                            .any(|&m| self.info.object(m).name == method_name)
                        {
                            let type_name = self.info.object(base).name.clone();
                            self.error(
                                *name,
                                format!("method {}.{} already declared", type_name, method_name),
                            );
                        }
                        object.owner = Some(Owner::Receiver { base, pointer });
                    }
                    None => {
                        let base_name = ast.ident_name(base_ident).unwrap_or_default();
                        self.error(base_ident, format!("undeclared name: {}", base_name));
                    }
                }
            }

            let owner = object.owner;
            let id = self.info.add_object(object);
            self.info.defs.insert(*name, id);
            if let Some(Owner::Receiver { base, .. }) = owner {
                self.info.methods.entry(base).or_default().push(id);
            }
        }
    }

    fn collect_members(&mut self, root: NodeId) {
        let ast = self.ast;
        for literal in ast.preorder(root) {
            match ast.kind(literal) {
                NodeKind::StructType { fields } => {
                    for field in list_fields(ast, *fields) {
                        let NodeKind::Field { names, ty, .. } = ast.kind(field) else {
                            continue;
                        };
                        if names.is_empty() {
                            if let Some(ident) = embedded_name(ast, *ty) {
                                let name = ast.ident_name(ident).unwrap_or_default();
                                let mut object = Object::new(name, ObjectKind::Field);
                                object.embedded = true;
                                object.owner = Some(Owner::Struct(literal));
                                let id = self.info.add_object(object);
                                self.info.members.entry(literal).or_default().push(id);
                            }
                        }
                        for &ident in names {
                            let name = ast.ident_name(ident).unwrap_or_default();
                            let mut object = Object::new(name, ObjectKind::Field);
                            object.decl = Some(ident);
                            object.owner = Some(Owner::Struct(literal));
                            let id = self.info.add_object(object);
                            self.info.defs.insert(ident, id);
                            self.info.members.entry(literal).or_default().push(id);
                        }
                    }
                }
                NodeKind::InterfaceType { methods } => {
                    for field in list_fields(ast, *methods) {
                        let NodeKind::Field { names, ty, .. } = ast.kind(field) else {
                            continue;
                        };
                        if names.is_empty() {
                            self.info
                                .embedded_interfaces
                                .entry(literal)
                                .or_default()
                                .push(*ty);
                        }
                        for &ident in names {
                            let name = ast.ident_name(ident).unwrap_or_default();
                            let mut object = Object::new(name, ObjectKind::Func);
                            object.decl = Some(ident);
                            object.owner = Some(Owner::Interface(literal));
                            let id = self.info.add_object(object);
                            self.info.defs.insert(ident, id);
                            self.info.members.entry(literal).or_default().push(id);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // ========================================================================
    // Phase 4: types, signatures, package-level values
    // ========================================================================

    fn walk_type_decls(&mut self, file: &SourceFile) {
        let ast = self.ast;
        let scope = self.file_scope(file.id);
        for &decl in self.decls(file) {
            if let NodeKind::GenDecl {
                keyword: DeclKeyword::Type,
                specs,
            } = ast.kind(decl)
            {
                for &spec in specs {
                    self.type_spec(spec, scope);
                }
            }
        }
    }

    fn type_spec(&mut self, spec: NodeId, scope: ScopeId) {
        let NodeKind::TypeSpec { name, ty, .. } = self.ast.kind(spec) else {
            return;
        };
        let obj = self.info.def(*name);
        let ty = self.type_expr(*ty, scope);
        if let (Some(obj), Some(ty)) = (obj, ty) {
            self.info.underlying.insert(obj, ty);
        }
    }

    fn walk_signatures(&mut self, file: &SourceFile) {
        let ast = self.ast;
        let scope = self.file_scope(file.id);
        for &decl in self.decls(file) {
            let NodeKind::FuncDecl { recv, name, ty, .. } = ast.kind(decl) else {
                continue;
            };
            if let Some(recv) = recv {
                self.field_types(*recv, scope);
            }
            let signature = self.signature(*ty, scope);
            if let Some(obj) = self.info.def(*name) {
                self.info.object_mut(obj).ty = Some(Type::Func(signature));
            }
        }
    }

    fn walk_value_decls(&mut self, file: &SourceFile) {
        let ast = self.ast;
        let scope = self.file_scope(file.id);
        for &decl in self.decls(file) {
            let NodeKind::GenDecl { keyword, specs } = ast.kind(decl) else {
                continue;
            };
            let kind = match keyword {
                DeclKeyword::Const => ObjectKind::Const,
                DeclKeyword::Var => ObjectKind::Var,
                _ => continue,
            };
            for &spec in specs {
                self.value_spec(spec, scope, kind, false);
            }
        }
    }

    /// Resolve a `const` or `var` spec. Local specs declare their names
    /// after the values are resolved; package-level names already exist.
    fn value_spec(&mut self, spec: NodeId, scope: ScopeId, kind: ObjectKind, declare: bool) {
        let NodeKind::ValueSpec { names, ty, values } = self.ast.kind(spec) else {
            return;
        };
        let declared = ty.and_then(|t| self.type_expr(t, scope));
        let values: Vec<Option<Type>> = values.iter().map(|&v| self.expr(v, scope)).collect();
        let values = self.spread(values, names.len());

        for (i, &name) in names.iter().enumerate() {
            let obj = if declare {
                self.declare(scope, name, kind)
            } else {
                self.info.def(name)
            };
            if let Some(obj) = obj {
                let ty = declared
                    .clone()
                    .or_else(|| values.get(i).cloned().flatten());
                self.info.object_mut(obj).ty = ty;
            }
        }
    }

    /// Match right-hand side types to `n` names, expanding a multi-value
    /// call and the comma-ok forms.
    fn spread(&self, types: Vec<Option<Type>>, n: usize) -> Vec<Option<Type>> {
        if types.len() != 1 || n < 2 {
            return types;
        }
        match types.into_iter().next().flatten() {
            Some(Type::Tuple(results)) => results.into_iter().map(Type::known).collect(),
            first => vec![first, Some(self.basic("bool"))],
        }
    }

    fn signature(&mut self, func_type: NodeId, scope: ScopeId) -> Signature {
        let NodeKind::FuncType { params, results } = self.ast.kind(func_type) else {
            return Signature::default();
        };
        let (params, variadic) = self.field_types(*params, scope);
        let results = match results {
            Some(results) => self.field_types(*results, scope).0,
            None => Vec::new(),
        };
        Signature {
            params,
            results,
            variadic,
        }
    }

    /// Types of a parameter list, one per declared name.
    fn field_types(&mut self, list: NodeId, scope: ScopeId) -> (Vec<Type>, bool) {
        let ast = self.ast;
        let mut types = Vec::new();
        let mut variadic = false;
        for field in list_fields(ast, list) {
            let NodeKind::Field { names, ty, .. } = ast.kind(field) else {
                continue;
            };
            variadic |= matches!(ast.kind(*ty), NodeKind::Ellipsis { .. });
            let t = self.type_expr(*ty, scope).unwrap_or(Type::Invalid);
            for _ in 0..names.len().max(1) {
                types.push(t.clone());
            }
        }
        (types, variadic)
    }

    /// Declare the names of a parameter list in a function scope.
    fn declare_params(&mut self, list: NodeId, scope: ScopeId) {
        let ast = self.ast;
        for field in list_fields(ast, list) {
            let NodeKind::Field { names, ty, .. } = ast.kind(field) else {
                continue;
            };
            let t = self.info.types.get(ty).cloned();
            for &name in names {
                if let Some(obj) = self.declare(scope, name, ObjectKind::Var) {
                    self.info.object_mut(obj).ty = t.clone();
                }
            }
        }
    }

    // ========================================================================
    // Phase 5: function bodies
    // ========================================================================

    fn walk_bodies(&mut self, file: &SourceFile) {
        let ast = self.ast;
        let scope = self.file_scope(file.id);
        for &decl in self.decls(file) {
            if let NodeKind::FuncDecl {
                recv,
                ty,
                body: Some(body),
                ..
            } = ast.kind(decl)
            {
                self.func_body(decl, *recv, *ty, *body, scope);
            }
        }
    }

    fn func_body(
        &mut self,
        func: NodeId,
        recv: Option<NodeId>,
        func_type: NodeId,
        body: NodeId,
        outer: ScopeId,
    ) {
        let ast = self.ast;
        let scope = self.new_scope(ScopeKind::Function, outer, Some(func));
        self.info.node_scopes.insert(body, scope);

        if let Some(recv) = recv {
            self.declare_params(recv, scope);
        }
        if let NodeKind::FuncType { params, results } = ast.kind(func_type) {
            self.declare_params(*params, scope);
            if let Some(results) = results {
                self.declare_params(*results, scope);
            }
        }

        let labels = self.collect_labels(body);
        self.labels.push(labels);
        if let NodeKind::BlockStmt { stmts } = ast.kind(body) {
            for &stmt in stmts {
                self.stmt(stmt, scope);
            }
        }
        self.labels.pop();
    }

    /// Labels are visible in the whole function body, including before
    /// their declaration, but not inside nested function literals.
    fn collect_labels(&mut self, body: NodeId) -> HashMap<String, ObjectId> {
        let ast = self.ast;
        let mut found = Vec::new();
        ast.inspect(body, |id| match ast.kind(id) {
            NodeKind::FuncLit { .. } => false,
            NodeKind::LabeledStmt { label, .. } => {
                found.push(*label);
                true
            }
            _ => true,
        });

        let scope = self.info.add_scope(Scope::new(ScopeKind::Labels, None, None));
        let mut labels = HashMap::new();
        for label in found {
            if let Some(obj) = self.declare(scope, label, ObjectKind::Label) {
                let name = self.info.object(obj).name.clone();
                labels.entry(name).or_insert(obj);
            }
        }
        labels
    }

    fn stmt(&mut self, id: NodeId, scope: ScopeId) {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::DeclStmt { decl } => self.local_decl(*decl, scope),
            NodeKind::EmptyStmt | NodeKind::CaseClause { .. } => {}
            NodeKind::LabeledStmt { stmt, .. } => self.stmt(*stmt, scope),
            NodeKind::ExprStmt { x } | NodeKind::IncDecStmt { x, .. } => {
                self.expr(*x, scope);
            }
            NodeKind::SendStmt { chan, value } => {
                self.expr(*chan, scope);
                self.expr(*value, scope);
            }
            NodeKind::GoStmt { call } | NodeKind::DeferStmt { call } => {
                self.expr(*call, scope);
            }
            NodeKind::ReturnStmt { results } => {
                for &r in results {
                    self.expr(r, scope);
                }
            }
            NodeKind::AssignStmt { lhs, op, rhs } => self.assign(lhs, *op, rhs, scope),
            NodeKind::BranchStmt { label, .. } => {
                if let Some(label) = label {
                    self.use_label(*label);
                }
            }
            NodeKind::BlockStmt { stmts } => {
                let block = self.new_scope(ScopeKind::Block, scope, Some(id));
                for &stmt in stmts {
                    self.stmt(stmt, block);
                }
            }
            NodeKind::IfStmt {
                init,
                cond,
                body,
                els,
            } => {
                let s = self.new_scope(ScopeKind::Block, scope, Some(id));
                if let Some(init) = init {
                    self.stmt(*init, s);
                }
                self.expr(*cond, s);
                self.stmt(*body, s);
                if let Some(els) = els {
                    self.stmt(*els, s);
                }
            }
            NodeKind::SwitchStmt { init, tag, body } => {
                let s = self.new_scope(ScopeKind::Block, scope, Some(id));
                if let Some(init) = init {
                    self.stmt(*init, s);
                }
                if let Some(tag) = tag {
                    self.expr(*tag, s);
                }
                for clause in clauses(ast, *body) {
                    let NodeKind::CaseClause { list, body } = ast.kind(clause) else {
                        continue;
                    };
                    for &e in list {
                        self.expr(e, s);
                    }
                    let cs = self.new_scope(ScopeKind::Block, s, Some(clause));
                    for &stmt in body {
                        self.stmt(stmt, cs);
                    }
                }
            }
            NodeKind::TypeSwitchStmt { init, assign, body } => {
                self.type_switch(id, *init, *assign, *body, scope)
            }
            NodeKind::ForStmt {
                init,
                cond,
                post,
                body,
            } => {
                let s = self.new_scope(ScopeKind::Block, scope, Some(id));
                if let Some(init) = init {
                    self.stmt(*init, s);
                }
                if let Some(cond) = cond {
                    self.expr(*cond, s);
                }
                if let Some(post) = post {
                    self.stmt(*post, s);
                }
                self.stmt(*body, s);
            }
            NodeKind::RangeStmt {
                key,
                value,
                define,
                x,
                body,
            } => {
                let s = self.new_scope(ScopeKind::Block, scope, Some(id));
                let x_ty = self.expr(*x, s);
                let (key_ty, value_ty) = self.range_types(x_ty);
                for (var, ty) in [(key, key_ty), (value, value_ty)] {
                    let Some(var) = var else { continue };
                    if *define {
                        if let Some(obj) = self.declare(s, *var, ObjectKind::Var) {
                            self.info.object_mut(obj).ty = ty;
                        }
                    } else {
                        self.expr(*var, s);
                    }
                }
                self.stmt(*body, s);
            }
            _ => {
                self.expr(id, scope);
            }
        }
    }

    fn local_decl(&mut self, decl: NodeId, scope: ScopeId) {
        let NodeKind::GenDecl { keyword, specs } = self.ast.kind(decl) else {
            return;
        };
        for &spec in specs {
            match keyword {
                DeclKeyword::Type => {
                    if let NodeKind::TypeSpec { name, ty, .. } = self.ast.kind(spec) {
                        if let Some(obj) = self.declare(scope, *name, ObjectKind::TypeName) {
                            self.note_type_literal(obj, *ty);
                        }
                    }
                    self.type_spec(spec, scope);
                }
                DeclKeyword::Const => self.value_spec(spec, scope, ObjectKind::Const, true),
                DeclKeyword::Var => self.value_spec(spec, scope, ObjectKind::Var, true),
                DeclKeyword::Import => {}
            }
        }
    }

    fn assign(&mut self, lhs: &[NodeId], op: TokenKind, rhs: &[NodeId], scope: ScopeId) {
        let ast = self.ast;
        let rhs_types: Vec<Option<Type>> = rhs.iter().map(|&r| self.expr(r, scope)).collect();
        if op != TokenKind::Define {
            for &l in lhs {
                self.expr(l, scope);
            }
            return;
        }

        let types = self.spread(rhs_types, lhs.len());
        for (i, &l) in lhs.iter().enumerate() {
            let Some(name) = ast.ident_name(l) else {
                self.expr(l, scope);
                continue;
            };
            if name == "_" {
                continue;
            }
            // := redeclares names already declared in the same scope
            match self.info.scope(scope).lookup(name) {
                Some(existing) => {
                    self.info.uses.insert(l, existing);
                }
                None => {
                    if let Some(obj) = self.declare(scope, l, ObjectKind::Var) {
                        self.info.object_mut(obj).ty = types.get(i).cloned().flatten();
                    }
                }
            }
        }
    }

    fn use_label(&mut self, label: NodeId) {
        let Some(name) = self.ast.ident_name(label) else {
            return;
        };
        match self.labels.last().and_then(|labels| labels.get(name)) {
            Some(&obj) => {
                self.info.uses.insert(label, obj);
            }
            None => self.error(label, format!("label {} not defined", name)),
        }
    }

    fn type_switch(
        &mut self,
        id: NodeId,
        init: Option<NodeId>,
        assign: NodeId,
        body: NodeId,
        scope: ScopeId,
    ) {
        let ast = self.ast;
        let s = self.new_scope(ScopeKind::Block, scope, Some(id));
        if let Some(init) = init {
            self.stmt(init, s);
        }

        let (binding, guard) = match ast.kind(assign) {
            NodeKind::ExprStmt { x } => (None, *x),
            NodeKind::AssignStmt { lhs, rhs, .. } if !rhs.is_empty() => {
                (lhs.first().copied(), rhs[0])
            }
            _ => return,
        };
        let guard_ty = match ast.kind(guard) {
            NodeKind::TypeAssertExpr { x, .. } => self.expr(*x, s),
            _ => None,
        };

        // One object for the bound name; each clause sees it with that
        // clause's type when the clause lists exactly one type.
        let bound = binding.and_then(|ident| {
            let name = ast.ident_name(ident).filter(|&n| n != "_")?;
            let mut object = Object::new(name, ObjectKind::Var);
            object.parent = Some(s);
            object.decl = Some(ident);
            object.ty = guard_ty;
            let obj = self.info.add_object(object);
            self.info.defs.insert(ident, obj);
            Some((name, obj))
        });

        for clause in clauses(ast, body) {
            let NodeKind::CaseClause { list, body } = ast.kind(clause) else {
                continue;
            };
            let mut case_types: Vec<Option<Type>> = Vec::new();
            for &e in list {
                case_types.push(self.type_expr(e, s));
            }
            let cs = self.new_scope(ScopeKind::Block, s, Some(clause));
            if let Some((name, obj)) = bound {
                self.info.scope_mut(cs).insert(name, obj);
                if let [Some(ty)] = case_types.as_slice() {
                    self.info.narrowed.insert(cs, (obj, ty.clone()));
                }
            }
            for &stmt in body {
                self.stmt(stmt, cs);
            }
        }
    }

    fn range_types(&self, x_ty: Option<Type>) -> (Option<Type>, Option<Type>) {
        let Some(x_ty) = x_ty else {
            return (None, None);
        };
        let int = Some(self.basic("int"));
        match self.info.underlying(x_ty.strip_pointer()) {
            Type::Slice(elem) | Type::Array(elem) => (int, elem.known()),
            Type::Map(key, value) => (key.known(), value.known()),
            Type::Chan(elem) => (elem.known(), None),
            t if self.is_basic(&t, &["string"]) => (int, Some(self.basic("rune"))),
            t if self.is_basic(&t, &["int", "int8", "int16", "int32", "int64", "uint"]) => {
                (Some(t), None)
            }
            _ => (None, None),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Resolve an expression and return its type when known.
    fn expr(&mut self, node: NodeId, scope: ScopeId) -> Option<Type> {
        let ast = self.ast;
        let ty = match ast.kind(node) {
            NodeKind::Ident { .. } => self
                .use_ident(node, scope)
                .and_then(|obj| self.value_type(obj, scope)),
            NodeKind::BasicLit { kind, .. } => Some(self.basic(match kind {
                LitKind::Int => "int",
                LitKind::Float => "float64",
                LitKind::Imag => "complex128",
                LitKind::Char => "rune",
                LitKind::String => "string",
            })),
            NodeKind::CompositeLit { .. } => self.composite(node, None, scope),
            NodeKind::FuncLit { ty, body } => {
                let signature = self.signature(*ty, scope);
                self.func_body(node, None, *ty, *body, scope);
                Some(Type::Func(signature))
            }
            NodeKind::ParenExpr { x } => {
                if self.denotes_type(*x, scope) {
                    self.type_expr(*x, scope);
                    None
                } else {
                    self.expr(*x, scope)
                }
            }
            NodeKind::SelectorExpr { x, sel } => self.selector(*x, *sel, scope),
            NodeKind::IndexExpr { x, index } => {
                let x_ty = self.expr(*x, scope);
                self.expr(*index, scope);
                self.index_type(x_ty)
            }
            NodeKind::SliceExpr { x, low, high, max } => {
                let x_ty = self.expr(*x, scope);
                for bound in [low, high, max].into_iter().flatten() {
                    self.expr(*bound, scope);
                }
                x_ty.map(|t| match self.info.underlying(t.strip_pointer()) {
                    Type::Array(elem) => Type::Slice(elem),
                    _ => t,
                })
            }
            NodeKind::TypeAssertExpr { x, ty } => {
                self.expr(*x, scope);
                ty.and_then(|t| self.type_expr(t, scope))
            }
            NodeKind::CallExpr { fun, args, .. } => self.call(*fun, args, scope),
            NodeKind::StarExpr { x } => {
                if self.denotes_type(*x, scope) {
                    self.type_expr(*x, scope);
                    return None;
                }
                match self.expr(*x, scope) {
                    Some(Type::Pointer(elem)) => elem.known(),
                    _ => None,
                }
            }
            NodeKind::UnaryExpr { op, x } => {
                let x_ty = self.expr(*x, scope);
                match op {
                    TokenKind::And => x_ty.map(|t| Type::Pointer(Box::new(t))),
                    TokenKind::Arrow => match x_ty.map(|t| self.info.underlying(&t)) {
                        Some(Type::Chan(elem)) => elem.known(),
                        _ => None,
                    },
                    TokenKind::Not => Some(self.basic("bool")),
                    _ => x_ty,
                }
            }
            NodeKind::BinaryExpr { x, op, y } => {
                let x_ty = self.expr(*x, scope);
                let y_ty = self.expr(*y, scope);
                match op {
                    TokenKind::Eql
                    | TokenKind::Neq
                    | TokenKind::Lss
                    | TokenKind::Leq
                    | TokenKind::Gtr
                    | TokenKind::Geq
                    | TokenKind::LAnd
                    | TokenKind::LOr => Some(self.basic("bool")),
                    TokenKind::Shl | TokenKind::Shr => x_ty,
                    _ => x_ty.or(y_ty),
                }
            }
            NodeKind::KeyValueExpr { key, value } => {
                self.expr(*key, scope);
                self.expr(*value, scope);
                None
            }
            NodeKind::FuncType { .. }
            | NodeKind::StructType { .. }
            | NodeKind::InterfaceType { .. }
            | NodeKind::ArrayType { .. }
            | NodeKind::MapType { .. }
            | NodeKind::ChanType { .. }
            | NodeKind::Ellipsis { .. } => {
                self.type_expr(node, scope);
                return None;
            }
            _ => None,
        };
        if let Some(ty) = &ty {
            self.info.types.insert(node, ty.clone());
        }
        ty
    }

    fn selector(&mut self, x: NodeId, sel: NodeId, scope: ScopeId) -> Option<Type> {
        let ast = self.ast;
        let sel_name = ast.ident_name(sel)?;

        if let Some(pkg) = self.peek_package(x, scope) {
            self.info.uses.insert(x, pkg);
            let member = self.package_member(pkg, sel_name)?;
            self.info.uses.insert(sel, member);
            return self.value_type(member, scope);
        }

        // T.Method is a method expression
        let base = if self.denotes_type(x, scope) {
            self.type_expr(x, scope)?
        } else {
            self.expr(x, scope)?
        };
        let member = self.info.lookup_field_or_method(&base, sel_name)?;
        self.info.uses.insert(sel, member);
        self.value_type(member, scope)
    }

    fn index_type(&self, x_ty: Option<Type>) -> Option<Type> {
        match self.info.underlying(x_ty?.strip_pointer()) {
            Type::Slice(elem) | Type::Array(elem) => elem.known(),
            Type::Map(_, value) => value.known(),
            t if self.is_basic(&t, &["string"]) => Some(self.basic("byte")),
            _ => None,
        }
    }

    fn call(&mut self, fun: NodeId, args: &[NodeId], scope: ScopeId) -> Option<Type> {
        let ast = self.ast;

        // Conversion T(x)
        if self.denotes_type(fun, scope) {
            let ty = self.type_expr(fun, scope);
            for &arg in args {
                self.expr(arg, scope);
            }
            return ty;
        }

        let callee = ast.unparen(fun);
        if let Some(name) = ast.ident_name(callee) {
            if let Some(obj) = self.lookup(scope, name) {
                if self.kind_of(obj) == ObjectKind::Builtin {
                    self.info.uses.insert(callee, obj);
                    return self.builtin_call(name, args, scope);
                }
            }
        }

        let fun_ty = self.expr(fun, scope);
        for &arg in args {
            self.expr(arg, scope);
        }
        match fun_ty.map(|t| self.info.underlying(&t)) {
            Some(Type::Func(signature)) => match signature.results.len() {
                0 => None,
                1 => signature.results.into_iter().next().and_then(Type::known),
                _ => Some(Type::Tuple(signature.results)),
            },
            _ => None,
        }
    }

    fn builtin_call(&mut self, name: &str, args: &[NodeId], scope: ScopeId) -> Option<Type> {
        match name {
            "new" | "make" => {
                let ty = args.first().and_then(|&a| self.type_expr(a, scope));
                for &arg in args.iter().skip(1) {
                    self.expr(arg, scope);
                }
                if name == "new" {
                    ty.map(|t| Type::Pointer(Box::new(t)))
                } else {
                    ty
                }
            }
            _ => {
                let types: Vec<Option<Type>> = args.iter().map(|&a| self.expr(a, scope)).collect();
                match name {
                    "append" | "min" | "max" => types.into_iter().next().flatten(),
                    "len" | "cap" | "copy" => Some(self.basic("int")),
                    "complex" => Some(self.basic("complex128")),
                    "real" | "imag" => Some(self.basic("float64")),
                    _ => None,
                }
            }
        }
    }

    /// Resolve a composite literal. `context` is the element type for
    /// literals whose type is elided inside an outer literal.
    fn composite(&mut self, node: NodeId, context: Option<Type>, scope: ScopeId) -> Option<Type> {
        let ast = self.ast;
        let NodeKind::CompositeLit { ty, elts } = ast.kind(node) else {
            return None;
        };
        let lit_ty = match ty {
            Some(ty) => self.type_expr(*ty, scope),
            None => context,
        };
        let under = lit_ty.as_ref().map(|t| self.info.underlying(t.strip_pointer()));

        match under {
            Some(Type::Struct(literal)) => {
                let fields = self.info.members_of(literal).to_vec();
                for (i, &elt) in elts.iter().enumerate() {
                    if let NodeKind::KeyValueExpr { key, value } = ast.kind(elt) {
                        let field = ast.ident_name(*key).and_then(|name| {
                            fields
                                .iter()
                                .copied()
                                .find(|&f| self.info.object(f).name == name)
                        });
                        let field_ty = match field {
                            Some(field) => {
                                self.info.uses.insert(*key, field);
                                self.info.object(field).ty.clone()
                            }
                            None => {
                                self.expr(*key, scope);
                                None
                            }
                        };
                        self.element(*value, field_ty, scope);
                    } else {
                        let field_ty = fields.get(i).and_then(|&f| self.info.object(f).ty.clone());
                        self.element(elt, field_ty, scope);
                    }
                }
            }
            Some(Type::Slice(elem)) | Some(Type::Array(elem)) => {
                for &elt in elts {
                    if let NodeKind::KeyValueExpr { key, value } = ast.kind(elt) {
                        self.expr(*key, scope);
                        self.element(*value, elem.clone().known(), scope);
                    } else {
                        self.element(elt, elem.clone().known(), scope);
                    }
                }
            }
            Some(Type::Map(key_ty, value_ty)) => {
                for &elt in elts {
                    if let NodeKind::KeyValueExpr { key, value } = ast.kind(elt) {
                        self.element(*key, key_ty.clone().known(), scope);
                        self.element(*value, value_ty.clone().known(), scope);
                    } else {
                        self.element(elt, value_ty.clone().known(), scope);
                    }
                }
            }
            _ => {
                // Unknown literal type: keys may be field names, so only
                // record them when something by that name is in scope.
                for &elt in elts {
                    if let NodeKind::KeyValueExpr { key, value } = ast.kind(elt) {
                        match ast.ident_name(*key) {
                            Some(name) => {
                                if let Some(obj) = self.lookup(scope, name) {
                                    self.info.uses.insert(*key, obj);
                                }
                            }
                            None => {
                                self.expr(*key, scope);
                            }
                        }
                        self.element(*value, None, scope);
                    } else {
                        self.element(elt, None, scope);
                    }
                }
            }
        }
        lit_ty
    }

    fn element(&mut self, node: NodeId, context: Option<Type>, scope: ScopeId) {
        if let NodeKind::CompositeLit { ty: None, .. } = self.ast.kind(node) {
            if let Some(ty) = self.composite(node, context, scope) {
                self.info.types.insert(node, ty);
            }
        } else {
            self.expr(node, scope);
        }
    }

    // ========================================================================
    // Type expressions
    // ========================================================================

    /// Resolve a type expression and return the type it denotes.
    fn type_expr(&mut self, node: NodeId, scope: ScopeId) -> Option<Type> {
        let ast = self.ast;
        let ty = match ast.kind(node) {
            NodeKind::Ident { .. } => self
                .use_ident(node, scope)
                .filter(|&obj| self.kind_of(obj) == ObjectKind::TypeName)
                .map(Type::Named),
            NodeKind::SelectorExpr { x, sel } => match self.peek_package(*x, scope) {
                Some(pkg) => {
                    self.info.uses.insert(*x, pkg);
                    let member = ast
                        .ident_name(*sel)
                        .and_then(|name| self.package_member(pkg, name));
                    match member {
                        Some(member) => {
                            self.info.uses.insert(*sel, member);
                            (self.kind_of(member) == ObjectKind::TypeName)
                                .then_some(Type::Named(member))
                        }
                        None => None,
                    }
                }
                None => {
                    self.expr(node, scope);
                    None
                }
            },
            NodeKind::ParenExpr { x } => self.type_expr(*x, scope),
            NodeKind::StarExpr { x } => self
                .type_expr(*x, scope)
                .map(|t| Type::Pointer(Box::new(t))),
            NodeKind::ArrayType { len, elt } => {
                if let Some(len) = len {
                    if !matches!(ast.kind(*len), NodeKind::Ellipsis { .. }) {
                        self.expr(*len, scope);
                    }
                }
                let elem = Box::new(self.type_expr(*elt, scope).unwrap_or(Type::Invalid));
                Some(if len.is_some() {
                    Type::Array(elem)
                } else {
                    Type::Slice(elem)
                })
            }
            NodeKind::MapType { key, value } => {
                let key = self.type_expr(*key, scope).unwrap_or(Type::Invalid);
                let value = self.type_expr(*value, scope).unwrap_or(Type::Invalid);
                Some(Type::Map(Box::new(key), Box::new(value)))
            }
            NodeKind::ChanType { value, .. } => {
                let value = self.type_expr(*value, scope).unwrap_or(Type::Invalid);
                Some(Type::Chan(Box::new(value)))
            }
            NodeKind::Ellipsis { elt } => elt.map(|elt| {
                let elem = self.type_expr(elt, scope).unwrap_or(Type::Invalid);
                Type::Slice(Box::new(elem))
            }),
            NodeKind::FuncType { params, results } => {
                let signature = self.signature(node, scope);
                // parameter names of a bare function type are local to it
                let s = self.new_scope(ScopeKind::Function, scope, None);
                self.declare_params(*params, s);
                if let Some(results) = results {
                    self.declare_params(*results, s);
                }
                Some(Type::Func(signature))
            }
            NodeKind::StructType { fields } => {
                let members = self.info.members_of(node).to_vec();
                let mut next = members.iter();
                for field in list_fields(ast, *fields) {
                    let NodeKind::Field { names, ty, .. } = ast.kind(field) else {
                        continue;
                    };
                    let field_ty = self.type_expr(*ty, scope);
                    let count = if names.is_empty() {
                        usize::from(embedded_name(ast, *ty).is_some())
                    } else {
                        names.len()
                    };
                    for &member in next.by_ref().take(count) {
                        self.info.object_mut(member).ty = field_ty.clone();
                    }
                }
                Some(Type::Struct(node))
            }
            NodeKind::InterfaceType { methods } => {
                for field in list_fields(ast, *methods) {
                    let NodeKind::Field { names, ty, .. } = ast.kind(field) else {
                        continue;
                    };
                    let method_ty = self.type_expr(*ty, scope);
                    for &name in names {
                        if let Some(obj) = self.info.def(name) {
                            self.info.object_mut(obj).ty = method_ty.clone();
                        }
                    }
                }
                Some(Type::Interface(node))
            }
            _ => {
                self.expr(node, scope);
                None
            }
        };
        if let Some(ty) = &ty {
            self.info.types.insert(node, ty.clone());
        }
        ty
    }
}

// ============================================================================
// Syntax Helpers
// ============================================================================

fn list_fields(ast: &Ast, list: NodeId) -> Vec<NodeId> {
    match ast.kind(list) {
        NodeKind::FieldList { fields } => fields.clone(),
        _ => Vec::new(),
    }
}

fn clauses(ast: &Ast, body: NodeId) -> Vec<NodeId> {
    match ast.kind(body) {
        NodeKind::BlockStmt { stmts } => stmts.clone(),
        _ => Vec::new(),
    }
}

/// The identifier naming the receiver base type, and whether the receiver
/// is a pointer.
fn receiver_base(ast: &Ast, recv: NodeId) -> Option<(NodeId, bool)> {
    let field = *list_fields(ast, recv).first()?;
    let NodeKind::Field { ty, .. } = ast.kind(field) else {
        return None;
    };
    let ty = ast.unparen(*ty);
    match ast.kind(ty) {
        NodeKind::StarExpr { x } => {
            let x = ast.unparen(*x);
            ast.ident_name(x).map(|_| (x, true))
        }
        NodeKind::Ident { .. } => Some((ty, false)),
        _ => None,
    }
}

/// The identifier an embedded field is named after: `T`, `*T`, `pkg.T`.
pub(crate) fn embedded_name(ast: &Ast, ty: NodeId) -> Option<NodeId> {
    let ty = ast.unparen(ty);
    match ast.kind(ty) {
        NodeKind::Ident { .. } => Some(ty),
        NodeKind::StarExpr { x } => embedded_name(ast, *x),
        NodeKind::SelectorExpr { sel, .. } => Some(*sel),
        _ => None,
    }
}

/// Strip the quotes from an import path literal.
fn unquote(literal: &str) -> String {
    literal
        .trim_matches(|c| c == '"' || c == '`')
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================
