//! Symbols, scopes and types produced by the resolver.
//!
//! Every declared name becomes an [`Object`] stored in [`Info`] and referred
//! to by [`ObjectId`]. Identifiers map to objects through the `defs` and
//! `uses` tables, so two identifiers denote the same entity exactly when they
//! map to the same id. Shadowed names get distinct objects.

use std::collections::{HashMap, HashSet};

use gorefactor_syntax::{FileId, NodeId};

use crate::program::PackageId;

// ============================================================================
// Ids
// ============================================================================

/// Index of an [`Object`] in [`Info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a [`Scope`] in [`Info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// Objects
// ============================================================================

/// What kind of entity a name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Const,
    Var,
    TypeName,
    Func,
    /// An imported package, as named inside one file.
    PkgName,
    Label,
    /// A struct field.
    Field,
    /// A built-in function such as `len` or `append`.
    Builtin,
    Nil,
}

/// What a field or method belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// A method declared with a receiver of the named type `base`.
    Receiver { base: ObjectId, pointer: bool },
    /// A field of the struct type literal at this node.
    Struct(NodeId),
    /// A method of the interface type literal at this node.
    Interface(NodeId),
}

/// A declared entity.
#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    /// Scope the object is declared in. Fields and methods have none.
    pub parent: Option<ScopeId>,
    /// The identifier that declares the object, if it has one in source.
    pub decl: Option<NodeId>,
    /// Type of the object's value, when the resolver could work it out.
    pub ty: Option<Type>,
    pub exported: bool,
    pub owner: Option<Owner>,
    /// Embedded struct field.
    pub embedded: bool,
    /// For package names: the in-program package the import refers to.
    pub imported: Option<PackageId>,
    /// For package names: the import spec that introduced the name.
    pub import_spec: Option<NodeId>,
}

impl Object {
    pub(crate) fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        let name = name.into();
        Object {
            exported: is_exported(&name),
            name,
            kind,
            parent: None,
            decl: None,
            ty: None,
            owner: None,
            embedded: false,
            imported: None,
            import_spec: None,
        }
    }

    /// Check if this object is a method with a receiver or an interface method.
    pub fn is_method(&self) -> bool {
        self.kind == ObjectKind::Func
            && matches!(
                self.owner,
                Some(Owner::Receiver { .. }) | Some(Owner::Interface(_))
            )
    }
}

/// Check if a Go name is exported (starts with an upper-case letter).
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

// ============================================================================
// Scopes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Universe,
    Package,
    File,
    Function,
    Block,
    /// Labels of one function body; not chained to any other scope.
    Labels,
}

/// A lexical scope.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Node that opens the scope, when there is one.
    pub node: Option<NodeId>,
    names: HashMap<String, ObjectId>,
}

impl Scope {
    pub(crate) fn new(kind: ScopeKind, parent: Option<ScopeId>, node: Option<NodeId>) -> Self {
        Scope {
            kind,
            parent,
            node,
            names: HashMap::new(),
        }
    }

    /// Object declared directly in this scope.
    pub fn lookup(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = (&str, ObjectId)> {
        self.names.iter().map(|(name, &id)| (name.as_str(), id))
    }

    pub(crate) fn insert(&mut self, name: &str, obj: ObjectId) -> Option<ObjectId> {
        if let Some(&existing) = self.names.get(name) {
            return Some(existing);
        }
        self.names.insert(name.to_string(), obj);
        None
    }
}

// ============================================================================
// Types
// ============================================================================

/// A Go type, as far as the resolver tracks it.
///
/// Predeclared types are `Named` objects in the universe scope; their
/// underlying type is themselves. `Invalid` stands for a component the
/// resolver could not work out.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Invalid,
    Named(ObjectId),
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Array(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Chan(Box<Type>),
    Func(Signature),
    /// The struct type literal at this node.
    Struct(NodeId),
    /// The interface type literal at this node.
    Interface(NodeId),
    /// Results of a call returning several values.
    Tuple(Vec<Type>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
    pub variadic: bool,
}

impl Type {
    /// Strip one level of pointer.
    pub fn strip_pointer(&self) -> &Type {
        match self {
            Type::Pointer(inner) => inner,
            other => other,
        }
    }

    /// `Some(self)` unless the type is [`Type::Invalid`].
    pub fn known(self) -> Option<Type> {
        match self {
            Type::Invalid => None,
            t => Some(t),
        }
    }
}

// ============================================================================
// Info
// ============================================================================

/// Everything the resolver learned about a program.
#[derive(Debug, Default)]
pub struct Info {
    pub(crate) objects: Vec<Object>,
    pub(crate) scopes: Vec<Scope>,
    pub(crate) defs: HashMap<NodeId, ObjectId>,
    pub(crate) uses: HashMap<NodeId, ObjectId>,
    pub(crate) types: HashMap<NodeId, Type>,
    pub(crate) node_scopes: HashMap<NodeId, ScopeId>,
    pub(crate) package_scopes: Vec<ScopeId>,
    pub(crate) file_scopes: HashMap<FileId, ScopeId>,
    pub(crate) methods: HashMap<ObjectId, Vec<ObjectId>>,
    pub(crate) members: HashMap<NodeId, Vec<ObjectId>>,
    pub(crate) embedded_interfaces: HashMap<NodeId, Vec<NodeId>>,
    pub(crate) underlying: HashMap<ObjectId, Type>,
    pub(crate) named_literals: HashMap<NodeId, ObjectId>,
    pub(crate) narrowed: HashMap<ScopeId, (ObjectId, Type)>,
    pub(crate) universe: Option<ScopeId>,
}

impl Info {
    pub(crate) fn add_object(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    pub(crate) fn add_scope(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        if let Some(node) = scope.node {
            self.node_scopes.entry(node).or_insert(id);
        }
        self.scopes.push(scope);
        id
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.index()]
    }

    /// All objects, in declaration order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, object)| (ObjectId(i as u32), object))
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> &mut Object {
        &mut self.objects[id.index()]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    /// Object declared by `ident`, if it is a declaring identifier.
    pub fn def(&self, ident: NodeId) -> Option<ObjectId> {
        self.defs.get(&ident).copied()
    }

    /// Object `ident` refers to, if it is a use.
    pub fn use_of(&self, ident: NodeId) -> Option<ObjectId> {
        self.uses.get(&ident).copied()
    }

    /// Object an identifier declares or refers to.
    pub fn object_of(&self, ident: NodeId) -> Option<ObjectId> {
        self.def(ident).or_else(|| self.use_of(ident))
    }

    /// Every identifier that declares or refers to `obj`.
    pub fn idents_of(&self, obj: ObjectId) -> impl Iterator<Item = NodeId> + '_ {
        self.defs
            .iter()
            .chain(self.uses.iter())
            .filter(move |(_, &o)| o == obj)
            .map(|(&ident, _)| ident)
    }

    /// Type of an expression, when known.
    pub fn type_of(&self, expr: NodeId) -> Option<&Type> {
        self.types.get(&expr)
    }

    pub fn universe(&self) -> Option<ScopeId> {
        self.universe
    }

    /// Check if `obj` is predeclared.
    pub fn is_universe_object(&self, obj: ObjectId) -> bool {
        self.universe.is_some() && self.object(obj).parent == self.universe
    }

    pub fn package_scope(&self, package: PackageId) -> Option<ScopeId> {
        self.package_scopes.get(package.index()).copied()
    }

    pub fn file_scope(&self, file: FileId) -> Option<ScopeId> {
        self.file_scopes.get(&file).copied()
    }

    /// Scope opened by a block, case clause, function or statement node.
    ///
    /// A function body block maps to the function scope, which also holds
    /// the parameters.
    pub fn scope_of_node(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    /// Look `name` up in `scope` and its enclosing scopes.
    pub fn lookup_parent(&self, scope: ScopeId, name: &str) -> Option<ObjectId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(obj) = scope.lookup(name) {
                return Some(obj);
            }
            current = scope.parent;
        }
        None
    }

    /// Methods declared with `named` as the receiver base type.
    pub fn methods_of(&self, named: ObjectId) -> &[ObjectId] {
        self.methods.get(&named).map_or(&[], Vec::as_slice)
    }

    /// Fields of a struct literal or methods of an interface literal.
    pub fn members_of(&self, literal: NodeId) -> &[ObjectId] {
        self.members.get(&literal).map_or(&[], Vec::as_slice)
    }

    /// Named type whose declaration is the given struct or interface literal.
    pub fn named_type_of(&self, literal: NodeId) -> Option<ObjectId> {
        self.named_literals.get(&literal).copied()
    }

    /// Underlying type: named types are replaced by their definitions until a
    /// type literal or a predeclared type is reached.
    pub fn underlying(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        for _ in 0..16 {
            match &current {
                Type::Named(obj) => match self.underlying.get(obj) {
                    Some(next) => current = next.clone(),
                    None => return current,
                },
                _ => return current,
            }
        }
        current
    }

    /// Find the field or method `name` of values of type `ty`.
    ///
    /// Walks embedded fields breadth first, so a shallower field shadows a
    /// deeper one. Pointers are dereferenced once at each level.
    pub fn lookup_field_or_method(&self, ty: &Type, name: &str) -> Option<ObjectId> {
        let mut level = vec![ty.strip_pointer().clone()];
        let mut seen = HashSet::new();
        for _ in 0..8 {
            let mut next = Vec::new();
            for t in level {
                if let Type::Named(named) = t {
                    if !seen.insert(named) {
                        continue;
                    }
                    if let Some(&m) = self
                        .methods_of(named)
                        .iter()
                        .find(|&&m| self.object(m).name == name)
                    {
                        return Some(m);
                    }
                }
                match self.underlying(&t) {
                    Type::Struct(node) => {
                        for &field in self.members_of(node) {
                            let f = self.object(field);
                            if f.name == name {
                                return Some(field);
                            }
                            if f.embedded {
                                if let Some(ft) = &f.ty {
                                    next.push(ft.strip_pointer().clone());
                                }
                            }
                        }
                    }
                    Type::Interface(node) => {
                        if let Some(&m) = self
                            .members_of(node)
                            .iter()
                            .find(|&&m| self.object(m).name == name)
                        {
                            return Some(m);
                        }
                        for embed in self.embedded_interfaces.get(&node).into_iter().flatten() {
                            if let Some(t) = self.types.get(embed) {
                                next.push(t.clone());
                            }
                        }
                    }
                    _ => {}
                }
            }
            if next.is_empty() {
                break;
            }
            level = next;
        }
        None
    }

    /// Type of a use of `obj` inside `scope`, honoring type-switch clauses.
    pub fn object_type(&self, obj: ObjectId, scope: ScopeId) -> Option<Type> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some((narrowed, ty)) = self.narrowed.get(&id) {
                if *narrowed == obj {
                    return Some(ty.clone());
                }
            }
            current = self.scope(id).parent;
        }
        self.object(obj).ty.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_names() {
        assert!(is_exported("Area"));
        assert!(!is_exported("area"));
        assert!(!is_exported("_Area"));
        assert!(!is_exported(""));
    }

    #[test]
    fn lookup_walks_outward() {
        let mut info = Info::default();
        let outer = info.add_scope(Scope::new(ScopeKind::Package, None, None));
        let inner = info.add_scope(Scope::new(ScopeKind::Block, Some(outer), None));
        let x = info.add_object(Object::new("x", ObjectKind::Var));
        let y = info.add_object(Object::new("y", ObjectKind::Var));
        info.scope_mut(outer).insert("x", x);
        info.scope_mut(inner).insert("y", y);

        assert_eq!(info.lookup_parent(inner, "x"), Some(x));
        assert_eq!(info.lookup_parent(inner, "y"), Some(y));
        assert_eq!(info.lookup_parent(outer, "y"), None);
    }

    #[test]
    fn insert_keeps_first_declaration() {
        let mut scope = Scope::new(ScopeKind::Block, None, None);
        let mut info = Info::default();
        let a = info.add_object(Object::new("a", ObjectKind::Var));
        let b = info.add_object(Object::new("a", ObjectKind::Var));
        assert_eq!(scope.insert("a", a), None);
        assert_eq!(scope.insert("a", b), Some(a));
        assert_eq!(scope.lookup("a"), Some(a));
    }

    #[test]
    fn underlying_follows_named_chain() {
        let mut info = Info::default();
        let t = info.add_object(Object::new("T", ObjectKind::TypeName));
        let u = info.add_object(Object::new("U", ObjectKind::TypeName));
        let int = info.add_object(Object::new("int", ObjectKind::TypeName));
        info.underlying.insert(t, Type::Named(u));
        info.underlying.insert(u, Type::Slice(Box::new(Type::Named(int))));

        assert_eq!(
            info.underlying(&Type::Named(t)),
            Type::Slice(Box::new(Type::Named(int)))
        );
        assert_eq!(info.underlying(&Type::Named(int)), Type::Named(int));
    }
}
