use crate::hir::LabelId;
use faxc_util::{DefId, Idx, IndexVec, Symbol};
use std::collections::HashMap;

/// Rib ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RibId(pub u32);

impl Idx for RibId {
    fn from_usize(idx: usize) -> Self {
        RibId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which of the three namespaces a lookup or insertion targets (spec §3.3:
/// "variables, functions, and types occupy distinct namespaces; the same
/// identifier may name all three").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Value,
    Function,
    Type,
}

/// A single scope (rib). Holds one binding map per namespace rather than a
/// single shared map, since a name like `List` may simultaneously be a
/// local variable and a type.
#[derive(Debug)]
pub struct Rib {
    pub values: HashMap<Symbol, DefId>,
    pub functions: HashMap<Symbol, DefId>,
    pub types: HashMap<Symbol, DefId>,
    /// Parent rib
    pub parent: Option<RibId>,
    /// Kind of rib
    pub kind: RibKind,
}

impl Rib {
    fn new(parent: Option<RibId>, kind: RibKind) -> Self {
        Self {
            values: HashMap::new(),
            functions: HashMap::new(),
            types: HashMap::new(),
            parent,
            kind,
        }
    }

    fn namespace_mut(&mut self, ns: Namespace) -> &mut HashMap<Symbol, DefId> {
        match ns {
            Namespace::Value => &mut self.values,
            Namespace::Function => &mut self.functions,
            Namespace::Type => &mut self.types,
        }
    }

    fn namespace(&self, ns: Namespace) -> &HashMap<Symbol, DefId> {
        match ns {
            Namespace::Value => &self.values,
            Namespace::Function => &self.functions,
            Namespace::Type => &self.types,
        }
    }
}

/// Kind of rib
#[derive(Debug, Clone, Copy)]
pub enum RibKind {
    Module,
    Function,
    Block,
    Loop(Option<LabelId>),
}

/// Scope tree for name resolution
pub struct ScopeTree {
    /// All ribs (scopes)
    pub ribs: IndexVec<RibId, Rib>,
    /// Current rib stack
    pub current_rib: RibId,
    root: RibId,
}

impl ScopeTree {
    /// Create new scope tree
    pub fn new() -> Self {
        let mut ribs = IndexVec::new();
        let root = ribs.push(Rib::new(None, RibKind::Module));

        Self {
            ribs,
            current_rib: root,
            root,
        }
    }

    /// Enter new scope
    pub fn enter_scope(&mut self, kind: RibKind) -> RibId {
        let new_rib = self.ribs.push(Rib::new(Some(self.current_rib), kind));
        self.current_rib = new_rib;
        new_rib
    }

    /// Exit current scope
    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.ribs[self.current_rib].parent {
            self.current_rib = parent;
        }
    }

    /// Define a binding in the given namespace in the current scope.
    /// Returns the previously-bound `DefId` in that namespace/scope, if any
    /// (callers use this to enforce the re-definition rules of §3.3: a
    /// collision is an error except when overwriting the `unknown`
    /// placeholder, re-registering a generic parameter name, or an
    /// idempotent identical `extern` re-declaration).
    pub fn define(&mut self, ns: Namespace, name: Symbol, def_id: DefId) -> Option<DefId> {
        self.ribs[self.current_rib].namespace_mut(ns).insert(name, def_id)
    }

    /// Value bindings use ordinary lexical shadowing.
    pub fn add_binding(&mut self, name: Symbol, def_id: DefId) {
        self.define(Namespace::Value, name, def_id);
    }

    /// Resolve a name in the requested namespace. For `Value`, this walks
    /// the lexical parent chain starting at the current scope. For
    /// `Function` and `Type`, lookup always begins at the global (root)
    /// scope, per spec §3.3.
    pub fn resolve_in(&self, ns: Namespace, name: Symbol) -> Option<DefId> {
        match ns {
            Namespace::Value => {
                let mut rib_id = self.current_rib;
                loop {
                    let rib = &self.ribs[rib_id];
                    if let Some(&def_id) = rib.namespace(ns).get(&name) {
                        return Some(def_id);
                    }
                    match rib.parent {
                        Some(parent) => rib_id = parent,
                        None => return None,
                    }
                }
            },
            Namespace::Function | Namespace::Type => {
                self.ribs[self.root].namespace(ns).get(&name).copied()
            },
        }
    }

    /// Resolve name to definition in the value namespace (kept for call
    /// sites that only ever dealt with values before namespaces existed).
    pub fn resolve(&self, name: Symbol) -> Option<DefId> {
        self.resolve_in(Namespace::Value, name)
    }

    pub fn resolve_type(&self, name: Symbol) -> Option<DefId> {
        self.resolve_in(Namespace::Type, name)
    }

    pub fn resolve_function(&self, name: Symbol) -> Option<DefId> {
        self.resolve_in(Namespace::Function, name)
    }

    pub fn define_type(&mut self, name: Symbol, def_id: DefId) -> Option<DefId> {
        // Types are always registered in the global scope (pass 1 runs at
        // module scope, but nested type aliases still resolve globally).
        let root = self.root;
        self.ribs[root].namespace_mut(Namespace::Type).insert(name, def_id)
    }

    pub fn define_function(&mut self, name: Symbol, def_id: DefId) -> Option<DefId> {
        let root = self.root;
        self.ribs[root].namespace_mut(Namespace::Function).insert(name, def_id)
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    #[test]
    fn test_value_namespace_shadowing() {
        let mut tree = ScopeTree::new();
        tree.add_binding(sym("x"), DefId(1));
        tree.enter_scope(RibKind::Block);
        tree.add_binding(sym("x"), DefId(2));
        assert_eq!(tree.resolve(sym("x")), Some(DefId(2)));
        tree.exit_scope();
        assert_eq!(tree.resolve(sym("x")), Some(DefId(1)));
    }

    #[test]
    fn test_same_name_three_namespaces() {
        let mut tree = ScopeTree::new();
        let name = sym("List");
        tree.add_binding(name, DefId(1));
        tree.define_function(name, DefId(2));
        tree.define_type(name, DefId(3));
        assert_eq!(tree.resolve_in(Namespace::Value, name), Some(DefId(1)));
        assert_eq!(tree.resolve_in(Namespace::Function, name), Some(DefId(2)));
        assert_eq!(tree.resolve_in(Namespace::Type, name), Some(DefId(3)));
    }

    #[test]
    fn test_type_and_function_lookup_ignores_lexical_scope() {
        let mut tree = ScopeTree::new();
        let name = sym("Widget");
        tree.define_type(name, DefId(9));
        tree.enter_scope(RibKind::Function);
        tree.enter_scope(RibKind::Block);
        // Even several scopes deep, type lookup still finds the global
        // registration rather than failing a lexical walk.
        assert_eq!(tree.resolve_type(name), Some(DefId(9)));
    }

    #[test]
    fn test_enter_exit_scope_is_observably_unchanged() {
        let mut tree = ScopeTree::new();
        tree.add_binding(sym("x"), DefId(1));
        let before = tree.resolve(sym("x"));
        tree.enter_scope(RibKind::Block);
        tree.exit_scope();
        assert_eq!(tree.resolve(sym("x")), before);
    }

    #[test]
    fn test_resolve_missing_name() {
        let tree = ScopeTree::new();
        assert_eq!(tree.resolve(sym("nope")), None);
    }
}
