//! Registries populated during pass-1 registration (§4.4.1) and consulted
//! during pass-2 body checking: struct field layouts, enum variant tables,
//! inherent/trait impl method tables, and trait method signatures.
//!
//! Kept as plain `FxHashMap`s keyed by `DefId` rather than attached to
//! `Type` itself, per the design note (§9) that cross-references should be
//! indices into a side table, not bundled into the closed type sum.

use crate::hir::{FnSig, GenericParams, VariantData};
use crate::types::Type;
use faxc_util::{DefId, FxHashMap, Symbol};

/// A resolved struct field: name, declared type, and declaration order
/// (order matters for tuple-style positional field access, not used here,
/// but kept for parity with source order in diagnostics).
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub def_id: DefId,
    pub name: Symbol,
    pub ty: Type,
}

#[derive(Debug, Clone, Default)]
pub struct StructInfo {
    pub def_id: DefId,
    pub generics: GenericParams,
    pub fields: Vec<FieldInfo>,
}

impl StructInfo {
    pub fn field(&self, name: Symbol) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct VariantInfo {
    pub def_id: DefId,
    pub name: Symbol,
    pub data: VariantData,
}

impl VariantInfo {
    /// Payload types in declaration order; empty for a unit variant and for
    /// a struct-shaped variant's nominal type (struct variants are looked
    /// up by field name, not position).
    pub fn payload_types(&self) -> Vec<Type> {
        match &self.data {
            VariantData::Unit => Vec::new(),
            VariantData::Tuple(tys) => tys.clone(),
            VariantData::Struct(fields) => fields.iter().map(|f| f.ty.clone()).collect(),
        }
    }

    pub fn arity(&self) -> usize {
        match &self.data {
            VariantData::Unit => 0,
            VariantData::Tuple(tys) => tys.len(),
            VariantData::Struct(fields) => fields.len(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnumInfo {
    pub def_id: DefId,
    pub generics: GenericParams,
    pub variants: Vec<VariantInfo>,
}

impl EnumInfo {
    pub fn variant(&self, name: Symbol) -> Option<&VariantInfo> {
        self.variants.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TraitInfo {
    pub def_id: DefId,
    pub generics: GenericParams,
    pub methods: Vec<FnSig>,
    pub assoc_types: Vec<Symbol>,
}

impl TraitInfo {
    pub fn method(&self, name: Symbol) -> Option<&FnSig> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// One `impl` block, indexed by its target type and (when present) the
/// trait it implements. Methods are keyed by name for O(1) dispatch from
/// `T.m(...)` / `v.m(...)` call sites (§4.4.3).
#[derive(Debug, Clone, Default)]
pub struct ImplInfo {
    pub impl_id: DefId,
    pub self_ty_def: DefId,
    pub trait_def: Option<DefId>,
    pub methods: FxHashMap<Symbol, FnSig>,
    pub assoc_types: FxHashMap<Symbol, Type>,
}

/// All item registries built up during pass 1, consulted throughout pass 2.
#[derive(Default)]
pub struct ItemTables {
    pub structs: FxHashMap<DefId, StructInfo>,
    pub enums: FxHashMap<DefId, EnumInfo>,
    pub traits: FxHashMap<DefId, TraitInfo>,
    /// Every impl block, in declaration order (a type may have several).
    pub impls: Vec<ImplInfo>,
}

impl ItemTables {
    /// All impl blocks whose `self_ty_def` matches `ty_def`, most-recently
    /// registered first (shadowing is not a language rule here, but this
    /// keeps lookups deterministic).
    pub fn impls_for(&self, ty_def: DefId) -> impl Iterator<Item = &ImplInfo> {
        self.impls.iter().filter(move |i| i.self_ty_def == ty_def)
    }

    /// Resolve method `name` on the inherent/trait impls of `ty_def`. The
    /// first impl block (in declaration order) that defines the method
    /// wins; the spec does not define an overlap/coherence rule beyond
    /// "look up `m` among the impl block for `T`" (§4.4.3).
    pub fn resolve_method(&self, ty_def: DefId, name: Symbol) -> Option<&FnSig> {
        self.impls_for(ty_def).find_map(|i| i.methods.get(&name))
    }

    pub fn impl_of_trait(&self, ty_def: DefId, trait_def: DefId) -> Option<&ImplInfo> {
        self.impls
            .iter()
            .find(|i| i.self_ty_def == ty_def && i.trait_def == Some(trait_def))
    }
}
