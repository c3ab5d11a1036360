use faxc_util::{DefId, Idx, IndexVec, Symbol};
use std::collections::HashMap;

/// A type in the type system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Error-recovery placeholder; also serves as the `unknown` type from
    /// the language's surface syntax. Compatible with every other type.
    Error,
    /// Unit type (); also the language's `void`. The empty tuple is
    /// equivalent to this.
    Unit,
    /// Never type (!) - diverges
    Never,
    /// The type of the `none` literal, distinct from `void`.
    NoneType,
    /// `Self`, usable only within a trait or impl body.
    SelfTy,
    /// Primitive integer type (64-bit)
    Int,
    /// Primitive unsigned integer type (64-bit)
    UInt,
    /// Primitive float type (64-bit)
    Float,
    /// Boolean type
    Bool,
    /// Character type
    Char,
    /// String type (GC-managed)
    String,
    /// 8-bit integer
    Int8,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit integer
    Int16,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit integer
    Int32,
    /// 32-bit unsigned integer
    UInt32,
    /// 32-bit float
    Float32,
    /// Named type (struct, enum, trait, or opaque) — see `DefKind` in the
    /// def table for which. Compares equal by `DefId` only.
    Adt(DefId),
    /// Type parameter, referenced by its resolved index once generics for
    /// the enclosing item have been registered.
    Param(ParamId),
    /// A bound generic parameter referenced by name, used wherever the
    /// spec's `substitute(T, σ)` operates over a name-keyed map (before an
    /// item's parameters have been assigned indices, or in trait-method
    /// substitution of `Self`/associated types).
    TypeVar(Symbol),
    /// Reference type `&T` / `&mut T`
    Ref(Box<Type>, bool),
    /// Raw pointer `*T` / `*mut T`, unchecked, used at the FFI boundary.
    Pointer(Box<Type>, bool),
    /// Tuple type
    Tuple(Vec<Type>),
    /// Array type [T; N]
    Array(Box<Type>, usize),
    /// Slice type [T]
    Slice(Box<Type>),
    /// Function type fn(A, B) -> C
    Fn(Vec<Type>, Box<Type>),
    /// Future type
    Future(Box<Type>),
    /// Option type Option<T>
    Option(Box<Type>),
    /// Result type Result<T, E>
    Result(Box<Type>, Box<Type>),
    /// Generic instantiation `Name[T1, .., Tn]` — a nominal base type with
    /// concrete type arguments. Compatible with the bare `Adt(DefId)` of
    /// the same name when argument count matches (spec §3.1 rule c).
    GenericInst(DefId, Vec<Type>),
    /// Type variable (for inference)
    Infer(InferId),
}

/// What kind of item a nominal `Adt`/`GenericInst` `DefId` names. Kept
/// separate from `Type` itself so the type enum stays a closed structural
/// sum; looked up from a `DefTable` alongside `TypeContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Struct,
    Enum,
    Trait,
    Opaque,
}

/// Table of nominal-type metadata, keyed by `DefId`. Populated during pass 1
/// registration (§4.4.1) alongside `TypeContext::def_types`.
#[derive(Default)]
pub struct DefTable {
    kinds: HashMap<DefId, DefKind>,
}

impl DefTable {
    pub fn set_kind(&mut self, def_id: DefId, kind: DefKind) {
        self.kinds.insert(def_id, kind);
    }

    pub fn kind_of(&self, def_id: DefId) -> Option<DefKind> {
        self.kinds.get(&def_id).copied()
    }
}

/// Type parameter ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(pub u32);

impl Idx for ParamId {
    fn from_usize(idx: usize) -> Self {
        ParamId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type inference variable ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InferId(pub u32);

impl Idx for InferId {
    fn from_usize(idx: usize) -> Self {
        InferId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type context - stores all type information
#[derive(Default)]
pub struct TypeContext {
    /// Type of each definition
    pub def_types: HashMap<DefId, Type>,
    /// Type of each expression
    pub expr_types: HashMap<ExprId, Type>,
    /// Inference variable substitutions
    pub substitutions: IndexVec<InferId, Option<Type>>,
    /// Constraints to solve
    pub constraints: Vec<Constraint>,
}

/// Expression ID (placeholder, should match HIR)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// Type constraint
#[derive(Debug, Clone)]
pub enum Constraint {
    Eq(Type, Type),
    Trait(Type, DefId),
}

impl TypeContext {
    pub fn type_of_def(&self, def_id: DefId) -> Option<&Type> {
        self.def_types.get(&def_id)
    }

    pub fn set_def_type(&mut self, def_id: DefId, ty: Type) {
        self.def_types.insert(def_id, ty);
    }

    pub fn add_eq_constraint(&mut self, t1: Type, t2: Type) {
        self.constraints.push(Constraint::Eq(t1, t2));
    }

    pub fn new_infer_var(&mut self) -> InferId {
        self.substitutions.push(None)
    }

    pub fn substitute(&self, ty: &Type) -> Type {
        match ty {
            Type::Infer(id) => match self.substitutions.get(*id) {
                Some(Some(t)) => self.substitute(t),
                _ => ty.clone(),
            },
            Type::Tuple(tys) => Type::Tuple(tys.iter().map(|t| self.substitute(t)).collect()),
            Type::Ref(t, m) => Type::Ref(Box::new(self.substitute(t)), *m),
            Type::Pointer(t, m) => Type::Pointer(Box::new(self.substitute(t)), *m),
            Type::Array(t, n) => Type::Array(Box::new(self.substitute(t)), *n),
            Type::Slice(t) => Type::Slice(Box::new(self.substitute(t))),
            Type::Future(t) => Type::Future(Box::new(self.substitute(t))),
            Type::Option(t) => Type::Option(Box::new(self.substitute(t))),
            Type::Result(ok, err) => {
                Type::Result(Box::new(self.substitute(ok)), Box::new(self.substitute(err)))
            },
            Type::GenericInst(def_id, args) => {
                Type::GenericInst(*def_id, args.iter().map(|t| self.substitute(t)).collect())
            },
            Type::Fn(params, ret) => Type::Fn(
                params.iter().map(|p| self.substitute(p)).collect(),
                Box::new(self.substitute(ret)),
            ),
            _ => ty.clone(),
        }
    }
}

/// Capture-free substitution of a name-keyed map through every structural
/// form, per spec §4.2. `substitute(T, {x ↦ x}) = T` for any `T` and any
/// name `x` (the identity-substitution round-trip law, §8).
pub fn substitute_named(ty: &Type, sigma: &HashMap<Symbol, Type>) -> Type {
    match ty {
        Type::TypeVar(name) => sigma.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Type::Ref(t, m) => Type::Ref(Box::new(substitute_named(t, sigma)), *m),
        Type::Pointer(t, m) => Type::Pointer(Box::new(substitute_named(t, sigma)), *m),
        Type::Tuple(tys) => Type::Tuple(tys.iter().map(|t| substitute_named(t, sigma)).collect()),
        Type::Array(t, n) => Type::Array(Box::new(substitute_named(t, sigma)), *n),
        Type::Slice(t) => Type::Slice(Box::new(substitute_named(t, sigma))),
        Type::Future(t) => Type::Future(Box::new(substitute_named(t, sigma))),
        Type::Option(t) => Type::Option(Box::new(substitute_named(t, sigma))),
        Type::Result(ok, err) => Type::Result(
            Box::new(substitute_named(ok, sigma)),
            Box::new(substitute_named(err, sigma)),
        ),
        Type::GenericInst(def_id, args) => {
            Type::GenericInst(*def_id, args.iter().map(|t| substitute_named(t, sigma)).collect())
        },
        Type::Fn(params, ret) => Type::Fn(
            params.iter().map(|p| substitute_named(p, sigma)).collect(),
            Box::new(substitute_named(ret, sigma)),
        ),
        _ => ty.clone(),
    }
}

/// §3.1: a type is Copy iff it is a primitive scalar, a reference, or a raw
/// pointer. Everything else (strings, structs, enums, tuples, arrays,
/// slices, generic instantiations, closures) is Move.
pub fn is_copy(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Int
            | Type::UInt
            | Type::Float
            | Type::Bool
            | Type::Char
            | Type::Int8
            | Type::UInt8
            | Type::Int16
            | Type::UInt16
            | Type::Int32
            | Type::UInt32
            | Type::Float32
            | Type::Ref(..)
            | Type::Pointer(..)
    )
}

/// §4.2: is this one of the numeric primitives (integer or float family)?
pub fn is_numeric(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Int
            | Type::UInt
            | Type::Float
            | Type::Int8
            | Type::UInt8
            | Type::Int16
            | Type::UInt16
            | Type::Int32
            | Type::UInt32
            | Type::Float32
    )
}

fn int_width(ty: &Type) -> Option<u8> {
    match ty {
        Type::Int8 | Type::UInt8 => Some(8),
        Type::Int16 | Type::UInt16 => Some(16),
        Type::Int32 | Type::UInt32 => Some(32),
        Type::Int | Type::UInt => Some(64),
        _ => None,
    }
}

/// §4.2 `common_numeric(T, U)`: float dominates int; within a family the
/// wider type wins. Returns `None` when neither operand is numeric or the
/// families are genuinely incompatible (e.g. a fixed-width int vs. a float
/// with no common widening path defined by the spec).
pub fn common_numeric(a: &Type, b: &Type) -> Option<Type> {
    if !is_numeric(a) || !is_numeric(b) {
        return None;
    }
    let a_float = matches!(a, Type::Float | Type::Float32);
    let b_float = matches!(b, Type::Float | Type::Float32);
    if a_float || b_float {
        return Some(if matches!(a, Type::Float) || matches!(b, Type::Float) {
            Type::Float
        } else {
            Type::Float32
        });
    }
    match (int_width(a), int_width(b)) {
        (Some(wa), Some(wb)) if wa >= wb => Some(a.clone()),
        (Some(_), Some(_)) => Some(b.clone()),
        _ => None,
    }
}

/// §3.1 `compatible(T, U)`: structural, reflexive compatibility used for
/// assignment/argument/return checking. Nominal types (`Adt`) compare by
/// name; `unknown`/`Error` and type variables are compatible with anything.
pub fn compatible(t: &Type, u: &Type) -> bool {
    match (t, u) {
        (Type::Error, _) | (_, Type::Error) => true,
        (Type::TypeVar(_), _) | (_, Type::TypeVar(_)) => true,
        (Type::Param(_), _) | (_, Type::Param(_)) => true,
        (Type::Unit, Type::Tuple(ts)) | (Type::Tuple(ts), Type::Unit) => ts.is_empty(),
        (Type::Ref(a, ma), Type::Ref(b, mb)) => ma == mb && compatible(a, b),
        (Type::Pointer(a, ma), Type::Pointer(b, mb)) => ma == mb && compatible(a, b),
        (Type::Tuple(a), Type::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| compatible(x, y))
        },
        (Type::Array(a, na), Type::Array(b, nb)) => na == nb && compatible(a, b),
        (Type::Slice(a), Type::Slice(b)) => compatible(a, b),
        (Type::Array(a, _), Type::GenericInst(_, args)) | (Type::GenericInst(_, args), Type::Array(a, _))
            if args.len() == 1 =>
        {
            compatible(a, &args[0])
        },
        (Type::Fn(pa, ra), Type::Fn(pb, rb)) => {
            pa.len() == pb.len() && pa.iter().zip(pb).all(|(x, y)| compatible(x, y)) && compatible(ra, rb)
        },
        (Type::Future(a), Type::Future(b)) => compatible(a, b),
        (Type::Option(a), Type::Option(b)) => compatible(a, b),
        (Type::Result(oa, ea), Type::Result(ob, eb)) => compatible(oa, ob) && compatible(ea, eb),
        (Type::GenericInst(da, aa), Type::GenericInst(db, ab)) => {
            da == db && aa.len() == ab.len() && aa.iter().zip(ab).all(|(x, y)| compatible(x, y))
        },
        // rule (c): a generic instantiation and its bare base enum are
        // compatible when the argument count matches what the base expects.
        (Type::GenericInst(d1, _), Type::Adt(d2)) | (Type::Adt(d2), Type::GenericInst(d1, _)) => {
            d1 == d2
        },
        (Type::Adt(a), Type::Adt(b)) => a == b,
        _ if is_numeric(t) && is_numeric(u) => t == u,
        _ => t == u,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Type Enum Tests
    // ========================================================================

    #[test]
    fn test_type_error() {
        let ty = Type::Error;
        assert_eq!(ty, Type::Error);
    }

    #[test]
    fn test_type_unit() {
        let ty = Type::Unit;
        assert_eq!(ty, Type::Unit);
    }

    #[test]
    fn test_type_never() {
        let ty = Type::Never;
        assert_eq!(ty, Type::Never);
    }

    #[test]
    fn test_type_int() {
        let ty = Type::Int;
        assert_eq!(ty, Type::Int);
    }

    #[test]
    fn test_type_float() {
        let ty = Type::Float;
        assert_eq!(ty, Type::Float);
    }

    #[test]
    fn test_type_bool() {
        let ty = Type::Bool;
        assert_eq!(ty, Type::Bool);
    }

    #[test]
    fn test_type_char() {
        let ty = Type::Char;
        assert_eq!(ty, Type::Char);
    }

    #[test]
    fn test_type_string() {
        let ty = Type::String;
        assert_eq!(ty, Type::String);
    }

    #[test]
    fn test_type_adt() {
        let def_id = DefId(42);
        let ty = Type::Adt(def_id);
        assert_eq!(ty, Type::Adt(def_id));
    }

    #[test]
    fn test_type_param() {
        let param_id = ParamId(0);
        let ty = Type::Param(param_id);
        assert_eq!(ty, Type::Param(param_id));
    }

    #[test]
    fn test_type_ref() {
        let ty = Type::Ref(Box::new(Type::Int), false);
        assert_eq!(ty, Type::Ref(Box::new(Type::Int), false));

        let mutable_ref = Type::Ref(Box::new(Type::Int), true);
        assert_eq!(mutable_ref, Type::Ref(Box::new(Type::Int), true));
    }

    #[test]
    fn test_type_tuple() {
        let ty = Type::Tuple(vec![Type::Int, Type::Bool, Type::String]);
        assert_eq!(ty, Type::Tuple(vec![Type::Int, Type::Bool, Type::String]));

        let empty_tuple = Type::Tuple(vec![]);
        assert_eq!(empty_tuple, Type::Tuple(vec![]));
    }

    #[test]
    fn test_type_array() {
        let ty = Type::Array(Box::new(Type::Int), 10);
        assert_eq!(ty, Type::Array(Box::new(Type::Int), 10));
    }

    #[test]
    fn test_type_slice() {
        let ty = Type::Slice(Box::new(Type::Int));
        assert_eq!(ty, Type::Slice(Box::new(Type::Int)));
    }

    #[test]
    fn test_type_fn() {
        let ty = Type::Fn(vec![Type::Int, Type::String], Box::new(Type::Bool));
        assert_eq!(
            ty,
            Type::Fn(vec![Type::Int, Type::String], Box::new(Type::Bool))
        );

        let no_params = Type::Fn(vec![], Box::new(Type::Unit));
        assert_eq!(no_params, Type::Fn(vec![], Box::new(Type::Unit)));
    }

    #[test]
    fn test_type_future() {
        let ty = Type::Future(Box::new(Type::Int));
        assert_eq!(ty, Type::Future(Box::new(Type::Int)));
    }

    #[test]
    fn test_type_infer() {
        let infer_id = InferId(0);
        let ty = Type::Infer(infer_id);
        assert_eq!(ty, Type::Infer(infer_id));
    }

    #[test]
    fn test_type_clone() {
        let ty = Type::Tuple(vec![Type::Int, Type::Bool]);
        let cloned = ty.clone();
        assert_eq!(ty, cloned);
    }

    #[test]
    fn test_type_debug() {
        let ty = Type::Int;
        let debug_str = format!("{:?}", ty);
        assert!(debug_str.contains("Int"));
    }

    // ========================================================================
    // ParamId Tests
    // ========================================================================

    #[test]
    fn test_param_id_from_usize() {
        let param_id = ParamId::from_usize(42);
        assert_eq!(param_id.0, 42);
    }

    #[test]
    fn test_param_id_index() {
        let param_id = ParamId(100);
        assert_eq!(param_id.index(), 100);
    }

    #[test]
    fn test_param_id_equality() {
        let p1 = ParamId(1);
        let p2 = ParamId(1);
        let p3 = ParamId(2);

        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
    }

    #[test]
    fn test_param_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        let p1 = ParamId(1);
        let p2 = ParamId(2);
        let p3 = ParamId(1);

        set.insert(p1);
        set.insert(p2);
        set.insert(p3);

        assert_eq!(set.len(), 2);
    }

    // ========================================================================
    // InferId Tests
    // ========================================================================

    #[test]
    fn test_infer_id_from_usize() {
        let infer_id = InferId::from_usize(42);
        assert_eq!(infer_id.0, 42);
    }

    #[test]
    fn test_infer_id_index() {
        let infer_id = InferId(100);
        assert_eq!(infer_id.index(), 100);
    }

    #[test]
    fn test_infer_id_equality() {
        let i1 = InferId(1);
        let i2 = InferId(1);
        let i3 = InferId(2);

        assert_eq!(i1, i2);
        assert_ne!(i1, i3);
    }

    #[test]
    fn test_infer_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        let i1 = InferId(1);
        let i2 = InferId(2);
        let i3 = InferId(1);

        set.insert(i1);
        set.insert(i2);
        set.insert(i3);

        assert_eq!(set.len(), 2);
    }

    // ========================================================================
    // ExprId Tests
    // ========================================================================

    #[test]
    fn test_expr_id_creation() {
        let expr_id = ExprId(42);
        assert_eq!(expr_id.0, 42);
    }

    #[test]
    fn test_expr_id_equality() {
        let e1 = ExprId(1);
        let e2 = ExprId(1);
        let e3 = ExprId(2);

        assert_eq!(e1, e2);
        assert_ne!(e1, e3);
    }

    #[test]
    fn test_expr_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        let e1 = ExprId(1);
        let e2 = ExprId(2);
        let e3 = ExprId(1);

        set.insert(e1);
        set.insert(e2);
        set.insert(e3);

        assert_eq!(set.len(), 2);
    }

    // ========================================================================
    // Constraint Tests
    // ========================================================================

    #[test]
    fn test_constraint_eq() {
        let c = Constraint::Eq(Type::Int, Type::Int);
        match c {
            Constraint::Eq(t1, t2) => {
                assert_eq!(t1, Type::Int);
                assert_eq!(t2, Type::Int);
            },
            _ => panic!("Expected Eq constraint"),
        }
    }

    #[test]
    fn test_constraint_trait() {
        let def_id = DefId(42);
        let c = Constraint::Trait(Type::Int, def_id);
        match c {
            Constraint::Trait(t, d) => {
                assert_eq!(t, Type::Int);
                assert_eq!(d, def_id);
            },
            _ => panic!("Expected Trait constraint"),
        }
    }

    #[test]
    fn test_constraint_clone() {
        let c = Constraint::Eq(Type::Int, Type::Bool);
        let cloned = c.clone();
        match cloned {
            Constraint::Eq(t1, t2) => {
                assert_eq!(t1, Type::Int);
                assert_eq!(t2, Type::Bool);
            },
            _ => panic!("Expected Eq constraint"),
        }
    }

    #[test]
    fn test_constraint_debug() {
        let c = Constraint::Eq(Type::Int, Type::Bool);
        let debug_str = format!("{:?}", c);
        assert!(debug_str.contains("Eq"));
    }

    // ========================================================================
    // TypeContext Tests
    // ========================================================================

    #[test]
    fn test_type_context_default() {
        let ctx: TypeContext = TypeContext::default();
        assert!(ctx.def_types.is_empty());
        assert!(ctx.expr_types.is_empty());
        assert!(ctx.constraints.is_empty());
    }

    #[test]
    fn test_type_context_set_def_type() {
        let mut ctx = TypeContext::default();
        let def_id = DefId(1);

        ctx.set_def_type(def_id, Type::Int);

        let ty = ctx.type_of_def(def_id);
        assert_eq!(ty, Some(&Type::Int));
    }

    #[test]
    fn test_type_context_type_of_def_not_found() {
        let ctx = TypeContext::default();
        let def_id = DefId(1);

        let ty = ctx.type_of_def(def_id);
        assert_eq!(ty, None);
    }

    #[test]
    fn test_type_context_multiple_def_types() {
        let mut ctx = TypeContext::default();

        ctx.set_def_type(DefId(1), Type::Int);
        ctx.set_def_type(DefId(2), Type::Bool);
        ctx.set_def_type(DefId(3), Type::String);

        assert_eq!(ctx.type_of_def(DefId(1)), Some(&Type::Int));
        assert_eq!(ctx.type_of_def(DefId(2)), Some(&Type::Bool));
        assert_eq!(ctx.type_of_def(DefId(3)), Some(&Type::String));
        assert_eq!(ctx.type_of_def(DefId(4)), None);
    }

    #[test]
    fn test_type_context_add_eq_constraint() {
        let mut ctx = TypeContext::default();

        ctx.add_eq_constraint(Type::Int, Type::Int);

        assert_eq!(ctx.constraints.len(), 1);
        match &ctx.constraints[0] {
            Constraint::Eq(t1, t2) => {
                assert_eq!(t1, &Type::Int);
                assert_eq!(t2, &Type::Int);
            },
            _ => panic!("Expected Eq constraint"),
        }
    }

    #[test]
    fn test_type_context_multiple_constraints() {
        let mut ctx = TypeContext::default();

        ctx.add_eq_constraint(Type::Int, Type::Int);
        ctx.add_eq_constraint(Type::Bool, Type::Bool);

        assert_eq!(ctx.constraints.len(), 2);
    }

    #[test]
    fn test_type_context_new_infer_var() {
        let mut ctx = TypeContext::default();

        let id1 = ctx.new_infer_var();
        let id2 = ctx.new_infer_var();
        let id3 = ctx.new_infer_var();

        assert_eq!(id1, InferId(0));
        assert_eq!(id2, InferId(1));
        assert_eq!(id3, InferId(2));
    }

    #[test]
    fn test_type_context_substitute_infer() {
        let mut ctx = TypeContext::default();
        let infer_id = ctx.new_infer_var();

        // Without substitution, should return the same infer type
        let ty = Type::Infer(infer_id);
        let result = ctx.substitute(&ty);
        assert_eq!(result, Type::Infer(infer_id));
    }

    #[test]
    fn test_type_context_substitute_tuple() {
        let ctx = TypeContext::default();
        let ty = Type::Tuple(vec![Type::Int, Type::Bool]);

        let result = ctx.substitute(&ty);
        assert_eq!(result, Type::Tuple(vec![Type::Int, Type::Bool]));
    }

    #[test]
    fn test_type_context_substitute_ref() {
        let ctx = TypeContext::default();
        let ty = Type::Ref(Box::new(Type::Int), false);

        let result = ctx.substitute(&ty);
        assert_eq!(result, Type::Ref(Box::new(Type::Int), false));
    }

    #[test]
    fn test_type_context_substitute_array() {
        let ctx = TypeContext::default();
        let ty = Type::Array(Box::new(Type::Int), 10);

        let result = ctx.substitute(&ty);
        assert_eq!(result, Type::Array(Box::new(Type::Int), 10));
    }

    #[test]
    fn test_type_context_substitute_fn() {
        let ctx = TypeContext::default();
        let ty = Type::Fn(vec![Type::Int, Type::Bool], Box::new(Type::String));

        let result = ctx.substitute(&ty);
        assert_eq!(
            result,
            Type::Fn(vec![Type::Int, Type::Bool], Box::new(Type::String))
        );
    }

    #[test]
    fn test_type_context_substitute_primitive() {
        let ctx = TypeContext::default();

        assert_eq!(ctx.substitute(&Type::Int), Type::Int);
        assert_eq!(ctx.substitute(&Type::Bool), Type::Bool);
        assert_eq!(ctx.substitute(&Type::String), Type::String);
        assert_eq!(ctx.substitute(&Type::Unit), Type::Unit);
    }

    #[test]
    fn test_type_context_substitute_option_and_result() {
        let ctx = TypeContext::default();
        assert_eq!(
            ctx.substitute(&Type::Option(Box::new(Type::Int))),
            Type::Option(Box::new(Type::Int))
        );
        assert_eq!(
            ctx.substitute(&Type::Result(Box::new(Type::Int), Box::new(Type::String))),
            Type::Result(Box::new(Type::Int), Box::new(Type::String))
        );
    }

    // ========================================================================
    // substitute_named / Copy / numeric / compatible
    // ========================================================================

    #[test]
    fn test_substitute_named_identity_law() {
        let x = Symbol::intern("x");
        let ty = Type::Tuple(vec![Type::TypeVar(x), Type::Int]);
        let mut sigma = HashMap::new();
        sigma.insert(x, Type::TypeVar(x));
        assert_eq!(substitute_named(&ty, &sigma), ty);
    }

    #[test]
    fn test_substitute_named_replaces_bound_var() {
        let t = Symbol::intern("T");
        let mut sigma = HashMap::new();
        sigma.insert(t, Type::Int);
        let ty = Type::Array(Box::new(Type::TypeVar(t)), 4);
        assert_eq!(substitute_named(&ty, &sigma), Type::Array(Box::new(Type::Int), 4));
    }

    #[test]
    fn test_is_copy() {
        assert!(is_copy(&Type::Int));
        assert!(is_copy(&Type::Bool));
        assert!(is_copy(&Type::Ref(Box::new(Type::String), false)));
        assert!(is_copy(&Type::Pointer(Box::new(Type::Int), true)));
        assert!(!is_copy(&Type::String));
        assert!(!is_copy(&Type::Tuple(vec![Type::Int])));
        assert!(!is_copy(&Type::Adt(DefId(0))));
    }

    #[test]
    fn test_common_numeric_float_dominates() {
        assert_eq!(common_numeric(&Type::Int, &Type::Float), Some(Type::Float));
        assert_eq!(common_numeric(&Type::Float32, &Type::Int8), Some(Type::Float32));
    }

    #[test]
    fn test_common_numeric_widest_wins() {
        assert_eq!(common_numeric(&Type::Int8, &Type::Int32), Some(Type::Int32));
        assert_eq!(common_numeric(&Type::Int, &Type::UInt8), Some(Type::Int));
    }

    #[test]
    fn test_common_numeric_non_numeric_is_none() {
        assert_eq!(common_numeric(&Type::Bool, &Type::Int), None);
    }

    #[test]
    fn test_compatible_unknown_with_anything() {
        assert!(compatible(&Type::Error, &Type::Adt(DefId(3))));
        assert!(compatible(&Type::Bool, &Type::Error));
    }

    #[test]
    fn test_compatible_generic_inst_and_base_enum() {
        let option_def = DefId(7);
        let inst = Type::GenericInst(option_def, vec![Type::Int]);
        assert!(compatible(&inst, &Type::Adt(option_def)));
        assert!(compatible(&Type::Adt(option_def), &inst));
    }

    #[test]
    fn test_compatible_nominal_by_name_only() {
        assert!(compatible(&Type::Adt(DefId(1)), &Type::Adt(DefId(1))));
        assert!(!compatible(&Type::Adt(DefId(1)), &Type::Adt(DefId(2))));
    }

    #[test]
    fn test_compatible_unit_and_empty_tuple() {
        assert!(compatible(&Type::Unit, &Type::Tuple(vec![])));
        assert!(!compatible(&Type::Unit, &Type::Tuple(vec![Type::Int])));
    }

    #[test]
    fn test_def_table_kind_roundtrip() {
        let mut table = DefTable::default();
        let d = DefId(5);
        table.set_kind(d, DefKind::Enum);
        assert_eq!(table.kind_of(d), Some(DefKind::Enum));
        assert_eq!(table.kind_of(DefId(6)), None);
    }
}
