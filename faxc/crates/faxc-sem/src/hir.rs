use crate::types::*;
use faxc_util::{Idx, Symbol, DefId, Span};

/// HIR Item
#[derive(Debug, Clone)]
pub enum Item {
    Function(FnItem),
    Struct(StructItem),
    Enum(EnumItem),
    Trait(TraitItem),
    Impl(ImplItem),
}

/// HIR Function
#[derive(Debug, Clone)]
pub struct FnItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub generics: GenericParams,
    pub params: Vec<Param>,
    pub ret_type: Type,
    pub body: Body,
    /// Lowered `@requires` clauses, already checked by `ContractChecker`
    /// during pass 2 (§4.4.5). Kept on the node for downstream consumers
    /// (e.g. a future runtime-assertion lowering); ownership/borrow
    /// analysis does not re-walk them.
    pub requires: Vec<Expr>,
    /// Lowered `@ensures` clauses; `result` resolves to a binding of
    /// `ret_type` scoped to these clauses only.
    pub ensures: Vec<Expr>,
    pub async_kw: bool,
}

/// Generic parameters
#[derive(Debug, Clone, Default)]
pub struct GenericParams {
    pub params: Vec<GenericParam>,
    pub where_clause: Vec<WherePredicate>,
}

/// Generic parameter
#[derive(Debug, Clone)]
pub struct GenericParam {
    pub id: ParamId,
    pub name: Symbol,
    pub kind: GenericParamKind,
}

/// Kind of generic parameter
#[derive(Debug, Clone)]
pub enum GenericParamKind {
    Type { bounds: Vec<Type> },
    Lifetime,
    Const { ty: Type },
}

/// Where clause predicate
#[derive(Debug, Clone)]
pub struct WherePredicate {
    pub ty: Type,
    pub bounds: Vec<Type>,
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub pat: Pattern,
    pub ty: Type,
}

/// Function body
#[derive(Debug, Clone)]
pub struct Body {
    pub params: Vec<Pattern>,
    pub value: Expr,
}

/// HIR Struct
#[derive(Debug, Clone)]
pub struct StructItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub generics: GenericParams,
    pub fields: Vec<FieldDef>,
}

/// Field definition
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: Symbol,
    pub ty: Type,
}

/// HIR Enum
#[derive(Debug, Clone)]
pub struct EnumItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub generics: GenericParams,
    pub variants: Vec<VariantDef>,
}

/// Variant definition
#[derive(Debug, Clone)]
pub struct VariantDef {
    pub def_id: DefId,
    pub name: Symbol,
    pub data: VariantData,
}

/// Variant data
#[derive(Debug, Clone)]
pub enum VariantData {
    Unit,
    Tuple(Vec<Type>),
    Struct(Vec<FieldDef>),
}

/// HIR Trait
#[derive(Debug, Clone)]
pub struct TraitItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub generics: GenericParams,
    pub items: Vec<TraitItemKind>,
}

/// Trait item kind
#[derive(Debug, Clone)]
pub enum TraitItemKind {
    Method(FnSig),
    Type(Symbol, Vec<Type>),
    Const(Symbol, Type, Option<Expr>),
}

/// HIR Impl
#[derive(Debug, Clone)]
pub struct ImplItem {
    pub impl_id: DefId,
    pub generics: GenericParams,
    pub trait_ref: Option<TraitRef>,
    pub self_ty: Type,
    pub items: Vec<ImplItemKind>,
}

/// Trait reference
#[derive(Debug, Clone)]
pub struct TraitRef {
    pub def_id: DefId,
    pub args: Vec<Type>,
}

/// Impl item kind
#[derive(Debug, Clone)]
pub enum ImplItemKind {
    Method(FnItem),
    Type(Symbol, Type),
    Const(Symbol, Type, Expr),
}

/// Function signature (without body)
#[derive(Debug, Clone)]
pub struct FnSig {
    pub def_id: DefId,
    pub name: Symbol,
    pub generics: GenericParams,
    pub params: Vec<Param>,
    pub ret_type: Type,
}

/// HIR Expression
#[derive(Debug, Clone)]
pub enum Expr {
    Literal { lit: Literal, ty: Type },
    Var { def_id: DefId, ty: Type, span: Span },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: Type,
    },
    Unary { op: UnOp, expr: Box<Expr>, ty: Type },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        ty: Type,
        /// Set when `func` resolves to the built-in `print`. `print` is
        /// variadic (§4.4.3: bypasses arity/type checks) and reads its
        /// arguments rather than moving them (§4.5).
        is_builtin_print: bool,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: DefId,
        args: Vec<Expr>,
        ty: Type,
    },
    Field {
        object: Box<Expr>,
        field: DefId,
        ty: Type,
    },
    Block {
        stmts: Vec<Stmt>,
        expr: Option<Box<Expr>>,
        ty: Type,
    },
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Option<Box<Expr>>,
        ty: Type,
    },
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<Arm>,
        ty: Type,
    },
    Assign { place: Box<Expr>, value: Box<Expr> },
    Return(Option<Box<Expr>>),
    Break(Option<Box<Expr>>, Option<LabelId>),
    Continue(Option<LabelId>),
    Async {
        body: Box<Expr>,
        ty: Type,
    },
    Await {
        expr: Box<Expr>,
        ty: Type,
    },
    Cast {
        expr: Box<Expr>,
        ty: Type,
    },
    Tuple {
        elements: Vec<Expr>,
        ty: Type,
    },
    Array {
        elements: Vec<Expr>,
        ty: Type,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        ty: Type,
    },
    /// `lo..hi` / `lo..=hi`; consumed opaquely by `for` loops (§4.4.2).
    Range {
        lo: Option<Box<Expr>>,
        hi: Option<Box<Expr>>,
        inclusive: bool,
        ty: Type,
    },
    /// A closure literal. `is_runtime` distinguishes a capturing runtime
    /// closure from a compile-time parameter closure meant for inlining
    /// (design notes §9); `captures` is populated only for the former.
    Closure {
        params: Vec<Pattern>,
        body: Box<Expr>,
        is_runtime: bool,
        captures: Vec<DefId>,
        ty: Type,
    },
    StructLiteral {
        def_id: DefId,
        fields: Vec<(Symbol, Expr)>,
        ty: Type,
    },
    /// A fully-applied enum variant constructor, e.g. `Option.Some(1)`.
    EnumVariant {
        enum_def: DefId,
        variant: DefId,
        args: Vec<Expr>,
        ty: Type,
    },
    /// `try e` — `e : Result[T, E]`, this expression has type `T`.
    Try {
        expr: Box<Expr>,
        ty: Type,
    },
    /// `old(e)`, legal only inside a postcondition.
    Old {
        expr: Box<Expr>,
        ty: Type,
    },
    /// `forall x in c: p` / `exists x in c: p`.
    Quantifier {
        universal: bool,
        binder: Symbol,
        collection: Box<Expr>,
        predicate: Box<Expr>,
    },
}

impl Expr {
    pub fn ty(&self) -> Type {
        match self {
            Expr::Literal { ty, .. } => ty.clone(),
            Expr::Var { ty, .. } => ty.clone(),
            Expr::Binary { ty, .. } => ty.clone(),
            Expr::Unary { ty, .. } => ty.clone(),
            Expr::Call { ty, .. } => ty.clone(),
            Expr::MethodCall { ty, .. } => ty.clone(),
            Expr::Field { ty, .. } => ty.clone(),
            Expr::Block { ty, .. } => ty.clone(),
            Expr::If { ty, .. } => ty.clone(),
            Expr::Match { ty, .. } => ty.clone(),
            Expr::Assign { .. } => Type::Unit,
            Expr::Return(_) => Type::Never,
            Expr::Break(_, _) => Type::Never,
            Expr::Continue(_) => Type::Never,
            Expr::Async { ty, .. } => ty.clone(),
            Expr::Await { ty, .. } => ty.clone(),
            Expr::Cast { ty, .. } => ty.clone(),
            Expr::Tuple { ty, .. } => ty.clone(),
            Expr::Array { ty, .. } => ty.clone(),
            Expr::Index { ty, .. } => ty.clone(),
            Expr::Range { ty, .. } => ty.clone(),
            Expr::Closure { ty, .. } => ty.clone(),
            Expr::StructLiteral { ty, .. } => ty.clone(),
            Expr::EnumVariant { ty, .. } => ty.clone(),
            Expr::Try { ty, .. } => ty.clone(),
            Expr::Old { ty, .. } => ty.clone(),
            Expr::Quantifier { .. } => Type::Bool,
        }
    }
}

/// Literal
#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(Symbol),
    Bool(bool),
    Char(char),
    Unit,
}

/// Binary operator
#[derive(Debug, Clone, Copy)]
pub enum BinOp {
    Add, Sub, Mul, Div, Mod,
    Eq, Ne, Lt, Gt, Le, Ge,
    And, Or,
    BitAnd, BitOr, BitXor, Shl, Shr,
}

/// Unary operator
#[derive(Debug, Clone, Copy)]
pub enum UnOp {
    Neg, Not, Deref, Ref(bool),
}

/// Statement
#[derive(Debug, Clone)]
pub enum Stmt {
    Let {
        pat: Pattern,
        ty: Type,
        init: Option<Expr>,
    },
    Expr(Expr),
    /// `while cond: body`. The ownership analyser clones state before the
    /// body, analyses the body once on the clone, then restores the
    /// pre-loop state (spec §4.5, §9 — conservative by design).
    While {
        cond: Expr,
        body: Box<Expr>,
        label: Option<LabelId>,
    },
    /// `for pat in iter: body`. `pat` is bound fresh inside the body on
    /// each notional iteration; analysed the same way as `While`.
    For {
        pat: Pattern,
        iter: Expr,
        body: Box<Expr>,
        label: Option<LabelId>,
    },
    /// `defer: body`. Ownership is checked against the state at the defer
    /// site itself, not at the (unknown) point the deferred code actually
    /// runs — §4.5, mirroring `ownership.py`'s `analyze_defer`.
    Defer(Box<Stmt>),
    /// `with value as var: body`. Opens a child scope binding `var` to
    /// `value`'s type for the duration of `body` (§4.5).
    With {
        def_id: DefId,
        name: Symbol,
        ty: Type,
        value: Expr,
        body: Box<Expr>,
    },
    /// `unsafe: body`. Suspends move/borrow checking for `body` (§4.5).
    Unsafe(Box<Expr>),
}

/// Pattern
#[derive(Debug, Clone)]
pub enum Pattern {
    Wildcard,
    Binding {
        def_id: DefId,
        name: Symbol,
        ty: Type,
        mutability: bool,
    },
    Path {
        def_id: DefId,
    },
    Struct {
        def_id: DefId,
        fields: Vec<FieldPattern>,
    },
    /// Enum-variant pattern with positional subpatterns, e.g. `Some(x)`.
    /// The expected type must be the enum (or a generic instantiation of
    /// it); subpattern types come from the variant's payload, substituted
    /// through the instantiation's type arguments when generic (§4.4.4).
    Variant {
        enum_def: DefId,
        variant: DefId,
        subpatterns: Vec<Pattern>,
    },
    Tuple {
        pats: Vec<Pattern>,
    },
    Ref {
        pat: Box<Pattern>,
        mutability: bool,
    },
    Or(Vec<Pattern>),
    /// A literal pattern, e.g. `0` or `"foo"` in a match arm.
    Literal(Literal),
    /// An inclusive or exclusive range pattern, e.g. `1..=5`.
    Range(Box<Pattern>, Box<Pattern>),
}

/// Field in pattern
#[derive(Debug, Clone)]
pub struct FieldPattern {
    pub field: DefId,
    pub pat: Pattern,
}

/// Match arm
#[derive(Debug, Clone)]
pub struct Arm {
    pub pat: Pattern,
    pub guard: Option<Expr>,
    pub body: Expr,
}

/// Label ID for loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelId(pub u32);
