use crate::codes;
use crate::contracts::ContractChecker;
use crate::hir::*;
use crate::items::{EnumInfo, FieldInfo, ImplInfo, ItemTables, StructInfo, TraitInfo, VariantInfo};
use crate::scope::{Namespace, RibKind, ScopeTree};
use crate::types::*;
use faxc_par as ast;
use faxc_util::{DefId, DefIdGenerator, FxHashMap, FxHashSet, Handler, Span, Symbol};

/// Maps a bare path's final segment to a primitive type, if it names one.
/// Anything else is a nominal (struct/enum/trait) name, resolved against the
/// type namespace by the caller.
fn primitive_type_from_name(name: &str) -> Option<Type> {
    Some(match name {
        "void" => Type::Unit,
        "never" => Type::Never,
        "i64" => Type::Int,
        "u64" => Type::UInt,
        "f64" => Type::Float,
        "bool" => Type::Bool,
        "char" => Type::Char,
        "String" | "str" => Type::String,
        "i8" => Type::Int8,
        "u8" => Type::UInt8,
        "i16" => Type::Int16,
        "u16" => Type::UInt16,
        "i32" => Type::Int32,
        "u32" => Type::UInt32,
        "f32" => Type::Float32,
        "Self" => Type::SelfTy,
        _ => return None,
    })
}

/// Strips any number of leading `&`/`&mut`/`*` layers off a type, returning
/// the innermost pointee. Used to find the nominal type behind a method
/// receiver (`self`, `&self`, `&mut self` all dispatch the same way).
fn peel_indirection(ty: &Type) -> &Type {
    match ty {
        Type::Ref(inner, _) | Type::Pointer(inner, _) => peel_indirection(inner),
        _ => ty,
    }
}

/// The nominal `DefId` a type refers to, if it is (or wraps) an `Adt`/
/// `GenericInst`.
fn nominal_def(ty: &Type) -> Option<DefId> {
    match peel_indirection(ty) {
        Type::Adt(d) => Some(*d),
        Type::GenericInst(d, _) => Some(*d),
        _ => None,
    }
}

/// Structurally walks a variant's declared payload type alongside the
/// concrete argument type supplied at a construction site, recording a
/// `name -> concrete type` entry for every generic parameter it encounters.
/// Not a full unifier: only the shapes that appear in practice in variant
/// payloads (direct type-variable position, one level of reference/
/// `Option`/generic-instantiation nesting) are handled; anything else is
/// left for the caller's `expected`-type fallback.
fn collect_type_var_subst(pattern: &Type, concrete: &Type, sigma: &mut FxHashMap<Symbol, Type>) {
    match pattern {
        Type::TypeVar(name) => {
            sigma.entry(*name).or_insert_with(|| concrete.clone());
        },
        Type::Ref(p, _) => {
            if let Type::Ref(c, _) = concrete {
                collect_type_var_subst(p, c, sigma);
            }
        },
        Type::Option(p) => {
            if let Type::Option(c) = concrete {
                collect_type_var_subst(p, c, sigma);
            }
        },
        Type::GenericInst(pd, pargs) => {
            if let Type::GenericInst(cd, cargs) = concrete {
                if pd == cd {
                    for (pp, cc) in pargs.iter().zip(cargs) {
                        collect_type_var_subst(pp, cc, sigma);
                    }
                }
            }
        },
        _ => {},
    }
}

/// Main semantic analyzer
pub struct SemanticAnalyzer<'a> {
    /// Type context
    pub type_context: &'a mut TypeContext,

    /// Scope tree
    pub scope_tree: ScopeTree,

    /// Definition ID generator
    pub def_id_gen: &'a DefIdGenerator,

    /// Current function return type (for return checking)
    pub current_ret_type: Option<Type>,

    /// Loop stack (for break/continue checking)
    pub loop_stack: Vec<(Option<LabelId>, Type)>,

    /// Error handler
    pub handler: &'a mut Handler,

    /// Error count
    error_count: usize,

    /// Struct/enum/trait/impl metadata gathered during pass 1 registration
    /// (§4.4.1), consulted while checking bodies in pass 2.
    pub item_tables: ItemTables,

    /// What kind of nominal item each type-namespace `DefId` names.
    pub def_table: DefTable,

    /// Names bound as generic type parameters of the item currently being
    /// analyzed (function, struct, enum, trait, or impl). Consulted by
    /// `ast_type_to_hir` before falling back to the type namespace, so `T`
    /// in `fn identity[T](x: T) -> T` resolves to `Type::TypeVar` rather
    /// than an unresolved-name error.
    generic_names: FxHashSet<Symbol>,

    /// The concrete type `Self` refers to while analyzing the body of a
    /// method inside an `impl` block.
    self_ty: Option<Type>,

    /// `DefId`s of the built-in `Option[T]`/`Result[T,E]` enums (§6),
    /// registered by `register_builtins` before any user item is seen.
    /// Kept so variant-constructor call sites can recognize them and
    /// produce the dedicated `Type::Option`/`Type::Result` representation
    /// instead of a bare `Type::Adt`.
    option_def: Option<DefId>,
    result_def: Option<DefId>,

    /// `DefId` of the builtin `List` type tag used to represent list-literal
    /// expressions (§3.1: `List[T]`, structurally compatible with `[T; N]`).
    /// Unlike `Option`/`Result` it carries no variants — nothing ever
    /// resolves a variant against it, it is only ever the head of a
    /// `Type::GenericInst`. Set by `register_builtins`; `DefId::DUMMY` until
    /// then.
    list_def: DefId,

    /// `DefId` of the built-in variadic `print(varargs) -> void` (§6). Used
    /// by `analyze_call` to bypass arity/type checks and to tag the call so
    /// later passes (ownership analysis, §4.5) know not to treat its
    /// arguments as moves.
    print_def: Option<DefId>,

    /// Nesting depth of `unsafe` blocks currently being analyzed. Gates the
    /// relaxed cast rules of §4.5 (pointer casts not otherwise permitted).
    unsafe_depth: u32,
}

impl<'a> SemanticAnalyzer<'a> {
    /// Create new analyzer
    pub fn new(
        type_context: &'a mut TypeContext,
        def_id_gen: &'a DefIdGenerator,
        handler: &'a mut Handler,
    ) -> Self {
        Self {
            type_context,
            scope_tree: ScopeTree::new(),
            def_id_gen,
            current_ret_type: None,
            loop_stack: Vec::new(),
            handler,
            error_count: 0,
            item_tables: ItemTables::default(),
            def_table: DefTable::default(),
            generic_names: FxHashSet::default(),
            self_ty: None,
            option_def: None,
            result_def: None,
            list_def: DefId::DUMMY,
            print_def: None,
            unsafe_depth: 0,
        }
    }

    /// Registers `Option[T]` (variants `Some(T)`, `None`) and
    /// `Result[T, E]` (variants `Ok(T)`, `Err(E)`) as ordinary enums in the
    /// type namespace and item tables, exactly as a user-declared generic
    /// enum would be (§6: "Types Result, Box, String, and Option[T]…
    /// constructed from a hard-coded fallback"). This lets
    /// `resolve_enum_variant` find `Option.Some`/`Option.None`/`Result.Ok`/
    /// `Result.Err` through the normal name-resolution path; the dedicated
    /// `Type::Option`/`Type::Result` representation is still produced at
    /// each construction site via `variant_construct_ty`.
    fn register_builtins(&mut self) {
        let mk_param = |name: &str| GenericParam {
            id: ParamId(0),
            name: Symbol::intern(name),
            kind: GenericParamKind::Type { bounds: Vec::new() },
        };

        let option_def = self.def_id_gen.next();
        self.scope_tree.define_type(Symbol::intern("Option"), option_def);
        self.def_table.set_kind(option_def, DefKind::Enum);
        let t = Symbol::intern("T");
        let some_def = self.def_id_gen.next();
        let none_def = self.def_id_gen.next();
        self.item_tables.enums.insert(option_def, EnumInfo {
            def_id: option_def,
            generics: GenericParams { params: vec![mk_param("T")], where_clause: Vec::new() },
            variants: vec![
                VariantInfo { def_id: some_def, name: Symbol::intern("Some"), data: VariantData::Tuple(vec![Type::TypeVar(t)]) },
                VariantInfo { def_id: none_def, name: Symbol::intern("None"), data: VariantData::Unit },
            ],
        });
        self.option_def = Some(option_def);

        let result_def = self.def_id_gen.next();
        self.scope_tree.define_type(Symbol::intern("Result"), result_def);
        self.def_table.set_kind(result_def, DefKind::Enum);
        let e = Symbol::intern("E");
        let ok_def = self.def_id_gen.next();
        let err_def = self.def_id_gen.next();
        self.item_tables.enums.insert(result_def, EnumInfo {
            def_id: result_def,
            generics: GenericParams { params: vec![mk_param("T"), mk_param("E")], where_clause: Vec::new() },
            variants: vec![
                VariantInfo { def_id: ok_def, name: Symbol::intern("Ok"), data: VariantData::Tuple(vec![Type::TypeVar(t)]) },
                VariantInfo { def_id: err_def, name: Symbol::intern("Err"), data: VariantData::Tuple(vec![Type::TypeVar(e)]) },
            ],
        });
        self.result_def = Some(result_def);

        // `List` carries no variants; it only ever appears as the head of
        // a `Type::GenericInst` produced by a list-literal expression.
        let list_def = self.def_id_gen.next();
        self.scope_tree.define_type(Symbol::intern("List"), list_def);
        self.def_table.set_kind(list_def, DefKind::Struct);
        self.list_def = list_def;

        // §6: "Functions print(varargs) -> void, assert(bool) -> void,
        // fail(String) -> void" registered before any user item is seen.
        let print_def = self.def_id_gen.next();
        self.scope_tree.define_function(Symbol::intern("print"), print_def);
        self.type_context.set_def_type(print_def, Type::Fn(Vec::new(), Box::new(Type::Unit)));
        self.print_def = Some(print_def);

        let assert_def = self.def_id_gen.next();
        self.scope_tree.define_function(Symbol::intern("assert"), assert_def);
        self.type_context
            .set_def_type(assert_def, Type::Fn(vec![Type::Bool], Box::new(Type::Unit)));

        let fail_def = self.def_id_gen.next();
        self.scope_tree.define_function(Symbol::intern("fail"), fail_def);
        self.type_context
            .set_def_type(fail_def, Type::Fn(vec![Type::String], Box::new(Type::Unit)));
    }

    /// Computes the result type of constructing `variant` of `enum_def`
    /// with already-analyzed `args`, closing over the enum's generic
    /// parameters when the argument types (or, failing that, an `expected`
    /// type from the call site) determine them (§4.4.3 points 5-6). Falls
    /// back to the unparameterized `Type::Adt`/builtin placeholder when the
    /// substitution doesn't cover every parameter.
    fn variant_construct_ty(
        &self,
        enum_def: DefId,
        variant: &VariantInfo,
        args: &[Expr],
        expected: Option<&Type>,
    ) -> Type {
        if Some(enum_def) == self.option_def {
            let inner = args
                .first()
                .map(|a| a.ty())
                .or_else(|| match expected {
                    Some(Type::Option(i)) => Some((**i).clone()),
                    _ => None,
                })
                .unwrap_or(Type::Error);
            return Type::Option(Box::new(inner));
        }
        if Some(enum_def) == self.result_def {
            let (default_ok, default_err) = match expected {
                Some(Type::Result(o, e)) => ((**o).clone(), (**e).clone()),
                _ => (Type::Error, Type::Error),
            };
            return match variant.name.as_str() {
                "Ok" => Type::Result(
                    Box::new(args.first().map(|a| a.ty()).unwrap_or(default_ok)),
                    Box::new(default_err),
                ),
                "Err" => Type::Result(
                    Box::new(default_ok),
                    Box::new(args.first().map(|a| a.ty()).unwrap_or(default_err)),
                ),
                _ => Type::Result(Box::new(default_ok), Box::new(default_err)),
            };
        }

        if let Some(info) = self.item_tables.enums.get(&enum_def) {
            if !info.generics.params.is_empty() {
                let payload = variant.payload_types();
                let mut sigma: FxHashMap<Symbol, Type> = FxHashMap::default();
                for (param_ty, arg) in payload.iter().zip(args.iter()) {
                    collect_type_var_subst(param_ty, &arg.ty(), &mut sigma);
                }
                if let Some(Type::GenericInst(d, concrete_args)) = expected {
                    if *d == enum_def {
                        for (gp, ty) in info.generics.params.iter().zip(concrete_args) {
                            sigma.entry(gp.name).or_insert_with(|| ty.clone());
                        }
                    }
                }
                if info.generics.params.iter().all(|g| sigma.contains_key(&g.name)) {
                    let concrete: Vec<Type> =
                        info.generics.params.iter().map(|g| sigma[&g.name].clone()).collect();
                    return Type::GenericInst(enum_def, concrete);
                }
            }
        }

        Type::Adt(enum_def)
    }

    /// Re-derives an `Expr::EnumVariant`'s type against `expected`, used at
    /// positions where the expected type can close over generic parameters
    /// a bare constructor call left unresolved (§4.4.3 point 6, §9 "generic
    /// enum constructor resolution": `Option.None` in a function returning
    /// `Option[int]` infers to `Option[int]`). Any other expression shape
    /// passes through unchanged.
    fn promote_to_expected(&self, expr: Expr, expected: &Type) -> Expr {
        if let Expr::EnumVariant { enum_def, variant, args, ty } = &expr {
            let still_open = matches!(
                ty,
                Type::Option(inner) if matches!(**inner, Type::Error)
            ) || matches!(
                ty,
                Type::Result(ok, err) if matches!(**ok, Type::Error) || matches!(**err, Type::Error)
            ) || matches!(ty, Type::Adt(_));

            if still_open {
                if let Some(info) = self.item_tables.enums.get(enum_def) {
                    if let Some(variant_info) = info.variants.iter().find(|v| v.def_id == *variant) {
                        let promoted = self.variant_construct_ty(*enum_def, variant_info, args, Some(expected));
                        return Expr::EnumVariant {
                            enum_def: *enum_def,
                            variant: *variant,
                            args: args.clone(),
                            ty: promoted,
                        };
                    }
                }
            }
        }
        expr
    }

    /// Report a type error
    pub fn type_error(&mut self, message: impl Into<String>, span: Span) {
        self.error_count += 1;
        use faxc_util::diagnostic::DiagnosticBuilder;
        DiagnosticBuilder::error(message)
            .code(codes::P_TYPE_MISMATCH)
            .span(span)
            .emit(&self.handler);
    }

    /// Report a diagnostic under an explicit code (name resolution, trait
    /// completeness, etc. — anything that isn't a bare type mismatch).
    fn diagnose(&mut self, code: faxc_util::diagnostic::DiagnosticCode, message: impl Into<String>, span: Span) {
        self.error_count += 1;
        use faxc_util::diagnostic::DiagnosticBuilder;
        DiagnosticBuilder::error(message).code(code).span(span).emit(&self.handler);
    }

    /// Check if there were any errors
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Get error count
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Converts a surface-syntax type to its HIR representation, resolving
    /// named types (`Path`/`Generic`) against the type namespace.
    fn ast_type_to_hir(&mut self, ty: &ast::Type) -> Type {
        match ty {
            ast::Type::Unit => Type::Unit,
            ast::Type::Never => Type::Never,
            ast::Type::Path(path) => {
                let name = path.segments.last().map(|s| s.ident).unwrap_or_else(|| Symbol::intern(""));
                if self.generic_names.contains(&name) {
                    return Type::TypeVar(name);
                }
                if let Some(prim) = primitive_type_from_name(name.as_str()) {
                    return prim;
                }
                match self.scope_tree.resolve_type(name) {
                    Some(def_id) => Type::Adt(def_id),
                    None => {
                        self.diagnose(
                            codes::P_UNKNOWN_TYPE,
                            format!("unresolved type name `{}`", name.as_str()),
                            Span::DUMMY,
                        );
                        Type::Error
                    },
                }
            },
            ast::Type::Generic(base, args) => {
                let hir_args: Vec<Type> = args.iter().map(|a| self.ast_type_to_hir(a)).collect();
                match base.as_ref() {
                    ast::Type::Path(path) => {
                        let name = path.segments.last().map(|s| s.ident).unwrap_or_else(|| Symbol::intern(""));
                        match name.as_str() {
                            "Option" if hir_args.len() == 1 => Type::Option(Box::new(hir_args[0].clone())),
                            "Result" if hir_args.len() == 2 => {
                                Type::Result(Box::new(hir_args[0].clone()), Box::new(hir_args[1].clone()))
                            },
                            "Future" if hir_args.len() == 1 => Type::Future(Box::new(hir_args[0].clone())),
                            _ => match self.scope_tree.resolve_type(name) {
                                Some(def_id) => Type::GenericInst(def_id, hir_args),
                                None => {
                                    self.diagnose(
                                        codes::P_UNKNOWN_TYPE,
                                        format!("unresolved type name `{}`", name.as_str()),
                                        Span::DUMMY,
                                    );
                                    Type::Error
                                },
                            },
                        }
                    },
                    other => self.ast_type_to_hir(other),
                }
            },
            ast::Type::Reference(ty, mutability) => {
                Type::Ref(Box::new(self.ast_type_to_hir(ty)), matches!(mutability, ast::Mutability::Mutable))
            },
            ast::Type::Pointer(ty, mutability) => {
                Type::Pointer(Box::new(self.ast_type_to_hir(ty)), matches!(mutability, ast::Mutability::Mutable))
            },
            ast::Type::Slice(ty) => Type::Slice(Box::new(self.ast_type_to_hir(ty))),
            ast::Type::Array(ty, size) => Type::Array(Box::new(self.ast_type_to_hir(ty)), *size),
            ast::Type::Tuple(tys) => Type::Tuple(tys.iter().map(|t| self.ast_type_to_hir(t)).collect()),
            ast::Type::Fn(params, ret) => Type::Fn(
                params.iter().map(|t| self.ast_type_to_hir(t)).collect(),
                Box::new(self.ast_type_to_hir(ret)),
            ),
            // No surface syntax builds a runtime value of trait-object or
            // existential type today; treated as opaque until it does.
            ast::Type::TraitObject(_) => Type::Infer(self.type_context.new_infer_var()),
            ast::Type::ImplTrait(_) => Type::Infer(self.type_context.new_infer_var()),
            ast::Type::Inferred => Type::Infer(self.type_context.new_infer_var()),
        }
    }

    /// Convert a list of surface generic parameters into HIR form, binding
    /// each name into `self.generic_names` so later `ast_type_to_hir` calls
    /// in the same item (bounds, params, return type, body) resolve it as a
    /// type variable rather than an unresolved nominal name.
    fn convert_generics(&mut self, params: &[ast::GenericParam]) -> GenericParams {
        let mut out = Vec::with_capacity(params.len());
        for (i, p) in params.iter().enumerate() {
            self.generic_names.insert(p.name);
            let bounds = p.bounds.iter().map(|b| self.ast_type_to_hir(b)).collect();
            out.push(GenericParam {
                id: ParamId(i as u32),
                name: p.name,
                kind: GenericParamKind::Type { bounds },
            });
        }
        GenericParams { params: out, where_clause: Vec::new() }
    }

    /// Check if two types are unifiable, emit error if not. Uses the
    /// spec's structural/nominal `compatible` relation (§3.1) rather than
    /// strict equality, so e.g. `()` and `(,)` or a generic instantiation
    /// and its bare base type compare equal.
    pub fn unify_types(&mut self, expected: &Type, found: &Type, span: Span) -> bool {
        if compatible(expected, found) {
            return true;
        }
        self.type_error(
            format!("type mismatch: expected {:?}, found {:?}", expected, found),
            span,
        );
        false
    }

    /// Analyze AST items and produce HIR
    pub fn analyze_items(&mut self, items: Vec<ast::Item>) -> Vec<Item> {
        log::debug!("analyzing {} items", items.len());
        // §6: built-in types registered before any user code is seen.
        self.register_builtins();

        // Pass 1a: register every item's name in the right namespace so
        // forward references (mutually recursive functions, self-
        // referential structs/enums, a method referring to its own type)
        // all resolve regardless of declaration order.
        self.collect_items(&items);

        // Pass 1b: resolve field/variant/signature metadata into the item
        // registries now that every name exists.
        self.build_item_tables(&items);

        // §4.4.6: every trait method has an impl, every associated type is
        // bound, and no impl binds an associated type the trait doesn't
        // declare.
        self.check_trait_impl_completeness();

        // Pass 2: resolve and type check bodies.
        let hir_items: Vec<_> = items
            .into_iter()
            .filter_map(|item| self.analyze_item(item))
            .collect();

        log::debug!("generated {} HIR items", hir_items.len());

        // Pass 3/4: ownership and borrow checking run over every function
        // body, independently of each other (a moved-value error doesn't
        // suppress a borrow conflict in the same body, and vice versa).
        self.check_ownership_and_borrows(&hir_items);

        hir_items
    }

    /// Runs move/ownership analysis and borrow checking over every function
    /// body in `items` (free functions and methods inside `impl` blocks),
    /// folding their diagnostics and error counts into this analyzer.
    fn check_ownership_and_borrows(&mut self, items: &[Item]) {
        let mut fn_items: Vec<&FnItem> = Vec::new();
        for item in items {
            match item {
                Item::Function(f) => fn_items.push(f),
                Item::Impl(impl_item) => {
                    for member in &impl_item.items {
                        if let ImplItemKind::Method(f) = member {
                            fn_items.push(f);
                        }
                    }
                },
                Item::Struct(_) | Item::Enum(_) | Item::Trait(_) => {},
            }
        }

        for fn_item in fn_items {
            let mut ownership = crate::ownership::OwnershipAnalyzer::new(&mut *self.handler);
            ownership.analyze_function(fn_item);
            self.error_count += ownership.error_count();

            let mut borrow = crate::borrow::BorrowChecker::new(&mut *self.handler);
            borrow.check_function(fn_item);
            self.error_count += borrow.error_count();
        }
    }

    /// Collect item names (pass 1a). Functions and types occupy distinct
    /// namespaces (§3.3): a function named `List` does not collide with a
    /// struct named `List`.
    fn collect_items(&mut self, items: &[ast::Item]) {
        for item in items {
            match item {
                ast::Item::Fn(f) => {
                    let def_id = self.def_id_gen.next();
                    if self.scope_tree.define_function(f.name, def_id).is_some() {
                        self.diagnose(
                            codes::P_DUPLICATE_DEF,
                            format!("function `{}` is already defined", f.name.as_str()),
                            Span::DUMMY,
                        );
                    }
                    let infer_id = self.type_context.new_infer_var();
                    self.type_context.set_def_type(def_id, Type::Infer(infer_id));
                },
                ast::Item::Struct(s) => {
                    let def_id = self.def_id_gen.next();
                    if self.scope_tree.define_type(s.name, def_id).is_some() {
                        self.diagnose(
                            codes::P_DUPLICATE_DEF,
                            format!("type `{}` is already defined", s.name.as_str()),
                            Span::DUMMY,
                        );
                    }
                    self.def_table.set_kind(def_id, DefKind::Struct);
                    self.type_context.set_def_type(def_id, Type::Adt(def_id));
                },
                ast::Item::Enum(e) => {
                    let def_id = self.def_id_gen.next();
                    if self.scope_tree.define_type(e.name, def_id).is_some() {
                        self.diagnose(
                            codes::P_DUPLICATE_DEF,
                            format!("type `{}` is already defined", e.name.as_str()),
                            Span::DUMMY,
                        );
                    }
                    self.def_table.set_kind(def_id, DefKind::Enum);
                    self.type_context.set_def_type(def_id, Type::Adt(def_id));
                },
                ast::Item::Trait(t) => {
                    let def_id = self.def_id_gen.next();
                    if self.scope_tree.define_type(t.name, def_id).is_some() {
                        self.diagnose(
                            codes::P_DUPLICATE_DEF,
                            format!("type `{}` is already defined", t.name.as_str()),
                            Span::DUMMY,
                        );
                    }
                    self.def_table.set_kind(def_id, DefKind::Trait);
                },
                // impl blocks aren't named and register nothing themselves;
                // their contents are gathered in `build_item_tables`.
                ast::Item::Impl(_) => {},
                ast::Item::Use(u) => {
                    let def_id = self.def_id_gen.next();
                    if let Some(seg) = u.path.segments.first() {
                        self.scope_tree.add_binding(seg.ident, def_id);
                    }
                },
            }
        }
    }

    /// Pass 1b: resolve struct fields, enum variants, trait method
    /// signatures, and impl method tables now that every type/function name
    /// exists in scope (so self-referential and forward-referenced types
    /// resolve correctly).
    fn build_item_tables(&mut self, items: &[ast::Item]) {
        for item in items {
            match item {
                ast::Item::Struct(s) => {
                    let def_id = match self.scope_tree.resolve_type(s.name) {
                        Some(id) => id,
                        None => continue,
                    };
                    let generics = self.convert_generics(&s.generics);
                    let fields = s
                        .fields
                        .iter()
                        .map(|f| FieldInfo {
                            def_id: self.def_id_gen.next(),
                            name: f.name,
                            ty: self.ast_type_to_hir(&f.ty),
                        })
                        .collect();
                    self.generic_names.clear();
                    self.item_tables.structs.insert(def_id, StructInfo { def_id, generics, fields });
                },
                ast::Item::Enum(e) => {
                    let def_id = match self.scope_tree.resolve_type(e.name) {
                        Some(id) => id,
                        None => continue,
                    };
                    let generics = self.convert_generics(&e.generics);
                    let variants = e
                        .variants
                        .iter()
                        .map(|v| VariantInfo {
                            def_id: self.def_id_gen.next(),
                            name: v.name,
                            data: self.ast_variant_data_to_hir(&v.data),
                        })
                        .collect();
                    self.generic_names.clear();
                    self.item_tables.enums.insert(def_id, EnumInfo { def_id, generics, variants });
                },
                ast::Item::Trait(t) => {
                    let def_id = match self.scope_tree.resolve_type(t.name) {
                        Some(id) => id,
                        None => continue,
                    };
                    let generics = self.convert_generics(&t.generics);
                    let mut methods = Vec::new();
                    let mut assoc_types = Vec::new();
                    for member in &t.items {
                        match member {
                            ast::TraitMember::Method(sig) => methods.push(self.ast_fn_sig_to_hir(sig)),
                            ast::TraitMember::Type(name, _bounds) => assoc_types.push(*name),
                            ast::TraitMember::Const(_, _, _) => {},
                        }
                    }
                    self.generic_names.clear();
                    self.item_tables.traits.insert(def_id, TraitInfo { def_id, generics, methods, assoc_types });
                },
                ast::Item::Impl(imp) => {
                    let self_ty = self.ast_type_to_hir(&imp.self_ty);
                    let Some(self_ty_def) = nominal_def(&self_ty) else {
                        self.diagnose(
                            codes::P_UNKNOWN_TYPE,
                            "impl target must be a struct or enum type",
                            Span::DUMMY,
                        );
                        continue;
                    };
                    let trait_def = imp
                        .trait_ref
                        .as_ref()
                        .and_then(|t| nominal_def(&self.ast_type_to_hir(t)));
                    let impl_id = self.def_id_gen.next();
                    let mut methods = faxc_util::FxHashMap::default();
                    let mut assoc_types = faxc_util::FxHashMap::default();
                    self.self_ty = Some(self_ty.clone());
                    for member in &imp.items {
                        match member {
                            ast::ImplMember::Method(f) => {
                                methods.insert(f.name, self.ast_fn_sig_from_item(f));
                            },
                            ast::ImplMember::Type(name, ty) => {
                                let hir_ty = self.ast_type_to_hir(ty);
                                assoc_types.insert(*name, hir_ty);
                            },
                            ast::ImplMember::Const(_, _, _) => {},
                        }
                    }
                    self.self_ty = None;
                    self.item_tables.impls.push(ImplInfo {
                        impl_id,
                        self_ty_def,
                        trait_def,
                        methods,
                        assoc_types,
                    });
                },
                _ => {},
            }
        }
    }

    fn ast_variant_data_to_hir(&mut self, data: &ast::VariantData) -> VariantData {
        match data {
            ast::VariantData::Unit => VariantData::Unit,
            ast::VariantData::Tuple(tys) => {
                VariantData::Tuple(tys.iter().map(|t| self.ast_type_to_hir(t)).collect())
            },
            ast::VariantData::Struct(fields) => VariantData::Struct(
                fields
                    .iter()
                    .map(|f| FieldDef { name: f.name, ty: self.ast_type_to_hir(&f.ty) })
                    .collect(),
            ),
        }
    }

    fn ast_fn_sig_to_hir(&mut self, sig: &ast::FnSig) -> FnSig {
        let def_id = self.def_id_gen.next();
        let generics = self.convert_generics(&sig.generics);
        let params = sig
            .params
            .iter()
            .map(|p| {
                let ty = self.ast_type_to_hir(&p.ty);
                Param {
                    pat: Pattern::Binding {
                        def_id: DefId::DUMMY,
                        name: p.name,
                        ty: ty.clone(),
                        mutability: p.mutable,
                    },
                    ty,
                }
            })
            .collect();
        let ret_type = sig.ret_type.as_ref().map(|t| self.ast_type_to_hir(t)).unwrap_or(Type::Unit);
        FnSig { def_id, name: sig.name, generics, params, ret_type }
    }

    /// Build a `FnSig` for an impl method from its full `ast::FnItem` (the
    /// method's body is ignored here; this only records the signature for
    /// dispatch, body analysis happens in `analyze_item`).
    fn ast_fn_sig_from_item(&mut self, f: &ast::FnItem) -> FnSig {
        let def_id = self.def_id_gen.next();
        let generics = self.convert_generics(&f.generics);
        let params = f
            .params
            .iter()
            .map(|p| {
                let ty = self.ast_type_to_hir(&p.ty);
                Param {
                    pat: Pattern::Binding {
                        def_id: DefId::DUMMY,
                        name: p.name,
                        ty: ty.clone(),
                        mutability: p.mutable,
                    },
                    ty,
                }
            })
            .collect();
        let ret_type = f.ret_type.as_ref().map(|t| self.ast_type_to_hir(t)).unwrap_or(Type::Unit);
        FnSig { def_id, name: f.name, generics, params, ret_type }
    }

    /// §4.4.6: an impl of a trait must provide every method the trait
    /// declares and bind every associated type it declares; it must not
    /// bind an associated type the trait never declared.
    fn check_trait_impl_completeness(&mut self) {
        for i in 0..self.item_tables.impls.len() {
            let Some(trait_def) = self.item_tables.impls[i].trait_def else { continue };
            let Some(trait_info) = self.item_tables.traits.get(&trait_def) else { continue };
            let missing_methods: Vec<Symbol> = trait_info
                .methods
                .iter()
                .map(|m| m.name)
                .filter(|name| !self.item_tables.impls[i].methods.contains_key(name))
                .collect();
            let missing_assoc: Vec<Symbol> = trait_info
                .assoc_types
                .iter()
                .copied()
                .filter(|name| !self.item_tables.impls[i].assoc_types.contains_key(name))
                .collect();
            let foreign_assoc: Vec<Symbol> = self.item_tables.impls[i]
                .assoc_types
                .keys()
                .copied()
                .filter(|name| !trait_info.assoc_types.contains(name))
                .collect();
            for name in missing_methods {
                self.diagnose(
                    codes::P_TRAIT_NOT_IMPLEMENTED,
                    format!("missing implementation for trait method `{}`", name.as_str()),
                    Span::DUMMY,
                );
            }
            for name in missing_assoc {
                self.diagnose(
                    codes::P_TRAIT_NOT_IMPLEMENTED,
                    format!("missing binding for associated type `{}`", name.as_str()),
                    Span::DUMMY,
                );
            }
            for name in foreign_assoc {
                self.diagnose(
                    codes::P_TRAIT_NOT_IMPLEMENTED,
                    format!("associated type `{}` is not declared by this trait", name.as_str()),
                    Span::DUMMY,
                );
            }
        }
    }

    /// Analyze single item
    fn analyze_item(&mut self, item: ast::Item) -> Option<Item> {
        match item {
            ast::Item::Fn(fn_item) => self.analyze_fn_item(fn_item).map(Item::Function),
            ast::Item::Struct(s) => self.analyze_struct_item(s).map(Item::Struct),
            ast::Item::Enum(e) => self.analyze_enum_item(e).map(Item::Enum),
            ast::Item::Trait(t) => self.analyze_trait_item(t).map(Item::Trait),
            ast::Item::Impl(imp) => self.analyze_impl_item(imp).map(Item::Impl),
            ast::Item::Use(_) => None,
        }
    }

    fn analyze_struct_item(&mut self, s: ast::StructItem) -> Option<StructItem> {
        let def_id = self.scope_tree.resolve_type(s.name)?;
        let info = self.item_tables.structs.get(&def_id)?;
        Some(StructItem {
            def_id,
            name: s.name,
            generics: info.generics.clone(),
            fields: info.fields.iter().map(|f| FieldDef { name: f.name, ty: f.ty.clone() }).collect(),
        })
    }

    fn analyze_enum_item(&mut self, e: ast::EnumItem) -> Option<EnumItem> {
        let def_id = self.scope_tree.resolve_type(e.name)?;
        let info = self.item_tables.enums.get(&def_id)?;
        Some(EnumItem {
            def_id,
            name: e.name,
            generics: info.generics.clone(),
            variants: info
                .variants
                .iter()
                .map(|v| VariantDef { def_id: v.def_id, name: v.name, data: v.data.clone() })
                .collect(),
        })
    }

    fn analyze_trait_item(&mut self, t: ast::TraitItem) -> Option<TraitItem> {
        let def_id = self.scope_tree.resolve_type(t.name)?;
        let info = self.item_tables.traits.get(&def_id)?.clone();
        let mut items = Vec::new();
        for member in t.items {
            match member {
                ast::TraitMember::Method(sig) => {
                    if let Some(hir_sig) = info.method(sig.name).cloned() {
                        items.push(TraitItemKind::Method(hir_sig));
                    }
                },
                ast::TraitMember::Type(name, bounds) => {
                    let hir_bounds = bounds.iter().map(|b| self.ast_type_to_hir(b)).collect();
                    items.push(TraitItemKind::Type(name, hir_bounds));
                },
                ast::TraitMember::Const(name, ty, init) => {
                    let hir_ty = self.ast_type_to_hir(&ty);
                    let hir_init = init.and_then(|e| self.analyze_expr(e));
                    items.push(TraitItemKind::Const(name, hir_ty, hir_init));
                },
            }
        }
        Some(TraitItem { def_id, name: t.name, generics: info.generics.clone(), items })
    }

    fn analyze_impl_item(&mut self, imp: ast::ImplItem) -> Option<ImplItem> {
        let self_ty = self.ast_type_to_hir(&imp.self_ty);
        let self_ty_def = nominal_def(&self_ty)?;
        let trait_ref = imp
            .trait_ref
            .as_ref()
            .and_then(|t| {
                let hir_t = self.ast_type_to_hir(t);
                nominal_def(&hir_t).map(|def_id| {
                    let args = match &hir_t {
                        Type::GenericInst(_, args) => args.clone(),
                        _ => Vec::new(),
                    };
                    TraitRef { def_id, args }
                })
            });

        // Find the matching registered ImplInfo so method bodies reuse the
        // exact DefIds call sites were given in pass 1b.
        let trait_def = trait_ref.as_ref().map(|t| t.def_id);
        let table_idx = self.item_tables.impls.iter().position(|i| {
            i.self_ty_def == self_ty_def && i.trait_def == trait_def
        })?;

        self.generic_names.clear();
        let generics = self.convert_generics(&imp.generics);
        self.self_ty = Some(self_ty.clone());

        let mut items = Vec::new();
        for member in imp.items {
            match member {
                ast::ImplMember::Method(f) => {
                    let sig = self.item_tables.impls[table_idx].methods.get(&f.name).cloned();
                    if let Some(fn_item) = self.analyze_impl_method(f, sig) {
                        items.push(ImplItemKind::Method(fn_item));
                    }
                },
                ast::ImplMember::Type(name, ty) => {
                    let hir_ty = self.ast_type_to_hir(&ty);
                    items.push(ImplItemKind::Type(name, hir_ty));
                },
                ast::ImplMember::Const(name, ty, init) => {
                    let hir_ty = self.ast_type_to_hir(&ty);
                    if let Some(hir_init) = self.analyze_expr(init) {
                        items.push(ImplItemKind::Const(name, hir_ty, hir_init));
                    }
                },
            }
        }

        self.self_ty = None;
        self.generic_names.clear();

        Some(ImplItem { impl_id: self.item_tables.impls[table_idx].impl_id, generics, trait_ref, self_ty, items })
    }

    /// Analyze an impl method body. Unlike a free function, its `def_id` is
    /// the one already assigned to it in the impl's method table (so method
    /// dispatch at call sites and the compiled body agree), and parameters
    /// named `self` take the impl's `Self` type rather than an explicit
    /// annotation when the source doesn't give one a distinct one.
    fn analyze_impl_method(&mut self, item: ast::FnItem, sig: Option<FnSig>) -> Option<FnItem> {
        let def_id = sig.as_ref().map(|s| s.def_id).unwrap_or_else(|| self.def_id_gen.next());

        self.scope_tree.enter_scope(RibKind::Function);
        let saved_generics: Vec<Symbol> = self.generic_names.iter().copied().collect();
        for gp in &item.generics {
            self.generic_names.insert(gp.name);
        }

        let mut params = Vec::new();
        let mut param_pats = Vec::new();
        for param in &item.params {
            let hir_ty = if param.name.as_str() == "self" {
                self.self_ty.clone().unwrap_or(Type::SelfTy)
            } else {
                self.ast_type_to_hir(&param.ty)
            };
            let pdef_id = self.def_id_gen.next();
            let pat = Pattern::Binding {
                def_id: pdef_id,
                name: param.name,
                ty: hir_ty.clone(),
                mutability: param.mutable,
            };
            param_pats.push(pat.clone());
            self.scope_tree.add_binding(param.name, pdef_id);
            self.type_context.set_def_type(pdef_id, hir_ty.clone());
            params.push(Param { pat, ty: hir_ty });
        }

        let ret_type = item.ret_type.as_ref().map(|t| self.ast_type_to_hir(t)).unwrap_or(Type::Unit);
        let prev_ret = self.current_ret_type.replace(ret_type.clone());

        let mut requires = Vec::new();
        for clause in item.requires {
            if let Some(e) = self.analyze_expr(clause) {
                requires.push(e);
            }
        }
        if !requires.is_empty() {
            let mut checker = ContractChecker::new(self.handler);
            checker.check_requires(&requires, Span::DUMMY);
            self.error_count += checker.error_count();
        }

        let body_expr = self.analyze_block(item.body)?;

        let mut ensures = Vec::new();
        if !item.ensures.is_empty() {
            let result_def = self.def_id_gen.next();
            self.scope_tree.add_binding(Symbol::intern("result"), result_def);
            self.type_context.set_def_type(result_def, ret_type.clone());
            for clause in item.ensures {
                if let Some(e) = self.analyze_expr(clause) {
                    ensures.push(e);
                }
            }
            let mut checker = ContractChecker::new(self.handler);
            checker.check_ensures(&ensures, Span::DUMMY);
            self.error_count += checker.error_count();
        }

        self.current_ret_type = prev_ret;

        self.scope_tree.exit_scope();
        for name in &saved_generics {
            self.generic_names.insert(*name);
        }

        Some(FnItem {
            def_id,
            name: item.name,
            generics: GenericParams::default(),
            params,
            ret_type,
            body: Body { params: param_pats, value: body_expr },
            requires,
            ensures,
            async_kw: item.async_kw,
        })
    }

    /// Analyze function item
    fn analyze_fn_item(&mut self, item: ast::FnItem) -> Option<FnItem> {
        let def_id = self.scope_tree.resolve_function(item.name)?;

        self.scope_tree.enter_scope(RibKind::Function);
        let generics = self.convert_generics(&item.generics);

        let mut params = Vec::new();
        let mut param_pats = Vec::new();
        for param in &item.params {
            let hir_ty = self.ast_type_to_hir(&param.ty);
            let pdef_id = self.def_id_gen.next();
            let pat = Pattern::Binding {
                def_id: pdef_id,
                name: param.name,
                ty: hir_ty.clone(),
                mutability: param.mutable,
            };
            param_pats.push(pat.clone());

            self.scope_tree.add_binding(param.name, pdef_id);
            self.type_context.set_def_type(pdef_id, hir_ty.clone());

            params.push(Param { pat, ty: hir_ty });
        }

        let ret_type = item.ret_type.as_ref().map(|t| self.ast_type_to_hir(t)).unwrap_or(Type::Unit);
        let prev_ret = self.current_ret_type.replace(ret_type.clone());

        // §4.4.5: `@requires` is checked against the parameter bindings
        // before the body is entered — §8 scenario 5.
        let mut requires = Vec::new();
        for clause in item.requires {
            if let Some(e) = self.analyze_expr(clause) {
                requires.push(e);
            }
        }
        if !requires.is_empty() {
            let mut checker = ContractChecker::new(self.handler);
            checker.check_requires(&requires, Span::DUMMY);
            self.error_count += checker.error_count();
        }

        let body_expr = self.analyze_block(item.body)?;

        // `result` is bound to the return value for the duration of the
        // `@ensures` clauses only; it has no meaning anywhere else in the
        // function (§4.4.5).
        let mut ensures = Vec::new();
        if !item.ensures.is_empty() {
            let result_def = self.def_id_gen.next();
            self.scope_tree.add_binding(Symbol::intern("result"), result_def);
            self.type_context.set_def_type(result_def, ret_type.clone());
            for clause in item.ensures {
                if let Some(e) = self.analyze_expr(clause) {
                    ensures.push(e);
                }
            }
            let mut checker = ContractChecker::new(self.handler);
            checker.check_ensures(&ensures, Span::DUMMY);
            self.error_count += checker.error_count();
        }

        self.current_ret_type = prev_ret;
        self.scope_tree.exit_scope();
        self.generic_names.clear();

        let body = Body { params: param_pats, value: body_expr };

        Some(FnItem {
            def_id,
            name: item.name,
            generics,
            params,
            ret_type,
            body,
            requires,
            ensures,
            async_kw: item.async_kw,
        })
    }

    /// Analyze block expression
    fn analyze_block(&mut self, block: ast::Block) -> Option<Expr> {
        self.scope_tree.enter_scope(RibKind::Block);

        let mut stmts = Vec::new();
        for stmt in block.stmts {
            if let Some(s) = self.analyze_stmt(stmt) {
                stmts.push(s);
            }
        }

        let mut ty = Type::Unit;
        let mut expr = None;

        if let Some(trailing) = block.trailing {
            if let Some(e) = self.analyze_expr(*trailing) {
                ty = e.ty();
                expr = Some(Box::new(e));
            }
        }

        self.scope_tree.exit_scope();

        Some(Expr::Block { stmts, expr, ty })
    }

    /// Analyze statement
    fn analyze_stmt(&mut self, stmt: ast::Stmt) -> Option<Stmt> {
        match stmt {
            ast::Stmt::Let(l) => {
                let mut init = l.init.and_then(|expr| self.analyze_expr(expr));
                let declared_ty = l.ty.as_ref().map(|t| self.ast_type_to_hir(t));
                if let Some(declared) = &declared_ty {
                    init = init.map(|v| self.promote_to_expected(v, declared));
                }
                let ty = declared_ty
                    .clone()
                    .or_else(|| init.as_ref().map(|e| e.ty()))
                    .unwrap_or_else(|| Type::Infer(self.type_context.new_infer_var()));

                if let (Some(declared), Some(init_expr)) = (&declared_ty, &init) {
                    self.unify_types(declared, &init_expr.ty(), Span::DUMMY);
                }

                let pat = self.analyze_pattern_binding(l.pattern, &ty);

                Some(Stmt::Let { pat, ty, init })
            },
            ast::Stmt::If(if_stmt) => {
                let if_expr = self.analyze_if(ast::IfExpr {
                    cond: Box::new(if_stmt.cond),
                    then_block: if_stmt.then_block,
                    else_block: if_stmt.else_clause.map(Self::else_clause_to_expr),
                })?;
                Some(Stmt::Expr(if_expr))
            },
            ast::Stmt::While(w) => {
                let cond = self.analyze_expr(w.cond)?;
                let label = w.label.map(|_| LabelId(0));
                self.loop_stack.push((label, Type::Unit));
                let body = self.analyze_block(w.body)?;
                self.loop_stack.pop();
                Some(Stmt::While { cond, body: Box::new(body), label })
            },
            ast::Stmt::For(f) => {
                let iter = self.analyze_expr(f.iter)?;
                self.scope_tree.enter_scope(RibKind::Block);
                let elem_ty = match iter.ty() {
                    Type::Slice(elem) | Type::Array(elem, _) => *elem,
                    Type::GenericInst(d, mut args) if d == self.list_def && args.len() == 1 => {
                        args.pop().unwrap()
                    },
                    _ => Type::Int,
                };
                let pat = self.analyze_pattern_binding(f.pattern, &elem_ty);
                let label = f.label.map(|_| LabelId(0));
                self.loop_stack.push((label, Type::Unit));
                let body = self.analyze_block(f.body)?;
                self.loop_stack.pop();
                self.scope_tree.exit_scope();
                Some(Stmt::For { pat, iter, body: Box::new(body), label })
            },
            ast::Stmt::Return(value) => {
                let expr = self.analyze_return(value.map(Box::new))?;
                Some(Stmt::Expr(expr))
            },
            ast::Stmt::Expr(e) => {
                let expr = self.analyze_expr(e)?;
                Some(Stmt::Expr(expr))
            },
            ast::Stmt::Item(_) => None,
            ast::Stmt::Defer(block) => {
                // Lower the deferred body as an ordinary statement sequence
                // analyzed right here: ownership validates moves at the
                // defer site, not at its (unknown) eventual run time (§4.5).
                let inner = self.analyze_block(block)?;
                Some(Stmt::Defer(Box::new(Stmt::Expr(inner))))
            },
            ast::Stmt::Unsafe(block) => {
                self.unsafe_depth += 1;
                let body = self.analyze_block(block);
                self.unsafe_depth -= 1;
                Some(Stmt::Unsafe(Box::new(body?)))
            },
            ast::Stmt::With(with_stmt) => {
                let value = self.analyze_expr(*with_stmt.value)?;
                let ty = value.ty();

                // §4.5: if a `Closeable` trait is defined, the resource's
                // type must implement it; if none is defined, skip the
                // check entirely (gradual adoption, matching
                // `type_checker.py`'s `check_with`).
                if let Some(closeable_def) = self.scope_tree.resolve_type(Symbol::intern("Closeable")) {
                    if self.item_tables.traits.contains_key(&closeable_def) {
                        if let Some(ty_def) = nominal_def(&ty) {
                            if self.item_tables.impl_of_trait(ty_def, closeable_def).is_none() {
                                self.diagnose(
                                    codes::P_NOT_CLOSEABLE,
                                    "type does not implement `Closeable`, required to use it with `with`".to_string(),
                                    Span::DUMMY,
                                );
                            }
                        }
                    }
                }

                self.scope_tree.enter_scope(RibKind::Block);
                let def_id = self.def_id_gen.next();
                self.scope_tree.add_binding(with_stmt.var, def_id);
                self.type_context.set_def_type(def_id, ty.clone());
                let body = self.analyze_block(with_stmt.body);
                self.scope_tree.exit_scope();

                Some(Stmt::With { def_id, name: with_stmt.var, ty, value, body: Box::new(body?) })
            },
        }
    }

    fn else_clause_to_expr(clause: Box<ast::ElseClause>) -> Box<ast::Expr> {
        match *clause {
            ast::ElseClause::Block(b) => Box::new(ast::Expr::Block(b)),
            ast::ElseClause::If(i) => Box::new(ast::Expr::If(ast::IfExpr {
                cond: Box::new(i.cond),
                then_block: i.then_block,
                else_block: i.else_clause.map(Self::else_clause_to_expr),
            })),
        }
    }

    /// Declares a simple-name or wildcard `let`/`for` binding pattern,
    /// falling back to the general pattern analyzer for anything richer
    /// (tuple/struct/enum destructuring).
    fn analyze_pattern_binding(&mut self, pat: ast::Pattern, expected: &Type) -> Pattern {
        self.analyze_pattern_expect(pat, expected)
            .unwrap_or(Pattern::Wildcard)
    }

    /// Analyze expression
    fn analyze_expr(&mut self, expr: ast::Expr) -> Option<Expr> {
        match expr {
            ast::Expr::Literal(lit) => self.analyze_literal(lit),
            ast::Expr::Path(path) => self.analyze_path(path),
            ast::Expr::Binary(bin) => self.analyze_binary(bin),
            ast::Expr::Unary(unary) => self.analyze_unary(unary),
            ast::Expr::If(if_expr) => self.analyze_if(if_expr),
            ast::Expr::Call(call) => self.analyze_call(call),
            ast::Expr::Block(block) => self.analyze_block(block),
            ast::Expr::Tuple(items) => self.analyze_tuple(items),
            ast::Expr::Array(items) => self.analyze_array(items),
            ast::Expr::Index(index_expr) => self.analyze_index(index_expr),
            ast::Expr::Field(field_expr) => self.analyze_field(field_expr),
            ast::Expr::Match(match_expr) => self.analyze_match(match_expr),
            ast::Expr::Return(ret) => self.analyze_return(ret),
            ast::Expr::Break(value, label) => self.analyze_break(value, label),
            ast::Expr::Continue(label) => self.analyze_continue(label),
            ast::Expr::MethodCall(method_call) => self.analyze_method_call(method_call),
            ast::Expr::Closure(closure) => self.analyze_closure(closure),
            ast::Expr::Assign(assign) => self.analyze_assign(assign),
            ast::Expr::CompoundAssign(compound) => self.analyze_compound_assign(compound),
            ast::Expr::Range(range) => self.analyze_range(range),
            ast::Expr::Cast(cast_expr, target_ty) => self.analyze_cast(cast_expr, target_ty),
            ast::Expr::Async(async_expr) => self.analyze_async(async_expr),
            ast::Expr::Await(await_expr) => self.analyze_await(await_expr),
            ast::Expr::StructLiteral(lit) => self.analyze_struct_literal(lit),
        }
    }

    /// Analyze a struct literal (§4.4.2): all and only the declared fields
    /// must be present, each value checked against its field type.
    fn analyze_struct_literal(&mut self, lit: ast::StructLiteralExpr) -> Option<Expr> {
        let name = lit.path.segments.last()?.ident;
        let Some(def_id) = self.scope_tree.resolve_type(name) else {
            self.diagnose(
                codes::P_UNKNOWN_TYPE,
                format!("unresolved type name `{}`", name.as_str()),
                Span::DUMMY,
            );
            return None;
        };
        let Some(info) = self.item_tables.structs.get(&def_id).cloned() else {
            self.diagnose(
                codes::P_UNKNOWN_TYPE,
                format!("`{}` is not a struct", name.as_str()),
                Span::DUMMY,
            );
            return None;
        };

        let mut seen = FxHashSet::default();
        let mut fields = Vec::new();
        for (field_name, value) in lit.fields {
            seen.insert(field_name);
            let value = self.analyze_expr(value)?;
            match info.field(field_name) {
                Some(f) => {
                    self.unify_types(&f.ty, &value.ty(), Span::DUMMY);
                },
                None => {
                    self.diagnose(
                        codes::P_UNRESOLVED_NAME,
                        format!("struct `{}` has no field named `{}`", name.as_str(), field_name.as_str()),
                        Span::DUMMY,
                    );
                },
            }
            fields.push((field_name, value));
        }

        for f in &info.fields {
            if !seen.contains(&f.name) {
                self.diagnose(
                    codes::P_TYPE_MISMATCH,
                    format!("missing field `{}` in initializer of `{}`", f.name.as_str(), name.as_str()),
                    Span::DUMMY,
                );
            }
        }

        Some(Expr::StructLiteral { def_id, fields, ty: Type::Adt(def_id) })
    }

    /// Resolve a (possibly multi-segment) path to a type namespace entry
    /// naming an enum, returning its `DefId` and `EnumInfo` when the final
    /// segment names one of its variants. Covers both `Option::Some` (a
    /// single `Path` with two segments) and `Option.Some` (a `FieldExpr`/
    /// `MethodCallExpr` whose receiver is the bare type path `Option`).
    fn resolve_enum_variant(&self, ty_name: Symbol, variant_name: Symbol) -> Option<(DefId, VariantInfo)> {
        let enum_def = self.scope_tree.resolve_type(ty_name)?;
        if self.def_table.kind_of(enum_def) != Some(DefKind::Enum) {
            return None;
        }
        let variant = self.item_tables.enums.get(&enum_def)?.variant(variant_name)?.clone();
        Some((enum_def, variant))
    }

    /// True if `path` is a single bare identifier, returning it.
    fn single_segment(path: &ast::Path) -> Option<Symbol> {
        if path.segments.len() == 1 {
            Some(path.segments[0].ident)
        } else {
            None
        }
    }

    /// Analyze method call: dispatches across the three call shapes the
    /// surface syntax can produce for `a.b(args)` — a genuine instance
    /// method call, a static call on a type name (`T.method(args)`), and an
    /// enum variant constructor call (`Option.Some(1)`).
    fn analyze_method_call(&mut self, expr: ast::MethodCallExpr) -> Option<Expr> {
        // Static-style dispatch: the receiver is a bare type name, not a
        // value expression.
        if let ast::Expr::Path(path) = expr.receiver.as_ref() {
            if let Some(ty_name) = Self::single_segment(path) {
                if let Some((enum_def, variant)) = self.resolve_enum_variant(ty_name, expr.method) {
                    let mut args = Vec::new();
                    for arg in expr.call_args {
                        if let Some(a) = self.analyze_expr(arg) {
                            args.push(a);
                        }
                    }
                    let payload = variant.payload_types();
                    for (i, arg) in args.iter().enumerate() {
                        if let Some(expected) = payload.get(i) {
                            self.unify_types(expected, &arg.ty(), Span::DUMMY);
                        }
                    }
                    let ty = self.variant_construct_ty(enum_def, &variant, &args, None);
                    return Some(Expr::EnumVariant { enum_def, variant: variant.def_id, args, ty });
                }
                if let Some(ty_def) = self.scope_tree.resolve_type(ty_name) {
                    if let Some(sig) = self.item_tables.resolve_method(ty_def, expr.method).cloned() {
                        let mut args = Vec::new();
                        for arg in expr.call_args {
                            if let Some(a) = self.analyze_expr(arg) {
                                args.push(a);
                            }
                        }
                        for (param, arg) in sig.params.iter().zip(&args) {
                            self.unify_types(&param.ty, &arg.ty(), Span::DUMMY);
                        }
                        return Some(Expr::Call {
                            func: Box::new(Expr::Var { def_id: sig.def_id, ty: Type::Fn(
                                sig.params.iter().map(|p| p.ty.clone()).collect(),
                                Box::new(sig.ret_type.clone()),
                            ), span: path.span }),
                            args,
                            ty: sig.ret_type,
                            is_builtin_print: false,
                        });
                    }
                }
            }
        }

        // Instance dispatch: resolve the receiver's nominal type and look
        // up `method` among its impls.
        let receiver = self.analyze_expr(*expr.receiver)?;
        let mut args = Vec::new();
        for arg in expr.call_args {
            if let Some(a) = self.analyze_expr(arg) {
                args.push(a);
            }
        }

        let ty_def = nominal_def(&receiver.ty());
        let resolved = ty_def.and_then(|d| self.item_tables.resolve_method(d, expr.method).cloned());

        match resolved {
            Some(sig) => {
                for (param, arg) in sig.params.iter().skip(1).zip(&args) {
                    self.unify_types(&param.ty, &arg.ty(), Span::DUMMY);
                }
                Some(Expr::MethodCall { receiver: Box::new(receiver), method: sig.def_id, args, ty: sig.ret_type })
            },
            None => {
                self.diagnose(
                    codes::P_UNRESOLVED_NAME,
                    format!("no method named `{}` found for this type", expr.method.as_str()),
                    Span::DUMMY,
                );
                Some(Expr::MethodCall { receiver: Box::new(receiver), method: DefId::DUMMY, args, ty: Type::Error })
            },
        }
    }

    /// Analyze closure (lambda)
    fn analyze_closure(&mut self, expr: ast::ClosureExpr) -> Option<Expr> {
        self.scope_tree.enter_scope(RibKind::Block);

        let mut params = Vec::new();
        let mut param_tys = Vec::new();
        for param in &expr.params {
            let def_id = self.def_id_gen.next();
            self.scope_tree.add_binding(param.name, def_id);

            let param_hir_ty = self.ast_type_to_hir(&param.ty);
            self.type_context.set_def_type(def_id, param_hir_ty.clone());
            param_tys.push(param_hir_ty.clone());

            params.push(Pattern::Binding {
                def_id,
                name: param.name,
                ty: param_hir_ty,
                mutability: false,
            });
        }

        // Free variables referenced in the body but not bound by a param of
        // this closure, resolved in the enclosing scope — these are what a
        // runtime (capturing) closure must close over (§9 design note).
        let mut captures = Vec::new();
        for name in Self::free_idents(&expr.body) {
            if params.iter().any(|p| matches!(p, Pattern::Binding { name: n, .. } if *n == name)) {
                continue;
            }
            if let Some(def_id) = self.scope_tree.resolve(name) {
                if !captures.contains(&def_id) {
                    captures.push(def_id);
                }
            }
        }

        let body = self.analyze_expr(*expr.body)?;
        let body_ty = body.ty();

        self.scope_tree.exit_scope();

        let ty = Type::Fn(param_tys, Box::new(body_ty));
        let is_runtime = !captures.is_empty();

        Some(Expr::Closure {
            params,
            body: Box::new(body),
            is_runtime,
            captures,
            ty,
        })
    }

    /// Collect bare identifier names mentioned anywhere in an (unanalyzed)
    /// AST expression, used to approximate a closure's free variables
    /// before its body has been name-resolved.
    fn free_idents(expr: &ast::Expr) -> Vec<Symbol> {
        fn walk(expr: &ast::Expr, out: &mut Vec<Symbol>) {
            match expr {
                ast::Expr::Path(p) => {
                    if let Some(seg) = p.segments.first() {
                        out.push(seg.ident);
                    }
                },
                ast::Expr::Binary(b) => {
                    walk(&b.left, out);
                    walk(&b.right, out);
                },
                ast::Expr::Unary(u) => walk(&u.expr, out),
                ast::Expr::Call(c) => {
                    walk(&c.func, out);
                    for a in &c.args {
                        walk(a, out);
                    }
                },
                ast::Expr::MethodCall(m) => {
                    walk(&m.receiver, out);
                    for a in &m.call_args {
                        walk(a, out);
                    }
                },
                ast::Expr::Field(f) => walk(&f.object, out),
                ast::Expr::Index(i) => {
                    walk(&i.object, out);
                    walk(&i.index, out);
                },
                ast::Expr::Block(b) => {
                    for stmt in &b.stmts {
                        if let ast::Stmt::Expr(e) = stmt {
                            walk(e, out);
                        }
                    }
                    if let Some(tail) = &b.trailing {
                        walk(tail, out);
                    }
                },
                ast::Expr::If(i) => {
                    walk(&i.cond, out);
                    walk(&ast::Expr::Block(i.then_block.clone()), out);
                    if let Some(e) = &i.else_block {
                        walk(e, out);
                    }
                },
                ast::Expr::Assign(a) => {
                    walk(&a.place, out);
                    walk(&a.value, out);
                },
                ast::Expr::Tuple(es) | ast::Expr::Array(es) => {
                    for e in es {
                        walk(e, out);
                    }
                },
                ast::Expr::Cast(e, _) => walk(e, out),
                _ => {},
            }
        }
        let mut out = Vec::new();
        walk(expr, &mut out);
        out
    }

    /// Analyze assignment
    fn analyze_assign(&mut self, expr: ast::AssignExpr) -> Option<Expr> {
        let place = self.analyze_expr(*expr.place)?;
        let value = self.analyze_expr(*expr.value)?;
        self.unify_types(&place.ty(), &value.ty(), Span::DUMMY);

        Some(Expr::Assign {
            place: Box::new(place),
            value: Box::new(value),
        })
    }

    /// Analyze compound assignment
    fn analyze_compound_assign(&mut self, expr: ast::CompoundAssignExpr) -> Option<Expr> {
        let place = self.analyze_expr(*expr.place)?;
        let place_ty = place.ty();
        let rhs = self.analyze_expr(*expr.value)?;

        let op = self.convert_binop(expr.op, Span::DUMMY)?;

        Some(Expr::Assign {
            place: Box::new(place.clone()),
            value: Box::new(Expr::Binary {
                op,
                left: Box::new(place),
                right: Box::new(rhs),
                ty: place_ty,
            }),
        })
    }

    /// Analyze range expression
    fn analyze_range(&mut self, expr: ast::RangeExpr) -> Option<Expr> {
        let lo = expr.start.and_then(|s| self.analyze_expr(*s)).map(Box::new);
        let hi = expr.end.and_then(|e| self.analyze_expr(*e)).map(Box::new);

        Some(Expr::Range {
            lo,
            hi,
            inclusive: expr.inclusive,
            ty: Type::Slice(Box::new(Type::Int)),
        })
    }

    /// Analyze cast expression
    /// Checks a cast expression (§4.4.2, `as`). Grounded on
    /// `type_checker.py`'s `check_as_expression`: pointer/reference-to-
    /// pointer casts and the `String -> *u8` data-pointer extraction are
    /// allowed only inside `unsafe` (§4.5); anything else falls back to the
    /// ordinary structural `compatible()` rule used everywhere else instead
    /// of a hand-picked scalar allowlist.
    fn analyze_cast(&mut self, expr: Box<ast::Expr>, target_ty: ast::Type) -> Option<Expr> {
        let inner = self.analyze_expr(*expr)?;
        let ty = self.ast_type_to_hir(&target_ty);
        let from = inner.ty();

        let is_ptr_like = |t: &Type| matches!(t, Type::Pointer(..) | Type::Ref(..));
        let is_u8_ptr = |t: &Type| matches!(t, Type::Pointer(inner, _) if matches!(**inner, Type::UInt8));

        let allowed = if is_ptr_like(&from) && is_ptr_like(&ty) {
            if self.unsafe_depth == 0 {
                self.type_error(
                    "pointer/reference casts are only allowed inside an `unsafe` block".to_string(),
                    Span::DUMMY,
                );
            }
            true
        } else if matches!(from, Type::String) && is_u8_ptr(&ty) {
            if self.unsafe_depth == 0 {
                self.type_error(
                    "casting `String` to `*u8` is only allowed inside an `unsafe` block".to_string(),
                    Span::DUMMY,
                );
            }
            true
        } else {
            compatible(&from, &ty)
        };

        if !allowed {
            self.type_error(format!("cannot cast {:?} to {:?}", from, ty), Span::DUMMY);
        }

        Some(Expr::Cast {
            expr: Box::new(inner),
            ty,
        })
    }

    /// Analyze async expression
    fn analyze_async(&mut self, expr: ast::AsyncExpr) -> Option<Expr> {
        let body = self.analyze_block(expr.body)?;
        let body_ty = body.ty();

        Some(Expr::Async {
            body: Box::new(body),
            ty: Type::Future(Box::new(body_ty)),
        })
    }

    /// Analyze await expression
    fn analyze_await(&mut self, expr: Box<ast::Expr>) -> Option<Expr> {
        let future = self.analyze_expr(*expr)?;

        let ty = match future.ty() {
            Type::Future(inner_ty) => *inner_ty,
            other => {
                self.type_error(format!("cannot await non-future type {:?}", other), Span::DUMMY);
                Type::Error
            },
        };

        Some(Expr::Await {
            expr: Box::new(future),
            ty,
        })
    }

    /// Analyze unary expression
    fn analyze_unary(&mut self, expr: ast::UnaryExpr) -> Option<Expr> {
        let op = match expr.op {
            ast::UnOp::Neg => UnOp::Neg,
            ast::UnOp::Not | ast::UnOp::BitNot => UnOp::Not,
            ast::UnOp::Deref => UnOp::Deref,
            ast::UnOp::Ref(mutable) => UnOp::Ref(mutable),
        };

        let inner = self.analyze_expr(*expr.expr)?;

        let ty = match op {
            UnOp::Deref => match inner.ty() {
                Type::Ref(inner_ty, _) | Type::Pointer(inner_ty, _) => *inner_ty,
                other => {
                    self.type_error(format!("cannot dereference non-reference type {:?}", other), expr.span);
                    Type::Error
                },
            },
            UnOp::Ref(mutable) => Type::Ref(Box::new(inner.ty()), mutable),
            UnOp::Neg | UnOp::Not => inner.ty(),
        };

        Some(Expr::Unary {
            op,
            expr: Box::new(inner),
            ty,
        })
    }

    /// Analyze function call. Covers the plain-function-path and enum-
    /// variant-constructor call shapes; `a.b(...)` goes through
    /// `analyze_method_call` instead.
    fn analyze_call(&mut self, call: ast::CallExpr) -> Option<Expr> {
        if let ast::Expr::Path(path) = call.func.as_ref() {
            if path.segments.len() >= 2 {
                let ty_name = path.segments[path.segments.len() - 2].ident;
                let member_name = path.segments[path.segments.len() - 1].ident;
                if let Some((enum_def, variant)) = self.resolve_enum_variant(ty_name, member_name) {
                    let mut args = Vec::new();
                    for arg in call.args {
                        if let Some(a) = self.analyze_expr(arg) {
                            args.push(a);
                        }
                    }
                    let payload = variant.payload_types();
                    for (i, arg) in args.iter().enumerate() {
                        if let Some(expected) = payload.get(i) {
                            self.unify_types(expected, &arg.ty(), Span::DUMMY);
                        }
                    }
                    let ty = self.variant_construct_ty(enum_def, &variant, &args, None);
                    return Some(Expr::EnumVariant {
                        enum_def,
                        variant: variant.def_id,
                        args,
                        ty,
                    });
                }
            }
        }

        let func = self.analyze_expr(*call.func)?;

        let mut args = Vec::new();
        for arg in call.args {
            if let Some(a) = self.analyze_expr(arg) {
                args.push(a);
            }
        }

        let is_builtin_print = matches!(&func, Expr::Var { def_id, .. } if Some(*def_id) == self.print_def);

        // `print` is variadic (§4.4.3: "Variadic built-ins (print) bypass
        // arity and type checks on arguments.") — any number of arguments of
        // any type is accepted.
        let ty = if is_builtin_print {
            Type::Unit
        } else {
            match func.ty() {
                Type::Fn(params, ret_ty) => {
                    if params.len() != args.len() {
                        self.type_error(
                            format!("expected {} argument(s), found {}", params.len(), args.len()),
                            Span::DUMMY,
                        );
                    }
                    let promoted_args: Vec<Expr> = args
                        .into_iter()
                        .enumerate()
                        .map(|(i, arg)| match params.get(i) {
                            Some(param_ty) => self.promote_to_expected(arg, param_ty),
                            None => arg,
                        })
                        .collect();
                    for (param_ty, arg) in params.iter().zip(&promoted_args) {
                        self.unify_types(param_ty, &arg.ty(), Span::DUMMY);
                    }
                    args = promoted_args;
                    *ret_ty
                },
                Type::Infer(_) | Type::Error => Type::Error,
                other => {
                    self.type_error(format!("cannot call value of non-function type {:?}", other), Span::DUMMY);
                    Type::Error
                },
            }
        };

        Some(Expr::Call {
            func: Box::new(func),
            args,
            ty,
            is_builtin_print,
        })
    }

    /// Analyze tuple
    fn analyze_tuple(&mut self, items: Vec<ast::Expr>) -> Option<Expr> {
        let mut analyzed = Vec::new();
        for item in items {
            if let Some(a) = self.analyze_expr(item) {
                analyzed.push(a);
            }
        }
        let ty = Type::Tuple(analyzed.iter().map(|e| e.ty()).collect());
        Some(Expr::Tuple { elements: analyzed, ty })
    }

    /// Analyze a list literal (`[a, b, c]`). Per §4.4.2: every element must
    /// be pairwise compatible with the first; the result is `List[T]`
    /// (`Type::GenericInst(list_def, [T])`, compatible with `[T; N]`
    /// structurally per §3.1 rule (d)); an empty list yields `unknown`
    /// (`Type::Error`), matching `check_list_literal`'s MVP fallback.
    fn analyze_array(&mut self, items: Vec<ast::Expr>) -> Option<Expr> {
        let mut analyzed = Vec::new();
        for item in items {
            if let Some(a) = self.analyze_expr(item) {
                analyzed.push(a);
            }
        }
        if analyzed.is_empty() {
            return Some(Expr::Array { elements: analyzed, ty: Type::Error });
        }
        let elem_ty = analyzed[0].ty();
        for e in &analyzed[1..] {
            self.unify_types(&elem_ty, &e.ty(), Span::DUMMY);
        }
        let ty = Type::GenericInst(self.list_def, vec![elem_ty]);
        Some(Expr::Array { elements: analyzed, ty })
    }

    /// Analyze index expression
    fn analyze_index(&mut self, index_expr: ast::IndexExpr) -> Option<Expr> {
        let object = self.analyze_expr(*index_expr.object)?;
        let index = self.analyze_expr(*index_expr.index)?;

        let ty = match object.ty() {
            Type::Array(elem_ty, _) => *elem_ty,
            Type::Slice(elem_ty) => *elem_ty,
            Type::Pointer(elem_ty, _) => *elem_ty,
            Type::GenericInst(d, mut args) if d == self.list_def && args.len() == 1 => {
                args.pop().unwrap()
            },
            Type::Tuple(tys) => {
                if let Expr::Literal { lit: Literal::Int(n), .. } = &index {
                    tys.get(*n as usize).cloned().unwrap_or(Type::Error)
                } else {
                    self.type_error("tuple index must be an integer literal", Span::DUMMY);
                    Type::Error
                }
            },
            other => {
                self.type_error(format!("cannot index into type {:?}", other), Span::DUMMY);
                Type::Error
            },
        };

        Some(Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
            ty,
        })
    }

    /// Resolve `object.field`: a struct field, a bare enum-variant
    /// constructor accessed on its enum's type name, or one of the string
    /// type's synthetic fields (`data`, `len`).
    fn analyze_field(&mut self, field_expr: ast::FieldExpr) -> Option<Expr> {
        // `EnumName.variant` — the object names a type, not a value.
        if let ast::Expr::Path(path) = field_expr.object.as_ref() {
            if let Some(ty_name) = Self::single_segment(path) {
                if let Some((enum_def, variant)) = self.resolve_enum_variant(ty_name, field_expr.field) {
                    if variant.arity() == 0 {
                        let ty = self.variant_construct_ty(enum_def, &variant, &[], None);
                        return Some(Expr::EnumVariant {
                            enum_def,
                            variant: variant.def_id,
                            args: Vec::new(),
                            ty,
                        });
                    }
                    // A bare reference to a payload-carrying variant names
                    // its constructor function, to be applied at the call
                    // site (`analyze_call`/`analyze_method_call`).
                    let fn_ty = Type::Fn(variant.payload_types(), Box::new(Type::Adt(enum_def)));
                    return Some(Expr::Field {
                        object: Box::new(Expr::Var { def_id: enum_def, ty: Type::Adt(enum_def), span: path.span }),
                        field: variant.def_id,
                        ty: fn_ty,
                    });
                }
            }
        }

        let object = self.analyze_expr(*field_expr.object)?;
        let object_ty = object.ty();

        // String synthetic fields (§4.4.4: `s.len`, `s.data`).
        if matches!(peel_indirection(&object_ty), Type::String) {
            match field_expr.field.as_str() {
                "len" => {
                    return Some(Expr::Field { object: Box::new(object), field: DefId::DUMMY, ty: Type::UInt });
                },
                "data" => {
                    return Some(Expr::Field {
                        object: Box::new(object),
                        field: DefId::DUMMY,
                        ty: Type::Pointer(Box::new(Type::UInt8), false),
                    });
                },
                _ => {},
            }
        }

        let Some(ty_def) = nominal_def(&object_ty) else {
            self.diagnose(
                codes::P_UNRESOLVED_NAME,
                format!("type {:?} has no field `{}`", object_ty, field_expr.field.as_str()),
                Span::DUMMY,
            );
            return Some(Expr::Field { object: Box::new(object), field: DefId::DUMMY, ty: Type::Error });
        };

        let field_info = self.item_tables.structs.get(&ty_def).and_then(|s| s.field(field_expr.field).cloned());
        match field_info {
            Some(f) => Some(Expr::Field { object: Box::new(object), field: f.def_id, ty: f.ty }),
            None => {
                self.diagnose(
                    codes::P_UNRESOLVED_NAME,
                    format!("no field named `{}` on this type", field_expr.field.as_str()),
                    Span::DUMMY,
                );
                Some(Expr::Field { object: Box::new(object), field: DefId::DUMMY, ty: Type::Error })
            },
        }
    }

    /// Analyze match expression
    fn analyze_match(&mut self, match_expr: ast::MatchExpr) -> Option<Expr> {
        let scrutinee = self.analyze_expr(*match_expr.scrutinee)?;
        let scrutinee_ty = scrutinee.ty();

        let mut arms = Vec::new();
        for arm in match_expr.arms {
            self.scope_tree.enter_scope(RibKind::Block);
            let pat = self.analyze_pattern_expect(arm.pattern, &scrutinee_ty)?;
            let guard = arm.guard.and_then(|g| self.analyze_expr(g));
            let body = self.analyze_expr(arm.body)?;
            self.scope_tree.exit_scope();

            arms.push(Arm { pat, guard, body });
        }

        let ty = arms.first().map(|a| a.body.ty()).unwrap_or(Type::Unit);
        for arm in &arms[1..] {
            self.unify_types(&ty, &arm.body.ty(), Span::DUMMY);
        }

        self.check_match_exhaustiveness(&scrutinee_ty, &arms, Span::DUMMY);

        Some(Expr::Match {
            scrutinee: Box::new(scrutinee),
            arms,
            ty,
        })
    }

    /// Spec §6's minimum error-code set requires `P0004` for non-exhaustive
    /// patterns. Only enum scrutinees are checked: a catch-all (`Wildcard`,
    /// `Binding`, or an `Or` whose alternatives include one) makes any match
    /// exhaustive; otherwise every variant of the enum must be covered by a
    /// top-level `Variant` pattern.
    fn check_match_exhaustiveness(&mut self, scrutinee_ty: &Type, arms: &[Arm], span: Span) {
        let Some(enum_def) = nominal_def(scrutinee_ty) else { return };
        let Some(enum_info) = self.item_tables.enums.get(&enum_def).cloned() else { return };

        fn is_catch_all(pat: &Pattern) -> bool {
            match pat {
                Pattern::Wildcard | Pattern::Binding { .. } => true,
                Pattern::Or(pats) => pats.iter().any(is_catch_all),
                _ => false,
            }
        }
        fn covered_variants(pat: &Pattern, out: &mut FxHashSet<DefId>) {
            match pat {
                Pattern::Variant { variant, .. } => { out.insert(*variant); },
                Pattern::Or(pats) => pats.iter().for_each(|p| covered_variants(p, out)),
                _ => {},
            }
        }

        if arms.iter().any(|a| is_catch_all(&a.pat)) {
            return;
        }
        let mut covered = FxHashSet::default();
        for arm in arms {
            covered_variants(&arm.pat, &mut covered);
        }
        let missing: Vec<&str> = enum_info
            .variants
            .iter()
            .filter(|v| !covered.contains(&v.def_id))
            .map(|v| v.name.as_str())
            .collect();
        if !missing.is_empty() {
            self.diagnose(
                codes::P_NONEXHAUSTIVE,
                format!("non-exhaustive match: missing variant(s) {}", missing.join(", ")),
                span,
            );
        }
    }

    /// Analyze pattern with an expected type, used to resolve struct-field
    /// patterns, enum-variant subpatterns, and untyped `let`/`for` bindings.
    fn analyze_pattern_expect(&mut self, pat: ast::Pattern, expected: &Type) -> Option<Pattern> {
        match pat {
            ast::Pattern::Wildcard => Some(Pattern::Wildcard),
            ast::Pattern::Ident(name, mutability) => {
                let def_id = self.def_id_gen.next();
                self.scope_tree.add_binding(name, def_id);
                self.type_context.set_def_type(def_id, expected.clone());
                Some(Pattern::Binding {
                    def_id,
                    name,
                    ty: expected.clone(),
                    mutability: matches!(mutability, ast::Mutability::Mutable),
                })
            },
            ast::Pattern::Mut(inner) => {
                let analyzed = self.analyze_pattern_expect(*inner, expected)?;
                Some(match analyzed {
                    Pattern::Binding { def_id, name, ty, .. } => {
                        Pattern::Binding { def_id, name, ty, mutability: true }
                    },
                    other => other,
                })
            },
            ast::Pattern::Literal(lit) => {
                let (lit_kind, ty) = self.lower_literal(lit);
                self.unify_types(expected, &ty, Span::DUMMY);
                Some(Pattern::Literal(lit_kind))
            },
            ast::Pattern::Path(path) => {
                // A nullary enum variant used as a pattern (`Option::None`
                // or a bare name after `use`).
                if path.segments.len() >= 2 {
                    let ty_name = path.segments[path.segments.len() - 2].ident;
                    let member = path.segments[path.segments.len() - 1].ident;
                    if let Some((enum_def, variant)) = self.resolve_enum_variant(ty_name, member) {
                        return Some(Pattern::Variant { enum_def, variant: variant.def_id, subpatterns: Vec::new() });
                    }
                }
                let name = path.segments.first()?.ident;
                if let Some((enum_def, variant)) = nominal_def(expected)
                    .and_then(|d| self.item_tables.enums.get(&d).map(|e| (d, e)))
                    .and_then(|(d, e)| e.variant(name).cloned().map(|v| (d, v)))
                {
                    return Some(Pattern::Variant { enum_def, variant: variant.def_id, subpatterns: Vec::new() });
                }
                let def_id = self.scope_tree.resolve(name).unwrap_or(DefId::DUMMY);
                Some(Pattern::Path { def_id })
            },
            ast::Pattern::Struct(path, fields) => {
                let name = path.segments.last()?.ident;
                let def_id = self.scope_tree.resolve_type(name)?;
                let struct_info = self.item_tables.structs.get(&def_id).cloned();
                let mut hir_fields = Vec::new();
                for fp in fields {
                    let field_ty = struct_info
                        .as_ref()
                        .and_then(|s| s.field(fp.field))
                        .map(|f| f.ty.clone())
                        .unwrap_or(Type::Error);
                    let field_def_id = struct_info
                        .as_ref()
                        .and_then(|s| s.field(fp.field))
                        .map(|f| f.def_id)
                        .unwrap_or(DefId::DUMMY);
                    let sub = self.analyze_pattern_expect(fp.pattern, &field_ty)?;
                    hir_fields.push(FieldPattern { field: field_def_id, pat: sub });
                }
                Some(Pattern::Struct { def_id, fields: hir_fields })
            },
            ast::Pattern::TupleStruct(path, pats) => {
                // An enum-variant pattern with positional subpatterns, e.g.
                // `Some(x)`; the single-segment form (`Some(x)` rather than
                // `Option::Some(x)`) is resolved against the scrutinee's
                // expected enum type.
                let (enum_def, variant) = if path.segments.len() >= 2 {
                    let ty_name = path.segments[path.segments.len() - 2].ident;
                    let member = path.segments[path.segments.len() - 1].ident;
                    self.resolve_enum_variant(ty_name, member)?
                } else {
                    let name = path.segments.first()?.ident;
                    let enum_def = nominal_def(expected)?;
                    let variant = self.item_tables.enums.get(&enum_def)?.variant(name)?.clone();
                    (enum_def, variant)
                };
                let payload = variant.payload_types();
                let mut subpatterns = Vec::new();
                for (i, p) in pats.into_iter().enumerate() {
                    let field_ty = payload.get(i).cloned().unwrap_or(Type::Error);
                    subpatterns.push(self.analyze_pattern_expect(p, &field_ty)?);
                }
                Some(Pattern::Variant { enum_def, variant: variant.def_id, subpatterns })
            },
            ast::Pattern::Tuple(pats) => {
                let elem_tys: Vec<Type> = match expected {
                    Type::Tuple(tys) => tys.clone(),
                    _ => vec![Type::Error; pats.len()],
                };
                let mut analyzed = Vec::new();
                for (i, p) in pats.into_iter().enumerate() {
                    let elem_ty = elem_tys.get(i).cloned().unwrap_or(Type::Error);
                    analyzed.push(self.analyze_pattern_expect(p, &elem_ty)?);
                }
                Some(Pattern::Tuple { pats: analyzed })
            },
            ast::Pattern::Slice(pats) => {
                let elem_ty = match expected {
                    Type::Slice(t) | Type::Array(t, _) => t.as_ref().clone(),
                    Type::GenericInst(d, args) if *d == self.list_def && args.len() == 1 => {
                        args[0].clone()
                    },
                    _ => Type::Error,
                };
                let mut analyzed = Vec::new();
                for p in pats {
                    analyzed.push(self.analyze_pattern_expect(p, &elem_ty)?);
                }
                Some(Pattern::Tuple { pats: analyzed })
            },
            ast::Pattern::Ref(inner, mutability) => {
                let inner_expected = match expected {
                    Type::Ref(t, _) => t.as_ref().clone(),
                    other => other.clone(),
                };
                let sub = self.analyze_pattern_expect(*inner, &inner_expected)?;
                Some(Pattern::Ref { pat: Box::new(sub), mutability: matches!(mutability, ast::Mutability::Mutable) })
            },
            ast::Pattern::Range(lo, hi) => {
                let lo = self.analyze_pattern_expect(*lo, expected)?;
                let hi = self.analyze_pattern_expect(*hi, expected)?;
                Some(Pattern::Range(Box::new(lo), Box::new(hi)))
            },
            ast::Pattern::Or(pats) => {
                let mut analyzed = Vec::new();
                for p in pats {
                    analyzed.push(self.analyze_pattern_expect(p, expected)?);
                }
                Some(Pattern::Or(analyzed))
            },
        }
    }

    /// Analyze return expression
    fn analyze_return(&mut self, value: Option<Box<ast::Expr>>) -> Option<Expr> {
        let mut val = value.and_then(|v| self.analyze_expr(*v));
        if let Some(ret_ty) = self.current_ret_type.clone() {
            // §4.4.3 point 6 / §9: a call in return position whose expected
            // type (the function's declared return type) is a matching
            // generic instantiation promotes an under-determined variant
            // constructor (`Option.None`) to close over it.
            val = val.map(|v| self.promote_to_expected(v, &ret_ty));
            let found = val.as_ref().map(|e| e.ty()).unwrap_or(Type::Unit);
            self.unify_types(&ret_ty, &found, Span::DUMMY);
        }
        Some(Expr::Return(val.map(Box::new)))
    }

    /// Analyze break expression
    fn analyze_break(&mut self, value: Option<Box<ast::Expr>>, label: Option<Symbol>) -> Option<Expr> {
        if self.loop_stack.is_empty() {
            self.diagnose(codes::P_UNRESOLVED_NAME, "`break` outside of a loop", Span::DUMMY);
        }
        let val = value.and_then(|v| self.analyze_expr(*v));
        Some(Expr::Break(val.map(Box::new), label.map(|_| LabelId(0))))
    }

    /// Analyze continue expression
    fn analyze_continue(&mut self, label: Option<Symbol>) -> Option<Expr> {
        if self.loop_stack.is_empty() {
            self.diagnose(codes::P_UNRESOLVED_NAME, "`continue` outside of a loop", Span::DUMMY);
        }
        Some(Expr::Continue(label.map(|_| LabelId(0))))
    }

    /// Analyze if expression
    fn analyze_if(&mut self, expr: ast::IfExpr) -> Option<Expr> {
        let cond = self.analyze_expr(*expr.cond)?;

        if cond.ty() != Type::Bool {
            self.type_error("if condition must be a boolean", Span::DUMMY);
        }

        let then_expr = Box::new(self.analyze_block(expr.then_block)?);

        let mut else_expr = None;
        let mut ty = Type::Unit;

        if let Some(e) = expr.else_block {
            let e_analyzed = self.analyze_expr(*e)?;
            ty = e_analyzed.ty();
            else_expr = Some(Box::new(e_analyzed));
            self.unify_types(&then_expr.ty(), &ty, Span::DUMMY);
        } else if then_expr.ty() != Type::Unit {
            self.type_error("if expression without an else branch must produce ()", Span::DUMMY);
        }

        Some(Expr::If {
            cond: Box::new(cond),
            then_expr,
            else_expr,
            ty,
        })
    }

    fn lower_literal(&mut self, lit: ast::Literal) -> (Literal, Type) {
        match lit {
            ast::Literal::Int(n) => (Literal::Int(n), Type::Int),
            ast::Literal::Float(f) => (Literal::Float(f), Type::Float),
            ast::Literal::String(s) => (Literal::String(s), Type::String),
            ast::Literal::Bool(b) => (Literal::Bool(b), Type::Bool),
            ast::Literal::Unit => (Literal::Unit, Type::Unit),
        }
    }

    /// Analyze literal
    fn analyze_literal(&mut self, lit: ast::Literal) -> Option<Expr> {
        let (lit_kind, ty) = self.lower_literal(lit);
        Some(Expr::Literal { lit: lit_kind, ty })
    }

    /// Analyze path expression. Tries the value namespace first (locals,
    /// parameters, captured closure variables), then the function
    /// namespace (a bare reference to a top-level function used as a
    /// value, e.g. passed to another call).
    fn analyze_path(&mut self, path: ast::Path) -> Option<Expr> {
        let name = path.segments.first()?.ident;

        if let Some(def_id) = self.scope_tree.resolve(name) {
            let ty = self.type_context.type_of_def(def_id).cloned().unwrap_or(Type::Error);
            return Some(Expr::Var { def_id, ty, span: path.span });
        }

        if let Some(def_id) = self.scope_tree.resolve_function(name) {
            let ty = self.type_context.type_of_def(def_id).cloned().unwrap_or(Type::Error);
            return Some(Expr::Var { def_id, ty, span: path.span });
        }

        self.diagnose(
            codes::P_UNRESOLVED_NAME,
            format!("cannot find value `{}` in this scope", name.as_str()),
            path.span,
        );
        None
    }

    /// Analyze binary expression
    fn analyze_binary(&mut self, expr: ast::BinaryExpr) -> Option<Expr> {
        let left = self.analyze_expr(*expr.left)?;
        let right = self.analyze_expr(*expr.right)?;

        let op = self.convert_binop(expr.op, expr.span)?;

        let ty = match op {
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::And | BinOp::Or => {
                Type::Bool
            },
            _ => common_numeric(&left.ty(), &right.ty()).unwrap_or_else(|| {
                self.unify_types(&left.ty(), &right.ty(), expr.span);
                left.ty()
            }),
        };

        Some(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    fn convert_binop(&self, op: ast::BinOp, _span: Span) -> Option<BinOp> {
        Some(match op {
            ast::BinOp::Add => BinOp::Add,
            ast::BinOp::Sub => BinOp::Sub,
            ast::BinOp::Mul => BinOp::Mul,
            ast::BinOp::Div => BinOp::Div,
            ast::BinOp::Mod => BinOp::Mod,
            ast::BinOp::Eq => BinOp::Eq,
            ast::BinOp::Ne => BinOp::Ne,
            ast::BinOp::Lt => BinOp::Lt,
            ast::BinOp::Gt => BinOp::Gt,
            ast::BinOp::Le => BinOp::Le,
            ast::BinOp::Ge => BinOp::Ge,
            ast::BinOp::And => BinOp::And,
            ast::BinOp::Or => BinOp::Or,
            ast::BinOp::BitAnd => BinOp::BitAnd,
            ast::BinOp::BitOr => BinOp::BitOr,
            ast::BinOp::BitXor => BinOp::BitXor,
            ast::BinOp::Shl => BinOp::Shl,
            ast::BinOp::Shr => BinOp::Shr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faxc_util::{DefIdGenerator, Handler, Symbol};

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    fn path1(name: &str) -> ast::Path {
        ast::Path { segments: vec![ast::PathSegment { ident: sym(name), args: None }], span: Span::DUMMY }
    }

    fn path_ty(name: &str) -> ast::Type {
        ast::Type::Path(path1(name))
    }

    fn lit_int(n: i64) -> ast::Expr {
        ast::Expr::Literal(ast::Literal::Int(n))
    }

    fn block(trailing: Option<ast::Expr>) -> ast::Block {
        ast::Block { stmts: Vec::new(), trailing: trailing.map(Box::new), span: Span::DUMMY }
    }

    fn fn_item(name: &str, params: Vec<ast::Param>, ret_type: Option<ast::Type>, body: ast::Block) -> ast::FnItem {
        ast::FnItem {
            name: sym(name),
            generics: Vec::new(),
            params,
            ret_type,
            body,
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
            async_kw: false,
            requires: Vec::new(),
            ensures: Vec::new(),
        }
    }

    fn field(name: &str, ty: ast::Type) -> ast::Field {
        ast::Field { name: sym(name), ty, visibility: ast::Visibility::Private }
    }

    /// A harness bundling the owned `TypeContext`/`DefIdGenerator`/`Handler`
    /// a `SemanticAnalyzer` borrows, so tests can build one in a single
    /// expression instead of juggling three locals plus the borrow.
    struct Harness {
        type_context: TypeContext,
        def_id_gen: DefIdGenerator,
        handler: Handler,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                type_context: TypeContext::default(),
                def_id_gen: DefIdGenerator::new(),
                handler: Handler::new(),
            }
        }

        fn analyzer(&mut self) -> SemanticAnalyzer<'_> {
            SemanticAnalyzer::new(&mut self.type_context, &self.def_id_gen, &mut self.handler)
        }
    }

    #[test]
    fn integer_literal_defaults_to_int() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let items = vec![ast::Item::Fn(fn_item("f", vec![], None, block(Some(lit_int(5)))))];
        let hir = a.analyze_items(items);
        assert!(!a.has_errors());
        let Item::Function(f) = &hir[0] else { panic!("expected function") };
        assert_eq!(f.body.value.ty(), Type::Int);
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let body = block(Some(ast::Expr::Path(path1("nonexistent"))));
        let items = vec![ast::Item::Fn(fn_item("f", vec![], None, body))];
        a.analyze_items(items);
        assert!(a.has_errors());
        assert!(h.handler.diagnostics().iter().any(|d| d.code == Some(codes::P_UNRESOLVED_NAME)));
    }

    #[test]
    fn binary_comparison_yields_bool() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let cmp = ast::Expr::Binary(ast::BinaryExpr {
            left: Box::new(lit_int(1)),
            op: ast::BinOp::Lt,
            right: Box::new(lit_int(2)),
            span: Span::DUMMY,
        });
        let items = vec![ast::Item::Fn(fn_item("f", vec![], None, block(Some(cmp))))];
        let hir = a.analyze_items(items);
        assert!(!a.has_errors());
        let Item::Function(f) = &hir[0] else { panic!("expected function") };
        assert_eq!(f.body.value.ty(), Type::Bool);
    }

    /// Spec §8 scenario 5: `@requires(1 == 2) fn f(): pass` reports a
    /// "precondition will always fail" diagnostic.
    #[test]
    fn requires_clause_that_always_fails_is_reported() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let always_false = ast::Expr::Binary(ast::BinaryExpr {
            left: Box::new(lit_int(1)),
            op: ast::BinOp::Eq,
            right: Box::new(lit_int(2)),
            span: Span::DUMMY,
        });
        let mut f = fn_item("f", vec![], None, block(None));
        f.requires.push(always_false);
        a.analyze_items(vec![ast::Item::Fn(f)]);
        assert!(a.has_errors());
        assert!(h.handler.diagnostics().iter().any(|d| d.code == Some(codes::P_CONTRACT_ALWAYS_FAILS)));
    }

    /// `@ensures(result == 2)` is satisfied by an always-`2` body, and
    /// `result` resolves to the return value rather than an unresolved name.
    #[test]
    fn ensures_clause_can_reference_result() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let result_eq_two = ast::Expr::Binary(ast::BinaryExpr {
            left: Box::new(ast::Expr::Path(path1("result"))),
            op: ast::BinOp::Eq,
            right: Box::new(lit_int(2)),
            span: Span::DUMMY,
        });
        let mut f = fn_item("f", vec![], None, block(Some(lit_int(2))));
        f.ensures.push(result_eq_two);
        a.analyze_items(vec![ast::Item::Fn(f)]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
    }

    #[test]
    fn return_type_mismatch_is_reported() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let ret = ast::Expr::Return(Some(Box::new(lit_int(1))));
        let items = vec![ast::Item::Fn(fn_item("f", vec![], Some(path_ty("bool")), block(Some(ret))))];
        a.analyze_items(items);
        assert!(a.has_errors());
        assert!(h.handler.diagnostics().iter().any(|d| d.code == Some(codes::P_TYPE_MISMATCH)));
    }

    #[test]
    fn struct_fields_resolve_by_name() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let struct_item = ast::Item::Struct(ast::StructItem {
            name: sym("Point"),
            generics: Vec::new(),
            fields: vec![field("x", path_ty("i64")), field("y", path_ty("i64"))],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        });
        // fn f(p: Point) -> i64 { p.x }
        let body = block(Some(ast::Expr::Field(ast::FieldExpr {
            object: Box::new(ast::Expr::Path(path1("p"))),
            field: sym("x"),
            span: Span::DUMMY,
        })));
        let f = ast::Item::Fn(fn_item(
            "f",
            vec![ast::Param { name: sym("p"), ty: path_ty("Point"), mutable: false }],
            Some(path_ty("i64")),
            body,
        ));
        let hir = a.analyze_items(vec![struct_item, f]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let Item::Function(func) = hir.iter().find(|i| matches!(i, Item::Function(f) if f.name == sym("f"))).unwrap() else {
            unreachable!()
        };
        assert_eq!(func.body.value.ty(), Type::Int);
    }

    #[test]
    fn unknown_field_on_struct_is_an_error() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let struct_item = ast::Item::Struct(ast::StructItem {
            name: sym("Point"),
            generics: Vec::new(),
            fields: vec![field("x", path_ty("i64"))],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        });
        let body = block(Some(ast::Expr::Field(ast::FieldExpr {
            object: Box::new(ast::Expr::Path(path1("p"))),
            field: sym("z"),
            span: Span::DUMMY,
        })));
        let f = ast::Item::Fn(fn_item(
            "f",
            vec![ast::Param { name: sym("p"), ty: path_ty("Point"), mutable: false }],
            None,
            body,
        ));
        a.analyze_items(vec![struct_item, f]);
        assert!(a.has_errors());
    }

    #[test]
    fn struct_literal_requires_every_declared_field() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let struct_item = ast::Item::Struct(ast::StructItem {
            name: sym("Point"),
            generics: Vec::new(),
            fields: vec![field("x", path_ty("i64")), field("y", path_ty("i64"))],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        });
        // Point { x: 1 } -- missing `y`.
        let lit = ast::Expr::StructLiteral(ast::StructLiteralExpr {
            path: path1("Point"),
            fields: vec![(sym("x"), lit_int(1))],
        });
        let f = ast::Item::Fn(fn_item("f", vec![], None, block(Some(lit))));
        a.analyze_items(vec![struct_item, f]);
        assert!(a.has_errors());
    }

    #[test]
    fn struct_literal_with_every_field_and_compatible_types_is_accepted() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let struct_item = ast::Item::Struct(ast::StructItem {
            name: sym("Point"),
            generics: Vec::new(),
            fields: vec![field("x", path_ty("i64")), field("y", path_ty("i64"))],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        });
        let lit = ast::Expr::StructLiteral(ast::StructLiteralExpr {
            path: path1("Point"),
            fields: vec![(sym("x"), lit_int(1)), (sym("y"), lit_int(2))],
        });
        let f = ast::Item::Fn(fn_item("f", vec![], None, block(Some(lit))));
        let hir = a.analyze_items(vec![struct_item, f]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let Item::Function(func) = &hir[1] else { panic!("expected function") };
        assert!(matches!(func.body.value.ty(), Type::Adt(_)));
    }

    #[test]
    fn enum_variant_constructor_resolves_payload_type() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let enum_item = ast::Item::Enum(ast::EnumItem {
            name: sym("Shape"),
            generics: Vec::new(),
            variants: vec![
                ast::Variant { name: sym("Circle"), data: ast::VariantData::Tuple(vec![path_ty("i64")]) },
                ast::Variant { name: sym("Point"), data: ast::VariantData::Unit },
            ],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        });
        // Shape.Circle(1)
        let call = ast::Expr::MethodCall(ast::MethodCallExpr {
            receiver: Box::new(ast::Expr::Path(path1("Shape"))),
            method: sym("Circle"),
            args: None,
            call_args: vec![lit_int(1)],
        });
        let f = ast::Item::Fn(fn_item("f", vec![], None, block(Some(call))));
        let hir = a.analyze_items(vec![enum_item, f]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let Item::Function(func) = hir.iter().find(|i| matches!(i, Item::Function(_))).unwrap() else {
            unreachable!()
        };
        assert!(matches!(func.body.value.ty(), Type::Adt(_)));
    }

    #[test]
    fn nullary_variant_field_access_resolves() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let enum_item = ast::Item::Enum(ast::EnumItem {
            name: sym("Shape"),
            generics: Vec::new(),
            variants: vec![ast::Variant { name: sym("Point"), data: ast::VariantData::Unit }],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        });
        // Shape.Point (bare field access on the type name)
        let access = ast::Expr::Field(ast::FieldExpr {
            object: Box::new(ast::Expr::Path(path1("Shape"))),
            field: sym("Point"),
            span: Span::DUMMY,
        });
        let f = ast::Item::Fn(fn_item("f", vec![], None, block(Some(access))));
        let hir = a.analyze_items(vec![enum_item, f]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let Item::Function(func) = hir.iter().find(|i| matches!(i, Item::Function(_))).unwrap() else {
            unreachable!()
        };
        assert!(matches!(func.body.value.ty(), Type::Adt(_)));
    }

    #[test]
    fn instance_method_call_dispatches_through_impl_table() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let struct_item = ast::Item::Struct(ast::StructItem {
            name: sym("Counter"),
            generics: Vec::new(),
            fields: vec![field("n", path_ty("i64"))],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        });
        // impl Counter { fn get(self) -> i64 { 0 } }
        let method = fn_item(
            "get",
            vec![ast::Param { name: sym("self"), ty: path_ty("Counter"), mutable: false }],
            Some(path_ty("i64")),
            block(Some(lit_int(0))),
        );
        let impl_item = ast::Item::Impl(ast::ImplItem {
            generics: Vec::new(),
            trait_ref: None,
            self_ty: path_ty("Counter"),
            items: vec![ast::ImplMember::Method(method)],
        });
        // fn f(c: Counter) -> i64 { c.get() }
        let call = ast::Expr::MethodCall(ast::MethodCallExpr {
            receiver: Box::new(ast::Expr::Path(path1("c"))),
            method: sym("get"),
            args: None,
            call_args: vec![],
        });
        let f = ast::Item::Fn(fn_item(
            "f",
            vec![ast::Param { name: sym("c"), ty: path_ty("Counter"), mutable: false }],
            Some(path_ty("i64")),
            block(Some(call)),
        ));
        let hir = a.analyze_items(vec![struct_item, impl_item, f]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let func = hir.iter().find_map(|i| match i {
            Item::Function(f) if f.name == sym("f") => Some(f),
            _ => None,
        }).unwrap();
        assert_eq!(func.body.value.ty(), Type::Int);
    }

    #[test]
    fn unresolved_method_on_value_is_an_error() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let struct_item = ast::Item::Struct(ast::StructItem {
            name: sym("Counter"),
            generics: Vec::new(),
            fields: vec![field("n", path_ty("i64"))],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        });
        let call = ast::Expr::MethodCall(ast::MethodCallExpr {
            receiver: Box::new(ast::Expr::Path(path1("c"))),
            method: sym("missing"),
            args: None,
            call_args: vec![],
        });
        let f = ast::Item::Fn(fn_item(
            "f",
            vec![ast::Param { name: sym("c"), ty: path_ty("Counter"), mutable: false }],
            None,
            block(Some(call)),
        ));
        a.analyze_items(vec![struct_item, f]);
        assert!(a.has_errors());
    }

    #[test]
    fn trait_impl_missing_method_is_reported() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let trait_item = ast::Item::Trait(ast::TraitItem {
            name: sym("Greet"),
            generics: Vec::new(),
            items: vec![ast::TraitMember::Method(ast::FnSig {
                name: sym("hello"),
                generics: Vec::new(),
                params: Vec::new(),
                ret_type: None,
            })],
            supertraits: Vec::new(),
            visibility: ast::Visibility::Private,
        });
        let struct_item = ast::Item::Struct(ast::StructItem {
            name: sym("Person"),
            generics: Vec::new(),
            fields: vec![],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        });
        // impl Greet for Person {} -- no methods provided.
        let impl_item = ast::Item::Impl(ast::ImplItem {
            generics: Vec::new(),
            trait_ref: Some(path_ty("Greet")),
            self_ty: path_ty("Person"),
            items: vec![],
        });
        a.analyze_items(vec![trait_item, struct_item, impl_item]);
        assert!(a.has_errors());
        assert!(h.handler.diagnostics().iter().any(|d| d.code == Some(codes::P_TRAIT_NOT_IMPLEMENTED)));
    }

    #[test]
    fn trait_impl_with_all_methods_is_accepted() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let trait_item = ast::Item::Trait(ast::TraitItem {
            name: sym("Greet"),
            generics: Vec::new(),
            items: vec![ast::TraitMember::Method(ast::FnSig {
                name: sym("hello"),
                generics: Vec::new(),
                params: Vec::new(),
                ret_type: None,
            })],
            supertraits: Vec::new(),
            visibility: ast::Visibility::Private,
        });
        let struct_item = ast::Item::Struct(ast::StructItem {
            name: sym("Person"),
            generics: Vec::new(),
            fields: vec![],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        });
        let impl_item = ast::Item::Impl(ast::ImplItem {
            generics: Vec::new(),
            trait_ref: Some(path_ty("Greet")),
            self_ty: path_ty("Person"),
            items: vec![ast::ImplMember::Method(fn_item("hello", vec![], None, block(None)))],
        });
        a.analyze_items(vec![trait_item, struct_item, impl_item]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
    }

    #[test]
    fn duplicate_function_definition_is_reported() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let items = vec![
            ast::Item::Fn(fn_item("f", vec![], None, block(None))),
            ast::Item::Fn(fn_item("f", vec![], None, block(None))),
        ];
        a.analyze_items(items);
        assert!(h.handler.diagnostics().iter().any(|d| d.code == Some(codes::P_DUPLICATE_DEF)));
    }

    #[test]
    fn function_and_type_namespaces_do_not_collide() {
        // A function and a struct may share a name (§3.3: distinct namespaces).
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let items = vec![
            ast::Item::Fn(fn_item("List", vec![], None, block(None))),
            ast::Item::Struct(ast::StructItem {
                name: sym("List"),
                generics: Vec::new(),
                fields: vec![],
                visibility: ast::Visibility::Private,
                span: Span::DUMMY,
            }),
        ];
        a.analyze_items(items);
        assert!(!h.handler.diagnostics().iter().any(|d| d.code == Some(codes::P_DUPLICATE_DEF)));
    }

    #[test]
    fn tuple_pattern_binds_element_types() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        // let (a, b) = (1, 2); a
        let tuple_init = ast::Expr::Tuple(vec![lit_int(1), lit_int(2)]);
        let let_stmt = ast::Stmt::Let(ast::LetStmt {
            pattern: ast::Pattern::Tuple(vec![
                ast::Pattern::Ident(sym("a"), ast::Mutability::Immutable),
                ast::Pattern::Ident(sym("b"), ast::Mutability::Immutable),
            ]),
            ty: None,
            init: Some(tuple_init),
        });
        let body = ast::Block {
            stmts: vec![let_stmt],
            trailing: Some(Box::new(ast::Expr::Path(path1("a")))),
            span: Span::DUMMY,
        };
        let f = ast::Item::Fn(fn_item("f", vec![], None, body));
        let hir = a.analyze_items(vec![f]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let Item::Function(func) = &hir[0] else { panic!("expected function") };
        assert_eq!(func.body.value.ty(), Type::Int);
    }

    #[test]
    fn match_arm_or_pattern_binds_in_each_alternative() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        // match 1 { 1 | 2 => true, _ => false }
        let match_expr = ast::Expr::Match(ast::MatchExpr {
            scrutinee: Box::new(lit_int(1)),
            arms: vec![
                ast::MatchArm {
                    pattern: ast::Pattern::Or(vec![
                        ast::Pattern::Literal(ast::Literal::Int(1)),
                        ast::Pattern::Literal(ast::Literal::Int(2)),
                    ]),
                    guard: None,
                    body: ast::Expr::Literal(ast::Literal::Bool(true)),
                },
                ast::MatchArm {
                    pattern: ast::Pattern::Wildcard,
                    guard: None,
                    body: ast::Expr::Literal(ast::Literal::Bool(false)),
                },
            ],
        });
        let f = ast::Item::Fn(fn_item("f", vec![], None, block(Some(match_expr))));
        let hir = a.analyze_items(vec![f]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let Item::Function(func) = &hir[0] else { panic!("expected function") };
        assert_eq!(func.body.value.ty(), Type::Bool);
    }

    #[test]
    fn match_arms_of_incompatible_type_are_reported() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let match_expr = ast::Expr::Match(ast::MatchExpr {
            scrutinee: Box::new(lit_int(1)),
            arms: vec![
                ast::MatchArm {
                    pattern: ast::Pattern::Wildcard,
                    guard: None,
                    body: ast::Expr::Literal(ast::Literal::Bool(true)),
                },
                ast::MatchArm {
                    pattern: ast::Pattern::Literal(ast::Literal::Int(1)),
                    guard: None,
                    body: lit_int(2),
                },
            ],
        });
        let f = ast::Item::Fn(fn_item("f", vec![], None, block(Some(match_expr))));
        a.analyze_items(vec![f]);
        assert!(a.has_errors());
    }

    #[test]
    fn generic_function_parameter_resolves_as_type_var() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        // fn identity<T>(x: T) -> T { x }
        let body = block(Some(ast::Expr::Path(path1("x"))));
        let f = ast::FnItem {
            name: sym("identity"),
            generics: vec![ast::GenericParam { name: sym("T"), bounds: Vec::new() }],
            params: vec![ast::Param { name: sym("x"), ty: path_ty("T"), mutable: false }],
            ret_type: Some(path_ty("T")),
            body,
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
            async_kw: false,
            requires: Vec::new(),
            ensures: Vec::new(),
        };
        let hir = a.analyze_items(vec![ast::Item::Fn(f)]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let Item::Function(func) = &hir[0] else { panic!("expected function") };
        assert_eq!(func.body.value.ty(), Type::TypeVar(sym("T")));
    }

    #[test]
    fn unknown_type_name_falls_back_to_error_type() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let f = fn_item("f", vec![ast::Param { name: sym("x"), ty: path_ty("Bogus"), mutable: false }], None, block(None));
        a.analyze_items(vec![ast::Item::Fn(f)]);
        assert!(a.has_errors());
        assert!(h.handler.diagnostics().iter().any(|d| d.code == Some(codes::P_UNKNOWN_TYPE)));
    }

    #[test]
    fn cast_to_non_scalar_type_is_rejected() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let struct_item = ast::Item::Struct(ast::StructItem {
            name: sym("Point"),
            generics: Vec::new(),
            fields: vec![field("x", path_ty("i64"))],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        });
        let cast = ast::Expr::Cast(Box::new(lit_int(1)), path_ty("Point"));
        let f = ast::Item::Fn(fn_item("f", vec![], None, block(Some(cast))));
        a.analyze_items(vec![struct_item, f]);
        assert!(a.has_errors());
    }

    #[test]
    fn deref_of_reference_yields_inner_type() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        // fn f(x: &i64) -> i64 { *x }
        let deref = ast::Expr::Unary(ast::UnaryExpr {
            op: ast::UnOp::Deref,
            expr: Box::new(ast::Expr::Path(path1("x"))),
            span: Span::DUMMY,
        });
        let f = fn_item(
            "f",
            vec![ast::Param { name: sym("x"), ty: ast::Type::Reference(Box::new(path_ty("i64")), ast::Mutability::Immutable), mutable: false }],
            Some(path_ty("i64")),
            block(Some(deref)),
        );
        let hir = a.analyze_items(vec![ast::Item::Fn(f)]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let Item::Function(func) = &hir[0] else { panic!("expected function") };
        assert_eq!(func.body.value.ty(), Type::Int);
    }

    #[test]
    fn reference_expression_wraps_operand_type() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let r = ast::Expr::Unary(ast::UnaryExpr {
            op: ast::UnOp::Ref(false),
            expr: Box::new(lit_int(1)),
            span: Span::DUMMY,
        });
        let f = ast::Item::Fn(fn_item("f", vec![], None, block(Some(r))));
        let hir = a.analyze_items(vec![f]);
        assert!(!a.has_errors());
        let Item::Function(func) = &hir[0] else { panic!("expected function") };
        assert_eq!(func.body.value.ty(), Type::Ref(Box::new(Type::Int), false));
    }

    /// Spec §8 scenario 6: `fn f() -> Option[int]: return Option.None` has
    /// no errors, and the returned `Option.None` infers to `Option[int]`
    /// (not a bare, unparameterized `Option`) via the function's declared
    /// return type.
    #[test]
    fn bare_none_variant_promotes_to_return_type() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let none_expr = ast::Expr::Field(ast::FieldExpr {
            object: Box::new(ast::Expr::Path(path1("Option"))),
            field: sym("None"),
            span: Span::DUMMY,
        });
        let ret_expr = ast::Expr::Return(Some(Box::new(none_expr)));
        let ret_ty = ast::Type::Generic(Box::new(path_ty("Option")), vec![path_ty("i64")]);
        let f = fn_item("f", vec![], Some(ret_ty), block(Some(ret_expr)));
        let hir = a.analyze_items(vec![ast::Item::Fn(f)]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let Item::Function(func) = &hir[0] else { panic!("expected function") };
        let Expr::Block { expr: Some(trailing), .. } = &func.body.value else {
            panic!("expected a block body, got {:?}", func.body.value);
        };
        let Expr::Return(Some(ret_val)) = trailing.as_ref() else {
            panic!("expected a return expression, got {:?}", trailing);
        };
        assert_eq!(ret_val.ty(), Type::Option(Box::new(Type::Int)));
    }

    /// `Option.Some(1)` infers its payload type from the argument directly,
    /// without needing an expected-type fallback.
    #[test]
    fn some_variant_infers_payload_type_from_argument() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        let some_expr = ast::Expr::MethodCall(ast::MethodCallExpr {
            receiver: Box::new(ast::Expr::Path(path1("Option"))),
            method: sym("Some"),
            args: None,
            call_args: vec![lit_int(1)],
        });
        let f = fn_item("f", vec![], None, block(Some(some_expr)));
        let hir = a.analyze_items(vec![ast::Item::Fn(f)]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let Item::Function(func) = &hir[0] else { panic!("expected function") };
        assert_eq!(func.body.value.ty(), Type::Option(Box::new(Type::Int)));
    }

    fn shape_enum() -> ast::Item {
        ast::Item::Enum(ast::EnumItem {
            name: sym("Shape"),
            generics: Vec::new(),
            variants: vec![
                ast::Variant { name: sym("Circle"), data: ast::VariantData::Tuple(vec![path_ty("i64")]) },
                ast::Variant { name: sym("Point"), data: ast::VariantData::Unit },
            ],
            visibility: ast::Visibility::Private,
            span: Span::DUMMY,
        })
    }

    #[test]
    fn match_covering_every_variant_is_exhaustive() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        // match s { Circle(r) => r, Point => 0 }
        let match_expr = ast::Expr::Match(ast::MatchExpr {
            scrutinee: Box::new(ast::Expr::Path(path1("s"))),
            arms: vec![
                ast::MatchArm {
                    pattern: ast::Pattern::TupleStruct(path1("Circle"), vec![
                        ast::Pattern::Ident(sym("r"), ast::Mutability::Immutable),
                    ]),
                    guard: None,
                    body: ast::Expr::Path(path1("r")),
                },
                ast::MatchArm {
                    pattern: ast::Pattern::Path(path1("Point")),
                    guard: None,
                    body: lit_int(0),
                },
            ],
        });
        let f = ast::Item::Fn(fn_item(
            "f",
            vec![ast::Param { name: sym("s"), ty: path_ty("Shape"), mutable: false }],
            Some(path_ty("i64")),
            block(Some(match_expr)),
        ));
        let hir = a.analyze_items(vec![shape_enum(), f]);
        assert!(!a.has_errors(), "unexpected errors: {:?}", h.handler.diagnostics());
        let _ = hir;
    }

    #[test]
    fn match_missing_a_variant_is_non_exhaustive() {
        let mut h = Harness::new();
        let mut a = h.analyzer();
        // match s { Circle(r) => r } -- `Point` is not covered, no wildcard.
        let match_expr = ast::Expr::Match(ast::MatchExpr {
            scrutinee: Box::new(ast::Expr::Path(path1("s"))),
            arms: vec![ast::MatchArm {
                pattern: ast::Pattern::TupleStruct(path1("Circle"), vec![
                    ast::Pattern::Ident(sym("r"), ast::Mutability::Immutable),
                ]),
                guard: None,
                body: ast::Expr::Path(path1("r")),
            }],
        });
        let f = ast::Item::Fn(fn_item(
            "f",
            vec![ast::Param { name: sym("s"), ty: path_ty("Shape"), mutable: false }],
            Some(path_ty("i64")),
            block(Some(match_expr)),
        ));
        a.analyze_items(vec![shape_enum(), f]);
        assert!(a.has_errors());
        assert!(h.handler.diagnostics().iter().any(|d| d.code == Some(codes::P_NONEXHAUSTIVE)));
    }
}
