//! Move/ownership analysis.
//!
//! Walks a type-checked function body and tracks which local values have
//! been moved, flagging any later use of an already-moved value. Values of
//! `Copy` types (see `Type::is_copy`) are never tracked as moved — reading
//! one again is always legal.
//!
//! Branches (the arms of `if`/`match`) are analyzed independently from a
//! clone of the state on entry, then merged: a value counts as moved after
//! the join if it was moved on *any* branch. This is conservative (it may
//! reject programs that always move the same branch) but never accepts a
//! double move.

use crate::codes;
use crate::hir::*;
use crate::types::{is_copy, Type};
use faxc_util::diagnostic::DiagnosticBuilder;
use faxc_util::{DefId, FxHashMap, FxHashSet, Handler, Span, Symbol};

/// What we know about one local value.
#[derive(Debug, Clone)]
pub struct ValueInfo {
    pub def_id: DefId,
    pub name: Symbol,
    pub ty: Type,
    /// Span of the declaration/binding, used in "value declared here" notes.
    pub declared_at: Span,
    /// Set if the whole value has been moved.
    pub moved_at: Option<Span>,
    /// `DefId`s of struct fields that have been individually moved out
    /// (partial move), even though the base value is still otherwise valid.
    pub moved_fields: FxHashSet<DefId>,
}

impl ValueInfo {
    fn new(def_id: DefId, name: Symbol, ty: Type, declared_at: Span) -> Self {
        Self {
            def_id,
            name,
            ty,
            declared_at,
            moved_at: None,
            moved_fields: FxHashSet::default(),
        }
    }
}

/// Ownership state for one function, or one branch of it.
#[derive(Debug, Clone, Default)]
pub struct OwnershipState {
    values: FxHashMap<DefId, ValueInfo>,
}

impl OwnershipState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly-bound local. Re-binding (e.g. shadowing, or
    /// re-entering a loop body) simply resets its move state.
    pub fn declare(&mut self, def_id: DefId, name: Symbol, ty: Type, span: Span) {
        self.values.insert(def_id, ValueInfo::new(def_id, name, ty, span));
    }

    pub fn get(&self, def_id: DefId) -> Option<&ValueInfo> {
        self.values.get(&def_id)
    }

    /// Is `def_id` (or, if given, one specific field of it) still owned?
    /// Unknown values (not declared in this state — e.g. globals, function
    /// parameters analyzed before their declare() ran) are conservatively
    /// considered owned rather than flagged.
    pub fn is_owned(&self, def_id: DefId, field: Option<DefId>) -> bool {
        match self.values.get(&def_id) {
            None => true,
            Some(info) => {
                if info.moved_at.is_some() {
                    return false;
                }
                match field {
                    Some(f) => !info.moved_fields.contains(&f),
                    None => true,
                }
            },
        }
    }

    pub fn is_owned_field(&self, def_id: DefId, field: DefId) -> bool {
        self.is_owned(def_id, Some(field))
    }

    /// Mark a value (or one of its fields) as moved. Copy types should never
    /// reach this — callers check `ty.is_copy()` first.
    pub fn mark_moved(&mut self, def_id: DefId, span: Span, field: Option<DefId>) {
        if let Some(info) = self.values.get_mut(&def_id) {
            match field {
                Some(f) => {
                    info.moved_fields.insert(f);
                },
                None => {
                    info.moved_at = Some(span);
                },
            }
        }
    }

    /// Conservative union of several branch states: a value is moved after
    /// the join if it was moved on any branch.
    pub fn merge(branches: &[OwnershipState]) -> OwnershipState {
        let mut out = OwnershipState::new();
        for branch in branches {
            for (def_id, info) in &branch.values {
                let entry = out
                    .values
                    .entry(*def_id)
                    .or_insert_with(|| ValueInfo::new(info.def_id, info.name, info.ty.clone(), info.declared_at));
                if info.moved_at.is_some() {
                    entry.moved_at = info.moved_at;
                }
                entry.moved_fields.extend(info.moved_fields.iter().copied());
            }
        }
        out
    }
}

/// Walks a function body, reporting use-after-move errors through `handler`.
pub struct OwnershipAnalyzer<'a> {
    state: OwnershipState,
    handler: &'a mut Handler,
    error_count: usize,
    /// Nesting depth of `unsafe` blocks; use-after-move is not reported
    /// while this is above zero (§4.5 — raw-pointer code is expected to
    /// step outside the ordinary move rules).
    unsafe_depth: u32,
}

impl<'a> OwnershipAnalyzer<'a> {
    pub fn new(handler: &'a mut Handler) -> Self {
        Self {
            state: OwnershipState::new(),
            handler,
            error_count: 0,
            unsafe_depth: 0,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    fn error(&mut self, code: faxc_util::diagnostic::DiagnosticCode, message: impl Into<String>, span: Span) {
        self.error_count += 1;
        DiagnosticBuilder::error(message).code(code).span(span).emit(&self.handler);
    }

    /// Analyze one function's body. `params` are bound as already-owned
    /// values before the body is walked.
    pub fn analyze_function(&mut self, fn_item: &FnItem) {
        self.state = OwnershipState::new();
        for param in &fn_item.params {
            self.declare_pattern(&param.pat, &param.ty, Span::DUMMY);
        }
        self.analyze_expr(&fn_item.body.value);
    }

    fn declare_pattern(&mut self, pat: &Pattern, ty: &Type, span: Span) {
        match pat {
            Pattern::Binding { def_id, name, ty: bind_ty, .. } => {
                self.state.declare(*def_id, *name, bind_ty.clone(), span);
            },
            Pattern::Tuple { pats } => {
                for p in pats {
                    self.declare_pattern(p, ty, span);
                }
            },
            Pattern::Struct { fields, .. } => {
                for f in fields {
                    self.declare_pattern(&f.pat, ty, span);
                }
            },
            Pattern::Variant { subpatterns, .. } => {
                for p in subpatterns {
                    self.declare_pattern(p, ty, span);
                }
            },
            Pattern::Ref { pat, .. } => self.declare_pattern(pat, ty, span),
            Pattern::Or(pats) => {
                for p in pats {
                    self.declare_pattern(p, ty, span);
                }
            },
            Pattern::Range(lo, hi) => {
                self.declare_pattern(lo, ty, span);
                self.declare_pattern(hi, ty, span);
            },
            Pattern::Literal(_) | Pattern::Wildcard | Pattern::Path { .. } => {},
        }
    }

    /// Analyze a block of statements; returns whether control falls through
    /// with a value (unused by callers today, kept symmetrical with
    /// `analyze_expr`).
    fn analyze_block(&mut self, stmts: &[Stmt], tail: Option<&Expr>) {
        for stmt in stmts {
            self.analyze_stmt(stmt);
        }
        if let Some(tail) = tail {
            self.analyze_expr(tail);
        }
    }

    fn analyze_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { pat, ty, init } => {
                if let Some(init) = init {
                    self.analyze_expr(init);
                }
                self.declare_pattern(pat, ty, Span::DUMMY);
            },
            Stmt::Expr(expr) => {
                self.analyze_expr(expr);
            },
            Stmt::While { cond, body, .. } => {
                self.analyze_expr(cond);
                let base = self.state.clone();
                self.analyze_expr(body);
                self.state = base;
            },
            Stmt::For { pat, iter, body, .. } => {
                self.analyze_expr(iter);
                let base = self.state.clone();
                self.declare_pattern(pat, &iter.ty(), Span::DUMMY);
                self.analyze_expr(body);
                self.state = base;
            },
            Stmt::Defer(body) => {
                // Validate moves at the defer site itself, not at the
                // (unknown) point the deferred code actually runs.
                self.analyze_stmt(body);
            },
            Stmt::With { def_id, name, ty, value, body } => {
                self.analyze_expr(value);
                self.state.declare(*def_id, *name, ty.clone(), Span::DUMMY);
                self.analyze_expr(body);
            },
            Stmt::Unsafe(body) => {
                self.unsafe_depth += 1;
                self.analyze_expr(body);
                self.unsafe_depth -= 1;
            },
        }
    }

    /// Analyze an expression. Returns `true` if evaluating it moves its own
    /// identity out (this only matters for the bare `Expr::Var` case — a
    /// plain read of a non-Copy local moves it, same as the original
    /// ownership checker's `analyze_expression`).
    fn analyze_expr(&mut self, expr: &Expr) -> bool {
        match expr {
            Expr::Literal { .. } => false,
            Expr::Var { def_id, ty, span } => {
                if is_copy(ty) {
                    return false;
                }
                if !self.state.is_owned(*def_id, None) {
                    if self.unsafe_depth == 0 {
                        if let Some(info) = self.state.get(*def_id) {
                            self.error(
                                codes::P_USE_AFTER_MOVE,
                                format!("use of moved value: `{}`", info.name.as_str()),
                                *span,
                            );
                        }
                    }
                    return false;
                }
                self.state.mark_moved(*def_id, *span, None);
                true
            },
            Expr::Binary { left, right, .. } => {
                self.analyze_expr(left);
                self.analyze_expr(right);
                false
            },
            Expr::Unary { op, expr, .. } => {
                // `&x` / `&mut x` borrow, never move.
                if matches!(op, UnOp::Ref(_)) {
                    self.analyze_expr_no_move(expr);
                } else {
                    self.analyze_expr(expr);
                }
                false
            },
            Expr::Call { func, args, is_builtin_print, .. } => {
                self.analyze_expr_no_move(func);
                for arg in args {
                    // §4.5: "the built-in print is treated as a pure read:
                    // its arguments are not moved."
                    if *is_builtin_print {
                        self.analyze_expr_no_move(arg);
                    } else {
                        self.analyze_expr(arg);
                    }
                }
                false
            },
            Expr::MethodCall { receiver, args, .. } => {
                self.analyze_expr_no_move(receiver);
                for arg in args {
                    self.analyze_expr(arg);
                }
                false
            },
            Expr::Field { object, field, ty } => {
                if let Expr::Var { def_id, span, .. } = object.as_ref() {
                    // The whole value may have been moved wholesale (e.g.
                    // `consume(d); d.v`) regardless of whether the *field*
                    // being accessed happens to be Copy — §8 scenario 2
                    // requires `P0234` here even though `v: int` is Copy.
                    if !self.state.is_owned(*def_id, None) {
                        if self.unsafe_depth == 0 {
                            if let Some(info) = self.state.get(*def_id) {
                                self.error(
                                    codes::P_USE_AFTER_MOVE,
                                    format!("use of moved value: `{}`", info.name.as_str()),
                                    *span,
                                );
                            }
                        }
                        return false;
                    }
                    // Only a non-Copy field can ever have been recorded as
                    // partially moved (§4.5 only marks non-Copy fields), so
                    // this check is gated on field Copy-ness.
                    if !is_copy(ty) {
                        let owned = self.state.is_owned_field(*def_id, *field);
                        if !owned {
                            self.error(
                                codes::P_USE_AFTER_PARTIAL_MOVE,
                                "use of partially moved value",
                                *span,
                            );
                            return false;
                        }
                    }
                } else {
                    self.analyze_expr_no_move(object);
                }
                false
            },
            Expr::Block { stmts, expr, .. } => {
                self.analyze_block(stmts, expr.as_deref());
                false
            },
            Expr::If { cond, then_expr, else_expr, .. } => {
                self.analyze_expr(cond);
                let base = self.state.clone();
                self.analyze_expr(then_expr);
                let then_state = std::mem::replace(&mut self.state, base.clone());
                if let Some(else_expr) = else_expr {
                    self.analyze_expr(else_expr);
                }
                let else_state = std::mem::replace(&mut self.state, base);
                self.state = OwnershipState::merge(&[then_state, else_state]);
                false
            },
            Expr::Match { scrutinee, arms, .. } => {
                self.analyze_expr(scrutinee);
                let base = self.state.clone();
                let mut branch_states = Vec::with_capacity(arms.len());
                for arm in arms {
                    self.state = base.clone();
                    self.declare_pattern(&arm.pat, &scrutinee.ty(), Span::DUMMY);
                    if let Some(guard) = &arm.guard {
                        self.analyze_expr(guard);
                    }
                    self.analyze_expr(&arm.body);
                    branch_states.push(std::mem::take(&mut self.state));
                }
                self.state = OwnershipState::merge(&branch_states);
                false
            },
            Expr::Assign { place, value } => {
                self.analyze_expr(value);
                // Re-assigning a place restores ownership of it (the old
                // value, if any, is dropped — no move of the place itself).
                if let Expr::Var { def_id, ty, span } = place.as_ref() {
                    self.state.declare(*def_id, Symbol::intern("<assigned>"), ty.clone(), *span);
                }
                false
            },
            Expr::Return(value) | Expr::Break(value, _) => {
                if let Some(value) = value {
                    self.analyze_expr(value);
                }
                false
            },
            Expr::Continue(_) => false,
            Expr::Async { body, .. } => {
                self.analyze_expr(body);
                false
            },
            Expr::Await { expr, .. } => {
                self.analyze_expr(expr);
                false
            },
            Expr::Cast { expr, .. } => {
                self.analyze_expr(expr);
                false
            },
            Expr::Tuple { elements, .. } | Expr::Array { elements, .. } => {
                for e in elements {
                    self.analyze_expr(e);
                }
                false
            },
            Expr::Index { object, index, .. } => {
                self.analyze_expr_no_move(object);
                self.analyze_expr(index);
                false
            },
            Expr::Range { lo, hi, .. } => {
                if let Some(lo) = lo {
                    self.analyze_expr(lo);
                }
                if let Some(hi) = hi {
                    self.analyze_expr(hi);
                }
                false
            },
            Expr::Closure { params, body, is_runtime, captures, .. } => {
                if *is_runtime {
                    // A runtime closure captures its free variables by
                    // value at creation time: each capture must still be
                    // owned right now.
                    for def_id in captures {
                        if !self.state.is_owned(*def_id, None) {
                            if let Some(info) = self.state.get(*def_id) {
                                self.error(
                                    codes::P_USE_AFTER_MOVE,
                                    format!("closure captures already-moved value: `{}`", info.name.as_str()),
                                    Span::DUMMY,
                                );
                            }
                        } else if let Some(info) = self.state.get(*def_id) {
                            if !is_copy(&info.ty) {
                                self.state.mark_moved(*def_id, Span::DUMMY, None);
                            }
                        }
                    }
                }
                let base = self.state.clone();
                for param in params {
                    self.declare_pattern(param, &Type::Infer(crate::types::InferId(0)), Span::DUMMY);
                }
                self.analyze_expr(body);
                self.state = base;
                false
            },
            Expr::StructLiteral { fields, .. } => {
                for (_, value) in fields {
                    self.analyze_expr(value);
                }
                false
            },
            Expr::EnumVariant { args, .. } => {
                for arg in args {
                    self.analyze_expr(arg);
                }
                false
            },
            Expr::Try { expr, .. } => {
                self.analyze_expr(expr);
                false
            },
            Expr::Old { expr, .. } => {
                // `old(e)` only appears in postconditions, evaluated
                // conceptually at function entry; never moves.
                self.analyze_expr_no_move(expr);
                false
            },
            Expr::Quantifier { collection, predicate, .. } => {
                self.analyze_expr_no_move(collection);
                self.analyze_expr_no_move(predicate);
                false
            },
        }
    }

    /// Like `analyze_expr`, but for positions that only ever read through a
    /// place (callee of a call, receiver of a method call, indexed object,
    /// `&`/`&mut` operand) — these never move the base value themselves.
    fn analyze_expr_no_move(&mut self, expr: &Expr) {
        match expr {
            Expr::Var { .. } => {},
            _ => {
                self.analyze_expr(expr);
            },
        }
    }
}
