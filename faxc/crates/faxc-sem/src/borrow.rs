//! Borrow checking.
//!
//! Enforces aliasing XOR mutability over local variables: a new exclusive
//! (`&mut`) borrow conflicts with *any* existing borrow of the same place; a
//! new shared (`&`) borrow conflicts only with an existing exclusive borrow.
//!
//! Borrow state is scoped: entering an `if`/`match`/loop body pushes a
//! child `BorrowState` linked to its parent; `get_active_borrows` walks the
//! parent chain so a borrow taken before the branch is still visible inside
//! it, but the child's own borrows are discarded at scope exit — they never
//! escape the branch that created them. This conservatively rejects some
//! valid programs (a borrow that provably ends before the branch closes)
//! but never accepts two live exclusive borrows of the same place.

use crate::codes;
use crate::hir::*;
use faxc_util::diagnostic::DiagnosticBuilder;
use faxc_util::{DefId, Handler, Span};

/// One live borrow of a local variable.
#[derive(Debug, Clone, Copy)]
pub struct Borrow {
    pub variable: DefId,
    pub mutable: bool,
    pub span: Span,
    /// Span of the most recent use (reborrow or conflict check) of this
    /// borrow, updated every time it is consulted. Starts equal to `span`.
    pub last_use_span: Span,
}

/// A scope's set of active borrows, linked to its parent so lookups walk
/// outward through enclosing scopes.
#[derive(Debug, Clone, Default)]
pub struct BorrowState {
    active_borrows: Vec<Borrow>,
    parent: Option<Box<BorrowState>>,
}

impl BorrowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&self) -> BorrowState {
        BorrowState {
            active_borrows: Vec::new(),
            parent: Some(Box::new(self.clone())),
        }
    }

    pub fn add_borrow(&mut self, variable: DefId, mutable: bool, span: Span) {
        self.active_borrows.push(Borrow { variable, mutable, span, last_use_span: span });
    }

    /// Records a fresh use of every active borrow of `variable` visible from
    /// this scope (including ones inherited from enclosing scopes), so later
    /// conflict diagnostics can point at where the borrow was last touched
    /// rather than only where it was first taken.
    pub fn touch(&mut self, variable: DefId, span: Span) {
        for b in self.active_borrows.iter_mut().filter(|b| b.variable == variable) {
            b.last_use_span = span;
        }
        if let Some(parent) = &mut self.parent {
            parent.touch(variable, span);
        }
    }

    /// All borrows of `variable` visible from this scope, innermost first.
    pub fn borrows_of(&self, variable: DefId) -> Vec<Borrow> {
        let mut out: Vec<Borrow> = self
            .active_borrows
            .iter()
            .copied()
            .filter(|b| b.variable == variable)
            .collect();
        if let Some(parent) = &self.parent {
            out.extend(parent.borrows_of(variable));
        }
        out
    }

    /// Returns the first conflicting borrow, if any, of taking a new borrow
    /// of `variable` with the given mutability.
    pub fn check_conflict(&self, variable: DefId, mutable: bool) -> Option<Borrow> {
        self.borrows_of(variable)
            .into_iter()
            .find(|existing| mutable || existing.mutable)
    }

    /// Drop every borrow of `variable` taken in *this* scope (used when a
    /// borrow's lexical lifetime ends, e.g. at the end of the statement
    /// that created a temporary reference).
    pub fn end_borrow(&mut self, variable: DefId) {
        self.active_borrows.retain(|b| b.variable != variable);
    }
}

/// Walks a function body enforcing the aliasing rule, reporting conflicts
/// through `handler`.
pub struct BorrowChecker<'a> {
    state: BorrowState,
    handler: &'a mut Handler,
    error_count: usize,
}

impl<'a> BorrowChecker<'a> {
    pub fn new(handler: &'a mut Handler) -> Self {
        Self {
            state: BorrowState::new(),
            handler,
            error_count: 0,
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

    /// Like `error`, but attaches a note pointing at the conflicting
    /// borrow's most recent use so the diagnostic doesn't just say a
    /// conflict exists, it shows where the other borrow is live from.
    fn error_conflict(
        &mut self,
        code: faxc_util::diagnostic::DiagnosticCode,
        message: impl Into<String>,
        span: Span,
        conflict: Borrow,
    ) {
        self.error_count += 1;
        DiagnosticBuilder::error(message)
            .code(code)
            .span(span)
            .note(format!(
                "the conflicting borrow was last used at line {}, column {}",
                conflict.last_use_span.line, conflict.last_use_span.column
            ))
            .emit(&self.handler);
    }

    pub fn check_function(&mut self, fn_item: &FnItem) {
        self.state = BorrowState::new();
        self.check_expr(&fn_item.body.value);
    }

    fn check_block(&mut self, stmts: &[Stmt], tail: Option<&Expr>) {
        for stmt in stmts {
            self.check_stmt(stmt);
        }
        if let Some(tail) = tail {
            self.check_expr(tail);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { init, .. } => {
                if let Some(init) = init {
                    self.check_expr(init);
                }
            },
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            },
            Stmt::While { cond, body, .. } => {
                self.check_expr(cond);
                let saved = self.state.clone();
                self.state = saved.enter_scope();
                self.check_expr(body);
                self.state = saved;
            },
            Stmt::For { iter, body, .. } => {
                self.check_expr(iter);
                let saved = self.state.clone();
                self.state = saved.enter_scope();
                self.check_expr(body);
                self.state = saved;
            },
            Stmt::Defer(body) => {
                self.check_stmt(body);
            },
            Stmt::With { value, body, .. } => {
                self.check_expr(value);
                let saved = self.state.clone();
                self.state = saved.enter_scope();
                self.check_expr(body);
                self.state = saved;
            },
            Stmt::Unsafe(body) => {
                // Raw-pointer code inside `unsafe` is allowed to alias
                // freely; still walk it so nested safe blocks are checked.
                let saved = self.state.clone();
                self.state = BorrowState::new();
                self.check_expr(body);
                self.state = saved;
            },
        }
    }

    /// Checks an assignment target: a place that currently has any active
    /// borrow cannot be written through directly (spec analogue of "cannot
    /// assign to `x` because it is borrowed").
    fn check_assign_target(&mut self, place: &Expr) {
        if let Expr::Var { def_id, span, .. } = place {
            if let Some(conflict) = self.state.check_conflict(*def_id, true) {
                self.error_conflict(
                    codes::P_ASSIGN_WHILE_BORROWED,
                    "cannot assign: value is currently borrowed",
                    *span,
                    conflict,
                );
            }
        }
    }

    fn check_immutable_borrow(&mut self, def_id: DefId, span: Span) {
        if let Some(conflict) = self.state.check_conflict(def_id, false) {
            self.state.touch(def_id, span);
            self.error_conflict(
                codes::P_SHARED_BORROW_WHILE_MUT,
                "cannot borrow as immutable because it is also borrowed as mutable",
                span,
                conflict,
            );
            return;
        }
        self.state.add_borrow(def_id, false, span);
    }

    fn check_mutable_borrow(&mut self, def_id: DefId, span: Span) {
        if let Some(conflict) = self.state.check_conflict(def_id, true) {
            self.state.touch(def_id, span);
            if conflict.mutable {
                self.error_conflict(
                    codes::P_DOUBLE_MUTABLE_BORROW,
                    "cannot borrow as mutable more than once at a time",
                    span,
                    conflict,
                );
            } else {
                self.error_conflict(
                    codes::P_MUT_BORROW_WHILE_SHARED,
                    "cannot borrow as mutable because it is also borrowed as immutable",
                    span,
                    conflict,
                );
            }
            return;
        }
        self.state.add_borrow(def_id, true, span);
    }

    fn check_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { .. } | Expr::Var { .. } | Expr::Continue(_) => {},
            Expr::Unary { op, expr: inner, .. } => match op {
                UnOp::Ref(mutable) => {
                    if let Expr::Var { def_id, span, .. } = inner.as_ref() {
                        if *mutable {
                            self.check_mutable_borrow(*def_id, *span);
                        } else {
                            self.check_immutable_borrow(*def_id, *span);
                        }
                    } else {
                        self.check_expr(inner);
                    }
                },
                _ => self.check_expr(inner),
            },
            Expr::Binary { left, right, .. } => {
                self.check_expr(left);
                self.check_expr(right);
            },
            Expr::Call { func, args, .. } => {
                self.check_expr(func);
                for arg in args {
                    self.check_expr(arg);
                }
            },
            Expr::MethodCall { receiver, args, .. } => {
                self.check_expr(receiver);
                for arg in args {
                    self.check_expr(arg);
                }
            },
            Expr::Field { object, .. } => self.check_expr(object),
            Expr::Block { stmts, expr, .. } => {
                let saved = std::mem::replace(&mut self.state, self.state.enter_scope());
                self.check_block(stmts, expr.as_deref());
                self.state = saved;
            },
            Expr::If { cond, then_expr, else_expr, .. } => {
                self.check_expr(cond);
                let saved = self.state.clone();
                self.state = saved.enter_scope();
                self.check_expr(then_expr);
                self.state = saved.clone();
                if let Some(else_expr) = else_expr {
                    self.state = saved.enter_scope();
                    self.check_expr(else_expr);
                }
                self.state = saved;
            },
            Expr::Match { scrutinee, arms, .. } => {
                self.check_expr(scrutinee);
                let saved = self.state.clone();
                for arm in arms {
                    self.state = saved.enter_scope();
                    if let Some(guard) = &arm.guard {
                        self.check_expr(guard);
                    }
                    self.check_expr(&arm.body);
                }
                self.state = saved;
            },
            Expr::Assign { place, value } => {
                self.check_expr(value);
                self.check_assign_target(place);
            },
            Expr::Return(value) | Expr::Break(value, _) => {
                if let Some(value) = value {
                    self.check_expr(value);
                }
            },
            Expr::Async { body, .. } => self.check_expr(body),
            Expr::Await { expr, .. } => self.check_expr(expr),
            Expr::Cast { expr, .. } => self.check_expr(expr),
            Expr::Tuple { elements, .. } | Expr::Array { elements, .. } => {
                for e in elements {
                    self.check_expr(e);
                }
            },
            Expr::Index { object, index, .. } => {
                self.check_expr(object);
                self.check_expr(index);
            },
            Expr::Range { lo, hi, .. } => {
                if let Some(lo) = lo {
                    self.check_expr(lo);
                }
                if let Some(hi) = hi {
                    self.check_expr(hi);
                }
            },
            Expr::Closure { body, .. } => {
                let saved = std::mem::replace(&mut self.state, self.state.enter_scope());
                self.check_expr(body);
                self.state = saved;
            },
            Expr::StructLiteral { fields, .. } => {
                for (_, value) in fields {
                    self.check_expr(value);
                }
            },
            Expr::EnumVariant { args, .. } => {
                for arg in args {
                    self.check_expr(arg);
                }
            },
            Expr::Try { expr, .. } | Expr::Old { expr, .. } => self.check_expr(expr),
            Expr::Quantifier { collection, predicate, .. } => {
                self.check_expr(collection);
                self.check_expr(predicate);
            },
        }
    }
}
