//! Compile-time contract verification.
//!
//! `@requires`/`@ensures` clauses on functions and `@invariant` clauses on
//! loops are boolean expressions. Where one constant-folds to `false` it is
//! a compile error (the contract can never hold); where it folds to `true`
//! it's accepted outright. Anything else is left as a runtime obligation.
//!
//! `@requires` clauses additionally feed a small range-analysis layer: a
//! clause of the form `x > 5` is remembered as a constraint on `x`, and a
//! later clause in the same list (e.g. `x >= 4`) is proven from it instead
//! of being left unverified.

use crate::codes;
use crate::hir::{BinOp, Expr, Literal, UnOp};
use crate::types::Type;
use faxc_util::diagnostic::DiagnosticBuilder;
use faxc_util::{DefId, FxHashMap, Handler, Span};

/// Which kind of clause is being checked, purely for the diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Requires,
    Ensures,
    Invariant,
}

impl ContractKind {
    fn describe(self) -> &'static str {
        match self {
            ContractKind::Requires => "Precondition",
            ContractKind::Ensures => "Postcondition",
            ContractKind::Invariant => "Loop invariant",
        }
    }
}

/// A tracked `var OP constant` fact, used to prove later clauses in the same
/// `@requires` list.
#[derive(Debug, Clone, Copy)]
struct Constraint {
    op: BinOp,
    constant: i64,
}

/// Verifies `@requires`/`@ensures`/`@invariant` clauses against constant
/// folding and a per-function set of tracked `@requires` constraints.
pub struct ContractChecker<'a> {
    handler: &'a mut Handler,
    constraints: FxHashMap<DefId, Vec<Constraint>>,
    error_count: usize,
}

impl<'a> ContractChecker<'a> {
    pub fn new(handler: &'a mut Handler) -> Self {
        Self {
            handler,
            constraints: FxHashMap::default(),
            error_count: 0,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Clears tracked `@requires` constraints; call between functions.
    pub fn reset(&mut self) {
        self.constraints.clear();
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.error_count += 1;
        DiagnosticBuilder::error(message)
            .code(codes::P_CONTRACT_ALWAYS_FAILS)
            .span(span)
            .emit(&self.handler);
    }

    fn not_bool_error(&mut self, span: Span) {
        self.error_count += 1;
        DiagnosticBuilder::error("contract clause must be of type bool")
            .code(codes::P_CONTRACT_NOT_BOOL)
            .span(span)
            .emit(&self.handler);
    }

    /// Checks a `@requires` clause list in order, tracking each unprovable
    /// comparison as a constraint available to later clauses in the list.
    pub fn check_requires(&mut self, clauses: &[Expr], span: Span) {
        for clause in clauses {
            self.check_clause(clause, ContractKind::Requires, span, true);
        }
    }

    /// Checks an `@ensures` clause list. `result` in the expression refers
    /// to the function's return value; that's resolved before this is
    /// called (the clause is already a fully name-resolved HIR expression).
    pub fn check_ensures(&mut self, clauses: &[Expr], span: Span) {
        for clause in clauses {
            self.check_clause(clause, ContractKind::Ensures, span, false);
        }
    }

    /// Checks a loop's `@invariant` clause list.
    pub fn check_invariant(&mut self, clauses: &[Expr], span: Span) {
        for clause in clauses {
            self.check_clause(clause, ContractKind::Invariant, span, false);
        }
    }

    fn check_clause(&mut self, clause: &Expr, kind: ContractKind, span: Span, track: bool) {
        if !matches!(clause.ty(), Type::Bool) {
            self.not_bool_error(span);
            return;
        }

        match self.evaluate_constant_bool(clause) {
            Some(false) => {
                self.error(format!("{} will always fail", kind.describe()), span);
            },
            Some(true) => {},
            None => {
                if track {
                    self.track_constraint(clause);
                }
            },
        }
    }

    /// Remembers `var OP constant` (or `constant OP var`, normalized by
    /// flipping the operator) so later clauses can be proven from it.
    fn track_constraint(&mut self, expr: &Expr) {
        let Expr::Binary { op, left, right, .. } = expr else { return };
        if !is_comparison(*op) {
            return;
        }
        if let Expr::Var { def_id, .. } = left.as_ref() {
            if let Some(constant) = self.evaluate_constant_int(right) {
                self.constraints.entry(*def_id).or_default().push(Constraint { op: *op, constant });
            }
        } else if let Expr::Var { def_id, .. } = right.as_ref() {
            if let Some(constant) = self.evaluate_constant_int(left) {
                self.constraints
                    .entry(*def_id)
                    .or_default()
                    .push(Constraint { op: flip(*op), constant });
            }
        }
    }

    /// Tries to prove `expr` using constraints tracked from earlier clauses.
    fn prove_from_constraints(&self, expr: &Expr) -> Option<bool> {
        let Expr::Binary { op, left, right, .. } = expr else { return None };
        if !is_comparison(*op) {
            return None;
        }
        let Expr::Var { def_id, .. } = left.as_ref() else { return None };
        let target = self.evaluate_constant_int(right)?;
        let constraints = self.constraints.get(def_id)?;

        for constraint in constraints {
            if let Some(result) = implies(constraint.op, constraint.constant, *op, target) {
                return Some(result);
            }
        }
        None
    }

    fn evaluate_constant_bool(&self, expr: &Expr) -> Option<bool> {
        if let Some(proven) = self.prove_from_constraints(expr) {
            return Some(proven);
        }

        match expr {
            Expr::Literal { lit: Literal::Bool(b), .. } => Some(*b),
            Expr::Binary { op, left, right, .. } => match op {
                BinOp::And => Some(self.evaluate_constant_bool(left)? && self.evaluate_constant_bool(right)?),
                BinOp::Or => Some(self.evaluate_constant_bool(left)? || self.evaluate_constant_bool(right)?),
                BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                    let l = self.evaluate_constant_int(left);
                    let r = self.evaluate_constant_int(right);
                    if let (Some(l), Some(r)) = (l, r) {
                        return Some(compare(*op, l, r));
                    }
                    let l = self.evaluate_constant_bool(left);
                    let r = self.evaluate_constant_bool(right);
                    match op {
                        BinOp::Eq => Some(l? == r?),
                        BinOp::Ne => Some(l? != r?),
                        _ => None,
                    }
                },
                _ => None,
            },
            Expr::Unary { op: UnOp::Not, expr: inner, .. } => Some(!self.evaluate_constant_bool(inner)?),
            _ => None,
        }
    }

    fn evaluate_constant_int(&self, expr: &Expr) -> Option<i64> {
        match expr {
            Expr::Literal { lit: Literal::Int(v), .. } => Some(*v),
            Expr::Binary { op, left, right, .. } => {
                let l = self.evaluate_constant_int(left)?;
                let r = self.evaluate_constant_int(right)?;
                match op {
                    BinOp::Add => Some(l + r),
                    BinOp::Sub => Some(l - r),
                    BinOp::Mul => Some(l * r),
                    BinOp::Div if r != 0 => Some(l / r),
                    BinOp::Mod if r != 0 => Some(l % r),
                    _ => None,
                }
            },
            Expr::Unary { op: UnOp::Neg, expr: inner, .. } => self.evaluate_constant_int(inner).map(|v| -v),
            _ => None,
        }
    }
}

fn is_comparison(op: BinOp) -> bool {
    matches!(op, BinOp::Gt | BinOp::Ge | BinOp::Lt | BinOp::Le | BinOp::Eq | BinOp::Ne)
}

fn flip(op: BinOp) -> BinOp {
    match op {
        BinOp::Gt => BinOp::Lt,
        BinOp::Ge => BinOp::Le,
        BinOp::Lt => BinOp::Gt,
        BinOp::Le => BinOp::Ge,
        other => other,
    }
}

fn compare(op: BinOp, l: i64, r: i64) -> bool {
    match op {
        BinOp::Eq => l == r,
        BinOp::Ne => l != r,
        BinOp::Lt => l < r,
        BinOp::Gt => l > r,
        BinOp::Le => l <= r,
        BinOp::Ge => l >= r,
        _ => unreachable!("non-comparison BinOp passed to compare"),
    }
}

/// Does `var constraint_op constraint_const` imply `var query_op query_const`?
/// Returns `None` when the pair of operators isn't one we know how to chain.
fn implies(constraint_op: BinOp, constraint_const: i64, query_op: BinOp, query_const: i64) -> Option<bool> {
    use BinOp::*;
    match (constraint_op, query_op) {
        (Gt, Ge) | (Ge, Ge) | (Gt, Gt) => (constraint_const >= query_const).then_some(true),
        (Lt, Le) | (Le, Le) | (Lt, Lt) => (constraint_const <= query_const).then_some(true),
        (Eq, Eq) => Some(constraint_const == query_const),
        (Eq, Ne) => Some(constraint_const != query_const),
        (Gt, Lt) => (constraint_const >= query_const).then_some(false),
        (Lt, Gt) => (constraint_const <= query_const).then_some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bool_lit(b: bool) -> Expr {
        Expr::Literal { lit: Literal::Bool(b), ty: Type::Bool }
    }

    fn int_lit(v: i64) -> Expr {
        Expr::Literal { lit: Literal::Int(v), ty: Type::Int }
    }

    fn var(id: u32) -> Expr {
        Expr::Var { def_id: DefId(id), ty: Type::Int, span: Span::DUMMY }
    }

    fn cmp(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary { op, left: Box::new(left), right: Box::new(right), ty: Type::Bool }
    }

    #[test]
    fn true_precondition_is_accepted() {
        let mut handler = Handler::new();
        let mut checker = ContractChecker::new(&mut handler);
        checker.check_requires(&[bool_lit(true)], Span::DUMMY);
        assert!(!checker.has_errors());
    }

    #[test]
    fn false_precondition_is_rejected() {
        let mut handler = Handler::new();
        let mut checker = ContractChecker::new(&mut handler);
        checker.check_requires(&[cmp(BinOp::Eq, int_lit(1), int_lit(2))], Span::DUMMY);
        assert!(checker.has_errors());
    }

    #[test]
    fn arithmetic_constant_is_folded() {
        let mut handler = Handler::new();
        let mut checker = ContractChecker::new(&mut handler);
        let two_plus_two = Expr::Binary {
            op: BinOp::Add,
            left: Box::new(int_lit(2)),
            right: Box::new(int_lit(2)),
            ty: Type::Int,
        };
        checker.check_requires(&[cmp(BinOp::Eq, two_plus_two, int_lit(4))], Span::DUMMY);
        assert!(!checker.has_errors());
    }

    #[test]
    fn later_clause_proven_from_earlier_constraint() {
        let mut handler = Handler::new();
        let mut checker = ContractChecker::new(&mut handler);
        // x > 5, x >= 4 -- the second is implied by the first and shouldn't
        // be flagged (nor does it need to constant-fold on its own).
        let first = cmp(BinOp::Gt, var(1), int_lit(5));
        let second = cmp(BinOp::Ge, var(1), int_lit(4));
        checker.check_requires(&[first, second], Span::DUMMY);
        assert!(!checker.has_errors());
    }

    #[test]
    fn contradictory_constraint_is_rejected() {
        let mut handler = Handler::new();
        let mut checker = ContractChecker::new(&mut handler);
        // x > 5, x < 4 -- the second directly contradicts the first.
        let first = cmp(BinOp::Gt, var(1), int_lit(5));
        let second = cmp(BinOp::Lt, var(1), int_lit(4));
        checker.check_requires(&[first, second], Span::DUMMY);
        assert!(checker.has_errors());
    }

    #[test]
    fn non_bool_clause_is_rejected() {
        let mut handler = Handler::new();
        let mut checker = ContractChecker::new(&mut handler);
        checker.check_requires(&[int_lit(1)], Span::DUMMY);
        assert!(checker.has_errors());
    }

    #[test]
    fn invariant_true_is_accepted_and_false_is_rejected() {
        let mut handler = Handler::new();
        let mut checker = ContractChecker::new(&mut handler);
        checker.check_invariant(&[bool_lit(true)], Span::DUMMY);
        assert!(!checker.has_errors());
        checker.check_invariant(&[bool_lit(false)], Span::DUMMY);
        assert!(checker.has_errors());
    }
}
