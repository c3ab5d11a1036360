//! faxc-sem - Semantic Analyzer & Type Checker
//!
//! ============================================================================
//! SEMANTIC ANALYSIS THEORY
//! ============================================================================
//!
//! Semantic analysis is the phase where we check the "meaning" of the program,
//! not just its syntax. It answers questions like:
//! - Is this variable defined?
//! - Are these types compatible?
//! - Is this code reachable?
//! - Are ownership rules followed?
//!
//! PHASES OF SEMANTIC ANALYSIS:
//! ----------------------------
//!
//! 1. NAME RESOLUTION
//!    - Match identifiers to their definitions, in one of three namespaces
//!      (values, functions, types — see `scope`)
//!    - Build scope tree
//!    - Check for undefined names
//!
//! 2. TYPE CHECKING
//!    - Bidirectional inference of expression types (see `infer`)
//!    - Check type compatibility
//!    - Validate generic instantiations
//!
//! 3. OWNERSHIP ANALYSIS
//!    - Track moves of non-Copy values (see `ownership`)
//!    - Merge ownership state across branches
//!
//! 4. BORROW CHECKING
//!    - Enforce shared/exclusive aliasing XOR mutability (see `borrow`)
//!
//! 5. MODULE RESOLUTION
//!    - Resolve `std::a::b::c` imports, detect import cycles (see
//!      `module_resolver`)
//!
//! 6. CONTRACT VERIFICATION
//!    - Check `@requires`/`@ensures`/`@invariant` clauses (see `contracts`)
//!
//! Each phase reports through the shared `faxc_util::diagnostic::Handler`
//! sink; see `codes` for this crate's `Pnnnn` diagnostic code family.

pub mod analysis;
pub mod codes;
pub mod contracts;
pub mod hir;
pub mod infer;
pub mod items;
pub mod module_resolver;
pub mod ownership;
pub mod borrow;
pub mod scope;
pub mod types;

pub use analysis::SemanticAnalyzer;
pub use borrow::{Borrow, BorrowState};
pub use hir::*;
pub use infer::{Constraint as InferConstraint, TypeError, TypeInference};
pub use items::{EnumInfo, FieldInfo, ImplInfo, ItemTables, StructInfo, TraitInfo, VariantInfo};
pub use module_resolver::{ModuleResolver, ResolvedModule};
pub use ownership::{OwnershipState, ValueInfo};
pub use scope::{Namespace, Rib, RibId, RibKind, ScopeTree};
pub use types::*;

#[cfg(test)]
mod edge_cases;
