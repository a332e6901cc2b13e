//! Definite-assignment and reachability analysis for a C#-family frontend.
//!
//! [`analyze::check_method`] walks one resolved method body and proves every
//! local, struct field path, and `out` parameter assigned before use, while
//! tracking which points are reachable. The engine underneath: copy-on-write
//! assignment bit vectors ([`bitvec`]), flag-slot layouts for struct types
//! ([`layout`]), variable descriptors and offset maps ([`vars`]), per-path
//! usage vectors ([`vector`]), and a branching-scope tree that routes breaks,
//! continues, returns, and gotos, including across `finally` blocks
//! ([`branching`]).

pub mod analyze;
pub mod ast;
pub mod bitvec;
pub mod branching;
pub mod diag;
pub mod errors;
pub mod layout;
pub mod types;
pub mod vars;
pub mod vector;

pub use analyze::{FlowReport, check_method, check_module};
pub use diag::{Diagnostics, Position, Span};
pub use errors::{FlowError, Severity};
