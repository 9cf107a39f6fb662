//! An extensible expression language with a restricted evaluator.
//!
//! The parser turns an expression string into an AST using
//! operator-precedence climbing over caller-configured operator tables;
//! ternary conditionals, assignment operators, and regex literals are
//! optional plugins. The evaluator walks the AST against a flat binding
//! map without ever invoking a general-purpose code execution facility.
//! It is used by the JSONPath engine for filter and script segments.

pub mod ast;
pub mod error;
pub mod eval;
pub mod extensions;
pub mod functions;
pub mod grammar;
pub mod parser;

// --- Public API ---
pub use ast::{Expr, UpdateOp};
pub use error::ExprError;
pub use eval::{Bindings, Evaluator, to_display_string, to_number, truthy};
pub use extensions::{AssignmentPlugin, RegexPlugin, TernaryPlugin};
pub use functions::{FunctionRegistry, NativeFunction};
pub use grammar::{ASSIGN_PRECEDENCE, BinaryOpSpec, Grammar, GrammarPlugin};
pub use parser::{Parser, ParserState};
