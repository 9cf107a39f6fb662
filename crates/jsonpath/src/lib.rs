//! A JSONPath query engine over `serde_json` values.
//!
//! Raw path strings are normalized into flat segment lists (cached per
//! engine instance) and traced recursively against the document. Filter
//! and script segments delegate to a pluggable expression evaluator; the
//! default is the restricted interpreter from `stencil-expr`. It is used
//! by the template resolver to look up `{$.path}` placeholders.

pub mod engine;
pub mod error;
pub mod eval;
mod parser;
pub mod segment;

// --- Public API ---
pub use engine::{
    JsonPath, OtherTypeTest, QueryOptions, ResultType, TraceMatch, to_path_string, to_pointer,
};
pub use error::PathError;
pub use eval::{ExpressionEvaluator, SafeEvaluator};
pub use parser::parse_path;
pub use segment::{Segment, TypeTest};
