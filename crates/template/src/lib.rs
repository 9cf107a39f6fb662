//! Template resolution over JSON structures.
//!
//! Walks an input value (string, mapping, or array, arbitrarily nested)
//! and replaces every `{$.path}` placeholder with its value from a
//! context, looked up through the `stencil-jsonpath` engine. Failures are
//! collected as messages, never raised: callers always get a best-effort
//! result plus a diagnostic list.

mod resolver;

// --- Public API ---
pub use resolver::{NO_VALUE, ResolveOptions, TemplateResolver};
