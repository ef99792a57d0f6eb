//! Shader-source preprocessor: directive-aware tree building, conditional
//! expression evaluation, and recursive include expansion.
//!
//! # Invariants
//! - The symbol table is rebuilt fresh for every pass; no state crosses
//!   invocations.
//! - Exactly one branch of an `#if`/`#elif`/`#else` chain is ever emitted.
//! - Include expansion runs to a fixed point, bounded by an iteration cap.
//! - All scratch state is call-scoped; vertex and fragment passes may run
//!   concurrently.

mod cursor;
mod defines;
mod expression;
mod include;
mod node;
mod options;
mod processor;

pub use cursor::LineCursor;
pub use defines::SymbolTable;
pub use expression::{CompareOp, Expression};
pub use include::expand_includes;
pub use node::{Branch, DirectiveNode, build_tree, recompose};
pub use options::{ProcessorOptions, SourceHook};
pub use processor::{ProcessedShader, preprocess};

use shaderforge_common::ShaderKind;
use shaderforge_store::LoadError;

/// Errors from a preprocessing pass.
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("malformed conditional expression: {expr}")]
    MalformedExpression { expr: String },
    #[error("unknown include '{name}' and no loader configured")]
    MissingInclude { name: String },
    #[error("failed to load include '{name}' for {kind} shader: {source}")]
    IncludeLoad {
        name: String,
        kind: ShaderKind,
        #[source]
        source: LoadError,
    },
    #[error("maximum include expansion depth exceeded ({limit})")]
    MaxIncludeDepth { limit: usize },
}

pub fn crate_info() -> &'static str {
    "shaderforge-preprocessor v0.1.0"
}
