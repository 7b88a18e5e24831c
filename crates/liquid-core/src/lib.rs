//! LiquidCode Core - bidirectional compiler for the LiquidCode UI DSL
//!
//! Turns compact layout text into a `LiquidSchema` tree and emits canonical
//! text back from any schema. All language bindings (Python, Go) wrap this
//! same core.
//!
//! # Architecture
//!
//! ```text
//! DSL Text → Scanner → Tokens → Parser → AST → Builder → LiquidSchema
//!                                                            ↓
//!                                   Canonical DSL ← Emitter ←┘
//!                                        ↓
//!                                     Roundtrip → parse again + structural compare
//!
//! Chunks → IncrementalParser → complete statements → parse → last good schema
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: Same input always produces identical output
//! - **Canonical**: One emitted form per schema, so `compile` is idempotent
//! - **Bounded**: Nesting depth is limited by `ParseOptions::max_depth`
//! - **Lossless**: Every accepted program survives parse → emit → parse

pub mod builder;
pub mod diagnostics;
pub mod emitter;
pub mod error;
pub mod incremental;
pub mod kinds;
pub mod parser;
pub mod roundtrip;
pub mod schema;

use tracing::instrument;

pub use diagnostics::{Diagnostic, Severity};
pub use error::{Error, LexError, ParseError, Result, SemanticError, SemanticErrorKind};
pub use incremental::{IncrementalParser, Progress};
pub use kinds::BlockKind;
pub use parser::ast::Ast;
pub use parser::ParseOptions;
pub use roundtrip::{RoundtripInput, RoundtripReport};
pub use schema::*;

/// Compile DSL text into a schema with default options
///
/// # Errors
/// The first lex, parse or semantic error encountered.
pub fn parse(dsl: &str) -> Result<LiquidSchema> {
    parse_with(dsl, &ParseOptions::default())
}

/// Compile DSL text into a schema
#[instrument(skip_all, fields(len = dsl.len()))]
pub fn parse_with(dsl: &str, options: &ParseOptions) -> Result<LiquidSchema> {
    let ast = parser::parse(dsl, options)?;
    Ok(builder::build(&ast)?)
}

/// Parse DSL text without resolving it into a schema
pub fn parse_to_ast(dsl: &str) -> Result<Ast> {
    parser::parse(dsl, &ParseOptions::default())
}

/// Emit canonical DSL text for a schema
#[instrument(skip_all)]
pub fn compile(schema: &LiquidSchema) -> String {
    emitter::compile(schema)
}

/// Emit, re-parse and structurally compare
pub fn roundtrip<'a>(input: impl Into<RoundtripInput<'a>>) -> Result<RoundtripReport> {
    roundtrip::roundtrip(input)
}

/// SHA-256 of the canonical text, lowercase hex
pub fn fingerprint(schema: &LiquidSchema) -> String {
    emitter::fingerprint(schema)
}
