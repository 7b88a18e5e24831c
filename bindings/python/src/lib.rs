//! Python bindings for LiquidCode
//!
//! Thin wrapper around `liquid-core`. No compiler logic lives here;
//! every function takes and returns strings (DSL text or JSON).

use liquid_core::diagnostics::{self, Diagnostic};
use liquid_core::{LiquidSchema, ParseOptions};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn to_json<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| PyValueError::new_err(format!("Serialization error: {}", e)))
}

/// Compile LiquidCode DSL text into schema JSON.
///
/// Args:
///     text: LiquidCode source text
///
/// Returns:
///     JSON string of the LiquidSchema
///
/// Raises:
///     ValueError: On lex, parse or semantic errors. The message includes
///         the position and, where one exists, a suggested fix.
#[pyfunction]
fn parse(text: &str) -> PyResult<String> {
    let schema = liquid_core::parse(text)
        .map_err(|e| PyValueError::new_err(diagnostics::render(&e, text).to_string()))?;
    to_json(&schema)
}

/// Emit canonical LiquidCode DSL from schema JSON.
///
/// Guarantees:
///   - Deterministic: same schema → same text
///   - Idempotent: compile(parse(compile(s))) == compile(s)
///
/// Raises:
///     ValueError: If the JSON is not a valid LiquidSchema
#[pyfunction]
fn compile(schema_json: &str) -> PyResult<String> {
    let schema = LiquidSchema::from_json(schema_json)
        .map_err(|e| PyValueError::new_err(format!("Invalid schema JSON: {}", e)))?;
    Ok(liquid_core::compile(&schema))
}

/// Parse, emit, re-parse and compare structurally.
///
/// Returns:
///     JSON string: {"dsl": str, "isEquivalent": bool, "differences": [str]}
///
/// Raises:
///     ValueError: If the input text does not compile
#[pyfunction]
fn roundtrip(text: &str) -> PyResult<String> {
    let report = liquid_core::roundtrip(text)
        .map_err(|e| PyValueError::new_err(diagnostics::render(&e, text).to_string()))?;
    to_json(&report)
}

/// Validate DSL text without raising.
///
/// Returns:
///     JSON string:
///     {
///         "valid": bool,
///         "errors": [{"severity": "error", "kind": "...", "message": "...", ...}],
///         "warnings": [{"severity": "warning", "kind": "...", "message": "..."}]
///     }
#[pyfunction]
fn check(text: &str) -> PyResult<String> {
    let (errors, warnings): (Vec<Diagnostic>, Vec<Diagnostic>) =
        diagnostics::check(text, &ParseOptions::default())
            .into_iter()
            .partition(Diagnostic::is_error);

    to_json(&serde_json::json!({
        "valid": errors.is_empty(),
        "errors": errors,
        "warnings": warnings,
    }))
}

/// SHA-256 fingerprint of the canonical form of DSL text.
///
/// Programs that differ only in formatting share a fingerprint.
///
/// Raises:
///     ValueError: If the text does not compile
#[pyfunction]
fn fingerprint(text: &str) -> PyResult<String> {
    let schema = liquid_core::parse(text)
        .map_err(|e| PyValueError::new_err(diagnostics::render(&e, text).to_string()))?;
    Ok(liquid_core::fingerprint(&schema))
}

/// LiquidCode Python module — UI layout DSL compiler
#[pymodule]
fn liquidcode(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(parse, m)?)?;
    m.add_function(wrap_pyfunction!(compile, m)?)?;
    m.add_function(wrap_pyfunction!(roundtrip, m)?)?;
    m.add_function(wrap_pyfunction!(check, m)?)?;
    m.add_function(wrap_pyfunction!(fingerprint, m)?)?;
    m.add("SCHEMA_VERSION", liquid_core::schema::SCHEMA_VERSION)?;
    Ok(())
}
