//! JavaScript/TypeScript bindings for LiquidCode
//!
//! Thin wrapper around `liquid-core` compiled to WebAssembly.
//! Strings in, strings out; JSON where the result is structured.

use liquid_core::diagnostics::{self, Diagnostic};
use liquid_core::{LiquidSchema, ParseOptions};
use wasm_bindgen::prelude::*;

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

fn compile_error(e: &liquid_core::Error, text: &str) -> JsError {
    JsError::new(&diagnostics::render(e, text).to_string())
}

/// Compile DSL text into schema JSON.
///
/// @param text - LiquidCode source text
/// @returns JSON string of the LiquidSchema
/// @throws Error with position and suggestion if the text does not compile
#[wasm_bindgen]
pub fn parse(text: &str) -> Result<String, JsError> {
    let schema = liquid_core::parse(text).map_err(|e| compile_error(&e, text))?;
    to_json(&schema)
}

/// Emit canonical DSL text from schema JSON.
///
/// @param schemaJson - LiquidSchema as JSON
/// @returns Canonical LiquidCode text
/// @throws Error if the JSON is not a valid LiquidSchema
#[wasm_bindgen]
pub fn compile(schema_json: &str) -> Result<String, JsError> {
    let schema = LiquidSchema::from_json(schema_json)
        .map_err(|e| JsError::new(&format!("Invalid schema JSON: {}", e)))?;
    Ok(liquid_core::compile(&schema))
}

/// Parse, emit, re-parse and compare.
///
/// @returns JSON string: { dsl, isEquivalent, differences }
#[wasm_bindgen]
pub fn roundtrip(text: &str) -> Result<String, JsError> {
    let report = liquid_core::roundtrip(text).map_err(|e| compile_error(&e, text))?;
    to_json(&report)
}

/// Validate DSL text without throwing.
///
/// @returns JSON string: { valid, errors: [...], warnings: [...] }
#[wasm_bindgen]
pub fn check(text: &str) -> Result<String, JsError> {
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

/// SHA-256 fingerprint of the canonical form.
///
/// @returns Hex-encoded SHA-256 hash string
#[wasm_bindgen]
pub fn fingerprint(text: &str) -> Result<String, JsError> {
    let schema = liquid_core::parse(text).map_err(|e| compile_error(&e, text))?;
    Ok(liquid_core::fingerprint(&schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_parse_then_compile() {
        let json = parse("[Kp :revenue, Bt \"Go\" !submit]").unwrap();
        assert_eq!(
            compile(&json).unwrap(),
            "[Kp :revenue \"Revenue\", Bt \"Go\" !submit]"
        );
    }

    #[wasm_bindgen_test]
    fn test_check_reports_suggestion() {
        let report: serde_json::Value = serde_json::from_str(&check("Tbl :orders").unwrap()).unwrap();
        assert_eq!(report["valid"], false);
        assert!(report["errors"][0]["suggestion"]
            .as_str()
            .unwrap()
            .contains("'Tb'"));
    }

    #[wasm_bindgen_test]
    fn test_roundtrip_is_equivalent() {
        let report: serde_json::Value =
            serde_json::from_str(&roundtrip("@n\n[Bt \"+\" >n++, Tx @n]").unwrap()).unwrap();
        assert_eq!(report["isEquivalent"], true);
    }
}
