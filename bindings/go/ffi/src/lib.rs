//! C-FFI layer for LiquidCode, used by Go (cgo) and other FFI consumers.
//!
//! No compiler logic here. All calls delegate to `liquid-core`.
//!
//! # Memory Contract
//!
//! All functions that return `*mut c_char` allocate via `CString`.
//! The caller MUST free the returned string by calling `liquid_free_string()`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use liquid_core::diagnostics::{self, Diagnostic};
use liquid_core::{LiquidSchema, ParseOptions};

/// Result from a LiquidCode FFI call.
/// If `error` is null, the call succeeded and `result` contains the output.
/// If `error` is non-null, the call failed and `error` contains the message.
/// The caller MUST free both `result` and `error` with `liquid_free_string()`.
#[repr(C)]
pub struct LiquidResult {
    pub result: *mut c_char,
    pub error: *mut c_char,
}

impl LiquidResult {
    fn ok(value: String) -> Self {
        LiquidResult {
            result: into_c_string(value),
            error: std::ptr::null_mut(),
        }
    }

    fn err(msg: String) -> Self {
        LiquidResult {
            result: std::ptr::null_mut(),
            error: into_c_string(msg),
        }
    }

    fn json<T: serde::Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(json) => LiquidResult::ok(json),
            Err(e) => LiquidResult::err(format!("Serialization error: {}", e)),
        }
    }
}

/// Interior NULs cannot cross the C boundary; they become spaces
fn into_c_string(value: String) -> *mut c_char {
    let value = if value.contains('\0') {
        value.replace('\0', " ")
    } else {
        value
    };
    CString::new(value).unwrap_or_default().into_raw()
}

/// Helper: convert a C string pointer to a Rust &str.
/// Returns None if the pointer is null or not valid UTF-8.
unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Compile DSL text into schema JSON.
///
/// # Safety
/// `text` must be a valid null-terminated UTF-8 C string.
/// The caller must free the returned strings with `liquid_free_string()`.
#[no_mangle]
pub unsafe extern "C" fn liquid_parse(text: *const c_char) -> LiquidResult {
    let Some(text) = cstr_to_str(text) else {
        return LiquidResult::err("null or invalid UTF-8 input".into());
    };

    match liquid_core::parse(text) {
        Ok(schema) => LiquidResult::json(&schema),
        Err(e) => LiquidResult::err(diagnostics::render(&e, text).to_string()),
    }
}

/// Emit canonical DSL text from schema JSON.
///
/// # Safety
/// `schema_json` must be a valid null-terminated UTF-8 C string.
/// The caller must free the returned strings with `liquid_free_string()`.
#[no_mangle]
pub unsafe extern "C" fn liquid_compile(schema_json: *const c_char) -> LiquidResult {
    let Some(schema_json) = cstr_to_str(schema_json) else {
        return LiquidResult::err("null or invalid UTF-8 input".into());
    };

    match LiquidSchema::from_json(schema_json) {
        Ok(schema) => LiquidResult::ok(liquid_core::compile(&schema)),
        Err(e) => LiquidResult::err(format!("Invalid schema JSON: {}", e)),
    }
}

/// Roundtrip DSL text.
/// Returns JSON: { "dsl": str, "isEquivalent": bool, "differences": [...] }
///
/// # Safety
/// `text` must be a valid null-terminated UTF-8 C string.
/// The caller must free the returned strings with `liquid_free_string()`.
#[no_mangle]
pub unsafe extern "C" fn liquid_roundtrip(text: *const c_char) -> LiquidResult {
    let Some(text) = cstr_to_str(text) else {
        return LiquidResult::err("null or invalid UTF-8 input".into());
    };

    match liquid_core::roundtrip(text) {
        Ok(report) => LiquidResult::json(&report),
        Err(e) => LiquidResult::err(diagnostics::render(&e, text).to_string()),
    }
}

/// Validate DSL text. Never fails on invalid DSL.
/// Returns JSON: { "valid": bool, "errors": [...], "warnings": [...] }
///
/// # Safety
/// `text` must be a valid null-terminated UTF-8 C string.
/// The caller must free the returned strings with `liquid_free_string()`.
#[no_mangle]
pub unsafe extern "C" fn liquid_check(text: *const c_char) -> LiquidResult {
    let Some(text) = cstr_to_str(text) else {
        return LiquidResult::err("null or invalid UTF-8 input".into());
    };

    let (errors, warnings): (Vec<Diagnostic>, Vec<Diagnostic>) =
        diagnostics::check(text, &ParseOptions::default())
            .into_iter()
            .partition(Diagnostic::is_error);

    LiquidResult::json(&serde_json::json!({
        "valid": errors.is_empty(),
        "errors": errors,
        "warnings": warnings,
    }))
}

/// SHA-256 fingerprint of the canonical form of DSL text.
///
/// # Safety
/// `text` must be a valid null-terminated UTF-8 C string.
/// The caller must free the returned strings with `liquid_free_string()`.
#[no_mangle]
pub unsafe extern "C" fn liquid_fingerprint(text: *const c_char) -> LiquidResult {
    let Some(text) = cstr_to_str(text) else {
        return LiquidResult::err("null or invalid UTF-8 input".into());
    };

    match liquid_core::parse(text) {
        Ok(schema) => LiquidResult::ok(liquid_core::fingerprint(&schema)),
        Err(e) => LiquidResult::err(diagnostics::render(&e, text).to_string()),
    }
}

/// Free a string previously returned by a LiquidCode FFI function.
///
/// # Safety
/// `ptr` must be a pointer previously returned by a LiquidCode FFI function,
/// or null (in which case this is a no-op).
#[no_mangle]
pub unsafe extern "C" fn liquid_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run an FFI call and take ownership of both sides of the result
    fn call(
        f: unsafe extern "C" fn(*const c_char) -> LiquidResult,
        input: &str,
    ) -> (Option<String>, Option<String>) {
        let input = CString::new(input).unwrap();
        unsafe {
            let out = f(input.as_ptr());
            let take = |ptr: *mut c_char| {
                (!ptr.is_null()).then(|| {
                    let s = CStr::from_ptr(ptr).to_string_lossy().into_owned();
                    liquid_free_string(ptr);
                    s
                })
            };
            (take(out.result), take(out.error))
        }
    }

    #[test]
    fn test_parse_and_compile() {
        let (json, err) = call(liquid_parse, "[Kp :revenue, Bt \"Go\"]");
        assert!(err.is_none());
        let json = json.unwrap();
        assert!(json.contains("\"type\": \"kpi\""));

        let (dsl, err) = call(liquid_compile, &json);
        assert!(err.is_none());
        assert_eq!(dsl.unwrap(), "[Kp :revenue \"Revenue\", Bt \"Go\"]");
    }

    #[test]
    fn test_parse_error_is_rendered() {
        let (result, err) = call(liquid_parse, "Kp :a \"open");
        assert!(result.is_none());
        assert!(err.unwrap().starts_with("error[lex]: unterminated string"));
    }

    #[test]
    fn test_compile_rejects_bad_json() {
        let (_, err) = call(liquid_compile, "{\"layers\": 3}");
        assert!(err.unwrap().starts_with("Invalid schema JSON"));
    }

    #[test]
    fn test_roundtrip_and_check() {
        let (report, _) = call(liquid_roundtrip, "@t\nTs @t [Bt \"A\" >t=a]");
        let report: serde_json::Value = serde_json::from_str(&report.unwrap()).unwrap();
        assert_eq!(report["isEquivalent"], true);

        let (check, err) = call(liquid_check, "Zz");
        assert!(err.is_none());
        let check: serde_json::Value = serde_json::from_str(&check.unwrap()).unwrap();
        assert_eq!(check["valid"], false);
        assert_eq!(check["errors"][0]["kind"], "semantic");
    }

    #[test]
    fn test_fingerprint_ignores_formatting() {
        let (a, _) = call(liquid_fingerprint, "[Kp :a,Kp :b]");
        let (b, _) = call(liquid_fingerprint, "Kp   :a\nKp :b");
        assert_eq!(a.as_ref().map(String::len), Some(64));
        assert_eq!(a, b);
    }

    #[test]
    fn test_null_input() {
        let out = unsafe { liquid_parse(std::ptr::null()) };
        assert!(out.result.is_null());
        assert!(!out.error.is_null());
        unsafe { liquid_free_string(out.error) };
    }
}
