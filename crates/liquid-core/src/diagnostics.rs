//! Diagnostics — readable reports for compiler errors and lint warnings
//!
//! `render` turns any compiler `Error` into a `Diagnostic` carrying the
//! offending source line, a caret under the failing column and, where the
//! fix is obvious, a suggestion. `lint` inspects a schema that compiled
//! fine and warns about things that are probably unintended.

use serde::Serialize;

use crate::error::{Error, SemanticErrorKind};
use crate::kinds::BlockKind;
use crate::parser::scanner::Span;
use crate::parser::ParseOptions;
use crate::schema::{Binding, LiquidSchema};

// ── Diagnostic types ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Source line with a caret under the failing column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    fn warning(kind: DiagnosticKind, message: String) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            kind,
            message,
            span: None,
            context: None,
            suggestion: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.kind, self.message)?;
        if let Some(ref span) = self.span {
            write!(f, "\n  --> {}", span)?;
        }
        if let Some(ref context) = self.context {
            write!(f, "\n{}", context)?;
        }
        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  help: {}", suggestion)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    Lex,
    Parse,
    Semantic,
    Json,
    UnusedSignal,
    UnreachableLayer,
    OverlayRoot,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DiagnosticKind::Lex => write!(f, "lex"),
            DiagnosticKind::Parse => write!(f, "parse"),
            DiagnosticKind::Semantic => write!(f, "semantic"),
            DiagnosticKind::Json => write!(f, "json"),
            DiagnosticKind::UnusedSignal => write!(f, "unused-signal"),
            DiagnosticKind::UnreachableLayer => write!(f, "unreachable-layer"),
            DiagnosticKind::OverlayRoot => write!(f, "overlay-root"),
        }
    }
}

// ── Public API ────────────────────────────────────────────

/// Full check of DSL text: the error if it fails to compile, otherwise
/// any lint warnings
pub fn check(source: &str, options: &ParseOptions) -> Vec<Diagnostic> {
    match crate::parse_with(source, options) {
        Ok(schema) => lint(&schema),
        Err(err) => vec![render(&err, source)],
    }
}

/// Describe a compiler error against the source it came from
pub fn render(error: &Error, source: &str) -> Diagnostic {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let (kind, message) = match error {
        Error::Lex(e) => (DiagnosticKind::Lex, e.message.clone()),
        Error::Parse(e) => (
            DiagnosticKind::Parse,
            format!("expected {}, found {}", e.expected, e.found),
        ),
        Error::Semantic(e) => (DiagnosticKind::Semantic, e.detail.clone()),
        Error::Json(e) => (DiagnosticKind::Json, e.to_string()),
    };
    let span = error.position().cloned();

    Diagnostic {
        severity: Severity::Error,
        kind,
        message,
        context: span.as_ref().and_then(|s| source_context(source, s)),
        suggestion: suggest(error, source),
        span,
    }
}

/// Warnings for a schema that compiled but looks unintended
pub fn lint(schema: &LiquidSchema) -> Vec<Diagnostic> {
    let mut used_signals: Vec<&str> = Vec::new();
    let mut opened_layers: Vec<u32> = Vec::new();

    for layer in &schema.layers {
        layer.root.walk(&mut |block| {
            if let Some(Binding::Signal { name }) = &block.binding {
                used_signals.push(name);
            }
            if let Some(wiring) = &block.signals {
                used_signals.extend(wiring.names());
                opened_layers.extend(wiring.layer);
            }
        });
    }

    let mut warnings = Vec::new();
    for signal in &schema.signals {
        if !used_signals.contains(&signal.name.as_str()) {
            warnings.push(Diagnostic::warning(
                DiagnosticKind::UnusedSignal,
                format!("signal '@{}' is declared but never used", signal.name),
            ));
        }
    }
    for layer in &schema.layers {
        if layer.id != 0 && !opened_layers.contains(&layer.id) {
            warnings.push(Diagnostic::warning(
                DiagnosticKind::UnreachableLayer,
                format!("layer {} is defined but nothing opens it", layer.id),
            ));
        }
        let root = &layer.root;
        if layer.id != 0 && root.kind != BlockKind::Container && !root.kind.is_overlay() {
            warnings.push(Diagnostic::warning(
                DiagnosticKind::OverlayRoot,
                format!(
                    "layer {} shows a {} directly; overlay layers usually hold a modal, drawer, sheet or popover",
                    layer.id, root.kind
                ),
            ));
        }
    }
    warnings
}

/// Known type codes within edit distance 2 of `word`, closest first
pub fn suggest_type_codes(word: &str) -> Vec<&'static str> {
    let lowered = word.to_lowercase();
    let mut candidates: Vec<(usize, usize, &'static str)> = BlockKind::ALL
        .iter()
        .enumerate()
        .filter_map(|(order, kind)| {
            let code = kind.code();
            let distance = levenshtein(&lowered, &code.to_lowercase());
            let longest = lowered.chars().count().max(code.len());
            (distance <= 2 && distance < longest).then_some((distance, order, code))
        })
        .collect();
    candidates.sort();
    candidates.into_iter().take(3).map(|(_, _, code)| code).collect()
}

// ── Suggestions ───────────────────────────────────────────

fn suggest(error: &Error, source: &str) -> Option<String> {
    match error {
        Error::Lex(e) if e.message == "unterminated string" => Some(format!(
            "add a closing '\"' to the string that starts at {}",
            e.position
        )),
        Error::Lex(e) if e.message.contains("after ':'") => {
            Some("field references look like ':orders.total'".to_string())
        }
        Error::Lex(e) if e.message.contains("after '@'") => {
            Some("signal references look like '@name'".to_string())
        }
        Error::Lex(_) => None,
        Error::Parse(e) => {
            if e.expected.contains("']'") || e.found == "']'" || e.found == "end of input" {
                if let Some(hint) = bracket_hint(source) {
                    return Some(hint);
                }
            }
            if e.expected == "block" {
                let word = word_at(source, &e.position);
                return did_you_mean(&word);
            }
            if e.expected.contains("color rule") {
                return Some("color rules look like '#?>=80:green,50-79:yellow,:red'".to_string());
            }
            None
        }
        Error::Semantic(e) => match e.kind {
            SemanticErrorKind::UnknownBlockType => {
                let word = e
                    .position
                    .as_ref()
                    .map(|p| word_at(source, p))
                    .unwrap_or_default();
                did_you_mean(&word)
            }
            SemanticErrorKind::UndeclaredSignal => {
                Some("declare the signal with '@name' on its own line".to_string())
            }
            SemanticErrorKind::UnresolvedLayer => {
                Some("define the layer with a '/N block' line".to_string())
            }
            SemanticErrorKind::DuplicateLayer => {
                Some("give every layer definition a distinct id".to_string())
            }
        },
        Error::Json(_) => None,
    }
}

fn did_you_mean(word: &str) -> Option<String> {
    if word.is_empty() {
        return None;
    }
    let codes = suggest_type_codes(word);
    if codes.is_empty() {
        return None;
    }
    let listed: Vec<String> = codes
        .iter()
        .filter_map(|code| BlockKind::from_code(code).map(|k| format!("'{}' ({})", code, k)))
        .collect();
    Some(format!("did you mean {}?", listed.join(" or ")))
}

/// Where the bracket structure of `source` breaks, ignoring strings and comments
fn bracket_hint(source: &str) -> Option<String> {
    let mut open: Vec<Span> = Vec::new();
    let mut in_string = false;
    let mut chars = source.chars().peekable();
    let (mut line, mut column, mut offset) = (1, 1, 0);

    while let Some(c) = chars.next() {
        let here = Span {
            line,
            column,
            offset,
        };
        let mut width = 1;

        if in_string {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        width += 1;
                        if escaped == '\n' {
                            line += 1;
                            column = 0;
                        }
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
        } else {
            match c {
                '"' => in_string = true,
                '/' if chars.peek() == Some(&'/') => {
                    while chars.peek().is_some_and(|n| *n != '\n') {
                        chars.next();
                        width += 1;
                    }
                }
                '[' => open.push(here.clone()),
                ']' => {
                    if open.pop().is_none() {
                        return Some(format!("remove the unmatched ']' at {}", here));
                    }
                }
                _ => {}
            }
        }

        offset += width;
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += width;
        }
    }

    open.last()
        .map(|span| format!("add ']' to close the '[' opened at {}", span))
}

// ── Source helpers ────────────────────────────────────────

fn source_line<'s>(source: &'s str, line: usize) -> Option<&'s str> {
    source
        .split('\n')
        .nth(line.checked_sub(1)?)
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
}

fn source_context(source: &str, span: &Span) -> Option<String> {
    let text = source_line(source, span.line)?;
    let number = span.line.to_string();
    let gutter = " ".repeat(number.len());
    let caret_pad = " ".repeat(span.column.saturating_sub(1));
    Some(format!(
        "{} |\n{} | {}\n{} | {}^",
        gutter, number, text, gutter, caret_pad
    ))
}

/// The identifier-like word starting at `span`
fn word_at(source: &str, span: &Span) -> String {
    source_line(source, span.line)
        .map(|text| {
            text.chars()
                .skip(span.column.saturating_sub(1))
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect()
        })
        .unwrap_or_default()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnose(source: &str) -> Diagnostic {
        let mut diagnostics = check(source, &ParseOptions::default());
        assert_eq!(diagnostics.len(), 1, "{:?}", diagnostics);
        diagnostics.remove(0)
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kp", "kp"), 0);
        assert_eq!(levenshtein("kpi", "kp"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
    }

    #[test]
    fn test_suggest_type_codes() {
        assert_eq!(suggest_type_codes("Kpi")[0], "Kp");
        assert_eq!(suggest_type_codes("kp")[0], "Kp");
        assert!(suggest_type_codes("Qq").is_empty());
        assert!(suggest_type_codes("Btn").contains(&"Bt"));
    }

    #[test]
    fn test_unterminated_string() {
        let d = diagnose("Kp :a\nBt \"Save");
        assert_eq!(d.kind, DiagnosticKind::Lex);
        assert_eq!(d.span.as_ref().map(|s| (s.line, s.column)), Some((2, 4)));
        assert_eq!(d.context.as_deref(), Some("  |\n2 | Bt \"Save\n  |    ^"));
        assert!(d.suggestion.unwrap().contains("closing '\"'"));
    }

    #[test]
    fn test_unclosed_bracket() {
        let d = diagnose("[Kp :a, [Tb :b]");
        assert_eq!(d.kind, DiagnosticKind::Parse);
        assert_eq!(
            d.suggestion.as_deref(),
            Some("add ']' to close the '[' opened at 1:1")
        );
    }

    #[test]
    fn test_stray_bracket() {
        let d = diagnose("Kp :a]");
        assert_eq!(
            d.suggestion.as_deref(),
            Some("remove the unmatched ']' at 1:6")
        );
    }

    #[test]
    fn test_brackets_in_strings_and_comments_ignored() {
        assert_eq!(bracket_hint(r#"[Tx "]" // ]"#).as_deref(), Some("add ']' to close the '[' opened at 1:1"));
        assert_eq!(bracket_hint("[Tx \"[\"]"), None);
    }

    #[test]
    fn test_unknown_code_suggestion() {
        let d = diagnose("[Kp :a, Kpi :b]");
        assert_eq!(d.kind, DiagnosticKind::Semantic);
        assert_eq!(d.message, "unknown block type 'Kpi'");
        assert!(d.suggestion.unwrap().starts_with("did you mean 'Kp' (kpi)"));
    }

    #[test]
    fn test_lowercase_code_suggestion() {
        let d = diagnose("tb :orders");
        assert_eq!(d.kind, DiagnosticKind::Parse);
        assert!(d.suggestion.unwrap().starts_with("did you mean 'Tb' (table)"));
    }

    #[test]
    fn test_display_format() {
        let d = diagnose("Bt \"Open\" >/9");
        let text = d.to_string();
        assert!(text.starts_with("error[semantic]: layer 9 is opened but never defined"));
        assert!(text.contains("--> 1:1"));
        assert!(text.ends_with("help: define the layer with a '/N block' line"));
    }

    #[test]
    fn test_bom_does_not_shift_context() {
        let d = diagnose("\u{feff}Kp & Tb");
        assert_eq!(d.context.as_deref(), Some("  |\n1 | Kp & Tb\n  |    ^"));
    }

    #[test]
    fn test_valid_program_has_no_diagnostics() {
        assert!(check("@tab\nTs @tab [Bt \"A\" >tab=0]", &ParseOptions::default()).is_empty());
    }

    #[test]
    fn test_lint_unused_signal_and_unreachable_layer() {
        let diagnostics = check("@unused\nKp :a\n/1 Md", &ParseOptions::default());
        let kinds: Vec<DiagnosticKind> = diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::UnusedSignal, DiagnosticKind::UnreachableLayer]
        );
        assert!(diagnostics.iter().all(|d| !d.is_error()));
    }

    #[test]
    fn test_lint_overlay_root() {
        let diagnostics = check("Bt \"Open\" >/1\n/1 Tb :orders", &ParseOptions::default());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::OverlayRoot);
        assert!(diagnostics[0].message.contains("shows a table"));

        let wrapped = check("Bt \"Open\" >/1\n/1 [Tb :orders]", &ParseOptions::default());
        assert!(wrapped.is_empty());
    }

    #[test]
    fn test_diagnostic_json_shape() {
        let d = diagnose("Kp :a :b");
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["severity"], "error");
        assert_eq!(value["kind"], "parse");
        assert_eq!(value["span"]["line"], 1);
    }
}
