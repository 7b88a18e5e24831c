//! Canonical emitter — converts a `LiquidSchema` back to LiquidCode text
//!
//! # Pipeline
//!
//! `LiquidSchema → compile → canonical DSL → SHA-256 (fingerprint)`
//!
//! # Guarantees
//!
//! - **Total**: every schema produces text; nothing here fails
//! - **Deterministic**: same schema always produces the same text
//! - **Canonical**: one fixed order for modifiers, one spelling per value
//! - **Re-parseable**: `parse(compile(s))` is structurally equal to `s` for
//!   every schema the parser can produce

use sha2::{Digest, Sha256};

use crate::kinds::BlockKind;
use crate::schema::{
    Binding, Block, Color, ColorCondition, ColorRule, EmitOp, Layer, LiquidSchema, SignalEmit,
    Streaming, ValidationRule,
};

// ── Public API ─────────────────────────────────────────────

/// Serialize a schema to canonical DSL text
///
/// Layout: the signal declaration line, the layer 0 root, then one
/// `/N block` line per overlay layer in id order.
pub fn compile(schema: &LiquidSchema) -> String {
    let mut lines: Vec<String> = Vec::new();

    if !schema.signals.is_empty() {
        let names: Vec<String> = schema.signals.iter().map(|s| format!("@{}", s.name)).collect();
        lines.push(names.join(" "));
    }

    let mut layers: Vec<&Layer> = schema.layers.iter().collect();
    layers.sort_by_key(|layer| layer.id);

    for layer in layers {
        let mut line = String::new();
        if layer.id == 0 {
            if is_empty_container(&layer.root) {
                continue;
            }
        } else {
            line.push_str(&format!("/{} ", layer.id));
        }
        write_block(&mut line, &layer.root);
        lines.push(line);
    }

    lines.join("\n")
}

/// Lowercase hex SHA-256 of the canonical DSL
///
/// Two schemas share a fingerprint exactly when they compile to the same
/// text, so formatting differences in the source never change it.
pub fn fingerprint(schema: &LiquidSchema) -> String {
    let canonical = compile(schema);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

// ── Block serializer ───────────────────────────────────────

fn is_empty_container(block: &Block) -> bool {
    block.kind == BlockKind::Container && block.is_bare() && block.children.is_empty()
}

fn write_block(out: &mut String, block: &Block) {
    if block.kind == BlockKind::Container && block.is_bare() {
        write_children(out, &block.children);
        return;
    }
    out.push_str(block.kind.code());

    // A literal doubles as the label, so an equal label is not repeated
    let label = match (&block.binding, block.label.as_deref()) {
        (Some(Binding::Literal { value }), label) => label.filter(|l| *l != value.as_str()),
        (_, label) => label,
    };
    if let Some(binding) = &block.binding {
        out.push(' ');
        out.push_str(&binding_fragment(binding));
    }
    if let Some(label) = label {
        out.push(' ');
        write_quoted(out, label);
    }

    if let Some(style) = &block.style {
        if let Some(color) = &style.color {
            let fragment = color_fragment(color);
            if !fragment.is_empty() {
                out.push(' ');
                out.push_str(&fragment);
            }
        }
        if let Some(size) = &style.size {
            out.push_str(" %");
            out.push_str(size);
        }
        if let Some(fidelity) = style.fidelity {
            out.push_str(" $");
            out.push_str(fidelity.as_str());
        }
    }

    if let Some(priority) = block.layout.as_ref().and_then(|l| l.priority) {
        out.push_str(" !");
        out.push_str(&priority_word(priority));
    }
    if let Some(action) = &block.action {
        out.push_str(" !");
        out.push_str(action);
    }
    if let Some(flex) = block.layout.as_ref().and_then(|l| l.flex) {
        out.push_str(" ^");
        out.push_str(flex.short());
    }
    if let Some(span) = block.layout.as_ref().and_then(|l| l.span) {
        out.push_str(&format!(" *{}", span));
    }

    if let Some(streaming) = &block.streaming {
        out.push(' ');
        out.push_str(&streaming_fragment(streaming));
    }

    for rule in &block.validation {
        out.push(' ');
        out.push_str(&validation_fragment(rule));
    }

    if let Some(wiring) = &block.signals {
        if let Some(emit) = &wiring.emit {
            out.push(' ');
            out.push_str(&emit_fragment(emit));
        }
        if let Some(name) = &wiring.receive {
            out.push_str(" <");
            out.push_str(name);
        }
        if let Some(name) = &wiring.both {
            out.push_str(" <>");
            out.push_str(name);
        }
        match wiring.layer {
            Some(0) => out.push_str(" /<"),
            Some(id) => out.push_str(&format!(" >/{}", id)),
            None => {}
        }
    }

    if !block.children.is_empty() {
        out.push(' ');
        write_children(out, &block.children);
    }
}

fn write_children(out: &mut String, children: &[Block]) {
    out.push('[');
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_block(out, child);
    }
    out.push(']');
}

// ── Fragments ──────────────────────────────────────────────

pub(crate) fn binding_fragment(binding: &Binding) -> String {
    match binding {
        Binding::Field { path } => format!(":{}", path),
        Binding::Signal { name } => format!("@{}", name),
        Binding::Literal { value } => {
            let mut out = String::new();
            write_quoted(&mut out, value);
            out
        }
        Binding::Iterator { path: Some(path) } => format!(":.{}", path),
        Binding::Iterator { path: None } => ":.".to_string(),
        Binding::IndexRef => ":#".to_string(),
    }
}

/// Empty for a rule list with neither rules nor fallback
pub(crate) fn color_fragment(color: &Color) -> String {
    match color {
        Color::Static(name) => format!("#{}", name),
        Color::Conditional(conditional) => {
            let mut parts: Vec<String> = conditional.rules.iter().map(rule_fragment).collect();
            if let Some(fallback) = &conditional.fallback {
                parts.push(format!(":{}", fallback));
            }
            if parts.is_empty() {
                String::new()
            } else {
                format!("#?{}", parts.join(","))
            }
        }
    }
}

fn rule_fragment(rule: &ColorRule) -> String {
    match rule.condition {
        ColorCondition::Range { min, max } => {
            // "a--b" would scan as a decrement
            let separator = if max < 0.0 { "- " } else { "-" };
            format!(
                "{}{}{}:{}",
                format_number(min),
                separator,
                format_number(max),
                rule.color
            )
        }
        ColorCondition::AtLeast { threshold }
        | ColorCondition::AtMost { threshold }
        | ColorCondition::Above { threshold }
        | ColorCondition::Below { threshold }
        | ColorCondition::Equals { threshold } => format!(
            "{}{}:{}",
            rule.condition.operator(),
            format_number(threshold),
            rule.color
        ),
    }
}

fn priority_word(priority: u8) -> String {
    match priority {
        100 => "h".to_string(),
        75 => "p".to_string(),
        50 => "s".to_string(),
        n => n.to_string(),
    }
}

pub(crate) fn streaming_fragment(streaming: &Streaming) -> String {
    match streaming {
        Streaming::Interval { seconds } if *seconds > 0 && seconds % 60 == 0 => {
            format!("~{}m", seconds / 60)
        }
        Streaming::Interval { seconds } => format!("~{}s", seconds),
        Streaming::Websocket { url } | Streaming::Sse { url } => format!("~{}", url),
    }
}

pub(crate) fn validation_fragment(rule: &ValidationRule) -> String {
    match &rule.arg {
        Some(arg) => format!("?{}={}", rule.rule, value_text(arg)),
        None => format!("?{}", rule.rule),
    }
}

/// `Set` without a value has no spelling of its own and is written `>name`
fn emit_fragment(emit: &SignalEmit) -> String {
    match (emit.op, &emit.value) {
        (Some(EmitOp::Increment), _) => format!(">{}++", emit.name),
        (Some(EmitOp::Decrement), _) => format!(">{}--", emit.name),
        (_, Some(value)) => format!(">{}={}", emit.name, value_text(value)),
        (Some(EmitOp::Set), None) | (None, None) => format!(">{}", emit.name),
    }
}

// ── Helpers ────────────────────────────────────────────────

/// Shortest decimal form: no trailing zeros, no `+`, `-0` becomes `0`
pub(crate) fn format_number(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

/// Bare when the scanner would read it back as one word or number
fn value_text(value: &str) -> String {
    if is_number_text(value) || is_word(value) {
        value.to_string()
    } else {
        let mut out = String::new();
        write_quoted(&mut out, value);
        out
    }
}

fn is_number_text(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(int) && frac.map_or(true, all_digits)
}

fn is_word(value: &str) -> bool {
    let chars: Vec<char> = value.chars().collect();
    let starts_word = chars
        .first()
        .is_some_and(|c| c.is_ascii_alphabetic() || *c == '_');
    starts_word
        && chars.iter().enumerate().all(|(i, c)| {
            c.is_ascii_alphanumeric()
                || *c == '_'
                || (*c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_alphanumeric()))
        })
}

fn write_quoted(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}
