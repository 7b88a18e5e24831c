//! Roundtrip verifier — parse → emit → parse, then compare structurally
//!
//! Formatting is free to change between the input and the re-emitted text;
//! the structure is not. The comparison walks both schemas and accumulates
//! every difference rather than stopping at the first one, so a report
//! gives the complete picture.
//!
//! Ignored during comparison: uids, signal order, layer order and layer
//! visibility (runtime state the text cannot carry). Absent parts that the
//! text spells the same way compare equal:
//! - a missing label where the field auto label or the literal would apply
//! - a label without a binding and the literal of the same text
//! - an emit of `set` without a value and a plain emit

use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::builder::label_from_field;
use crate::emitter::{
    binding_fragment, color_fragment, compile, streaming_fragment, validation_fragment,
};
use crate::schema::{Binding, Block, EmitOp, LiquidSchema, SignalEmit};
use crate::Result;

/// What to roundtrip: DSL text or an existing schema
#[derive(Debug, Clone, Copy)]
pub enum RoundtripInput<'a> {
    Dsl(&'a str),
    Schema(&'a LiquidSchema),
}

impl<'a> From<&'a str> for RoundtripInput<'a> {
    fn from(dsl: &'a str) -> Self {
        RoundtripInput::Dsl(dsl)
    }
}

impl<'a> From<&'a String> for RoundtripInput<'a> {
    fn from(dsl: &'a String) -> Self {
        RoundtripInput::Dsl(dsl)
    }
}

impl<'a> From<&'a LiquidSchema> for RoundtripInput<'a> {
    fn from(schema: &'a LiquidSchema) -> Self {
        RoundtripInput::Schema(schema)
    }
}

/// Outcome of one roundtrip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundtripReport {
    /// The canonical text emitted from the first schema
    pub dsl: String,
    pub is_equivalent: bool,
    pub differences: Vec<String>,
}

// ── Public API ────────────────────────────────────────────

/// Emit the schema, parse the text again, and compare the two schemas
///
/// # Errors
/// Only when DSL input fails to parse. A failure to re-parse the emitted
/// text is reported as a difference, not an error.
pub fn roundtrip<'a>(input: impl Into<RoundtripInput<'a>>) -> Result<RoundtripReport> {
    let original: Cow<'a, LiquidSchema> = match input.into() {
        RoundtripInput::Dsl(text) => Cow::Owned(crate::parse(text)?),
        RoundtripInput::Schema(schema) => Cow::Borrowed(schema),
    };

    let dsl = compile(&original);
    let differences = match crate::parse(&dsl) {
        Ok(reparsed) => compare(&original, &reparsed),
        Err(err) => vec![format!("emitted text does not parse: {}", err)],
    };

    let is_equivalent = differences.is_empty();
    debug!(is_equivalent, differences = differences.len(), "roundtrip");

    Ok(RoundtripReport {
        dsl,
        is_equivalent,
        differences,
    })
}

/// Every structural difference between two schemas, as readable paths
///
/// An empty result means the schemas are equivalent.
pub fn compare(expected: &LiquidSchema, actual: &LiquidSchema) -> Vec<String> {
    let mut diff = Differences::default();

    if expected.version != actual.version {
        diff.push(format!(
            "version: expected '{}', got '{}'",
            expected.version, actual.version
        ));
    }

    let expected_signals: BTreeSet<&str> = expected.signals.iter().map(|s| s.name.as_str()).collect();
    let actual_signals: BTreeSet<&str> = actual.signals.iter().map(|s| s.name.as_str()).collect();
    for name in expected_signals.difference(&actual_signals) {
        diff.push(format!("signals: missing '@{}'", name));
    }
    for name in actual_signals.difference(&expected_signals) {
        diff.push(format!("signals: unexpected '@{}'", name));
    }

    for layer in &expected.layers {
        match actual.layer(layer.id) {
            None => diff.push(format!("layers: missing layer {}", layer.id)),
            Some(other) => {
                diff.compare_block(&format!("layers[{}].root", layer.id), &layer.root, &other.root)
            }
        }
    }
    for layer in &actual.layers {
        if expected.layer(layer.id).is_none() {
            diff.push(format!("layers: unexpected layer {}", layer.id));
        }
    }

    diff.found
}

// ── Block comparison ──────────────────────────────────────

#[derive(Default)]
struct Differences {
    found: Vec<String>,
}

impl Differences {
    fn push(&mut self, difference: String) {
        self.found.push(difference);
    }

    fn check<T: PartialEq>(
        &mut self,
        path: &str,
        field: &str,
        expected: Option<T>,
        actual: Option<T>,
        render: impl Fn(&T) -> String,
    ) {
        if expected != actual {
            let describe = |value: &Option<T>| match value {
                Some(v) => format!("'{}'", render(v)),
                None => "none".to_string(),
            };
            self.found.push(format!(
                "{}.{}: expected {}, got {}",
                path,
                field,
                describe(&expected),
                describe(&actual)
            ));
        }
    }

    fn compare_block(&mut self, path: &str, expected: &Block, actual: &Block) {
        self.check(path, "type", Some(expected.kind), Some(actual.kind), |k| {
            k.name().to_string()
        });
        self.check(
            path,
            "binding",
            effective_binding(expected),
            effective_binding(actual),
            |b| binding_fragment(b),
        );
        self.check(
            path,
            "label",
            effective_label(expected),
            effective_label(actual),
            |l| l.to_string(),
        );

        let layout = |b: &Block| b.layout.clone().unwrap_or_default();
        let (e_layout, a_layout) = (layout(expected), layout(actual));
        self.check(path, "layout.priority", e_layout.priority, a_layout.priority, |p| {
            p.to_string()
        });
        self.check(path, "layout.flex", e_layout.flex, a_layout.flex, |f| {
            f.short().to_string()
        });
        self.check(path, "layout.span", e_layout.span, a_layout.span, |s| s.to_string());

        let style = |b: &Block| b.style.clone().unwrap_or_default();
        let (e_style, a_style) = (style(expected), style(actual));
        self.check(path, "style.color", e_style.color, a_style.color, |c| {
            color_fragment(c).trim_start_matches('#').to_string()
        });
        self.check(path, "style.size", e_style.size, a_style.size, |s| s.clone());
        self.check(path, "style.fidelity", e_style.fidelity, a_style.fidelity, |f| {
            f.as_str().to_string()
        });

        self.check(
            path,
            "action",
            expected.action.as_deref(),
            actual.action.as_deref(),
            |a| a.to_string(),
        );

        let wiring = |b: &Block| b.signals.clone().unwrap_or_default();
        let (e_wiring, a_wiring) = (wiring(expected), wiring(actual));
        self.check(
            path,
            "signals.emit",
            e_wiring.emit.as_ref().map(effective_emit),
            a_wiring.emit.as_ref().map(effective_emit),
            describe_emit,
        );
        self.check(path, "signals.receive", e_wiring.receive, a_wiring.receive, |s| {
            s.clone()
        });
        self.check(path, "signals.both", e_wiring.both, a_wiring.both, |s| s.clone());
        self.check(path, "signals.layer", e_wiring.layer, a_wiring.layer, |l| {
            l.to_string()
        });

        self.check(
            path,
            "streaming",
            expected.streaming.as_ref(),
            actual.streaming.as_ref(),
            |s| streaming_fragment(s),
        );

        let rules = |b: &Block| {
            (!b.validation.is_empty()).then(|| {
                b.validation
                    .iter()
                    .map(validation_fragment)
                    .collect::<Vec<String>>()
                    .join(" ")
            })
        };
        self.check(path, "validation", rules(expected), rules(actual), |r| r.clone());

        if expected.children.len() != actual.children.len() {
            self.found.push(format!(
                "{}.children: expected {} blocks, got {}",
                path,
                expected.children.len(),
                actual.children.len()
            ));
        }
        for (i, (e, a)) in expected.children.iter().zip(&actual.children).enumerate() {
            self.compare_block(&format!("{}.children[{}]", path, i), e, a);
        }
    }
}

/// The stored binding, or the literal a lone label is written as
fn effective_binding(block: &Block) -> Option<Cow<'_, Binding>> {
    match (&block.binding, &block.label) {
        (Some(binding), _) => Some(Cow::Borrowed(binding)),
        (None, Some(label)) => Some(Cow::Owned(Binding::Literal {
            value: label.clone(),
        })),
        (None, None) => None,
    }
}

/// The stored label, or the one the builder derives from the binding
fn effective_label(block: &Block) -> Option<Cow<'_, str>> {
    match (&block.label, &block.binding) {
        (Some(label), _) => Some(Cow::Borrowed(label.as_str())),
        (None, Some(Binding::Field { path })) => Some(Cow::Owned(label_from_field(path))),
        (None, Some(Binding::Literal { value })) => Some(Cow::Borrowed(value.as_str())),
        (None, _) => None,
    }
}

/// A value always means `set`; `set` alone means a plain emit
fn effective_emit(emit: &SignalEmit) -> SignalEmit {
    let op = match (emit.op, &emit.value) {
        (Some(EmitOp::Set), None) => None,
        (None, Some(_)) => Some(EmitOp::Set),
        (op, _) => op,
    };
    SignalEmit {
        op,
        ..emit.clone()
    }
}

fn describe_emit(emit: &SignalEmit) -> String {
    let mut text = emit.name.clone();
    if let Some(op) = emit.op {
        text.push_str(&format!(" op={}", op.as_str()));
    }
    if let Some(value) = &emit.value {
        text.push_str(&format!(" value={}", value));
    }
    text
}
