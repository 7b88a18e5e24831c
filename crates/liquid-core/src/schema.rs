//! LiquidSchema — the canonical structured form of a LiquidCode program
//!
//! These types are the JSON wire format shared with renderers and with the
//! language bindings. Optional fields are omitted from JSON when absent so
//! that hand-written schemas stay short.

use serde::{Deserialize, Serialize};

use crate::kinds::BlockKind;

/// Schema format version written by the builder
pub const SCHEMA_VERSION: &str = "1.0";

/// Root of a compiled program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidSchema {
    pub version: String,
    #[serde(default)]
    pub signals: Vec<Signal>,
    pub layers: Vec<Layer>,
}

impl LiquidSchema {
    /// Schema with no signals and an empty base layer
    pub fn empty() -> Self {
        LiquidSchema {
            version: SCHEMA_VERSION.to_string(),
            signals: Vec::new(),
            layers: vec![Layer {
                id: 0,
                visible: true,
                root: Block::new(BlockKind::Container),
            }],
        }
    }

    pub fn layer(&self, id: u32) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Layer 0
    pub fn base(&self) -> Option<&Layer> {
        self.layer(0)
    }

    pub fn has_signal(&self, name: &str) -> bool {
        self.signals.iter().any(|s| s.name == name)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Named reactive value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
}

impl Signal {
    pub fn new(name: impl Into<String>) -> Self {
        Signal { name: name.into() }
    }
}

/// Addressable surface: the base view (id 0) or an overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: u32,
    pub visible: bool,
    pub root: Block,
}

/// One UI component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Structural id (`b1`, `b2`, …), unique within a schema
    #[serde(default)]
    pub uid: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    /// Named action triggered by the block (`!submit`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<SignalWiring>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming: Option<Streaming>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    /// Block of the given kind with every optional field absent
    pub fn new(kind: BlockKind) -> Self {
        Block {
            uid: String::new(),
            kind,
            binding: None,
            label: None,
            layout: None,
            style: None,
            action: None,
            signals: None,
            streaming: None,
            validation: Vec::new(),
            children: Vec::new(),
        }
    }

    /// True when the block carries nothing but (possibly) children
    pub fn is_bare(&self) -> bool {
        self.binding.is_none()
            && self.label.is_none()
            && self.layout.as_ref().map_or(true, Layout::is_empty)
            && self.style.as_ref().map_or(true, Style::is_empty)
            && self.action.is_none()
            && self.signals.as_ref().map_or(true, SignalWiring::is_empty)
            && self.streaming.is_none()
            && self.validation.is_empty()
    }

    /// Pre-order walk over this block and its descendants
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Block)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Where a block's value comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Binding {
    /// Dotted path into the data source
    Field { path: String },
    Literal { value: String },
    /// Current value of a declared signal
    Signal { name: String },
    /// Field of the current item while a parent repeats over a list;
    /// no path means the item itself
    Iterator {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    /// Position of the current item in the repeated list
    IndexRef,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// 0..=100, higher survives longer when space is short
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flex: Option<Flex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<ColumnSpan>,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none() && self.flex.is_none() && self.span.is_none()
    }
}

/// Grid columns a block occupies: a count or a fraction of the row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpan {
    /// 1..=9
    Columns(u8),
    Fraction(Fraction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fraction {
    Full,
    Half,
    Third,
    Quarter,
}

impl ColumnSpan {
    /// `None` outside 1..=9
    pub fn columns(count: u8) -> Option<ColumnSpan> {
        (1..=9).contains(&count).then_some(ColumnSpan::Columns(count))
    }

    /// Accepts the one-letter form (`h`) or the full name (`half`)
    pub fn from_word(word: &str) -> Option<ColumnSpan> {
        let fraction = match word {
            "f" | "full" => Fraction::Full,
            "h" | "half" => Fraction::Half,
            "t" | "third" => Fraction::Third,
            "q" | "quarter" => Fraction::Quarter,
            _ => return None,
        };
        Some(ColumnSpan::Fraction(fraction))
    }
}

impl std::fmt::Display for ColumnSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ColumnSpan::Columns(count) => write!(f, "{}", count),
            ColumnSpan::Fraction(Fraction::Full) => f.write_str("f"),
            ColumnSpan::Fraction(Fraction::Half) => f.write_str("h"),
            ColumnSpan::Fraction(Fraction::Third) => f.write_str("t"),
            ColumnSpan::Fraction(Fraction::Quarter) => f.write_str("q"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flex {
    Grow,
    Shrink,
    Fill,
    Collapse,
}

impl Flex {
    /// Accepts the one-letter form (`g`) or the full name (`grow`)
    pub fn from_word(word: &str) -> Option<Flex> {
        match word {
            "g" | "grow" => Some(Flex::Grow),
            "s" | "shrink" => Some(Flex::Shrink),
            "f" | "fill" => Some(Flex::Fill),
            "c" | "collapse" => Some(Flex::Collapse),
            _ => None,
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Flex::Grow => "g",
            Flex::Shrink => "s",
            Flex::Fill => "f",
            Flex::Collapse => "c",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fidelity: Option<Fidelity>,
}

impl Style {
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.size.is_none() && self.fidelity.is_none()
    }
}

/// Rendering fidelity hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fidelity {
    Lo,
    Hi,
    Auto,
    Skeleton,
    Defer,
}

impl Fidelity {
    pub fn from_word(word: &str) -> Option<Fidelity> {
        match word {
            "lo" => Some(Fidelity::Lo),
            "hi" => Some(Fidelity::Hi),
            "auto" => Some(Fidelity::Auto),
            "skeleton" => Some(Fidelity::Skeleton),
            "defer" => Some(Fidelity::Defer),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Fidelity::Lo => "lo",
            Fidelity::Hi => "hi",
            Fidelity::Auto => "auto",
            Fidelity::Skeleton => "skeleton",
            Fidelity::Defer => "defer",
        }
    }
}

/// A static color name or a value-dependent rule list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Static(String),
    Conditional(ConditionalColor),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalColor {
    pub rules: Vec<ColorRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl ConditionalColor {
    /// Color for `value`: first matching rule, else the fallback
    pub fn resolve(&self, value: f64) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.condition.matches(value))
            .map(|rule| rule.color.as_str())
            .or(self.fallback.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRule {
    #[serde(flatten)]
    pub condition: ColorCondition,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator")]
pub enum ColorCondition {
    #[serde(rename = ">=")]
    AtLeast { threshold: f64 },
    #[serde(rename = "<=")]
    AtMost { threshold: f64 },
    #[serde(rename = ">")]
    Above { threshold: f64 },
    #[serde(rename = "<")]
    Below { threshold: f64 },
    #[serde(rename = "=")]
    Equals { threshold: f64 },
    /// Inclusive on both ends
    #[serde(rename = "range")]
    Range { min: f64, max: f64 },
}

impl ColorCondition {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            ColorCondition::AtLeast { threshold } => value >= threshold,
            ColorCondition::AtMost { threshold } => value <= threshold,
            ColorCondition::Above { threshold } => value > threshold,
            ColorCondition::Below { threshold } => value < threshold,
            ColorCondition::Equals { threshold } => value == threshold,
            ColorCondition::Range { min, max } => value >= min && value <= max,
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            ColorCondition::AtLeast { .. } => ">=",
            ColorCondition::AtMost { .. } => "<=",
            ColorCondition::Above { .. } => ">",
            ColorCondition::Below { .. } => "<",
            ColorCondition::Equals { .. } => "=",
            ColorCondition::Range { .. } => "range",
        }
    }
}

/// Signal connections of a block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalWiring {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emit: Option<SignalEmit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub both: Option<String>,
    /// Layer opened on activation; 0 closes the current layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<u32>,
}

impl SignalWiring {
    pub fn is_empty(&self) -> bool {
        self.emit.is_none() && self.receive.is_none() && self.both.is_none() && self.layer.is_none()
    }

    /// Every signal name this wiring touches
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.emit
            .as_ref()
            .map(|e| e.name.as_str())
            .into_iter()
            .chain(self.receive.as_deref())
            .chain(self.both.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEmit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<EmitOp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitOp {
    Set,
    Increment,
    Decrement,
}

impl EmitOp {
    pub fn as_str(self) -> &'static str {
        match self {
            EmitOp::Set => "set",
            EmitOp::Increment => "increment",
            EmitOp::Decrement => "decrement",
        }
    }
}

/// Live data source of a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Streaming {
    Interval { seconds: u32 },
    Websocket { url: String },
    Sse { url: String },
}

/// Input constraint (`?required`, `?min=3`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn health_color() -> ConditionalColor {
        ConditionalColor {
            rules: vec![
                ColorRule {
                    condition: ColorCondition::AtLeast { threshold: 80.0 },
                    color: "green".into(),
                },
                ColorRule {
                    condition: ColorCondition::Range { min: 50.0, max: 79.0 },
                    color: "yellow".into(),
                },
            ],
            fallback: Some("red".into()),
        }
    }

    #[test]
    fn test_conditional_color_first_match_wins() {
        let color = health_color();
        assert_eq!(color.resolve(95.0), Some("green"));
        assert_eq!(color.resolve(80.0), Some("green"));
        assert_eq!(color.resolve(50.0), Some("yellow"));
        assert_eq!(color.resolve(12.0), Some("red"));
    }

    #[test]
    fn test_conditional_color_without_fallback() {
        let color = ConditionalColor {
            rules: vec![ColorRule {
                condition: ColorCondition::Below { threshold: 0.0 },
                color: "red".into(),
            }],
            fallback: None,
        };
        assert_eq!(color.resolve(5.0), None);
        assert_eq!(color.resolve(-1.0), Some("red"));
    }

    #[test]
    fn test_block_json_omits_absent_fields() {
        let mut block = Block::new(BlockKind::Kpi);
        block.uid = "b1".into();
        block.binding = Some(Binding::Field {
            path: "revenue".into(),
        });
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            json!({"uid": "b1", "type": "kpi", "binding": {"kind": "field", "path": "revenue"}})
        );
    }

    #[test]
    fn test_color_rule_json_shape() {
        let value = serde_json::to_value(Color::Conditional(health_color())).unwrap();
        assert_eq!(
            value,
            json!({
                "rules": [
                    {"operator": ">=", "threshold": 80.0, "color": "green"},
                    {"operator": "range", "min": 50.0, "max": 79.0, "color": "yellow"}
                ],
                "fallback": "red"
            })
        );
    }

    #[test]
    fn test_static_color_is_plain_string() {
        let value = serde_json::to_value(Color::Static("blue".into())).unwrap();
        assert_eq!(value, json!("blue"));
        let back: Color = serde_json::from_value(json!("blue")).unwrap();
        assert_eq!(back, Color::Static("blue".into()));
    }

    #[test]
    fn test_streaming_json_shape() {
        let value = serde_json::to_value(Streaming::Interval { seconds: 30 }).unwrap();
        assert_eq!(value, json!({"kind": "interval", "seconds": 30}));
    }

    #[test]
    fn test_iterator_binding_json_shape() {
        let item = Binding::Iterator {
            path: Some("name".into()),
        };
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({"kind": "iterator", "path": "name"})
        );
        assert_eq!(
            serde_json::to_value(Binding::Iterator { path: None }).unwrap(),
            json!({"kind": "iterator"})
        );
        let index: Binding = serde_json::from_value(json!({"kind": "indexRef"})).unwrap();
        assert_eq!(index, Binding::IndexRef);
    }

    #[test]
    fn test_column_span_json_and_words() {
        let layout = Layout {
            span: ColumnSpan::columns(3),
            ..Layout::default()
        };
        assert_eq!(serde_json::to_value(&layout).unwrap(), json!({"span": 3}));
        let half: ColumnSpan = serde_json::from_value(json!("half")).unwrap();
        assert_eq!(half, ColumnSpan::Fraction(Fraction::Half));
        assert_eq!(ColumnSpan::from_word("q").map(|s| s.to_string()).as_deref(), Some("q"));
        assert_eq!(ColumnSpan::columns(0), None);
        assert_eq!(ColumnSpan::columns(10), None);
    }

    #[test]
    fn test_schema_from_hand_written_json() {
        let schema = LiquidSchema::from_json(
            r#"{"version": "1.0", "layers": [{"id": 0, "visible": true,
                "root": {"type": "button", "label": "Go",
                         "signals": {"emit": {"name": "count", "op": "increment"}}}}]}"#,
        )
        .unwrap();
        let root = &schema.base().unwrap().root;
        assert_eq!(root.kind, BlockKind::Button);
        assert_eq!(root.uid, "");
        let emit = root.signals.as_ref().and_then(|s| s.emit.as_ref()).unwrap();
        assert_eq!(emit.op, Some(EmitOp::Increment));
        assert!(schema.signals.is_empty());
    }

    #[test]
    fn test_bad_json_is_error() {
        let err = LiquidSchema::from_json("{\"version\": 1}").unwrap_err();
        assert_eq!(err.stage(), "json");
    }

    #[test]
    fn test_is_bare() {
        let mut block = Block::new(BlockKind::Container);
        block.children.push(Block::new(BlockKind::Kpi));
        block.style = Some(Style::default());
        assert!(block.is_bare());
        block.label = Some("x".into());
        assert!(!block.is_bare());
    }

    #[test]
    fn test_flex_words() {
        assert_eq!(Flex::from_word("g"), Some(Flex::Grow));
        assert_eq!(Flex::from_word("collapse"), Some(Flex::Collapse));
        assert_eq!(Flex::from_word("x"), None);
        assert_eq!(Flex::Fill.short(), "f");
    }
}
