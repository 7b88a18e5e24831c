//! Schema builder — resolves a parsed `Ast` into a `LiquidSchema`
//!
//! One explicit pass over the whole tree, with no shared registries:
//! - type codes resolve through the closed `BlockKind` table
//! - signals are collected (declared names first, then first use)
//! - top-level blocks become layer 0; every layer reference must resolve
//! - modifiers fold into block fields, missing labels are derived from
//!   the field path or copied from the literal
//! - uids are assigned in pre-order once the tree is complete

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{SemanticError, SemanticErrorKind};
use crate::kinds::BlockKind;
use crate::parser::ast::{Ast, AstNode, LayerDef, Modifier, NodeId};
use crate::schema::{
    Binding, Block, Layer, Layout, LiquidSchema, Signal, SignalWiring, Style, SCHEMA_VERSION,
};

/// Resolve an AST into a validated schema
///
/// # Errors
/// `SemanticError` for unknown block types, duplicate or dangling layer
/// ids, and signal bindings that name no known signal.
pub fn build(ast: &Ast) -> Result<LiquidSchema, SemanticError> {
    Builder::new(ast).build()
}

/// Label shown for a field binding without an explicit label
///
/// Last path segment, underscores to spaces, camelCase split, each word
/// title-cased: `orders.firstName` → `First Name`.
pub fn label_from_field(path: &str) -> String {
    let segment = path.rsplit('.').next().unwrap_or(path);

    let mut spaced = String::with_capacity(segment.len() + 4);
    let mut prev: Option<char> = None;
    for c in segment.chars() {
        if c == '_' {
            spaced.push(' ');
        } else {
            if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase()) {
                spaced.push(' ');
            }
            spaced.push(c);
        }
        prev = Some(c);
    }

    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

struct Builder<'a> {
    ast: &'a Ast,
    signals: Vec<Signal>,
    signal_names: BTreeSet<String>,
    layer_ids: BTreeSet<u32>,
}

impl<'a> Builder<'a> {
    fn new(ast: &'a Ast) -> Self {
        Builder {
            ast,
            signals: Vec::new(),
            signal_names: BTreeSet::new(),
            layer_ids: BTreeSet::new(),
        }
    }

    fn build(mut self) -> Result<LiquidSchema, SemanticError> {
        self.collect_layer_ids()?;
        self.collect_signals();

        let explicit_base = self.ast.layers.iter().find(|def| def.id == 0);
        let base_root = match (self.ast.main_blocks.as_slice(), explicit_base) {
            ([], Some(def)) => self.convert(def.root)?,
            ([], None) => Block::new(BlockKind::Container),
            ([single], _) => self.convert(*single)?,
            (many, _) => {
                let mut root = Block::new(BlockKind::Container);
                root.children = self.convert_all(many)?;
                root
            }
        };

        let mut layers = vec![Layer {
            id: 0,
            visible: true,
            root: base_root,
        }];

        let mut overlays: Vec<&LayerDef> = self.ast.layers.iter().filter(|def| def.id != 0).collect();
        overlays.sort_by_key(|def| def.id);
        for def in overlays {
            layers.push(Layer {
                id: def.id,
                visible: false,
                root: self.convert(def.root)?,
            });
        }

        let mut next_uid = 1;
        for layer in &mut layers {
            assign_uids(&mut layer.root, &mut next_uid);
        }

        debug!(
            blocks = next_uid - 1,
            signals = self.signals.len(),
            layers = layers.len(),
            "built schema"
        );

        Ok(LiquidSchema {
            version: SCHEMA_VERSION.to_string(),
            signals: self.signals,
            layers,
        })
    }

    // ── Layers & signals ───────────────────────────────────

    fn collect_layer_ids(&mut self) -> Result<(), SemanticError> {
        for def in &self.ast.layers {
            if !self.layer_ids.insert(def.id) {
                return Err(SemanticError {
                    kind: SemanticErrorKind::DuplicateLayer,
                    detail: format!("layer {} is defined more than once", def.id),
                    position: Some(def.span.clone()),
                });
            }
            if def.id == 0 && !self.ast.main_blocks.is_empty() {
                return Err(SemanticError {
                    kind: SemanticErrorKind::DuplicateLayer,
                    detail: "layer 0 is defined explicitly and by top-level blocks".to_string(),
                    position: Some(def.span.clone()),
                });
            }
        }
        self.layer_ids.insert(0);
        Ok(())
    }

    fn add_signal(&mut self, name: &str) {
        if self.signal_names.insert(name.to_string()) {
            self.signals.push(Signal::new(name));
        }
    }

    fn collect_signals(&mut self) {
        let ast = self.ast;
        for decl in &ast.signals {
            self.add_signal(&decl.name);
        }

        let roots = ast
            .main_blocks
            .iter()
            .copied()
            .chain(ast.layers.iter().map(|def| def.root));

        for root in roots {
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                let node = ast.node(id);
                for modifier in &node.modifiers {
                    match modifier {
                        Modifier::Emit(emit) => self.add_signal(&emit.name),
                        Modifier::Receive(name) | Modifier::Both(name) => self.add_signal(name),
                        _ => {}
                    }
                }
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    // ── Blocks ─────────────────────────────────────────────

    fn convert_all(&self, ids: &[NodeId]) -> Result<Vec<Block>, SemanticError> {
        ids.iter().map(|id| self.convert(*id)).collect()
    }

    fn convert(&self, id: NodeId) -> Result<Block, SemanticError> {
        let node = self.ast.node(id);
        let mut block = Block::new(resolve_kind(node)?);
        block.binding = node.binding.clone();
        block.label = node.label.clone();

        if let Some(Binding::Signal { name }) = &block.binding {
            if !self.signal_names.contains(name) {
                return Err(SemanticError {
                    kind: SemanticErrorKind::UndeclaredSignal,
                    detail: format!("signal '@{}' is bound but never declared or wired", name),
                    position: Some(node.span.clone()),
                });
            }
        }

        let mut layout = Layout::default();
        let mut style = Style::default();
        let mut wiring = SignalWiring::default();

        for modifier in &node.modifiers {
            match modifier {
                Modifier::Color(color) => style.color = Some(color.clone()),
                Modifier::Size(size) => style.size = Some(size.clone()),
                Modifier::Fidelity(fidelity) => style.fidelity = Some(*fidelity),
                Modifier::Priority(priority) => layout.priority = Some(*priority),
                Modifier::Action(action) => block.action = Some(action.clone()),
                Modifier::Flex(flex) => layout.flex = Some(*flex),
                Modifier::Span(span) => layout.span = Some(*span),
                Modifier::Stream(streaming) => block.streaming = Some(streaming.clone()),
                Modifier::Validate(rule) => block.validation.push(rule.clone()),
                Modifier::Emit(emit) => wiring.emit = Some(emit.clone()),
                Modifier::Receive(name) => wiring.receive = Some(name.clone()),
                Modifier::Both(name) => wiring.both = Some(name.clone()),
                Modifier::OpenLayer(layer) => {
                    if !self.layer_ids.contains(layer) {
                        return Err(SemanticError {
                            kind: SemanticErrorKind::UnresolvedLayer,
                            detail: format!("layer {} is opened but never defined", layer),
                            position: Some(node.span.clone()),
                        });
                    }
                    wiring.layer = Some(*layer);
                }
                Modifier::CloseLayer => wiring.layer = Some(0),
            }
        }

        block.layout = (!layout.is_empty()).then_some(layout);
        block.style = (!style.is_empty()).then_some(style);
        block.signals = (!wiring.is_empty()).then_some(wiring);

        if block.label.is_none() {
            block.label = match &block.binding {
                Some(Binding::Field { path }) => Some(label_from_field(path)),
                Some(Binding::Literal { value }) => Some(value.clone()),
                _ => None,
            };
        }

        block.children = self.convert_all(&node.children)?;
        Ok(block)
    }
}

fn resolve_kind(node: &AstNode) -> Result<BlockKind, SemanticError> {
    BlockKind::from_code(&node.type_code)
        .or_else(|| node.type_index.and_then(BlockKind::from_index))
        .ok_or_else(|| SemanticError {
            kind: SemanticErrorKind::UnknownBlockType,
            detail: format!("unknown block type '{}'", node.type_code),
            position: Some(node.span.clone()),
        })
}

fn assign_uids(block: &mut Block, next: &mut usize) {
    block.uid = format!("b{}", next);
    *next += 1;
    for child in &mut block.children {
        assign_uids(child, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParseOptions};
    use crate::schema::{Color, ColumnSpan, EmitOp, Flex};

    fn build_ok(input: &str) -> LiquidSchema {
        build(&parse(input, &ParseOptions::default()).unwrap()).unwrap()
    }

    fn build_err(input: &str) -> SemanticError {
        build(&parse(input, &ParseOptions::default()).unwrap()).unwrap_err()
    }

    fn base_root(schema: &LiquidSchema) -> &Block {
        &schema.base().unwrap().root
    }

    // ── Auto labels ────────────────────────────────────

    #[test]
    fn test_label_from_field() {
        assert_eq!(label_from_field("firstName"), "First Name");
        assert_eq!(label_from_field("user_name"), "User Name");
        assert_eq!(label_from_field("orders.totalRevenue"), "Total Revenue");
        assert_eq!(label_from_field("revenue"), "Revenue");
        assert_eq!(label_from_field("q3Revenue"), "Q3Revenue");
        assert_eq!(label_from_field("a__b"), "A B");
    }

    #[test]
    fn test_auto_label_applied() {
        let schema = build_ok("In :firstName");
        assert_eq!(base_root(&schema).label.as_deref(), Some("First Name"));
    }

    #[test]
    fn test_explicit_label_kept() {
        let schema = build_ok(r#"Kp :revenue "Sales""#);
        assert_eq!(base_root(&schema).label.as_deref(), Some("Sales"));
    }

    #[test]
    fn test_literal_becomes_label() {
        let schema = build_ok(r#"Bt "Save""#);
        let root = base_root(&schema);
        assert_eq!(
            root.binding,
            Some(Binding::Literal {
                value: "Save".into()
            })
        );
        assert_eq!(root.label.as_deref(), Some("Save"));

        let schema = build_ok(r#"Bt "save" "Save changes""#);
        assert_eq!(base_root(&schema).label.as_deref(), Some("Save changes"));
    }

    #[test]
    fn test_no_auto_label_for_iterator() {
        let schema = build_ok("Ls :orders [Tx :.total, Tx :#]");
        let items = &base_root(&schema).children;
        assert_eq!(items[0].label, None);
        assert_eq!(items[1].binding, Some(Binding::IndexRef));
    }

    // ── Layer 0 grouping ───────────────────────────────

    #[test]
    fn test_single_block_is_root() {
        let schema = build_ok("Kp :revenue");
        assert_eq!(base_root(&schema).kind, BlockKind::Kpi);
        assert_eq!(schema.layers.len(), 1);
        assert!(schema.layers[0].visible);
    }

    #[test]
    fn test_many_blocks_are_wrapped() {
        let schema = build_ok("Kp :a\nKp :b\nTb :c");
        let root = base_root(&schema);
        assert_eq!(root.kind, BlockKind::Container);
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.uid, "b1");
        assert_eq!(root.children[2].uid, "b4");
    }

    #[test]
    fn test_empty_program_is_empty_container() {
        let schema = build_ok("");
        assert_eq!(base_root(&schema).kind, BlockKind::Container);
        assert!(base_root(&schema).children.is_empty());
        assert!(schema.signals.is_empty());
    }

    #[test]
    fn test_explicit_base_layer() {
        let schema = build_ok("/0 [Kp :a]");
        assert_eq!(base_root(&schema).children.len(), 1);
        assert_eq!(build_err("Kp :a\n/0 Tb :b").kind, SemanticErrorKind::DuplicateLayer);
    }

    // ── Layers ─────────────────────────────────────────

    #[test]
    fn test_layers_sorted_and_hidden() {
        let schema = build_ok("Bt \"A\" >/2, Bt \"B\" >/1\n/2 Dw [Tx :a]\n/1 Md [Tx :b]");
        let ids: Vec<u32> = schema.layers.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(!schema.layers[1].visible);
        assert_eq!(schema.layers[1].root.kind, BlockKind::Modal);
    }

    #[test]
    fn test_duplicate_layer() {
        let err = build_err("/1 Md\n/1 Dw");
        assert_eq!(err.kind, SemanticErrorKind::DuplicateLayer);
        assert_eq!(err.position.map(|p| p.line), Some(2));
    }

    #[test]
    fn test_dangling_layer_reference() {
        let err = build_err(r#"Bt "Open" >/9"#);
        assert_eq!(err.kind, SemanticErrorKind::UnresolvedLayer);
        assert!(err.detail.contains("layer 9"));
    }

    #[test]
    fn test_layer_open_and_close() {
        let schema = build_ok("Bt \"Open\" >/1\n/1 Md [Bt \"Close\" /<]");
        let open = base_root(&schema).signals.as_ref().unwrap();
        assert_eq!(open.layer, Some(1));
        let close = schema.layers[1].root.children[0].signals.as_ref().unwrap();
        assert_eq!(close.layer, Some(0));
    }

    // ── Signals ────────────────────────────────────────

    #[test]
    fn test_signals_declared_then_discovered() {
        let schema = build_ok("@tab\n[Bt >filter=a, Tx <tab, Dp <>range, Bt >filter=b]");
        let names: Vec<&str> = schema.signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["tab", "filter", "range"]);
    }

    #[test]
    fn test_signal_binding_must_resolve() {
        let err = build_err("Tx @missing");
        assert_eq!(err.kind, SemanticErrorKind::UndeclaredSignal);
        assert!(err.detail.contains("@missing"));

        let schema = build_ok("[Bt >count++, Tx @count]");
        assert!(schema.has_signal("count"));
    }

    #[test]
    fn test_increment_wiring() {
        let schema = build_ok(r#"Bt "+" >count++"#);
        let emit = base_root(&schema)
            .signals
            .as_ref()
            .and_then(|s| s.emit.as_ref())
            .unwrap();
        assert_eq!(emit.name, "count");
        assert_eq!(emit.op, Some(EmitOp::Increment));
        assert_eq!(emit.value, None);
    }

    // ── Kinds & modifiers ──────────────────────────────

    #[test]
    fn test_unknown_block_type() {
        let err = build_err("[Kp :a, Zz :b]");
        assert_eq!(err.kind, SemanticErrorKind::UnknownBlockType);
        assert!(err.detail.contains("'Zz'"));
        assert_eq!(err.position.map(|p| p.column), Some(9));
    }

    #[test]
    fn test_last_singleton_modifier_wins() {
        let schema = build_ok("Kp :a #red #blue ^g ^f");
        let root = base_root(&schema);
        assert_eq!(
            root.style.as_ref().and_then(|s| s.color.clone()),
            Some(Color::Static("blue".into()))
        );
        assert_eq!(root.layout.as_ref().and_then(|l| l.flex), Some(Flex::Fill));
    }

    #[test]
    fn test_span_folds_into_layout() {
        let schema = build_ok("[Kp :a *h, Kp :b *3 !p]");
        let children = &base_root(&schema).children;
        let span = |i: usize| children[i].layout.as_ref().and_then(|l| l.span);
        assert_eq!(span(0), ColumnSpan::from_word("h"));
        assert_eq!(span(1), ColumnSpan::columns(3));
        assert_eq!(children[1].layout.as_ref().and_then(|l| l.priority), Some(75));
    }

    #[test]
    fn test_absent_groups_stay_none() {
        let schema = build_ok("Kp :a");
        let root = base_root(&schema);
        assert!(root.layout.is_none());
        assert!(root.style.is_none());
        assert!(root.signals.is_none());
    }

    #[test]
    fn test_uids_pre_order_across_layers() {
        let schema = build_ok("[Kp :a, [Tx :b]]\n/1 Md [Tx :c]");
        let mut uids = Vec::new();
        for layer in &schema.layers {
            layer.root.walk(&mut |b| uids.push(b.uid.clone()));
        }
        assert_eq!(uids, vec!["b1", "b2", "b3", "b4", "b5", "b6"]);
    }
}
