//! LiquidCode parser — scanner, AST types, and recursive descent parser
//!
//! Converts DSL text into an arena `Ast`:
//!
//! ```text
//! program    := (statement (NEWLINE | ","))* statement?
//! statement  := signalDecl | layerDef | block
//! signalDecl := "sig" ident | "@" ident
//! layerDef   := "/" number block
//! block      := head item* children? | children
//! head       := typeCode | digit | "opt" | "step"
//! item       := binding | string | modifier
//! binding    := ":" path | ":." path? | ":#" | "@" name
//! children   := "[" (block ("," block)* ","?)? "]"
//! ```
//!
//! Strings are placed after the other items are read: without a `:` or `@`
//! binding the first string is the literal binding and a second one is the
//! label; with one, the string is the label.
//!
//! The first error aborts the parse; no partial AST is returned.

pub mod ast;
pub mod scanner;

use tracing::{debug, trace};

use crate::error::ParseError;
use crate::kinds::BlockKind;
use crate::schema::{
    Binding, Color, ColorCondition, ColorRule, ColumnSpan, ConditionalColor, EmitOp, Fidelity,
    Flex, SignalEmit, Streaming, ValidationRule,
};
use ast::{Ast, AstNode, LayerDef, Modifier, NodeId, SignalDecl};
use scanner::{Span, Token, TokenKind};

/// Default limit on block nesting
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Parser configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest allowed block nesting; a top-level block is depth 1
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Scan and parse DSL text into an AST
///
/// # Errors
/// `Error::Lex` for malformed tokens, `Error::Parse` for grammar violations.
pub fn parse(input: &str, options: &ParseOptions) -> crate::Result<Ast> {
    let tokens = scanner::scan(input)?;
    debug!(tokens = tokens.len(), "scanned");
    Ok(parse_tokens(&tokens, options)?)
}

/// Parse an already scanned token stream
pub fn parse_tokens(tokens: &[Token], options: &ParseOptions) -> Result<Ast, ParseError> {
    let ast = Parser::new(tokens, options).parse_program()?;
    debug!(
        nodes = ast.nodes.len(),
        signals = ast.signals.len(),
        layers = ast.layers.len(),
        "parsed"
    );
    Ok(ast)
}

type PResult<T> = Result<T, ParseError>;

/// Returned past the end of a stream that lacks its own `Eof`
static EOF: Token = Token {
    kind: TokenKind::Eof,
    text: String::new(),
    span: Span {
        line: 0,
        column: 0,
        offset: 0,
    },
};

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    max_depth: usize,
    ast: Ast,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], options: &ParseOptions) -> Self {
        Parser {
            tokens,
            pos: 0,
            max_depth: options.max_depth,
            ast: Ast::default(),
        }
    }

    // ── Token helpers ──────────────────────────────────────

    fn peek(&self) -> &'t Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &'t Token {
        let tokens = self.tokens;
        tokens.get(self.pos + offset).unwrap_or(&EOF)
    }

    fn advance(&mut self) -> &'t Token {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, expected: impl Into<String>) -> ParseError {
        error_at(self.peek(), expected)
    }

    fn expect_word(&mut self, what: &str) -> PResult<String> {
        match &self.peek().kind {
            TokenKind::Ident(word) | TokenKind::TypeCode(word) => {
                self.advance();
                Ok(word.clone())
            }
            _ => Err(self.error(what)),
        }
    }

    fn expect_integer(&mut self, what: &str) -> PResult<u32> {
        let token = self.peek();
        if let TokenKind::Number(_) = token.kind {
            if let Ok(n) = token.text.parse::<u32>() {
                self.advance();
                return Ok(n);
            }
        }
        Err(self.error(what))
    }

    /// Value of `=value`, `?rule=value` and `>signal=value`
    fn parse_value(&mut self, what: &str) -> PResult<String> {
        let token = self.peek();
        match &token.kind {
            TokenKind::Str(value) => {
                self.advance();
                Ok(value.clone())
            }
            TokenKind::Number(_) => {
                self.advance();
                Ok(token.text.clone())
            }
            TokenKind::Minus if matches!(self.peek_at(1).kind, TokenKind::Number(_)) => {
                self.advance();
                let number = self.advance();
                Ok(format!("-{}", number.text))
            }
            TokenKind::Ident(word) | TokenKind::TypeCode(word) => {
                self.advance();
                Ok(word.clone())
            }
            _ => Err(self.error(what)),
        }
    }

    fn expect_statement_end(&self) -> PResult<()> {
        match self.peek().kind {
            TokenKind::Newline | TokenKind::Comma | TokenKind::Eof => Ok(()),
            _ => Err(self.error("newline, ',' or end of input")),
        }
    }

    // ── Statements ─────────────────────────────────────────

    fn parse_program(mut self) -> PResult<Ast> {
        loop {
            while matches!(self.peek().kind, TokenKind::Newline | TokenKind::Comma) {
                self.advance();
            }

            let token = self.peek();
            match &token.kind {
                TokenKind::Eof => break,
                TokenKind::SignalRef(name) => {
                    self.advance();
                    self.ast.signals.push(SignalDecl {
                        name: name.clone(),
                        span: token.span.clone(),
                    });
                }
                TokenKind::Ident(word) if word == "sig" => {
                    self.advance();
                    let name = self.expect_word("signal name")?;
                    self.ast.signals.push(SignalDecl {
                        name,
                        span: token.span.clone(),
                    });
                }
                TokenKind::Slash => {
                    self.advance();
                    let id = self.expect_integer("layer id")?;
                    let root = self.parse_block(1)?;
                    self.ast.layers.push(LayerDef {
                        id,
                        root,
                        span: token.span.clone(),
                    });
                    self.expect_statement_end()?;
                }
                _ => {
                    let root = self.parse_block(1)?;
                    self.ast.main_blocks.push(root);
                    self.expect_statement_end()?;
                }
            }
        }

        Ok(self.ast)
    }

    // ── Blocks ─────────────────────────────────────────────

    fn parse_block(&mut self, depth: usize) -> PResult<NodeId> {
        let token = self.peek();
        if depth > self.max_depth {
            return Err(error_at(
                token,
                format!("at most {} levels of nesting", self.max_depth),
            ));
        }
        let span = token.span.clone();

        let node = match &token.kind {
            TokenKind::LBracket => {
                let container = BlockKind::Container;
                let id = self
                    .ast
                    .push(AstNode::new(container.code(), container.index(), span));
                let children = self.parse_children(depth)?;
                self.ast.node_mut(id).children = children;
                trace!(depth, "implicit container");
                return Ok(id);
            }
            TokenKind::TypeCode(code) => {
                self.advance();
                let index = BlockKind::from_code(code).and_then(BlockKind::index);
                AstNode::new(code.clone(), index, span)
            }
            TokenKind::Number(_) if is_single_digit(&token.text) => {
                let kind = token
                    .text
                    .parse::<u8>()
                    .ok()
                    .and_then(BlockKind::from_index)
                    .ok_or_else(|| error_at(token, "block"))?;
                self.advance();
                AstNode::new(kind.code(), kind.index(), span)
            }
            TokenKind::Ident(word) if word == "opt" || word == "step" => {
                self.advance();
                let kind = if word == "opt" {
                    BlockKind::Option
                } else {
                    BlockKind::Step
                };
                AstNode::new(kind.code(), kind.index(), span)
            }
            TokenKind::Ident(word) if BlockKind::looks_like_code(word) => {
                self.advance();
                AstNode::new(word.clone(), None, span)
            }
            _ => return Err(self.error("block")),
        };

        trace!(code = %node.type_code, depth, "block");
        let id = self.ast.push(node);
        self.parse_items(id)?;

        if matches!(self.peek().kind, TokenKind::LBracket) {
            let children = self.parse_children(depth)?;
            self.ast.node_mut(id).children = children;
        }

        Ok(id)
    }

    fn parse_children(&mut self, depth: usize) -> PResult<Vec<NodeId>> {
        let open = self.advance(); // consume [
        let mut children = Vec::new();

        loop {
            match self.peek().kind {
                TokenKind::RBracket => {
                    self.advance();
                    return Ok(children);
                }
                TokenKind::Eof => {
                    return Err(self.error(format!("']' to close '[' at {}", open.span)));
                }
                _ => {}
            }

            children.push(self.parse_block(depth + 1)?);

            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RBracket => {}
                _ => return Err(self.error("',' or ']'")),
            }
        }
    }

    fn parse_items(&mut self, id: NodeId) -> PResult<()> {
        let mut strings: Vec<(&'t Token, &'t str)> = Vec::new();
        loop {
            let token = self.peek();
            match &token.kind {
                TokenKind::FieldRef(path) => {
                    self.advance();
                    if path.split('.').any(|segment| segment.contains('-')) {
                        return Err(error_at(token, "field path of identifiers"));
                    }
                    self.set_binding(id, token, Binding::Field { path: path.clone() })?;
                }
                TokenKind::IteratorRef(path) => {
                    self.advance();
                    let path = (!path.is_empty()).then(|| path.clone());
                    self.set_binding(id, token, Binding::Iterator { path })?;
                }
                TokenKind::IndexRef => {
                    self.advance();
                    self.set_binding(id, token, Binding::IndexRef)?;
                }
                TokenKind::SignalRef(name) => {
                    self.advance();
                    self.set_binding(id, token, Binding::Signal { name: name.clone() })?;
                }
                TokenKind::Str(text) => {
                    self.advance();
                    strings.push((token, text.as_str()));
                }
                TokenKind::Eq => {
                    return Err(error_at(token, "binding, string or modifier (literals are quoted)"));
                }
                _ => match self.parse_modifier()? {
                    Some(modifier) => self.ast.node_mut(id).modifiers.push(modifier),
                    None => break,
                },
            }
        }
        self.place_strings(id, &strings)
    }

    fn place_strings(&mut self, id: NodeId, strings: &[(&Token, &str)]) -> PResult<()> {
        let node = self.ast.node_mut(id);
        let bound = node.binding.is_some();
        let mut rest = strings.iter();

        if !bound {
            if let Some((_, value)) = rest.next() {
                node.binding = Some(Binding::Literal {
                    value: value.to_string(),
                });
            }
        }
        if let Some((_, label)) = rest.next() {
            node.label = Some(label.to_string());
        }
        match rest.next() {
            Some((token, _)) if bound => Err(error_at(token, "at most one label per block")),
            Some((token, _)) => Err(error_at(token, "at most a literal and a label per block")),
            None => Ok(()),
        }
    }

    fn set_binding(&mut self, id: NodeId, token: &Token, binding: Binding) -> PResult<()> {
        let node = self.ast.node_mut(id);
        if node.binding.is_some() {
            return Err(error_at(token, "at most one binding per block"));
        }
        node.binding = Some(binding);
        Ok(())
    }

    // ── Modifiers ──────────────────────────────────────────

    /// `None` when the next token does not start a modifier
    fn parse_modifier(&mut self) -> PResult<Option<Modifier>> {
        let token = self.peek();
        let modifier = match &token.kind {
            TokenKind::ColorName(name) => {
                self.advance();
                Modifier::Color(Color::Static(name.clone()))
            }
            TokenKind::Hash => {
                self.advance();
                let next = self.peek();
                if !(matches!(next.kind, TokenKind::Question) && token.touches(next)) {
                    return Err(self.error("color name"));
                }
                self.advance();
                Modifier::Color(Color::Conditional(self.parse_color_rules()?))
            }
            TokenKind::SizeName(name) => {
                self.advance();
                Modifier::Size(name.clone())
            }
            TokenKind::Percent => {
                self.advance();
                return Err(self.error("size"));
            }
            TokenKind::Dollar => {
                self.advance();
                let what = "fidelity (lo, hi, auto, skeleton, defer)";
                let word = self.expect_word(what)?;
                match Fidelity::from_word(&word) {
                    Some(fidelity) => Modifier::Fidelity(fidelity),
                    None => return Err(error_at(self.peek_at_previous(), what)),
                }
            }
            TokenKind::Bang => {
                self.advance();
                self.parse_priority_or_action()?
            }
            TokenKind::Caret => {
                self.advance();
                let what = "flex (g, s, f, c)";
                let word = self.expect_word(what)?;
                match Flex::from_word(&word) {
                    Some(flex) => Modifier::Flex(flex),
                    None => return Err(error_at(self.peek_at_previous(), what)),
                }
            }
            TokenKind::Star => {
                self.advance();
                Modifier::Span(self.parse_span(token)?)
            }
            TokenKind::Tilde => {
                self.advance();
                Modifier::Stream(self.parse_stream()?)
            }
            TokenKind::Question => {
                self.advance();
                let rule = self.expect_word("validation rule")?;
                let arg = if matches!(self.peek().kind, TokenKind::Eq) {
                    self.advance();
                    Some(self.parse_value("validation argument")?)
                } else {
                    None
                };
                Modifier::Validate(ValidationRule { rule, arg })
            }
            TokenKind::Gt => {
                self.advance();
                if matches!(self.peek().kind, TokenKind::Slash) {
                    self.advance();
                    Modifier::OpenLayer(self.expect_integer("layer id")?)
                } else {
                    Modifier::Emit(self.parse_emit()?)
                }
            }
            TokenKind::Lt => {
                self.advance();
                Modifier::Receive(self.expect_word("signal name")?)
            }
            TokenKind::LtGt => {
                self.advance();
                Modifier::Both(self.expect_word("signal name")?)
            }
            TokenKind::Slash => {
                self.advance();
                Modifier::OpenLayer(self.expect_integer("layer id")?)
            }
            TokenKind::SlashLt => {
                self.advance();
                Modifier::CloseLayer
            }
            _ => return Ok(None),
        };
        Ok(Some(modifier))
    }

    fn peek_at_previous(&self) -> &'t Token {
        let tokens = self.tokens;
        self.pos
            .checked_sub(1)
            .and_then(|i| tokens.get(i))
            .unwrap_or(&EOF)
    }

    /// After `!`: `h`/`p`/`s`, a number, or an action name
    fn parse_priority_or_action(&mut self) -> PResult<Modifier> {
        let token = self.peek();
        match &token.kind {
            TokenKind::Number(_) => {
                let what = "priority between 0 and 100";
                let value = self.expect_integer(what)?;
                let priority = u8::try_from(value)
                    .ok()
                    .filter(|p| *p <= 100)
                    .ok_or_else(|| error_at(token, what))?;
                Ok(Modifier::Priority(priority))
            }
            TokenKind::Ident(word) | TokenKind::TypeCode(word) => {
                self.advance();
                Ok(match word.as_str() {
                    "h" => Modifier::Priority(100),
                    "p" => Modifier::Priority(75),
                    "s" => Modifier::Priority(50),
                    _ => Modifier::Action(word.clone()),
                })
            }
            _ => Err(self.error("priority (h, p, s or 0-100) or action name")),
        }
    }

    /// After `*`: a column count 1-9 or `f`/`h`/`t`/`q`, attached to the star
    fn parse_span(&mut self, star: &Token) -> PResult<ColumnSpan> {
        let what = "span (1-9, f, h, t or q) directly after '*'";
        let token = self.peek();
        if !star.touches(token) {
            return Err(self.error(what));
        }
        let span = match &token.kind {
            TokenKind::Number(_) => token.text.parse::<u8>().ok().and_then(ColumnSpan::columns),
            TokenKind::Ident(word) | TokenKind::TypeCode(word) => ColumnSpan::from_word(word),
            _ => None,
        };
        match span {
            Some(span) => {
                self.advance();
                Ok(span)
            }
            None => Err(self.error(what)),
        }
    }

    /// After `>`: `name`, `name=value`, `name++` or `name--`
    fn parse_emit(&mut self) -> PResult<SignalEmit> {
        let name = self.expect_word("signal name")?;
        let (value, op) = match self.peek().kind {
            TokenKind::PlusPlus => {
                self.advance();
                (None, Some(EmitOp::Increment))
            }
            TokenKind::MinusMinus => {
                self.advance();
                (None, Some(EmitOp::Decrement))
            }
            TokenKind::Eq => {
                self.advance();
                (Some(self.parse_value("emitted value")?), Some(EmitOp::Set))
            }
            _ => (None, None),
        };
        Ok(SignalEmit { name, value, op })
    }

    /// After `~`: `5s`, `2m` or a `ws://` / `wss://` / `sse://` source
    fn parse_stream(&mut self) -> PResult<Streaming> {
        let token = self.peek();
        match &token.kind {
            TokenKind::Url(url) => {
                self.advance();
                if url.starts_with("ws://") || url.starts_with("wss://") {
                    Ok(Streaming::Websocket { url: url.clone() })
                } else if url.starts_with("sse://") {
                    Ok(Streaming::Sse { url: url.clone() })
                } else {
                    Err(error_at(token, "ws://, wss:// or sse:// source"))
                }
            }
            TokenKind::Number(_) => {
                let amount = self.expect_integer("whole number of seconds or minutes")?;
                let unit = self.peek();
                let factor = match &unit.kind {
                    TokenKind::Ident(u) if token.touches(unit) && u == "s" => 1,
                    TokenKind::Ident(u) if token.touches(unit) && u == "m" => 60,
                    _ => return Err(self.error("interval unit 's' or 'm' directly after the number")),
                };
                self.advance();
                match amount.checked_mul(factor) {
                    Some(seconds) if seconds > 0 => Ok(Streaming::Interval { seconds }),
                    _ => Err(error_at(token, "positive interval")),
                }
            }
            _ => Err(self.error("interval (e.g. 5s) or push source (e.g. wss://host/feed)")),
        }
    }

    // ── Conditional colors ─────────────────────────────────

    /// After `#?`: comma-separated rules, optionally with a `:color` fallback
    fn parse_color_rules(&mut self) -> PResult<ConditionalColor> {
        let mut rules = Vec::new();
        let mut fallback = None;
        let mut index = 1;

        loop {
            let token = self.peek();
            match &token.kind {
                TokenKind::FieldRef(_) => {
                    let color = self.expect_color(index)?;
                    if fallback.is_some() {
                        return Err(error_at(
                            token,
                            format!("a single fallback color (color rule {})", index),
                        ));
                    }
                    fallback = Some(color);
                }
                TokenKind::Gte | TokenKind::Lte | TokenKind::Gt | TokenKind::Lt | TokenKind::Eq => {
                    self.advance();
                    let threshold = self.expect_threshold(index)?;
                    let condition = match token.kind {
                        TokenKind::Gte => ColorCondition::AtLeast { threshold },
                        TokenKind::Lte => ColorCondition::AtMost { threshold },
                        TokenKind::Gt => ColorCondition::Above { threshold },
                        TokenKind::Lt => ColorCondition::Below { threshold },
                        _ => ColorCondition::Equals { threshold },
                    };
                    let color = self.expect_color(index)?;
                    rules.push(ColorRule { condition, color });
                }
                TokenKind::Number(_) | TokenKind::Minus => {
                    let min = self.expect_threshold(index)?;
                    if !matches!(self.peek().kind, TokenKind::Minus) {
                        return Err(self.error(format!("'-' between range bounds in color rule {}", index)));
                    }
                    self.advance();
                    let max = self.expect_threshold(index)?;
                    if min > max {
                        return Err(error_at(
                            token,
                            format!("range with min <= max in color rule {}", index),
                        ));
                    }
                    let color = self.expect_color(index)?;
                    rules.push(ColorRule {
                        condition: ColorCondition::Range { min, max },
                        color,
                    });
                }
                _ => {
                    return Err(self.error(format!(
                        "comparison, range or ':fallback' in color rule {}",
                        index
                    )))
                }
            }

            if !(matches!(self.peek().kind, TokenKind::Comma) && self.rule_follows_comma()) {
                break;
            }
            self.advance();
            index += 1;
        }

        Ok(ConditionalColor { rules, fallback })
    }

    /// Whether the token after the current comma continues the rule list
    /// rather than starting a sibling block
    fn rule_follows_comma(&self) -> bool {
        match self.peek_at(1).kind {
            TokenKind::Gte
            | TokenKind::Lte
            | TokenKind::Gt
            | TokenKind::Lt
            | TokenKind::Eq
            | TokenKind::Minus
            | TokenKind::FieldRef(_) => true,
            TokenKind::Number(_) => matches!(self.peek_at(2).kind, TokenKind::Minus),
            _ => false,
        }
    }

    fn expect_threshold(&mut self, index: usize) -> PResult<f64> {
        let negative = matches!(self.peek().kind, TokenKind::Minus);
        if negative {
            self.advance();
        }
        match self.peek().kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(if negative { -n } else { n })
            }
            _ => Err(self.error(format!("numeric threshold in color rule {}", index))),
        }
    }

    fn expect_color(&mut self, index: usize) -> PResult<String> {
        match &self.peek().kind {
            TokenKind::FieldRef(color) if !color.contains('.') => {
                self.advance();
                Ok(color.clone())
            }
            _ => Err(self.error(format!("':color' in color rule {}", index))),
        }
    }
}

fn error_at(token: &Token, expected: impl Into<String>) -> ParseError {
    ParseError {
        expected: expected.into(),
        found: token.describe(),
        position: token.span.clone(),
    }
}

fn is_single_digit(text: &str) -> bool {
    text.len() == 1 && text.chars().all(|c| c.is_ascii_digit())
}
