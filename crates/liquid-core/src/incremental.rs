//! Incremental parsing for text that arrives in chunks
//!
//! Chunks are appended to a buffer that is tracked one character at a time.
//! Whenever the buffer gains a complete top-level statement (a newline, comma
//! or closing bracket at nesting depth 0, outside strings and comments) the
//! prefix up to that point is compiled with the ordinary pipeline. A prefix
//! that compiles becomes the new checkpoint and its schema the current one.
//! A prefix that does not compile yet, such as a button pointing at a layer
//! whose definition has not arrived, leaves the last good schema in place.
//!
//! Nothing is repaired or guessed. `finish` compiles the whole buffer
//! strictly, exactly as [`crate::parse_with`] would.
//!
//! ```
//! use liquid_core::IncrementalParser;
//!
//! let mut parser = IncrementalParser::new();
//! parser.feed("Kp :reve");
//! assert!(parser.schema().is_none());
//!
//! let progress = parser.feed("nue\nBt \"Go\"");
//! assert!(progress.advanced);
//! assert_eq!(progress.blocks, 1);
//!
//! let schema = parser.finish().unwrap();
//! assert_eq!(schema.layers[0].root.children.len(), 2);
//! ```

use tracing::{debug, trace};

use crate::kinds::BlockKind;
use crate::parser::ParseOptions;
use crate::schema::LiquidSchema;
use crate::{Error, Result};

/// Lexical context of the boundary tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Context {
    #[default]
    Code,
    Str,
    /// Character after a backslash inside a string
    Escape,
    Comment,
}

/// Finds statement boundaries without tokenizing
#[derive(Debug, Clone, Default)]
struct Boundaries {
    context: Context,
    depth: usize,
    /// Last two characters seen in code context
    recent: [Option<char>; 2],
    /// Byte offset just past the last complete top-level statement
    last: usize,
    /// Bytes of the buffer already tracked
    tracked: usize,
}

impl Boundaries {
    fn track(&mut self, buffer: &str) {
        let start = self.tracked;
        for (offset, c) in buffer[start..].char_indices() {
            let end = start + offset + c.len_utf8();
            match self.context {
                Context::Str => match c {
                    '\\' => self.context = Context::Escape,
                    '"' => self.context = Context::Code,
                    _ => {}
                },
                Context::Escape => self.context = Context::Str,
                Context::Comment => {
                    if c == '\n' {
                        self.context = Context::Code;
                        if self.depth == 0 {
                            self.last = end;
                        }
                    }
                }
                Context::Code => self.code(c, end),
            }
        }
        self.tracked = buffer.len();
    }

    fn code(&mut self, c: char, end: usize) {
        let [before, prev] = self.recent;
        self.recent = [prev, Some(c)];
        match c {
            // `://` continues a URL
            '/' if prev == Some('/') && before != Some(':') => {
                self.context = Context::Comment;
                self.recent = [None, None];
            }
            '"' => self.context = Context::Str,
            '[' | '{' | '(' => self.depth += 1,
            ']' | '}' | ')' => {
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 0 {
                    self.last = end;
                }
            }
            '\n' | ',' if self.depth == 0 => self.last = end,
            _ => {}
        }
    }

    fn balanced(&self) -> bool {
        self.depth == 0 && !matches!(self.context, Context::Str | Context::Escape)
    }
}

/// State after feeding a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Byte offset just past the last prefix that compiled
    pub checkpoint: usize,
    /// Bytes buffered after the checkpoint
    pub pending: usize,
    /// Blocks in the current schema, across all layers
    pub blocks: usize,
    /// Whether this chunk moved the checkpoint
    pub advanced: bool,
    /// No string or bracket is open at the end of the buffer
    pub balanced: bool,
}

/// Parser that accepts DSL text in chunks and keeps the last good schema
#[derive(Debug)]
pub struct IncrementalParser {
    options: ParseOptions,
    buffer: String,
    boundaries: Boundaries,
    checkpoint: usize,
    /// End of the last prefix handed to the compiler, good or not
    attempted: usize,
    schema: Option<LiquidSchema>,
    error: Option<Error>,
}

impl Default for IncrementalParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalParser {
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    pub fn with_options(options: ParseOptions) -> Self {
        IncrementalParser {
            options,
            buffer: String::new(),
            boundaries: Boundaries::default(),
            checkpoint: 0,
            attempted: 0,
            schema: None,
            error: None,
        }
    }

    /// Append a chunk and compile any newly completed statements
    pub fn feed(&mut self, chunk: &str) -> Progress {
        self.buffer.push_str(chunk);
        self.boundaries.track(&self.buffer);

        let boundary = self.boundaries.last;
        let mut advanced = false;
        if boundary > self.attempted {
            self.attempted = boundary;
            match crate::parse_with(&self.buffer[..boundary], &self.options) {
                Ok(schema) => {
                    self.checkpoint = boundary;
                    self.schema = Some(schema);
                    self.error = None;
                    advanced = true;
                    debug!(checkpoint = boundary, "checkpoint advanced");
                }
                Err(err) => {
                    trace!(boundary, error = %err, "prefix does not compile yet");
                    self.error = Some(err);
                }
            }
        }

        self.progress(advanced)
    }

    /// Schema of the last prefix that compiled
    pub fn schema(&self) -> Option<&LiquidSchema> {
        self.schema.as_ref()
    }

    /// The current schema, or an empty one before the first checkpoint
    pub fn best_effort(&self) -> LiquidSchema {
        self.schema.clone().unwrap_or_else(LiquidSchema::empty)
    }

    /// Why the most recent complete prefix did not compile
    ///
    /// Cleared as soon as a later prefix compiles.
    pub fn last_error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Text after the checkpoint, not yet part of the schema
    pub fn pending(&self) -> &str {
        &self.buffer[self.checkpoint..]
    }

    pub fn checkpoint(&self) -> usize {
        self.checkpoint
    }

    /// Compile the whole buffer, including any trailing partial statement
    ///
    /// # Errors
    /// Whatever [`crate::parse_with`] reports for the full text.
    pub fn finish(self) -> Result<LiquidSchema> {
        crate::parse_with(&self.buffer, &self.options)
    }

    /// Drop all buffered text and state, keeping the options
    pub fn reset(&mut self) {
        let options = std::mem::take(&mut self.options);
        *self = IncrementalParser::with_options(options);
    }

    fn progress(&self, advanced: bool) -> Progress {
        Progress {
            checkpoint: self.checkpoint,
            pending: self.buffer.len() - self.checkpoint,
            blocks: self.schema.as_ref().map_or(0, count_blocks),
            advanced,
            balanced: self.boundaries.balanced(),
        }
    }
}

fn count_blocks(schema: &LiquidSchema) -> usize {
    let mut count = 0;
    for layer in &schema.layers {
        layer.root.walk(&mut |block| {
            if !(block.kind == BlockKind::Container && block.is_bare()) {
                count += 1;
            }
        });
    }
    count
}
