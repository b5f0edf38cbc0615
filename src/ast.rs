//! Owned syntax tree for DBD documents, and the default parser sink
//! that builds it.
//!
//! Ownership is strictly tree-shaped: a [`DbdFile`] owns its entries,
//! every block owns its children, and dropping the root drops the whole
//! tree children-first. Parent links are not stored; callers that need
//! them walk down from the root.

use std::fmt;

use crate::error::{DbdError, Result};
use crate::lexer::Token;
use crate::parser::ParseActions;

/// Maximum number of arguments in a block head.
pub const MAX_BLOCK_ARGS: usize = 16;

/// Maximum length of a block name in bytes.
pub const MAX_NAME_LEN: usize = 0xff;

/// Maximum length of any other string payload in bytes. Bounds
/// pathological allocation; ordinary documents sit far below it.
pub const MAX_STRING_LEN: usize = 0xff_ffff;

/// A parsed document: the file root owning all top-level entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbdFile {
    /// Document name, usually the source file path; may be empty
    pub name: String,
    /// Top-level entries in document order
    pub entries: Vec<Node>,
}

/// One entry of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `name(args)` with an optional brace-delimited body. A block is
    /// represented the same way with or without a body; an empty child
    /// list means "no body".
    Block {
        name: String,
        args: Vec<String>,
        children: Vec<Node>,
        line: u32,
        column: u32,
    },
    /// A two-token `cmd arg` pair.
    Statement {
        cmd: String,
        arg: String,
        line: u32,
        column: u32,
    },
    /// A raw `#` or `%` line, opaque to the parser. `marker` is the
    /// leading character, `text` the rest of the line.
    Nest {
        marker: char,
        text: String,
        line: u32,
        column: u32,
    },
}

impl Node {
    /// Source line of the node's first token (1-based).
    pub fn line(&self) -> u32 {
        match self {
            Node::Block { line, .. } | Node::Statement { line, .. } | Node::Nest { line, .. } => {
                *line
            }
        }
    }

    /// Source column of the node's first token (1-based).
    pub fn column(&self) -> u32 {
        match self {
            Node::Block { column, .. }
            | Node::Statement { column, .. }
            | Node::Nest { column, .. } => *column,
        }
    }
}

/// A block head under construction: its body entries accumulate here
/// until the matching `block_end` (or end of input, for the synthetic
/// root).
#[derive(Debug)]
struct OpenBlock {
    name: String,
    args: Vec<String>,
    children: Vec<Node>,
    line: u32,
    column: u32,
}

/// The default [`ParseActions`] sink: materializes parse actions into a
/// [`DbdFile`].
///
/// An explicit stack tracks the innermost open block. Index 0 is a
/// synthetic root that absorbs top-level entries, so node construction
/// never branches on "are we at top level"; [`AstBuilder::finish`]
/// splices its children into the real file root.
#[derive(Debug)]
pub struct AstBuilder {
    stack: Vec<OpenBlock>,
}

impl AstBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    fn append(&mut self, node: Node) {
        self.stack
            .last_mut()
            .expect("open block stack underflow")
            .children
            .push(node);
    }

    fn nest(&mut self, marker: char, tok: &Token) -> Result<()> {
        check_len("line", tok.text.len(), MAX_STRING_LEN)?;
        self.append(Node::Nest {
            marker,
            text: tok.text.clone(),
            line: tok.line,
            column: tok.column,
        });
        Ok(())
    }

    /// Consume the builder after a successful parse, producing the tree.
    /// `name` becomes the document name of the file root.
    pub fn finish(mut self, name: impl Into<String>) -> DbdFile {
        // the parser enforces brace balance; anything but the lone
        // synthetic root here is a builder defect
        debug_assert_eq!(self.stack.len(), 1, "open block stack out of balance");
        let root = self.stack.pop().expect("synthetic root");
        DbdFile {
            name: name.into(),
            entries: root.children,
        }
    }
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseActions for AstBuilder {
    fn start(&mut self) -> Result<()> {
        self.stack.clear();
        self.stack.push(OpenBlock {
            name: String::new(),
            args: Vec::new(),
            children: Vec::new(),
            line: 0,
            column: 0,
        });
        Ok(())
    }

    fn command(&mut self, cmd: &Token, arg: &Token) -> Result<()> {
        check_len("command", cmd.text.len(), MAX_STRING_LEN)?;
        check_len("argument", arg.text.len(), MAX_STRING_LEN)?;
        self.append(Node::Statement {
            cmd: cmd.text.clone(),
            arg: arg.text.clone(),
            line: cmd.line,
            column: cmd.column,
        });
        Ok(())
    }

    fn comment(&mut self, text: &Token) -> Result<()> {
        self.nest('#', text)
    }

    fn code(&mut self, text: &Token) -> Result<()> {
        self.nest('%', text)
    }

    fn block(&mut self, name: &Token, args: &[String], has_body: bool) -> Result<()> {
        check_len("block name", name.text.len(), MAX_NAME_LEN)?;
        if args.len() > MAX_BLOCK_ARGS {
            return Err(DbdError::limit(format!(
                "block argument count {} exceeds {}",
                args.len(),
                MAX_BLOCK_ARGS
            )));
        }
        for arg in args {
            check_len("block argument", arg.len(), MAX_STRING_LEN)?;
        }

        let block = OpenBlock {
            name: name.text.clone(),
            args: args.to_vec(),
            children: Vec::new(),
            line: name.line,
            column: name.column,
        };
        if has_body {
            self.stack.push(block);
        } else {
            self.append(block.into_node());
        }
        Ok(())
    }

    fn block_end(&mut self) -> Result<()> {
        let done = self.stack.pop().expect("open block stack underflow");
        self.append(done.into_node());
        Ok(())
    }

    fn end_of_input(&mut self) -> Result<()> {
        debug_assert_eq!(self.stack.len(), 1, "open block stack out of balance");
        Ok(())
    }
}

impl OpenBlock {
    fn into_node(self) -> Node {
        Node::Block {
            name: self.name,
            args: self.args,
            children: self.children,
            line: self.line,
            column: self.column,
        }
    }
}

fn check_len(what: &str, len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(DbdError::limit(format!(
            "{} length {} exceeds {}",
            what, len, max
        )));
    }
    Ok(())
}

/// Renders the tree back to parseable text. The output is equivalent to
/// the input (names, arguments, nesting) but not byte-identical:
/// whitespace is normalized and values are quoted only where the bare
/// charset requires it.
impl fmt::Display for DbdFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            writeln!(f, "# file: {}", self.name)?;
        }
        for entry in &self.entries {
            entry.fmt_indent(f, 0)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indent(f, 0)
    }
}

impl Node {
    fn fmt_indent(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "{:width$}", "", width = indent * 2)?;
        match self {
            Node::Block {
                name,
                args,
                children,
                ..
            } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_value(f, arg)?;
                }
                write!(f, ")")?;
                if !children.is_empty() {
                    writeln!(f, " {{")?;
                    for child in children {
                        child.fmt_indent(f, indent + 1)?;
                    }
                    write!(f, "{:width$}}}", "", width = indent * 2)?;
                }
                writeln!(f)
            }
            Node::Statement { cmd, arg, .. } => {
                write!(f, "{} ", cmd)?;
                write_value(f, arg)?;
                writeln!(f)
            }
            Node::Nest { marker, text, .. } => writeln!(f, "{}{}", marker, text),
        }
    }
}

/// Write a value bare when the charset allows, quoted otherwise.
fn write_value(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let bare = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii() && crate::lexer::is_bare_byte(c as u8));
    if bare {
        write!(f, "{}", s)
    } else {
        write!(f, "\"")?;
        for c in s.chars() {
            if c == '"' {
                write!(f, "\\\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}
