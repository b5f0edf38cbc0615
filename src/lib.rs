//! # dbdast
//!
//! Lexer, parser and AST for the EPICS Database Definition (DBD/DB)
//! grammar.
//!
//! This library provides:
//! - A byte-level finite-state lexer with 1-based line/column tracking
//! - A push-down parser driving a pluggable [`ParseActions`] sink
//! - An owned syntax tree built by the default sink, [`AstBuilder`]
//! - A macro-substitution-aware input stream ([`MacroStream`])
//! - An include search-path context ([`DbdContext`]) for loaders
//!
//! ## Architecture
//!
//! Data flows `bytes -> [MacroStream] -> Lexer -> Parser -> sink`:
//!
//! - [`lexer`] - tokenizer for the DBD charset
//! - [`parser`] - grammar recognizer and the [`ParseActions`] seam
//! - [`ast`] - tree data model, builder sink, and display/dump
//! - [`stream`] - line-oriented macro expansion, transparent to the lexer
//! - [`path`] - ordered search-directory list for the downstream loader
//!
//! Interpretation of the parsed content (record types, field semantics,
//! include directives) belongs to a downstream loader, not this crate.
//! Parsing is all-or-nothing: the first lexical or syntax error aborts
//! the whole document.
//!
//! ## Usage
//!
//! ```
//! let file = dbdast::parse_str("menu(m) {\nchoice(a,\"A\")\n}", "example").unwrap();
//! assert_eq!(file.entries.len(), 1);
//! print!("{}", file);
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod path;
pub mod stream;

// Re-export main types for convenience
pub use ast::{AstBuilder, DbdFile, Node};
pub use error::{DbdError, Result};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseActions, Parser};
pub use path::DbdContext;
pub use stream::{MacroExpander, MacroStream};

use std::io::BufRead;

/// Parse a document from an open stream. `name` becomes the document
/// name of the resulting file root; pass the source path when known.
///
/// The stream may be a [`MacroStream`] for macro-substituted input.
pub fn parse_reader<R: BufRead>(reader: R, name: &str) -> Result<DbdFile> {
    let mut lexer = Lexer::new(reader);
    let mut parser = Parser::new();
    let mut builder = AstBuilder::new();
    parser.parse(&mut lexer, &mut builder)?;
    Ok(builder.finish(name))
}

/// Parse a document held in memory.
pub fn parse_str(input: &str, name: &str) -> Result<DbdFile> {
    parse_reader(input.as_bytes(), name)
}

/// Parse a named file. I/O failures surface before lexing begins and
/// carry the offending path.
pub fn parse_file(path: impl AsRef<std::path::Path>) -> Result<DbdFile> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| DbdError::FileRead {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_reader(std::io::BufReader::new(file), &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_through_macro_stream() {
        struct One;
        impl MacroExpander for One {
            fn expand(&self, line: &[u8], out: &mut [u8]) -> usize {
                let full = String::from_utf8_lossy(line).replace("${NAME}", "x1");
                let n = full.len().min(out.len());
                out[..n].copy_from_slice(&full.as_bytes()[..n]);
                full.len()
            }
        }
        let exp = One;
        let stream = MacroStream::with_expander(
            "record(ai, \"${NAME}\") {\nfield(DESC, \"${NAME} temp\")\n}".as_bytes(),
            &exp,
        );
        let file = parse_reader(stream, "").unwrap();
        match &file.entries[0] {
            Node::Block { name, args, children, .. } => {
                assert_eq!(name, "record");
                assert_eq!(args, &["ai", "x1"]);
                match &children[0] {
                    Node::Block { args, .. } => assert_eq!(args, &["DESC", "x1 temp"]),
                    other => panic!("expected block, got {:?}", other),
                }
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file("/no/such/dir/missing.dbd").unwrap_err();
        match err {
            DbdError::FileRead { path, .. } => assert!(path.contains("missing.dbd")),
            other => panic!("expected file-read error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.dbd");
        std::fs::write(&path, "device(ai, CONSTANT, devAiSoft, \"Soft Channel\")\n").unwrap();
        let file = parse_file(&path).unwrap();
        assert_eq!(file.name, path.display().to_string());
        assert_eq!(file.entries.len(), 1);
    }

    #[test]
    fn test_second_document_unaffected_by_first() {
        let mut parser = Parser::new();

        let mut lexer = Lexer::new("a(1) {\nb(2)\n}".as_bytes());
        let mut builder = AstBuilder::new();
        parser.parse(&mut lexer, &mut builder).unwrap();
        let first = builder.finish("first");

        parser.reset();
        let mut lexer = Lexer::new("c(3)".as_bytes());
        let mut builder = AstBuilder::new();
        parser.parse(&mut lexer, &mut builder).unwrap();
        let second = builder.finish("second");

        assert_eq!(first.entries.len(), 1);
        assert_eq!(second.entries.len(), 1);
        match &second.entries[0] {
            Node::Block { name, children, .. } => {
                assert_eq!(name, "c");
                assert!(children.is_empty());
            }
            other => panic!("expected block, got {:?}", other),
        }
    }
}
