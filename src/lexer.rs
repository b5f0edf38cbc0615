//! Lexer (tokenizer) for the DBD/DB grammar.
//!
//! The scanner is an explicit finite-state machine over bytes:
//!
//! ```text
//! Bare    : [a-zA-Z0-9_\-+:.\[\]<>;]+
//! Quote   : '"' ( [^"\\] | '\"' )* '"'
//! Code    : '%' [^\n\r]*
//! Comment : '#' [^\n\r]*
//! Lit     : one of ( ) , { }
//! ```
//!
//! Code and Comment tokens are stored without their leading marker.
//! Whitespace outside quotes separates tokens without producing one.
//! Exactly one [`TokenKind::Eoi`] token is emitted at stream exhaustion.

use std::io::BufRead;

use crate::error::{DbdError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text, sans quotes/markers
    pub text: String,
    /// Line number (1-based)
    pub line: u32,
    /// Column of the token's first byte (1-based; quote/marker included)
    pub column: u32,
}

/// Token categories in the DBD grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Unquoted word: letters, digits, `_ - + : . [ ] < > ;`
    Bare,
    /// Double-quoted string, `\"` decoded
    Quote,
    /// Single-character literal: `( ) , { }`
    Lit,
    /// `%` line, marker stripped
    Code,
    /// `#` line, marker stripped
    Comment,
    /// End of input
    Eoi,
}

/// Scanner states. Lit tokens are emitted immediately from `Init`, so no
/// state is needed for them beyond the error-reporting name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Quote,
    Esc,
    Bare,
    Code,
    Comment,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::Init => "Init",
            State::Quote => "Quote",
            State::Esc => "Esc",
            State::Bare => "Bare",
            State::Code => "Code",
            State::Comment => "Comment",
        }
    }
}

pub(crate) fn is_bare_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'+' | b':' | b'.' | b'[' | b']' | b'<' | b'>' | b';')
}

fn is_space_byte(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Lexer over a byte stream.
///
/// The stream need not be valid UTF-8: quoted strings pass any byte
/// through verbatim (bytes >= 0x80 are widened to the corresponding
/// `char`).
pub struct Lexer<R> {
    input: R,
    /// One byte of pushback for tokens terminated by their follower
    pending: Option<u8>,
    line: u32,
    column: u32,
}

impl<R: BufRead> Lexer<R> {
    /// Create a new lexer over the given stream.
    pub fn new(input: R) -> Self {
        Self {
            input,
            pending: None,
            line: 1,
            column: 0,
        }
    }

    /// Consume one byte, updating line/column tracking. A byte taken from
    /// the pushback slot was already counted.
    fn next_byte(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.pending.take() {
            return Ok(Some(b));
        }
        let buf = self.input.fill_buf()?;
        let b = match buf.first() {
            Some(&b) => b,
            None => return Ok(None),
        };
        self.input.consume(1);
        if b == b'\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Ok(Some(b))
    }

    fn push_back(&mut self, b: u8) {
        debug_assert!(self.pending.is_none());
        self.pending = Some(b);
    }

    /// Scan and return the next token.
    ///
    /// Returns [`DbdError::Lex`] for a byte invalid in the current scanner
    /// state or a quote left unterminated at end of input. After
    /// exhaustion every call yields [`TokenKind::Eoi`] at the position of
    /// the last consumed byte.
    pub fn next_token(&mut self) -> Result<Token> {
        let token = |kind: TokenKind, text: String, line: u32, column: u32| {
            let tok = Token {
                kind,
                text,
                line,
                column,
            };
            log::trace!("lex {:?}", tok);
            Ok(tok)
        };

        // separators never start a token
        let first = loop {
            match self.next_byte()? {
                None => return token(TokenKind::Eoi, String::new(), self.line, self.column),
                Some(c) if is_space_byte(c) => {}
                Some(c) => break c,
            }
        };

        let tline = self.line;
        let tcolumn = self.column;
        let mut text = String::new();

        let mut state = match first {
            b'"' => State::Quote,
            b'#' => State::Comment,
            b'%' => State::Code,
            b'(' | b')' | b',' | b'{' | b'}' => {
                return token(TokenKind::Lit, (first as char).to_string(), tline, tcolumn)
            }
            c if is_bare_byte(c) => {
                text.push(c as char);
                State::Bare
            }
            c => return Err(invalid_byte(State::Init, c, tline, tcolumn)),
        };

        loop {
            let b = self.next_byte()?;
            match state {
                State::Init => unreachable!("Init handled above"),

                State::Bare => match b {
                    Some(c) if is_bare_byte(c) => text.push(c as char),
                    Some(c) => {
                        self.push_back(c);
                        return token(TokenKind::Bare, text, tline, tcolumn);
                    }
                    None => return token(TokenKind::Bare, text, tline, tcolumn),
                },

                State::Quote => match b {
                    Some(b'"') => return token(TokenKind::Quote, text, tline, tcolumn),
                    Some(b'\\') => state = State::Esc,
                    // any other byte, newlines included, passes verbatim
                    Some(c) => text.push(c as char),
                    None => {
                        return Err(DbdError::lex(
                            state.name(),
                            "end of input in quoted string",
                            self.line,
                            self.column,
                        ))
                    }
                },

                State::Esc => match b {
                    // the only recognized escape; anything else keeps
                    // its backslash
                    Some(b'"') => {
                        text.push('"');
                        state = State::Quote;
                    }
                    Some(c) => {
                        text.push('\\');
                        text.push(c as char);
                        state = State::Quote;
                    }
                    None => {
                        return Err(DbdError::lex(
                            state.name(),
                            "end of input in quoted string",
                            self.line,
                            self.column,
                        ))
                    }
                },

                State::Code | State::Comment => {
                    let kind = if state == State::Code {
                        TokenKind::Code
                    } else {
                        TokenKind::Comment
                    };
                    match b {
                        Some(b'\n') | Some(b'\r') | None => return token(kind, text, tline, tcolumn),
                        Some(c) => text.push(c as char),
                    }
                }
            }
        }
    }
}

fn invalid_byte(state: State, b: u8, line: u32, column: u32) -> DbdError {
    let found = if b.is_ascii_graphic() {
        format!("byte '{}'", b as char)
    } else {
        format!("byte 0x{:02x}", b)
    };
    DbdError::lex(state.name(), found, line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input.as_bytes());
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            let done = tok.kind == TokenKind::Eoi;
            out.push(tok);
            if done {
                break;
            }
        }
        out
    }

    fn check(input: &str, expect: &[(TokenKind, &str, u32, u32)]) {
        let tokens = lex_all(input);
        assert_eq!(tokens.len(), expect.len(), "token count for {:?}", input);
        for (i, (tok, &(kind, text, line, column))) in tokens.iter().zip(expect).enumerate() {
            assert_eq!(tok.kind, kind, "token {} kind in {:?}", i, input);
            assert_eq!(tok.text, text, "token {} text in {:?}", i, input);
            assert_eq!(
                (tok.line, tok.column),
                (line, column),
                "token {} position in {:?}",
                i,
                input
            );
        }
    }

    #[test]
    fn test_block_head() {
        check(
            " tag ( 1, \"hello \" )",
            &[
                (TokenKind::Bare, "tag", 1, 2),
                (TokenKind::Lit, "(", 1, 6),
                (TokenKind::Bare, "1", 1, 8),
                (TokenKind::Lit, ",", 1, 9),
                (TokenKind::Quote, "hello ", 1, 11),
                (TokenKind::Lit, ")", 1, 20),
                (TokenKind::Eoi, "", 1, 20),
            ],
        );
    }

    #[test]
    fn test_comments_multiline() {
        check(
            "test, # comment\n  #another ",
            &[
                (TokenKind::Bare, "test", 1, 1),
                (TokenKind::Lit, ",", 1, 5),
                (TokenKind::Comment, " comment", 1, 7),
                (TokenKind::Comment, "another ", 2, 3),
                (TokenKind::Eoi, "", 2, 11),
            ],
        );
    }

    #[test]
    fn test_quote_escape() {
        check(
            "+_( \"hello \\\"world\"",
            &[
                (TokenKind::Bare, "+_", 1, 1),
                (TokenKind::Lit, "(", 1, 3),
                (TokenKind::Quote, "hello \"world", 1, 5),
                (TokenKind::Eoi, "", 1, 19),
            ],
        );
    }

    #[test]
    fn test_adjacent_quotes() {
        check(
            "\"1\"\"3\"",
            &[
                (TokenKind::Quote, "1", 1, 1),
                (TokenKind::Quote, "3", 1, 4),
                (TokenKind::Eoi, "", 1, 6),
            ],
        );
    }

    #[test]
    fn test_control_bytes_in_quotes() {
        check(
            "hello\"\x02\x7f\" test",
            &[
                (TokenKind::Bare, "hello", 1, 1),
                (TokenKind::Quote, "\x02\x7f", 1, 6),
                (TokenKind::Bare, "test", 1, 11),
                (TokenKind::Eoi, "", 1, 14),
            ],
        );
    }

    #[test]
    fn test_code_line() {
        check(
            "%include \"other.dbd\"\nx y",
            &[
                (TokenKind::Code, "include \"other.dbd\"", 1, 1),
                (TokenKind::Bare, "x", 2, 1),
                (TokenKind::Bare, "y", 2, 3),
                (TokenKind::Eoi, "", 2, 3),
            ],
        );
    }

    #[test]
    fn test_newline_in_quote_tracks_position() {
        check(
            "\"a\nb\" c",
            &[
                (TokenKind::Quote, "a\nb", 1, 1),
                (TokenKind::Bare, "c", 2, 4),
                (TokenKind::Eoi, "", 2, 4),
            ],
        );
    }

    #[test]
    fn test_unterminated_quote() {
        let mut lexer = Lexer::new("\"open".as_bytes());
        match lexer.next_token() {
            Err(DbdError::Lex { state, .. }) => assert_eq!(state, "Quote"),
            other => panic!("expected lex error, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_escape() {
        let mut lexer = Lexer::new("\"open\\".as_bytes());
        match lexer.next_token() {
            Err(DbdError::Lex { state, .. }) => assert_eq!(state, "Esc"),
            other => panic!("expected lex error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_byte() {
        let mut lexer = Lexer::new("ok $bad".as_bytes());
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.text, "ok");
        match lexer.next_token() {
            Err(DbdError::Lex {
                state,
                line,
                column,
                ..
            }) => {
                assert_eq!(state, "Init");
                assert_eq!((line, column), (1, 4));
            }
            other => panic!("expected lex error, got {:?}", other),
        }
    }

    #[test]
    fn test_eoi_repeats() {
        let mut lexer = Lexer::new("a".as_bytes());
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Bare);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eoi);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eoi);
    }

    #[test]
    fn test_empty_input() {
        check("", &[(TokenKind::Eoi, "", 1, 0)]);
    }
}
