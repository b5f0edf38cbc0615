//! Push-down parser for the DBD/DB grammar.
//!
//! # Grammar
//!
//! ```text
//! document := { entry } EOI
//! entry    := command | code-line | comment-line | block
//! command  := BARE (BARE | QUOTE)
//! block    := BARE '(' [ value {',' value} ] ')' [ '{' document '}' ]
//! value    := BARE | QUOTE
//! ```
//!
//! The recognizer drives a [`ParseActions`] sink rather than building any
//! data structure itself; [`crate::ast::AstBuilder`] is the default sink,
//! and a loader may implement the trait to populate a record database
//! directly without an intermediate tree.
//!
//! Block reduction uses one token of lookahead: after `name(args)` the
//! parser waits for the next token to learn whether a `{` body follows.
//! When it does not, the pending token is re-dispatched against the
//! document state, never dropped, so `a() b c` parses as a body-less
//! block followed by a command.

use std::io::BufRead;

use crate::error::{DbdError, Result};
use crate::lexer::{Lexer, Token, TokenKind};

/// Sink interface driven by the parser.
///
/// `start` precedes all other callbacks; exactly one of `end_of_input`
/// ends a successful parse. Every method may return an error to abort
/// the parse; all default to doing nothing.
pub trait ParseActions {
    /// Called once before any other callback.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// A two-token command/argument pair.
    fn command(&mut self, _cmd: &Token, _arg: &Token) -> Result<()> {
        Ok(())
    }

    /// A `#` comment line, marker stripped.
    fn comment(&mut self, _text: &Token) -> Result<()> {
        Ok(())
    }

    /// A `%` code line, marker stripped.
    fn code(&mut self, _text: &Token) -> Result<()> {
        Ok(())
    }

    /// A block head `name(args)`. `has_body` tells whether a `{` body
    /// follows; if so, the matching [`ParseActions::block_end`] will fire
    /// after the body's entries.
    fn block(&mut self, _name: &Token, _args: &[String], _has_body: bool) -> Result<()> {
        Ok(())
    }

    /// The `}` closing the most recent block body.
    fn block_end(&mut self) -> Result<()> {
        Ok(())
    }

    /// End of the document, at nesting depth zero.
    fn end_of_input(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Parser grammar states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting an entry (or EOI / `}`)
    Dbd,
    /// Saw a bare word; command argument or `(` decides which form
    CommandOrBlock,
    /// Inside `(...)`, expecting a value or `)`
    Arg,
    /// Inside `(...)` after a value, expecting `,` or `)`
    ArgContinue,
    /// After `name(args)`, deciding whether a body follows
    Tail,
}

impl State {
    fn name(self) -> &'static str {
        match self {
            State::Dbd => "Dbd",
            State::CommandOrBlock => "CommandOrBlock",
            State::Arg => "Arg",
            State::ArgContinue => "ArgContinue",
            State::Tail => "Tail",
        }
    }
}

/// Grammar recognizer. Holds only grammar state; the token source and
/// the sink are supplied per [`Parser::parse`] call, so one parser can
/// be reused across independent documents after [`Parser::reset`].
#[derive(Debug)]
pub struct Parser {
    state: State,
    depth: u32,
    /// Pending command-or-block name token
    name: Option<Token>,
    args: Vec<String>,
}

impl Parser {
    /// Create a parser in its initial state.
    pub fn new() -> Self {
        Self {
            state: State::Dbd,
            depth: 0,
            name: None,
            args: Vec::new(),
        }
    }

    /// Clear grammar state, pending tokens and argument buffers so the
    /// parser can be reused on another document (required after an
    /// aborted parse).
    pub fn reset(&mut self) {
        self.state = State::Dbd;
        self.depth = 0;
        self.name = None;
        self.args.clear();
    }

    /// Current block nesting depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Drive the sink over the whole token stream. Fatal on the first
    /// lexical or syntax error; the parse either consumes the document
    /// through EOI at depth zero or fails.
    pub fn parse<R: BufRead, A: ParseActions>(
        &mut self,
        lexer: &mut Lexer<R>,
        actions: &mut A,
    ) -> Result<()> {
        actions.start()?;
        loop {
            let tok = lexer.next_token()?;
            if self.dispatch(tok, actions)? {
                return Ok(());
            }
        }
    }

    /// Feed one token through the state machine. Returns true once
    /// `end_of_input` has fired.
    fn dispatch<A: ParseActions>(&mut self, tok: Token, actions: &mut A) -> Result<bool> {
        log::trace!(
            "parse depth={} state={} tok={:?}",
            self.depth,
            self.state.name(),
            tok
        );

        if self.state == State::Tail {
            // reduce the block now that we know whether a body follows
            let name = self.name.take().expect("pending block name");
            if tok.kind == TokenKind::Lit && tok.text == "{" {
                actions.block(&name, &self.args, true)?;
                self.args.clear();
                self.depth += 1;
                self.state = State::Dbd;
                return Ok(false);
            }
            actions.block(&name, &self.args, false)?;
            self.args.clear();
            self.state = State::Dbd;
            // fall through: handle this token against the document state
        }

        match self.state {
            State::Dbd => match tok.kind {
                TokenKind::Eoi => {
                    if self.depth == 0 {
                        actions.end_of_input()?;
                        return Ok(true);
                    }
                    return Err(syntax("EOI before '}'", &tok));
                }
                TokenKind::Bare => {
                    // shift: command name or block name
                    self.name = Some(tok);
                    self.state = State::CommandOrBlock;
                }
                TokenKind::Comment => actions.comment(&tok)?,
                TokenKind::Code => actions.code(&tok)?,
                TokenKind::Lit => match tok.text.as_str() {
                    "}" => {
                        if self.depth == 0 {
                            return Err(syntax("'}' without '{'", &tok));
                        }
                        self.depth -= 1;
                        actions.block_end()?;
                    }
                    _ => return Err(syntax("unexpected literal", &tok)),
                },
                TokenKind::Quote => return Err(self.invalid(&tok)),
            },

            State::CommandOrBlock => match tok.kind {
                TokenKind::Bare | TokenKind::Quote => {
                    // reduce command
                    let cmd = self.name.take().expect("pending command name");
                    actions.command(&cmd, &tok)?;
                    self.state = State::Dbd;
                }
                TokenKind::Lit if tok.text == "(" => {
                    self.args.clear();
                    self.state = State::Arg;
                }
                TokenKind::Lit => return Err(syntax("unexpected literal", &tok)),
                _ => return Err(self.invalid(&tok)),
            },

            State::Arg => match tok.kind {
                TokenKind::Bare | TokenKind::Quote => {
                    self.args.push(tok.text);
                    self.state = State::ArgContinue;
                }
                TokenKind::Lit if tok.text == ")" => self.state = State::Tail,
                TokenKind::Lit => return Err(syntax("unexpected literal", &tok)),
                _ => return Err(self.invalid(&tok)),
            },

            State::ArgContinue => match tok.kind {
                TokenKind::Lit if tok.text == "," => self.state = State::Arg,
                TokenKind::Lit if tok.text == ")" => self.state = State::Tail,
                TokenKind::Lit => return Err(syntax("unexpected literal", &tok)),
                _ => return Err(self.invalid(&tok)),
            },

            State::Tail => unreachable!("Tail reduced above"),
        }
        Ok(false)
    }

    fn invalid(&self, tok: &Token) -> DbdError {
        syntax(
            format!("invalid token in state {}", self.state.name()),
            tok,
        )
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn syntax(message: impl Into<String>, tok: &Token) -> DbdError {
    DbdError::syntax(message, tok.text.clone(), tok.line, tok.column)
}
