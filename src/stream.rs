//! Macro-expanding input stream.
//!
//! [`MacroStream`] wraps a backing reader and exposes macro-substituted
//! content through the same [`Read`]/[`BufRead`] interface, so a
//! downstream consumer (the lexer) cannot tell whether substitution
//! occurred. The backing stream is read one physical line at a time,
//! terminator included; each line is passed through the attached
//! [`MacroExpander`], if any, before being served.
//!
//! The macro engine itself lives behind the [`MacroExpander`] seam; this
//! module only drives its expand-into-buffer operation.

use std::io::{self, BufRead, Read};

/// Ceiling on a single physical line and on its expansion, in bytes.
/// Exceeding either is an error rather than an unbounded allocation.
pub const MAX_LINE_LEN: usize = 0x100_0000;

/// Opaque macro-substitution context.
///
/// `expand` writes at most `out.len()` bytes of the expansion of `line`
/// into `out` and returns the length of the full expansion. A return
/// value that meets or exceeds `out.len()` means the output was
/// truncated; the caller retries with more capacity.
pub trait MacroExpander {
    fn expand(&self, line: &[u8], out: &mut [u8]) -> usize;
}

/// A read-only stream serving the macro-expanded contents of a backing
/// stream, line by line.
///
/// The two internal buffers are owned; the expander reference is not.
pub struct MacroStream<'m, R> {
    inner: R,
    expander: Option<&'m dyn MacroExpander>,
    line: Vec<u8>,
    out: Vec<u8>,
    pos: usize,
}

impl<'m, R: BufRead> MacroStream<'m, R> {
    /// Wrap a backing stream with no substitution: lines pass through
    /// unmodified.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            expander: None,
            line: Vec::with_capacity(128),
            out: Vec::with_capacity(128),
            pos: 0,
        }
    }

    /// Wrap a backing stream, expanding each line through `expander`.
    pub fn with_expander(inner: R, expander: &'m dyn MacroExpander) -> Self {
        Self {
            expander: Some(expander),
            ..Self::new(inner)
        }
    }

    /// Attach or detach the macro context. Content already buffered is
    /// not re-expanded.
    pub fn set_expander(&mut self, expander: Option<&'m dyn MacroExpander>) {
        self.expander = expander;
    }

    /// Read the next physical line from the backing stream and expand it
    /// into the output buffer. An empty output buffer afterwards means
    /// end of stream.
    fn refill(&mut self) -> io::Result<()> {
        self.pos = 0;
        self.out.clear();
        self.line.clear();

        // capped read so a pathological unterminated line cannot grow
        // the buffer past the ceiling
        let limit = (MAX_LINE_LEN + 1) as u64;
        let n = self
            .inner
            .by_ref()
            .take(limit)
            .read_until(b'\n', &mut self.line)?;
        if n == 0 {
            return Ok(()); // end of stream
        }
        if self.line.len() > MAX_LINE_LEN {
            return Err(too_long("input line"));
        }

        let expander = match self.expander {
            Some(e) => e,
            None => {
                self.out.extend_from_slice(&self.line);
                return Ok(());
            }
        };

        // growth loop: the expander reports the length it needs; retry
        // until the buffer holds the whole expansion
        let mut cap = self.line.len() + 128;
        loop {
            if cap > MAX_LINE_LEN {
                return Err(too_long("macro expansion"));
            }
            self.out.resize(cap, 0);
            let need = expander.expand(&self.line, &mut self.out);
            if need < cap {
                self.out.truncate(need);
                return Ok(());
            }
            cap = need + 1;
        }
    }
}

fn too_long(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{} exceeds {} bytes", what, MAX_LINE_LEN),
    )
}

impl<R: BufRead> Read for MacroStream<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let avail = self.fill_buf()?;
        let n = avail.len().min(buf.len());
        buf[..n].copy_from_slice(&avail[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: BufRead> BufRead for MacroStream<'_, R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.out.len() {
            self.refill()?;
        }
        Ok(&self.out[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.out.len());
    }
}
