//! Character source with unlimited pushback.
//!
//! A scan reads either from a stream or from an in-memory string. Both are
//! hidden behind [`CharSource`], which adds a pushback stack, the running
//! count of consumed characters reported by `%n`, and a sticky end flag.

use std::io::Read;

use super::unit::{ScanUnit, terminated_len};
use crate::errno::EILSEQ;
use crate::stdio::file::StdioStream;

/// A stream the scanner can pull units from and return units to.
pub trait UnitStream<U> {
    /// Next unit; `Ok(None)` at end of input, `Err(errno)` on a decoding
    /// failure.
    fn read_unit(&mut self) -> Result<Option<U>, i32>;

    /// Return a unit to the stream so the next read yields it.
    fn unread_unit(&mut self, unit: U);
}

impl<R: Read> UnitStream<u8> for StdioStream<R> {
    fn read_unit(&mut self) -> Result<Option<u8>, i32> {
        Ok(self.getc())
    }

    fn unread_unit(&mut self, unit: u8) {
        self.ungetc(unit);
    }
}

impl<R: Read> UnitStream<u32> for StdioStream<R> {
    fn read_unit(&mut self) -> Result<Option<u32>, i32> {
        self.getwc()
    }

    fn unread_unit(&mut self, unit: u32) {
        self.ungetwc(unit);
    }
}

enum Backing<'a, U> {
    Stream(&'a mut dyn UnitStream<U>),
    Str { text: &'a [U], pos: usize },
}

/// Unified input for one scan call.
///
/// Invariant: `consumed` is the number of units handed out by `next` minus
/// the number returned through `push_back`.
pub struct CharSource<'a, U: ScanUnit> {
    backing: Backing<'a, U>,
    /// Pushed-back units, top of stack delivered first.
    pushback: Vec<U>,
    consumed: usize,
    at_end: bool,
    decode_error: bool,
}

impl<'a, U: ScanUnit> CharSource<'a, U> {
    /// Source reading from a stream.
    pub fn from_stream(stream: &'a mut dyn UnitStream<U>) -> Self {
        Self::with_backing(Backing::Stream(stream))
    }

    /// Source reading from a string that ends at its first NUL or at the
    /// end of the slice.
    pub fn from_text(text: &'a [U]) -> Self {
        let text = &text[..terminated_len(text)];
        Self::with_backing(Backing::Str { text, pos: 0 })
    }

    fn with_backing(backing: Backing<'a, U>) -> Self {
        Self {
            backing,
            pushback: Vec::new(),
            consumed: 0,
            at_end: false,
            decode_error: false,
        }
    }

    /// Next logical unit, or `None` once input is exhausted.
    pub fn next(&mut self) -> Option<U> {
        if let Some(u) = self.pushback.pop() {
            self.consumed += 1;
            return Some(u);
        }
        if self.at_end {
            return None;
        }
        let unit = match &mut self.backing {
            Backing::Str { text, pos } => {
                let u = text.get(*pos).copied();
                if u.is_some() {
                    *pos += 1;
                }
                u
            }
            Backing::Stream(stream) => match stream.read_unit() {
                Ok(u) => u,
                Err(errno) => {
                    debug_assert_eq!(errno, EILSEQ);
                    self.decode_error = true;
                    None
                }
            },
        };
        match unit {
            Some(u) => {
                self.consumed += 1;
                Some(u)
            }
            None => {
                self.at_end = true;
                None
            }
        }
    }

    /// Un-consume one unit. `None` (the end sentinel) is ignored.
    pub fn push_back(&mut self, unit: Option<U>) {
        if let Some(u) = unit {
            self.pushback.push(u);
            self.consumed = self.consumed.saturating_sub(1);
        }
    }

    /// Net units consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// True once the underlying input reported its end.
    pub fn at_end(&self) -> bool {
        self.at_end
    }

    /// True if input ended because of a malformed multibyte sequence.
    pub fn decode_error(&self) -> bool {
        self.decode_error
    }
}

impl<U: ScanUnit> Drop for CharSource<'_, U> {
    fn drop(&mut self) {
        if let Backing::Stream(stream) = &mut self.backing {
            // Bottom of the stack first, so the stream hands back the top
            // of the stack first.
            for unit in self.pushback.drain(..) {
                stream.unread_unit(unit);
            }
        }
    }
}
