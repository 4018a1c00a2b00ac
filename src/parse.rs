use bstr::{BStr, ByteSlice};

/// A borrowed line parsed from a stream.
///
/// This gives access to the line's content without its terminator, along with
/// its 1-indexed line number.
#[derive(Clone, Copy, Debug)]
pub struct Line<'a> {
    /// The line number, 1-indexed.
    number: usize,
    /// The full line including its line terminator if present.
    full: &'a BStr,
}

impl<'a> Line<'a> {
    pub fn new(number: usize, full: &'a [u8]) -> Line<'a> {
        Line { number, full: full.as_bstr() }
    }

    /// Return the one-indexed line number of this line.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Return only the content of the line, i.e., the line without its
    /// terminator (if present). The terminator is `\n` or `\r\n`.
    pub fn content(&self) -> &'a BStr {
        let mut end = self.full.len();
        if self.full.last_byte() == Some(b'\n') {
            end -= 1;
            if end > 0 && self.full[end - 1] == b'\r' {
                end -= 1;
            }
        }
        self.full[..end].as_bstr()
    }

    /// Returns true if this line contains nothing but ASCII whitespace.
    pub fn is_blank(&self) -> bool {
        self.full.iter().all(|b| b.is_ascii_whitespace())
    }
}

/// An extension trait for `std::io::BufRead` which provides a line iterator
/// that works with `anyhow`.
///
/// `bstr::io` has something similar, but its closure must return a
/// `std::io::Result`, which is awkward when the closure wants to report
/// parse errors.
pub trait BufReadExt: std::io::BufRead {
    /// Executes the given closure on each (`\n`|`\r\n`)-terminated line in the
    /// underlying reader. The last line need not be terminated.
    ///
    /// Iteration stops early when the closure returns false or an error.
    fn for_byte_line<F>(&mut self, mut for_each_line: F) -> anyhow::Result<()>
    where
        Self: Sized,
        F: FnMut(Line<'_>) -> anyhow::Result<bool>,
    {
        let mut number = 0;
        let mut buf = vec![];
        loop {
            buf.clear();
            if self.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            number += 1;
            if !for_each_line(Line::new(number, &buf))? {
                return Ok(());
            }
        }
    }
}

impl<B: std::io::BufRead> BufReadExt for B {}
