//! Statement splitting for SQL scripts.
//!
//! Scripts are cut into statements with a purely textual rule, not a SQL
//! lexer. A statement ends at:
//!
//! - a `;` directly followed by an optional `\r` and a `\n`, or
//! - a literal `--` directly followed by a `\n`.
//!
//! Statements wrapped in a MySQL-style conditional comment
//! (`/*!40101 SET NAMES utf8 */`) are unwrapped and executed as plain SQL.
//! The check is a prefix/suffix match on the whole statement, so markers or
//! delimiters inside string literals are not recognized as such.
//!
//! Splitting is lazy: [`split`] reads the source line by line and yields each
//! statement as soon as its delimiter has been seen.

use std::io::{self, BufRead};

const VENDOR_MARKER_OPEN: &str = "/*!";
const VENDOR_MARKER_CLOSE: &str = "*/";

/// Split a reader into executable statements.
///
/// Every yielded statement is trimmed of surrounding whitespace. Empty
/// statements (including those made only of line breaks) are skipped.
pub fn split<R: BufRead>(reader: R) -> Statements<R> {
    Statements {
        reader,
        buffer: String::new(),
        scanned: 0,
        eof: false,
    }
}

/// Split an in-memory script.
pub fn split_str(sql: &str) -> Vec<String> {
    // Reading from a &str cannot fail, the input is already valid UTF-8.
    split(sql.as_bytes()).map_while(Result::ok).collect()
}

/// Lazy statement iterator returned by [`split`].
///
/// Yields `Err` once if the underlying reader fails (including invalid
/// UTF-8), and `None` afterwards.
#[derive(Debug)]
pub struct Statements<R> {
    reader: R,
    buffer: String,
    /// Bytes of `buffer` already searched for a delimiter.
    scanned: usize,
    eof: bool,
}

impl<R: BufRead> Iterator for Statements<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((start, len)) = find_delimiter(&self.buffer, self.scanned) {
                let token: String = self.buffer.drain(..start + len).collect();
                self.scanned = 0;
                if let Some(statement) = clean_token(&token[..start]) {
                    return Some(Ok(statement));
                }
                continue;
            }
            self.scanned = self.buffer.len();

            if self.eof {
                if self.buffer.is_empty() {
                    return None;
                }
                let token = std::mem::take(&mut self.buffer);
                self.scanned = 0;
                return clean_token(&token).map(Ok);
            }

            // Delimiters always end in '\n', so whole lines never cut one in half.
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => self.eof = true,
                Ok(_) => {}
                Err(e) => {
                    self.eof = true;
                    self.buffer.clear();
                    self.scanned = 0;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Find the first delimiter ending at a newline at or after `from`.
///
/// Returns the delimiter's start offset and length.
fn find_delimiter(buffer: &str, from: usize) -> Option<(usize, usize)> {
    for (offset, _) in buffer[from..].match_indices('\n') {
        let newline = from + offset;
        let head = &buffer[..newline];
        if head.ends_with(";\r") || head.ends_with("--") {
            return Some((newline - 2, 3));
        }
        if head.ends_with(';') {
            return Some((newline - 1, 2));
        }
    }
    None
}

/// Turn a raw token into an executable statement, or `None` if it is blank.
fn clean_token(token: &str) -> Option<String> {
    let statement = strip_vendor_marker(token.trim());
    if statement.is_empty() || is_line_breaks(statement) {
        None
    } else {
        Some(statement.to_string())
    }
}

/// Unwrap `/*!<version> <sql> */` into `<sql>`.
///
/// Everything up to and including the first space after the opening marker is
/// dropped, as is the closing marker, and the rest is trimmed on both sides.
/// The closing marker need not be preceded by a space: `/*!40101 SET NAMES
/// utf8*/` unwraps to `SET NAMES utf8` rather than losing its last character.
/// Tokens that do not both start with the opening marker and end with the
/// closing one are returned unchanged.
fn strip_vendor_marker(token: &str) -> &str {
    let Some(inner) = token
        .strip_prefix(VENDOR_MARKER_OPEN)
        .and_then(|rest| rest.strip_suffix(VENDOR_MARKER_CLOSE))
    else {
        return token;
    };

    match inner.find(' ') {
        Some(space) => inner[space + 1..].trim(),
        None => token,
    }
}

fn is_line_breaks(s: &str) -> bool {
    s.chars().all(|c| c == '\n' || c == '\r')
}
