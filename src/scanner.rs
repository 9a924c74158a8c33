//! Scans an input string (manifest file) character by character.

use std::path::Path;

#[derive(Debug)]
pub struct ParseError {
    msg: String,
    ofs: usize,
}
pub type ParseResult<T> = Result<T, ParseError>;

pub struct Scanner<'a> {
    buf: &'a str,
    pub ofs: usize,
    pub line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(buf: &'a str) -> Self {
        Scanner {
            buf,
            ofs: 0,
            line: 1,
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.buf[start..end]
    }

    /// The current character, or '\0' at end of input.
    pub fn peek(&self) -> char {
        self.buf[self.ofs..].chars().next().unwrap_or('\0')
    }

    pub fn at_end(&self) -> bool {
        self.ofs >= self.buf.len()
    }

    pub fn peek_newline(&self) -> bool {
        let rest = &self.buf[self.ofs..];
        rest.starts_with('\n') || rest.starts_with("\r\n")
    }

    pub fn next(&mut self) {
        let c = self.peek();
        if c == '\n' {
            self.line += 1;
        }
        if !self.at_end() {
            self.ofs += c.len_utf8();
        }
    }

    pub fn read(&mut self) -> char {
        let c = self.peek();
        self.next();
        c
    }

    pub fn skip(&mut self, ch: char) -> bool {
        if !self.at_end() && self.peek() == ch {
            self.next();
            return true;
        }
        false
    }

    pub fn skip_spaces(&mut self) -> usize {
        let start = self.ofs;
        while self.skip(' ') || self.skip('\t') {}
        self.ofs - start
    }

    /// Skips to the start of the next line.
    pub fn skip_line(&mut self) {
        while !self.at_end() && self.read() != '\n' {}
    }

    /// Reads a run of characters up to whitespace, '=' or end of line.
    pub fn read_word(&mut self) -> &'a str {
        let start = self.ofs;
        while !self.at_end() {
            match self.peek() {
                ' ' | '\t' | '\r' | '\n' | '=' | '#' => break,
                _ => self.next(),
            }
        }
        self.slice(start, self.ofs)
    }

    /// Reads the remainder of the line, minus any trailing comment, and
    /// consumes the newline.
    pub fn read_eol(&mut self) -> &'a str {
        let start = self.ofs;
        while !self.at_end() && !self.peek_newline() && self.peek() != '#' {
            self.next();
        }
        let text = self.slice(start, self.ofs).trim_end();
        self.skip_line();
        text
    }

    pub fn expect(&mut self, ch: char) -> ParseResult<()> {
        if self.peek() != ch {
            return self.parse_error(format!("expected {:?}, got {:?}", ch, self.peek()));
        }
        self.next();
        Ok(())
    }

    pub fn parse_error<T, S: Into<String>>(&self, msg: S) -> ParseResult<T> {
        self.parse_error_at(self.ofs, msg)
    }

    /// Like parse_error, but pointing at an earlier offset.
    pub fn parse_error_at<T, S: Into<String>>(&self, ofs: usize, msg: S) -> ParseResult<T> {
        Err(ParseError {
            msg: msg.into(),
            ofs,
        })
    }

    /// Renders `err` with the offending line and a caret under the column.
    pub fn format_parse_error(&self, filename: &Path, err: ParseError) -> String {
        let mut ofs = 0;
        let mut lines = self.buf.split('\n').enumerate().peekable();
        while let Some((line_number, line)) = lines.next() {
            if ofs + line.len() >= err.ofs || lines.peek().is_none() {
                let mut msg = "parse error: ".to_string();
                msg.push_str(&err.msg);
                msg.push('\n');

                let prefix = format!("{}:{}: ", filename.display(), line_number + 1);
                msg.push_str(&prefix);

                let line = line.trim_end_matches('\r');
                let col = err.ofs.saturating_sub(ofs).min(line.len());
                // Long lines are cut to a window around the error.
                let (context, col) = if col > 40 {
                    let start = floor_char_boundary(line, col - 20);
                    msg.push_str("...");
                    (&line[start..], 3 + col - start)
                } else {
                    (line, col)
                };
                if context.len() > 60 {
                    msg.push_str(&context[..floor_char_boundary(context, 60)]);
                    msg.push_str("...");
                } else {
                    msg.push_str(context);
                }
                msg.push('\n');

                msg.push_str(&" ".repeat(prefix.len() + col));
                msg.push_str("^\n");
                return msg;
            }
            ofs += line.len() + 1;
        }
        format!("parse error: {}\n{}\n", err.msg, filename.display())
    }
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
