//! The indentation-aware lexer.
//!
//! Converts source text into a token stream, synthesising `Indent`/`Dedent`
//! tokens from leading whitespace and `Newline` tokens at line boundaries.
//! Blank lines (whitespace and/or comments only) emit no layout tokens, so
//! they never open or close a block.

use std::str::FromStr;

use crate::token::{Keyword, Token, TokenKind};

/// Tokenizes a complete source string.
///
/// Never fails: malformed strings are truncated at end of input and unknown
/// characters are skipped, per the language's recovery rules. The stream
/// always ends with `Dedent` tokens for every open indentation level
/// followed by a single `Eof`.
pub(crate) fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    at_line_start: bool,
    /// Indentation widths of enclosing blocks. Always starts at `[0]`.
    indent_stack: Vec<usize>,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            at_line_start: true,
            indent_stack: vec![0],
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.line));
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek() {
            if self.at_line_start {
                self.handle_line_start();
                continue;
            }

            match c {
                '#' => self.skip_comment(),
                ' ' | '\t' | '\r' => self.pos += 1,
                '\n' => {
                    self.push(TokenKind::Newline);
                    self.line += 1;
                    self.pos += 1;
                    self.at_line_start = true;
                }
                '"' => self.scan_string(),
                c if c.is_ascii_digit() => self.scan_number(),
                c if c.is_alphabetic() => self.scan_word(),
                _ => {
                    if !self.scan_operator() {
                        // Unknown character: skip silently.
                        self.pos += 1;
                    }
                }
            }
        }

        // Close every still-open block at end of input.
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push(TokenKind::Dedent);
        }
        self.push(TokenKind::Eof);
        self.tokens
    }

    /// Measures leading whitespace and emits layout tokens.
    ///
    /// Spaces and tabs each count as one unit. A line holding only
    /// whitespace or a comment is blank and produces no layout tokens.
    fn handle_line_start(&mut self) {
        let mut width = 0;
        while matches!(self.peek(), Some(' ' | '\t')) {
            width += 1;
            self.pos += 1;
        }
        if self.peek() == Some('\r') {
            self.pos += 1;
        }

        match self.peek() {
            None => return,
            Some('\n') => {
                // Blank line.
                self.pos += 1;
                self.line += 1;
                return;
            }
            Some('#') => {
                self.skip_comment();
                // A line comment leaves us at the terminating newline (or
                // end of input); a block comment may end mid-line with code
                // after it. Either way a now-empty remainder keeps the line
                // blank.
                while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
                    self.pos += 1;
                }
                match self.peek() {
                    None => return,
                    Some('\n') => {
                        self.pos += 1;
                        self.line += 1;
                        return;
                    }
                    Some(_) => {}
                }
            }
            Some(_) => {}
        }

        let current = *self.indent_stack.last().expect("indent stack never empty");
        if width > current {
            self.indent_stack.push(width);
            self.push(TokenKind::Indent);
        } else {
            while width < *self.indent_stack.last().expect("indent stack never empty") {
                self.indent_stack.pop();
                self.push(TokenKind::Dedent);
            }
        }
        self.at_line_start = false;
    }

    /// Skips a `#` line comment or a `###`-delimited block comment.
    ///
    /// Line comments stop *before* the newline so the caller still sees the
    /// line boundary. Block comments run to the matching `###` (or end of
    /// input) and keep the line counter in step.
    fn skip_comment(&mut self) {
        if self.peek_at(1) == Some('#') && self.peek_at(2) == Some('#') {
            self.pos += 3;
            while let Some(c) = self.peek() {
                if c == '#' && self.peek_at(1) == Some('#') && self.peek_at(2) == Some('#') {
                    self.pos += 3;
                    return;
                }
                if c == '\n' {
                    self.line += 1;
                }
                self.pos += 1;
            }
        } else {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.pos += 1;
            }
        }
    }

    /// Scans a `"`-delimited string literal, processing escapes.
    ///
    /// Recognised escapes: `\n \t \r \\ \"`. Unknown escapes keep the
    /// escaped character as-is. An unterminated literal is truncated at end
    /// of input without error.
    fn scan_string(&mut self) {
        self.pos += 1; // opening quote
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            if c == '\\' && self.peek_at(1).is_some() {
                self.pos += 1;
                let esc = self.peek().expect("escape char checked");
                text.push(match esc {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' => '\\',
                    '"' => '"',
                    other => other,
                });
                self.pos += 1;
                continue;
            }
            if c == '\n' {
                self.line += 1;
            }
            text.push(c);
            self.pos += 1;
        }
        if self.peek() == Some('"') {
            self.pos += 1;
        }
        self.push(TokenKind::StrLit(text));
    }

    /// Scans a run of digits with at most one `.`; a second dot ends the
    /// number so `1.2.3` lexes as the float `1.2` followed by `.3`.
    fn scan_number(&mut self) {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.pos += 1;
            } else if c == '.' && !seen_dot && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
                seen_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if seen_dot {
            self.push(TokenKind::FloatLit(text));
        } else {
            self.push(TokenKind::IntLit(text));
        }
    }

    /// Scans an identifier or keyword: alpha followed by alnum/underscore.
    fn scan_word(&mut self) {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match Keyword::from_str(&word) {
            Ok(kw) => self.push(TokenKind::Kw(kw)),
            Err(_) => self.push(TokenKind::Ident(word)),
        }
    }

    /// Scans punctuation and operators, including the two-character forms.
    /// Returns false when the current character is not an operator.
    fn scan_operator(&mut self) -> bool {
        let c = self.peek().expect("caller checked");
        let two = self.peek_at(1);
        let (kind, len) = match (c, two) {
            ('!', Some('=')) => (TokenKind::Ne, 2),
            ('>', Some('=')) => (TokenKind::Ge, 2),
            ('<', Some('=')) => (TokenKind::Le, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            (':', _) => (TokenKind::Colon, 1),
            (',', _) => (TokenKind::Comma, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            ('.', _) => (TokenKind::Dot, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('^', _) => (TokenKind::Caret, 1),
            ('!', _) => (TokenKind::Bang, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('=', _) => (TokenKind::Assign, 1),
            _ => return false,
        };
        self.push(kind);
        self.pos += len;
        true
    }
}
