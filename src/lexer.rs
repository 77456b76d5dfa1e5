use crate::error::{CalcError, ErrorKind, Span};
use std::fmt;
use std::io::BufRead;
use tracing::trace;

/// Statement terminator.
pub const PRINT: char = ';';
/// Ends the session when it starts a statement.
pub const QUIT: char = 'q';
/// Reserved word introducing a declaration.
pub const DECLKEY: &str = "let";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Let,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Identifier(String),
    Keyword(Keyword),
    /// One of `; q ( ) { } + - * / % ! =`.
    Symbol(char),
    /// The input stream is exhausted.
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_symbol(&self, c: char) -> bool {
        self.kind == TokenKind::Symbol(c)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::Identifier(name) => write!(f, "{}", name),
            TokenKind::Keyword(Keyword::Let) => write!(f, "{}", DECLKEY),
            TokenKind::Symbol(c) => write!(f, "{}", c),
            TokenKind::End => write!(f, "end of input"),
        }
    }
}

/// Character source over a buffered reader.
///
/// Input is pulled a line at a time and appended to a transcript that
/// diagnostics quote from. Offsets are absolute over the whole session;
/// `base` is where the retained transcript starts after older lines have been
/// dropped.
pub struct CharStream<R> {
    reader: R,
    transcript: String,
    base: usize,
    pos: usize,
    exhausted: bool,
}

impl<R: BufRead> CharStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            transcript: String::new(),
            base: 0,
            pos: 0,
            exhausted: false,
        }
    }

    /// Absolute byte offset of the next unread character.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Retained input, starting at absolute offset `base()`.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// Drop whole lines that end before absolute offset `keep_from`. The line
    /// containing it is kept so a diagnostic can still show it in full.
    pub fn discard_before(&mut self, keep_from: usize) {
        let keep = keep_from.saturating_sub(self.base).min(self.pos);
        let cut = self.transcript[..keep].rfind('\n').map_or(0, |i| i + 1);
        if cut > 0 {
            self.transcript.drain(..cut);
            self.base += cut;
            self.pos -= cut;
        }
    }

    /// Make sure at least one unread character is buffered. Returns false at
    /// end of input.
    fn fill(&mut self) -> Result<bool, CalcError> {
        while self.pos >= self.transcript.len() {
            if self.exhausted {
                return Ok(false);
            }
            match self.reader.read_line(&mut self.transcript) {
                Ok(0) => self.exhausted = true,
                Ok(_) => {}
                Err(error) => {
                    self.exhausted = true;
                    return Err(CalcError::io(&error, self.offset()));
                }
            }
        }
        Ok(true)
    }

    pub fn peek_char(&mut self) -> Result<Option<char>, CalcError> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(self.transcript[self.pos..].chars().next())
    }

    /// Look `n` characters past the next one without reading more input. Lines
    /// are buffered whole, so this sees to the end of the current line.
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.transcript.get(self.pos..)?.chars().nth(n)
    }

    pub fn next_char(&mut self) -> Result<Option<char>, CalcError> {
        let c = self.peek_char()?;
        if let Some(c) = c {
            self.pos += c.len_utf8();
        }
        Ok(c)
    }

    pub fn skip_whitespace(&mut self) -> Result<(), CalcError> {
        while let Some(c) = self.peek_char()? {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
        Ok(())
    }
}

/// Token stream with a single token of pushback.
pub struct Tokenizer<R> {
    input: CharStream<R>,
    buffer: Option<Token>,
}

impl<R: BufRead> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            input: CharStream::new(reader),
            buffer: None,
        }
    }

    pub fn transcript(&self) -> &str {
        self.input.transcript()
    }

    /// Absolute offset the retained transcript starts at.
    pub fn transcript_base(&self) -> usize {
        self.input.base()
    }

    /// Forget input lines that neither the pending token nor anything still
    /// unread can refer to. Called between statements.
    pub fn discard_history(&mut self) {
        let keep_from = match &self.buffer {
            Some(token) => token.span.start,
            None => self.input.offset(),
        };
        self.input.discard_before(keep_from);
    }

    pub fn has_pending(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn putback(&mut self, token: Token) -> Result<(), CalcError> {
        if self.buffer.is_some() {
            return Err(CalcError::new(ErrorKind::FullBuffer, token.span));
        }
        self.buffer = Some(token);
        Ok(())
    }

    pub fn get(&mut self) -> Result<Token, CalcError> {
        if let Some(token) = self.buffer.take() {
            return Ok(token);
        }

        self.input.skip_whitespace()?;
        let start = self.input.offset();

        let token = match self.input.peek_char()? {
            None => Token::new(TokenKind::End, Span::single(start)),
            Some(c) if c == '.' || c.is_ascii_digit() => self.number(start)?,
            Some(c) => {
                self.input.next_char()?;
                match c {
                    ';' | 'q' | '(' | ')' | '{' | '}' | '+' | '-' | '*' | '/' | '%' | '!'
                    | '=' => Token::new(TokenKind::Symbol(c), self.span_from(start)),
                    c if c.is_ascii_alphabetic() => self.identifier(c, start)?,
                    c => {
                        return Err(CalcError::new(
                            ErrorKind::BadToken(c),
                            self.span_from(start),
                        ))
                    }
                }
            }
        };

        trace!(token = %token.kind, start = token.span.start, "token");
        Ok(token)
    }

    /// Discard input up to and including the next `c`.
    pub fn ignore(&mut self, c: char) -> Result<(), CalcError> {
        if let Some(token) = self.buffer.take() {
            if token.is_symbol(c) {
                return Ok(());
            }
        }

        while let Some(ch) = self.input.next_char()? {
            if ch == c {
                return Ok(());
            }
        }
        Ok(())
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.input.offset())
    }

    fn number(&mut self, start: usize) -> Result<Token, CalcError> {
        let mut text = String::new();
        let mut seen_dot = false;

        while let Some(c) = self.input.peek_char()? {
            if c.is_ascii_digit() || (c == '.' && !seen_dot) {
                seen_dot |= c == '.';
                text.push(c);
                self.input.next_char()?;
            } else {
                break;
            }
        }

        // Exponent only when a digit follows, so `2e` stays `2` then `e`.
        if let Some(marker @ ('e' | 'E')) = self.input.peek_ahead(0) {
            let sign = self.input.peek_ahead(1).filter(|c| matches!(c, '+' | '-'));
            let digit_at = if sign.is_some() { 2 } else { 1 };
            if self
                .input
                .peek_ahead(digit_at)
                .is_some_and(|c| c.is_ascii_digit())
            {
                text.push(marker);
                self.input.next_char()?;
                if let Some(sign) = sign {
                    text.push(sign);
                    self.input.next_char()?;
                }
                while let Some(c) = self.input.peek_char()? {
                    if !c.is_ascii_digit() {
                        break;
                    }
                    text.push(c);
                    self.input.next_char()?;
                }
            }
        }

        match text.parse::<f64>() {
            Ok(value) => Ok(Token::new(TokenKind::Number(value), self.span_from(start))),
            Err(_) => Err(CalcError::new(
                ErrorKind::BadNumber(text),
                self.span_from(start),
            )),
        }
    }

    fn identifier(&mut self, first: char, start: usize) -> Result<Token, CalcError> {
        let mut name = String::from(first);
        while let Some(c) = self.input.peek_char()? {
            if !c.is_ascii_alphanumeric() {
                break;
            }
            name.push(c);
            self.input.next_char()?;
        }

        let kind = if name == DECLKEY {
            TokenKind::Keyword(Keyword::Let)
        } else {
            TokenKind::Identifier(name)
        };
        Ok(Token::new(kind, self.span_from(start)))
    }
}
