use ariadne::{Color, Config, Fmt, Label, Report, ReportKind, Source};
use std::fmt;
use std::io::{self, Write};

/// Byte range into the session transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("bad token '{0}'")]
    BadToken(char),
    #[error("bad number literal '{0}'")]
    BadNumber(String),
    #[error("putback() into a full buffer")]
    FullBuffer,
    #[error("'{0}' expected")]
    ExpectedToken(char),
    #[error("primary expected")]
    ExpectedPrimary,
    #[error("name expected in declaration")]
    ExpectedName,
    #[error("expression nested too deeply")]
    NestingTooDeep,
    #[error("divide by zero")]
    DivideByZero,
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("'{0}' declared twice")]
    DuplicateDeclaration(String),
    #[error("input stream failed: {0}")]
    Io(String),
}

/// Broad class of an error, used to title and colour diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Lexical,
    Syntax,
    Runtime,
    Internal,
    Input,
}

impl ErrorKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            ErrorKind::BadToken(_) | ErrorKind::BadNumber(_) => ErrorClass::Lexical,
            ErrorKind::ExpectedToken(_)
            | ErrorKind::ExpectedPrimary
            | ErrorKind::ExpectedName
            | ErrorKind::NestingTooDeep => ErrorClass::Syntax,
            ErrorKind::DivideByZero
            | ErrorKind::UndefinedVariable(_)
            | ErrorKind::DuplicateDeclaration(_) => ErrorClass::Runtime,
            ErrorKind::FullBuffer => ErrorClass::Internal,
            ErrorKind::Io(_) => ErrorClass::Input,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalcError {
    pub kind: ErrorKind,
    pub span: Span,
    pub help: Option<String>,
}

impl CalcError {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            help: None,
        }
    }

    pub fn new_with_help(kind: ErrorKind, span: Span, help: String) -> Self {
        Self {
            kind,
            span,
            help: Some(help),
        }
    }

    pub fn io(error: &io::Error, pos: usize) -> Self {
        Self::new(ErrorKind::Io(error.to_string()), Span::single(pos))
    }

    /// Everything except a failed input stream is recovered from at the next `;`.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind, ErrorKind::Io(_))
    }

    /// Render this error as a diagnostic against `source`, the retained
    /// session transcript starting at absolute offset `base`, and write it to
    /// `out`.
    pub fn report<W: Write>(
        &self,
        source: &str,
        base: usize,
        filename: &str,
        color: bool,
        mut out: W,
    ) -> io::Result<()> {
        let class = self.kind.class();
        let (title, tint) = match class {
            ErrorClass::Lexical => ("Lexical Error", Color::Red),
            ErrorClass::Syntax => ("Syntax Error", Color::Yellow),
            ErrorClass::Runtime => ("Runtime Error", Color::Magenta),
            ErrorClass::Internal => ("Internal Error", Color::Red),
            ErrorClass::Input => ("Input Error", Color::Red),
        };

        let Some(range) = char_range(source, base, self.span) else {
            writeln!(out, "{}: {}", title, self)?;
            if let Some(ref help_text) = self.help {
                writeln!(out, "help: {}", help_text)?;
            }
            return Ok(());
        };

        let message = self.to_string();
        let headline = if color {
            format!("{}: {}", title.fg(tint), message)
        } else {
            format!("{}: {}", title, message)
        };

        let offset = range.start;
        let mut label = Label::new((filename, range)).with_message(&message);
        if color {
            label = label.with_color(tint);
        }

        let mut report_builder = Report::build(ReportKind::Error, filename, offset)
            .with_config(Config::default().with_color(color))
            .with_message(headline)
            .with_label(label);

        if let Some(ref help_text) = self.help {
            let note = if color {
                format!("{}: {}", "help".fg(Color::Cyan), help_text)
            } else {
                format!("help: {}", help_text)
            };
            report_builder = report_builder.with_note(note);
        }

        report_builder
            .finish()
            .write((filename, Source::from(source)), &mut out)
    }
}

/// Convert an absolute byte span to the char range ariadne labels with,
/// clamped to the source. `None` when there is nothing to point at.
fn char_range(source: &str, base: usize, span: Span) -> Option<std::ops::Range<usize>> {
    let span = Span::new(span.start.checked_sub(base)?, span.end.saturating_sub(base));
    let total = source.chars().count();
    if total == 0 || span.start > source.len() {
        return None;
    }
    let start = source.get(..span.start)?.chars().count().min(total - 1);
    let end = source
        .get(..span.end.min(source.len()))
        .map(|s| s.chars().count())
        .unwrap_or(total)
        .clamp(start + 1, total);
    Some(start..end)
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for CalcError {}
