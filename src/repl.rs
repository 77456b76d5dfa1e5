use crate::error::CalcError;
use crate::evaluator::Evaluator;
use crate::lexer::{Tokenizer, TokenKind, PRINT, QUIT};
use crate::symbols::SymbolTable;
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

pub const PROMPT: &str = "> ";
pub const RESULT: &str = "= ";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Write `> ` before each statement is read.
    pub prompt: bool,
    /// Colour diagnostics.
    pub color: bool,
    /// Name diagnostics refer to the input by.
    pub filename: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt: true,
            color: true,
            filename: "<stdin>".to_string(),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Quit,
    EndOfInput,
}

enum Step {
    Value(f64),
    Stop(SessionOutcome),
}

/// One calculator session: the token stream, the variables declared so far
/// and where results and diagnostics go.
pub struct Session<R, W, E> {
    tokens: Tokenizer<R>,
    symbols: SymbolTable,
    out: W,
    err: E,
    config: SessionConfig,
}

impl<R: BufRead, W: Write, E: Write> Session<R, W, E> {
    pub fn new(input: R, out: W, err: E, config: SessionConfig) -> Self {
        Self {
            tokens: Tokenizer::new(input),
            symbols: SymbolTable::with_builtins(),
            out,
            err,
            config,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Read, evaluate and print statements until `q` or end of input.
    ///
    /// Evaluation errors are reported and skipped past; only a failure to
    /// write results or diagnostics is returned.
    pub fn run(&mut self) -> io::Result<SessionOutcome> {
        info!(file = %self.config.filename, "session started");

        let outcome = loop {
            self.tokens.discard_history();
            self.prompt()?;
            match self.calculate() {
                Ok(Step::Value(value)) => writeln!(self.out, "{}{}", RESULT, value)?,
                Ok(Step::Stop(outcome)) => break outcome,
                Err(error) if error.is_recoverable() => {
                    debug!(%error, "recovering at next statement");
                    self.report(&error)?;
                    if let Err(error) = self.tokens.ignore(PRINT) {
                        warn!(%error, "input failed during recovery");
                        break SessionOutcome::EndOfInput;
                    }
                }
                Err(error) => {
                    warn!(%error, "input stream failed");
                    break SessionOutcome::EndOfInput;
                }
            }
        };

        if outcome == SessionOutcome::EndOfInput && self.config.prompt {
            // Leave the terminal on a fresh line after the last prompt.
            writeln!(self.out)?;
        }
        self.out.flush()?;

        info!(
            ?outcome,
            variables = self.symbols.len(),
            "session finished"
        );
        for var in self.symbols.iter() {
            debug!(name = %var.name, value = var.value, "variable");
        }
        Ok(outcome)
    }

    /// Read one statement, skipping empty ones, and evaluate it.
    fn calculate(&mut self) -> Result<Step, CalcError> {
        let mut t = self.tokens.get()?;
        while t.is_symbol(PRINT) {
            t = self.tokens.get()?;
        }

        if t.is_symbol(QUIT) {
            return Ok(Step::Stop(SessionOutcome::Quit));
        }
        if t.kind == TokenKind::End {
            return Ok(Step::Stop(SessionOutcome::EndOfInput));
        }

        self.tokens.putback(t)?;
        let value = Evaluator::new(&mut self.tokens, &mut self.symbols).statement()?;
        Ok(Step::Value(value))
    }

    fn prompt(&mut self) -> io::Result<()> {
        if self.config.prompt {
            write!(self.out, "{}", PROMPT)?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn report(&mut self, error: &CalcError) -> io::Result<()> {
        self.out.flush()?;
        error.report(
            self.tokens.transcript(),
            self.tokens.transcript_base(),
            &self.config.filename,
            self.config.color,
            &mut self.err,
        )?;
        self.err.flush()
    }
}

/// Run an interactive session on the process's standard streams.
pub fn start(config: SessionConfig) -> io::Result<SessionOutcome> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut session = Session::new(stdin.lock(), stdout.lock(), stderr.lock(), config);
    session.run()
}
