use crate::error::{CalcError, ErrorKind, Span};
use crate::lexer::{Keyword, Token, TokenKind, Tokenizer};
use crate::symbols::SymbolTable;
use std::io::BufRead;
use tracing::{debug, trace};

/// Single-pass evaluator: every grammar rule computes its value while it
/// parses, pulling tokens as it goes.
///
/// ```text
/// statement   := "let" declaration | expression
/// declaration := identifier "=" expression
/// expression  := term (("+"|"-") term)*
/// term        := factorial (("*"|"/"|"%") factorial)*
/// factorial   := primary ("!")*
/// primary     := "(" expression ")" | "{" expression "}"
///              | number | "-" primary | "+" primary | identifier
/// ```
pub struct Evaluator<'a, R> {
    tokens: &'a mut Tokenizer<R>,
    symbols: &'a mut SymbolTable,
    depth: usize,
}

/// Brackets and unary signs that may be open at once in one statement.
pub const MAX_NESTING: usize = 128;

impl<'a, R: BufRead> Evaluator<'a, R> {
    pub fn new(tokens: &'a mut Tokenizer<R>, symbols: &'a mut SymbolTable) -> Self {
        Self {
            tokens,
            symbols,
            depth: 0,
        }
    }

    pub fn statement(&mut self) -> Result<f64, CalcError> {
        let t = self.tokens.get()?;
        match t.kind {
            TokenKind::Keyword(Keyword::Let) => self.declaration(),
            _ => {
                self.tokens.putback(t)?;
                self.expression()
            }
        }
    }

    /// `name = expression`, after the `let`. Defines a new variable.
    pub fn declaration(&mut self) -> Result<f64, CalcError> {
        let t = self.tokens.get()?;
        let (name, name_span) = match t.kind {
            TokenKind::Identifier(ref name) => (name.clone(), t.span),
            _ => {
                let span = t.span;
                return Err(self.reject(t, CalcError::new(ErrorKind::ExpectedName, span)));
            }
        };

        let t = self.tokens.get()?;
        if !t.is_symbol('=') {
            let error = CalcError::new_with_help(
                ErrorKind::ExpectedToken('='),
                t.span,
                format!("= missing in declaration of {}", name),
            );
            return Err(self.reject(t, error));
        }

        let value = self.expression()?;
        self.symbols.define_name(&name, value, name_span)?;
        debug!(name = %name, value, "declared variable");
        Ok(value)
    }

    pub fn expression(&mut self) -> Result<f64, CalcError> {
        trace!("expression");
        let mut left = self.term()?;

        loop {
            let t = self.tokens.get()?;
            match t.kind {
                TokenKind::Symbol('+') => left += self.term()?,
                TokenKind::Symbol('-') => left -= self.term()?,
                _ => {
                    self.tokens.putback(t)?;
                    return Ok(left);
                }
            }
        }
    }

    pub fn term(&mut self) -> Result<f64, CalcError> {
        let mut left = self.factorial()?;

        loop {
            let t = self.tokens.get()?;
            match t.kind {
                TokenKind::Symbol('*') => left *= self.factorial()?,
                TokenKind::Symbol('/') => {
                    let d = self.divisor(t.span)?;
                    left /= d;
                }
                TokenKind::Symbol('%') => {
                    let d = self.divisor(t.span)?;
                    left %= d;
                }
                _ => {
                    self.tokens.putback(t)?;
                    return Ok(left);
                }
            }
        }
    }

    fn divisor(&mut self, operator: Span) -> Result<f64, CalcError> {
        let d = self.factorial()?;
        if d == 0.0 {
            return Err(CalcError::new(ErrorKind::DivideByZero, operator));
        }
        Ok(d)
    }

    pub fn factorial(&mut self) -> Result<f64, CalcError> {
        let mut left = self.primary()?;

        loop {
            let t = self.tokens.get()?;
            if t.is_symbol('!') {
                left = factorial_loop(left);
            } else {
                self.tokens.putback(t)?;
                return Ok(left);
            }
        }
    }

    pub fn primary(&mut self) -> Result<f64, CalcError> {
        let t = self.tokens.get()?;

        match t.kind {
            TokenKind::Symbol('(') => self.nested(t.span, |ev| ev.enclosed(')')),
            TokenKind::Symbol('{') => self.nested(t.span, |ev| ev.enclosed('}')),
            TokenKind::Number(value) => Ok(value),
            TokenKind::Symbol('-') => self.nested(t.span, |ev| Ok(-ev.primary()?)),
            TokenKind::Symbol('+') => self.nested(t.span, |ev| ev.primary()),
            TokenKind::Identifier(ref name) => self.symbols.get_value(name, t.span),
            _ => {
                let span = t.span;
                Err(self.reject(t, CalcError::new(ErrorKind::ExpectedPrimary, span)))
            }
        }
    }

    /// Run `inner` one nesting level deeper, refusing to go past
    /// `MAX_NESTING` so the call stack stays bounded.
    fn nested<F>(&mut self, opener: Span, inner: F) -> Result<f64, CalcError>
    where
        F: FnOnce(&mut Self) -> Result<f64, CalcError>,
    {
        if self.depth >= MAX_NESTING {
            return Err(CalcError::new_with_help(
                ErrorKind::NestingTooDeep,
                opener,
                format!("at most {} brackets or signs may be open at once", MAX_NESTING),
            ));
        }
        self.depth += 1;
        let result = inner(self);
        self.depth -= 1;
        result
    }

    fn enclosed(&mut self, close: char) -> Result<f64, CalcError> {
        let d = self.expression()?;
        let t = self.tokens.get()?;
        if !t.is_symbol(close) {
            let span = t.span;
            return Err(self.reject(t, CalcError::new(ErrorKind::ExpectedToken(close), span)));
        }
        Ok(d)
    }

    /// Hand the offending token back so recovery can see a `;` that ended the
    /// statement early.
    fn reject(&mut self, token: Token, error: CalcError) -> CalcError {
        match self.tokens.putback(token) {
            Ok(()) => error,
            Err(full) => full,
        }
    }
}

/// Multiply `1 * 2 * ... * i` for every integer `i <= val`.
///
/// This is a counting loop, not the gamma function: anything below 1 (and NaN)
/// yields 1, fractional operands stop at their floor, and the 32-bit
/// accumulator wraps on overflow (`13!` is 1932053504).
pub fn factorial_loop(val: f64) -> f64 {
    let mut result: i32 = 1;
    let mut i: i32 = 1;

    while (i as f64) <= val {
        result = result.wrapping_mul(i);
        // A wrapped product of zero stays zero (from 34! on).
        if result == 0 {
            break;
        }
        i += 1;
    }

    result as f64
}

#[cfg(test)]
mod tests {
    use super::factorial_loop;

    #[test]
    fn small_integers() {
        assert_eq!(factorial_loop(0.0), 1.0);
        assert_eq!(factorial_loop(1.0), 1.0);
        assert_eq!(factorial_loop(5.0), 120.0);
        assert_eq!(factorial_loop(10.0), 3628800.0);
        assert_eq!(factorial_loop(12.0), 479001600.0);
    }

    #[test]
    fn accumulator_wraps_at_32_bits() {
        assert_eq!(factorial_loop(13.0), 1932053504.0);
        assert_eq!(factorial_loop(33.0), (-2147483648i32) as f64);
        assert_eq!(factorial_loop(34.0), 0.0);
        assert_eq!(factorial_loop(40.0), 0.0);
    }

    #[test]
    fn below_one_never_iterates() {
        assert_eq!(factorial_loop(-1.0), 1.0);
        assert_eq!(factorial_loop(-7.5), 1.0);
        assert_eq!(factorial_loop(0.99), 1.0);
        assert_eq!(factorial_loop(f64::NAN), 1.0);
    }

    #[test]
    fn fractions_stop_at_floor() {
        assert_eq!(factorial_loop(3.5), 6.0);
        assert_eq!(factorial_loop(4.999), 24.0);
    }

    #[test]
    fn huge_operands_terminate() {
        assert_eq!(factorial_loop(1e300), 0.0);
        assert_eq!(factorial_loop(f64::INFINITY), 0.0);
    }
}
