// Desk calculator library
//
// Reads `;`-terminated arithmetic statements from a text stream and evaluates
// them as they are parsed. Variables are introduced with `let`; `pi` and `e`
// are predefined.

// Public modules
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod repl;
pub mod runner;
pub mod symbols;

// Re-export commonly used items
pub use error::{CalcError, ErrorKind, Span};
pub use evaluator::{factorial_loop, Evaluator};
pub use lexer::{Keyword, Token, TokenKind, Tokenizer};
pub use repl::{Session, SessionConfig, SessionOutcome};
pub use symbols::{SymbolTable, Variable};

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::{evaluate, run};
