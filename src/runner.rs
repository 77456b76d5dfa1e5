use crate::repl::{Session, SessionConfig, SessionOutcome};
use std::io::{self, Cursor};

/// Run a whole script through the calculator, printing results to stdout and
/// diagnostics to stderr. No prompts are written.
pub fn run(source: &str, filename: &str, color: bool) -> io::Result<SessionOutcome> {
    let config = SessionConfig {
        prompt: false,
        color,
        filename: filename.to_string(),
    };
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut session = Session::new(Cursor::new(source), stdout.lock(), stderr.lock(), config);
    session.run()
}

/// Evaluate `source` in a fresh session and return what it wrote to its
/// output and error streams, without prompts or colour.
pub fn evaluate(source: &str) -> (String, String) {
    let config = SessionConfig {
        prompt: false,
        color: false,
        filename: "<input>".to_string(),
    };
    let mut out = Vec::new();
    let mut err = Vec::new();
    {
        let mut session = Session::new(Cursor::new(source), &mut out, &mut err, config);
        // Writing to a Vec cannot fail.
        let _ = session.run();
    }
    (
        String::from_utf8_lossy(&out).into_owned(),
        String::from_utf8_lossy(&err).into_owned(),
    )
}
