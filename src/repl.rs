use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    diagnostics::{HyperlambdaError, Result},
    engine::Engine,
    generator, parser,
    signaler::Signaler,
};

/// Interactive session. Lines accumulate until a blank line submits them;
/// slots defined by one submission stay available to the next.
pub struct Repl {
    session: Signaler,
    buffer: String,
}

impl Repl {
    pub fn new(engine: &Engine) -> Self {
        Self {
            session: engine.session(),
            buffer: String::new(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(editor_error)?;
        loop {
            let prompt = if self.buffer.is_empty() { ">> " } else { ".. " };
            match editor.readline(prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if self.buffer.is_empty() && (trimmed == ":quit" || trimmed == ":exit") {
                        break;
                    }
                    if !trimmed.is_empty() {
                        editor.add_history_entry(line.as_str()).ok();
                        self.buffer.push_str(&line);
                        self.buffer.push('\n');
                        continue;
                    }
                    if self.buffer.is_empty() {
                        continue;
                    }
                    let source = std::mem::take(&mut self.buffer);
                    match self.submit(&source) {
                        Ok(output) => print!("{output}"),
                        Err(HyperlambdaError::Diagnostic(diag)) => {
                            eprintln!("{:?}: {}", diag.kind, diag.message);
                        }
                        Err(other) => eprintln!("error: {other}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(editor_error(err)),
            }
        }
        Ok(())
    }

    /// Evaluates one submission and returns the resulting tree as text.
    pub fn submit(&mut self, source: &str) -> Result<String> {
        let root = parser::parse(source)?;
        self.session.signal("eval", &root)?;
        Ok(generator::children_to_hyperlambda(&root))
    }
}

fn editor_error(err: ReadlineError) -> HyperlambdaError {
    HyperlambdaError::from(std::io::Error::other(err))
}
