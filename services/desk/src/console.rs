use parcel_desk::workflows::parcels::Operator;
use std::io::{self, BufRead, IsTerminal, Stdin, StdinLock, Stdout, Write};
use tracing::warn;

/// Typing this at any prompt cancels the current operation.
pub(crate) const CANCEL_KEYWORD: &str = "/cancel";

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Line-oriented terminal adapter for the lifecycle engine. End of input counts as a cancel.
pub(crate) struct TerminalOperator<R, W> {
    input: R,
    output: W,
    ansi: bool,
}

impl TerminalOperator<StdinLock<'static>, Stdout> {
    pub(crate) fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        let stdout = io::stdout();
        let ansi = stdout.is_terminal();
        Self::new(stdin.lock(), stdout, ansi)
    }
}

impl<R, W> TerminalOperator<R, W>
where
    R: BufRead,
    W: Write,
{
    pub(crate) fn new(input: R, output: W, ansi: bool) -> Self {
        Self {
            input,
            output,
            ansi,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_output(self) -> W {
        self.output
    }

    fn emit(&mut self, text: &str) {
        if let Err(err) = self.output.write_all(text.as_bytes()) {
            warn!(error = %err, "failed to write to terminal");
            return;
        }
        if let Err(err) = self.output.flush() {
            warn!(error = %err, "failed to flush terminal");
        }
    }
}

impl<R, W> Operator for TerminalOperator<R, W>
where
    R: BufRead,
    W: Write,
{
    fn ask(&mut self, prompt: &str) -> Option<String> {
        self.emit(&format!("{prompt} "));

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                self.emit("\n");
                None
            }
            Ok(_) => {
                let answer = line.trim_end_matches(['\r', '\n']);
                if answer.trim() == CANCEL_KEYWORD {
                    None
                } else {
                    Some(answer.to_string())
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to read operator input");
                None
            }
        }
    }

    fn tell(&mut self, line: &str) {
        self.emit(&format!("{line}\n"));
    }

    fn clear(&mut self) {
        if self.ansi {
            self.emit(CLEAR_SCREEN);
        } else {
            self.emit("\n");
        }
    }
}
