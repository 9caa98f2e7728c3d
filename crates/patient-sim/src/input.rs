//! Where doctor questions come from.
//!
//! The controller pulls one line at a time from an [`InputSource`]. `None`
//! means the source is exhausted and the session should end.
//!
//! | Source | Use case |
//! |--------|----------|
//! | [`LineInput::terminal`] | Interactive stdin with a visible prompt |
//! | [`LineInput::new`] | Any tokio `AsyncBufRead` (file, socket, pipe) |
//! | [`ScriptedInput`] | Tests and canned demos |

use std::collections::VecDeque;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

/// Prompt shown before each interactive question.
pub const DOCTOR_PROMPT: &str = "Doctor's question to patient: ";

/// Boxed future returned by [`InputSource::next_line`].
pub type InputFuture<'a> =
    Pin<Box<dyn Future<Output = std::io::Result<Option<String>>> + Send + 'a>>;

/// A line-oriented source of doctor questions.
pub trait InputSource: Send {
    /// Next line without its line terminator, or `None` at end of input.
    fn next_line(&mut self) -> InputFuture<'_>;
}

// ── Scripted ───────────────────────────────────────────────────────

/// A fixed list of lines, consumed in order.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Lines not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl InputSource for ScriptedInput {
    fn next_line(&mut self) -> InputFuture<'_> {
        let line = self.lines.pop_front();
        Box::pin(async move { Ok(line) })
    }
}

// ── Line streams ───────────────────────────────────────────────────

/// Lines read from any buffered async reader.
pub struct LineInput<R> {
    reader: R,
    prompt: Option<String>,
}

impl<R> LineInput<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            prompt: None,
        }
    }

    /// Print `prompt` to stdout before each read.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

impl LineInput<BufReader<Stdin>> {
    /// Interactive stdin, prompting with [`DOCTOR_PROMPT`].
    pub fn terminal() -> Self {
        LineInput::new(BufReader::new(tokio::io::stdin())).with_prompt(DOCTOR_PROMPT)
    }
}

impl<R> InputSource for LineInput<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn next_line(&mut self) -> InputFuture<'_> {
        Box::pin(async move {
            if let Some(prompt) = &self.prompt {
                let mut stdout = std::io::stdout();
                stdout.write_all(prompt.as_bytes())?;
                stdout.flush()?;
            }

            let mut buf = String::new();
            if self.reader.read_line(&mut buf).await? == 0 {
                return Ok(None);
            }
            let line = buf.strip_suffix('\n').unwrap_or(&buf);
            let line = line.strip_suffix('\r').unwrap_or(line);
            Ok(Some(line.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_yields_lines_then_none() {
        let mut input = ScriptedInput::new(["first", "second"]);
        assert_eq!(input.remaining(), 2);
        assert_eq!(input.next_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(input.next_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(input.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn line_input_strips_terminators() {
        let data: &[u8] = b"How are you?\r\nquit\nlast line without newline";
        let mut input = LineInput::new(data);
        assert_eq!(
            input.next_line().await.unwrap().as_deref(),
            Some("How are you?")
        );
        assert_eq!(input.next_line().await.unwrap().as_deref(), Some("quit"));
        assert_eq!(
            input.next_line().await.unwrap().as_deref(),
            Some("last line without newline")
        );
        assert_eq!(input.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn line_input_keeps_inner_whitespace() {
        let data: &[u8] = b"  spaced question  \n";
        let mut input = LineInput::new(data);
        assert_eq!(
            input.next_line().await.unwrap().as_deref(),
            Some("  spaced question  ")
        );
    }
}
