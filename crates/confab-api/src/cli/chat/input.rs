//! Multi-line compose input for the chat loop.
//!
//! Built on crossterm's raw-mode event stream because the submission policy
//! needs Enter's modifiers: Ctrl+Enter (or Cmd+Enter) submits a trimmed,
//! non-empty buffer; plain Enter inserts a newline. Ctrl+C interrupts,
//! Ctrl+D ends the session.

use std::io::{self, Write};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use futures_util::StreamExt;

/// Events produced by the compose input.
#[derive(Debug)]
pub enum InputEvent {
    /// User submitted a message (already trimmed, non-empty).
    Message(String),
    /// End of session (Ctrl+D).
    Eof,
    /// Interrupt signal (Ctrl+C).
    Interrupted,
}

/// Whether a key event submits the compose buffer.
///
/// Enter with Ctrl or Super held submits, provided the buffer has content
/// after trimming. Plain Enter never submits; it inserts a newline.
pub fn should_submit(key: &KeyEvent, buffer: &str) -> bool {
    key.code == KeyCode::Enter
        && key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER)
        && !buffer.trim().is_empty()
}

/// Raw-mode compose input with a continuation prompt for multi-line drafts.
pub struct ComposeInput {
    prompt: String,
    events: EventStream,
}

impl ComposeInput {
    pub fn new(prompt: String) -> Self {
        Self {
            prompt,
            events: EventStream::new(),
        }
    }

    /// Read one message from the terminal.
    ///
    /// Raw mode is enabled only for the duration of the read and restored
    /// before returning, so other terminal output stays well-behaved.
    pub async fn read_message(&mut self) -> io::Result<InputEvent> {
        print!("{}", self.prompt);
        io::stdout().flush()?;

        terminal::enable_raw_mode()?;
        let result = self.read_loop().await;
        terminal::disable_raw_mode()?;
        println!();
        result
    }

    async fn read_loop(&mut self) -> io::Result<InputEvent> {
        let mut buffer = String::new();

        while let Some(event) = self.events.next().await {
            let Event::Key(key) = event? else { continue };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if should_submit(&key, &buffer) {
                return Ok(InputEvent::Message(buffer.trim().to_string()));
            }

            match (key.code, key.modifiers) {
                (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                    return Ok(InputEvent::Interrupted);
                }
                (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
                    return Ok(InputEvent::Eof);
                }
                (KeyCode::Enter, _) => {
                    buffer.push('\n');
                    print!("\r\n{}", continuation_prompt(&self.prompt));
                }
                (KeyCode::Backspace, _) => {
                    if let Some(removed) = buffer.pop() {
                        if removed != '\n' {
                            print!("\u{8} \u{8}");
                        }
                    }
                }
                (KeyCode::Char(c), modifiers)
                    if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
                {
                    buffer.push(c);
                    print!("{c}");
                }
                _ => {}
            }
            io::stdout().flush()?;
        }

        Ok(InputEvent::Eof)
    }
}

/// A dimmed continuation marker the same width as the prompt.
fn continuation_prompt(prompt: &str) -> String {
    let width = console::measure_text_width(prompt);
    format!("{}{} ", " ".repeat(width.saturating_sub(2)), console::style("\u{2026}").dim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn ctrl_enter_submits_non_empty_buffer() {
        let k = key(KeyCode::Enter, KeyModifiers::CONTROL);
        assert!(should_submit(&k, "hello"));
    }

    #[test]
    fn cmd_enter_submits_non_empty_buffer() {
        let k = key(KeyCode::Enter, KeyModifiers::SUPER);
        assert!(should_submit(&k, "hello"));
    }

    #[test]
    fn plain_enter_never_submits() {
        let k = key(KeyCode::Enter, KeyModifiers::NONE);
        assert!(!should_submit(&k, "hello"));
    }

    #[test]
    fn whitespace_only_buffer_never_submits() {
        let k = key(KeyCode::Enter, KeyModifiers::CONTROL);
        assert!(!should_submit(&k, "   \n \t "));
        assert!(!should_submit(&k, ""));
    }

    #[test]
    fn other_keys_never_submit() {
        let k = key(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert!(!should_submit(&k, "hello"));
    }
}
