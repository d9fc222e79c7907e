//! Terminal rendering for the chat loop.
//!
//! During streaming, tokens are printed raw as they arrive; completed
//! responses (history replay) are rendered as markdown through termimad.

use std::io::Write;

use console::style;
use termimad::MadSkin;

/// Terminal renderer for chat output.
pub struct ChatRenderer {
    skin: MadSkin,
}

impl ChatRenderer {
    pub fn new() -> Self {
        let mut skin = MadSkin::default_dark();
        skin.inline_code
            .set_fg(termimad::crossterm::style::Color::Yellow);
        Self { skin }
    }

    /// Render a complete markdown response for display.
    pub fn render_final(&self, markdown: &str) -> String {
        self.skin.term_text(markdown).to_string()
    }

    /// Print a single streaming token (raw, no formatting).
    pub fn print_streaming_token(&self, token: &str) {
        print!("{token}");
        let _ = std::io::stdout().flush();
    }

    /// Print the stats footer after a reply.
    pub fn print_stats_footer(&self, response_ms: u64, model: &str) {
        let seconds = response_ms as f64 / 1000.0;
        println!(
            "\n  {} {:.1}s {} {}",
            style("|").dim(),
            style(seconds).dim(),
            style("\u{00b7}").dim(),
            style(model).dim(),
        );
    }

    /// Print a toast-style notice.
    pub fn notice(&self, text: &str) {
        println!("\n  {} {}\n", style("*").cyan().bold(), style(text).dim());
    }

    /// Print a toast-style failure notice.
    pub fn error_notice(&self, text: &str) {
        eprintln!("\n  {} {}\n", style("!").red().bold(), text);
    }
}

impl Default for ChatRenderer {
    fn default() -> Self {
        Self::new()
    }
}
