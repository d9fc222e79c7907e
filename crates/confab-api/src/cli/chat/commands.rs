//! Slash command parsing for the chat loop.

use console::style;

/// In-loop commands, entered as `/command`.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    History,
    /// Toggle incremental streaming for the current chat.
    Stream,
    /// Delete the current chat (with confirmation) and start over.
    Delete,
    /// Leave the current chat and start a fresh one.
    New,
    Exit,
    Unknown(String),
}

/// Parse a chat input line as a slash command.
///
/// Returns `None` for ordinary messages.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let rest = input.strip_prefix('/')?;
    let command = rest.split_whitespace().next().unwrap_or("");

    Some(match command {
        "help" | "?" => ChatCommand::Help,
        "history" => ChatCommand::History,
        "stream" => ChatCommand::Stream,
        "delete" => ChatCommand::Delete,
        "new" => ChatCommand::New,
        "exit" | "quit" => ChatCommand::Exit,
        other => ChatCommand::Unknown(other.to_string()),
    })
}

/// Print the command reference.
pub fn print_help() {
    println!();
    println!("  {}", style("Commands").bold());
    let entries = [
        ("/help", "Show this help"),
        ("/history", "Replay the conversation so far"),
        ("/stream", "Toggle incremental streaming for this chat"),
        ("/delete", "Delete this chat and start over"),
        ("/new", "Start a fresh chat"),
        ("/exit", "End the session"),
    ];
    for (command, description) in entries {
        println!(
            "  {}  {}",
            style(format!("{command:<10}")).cyan(),
            style(description).dim()
        );
    }
    println!(
        "\n  {}",
        style("Ctrl+Enter sends a message; plain Enter adds a line.").dim()
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_messages_are_not_commands() {
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn known_commands_parse() {
        assert_eq!(parse("/help"), Some(ChatCommand::Help));
        assert_eq!(parse("/?"), Some(ChatCommand::Help));
        assert_eq!(parse("/history"), Some(ChatCommand::History));
        assert_eq!(parse("/stream"), Some(ChatCommand::Stream));
        assert_eq!(parse("/delete"), Some(ChatCommand::Delete));
        assert_eq!(parse("/new"), Some(ChatCommand::New));
        assert_eq!(parse("/exit"), Some(ChatCommand::Exit));
        assert_eq!(parse("/quit"), Some(ChatCommand::Exit));
    }

    #[test]
    fn unknown_commands_carry_their_name() {
        assert_eq!(
            parse("/frobnicate now"),
            Some(ChatCommand::Unknown("frobnicate".to_string()))
        );
    }
}
