//! Main chat loop orchestration.
//!
//! Coordinates the conversation lifecycle: chat creation, the compose
//! input loop, slash commands, posting messages through the composer, and
//! printing streamed fragments as the live binding reports them. Deleting
//! the chat (or `/new`) navigates "home": the loop starts over with a
//! fresh chat.

use std::time::Duration;

use console::style;
use tracing::info;

use confab_core::binding::ListEvent;
use confab_core::chat::composer::{
    ComposeError, ComposeSettings, MessageComposer, NewMessageParams,
};
use confab_core::stream::scroll::ScrollScheduler;
use confab_types::chat::{Chat, Sender};
use confab_types::error::StreamError;

use crate::state::AppState;

use super::commands::{self, ChatCommand};
use super::input::{ComposeInput, InputEvent};
use super::renderer::ChatRenderer;

/// Outcome of one chat's inner loop.
enum LoopOutcome {
    /// Navigate home: start over with a fresh chat.
    Home,
    /// End the session entirely.
    Quit,
}

/// Run the interactive chat loop.
pub async fn run_chat_loop(
    state: &AppState,
    title: Option<String>,
    model: Option<String>,
    no_stream: bool,
) -> anyhow::Result<()> {
    let model = model.unwrap_or_else(|| state.config.default_model.clone());
    let renderer = ChatRenderer::new();

    loop {
        let chat = state
            .chat_service
            .create_chat(title.clone(), model.clone())
            .await?;
        let chat = if no_stream {
            state
                .chat_service
                .set_streaming_enabled(&chat.id, false)
                .await?
        } else {
            chat
        };

        print_banner(&chat);
        match chat_session(state, &chat, &renderer).await? {
            LoopOutcome::Home => continue,
            LoopOutcome::Quit => return Ok(()),
        }
    }
}

/// The inner input loop for one chat.
async fn chat_session(
    state: &AppState,
    chat: &Chat,
    renderer: &ChatRenderer,
) -> anyhow::Result<LoopOutcome> {
    let scroll = ScrollScheduler::new(Duration::from_millis(state.config.scroll_delay_ms));
    let prompt = format!("  {} ", style("You >").green().bold());
    let mut input = ComposeInput::new(prompt);

    loop {
        match input.read_message().await? {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                return Ok(LoopOutcome::Quit);
            }
            InputEvent::Interrupted => {
                println!(
                    "\n  {}",
                    style("Press Ctrl+D to exit, or keep chatting.").dim()
                );
                continue;
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }

                if let Some(command) = commands::parse(&text) {
                    match command {
                        ChatCommand::Help => {
                            commands::print_help();
                        }
                        ChatCommand::History => {
                            print_history(state, chat, renderer).await?;
                        }
                        ChatCommand::Stream => {
                            toggle_streaming(state, chat, renderer).await?;
                        }
                        ChatCommand::Delete => {
                            if delete_with_confirmation(state, chat, renderer).await? {
                                return Ok(LoopOutcome::Home);
                            }
                        }
                        ChatCommand::New => {
                            return Ok(LoopOutcome::Home);
                        }
                        ChatCommand::Exit => {
                            println!("\n  {}", style("Session ended.").dim());
                            return Ok(LoopOutcome::Quit);
                        }
                        ChatCommand::Unknown(name) => {
                            println!(
                                "\n  {} Unknown command: {}. Type /help for available commands.\n",
                                style("?").yellow().bold(),
                                style(name).dim()
                            );
                        }
                    }
                    continue;
                }

                post_message(state, chat, text, scroll.clone(), renderer).await;
            }
        }
    }
}

/// Post one message and print the streamed reply as binding events arrive.
async fn post_message(
    state: &AppState,
    chat: &Chat,
    text: String,
    scroll: ScrollScheduler,
    renderer: &ChatRenderer,
) {
    let Ok(binding) = state.chat_service.binding(&chat.id) else {
        renderer.error_notice("This chat no longer exists.");
        return;
    };
    let mut events = binding.subscribe();

    let spinner = indicatif::ProgressBar::new_spinner();
    if let Ok(spinner_style) =
        indicatif::ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(spinner_style);
    }
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));

    let settings = ComposeSettings {
        temperature: state.config.temperature,
        max_tokens: state.config.max_tokens,
    };
    let composer = MessageComposer::new(
        &state.chat_service,
        &state.provider,
        scroll,
        settings,
        NewMessageParams {
            chat_id: chat.id,
            text,
            sender: Sender::User,
        },
    );

    let post = composer.create_message_and_completion();
    tokio::pin!(post);

    let mut first_token_seen = false;
    let mut events_closed = false;
    let result = loop {
        tokio::select! {
            result = &mut post => break result,
            event = events.recv(), if !events_closed => {
                match event {
                    Ok(ListEvent::TextDelta { delta, .. }) => {
                        if !first_token_seen {
                            spinner.finish_and_clear();
                            first_token_seen = true;
                            print!("\n  {} ", style("Assistant >").cyan().bold());
                        }
                        renderer.print_streaming_token(&delta);
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        events_closed = true;
                    }
                }
            }
        }
    };
    // The composer resolved; drain fragments that were already broadcast.
    while let Ok(event) = events.try_recv() {
        if let ListEvent::TextDelta { delta, .. } = event {
            if !first_token_seen {
                spinner.finish_and_clear();
                first_token_seen = true;
                print!("\n  {} ", style("Assistant >").cyan().bold());
            }
            renderer.print_streaming_token(&delta);
        }
    }
    if !first_token_seen {
        spinner.finish_and_clear();
    }

    match result {
        Ok(reply) => {
            info!(chat_id = %chat.id, message_id = %reply.id, "Reply complete");
            renderer.print_stats_footer(reply.response_ms.unwrap_or(0), &chat.model);
            println!();
        }
        Err(ComposeError::Stream(StreamError::StaleTarget { .. })) => {
            renderer.error_notice("The chat was deleted mid-reply.");
        }
        Err(ComposeError::EmptyMessage) => {}
        Err(err) => {
            renderer.error_notice(&format!("Completion failed: {err}"));
            println!("  {}", style("Type a message to retry, /exit to quit.").dim());
        }
    }
}

/// Toggle streaming through the deferred-edit path, then confirm with a
/// toast-style notice -- the source system's toggle behavior.
async fn toggle_streaming(
    state: &AppState,
    chat: &Chat,
    renderer: &ChatRenderer,
) -> anyhow::Result<()> {
    let current = state
        .chat_service
        .get_chat(&chat.id)
        .await?
        .map(|c| c.streaming_enabled)
        .unwrap_or(true);

    let updated = state
        .chat_service
        .set_streaming_enabled(&chat.id, !current)
        .await?;
    renderer.notice(&format!(
        "Streaming {} for chat.",
        if updated.streaming_enabled {
            "enabled"
        } else {
            "disabled"
        }
    ));
    Ok(())
}

/// Confirm, then delete the current chat. Returns whether it was deleted.
async fn delete_with_confirmation(
    state: &AppState,
    chat: &Chat,
    renderer: &ChatRenderer,
) -> anyhow::Result<bool> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Delete Chat: are you sure you want to delete this chat?")
        .default(false)
        .interact()?;
    if !confirmed {
        return Ok(false);
    }

    state.chat_service.delete_chat(&chat.id).await?;
    renderer.notice("Chat deleted.");
    Ok(true)
}

/// Replay the conversation so far.
async fn print_history(
    state: &AppState,
    chat: &Chat,
    renderer: &ChatRenderer,
) -> anyhow::Result<()> {
    let messages = state.chat_service.get_messages(&chat.id, None, None).await?;
    println!();
    for message in &messages {
        let label = match message.sender {
            Sender::User => style("You").green().bold(),
            Sender::Assistant => style("Assistant").cyan().bold(),
        };
        println!("  {}", label);
        match message.sender {
            Sender::User => println!("  {}\n", message.text),
            Sender::Assistant => {
                println!("{}\n", renderer.render_final(&message.text).trim_end())
            }
        }
    }
    Ok(())
}

fn print_banner(chat: &Chat) {
    println!();
    println!(
        "  {} {}",
        style("Confab").cyan().bold(),
        style(format!("\u{00b7} {}", chat.model)).dim()
    );
    if let Some(ref title) = chat.title {
        println!("  {}", style(title).bold());
    }
    println!(
        "  {}",
        style("Ctrl+Enter sends, Enter adds a line, /help for commands.").dim()
    );
    println!();
}
