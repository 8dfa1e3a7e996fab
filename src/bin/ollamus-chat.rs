//! Interactive chat application for conversing with a locally hosted model.
//!
//! This binary provides a streaming REPL interface for chatting with models
//! served by a local Ollama instance.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! ollamus-chat
//!
//! # Specify a model
//! ollamus-chat --model mistral
//!
//! # Point at a non-default server
//! ollamus-chat --api-base http://192.168.1.20:11434/api
//!
//! # Disable colors (useful for piping output)
//! ollamus-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/model <name>` - Change the model (clears history)
//! - `/export <path>` / `/import <path>` - Save or load the conversation
//! - `/html <path>` - Write the rendered transcript page
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use futures::StreamExt;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use ollamus::Ollama;
use ollamus::chat::{
    AnsiOutput, ChatArgs, ChatCommand, ChatConfig, ChatOutput, ChatSession, help_text,
    parse_command,
};

/// Main entry point for the ollamus-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("ollamus-chat [OPTIONS]");
    let api_base = args.api_base.clone();
    let config = ChatConfig::from(args);
    let use_color = config.use_color;

    let client = Ollama::new(api_base)?;
    let mut session = ChatSession::new(client, config);

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut output = AnsiOutput::with_color(use_color).with_interrupt(interrupted.clone());
    let mut rl = DefaultEditor::new()?;

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!("Ollamus Chat (model: {})", session.model());
    println!("Type /help for commands, /quit to exit\n");

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.reset();
                            output.print_info("Conversation cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model(model_name) => {
                            session.set_model(model_name.clone());
                            output.print_info(&format!(
                                "Model changed to: {} (history cleared)",
                                model_name
                            ));
                        }
                        ChatCommand::Temperature(value) => {
                            session.set_temperature(Some(value));
                            output.print_info(&format!("temperature set to {:.2}", value));
                        }
                        ChatCommand::ClearTemperature => {
                            session.set_temperature(None);
                            output.print_info("temperature reset to server default");
                        }
                        ChatCommand::TopP(value) => {
                            session.set_top_p(Some(value));
                            output.print_info(&format!("top_p set to {:.2}", value));
                        }
                        ChatCommand::ClearTopP => {
                            session.set_top_p(None);
                            output.print_info("top_p reset to server default");
                        }
                        ChatCommand::TopK(value) => {
                            session.set_top_k(Some(value));
                            output.print_info(&format!("top_k set to {value}"));
                        }
                        ChatCommand::ClearTopK => {
                            session.set_top_k(None);
                            output.print_info("top_k reset to server default");
                        }
                        ChatCommand::RepeatPenalty(value) => {
                            session.set_repeat_penalty(Some(value));
                            output.print_info(&format!("repeat_penalty set to {:.2}", value));
                        }
                        ChatCommand::ClearRepeatPenalty => {
                            session.set_repeat_penalty(None);
                            output.print_info("repeat_penalty reset to server default");
                        }
                        ChatCommand::ContextLength(value) => {
                            session.set_context_length(Some(value));
                            output.print_info(&format!("context length set to {value}"));
                        }
                        ChatCommand::ClearContextLength => {
                            session.set_context_length(None);
                            output.print_info("context length reset to server default");
                        }
                        ChatCommand::Export(path) => match session.export_document() {
                            Ok(document) => match fs::write(&path, document) {
                                Ok(_) => {
                                    output.print_info(&format!("Conversation exported to {path}"))
                                }
                                Err(err) => output
                                    .print_error(&format!("Failed to write {path}: {err}")),
                            },
                            Err(err) => {
                                output.print_error(&format!("Failed to export: {err}"))
                            }
                        },
                        ChatCommand::Import(path) => match fs::read_to_string(&path) {
                            Ok(raw) => match session.import_document(&raw) {
                                Ok(_) => output.print_info(&format!(
                                    "Conversation imported from {path} (model: {})",
                                    session.model()
                                )),
                                Err(err) => {
                                    output.print_error(&format!("Failed to import: {err}"))
                                }
                            },
                            Err(err) => {
                                output.print_error(&format!("Failed to read {path}: {err}"))
                            }
                        },
                        ChatCommand::Html(path) => {
                            match fs::write(&path, session.render_page()) {
                                Ok(_) => {
                                    output.print_info(&format!("Transcript page written to {path}"))
                                }
                                Err(err) => output
                                    .print_error(&format!("Failed to write {path}: {err}")),
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            output.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the server and drain the turn.
                // Stopping early (Ctrl+C) abandons the turn: nothing further
                // is read and no assistant message is recorded.
                println!("Assistant:");
                {
                    let mut turn = session.send_turn(line).await;
                    while let Some(item) = turn.next().await {
                        if output.should_interrupt() {
                            output.print_interrupted();
                            break;
                        }
                        match item {
                            Ok(fragment) => output.print_text(&fragment),
                            Err(error) => {
                                output.print_error(&error.to_string());
                                break;
                            }
                        }
                    }
                }
                output.finish_response();
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                output.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!("      Completed turns: {}", stats.totals.turns);
    println!(
        "      Total tokens: {} prompt / {} generated",
        stats.totals.prompt_eval_count, stats.totals.eval_count
    );
    if let Some(last) = stats.totals.last_turn {
        let seconds = last.total_duration_ns as f64 / 1e9;
        println!(
            "      Last turn: {} prompt / {} generated in {:.1}s",
            last.prompt_eval_count, last.eval_count, seconds
        );
    }
}

fn print_config(session: &ChatSession) {
    let stats = session.stats();
    println!("    Current Configuration:");
    println!("      Model: {}", stats.model);
    println!(
        "      Temperature: {}",
        describe_float(stats.params.temperature)
    );
    println!("      Top-p: {}", describe_float(stats.params.top_p));
    println!("      Top-k: {}", describe_int(stats.params.top_k));
    println!(
        "      Repeat penalty: {}",
        describe_float(stats.params.repeat_penalty)
    );
    println!(
        "      Context length: {}",
        describe_int(stats.params.num_ctx)
    );
}

fn describe_float(value: Option<f32>) -> String {
    value
        .map(|v| format!("{v:.2}"))
        .unwrap_or_else(|| "default".to_string())
}

fn describe_int(value: Option<u32>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "default".to_string())
}
