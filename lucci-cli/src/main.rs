//! Lucci CLI - Chat with the agent from a terminal or serve it over HTTP

mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use lucci_core::prelude::*;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lucci")]
#[command(about = "Lucci conversational DeFi agent", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file layered over the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single chat turn
    Chat {
        /// User message
        message: String,
        /// Wallet address used for portfolio context
        #[arg(short, long, env = "LUCCI_USER_ADDRESS")]
        address: Option<String>,
        /// Print the full turn result as JSON
        #[arg(long, conflicts_with = "stream")]
        json: bool,
        /// Print events as they arrive
        #[arg(long)]
        stream: bool,
    },
    /// List the tools exposed to the completion engine
    Tools,
    /// Serve the chat endpoint over HTTP
    Serve {
        /// Address to bind, overriding the configured one
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("lucci {}", env!("CARGO_PKG_VERSION"));
        println!("lucci-core {}", lucci_core::VERSION);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => LucciConfig::from_file(path)?,
        None => LucciConfig::load()?,
    };
    let bind = config.server.bind.clone();
    let agent = Agent::from_config(config)?;

    match cli.command {
        Commands::Chat {
            message,
            address,
            json,
            stream,
        } => {
            let messages = vec![Message::user(message)];
            if stream {
                stream_turn(&agent, messages, address).await?;
            } else {
                let output = agent.chat(messages, address.as_deref()).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&output)?);
                } else {
                    println!("{}", output.text);
                    if output.incomplete {
                        eprintln!("(turn ended early: {})", output.finish_reason);
                    }
                }
            }
        }
        Commands::Tools => {
            for entry in agent.tools().iter() {
                let marker = if entry.is_mutating() { " [confirm]" } else { "" };
                println!("{}{}\n    {}", entry.name(), marker, entry.description());
            }
        }
        Commands::Serve { bind: override_bind } => {
            server::run(agent, override_bind.as_deref().unwrap_or(&bind)).await?;
        }
        Commands::Version => {}
    }

    Ok(())
}

async fn stream_turn(agent: &Agent, messages: Vec<Message>, address: Option<String>) -> Result<()> {
    let mut events = agent.chat_stream(messages, address);
    let mut stdout = std::io::stdout();

    while let Some(event) = events.next().await {
        match event {
            AgentEvent::TextDelta { text } => {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            AgentEvent::ToolCall { tool_name, args, .. } => {
                eprintln!("-> {} {}", tool_name, args);
            }
            AgentEvent::ToolResult {
                tool_name, result, ..
            } => {
                eprintln!("<- {} {:?}", tool_name, result.status);
            }
            AgentEvent::Finish {
                finish_reason,
                incomplete,
                ..
            } => {
                writeln!(stdout)?;
                if incomplete {
                    eprintln!("(turn ended early: {})", finish_reason);
                }
            }
            AgentEvent::Error { message } => {
                anyhow::bail!(message);
            }
        }
    }

    Ok(())
}
