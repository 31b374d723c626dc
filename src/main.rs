use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use promptsmith::chat::{ChatBook, SessionStore, SqliteSessionStore};
use promptsmith::export::{export_url, ExportTarget};
use promptsmith::llm::{self, LlmClient, LlmPromptService};
use promptsmith::{config, tui};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "promptsmith")]
#[command(about = "Turn a rough idea into a refined AI prompt")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refine an idea through clarifying questions and suggested edits
    Refine {
        /// Initial idea; can also be typed in the first step
        idea: Option<String>,
    },

    /// Chat with the model; sessions are saved between runs
    Chat,

    /// List saved chat sessions
    Sessions,

    /// Print the link that opens a prompt in a chat service
    Export {
        /// chatgpt, poe, deepseek, claude or gemini
        target: ExportTarget,

        /// Read the prompt from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "promptsmith=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    // Load configuration
    let config = config::load_config()?;

    match args.command {
        Command::Refine { idea } => {
            let client: Arc<dyn LlmClient> = Arc::from(llm::create_client(&config)?);
            let service = LlmPromptService::from_config(client, &config);

            if let Some(prompt) = tui::run_wizard(&config, &service, idea).await? {
                println!("{}\n", prompt);
                for target in ExportTarget::ALL {
                    println!("{:<10}{}", target.name(), export_url(target, &prompt));
                }
            }
        }
        Command::Chat => {
            let client = llm::create_client(&config)?;
            let store = open_store(&config).await?;
            run_chat(client.as_ref(), ChatBook::open(store).await?).await?;
        }
        Command::Sessions => {
            let store = open_store(&config).await?;
            let sessions = store.load_all().await?;
            if sessions.is_empty() {
                println!("No saved sessions");
            }
            for (i, session) in sessions.iter().enumerate() {
                println!(
                    "{:>3}. {} ({} messages)",
                    i + 1,
                    session.title,
                    session.messages.len()
                );
            }
        }
        Command::Export { target, file } => {
            let prompt = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Could not read {}", path.display()))?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };

            let prompt = prompt.trim();
            if prompt.is_empty() {
                anyhow::bail!("No prompt to export");
            }
            println!("{}", export_url(target, prompt));
        }
    }

    Ok(())
}

async fn open_store(config: &config::Config) -> Result<SqliteSessionStore> {
    let path = config.store.resolved_path();
    SqliteSessionStore::open(&path)
        .await
        .with_context(|| format!("Could not open session store at {}", path.display()))
}

async fn run_chat<S: SessionStore>(client: &dyn LlmClient, mut book: ChatBook<S>) -> Result<()> {
    println!(
        "Chatting in \"{}\". Commands: /new, /list, /switch N, /delete N, /quit",
        book.current().title
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let mut words = line.split_whitespace();

        match words.next() {
            Some("/quit") | Some("/exit") => break,
            Some("/new") => {
                book.new_session().await?;
                println!("Started a new chat");
            }
            Some("/list") => {
                for (i, session) in book.sessions().iter().enumerate() {
                    let marker = if i == book.current_index() { "*" } else { " " };
                    println!("{}{:>3}. {}", marker, i + 1, session.title);
                }
            }
            Some("/switch") => match session_number(words.next(), book.sessions().len()) {
                Some(index) => {
                    book.select(index);
                    let session = book.current();
                    println!("Switched to \"{}\"", session.title);
                    for message in &session.messages {
                        println!("[{}] {}", message.role.as_str(), message.content);
                    }
                }
                None => println!("Usage: /switch N (see /list)"),
            },
            Some("/delete") => match session_number(words.next(), book.sessions().len()) {
                Some(index) => {
                    book.delete(index).await?;
                    println!("Deleted. Now in \"{}\"", book.current().title);
                }
                None => println!("Usage: /delete N (see /list)"),
            },
            Some(command) if command.starts_with('/') => {
                println!("Unknown command {}", command);
            }
            _ => match book.send(client, line).await {
                Ok(Some(reply)) => println!("{}\n", reply.content),
                Ok(None) => {}
                Err(e) => eprintln!("Error: {}", e),
            },
        }
    }

    Ok(())
}

/// Parse a 1-based session number from the chat commands
fn session_number(arg: Option<&str>, count: usize) -> Option<usize> {
    let number: usize = arg?.parse().ok()?;
    (1..=count).contains(&number).then(|| number - 1)
}
