//! # Dream Agent
//!
//! A conversational dream-analysis assistant in the terminal.
//!
//! Each line you type is one turn of the workflow: dream reports are
//! stored and analyzed against your past dreams, journal searches answer
//! directly, and journal commands pause for your confirmation before
//! anything is executed. Conversation state survives restarts: the
//! workflow checkpoint and the journal live under the data directory.
//!
//! ## Quick Start
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! cargo run -- --user alice
//! ```

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dreamflow::{
    AnalysisMode, Assistant, FileCheckpointer, JsonFileRecords, OpenAiClient, Persona, TurnInput,
    TurnOutcome,
};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "dream-agent",
    version,
    about = "A dream-analysis chat assistant with a resumable workflow engine",
    long_about = r#"
Dream Agent - talk through your dreams in the terminal.

Type a dream to have it stored and analyzed against your past dreams,
ask to find an earlier dream, or ask for a journal action (saving,
archiving). Actions with side effects pause for your confirmation:
answer YES to proceed or say what needs fixing.

EXAMPLES:
  # Start a session for a user (the conversation thread follows the user)
  dream-agent --user alice

  # Pick a persona and mode up front
  dream-agent --user alice --persona narrative --mode specific
"#
)]
struct Args {
    /// User id; also the conversation thread id.
    #[arg(short, long, env = "DREAM_USER", default_value = "local")]
    user: String,

    /// Analysis persona (jung, narrative, cognitive).
    #[arg(short, long)]
    persona: Option<String>,

    /// Persona selection mode (auto, specific, ensemble).
    #[arg(short, long)]
    mode: Option<String>,

    /// Enable verbose/debug logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("failed to load configuration")?;
    config.validate()?;

    let persona = args
        .persona
        .as_deref()
        .map(Persona::from_str)
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;
    let mode = args
        .mode
        .as_deref()
        .map(AnalysisMode::from_str)
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    info!(user = %args.user, model = %config.model, "starting dream agent");

    let model = Arc::new(
        OpenAiClient::new(&config.api_base, &config.api_key, &config.model)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens),
    );
    let records = Arc::new(
        JsonFileRecords::open(config.data_dir.join("dreams.json"))
            .await
            .context("failed to open the dream journal")?,
    );
    let checkpointer = Arc::new(FileCheckpointer::new(config.data_dir.join("checkpoints")));

    let assistant = Assistant::new(model, records, checkpointer)
        .map_err(|e| anyhow::anyhow!("workflow graph is misconfigured: {e}"))?;

    chat_loop(&assistant, &args.user, mode, persona).await
}

/// Read lines from stdin and drive the workflow one turn at a time.
async fn chat_loop(
    assistant: &Assistant,
    user: &str,
    mode: Option<AnalysisMode>,
    persona: Option<Persona>,
) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("dream-agent - tell me about a dream (type 'exit' to quit)\n");
    if assistant.is_awaiting_input(user).await.unwrap_or(false) {
        println!("(a confirmation from your last session is still pending; answer YES or correct it)\n");
    }

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }

        let awaiting = assistant.is_awaiting_input(user).await.unwrap_or(false);
        let outcome = if awaiting {
            assistant.resume(user, text).await
        } else {
            assistant
                .start_or_continue(
                    user,
                    TurnInput {
                        text: text.to_string(),
                        mode,
                        persona,
                        user_id: user.to_string(),
                    },
                )
                .await
        };

        match outcome {
            Ok(TurnOutcome::Reply(reply)) => {
                println!("\nassistant> {}\n", reply.reply);
                if !reply.context.is_empty() {
                    println!("(drawing on {} related dream(s) from your journal)\n", reply.context.len());
                }
            }
            Ok(TurnOutcome::AwaitingInput(interrupt)) => {
                let question = interrupt
                    .payload
                    .get("question")
                    .and_then(|q| q.as_str())
                    .unwrap_or("The assistant needs your input to continue.");
                println!("\nassistant> {}\n", question);
            }
            Err(e) if e.is_retryable() => {
                println!("\n(another session advanced this conversation; please try again)\n");
            }
            Err(e) if e.is_caller_error() => {
                println!("\n({})\n", e);
            }
            Err(e) => {
                error!(error = %e, "turn failed");
                println!("\n(something went wrong on my side; your conversation is intact, try again)\n");
            }
        }
    }

    println!("goodbye.");
    Ok(())
}
