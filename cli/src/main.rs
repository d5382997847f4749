use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use sweep_core::agent::{AgentLoop, PromptBuilder, Session, ToolRegistry, TurnOutcome};
use sweep_core::{config, providers, tools};
use tracing_subscriber::EnvFilter;
mod onboard;

#[derive(Parser)]
#[command(name = "sweep")]
#[command(about = "sweep - an assistant that helps you find and clean up disk clutter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the model provider and write ~/.sweep/config.toml
    Onboard,
    /// Talk to the assistant, interactively or with a single message
    Chat {
        #[arg(short, long)]
        message: Option<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("SWEEP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_agent(config: &config::Config) -> Result<AgentLoop> {
    let provider = providers::create_provider(config)?;

    let mut registry = ToolRegistry::new();
    let notifier = tools::Notifier::new(|message| {
        println!("  {} {}", style("•").cyan(), message);
    });
    tools::register_builtin_tools(&mut registry, config, notifier)?;

    Ok(AgentLoop::new(
        Arc::from(provider),
        PromptBuilder::new(config.prompt_config()),
        Arc::new(registry),
    )
    .with_max_loops(config.max_loops)
    .with_model_timeout(config.model_timeout())
    .with_termination_phrases(config.termination_phrases.clone()))
}

fn print_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Answer(text) => println!("{text}"),
        TurnOutcome::Suspended(question) => {
            println!("{} {}", style("?").yellow().bold(), style(question).bold());
        }
        TurnOutcome::TimedOut(text) => println!("{}", style(text).yellow()),
        TurnOutcome::Failed(_) => eprintln!("{} {}", style("❌").red(), outcome.message()),
    }
}

async fn run_repl(agent: &AgentLoop) -> Result<()> {
    let history_path = config::ensure_sweep_dir()?.join("history.txt");
    let mut editor = DefaultEditor::new()?;
    let _ = editor.load_history(&history_path);
    let mut session = Session::new();

    println!("🧹 {}", style("Sweep").bold());
    println!(
        "{}",
        style("Describe what to clean up. /reset starts over, /history shows the session, Ctrl+D exits.\n")
            .dim()
    );

    loop {
        let prompt = if session.state().is_suspended() { "answer> " } else { "> " };
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("\n👋 Goodbye!");
                break;
            }
            Err(e) => return Err(e.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        match input {
            "/reset" => {
                agent.reset(&mut session);
                println!("{}", style("Session cleared.").dim());
                continue;
            }
            "/history" => {
                for entry in agent.history(&session) {
                    println!("  {entry}");
                }
                continue;
            }
            _ => {}
        }

        let outcome = agent.process_input(&mut session, input).await;
        println!();
        print_outcome(&outcome);
        println!();

        if agent.is_termination_phrase(input) {
            break;
        }
    }

    if let Err(e) = editor.save_history(&history_path) {
        tracing::warn!(error = %e, "could not save input history");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() {
            Commands::Onboard
        } else {
            Commands::Chat { message: None }
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Chat { message } => {
            let config = config::load_config()?;
            let agent = build_agent(&config)?;

            if let Some(msg) = message {
                let mut session = Session::new();
                let outcome = agent.process_input(&mut session, &msg).await;
                print_outcome(&outcome);
                if let TurnOutcome::Failed(e) = outcome {
                    anyhow::bail!("Agent processing failed: {}", e);
                }
            } else {
                run_repl(&agent).await?;
            }
        }
    }

    Ok(())
}
