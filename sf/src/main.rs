//! StoryForge - LLM-assisted user story and BDD refinement
//!
//! CLI entry point: sets up logging, loads config, builds the LLM client,
//! and dispatches into the wizard or the session-management commands.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};

use storyforge::artifacts::DerivationPipeline;
use storyforge::cli::{Cli, Command, SessionCommand};
use storyforge::config::Config;
use storyforge::domain::Story;
use storyforge::export::{self, ExportFormat};
use storyforge::gateway::PromptGateway;
use storyforge::llm::{LlmClient, create_client};
use storyforge::planning::PlanningEngine;
use storyforge::prompts::PromptLoader;
use storyforge::session::{Session, SessionMode, SessionRepository};
use storyforge::wizard::Wizard;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storyforge")
        .join("logs");
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some("INFO") | None => tracing::Level::INFO,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    // The wizard owns the terminal, so logs go to a file
    let log_file = fs::File::create(log_dir.join("storyforge.log")).context("Failed to create log file")?;
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    tracing::info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    match cli.command {
        Command::Story {
            title,
            description,
            refine,
        } => {
            let llm = create_client(&config.llm)?;
            let description = read_description(description)?;
            let story = if refine {
                let engine = PlanningEngine::new(gateway(&llm, &config));
                let raw = format!("{}\n{}", title, description);
                let refined = engine
                    .refine_requirement(&raw)
                    .await
                    .map_err(|e| eyre!("Refinement failed: {}", e))?;
                println!("{} {}", "Refined:".bright_cyan(), refined.title.bold());
                println!("{}", refined.description);
                refined
            } else {
                Story::new(title, description)
            };
            let session = Session::submit_story(story, SessionMode::Story)?;
            Wizard::new(llm, &config, session)?.run().await
        }

        Command::Bdd { title, description } => {
            let llm = create_client(&config.llm)?;
            let description = read_description(description)?;
            let session = Session::submit_story(Story::new(title, description), SessionMode::Bdd)?;
            Wizard::new(llm, &config, session)?.run().await
        }

        Command::Transcript { file, analyze } => {
            let llm = create_client(&config.llm)?;
            let transcript = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read transcript: {}", file.display()))?;
            run_transcript(llm, &config, &transcript, analyze).await
        }

        Command::Resume { id } => {
            let llm = create_client(&config.llm)?;
            let repository = SessionRepository::open(config.sessions.resolve_dir())?;
            let session = repository.load(&resolve_id(&repository, &id)?)?;
            Wizard::new(llm, &config, session)?.run().await
        }

        Command::Sessions { command } => {
            let repository = SessionRepository::open(config.sessions.resolve_dir())?;
            run_sessions(&repository, command)
        }

        Command::Export { id, format, output } => {
            let repository = SessionRepository::open(config.sessions.resolve_dir())?;
            let session = repository.load(&resolve_id(&repository, &id)?)?;
            let format = ExportFormat::parse(&format).ok_or_else(|| eyre!("Unknown export format: {}", format))?;
            let document = export::assemble(format, &session);
            match output {
                Some(path) => {
                    fs::write(&path, document).with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Exported to {}", path.display());
                }
                None => print!("{}", document),
            }
            Ok(())
        }
    }
}

fn gateway(llm: &Arc<dyn LlmClient>, config: &Config) -> PromptGateway {
    let prompt_root = std::env::current_dir().unwrap_or_default();
    PromptGateway::new(llm.clone(), PromptLoader::new(prompt_root), config.llm.max_tokens)
}

/// Use the provided description, or read it from stdin
fn read_description(arg: Option<String>) -> Result<String> {
    match arg {
        Some(text) => Ok(text),
        None => {
            eprintln!("Enter the story description (end with Ctrl+D):");
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read description from stdin")?;
            Ok(buffer)
        }
    }
}

/// Extract stories from a transcript, let the user pick one, open the wizard
async fn run_transcript(llm: Arc<dyn LlmClient>, config: &Config, transcript: &str, analyze: bool) -> Result<()> {
    let pipeline = DerivationPipeline::new(gateway(&llm, config));

    let stories = pipeline
        .transcript_stories(transcript)
        .await
        .map_err(|e| eyre!("Story extraction failed: {}", e))?;

    println!();
    println!("{}", "Stories found in the transcript:".bright_cyan());
    for (i, story) in stories.iter().enumerate() {
        println!("  {}. {} - {}", i + 1, story.title.bold(), story.description.dimmed());
    }
    print!("Pick a story number: ");
    use std::io::Write;
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let index: usize = line.trim().parse().context("Not a number")?;
    let story = stories
        .get(index.saturating_sub(1))
        .cloned()
        .ok_or_else(|| eyre!("No story at index {}", index))?;

    let mut session = Session::submit_story(story, SessionMode::Story)?;
    session.set_split_queue(stories);
    session.phase = storyforge::session::RoundPhase::Configuring;

    if analyze {
        match pipeline.transcript_analysis(&mut session, transcript).await {
            Ok(report) => {
                println!();
                println!("{}", report);
            }
            Err(e) => eprintln!("{} transcript analysis failed: {}", "!".red(), e),
        }
    }

    Wizard::new(llm, config, session)?.run().await
}

fn run_sessions(repository: &SessionRepository, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::List => {
            let summaries = repository.list()?;
            if summaries.is_empty() {
                println!("No stored sessions.");
                return Ok(());
            }
            for summary in summaries {
                println!(
                    "{}  {:?}  {}  {}",
                    summary.id,
                    summary.mode,
                    summary.created_at.format("%Y-%m-%d %H:%M"),
                    summary.title.bold()
                );
            }
            Ok(())
        }
        SessionCommand::Show { id } => {
            let session = repository.load(&resolve_id(repository, &id)?)?;
            println!("{} {}", "Story:".bright_cyan(), session.original_story.title.bold());
            println!("{}", session.working_text());
            if !session.conversation.is_empty() {
                println!();
                print!("{}", session.conversation.render_transcript());
            }
            if !session.scenarios.is_empty() {
                println!();
                print!("{}", export::feature_file(&session));
            }
            Ok(())
        }
        SessionCommand::Delete { id } => {
            let resolved = resolve_id(repository, &id)?;
            if repository.delete(&resolved)? {
                println!("Deleted {}", resolved);
            } else {
                println!("No session {}", resolved);
            }
            Ok(())
        }
    }
}

/// Resolve a full or prefix session id against the stored sessions
fn resolve_id(repository: &SessionRepository, id: &str) -> Result<String> {
    let mut matches: Vec<String> = repository
        .list()?
        .into_iter()
        .map(|s| s.id)
        .filter(|stored| stored.starts_with(id))
        .collect();
    match matches.len() {
        0 => Err(eyre!("No session matching '{}'", id)),
        1 => Ok(matches.remove(0)),
        n => Err(eyre!("'{}' is ambiguous ({} sessions match)", id, n)),
    }
}
