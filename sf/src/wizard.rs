//! Interactive wizard
//!
//! The terminal driver tying the engines together: it runs the question
//! loop, routes slash commands to the engines, and keeps the session saved
//! after every successful mutation. Engine failures are printed and the
//! loop continues; a failed request never ends the session.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::artifacts::DerivationPipeline;
use crate::complexity::ComplexityEngine;
use crate::config::Config;
use crate::domain::{ArtifactKind, Persona, StepTechnology};
use crate::export::{self, ExportFormat};
use crate::gateway::PromptGateway;
use crate::llm::LlmClient;
use crate::planning::{BddEngine, PlanningEngine, RewriteOutcome};
use crate::prompts::PromptLoader;
use crate::session::{RoundPhase, Session, SessionMode, SessionRepository};

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}

/// Interactive session driver
pub struct Wizard {
    planning: PlanningEngine,
    bdd: BddEngine,
    complexity: ComplexityEngine,
    pipeline: DerivationPipeline,
    repository: SessionRepository,
    session: Session,
    default_personas: Vec<Persona>,
    /// Rewrite waiting for /accept or /discard
    pending_suggestion: Option<String>,
}

impl Wizard {
    pub fn new(llm: Arc<dyn LlmClient>, config: &Config, session: Session) -> Result<Self> {
        let prompt_root = std::env::current_dir().unwrap_or_default();
        let max_tokens = config.llm.max_tokens;
        let gateway =
            |llm: &Arc<dyn LlmClient>| PromptGateway::new(llm.clone(), PromptLoader::new(&prompt_root), max_tokens);

        let default_personas = config
            .wizard
            .default_personas
            .iter()
            .filter_map(|s| Persona::parse(s))
            .filter(|p| p.asks_questions())
            .collect();

        Ok(Self {
            planning: PlanningEngine::new(gateway(&llm)),
            bdd: BddEngine::new(gateway(&llm)),
            complexity: ComplexityEngine::new(gateway(&llm)),
            pipeline: DerivationPipeline::new(gateway(&llm)),
            repository: SessionRepository::open(config.sessions.resolve_dir())?,
            session,
            default_personas,
            pending_suggestion: None,
        })
    }

    /// Run the interactive loop until the user quits
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        if self.session.phase == RoundPhase::Configuring {
            self.configure_round(&mut rl).await?;
        }
        self.print_open_question();

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));
            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input, &mut rl).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.submit_answer(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        self.save_quietly();
        println!("Session saved. Goodbye!");
        Ok(())
    }

    /// Ask for personas and start the first round
    async fn configure_round(&mut self, rl: &mut DefaultEditor) -> Result<()> {
        let defaults: Vec<&str> = self.default_personas.iter().map(|p| p.key()).collect();
        let prompt = format!("Personas [{}]: ", defaults.join(","));

        let personas = loop {
            let line = match rl.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
                Err(err) => return Err(eyre::eyre!("Readline error: {}", err)),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break self.default_personas.clone();
            }
            match parse_persona_list(trimmed) {
                Ok(personas) => break personas,
                Err(unknown) => {
                    println!("{} Unknown persona: {}", "?".yellow(), unknown);
                    println!("Known: {}", Persona::questioners().map(|p| p.key()).collect::<Vec<_>>().join(", "));
                }
            }
        };

        match self.session.mode {
            SessionMode::Story => {
                if let Err(e) = self.planning.start_round(&mut self.session, personas).await {
                    print_error("start round", &e);
                } else {
                    self.save_quietly();
                }
            }
            SessionMode::Bdd => {
                self.session.active_personas = personas;
                match self.bdd.generate_titles(&mut self.session).await {
                    Ok(_) => {
                        self.save_quietly();
                        self.print_scenarios();
                        println!("Focus scenarios with {} to start the question loop.", "/focus <ids>".yellow());
                    }
                    Err(e) => print_error("generate scenarios", &e),
                }
            }
        }
        Ok(())
    }

    /// Route a free-text line to whichever conversation is waiting
    async fn submit_answer(&mut self, input: &str) {
        let in_focus = self.session.scenario_focus.as_ref().is_some_and(|f| f.conversation.awaiting_answer());

        let result = if in_focus {
            self.bdd.answer(&mut self.session, input).await
        } else if self.session.conversation.awaiting_answer() {
            self.planning.answer(&mut self.session, input).await
        } else {
            println!("{}", "No open question. Type /help for commands.".dimmed());
            return;
        };

        match result {
            Ok(()) => {
                self.save_quietly();
                self.print_open_question();
            }
            Err(e) => print_error("answer", &e),
        }
    }

    async fn handle_slash_command(&mut self, input: &str, rl: &mut DefaultEditor) -> SlashResult {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");
        debug!(%cmd, "Wizard::handle_slash_command: called");

        match cmd {
            "/help" | "/h" => self.print_help(),
            "/quit" | "/q" | "/exit" => return SlashResult::Quit,
            "/status" => self.print_status(),
            "/save" => match self.repository.save(&self.session) {
                Ok(()) => println!("{}", "Session saved.".dimmed()),
                Err(e) => println!("{} {}", "Save failed:".red(), e),
            },
            "/skip" => self.cmd_skip().await,
            "/suggest" => self.cmd_suggest().await,
            "/accept" => self.cmd_accept(),
            "/discard" => {
                self.pending_suggestion = None;
                self.session.discard_suggestion();
                self.save_quietly();
                println!("{}", "Suggestion discarded.".dimmed());
            }
            "/satisfied" => self.cmd_satisfied().await,
            "/complexity" => self.cmd_complexity().await,
            "/split" => self.cmd_split(parts.get(1), rl).await,
            "/tests" => self.cmd_artifact(ArtifactKind::TestScenarios).await,
            "/checklist" => self.cmd_artifact(ArtifactKind::Checklist).await,
            "/prototype" => self.cmd_prototype().await,
            "/steps" => self.cmd_steps(parts.get(1)).await,
            "/scenarios" => self.cmd_scenarios().await,
            "/focus" => self.cmd_focus(&parts[1..]).await,
            "/gherkin" => self.cmd_gherkin(&parts[1..]).await,
            "/outline" => self.cmd_outline(parts.get(1), rl).await,
            "/export" => self.cmd_export(parts.get(1), parts.get(2)),
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        SlashResult::Continue
    }

    async fn cmd_skip(&mut self) {
        let in_focus = self.session.scenario_focus.as_ref().is_some_and(|f| f.conversation.awaiting_answer());
        let result = if in_focus {
            self.bdd.skip(&mut self.session).await
        } else {
            self.planning.skip(&mut self.session).await
        };
        match result {
            Ok(()) => {
                self.save_quietly();
                self.print_open_question();
            }
            Err(e) => print_error("skip", &e),
        }
    }

    /// Soft gate for suggestion/gherkin actions: proceed, but surface which
    /// active personas have not reported satisfaction yet
    fn warn_unsatisfied(&self) {
        let pending = self.session.unsatisfied_personas();
        if !pending.is_empty() {
            println!(
                "{} Personas not yet satisfied: {} (run {} to check).",
                "!".yellow(),
                pending.iter().map(|p| p.name()).collect::<Vec<_>>().join(", "),
                "/satisfied".yellow()
            );
        }
    }

    async fn cmd_suggest(&mut self) {
        self.warn_unsatisfied();
        match self.planning.request_rewrite(&self.session).await {
            Ok(RewriteOutcome::Suggestion(text)) => {
                println!();
                println!("{}", "Suggested story:".bright_cyan());
                println!("{}", text);
                println!();
                println!("{} to keep it, {} to drop it.", "/accept".yellow(), "/discard".yellow());
                self.pending_suggestion = Some(text);
            }
            Ok(RewriteOutcome::NotEnoughInformation) => {
                println!("{}", crate::planning::NOT_ENOUGH_INFO.dimmed());
            }
            Err(e) => print_error("suggest", &e),
        }
    }

    fn cmd_accept(&mut self) {
        let Some(text) = self.pending_suggestion.take() else {
            println!("{}", "No pending suggestion. Use /suggest first.".dimmed());
            return;
        };
        match self.session.accept_suggestion(text) {
            Ok(()) => {
                self.save_quietly();
                println!("{}", "Suggestion accepted as the working story.".dimmed());
            }
            Err(e) => println!("{} {}", "Accept failed:".red(), e),
        }
    }

    async fn cmd_satisfied(&mut self) {
        for persona in self.session.active_personas.clone() {
            match self.planning.check_satisfaction(&mut self.session, persona).await {
                Ok(true) => println!("  {} {}", persona.name().bright_green(), "has no open questions."),
                Ok(false) => println!("  {} {}", persona.name().yellow(), "still has open questions."),
                Err(e) => print_error("satisfaction check", &e),
            }
        }
        if self.session.all_personas_satisfied() {
            println!("{}", "All personas satisfied.".bright_green());
        }
        self.save_quietly();
    }

    async fn cmd_complexity(&mut self) {
        match self.complexity.analyze(&mut self.session).await {
            Ok(analysis) => {
                self.save_quietly();
                println!();
                println!("{} {}", "Complexity:".bright_cyan(), analysis.complexity.to_string().bold());
                println!("{}", analysis.justification);
                if !analysis.split_candidates().is_empty() {
                    println!();
                    println!("Suggested split ({} to take it):", "/split".yellow());
                    for (i, story) in analysis.split_candidates().iter().enumerate() {
                        println!("  {}. {}", i + 1, story.title);
                    }
                }
            }
            Err(e) => print_error("complexity", &e),
        }
    }

    async fn cmd_split(&mut self, index: Option<&&str>, rl: &mut DefaultEditor) {
        if self.session.phase != RoundPhase::SelectingSplit {
            if let Err(e) = self.session.accept_split() {
                println!("{} {}", "Split unavailable:".red(), e);
                return;
            }
            self.save_quietly();
        }

        println!();
        println!("{}", "Split stories:".bright_cyan());
        for (i, story) in self.session.split_queue.clone().iter().enumerate() {
            println!("  {}. {} - {}", i + 1, story.title.bold(), story.description.dimmed());
        }

        let choice = match index {
            Some(n) => n.to_string(),
            None => match rl.readline("Pick a story number: ") {
                Ok(line) => line,
                Err(_) => return,
            },
        };
        let Ok(n) = choice.trim().parse::<usize>() else {
            println!("{}", "Not a number.".dimmed());
            return;
        };
        match self.session.select_split(n.saturating_sub(1)) {
            Ok(()) => {
                self.save_quietly();
                println!("Now refining {}.", self.session.original_story.title.bold());
                if let Err(e) = self.configure_round(rl).await {
                    println!("{} {}", "Round setup failed:".red(), e);
                }
                self.print_open_question();
            }
            Err(e) => println!("{} {}", "Split failed:".red(), e),
        }
    }

    async fn cmd_artifact(&mut self, kind: ArtifactKind) {
        let result = match kind {
            ArtifactKind::TestScenarios => self.pipeline.test_scenarios(&mut self.session).await,
            ArtifactKind::Checklist => self.pipeline.checklist(&mut self.session).await,
            _ => return,
        };
        self.save_quietly();
        match result {
            Ok(value) => {
                println!();
                println!("{}", kind.name().bright_cyan());
                println!("{}", value);
            }
            Err(e) => print_error(kind.name(), &e),
        }
    }

    async fn cmd_prototype(&mut self) {
        let result = if self.session.scenarios.iter().any(|s| s.completed) {
            self.pipeline.prototype_from_feature(&mut self.session, None).await
        } else {
            self.pipeline.prototype_from_story(&mut self.session, None).await
        };
        self.save_quietly();
        match result {
            Ok(html) => println!("Prototype stored ({} chars). Use /export to write it out.", html.len()),
            Err(e) => print_error("prototype", &e),
        }
    }

    async fn cmd_steps(&mut self, tech: Option<&&str>) {
        let Some(technology) = tech.and_then(|t| StepTechnology::parse(t)) else {
            println!("Usage: /steps <cypress|playwright|cucumber-java|behave>");
            return;
        };
        let result = self.pipeline.step_definitions(&mut self.session, technology).await;
        self.save_quietly();
        match result {
            Ok(source) => {
                println!();
                println!("{} ({})", "Step definitions".bright_cyan(), technology.name());
                println!("{}", source);
            }
            Err(e) => print_error("step definitions", &e),
        }
    }

    async fn cmd_scenarios(&mut self) {
        if self.session.scenarios.is_empty() {
            match self.bdd.generate_titles(&mut self.session).await {
                Ok(_) => self.save_quietly(),
                Err(e) => {
                    print_error("generate scenarios", &e);
                    return;
                }
            }
        }
        self.print_scenarios();
    }

    async fn cmd_focus(&mut self, args: &[&str]) {
        let ids = parse_id_list(args);
        if ids.is_empty() {
            println!("Usage: /focus <id> [id...]");
            return;
        }
        let personas = if self.session.active_personas.is_empty() {
            self.default_personas.clone()
        } else {
            self.session.active_personas.clone()
        };
        match self.bdd.start_focus(&mut self.session, ids, personas).await {
            Ok(()) => {
                self.save_quietly();
                self.print_open_question();
            }
            Err(e) => print_error("focus", &e),
        }
    }

    async fn cmd_gherkin(&mut self, args: &[&str]) {
        self.warn_unsatisfied();
        let ids = if args.is_empty() {
            // Default to the focused group, else every pending scenario
            match self.session.scenario_focus.as_ref() {
                Some(focus) => focus.scenario_ids.clone(),
                None => self.session.scenarios.iter().filter(|s| !s.completed).map(|s| s.id).collect(),
            }
        } else {
            parse_id_list(args)
        };
        if ids.is_empty() {
            println!("{}", "Nothing to generate.".dimmed());
            return;
        }

        let result = if ids.len() == 1 {
            self.pipeline.gherkin_single(&mut self.session, ids[0]).await.map(|()| Vec::new())
        } else {
            self.pipeline.gherkin_group(&mut self.session, &ids).await.map(|o| o.unmatched)
        };
        match result {
            Ok(unmatched) => {
                self.save_quietly();
                for title in &unmatched {
                    println!("{} {} stayed pending (title not matched).", "!".yellow(), title);
                }
                self.print_scenarios();
            }
            Err(e) => print_error("gherkin", &e),
        }
    }

    async fn cmd_outline(&mut self, id: Option<&&str>, rl: &mut DefaultEditor) {
        let Some(id) = id.and_then(|s| s.trim().parse::<u64>().ok()) else {
            println!("Usage: /outline <id>");
            return;
        };

        let skeleton = match self.pipeline.outline_skeleton(&self.session, id).await {
            Ok(skeleton) => skeleton,
            Err(e) => {
                print_error("outline", &e);
                return;
            }
        };
        // A template without detectable placeholders still needs columns
        let headers = if skeleton.headers.is_empty() {
            match self.pipeline.table_columns(&skeleton.template).await {
                Ok(columns) => columns,
                Err(e) => {
                    print_error("table columns", &e);
                    return;
                }
            }
        } else {
            skeleton.headers.clone()
        };

        println!();
        println!("{}", skeleton.template);
        println!();
        println!("Columns: {}", headers.join(" | ").bold());
        println!("Enter example rows as | separated values, empty line to finish.");

        let mut rows = Vec::new();
        loop {
            let line = match rl.readline("| ") {
                Ok(line) => line,
                Err(_) => break,
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            let cells: Vec<String> = trimmed
                .trim_matches('|')
                .split('|')
                .map(|c| c.trim().to_string())
                .collect();
            if cells.len() != headers.len() {
                println!("{} Expected {} values, got {}.", "?".yellow(), headers.len(), cells.len());
                continue;
            }
            rows.push(cells);
        }

        let skeleton = crate::domain::OutlineSkeleton {
            template: skeleton.template,
            headers,
        };
        match self.pipeline.complete_outline(&mut self.session, id, &skeleton, &rows) {
            Ok(()) => {
                self.save_quietly();
                self.print_scenarios();
            }
            Err(e) => print_error("outline", &e),
        }
    }

    fn cmd_export(&mut self, fmt: Option<&&str>, path: Option<&&str>) {
        let Some(format) = fmt.and_then(|f| ExportFormat::parse(f)) else {
            println!("Usage: /export <wiki|md|html> [file]");
            return;
        };
        let document = export::assemble(format, &self.session);
        match path {
            Some(file) => match std::fs::write(file, &document) {
                Ok(()) => println!("Exported to {}.", file.bold()),
                Err(e) => println!("{} {}", "Export failed:".red(), e),
            },
            None => {
                let default = PathBuf::from(format!("{}.{}", self.session.id, format.extension()));
                match std::fs::write(&default, &document) {
                    Ok(()) => println!("Exported to {}.", default.display().to_string().bold()),
                    Err(e) => println!("{} {}", "Export failed:".red(), e),
                }
            }
        }
    }

    fn save_quietly(&self) {
        if let Err(e) = self.repository.save(&self.session) {
            tracing::warn!(error = %e, "Wizard::save_quietly: save failed");
        }
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "StoryForge".bright_cyan().bold());
        println!("Story: {}", self.session.original_story.title.bold());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    fn print_open_question(&self) {
        let open = self
            .session
            .scenario_focus
            .as_ref()
            .and_then(|f| f.conversation.open_question())
            .or_else(|| self.session.conversation.open_question());
        if let Some((persona, question)) = open {
            println!();
            println!("{} {}", format!("[{}]", persona.name()).bright_blue().bold(), question);
        }
    }

    fn print_scenarios(&self) {
        println!();
        println!("{}", "Scenarios:".bright_cyan());
        for scenario in &self.session.scenarios {
            let mark = if scenario.completed { "x".bright_green() } else { " ".normal() };
            println!("  [{}] {}. {}", mark, scenario.id, scenario.title);
        }
    }

    fn print_status(&self) {
        println!();
        println!("{}", "Session status:".bright_cyan());
        println!("  Story: {}", self.session.original_story.title);
        println!("  Phase: {:?}", self.session.phase);
        println!(
            "  Personas: {}",
            self.session.active_personas.iter().map(|p| p.name()).collect::<Vec<_>>().join(", ")
        );
        println!("  Answered turns: {}", self.session.conversation.answered_count());
        if let Some(analysis) = &self.session.complexity {
            println!("  Complexity: {}", analysis.complexity);
        }
        for kind in ArtifactKind::ALL {
            if self.session.artifacts.value(kind).is_some() {
                println!("  Artifact ready: {}", kind.name());
            }
        }
        if !self.session.scenarios.is_empty() {
            let done = self.session.scenarios.iter().filter(|s| s.completed).count();
            println!("  Scenarios: {}/{} completed", done, self.session.scenarios.len());
        }
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:18} Skip the open question", "/skip".yellow());
        println!("  {:18} Request a story rewrite", "/suggest".yellow());
        println!("  {:18} Accept the suggested rewrite", "/accept".yellow());
        println!("  {:18} Discard the suggested rewrite", "/discard".yellow());
        println!("  {:18} Check which personas are satisfied", "/satisfied".yellow());
        println!("  {:18} Analyze story complexity", "/complexity".yellow());
        println!("  {:18} Split into the suggested stories", "/split [n]".yellow());
        println!("  {:18} Derive test scenarios", "/tests".yellow());
        println!("  {:18} Derive the PO checklist", "/checklist".yellow());
        println!("  {:18} Derive an HTML prototype", "/prototype".yellow());
        println!("  {:18} Derive step definitions", "/steps <tech>".yellow());
        println!("  {:18} List or generate BDD scenarios", "/scenarios".yellow());
        println!("  {:18} Focus scenarios for questions", "/focus <ids>".yellow());
        println!("  {:18} Generate gherkin", "/gherkin [ids]".yellow());
        println!("  {:18} Build a scenario outline", "/outline <id>".yellow());
        println!("  {:18} Show session status", "/status".yellow());
        println!("  {:18} Save the session", "/save".yellow());
        println!("  {:18} Export the session", "/export <fmt>".yellow());
        println!("  {:18} Exit", "/quit".yellow());
        println!();
    }
}

fn print_error(operation: &str, error: &crate::planning::EngineError) {
    println!("{} {} failed: {}", "!".red(), operation, error);
}

fn parse_persona_list(input: &str) -> Result<Vec<Persona>, String> {
    let mut personas = Vec::new();
    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match Persona::parse(part) {
            Some(p) if p.asks_questions() => {
                if !personas.contains(&p) {
                    personas.push(p);
                }
            }
            _ => return Err(part.to_string()),
        }
    }
    if personas.is_empty() {
        return Err(input.to_string());
    }
    Ok(personas)
}

fn parse_id_list(args: &[&str]) -> Vec<u64> {
    args.iter().filter_map(|a| a.trim().parse::<u64>().ok()).collect()
}
