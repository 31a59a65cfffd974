//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// StoryForge - LLM-assisted user story and BDD refinement
#[derive(Parser)]
#[command(
    name = "sf",
    about = "Refine user stories and author BDD scenarios with an LLM-driven wizard",
    version,
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a story refinement session
    Story {
        /// Story title
        title: String,

        /// Story description; reads stdin when omitted
        description: Option<String>,

        /// Rewrite the raw input into a well-formed story first
        #[arg(long)]
        refine: bool,
    },

    /// Start a BDD scenario-authoring session
    Bdd {
        /// Feature title
        title: String,

        /// Feature description; reads stdin when omitted
        description: Option<String>,
    },

    /// Extract user stories from a meeting transcript
    Transcript {
        /// Transcript file path
        file: PathBuf,

        /// Also produce the transcript analysis report
        #[arg(long)]
        analyze: bool,
    },

    /// Resume a stored session
    Resume {
        /// Session id (or unique prefix)
        id: String,
    },

    /// Manage stored sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Export a stored session without opening the wizard
    Export {
        /// Session id (or unique prefix)
        id: String,

        /// Output format (wiki, md, html)
        #[arg(short, long, default_value = "md")]
        format: String,

        /// Output file; prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Session management subcommands
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// List stored sessions
    List,

    /// Show one session's state
    Show {
        /// Session id (or unique prefix)
        id: String,
    },

    /// Delete a stored session
    Delete {
        /// Session id (or unique prefix)
        id: String,
    },
}
