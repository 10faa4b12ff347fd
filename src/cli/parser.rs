//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mexar Engine: compile documents into a queryable, cited knowledge base.
#[derive(Parser, Debug)]
#[command(name = "mexar-engine")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the `SQLite` database file.
    #[arg(short, long, env = "MEXAR_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the database schema.
    Init,

    /// Show engine-wide status (agent/chunk/job counts, schema version).
    Status,

    /// Create a new agent.
    #[command(name = "create")]
    CreateAgent {
        /// Agent name (normalized: trimmed, lowercased, spaces to underscores).
        name: String,

        /// Tenant owning this agent.
        #[arg(short, long, default_value = "default")]
        tenant: String,

        /// System prompt. Reads from stdin if omitted.
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// List agents for a tenant.
    #[command(name = "list", alias = "ls")]
    ListAgents {
        /// Tenant to list.
        #[arg(short, long, default_value = "default")]
        tenant: String,
    },

    /// Show one agent's details.
    #[command(name = "show")]
    ShowAgent {
        /// Agent name.
        name: String,

        /// Tenant owning the agent.
        #[arg(short, long, default_value = "default")]
        tenant: String,
    },

    /// Delete an agent and its compiled knowledge base.
    #[command(name = "delete", alias = "rm")]
    DeleteAgent {
        /// Agent name.
        name: String,

        /// Tenant owning the agent.
        #[arg(short, long, default_value = "default")]
        tenant: String,

        /// Skip confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Compile an agent's knowledge base from source files.
    Compile {
        /// Agent name.
        name: String,

        /// Tenant owning the agent.
        #[arg(short, long, default_value = "default")]
        tenant: String,

        /// Source files to parse and index (csv, json, txt, pdf, docx).
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ask a question against a compiled agent.
    Query {
        /// Agent name.
        name: String,

        /// Tenant owning the agent.
        #[arg(short, long, default_value = "default")]
        tenant: String,

        /// The question to ask.
        question: String,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| PathBuf::from(crate::store::DEFAULT_DB_PATH))
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_db_path() {
        let cli = Cli { db_path: None, verbose: false, format: "text".to_string(), command: Commands::Status };
        assert_eq!(cli.get_db_path(), PathBuf::from(crate::store::DEFAULT_DB_PATH));
    }

    #[test]
    fn test_custom_db_path() {
        let cli = Cli {
            db_path: Some(PathBuf::from("/custom/path.db")),
            verbose: false,
            format: "text".to_string(),
            command: Commands::Status,
        };
        assert_eq!(cli.get_db_path(), PathBuf::from("/custom/path.db"));
    }
}
