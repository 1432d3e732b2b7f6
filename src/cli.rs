//! Command-line interface for jailbind
//!
//! Uses clap with derive for type-safe CLI parsing

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// jailbind - create, query, and remove FreeBSD jails
#[derive(Parser)]
#[command(name = "jailbind")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create a jail and run a command inside it
    Create {
        /// Jail root directory
        #[arg(short, long)]
        path: Option<String>,

        /// Jail name
        #[arg(short, long)]
        name: Option<String>,

        /// Hostname inside the jail
        #[arg(long)]
        hostname: Option<String>,

        /// IPv4 address for the jail
        #[arg(long)]
        ip4: Option<String>,

        /// chdir to the jail root after creation
        #[arg(long)]
        chdir: bool,

        /// Command to run inside the new jail (defaults to printing the JID)
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Remove a jail
    Remove {
        /// Jail name or JID
        jail: String,
    },

    /// Attach to a jail and execute a command
    Attach {
        /// Jail name or JID
        jail: String,

        /// Command to execute
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Print the JID of a named jail
    Id {
        /// Jail name
        name: String,
    },

    /// Print the name of a jail
    Name {
        /// Jail ID
        jid: i32,
    },

    /// Read jail parameters
    Get {
        /// Jail name or JID
        jail: String,

        /// Parameters to read
        #[arg(required = true)]
        params: Vec<String>,

        /// Include dying jails
        #[arg(long)]
        dying: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set jail parameters (name=value)
    Set {
        /// Jail name or JID
        jail: String,

        /// Parameter assignments; a bare name sets a boolean flag
        #[arg(required = true)]
        params: Vec<String>,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Generate shell completion scripts
    pub fn generate_completion(shell: Shell) {
        let mut cmd = Self::command();
        clap_complete::generate(shell, &mut cmd, "jailbind", &mut std::io::stdout());
    }
}
