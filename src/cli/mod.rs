//! CLI module - Command-line interface for usergate
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// usergate - user credential management service
#[derive(Parser)]
#[command(name = "usergate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web", alias = "daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Manage stored users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List all users
    #[command(alias = "ls")]
    List,

    /// Create a user
    Create {
        /// User name
        name: String,
        /// Password (falls back to $USERGATE_PASSWORD)
        #[arg(long, env = "USERGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Set a new password for a user
    Passwd {
        /// User ID
        id: i32,
        /// New password (falls back to $USERGATE_PASSWORD)
        #[arg(long, env = "USERGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Rename a user
    Rename {
        /// User ID
        id: i32,
        /// New user name
        name: String,
    },

    /// Delete a user
    #[command(alias = "rm")]
    Delete {
        /// User ID
        id: i32,
    },
}

pub use commands::*;
