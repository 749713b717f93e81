//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use compendium::config::AuthStrategy;

/// Compendium - fetch monsters and search results from the D&D Insider Compendium
#[derive(Parser, Debug)]
#[command(name = "compendium")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Account email (prompted for when a login is needed)
    #[arg(long, env = "COMPENDIUM_EMAIL", global = true)]
    pub email: Option<String>,

    /// Account password (prompted for when a login is needed)
    #[arg(long, env = "COMPENDIUM_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// How to log in
    #[arg(long, value_enum, global = true)]
    pub strategy: Option<AuthStrategy>,

    /// Config file (defaults to <config dir>/compendium/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More output (-v progress, -vv every request)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session
    Login,

    /// Show whether the stored session is still usable
    Status,

    /// Fetch a monster's stat block by id
    Monster {
        /// Monster id
        id: i32,

        /// Keep the page as served (don't rewrite stylesheet links)
        #[arg(long)]
        raw: bool,

        /// Write the page to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Open the page in the default browser
        #[arg(long)]
        open: bool,
    },

    /// Search monsters by keyword
    Search {
        /// Keywords to search for
        #[arg(required = true, trailing_var_arg = true)]
        keywords: Vec<String>,
    },

    /// Print the combined stylesheet used by stat blocks
    Css {
        /// Write the stylesheet to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Forget the stored session
    Logout,
}
