//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::{LinkTarget, Position};

/// Partitioned ordered tree store for navigation menus
#[derive(Parser, Debug)]
#[command(name = "menutree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Snapshot file (default: store_path from settings)
    #[arg(short, long, global = true, env = "MENUTREE_STORE", value_hint = ValueHint::FilePath)]
    pub store: Option<PathBuf>,

    /// Additional config file, layered over the global one
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage menus
    Menu {
        #[command(subcommand)]
        command: MenuCommands,
    },

    /// Manage menu items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Show a menu as a tree
    Show {
        /// Menu identifier
        menu: String,
    },

    /// Report consistency problems of a menu
    Check {
        /// Menu identifier
        menu: String,
    },

    /// Repair depths, child counts and sibling weights of a menu
    Fix {
        /// Menu identifier
        menu: String,
    },

    /// Inspect settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum MenuCommands {
    /// Create an empty menu
    Create {
        /// Unique identifier (up to 16 characters, no spaces)
        identifier: String,
        /// Display name
        name: String,
        /// Optional group label
        #[arg(short, long)]
        group: Option<String>,
    },
    /// List menus
    List,
    /// Delete a menu and all of its items
    Delete {
        /// Menu identifier
        identifier: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Add an item
    Add {
        /// Menu identifier
        menu: String,
        /// Item title
        title: String,
        /// Link URL
        #[arg(short, long, default_value = "")]
        link: String,
        /// Open the link in a new window
        #[arg(long)]
        new_window: bool,
        /// Path of the reference item (default: append at top level)
        #[arg(short, long)]
        at: Option<String>,
        /// Placement relative to the reference item
        #[arg(short, long, value_enum, default_value_t = PositionArg::LastChild)]
        position: PositionArg,
    },
    /// Move an item and its subtree
    Move {
        /// Menu identifier
        menu: String,
        /// Path of the item to move
        path: String,
        /// Path of the reference item
        target: String,
        /// Placement relative to the reference item
        #[arg(short, long, value_enum, default_value_t = PositionArg::LastChild)]
        position: PositionArg,
    },
    /// Delete an item and its subtree
    Delete {
        /// Menu identifier
        menu: String,
        /// Path of the item
        path: String,
    },
    /// Change title, link or target of an item
    Edit {
        /// Menu identifier
        menu: String,
        /// Path of the item
        path: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        link: Option<String>,
        #[arg(long, value_enum)]
        target: Option<TargetArg>,
    },
    /// List the children of an item (top level by default)
    List {
        /// Menu identifier
        menu: String,
        /// Path of the parent item
        #[arg(short, long)]
        parent: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print effective settings
    Show,
    /// Print config and store locations
    Path,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionArg {
    Before,
    After,
    FirstChild,
    LastChild,
}

impl From<PositionArg> for Position {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::Before => Position::Before,
            PositionArg::After => Position::After,
            PositionArg::FirstChild => Position::FirstChild,
            PositionArg::LastChild => Position::LastChild,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetArg {
    Same,
    New,
}

impl From<TargetArg> for LinkTarget {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Same => LinkTarget::SameWindow,
            TargetArg::New => LinkTarget::NewWindow,
        }
    }
}
