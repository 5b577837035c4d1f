//! CLI - Command Line Interface for vidshelf
//!
//! Every lookup the view model offers is scriptable. All output is
//! JSON-parseable.
//!
//! # Examples
//!
//! ```bash
//! # Search the catalog
//! vidshelf --feed videos.json search "nature" --json
//!
//! # Browse
//! vidshelf categories
//! vidshelf category "Demo Videos"
//! vidshelf video 3
//!
//! # Record a download
//! vidshelf update 3 video /media/videos/3.mp4
//!
//! # Drive the live pipeline from stdin
//! printf 'query cat\nid 2\nquit\n' | vidshelf watch
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Feed could not be loaded
    FeedError = 3,
    /// Requested record does not exist
    NotFound = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// vidshelf - live video catalog browser
#[derive(Parser, Debug)]
#[command(
    name = "vidshelf",
    version,
    about = "Browse a video catalog through live, query-driven result streams",
    after_help = "EXAMPLES:\n\
                  vidshelf -f videos.json search nature   Search the catalog\n\
                  vidshelf categories                     List categories\n\
                  vidshelf video 3 --json                 Show one video\n\
                  vidshelf watch                          Drive queries from stdin"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Catalog feed URL or file (overrides config and VIDSHELF_FEED)
    #[arg(long, short = 'f', global = true)]
    pub feed: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search videos by title, description, category or studio
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Show a single video
    #[command(visible_alias = "v")]
    Video(VideoCmd),

    /// List videos in a category
    #[command(visible_alias = "cat")]
    Category(CategoryCmd),

    /// List all categories
    Categories,

    /// Update one field of a video
    #[command(visible_alias = "u")]
    Update(UpdateCmd),

    /// Read `query`, `id` and `category` commands from stdin and print live results
    #[command(visible_alias = "w")]
    Watch,
}

/// Search the catalog
#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search text
    #[arg(required = true)]
    pub query: String,

    /// Maximum number of results (defaults to the configured limit)
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

/// Look up a video by id
#[derive(Args, Debug)]
pub struct VideoCmd {
    /// Video id
    pub id: i64,
}

/// Videos in one category
#[derive(Args, Debug)]
pub struct CategoryCmd {
    /// Category name (exact match)
    pub name: String,

    /// Maximum number of results (defaults to the configured limit)
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

/// Write one field of a video
#[derive(Args, Debug)]
pub struct UpdateCmd {
    /// Video id
    pub id: i64,

    /// Field kind: video, background, card, rental or status
    pub kind: String,

    /// New value (local path or status text; not used by `rental`)
    pub value: Option<String>,
}

// =============================================================================
// Watch Input
// =============================================================================

/// One line of `watch` input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchInput {
    Query(String),
    Id(i64),
    Category(String),
    Quit,
}

impl WatchInput {
    /// Parse `query <text>`, `id <n>`, `category <name>` or `quit`
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match verb.to_lowercase().as_str() {
            "query" | "q" => Ok(WatchInput::Query(rest.to_string())),
            "id" | "i" => rest
                .parse()
                .map(WatchInput::Id)
                .map_err(|_| format!("Invalid video id: {:?}", rest)),
            "category" | "c" if !rest.is_empty() => Ok(WatchInput::Category(rest.to_string())),
            "category" | "c" => Err("Category name required".to_string()),
            "quit" | "exit" => Ok(WatchInput::Quit),
            "" => Err("Empty command".to_string()),
            other => Err(format!("Unknown command: {}", other)),
        }
    }
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print human-readable lines, or the JSON form of `data` in JSON mode
    pub fn print_lines<T, I>(&self, data: &T, lines: I) -> anyhow::Result<()>
    where
        T: Serialize,
        I: IntoIterator,
        I::Item: std::fmt::Display,
    {
        if self.json {
            self.print(data)
        } else {
            for line in lines {
                println!("{}", line);
            }
            Ok(())
        }
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
