use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::record::Rating;

#[derive(Debug, Parser)]
#[command(
    name = "filmshelf",
    about = "Keep a small movie catalog in a JSON or CSV file"
)]
pub struct Cli {
    /// Store file (.json or .csv); overrides FILMSHELF_STORE
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List all movies
    List(ListArgs),
    /// Add a movie
    Add(AddArgs),
    /// Delete a movie, asking to retype its title first
    Delete(DeleteArgs),
    /// Set or clear a movie's rating
    Rate(RateArgs),
    /// Set or clear a movie's notes
    Note(NoteArgs),
    /// Find a movie by (part of) its title
    Search(SearchArgs),
    /// Show rating statistics
    Stats,
    /// Pick a random movie
    Random,
    /// List movies matching rating and year criteria
    Filter(FilterArgs),
    /// Add missing columns to a CSV store
    Migrate,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

fn parse_rating(text: &str) -> Result<Rating, String> {
    Rating::parse_lenient(text).ok_or_else(|| {
        format!("'{text}' is not a number between 0.0 and 10.0")
    })
}

// -- List --

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    Rating,
    Year,
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Order the listing
    #[arg(long, value_enum)]
    pub sort: Option<SortKey>,

    /// With --sort year, show the latest movies first
    #[arg(long)]
    pub latest_first: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Add --

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Movie title
    pub title: String,

    /// Release year as shown, e.g. 1997 or 2015–2019
    #[arg(long, default_value = "")]
    pub year: String,

    /// Rating between 0.0 and 10.0
    #[arg(long, value_parser = parse_rating)]
    pub rating: Option<Rating>,

    /// Poster URL
    #[arg(long)]
    pub poster: Option<String>,

    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,

    /// External identifier, e.g. an IMDb id
    #[arg(long)]
    pub external_id: Option<String>,
}

// -- Delete --

#[derive(Debug, Parser)]
pub struct DeleteArgs {
    /// Title or part of a title
    pub query: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

// -- Rate --

#[derive(Debug, Parser)]
pub struct RateArgs {
    /// Title or part of a title
    pub query: String,

    /// New rating; omit to clear
    #[arg(value_parser = parse_rating)]
    pub rating: Option<Rating>,
}

// -- Note --

#[derive(Debug, Parser)]
pub struct NoteArgs {
    /// Title or part of a title
    pub query: String,

    /// New notes; omit or leave blank to clear
    pub text: Option<String>,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Title or part of a title
    pub query: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Filter --

#[derive(Debug, Parser)]
pub struct FilterArgs {
    /// Minimum rating
    #[arg(long)]
    pub min_rating: Option<f64>,

    /// First year to include
    #[arg(long)]
    pub from: Option<u16>,

    /// Last year to include
    #[arg(long)]
    pub to: Option<u16>,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "filmshelf",
            &mut std::io::stdout(),
        );
    }
}
