// src/cli.rs
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage favorite exercises, training preferences and mesocycle blocks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Print lists as CSV instead of tables
    #[arg(long, global = true)]
    pub export_csv: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoryCli {
    Gym,
    /// Alias kept for older exports
    Strength,
    Bodyweight,
    Flexibility,
    Cardio,
    Custom,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntensityCli {
    Low,
    Moderate,
    High,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaletteCli {
    Default,
    Pink,
}

/// Fields shared by `add` and `edit`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ExerciseArgs {
    /// Category of the exercise
    #[arg(short, long, value_enum)]
    pub category: Option<CategoryCli>,
    /// Name of the custom category (required with --category custom)
    #[arg(long)]
    pub custom_category: Option<String>,
    /// Comma-separated main movers (gym/bodyweight), e.g. "chest,triceps"
    #[arg(short, long)]
    pub primary: Option<String>,
    /// Comma-separated assisting muscles (gym/bodyweight)
    #[arg(short, long)]
    pub secondary: Option<String>,
    /// Comma-separated muscles or areas (flexibility/cardio/custom)
    #[arg(short, long)]
    pub muscles: Option<String>,
    /// Instruction steps separated by '|' or newlines
    #[arg(short, long)]
    pub instructions: Option<String>,
    /// Additional notes
    #[arg(short, long)]
    pub notes: Option<String>,
    /// Comma-separated alternative exercises
    #[arg(long)]
    pub alternatives: Option<String>,
    /// Estimated calories burned
    #[arg(long)]
    pub calories: Option<u32>,
    /// Free-text duration (e.g. "3 x 45 seconds")
    #[arg(short, long)]
    pub duration: Option<String>,
    #[arg(long, value_enum)]
    pub intensity: Option<IntensityCli>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add an exercise to favorites
    Add {
        /// Name of the exercise (e.g., "Romanian Deadlift")
        name: String,
        #[command(flatten)]
        fields: ExerciseArgs,
    },
    /// Edit a favorite exercise (fields not given keep their value)
    Edit {
        /// ID or name of the favorite
        identifier: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: ExerciseArgs,
    },
    /// Remove one or more favorites
    Remove {
        /// IDs or names of the favorites
        #[arg(required = true)]
        identifiers: Vec<String>,
    },
    /// List favorite exercises
    List {
        #[arg(short, long, value_enum)]
        category: Option<CategoryCli>,
        /// Filter by muscle or area
        #[arg(short, long)]
        muscle: Option<String>,
        /// Filter by part of the name
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show exercise detail
    Show {
        /// ID or name of a favorite
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        identifier: Option<String>,
        /// Show an exercise from a JSON file instead of the favorites list
        #[arg(long)]
        file: Option<PathBuf>,
        /// Add to / remove from favorites after showing
        #[arg(long)]
        toggle: bool,
    },
    /// Import an exercise from JSON (file, argument, or stdin when neither is given)
    Import {
        /// A .json or .txt file containing the exercise
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
        /// The JSON text itself
        #[arg(short, long)]
        text: Option<String>,
    },
    /// Export all favorites to a JSON file
    Export {
        /// Destination file
        path: PathBuf,
    },
    /// Fill in the equipment & preferences questionnaire
    Questionnaire,
    /// Saved questionnaire answers
    Preferences {
        #[command(subcommand)]
        action: PreferencesAction,
    },
    /// Show a program's mesocycles, routines and blocks with progress
    Program {
        /// Program JSON file (defaults to the configured program)
        #[arg(long)]
        program: Option<PathBuf>,
    },
    /// Work with the blocks of a routine
    Block {
        #[command(subcommand)]
        action: BlockAction,
        /// Program JSON file (defaults to the configured program)
        #[arg(long, global = true)]
        program: Option<PathBuf>,
    },
    /// Mark a workout day done / not done for a week
    ToggleDay {
        /// Routine ID or name
        routine: String,
        /// Block position (1-based) or name
        block: String,
        /// Week number (1-based)
        week: u32,
        /// Day name
        day: String,
        /// Program JSON file (defaults to the configured program)
        #[arg(long)]
        program: Option<PathBuf>,
    },
    /// Set the program file used when --program is not given
    SetProgram {
        /// Program JSON file; omit to clear
        path: Option<PathBuf>,
    },
    /// Switch the color palette
    SetTheme {
        #[arg(value_enum)]
        palette: PaletteCli,
    },
    /// Set the table header color (e.g. Green, DarkCyan)
    SetHeaderColor { color: String },
    /// Show the path to the store file
    StorePath,
    /// Show the path to the config file
    ConfigPath,
    /// Generate shell completion scripts
    GenerateCompletion {
        /// The shell to generate the script for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum PreferencesAction {
    /// Print the saved answers
    Show,
    /// Delete the saved answers
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum BlockAction {
    /// Show the days of one week of a block
    Show {
        /// Routine ID or name
        routine: String,
        /// Block position (1-based) or name; defaults to the active block
        block: Option<String>,
        /// Week number (1-based)
        #[arg(short, long, default_value_t = 1)]
        week: u32,
    },
    /// Make a block the active one for its routine
    Activate {
        /// Routine ID or name
        routine: String,
        /// Block position (1-based) or name
        block: String,
    },
    /// Clear all completed days of a block
    Reset {
        /// Routine ID or name
        routine: String,
        /// Block position (1-based) or name
        block: String,
    },
}

/// Splits a comma-separated list, dropping blanks.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Turns "step one | step two" into newline-delimited steps.
pub fn split_steps(input: &str) -> String {
    input
        .split(['|', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_split_list_trims_and_drops_blanks() {
        assert_eq!(split_list(" chest, ,triceps ,"), vec!["chest", "triceps"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_split_steps() {
        assert_eq!(split_steps("Hinge | Lift\nLower |"), "Hinge\nLift\nLower");
    }

    #[test]
    fn test_add_parses_flattened_fields() {
        let cli = Cli::try_parse_from([
            "fitness-planner",
            "add",
            "Deadlift",
            "--category",
            "gym",
            "--primary",
            "hamstrings,glutes",
        ])
        .unwrap();
        match cli.command {
            Commands::Add { name, fields } => {
                assert_eq!(name, "Deadlift");
                assert_eq!(fields.category, Some(CategoryCli::Gym));
                assert_eq!(fields.primary.as_deref(), Some("hamstrings,glutes"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_show_requires_identifier_or_file() {
        assert!(Cli::try_parse_from(["fitness-planner", "show"]).is_err());
        assert!(Cli::try_parse_from(["fitness-planner", "show", "--file", "x.json"]).is_ok());
    }
}
