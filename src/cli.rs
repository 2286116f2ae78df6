use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::catalog::Sex;
use crate::planner::Regime;

/// MealSolver: sizes ingredient portions to hit calorie, macro and micronutrient goals.
#[derive(Parser, Debug)]
#[command(name = "meal_solver")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the food catalog JSON file.
    #[arg(long, global = true, default_value = "data/foods.json")]
    pub foods: PathBuf,

    /// Path to the reference intake CSV file.
    #[arg(long, global = true, default_value = "data/references.csv")]
    pub references: PathBuf,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Solve a meal request and print the portions.
    Solve {
        /// Meal request JSON file.
        request: PathBuf,

        /// Print the solution as JSON instead of tables.
        #[arg(long)]
        json: bool,

        /// Override the numeric regime from the request.
        #[arg(long, value_enum)]
        regime: Option<Regime>,

        /// Override the solve time budget, in milliseconds.
        #[arg(long)]
        time_budget_ms: Option<u64>,
    },

    /// Edit a meal request interactively, re-solving after each change.
    Interactive {
        /// Meal request JSON file to start from.
        request: PathBuf,
    },

    /// List reference intakes for a demographic.
    Nutrients {
        #[arg(long, value_enum)]
        sex: Sex,

        /// Age band as written in the reference table, e.g. `19-30`.
        #[arg(long)]
        age_band: String,
    },

    /// List the foods in the catalog.
    Foods {
        /// Rewrite the catalog file de-duplicated and sorted by id.
        #[arg(long)]
        normalize: bool,
    },
}
