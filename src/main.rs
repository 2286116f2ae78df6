use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use meal_solver_rs::catalog::{
    load_foods, save_foods, Demographic, FoodCatalog, ReferenceTables, Sex,
};
use meal_solver_rs::cli::{Cli, Command};
use meal_solver_rs::error::{PlannerError, Result};
use meal_solver_rs::interface::{
    display_food_list, display_nutrients, display_solution, edit_request, prompt_yes_no,
    EditAction,
};
use meal_solver_rs::logging;
use meal_solver_rs::planner::{solve_meal, MealRequest, Regime, SolveDispatcher};

/// Extra wait on top of the solve budget before the interactive loop gives up.
const DISPATCH_GRACE: Duration = Duration::from_millis(500);

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Solve {
            ref request,
            json,
            regime,
            time_budget_ms,
        } => cmd_solve(&cli, request, json, regime, time_budget_ms),
        Command::Interactive { ref request } => cmd_interactive(&cli, request),
        Command::Nutrients { sex, ref age_band } => cmd_nutrients(&cli, sex, age_band),
        Command::Foods { normalize } => cmd_foods(&cli, normalize),
    }
}

fn load_catalog(path: &Path) -> Result<FoodCatalog> {
    if !path.exists() {
        return Err(PlannerError::InvalidInput(format!(
            "Food catalog not found: {}",
            path.display()
        )));
    }
    let catalog = FoodCatalog::new(load_foods(path)?);
    info!(foods = catalog.len(), path = %path.display(), "catalog loaded");
    Ok(catalog)
}

fn load_request(path: &Path) -> Result<MealRequest> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Solve one request file and print the result.
fn cmd_solve(
    cli: &Cli,
    request_path: &Path,
    json: bool,
    regime: Option<Regime>,
    time_budget_ms: Option<u64>,
) -> Result<()> {
    let catalog = load_catalog(&cli.foods)?;
    let tables = ReferenceTables::load_csv(&cli.references)?;

    let mut request = load_request(request_path)?;
    if let Some(regime) = regime {
        request.config.regime = regime;
    }
    if let Some(ms) = time_budget_ms {
        request.config.time_budget_ms = ms;
    }

    let problem = request.resolve(&catalog, &tables)?;
    let solution = solve_meal(&problem)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&solution)?);
    } else {
        display_solution(&solution);
    }
    Ok(())
}

/// Edit a request in a loop, re-solving in the background after each change.
fn cmd_interactive(cli: &Cli, request_path: &Path) -> Result<()> {
    let catalog = load_catalog(&cli.foods)?;
    let tables = ReferenceTables::load_csv(&cli.references)?;
    let mut request = load_request(request_path)?;
    let dispatcher = SolveDispatcher::spawn()?;

    let mut dirty = false;
    let mut action = EditAction::Changed;
    loop {
        if action == EditAction::Changed {
            match request.resolve(&catalog, &tables) {
                Ok(problem) => {
                    let wait = problem.config.time_budget() + DISPATCH_GRACE;
                    let seq = dispatcher.submit(problem);
                    println!("Solving (request #{})...", seq);
                    match dispatcher.wait_latest(wait) {
                        Some(completed) => match completed.result {
                            Ok(solution) => display_solution(&solution),
                            Err(e) => println!("Error: {}", e),
                        },
                        None => println!("No result within {} ms.", wait.as_millis()),
                    }
                }
                Err(e) => println!("Error: {}", e),
            }
        }

        action = edit_request(&mut request, &catalog)?;
        match action {
            EditAction::Changed => dirty = true,
            EditAction::Unchanged => {}
            EditAction::Save => {
                save_request(request_path, &request)?;
                dirty = false;
            }
            EditAction::Quit => break,
        }
    }

    if dirty && prompt_yes_no("Save the edited request?", true)? {
        save_request(request_path, &request)?;
    }
    Ok(())
}

fn save_request(path: &Path, request: &MealRequest) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(request)?)?;
    println!("Request saved to {}.", path.display());
    Ok(())
}

/// List reference intakes for one demographic.
fn cmd_nutrients(cli: &Cli, sex: Sex, age_band: &str) -> Result<()> {
    let tables = ReferenceTables::load_csv(&cli.references)?;
    let demographic = Demographic {
        sex,
        age_band: age_band.to_string(),
    };
    let references = match tables.lookup(&demographic) {
        Ok(references) => references,
        Err(e) => {
            let known: Vec<String> = tables.demographics().iter().map(|d| d.to_string()).collect();
            eprintln!("Known groups: {}", known.join(", "));
            return Err(e);
        }
    };
    display_nutrients(&demographic.to_string(), references);
    Ok(())
}

/// List the catalog, optionally writing it back normalized.
fn cmd_foods(cli: &Cli, normalize: bool) -> Result<()> {
    let catalog = load_catalog(&cli.foods)?;
    display_food_list(&catalog.all_foods(), "Foods");

    let keys: Vec<String> = catalog.micro_keys().into_iter().collect();
    if !keys.is_empty() {
        println!("Micronutrients reported: {}", keys.join(", "));
    }

    if normalize {
        save_foods(&cli.foods, &catalog.to_foods())?;
        println!("Catalog rewritten: {} foods.", catalog.len());
    }
    Ok(())
}
