use std::collections::{BTreeMap, BTreeSet};

use dialoguer::{Confirm, Input, MultiSelect, Select};
use strsim::jaro_winkler;

use crate::catalog::FoodCatalog;
use crate::error::{PlannerError, Result};
use crate::models::{ConstraintMode, Food, Macro, MacroConstraint, Priority};
use crate::planner::request::{IngredientRequest, MealRequest, RatioRequest};
use crate::planner::Regime;

/// What the user picked from the edit menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// The request changed and should be re-solved.
    Changed,
    Unchanged,
    Save,
    Quit,
}

const MENU: [&str; 14] = [
    "Calorie target",
    "Ingredient bounds",
    "Enable / disable ingredient",
    "Add ingredient",
    "Remove ingredient",
    "Priorities",
    "Macro ratio",
    "Macro constraints",
    "Optimized micronutrients",
    "Pinned intake",
    "Upper limits",
    "Regime",
    "Save request",
    "Quit",
];

const MODES: [(ConstraintMode, &str); 4] = [
    (ConstraintMode::AtLeast, "at least"),
    (ConstraintMode::AtMost, "at most"),
    (ConstraintMode::Exactly, "exactly"),
    (ConstraintMode::Unconstrained, "unconstrained"),
];

fn parse_number(input: &str) -> Result<f64> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| PlannerError::InvalidInput(format!("Invalid number: {}", input.trim())))?;
    if !value.is_finite() || value < 0.0 {
        return Err(PlannerError::InvalidInput(format!(
            "Expected a non-negative number, got {}",
            value
        )));
    }
    Ok(value)
}

/// Prompt for a non-negative number with a default.
pub fn prompt_number(prompt: &str, default: f64) -> Result<f64> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .default(format!("{}", default))
        .interact_text()?;
    parse_number(&input)
}

/// Prompt for yes/no confirmation.
pub fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

/// Foods whose name or id resembles `input`, best first.
pub fn match_foods<'a>(input: &str, foods: &[&'a Food]) -> Vec<(&'a Food, f64)> {
    let input = input.to_lowercase();
    let mut candidates: Vec<(&Food, f64)> = foods
        .iter()
        .map(|f| {
            let score = jaro_winkler(&f.name.to_lowercase(), &input)
                .max(jaro_winkler(&f.id.to_lowercase(), &input));
            (*f, score)
        })
        .filter(|(_, score)| *score > 0.7)
        .collect();
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates
}

/// Prompt for a food from the catalog with fuzzy matching.
pub fn prompt_food(catalog: &FoodCatalog) -> Result<Option<Food>> {
    let foods = catalog.all_foods();
    loop {
        let input: String = Input::new()
            .with_prompt("Food name or id (Enter to cancel)")
            .allow_empty(true)
            .interact_text()?;
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        if let Some(food) = catalog.get(input).or_else(|| {
            foods
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(input))
                .copied()
        }) {
            return Ok(Some(food.clone()));
        }

        let candidates = match_foods(input, &foods);
        match candidates.as_slice() {
            [] => println!("No matching food found for '{}'", input),
            [(food, _)] => {
                if prompt_yes_no(&format!("Did you mean '{}'?", food.name), true)? {
                    return Ok(Some((*food).clone()));
                }
            }
            _ => {
                let mut options: Vec<String> = candidates
                    .iter()
                    .take(5)
                    .map(|(f, _)| f.name.clone())
                    .collect();
                let shown = options.len();
                options.push("None of these".to_string());

                let selection = Select::new()
                    .with_prompt("Which did you mean?")
                    .items(&options)
                    .default(0)
                    .interact()?;
                if selection < shown {
                    return Ok(Some(candidates[selection].0.clone()));
                }
            }
        }
    }
}

fn select_ingredient(request: &MealRequest, prompt: &str) -> Result<Option<usize>> {
    if request.ingredients.is_empty() {
        println!("The request has no ingredients.");
        return Ok(None);
    }
    let items: Vec<String> = request
        .ingredients
        .iter()
        .map(|i| {
            format!(
                "{} [{:.0}-{:.0} g]{}",
                i.food,
                i.min_grams,
                i.max_grams,
                if i.enabled { "" } else { " (disabled)" }
            )
        })
        .collect();
    let selection = Select::new()
        .with_prompt(prompt)
        .items(&items)
        .default(0)
        .interact_opt()?;
    Ok(selection)
}

/// Pick tiers in order, most important first.
fn prompt_priorities() -> Result<Vec<Priority>> {
    let all = [
        Priority::Micronutrients,
        Priority::MacroRatio,
        Priority::Diversity,
        Priority::TotalMass,
    ];
    let mut chosen = Vec::new();
    loop {
        let remaining: Vec<Priority> = all.iter().copied().filter(|p| !chosen.contains(p)).collect();
        if remaining.is_empty() {
            break;
        }
        let mut items: Vec<&str> = remaining.iter().map(|p| p.label()).collect();
        items.push("(done)");
        let selection = Select::new()
            .with_prompt(format!("Priority #{}", chosen.len() + 1))
            .items(&items)
            .default(0)
            .interact()?;
        if selection >= remaining.len() {
            break;
        }
        chosen.push(remaining[selection]);
    }
    Ok(chosen)
}

/// Replace the constraint on `c.nutrient`; an unconstrained mode just removes it.
fn set_macro_constraint(constraints: &mut Vec<MacroConstraint>, c: MacroConstraint) {
    constraints.retain(|existing| existing.nutrient != c.nutrient);
    if c.is_active() {
        constraints.push(c);
    }
}

/// Store a positive amount under `key`, or drop the key for zero.
fn set_amount(amounts: &mut BTreeMap<String, f64>, key: &str, amount: f64) {
    if amount > 0.0 {
        amounts.insert(key.to_string(), amount);
    } else {
        amounts.remove(key);
    }
}

/// Micronutrient keys the catalog reports plus any the request already names.
fn micro_choices(request: &MealRequest, catalog: &FoodCatalog) -> Vec<String> {
    let mut keys: BTreeSet<String> = catalog.micro_keys();
    keys.extend(request.optimize_micros.iter().map(|k| k.to_lowercase()));
    keys.extend(request.pinned.micros.keys().map(|k| k.to_lowercase()));
    keys.extend(request.upper_limits.keys().map(|k| k.to_lowercase()));
    keys.into_iter().collect()
}

fn select_micro(keys: &[String], prompt: &str) -> Result<Option<String>> {
    if keys.is_empty() {
        println!("No micronutrients known.");
        return Ok(None);
    }
    let selection = Select::new()
        .with_prompt(prompt)
        .items(keys)
        .default(0)
        .interact_opt()?;
    Ok(selection.map(|i| keys[i].clone()))
}

fn edit_macro_constraint(request: &mut MealRequest) -> Result<EditAction> {
    let labels: Vec<&str> = Macro::ALL.iter().map(|m| m.label()).collect();
    let Some(idx) = Select::new()
        .with_prompt("Macro")
        .items(&labels)
        .default(0)
        .interact_opt()?
    else {
        return Ok(EditAction::Unchanged);
    };
    let nutrient = Macro::ALL[idx];
    let current = request
        .macro_constraints
        .iter()
        .find(|c| c.nutrient == nutrient)
        .copied();

    let mode_labels: Vec<&str> = MODES.iter().map(|(_, label)| *label).collect();
    let default_mode = current
        .and_then(|c| MODES.iter().position(|(mode, _)| *mode == c.mode))
        .unwrap_or(0);
    let mode = MODES[Select::new()
        .with_prompt("Mode")
        .items(&mode_labels)
        .default(default_mode)
        .interact()?]
    .0;

    let constraint = if mode == ConstraintMode::Unconstrained {
        MacroConstraint {
            nutrient,
            mode,
            grams: 0.0,
            hard: false,
        }
    } else {
        MacroConstraint {
            nutrient,
            mode,
            grams: prompt_number("Grams", current.map_or(0.0, |c| c.grams))?,
            hard: prompt_yes_no("Hard constraint?", current.is_some_and(|c| c.hard))?,
        }
    };
    set_macro_constraint(&mut request.macro_constraints, constraint);
    Ok(EditAction::Changed)
}

fn edit_optimized_micros(request: &mut MealRequest, catalog: &FoodCatalog) -> Result<EditAction> {
    let keys = micro_choices(request, catalog);
    if keys.is_empty() {
        println!("No micronutrients known.");
        return Ok(EditAction::Unchanged);
    }
    let current: BTreeSet<String> = request.optimize_micros.iter().map(|k| k.to_lowercase()).collect();
    let defaults: Vec<bool> = keys.iter().map(|k| current.contains(k)).collect();
    let picked = MultiSelect::new()
        .with_prompt("Micronutrients to optimize (space to toggle)")
        .items(&keys)
        .defaults(&defaults)
        .interact()?;
    request.optimize_micros = picked.into_iter().map(|i| keys[i].clone()).collect();
    Ok(EditAction::Changed)
}

fn edit_pinned(request: &mut MealRequest, catalog: &FoodCatalog) -> Result<EditAction> {
    if prompt_yes_no("Edit pinned macros?", true)? {
        let macros = &mut request.pinned.macros;
        macros.calories = prompt_number("Pinned calories (kcal)", macros.calories)?;
        macros.protein = prompt_number("Pinned protein (g)", macros.protein)?;
        macros.fat = prompt_number("Pinned fat (g)", macros.fat)?;
        macros.carbs = prompt_number("Pinned carbs (g)", macros.carbs)?;
        macros.fiber = prompt_number("Pinned fiber (g)", macros.fiber)?;
    }
    let keys = micro_choices(request, catalog);
    while let Some(key) = select_micro(&keys, "Pinned micronutrient (Esc when done)")? {
        let current = request.pinned.micros.get(&key).copied().unwrap_or(0.0);
        let amount = prompt_number(&format!("Pinned {} (0 clears)", key), current)?;
        set_amount(&mut request.pinned.micros, &key, amount);
    }
    Ok(EditAction::Changed)
}

fn edit_upper_limits(request: &mut MealRequest, catalog: &FoodCatalog) -> Result<EditAction> {
    request.hard_upper_limits =
        prompt_yes_no("Cap every reference upper limit?", request.hard_upper_limits)?;
    let keys = micro_choices(request, catalog);
    while let Some(key) = select_micro(&keys, "Per-nutrient cap (Esc when done)")? {
        if prompt_yes_no(&format!("Cap {}?", key), true)? {
            let current = request.upper_limits.get(&key).copied().unwrap_or(0.0);
            let limit = prompt_number(&format!("{} daily cap", key), current)?;
            request.upper_limits.insert(key, limit);
        } else {
            request.upper_limits.remove(&key);
        }
    }
    Ok(EditAction::Changed)
}

/// Show the edit menu once and apply the chosen change to `request`.
pub fn edit_request(request: &mut MealRequest, catalog: &FoodCatalog) -> Result<EditAction> {
    let choice = Select::new()
        .with_prompt("Edit")
        .items(&MENU)
        .default(0)
        .interact()?;

    match choice {
        0 => {
            request.calories.target = prompt_number("Calorie target (kcal)", request.calories.target)?;
            request.calories.tolerance =
                prompt_number("Tolerance (+/- kcal)", request.calories.tolerance)?;
            Ok(EditAction::Changed)
        }
        1 => {
            let Some(idx) = select_ingredient(request, "Ingredient")? else {
                return Ok(EditAction::Unchanged);
            };
            let ing = &mut request.ingredients[idx];
            ing.min_grams = prompt_number("Minimum grams", ing.min_grams)?;
            ing.max_grams = prompt_number("Maximum grams", ing.max_grams)?;
            Ok(EditAction::Changed)
        }
        2 => {
            let Some(idx) = select_ingredient(request, "Toggle")? else {
                return Ok(EditAction::Unchanged);
            };
            let ing = &mut request.ingredients[idx];
            ing.enabled = !ing.enabled;
            println!("{} {}", ing.food, if ing.enabled { "enabled" } else { "disabled" });
            Ok(EditAction::Changed)
        }
        3 => {
            let Some(food) = prompt_food(catalog)? else {
                return Ok(EditAction::Unchanged);
            };
            let max_grams = prompt_number("Maximum grams", 300.0)?;
            println!("Added: {}", food.name);
            request.ingredients.push(IngredientRequest {
                food: food.id,
                min_grams: 0.0,
                max_grams,
                enabled: true,
            });
            Ok(EditAction::Changed)
        }
        4 => {
            let Some(idx) = select_ingredient(request, "Remove")? else {
                return Ok(EditAction::Unchanged);
            };
            let removed = request.ingredients.remove(idx);
            println!("Removed: {}", removed.food);
            Ok(EditAction::Changed)
        }
        5 => {
            request.priorities = prompt_priorities()?;
            Ok(EditAction::Changed)
        }
        6 => {
            if !prompt_yes_no("Optimize a calorie ratio?", request.macro_ratio.is_some())? {
                request.macro_ratio = None;
                return Ok(EditAction::Changed);
            }
            let current = request.macro_ratio.unwrap_or(RatioRequest {
                carbs: 50.0,
                protein: 25.0,
                fat: 25.0,
            });
            request.macro_ratio = Some(RatioRequest {
                carbs: prompt_number("Carbs % of calories", current.carbs)?,
                protein: prompt_number("Protein % of calories", current.protein)?,
                fat: prompt_number("Fat % of calories", current.fat)?,
            });
            Ok(EditAction::Changed)
        }
        7 => edit_macro_constraint(request),
        8 => edit_optimized_micros(request, catalog),
        9 => edit_pinned(request, catalog),
        10 => edit_upper_limits(request, catalog),
        11 => {
            let regimes = [Regime::Continuous, Regime::Integer];
            let labels: Vec<String> = regimes.iter().map(|r| r.to_string()).collect();
            let current = regimes
                .iter()
                .position(|r| *r == request.config.regime)
                .unwrap_or(0);
            let selection = Select::new()
                .with_prompt("Regime")
                .items(&labels)
                .default(current)
                .interact()?;
            request.config.regime = regimes[selection];
            Ok(EditAction::Changed)
        }
        12 => Ok(EditAction::Save),
        _ => Ok(EditAction::Quit),
    }
}
