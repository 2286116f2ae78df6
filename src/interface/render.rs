use crate::catalog::NutrientReferences;
use crate::models::{Coverage, Food, MicroResult, Solution, SolveStatus};
use crate::planner::constants::{GRAMS_DISPLAY_THRESHOLD, LOW_COVERAGE_PERCENT};

/// Short severity tag shown next to a micronutrient row.
pub fn coverage_marker(coverage: Coverage) -> &'static str {
    match coverage {
        Coverage::Deficient => "[below EAR]",
        Coverage::Low => "[low]",
        Coverage::Met => "",
        Coverage::OverLimit => "[over UL]",
        Coverage::Untargeted => "[no target]",
    }
}

fn percent_cell(micro: &MicroResult) -> String {
    match micro.percent_of_target {
        Some(p) if p < LOW_COVERAGE_PERCENT => format!("{:>5.0}% !", p),
        Some(p) => format!("{:>5.0}%  ", p),
        None => "     -   ".to_string(),
    }
}

/// Display a solved meal: portions, totals, micronutrients and tier values.
pub fn display_solution(solution: &Solution) {
    println!();
    match solution.status {
        SolveStatus::Optimal => println!("=== Meal (optimal, {} regime) ===", solution.regime),
        SolveStatus::Feasible => println!(
            "=== Meal (best found within time budget, {} regime) ===",
            solution.regime
        ),
        SolveStatus::Infeasible => {
            println!("=== No feasible meal ===");
            if let Some(reason) = &solution.infeasibility {
                println!("Reason: {}", reason.describe());
            }
            println!();
            return;
        }
    }
    println!();

    let shown: Vec<_> = solution
        .ingredients
        .iter()
        .filter(|i| i.grams >= GRAMS_DISPLAY_THRESHOLD)
        .collect();
    let width = shown.iter().map(|i| i.name.len()).max().unwrap_or(10);

    for item in &shown {
        println!(
            "  {:<width$}  {:>7.1} g  {:>6.0} kcal | P {:>5.1}  F {:>5.1}  C {:>5.1}",
            item.name,
            item.grams,
            item.macros.calories,
            item.macros.protein,
            item.macros.fat,
            item.macros.carbs,
            width = width
        );
    }
    let omitted = solution.ingredients.len() - shown.len();
    if omitted > 0 {
        println!("  ({} ingredient(s) left out)", omitted);
    }

    let t = &solution.totals;
    println!();
    println!("--- Totals ---");
    println!("Calories: {:.0} kcal", t.calories);
    println!(
        "Protein {:.1} g, Fat {:.1} g, Carbs {:.1} g, Fiber {:.1} g",
        t.protein, t.fat, t.carbs, t.fiber
    );

    if !solution.micros.is_empty() {
        let width = solution.micros.iter().map(|m| m.key.len()).max().unwrap_or(10);
        println!();
        println!("--- Micronutrients (meal + already eaten) ---");
        for m in &solution.micros {
            let target = m
                .target
                .map(|t| format!("{:.1}", t))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {}{:<width$}  {:>8.2} + {:>8.2} / {:>8}  {} {}",
                if m.optimized { "*" } else { " " },
                m.key,
                m.total,
                m.pinned,
                target,
                percent_cell(m),
                coverage_marker(m.coverage),
                width = width
            );
        }
    }

    if !solution.tiers.is_empty() {
        println!();
        println!("--- Objective tiers ---");
        for tier in &solution.tiers {
            println!(
                "  {:<15} {:>10.3} (max {:.1}, weight {:.0})",
                tier.priority.label(),
                tier.value,
                tier.max_value,
                tier.weight
            );
        }
    }

    println!();
    println!("Solved in {} ms", solution.solve_millis);
    println!();
}

/// Display a simple list of foods with their per-100 g profile.
pub fn display_food_list(foods: &[&Food], title: &str) {
    if foods.is_empty() {
        println!("{}: (none)", title);
        return;
    }

    println!();
    println!("=== {} ({} items) ===", title, foods.len());
    println!();

    for food in foods {
        println!(
            "  {} [{}] - {} kcal, P:{} F:{} C:{} Fib:{}, {} micros",
            food.name,
            food.id,
            food.calories,
            food.protein,
            food.fat,
            food.carbs,
            food.fiber,
            food.micros.len()
        );
    }

    println!();
}

/// Display reference targets, EARs and ULs for one demographic.
pub fn display_nutrients(label: &str, references: &NutrientReferences) {
    let keys = references.tracked_keys();
    if keys.is_empty() {
        println!("{}: no tracked nutrients", label);
        return;
    }

    let fmt = |v: Option<f64>| v.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string());
    let width = keys.iter().map(|k| k.len()).max().unwrap_or(10);

    println!();
    println!("=== Reference intakes: {} ===", label);
    println!();
    println!("  {:<width$}  {:>10} {:>10} {:>10}", "nutrient", "target", "EAR", "UL", width = width);
    for key in &keys {
        println!(
            "  {:<width$}  {:>10} {:>10} {:>10}",
            key,
            fmt(references.target(key)),
            fmt(references.ear(key)),
            fmt(references.upper_limit(key)),
            width = width
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_met_has_no_marker() {
        assert_eq!(coverage_marker(Coverage::Met), "");
        assert_eq!(coverage_marker(Coverage::OverLimit), "[over UL]");
    }
}
