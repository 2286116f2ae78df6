use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use meal_solver_rs::models::{CalorieTarget, Food, Ingredient, Priority, SolveStatus};
use meal_solver_rs::planner::{solve_meal, MealProblem, Regime, SolverConfig};

const TOL: f64 = 1e-5;

fn random_problem(rng: &mut StdRng, regime: Regime) -> MealProblem {
    let count = rng.gen_range(2..=5);
    let ingredients: Vec<Ingredient> = (0..count)
        .map(|i| {
            let food = Food {
                id: format!("food_{}", i),
                name: format!("Food {}", i),
                calories: rng.gen_range(50.0..400.0),
                protein: rng.gen_range(0.0..30.0),
                fat: rng.gen_range(0.0..20.0),
                carbs: rng.gen_range(0.0..60.0),
                fiber: rng.gen_range(0.0..8.0),
                micros: BTreeMap::new(),
            };
            let min: f64 = rng.gen_range(0.0..50.0_f64).floor();
            let max = min + rng.gen_range(100.0..400.0_f64).floor();
            Ingredient::new(food, min, max)
        })
        .collect();

    let (lo, hi) = ingredients.iter().fold((0.0, 0.0), |(lo, hi), ing| {
        let per_gram = ing.food.calories_per_gram();
        (lo + per_gram * ing.min_grams, hi + per_gram * ing.max_grams)
    });
    let target = rng.gen_range(lo..hi);
    let tolerance = rng.gen_range(10.0..50.0);

    MealProblem::new(ingredients, CalorieTarget { target, tolerance })
        .with_config(SolverConfig::default().with_regime(regime))
}

fn check_bounds_and_band(problem: &MealProblem, slack: f64) {
    let solution = solve_meal(problem).unwrap();
    assert_eq!(solution.status, SolveStatus::Optimal);

    for (ing, result) in problem.ingredients.iter().zip(&solution.ingredients) {
        assert_eq!(ing.food.id, result.food_id);
        assert!(result.grams >= ing.min_grams - TOL, "{} below min", result.food_id);
        assert!(result.grams <= ing.max_grams + TOL, "{} above max", result.food_id);
    }
    assert!(solution.totals.calories >= problem.calories.lower() - slack - TOL);
    assert!(solution.totals.calories <= problem.calories.upper() + slack + TOL);
}

#[test]
fn test_random_problems_respect_bounds_continuous() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let problem = random_problem(&mut rng, Regime::Continuous);
        check_bounds_and_band(&problem, 0.0);
    }
}

#[test]
fn test_random_problems_integer_grams() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..8 {
        let mut problem =
            random_problem(&mut rng, Regime::Integer).with_priorities(vec![Priority::TotalMass]);
        problem.config.time_budget_ms = 30_000;
        // Half a unit of row slack, plus coefficient rounding of up to
        // 0.5 / scale kcal per gram over at most 5 x 450 g.
        check_bounds_and_band(&problem, 2.5);

        let solution = solve_meal(&problem).unwrap();
        for item in &solution.ingredients {
            assert_eq!(item.grams, item.grams.round(), "{} not integral", item.food_id);
        }
    }
}

#[test]
fn test_solution_lists_every_ingredient_in_order() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut problem = random_problem(&mut rng, Regime::Continuous);
    problem.ingredients[0].enabled = false;
    problem.ingredients[0].min_grams = 0.0;

    let solution = solve_meal(&problem).unwrap();
    assert_eq!(solution.ingredients.len(), problem.ingredients.len());
    if solution.status.has_solution() {
        assert_eq!(solution.ingredients[0].grams, 0.0);
    }
}
