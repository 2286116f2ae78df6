pub mod prompts;
pub mod render;

pub use prompts::{edit_request, match_foods, prompt_food, prompt_number, prompt_yes_no, EditAction};
pub use render::{coverage_marker, display_food_list, display_nutrients, display_solution};
