mod grocery;
mod helpers;
mod nutrition;
mod plan;
mod recipe;
mod recommend;
mod user;

pub(crate) use grocery::{
    cmd_grocery_add, cmd_grocery_create, cmd_grocery_delete, cmd_grocery_list, cmd_grocery_show,
    cmd_grocery_status,
};
pub(crate) use helpers::resolve_user;
pub(crate) use nutrition::{cmd_nutrition_search, cmd_recipe_nutrition};
pub(crate) use plan::{cmd_plan_add, cmd_plan_clear, cmd_plan_show};
pub(crate) use recipe::{cmd_recipe_import, cmd_recipe_list, cmd_recipe_show};
pub(crate) use recommend::cmd_recommend;
pub(crate) use user::{cmd_user_add, cmd_user_list};
