use std::path::Path;

use anyhow::{Context, Result};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mise_core::MiseService;
use mise_core::models::User;

use super::helpers::{fmt_quantity, truncate};

/// Import recipes from a JSON file holding one recipe object or an array of them.
pub(crate) fn cmd_recipe_import(
    svc: &MiseService,
    user: &User,
    file: &Path,
    json: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let created = svc
        .import_recipes_json(user.id, &content)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        for r in &created {
            println!(
                "Imported \"{}\" (id {}, {} ingredients)",
                r.title,
                r.id,
                r.ingredients.len()
            );
        }
    }

    Ok(())
}

pub(crate) fn cmd_recipe_list(
    svc: &MiseService,
    search: Option<String>,
    limit: Option<i64>,
    json: bool,
) -> Result<()> {
    let page = svc.list_recipes(search, limit, None)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else if page.data.is_empty() {
        eprintln!("No recipes found. Use `mise recipe import` to add some.");
    } else {
        #[derive(Tabled)]
        struct RecipeRow {
            #[tabled(rename = "ID")]
            id: i64,
            #[tabled(rename = "Title")]
            title: String,
            #[tabled(rename = "Servings")]
            servings: i64,
            #[tabled(rename = "Minutes")]
            minutes: i64,
            #[tabled(rename = "Ingredients")]
            ingredients: usize,
        }

        let rows: Vec<RecipeRow> = page
            .data
            .iter()
            .map(|r| RecipeRow {
                id: r.id,
                title: truncate(&r.title, 40),
                servings: r.servings,
                minutes: r.total_time_minutes,
                ingredients: r.ingredients.len(),
            })
            .collect();

        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(2..5)).with(Alignment::right()))
            .to_string();
        println!("{table}");
        println!("{} of {} recipes", page.data.len(), page.total);
    }

    Ok(())
}

pub(crate) fn cmd_recipe_show(svc: &MiseService, id: i64, json: bool) -> Result<()> {
    let recipe = svc.get_recipe(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
        return Ok(());
    }

    println!(
        "{} (serves {}, {})",
        recipe.title, recipe.servings, recipe.serving_size
    );
    if recipe.total_time_minutes > 0 {
        println!("Total time: {} min", recipe.total_time_minutes);
    }
    if !recipe.tags.is_empty() {
        println!("Tags: {}", recipe.tags.join(", "));
    }

    println!("\nIngredients:");
    for ing in &recipe.ingredients {
        let qty = fmt_quantity(ing.quantity, ing.unit.as_deref());
        if qty.is_empty() {
            println!("  - {} [{}]", ing.ingredient_name, ing.department);
        } else {
            println!("  - {qty} {} [{}]", ing.ingredient_name, ing.department);
        }
    }

    println!("\nSteps:");
    for step in &recipe.instructions {
        println!("  {}. {}", step.step_number, step.instruction);
    }

    if let Some(notes) = &recipe.notes {
        println!("\nNotes: {notes}");
    }

    Ok(())
}
