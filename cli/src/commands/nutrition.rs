use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mise_core::MiseService;

use super::helpers::truncate;

fn opt_grams(v: Option<f64>) -> String {
    v.map(|g| format!("{g:.1}")).unwrap_or_else(|| "-".to_string())
}

pub(crate) fn cmd_nutrition_search(svc: &MiseService, query: &str, json: bool) -> Result<()> {
    let results = svc.search_nutrition(query)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "data": results,
                "meta": { "total": results.len() }
            }))?
        );
        return Ok(());
    }

    if results.is_empty() {
        eprintln!("No foods match '{query}'.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "FDC ID")]
        fdc_id: String,
        #[tabled(rename = "Food")]
        description: String,
        #[tabled(rename = "kcal/100g")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fiber")]
        fiber: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    let rows: Vec<FoodRow> = results
        .iter()
        .map(|r| FoodRow {
            fdc_id: r.fdc_id.clone(),
            description: truncate(&r.description, 40),
            calories: r.calories.map(|c| format!("{c:.0}")).unwrap_or_else(|| "-".to_string()),
            protein: opt_grams(r.protein_g),
            carbs: opt_grams(r.carbs_g),
            fiber: opt_grams(r.fiber_g),
            fat: opt_grams(r.fat_g),
            source: r.data_type.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

/// Totals for a recipe from the ingredients linked to cached nutrition data.
pub(crate) fn cmd_recipe_nutrition(svc: &MiseService, id: i64, json: bool) -> Result<()> {
    let recipe = svc.get_recipe(id)?;
    let totals = svc.recipe_nutrition(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    let linked = recipe
        .ingredients
        .iter()
        .filter(|i| i.nutrition_id.is_some())
        .count();
    println!(
        "{} ({linked} of {} ingredients linked)",
        recipe.title,
        recipe.ingredients.len()
    );
    if linked == 0 {
        eprintln!("No ingredients carry a nutrition_id. Find one with `mise nutrition search`.");
    }

    #[derive(Tabled)]
    struct TotalRow {
        #[tabled(rename = "")]
        label: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fiber")]
        fiber: String,
        #[tabled(rename = "Fat")]
        fat: String,
    }

    let rows = vec![
        TotalRow {
            label: "Recipe".to_string(),
            calories: format!("{:.0}", totals.total_calories),
            protein: format!("{:.1}g", totals.total_protein_g),
            carbs: format!("{:.1}g", totals.total_carbs_g),
            fiber: format!("{:.1}g", totals.total_fiber_g),
            fat: format!("{:.1}g", totals.total_fat_g),
        },
        TotalRow {
            label: format!("Per serving ({})", recipe.servings),
            calories: format!("{:.0}", totals.per_serving_calories),
            protein: format!("{:.1}g", totals.per_serving_protein_g),
            carbs: format!("{:.1}g", totals.per_serving_carbs_g),
            fiber: format!("{:.1}g", totals.per_serving_fiber_g),
            fat: format!("{:.1}g", totals.per_serving_fat_g),
        },
    ];

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_fills_cache() {
        let svc = MiseService::new_in_memory().unwrap();
        cmd_nutrition_search(&svc, "egg", true).unwrap();

        let cached = svc.search_nutrition("egg").unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].data_type, "Cached");
        assert!(cmd_nutrition_search(&svc, "", false).is_err());
    }

    #[test]
    fn test_recipe_nutrition_for_unknown_recipe() {
        let svc = MiseService::new_in_memory().unwrap();
        assert!(cmd_recipe_nutrition(&svc, 42, false).is_err());
    }

    #[test]
    fn test_opt_grams() {
        assert_eq!(opt_grams(Some(12.6)), "12.6");
        assert_eq!(opt_grams(Some(0.04)), "0.0");
        assert_eq!(opt_grams(None), "-");
    }
}
