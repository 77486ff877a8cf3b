use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mise_core::MiseService;

use super::helpers::truncate;

pub(crate) fn cmd_recommend(svc: &MiseService, ingredients: &[String], json: bool) -> Result<()> {
    let (ranked, meta) = svc.recommend(ingredients)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "data": ranked, "meta": meta }))?
        );
        return Ok(());
    }

    if ranked.is_empty() {
        eprintln!("No recipes use any of: {}", ingredients.join(", "));
        return Ok(());
    }

    #[derive(Tabled)]
    struct RecRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Recipe")]
        title: String,
        #[tabled(rename = "Match")]
        score: String,
        #[tabled(rename = "Missing")]
        missing: String,
    }

    let rows: Vec<RecRow> = ranked
        .iter()
        .map(|r| RecRow {
            id: r.recipe.id,
            title: truncate(&r.recipe.title, 35),
            score: format!("{:.0}%", r.match_score),
            missing: truncate(&r.missing_ingredients.join(", "), 50),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("{} recipes found", meta.total_recipes_found);

    Ok(())
}
