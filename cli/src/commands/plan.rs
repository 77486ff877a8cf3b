use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use mise_core::MiseService;
use mise_core::models::{MealPlan, MealType, NewMealSlot};

use super::helpers::{date_arg, truncate};

pub(crate) fn cmd_plan_show(
    svc: &MiseService,
    start: Option<String>,
    end: Option<String>,
    json: bool,
) -> Result<()> {
    let start = date_arg(start)?;
    let end = match end {
        Some(e) => date_arg(Some(e))?,
        None => start.clone(),
    };
    let plans = svc.get_meal_plans(&start, &end)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
    } else if plans.iter().all(|p| p.meals.is_empty()) {
        eprintln!("Nothing planned from {start} to {end}.");
    } else {
        print_plan_table(&plans);
    }

    Ok(())
}

/// Append one meal to a day, keeping what is already planned.
#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_plan_add(
    svc: &MiseService,
    date: Option<String>,
    meal: &str,
    recipe_id: Option<i64>,
    servings: Option<i64>,
    out: bool,
    json: bool,
) -> Result<()> {
    let meal_type: MealType = meal.parse()?;
    if out && (recipe_id.is_some() || servings.is_some()) {
        bail!("--out cannot be combined with --recipe or --servings");
    }

    let date = date_arg(date)?;
    let current = svc.get_meal_plan(&date)?;
    let mut slots: Vec<NewMealSlot> = current
        .meals
        .iter()
        .map(|m| NewMealSlot {
            meal_type: m.meal_type,
            recipe_id: m.recipe_id,
            servings: m.servings,
            out_of_kitchen: m.out_of_kitchen,
        })
        .collect();

    // Default to the recipe's own yield when no servings are given.
    let servings = match (recipe_id, servings) {
        (Some(id), None) if !out => Some(svc.get_recipe(id)?.servings),
        (_, s) => s,
    };
    slots.push(NewMealSlot {
        meal_type,
        recipe_id,
        servings,
        out_of_kitchen: out,
    });

    let plan = svc.set_meal_plan(&date, &slots)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("Planned {meal_type} on {date}");
        print_plan_table(std::slice::from_ref(&plan));
    }

    Ok(())
}

pub(crate) fn cmd_plan_clear(svc: &MiseService, date: Option<String>, json: bool) -> Result<()> {
    let date = date_arg(date)?;
    let plan = svc.set_meal_plan(&date, &[])?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("Cleared meals for {date}");
    }

    Ok(())
}

fn print_plan_table(plans: &[MealPlan]) {
    #[derive(Tabled)]
    struct SlotRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
        #[tabled(rename = "Servings")]
        servings: String,
    }

    let rows: Vec<SlotRow> = plans
        .iter()
        .flat_map(|p| {
            p.meals.iter().map(move |m| SlotRow {
                date: p.plan_date.to_string(),
                meal: m.meal_type.to_string(),
                recipe: if m.out_of_kitchen {
                    "(eating out)".to_string()
                } else {
                    m.recipe_title
                        .as_deref()
                        .map(|t| truncate(t, 35))
                        .unwrap_or_default()
                },
                servings: m.servings.map(|s| s.to_string()).unwrap_or_default(),
            })
        })
        .collect();

    println!("{}", Table::new(&rows).with(Style::rounded()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use mise_core::models::NewRecipe;

    fn svc_with_recipe() -> (MiseService, i64) {
        let svc = MiseService::new_in_memory().unwrap();
        let user = svc.create_user("pat", "tok").unwrap();
        let recipe: NewRecipe = serde_json::from_value(serde_json::json!({
            "title": "Chili",
            "servings": 6,
            "serving_size": "1 bowl",
            "ingredients": [{"ingredient_name": "Beans", "quantity": 2, "unit": "can"}],
            "instructions": [{"step_number": 1, "instruction": "Simmer"}]
        }))
        .unwrap();
        let id = svc.create_recipe(user.id, &recipe).unwrap().id;
        (svc, id)
    }

    #[test]
    fn test_plan_add_appends_and_defaults_servings() {
        let (svc, recipe_id) = svc_with_recipe();
        let date = Some("2024-06-10".to_string());

        cmd_plan_add(&svc, date.clone(), "lunch", None, None, true, true).unwrap();
        cmd_plan_add(&svc, date.clone(), "dinner", Some(recipe_id), None, false, true).unwrap();

        let plan = svc.get_meal_plan("2024-06-10").unwrap();
        assert_eq!(plan.meals.len(), 2);
        assert!(plan.meals[0].out_of_kitchen);
        assert_eq!(plan.meals[1].servings, Some(6));

        cmd_plan_clear(&svc, date, true).unwrap();
        assert!(svc.get_meal_plan("2024-06-10").unwrap().meals.is_empty());
    }

    #[test]
    fn test_plan_add_rejects_out_with_recipe() {
        let (svc, recipe_id) = svc_with_recipe();
        assert!(
            cmd_plan_add(&svc, None, "dinner", Some(recipe_id), None, true, true).is_err()
        );
        assert!(cmd_plan_add(&svc, None, "brunch", Some(recipe_id), None, false, true).is_err());
    }
}
