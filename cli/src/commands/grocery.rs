use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use mise_core::MiseService;
use mise_core::models::{Department, ItemStatus, NewManualItem, User};

use super::helpers::{date_arg, fmt_quantity, print_item_table};

pub(crate) fn cmd_grocery_create(
    svc: &MiseService,
    user: &User,
    start: Option<String>,
    end: Option<String>,
    json: bool,
) -> Result<()> {
    let start = date_arg(start)?;
    let end = match end {
        Some(e) => date_arg(Some(e))?,
        None => start.clone(),
    };
    let list = svc.create_grocery_list(user.id, &start, &end)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        println!(
            "Created grocery list #{} for {} to {} ({} items)",
            list.id,
            list.start_date,
            list.end_date,
            list.items.len()
        );
        if list.items.is_empty() {
            eprintln!("Nothing planned in that range. Add meals with `mise plan add`.");
        } else {
            print_item_table(&list.items);
        }
    }

    Ok(())
}

pub(crate) fn cmd_grocery_show(
    svc: &MiseService,
    user: &User,
    id: i64,
    csv: bool,
    json: bool,
) -> Result<()> {
    if csv {
        print!("{}", svc.export_grocery_list_csv(user.id, id)?);
        return Ok(());
    }

    let list = svc.get_grocery_list(user.id, id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        println!(
            "Grocery list #{} ({} to {})",
            list.id, list.start_date, list.end_date
        );
        if list.items.is_empty() {
            eprintln!("No items on this list.");
        } else {
            print_item_table(&list.items);
            if list.items.iter().any(|i| i.is_manual) {
                println!("* added by hand");
            }
        }
    }

    Ok(())
}

pub(crate) fn cmd_grocery_list(
    svc: &MiseService,
    user: &User,
    limit: Option<i64>,
    json: bool,
) -> Result<()> {
    let page = svc.list_grocery_lists(user.id, limit, None)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else if page.data.is_empty() {
        eprintln!("No grocery lists yet. Use `mise grocery create` to build one.");
    } else {
        #[derive(Tabled)]
        struct ListRow {
            #[tabled(rename = "ID")]
            id: i64,
            #[tabled(rename = "Start")]
            start: String,
            #[tabled(rename = "End")]
            end: String,
            #[tabled(rename = "Created")]
            created: String,
        }

        let rows: Vec<ListRow> = page
            .data
            .iter()
            .map(|l| ListRow {
                id: l.id,
                start: l.start_date.to_string(),
                end: l.end_date.to_string(),
                created: l.created_at.chars().take(10).collect(),
            })
            .collect();
        println!("{}", Table::new(&rows).with(Style::rounded()));
        if page.total > i64::try_from(page.data.len()).unwrap_or(i64::MAX) {
            println!("Showing {} of {} lists", page.data.len(), page.total);
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_grocery_add(
    svc: &MiseService,
    user: &User,
    list_id: i64,
    name: String,
    quantity: Option<f64>,
    unit: Option<String>,
    department: Option<String>,
    json: bool,
) -> Result<()> {
    let department = department
        .as_deref()
        .map(str::parse::<Department>)
        .transpose()?;
    let item = svc.add_manual_item(
        user.id,
        list_id,
        &NewManualItem {
            item_name: name,
            quantity,
            unit,
            department,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        let qty = fmt_quantity(item.quantity, item.unit.as_deref());
        println!(
            "Added {}{} to list #{list_id} [{}] (item {})",
            item.item_name,
            if qty.is_empty() { String::new() } else { format!(" ({qty})") },
            item.department,
            item.id
        );
    }

    Ok(())
}

pub(crate) fn cmd_grocery_status(
    svc: &MiseService,
    user: &User,
    list_id: i64,
    item_id: i64,
    status: &str,
    json: bool,
) -> Result<()> {
    let status: ItemStatus = status.parse()?;
    let item = svc.update_item_status(user.id, list_id, item_id, status)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("{} is now {}", item.item_name, item.status);
    }

    Ok(())
}

pub(crate) fn cmd_grocery_delete(
    svc: &MiseService,
    user: &User,
    list_id: i64,
    json: bool,
) -> Result<()> {
    svc.delete_grocery_list(user.id, list_id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": list_id }));
    } else {
        println!("Deleted grocery list #{list_id}");
    }

    Ok(())
}
