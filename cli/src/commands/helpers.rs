use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use mise_core::MiseService;
use mise_core::models::{GroceryListItem, User};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Like [`parse_date`], rendered back as `YYYY-MM-DD` for the service layer.
pub(crate) fn date_arg(date_str: Option<String>) -> Result<String> {
    Ok(parse_date(date_str)?.format("%Y-%m-%d").to_string())
}

/// Pick the acting user by id or name. With no selector, a lone user is implied.
pub(crate) fn resolve_user(svc: &MiseService, selector: Option<&str>) -> Result<User> {
    let users = svc.list_users()?;
    match selector {
        Some(sel) => {
            let by_id = sel.parse::<i64>().ok();
            users
                .into_iter()
                .find(|u| Some(u.id) == by_id || u.name.eq_ignore_ascii_case(sel))
                .with_context(|| format!("No user matches '{sel}'"))
        }
        None => match users.len() {
            0 => bail!("No users yet. Create one with `mise user add <name>`"),
            1 => Ok(users.into_iter().next().context("No users")?),
            _ => bail!("Several users exist. Pick one with --user or MISE_USER"),
        },
    }
}

/// "3 cup", "1.5", or "" when there is nothing to show.
pub(crate) fn fmt_quantity(quantity: Option<f64>, unit: Option<&str>) -> String {
    let qty = quantity.map(|q| {
        let s = format!("{q:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    });
    match (qty, unit.filter(|u| !u.is_empty())) {
        (Some(q), Some(u)) => format!("{q} {u}"),
        (Some(q), None) => q,
        (None, Some(u)) => u.to_string(),
        (None, None) => String::new(),
    }
}

pub(crate) fn print_item_table(items: &[GroceryListItem]) {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Department")]
        department: String,
        #[tabled(rename = "Item")]
        item: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Status")]
        status: String,
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .map(|i| ItemRow {
            id: i.id,
            department: i.department.to_string(),
            item: if i.is_manual {
                format!("{} *", truncate(&i.item_name, 35))
            } else {
                truncate(&i.item_name, 35)
            },
            quantity: fmt_quantity(i.quantity, i.unit.as_deref()),
            status: i.status.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
