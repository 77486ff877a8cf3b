use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use mise_core::MiseService;

use crate::config::generate_token;

pub(crate) fn cmd_user_add(svc: &MiseService, name: &str, json: bool) -> Result<()> {
    let token = generate_token();
    let user = svc.create_user(name, &token)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "id": user.id, "name": user.name, "token": token })
        );
    } else {
        println!("Created user {} (id {})", user.name, user.id);
        println!("API token: {token}");
        eprintln!("Store this token now. It is not shown again.");
    }

    Ok(())
}

pub(crate) fn cmd_user_list(svc: &MiseService, json: bool) -> Result<()> {
    let users = svc.list_users()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
    } else if users.is_empty() {
        eprintln!("No users yet. Use `mise user add <name>` to create one.");
    } else {
        #[derive(Tabled)]
        struct UserRow {
            #[tabled(rename = "ID")]
            id: i64,
            #[tabled(rename = "Name")]
            name: String,
            #[tabled(rename = "Created")]
            created: String,
        }

        let rows: Vec<UserRow> = users
            .iter()
            .map(|u| UserRow {
                id: u.id,
                name: u.name.clone(),
                created: u.created_at.chars().take(10).collect(),
            })
            .collect();
        println!("{}", Table::new(&rows).with(Style::rounded()));
    }

    Ok(())
}
