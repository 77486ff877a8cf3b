mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    cmd_grocery_add, cmd_grocery_create, cmd_grocery_delete, cmd_grocery_list, cmd_grocery_show,
    cmd_grocery_status, cmd_nutrition_search, cmd_plan_add, cmd_plan_clear, cmd_plan_show,
    cmd_recipe_import, cmd_recipe_list, cmd_recipe_nutrition, cmd_recipe_show, cmd_recommend,
    cmd_user_add, cmd_user_list, resolve_user,
};
use crate::config::Config;
use mise_core::MiseService;

#[derive(Parser)]
#[command(
    name = "mise",
    version,
    about = "Plan meals, build grocery lists, find recipes for what's in the fridge"
)]
struct Cli {
    /// Act as this user (id or name). Optional when only one user exists.
    #[arg(long, global = true, env = "MISE_USER")]
    user: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
    /// Manage household members and their API tokens
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Build and manage grocery lists from the meal plan
    Grocery {
        #[command(subcommand)]
        command: GroceryCommands,
    },
    /// Rank recipes by how many of the given ingredients they use
    Recommend {
        /// Ingredients on hand (e.g. tomato onions "olive oil")
        #[arg(required = true)]
        ingredients: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// View and edit the meal plan
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Manage recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Look up nutrition data (per 100 g)
    Nutrition {
        #[command(subcommand)]
        command: NutritionCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user and print their API token
    Add {
        /// Display name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List users
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GroceryCommands {
    /// Generate a grocery list from planned meals in a date range
    Create {
        /// First day (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        start: Option<String>,
        /// Last day, inclusive (default: same as start)
        end: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a grocery list
    Show {
        /// Grocery list ID
        id: i64,
        /// Print as CSV
        #[arg(long, conflicts_with = "json")]
        csv: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List your grocery lists, newest first
    List {
        /// Maximum number of lists
        #[arg(short, long)]
        limit: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item by hand
    Add {
        /// Grocery list ID
        list: i64,
        /// Item name
        name: String,
        /// Quantity
        #[arg(short, long)]
        quantity: Option<f64>,
        /// Unit (e.g. cup, g, whole)
        #[arg(short, long)]
        unit: Option<String>,
        /// Department: produce, meat, seafood, dairy, bakery, frozen, pantry, spices, beverages, other
        #[arg(short, long)]
        department: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set an item's status: pending, bought, have_on_hand
    Status {
        /// Grocery list ID
        list: i64,
        /// Item ID
        item: i64,
        /// New status
        status: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a grocery list
    Delete {
        /// Grocery list ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Show planned meals (default: today)
    Show {
        /// First day (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        start: Option<String>,
        /// Last day, inclusive (default: same as start)
        #[arg(long)]
        end: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a meal to a day
    Add {
        /// Meal type: breakfast, lunch, dinner, snack, dessert
        meal: String,
        /// Recipe ID to cook
        #[arg(short, long)]
        recipe: Option<i64>,
        /// Servings to cook (default: the recipe's servings)
        #[arg(short, long)]
        servings: Option<i64>,
        /// Eating out; nothing to buy for this meal
        #[arg(long)]
        out: bool,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every meal from a day
    Clear {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Import recipes from a JSON file (one object or an array)
    Import {
        /// Path to the JSON file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recipes
    List {
        /// Filter by title
        #[arg(short, long)]
        search: Option<String>,
        /// Maximum number of recipes
        #[arg(short, long)]
        limit: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with ingredients and steps
    Show {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Nutrition totals from ingredients linked to nutrition data
    Nutrition {
        /// Recipe ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum NutritionCommands {
    /// Search foods, checking the local cache before the lookup service
    Search {
        /// Food name (e.g. "olive oil")
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Log to stderr, filtered by `MISE_LOG` (e.g. `MISE_LOG=mise_core=debug`), then `RUST_LOG`, default `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("MISE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    tracing::debug!(db = %config.db_path.display(), "opening database");
    let svc = MiseService::new(&config.db_path)?;
    let user = cli.user.as_deref();

    match cli.command {
        Commands::Serve { port, bind } => server::start_server(svc, port, &bind).await,
        Commands::User { command } => match command {
            UserCommands::Add { name, json } => cmd_user_add(&svc, &name, json),
            UserCommands::List { json } => cmd_user_list(&svc, json),
        },
        Commands::Grocery { command } => {
            let user = resolve_user(&svc, user)?;
            match command {
                GroceryCommands::Create { start, end, json } => {
                    cmd_grocery_create(&svc, &user, start, end, json)
                }
                GroceryCommands::Show { id, csv, json } => {
                    cmd_grocery_show(&svc, &user, id, csv, json)
                }
                GroceryCommands::List { limit, json } => {
                    cmd_grocery_list(&svc, &user, limit, json)
                }
                GroceryCommands::Add {
                    list,
                    name,
                    quantity,
                    unit,
                    department,
                    json,
                } => cmd_grocery_add(&svc, &user, list, name, quantity, unit, department, json),
                GroceryCommands::Status {
                    list,
                    item,
                    status,
                    json,
                } => cmd_grocery_status(&svc, &user, list, item, &status, json),
                GroceryCommands::Delete { id, json } => {
                    cmd_grocery_delete(&svc, &user, id, json)
                }
            }
        }
        Commands::Recommend { ingredients, json } => cmd_recommend(&svc, &ingredients, json),
        Commands::Plan { command } => match command {
            PlanCommands::Show { start, end, json } => cmd_plan_show(&svc, start, end, json),
            PlanCommands::Add {
                meal,
                recipe,
                servings,
                out,
                date,
                json,
            } => cmd_plan_add(&svc, date, &meal, recipe, servings, out, json),
            PlanCommands::Clear { date, json } => cmd_plan_clear(&svc, date, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Import { file, json } => {
                let user = resolve_user(&svc, user)?;
                cmd_recipe_import(&svc, &user, &file, json)
            }
            RecipeCommands::List {
                search,
                limit,
                json,
            } => cmd_recipe_list(&svc, search, limit, json),
            RecipeCommands::Show { id, json } => cmd_recipe_show(&svc, id, json),
            RecipeCommands::Nutrition { id, json } => cmd_recipe_nutrition(&svc, id, json),
        },
        Commands::Nutrition { command } => match command {
            NutritionCommands::Search { query, json } => cmd_nutrition_search(&svc, &query, json),
        },
    }
}
