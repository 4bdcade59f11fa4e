//! `grocery`: command-line front end for the grocery inventory API.

mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use grocery_core::{
    ApiError, Category, ClientConfig, CreateRequest, FilterCriteria, GroceryId, GroceryListView, GroceryStore, LowStockBanner,
    Notification, NotificationLevel, Notifier, Unit, UpdateRequest,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "grocery", version, about = "Manage a grocery inventory")]
struct Cli {
    /// TOML config file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Backend base URL, overrides config and environment
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List groceries, narrowed by search text or filters
    List(ListArgs),
    /// Show one grocery
    Get { id: i64 },
    /// Add a grocery
    Create(CreateArgs),
    /// Change fields of a grocery
    Update(UpdateArgs),
    /// Remove a grocery
    Delete { id: i64 },
    /// Show items running low
    LowStock,
    /// List categories in use
    Categories,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Name search; takes precedence over filters
    #[arg(short, long, default_value = "")]
    search: String,
    #[arg(long)]
    category: Option<Category>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
}

impl ListArgs {
    fn filters(&self) -> FilterCriteria {
        FilterCriteria {
            category: self.category,
            name: self.name.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            low_stock: None,
        }
    }
}

#[derive(Args, Debug)]
struct CreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    price: f64,
    #[arg(long)]
    quantity: u32,
    #[arg(long)]
    category: Category,
    #[arg(long)]
    unit: Unit,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    id: i64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    quantity: Option<u32>,
    #[arg(long)]
    category: Option<Category>,
    #[arg(long)]
    unit: Option<Unit>,
}

/// Prints notifications to stderr so stdout stays machine-friendly.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => eprintln!("{}", notification.message),
            NotificationLevel::Error => eprintln!("error: {}", notification.message),
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = ClientConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
        config.validate().context("validating --api-url")?;
    }
    tracing::debug!(api = %config.api_base_url, "configured");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    runtime.block_on(run(cli.command, &config))
}

async fn run(command: Command, config: &ClientConfig) -> Result<ExitCode> {
    let store = GroceryStore::from_config(config, Arc::new(ConsoleNotifier))?;

    match command {
        Command::List(args) => {
            if let Some(banner) = LowStockBanner::load(&store).await {
                println!("{}\n", render::banner(&banner));
            }
            let view = GroceryListView::mount(store, &args.search, &args.filters()).await;
            println!("{}", render::list_view(&view.render()));
        }
        Command::Get { id } => {
            let query = store.grocery(Some(GroceryId(id))).await;
            if let Some(error) = query.error() {
                bail!("could not load grocery {id}: {error}");
            }
            match query.data() {
                Some(item) => println!("{}", render::item_detail(&item)),
                None => bail!("grocery {id} not found"),
            }
        }
        Command::Create(args) => {
            let input = CreateRequest {
                name: args.name,
                description: args.description,
                price: args.price,
                quantity: args.quantity,
                category: args.category,
                unit: args.unit,
            };
            let Some(created) = reported(store.create(&input).await)? else {
                return Ok(ExitCode::FAILURE);
            };
            println!("{}", render::item_line(&created));
        }
        Command::Update(args) => {
            let patch = UpdateRequest {
                name: args.name,
                description: args.description,
                price: args.price,
                quantity: args.quantity,
                category: args.category,
                unit: args.unit,
            };
            if patch.is_empty() {
                bail!("nothing to update; pass at least one field");
            }
            let Some(updated) = reported(store.update(GroceryId(args.id), &patch).await)? else {
                return Ok(ExitCode::FAILURE);
            };
            println!("{}", render::item_line(&updated));
        }
        Command::Delete { id } => {
            if reported(store.delete(GroceryId(id)).await)?.is_none() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::LowStock => match LowStockBanner::load(&store).await {
            Some(banner) => println!("{}", render::banner(&banner)),
            None => println!("Nothing is running low."),
        },
        Command::Categories => {
            let query = store.categories().await;
            if let Some(error) = query.error() {
                bail!("could not load categories: {error}");
            }
            for category in query.data() {
                println!("{category}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Outcome of a mutation. API failures were already shown by the notifier
/// and become `None`; validation failures never reach it and stay errors.
fn reported<T>(result: Result<T, ApiError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ApiError::Validation(errors)) => bail!("invalid input: {errors}"),
        Err(_) => Ok(None),
    }
}
