use std::{fs, path::Path, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use orderdesk::{
    commands::orders::{CreateOrderRequest, UpdateOrderRequest},
    config::{self, AppConfig},
    db::{self, DbPool},
    events,
    models::PaymentStatus,
    queries::order_queries::OrderFilter,
    services::orders::OrderService,
    ServiceResponse,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
            Ok(())
        }
        Commands::Orders(command) => handle_orders_command(&context, command).await,
    }
}

#[derive(Parser)]
#[command(name = "orderdesk", about = "Order transaction engine command line", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    #[command(subcommand)]
    Orders(OrdersCommands),
}

#[derive(Subcommand)]
enum OrdersCommands {
    List(ListOrdersArgs),
    Show(OrderIdArgs),
    Create(PayloadArgs),
    Update(UpdateOrderArgs),
    Cancel(OrderIdArgs),
    Delete(OrderIdArgs),
    /// Create one order per element of a JSON array, skipping codes that exist
    Import(PayloadArgs),
    Export(ExportOrdersArgs),
}

#[derive(Args)]
struct OrderIdArgs {
    #[arg(value_parser = clap::value_parser!(Uuid), help = "Order identifier (UUID)")]
    id: Uuid,
}

#[derive(Args)]
struct PayloadArgs {
    #[arg(long, help = "Path to the JSON payload")]
    file: PathBuf,
}

#[derive(Args)]
struct UpdateOrderArgs {
    #[arg(value_parser = clap::value_parser!(Uuid), help = "Order identifier (UUID)")]
    id: Uuid,
    #[arg(long, help = "Path to the JSON patch")]
    file: PathBuf,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long, help = "JSON file holding a full order filter; flags below override it")]
    filter_file: Option<PathBuf>,
    #[arg(long, help = "Payment status (PENDING, SETTLEMENT, CANCEL, INSTALLMENTS)")]
    payment_status: Option<String>,
    #[arg(long, help = "Order code substring")]
    code: Option<String>,
    #[arg(long, help = "Orderer or delivery target name substring")]
    customer_name: Option<String>,
    #[arg(long, help = "Earliest order date (YYYY-MM-DD)")]
    from: Option<NaiveDate>,
    #[arg(long, help = "Latest order date, inclusive (YYYY-MM-DD)")]
    to: Option<NaiveDate>,
}

impl FilterArgs {
    fn into_filter(self) -> Result<OrderFilter> {
        let mut filter: OrderFilter = match &self.filter_file {
            Some(path) => read_json(path)?,
            None => OrderFilter::default(),
        };
        if let Some(status) = self.payment_status {
            filter.payment_status = Some(
                status
                    .parse::<PaymentStatus>()
                    .map_err(anyhow::Error::msg)?,
            );
        }
        if self.code.is_some() {
            filter.code = self.code;
        }
        if self.customer_name.is_some() {
            filter.customer_name = self.customer_name;
        }
        if self.from.is_some() {
            filter.start_date = self.from;
        }
        if self.to.is_some() {
            filter.end_date = self.to;
        }
        Ok(filter)
    }
}

#[derive(Args)]
struct ListOrdersArgs {
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long, default_value_t = 1, help = "Page number, starting at 1")]
    page: u64,
    #[arg(long, help = "Results per page")]
    per_page: Option<u64>,
}

#[derive(Args)]
struct ExportOrdersArgs {
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long, help = "Write the rows to this file instead of stdout")]
    out: Option<PathBuf>,
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        if config.auto_migrate {
            db::run_migrations(&db_pool)
                .await
                .context("failed to run migrations")?;
        }

        Ok(Self {
            config,
            db: Arc::new(db_pool),
        })
    }

    fn order_service(&self) -> OrderService {
        let (sender, rx) = events::channel(self.config.event_channel_capacity);
        tokio::spawn(events::process_events(rx));
        OrderService::from_config(self.db.clone(), Arc::new(sender), &self.config)
    }
}

async fn handle_orders_command(context: &CliContext, command: OrdersCommands) -> Result<()> {
    let service = context.order_service();
    match command {
        OrdersCommands::List(args) => {
            let filter = args.filter.into_filter()?;
            print_response(&service.list_orders(filter, Some(args.page), args.per_page).await)
        }
        OrdersCommands::Show(args) => print_response(&service.get_order(args.id).await),
        OrdersCommands::Create(args) => {
            let request: CreateOrderRequest = read_json(&args.file)?;
            print_response(&service.create_order(request).await)
        }
        OrdersCommands::Update(args) => {
            let request: UpdateOrderRequest = read_json(&args.file)?;
            print_response(&service.update_order(args.id, request).await)
        }
        OrdersCommands::Cancel(args) => print_response(&service.cancel_order(args.id).await),
        OrdersCommands::Delete(args) => print_response(&service.delete_order(args.id).await),
        OrdersCommands::Import(args) => {
            let rows: Vec<CreateOrderRequest> = read_json(&args.file)?;
            info!(rows = rows.len(), "Importing orders");
            print_response(&service.import_orders(rows).await)
        }
        OrdersCommands::Export(args) => {
            let filter = args.filter.into_filter()?;
            let response = service.export_orders(filter).await;
            match args.out {
                Some(path) => {
                    fs::write(&path, serde_json::to_string_pretty(&response)?)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Wrote {}", path.display());
                    Ok(())
                }
                None => print_response(&response),
            }
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_response<T: Serialize>(response: &ServiceResponse<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
