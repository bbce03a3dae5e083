use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use restaurant_orders_api::{
    auth::{AuthConfig, AuthService, Role, TokenSubject},
    config::{self, AppConfig},
    db,
    services::restaurants::{RestaurantRequest, RestaurantService},
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "restaurant-cli",
    about = "Operational tasks for the restaurant orders API",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Issue a bearer token for a staff member, admin or driver
    IssueToken(IssueTokenArgs),
    /// Register a new restaurant
    CreateRestaurant(CreateRestaurantArgs),
}

#[derive(Args)]
struct IssueTokenArgs {
    #[arg(long, help = "admin, staff or driver")]
    role: Role,
    #[arg(long, help = "Restaurant the token is scoped to")]
    restaurant_id: Uuid,
    #[arg(long, help = "Driver id, required for driver tokens")]
    driver_id: Option<Uuid>,
    #[arg(long, default_value = "cli", help = "Subject recorded in the token")]
    subject: String,
}

#[derive(Args)]
struct CreateRestaurantArgs {
    #[arg(long)]
    name: String,
    #[arg(long, help = "URL slug used by the public menu")]
    slug: String,
    #[arg(long, help = "Prefix for order numbers, e.g. PZ")]
    order_prefix: String,
    #[arg(long, default_value = "0")]
    delivery_fee: Decimal,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    utc_offset_minutes: i32,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
}

#[derive(Serialize)]
struct IssuedToken {
    token: String,
    role: Role,
    restaurant_id: Uuid,
    expires_in_secs: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    match cli.command {
        Commands::Migrate => migrate(&cfg).await?,
        Commands::IssueToken(args) => issue_token(&cfg, args, cli.json)?,
        Commands::CreateRestaurant(args) => create_restaurant(&cfg, args, cli.json).await?,
    }

    Ok(())
}

async fn migrate(cfg: &AppConfig) -> Result<()> {
    let pool = db::establish_connection_from_app_config(cfg)
        .await
        .context("failed to connect to the database")?;
    db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied");
    Ok(())
}

fn issue_token(cfg: &AppConfig, args: IssueTokenArgs, json: bool) -> Result<()> {
    let service = AuthService::new(AuthConfig::from(cfg));
    let token = service
        .issue_token(&TokenSubject {
            subject: args.subject,
            role: args.role,
            restaurant_id: args.restaurant_id,
            driver_id: args.driver_id,
        })
        .context("failed to issue token")?;

    if json {
        print_json(&IssuedToken {
            token,
            role: args.role,
            restaurant_id: args.restaurant_id,
            expires_in_secs: cfg.jwt_expiration,
        })?;
    } else {
        println!("{}", token);
    }
    Ok(())
}

async fn create_restaurant(cfg: &AppConfig, args: CreateRestaurantArgs, json: bool) -> Result<()> {
    let pool = db::establish_connection_from_app_config(cfg)
        .await
        .context("failed to connect to the database")?;
    let service = RestaurantService::new(Arc::new(pool));
    let created = service
        .create(RestaurantRequest {
            name: args.name,
            slug: args.slug,
            phone: args.phone,
            address: args.address,
            is_active: true,
            delivery_fee: args.delivery_fee,
            utc_offset_minutes: args.utc_offset_minutes,
            order_prefix: args.order_prefix,
        })
        .await
        .context("failed to create restaurant")?;

    if json {
        print_json(&created)?;
    } else {
        println!("Restaurant {} created (id {})", created.slug, created.id);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
