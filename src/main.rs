use clap::{Args, Parser, Subcommand};
use compare_buy_repeat::{
    server::{self, config::Config},
    CatalogClient, SelectionController, Side, Url,
};
use eyre::{eyre, Result};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the REST backend.
    Serve(Config),
    /// Compare two products served by a running backend.
    Compare(CompareArgs),
}

#[derive(Args)]
struct CompareArgs {
    /// Backend to query.
    #[arg(long, env = "COMPARE_SERVER", default_value = "http://127.0.0.1:3000")]
    server: Url,

    #[arg(long)]
    category: String,

    #[arg(long)]
    brand1: String,

    #[arg(long)]
    model1: String,

    #[arg(long)]
    brand2: String,

    #[arg(long)]
    model2: String,

    /// Print HTML instead of a terminal table.
    #[arg(long)]
    html: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match Cli::parse().command {
        Command::Serve(config) => server::start_server(config).await,
        Command::Compare(args) => run_compare(args).await,
    }
}

async fn run_compare(args: CompareArgs) -> Result<()> {
    let client = CatalogClient::new(args.server)?;
    let mut controller = SelectionController::new();

    controller.select_category(&client, &args.category).await;
    let brands = controller
        .brands()
        .ok_or_else(|| eyre!("Could not load brands of {}", args.category))?;
    let brand1 = pick(brands, &args.brand1, "brand")?;
    let brand2 = pick(brands, &args.brand2, "brand")?;

    for (side, brand, model) in [
        (Side::First, brand1, &args.model1),
        (Side::Second, brand2, &args.model2),
    ] {
        controller.select_brand(&client, side, &brand).await;
        let models = controller
            .models(side)
            .ok_or_else(|| eyre!("Could not load models of {brand}"))?;
        let model = pick(models, model, "model")?;
        controller.select_model(side, &model)?;
    }

    let table = controller.compare(&client).await?;
    if args.html {
        println!("{}", table.to_html()?);
    } else {
        println!("{}", table.to_text());
    }
    Ok(())
}

/// The entry of `options` equal to `wanted`, ignoring case.
fn pick(options: &[String], wanted: &str, what: &str) -> Result<String> {
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(wanted))
        .cloned()
        .ok_or_else(|| eyre!("Unknown {what} {wanted:?}, expected one of: {}", options.join(", ")))
}
