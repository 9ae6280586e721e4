mod headsets;
mod http;
mod meta;
mod models;
mod scraper;
mod supabase;

use clap::{Parser, Subcommand, ValueEnum};
use meta::MetaClient;
use models::{DetailOutcome, ImageOutcome, OverviewOutcome};
use scraper::Scraper;
use supabase::SupabaseClient;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "quest-scraper-rs")]
#[command(about = "Incremental Quest store catalog scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Retrieve store applications
    Get {
        #[arg(value_enum)]
        target: GetTarget,
    },
    /// Update applications and headsets infos
    Update {
        #[arg(value_enum)]
        target: UpdateTarget,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GetTarget {
    Overviews,
    Details,
    Images,
    Infos,
    All,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UpdateTarget {
    Headsets,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "scraper.cli", "run failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let source = MetaClient::from_env().ok_or("OCULUS_ACCESS_TOKEN is not set")?;
    let store =
        SupabaseClient::from_env().ok_or("SUPABASE_URL and a Supabase key must be set")?;
    let scraper = Scraper::new(source, store);

    match cli.command {
        Commands::Get { target } => match target {
            GetTarget::Overviews => report_overview(&scraper.scrape_applications().await?),
            GetTarget::Details => report_details(&scraper.scrape_application_details().await?),
            GetTarget::Images => report_images(&scraper.scrape_application_images().await?),
            GetTarget::Infos => {
                let infos = scraper.database_infos().await?;
                println!("Applications: {}", infos.applications);
                println!("Application details: {}", infos.application_details);
                println!("Application images: {}", infos.application_images);
                for (name, count) in scraper.store_infos().await? {
                    println!("{name}: {count}");
                }
            }
            GetTarget::All => {
                let (overview, details, images) = scraper.scrape_all().await?;
                report_overview(&overview);
                report_details(&details);
                report_images(&images);
            }
        },
        Commands::Update { target } => match target {
            UpdateTarget::Headsets => {
                for (name, count) in scraper.update_headset_counts().await? {
                    println!("{name}: {count}");
                }
            }
        },
    }
    Ok(())
}

fn report_overview(outcome: &OverviewOutcome) {
    for (name, count) in &outcome.retrieved {
        println!("{name}: {count} new");
    }
    println!(
        "Created {}/{} applications",
        outcome.created, outcome.attempted
    );
}

fn report_details(outcome: &DetailOutcome) {
    println!(
        "Created {} detail records from {} applications",
        outcome.created, outcome.candidates
    );
}

fn report_images(outcome: &ImageOutcome) {
    println!("Uploaded {}/{} images", outcome.uploaded, outcome.missing);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
