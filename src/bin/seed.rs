//! Populate the database with the built-in hospital and rescuer directory and
//! the default operator account, then print what is stored.
//!
//! Safe to run repeatedly: existing rows are left alone.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use snakesafe::config::Config;
use snakesafe::model::FacilityKind;
use snakesafe::seed::seed;
use snakesafe::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("snakesafe=info".parse()?))
        .init();

    let config = Config::from_env();
    info!(db_url = %config.database_url, "Seeding database");

    let storage = Storage::new(&config.database_url)
        .await
        .context("failed to open database")?;

    let report = seed(&storage, &config.admin_username, &config.admin_password).await?;

    for kind in [FacilityKind::Hospital, FacilityKind::Rescuer] {
        let facilities = storage.list_facilities(kind).await?;
        println!("{} ({}):", kind.plural(), facilities.len());
        for f in facilities {
            println!("  {} {} {} {}", f.name, f.phone, f.latitude, f.longitude);
        }
    }

    let requests = storage.list_help_requests().await?;
    println!("requests ({}):", requests.len());
    for r in requests {
        println!(
            "  {} {} {} {} {}",
            r.name, r.phone, r.snake_species, r.location, r.request_type
        );
    }

    println!(
        "Added {} hospitals, {} rescuers{}.",
        report.hospitals_added,
        report.rescuers_added,
        if report.operator_added {
            format!(", operator '{}'", config.admin_username)
        } else {
            String::new()
        }
    );

    Ok(())
}
