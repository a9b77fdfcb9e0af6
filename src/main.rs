use anyhow::{bail, Context};
use clap::Parser;
use itinerary_engine::config::cli::{Command, ModeArg};
use itinerary_engine::core::{OwnerRef, ResolveMode};
use itinerary_engine::domain::model::DayPatch;
use itinerary_engine::utils::{logger, validation::Validate};
use itinerary_engine::{CliArgs, EngineConfig, InMemoryStore, ItineraryEngine, SeedData};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => EngineConfig::default(),
    };

    if config.logging.json {
        logger::init_json_logger(&config.logging.level);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        bail!(e);
    }

    let seed = SeedData::from_file(&args.seed)
        .with_context(|| format!("failed to load seed '{}'", args.seed.display()))?;

    let engine = ItineraryEngine::new(Arc::new(InMemoryStore::new()), &config);
    let directory = seed.apply(&engine).await.context("failed to apply seed data")?;

    match args.command {
        Command::Resolve { mode, destinations } => {
            let ids = directory.ids_of(&destinations)?;
            let mode = match mode {
                ModeArg::Pair => ResolveMode::Pair,
                ModeArg::Chain => ResolveMode::Chain,
            };
            let content = engine.resolve_content(&ids, mode).await?;
            if content.is_empty() {
                tracing::warn!("No combination content found for {:?}", destinations);
            }
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
        Command::Compose { title, days, stops, tour } => {
            let itinerary = match tour {
                Some(name) => {
                    let tours = engine.list_tours().await?;
                    let found = tours.iter().find(|t| t.name().eq_ignore_ascii_case(&name));
                    let Some(tour) = found else {
                        bail!("no seeded tour named '{}'", name);
                    };
                    let itinerary = engine.create_from_tour(tour.id, !stops.is_empty()).await?;
                    engine
                        .set_number_of_days(OwnerRef::Itinerary(itinerary.id), days)
                        .await?;
                    itinerary
                }
                None => engine.create_itinerary(title, days).await?,
            };
            let owner = OwnerRef::Itinerary(itinerary.id);

            for (day, names) in stops {
                let patch = DayPatch {
                    destination_ids: Some(directory.ids_of(&names)?),
                    ..Default::default()
                };
                engine.update_day(owner, day, patch).await?;
            }
            for (day, outcome) in engine.auto_fill_all(owner).await? {
                tracing::debug!("Day {}: {:?}", day, outcome);
            }

            let itinerary = engine.itinerary(itinerary.id).await?;
            let images = engine.resolve_images(owner).await?;
            let output = serde_json::json!({
                "itinerary": itinerary,
                "effective_return_date": itinerary.effective_return_date(),
                "images": images,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
