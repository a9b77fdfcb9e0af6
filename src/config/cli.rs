use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "itinerary-engine")]
#[command(about = "Compose itineraries against a seeded destination matrix")]
pub struct CliArgs {
    /// Seed file with destinations, combinations, defaults and catalog items
    #[arg(short, long)]
    pub seed: PathBuf,

    /// Engine configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve narrative content for a destination sequence
    Resolve {
        #[arg(long, value_enum, default_value_t = ModeArg::Chain)]
        mode: ModeArg,

        /// Destination names in travel order
        #[arg(required = true)]
        destinations: Vec<String>,
    },
    /// Build a draft itinerary, auto-fill it and print it as JSON
    Compose {
        #[arg(long, default_value = "Draft itinerary")]
        title: String,

        #[arg(long)]
        days: u32,

        /// Day stops as DAY=NAME,NAME (repeatable)
        #[arg(long = "stop", value_parser = parse_stop)]
        stops: Vec<(u32, Vec<String>)>,

        /// Clone this seeded tour instead of starting from scratch
        #[arg(long)]
        tour: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Pair,
    Chain,
}

fn parse_stop(value: &str) -> Result<(u32, Vec<String>), String> {
    let (day, names) = value
        .split_once('=')
        .ok_or_else(|| format!("expected DAY=NAME[,NAME...], got '{}'", value))?;
    let day: u32 = day
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a day number", day))?;
    let names: Vec<String> = names
        .split(',')
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return Err(format!("day {} has no destinations", day));
    }
    Ok((day, names))
}
