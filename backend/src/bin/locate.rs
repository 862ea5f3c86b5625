use std::{path::PathBuf, process::ExitCode};

use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vessel_tracker::{
    data::VesselRecord,
    routes::RouteTable,
    tracking::{estimate_position, PositionEstimate},
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Estimate a vessel's position along its lane"
)]
struct Args {
    /// Origin port, e.g. Ningbo or Shenzhen
    #[arg(long)]
    origin: String,

    /// Completed share of the journey (0.0 = departure, 1.0 = arrival)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    fraction: Option<f64>,

    /// Scheduled departure date (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,

    /// Scheduled arrival date (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,

    /// Date to estimate for, defaults to today
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Route table JSON, defaults to the built-in lanes
    #[arg(long)]
    routes: Option<PathBuf>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let table = match &args.routes {
        Some(path) => RouteTable::from_file(path)?,
        None => RouteTable::builtin()?,
    };

    let estimate = match (args.fraction, args.start, args.end) {
        (Some(fraction), _, _) => match table.locate(&args.origin, fraction)? {
            Some((route, position)) => PositionEstimate::UnderWay {
                route: route.name().to_string(),
                position,
            },
            None => PositionEstimate::Unknown,
        },
        (None, Some(start), Some(end)) => {
            let today = args
                .today
                .unwrap_or_else(|| chrono::Local::now().date_naive());
            let vessel = VesselRecord {
                vessel_id: "cli".into(),
                vessel_name: "cli".into(),
                initial_port: args.origin.clone(),
                start_date: start,
                dest_date: end,
            };
            let journey = vessel.journey();
            tracing::info!(
                "journey {} days, {} elapsed on {today}",
                journey.total_days(),
                journey.elapsed_days(today)
            );
            estimate_position(&table, &vessel, today)?
        }
        _ => return Err("either --fraction or --start and --end is required".into()),
    };

    match estimate {
        PositionEstimate::UnderWay { route, position } => {
            println!(
                "{} on {route} route: {:.6}, {:.6}",
                args.origin, position.lat, position.lon
            );
        }
        PositionEstimate::InPort(position) => {
            println!("{} in port: {:.6}, {:.6}", args.origin, position.lat, position.lon);
        }
        PositionEstimate::Unknown => {
            eprintln!("no route configured for origin {:?}", args.origin);
            return Ok(ExitCode::FAILURE);
        }
    }

    Ok(ExitCode::SUCCESS)
}
