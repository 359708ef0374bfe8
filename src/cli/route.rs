//! Route command handler
//!
//! Plans a route from an origin to a destination and prints it in the
//! requested format.

use crate::config::Config;
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::format::url::UrlFormatter;
use crate::format::{available_formats, get_formatter, RouteReport};
use crate::geo::ip_location::IpLocator;
use crate::geo::{get_geocoder, GeolocationWatcher, LocationProvider};
use crate::place::PlaceResolver;
use crate::route::osrm::OsrmBackend;
use crate::route::RouteProvider;
use clap::Args;
use tracing::warn;

/// Route command arguments
#[derive(Args)]
pub struct RouteArgs {
    /// Destination as "lng,lat"
    #[arg(long, allow_hyphen_values = true, conflicts_with = "to_place")]
    pub to: Option<Coordinate>,

    /// Destination place name
    #[arg(long)]
    pub to_place: Option<String>,

    /// Origin as "lng,lat" (default: configured fallback origin)
    #[arg(long, allow_hyphen_values = true, conflicts_with = "here")]
    pub from: Option<Coordinate>,

    /// Use current location (IP geolocation) as the origin
    #[arg(long)]
    pub here: bool,

    /// Output format
    #[arg(long, short = 'f', default_value = "text")]
    pub format: String,

    /// URL provider for the url format
    #[arg(long)]
    pub provider: Option<String>,

    /// Write output to file
    #[arg(long, short = 'o')]
    pub output: Option<String>,

    /// List available formats
    #[arg(short = 'F', long = "list-formats")]
    pub list_formats: bool,
}

/// Run the route command
pub async fn run(args: RouteArgs) -> Result<()> {
    if args.list_formats {
        list_formats();
        return Ok(());
    }

    let config = Config::load()?;

    let (destination, destination_name) = match (&args.to, &args.to_place) {
        (Some(coord), _) => (*coord, None),
        (None, Some(query)) => {
            let resolver = PlaceResolver::new(get_geocoder(&config)?);
            match resolver.resolve(query).await {
                Ok(place) => {
                    eprintln!("Destination: {} ({})", place.display_name, place.coordinate);
                    (place.coordinate, Some(place.display_name))
                }
                Err(Error::NotFound { query, suggestions }) => {
                    eprintln!("Error: Could not find '{}'", query);
                    if !suggestions.is_empty() {
                        eprintln!("Did you mean: {}", suggestions.join(", "));
                    }
                    std::process::exit(1);
                }
                Err(e) => return Err(e),
            }
        }
        (None, None) => {
            eprintln!("Error: No destination specified. Use --to or --to-place");
            std::process::exit(1);
        }
    };

    let origin = match args.from {
        Some(coord) => coord,
        None if args.here => {
            let watcher = GeolocationWatcher::new(
                LocationProvider::Ip(IpLocator::new()),
                config.location.timeout(),
            );
            match watcher.acquire_once().await {
                Ok(coord) => {
                    eprintln!("Using IP location: {}", coord);
                    coord
                }
                Err(e) => {
                    warn!(error = %e, "position unavailable, using fallback origin");
                    eprintln!("Location unavailable ({}), using default origin", e);
                    config.map.fallback_origin
                }
            }
        }
        None => config.map.fallback_origin,
    };

    let formatter = get_formatter(&args.format)
        .ok_or_else(|| Error::Config(format!("Unknown format: {}", args.format)))?;

    let routes = RouteProvider::new(OsrmBackend::from_config(&config.services)?);
    let route = routes.get_route(origin, destination).await;
    if route.is_fallback {
        eprintln!("Routing service unavailable, showing straight line");
    }

    let report = RouteReport::new(origin, destination, destination_name, route);
    let output = match args.provider.as_deref() {
        Some(provider) if formatter.name() == "url" => {
            UrlFormatter.format_with_provider(&report, &config, Some(provider))?
        }
        _ => formatter.format(&report, &config)?,
    };

    if let Some(path) = args.output {
        std::fs::write(&path, &output)?;
        eprintln!("Output written to {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}

/// Print available output formats
fn list_formats() {
    println!("Available output formats:");
    for format in available_formats() {
        println!("  {:<6} - {}", format.name, format.description);
    }
}
