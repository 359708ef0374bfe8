//! Search command handler
//!
//! Resolves a place name through the local table and the geocoder.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::geo::get_geocoder;
use crate::place::{PlaceResolver, PlaceSource};
use clap::Args;

/// Search command arguments
#[derive(Args)]
pub struct SearchArgs {
    /// Place name in any supported script
    pub query: String,

    /// Only consult the built-in place table
    #[arg(long)]
    pub local_only: bool,

    /// Print the match as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the search command
pub async fn run(args: SearchArgs) -> Result<()> {
    let config = Config::load()?;
    let resolver = PlaceResolver::new(get_geocoder(&config)?);

    let result = if args.local_only {
        resolver.resolve_local(&args.query).ok_or_else(|| Error::NotFound {
            query: args.query.clone(),
            suggestions: resolver.suggestions(&args.query),
        })
    } else {
        resolver.resolve(&args.query).await
    };

    match result {
        Ok(place) if args.json => println!("{}", serde_json::to_string_pretty(&place)?),
        Ok(place) => {
            let source = match place.source {
                PlaceSource::Local => "local table",
                PlaceSource::Remote => "geocoder",
            };
            println!("{}", place.display_name);
            println!("  {} ({})", place.coordinate, source);
        }
        Err(Error::NotFound { query, suggestions }) => {
            eprintln!("No place found for '{}'", query);
            if !suggestions.is_empty() {
                eprintln!("Did you mean: {}", suggestions.join(", "));
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e),
    }

    Ok(())
}
