//! Simulate command handler
//!
//! Drives a headless map session from a TOML script of intent changes and
//! reports the notices it produced, the final session snapshot and every
//! call made against the surface.
//!
//! ```toml
//! [[step]]
//! destination = "tokyo tower"
//! navigate = true
//! wait_ms = 2000
//!
//! [[step]]
//! style = "satellite"
//! buildings = false
//! ```

use crate::config::Config;
use crate::error::{Error, Result};
use crate::geo::get_geocoder;
use crate::place::{PlaceMatch, PlaceResolver};
use crate::session::{HeadlessRuntime, MapIntent, Notice, NoticeLevel, SessionSnapshot};
use crate::surface::SurfaceCall;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const DEFAULT_WAIT_MS: u64 = 500;

/// Simulate command arguments
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to the script file
    pub script: String,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,
}

/// A sequence of intent changes
#[derive(Debug, Default, Deserialize)]
pub struct Script {
    #[serde(default, rename = "step")]
    pub steps: Vec<ScriptStep>,
}

/// One intent change; unset fields keep their previous value
#[derive(Debug, Deserialize)]
pub struct ScriptStep {
    pub style: Option<crate::session::StyleId>,
    pub buildings: Option<bool>,
    /// Place query resolved before the intent is applied
    pub destination: Option<String>,
    #[serde(default)]
    pub clear_destination: bool,
    pub navigate: Option<bool>,
    /// Time to let the session work before the next step
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
}

fn default_wait_ms() -> u64 {
    DEFAULT_WAIT_MS
}

impl Script {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid script: {}", e)))
    }
}

/// Everything observed during a simulation
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub notices: Vec<Notice>,
    pub snapshot: SessionSnapshot,
    pub surface_calls: Vec<SurfaceCall>,
}

/// Intent after applying `step` to `current`
///
/// `found` is the resolved destination when the step named one.
pub fn next_intent(current: &MapIntent, step: &ScriptStep, found: Option<PlaceMatch>) -> MapIntent {
    let mut intent = current.clone();
    if let Some(style) = step.style {
        intent.style = style;
    }
    if let Some(visible) = step.buildings {
        intent.buildings_visible = visible;
    }
    if step.clear_destination {
        intent.destination = None;
    }
    if found.is_some() {
        intent.destination = found;
    }
    if let Some(navigate) = step.navigate {
        intent.navigation_requested = navigate;
    }
    intent
}

/// Run the simulate command
pub async fn run(args: SimulateArgs) -> Result<()> {
    let config = Config::load()?;
    let script = Script::parse(&std::fs::read_to_string(&args.script)?)?;
    let resolver = PlaceResolver::new(get_geocoder(&config)?);

    let (runtime, handle, mut notice_rx) = HeadlessRuntime::headless(&config)?;
    info!(session = %runtime.session_id(), steps = script.steps.len(), "starting simulation");
    let session = tokio::spawn(runtime.run());

    let mut notices = Vec::new();
    let mut intent = handle.snapshot().intent;

    for (i, step) in script.steps.iter().enumerate() {
        let found = match &step.destination {
            Some(query) => match resolver.resolve(query).await {
                Ok(place) => Some(place),
                Err(Error::NotFound { query, suggestions }) => {
                    warn!(step = i + 1, %query, ?suggestions, "destination not found");
                    notices.push(Notice::error(format!("Could not find \"{}\"", query)));
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        intent = next_intent(&intent, step, found);
        handle.apply_intent(intent.clone())?;
        tokio::time::sleep(Duration::from_millis(step.wait_ms)).await;
        drain(&mut notice_rx, &mut notices, !args.json);
    }

    handle.shutdown()?;
    let surface = session
        .await
        .map_err(|e| Error::Surface(format!("session task failed: {}", e)))?;
    drain(&mut notice_rx, &mut notices, !args.json);

    let report = SimulationReport {
        notices,
        snapshot: handle.snapshot(),
        surface_calls: surface.calls().to_vec(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

/// Move queued notices into `notices`, echoing them when `echo` is set
fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>, notices: &mut Vec<Notice>, echo: bool) {
    while let Ok(notice) = rx.try_recv() {
        if echo {
            println!("{}", notice_line(&notice));
        }
        notices.push(notice);
    }
}

fn notice_line(notice: &Notice) -> String {
    let level = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Error => "error",
    };
    format!("[{:>5}] {}", level, notice.message)
}

fn print_summary(report: &SimulationReport) {
    let snapshot = &report.snapshot;
    println!();
    println!("Session {}", snapshot.session_id);
    println!("  Style:       {} ({:?})", snapshot.style, snapshot.phase);
    println!("  Buildings:   {:?}", snapshot.buildings);
    if let Some(location) = snapshot.user_location {
        println!("  Location:    {}", location);
    }
    match &snapshot.destination {
        Some(place) => println!("  Destination: {} ({})", place.display_name, place.coordinate),
        None => println!("  Destination: none"),
    }
    if let Some(route) = &snapshot.route {
        match (route.distance_km(), route.duration_minutes()) {
            (Some(km), Some(min)) => println!("  Route:       {:.1} km, {} min", km, min),
            _ => println!("  Route:       straight line"),
        }
    }
    println!("  Surface calls: {}", report.surface_calls.len());
    let errors = report.notices.iter().filter(|n| n.is_error()).count();
    println!("  Notices:     {} ({} errors)", report.notices.len(), errors);
}
