//! Server shared state
//!
//! Holds configuration, the map session handle and the lookup services
//! shared by the HTTP handlers.

use crate::config::Config;
use crate::error::Result;
use crate::geo::get_geocoder;
use crate::geo::nominatim::NominatimBackend;
use crate::place::PlaceResolver;
use crate::route::osrm::OsrmBackend;
use crate::route::RouteProvider;
use crate::session::{Notice, SessionHandle};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Notices kept for `/api/session`
const RECENT_NOTICE_LIMIT: usize = 50;

/// Shared state for the HTTP server
pub struct AppState {
    /// Configuration
    pub config: Arc<RwLock<Config>>,

    /// Handle to the running map session
    pub session: SessionHandle,

    pub resolver: PlaceResolver<NominatimBackend>,

    pub routes: RouteProvider<OsrmBackend>,

    /// Most recent notices, oldest first
    notices: RwLock<VecDeque<Notice>>,

    started_at: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, session: SessionHandle) -> Result<Self> {
        let resolver = PlaceResolver::new(get_geocoder(&config)?);
        let routes = RouteProvider::new(OsrmBackend::from_config(&config.services)?);
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            session,
            resolver,
            routes,
            notices: RwLock::new(VecDeque::with_capacity(RECENT_NOTICE_LIMIT)),
            started_at: Instant::now(),
        })
    }

    /// Remember a notice, dropping the oldest past the limit
    pub async fn record_notice(&self, notice: Notice) {
        let mut notices = self.notices.write().await;
        if notices.len() == RECENT_NOTICE_LIMIT {
            notices.pop_front();
        }
        notices.push_back(notice);
    }

    pub async fn recent_notices(&self) -> Vec<Notice> {
        self.notices.read().await.iter().cloned().collect()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Copy session notices into the state until the session ends
pub async fn collect_notices(state: Arc<AppState>, mut rx: mpsc::UnboundedReceiver<Notice>) {
    while let Some(notice) = rx.recv().await {
        state.record_notice(notice).await;
    }
    debug!("notice stream closed");
}
