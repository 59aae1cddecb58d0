//! Planning options, tunable thresholds and provider endpoints.

use std::env;

use serde::{Deserialize, Serialize};

/// A destination more than this factor farther than the last one triggers
/// the closest-first reversal of a round trip.
pub const CLOSEST_FIRST_RATIO: f64 = 1.2;

/// Toll candidates closer than this are the same physical toll.
pub const TOLL_MERGE_RADIUS_M: f64 = 200.0;

/// Margin added around the stops' bounding box for the toll POI query.
pub const TOLL_SEARCH_MARGIN_DEG: f64 = 0.05;

/// Max distance between a POI toll and a route vertex (~100 m).
pub const TOLL_ON_ROUTE_TOLERANCE_DEG: f64 = 0.001;

/// Route polylines longer than this are sampled when checking POI tolls.
pub const DENSE_POLYLINE_LEN: usize = 2000;

/// Vertex stride used on dense polylines.
pub const DENSE_POLYLINE_STRIDE: usize = 5;

/// Ghost waypoints sampled per leg at most.
pub const GHOST_POINTS_PER_LEG: usize = 2;

/// Legs with fewer polyline vertices than this get no ghost waypoints.
pub const MIN_GHOST_SPAN: usize = 10;

/// Max distance between a stop and its matched route vertex (~500 m).
pub const STOP_MATCH_TOLERANCE_DEG: f64 = 0.005;

/// Reverse-geocoding requests in flight at once while labeling tolls.
///
/// The public Nominatim instance allows one request at a time and about one
/// per second; raise this only for a self-hosted instance.
pub const GEOCODE_CONCURRENCY: usize = 1;

/// Which collaborator draws the path once the order is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathFidelity {
    /// Geometry from the ordering service.
    #[default]
    Standard,
    /// Geometry from the path-fidelity service when unpaved roads are avoided.
    HighFidelity,
}

/// Per-request preferences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOptions {
    pub round_trip: bool,
    pub avoid_unpaved: bool,
    pub path_fidelity: PathFidelity,
}

impl PlanOptions {
    /// Whether the path-fidelity service should draw this route.
    pub fn wants_high_fidelity_path(&self) -> bool {
        self.avoid_unpaved && self.path_fidelity == PathFidelity::HighFidelity
    }
}

/// Empirical thresholds used by the pipeline stages.
#[derive(Debug, Clone)]
pub struct Tuning {
    pub closest_first_ratio: f64,
    pub toll_merge_radius_m: f64,
    pub toll_search_margin_deg: f64,
    pub toll_on_route_tolerance_deg: f64,
    pub dense_polyline_len: usize,
    pub dense_polyline_stride: usize,
    pub ghost_points_per_leg: usize,
    pub min_ghost_span: usize,
    pub stop_match_tolerance_deg: f64,
    pub geocode_concurrency: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            closest_first_ratio: CLOSEST_FIRST_RATIO,
            toll_merge_radius_m: TOLL_MERGE_RADIUS_M,
            toll_search_margin_deg: TOLL_SEARCH_MARGIN_DEG,
            toll_on_route_tolerance_deg: TOLL_ON_ROUTE_TOLERANCE_DEG,
            dense_polyline_len: DENSE_POLYLINE_LEN,
            dense_polyline_stride: DENSE_POLYLINE_STRIDE,
            ghost_points_per_leg: GHOST_POINTS_PER_LEG,
            min_ghost_span: MIN_GHOST_SPAN,
            stop_match_tolerance_deg: STOP_MATCH_TOLERANCE_DEG,
            geocode_concurrency: GEOCODE_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://router.project-osrm.org".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrsConfig {
    pub base_url: String,
    pub profile: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl OrsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openrouteservice.org".to_string(),
            profile: "driving-car".to_string(),
            api_key: api_key.into(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverpassConfig {
    pub url: String,
    /// Server-side query timeout, in seconds.
    pub query_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            url: "https://overpass-api.de/api/interpreter".to_string(),
            query_timeout_secs: 5,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying user agent.
    pub user_agent: String,
    pub search_limit: usize,
    pub timeout_secs: u64,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("stop-router/", env!("CARGO_PKG_VERSION")).to_string(),
            search_limit: 10,
            timeout_secs: 10,
        }
    }
}

/// Endpoints for every external collaborator.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub osrm: OsrmConfig,
    /// Only present when an API key is configured.
    pub ors: Option<OrsConfig>,
    pub overpass: OverpassConfig,
    pub nominatim: NominatimConfig,
}

impl ServiceConfig {
    /// Reads endpoints from the environment, keeping defaults for unset variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let timeout = lookup("HTTP_TIMEOUT_SECS").and_then(|value| value.parse::<u64>().ok());

        if let Some(url) = lookup("OSRM_BASE_URL") {
            config.osrm.base_url = url;
        }
        if let Some(profile) = lookup("OSRM_PROFILE") {
            config.osrm.profile = profile;
        }
        config.ors = lookup("ORS_API_KEY")
            .filter(|key| !key.is_empty())
            .map(OrsConfig::new);
        if let Some(url) = lookup("OVERPASS_URL") {
            config.overpass.url = url;
        }
        if let Some(url) = lookup("NOMINATIM_URL") {
            config.nominatim.base_url = url;
        }
        if let Some(agent) = lookup("NOMINATIM_USER_AGENT") {
            config.nominatim.user_agent = agent;
        }

        if let Some(secs) = timeout {
            config.osrm.timeout_secs = secs;
            config.overpass.timeout_secs = secs;
            config.nominatim.timeout_secs = secs;
            if let Some(ors) = config.ors.as_mut() {
                ors.timeout_secs = secs;
            }
        }

        config
    }
}
