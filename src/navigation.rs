//! Deep links that hand a planned route to external navigation apps.
//!
//! Navigation apps only accept an origin, a destination and a short list of
//! intermediate coordinates, then run their own router. To keep them on the
//! computed streets, a few "ghost" coordinates sampled from the route are
//! inserted between the real stops. Ghosts are only added when the route was
//! biased away from unpaved roads or is a round trip.

use serde::{Deserialize, Serialize};

use crate::config::Tuning;
use crate::model::OptimizedRoute;
use crate::polyline::Polyline;

/// Google Maps URLs accept at most this many waypoints.
pub const GOOGLE_MAPS_MAX_WAYPOINTS: usize = 9;

/// Longest URL Google Maps reliably accepts.
pub const GOOGLE_MAPS_MAX_URL_LEN: usize = 2048;

/// URL handed out when no route is available.
pub const PLACEHOLDER_URL: &str = "#";

const GOOGLE_MAPS_DIR_URL: &str = "https://www.google.com/maps/dir/?api=1";

/// Practical limits of a deep-link target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkLimits {
    pub max_waypoints: usize,
    pub max_url_len: usize,
}

impl Default for LinkLimits {
    fn default() -> Self {
        Self {
            max_waypoints: GOOGLE_MAPS_MAX_WAYPOINTS,
            max_url_len: GOOGLE_MAPS_MAX_URL_LEN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaypointKind {
    Stop,
    Ghost,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkWaypoint {
    pub location: (f64, f64),
    pub kind: WaypointKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationLink {
    pub url: String,
    pub origin: Option<(f64, f64)>,
    pub destination: Option<(f64, f64)>,
    pub waypoints: Vec<LinkWaypoint>,
}

impl NavigationLink {
    pub fn placeholder() -> Self {
        Self {
            url: PLACEHOLDER_URL.to_string(),
            origin: None,
            destination: None,
            waypoints: Vec::new(),
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.url != PLACEHOLDER_URL
    }

    pub fn ghost_count(&self) -> usize {
        self.waypoints
            .iter()
            .filter(|waypoint| waypoint.kind == WaypointKind::Ghost)
            .count()
    }

    /// Real stops between origin and destination, in order.
    pub fn stops(&self) -> Vec<(f64, f64)> {
        self.waypoints
            .iter()
            .filter(|waypoint| waypoint.kind == WaypointKind::Stop)
            .map(|waypoint| waypoint.location)
            .collect()
    }
}

/// Google Maps directions link for `route`.
///
/// Real stops always use their original coordinates. When the link would
/// exceed `limits`, ghosts per leg are reduced until it fits; real stops are
/// never dropped.
pub fn google_maps_link(
    route: Option<&OptimizedRoute>,
    avoid_unpaved: bool,
    tuning: &Tuning,
    limits: LinkLimits,
) -> NavigationLink {
    let Some(route) = route.filter(|route| route.waypoints.len() >= 2) else {
        return NavigationLink::placeholder();
    };

    let mut stops: Vec<(f64, f64)> = route
        .waypoints
        .iter()
        .map(|stop| stop.original_location())
        .collect();
    if route.round_trip {
        stops.push(stops[0]);
    }
    let origin = stops[0];
    let destination = stops[stops.len() - 1];

    let with_ghosts = avoid_unpaved || route.round_trip;
    let path = Polyline::new(route.path());

    let max_per_leg = if with_ghosts { tuning.ghost_points_per_leg } else { 0 };
    let mut per_leg = max_per_leg;
    loop {
        let waypoints = assemble_waypoints(&stops, &path, per_leg, tuning);
        let url = google_maps_url(origin, destination, &waypoints);
        let fits = waypoints.len() <= limits.max_waypoints && url.len() <= limits.max_url_len;
        if fits || per_leg == 0 {
            if !fits {
                tracing::warn!(
                    waypoints = waypoints.len(),
                    url_len = url.len(),
                    "stops alone exceed the navigation app's limits"
                );
            } else if per_leg < max_per_leg {
                tracing::debug!(per_leg, "ghost waypoints reduced to fit link limits");
            }
            return NavigationLink {
                url,
                origin: Some(origin),
                destination: Some(destination),
                waypoints,
            };
        }
        per_leg -= 1;
    }
}

/// Waze only navigates to a single coordinate.
pub fn waze_url(location: (f64, f64)) -> String {
    format!(
        "https://waze.com/ul?ll={},{}&navigate=yes",
        format_coord(location.0),
        format_coord(location.1)
    )
}

/// Intermediate waypoints for a stop sequence that includes origin and destination.
fn assemble_waypoints(
    stops: &[(f64, f64)],
    path: &Polyline,
    per_leg: usize,
    tuning: &Tuning,
) -> Vec<LinkWaypoint> {
    let last = stops.len() - 1;
    let mut waypoints = Vec::new();

    let mut previous = if per_leg > 0 {
        path.nearest_index_from(stops[0], 0, tuning.stop_match_tolerance_deg)
    } else {
        None
    };
    let mut search_from = previous.unwrap_or(0);

    for (index, stop) in stops.iter().enumerate().skip(1) {
        if per_leg > 0 {
            let matched = path.nearest_index_from(*stop, search_from, tuning.stop_match_tolerance_deg);
            match (previous, matched) {
                (Some(start), Some(end)) => {
                    waypoints.extend(
                        Polyline::interior_samples(start, end, per_leg, tuning.min_ghost_span)
                            .into_iter()
                            .map(|i| LinkWaypoint {
                                location: path.points()[i],
                                kind: WaypointKind::Ghost,
                            }),
                    );
                }
                _ => tracing::warn!(leg = index, "stop not matched on route, no ghosts for this leg"),
            }
            if let Some(end) = matched {
                search_from = end;
            }
            previous = matched.or(previous);
        }

        if index != last {
            waypoints.push(LinkWaypoint {
                location: *stop,
                kind: WaypointKind::Stop,
            });
        }
    }

    waypoints
}

fn google_maps_url(origin: (f64, f64), destination: (f64, f64), waypoints: &[LinkWaypoint]) -> String {
    let mut url = format!(
        "{}&origin={}&destination={}&travelmode=driving",
        GOOGLE_MAPS_DIR_URL,
        format_pair(origin),
        format_pair(destination)
    );
    if !waypoints.is_empty() {
        let joined = waypoints
            .iter()
            .map(|waypoint| format_pair(waypoint.location))
            .collect::<Vec<_>>()
            .join("|");
        url.push_str("&waypoints=");
        url.push_str(&joined);
    }
    url
}

fn format_pair((lat, lng): (f64, f64)) -> String {
    format!("{},{}", format_coord(lat), format_coord(lng))
}

fn format_coord(value: f64) -> String {
    format!("{:.6}", value)
}
