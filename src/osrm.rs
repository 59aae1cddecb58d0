//! OSRM HTTP adapter for trip ordering and fixed-order routing.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};

use crate::config::{OsrmConfig, PlanOptions};
use crate::error::ProviderError;
use crate::polyline::Polyline;
use crate::traits::{Intersection, Leg, Maneuver, Step, TripOptimizer, TripResponse};

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// The trip service only orders freely with `roundtrip=true`; one-way
    /// trips drop the closing leg in [`normalize_trip`].
    fn trip_url(&self, locations: &[(f64, f64)], options: &PlanOptions) -> String {
        let mut url = format!(
            "{}/trip/v1/{}/{}?source=first&roundtrip=true&overview=full&geometries=geojson&steps=true",
            self.config.base_url,
            self.config.profile,
            coordinate_path(locations),
        );
        // Needs a profile that defines the `unpaved` exclude class.
        if options.avoid_unpaved && !options.round_trip {
            url.push_str("&exclude=ferry,unpaved");
        }
        url
    }

    fn route_url(&self, locations: &[(f64, f64)]) -> String {
        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson&steps=true",
            self.config.base_url,
            self.config.profile,
            coordinate_path(locations)
        )
    }

    async fn fetch<T: DeserializeOwned>(&self, url: String) -> Result<T, ProviderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        // OSRM reports failures such as `NoTrips` as JSON bodies on 4xx.
        match response.json::<T>().await {
            Ok(body) => Ok(body),
            Err(err) if status.is_success() => Err(err.into()),
            Err(_) => Err(ProviderError::Upstream {
                code: status.as_str().to_string(),
                message: "routing service returned a non-JSON error".to_string(),
            }),
        }
    }
}

#[async_trait]
impl TripOptimizer for OsrmClient {
    #[tracing::instrument(skip(self, locations), fields(stops = locations.len()))]
    async fn optimize(
        &self,
        locations: &[(f64, f64)],
        options: &PlanOptions,
    ) -> Result<TripResponse, ProviderError> {
        let body: OsrmTripBody = self.fetch(self.trip_url(locations, options)).await?;
        normalize_trip(body, locations.len(), options.round_trip)
    }

    #[tracing::instrument(skip(self, locations), fields(stops = locations.len()))]
    async fn route(&self, locations: &[(f64, f64)]) -> Result<TripResponse, ProviderError> {
        let body: OsrmRouteBody = self.fetch(self.route_url(locations)).await?;
        normalize_route(body, locations.len())
    }
}

fn coordinate_path(locations: &[(f64, f64)]) -> String {
    locations
        .iter()
        .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
        .collect::<Vec<_>>()
        .join(";")
}

fn check_code(code: &str, message: Option<String>) -> Result<(), ProviderError> {
    if code == "Ok" {
        Ok(())
    } else {
        Err(ProviderError::Upstream {
            code: code.to_string(),
            message: message.unwrap_or_default(),
        })
    }
}

fn normalize_trip(
    body: OsrmTripBody,
    requested: usize,
    round_trip: bool,
) -> Result<TripResponse, ProviderError> {
    check_code(&body.code, body.message)?;

    let trip = body.trips.into_iter().next().ok_or_else(|| ProviderError::Upstream {
        code: "NoTrips".to_string(),
        message: "no trip returned".to_string(),
    })?;

    // Disconnected inputs are split into several trips; only the first counts.
    let covered = body
        .waypoints
        .iter()
        .filter(|waypoint| waypoint.trips_index == 0)
        .count();
    if body.waypoints.len() < requested || covered < requested {
        return Err(ProviderError::Incomplete {
            requested,
            returned: covered,
        });
    }

    let mut order = vec![usize::MAX; requested];
    for (input_index, waypoint) in body.waypoints.iter().enumerate().take(requested) {
        match order.get_mut(waypoint.waypoint_index) {
            Some(slot) => *slot = input_index,
            None => {
                return Err(ProviderError::InvalidResponse(format!(
                    "waypoint index {} out of range",
                    waypoint.waypoint_index
                )));
            }
        }
    }

    let mut response = convert_route(trip, order);
    check_legs(&response, requested, requested)?;
    response.validate_order(requested)?;
    if !round_trip {
        drop_closing_leg(&mut response);
    }
    Ok(response)
}

/// Turns a closed trip into an open one ending at the last visited stop.
fn drop_closing_leg(response: &mut TripResponse) {
    if let Some(closing) = response.legs.pop() {
        response.distance = (response.distance - closing.distance).max(0.0);
        response.duration = (response.duration - closing.duration).max(0.0);
    }
    response.geometry = Polyline::concat(response.legs.iter().map(|leg| leg.geometry.points()));
}

fn normalize_route(body: OsrmRouteBody, requested: usize) -> Result<TripResponse, ProviderError> {
    check_code(&body.code, body.message)?;

    if body.waypoints.len() < requested {
        return Err(ProviderError::Incomplete {
            requested,
            returned: body.waypoints.len(),
        });
    }

    let route = body.routes.into_iter().next().ok_or_else(|| ProviderError::Upstream {
        code: "NoRoute".to_string(),
        message: "no route returned".to_string(),
    })?;

    let response = convert_route(route, (0..requested).collect());
    check_legs(&response, requested.saturating_sub(1), requested)?;
    Ok(response)
}

fn check_legs(response: &TripResponse, expected: usize, requested: usize) -> Result<(), ProviderError> {
    if response.legs.len() < expected {
        return Err(ProviderError::Incomplete {
            requested,
            returned: requested - (expected - response.legs.len()),
        });
    }
    Ok(())
}

fn convert_route(route: OsrmRoute, order: Vec<usize>) -> TripResponse {
    TripResponse {
        order,
        legs: route.legs.into_iter().map(convert_leg).collect(),
        distance: route.distance,
        duration: route.duration,
        geometry: route.geometry.map(|g| g.into_polyline()).unwrap_or_default(),
    }
}

fn convert_leg(leg: OsrmLeg) -> Leg {
    let steps: Vec<Step> = leg.steps.into_iter().map(convert_step).collect();
    // OSRM has no leg-level geometry; stitch it from the steps.
    let geometry = Polyline::concat(steps.iter().map(|step| step.geometry.points()));
    Leg {
        steps,
        distance: leg.distance,
        duration: leg.duration,
        geometry,
    }
}

fn convert_step(step: OsrmStep) -> Step {
    Step {
        name: step.name,
        geometry: step.geometry.map(|g| g.into_polyline()).unwrap_or_default(),
        distance: step.distance,
        duration: step.duration,
        maneuver: step
            .maneuver
            .map(|maneuver| Maneuver {
                kind: maneuver.kind,
                location: lng_lat(&maneuver.location),
            })
            .unwrap_or_default(),
        intersections: step
            .intersections
            .into_iter()
            .filter_map(|intersection| {
                Some(Intersection {
                    location: lng_lat(&intersection.location)?,
                    classes: intersection.classes,
                })
            })
            .collect(),
    }
}

fn lng_lat(pair: &[f64]) -> Option<(f64, f64)> {
    match pair {
        [lng, lat, ..] => Some((*lat, *lng)),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTripBody {
    code: String,
    message: Option<String>,
    #[serde(default)]
    waypoints: Vec<OsrmTripWaypoint>,
    #[serde(default)]
    trips: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmTripWaypoint {
    waypoint_index: usize,
    #[serde(default)]
    trips_index: usize,
}

#[derive(Debug, Deserialize)]
struct OsrmRouteBody {
    code: String,
    message: Option<String>,
    #[serde(default)]
    waypoints: Vec<IgnoredAny>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    geometry: Option<OsrmGeometry>,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

/// GeoJSON when requested; encoded polylines are ignored.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OsrmGeometry {
    GeoJson { coordinates: Vec<Vec<f64>> },
    Encoded(IgnoredAny),
}

impl OsrmGeometry {
    fn into_polyline(self) -> Polyline {
        match self {
            OsrmGeometry::GeoJson { coordinates } => Polyline::from_lng_lat(&coordinates),
            OsrmGeometry::Encoded(_) => Polyline::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    #[serde(default)]
    name: String,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    geometry: Option<OsrmGeometry>,
    maneuver: Option<OsrmManeuver>,
    #[serde(default)]
    intersections: Vec<OsrmIntersection>,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    location: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct OsrmIntersection {
    #[serde(default)]
    location: Vec<f64>,
    #[serde(default)]
    classes: Vec<String>,
}
