//! Test fixtures for stop-router.
//!
//! Provides:
//! - In-memory collaborators that record what the pipeline asked them
//! - Straight-line geometry builders
//! - Real stop locations around the Vale do Ribeira (from OpenStreetMap)

#![allow(dead_code)]

pub mod ribeira_locations;

pub use ribeira_locations::*;

use std::sync::Mutex;

use async_trait::async_trait;
use stop_router::config::PlanOptions;
use stop_router::error::ProviderError;
use stop_router::haversine::{BoundingBox, haversine_m};
use stop_router::model::{Address, Stop};
use stop_router::polyline::Polyline;
use stop_router::traits::{
    Geocoder, Intersection, Leg, Maneuver, PathProvider, PoiNode, PoiProvider, Step, TripOptimizer,
    TripResponse,
};

// ============================================================================
// Geometry
// ============================================================================

/// `n` evenly spaced points from `from` to `to`, both included.
pub fn straight(from: (f64, f64), to: (f64, f64), n: usize) -> Vec<(f64, f64)> {
    let last = (n.max(2) - 1) as f64;
    (0..n.max(2))
        .map(|i| {
            let t = i as f64 / last;
            (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t)
        })
        .collect()
}

/// One single-step leg per consecutive pair of `locations`.
pub fn straight_response(
    locations: &[(f64, f64)],
    points_per_leg: usize,
    road_name: &str,
    toll: Option<(usize, (f64, f64))>,
) -> TripResponse {
    let legs: Vec<Leg> = locations
        .windows(2)
        .enumerate()
        .map(|(index, pair)| {
            let distance = haversine_m(pair[0], pair[1]);
            let duration = distance / 15.0;
            let geometry = Polyline::new(straight(pair[0], pair[1], points_per_leg));
            let intersections = match toll {
                Some((leg, location)) if leg == index => vec![Intersection {
                    location,
                    classes: vec!["toll".to_string()],
                }],
                _ => Vec::new(),
            };
            Leg {
                steps: vec![Step {
                    name: road_name.to_string(),
                    geometry: geometry.clone(),
                    distance,
                    duration,
                    maneuver: Maneuver {
                        kind: "depart".to_string(),
                        location: Some(pair[0]),
                    },
                    intersections,
                }],
                distance,
                duration,
                geometry,
            }
        })
        .collect();

    let geometry = Polyline::concat(legs.iter().map(|leg| leg.geometry.points()));
    TripResponse {
        order: (0..locations.len()).collect(),
        distance: legs.iter().map(|leg| leg.distance).sum(),
        duration: legs.iter().map(|leg| leg.duration).sum(),
        legs,
        geometry,
    }
}

// ============================================================================
// Ordering Service
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum OptimizerCall {
    Optimize(Vec<(f64, f64)>, PlanOptions),
    Route(Vec<(f64, f64)>),
}

/// Answers with a fixed visiting order and straight-line legs.
pub struct MockOptimizer {
    order: Option<Vec<usize>>,
    points_per_leg: usize,
    road_name: String,
    toll: Option<(usize, (f64, f64))>,
    fail: bool,
    calls: Mutex<Vec<OptimizerCall>>,
}

impl MockOptimizer {
    /// Visits the stops in input order.
    pub fn new() -> Self {
        Self {
            order: None,
            points_per_leg: 100,
            road_name: "Rodovia Régis Bittencourt".to_string(),
            toll: None,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_order(mut self, order: Vec<usize>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_points_per_leg(mut self, n: usize) -> Self {
        self.points_per_leg = n;
        self
    }

    pub fn with_road_name(mut self, name: &str) -> Self {
        self.road_name = name.to_string();
        self
    }

    /// Flags a toll crossing on the `leg`th leg at `location`.
    pub fn with_toll(mut self, leg: usize, location: (f64, f64)) -> Self {
        self.toll = Some((leg, location));
        self
    }

    pub fn calls(&self) -> Vec<OptimizerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn route_calls(&self) -> Vec<Vec<(f64, f64)>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                OptimizerCall::Route(locations) => Some(locations),
                OptimizerCall::Optimize(..) => None,
            })
            .collect()
    }

    fn upstream_error() -> ProviderError {
        ProviderError::Upstream {
            code: "NoTrips".to_string(),
            message: "no trips found".to_string(),
        }
    }
}

#[async_trait]
impl TripOptimizer for MockOptimizer {
    async fn optimize(
        &self,
        locations: &[(f64, f64)],
        options: &PlanOptions,
    ) -> Result<TripResponse, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(OptimizerCall::Optimize(locations.to_vec(), *options));
        if self.fail {
            return Err(Self::upstream_error());
        }

        let order = self
            .order
            .clone()
            .unwrap_or_else(|| (0..locations.len()).collect());
        let mut visited: Vec<(f64, f64)> = order.iter().map(|&index| locations[index]).collect();
        if options.round_trip {
            visited.push(locations[0]);
        }

        let mut response =
            straight_response(&visited, self.points_per_leg, &self.road_name, self.toll);
        response.order = order;
        Ok(response)
    }

    async fn route(&self, locations: &[(f64, f64)]) -> Result<TripResponse, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(OptimizerCall::Route(locations.to_vec()));
        if self.fail {
            return Err(Self::upstream_error());
        }
        Ok(straight_response(
            locations,
            self.points_per_leg,
            &self.road_name,
            self.toll,
        ))
    }
}

// ============================================================================
// Path-fidelity service
// ============================================================================

/// Draws straight legs under its own road name, or fails.
pub struct MockPathProvider {
    road_name: String,
    fail: bool,
    calls: Mutex<Vec<(Vec<(f64, f64)>, bool)>>,
}

impl MockPathProvider {
    pub fn new(road_name: &str) -> Self {
        Self {
            road_name: road_name.to_string(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("")
        }
    }

    pub fn calls(&self) -> Vec<(Vec<(f64, f64)>, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PathProvider for MockPathProvider {
    async fn path(
        &self,
        locations: &[(f64, f64)],
        avoid_unpaved: bool,
    ) -> Result<TripResponse, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((locations.to_vec(), avoid_unpaved));
        if self.fail {
            return Err(ProviderError::Upstream {
                code: "403".to_string(),
                message: "quota exceeded".to_string(),
            });
        }
        Ok(straight_response(locations, 50, &self.road_name, None))
    }
}

// ============================================================================
// Point-of-interest service
// ============================================================================

pub struct MockPoiProvider {
    nodes: Result<Vec<PoiNode>, String>,
    queries: Mutex<Vec<BoundingBox>>,
}

impl MockPoiProvider {
    pub fn empty() -> Self {
        Self::with_nodes(Vec::new())
    }

    pub fn with_nodes(nodes: Vec<PoiNode>) -> Self {
        Self {
            nodes: Ok(nodes),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            nodes: Err("runtime error: query timed out".to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<BoundingBox> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PoiProvider for MockPoiProvider {
    async fn toll_booths(&self, bbox: BoundingBox) -> Result<Vec<PoiNode>, ProviderError> {
        self.queries.lock().unwrap().push(bbox);
        self.nodes.clone().map_err(ProviderError::InvalidResponse)
    }
}

pub fn toll_booth(location: (f64, f64), name: &str) -> PoiNode {
    PoiNode {
        location,
        name: Some(name.to_string()),
        operator: Some("Arteris".to_string()),
    }
}

// ============================================================================
// Geocoder
// ============================================================================

pub struct MockGeocoder {
    city: Option<String>,
    fail: bool,
}

impl MockGeocoder {
    pub fn in_city(city: &str) -> Self {
        Self {
            city: Some(city.to_string()),
            fail: false,
        }
    }

    pub fn unknown() -> Self {
        Self {
            city: None,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            city: None,
            fail: true,
        }
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<Stop>, ProviderError> {
        if self.fail {
            return Err(ProviderError::InvalidResponse("search failed".to_string()));
        }
        Ok(vec![Stop::new(query, REGISTRO.coords())])
    }

    async fn reverse(&self, _location: (f64, f64)) -> Result<Option<Address>, ProviderError> {
        if self.fail {
            return Err(ProviderError::InvalidResponse("reverse failed".to_string()));
        }
        Ok(self.city.as_ref().map(|city| Address {
            city: Some(city.clone()),
            ..Address::default()
        }))
    }
}

// ============================================================================
// Stops
// ============================================================================

/// Stops named `S0..` at `points`.
pub fn stops_at(points: &[(f64, f64)]) -> Vec<Stop> {
    points
        .iter()
        .enumerate()
        .map(|(i, point)| Stop::new(format!("S{}", i), *point))
        .collect()
}

pub fn stop(location: &Location) -> Stop {
    Stop::new(location.name, location.coords())
}
