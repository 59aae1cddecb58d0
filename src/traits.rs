//! Collaborator interfaces and the canonical route response.
//!
//! Every routing provider adapter normalizes its payload into
//! [`TripResponse`] at the boundary; pipeline stages never see
//! provider-specific shapes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::PlanOptions;
use crate::error::ProviderError;
use crate::haversine::BoundingBox;
use crate::model::{Address, Stop};
use crate::polyline::Polyline;

/// Maneuver kind some providers use for toll booths.
pub const TOLL_BOOTH_MANEUVER: &str = "toll_booth";

/// Intersection class marking a toll.
pub const TOLL_CLASS: &str = "toll";

/// Normalized routing response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripResponse {
    /// Input index of the stop visited at each position. `order[0]` is the anchor.
    pub order: Vec<usize>,
    pub legs: Vec<Leg>,
    /// Meters, as reported by the provider.
    pub distance: f64,
    /// Seconds, as reported by the provider.
    pub duration: f64,
    /// Overview geometry of the whole trip.
    pub geometry: Polyline,
}

impl TripResponse {
    /// Checks that `order` is a permutation of `requested` stops starting at the anchor.
    pub fn validate_order(&self, requested: usize) -> Result<(), ProviderError> {
        if self.order.len() < requested {
            return Err(ProviderError::Incomplete {
                requested,
                returned: self.order.len(),
            });
        }

        let mut seen = vec![false; requested];
        for &index in &self.order {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(ProviderError::InvalidResponse(format!(
                        "order {:?} is not a permutation of {} stops",
                        self.order, requested
                    )));
                }
            }
        }

        if self.order.first() != Some(&0) {
            return Err(ProviderError::InvalidResponse(
                "order does not start at the anchor".to_string(),
            ));
        }

        Ok(())
    }
}

/// Route between two consecutive visited stops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub steps: Vec<Step>,
    pub distance: f64,
    pub duration: f64,
    /// Leg-level geometry, used when no steps are present.
    pub geometry: Polyline,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Road name.
    pub name: String,
    pub geometry: Polyline,
    pub distance: f64,
    pub duration: f64,
    pub maneuver: Maneuver,
    pub intersections: Vec<Intersection>,
}

impl Step {
    /// Whether the provider flagged this step as crossing a toll.
    pub fn is_toll(&self) -> bool {
        self.maneuver.kind == TOLL_BOOTH_MANEUVER
            || self
                .intersections
                .iter()
                .any(|intersection| intersection.classes.iter().any(|class| class == TOLL_CLASS))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    pub kind: String,
    pub location: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    pub location: (f64, f64),
    pub classes: Vec<String>,
}

/// A point of interest returned by a spatial query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiNode {
    pub location: (f64, f64),
    pub name: Option<String>,
    pub operator: Option<String>,
}

/// Computes a visiting order starting at the first location.
#[async_trait]
pub trait TripOptimizer: Send + Sync {
    /// Approximate travelling-salesperson order anchored at `locations[0]`.
    async fn optimize(
        &self,
        locations: &[(f64, f64)],
        options: &PlanOptions,
    ) -> Result<TripResponse, ProviderError>;

    /// Geometry for a fixed order. No reordering; `order` is the identity.
    async fn route(&self, locations: &[(f64, f64)]) -> Result<TripResponse, ProviderError>;
}

/// Draws a path through already ordered locations.
#[async_trait]
pub trait PathProvider: Send + Sync {
    async fn path(
        &self,
        locations: &[(f64, f64)],
        avoid_unpaved: bool,
    ) -> Result<TripResponse, ProviderError>;
}

/// Spatial lookup of toll booths.
#[async_trait]
pub trait PoiProvider: Send + Sync {
    async fn toll_booths(&self, bbox: BoundingBox) -> Result<Vec<PoiNode>, ProviderError>;
}

/// Forward and reverse geocoding.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidate stops for a free-text query.
    async fn search(&self, query: &str) -> Result<Vec<Stop>, ProviderError>;

    /// Address enclosing `location`, if the provider knows one.
    async fn reverse(&self, location: (f64, f64)) -> Result<Option<Address>, ProviderError>;
}
