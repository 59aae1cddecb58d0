//! Toll detection along a planned route.
//!
//! The routing provider's toll flags are the primary signal. A point-of-interest
//! lookup adds named toll booths that lie on the route, and reverse geocoding
//! labels each toll with the place it is near. Failures of either lookup only
//! degrade the result.

use futures::StreamExt;
use futures::stream;
use rayon::prelude::*;

use crate::config::Tuning;
use crate::haversine::{BoundingBox, haversine_km, haversine_m};
use crate::model::{Address, Stop, TollDetail};
use crate::polyline::Polyline;
use crate::traits::{Geocoder, Leg, PoiNode, PoiProvider, TOLL_CLASS, TOLL_BOOTH_MANEUVER};

/// Where a toll candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TollSource {
    Router,
    PointOfInterest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TollCandidate {
    pub location: (f64, f64),
    pub name: Option<String>,
    pub operator: Option<String>,
    pub source: TollSource,
}

impl TollCandidate {
    fn from_router(location: (f64, f64)) -> Self {
        Self {
            location,
            name: None,
            operator: None,
            source: TollSource::Router,
        }
    }

    fn from_poi(node: PoiNode) -> Self {
        Self {
            location: node.location,
            name: node.name,
            operator: node.operator,
            source: TollSource::PointOfInterest,
        }
    }
}

/// Unnamed candidates for every step the router flagged as crossing a toll.
pub fn router_candidates(legs: &[Leg]) -> Vec<TollCandidate> {
    legs.iter()
        .flat_map(|leg| leg.steps.iter())
        .filter(|step| step.is_toll())
        .filter_map(|step| {
            let at_booth = (step.maneuver.kind == TOLL_BOOTH_MANEUVER)
                .then_some(step.maneuver.location)
                .flatten();
            let at_intersection = step
                .intersections
                .iter()
                .find(|intersection| intersection.classes.iter().any(|class| class == TOLL_CLASS))
                .map(|intersection| intersection.location);
            at_booth
                .or(at_intersection)
                .or(step.maneuver.location)
                .map(TollCandidate::from_router)
        })
        .collect()
}

/// Point-of-interest tolls that lie on the route.
pub fn on_route(nodes: Vec<PoiNode>, path: &Polyline, tuning: &Tuning) -> Vec<TollCandidate> {
    nodes
        .into_par_iter()
        .filter(|node| {
            path.passes_near(
                node.location,
                tuning.toll_on_route_tolerance_deg,
                tuning.dense_polyline_len,
                tuning.dense_polyline_stride,
            )
        })
        .map(TollCandidate::from_poi)
        .collect()
}

/// Collapses candidates closer than `radius_m` into one.
///
/// Point-of-interest candidates win over router flags, named ones over unnamed.
pub fn merge(candidates: Vec<TollCandidate>, radius_m: f64) -> Vec<TollCandidate> {
    let mut ranked = candidates;
    // Stable, so ties keep their original order.
    ranked.sort_by_key(|candidate| {
        (candidate.source == TollSource::Router, candidate.name.is_none())
    });

    let mut kept: Vec<TollCandidate> = Vec::new();
    for candidate in ranked {
        let duplicate = kept
            .iter()
            .any(|existing| haversine_m(existing.location, candidate.location) < radius_m);
        if !duplicate {
            kept.push(candidate);
        }
    }
    kept
}

/// Sorts candidates by where the route first passes them.
pub fn sort_along(candidates: &mut [TollCandidate], path: &Polyline) {
    candidates.sort_by_cached_key(|candidate| {
        path.nearest_index_from(candidate.location, 0, f64::INFINITY)
            .unwrap_or(usize::MAX)
    });
}

/// Label from a reverse-geocoded address.
pub fn locality_label(address: &Address) -> Option<String> {
    address
        .city
        .as_deref()
        .filter(|city| !city.is_empty())
        .map(|city| format!("Near {}", city))
}

/// Label from the nearest stop and the straight-line distance to it.
pub fn nearest_stop_label(location: (f64, f64), stops: &[Stop]) -> Option<String> {
    stops
        .iter()
        .map(|stop| (haversine_km(location, stop.location()), stop))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(km, stop)| format!("Approx. {} km from {}", km.round(), stop.short_label()))
}

/// Finds, de-duplicates and labels the tolls on a route. Never fails.
#[tracing::instrument(skip_all, fields(path_len = path.len()))]
pub async fn detect_tolls(
    legs: &[Leg],
    path: &Polyline,
    stops: &[Stop],
    pois: &dyn PoiProvider,
    geocoder: &dyn Geocoder,
    tuning: &Tuning,
) -> Vec<TollDetail> {
    let mut candidates = router_candidates(legs);

    if let Some(bbox) = BoundingBox::around(stops.iter().map(Stop::location)) {
        match pois.toll_booths(bbox.expand(tuning.toll_search_margin_deg)).await {
            Ok(nodes) => {
                let found = nodes.len();
                let accepted = on_route(nodes, path, tuning);
                tracing::debug!(found, accepted = accepted.len(), "toll booths near route");
                candidates.extend(accepted);
            }
            Err(err) => tracing::warn!(error = %err, "toll POI lookup failed, using router flags only"),
        }
    }

    let mut tolls = merge(candidates, tuning.toll_merge_radius_m);
    sort_along(&mut tolls, path);

    stream::iter(tolls.into_iter().map(|toll| label(toll, stops, geocoder)))
        .buffered(tuning.geocode_concurrency.max(1))
        .collect()
        .await
}

async fn label(toll: TollCandidate, stops: &[Stop], geocoder: &dyn Geocoder) -> TollDetail {
    let geocoded = match geocoder.reverse(toll.location).await {
        Ok(address) => address.as_ref().and_then(locality_label),
        Err(err) => {
            tracing::warn!(error = %err, "reverse geocoding failed for toll");
            None
        }
    };

    TollDetail {
        nearby: geocoded.or_else(|| nearest_stop_label(toll.location, stops)),
        location: toll.location,
        name: toll.name,
        operator: toll.operator,
    }
}
