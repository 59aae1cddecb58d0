//! Stop ordering with the closest-first correction.

use crate::config::{PlanOptions, Tuning};
use crate::error::PlanError;
use crate::haversine::haversine_km;
use crate::model::Stop;
use crate::traits::{TripOptimizer, TripResponse};

/// Stops in visiting order together with the raw geometry for that order.
#[derive(Debug, Clone)]
pub struct OrderedTrip {
    /// Visiting order. `stops[0]` is the anchor.
    pub stops: Vec<Stop>,
    pub response: TripResponse,
    /// Whether the closest-first correction reversed the destinations.
    pub reversed: bool,
}

impl OrderedTrip {
    /// Locations to route through, closing the loop on round trips.
    pub fn route_locations(&self, round_trip: bool) -> Vec<(f64, f64)> {
        let mut locations: Vec<(f64, f64)> = self.stops.iter().map(Stop::location).collect();
        if round_trip {
            if let Some(anchor) = self.stops.first() {
                locations.push(anchor.location());
            }
        }
        locations
    }
}

/// Drops stops whose coordinates cannot be routed.
pub fn routable_stops(stops: &[Stop]) -> Vec<Stop> {
    stops
        .iter()
        .filter(|stop| stop.has_valid_location())
        .cloned()
        .collect()
}

/// Whether the first destination is far enough beyond the last one that the
/// loop should be driven the other way round.
pub fn should_reverse(ordered: &[Stop], round_trip: bool, ratio: f64) -> bool {
    if !round_trip || ordered.len() < 3 {
        return false;
    }
    let anchor = ordered[0].location();
    let to_first = haversine_km(anchor, ordered[1].location());
    let to_last = haversine_km(anchor, ordered[ordered.len() - 1].location());
    to_first > to_last * ratio
}

/// Requests a visiting order for `stops`, anchored at the first one.
///
/// A failed or incomplete answer from the optimizer fails the whole request.
#[tracing::instrument(skip_all, fields(stops = stops.len(), round_trip = options.round_trip))]
pub async fn order_stops(
    optimizer: &dyn TripOptimizer,
    stops: &[Stop],
    options: &PlanOptions,
    tuning: &Tuning,
) -> Result<OrderedTrip, PlanError> {
    let Some((anchor, destinations)) = stops.split_first() else {
        return Err(PlanError::InsufficientStops(0));
    };
    // The anchor is never dropped or replaced.
    if !anchor.has_valid_location() {
        return Err(PlanError::InvalidAnchor);
    }
    let stops: Vec<Stop> = std::iter::once(anchor.clone())
        .chain(routable_stops(destinations))
        .collect();
    if stops.len() < 2 {
        return Err(PlanError::InsufficientStops(stops.len()));
    }

    let locations: Vec<(f64, f64)> = stops.iter().map(Stop::location).collect();
    let response = optimizer.optimize(&locations, options).await?;
    response.validate_order(stops.len())?;

    let mut order = response.order.clone();
    let mut ordered: Vec<Stop> = order.iter().map(|&index| stops[index].clone()).collect();
    tracing::debug!(?order, "optimizer order");

    if !should_reverse(&ordered, options.round_trip, tuning.closest_first_ratio) {
        return Ok(OrderedTrip {
            stops: ordered,
            response,
            reversed: false,
        });
    }

    ordered[1..].reverse();
    order[1..].reverse();
    tracing::info!(?order, "closest destination moved first, re-requesting geometry");

    let trip = OrderedTrip {
        stops: ordered,
        response: TripResponse::default(),
        reversed: true,
    };
    let mut response = optimizer.route(&trip.route_locations(true)).await?;
    response.order = order;

    Ok(OrderedTrip { response, ..trip })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops(points: &[(f64, f64)]) -> Vec<Stop> {
        points
            .iter()
            .enumerate()
            .map(|(i, point)| Stop::new(format!("S{}", i), *point))
            .collect()
    }

    #[test]
    fn test_reverse_when_first_is_much_farther() {
        // ~50 km north first, ~5 km east last.
        let ordered = stops(&[(0.0, 0.0), (0.45, 0.0), (0.0, 0.045)]);
        assert!(should_reverse(&ordered, true, 1.2));
        assert!(!should_reverse(&ordered, false, 1.2));
    }

    #[test]
    fn test_no_reverse_within_ratio() {
        let ordered = stops(&[(0.0, 0.0), (0.11, 0.0), (0.0, 0.1)]);
        assert!(!should_reverse(&ordered, true, 1.2));
    }

    #[test]
    fn test_no_reverse_with_single_destination() {
        let ordered = stops(&[(0.0, 0.0), (1.0, 0.0)]);
        assert!(!should_reverse(&ordered, true, 1.2));
    }

    #[test]
    fn test_routable_stops_filters_invalid() {
        let input = stops(&[(0.0, 0.0), (f64::NAN, 1.0), (91.0, 0.0), (1.0, 1.0)]);
        let kept = routable_stops(&input);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].name, "S3");
    }

    #[test]
    fn test_route_locations_close_the_loop() {
        let trip = OrderedTrip {
            stops: stops(&[(0.0, 0.0), (1.0, 1.0)]),
            response: TripResponse::default(),
            reversed: false,
        };
        assert_eq!(trip.route_locations(false).len(), 2);
        assert_eq!(trip.route_locations(true), vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
    }
}
