//! Turns raw leg/step geometry into typed, directional route segments.

use crate::model::{Direction, RouteSegment, Stop, Surface};
use crate::traits::{Leg, Step, TripResponse};

/// Lower-case whole words, or word sequences, that mark a dirt or rural road.
///
/// Structured surface tags are rarely present in routing responses, so the
/// road name is the primary signal.
pub const UNPAVED_MARKERS: &[&str] = &[
    "de terra",
    "rural",
    "estrada de chão",
    "não pavimentada",
    "dirt road",
    "unpaved",
];

pub fn classify_surface(road_name: &str) -> Surface {
    let lowered = road_name.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    // Padded so markers only match on word boundaries.
    let name = format!(" {} ", words.join(" "));
    if UNPAVED_MARKERS
        .iter()
        .any(|marker| name.contains(&format!(" {} ", marker)))
    {
        Surface::Unpaved
    } else {
        Surface::Paved
    }
}

/// Whether the return leg is mirrored from the outbound one.
fn mirrors_return_leg(stop_count: usize, round_trip: bool) -> bool {
    round_trip && stop_count == 2
}

/// Legs whose geometry ends up in the segment list.
///
/// On a two-stop round trip the provider's return leg is discarded.
pub fn geometry_legs<'a>(response: &'a TripResponse, stops: &[Stop], round_trip: bool) -> &'a [Leg] {
    if mirrors_return_leg(stops.len(), round_trip) {
        &response.legs[..response.legs.len().min(1)]
    } else {
        &response.legs
    }
}

/// Flat, travel-ordered segment list for a routing response.
pub fn segment(response: &TripResponse, stops: &[Stop], round_trip: bool) -> Vec<RouteSegment> {
    let has_steps = response.legs.iter().any(|leg| !leg.steps.is_empty());
    if !has_steps {
        tracing::debug!("no step data, using overview geometry");
        return vec![RouteSegment {
            coordinates: response.geometry.points().to_vec(),
            surface: Surface::Paved,
            direction: Direction::Outbound,
            distance: response.distance,
            duration: response.duration,
        }];
    }

    if mirrors_return_leg(stops.len(), round_trip) {
        let outbound = leg_segments(&response.legs[0], Direction::Outbound);
        let inbound = mirror(&outbound);
        return outbound.into_iter().chain(inbound).collect();
    }

    let last = response.legs.len() - 1;
    response
        .legs
        .iter()
        .enumerate()
        .flat_map(|(index, leg)| {
            let direction = if round_trip && index == last {
                Direction::Inbound
            } else {
                Direction::Outbound
            };
            leg_segments(leg, direction)
        })
        .collect()
}

/// Sums segment distances and durations.
pub fn totals(segments: &[RouteSegment]) -> (f64, f64) {
    segments.iter().fold((0.0, 0.0), |(distance, duration), segment| {
        (distance + segment.distance, duration + segment.duration)
    })
}

fn leg_segments(leg: &Leg, direction: Direction) -> Vec<RouteSegment> {
    if leg.steps.is_empty() {
        return vec![RouteSegment {
            coordinates: leg.geometry.points().to_vec(),
            surface: Surface::Paved,
            direction,
            distance: leg.distance,
            duration: leg.duration,
        }];
    }
    leg.steps
        .iter()
        .map(|step| step_segment(step, direction))
        .collect()
}

fn step_segment(step: &Step, direction: Direction) -> RouteSegment {
    RouteSegment {
        coordinates: step.geometry.points().to_vec(),
        surface: classify_surface(&step.name),
        direction,
        distance: step.distance,
        duration: step.duration,
    }
}

/// The way back along the same roads.
fn mirror(outbound: &[RouteSegment]) -> Vec<RouteSegment> {
    outbound
        .iter()
        .rev()
        .map(|segment| RouteSegment {
            coordinates: segment.coordinates.iter().rev().copied().collect(),
            direction: Direction::Inbound,
            ..segment.clone()
        })
        .collect()
}
