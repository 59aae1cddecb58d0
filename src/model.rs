//! Shared value types for stops and planned routes.
//!
//! Coordinates are `(latitude, longitude)` tuples throughout the crate.

use serde::{Deserialize, Serialize};

/// Structured address of a stop, as resolved by the geocoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub number: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
}

/// A stop to visit.
///
/// The original coordinate is captured when the stop is created and never
/// changes afterwards. The display coordinate can be moved by the caller
/// (e.g. to un-stack overlapping pins) without affecting navigation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    pub address: Option<Address>,
    /// Free-form client reference tag.
    pub client_ref: Option<String>,
    display: (f64, f64),
    original: (f64, f64),
}

impl Stop {
    pub fn new(name: impl Into<String>, location: (f64, f64)) -> Self {
        Self {
            name: name.into(),
            address: None,
            client_ref: None,
            display: location,
            original: location,
        }
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_client_ref(mut self, client_ref: impl Into<String>) -> Self {
        self.client_ref = Some(client_ref.into());
        self
    }

    /// Coordinate shown to the user.
    pub fn location(&self) -> (f64, f64) {
        self.display
    }

    /// Coordinate captured at geocode time.
    pub fn original_location(&self) -> (f64, f64) {
        self.original
    }

    /// Moves the display pin. The original coordinate is kept.
    pub fn set_display_location(&mut self, location: (f64, f64)) {
        self.display = location;
    }

    /// City from the structured address, if any.
    pub fn city(&self) -> Option<&str> {
        self.address
            .as_ref()
            .and_then(|address| address.city.as_deref())
            .filter(|city| !city.is_empty())
    }

    /// Short label: the city when known, otherwise the first part of the name.
    pub fn short_label(&self) -> &str {
        match self.city() {
            Some(city) => city,
            None => self.name.split(',').next().unwrap_or_default().trim(),
        }
    }

    pub(crate) fn has_valid_location(&self) -> bool {
        let (lat, lng) = self.display;
        lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Paved,
    Unpaved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Inbound,
}

/// A typed, directional piece of the traveled path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub coordinates: Vec<(f64, f64)>,
    pub surface: Surface,
    pub direction: Direction,
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
}

/// A toll point found along the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TollDetail {
    pub location: (f64, f64),
    pub name: Option<String>,
    pub operator: Option<String>,
    pub nearby: Option<String>,
}

/// The result of one planning request.
///
/// Replaced wholesale by the next request; never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedRoute {
    /// Meters, always the sum of the segment distances.
    pub total_distance: f64,
    /// Seconds, always the sum of the segment durations.
    pub total_duration: f64,
    pub segments: Vec<RouteSegment>,
    /// Stops in visiting order. The first one is the anchor.
    pub waypoints: Vec<Stop>,
    pub round_trip: bool,
    pub toll_count: usize,
    pub tolls: Vec<TollDetail>,
}

impl OptimizedRoute {
    /// The full traveled path, segment after segment.
    pub fn path(&self) -> Vec<(f64, f64)> {
        self.segments
            .iter()
            .flat_map(|segment| segment.coordinates.iter().copied())
            .collect()
    }

    pub fn anchor(&self) -> Option<&Stop> {
        self.waypoints.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_move_keeps_original() {
        let mut stop = Stop::new("Depot", (-23.55, -46.63)).with_client_ref("C-0012");
        assert_eq!(stop.client_ref.as_deref(), Some("C-0012"));
        stop.set_display_location((-23.5501, -46.6302));
        assert_eq!(stop.location(), (-23.5501, -46.6302));
        assert_eq!(stop.original_location(), (-23.55, -46.63));

        stop.set_display_location((-23.56, -46.64));
        assert_eq!(stop.original_location(), (-23.55, -46.63));
    }

    #[test]
    fn test_short_label_prefers_city() {
        let stop = Stop::new("Rua Augusta, 100", (0.0, 0.0)).with_address(Address {
            city: Some("Campinas".to_string()),
            ..Address::default()
        });
        assert_eq!(stop.short_label(), "Campinas");

        let bare = Stop::new("Rua Augusta, 100", (0.0, 0.0));
        assert_eq!(bare.short_label(), "Rua Augusta");
    }

    #[test]
    fn test_invalid_locations() {
        assert!(Stop::new("ok", (10.0, 20.0)).has_valid_location());
        assert!(!Stop::new("nan", (f64::NAN, 20.0)).has_valid_location());
        assert!(!Stop::new("lat", (95.0, 20.0)).has_valid_location());
        assert!(!Stop::new("lng", (10.0, 200.0)).has_valid_location());
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Surface::Unpaved).unwrap(), "\"unpaved\"");
        assert_eq!(serde_json::to_string(&Direction::Inbound).unwrap(), "\"inbound\"");
    }

    #[test]
    fn test_path_concatenates_segments() {
        let segment = |coordinates: Vec<(f64, f64)>| RouteSegment {
            coordinates,
            surface: Surface::Paved,
            direction: Direction::Outbound,
            distance: 1.0,
            duration: 1.0,
        };
        let route = OptimizedRoute {
            total_distance: 2.0,
            total_duration: 2.0,
            segments: vec![segment(vec![(0.0, 0.0), (0.0, 1.0)]), segment(vec![(0.0, 1.0), (0.0, 2.0)])],
            waypoints: vec![Stop::new("A", (0.0, 0.0))],
            round_trip: false,
            toll_count: 0,
            tolls: Vec::new(),
        };
        assert_eq!(route.path(), vec![(0.0, 0.0), (0.0, 1.0), (0.0, 1.0), (0.0, 2.0)]);
        assert_eq!(route.anchor().map(|stop| stop.name.as_str()), Some("A"));
    }
}
