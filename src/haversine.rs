//! Great-circle distance helpers.
//!
//! Straight-line distances only; road distances come from the routing service.

use serde::{Deserialize, Serialize};

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two `(lat, lng)` points in kilometers.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Haversine distance in meters.
pub fn haversine_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    haversine_km(from, to) * 1000.0
}

/// Latitude/longitude bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Smallest box containing every point. `None` for an empty input.
    pub fn around<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        points.into_iter().fold(None, |acc, (lat, lng)| {
            Some(match acc {
                None => Self {
                    south: lat,
                    west: lng,
                    north: lat,
                    east: lng,
                },
                Some(bbox) => Self {
                    south: bbox.south.min(lat),
                    west: bbox.west.min(lng),
                    north: bbox.north.max(lat),
                    east: bbox.east.max(lng),
                },
            })
        })
    }

    /// Grows the box by `margin_deg` on every side.
    pub fn expand(self, margin_deg: f64) -> Self {
        Self {
            south: self.south - margin_deg,
            west: self.west - margin_deg,
            north: self.north + margin_deg,
            east: self.east + margin_deg,
        }
    }

    pub fn contains(&self, (lat, lng): (f64, f64)) -> bool {
        lat >= self.south && lat <= self.north && lng >= self.west && lng <= self.east
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_km((-24.49, -47.84), (-24.49, -47.84));
        assert!(dist < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // São Paulo to Curitiba, ~340 km
        let dist = haversine_km((-23.55, -46.63), (-25.43, -49.27));
        assert!(dist > 320.0 && dist < 360.0, "got {}", dist);
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let a = (-23.55, -46.63);
        let b = (-22.90, -43.17);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_thousandth_degree_of_latitude() {
        let meters = haversine_m((10.0, 20.0), (10.001, 20.0));
        assert!(meters > 105.0 && meters < 115.0, "got {}", meters);
    }

    #[test]
    fn test_bounding_box_around_and_expand() {
        let bbox = BoundingBox::around(vec![(1.0, 2.0), (-1.0, 5.0), (0.5, 3.0)]).unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                south: -1.0,
                west: 2.0,
                north: 1.0,
                east: 5.0
            }
        );

        let grown = bbox.expand(0.05);
        assert!(grown.contains((1.04, 5.04)));
        assert!(!grown.contains((1.06, 5.0)));
    }

    #[test]
    fn test_bounding_box_empty() {
        assert!(BoundingBox::around(Vec::new()).is_none());
    }
}
