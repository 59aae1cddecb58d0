//! Polyline representation for route geometries.
//!
//! Points are decoded `(lat, lng)` tuples. Provider-specific encodings
//! (GeoJSON `[lng, lat]` arrays) are converted at the adapter boundary.

use serde::{Deserialize, Serialize};

/// Route geometry as an ordered list of `(lat, lng)` vertices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Builds a polyline from GeoJSON-ordered `[lng, lat]` pairs.
    ///
    /// Entries with fewer than two values are skipped.
    pub fn from_lng_lat(coordinates: &[Vec<f64>]) -> Self {
        let points = coordinates
            .iter()
            .filter_map(|pair| match pair.as_slice() {
                [lng, lat, ..] => Some((*lat, *lng)),
                _ => None,
            })
            .collect();
        Self { points }
    }

    /// Concatenates several polylines in order.
    pub fn concat<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a [(f64, f64)]>,
    {
        let points = parts
            .into_iter()
            .flat_map(|part| part.iter().copied())
            .collect();
        Self { points }
    }

    /// Returns a reference to the coordinate points.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the vertex nearest to `target`, searching from `from` onwards.
    ///
    /// Distances are planar, in degrees. Returns `None` when the nearest
    /// vertex is farther than `tolerance_deg` or the range is empty. Ties go
    /// to the earliest index so a stop at a leg boundary matches the end of
    /// the leg that arrives at it.
    pub fn nearest_index_from(
        &self,
        target: (f64, f64),
        from: usize,
        tolerance_deg: f64,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, point) in self.points.iter().enumerate().skip(from) {
            let dist = planar_deg(*point, target);
            if best.is_none_or(|(_, best_dist)| dist < best_dist) {
                best = Some((index, dist));
            }
        }
        best.filter(|(_, dist)| *dist <= tolerance_deg)
            .map(|(index, _)| index)
    }

    /// Whether any vertex lies within `threshold_deg` of `point`.
    ///
    /// Polylines longer than `dense_len` are checked every `stride`th vertex.
    pub fn passes_near(
        &self,
        point: (f64, f64),
        threshold_deg: f64,
        dense_len: usize,
        stride: usize,
    ) -> bool {
        let step = if self.points.len() > dense_len {
            stride.max(1)
        } else {
            1
        };
        self.points.iter().step_by(step).any(|vertex| {
            // Cheap box test before the euclidean one.
            (vertex.0 - point.0).abs() < threshold_deg
                && (vertex.1 - point.1).abs() < threshold_deg
                && planar_deg(*vertex, point) < threshold_deg
        })
    }

    /// Up to `count` evenly spaced vertex indices strictly between `start` and `end`.
    ///
    /// Nothing is sampled when the range holds fewer than `min_span` vertices.
    pub fn interior_samples(start: usize, end: usize, count: usize, min_span: usize) -> Vec<usize> {
        if end <= start || end - start < min_span.max(2) || count == 0 {
            return Vec::new();
        }
        let span = end - start;
        let mut indices: Vec<usize> = (1..=count)
            .map(|k| start + span * k / (count + 1))
            .filter(|index| *index > start && *index < end)
            .collect();
        indices.dedup();
        indices
    }
}

fn planar_deg(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}
