//! OpenRouteService directions adapter.
//!
//! Draws the path through an already ordered list of stops, optionally
//! avoiding unpaved roads. It never reorders: the visiting order always
//! comes from the trip optimizer.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::OrsConfig;
use crate::error::ProviderError;
use crate::polyline::Polyline;
use crate::traits::{Leg, Maneuver, PathProvider, Step, TripResponse};

#[derive(Debug, Clone)]
pub struct OrsClient {
    config: OrsConfig,
    client: reqwest::Client,
}

impl OrsClient {
    pub fn new(config: OrsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!(
            "{}/v2/directions/{}/geojson",
            self.config.base_url, self.config.profile
        )
    }
}

#[async_trait]
impl PathProvider for OrsClient {
    #[tracing::instrument(skip(self, locations), fields(stops = locations.len()))]
    async fn path(
        &self,
        locations: &[(f64, f64)],
        avoid_unpaved: bool,
    ) -> Result<TripResponse, ProviderError> {
        let response = self
            .client
            .post(self.url())
            .header("Authorization", &self.config.api_key)
            .json(&request_body(locations, avoid_unpaved))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Upstream {
                code: status.as_str().to_string(),
                message,
            });
        }

        let body: OrsBody = response.json().await?;
        normalize(body, locations.len())
    }
}

fn request_body(locations: &[(f64, f64)], avoid_unpaved: bool) -> OrsRequest {
    OrsRequest {
        coordinates: locations.iter().map(|(lat, lng)| [*lng, *lat]).collect(),
        instructions: true,
        geometry: true,
        preference: "recommended",
        options: avoid_unpaved.then(|| OrsOptions {
            avoid_features: vec!["unpaved"],
        }),
    }
}

fn normalize(body: OrsBody, requested: usize) -> Result<TripResponse, ProviderError> {
    let feature = body
        .features
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Upstream {
            code: "NoRoute".to_string(),
            message: "no route found".to_string(),
        })?;

    let geometry = Polyline::from_lng_lat(&feature.geometry.coordinates);
    let expected_legs = requested.saturating_sub(1);
    if feature.properties.segments.len() < expected_legs {
        return Err(ProviderError::Incomplete {
            requested,
            returned: feature.properties.segments.len() + 1,
        });
    }

    let points = geometry.points();
    let slice = |from: usize, to: usize| -> Polyline {
        let end = to.min(points.len().saturating_sub(1));
        if points.is_empty() || from > end {
            Polyline::default()
        } else {
            Polyline::new(points[from..=end].to_vec())
        }
    };

    let legs = feature
        .properties
        .segments
        .into_iter()
        .map(|segment| {
            let bounds = segment
                .steps
                .first()
                .zip(segment.steps.last())
                .map(|(first, last)| (first.way_points[0], last.way_points[1]));
            let steps = segment
                .steps
                .into_iter()
                .map(|step| Step {
                    name: step.name,
                    geometry: slice(step.way_points[0], step.way_points[1]),
                    distance: step.distance,
                    duration: step.duration,
                    maneuver: Maneuver {
                        kind: step.kind.to_string(),
                        location: points.get(step.way_points[0]).copied(),
                    },
                    intersections: Vec::new(),
                })
                .collect();
            Leg {
                steps,
                distance: segment.distance,
                duration: segment.duration,
                geometry: bounds
                    .map(|(from, to)| slice(from, to))
                    .unwrap_or_default(),
            }
        })
        .collect();

    Ok(TripResponse {
        order: (0..requested).collect(),
        legs,
        distance: feature.properties.summary.distance,
        duration: feature.properties.summary.duration,
        geometry,
    })
}

#[derive(Debug, Serialize)]
struct OrsRequest {
    coordinates: Vec<[f64; 2]>,
    instructions: bool,
    geometry: bool,
    preference: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OrsOptions>,
}

#[derive(Debug, Serialize)]
struct OrsOptions {
    avoid_features: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct OrsBody {
    #[serde(default)]
    features: Vec<OrsFeature>,
}

#[derive(Debug, Deserialize)]
struct OrsFeature {
    geometry: OrsGeometry,
    properties: OrsProperties,
}

#[derive(Debug, Deserialize)]
struct OrsGeometry {
    #[serde(default)]
    coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct OrsProperties {
    #[serde(default)]
    summary: OrsSummary,
    #[serde(default)]
    segments: Vec<OrsSegment>,
}

#[derive(Debug, Default, Deserialize)]
struct OrsSummary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OrsSegment {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    steps: Vec<OrsStep>,
}

#[derive(Debug, Deserialize)]
struct OrsStep {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    #[serde(rename = "type", default)]
    kind: u32,
    #[serde(default)]
    name: String,
    way_points: [usize; 2],
}
