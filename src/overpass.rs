//! Overpass API adapter for toll-booth lookups.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::OverpassConfig;
use crate::error::ProviderError;
use crate::haversine::BoundingBox;
use crate::traits::{PoiNode, PoiProvider};

#[derive(Debug, Clone)]
pub struct OverpassClient {
    config: OverpassConfig,
    client: reqwest::Client,
}

impl OverpassClient {
    pub fn new(config: OverpassConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl PoiProvider for OverpassClient {
    #[tracing::instrument(skip(self))]
    async fn toll_booths(&self, bbox: BoundingBox) -> Result<Vec<PoiNode>, ProviderError> {
        let query = toll_query(&bbox, self.config.query_timeout_secs);
        let body: OverpassBody = self
            .client
            .get(&self.config.url)
            .query(&[("data", query)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(nodes(body))
    }
}

/// Overpass QL for toll booths and toll-typed nodes inside `bbox`.
fn toll_query(bbox: &BoundingBox, timeout_secs: u64) -> String {
    let area = format!(
        "{:.6},{:.6},{:.6},{:.6}",
        bbox.south, bbox.west, bbox.north, bbox.east
    );
    format!(
        "[out:json][timeout:{timeout_secs}];\
         (node[\"barrier\"=\"toll_booth\"]({area});node[\"toll:type\"]({area}););\
         out body;"
    )
}

fn nodes(body: OverpassBody) -> Vec<PoiNode> {
    body.elements
        .into_iter()
        .filter_map(|element| {
            let location = (element.lat?, element.lon?);
            let mut tags = element.tags.unwrap_or_default();
            Some(PoiNode {
                location,
                name: tags.name.take().filter(|name| !name.is_empty()),
                operator: tags.operator.take().filter(|operator| !operator.is_empty()),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct OverpassBody {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    tags: Option<OverpassTags>,
}

#[derive(Debug, Default, Deserialize)]
struct OverpassTags {
    name: Option<String>,
    operator: Option<String>,
}
