//! Nominatim geocoding adapter.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::NominatimConfig;
use crate::error::ProviderError;
use crate::model::{Address, Stop};
use crate::traits::Geocoder;

#[derive(Debug, Clone)]
pub struct NominatimClient {
    config: NominatimConfig,
    client: reqwest::Client,
}

impl NominatimClient {
    pub fn new(config: NominatimConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    #[tracing::instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<Stop>, ProviderError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.config.search_limit.to_string();
        let places: Vec<NominatimPlace> = self
            .client
            .get(format!("{}/search", self.config.base_url))
            .query(&[
                ("format", "json"),
                ("addressdetails", "1"),
                ("q", query),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(stops_from_places(places))
    }

    #[tracing::instrument(skip(self))]
    async fn reverse(&self, location: (f64, f64)) -> Result<Option<Address>, ProviderError> {
        let (lat, lng) = location;
        let place: NominatimPlace = self
            .client
            .get(format!("{}/reverse", self.config.base_url))
            .query(&[
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(place.address.map(|address| address.into_address()))
    }
}

/// Candidate stops, de-duplicated on coordinates rounded to 4 decimals.
fn stops_from_places(places: Vec<NominatimPlace>) -> Vec<Stop> {
    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter_map(stop_from_place)
        .filter(|stop| {
            let (lat, lng) = stop.location();
            seen.insert(format!("{:.4},{:.4}", lat, lng))
        })
        .collect()
}

fn stop_from_place(place: NominatimPlace) -> Option<Stop> {
    let lat = place.lat.as_deref()?.parse::<f64>().ok()?;
    let lng = place.lon.as_deref()?.parse::<f64>().ok()?;
    let raw = place.address.unwrap_or_default();

    let street = raw.street().unwrap_or_default();
    let number = raw.house_number.clone().unwrap_or_default();
    let city = raw.city().or_else(|| raw.neighbourhood()).unwrap_or_default();

    let mut name = place.name.unwrap_or_default();
    let name_misses_street = !street.is_empty() && !name.contains(&street);
    if name.is_empty() || name == number || name_misses_street {
        if !street.is_empty() {
            name = if number.is_empty() {
                street.clone()
            } else {
                format!("{}, {}", street, number)
            };
        } else if !city.is_empty() {
            name = city.clone();
        }
    } else if !number.is_empty() && !name.contains(&number) {
        name = format!("{}, {}", name, number);
    }
    if name.is_empty() {
        name = place
            .display_name
            .as_deref()
            .and_then(|display| display.split(',').next())
            .unwrap_or_default()
            .trim()
            .to_string();
    }

    let address = Address {
        street: Some(street).filter(|s| !s.is_empty()),
        number: Some(number).filter(|s| !s.is_empty()),
        city: Some(city).filter(|s| !s.is_empty()),
        state: raw.state.filter(|s| !s.is_empty()),
        postcode: raw.postcode.filter(|s| !s.is_empty()),
    };

    Some(Stop::new(name, (lat, lng)).with_address(address))
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: Option<String>,
    lon: Option<String>,
    name: Option<String>,
    display_name: Option<String>,
    address: Option<NominatimAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct NominatimAddress {
    road: Option<String>,
    pedestrian: Option<String>,
    street: Option<String>,
    highway: Option<String>,
    house_number: Option<String>,
    suburb: Option<String>,
    neighbourhood: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
}

fn first_present(values: &[&Option<String>]) -> Option<String> {
    values
        .iter()
        .copied()
        .flatten()
        .find(|value| !value.is_empty())
        .cloned()
}

impl NominatimAddress {
    fn street(&self) -> Option<String> {
        first_present(&[&self.road, &self.pedestrian, &self.street, &self.highway])
    }

    fn city(&self) -> Option<String> {
        first_present(&[&self.city, &self.town, &self.village, &self.municipality])
    }

    fn neighbourhood(&self) -> Option<String> {
        first_present(&[&self.suburb, &self.neighbourhood])
    }

    fn into_address(self) -> Address {
        Address {
            street: self.street(),
            number: self.house_number.clone().filter(|s| !s.is_empty()),
            city: self.city(),
            state: self.state.filter(|s| !s.is_empty()),
            postcode: self.postcode.filter(|s| !s.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(json: &str) -> NominatimPlace {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_name_built_from_street_and_number() {
        let stop = stop_from_place(place(
            r#"{"lat": "-23.56", "lon": "-46.65", "name": "123", "display_name": "123, Avenida Paulista, São Paulo",
                "address": {"road": "Avenida Paulista", "house_number": "123", "city": "São Paulo", "state": "SP", "postcode": "01310-100"}}"#,
        ))
        .unwrap();

        assert_eq!(stop.name, "Avenida Paulista, 123");
        assert_eq!(stop.location(), (-23.56, -46.65));
        let address = stop.address.unwrap();
        assert_eq!(address.city.as_deref(), Some("São Paulo"));
        assert_eq!(address.postcode.as_deref(), Some("01310-100"));
    }

    #[test]
    fn test_named_place_gets_number_appended() {
        let stop = stop_from_place(place(
            r#"{"lat": "1.0", "lon": "2.0", "name": "Shopping Rua Verde",
                "address": {"road": "Rua Verde", "house_number": "50", "town": "Itu"}}"#,
        ))
        .unwrap();
        assert_eq!(stop.name, "Shopping Rua Verde, 50");
        assert_eq!(stop.city(), Some("Itu"));
    }

    #[test]
    fn test_city_falls_back_to_neighbourhood() {
        let stop = stop_from_place(place(
            r#"{"lat": "1.0", "lon": "2.0", "name": "", "address": {"suburb": "Vila Madalena"}}"#,
        ))
        .unwrap();
        assert_eq!(stop.name, "Vila Madalena");
        assert_eq!(stop.city(), Some("Vila Madalena"));
    }

    #[test]
    fn test_unparseable_coordinates_are_dropped() {
        assert!(stop_from_place(place(r#"{"lat": "north", "lon": "2.0"}"#)).is_none());
    }

    #[test]
    fn test_duplicates_collapse_on_rounded_coordinates() {
        let places: Vec<NominatimPlace> = serde_json::from_str(
            r#"[
                {"lat": "1.00001", "lon": "2.00001", "name": "Praça", "address": {"city": "X"}},
                {"lat": "1.00002", "lon": "2.00002", "name": "Praça (way)", "address": {"city": "X"}},
                {"lat": "1.1", "lon": "2.1", "name": "Outra", "address": {"city": "X"}}
            ]"#,
        )
        .unwrap();
        let stops = stops_from_places(places);
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].name, "Praça");
    }

    #[test]
    fn test_reverse_address_mapping() {
        let place = place(
            r#"{"lat": "1.0", "lon": "2.0", "address": {"road": "BR-116", "village": "Registro", "state": "SP"}}"#,
        );
        let address = place.address.unwrap().into_address();
        assert_eq!(address.street.as_deref(), Some("BR-116"));
        assert_eq!(address.city.as_deref(), Some("Registro"));
        assert_eq!(address.number, None);
    }
}
