//! Real town-centre locations in the Vale do Ribeira (São Paulo, Brazil).
//!
//! Coordinates sourced from OpenStreetMap. The BR-116 toll plazas in this
//! region make it a convenient backdrop for toll and unpaved-road cases.

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

// ============================================================================
// Depot
// ============================================================================

pub const REGISTRO: Location = Location::new("Registro, São Paulo", -24.4874, -47.8436);

// ============================================================================
// Delivery towns
// ============================================================================

pub const TOWNS: &[Location] = &[
    Location::new("Pariquera-Açu", -24.7150, -47.8811),
    Location::new("Jacupiranga", -24.6925, -48.0022),
    Location::new("Sete Barras", -24.3874, -47.9257),
    Location::new("Juquiá", -24.3215, -47.6347),
    Location::new("Eldorado", -24.5200, -48.1083),
    Location::new("Cajati", -24.7326, -48.1228),
    Location::new("Iguape", -24.7081, -47.5553),
    Location::new("Miracatu", -24.2813, -47.4598),
];
