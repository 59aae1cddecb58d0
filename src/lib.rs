//! stop-router core
//!
//! Orders a set of stops around an anchor, splits the routed path into
//! typed segments, finds the tolls on it and builds navigation deep links.

pub mod model;
pub mod config;
pub mod error;
pub mod traits;
pub mod haversine;
pub mod polyline;
pub mod osrm;
pub mod ors;
pub mod overpass;
pub mod nominatim;
pub mod ordering;
pub mod segmenter;
pub mod tolls;
pub mod navigation;
pub mod planner;

pub use config::{PathFidelity, PlanOptions, ServiceConfig, Tuning};
pub use error::{PlanError, ProviderError};
pub use model::{Direction, OptimizedRoute, RouteSegment, Stop, Surface, TollDetail};
pub use navigation::{NavigationLink, google_maps_link, waze_url};
pub use planner::{Collaborators, RequestSequencer, RequestTicket, RoutePlanner, plan_route};
