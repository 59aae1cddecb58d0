//! Async orchestration of the planning pipeline.
//!
//! order → (optional high-fidelity path) → segment → detect tolls → assemble.
//! Each stage is a plain function in its own module; this one only wires
//! them to the collaborators.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::config::{PlanOptions, ServiceConfig, Tuning};
use crate::error::PlanError;
use crate::model::{OptimizedRoute, Stop};
use crate::navigation::{self, LinkLimits, NavigationLink};
use crate::nominatim::NominatimClient;
use crate::ordering::{self, OrderedTrip};
use crate::ors::OrsClient;
use crate::osrm::OsrmClient;
use crate::overpass::OverpassClient;
use crate::polyline::Polyline;
use crate::segmenter;
use crate::tolls;
use crate::traits::{Geocoder, PathProvider, PoiProvider, TripOptimizer, TripResponse};

/// External services used by one planning request.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub trips: &'a dyn TripOptimizer,
    /// Only consulted for high-fidelity paths.
    pub paths: Option<&'a dyn PathProvider>,
    pub pois: &'a dyn PoiProvider,
    pub geocoder: &'a dyn Geocoder,
}

/// Plans a route through `stops`, the first of which is the anchor.
///
/// Only an ordering failure is returned as an error; toll lookups and the
/// high-fidelity path degrade silently.
#[tracing::instrument(skip_all, fields(stops = stops.len()))]
pub async fn plan_route(
    stops: &[Stop],
    options: &PlanOptions,
    tuning: &Tuning,
    collaborators: Collaborators<'_>,
) -> Result<OptimizedRoute, PlanError> {
    let ordered = ordering::order_stops(collaborators.trips, stops, options, tuning).await?;

    let response = match collaborators.paths {
        Some(paths) if options.wants_high_fidelity_path() => {
            high_fidelity_path(paths, &ordered, options).await
        }
        _ => ordered.response.clone(),
    };

    let segments = segmenter::segment(&response, &ordered.stops, options.round_trip);
    let (total_distance, total_duration) = segmenter::totals(&segments);
    let path = Polyline::concat(segments.iter().map(|segment| segment.coordinates.as_slice()));
    tracing::debug!(segments = segments.len(), total_distance, "route segmented");

    let legs = segmenter::geometry_legs(&response, &ordered.stops, options.round_trip);
    let tolls = tolls::detect_tolls(
        legs,
        &path,
        &ordered.stops,
        collaborators.pois,
        collaborators.geocoder,
        tuning,
    )
    .await;
    tracing::debug!(tolls = tolls.len(), "tolls detected");

    Ok(OptimizedRoute {
        total_distance,
        total_duration,
        segments,
        waypoints: ordered.stops,
        round_trip: options.round_trip,
        toll_count: tolls.len(),
        tolls,
    })
}

/// Path for the optimizer's order from the path-fidelity service, or the
/// optimizer's own geometry when that service fails.
async fn high_fidelity_path(
    paths: &dyn PathProvider,
    ordered: &OrderedTrip,
    options: &PlanOptions,
) -> TripResponse {
    let locations = ordered.route_locations(options.round_trip);
    match paths.path(&locations, options.avoid_unpaved).await {
        Ok(mut response) => {
            response.order = ordered.response.order.clone();
            response
        }
        Err(err) => {
            tracing::warn!(error = %err, "high-fidelity path failed, keeping optimizer geometry");
            ordered.response.clone()
        }
    }
}

/// Guards against overlapping requests and stale results.
///
/// Only one request may be in flight. A result is released only if no newer
/// request was issued and the stop list was not invalidated meanwhile.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
    in_flight: AtomicBool,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket, or `None` while another request is in flight.
    pub fn begin(&self) -> Option<RequestTicket<'_>> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(RequestTicket {
            sequencer: self,
            id: self.latest.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }

    /// Marks every outstanding ticket stale. Call when the stop list changes.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// One issued planning request.
///
/// Dropping the ticket ends the request, so an abandoned request never
/// blocks the next one.
#[derive(Debug)]
pub struct RequestTicket<'a> {
    sequencer: &'a RequestSequencer,
    id: u64,
}

impl RequestTicket<'_> {
    pub fn is_current(&self) -> bool {
        self.sequencer.latest.load(Ordering::SeqCst) == self.id
    }

    /// Ends the request and returns `result` only if the ticket is still current.
    pub fn finish<T>(self, result: T) -> Option<T> {
        if self.is_current() {
            Some(result)
        } else {
            tracing::debug!(ticket = self.id, "discarding stale route result");
            None
        }
    }
}

impl Drop for RequestTicket<'_> {
    fn drop(&mut self) {
        self.sequencer.in_flight.store(false, Ordering::SeqCst);
    }
}

/// Owns the HTTP collaborators and the request sequencing for a caller.
#[derive(Debug)]
pub struct RoutePlanner {
    osrm: OsrmClient,
    ors: Option<OrsClient>,
    overpass: OverpassClient,
    nominatim: NominatimClient,
    tuning: Tuning,
    sequencer: RequestSequencer,
}

impl RoutePlanner {
    pub fn new(config: ServiceConfig, tuning: Tuning) -> Result<Self, reqwest::Error> {
        Ok(Self {
            osrm: OsrmClient::new(config.osrm)?,
            ors: config.ors.map(OrsClient::new).transpose()?,
            overpass: OverpassClient::new(config.overpass)?,
            nominatim: NominatimClient::new(config.nominatim)?,
            tuning,
            sequencer: RequestSequencer::new(),
        })
    }

    pub fn from_env() -> Result<Self, reqwest::Error> {
        Self::new(ServiceConfig::from_env(), Tuning::default())
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            trips: &self.osrm,
            paths: self.ors.as_ref().map(|ors| ors as &dyn PathProvider),
            pois: &self.overpass,
            geocoder: &self.nominatim,
        }
    }

    /// Plans a route. `Ok(None)` means the stop list changed meanwhile and
    /// the result was discarded.
    pub async fn plan(
        &self,
        stops: &[Stop],
        options: &PlanOptions,
    ) -> Result<Option<OptimizedRoute>, PlanError> {
        let ticket = self.sequencer.begin().ok_or(PlanError::InFlight)?;
        let result = plan_route(stops, options, &self.tuning, self.collaborators()).await;
        match ticket.finish(result) {
            Some(result) => result.map(Some),
            None => Ok(None),
        }
    }

    /// Whether a [`plan`](Self::plan) call is still running.
    pub fn in_flight(&self) -> bool {
        self.sequencer.in_flight()
    }

    /// Call whenever the caller's stop list changes.
    pub fn invalidate(&self) {
        self.sequencer.invalidate();
    }

    pub async fn search_stops(&self, query: &str) -> Vec<Stop> {
        match self.nominatim.search(query).await {
            Ok(stops) => stops,
            Err(err) => {
                tracing::warn!(error = %err, "address search failed");
                Vec::new()
            }
        }
    }

    pub fn navigation_link(&self, route: Option<&OptimizedRoute>, avoid_unpaved: bool) -> NavigationLink {
        navigation::google_maps_link(route, avoid_unpaved, &self.tuning, LinkLimits::default())
    }
}
