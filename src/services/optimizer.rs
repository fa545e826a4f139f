//! Route optimization pipeline
//!
//! coordinates -> distance matrix -> nearest-neighbor seed -> 2-opt
//! -> totals -> named route -> explanation -> response

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{OptimizeError, OptimizeResult};
use crate::services::explanation::{normalize_single_line, template_explanation, Explainer, RouteSummary};
use crate::services::geo::DistanceMatrix;
use crate::services::tour::{self, TwoOptStats, DEFAULT_MAX_PASSES};
use crate::types::{Coordinates, OptimizeRequest, OptimizeResponse, Trip};

/// Matrix index of the depot
const DEPOT_INDEX: usize = 0;

/// Pipeline settings shared by all requests
#[derive(Debug, Clone)]
pub struct OptimizerSettings {
    pub max_passes: usize,
    /// Serve a locally built explanation when the explainer fails
    pub fallback_enabled: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            fallback_enabled: true,
        }
    }
}

/// Result of the numeric part of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    /// Matrix indices, depot first
    pub order: Vec<usize>,
    /// Customer names in visiting order, depot excluded
    pub route_names: Vec<String>,
    pub seed_distance_km: f64,
    pub total_distance_km: f64,
    pub total_time_min: f64,
    pub stats: TwoOptStats,
}

/// Reject requests the pipeline cannot handle
pub fn validate(request: &OptimizeRequest) -> OptimizeResult<()> {
    let speed = request.average_speed_kmph;
    if !speed.is_finite() || speed <= 0.0 {
        return Err(OptimizeError::Validation(format!(
            "average_speed_kmph must be a positive number, got {}",
            speed
        )));
    }

    if !request.depot().is_valid() {
        return Err(OptimizeError::Validation(format!(
            "depot coordinates out of range: ({}, {})",
            request.depot_lat, request.depot_lng
        )));
    }

    if let Some(capacity) = request.truck_capacity_kl {
        if !capacity.is_finite() || capacity < 0.0 {
            return Err(OptimizeError::Validation(format!(
                "truck_capacity_kl must be non-negative, got {}",
                capacity
            )));
        }
    }

    for (i, order) in request.orders.iter().enumerate() {
        if order.customer.trim().is_empty() {
            return Err(OptimizeError::Validation(format!("orders[{}]: customer name is empty", i)));
        }
        if !order.coordinates().is_valid() {
            return Err(OptimizeError::Validation(format!(
                "orders[{}] ({}): coordinates out of range: ({}, {})",
                i, order.customer, order.lat, order.lng
            )));
        }
        if let Some(demand) = order.demand_kl {
            if !demand.is_finite() || demand < 0.0 {
                return Err(OptimizeError::Validation(format!(
                    "orders[{}] ({}): demand_kl must be non-negative, got {}",
                    i, order.customer, demand
                )));
            }
        }
        if let (Some(earliest), Some(latest)) = (order.earliest_min, order.latest_min) {
            if earliest > latest {
                return Err(OptimizeError::Validation(format!(
                    "orders[{}] ({}): earliest_min {} is after latest_min {}",
                    i, order.customer, earliest, latest
                )));
            }
        }
    }

    Ok(())
}

/// Build the matrix, seed and improve the route, and compute totals
pub fn plan_route(request: &OptimizeRequest, max_passes: usize) -> OptimizeResult<PlannedRoute> {
    let mut points: Vec<Coordinates> = Vec::with_capacity(request.orders.len() + 1);
    points.push(request.depot());
    points.extend(request.orders.iter().map(|o| o.coordinates()));

    let matrix = DistanceMatrix::from_points(&points);
    if !matrix.is_well_formed() {
        return Err(OptimizeError::Computation(
            "distance matrix contains non-finite or negative values".to_string(),
        ));
    }

    let mut order = tour::nearest_neighbor_route(&matrix, DEPOT_INDEX);
    if order.first() != Some(&DEPOT_INDEX) {
        tour::rotate_to_depot(&mut order, DEPOT_INDEX);
    }
    if !tour::is_valid_route(&order, matrix.size(), DEPOT_INDEX) {
        return Err(OptimizeError::Computation(format!(
            "seed route is not a permutation starting at the depot: {:?}",
            order
        )));
    }

    let seed_distance_km = tour::route_distance(&matrix, &order);
    let stats = tour::two_opt(&mut order, &matrix, max_passes);
    if !tour::is_valid_route(&order, matrix.size(), DEPOT_INDEX) {
        return Err(OptimizeError::Computation(format!(
            "improved route is not a permutation starting at the depot: {:?}",
            order
        )));
    }

    let total_distance_km = tour::route_distance(&matrix, &order);
    if !total_distance_km.is_finite() {
        return Err(OptimizeError::Computation("route distance is not finite".to_string()));
    }

    let total_time_min = tour::travel_minutes(total_distance_km, request.average_speed_kmph)
        .ok_or_else(|| {
            OptimizeError::Validation(format!(
                "average_speed_kmph must be a positive number, got {}",
                request.average_speed_kmph
            ))
        })?;

    let route_names = order
        .iter()
        .filter(|&&idx| idx != DEPOT_INDEX)
        .map(|&idx| request.orders[idx - 1].customer.clone())
        .collect();

    Ok(PlannedRoute {
        order,
        route_names,
        seed_distance_km,
        total_distance_km,
        total_time_min,
        stats,
    })
}

/// Run the full pipeline for one request
pub async fn optimize(
    request: &OptimizeRequest,
    explainer: &dyn Explainer,
    settings: &OptimizerSettings,
) -> OptimizeResult<OptimizeResponse> {
    validate(request)?;

    let started = Instant::now();
    let planned = plan_route(request, settings.max_passes)?;

    info!(
        "Optimized {} orders: {:.2} km -> {:.2} km ({} passes, {} moves{}) in {} ms",
        request.orders.len(),
        planned.seed_distance_km,
        planned.total_distance_km,
        planned.stats.passes,
        planned.stats.moves,
        if planned.stats.hit_pass_limit { ", pass limit reached" } else { "" },
        started.elapsed().as_millis()
    );

    debug!("Visiting order (matrix indices): {:?}", planned.order);

    let summary = RouteSummary {
        route_names: planned.route_names.clone(),
        total_km: round_to(planned.total_distance_km, 2),
        total_min: round_to(planned.total_time_min, 1),
        speed_kmph: request.average_speed_kmph,
    };

    let explanation = explain(&summary, explainer, settings.fallback_enabled).await?;

    Ok(build_response(&summary, explanation))
}

/// Ask the explainer for a one-line explanation, falling back if allowed
async fn explain(
    summary: &RouteSummary,
    explainer: &dyn Explainer,
    fallback_enabled: bool,
) -> OptimizeResult<String> {
    if summary.route_names.is_empty() {
        return Ok(template_explanation(summary));
    }

    let result = explainer
        .explain(summary)
        .await
        .map(|text| normalize_single_line(&text))
        .and_then(|text| {
            if text.is_empty() {
                anyhow::bail!("explanation was empty")
            }
            Ok(text)
        });

    match result {
        Ok(text) => {
            debug!("Explanation from {}: {} chars", explainer.name(), text.len());
            Ok(text)
        }
        Err(e) if fallback_enabled => {
            warn!("Explainer {} failed, using fallback explanation: {:#}", explainer.name(), e);
            Ok(template_explanation(summary))
        }
        Err(e) => Err(OptimizeError::ExternalService(format!("{:#}", e))),
    }
}

fn build_response(summary: &RouteSummary, explanation: String) -> OptimizeResponse {
    let trip = Trip {
        route: summary.route_names.clone(),
        total_distance_km: summary.total_km,
        total_time_min: summary.total_min,
        // Capacity and time windows are not modelled yet
        capacity_ok: true,
        time_window_violations: 0,
    };

    OptimizeResponse {
        optimal_route: summary.route_names.clone(),
        total_distance_km: summary.total_km,
        estimated_time_min: summary.total_min,
        optimal_trips: vec![trip],
        explanation,
        assumptions: assumptions(summary.speed_kmph),
    }
}

/// Fixed modelling assumptions reported with every result
pub fn assumptions(speed_kmph: f64) -> Vec<String> {
    vec![
        "Distances use haversine great-circle approximation.".to_string(),
        format!("Time = distance / {:?} km/h (no service time yet).", speed_kmph),
        "No capacity or time-window constraints applied in this step.".to_string(),
    ]
}

/// Round half away from zero after scaling.
///
/// Not bit-for-bit Python `round`: exact binary halves go up here, where
/// Python rounds them to even (`round(0.125, 2)` is `0.12` there, `0.13` here).
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::services::explanation::TemplateExplainer;
    use crate::types::Order;
    use proptest::prelude::*;

    fn orders() -> impl Strategy<Value = Vec<Order>> {
        prop::collection::vec((18.5f64..19.5, 72.5f64..73.5), 0..15).prop_map(|points| {
            points
                .into_iter()
                .enumerate()
                .map(|(i, (lat, lng))| Order {
                    customer: format!("Site {}", i),
                    lat,
                    lng,
                    demand_kl: None,
                    earliest_min: None,
                    latest_min: None,
                    service_minutes: Some(15),
                })
                .collect()
        })
    }

    fn request(orders: Vec<Order>, speed: f64) -> OptimizeRequest {
        OptimizeRequest {
            orders,
            depot_lat: 19.0330,
            depot_lng: 73.0297,
            truck_capacity_kl: None,
            average_speed_kmph: speed,
            start_time_min: 540,
            use_google_distance: false,
        }
    }

    proptest! {
        #[test]
        fn route_covers_every_customer_once(orders in orders(), speed in 5.0f64..120.0) {
            let req = request(orders, speed);
            let response = tokio_test::block_on(
                optimize(&req, &TemplateExplainer, &OptimizerSettings::default())
            ).unwrap();

            prop_assert_eq!(response.optimal_route.len(), req.orders.len());
            let mut names = response.optimal_route.clone();
            names.sort();
            let mut expected: Vec<String> = req.orders.iter().map(|o| o.customer.clone()).collect();
            expected.sort();
            prop_assert_eq!(names, expected);
            prop_assert!(response.estimated_time_min >= 0.0);
            prop_assert!(response.estimated_time_min.is_finite());
        }

        #[test]
        fn repeated_runs_agree(orders in orders()) {
            let req = request(orders, 35.0);
            let first = plan_route(&req, DEFAULT_MAX_PASSES).unwrap();
            let second = plan_route(&req, DEFAULT_MAX_PASSES).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn non_positive_speed_is_rejected(orders in orders(), speed in -100.0f64..=0.0) {
            let req = request(orders, speed);
            let result = tokio_test::block_on(
                optimize(&req, &TemplateExplainer, &OptimizerSettings::default())
            );
            prop_assert!(matches!(result, Err(OptimizeError::Validation(_))));
        }
    }
}
