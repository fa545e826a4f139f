//! Route optimization request/response types

use serde::{Deserialize, Serialize};

use super::Coordinates;

/// Default depot (Navi Mumbai)
pub const DEFAULT_DEPOT_LAT: f64 = 19.0330;
pub const DEFAULT_DEPOT_LNG: f64 = 73.0297;

pub const DEFAULT_AVERAGE_SPEED_KMPH: f64 = 35.0;
pub const DEFAULT_SERVICE_MINUTES: i32 = 15;
/// 09:00, minutes from midnight
pub const DEFAULT_START_TIME_MIN: i32 = 9 * 60;

/// A delivery order at a customer site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub customer: String,
    pub lat: f64,
    pub lng: f64,
    /// Diesel demand (KL)
    #[serde(default)]
    pub demand_kl: Option<f64>,
    /// Earliest delivery start (minutes from midnight)
    #[serde(default)]
    pub earliest_min: Option<i32>,
    /// Latest delivery start (minutes from midnight)
    #[serde(default)]
    pub latest_min: Option<i32>,
    #[serde(default = "default_service_minutes")]
    pub service_minutes: Option<i32>,
}

impl Order {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

/// Request to optimize a single-vehicle route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub orders: Vec<Order>,
    #[serde(default = "default_depot_lat")]
    pub depot_lat: f64,
    #[serde(default = "default_depot_lng")]
    pub depot_lng: f64,
    /// Truck capacity (KL); accepted but not enforced
    #[serde(default)]
    pub truck_capacity_kl: Option<f64>,
    #[serde(default = "default_average_speed")]
    pub average_speed_kmph: f64,
    /// Trip start time (minutes from midnight)
    #[serde(default = "default_start_time")]
    pub start_time_min: i32,
    /// Reserved for an alternate distance source
    #[serde(default)]
    pub use_google_distance: bool,
}

impl OptimizeRequest {
    pub fn depot(&self) -> Coordinates {
        Coordinates::new(self.depot_lat, self.depot_lng)
    }
}

/// A single vehicle trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub route: Vec<String>,
    pub total_distance_km: f64,
    pub total_time_min: f64,
    pub capacity_ok: bool,
    pub time_window_violations: i32,
}

/// Optimization result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeResponse {
    /// Customer names in visiting order, depot excluded
    #[serde(rename = "optimalRoute")]
    pub optimal_route: Vec<String>,
    #[serde(rename = "totalDistanceKm")]
    pub total_distance_km: f64,
    #[serde(rename = "estimatedTimeMin")]
    pub estimated_time_min: f64,
    pub optimal_trips: Vec<Trip>,
    pub explanation: String,
    pub assumptions: Vec<String>,
}

fn default_depot_lat() -> f64 {
    DEFAULT_DEPOT_LAT
}

fn default_depot_lng() -> f64 {
    DEFAULT_DEPOT_LNG
}

fn default_average_speed() -> f64 {
    DEFAULT_AVERAGE_SPEED_KMPH
}

fn default_start_time() -> i32 {
    DEFAULT_START_TIME_MIN
}

fn default_service_minutes() -> Option<i32> {
    Some(DEFAULT_SERVICE_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let req: OptimizeRequest = serde_json::from_value(json!({
            "orders": [{"customer": "A", "lat": 19.1, "lng": 73.1}]
        }))
        .unwrap();

        assert_eq!(req.depot_lat, DEFAULT_DEPOT_LAT);
        assert_eq!(req.depot_lng, DEFAULT_DEPOT_LNG);
        assert_eq!(req.average_speed_kmph, 35.0);
        assert_eq!(req.start_time_min, 540);
        assert!(!req.use_google_distance);
        assert!(req.truck_capacity_kl.is_none());

        let order = &req.orders[0];
        assert_eq!(order.service_minutes, Some(15));
        assert!(order.demand_kl.is_none());
        assert!(order.earliest_min.is_none());
    }

    #[test]
    fn test_request_missing_orders_is_rejected() {
        let result: Result<OptimizeRequest, _> = serde_json::from_value(json!({
            "depot_lat": 10.0
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_order_missing_lat_is_rejected() {
        let result: Result<Order, _> = serde_json::from_value(json!({
            "customer": "A", "lng": 1.0
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_response_field_names() {
        let response = OptimizeResponse {
            optimal_route: vec!["A".into()],
            total_distance_km: 1.5,
            estimated_time_min: 2.6,
            optimal_trips: vec![Trip {
                route: vec!["A".into()],
                total_distance_km: 1.5,
                total_time_min: 2.6,
                capacity_ok: true,
                time_window_violations: 0,
            }],
            explanation: "ok".into(),
            assumptions: vec![],
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["optimalRoute"], json!(["A"]));
        assert_eq!(value["totalDistanceKm"], json!(1.5));
        assert_eq!(value["estimatedTimeMin"], json!(2.6));
        assert_eq!(value["optimal_trips"][0]["capacity_ok"], json!(true));
        assert_eq!(value["optimal_trips"][0]["time_window_violations"], json!(0));
    }
}
