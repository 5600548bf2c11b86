use serde::Deserialize;
use tracing::{debug, warn};

use crate::time::Timestamp;

#[derive(Debug, Deserialize)]
struct LocationPayload {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    accuracy: Option<f64>,
}

fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Processes a `location` frame's payload: validates the coordinate range
/// and logs invalid coordinates instead of forwarding them to storage.
/// Never affects whether the frame was broadcast.
pub fn process(user_id: &str, payload: &serde_json::Value) {
    let parsed: LocationPayload = match serde_json::from_value(payload.clone()) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "location payload did not match the expected shape");
            return;
        }
    };

    if !is_valid_coordinate(parsed.latitude, parsed.longitude) {
        warn!(
            user = %user_id,
            lat = parsed.latitude,
            lng = parsed.longitude,
            "rejecting out-of-range coordinates"
        );
        return;
    }

    debug!(
        user = %user_id,
        lat = parsed.latitude,
        lng = parsed.longitude,
        accuracy = ?parsed.accuracy,
        stamped = Timestamp::now().as_millis(),
        "location update processed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_range_accepted() {
        assert!(is_valid_coordinate(45.0, -122.0));
        assert!(is_valid_coordinate(-90.0, -180.0));
        assert!(is_valid_coordinate(90.0, 180.0));
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(!is_valid_coordinate(91.0, 0.0));
        assert!(!is_valid_coordinate(0.0, 181.0));
        assert!(!is_valid_coordinate(-91.0, 0.0));
    }

    #[test]
    fn process_handles_invalid_coordinates_without_panicking() {
        process("u1", &json!({"latitude": 500.0, "longitude": 0.0}));
    }

    #[test]
    fn process_handles_malformed_payload() {
        process("u1", &json!({"latitude": "not a number"}));
    }
}
