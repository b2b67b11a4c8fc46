//! Wire schema for the broker's request/response messages.

use std::collections::BTreeMap;

use plume_core::{GridDensity, Measurement, SimulationJob};
use serde::{Deserialize, Serialize};

use crate::error::BrokerError;

/// One `pollutionMeasurements[]` entry on a wire measurement.
#[derive(Clone, Debug, Deserialize)]
struct WirePollutionMeasurement {
    #[serde(rename = "type")]
    pollutant_type: String,
    value: f64,
    #[serde(rename = "measurementId")]
    #[allow(dead_code)]
    measurement_id: i64,
}

/// One `droneFlight.measurements[]` entry.
#[derive(Clone, Debug, Deserialize)]
struct WireMeasurement {
    id: i64,
    name: String,
    latitude: f64,
    longitude: f64,
    temperature: f64,
    #[serde(rename = "windSpeed")]
    wind_speed: f64,
    #[serde(rename = "windDirection")]
    wind_direction: f64,
    pressure: f64,
    #[serde(rename = "flightId")]
    flight_id: i64,
    #[serde(rename = "pollutionMeasurements")]
    pollution_measurements: Vec<WirePollutionMeasurement>,
}

impl From<WireMeasurement> for Measurement {
    fn from(m: WireMeasurement) -> Self {
        let pollutants: BTreeMap<String, f64> = m
            .pollution_measurements
            .into_iter()
            .map(|p| (p.pollutant_type, p.value))
            .collect();
        Measurement {
            id: m.id,
            name: m.name,
            latitude: m.latitude,
            longitude: m.longitude,
            temperature: m.temperature,
            wind_speed: m.wind_speed,
            wind_direction: m.wind_direction,
            pressure: m.pressure,
            flight_id: m.flight_id,
            pollutants,
        }
    }
}

/// The `droneFlight` envelope carrying the measurement set.
#[derive(Clone, Debug, Deserialize)]
struct DroneFlight {
    #[allow(dead_code)]
    id: i64,
    #[allow(dead_code)]
    #[serde(default)]
    title: String,
    #[allow(dead_code)]
    #[serde(default)]
    description: String,
    #[allow(dead_code)]
    #[serde(default)]
    date: String,
    #[allow(dead_code)]
    #[serde(rename = "userId", default)]
    user_id: i64,
    measurements: Vec<WireMeasurement>,
}

/// Grid resolution as spelled on the wire (`"sparse"|"medium"|"dense"`).
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WireGridDensity {
    Sparse,
    Medium,
    Dense,
}

impl From<WireGridDensity> for GridDensity {
    fn from(d: WireGridDensity) -> Self {
        match d {
            WireGridDensity::Sparse => GridDensity::Sparse,
            WireGridDensity::Medium => GridDensity::Medium,
            WireGridDensity::Dense => GridDensity::Dense,
        }
    }
}

/// The full inbound request payload.
#[derive(Clone, Debug, Deserialize)]
pub struct SimulationRequest {
    #[serde(rename = "droneFlight")]
    drone_flight: DroneFlight,
    #[serde(rename = "numSteps")]
    num_steps: usize,
    pollutants: Vec<String>,
    #[serde(rename = "gridDensity")]
    grid_density: WireGridDensity,
    urbanized: bool,
    #[serde(rename = "marginBoxes")]
    margin_boxes: usize,
    #[serde(rename = "initialDistance")]
    initial_distance: usize,
    #[serde(rename = "decayRate")]
    decay_rate: f64,
    #[serde(rename = "emissionRate")]
    emission_rate: f64,
    #[serde(rename = "snapInterval")]
    snap_interval: usize,
}

impl SimulationRequest {
    /// Parse a request payload from its raw JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, BrokerError> {
        serde_json::from_slice(bytes).map_err(|e| BrokerError::MalformedPayload(e.to_string()))
    }

    /// Convert the wire request into the domain [`SimulationJob`].
    pub fn into_job(self) -> SimulationJob {
        SimulationJob {
            measurements: self
                .drone_flight
                .measurements
                .into_iter()
                .map(Measurement::from)
                .collect(),
            num_steps: self.num_steps,
            pollutants: self.pollutants,
            grid_density: self.grid_density.into(),
            urbanized: self.urbanized,
            margin_boxes: self.margin_boxes,
            initial_distance: self.initial_distance,
            decay_rate: self.decay_rate,
            emission_rate: self.emission_rate,
            snap_interval: self.snap_interval,
        }
    }
}

/// The `{status, result}` reply envelope.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationResponse {
    /// One of `completed`, `failed`, `timeExceeded`.
    pub status: &'static str,
    /// The assembled result on success; `null` on failure or timeout.
    pub result: Option<plume_sim::SimulationOutput>,
}

impl SimulationResponse {
    /// Serialize to the wire JSON body, e.g. for publishing to `reply_to`.
    pub fn to_json(&self) -> Result<Vec<u8>, BrokerError> {
        serde_json::to_vec(self).map_err(|e| BrokerError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> &'static str {
        r#"{
            "droneFlight": {
                "id": 1,
                "title": "flight-1",
                "description": "test",
                "date": "2026-01-01",
                "userId": 7,
                "measurements": [
                    {
                        "id": 1,
                        "name": "m1",
                        "latitude": 50.0,
                        "longitude": 19.9,
                        "temperature": 18.0,
                        "windSpeed": 2.0,
                        "windDirection": 45.0,
                        "pressure": 101325.0,
                        "flightId": 1,
                        "pollutionMeasurements": [
                            {"id": 1, "type": "CO", "value": 120.0, "measurementId": 1}
                        ]
                    }
                ]
            },
            "numSteps": 5,
            "pollutants": ["CO"],
            "gridDensity": "sparse",
            "urbanized": false,
            "marginBoxes": 1,
            "initialDistance": 1,
            "decayRate": 0.01,
            "emissionRate": 0.01,
            "snapInterval": 1
        }"#
    }

    #[test]
    fn parses_well_formed_request() {
        let req = SimulationRequest::from_json(sample_payload().as_bytes()).expect("parses");
        let job = req.into_job();
        assert_eq!(job.measurements.len(), 1);
        assert_eq!(job.measurements[0].pollutant("CO"), Some(120.0));
        assert_eq!(job.num_steps, 5);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = SimulationRequest::from_json(b"not json").expect_err("must fail");
        assert!(matches!(err, BrokerError::MalformedPayload(_)));
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = SimulationRequest::from_json(b"{}").expect_err("must fail");
        assert!(matches!(err, BrokerError::MalformedPayload(_)));
    }

    #[test]
    fn response_serializes_null_result_on_failure() {
        let response = SimulationResponse {
            status: "failed",
            result: None,
        };
        let bytes = response.to_json().expect("serializes");
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["status"], "failed");
        assert!(value["result"].is_null());
    }
}
