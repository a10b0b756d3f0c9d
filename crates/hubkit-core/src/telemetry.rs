//! Simulated payloads for demo traffic.
//!
//! These are the shapes the demo generator publishes as JSON: a web
//! request record and a device heartbeat. Both carry a dotted-quad IPv4
//! source address and a UTC timestamp.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A simulated HTTP request record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebRequest {
    /// Source address of the request
    pub ip_address: String,

    /// Time the request was issued (UTC)
    pub time: DateTime<Utc>,
}

impl WebRequest {
    /// Draw a random request stamped with the current time
    pub fn random() -> Self {
        Self {
            ip_address: random_ip(&mut rand::thread_rng()),
            time: Utc::now(),
        }
    }
}

/// Kind of device reporting telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Unknown,
    PersonalComputer,
    Laptop,
    Phone,
    Tablet,
}

impl DeviceKind {
    /// Draw a random device kind
    pub fn random() -> Self {
        match rand::thread_rng().gen_range(0..5) {
            0 => DeviceKind::Unknown,
            1 => DeviceKind::PersonalComputer,
            2 => DeviceKind::Laptop,
            3 => DeviceKind::Phone,
            _ => DeviceKind::Tablet,
        }
    }
}

/// A simulated device heartbeat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTelemetry {
    /// Reporting device kind
    pub kind: DeviceKind,

    /// Whether the device was powered on at report time
    pub powered_on: bool,

    /// Device network address
    pub ip_address: String,

    /// Report time (UTC)
    pub time: DateTime<Utc>,
}

impl DeviceTelemetry {
    /// Draw a random heartbeat stamped with the current time
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            kind: DeviceKind::random(),
            powered_on: rng.gen(),
            ip_address: random_ip(&mut rng),
            time: Utc::now(),
        }
    }
}

fn random_ip<R: Rng>(rng: &mut R) -> String {
    format!(
        "{}.{}.{}.{}",
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
        rng.gen_range(0..=255)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ip_is_dotted_quad() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let ip = random_ip(&mut rng);
            let octets: Vec<&str> = ip.split('.').collect();
            assert_eq!(octets.len(), 4);
            for octet in octets {
                octet.parse::<u8>().unwrap();
            }
        }
    }

    #[test]
    fn test_web_request_round_trips_as_json() {
        let request = WebRequest::random();
        let json = serde_json::to_string(&request).unwrap();
        let decoded: WebRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, decoded);
    }

    #[test]
    fn test_device_telemetry_serializes_kind_by_name() {
        let telemetry = DeviceTelemetry {
            kind: DeviceKind::Laptop,
            powered_on: true,
            ip_address: "10.0.0.7".to_string(),
            time: Utc::now(),
        };
        let json = serde_json::to_string(&telemetry).unwrap();
        assert!(json.contains("\"Laptop\""));
        assert!(json.contains("\"10.0.0.7\""));
    }
}
