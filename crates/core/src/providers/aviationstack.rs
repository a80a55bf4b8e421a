//! AviationStack flight status client
//!
//! Looks up a flight by IATA number and formats the most recent record.

use anyhow::{Context, Result};
use chrono::DateTime;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{ProviderError, StatusProvider};
use crate::config::StatusSettings;

// ============================================================================
// API response structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct FlightsResponse {
    #[serde(default)]
    data: Option<Vec<FlightRecord>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FlightRecord {
    #[serde(default)]
    flight_status: Option<String>,
    #[serde(default)]
    airline: Option<Airline>,
    #[serde(default)]
    departure: Option<Endpoint>,
    #[serde(default)]
    arrival: Option<Endpoint>,
}

#[derive(Debug, Deserialize)]
struct Airline {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Endpoint {
    #[serde(default)]
    airport: Option<String>,
    #[serde(default)]
    scheduled: Option<String>,
    #[serde(default)]
    actual: Option<String>,
    #[serde(default)]
    estimated: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

pub struct AviationStackClient {
    client: Client,
    base_url: String,
    access_key: String,
}

impl AviationStackClient {
    pub fn new(settings: &StatusSettings, access_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            access_key,
        })
    }
}

impl StatusProvider for AviationStackClient {
    fn get_status(&self, flight_number: &str) -> Result<String, ProviderError> {
        let flight = flight_number.to_uppercase();
        info!(flight = %flight, "fetching flight status");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("access_key", self.access_key.as_str()), ("flight_iata", flight.as_str())])
            .send()?;

        let status = response.status();
        let body = response.text()?;
        debug!(%status, bytes = body.len(), "status API responded");

        if !status.is_success() {
            return Err(ProviderError::from_status(status, &body));
        }

        let parsed: FlightsResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(api_error(err));
        }

        match parsed.data.unwrap_or_default().into_iter().next() {
            Some(record) => Ok(format_status(&flight, &record)),
            None => Err(ProviderError::NotFound(format!(
                "No flight information found for {}. Please verify the flight number.",
                flight
            ))),
        }
    }
}

/// AviationStack reports some failures as an error object in a 200 body
fn api_error(err: ApiError) -> ProviderError {
    let message = err.message.unwrap_or_else(|| "unknown API error".to_string());
    match err.code.as_deref() {
        Some("invalid_access_key" | "missing_access_key" | "inactive_user" | "https_access_restricted") => {
            ProviderError::Forbidden(message)
        }
        Some("404_not_found" | "invalid_api_function") => ProviderError::NotFound(message),
        Some(_) => ProviderError::BadRequest(message),
        None => ProviderError::Other(message),
    }
}

// ============================================================================
// Formatting
// ============================================================================

fn format_status(flight: &str, record: &FlightRecord) -> String {
    let airline = record
        .airline
        .as_ref()
        .and_then(|a| a.name.as_deref())
        .unwrap_or("Unknown airline");
    let status = record.flight_status.as_deref().unwrap_or("unknown status");
    let empty = Endpoint::default();
    let dep = record.departure.as_ref().unwrap_or(&empty);
    let arr = record.arrival.as_ref().unwrap_or(&empty);

    let mut msg = format!(
        "Flight {} ({}) - Status: {}\nFrom: {} (Scheduled: {})\nTo: {} (Scheduled: {})",
        flight,
        airline,
        title_case(status),
        dep.airport.as_deref().unwrap_or("Unknown"),
        format_time(dep.scheduled.as_deref()),
        arr.airport.as_deref().unwrap_or("Unknown"),
        format_time(arr.scheduled.as_deref()),
    );

    if let Some(actual) = dep.actual.as_deref() {
        if Some(actual) != dep.scheduled.as_deref() {
            msg.push_str(&format!("\nActual Departure: {}", format_time(Some(actual))));
        }
    }
    if let Some(estimated) = arr.estimated.as_deref() {
        if Some(estimated) != arr.scheduled.as_deref() {
            msg.push_str(&format!("\nEstimated Arrival: {}", format_time(Some(estimated))));
        }
    }

    msg
}

/// "2024-03-01T10:05:00+00:00" -> "2024-03-01 10:05"
fn format_time(ts: Option<&str>) -> String {
    match ts {
        None => "N/A".to_string(),
        Some(ts) => match DateTime::parse_from_rfc3339(ts) {
            Ok(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            Err(_) => ts.chars().take(16).collect(),
        },
    }
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
