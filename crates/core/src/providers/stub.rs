//! Offline backends for demos and local runs without API keys

use super::{AnalyticsProvider, ProviderError, StatusProvider};
use crate::types::ResolvedRequest;

/// Echoes the flight number it was asked about
#[derive(Debug, Default, Clone, Copy)]
pub struct StubStatusProvider;

impl StatusProvider for StubStatusProvider {
    fn get_status(&self, flight_number: &str) -> Result<String, ProviderError> {
        Ok(format!(
            "[stub] Flight {} - Status: Scheduled (no live data in offline mode)",
            flight_number.to_uppercase()
        ))
    }
}

/// Describes the analysis it would have run
#[derive(Debug, Default, Clone, Copy)]
pub struct StubAnalyticsProvider;

impl AnalyticsProvider for StubAnalyticsProvider {
    fn run_analysis(&self, request: &ResolvedRequest) -> Result<String, ProviderError> {
        let year = request
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "all years".to_string());
        Ok(format!(
            "[stub] {} for {} ({}), top {}",
            request.intent.describe(),
            request.route_label(),
            year,
            request.limit
        ))
    }
}
