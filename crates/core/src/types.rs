//! Domain models for the inquiry router
//!
//! This module contains the core types shared by the extractor, resolver and router:
//! - Intents and the provider each one is dispatched to
//! - Extracted (partial) parameters and fully resolved requests
//! - Typed resolution failures with their user-facing guidance

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Intents
// ============================================================================

/// Purpose of a query, as classified by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FlightStatus,
    FareAnalysis,
    OnTimeRanking,
    DayOfWeekDelay,
}

/// Which collaborator executes a resolved request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Status,
    Analytics,
}

impl Intent {
    pub const ALL: [Intent; 4] = [
        Intent::FlightStatus,
        Intent::FareAnalysis,
        Intent::OnTimeRanking,
        Intent::DayOfWeekDelay,
    ];

    /// Stable snake_case label (config keys, logs, template substitution)
    pub fn as_label(&self) -> &'static str {
        match self {
            Intent::FlightStatus => "flight_status",
            Intent::FareAnalysis => "fare_analysis",
            Intent::OnTimeRanking => "on_time_ranking",
            Intent::DayOfWeekDelay => "day_of_week_delay",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Intent::ALL.into_iter().find(|i| i.as_label() == label)
    }

    pub fn target(&self) -> Target {
        match self {
            Intent::FlightStatus => Target::Status,
            Intent::FareAnalysis | Intent::OnTimeRanking | Intent::DayOfWeekDelay => {
                Target::Analytics
            }
        }
    }

    /// Route-based intents need an origin and a destination
    pub fn is_route_based(&self) -> bool {
        self.target() == Target::Analytics
    }

    /// Result count used when the query names none
    pub fn default_limit(&self) -> u32 {
        match self {
            Intent::FlightStatus => 1,
            Intent::FareAnalysis => 5,
            Intent::OnTimeRanking => 10,
            Intent::DayOfWeekDelay => 7,
        }
    }

    /// Short human description, used in responses
    pub fn describe(&self) -> &'static str {
        match self {
            Intent::FlightStatus => "flight status",
            Intent::FareAnalysis => "fare analysis",
            Intent::OnTimeRanking => "on-time ranking",
            Intent::DayOfWeekDelay => "day-of-week delays",
        }
    }
}

// ============================================================================
// Extraction and resolution
// ============================================================================

/// Best-guess parameters pulled out of one raw query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedParameters {
    pub flight_number: Option<String>,

    /// 3-letter codes in order of appearance, stoplist removed, duplicates kept
    pub origin_candidates: Vec<String>,

    /// Unvalidated; range checks belong to the resolver
    pub year: Option<i32>,

    /// Unvalidated; defaults and range checks belong to the resolver
    pub limit: Option<i64>,

    /// Query opens with a follow-up phrase ("what about", "how about", ...)
    pub continuation: bool,
}

/// Fully parameterized request, passed verbatim to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRequest {
    pub intent: Intent,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    pub limit: u32,
}

impl ResolvedRequest {
    /// "SFO → JFK" or an empty string for non-route requests
    pub fn route_label(&self) -> String {
        match (&self.origin, &self.destination) {
            (Some(o), Some(d)) => format!("{} → {}", o, d),
            _ => String::new(),
        }
    }
}

/// Why a query could not be turned into a [`ResolvedRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    #[error("no flight number in query")]
    MissingFlightNumber,

    #[error("no origin/destination pair in query or conversation")]
    MissingRoute,

    #[error("year outside {min}..={max}", min = crate::resolver::YEAR_MIN, max = crate::resolver::YEAR_MAX)]
    InvalidYear,

    #[error("limit outside {min}..={max}", min = crate::resolver::LIMIT_MIN, max = crate::resolver::LIMIT_MAX)]
    InvalidLimit,

    #[error("airport codes do not form a distinct origin and destination")]
    AmbiguousAirports,

    #[error("query type could not be determined")]
    Unclassified,
}

impl ResolutionFailure {
    /// Guidance shown to the user instead of a result
    pub fn user_message(&self) -> String {
        match self {
            ResolutionFailure::MissingFlightNumber => {
                "✈️ I'd love to help with that flight! Please include a flight number like 'What's the status of AA123?'".to_string()
            }
            ResolutionFailure::MissingRoute => {
                "🛫 Which route do you mean? Please give two airport codes, e.g. 'Which airlines are most on-time from EWR to SFO?'".to_string()
            }
            ResolutionFailure::InvalidYear => format!(
                "📅 Please pick a year between {} and {}.",
                crate::resolver::YEAR_MIN,
                crate::resolver::YEAR_MAX
            ),
            ResolutionFailure::InvalidLimit => format!(
                "🔢 I can show between {} and {} results.",
                crate::resolver::LIMIT_MIN,
                crate::resolver::LIMIT_MAX
            ),
            ResolutionFailure::AmbiguousAirports => {
                "🤔 I need two different airports for a route, e.g. 'SFO to JFK'.".to_string()
            }
            ResolutionFailure::Unclassified => "I can help with these kinds of queries:\n\
                1. Flight status: include a flight number (e.g., 'What's the status of AA123?')\n\
                2. Fares: name a route (e.g., 'Cheapest fares from SFO to JFK in 2024')\n\
                3. On-time ranking: ask about airlines or delays (e.g., 'Which airlines are most on-time from EWR to SFO?')\n\
                4. Best day to fly: ask about days of the week (e.g., 'Which day has the least delays from JFK to ATL?')"
                .to_string(),
        }
    }
}

/// Result of resolving one turn
pub type Outcome = Result<ResolvedRequest, ResolutionFailure>;
