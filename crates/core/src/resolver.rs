//! Query Resolution
//!
//! Turns a raw query, its extracted parameters and a memory snapshot into a
//! fully parameterized [`ResolvedRequest`] or a typed [`ResolutionFailure`].
//! Resolution is pure: the same inputs always give the same outcome.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::ClassifierVerdict;
use crate::memory::MemorySnapshot;
use crate::types::{ExtractedParameters, Intent, Outcome, ResolutionFailure, ResolvedRequest};

pub const YEAR_MIN: i32 = 1990;
pub const YEAR_MAX: i32 = 2030;
pub const LIMIT_MIN: i64 = 1;
pub const LIMIT_MAX: i64 = 50;

const DAY_OF_WEEK_WORDS: &[&str] = &[
    "day", "days", "weekday", "weekdays", "weekend", "monday", "tuesday", "wednesday",
    "thursday", "friday", "saturday", "sunday", "mondays", "tuesdays", "wednesdays",
    "thursdays", "fridays", "saturdays", "sundays",
];

const FARE_WORDS: &[&str] = &[
    "fare", "fares", "cheap", "cheapest", "cheaper", "price", "prices", "cost", "costs",
    "ticket", "tickets", "deal", "deals", "budget",
];

const ON_TIME_WORDS: &[&str] = &[
    "on-time", "ontime", "punctual", "delay", "delays", "delayed", "performance", "airline",
    "airlines", "carrier", "carriers", "best", "worst", "reliable", "rank", "ranking",
    "compare", "comparison",
];

// ============================================================================
// Policy
// ============================================================================

/// What to do when no heuristic recognizes the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// Fail with [`ResolutionFailure::Unclassified`] (help message)
    #[default]
    Help,
    FareAnalysis,
    OnTimeRanking,
    DayOfWeekDelay,
}

impl Fallback {
    fn intent(&self) -> Option<Intent> {
        match self {
            Fallback::Help => None,
            Fallback::FareAnalysis => Some(Intent::FareAnalysis),
            Fallback::OnTimeRanking => Some(Intent::OnTimeRanking),
            Fallback::DayOfWeekDelay => Some(Intent::DayOfWeekDelay),
        }
    }
}

/// Which end of a remembered route stays fixed when a follow-up names a
/// single new airport without saying "from" or "to"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Keep the origin, the new code replaces the destination
    #[default]
    Origin,
    /// Keep the destination, the new code replaces the origin
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingPolicy {
    pub fallback: Fallback,
    pub anchor: Anchor,
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve one turn
pub fn resolve(
    raw: &str,
    extracted: &ExtractedParameters,
    memory: &MemorySnapshot,
    hint: ClassifierVerdict,
    policy: &RoutingPolicy,
) -> Outcome {
    let intent = match working_intent(raw, extracted, memory, hint, policy) {
        Some(intent) => intent,
        // A follow-up with nothing to follow fails like a cold route query
        None if extracted.continuation => return Err(ResolutionFailure::MissingRoute),
        None => return Err(ResolutionFailure::Unclassified),
    };
    debug!(intent = intent.as_label(), "working intent");

    if !intent.is_route_based() {
        let flight_number = extracted
            .flight_number
            .clone()
            .or_else(|| {
                if extracted.continuation && memory.intent == Some(Intent::FlightStatus) {
                    memory.flight_number.clone()
                } else {
                    None
                }
            })
            .ok_or(ResolutionFailure::MissingFlightNumber)?;

        return Ok(ResolvedRequest {
            intent,
            origin: None,
            destination: None,
            flight_number: Some(flight_number),
            year: None,
            limit: intent.default_limit(),
        });
    }

    let (origin, destination) = resolve_route(raw, extracted, memory, policy)?;
    let year = resolve_year(extracted, memory)?;
    let limit = resolve_limit(intent, extracted, memory)?;

    Ok(ResolvedRequest {
        intent,
        origin: Some(origin),
        destination: Some(destination),
        flight_number: None,
        year,
        limit,
    })
}

/// Pick the intent for this turn, or `None` when nothing applies and the
/// policy asks for help instead of a default
fn working_intent(
    raw: &str,
    extracted: &ExtractedParameters,
    memory: &MemorySnapshot,
    hint: ClassifierVerdict,
    policy: &RoutingPolicy,
) -> Option<Intent> {
    if let ClassifierVerdict::Intent(intent) = hint {
        return Some(intent);
    }
    if extracted.flight_number.is_some() {
        return Some(Intent::FlightStatus);
    }
    if let Some(intent) = vocabulary_intent(raw, extracted) {
        return Some(intent);
    }
    if extracted.continuation {
        // A status follow-up that names a route is not about the old flight
        let previous = memory
            .intent
            .filter(|i| i.is_route_based() || extracted.origin_candidates.is_empty());
        if previous.is_some() {
            return previous;
        }
    }
    if extracted.origin_candidates.len() >= 2 {
        return Some(Intent::FareAnalysis);
    }
    policy.fallback.intent()
}

/// Keyword rules over the lower-cased query
fn vocabulary_intent(raw: &str, extracted: &ExtractedParameters) -> Option<Intent> {
    let lower = raw.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .collect();
    let has_any = |vocab: &[&str]| words.iter().any(|w| vocab.contains(w));

    if has_any(DAY_OF_WEEK_WORDS) || lower.contains("day of week") || lower.contains("day of the week") {
        Some(Intent::DayOfWeekDelay)
    } else if extracted.origin_candidates.len() >= 2 && has_any(FARE_WORDS) {
        Some(Intent::FareAnalysis)
    } else if has_any(ON_TIME_WORDS) || lower.contains("on time") {
        Some(Intent::OnTimeRanking)
    } else {
        None
    }
}

fn resolve_route(
    raw: &str,
    extracted: &ExtractedParameters,
    memory: &MemorySnapshot,
    policy: &RoutingPolicy,
) -> Result<(String, String), ResolutionFailure> {
    let candidates = &extracted.origin_candidates;

    if candidates.len() >= 2 {
        let origin = &candidates[0];
        return match candidates.iter().find(|c| *c != origin) {
            Some(destination) => Ok((origin.clone(), destination.clone())),
            None => Err(ResolutionFailure::AmbiguousAirports),
        };
    }

    let remembered = if extracted.continuation { memory.route() } else { None };
    let Some((prev_origin, prev_destination)) = remembered else {
        return Err(ResolutionFailure::MissingRoute);
    };

    let Some(code) = candidates.first() else {
        return Ok((prev_origin.to_string(), prev_destination.to_string()));
    };
    let code = code.as_str();
    let lower = raw.to_lowercase();
    let code_lower = code.to_lowercase();

    let route = if lower.contains(&format!("from {}", code_lower)) {
        let other = if prev_destination != code { prev_destination } else { prev_origin };
        (code, other)
    } else if lower.contains(&format!("to {}", code_lower)) {
        let other = if prev_origin != code { prev_origin } else { prev_destination };
        (other, code)
    } else if code == prev_destination {
        (prev_destination, prev_origin)
    } else if code == prev_origin {
        (prev_origin, prev_destination)
    } else {
        match policy.anchor {
            Anchor::Origin => (prev_origin, code),
            Anchor::Destination => (code, prev_destination),
        }
    };

    if route.0 == route.1 {
        return Err(ResolutionFailure::AmbiguousAirports);
    }
    Ok((route.0.to_string(), route.1.to_string()))
}

fn resolve_year(
    extracted: &ExtractedParameters,
    memory: &MemorySnapshot,
) -> Result<Option<i32>, ResolutionFailure> {
    match extracted.year {
        Some(year) if (YEAR_MIN..=YEAR_MAX).contains(&year) => Ok(Some(year)),
        Some(_) => Err(ResolutionFailure::InvalidYear),
        None if extracted.continuation => Ok(memory.year),
        None => Ok(None),
    }
}

fn resolve_limit(
    intent: Intent,
    extracted: &ExtractedParameters,
    memory: &MemorySnapshot,
) -> Result<u32, ResolutionFailure> {
    match extracted.limit {
        // Range check bounds the value to 1..=50, so the cast cannot truncate
        Some(limit) if (LIMIT_MIN..=LIMIT_MAX).contains(&limit) => Ok(limit as u32),
        Some(_) => Err(ResolutionFailure::InvalidLimit),
        None => Ok(memory
            .limit
            .filter(|_| extracted.continuation && memory.intent == Some(intent))
            .unwrap_or_else(|| intent.default_limit())),
    }
}
