//! Intent Classifier adapter
//!
//! Wraps an optional text-to-text completion function (usually an LLM) and
//! turns whatever it answers into a closed verdict. Errors, panics and
//! off-label answers all become [`ClassifierVerdict::Unknown`]; nothing here
//! ever fails the turn.

use anyhow::Result;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

use crate::types::Intent;

/// Instructions prepended to every classification prompt
const SYSTEM_PROMPT: &str = r#"You are a flight query classifier. Reply with exactly one word: "status", "fare", "ontime" or "weekday".

STATUS queries ask about a specific flight number (e.g., "AA123", "DL456"):
- "What's the status of AA123?"
- "Is flight UA456 on time?"

FARE queries ask about ticket prices between two airports:
- "Cheapest fares from SFO to JFK in 2024"
- "How much does LAX to ORD cost?"

ONTIME queries ask about airlines, delays or on-time performance on a route:
- "What are the most on-time airlines from SFO to JFK?"
- "Show me airlines with the best performance from EWR to ORD"

WEEKDAY queries ask which day of the week is best or has the fewest delays:
- "Which day has fewer delays from EWR to ORD?"

Follow-up phrases like "what about" should usually keep the type of the previous query."#;

/// A text-in, text-out completion backend
pub trait TextCompletion {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<F> TextCompletion for F
where
    F: Fn(&str) -> Result<String>,
{
    fn complete(&self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

/// Normalized classifier answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierVerdict {
    Intent(Intent),
    Unknown,
}

/// Best-effort classifier; disabled when built without a backend
pub struct ClassifierAdapter {
    backend: Option<Box<dyn TextCompletion>>,
}

impl ClassifierAdapter {
    pub fn new(backend: Box<dyn TextCompletion>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Classify a query; never fails
    pub fn classify(&self, raw: &str) -> ClassifierVerdict {
        let Some(backend) = self.backend.as_ref() else {
            return ClassifierVerdict::Unknown;
        };

        let prompt = build_prompt(raw);
        let answer = catch_unwind(AssertUnwindSafe(|| backend.complete(&prompt)));

        match answer {
            Ok(Ok(text)) => {
                let verdict = normalize_label(&text);
                if verdict == ClassifierVerdict::Unknown {
                    warn!(response = %text.trim(), "classifier returned an unexpected label");
                } else {
                    debug!(?verdict, "classifier verdict");
                }
                verdict
            }
            Ok(Err(e)) => {
                warn!(error = %e, "classifier call failed, using heuristics");
                ClassifierVerdict::Unknown
            }
            Err(_) => {
                warn!("classifier panicked, using heuristics");
                ClassifierVerdict::Unknown
            }
        }
    }
}

impl Default for ClassifierAdapter {
    fn default() -> Self {
        Self::disabled()
    }
}

fn build_prompt(raw: &str) -> String {
    format!("{}\n\nUser query: {}", SYSTEM_PROMPT, raw)
}

/// Map free-form classifier output onto the closed label set
pub fn normalize_label(text: &str) -> ClassifierVerdict {
    let cleaned: String = text
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.' || c == '!')
        .to_lowercase()
        .replace([' ', '-'], "_");

    let intent = match cleaned.as_str() {
        "status" | "flight_status" => Intent::FlightStatus,
        "fare" | "fares" | "fare_analysis" | "price" => Intent::FareAnalysis,
        "ontime" | "on_time" | "on_time_ranking" | "delay" | "ranking" => Intent::OnTimeRanking,
        "weekday" | "day_of_week" | "day_of_week_delay" | "day" => Intent::DayOfWeekDelay,
        _ => return ClassifierVerdict::Unknown,
    };
    ClassifierVerdict::Intent(intent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_normalize_label_variants() {
        assert_eq!(normalize_label("status"), ClassifierVerdict::Intent(Intent::FlightStatus));
        assert_eq!(normalize_label("  \"Fare\".\n"), ClassifierVerdict::Intent(Intent::FareAnalysis));
        assert_eq!(normalize_label("On-Time"), ClassifierVerdict::Intent(Intent::OnTimeRanking));
        assert_eq!(normalize_label("delay"), ClassifierVerdict::Intent(Intent::OnTimeRanking));
        assert_eq!(normalize_label("day of week"), ClassifierVerdict::Intent(Intent::DayOfWeekDelay));
    }

    #[test]
    fn test_normalize_label_rejects_prose() {
        assert_eq!(normalize_label("I think this is a status query"), ClassifierVerdict::Unknown);
        assert_eq!(normalize_label(""), ClassifierVerdict::Unknown);
        assert_eq!(normalize_label("weather"), ClassifierVerdict::Unknown);
    }

    #[test]
    fn test_disabled_adapter_is_unknown() {
        let adapter = ClassifierAdapter::disabled();
        assert!(!adapter.is_enabled());
        assert_eq!(adapter.classify("AA123"), ClassifierVerdict::Unknown);
    }

    #[test]
    fn test_prompt_contains_query() {
        let adapter = ClassifierAdapter::new(Box::new(|prompt: &str| -> Result<String> {
            assert!(prompt.contains("User query: cheapest SFO to JFK"));
            assert!(prompt.starts_with("You are a flight query classifier"));
            Ok("fare".to_string())
        }));
        assert_eq!(
            adapter.classify("cheapest SFO to JFK"),
            ClassifierVerdict::Intent(Intent::FareAnalysis)
        );
    }

    #[test]
    fn test_backend_error_becomes_unknown() {
        let adapter = ClassifierAdapter::new(Box::new(|_: &str| -> Result<String> {
            Err(anyhow!("timeout"))
        }));
        assert_eq!(adapter.classify("AA123"), ClassifierVerdict::Unknown);
    }

    #[test]
    fn test_backend_panic_becomes_unknown() {
        let adapter = ClassifierAdapter::new(Box::new(|_: &str| -> Result<String> {
            panic!("backend exploded")
        }));
        assert_eq!(adapter.classify("AA123"), ClassifierVerdict::Unknown);
    }
}
