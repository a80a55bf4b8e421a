//! Inquiry Router
//!
//! Top-level turn handler: classify, resolve, dispatch, remember. Every
//! failure below this point becomes a text answer; `handle` never errors.

use tracing::{debug, info, warn};

use crate::classifier::{ClassifierAdapter, ClassifierVerdict};
use crate::extract::extract;
use crate::memory::{ConversationalMemory, MemorySnapshot};
use crate::providers::{AnalyticsProvider, ProviderError, StatusProvider};
use crate::resolver::{resolve, RoutingPolicy};
use crate::types::{ResolvedRequest, Target};

/// Reply to empty input
pub const EMPTY_QUERY_PROMPT: &str =
    "I'd love to help! Ask me about a flight (e.g., 'status of AA123') or a route (e.g., 'cheapest fares from SFO to JFK').";

/// Reply when an analytics intent has no backend
pub const ANALYTICS_UNAVAILABLE: &str =
    "📊 Sorry, delay and fare analytics are unavailable right now. I can still check live flight status, e.g. 'What's the status of AA123?'";

/// One conversation session
pub struct Router {
    status: Box<dyn StatusProvider>,
    analytics: Option<Box<dyn AnalyticsProvider>>,
    classifier: ClassifierAdapter,
    policy: RoutingPolicy,
    memory: ConversationalMemory,
}

impl Router {
    pub fn new(status: Box<dyn StatusProvider>) -> Self {
        Self {
            status,
            analytics: None,
            classifier: ClassifierAdapter::disabled(),
            policy: RoutingPolicy::default(),
            memory: ConversationalMemory::new(),
        }
    }

    pub fn with_analytics(mut self, analytics: Box<dyn AnalyticsProvider>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn with_classifier(mut self, classifier: ClassifierAdapter) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_policy(mut self, policy: RoutingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn analytics_available(&self) -> bool {
        self.analytics.is_some()
    }

    pub fn memory(&self) -> MemorySnapshot {
        self.memory.read()
    }

    /// Forget the conversation so far
    pub fn reset(&mut self) {
        self.memory.clear();
    }

    /// Handle one turn and return the text shown to the user
    pub fn handle(&mut self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return EMPTY_QUERY_PROMPT.to_string();
        }

        let extracted = extract(raw);
        let snapshot = self.memory.read();
        debug!(?extracted, "extracted parameters");

        let hint = self.classify(raw, extracted.continuation, &snapshot);

        let request = match resolve(raw, &extracted, &snapshot, hint, &self.policy) {
            Ok(request) => request,
            Err(failure) => {
                info!(%failure, "resolution failed");
                return failure.user_message();
            }
        };
        info!(intent = request.intent.as_label(), ?request, "resolved");

        let reply = match request.intent.target() {
            Target::Status => self.dispatch_status(&request),
            Target::Analytics => match self.analytics.as_deref() {
                Some(analytics) if analytics.supports(request.intent) => {
                    dispatch_analytics(analytics, &request)
                }
                _ => {
                    info!(intent = request.intent.as_label(), "analytics unavailable");
                    return ANALYTICS_UNAVAILABLE.to_string();
                }
            },
        };

        self.memory.write(&request);
        reply
    }

    fn classify(&self, raw: &str, continuation: bool, snapshot: &MemorySnapshot) -> ClassifierVerdict {
        if continuation && snapshot.intent.is_some() {
            debug!(source = "continuation", intent = ?snapshot.intent, "skipping classifier");
            return ClassifierVerdict::Unknown;
        }
        if !self.classifier.is_enabled() {
            debug!(source = "heuristic", "classifier disabled");
            return ClassifierVerdict::Unknown;
        }

        let verdict = self.classifier.classify(raw);
        debug!(source = "classifier", ?verdict, "classified");
        verdict
    }

    fn dispatch_status(&self, request: &ResolvedRequest) -> String {
        let flight = request.flight_number.as_deref().unwrap_or_default();
        info!(flight, "dispatching to status provider");

        match self.status.get_status(flight) {
            Ok(text) => text,
            Err(err) => {
                warn!(flight, error = %err, "status provider failed");
                status_failure_message(flight, &err)
            }
        }
    }
}

fn dispatch_analytics(analytics: &dyn AnalyticsProvider, request: &ResolvedRequest) -> String {
    info!(intent = request.intent.as_label(), route = %request.route_label(), "dispatching to analytics provider");

    match analytics.run_analysis(request) {
        Ok(text) => text,
        Err(err) => {
            warn!(intent = request.intent.as_label(), error = %err, "analytics provider failed");
            analytics_failure_message(request, &err)
        }
    }
}

// ============================================================================
// Failure text
// ============================================================================

fn status_failure_message(flight: &str, err: &ProviderError) -> String {
    match err {
        ProviderError::NotFound(_) => format!(
            "✈️ Sorry, I couldn't find any information for flight {}. Please check the flight number.",
            flight
        ),
        ProviderError::Forbidden(_) => {
            "🔒 Sorry, I'm not authorized to look up flight status right now. Please check the API key.".to_string()
        }
        ProviderError::Malformed(_) => format!(
            "⚠️ Sorry, the flight status service sent back something I couldn't read for {}. Please try again.",
            flight
        ),
        ProviderError::Timeout => format!(
            "⏱️ Sorry, the flight status service took too long to respond for {}. Please try again in a moment.",
            flight
        ),
        ProviderError::Connection(_) => {
            "🌐 Sorry, I couldn't reach the flight status service. Please check your connection.".to_string()
        }
        other => format!("⚠️ Sorry, I couldn't get the status of flight {}: {}", flight, other),
    }
}

fn analytics_failure_message(request: &ResolvedRequest, err: &ProviderError) -> String {
    let what = request.intent.describe();
    let route = request.route_label();

    match err {
        ProviderError::NoRows(_) => {
            let years = match request.year {
                Some(y) => format!(" in {}", y),
                None => String::new(),
            };
            format!("📭 I couldn't find any {} data for {}{}. Try another route or year.", what, route, years)
        }
        ProviderError::NotFound(_) => format!(
            "📭 Sorry, the {} data source for {} could not be found.",
            what, route
        ),
        ProviderError::Forbidden(_) => format!(
            "🔒 Sorry, I don't have permission to run the {} right now.",
            what
        ),
        ProviderError::BadRequest(_) => format!(
            "⚠️ Sorry, the {} request for {} was rejected. Please try rephrasing.",
            what, route
        ),
        ProviderError::Timeout => format!(
            "⏱️ Sorry, the {} for {} took too long. Please try again in a moment.",
            what, route
        ),
        ProviderError::Connection(_) => {
            "🌐 Sorry, I couldn't reach the analytics service. Please check your connection.".to_string()
        }
        other => format!("⚠️ Sorry, the {} for {} failed: {}", what, route, other),
    }
}
