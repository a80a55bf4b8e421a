//! Conversational Memory
//!
//! Holds the parameters of the last fully resolved turn so that follow-up
//! queries ("what about 2024?") can borrow what they leave out. Lives for one
//! router session; nothing is persisted.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Intent, ResolvedRequest};

/// Immutable copy of the memory, handed to the resolver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub intent: Option<Intent>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub flight_number: Option<String>,
    pub year: Option<i32>,
    pub limit: Option<u32>,
}

impl MemorySnapshot {
    pub fn is_empty(&self) -> bool {
        *self == MemorySnapshot::default()
    }

    /// Both ends of the last route, if one was remembered
    pub fn route(&self) -> Option<(&str, &str)> {
        match (&self.origin, &self.destination) {
            (Some(o), Some(d)) => Some((o.as_str(), d.as_str())),
            _ => None,
        }
    }
}

/// Per-session memory owned by the router
#[derive(Debug, Default)]
pub struct ConversationalMemory {
    current: MemorySnapshot,
}

impl ConversationalMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> MemorySnapshot {
        self.current.clone()
    }

    /// Record a routed request.
    ///
    /// Fields set on the request always replace the stored ones. Fields the
    /// request leaves unset are kept when the intent is unchanged and cleared
    /// when the intent differs from the remembered one.
    pub fn write(&mut self, resolved: &ResolvedRequest) {
        let same_intent = self.current.intent == Some(resolved.intent);
        let prev = &self.current;

        let merge = |new: &Option<String>, old: &Option<String>| -> Option<String> {
            match new {
                Some(v) => Some(v.clone()),
                None if same_intent => old.clone(),
                None => None,
            }
        };

        let next = MemorySnapshot {
            intent: Some(resolved.intent),
            origin: merge(&resolved.origin, &prev.origin),
            destination: merge(&resolved.destination, &prev.destination),
            flight_number: merge(&resolved.flight_number, &prev.flight_number),
            year: match resolved.year {
                Some(y) => Some(y),
                None if same_intent => prev.year,
                None => None,
            },
            limit: Some(resolved.limit),
        };

        debug!(?next, same_intent, "memory updated");
        self.current = next;
    }

    pub fn clear(&mut self) {
        self.current = MemorySnapshot::default();
    }
}
