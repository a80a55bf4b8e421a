//! SkyRoute inquiry router core library
//!
//! This crate provides the core functionality for the travel assistant:
//! - Parameter extraction from free-text queries
//! - Conversational memory and follow-up resolution
//! - Intent classification (heuristic, with an optional LLM adapter)
//! - Routing to flight status and analytics providers
//! - Configuration

pub mod types;

pub mod classifier;
pub mod config;
pub mod extract;
pub mod llm;
pub mod memory;
pub mod providers;
pub mod resolver;
pub mod router;

// Re-export commonly used types at crate root
pub use types::{ExtractedParameters, Intent, Outcome, ResolutionFailure, ResolvedRequest, Target};

pub use classifier::{ClassifierAdapter, ClassifierVerdict, TextCompletion};
pub use config::Settings;
pub use extract::extract;
pub use memory::{ConversationalMemory, MemorySnapshot};
pub use providers::{AnalyticsProvider, ProviderError, StatusProvider};
pub use resolver::{resolve, Anchor, Fallback, RoutingPolicy};
pub use router::Router;
