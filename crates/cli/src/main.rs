//! SkyRoute travel assistant CLI
//!
//! A thin wrapper around skyroute-core: builds the providers from config and
//! environment, then answers one query or runs an interactive session.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skyroute_core::config::{self, Settings, STATUS_API_KEY_VAR};
use skyroute_core::llm::LlmClient;
use skyroute_core::providers::{
    AviationStackClient, StatusProvider, StubAnalyticsProvider, StubStatusProvider, WarehouseClient,
};
use skyroute_core::{ClassifierAdapter, Router};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "skyroute")]
#[command(about = "Flight status and route analytics from plain-language questions")]
struct Args {
    /// Question to answer once; omit for an interactive session
    query: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Classify queries with the configured LLM before falling back to patterns
    #[arg(long = "use-llm")]
    use_llm: bool,

    /// Use offline stub providers (no API keys needed)
    #[arg(long)]
    stub: bool,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

// ============================================================================
// Setup
// ============================================================================

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("skyroute=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skyroute=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn build_router(args: &Args, settings: &Settings) -> Result<Router> {
    let status: Box<dyn StatusProvider> = if args.stub {
        Box::new(StubStatusProvider)
    } else {
        let key = config::status_api_key().with_context(|| {
            format!("{} is not set (add it to .env, or run with --stub)", STATUS_API_KEY_VAR)
        })?;
        Box::new(AviationStackClient::new(&settings.status, key)?)
    };

    let mut router = Router::new(status).with_policy(settings.routing);

    if args.stub {
        router = router.with_analytics(Box::new(StubAnalyticsProvider));
    } else if let Some(warehouse) = WarehouseClient::from_settings(&settings.analytics)? {
        router = router.with_analytics(Box::new(warehouse));
    } else {
        info!("no analytics endpoints configured");
    }

    if args.use_llm || settings.llm.enabled {
        match LlmClient::new(&settings.llm, config::llm_api_key()) {
            Ok(client) => {
                info!(model = %settings.llm.model, "LLM classifier enabled");
                router = router.with_classifier(ClassifierAdapter::new(Box::new(client)));
            }
            Err(e) => warn!(error = %e, "LLM classifier unavailable, using pattern-based routing"),
        }
    }

    Ok(router)
}

// ============================================================================
// Interactive session
// ============================================================================

fn banner(analytics_available: bool, llm_enabled: bool) -> String {
    let mut out = String::from("✈️  SkyRoute - your travel assistant\n");
    out.push_str(&"=".repeat(40));
    out.push('\n');
    out.push_str(&format!(
        "Routing: {}, analytics {}\n\nTry asking:\n",
        if llm_enabled { "LLM-assisted" } else { "pattern-based" },
        if analytics_available { "enabled" } else { "unavailable" }
    ));
    out.push_str("  🔍 What's the status of AA123?\n");
    if analytics_available {
        out.push_str("  💸 Cheapest fares from SFO to JFK in 2024\n");
        out.push_str("  📊 Which airlines are most on-time from EWR to SFO?\n");
        out.push_str("  📅 Which day has the least delays from JFK to ATL?\n");
        out.push_str("  💬 What about from LGA to ORD?\n");
    }
    out.push_str("  ❌ Type 'exit' to leave\n");
    out
}

fn is_exit(line: &str) -> bool {
    matches!(line.to_lowercase().as_str(), "exit" | "quit")
}

/// Read queries until exit/EOF, answering each through the router
fn run_interactive<R: BufRead, W: Write>(
    router: &mut Router,
    llm_enabled: bool,
    mut input: R,
    mut out: W,
) -> Result<()> {
    writeln!(out, "{}", banner(router.analytics_available(), llm_enabled))?;

    let mut line = String::new();
    loop {
        write!(out, "🗣️  > ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            break;
        }

        let query = line.trim();
        if is_exit(query) {
            break;
        }
        if query.is_empty() {
            writeln!(out, "💭 Ask whenever you're ready.")?;
            continue;
        }

        writeln!(out, "\n{}\n", router.handle(query))?;
    }

    writeln!(out, "👋 Safe travels!")?;
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.verbose);

    let settings = Settings::load(args.config.as_deref())?;
    let llm_enabled = args.use_llm || settings.llm.enabled;
    let mut router = build_router(&args, &settings)?;

    match args.query {
        Some(ref query) => {
            println!("{}", router.handle(query));
            Ok(())
        }
        None => run_interactive(&mut router, llm_enabled, io::stdin().lock(), io::stdout().lock()),
    }
}
