//! Analytics over a data-warehouse query service
//!
//! Each analytics intent maps to an HTTP endpoint from the config. Request
//! parameters are filled in by template substitution and the response rows are
//! rendered as text. The query itself (SQL, schema) belongs to the service.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

use super::{AnalyticsProvider, ProviderError};
use crate::config::AnalyticsSettings;
use crate::types::{Intent, ResolvedRequest};

// ============================================================================
// Endpoint configuration
// ============================================================================

/// HTTP endpoint serving one kind of analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// URL template (supports {{arg}} and ${ENV} substitution)
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    /// Query parameters
    #[serde(default)]
    pub query: HashMap<String, String>,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// JSON body template (POST/PUT)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Path to the array of result rows (e.g., "$.rows")
    #[serde(default = "default_rows_path")]
    pub rows_path: String,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_rows_path() -> String {
    "$".to_string()
}

// ============================================================================
// Template Substitution
// ============================================================================

fn placeholder_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\{\{(\w+)\}\}").unwrap())
}

fn env_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\$\{(\w+)\}").unwrap())
}

/// Template arguments exposed for a resolved request
fn request_args(request: &ResolvedRequest) -> Value {
    serde_json::json!({
        "intent": request.intent.as_label(),
        "origin": request.origin,
        "destination": request.destination,
        "year": request.year,
        "limit": request.limit,
    })
}

/// Substitute {{arg}} placeholders; unset values become empty strings
fn substitute_args(template: &str, args: &Value) -> Result<String, ProviderError> {
    let mut result = template.to_string();

    for cap in placeholder_re().captures_iter(template) {
        let value = args
            .get(&cap[1])
            .ok_or_else(|| ProviderError::BadRequest(format!("Unknown template argument: {}", &cap[1])))?;

        let replacement = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        result = result.replace(&cap[0], &replacement);
    }

    Ok(result)
}

/// Substitute ${ENV_VAR} placeholders from the environment
fn substitute_env(template: &str) -> Result<String, ProviderError> {
    let mut result = template.to_string();

    for cap in env_re().captures_iter(template) {
        let value = env::var(&cap[1])
            .map_err(|_| ProviderError::Forbidden(format!("Missing environment variable: {}", &cap[1])))?;
        result = result.replace(&cap[0], &value);
    }

    Ok(result)
}

fn substitute_template(template: &str, args: &Value) -> Result<String, ProviderError> {
    substitute_env(&substitute_args(template, args)?)
}

fn substitute_map(
    map: &HashMap<String, String>,
    args: &Value,
) -> Result<Vec<(String, String)>, ProviderError> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), substitute_template(v, args)?)))
        .collect()
}

/// Substitute templates in a JSON body recursively
fn substitute_value(value: &Value, args: &Value) -> Result<Value, ProviderError> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_template(s, args)?)),
        Value::Array(arr) => arr
            .iter()
            .map(|v| substitute_value(v, args))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| Ok((k.clone(), substitute_value(v, args)?)))
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

// ============================================================================
// Row selection
// ============================================================================

/// Walk a simple JSONPath-like expression: $.field, $.field.sub, $.array[0]
fn select_path<'a>(value: &'a Value, path: &str) -> Result<&'a Value, ProviderError> {
    let path = path.trim_start_matches('$').trim_start_matches('.');
    let mut current = value;

    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let (field, index) = match segment.find('[') {
            Some(pos) => {
                let index = segment[pos + 1..]
                    .strip_suffix(']')
                    .and_then(|i| i.parse::<usize>().ok())
                    .ok_or_else(|| ProviderError::Malformed(format!("Invalid array index: {}", segment)))?;
                (&segment[..pos], Some(index))
            }
            None => (segment, None),
        };

        if !field.is_empty() {
            current = current
                .get(field)
                .ok_or_else(|| ProviderError::Malformed(format!("Field not found: {}", field)))?;
        }
        if let Some(i) = index {
            current = current
                .get(i)
                .ok_or_else(|| ProviderError::Malformed(format!("Array index out of bounds: {}", i)))?;
        }
    }

    Ok(current)
}

// ============================================================================
// Client
// ============================================================================

pub struct WarehouseClient {
    client: Client,
    endpoints: HashMap<Intent, EndpointConfig>,
}

impl WarehouseClient {
    /// Build a client; `None` when no endpoint is configured
    pub fn from_settings(settings: &AnalyticsSettings) -> Result<Option<Self>> {
        let mut endpoints = HashMap::new();
        for (label, endpoint) in &settings.endpoints {
            let intent = Intent::from_label(label)
                .filter(Intent::is_route_based)
                .with_context(|| format!("Unknown analytics intent in config: {}", label))?;
            endpoints.insert(intent, endpoint.clone());
        }

        if endpoints.is_empty() {
            return Ok(None);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Some(Self { client, endpoints }))
    }

    fn fetch_rows(&self, endpoint: &EndpointConfig, args: &Value) -> Result<Vec<Map<String, Value>>, ProviderError> {
        let url = substitute_template(&endpoint.url, args)?;
        let query = substitute_map(&endpoint.query, args)?;
        let headers = substitute_map(&endpoint.headers, args)?;

        let method = endpoint.method.to_uppercase();
        let mut request = match method.as_str() {
            "GET" => self.client.get(&url),
            "POST" => self.client.post(&url),
            "PUT" => self.client.put(&url),
            _ => return Err(ProviderError::BadRequest(format!("Unsupported HTTP method: {}", method))),
        };

        if !query.is_empty() {
            request = request.query(&query);
        }
        for (key, value) in &headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(ref body_template) = endpoint.body {
            request = request.json(&substitute_value(body_template, args)?);
        }

        debug!(%url, %method, "querying warehouse");
        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status, &body));
        }

        let json: Value =
            serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let rows = select_path(&json, &endpoint.rows_path)?
            .as_array()
            .ok_or_else(|| ProviderError::Malformed("Result rows are not an array".to_string()))?;

        Ok(rows
            .iter()
            .filter_map(|row| row.as_object().cloned())
            .collect())
    }
}

impl AnalyticsProvider for WarehouseClient {
    fn supports(&self, intent: Intent) -> bool {
        self.endpoints.contains_key(&intent)
    }

    fn run_analysis(&self, request: &ResolvedRequest) -> Result<String, ProviderError> {
        let endpoint = self.endpoints.get(&request.intent).ok_or_else(|| {
            ProviderError::Other(format!("No analytics endpoint configured for {}", request.intent.describe()))
        })?;

        info!(intent = request.intent.as_label(), route = %request.route_label(), year = ?request.year, "running analysis");
        let rows = self.fetch_rows(endpoint, &request_args(request))?;

        if rows.is_empty() {
            return Err(ProviderError::NoRows(format!(
                "No {} data found for {}{}.",
                request.intent.describe(),
                route_words(request),
                year_words(request)
            )));
        }

        Ok(render_rows(request, &rows))
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn route_words(request: &ResolvedRequest) -> String {
    format!(
        "routes from {} to {}",
        request.origin.as_deref().unwrap_or("?"),
        request.destination.as_deref().unwrap_or("?")
    )
}

fn year_words(request: &ResolvedRequest) -> String {
    match request.year {
        Some(y) => format!(" in {}", y),
        None => " across all years".to_string(),
    }
}

fn field<'a>(row: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    row.get(key).filter(|v| !v.is_null())
}

fn field_text(row: &Map<String, Value>, key: &str, default: &str) -> String {
    match field(row, key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => default.to_string(),
    }
}

/// 1234.5 -> "1,234.50"
fn format_price(price: f64) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if price < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}

fn render_rows(request: &ResolvedRequest, rows: &[Map<String, Value>]) -> String {
    let origin = request.origin.as_deref().unwrap_or("?");
    let destination = request.destination.as_deref().unwrap_or("?");
    let years = year_words(request);

    let mut out = match request.intent {
        Intent::FareAnalysis => format!("Cheapest flight fares from {} to {}{}:\n\n", origin, destination, years),
        Intent::OnTimeRanking => format!("Most on-time airlines from {} to {}{}:\n\n", origin, destination, years),
        Intent::DayOfWeekDelay => format!("Delays by day of week from {} to {}{}:\n\n", origin, destination, years),
        Intent::FlightStatus => String::new(),
    };

    for (i, row) in rows.iter().enumerate() {
        if request.intent == Intent::FareAnalysis {
            let price = field(row, "price").and_then(Value::as_f64).unwrap_or(0.0);
            out.push_str(&format!(
                "{}. Flight {}\n   Route: {} → {}\n   Date: {}\n   Price: ${}\n   Provider: {}\n\n",
                i + 1,
                field_text(row, "flight_number", "Unknown"),
                field_text(row, "departure_airport", origin),
                field_text(row, "arrival_airport", destination),
                field_text(row, "departure_date", "Unknown Date"),
                format_price(price),
                field_text(row, "dataprovider", "Unknown Provider"),
            ));
        } else {
            let cells: Vec<String> = row
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| match v {
                    Value::String(s) => format!("{}: {}", k, s),
                    other => format!("{}: {}", k, other),
                })
                .collect();
            out.push_str(&format!("{}. {}\n", i + 1, cells.join(", ")));
        }
    }

    if request.intent == Intent::FareAnalysis {
        if rows.len() as u32 == request.limit {
            out.push_str(&format!(
                "Note: Showing top {} cheapest fares. There may be additional options available.",
                request.limit
            ));
        } else {
            out.push_str(&format!("Total of {} flight options found.", rows.len()));
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn fare_request(year: Option<i32>, limit: u32) -> ResolvedRequest {
        ResolvedRequest {
            intent: Intent::FareAnalysis,
            origin: Some("SFO".to_string()),
            destination: Some("JFK".to_string()),
            flight_number: None,
            year,
            limit,
        }
    }

    fn settings_with(intent: Intent, endpoint: EndpointConfig) -> AnalyticsSettings {
        AnalyticsSettings {
            timeout_secs: 5,
            endpoints: HashMap::from([(intent.as_label().to_string(), endpoint)]),
        }
    }

    fn endpoint(url: String) -> EndpointConfig {
        EndpointConfig {
            url,
            method: "GET".to_string(),
            query: HashMap::from([
                ("origin".to_string(), "{{origin}}".to_string()),
                ("destination".to_string(), "{{destination}}".to_string()),
                ("year".to_string(), "{{year}}".to_string()),
                ("limit".to_string(), "{{limit}}".to_string()),
            ]),
            headers: HashMap::new(),
            body: None,
            rows_path: "$.rows".to_string(),
        }
    }

    #[test]
    fn test_substitute_args_from_request() {
        let args = request_args(&fare_request(None, 5));
        let result = substitute_args("/{{intent}}/{{origin}}-{{destination}}?y={{year}}&n={{limit}}", &args).unwrap();
        assert_eq!(result, "/fare_analysis/SFO-JFK?y=&n=5");
    }

    #[test]
    fn test_substitute_args_unknown_placeholder() {
        let args = request_args(&fare_request(Some(2024), 5));
        let err = substitute_args("{{airline}}", &args).unwrap_err();
        assert!(err.to_string().contains("airline"));
    }

    #[test]
    fn test_substitute_env() {
        env::set_var("SKYROUTE_TEST_TOKEN_12345", "secret");
        assert_eq!(substitute_env("Bearer ${SKYROUTE_TEST_TOKEN_12345}").unwrap(), "Bearer secret");
        env::remove_var("SKYROUTE_TEST_TOKEN_12345");

        let err = substitute_env("${SKYROUTE_MISSING_VAR_99999}").unwrap_err();
        assert!(matches!(err, ProviderError::Forbidden(_)));
    }

    #[test]
    fn test_substitute_value_object() {
        let template = serde_json::json!({
            "route": { "from": "{{origin}}", "to": "{{destination}}" },
            "page_size": 100
        });
        let result = substitute_value(&template, &request_args(&fare_request(Some(2023), 5))).unwrap();
        assert_eq!(result["route"]["from"], "SFO");
        assert_eq!(result["route"]["to"], "JFK");
        assert_eq!(result["page_size"], 100);
    }

    #[test]
    fn test_select_path() {
        let json = serde_json::json!({ "result": { "pages": [ { "rows": [1, 2] } ] } });
        assert_eq!(select_path(&json, "$.result.pages[0].rows").unwrap(), &serde_json::json!([1, 2]));
        assert_eq!(select_path(&json, "$").unwrap(), &json);
        assert!(matches!(select_path(&json, "$.missing"), Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn test_no_endpoints_means_no_client() {
        let settings = AnalyticsSettings::default();
        assert!(WarehouseClient::from_settings(&settings).unwrap().is_none());
    }

    #[test]
    fn test_unknown_intent_label_is_config_error() {
        let mut settings = settings_with(Intent::FareAnalysis, endpoint("http://localhost".to_string()));
        settings
            .endpoints
            .insert("flight_status".to_string(), endpoint("http://localhost".to_string()));
        assert!(WarehouseClient::from_settings(&settings).is_err());
    }

    #[test]
    fn test_fare_analysis_renders_rows() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("origin".into(), "SFO".into()),
                Matcher::UrlEncoded("destination".into(), "JFK".into()),
                Matcher::UrlEncoded("year".into(), "2024".into()),
                Matcher::UrlEncoded("limit".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"rows": [
                    {"flight_number": "B6 416", "departure_date": "03/01/2024 06:00", "price": 129.5, "dataprovider": "Kiwi"},
                    {"flight_number": "AA 20", "departure_date": "03/04/2024 09:15", "price": 1234.0, "dataprovider": null}
                ]}"#,
            )
            .create();

        let client = WarehouseClient::from_settings(&settings_with(
            Intent::FareAnalysis,
            endpoint(format!("{}/query", server.url())),
        ))
        .unwrap()
        .unwrap();

        assert!(client.supports(Intent::FareAnalysis));
        assert!(!client.supports(Intent::OnTimeRanking));

        let text = client.run_analysis(&fare_request(Some(2024), 2)).unwrap();
        mock.assert();
        assert!(text.starts_with("Cheapest flight fares from SFO to JFK in 2024:"));
        assert!(text.contains("1. Flight B6 416\n   Route: SFO → JFK"));
        assert!(text.contains("Price: $1,234.00"));
        assert!(text.contains("Provider: Unknown Provider"));
        assert!(text.ends_with("Note: Showing top 2 cheapest fares. There may be additional options available."));
    }

    #[test]
    fn test_ranking_renders_generic_rows() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/rank")
            .match_body(Matcher::PartialJson(serde_json::json!({ "origin": "SFO", "limit": "10" })))
            .with_status(200)
            .with_body(r#"[{"airline": "Alaska", "on_time_pct": 88.1}]"#)
            .create();

        let endpoint = EndpointConfig {
            url: format!("{}/rank", server.url()),
            method: "POST".to_string(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: Some(serde_json::json!({ "origin": "{{origin}}", "destination": "{{destination}}", "limit": "{{limit}}" })),
            rows_path: "$".to_string(),
        };
        let client = WarehouseClient::from_settings(&settings_with(Intent::OnTimeRanking, endpoint))
            .unwrap()
            .unwrap();

        let request = ResolvedRequest {
            intent: Intent::OnTimeRanking,
            limit: 10,
            ..fare_request(None, 10)
        };
        let text = client.run_analysis(&request).unwrap();
        assert!(text.starts_with("Most on-time airlines from SFO to JFK across all years:"));
        assert!(text.contains("1. airline: Alaska, on_time_pct: 88.1"));
    }

    #[test]
    fn test_empty_rows_is_no_rows() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"rows": []}"#)
            .create();

        let client = WarehouseClient::from_settings(&settings_with(
            Intent::FareAnalysis,
            endpoint(format!("{}/query", server.url())),
        ))
        .unwrap()
        .unwrap();

        let err = client.run_analysis(&fare_request(Some(2023), 5)).unwrap_err();
        assert!(matches!(err, ProviderError::NoRows(ref m) if m.contains("SFO to JFK in 2023")));
    }

    #[test]
    fn test_http_errors_are_classified() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("permission denied on dataset")
            .create();

        let client = WarehouseClient::from_settings(&settings_with(
            Intent::FareAnalysis,
            endpoint(format!("{}/query", server.url())),
        ))
        .unwrap()
        .unwrap();

        let err = client.run_analysis(&fare_request(None, 5)).unwrap_err();
        assert!(matches!(err, ProviderError::Forbidden(ref m) if m.contains("permission denied")));
    }

    #[test]
    fn test_format_price_groups_thousands() {
        assert_eq!(format_price(0.0), "0.00");
        assert_eq!(format_price(99.0), "99.00");
        assert_eq!(format_price(129.5), "129.50");
        assert_eq!(format_price(1234.0), "1,234.00");
        assert_eq!(format_price(1234567.891), "1,234,567.89");
        assert_eq!(format_price(-1500.0), "-1,500.00");
    }

    #[test]
    fn test_total_count_footer_when_fewer_rows() {
        let rows = vec![serde_json::json!({ "flight_number": "UA 1", "price": 99 })
            .as_object()
            .cloned()
            .unwrap()];
        let text = render_rows(&fare_request(None, 5), &rows);
        assert!(text.contains("Price: $99.00"));
        assert!(text.ends_with("Total of 1 flight options found."));
    }
}
