//! Parameter Extraction
//!
//! Pure heuristics that pull flight numbers, airport codes, years and result
//! limits out of a free-text query. Every field is a best single guess;
//! validation and disambiguation happen in the resolver.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::types::ExtractedParameters;

/// Lead-in phrases that mark a query as a follow-up to the previous turn
pub const CONTINUATION_PHRASES: &[&str] =
    &["what about", "how about", "and for", "what if", "same for"];

/// Ordinary English words that look like airport codes once upper-cased
const STOPLIST: &[&str] = &[
    "THE", "AND", "FOR", "ARE", "BUT", "NOT", "YOU", "ALL", "ANY", "CAN", "HAD", "HER", "WAS",
    "ONE", "OUR", "OUT", "DAY", "GET", "HAS", "HIM", "HIS", "HOW", "MAN", "NEW", "NOW", "OLD",
    "SEE", "TWO", "WAY", "WHO", "BOY", "DID", "ITS", "LET", "PUT", "SAY", "SHE", "TOO", "USE",
    "WHY", "TOP", "FEW", "LOW", "BIG", "FLY", "BUY", "ASK", "YES", "YET", "OFF", "PER", "VIA",
    "AGO", "MAY", "TEN", "SIX", "END", "OWN", "TRY", "AIR", "FAR", "MON", "TUE", "WED", "THU",
    "FRI", "SAT", "SUN",
];

fn stoplist() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPLIST.iter().copied().collect())
}

fn flight_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]{2,3}\d{2,4}\b").unwrap())
}

fn airport_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z]{3}\b").unwrap())
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap())
}

fn continuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let phrases: Vec<String> = CONTINUATION_PHRASES
            .iter()
            .map(|p| p.replace(' ', r"\s+"))
            .collect();
        Regex::new(&format!(r"(?i)\b(?:{})\b", phrases.join("|"))).unwrap()
    })
}

fn limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:top|limit|first|show)\s+(\d+)\b|\b(\d+)\s+airlines?\b").unwrap()
    })
}

/// Extract every parameter the resolver may need from one raw query
pub fn extract(raw: &str) -> ExtractedParameters {
    let upper = raw.to_uppercase();

    ExtractedParameters {
        flight_number: extract_flight_number(&upper),
        origin_candidates: extract_airport_codes(&upper),
        year: extract_year(raw),
        limit: extract_limit(raw),
        continuation: is_continuation(raw),
    }
}

/// First token of 2-3 letters immediately followed by 2-4 digits
pub fn extract_flight_number(upper: &str) -> Option<String> {
    flight_number_re()
        .find(upper)
        .map(|m| m.as_str().to_string())
}

/// Standalone 3-letter tokens in order of appearance, minus the stoplist
pub fn extract_airport_codes(upper: &str) -> Vec<String> {
    let stop = stoplist();
    airport_code_re()
        .find_iter(upper)
        .map(|m| m.as_str())
        .filter(|code| !stop.contains(code))
        .map(str::to_string)
        .collect()
}

/// First 19xx/20xx token in the original string
pub fn extract_year(raw: &str) -> Option<i32> {
    year_re().find(raw).and_then(|m| m.as_str().parse().ok())
}

/// First "top N" / "N airlines" style count
///
/// Digits too long for `i64` saturate so the resolver still rejects them.
pub fn extract_limit(raw: &str) -> Option<i64> {
    let caps = limit_re().captures(raw)?;
    let digits = caps.get(1).or_else(|| caps.get(2))?;
    Some(digits.as_str().parse().unwrap_or(i64::MAX))
}

/// Whole-word match of a continuation phrase ("demand for" is not "and for")
pub fn is_continuation(raw: &str) -> bool {
    continuation_re().is_match(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_number_case_insensitive() {
        let params = extract("what's the status of aa123?");
        assert_eq!(params.flight_number, Some("AA123".to_string()));
        assert!(params.origin_candidates.is_empty());
    }

    #[test]
    fn test_flight_number_first_match_wins() {
        let params = extract("Is UA456 or DL7890 later?");
        assert_eq!(params.flight_number, Some("UA456".to_string()));
    }

    #[test]
    fn test_flight_number_needs_adjacent_digits() {
        assert_eq!(extract("AA 123").flight_number, None);
        assert_eq!(extract("AA1").flight_number, None);
        assert_eq!(extract("AA12345").flight_number, None);
    }

    #[test]
    fn test_stoplist_excludes_common_words() {
        let params = extract("THE SFO JFK");
        assert_eq!(params.origin_candidates, vec!["SFO", "JFK"]);
    }

    #[test]
    fn test_airport_codes_from_natural_sentence() {
        let params = extract("Which day has the least delays from JFK to ATL?");
        assert_eq!(params.origin_candidates, vec!["JFK", "ATL"]);

        let params = extract("Which airlines are most on-time from EWR to SFO?");
        assert_eq!(params.origin_candidates, vec!["EWR", "SFO"]);
    }

    #[test]
    fn test_airport_codes_keep_duplicates_and_order() {
        let params = extract("lax to sfo then back to lax");
        assert_eq!(params.origin_candidates, vec!["LAX", "SFO", "LAX"]);
    }

    #[test]
    fn test_year_detection() {
        assert_eq!(extract("fares SFO to JFK in 2023").year, Some(2023));
        assert_eq!(extract("back in 1989").year, Some(1989));
        assert_eq!(extract("in 2150 maybe").year, None);
        assert_eq!(extract("no year here").year, None);
    }

    #[test]
    fn test_limit_detection_synonyms() {
        assert_eq!(extract("top 3 airlines from SFO to JFK").limit, Some(3));
        assert_eq!(extract("show 8 results").limit, Some(8));
        assert_eq!(extract("give me 12 airlines").limit, Some(12));
        assert_eq!(extract("limit 0").limit, Some(0));
        assert_eq!(extract("first 51 fares").limit, Some(51));
        assert_eq!(extract("SFO to JFK").limit, None);
    }

    #[test]
    fn test_continuation_phrases() {
        assert!(extract("What about from LGA to ORD?").continuation);
        assert!(extract("how about 2024").continuation);
        assert!(!extract("SFO to JFK").continuation);
        assert!(extract("And  for 2023?").continuation);
    }

    #[test]
    fn test_continuation_needs_whole_words() {
        assert!(!extract("is demand for SFO to JFK fares high").continuation);
        assert!(!extract("what does DL stand for").continuation);
        assert!(!extract("somewhat about to land").continuation);
    }

    #[test]
    fn test_oversized_limit_saturates() {
        assert_eq!(extract("top 99999999999999999999 fares").limit, Some(i64::MAX));
    }

    #[test]
    fn test_extract_is_deterministic() {
        let q = "top 5 cheapest fares from SFO to JFK in 2024";
        assert_eq!(extract(q), extract(q));
    }
}
