use std::sync::LazyLock;

use regex::Regex;

const STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC", "PR", "VI", "GU", "AS", "MP",
];

const STATE_NAMES: &[(&str, &str)] = &[
    ("alabama", "AL"),
    ("alaska", "AK"),
    ("arizona", "AZ"),
    ("arkansas", "AR"),
    ("california", "CA"),
    ("colorado", "CO"),
    ("connecticut", "CT"),
    ("delaware", "DE"),
    ("florida", "FL"),
    ("georgia", "GA"),
    ("hawaii", "HI"),
    ("idaho", "ID"),
    ("illinois", "IL"),
    ("indiana", "IN"),
    ("iowa", "IA"),
    ("kansas", "KS"),
    ("kentucky", "KY"),
    ("louisiana", "LA"),
    ("maine", "ME"),
    ("maryland", "MD"),
    ("massachusetts", "MA"),
    ("michigan", "MI"),
    ("minnesota", "MN"),
    ("mississippi", "MS"),
    ("missouri", "MO"),
    ("montana", "MT"),
    ("nebraska", "NE"),
    ("nevada", "NV"),
    ("new hampshire", "NH"),
    ("new jersey", "NJ"),
    ("new mexico", "NM"),
    ("new york", "NY"),
    ("north carolina", "NC"),
    ("north dakota", "ND"),
    ("ohio", "OH"),
    ("oklahoma", "OK"),
    ("oregon", "OR"),
    ("pennsylvania", "PA"),
    ("rhode island", "RI"),
    ("south carolina", "SC"),
    ("south dakota", "SD"),
    ("tennessee", "TN"),
    ("texas", "TX"),
    ("utah", "UT"),
    ("vermont", "VT"),
    ("virginia", "VA"),
    ("washington", "WA"),
    ("west virginia", "WV"),
    ("wisconsin", "WI"),
    ("wyoming", "WY"),
    ("district of columbia", "DC"),
];

// Cities that unambiguously pin a state, consulted only when neither a code
// nor a full name is present.
const CITY_HINTS: &[(&str, &str)] = &[
    ("boston", "MA"),
    ("cambridge", "MA"),
    ("worcester", "MA"),
    ("springfield", "MA"),
    ("new york", "NY"),
    ("nyc", "NY"),
    ("brooklyn", "NY"),
    ("manhattan", "NY"),
    ("albany", "NY"),
    ("philadelphia", "PA"),
    ("pittsburgh", "PA"),
    ("harrisburg", "PA"),
    ("newark", "NJ"),
    ("jersey city", "NJ"),
    ("trenton", "NJ"),
    ("princeton", "NJ"),
];

// Labelled location mentions inside free-text descriptions:
// "Location: Boston, MA" / "Based in: NYC" / "Office: Princeton, NJ"
static LOCATION_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:Location|Based in|Office)[:\s]+([^,\n]+(?:,[^,\n]+)*)").unwrap()
});

/// Resolve a free-text location to a two-letter US state/territory code.
///
/// Trailing tokens are checked for a literal code first ("Princeton, NJ
/// (Remote)" -> NJ), then the whole string for a full state name, then the
/// city hint table.
pub fn extract_state(location: Option<&str>) -> Option<String> {
    let location = location?.trim();
    if location.is_empty() {
        return None;
    }

    for token in location.rsplit(|c: char| c == ',' || c.is_whitespace()) {
        let token = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
        if token.len() == 2 {
            let code = token.to_ascii_uppercase();
            if STATE_CODES.contains(&code.as_str()) {
                return Some(code);
            }
        }
    }

    let lower = location.to_lowercase();
    for (name, code) in STATE_NAMES {
        if contains_word(&lower, name) {
            return Some((*code).to_string());
        }
    }

    for (city, code) in CITY_HINTS {
        if lower.contains(city) {
            return Some((*code).to_string());
        }
    }

    None
}

/// All location strings captured by labelled patterns in a description.
pub fn labelled_locations(text: &str) -> Vec<String> {
    LOCATION_LABEL_RE
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|loc| !loc.is_empty())
        .collect()
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(needle) {
        let start = from + pos;
        let end = start + needle.len();
        let before_ok = start == 0
            || !haystack[..start]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric);
        let after_ok = end == haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(char::is_alphanumeric);
        if before_ok && after_ok {
            return true;
        }
        from = start + 1;
    }
    false
}

// ── Tests ──
