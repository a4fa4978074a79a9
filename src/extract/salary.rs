use std::sync::LazyLock;

use regex::Regex;

// Only dollar-marked amounts count; a range's second bound needs its own "$".
static SALARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\d[\d,]*(?:\.\d+)?\s*[kK]?(?:\s*[-\u{2013}\u{2014}]\s*\$\d[\d,]*(?:\.\d+)?\s*[kK]?)?")
        .unwrap()
});

static FIRST_BOUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d[\d,]*(?:\.\d+)?)\s*([kK])?").unwrap());

/// Find a salary mention. Amounts without a "$" immediately before the
/// digits ("USD 80000", "Salary: 100000") never match.
pub fn extract_salary(text: &str) -> Option<String> {
    SALARY_RE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
}

/// Numeric value of the first bound of an extracted salary, expanding a
/// trailing k suffix. Used for ranking.
pub fn salary_value(salary: &str) -> Option<f64> {
    let caps = FIRST_BOUND_RE.captures(salary)?;
    let digits = caps[1].replace(',', "");
    let value = digits.parse::<f64>().ok()?;
    Some(if caps.get(2).is_some() {
        value * 1000.0
    } else {
        value
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_range() {
        assert_eq!(
            extract_salary("Compensation: $80,000 - $120,000 per year").as_deref(),
            Some("$80,000 - $120,000")
        );
    }

    #[test]
    fn single_amount() {
        assert_eq!(extract_salary("pays $90,000 annually").as_deref(), Some("$90,000"));
    }

    #[test]
    fn k_suffix() {
        assert_eq!(extract_salary("$80K-$120K").as_deref(), Some("$80K-$120K"));
    }

    #[test]
    fn no_currency_marker_no_match() {
        assert_eq!(extract_salary("Salary: 100000"), None);
        assert_eq!(extract_salary("USD 80000"), None);
        assert_eq!(extract_salary("around 90k"), None);
    }

    #[test]
    fn value_of_first_bound() {
        assert_eq!(salary_value("$80,000 - $120,000"), Some(80_000.0));
        assert_eq!(salary_value("$80K-$120K"), Some(80_000.0));
        assert_eq!(salary_value("$45,000"), Some(45_000.0));
        assert_eq!(salary_value("no digits"), None);
    }
}
