// Structured field recovery from bill-like text.
//
// Regex matching with plausibility filters. The output is best effort and
// non-authoritative; an empty report renders as an empty string and the
// caller treats it as "nothing to add".
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::BillFields;

static AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s*\d{1,3}(?:,\d{3})*\.\d{2}").unwrap());

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}[/.\-]\d{1,2}[/.\-]\d{4}\b").unwrap());

static KWH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d+[.,]?\d*\s*kwh").unwrap());

static THERM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d+[.,]?\d*\s*therm").unwrap());

static ACCOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:account|acct)[\s\w#:]*?(\d{8,})").unwrap());

static SERVICE_PERIOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:service|bill)\s+(?:period|date)[\s:]*(\d{1,2}[/.\-]\d{1,2}[/.\-]\d{4})\s*(?:to|-)?\s*(\d{1,2}[/.\-]\d{1,2}[/.\-]\d{4})?",
    )
    .unwrap()
});

// Plausibility floor and ceiling for a residential utility bill
const MIN_AMOUNT: f64 = 10.0;
const MAX_AMOUNT: f64 = 2000.0;

/// Scan text for bill fields, applying the plausibility filters. Duplicate
/// matches are deduplicated per field.
pub fn extract(text: &str) -> BillFields {
    let mut fields = BillFields::default();

    for m in AMOUNT_RE.find_iter(text) {
        let amount = m.as_str();
        if is_plausible_amount(amount) {
            fields.amounts.insert(amount.to_string());
        }
    }

    for m in DATE_RE.find_iter(text) {
        let date = m.as_str();
        if is_valid_date(date) {
            fields.dates.insert(date.to_string());
        }
    }

    for m in KWH_RE.find_iter(text) {
        fields.kwh_usage.insert(m.as_str().to_string());
    }

    for m in THERM_RE.find_iter(text) {
        fields.therm_usage.insert(m.as_str().to_string());
    }

    for caps in ACCOUNT_RE.captures_iter(text) {
        fields.account_numbers.insert(caps[1].to_string());
    }

    for caps in SERVICE_PERIOD_RE.captures_iter(text) {
        let period = match caps.get(2) {
            Some(end) => format!("{} to {}", &caps[1], end.as_str()),
            None => caps[1].to_string(),
        };
        fields.service_periods.insert(period);
    }

    fields
}

/// Amount must parse and land in the `[$10.00, $2000.00]` plausibility range.
pub fn is_plausible_amount(amount: &str) -> bool {
    let digits: String = amount
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    matches!(digits.parse::<f64>(), Ok(v) if (MIN_AMOUNT..=MAX_AMOUNT).contains(&v))
}

/// Month 1-12, day 1-31, year 2020-2030. Anything else is a misread.
pub fn is_valid_date(date: &str) -> bool {
    let parts: Vec<&str> = date.split(['/', '.', '-']).collect();
    if parts.len() != 3 {
        return false;
    }
    let nums: Vec<u32> = parts.iter().filter_map(|p| p.parse().ok()).collect();
    if nums.len() != 3 {
        return false;
    }
    let (month, day, year) = (nums[0], nums[1], nums[2]);
    (1..=12).contains(&month) && (1..=31).contains(&day) && (2020..=2030).contains(&year)
}

/// Executive-summary rendering, used as the structured chunk for bill
/// documents. Empty report -> empty string.
pub fn summarize(text: &str) -> String {
    render_summary(&extract(text))
}

pub fn render_summary(fields: &BillFields) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let mut out = vec!["=== EXTRACTED UTILITY BILL INFORMATION ===".to_string()];
    let mut section = |header: &str, values: &std::collections::BTreeSet<String>| {
        if !values.is_empty() {
            out.push(header.to_string());
            for v in values {
                out.push(format!("  {v}"));
            }
        }
    };
    section("AMOUNTS FOUND:", &fields.amounts);
    section("DATES FOUND:", &fields.dates);
    section("ENERGY USAGE:", &fields.kwh_usage);
    section("GAS USAGE:", &fields.therm_usage);
    section("ACCOUNT NUMBERS:", &fields.account_numbers);
    section("SERVICE PERIODS:", &fields.service_periods);
    out.join("\n")
}

/// Compact one-line-per-field rendering used inside enhanced OCR, labelled
/// with the recognition attempt that produced it.
pub fn render_labelled(source: &str, fields: &BillFields) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let mut lines = vec![format!("=== {source} ===")];
    let mut row = |label: &str, values: &std::collections::BTreeSet<String>| {
        if !values.is_empty() {
            let joined = values.iter().cloned().collect::<Vec<_>>().join(", ");
            lines.push(format!("{label}: {joined}"));
        }
    };
    row("AMOUNTS", &fields.amounts);
    row("DATES", &fields.dates);
    row("ELECTRICITY USAGE", &fields.kwh_usage);
    row("GAS USAGE", &fields.therm_usage);
    row("ACCOUNT", &fields.account_numbers);
    row("SERVICE PERIOD", &fields.service_periods);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_plausibility_range() {
        assert!(is_plausible_amount("$123.45"));
        assert!(!is_plausible_amount("$5.00"));
        assert!(!is_plausible_amount("$9999.99"));
        assert!(is_plausible_amount("$1,999.99"));
    }

    #[test]
    fn date_validation() {
        assert!(is_valid_date("01/15/2025"));
        assert!(!is_valid_date("13/40/2025"));
        assert!(!is_valid_date("02/10/1999"));
        assert!(is_valid_date("2-1-2020"));
    }

    #[test]
    fn extracts_all_field_kinds() {
        let text = "Account 12345678 Total $150.00 due 03/01/2025, usage 450 kWh \
                    and 12 therms. Service Period: 02/01/2025 to 03/01/2025";
        let fields = extract(text);
        assert!(fields.amounts.contains("$150.00"));
        assert!(fields.dates.contains("03/01/2025"));
        assert!(fields.kwh_usage.contains("450 kWh"));
        assert!(fields.therm_usage.contains("12 therm"));
        assert!(fields.account_numbers.contains("12345678"));
        assert!(fields
            .service_periods
            .contains("02/01/2025 to 03/01/2025"));
    }

    #[test]
    fn implausible_amounts_are_filtered_from_summary() {
        let summary = summarize("Late fee $5.00 on balance $150.00");
        assert!(summary.contains("$150.00"));
        assert!(!summary.contains("$5.00"));
    }

    #[test]
    fn duplicate_matches_collapse() {
        let fields = extract("$150.00 and again $150.00");
        assert_eq!(fields.amounts.len(), 1);
    }

    #[test]
    fn empty_report_renders_empty() {
        assert_eq!(summarize("nothing interesting here"), "");
        assert_eq!(render_labelled("Page 1 - Direct OCR", &BillFields::default()), "");
    }

    #[test]
    fn labelled_rendering_names_the_attempt() {
        let fields = extract("Total $88.20 on 05/12/2024");
        let out = render_labelled("Page 2 - Enhanced OCR", &fields);
        assert!(out.starts_with("=== Page 2 - Enhanced OCR ==="));
        assert!(out.contains("AMOUNTS: $88.20"));
        assert!(out.contains("DATES: 05/12/2024"));
    }
}
