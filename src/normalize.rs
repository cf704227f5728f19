// Text normalization for extracted document text.
//
// `clean_text` is deterministic and idempotent on its own output; the
// orchestrator applies it to every winning extraction before chunking.
use once_cell::sync::Lazy;
use regex::Regex;

// Word chars, common punctuation, currency/percent/math symbols, pipe, quotes,
// newline. Everything else is an extraction artifact and is dropped.
static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\w\s.,!?;:\-()|'"$@#%&*+=/\\]"#).unwrap());

static SPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r]+").unwrap());

static BLANK_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ ]*\n(?:[ ]*\n)*").unwrap());

static CURRENCY_OR_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[$\d/.\-]").unwrap());

static NUMERAL_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[0-9Ol]+\b").unwrap());

const BILL_KEYWORDS: &[&str] = &["pge", "pg&e", "account", "total", "kwh", "therm"];

/// Normalize raw extracted text: ASCII-fold typographic variants, strip
/// artifact characters, collapse whitespace. Runs of 3+ spaces are capped at 3
/// rather than fully collapsed so tabular alignment survives.
pub fn clean_text(text: &str) -> String {
    let text = fold_typographic(text);
    let text = DISALLOWED_RE.replace_all(&text, "");
    let text = SPACE_RUN_RE.replace_all(&text, |caps: &regex::Captures| {
        if caps[0].len() >= 3 {
            "   "
        } else {
            " "
        }
    });
    let text = BLANK_LINE_RE.replace_all(&text, "\n\n");
    let lines: Vec<&str> = text.lines().map(|l| l.trim_end()).collect();
    lines.join("\n").trim().to_string()
}

fn fold_typographic(text: &str) -> String {
    text.replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2013}', '\u{2014}', '\u{2212}'], "-")
        .replace('\u{2022}', "*")
        .replace('\u{00A0}', " ")
}

/// Line filter used inside the table-aware text pass: drops short or
/// artifact-heavy lines while always keeping anything that looks like a money
/// or date token or carries bill vocabulary.
pub fn clean_extracted_lines(text: &str) -> String {
    let mut kept = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.chars().count() < 3 {
            continue;
        }
        let total = trimmed.chars().count();
        let special = trimmed
            .chars()
            .filter(|c| !c.is_alphanumeric() && !" .,/$-():".contains(*c))
            .count();
        if special * 2 > total {
            continue;
        }
        let lower = trimmed.to_lowercase();
        if CURRENCY_OR_DATE_RE.is_match(trimmed)
            || BILL_KEYWORDS.iter().any(|kw| lower.contains(kw))
            || (total > 10 && trimmed.chars().any(|c| c.is_alphabetic()))
        {
            kept.push(trimmed);
        }
    }
    kept.join("\n")
}

/// Table cell cleanup: collapse whitespace, then fix the classic scan
/// misreads `O`->`0` and `l`->`1`, but only inside tokens that already carry
/// a digit so ordinary words are left alone.
pub fn clean_cell_text(cell: &str) -> String {
    let collapsed = cell.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.chars().any(|c| c.is_ascii_digit()) {
        return collapsed;
    }
    NUMERAL_TOKEN_RE
        .replace_all(&collapsed, |caps: &regex::Captures| {
            let token = &caps[0];
            if token.chars().any(|c| c.is_ascii_digit()) {
                token.replace('O', "0").replace('l', "1")
            } else {
                token.to_string()
            }
        })
        .into_owned()
}
