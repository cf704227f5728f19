// Filename-based utility bill detection.
//
// This only biases extraction strategy selection; false positives and
// negatives are acceptable. Classification is by filename, never by content,
// matching the behavior the rest of the pipeline was tuned against.

const BILL_INDICATORS: &[&str] = &[
    "pge",
    "pg&e",
    "pacific gas",
    "electric",
    "bill",
    "utility",
    "energy",
    "gas",
    "edison",
    "sdge",
    "peco",
    "con ed",
];

/// Case-insensitive substring match against a fixed vocabulary of utility
/// company and billing terms. Underscores and hyphens count as spaces so
/// names like `Con_Ed_Statement.pdf` match the two-word indicators.
pub fn is_utility_bill(filename: &str) -> bool {
    let lower = filename.to_lowercase().replace(['_', '-'], " ");
    BILL_INDICATORS.iter().any(|ind| lower.contains(ind))
}
