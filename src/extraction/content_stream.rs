// Positioned-character extraction from PDF content streams.
//
// A deliberately small parser: it tracks the text positioning operators (Td,
// TD, Tm) and collects show-text strings (Tj, TJ) with approximate per-glyph
// advances. Good enough for row/column geometry inference; exact glyph
// metrics are not needed for that.
use lopdf::{Document, Object};

use crate::types::Result;

// Approximate glyph advance in text-space units
pub const CHAR_ADVANCE: f32 = 6.0;

#[derive(Debug, Copy, Clone)]
pub struct PositionedChar {
    pub ch: char,
    pub x: f32,
    /// PDF y coordinate, origin bottom-left: larger y is higher on the page.
    pub y: f32,
}

/// Page object ids in page-number order (1-based numbers).
pub fn ordered_pages(doc: &Document) -> Vec<(u32, lopdf::ObjectId)> {
    let mut pages: Vec<(u32, lopdf::ObjectId)> = doc.get_pages().into_iter().collect();
    pages.sort_by_key(|(n, _)| *n);
    pages
}

/// Collect positioned characters for one page, reading-ordered (top to
/// bottom, left to right).
pub fn page_chars(doc: &Document, page_id: lopdf::ObjectId) -> Result<Vec<PositionedChar>> {
    let page_dict = doc.get_object(page_id)?.as_dict()?;

    let mut chars = Vec::new();
    if let Ok(contents) = page_dict.get(b"Contents") {
        let data = content_data(doc, contents)?;
        parse_text_operations(&data, &mut chars);
    }

    chars.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });
    Ok(chars)
}

fn parse_text_operations(data: &[u8], out: &mut Vec<PositionedChar>) {
    let content = String::from_utf8_lossy(data);
    let mut x = 0.0f32;
    let mut y = 0.0f32;

    for line in content.lines() {
        let line = line.trim();
        if line.ends_with(" Td") || line.ends_with(" TD") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 3 {
                if let (Ok(tx), Ok(ty)) = (parts[0].parse::<f32>(), parts[1].parse::<f32>()) {
                    x += tx;
                    y += ty;
                }
            }
        } else if line.ends_with(" Tm") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 7 {
                if let (Ok(e), Ok(f)) = (parts[4].parse::<f32>(), parts[5].parse::<f32>()) {
                    x = e;
                    y = f;
                }
            }
        } else if line == "BT" {
            x = 0.0;
            y = 0.0;
        } else if line.contains("Tj") {
            if let Some(text) = text_from_tj(line) {
                push_chars(&text, x, y, out);
            }
        } else if line.contains("TJ") {
            if let Some(text) = text_from_tj_array(line) {
                push_chars(&text, x, y, out);
            }
        }
    }
}

fn push_chars(text: &str, x: f32, y: f32, out: &mut Vec<PositionedChar>) {
    for (i, ch) in text.chars().enumerate() {
        out.push(PositionedChar {
            ch,
            x: x + i as f32 * CHAR_ADVANCE,
            y,
        });
    }
}

fn content_data(doc: &Document, contents: &Object) -> Result<Vec<u8>> {
    match contents {
        Object::Reference(id) => {
            let obj = doc.get_object(*id)?;
            content_data(doc, obj)
        }
        Object::Stream(stream) => Ok(stream.decompressed_content()?),
        Object::Array(items) => {
            let mut data = Vec::new();
            for item in items {
                data.extend_from_slice(&content_data(doc, item)?);
            }
            Ok(data)
        }
        _ => Ok(Vec::new()),
    }
}

fn text_from_tj(line: &str) -> Option<String> {
    let start = line.find('(')?;
    let end = line.rfind(')')?;
    (end > start).then(|| decode_pdf_string(&line[start + 1..end]))
}

fn text_from_tj_array(line: &str) -> Option<String> {
    let start = line.find('[')?;
    let end = line.rfind(']')?;
    if end <= start {
        return None;
    }
    let mut result = String::new();
    let mut in_string = false;
    let mut current = String::new();
    for ch in line[start + 1..end].chars() {
        match ch {
            '(' if !in_string => {
                in_string = true;
                current.clear();
            }
            ')' if in_string => {
                in_string = false;
                result.push_str(&decode_pdf_string(&current));
            }
            _ if in_string => current.push(ch),
            _ => {}
        }
    }
    (!result.is_empty()).then_some(result)
}

fn decode_pdf_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(other) => result.push(other),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }
    result
}

/// Number of pages, without parsing content streams.
pub fn page_count(doc: &Document) -> usize {
    doc.get_pages().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tj_string_decodes_escapes() {
        assert_eq!(text_from_tj(r"(Total \(due\)) Tj").as_deref(), Some("Total (due)"));
    }

    #[test]
    fn tj_array_concatenates_strings() {
        let text = text_from_tj_array("[(Tot) -20 (al) 5 ( $150.00)] TJ");
        assert_eq!(text.as_deref(), Some("Total $150.00"));
    }

    #[test]
    fn chars_carry_positions() {
        let mut out = Vec::new();
        parse_text_operations(b"BT\n10 700 Td\n(AB) Tj\nET", &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].ch, 'A');
        assert_eq!(out[0].x, 10.0);
        assert_eq!(out[1].x, 10.0 + CHAR_ADVANCE);
        assert_eq!(out[0].y, 700.0);
    }
}
