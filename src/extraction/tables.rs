// Row/column inference over positioned characters.
//
// Rows are clusters of characters at nearly the same vertical position;
// cells split where the horizontal gap between neighbors exceeds the glyph
// advance plus the join tolerance. A table is a run of adjacent rows that
// each break into two or more cells.
use super::content_stream::{PositionedChar, CHAR_ADVANCE};

#[derive(Debug, Copy, Clone)]
pub struct TableSettings {
    /// Vertical distance (points) within which glyphs snap to the same row.
    pub snap_tolerance: f32,
    /// Extra horizontal slack (points) before a gap becomes a cell boundary.
    pub join_tolerance: f32,
}

pub type Row = Vec<String>;
pub type Table = Vec<Row>;

/// Cluster characters into rows. Input must be reading-ordered (descending
/// y); output rows are top-to-bottom, each row's characters left-to-right.
pub fn cluster_rows(chars: &[PositionedChar], snap_tolerance: f32) -> Vec<Vec<PositionedChar>> {
    let mut rows: Vec<Vec<PositionedChar>> = Vec::new();
    for &pc in chars {
        match rows.last_mut() {
            Some(row) if (row[0].y - pc.y).abs() <= snap_tolerance => row.push(pc),
            _ => rows.push(vec![pc]),
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }
    rows
}

/// Split one row into cell strings at large horizontal gaps.
fn split_cells(row: &[PositionedChar], join_tolerance: f32) -> Row {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut last_x = f32::NEG_INFINITY;

    for pc in row {
        if current.is_empty() {
            current.push(pc.ch);
        } else {
            let gap = pc.x - last_x;
            if gap > CHAR_ADVANCE + join_tolerance {
                cells.push(current.trim().to_string());
                current = pc.ch.to_string();
            } else {
                if gap > CHAR_ADVANCE * 1.5 {
                    current.push(' ');
                }
                current.push(pc.ch);
            }
        }
        last_x = pc.x;
    }
    if !current.is_empty() {
        cells.push(current.trim().to_string());
    }
    cells.into_iter().filter(|c| !c.is_empty()).collect()
}

/// Detect table-shaped regions: maximal runs of 2+ consecutive rows that
/// each split into 2+ cells.
pub fn infer_tables(chars: &[PositionedChar], settings: TableSettings) -> Vec<Table> {
    let rows = cluster_rows(chars, settings.snap_tolerance);
    let cell_rows: Vec<Row> = rows
        .iter()
        .map(|r| split_cells(r, settings.join_tolerance))
        .collect();

    let mut tables = Vec::new();
    let mut current: Table = Vec::new();
    for row in cell_rows {
        if row.len() >= 2 {
            current.push(row);
        } else {
            if current.len() >= 2 {
                tables.push(std::mem::take(&mut current));
            }
            current.clear();
        }
    }
    if current.len() >= 2 {
        tables.push(current);
    }
    tables
}

/// Assemble plain text lines from positioned characters with a vertical
/// tolerance, inserting spaces at modest gaps.
pub fn assemble_lines(chars: &[PositionedChar], y_tolerance: f32) -> Vec<String> {
    cluster_rows(chars, y_tolerance)
        .iter()
        .map(|row| row_text(row))
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .collect()
}

fn row_text(row: &[PositionedChar]) -> String {
    let mut line = String::new();
    let mut last_x = f32::NEG_INFINITY;
    for pc in row {
        if !line.is_empty() && pc.x - last_x > CHAR_ADVANCE * 1.5 {
            line.push(' ');
        }
        line.push(pc.ch);
        last_x = pc.x;
    }
    line
}

/// Raw character-grid lines: group by y rounded to a tenth of a point, sort
/// by x, concatenate. The coarsest but most faithful rendering of degraded
/// layouts.
pub fn char_grid_lines(chars: &[PositionedChar]) -> Vec<String> {
    use std::collections::BTreeMap;

    let mut lines: BTreeMap<i64, Vec<PositionedChar>> = BTreeMap::new();
    for &pc in chars {
        // Negate so iteration order is top-to-bottom
        let key = -((pc.y * 10.0).round() as i64);
        lines.entry(key).or_default().push(pc);
    }

    lines
        .into_values()
        .map(|mut row| {
            row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
            row.iter().map(|pc| pc.ch).collect::<String>()
        })
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}
