//! Delimited-text import: one column per variable, header row first.

use anyhow::{bail, Result};

use estad_core::value::parse_number;
use estad_core::{Value, Variable};

/// Parses `text` into variables named after the header cells. Empty cells are
/// skipped, so columns may end up with different lengths.
pub fn parse_variables(text: &str) -> Result<Vec<Variable>> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        bail!("file is empty");
    };
    let delimiter = detect_delimiter(header);

    let names = split_row(header, delimiter);
    if names.iter().any(|n| n.is_empty()) {
        bail!("header has an empty column name");
    }

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    for (line_no, line) in lines.enumerate() {
        let cells = split_row(line, delimiter);
        if cells.len() > names.len() {
            bail!(
                "row {} has {} cells but the header has {}",
                line_no + 2,
                cells.len(),
                names.len()
            );
        }
        for (column, cell) in columns.iter_mut().zip(cells) {
            if cell.is_empty() {
                continue;
            }
            column.push(match parse_number(&cell) {
                Some(n) => Value::Number(n),
                None => Value::Text(cell),
            });
        }
    }

    Ok(names
        .into_iter()
        .zip(columns)
        .map(|(name, values)| Variable::inferred(name, values))
        .collect())
}

/// Semicolons are used when the header has no commas (spreadsheet exports
/// with decimal commas).
fn detect_delimiter(header: &str) -> char {
    if !header.contains(',') && header.contains(';') {
        ';'
    } else {
        ','
    }
}

fn split_row(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => {
                cells.push(cell.trim().to_string());
                cell.clear();
            }
            c => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}
