// src/decode/sheet.rs

use super::DecodeError;
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;
use tracing::debug;

/// Every worksheet serialized as CSV rows, one blank line between sheets.
pub(super) fn extract_text(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let mut out = String::new();

    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        debug!(sheet = %name, rows = range.height(), "Serializing worksheet");
        for row in range.rows() {
            let line: Vec<String> = row.iter().map(csv_cell).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out.push('\n');
    }

    Ok(out)
}

fn csv_cell(cell: &Data) -> String {
    let s = cell.to_string();
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_with_separators_are_quoted() {
        assert_eq!(csv_cell(&Data::String("12,345".into())), "\"12,345\"");
        assert_eq!(csv_cell(&Data::String("say \"hi\"".into())), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_cell(&Data::Float(48210.0)), "48210");
        assert_eq!(csv_cell(&Data::Empty), "");
    }
}
