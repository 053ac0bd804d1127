// src/report.rs

use crate::aggregate::{RowValues, Scope, TotalsView};
use crate::dataset::PlannedActual;
use std::fmt::Write;

const ABSENT: &str = "-";

/// Display form of a number: thousands separators always, no fraction for
/// whole numbers, up to 3 decimals above 100 and up to 2 otherwise.
pub fn format_number(n: f64) -> String {
    let decimals = if n.fract() == 0.0 {
        0
    } else if n.abs() > 100.0 {
        3
    } else {
        2
    };
    let fixed = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if n < 0.0 && (grouped != "0" || !frac_part.is_empty()) {
        "-"
    } else {
        ""
    };
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}

fn show(v: Option<f64>) -> String {
    v.map(format_number).unwrap_or_else(|| ABSENT.to_string())
}

fn show_pair(p: &PlannedActual) -> String {
    format!("{} / {}", show(p.planned), show(p.actual))
}

/// Plain-text rendering: count indicators first, then planned / actual
/// indicators with "planned / actual" cells.
pub fn render_table(view: &TotalsView) -> String {
    let mut header = vec!["Indicator".to_string()];
    header.extend(view.contracts.iter().map(|c| c.label.clone()));
    header.push("Total".to_string());

    let mut single = Vec::new();
    let mut paired = Vec::new();
    for row in &view.rows {
        let mut line = vec![row.indicator.clone()];
        match &row.values {
            RowValues::Single { cells, total } => {
                line.extend(cells.iter().map(|c| show(*c)));
                line.push(show(*total));
                single.push(line);
            }
            RowValues::PlannedActual { cells, total } => {
                line.extend(cells.iter().map(show_pair));
                line.push(show_pair(total));
                paired.push(line);
            }
        }
    }

    let title = match &view.scope {
        Scope::Month { month_id } => format!("{} - {}", view.project_id, month_id),
        Scope::Cumulative { months } => {
            format!("{} - cumulative ({} months)", view.project_id, months.len())
        }
    };

    let mut out = String::new();
    let _ = writeln!(out, "{title}\n");
    write_grid(&mut out, &header, &single);
    out.push('\n');
    let _ = writeln!(out, "Planned / Actual");
    write_grid(&mut out, &header, &paired);
    out
}

fn write_grid(out: &mut String, header: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let write_row = |out: &mut String, row: &[String]| {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, &w))| {
                if i == 0 {
                    format!("{cell:<w$}")
                } else {
                    format!("{cell:>w$}")
                }
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    };

    write_row(out, header);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));
    for row in rows {
        write_row(out, row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::monthly_total;
    use crate::catalog::{Catalog, Contract, LTI, MANHOURS, Project};
    use crate::dataset::{DatasetPatch, IndicatorDataset};

    #[test]
    fn numbers_are_grouped_and_trimmed() {
        assert_eq!(format_number(12345.0), "12,345");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.33");
        assert_eq!(format_number(2_000_000.0 / 3000.0), "666.667");
        assert_eq!(format_number(1234567.891), "1,234,567.891");
        assert_eq!(format_number(-1500.0), "-1,500");
    }

    #[test]
    fn table_shows_absent_as_dash() {
        let project = Project {
            id: "chenda".into(),
            name: "Chenda".into(),
            short_name: "CHD".into(),
            description: String::new(),
            color: "#117a65".into(),
            contracts: vec![Contract {
                id: "P2".into(),
                label: "P2 (MHB)".into(),
            }],
        };
        let catalog = Catalog::new(vec![project.clone()], Vec::new());
        let mut ds = IndicatorDataset::empty(&project, "Mar-26", &catalog);
        let mut patch = DatasetPatch::default();
        patch.set_single(MANHOURS, "P2", 48210.0);
        patch.set_single(LTI, "P2", 0.0);
        ds.merge(&patch, &project, &catalog);

        let text = render_table(&monthly_total(&ds, &project.contracts, &catalog));
        assert!(text.starts_with("chenda - Mar-26"));
        assert!(text.contains("P2 (MHB)"));
        let tail = |name: &str| -> Vec<String> {
            let line = text.lines().find(|l| l.starts_with(name)).unwrap();
            let mut cells: Vec<String> = line
                .split_whitespace()
                .rev()
                .take(2)
                .map(str::to_string)
                .collect();
            cells.reverse();
            cells
        };
        assert_eq!(tail("Manhours"), ["48,210", "48,210"]);
        assert_eq!(tail("Major Fire"), ["-", "-"]);
        assert_eq!(tail("Loss Time Injury Frequency"), ["0", "0"]);
        assert_eq!(tail("HSSE Audit"), ["/", "-"]);
    }
}
