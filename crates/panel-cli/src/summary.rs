use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};
use panel_merge::KeyGap;
use panel_model::{KeyStatus, StageReport};

use panel_cli::types::RunSummary;

pub fn print_summary(summary: &RunSummary) {
    for report in &summary.reports {
        println!("Stage: {}", report.stage);
        println!("{}", stage_table(report));
        if let Some(table) = missing_groups_table(report) {
            println!("Missing companies:");
            println!("{table}");
        }
        if !report.warnings.is_empty() {
            eprintln!("Warnings ({}):", report.warnings.len());
            for warning in &report.warnings {
                eprintln!("- {warning}");
            }
        }
        println!();
    }
    if let Some(table) = gap_table(&summary.gaps) {
        println!("Row keys missing from a variable group:");
        println!("{table}");
    }
    if let Some(path) = &summary.exported {
        println!("Exported: {}", path.display());
    }
}

/// One row per key plus a totals row.
pub fn stage_table(report: &StageReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Key"),
        header_cell("Status"),
        header_cell("Detail"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for outcome in &report.outcomes {
        table.add_row(vec![
            Cell::new(&outcome.key)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            status_cell(outcome.status),
            detail_cell(outcome.detail.as_deref()),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(totals(report)).add_attribute(Attribute::Bold),
        count_cell(report.warnings.len(), "warnings", Color::Yellow),
    ]);
    table
}

fn totals(report: &StageReport) -> String {
    let mut parts = Vec::new();
    for (count, label) in [
        (report.written_count(), "written"),
        (report.checked_count(), "checked"),
        (report.skipped_count(), "skipped"),
        (report.failed_count(), "failed"),
    ] {
        if count > 0 {
            parts.push(format!("{count} {label}"));
        }
    }
    if parts.is_empty() {
        "nothing to do".to_string()
    } else {
        parts.join(", ")
    }
}

fn missing_groups_table(report: &StageReport) -> Option<Table> {
    if report.missing_groups.is_empty() {
        return None;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Key"), header_cell("Missing companies")]);
    apply_table_style(&mut table);
    for gap in &report.missing_groups {
        let missing: Vec<String> = gap.missing.iter().map(ToString::to_string).collect();
        table.add_row(vec![
            Cell::new(&gap.key),
            Cell::new(missing.join(", ")).fg(Color::Yellow),
        ]);
    }
    Some(table)
}

pub fn gap_table(gaps: &[KeyGap]) -> Option<Table> {
    if gaps.is_empty() {
        return None;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Key"),
        header_cell("Sheet"),
        header_cell("Group"),
        header_cell("Row key"),
        header_cell("Present in"),
    ]);
    apply_table_style(&mut table);
    for gap in gaps {
        let present: Vec<String> = gap
            .present_in
            .iter()
            .map(|location| format!("{} (row {})", location.group, location.row))
            .collect();
        table.add_row(vec![
            Cell::new(&gap.key),
            Cell::new(&gap.sheet),
            Cell::new(&gap.group).fg(Color::Yellow),
            Cell::new(&gap.row_key),
            Cell::new(present.join(", ")),
        ]);
    }
    Some(table)
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
    if table.column_count() >= 3 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Percentage(30)),
            ColumnConstraint::LowerBoundary(Width::Fixed(9)),
            ColumnConstraint::UpperBoundary(Width::Percentage(60)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(status: KeyStatus) -> Cell {
    match status {
        KeyStatus::Written => Cell::new("written").fg(Color::Green),
        KeyStatus::Checked => Cell::new("checked").fg(Color::Green),
        KeyStatus::Skipped => dim_cell("skipped"),
        KeyStatus::Failed => Cell::new("FAILED")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

fn detail_cell(detail: Option<&str>) -> Cell {
    match detail {
        Some(text) => Cell::new(text),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, label: &str, color: Color) -> Cell {
    if count > 0 {
        Cell::new(format!("{count} {label}"))
            .fg(color)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell(format!("0 {label}"))
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
