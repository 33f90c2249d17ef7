mod common;

use std::path::Path;

use common::{file_names, options, rendered, row, source_workbook, write};
use panel_ingest::read_workbook;
use panel_merge::aggregate_years;
use panel_model::{KeyStatus, PipelineOptions, Sheet, Workbook};
use tempfile::TempDir;

fn seed_reference(root: &Path) {
    let sheet = Sheet::from_rows(
        "codes",
        vec![
            row(&["Country_name", "Country_code", "Country_code2"]),
            row(&["United States", "USA", "US"]),
        ],
    );
    write(root, "country-code.xlsx", &Workbook::from_sheets(vec![sheet]));
}

fn seed_year(root: &Path, name: &str, year: i32, rows: &[&[&str]]) {
    let mut sheet_rows = vec![row(&["Type", "V1"])];
    sheet_rows.extend(rows.iter().map(|values| row(values)));
    write(
        &root.join("data"),
        name,
        &source_workbook("FDEALL1", &[(year, sheet_rows)]),
    );
}

fn window(root: &Path, start: i32, end: i32) -> PipelineOptions {
    let mut options = options(root);
    options.start_year = start;
    options.end_year = end;
    options
}

#[test]
fn years_are_stacked_with_entity_columns() {
    let root = TempDir::new().unwrap();
    seed_reference(root.path());
    seed_year(root.path(), "United-States-2016.xlsx", 2016, &[&["b", "2"]]);
    seed_year(root.path(), "United-States-2015.xlsx", 2015, &[&["a", "1"]]);

    let report = aggregate_years(&window(root.path(), 2015, 2016)).unwrap();
    assert_eq!(report.written_count(), 1);

    let output = root
        .path()
        .join("data-2015-2024/United-States-2015-2016.xlsx");
    let workbook = read_workbook(&output).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["MASTER_TABLE"]);
    assert_eq!(
        rendered(workbook.sheet("MASTER_TABLE").unwrap()),
        vec![
            vec!["YEAR", "COUNTRY", "COUNTRY_CODE", "COUNTRY_CODE2", "Type", "V1"],
            vec!["2015", "United States", "USA", "US", "a", "1"],
            vec!["2016", "United States", "USA", "US", "b", "2"],
        ]
    );
}

#[test]
fn entity_with_a_missing_year_is_dropped() {
    let root = TempDir::new().unwrap();
    seed_reference(root.path());
    seed_year(root.path(), "Denmark-2015.xlsx", 2015, &[&["a", "1"]]);
    seed_year(root.path(), "Denmark-2017.xlsx", 2017, &[&["a", "3"]]);

    let report = aggregate_years(&window(root.path(), 2015, 2017)).unwrap();

    assert_eq!(report.failed_count(), 1);
    let detail = report.outcomes[0].detail.as_deref().unwrap();
    assert!(detail.contains("gaps at [2016]"), "{detail}");
    assert!(file_names(&root.path().join("data-2015-2024")).is_empty());
}

#[test]
fn unknown_entity_gets_blank_codes() {
    let root = TempDir::new().unwrap();
    seed_reference(root.path());
    seed_year(root.path(), "Atlantis-2015.xlsx", 2015, &[&["a", "1"]]);

    let report = aggregate_years(&window(root.path(), 2015, 2015)).unwrap();
    assert_eq!(report.written_count(), 1);
    assert!(report.warnings.iter().any(|w| w.contains("Atlantis")));

    let workbook =
        read_workbook(&root.path().join("data-2015-2024/Atlantis-2015.xlsx")).unwrap();
    assert_eq!(
        rendered(workbook.sheet("MASTER_TABLE").unwrap())[1],
        vec!["2015", "Atlantis", "", "", "a", "1"]
    );
}

#[test]
fn missing_reference_table_stops_the_stage() {
    let root = TempDir::new().unwrap();
    seed_year(root.path(), "Denmark-2015.xlsx", 2015, &[&["a", "1"]]);

    let err = aggregate_years(&window(root.path(), 2015, 2015)).unwrap_err();
    assert!(err.is_process_fatal());
}

#[test]
fn empty_year_sheet_counts_as_missing() {
    let root = TempDir::new().unwrap();
    seed_reference(root.path());
    seed_year(root.path(), "Denmark-2015.xlsx", 2015, &[&["a", "1"]]);
    write(
        &root.path().join("data"),
        "Denmark-2016.xlsx",
        &source_workbook("FDEALL1", &[(2016, Vec::new())]),
    );

    let report = aggregate_years(&window(root.path(), 2015, 2016)).unwrap();

    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.outcomes[0].status, KeyStatus::Failed);
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.contains("sheet '2016' for 2016 is empty, skipped")),
        "{:?}",
        report.warnings
    );
    assert!(file_names(&root.path().join("data-2015-2024")).is_empty());
}

#[test]
fn descriptor_year_outside_the_file_span_is_skipped() {
    let root = TempDir::new().unwrap();
    seed_reference(root.path());
    write(
        &root.path().join("data"),
        "United-States-2015.xlsx",
        &source_workbook(
            "FDEALL1",
            &[
                (2015, vec![row(&["Type", "V1"]), row(&["a", "1"])]),
                (2016, vec![row(&["Type", "V1"]), row(&["b", "2"])]),
            ],
        ),
    );

    let report = aggregate_years(&window(root.path(), 2015, 2015)).unwrap();

    assert_eq!(report.written_count(), 1);
    assert!(
        report.warnings.iter().any(|w| w.contains("row skipped")),
        "{:?}",
        report.warnings
    );
    let workbook =
        read_workbook(&root.path().join("data-2015-2024/United-States-2015.xlsx")).unwrap();
    let rows = rendered(workbook.sheet("MASTER_TABLE").unwrap());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1], vec!["2015", "United States", "USA", "US", "a", "1"]);
}
