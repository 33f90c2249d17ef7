mod common;

use common::{file_names, options, rendered, row, source_workbook, write};
use panel_ingest::{RequestTableIndex, read_workbook};
use panel_merge::merge_entities;
use panel_model::{KeyStatus, MissingGroups};
use tempfile::TempDir;

fn company(series: &str, rows: &[&[&str]]) -> panel_model::Workbook {
    let mut sheet_rows = vec![row(&["Type", "Sales", "Assets"])];
    sheet_rows.extend(rows.iter().map(|values| row(values)));
    source_workbook(series, &[(2015, sheet_rows)])
}

fn seed_us_companies(root: &std::path::Path) {
    let companies = root.join("data-split-by-entity");
    write(
        &companies,
        "US1-2015A.xlsx",
        &company("FDEALL1", &[&["US0001", "1", "10"], &["US0002", "2", "20"]]),
    );
    write(
        &companies,
        "US2-2015A.xlsx",
        &company("FDEALL2", &[&["US0003", "3", "30"]]),
    );
    // Company 3 declares the wrong series and must be left out.
    write(
        &companies,
        "US3-2015A.xlsx",
        &company("FDEALL1", &[&["US0004", "4", "40"]]),
    );
}

#[test]
fn companies_are_appended_onto_company_one() {
    let root = TempDir::new().unwrap();
    seed_us_companies(root.path());
    let mut options = options(root.path());
    options.expected_companies = 3;

    let report = merge_entities(&options).unwrap();

    assert_eq!(report.written_count(), 1);
    assert_eq!(report.outcomes[0].key, "US-2015A");
    assert_eq!(
        report.missing_groups,
        vec![MissingGroups {
            key: "US-2015A".to_string(),
            missing: vec![3],
        }]
    );
    assert!(report.warnings.iter().any(|w| w.contains("FDEALL3")));

    let output = root.path().join("data-split-by-variable/US-2015A.xlsx");
    let workbook = read_workbook(&output).unwrap();
    assert_eq!(
        rendered(workbook.sheet("2015").unwrap()),
        vec![
            vec!["Type", "Sales", "Assets"],
            vec!["US0001", "1", "10"],
            vec!["US0002", "2", "20"],
            vec!["US0003", "3", "30"],
        ]
    );

    let index = RequestTableIndex::build(&workbook, "REQUEST_TABLE").unwrap();
    let entry = index.lookup(2015).unwrap();
    assert_eq!(entry.expected_rows, Some(4));
    assert_eq!(entry.expected_cols, Some(3));
}

#[test]
fn second_run_leaves_existing_output_alone() {
    let root = TempDir::new().unwrap();
    seed_us_companies(root.path());
    let options = options(root.path());

    let first = merge_entities(&options).unwrap();
    assert_eq!(first.written_count(), 1);
    let output = root.path().join("data-split-by-variable/US-2015A.xlsx");
    let before = std::fs::read(&output).unwrap();

    let second = merge_entities(&options).unwrap();
    assert_eq!(second.written_count(), 0);
    assert_eq!(second.outcomes[0].status, KeyStatus::Skipped);
    assert_eq!(std::fs::read(&output).unwrap(), before);
}

#[test]
fn missing_template_fails_the_key_without_output() {
    let root = TempDir::new().unwrap();
    let companies = root.path().join("data-split-by-entity");
    write(
        &companies,
        "FR2-2016B.xlsx",
        &source_workbook("FDEALL2", &[(2016, vec![row(&["Type", "V1"])])]),
    );

    let report = merge_entities(&options(root.path())).unwrap();

    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.outcomes[0].key, "FR-2016B");
    assert!(file_names(&root.path().join("data-split-by-variable")).is_empty());
}

#[test]
fn missing_input_directory_stops_the_stage() {
    let root = TempDir::new().unwrap();
    let err = merge_entities(&options(root.path())).unwrap_err();
    assert!(err.is_process_fatal());
}
