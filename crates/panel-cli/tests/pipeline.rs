//! Integration tests for option loading, confirmation and the full run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use panel_cli::cli::{PipelineArgs, RunArgs};
use panel_cli::commands::{confirm_replacement, load_options, run_pipeline};
use panel_cli::prompt::Confirmation;
use panel_ingest::write_workbook;
use panel_model::{CellValue, DescriptorLayout, ExistingOutputPolicy, Sheet, Workbook};
use tempfile::TempDir;

fn args(root: &Path) -> PipelineArgs {
    PipelineArgs {
        root: root.to_path_buf(),
        config: None,
        replace_existing: false,
        assume_yes: false,
        assume_no: false,
        json: false,
    }
}

fn row(values: &[&str]) -> Vec<CellValue> {
    values.iter().map(|v| CellValue::text(*v)).collect()
}

fn company(header: &str, value: &str) -> Workbook {
    let layout = DescriptorLayout::STANDARD;
    let mut request = Sheet::new("REQUEST_TABLE");
    let line = layout.first_row;
    request.set_cell(line, layout.series_col, CellValue::text("FDEALL1"));
    request.set_cell(line, layout.year_col, CellValue::from(2015));
    request.set_cell(line, layout.reference_col, CellValue::text("'2015'!$A$1"));
    request.set_cell(line, layout.rows_col, CellValue::from(2));
    request.set_cell(line, layout.cols_col, CellValue::from(2));
    let data = Sheet::from_rows("2015", vec![row(&["Type", header]), row(&["X", value])]);
    Workbook::from_sheets(vec![request, data])
}

#[test]
fn config_file_values_are_loaded_and_rooted() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("panel.json");
    std::fs::write(
        &config,
        r#"{ "expected_companies": 4, "end_year": 2020, "dirs": { "masters": "masters" } }"#,
    )
    .unwrap();

    let mut pipeline = args(root.path());
    pipeline.config = Some(config);
    pipeline.replace_existing = true;
    let options = load_options(&pipeline).unwrap();

    assert_eq!(options.expected_companies, 4);
    assert_eq!(options.end_year, 2020);
    assert_eq!(options.start_year, 2015);
    assert_eq!(options.dirs.masters, root.path().join("masters"));
    assert_eq!(options.dirs.spans, root.path().join("data"));
    assert_eq!(options.existing, ExistingOutputPolicy::Replace);
}

#[test]
fn malformed_config_is_reported_with_its_path() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("broken.json");
    std::fs::write(&config, "{ not json").unwrap();
    let mut pipeline = args(root.path());
    pipeline.config = Some(config);

    let err = load_options(&pipeline).unwrap_err();
    assert!(format!("{err:#}").contains("broken.json"));
}

#[test]
fn declined_replacement_stops_the_run() {
    let root = TempDir::new().unwrap();
    let mut pipeline = args(root.path());
    pipeline.replace_existing = true;
    let options = load_options(&pipeline).unwrap();

    let err = confirm_replacement(&options, Confirmation::AssumeNo, "outputs").unwrap_err();
    assert_eq!(err.to_string(), "replacement of existing outputs declined");
    confirm_replacement(&options, Confirmation::AssumeYes, "outputs").unwrap();

    // Without replacement nothing is asked.
    let options = load_options(&args(root.path())).unwrap();
    confirm_replacement(&options, Confirmation::AssumeNo, "outputs").unwrap();
}

fn seed_denmark(root: &Path) {
    let companies = root.join("data-split-by-entity");
    std::fs::create_dir_all(&companies).unwrap();
    write_workbook(&company("A1", "1"), &companies.join("DK1-2015A.xlsx")).unwrap();
    write_workbook(&company("B1", "2"), &companies.join("DK1-2015B.xlsx")).unwrap();
    let reference = Sheet::from_rows(
        "codes",
        vec![
            row(&["Country_name", "Country_code", "Country_code2"]),
            row(&["DK", "DNK", "DK"]),
        ],
    );
    write_workbook(
        &Workbook::from_sheets(vec![reference]),
        &root.join("country-code.xlsx"),
    )
    .unwrap();
}

/// Every file under `dir` with its content.
fn tree(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(tree(&path));
        } else {
            let content = std::fs::read(&path).unwrap();
            files.insert(path, content);
        }
    }
    files
}

#[test]
fn full_run_produces_the_combined_csv() {
    let root = TempDir::new().unwrap();
    seed_denmark(root.path());

    let mut options = load_options(&args(root.path())).unwrap();
    options.end_year = 2015;
    let summary = run_pipeline(&options, &RunArgs::default()).unwrap();

    let stages: Vec<&str> = summary.reports.iter().map(|r| r.stage.as_str()).collect();
    assert_eq!(stages, vec!["entities", "audit", "variables", "years", "combine"]);
    assert!(!summary.has_failures());
    assert!(summary.gaps.is_empty());
    assert_eq!(summary.exported, None::<PathBuf>);

    let csv = std::fs::read_to_string(root.path().join("all-countries.csv")).unwrap();
    let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').lines().collect();
    assert_eq!(
        lines,
        vec![
            "YEAR,COUNTRY,COUNTRY_CODE,COUNTRY_CODE2,Type,A1,B1",
            "2015,DK,DNK,DK,X,1,2",
        ]
    );
}

#[test]
fn second_run_changes_nothing() {
    let root = TempDir::new().unwrap();
    seed_denmark(root.path());
    let mut options = load_options(&args(root.path())).unwrap();
    options.end_year = 2015;

    run_pipeline(&options, &RunArgs::default()).unwrap();
    let before = tree(root.path());
    assert!(before.contains_key(&root.path().join("processed_log.txt")));

    let summary = run_pipeline(&options, &RunArgs::default()).unwrap();

    assert!(!summary.has_failures());
    for report in &summary.reports {
        assert_eq!(report.written_count(), 0, "stage {} wrote again", report.stage);
    }
    assert_eq!(tree(root.path()), before);
}
