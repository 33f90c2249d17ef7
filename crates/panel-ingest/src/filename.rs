//! File name grammar for source and output workbooks.
//!
//! Every workbook name encodes the facts the merge stages group by:
//!
//! ```text
//! ENTITY [GROUP] '-' YYYY ['-' YYYY] [TAGS] '.xlsx' | '.xlsm'
//! ```
//!
//! `US1-2015A.xlsx` is company 1 of entity `US`, year 2015, variable group
//! `A`. `Denmark-2015-2017BC.xlsm` covers 2015 through 2017 for groups `B`
//! and `C`. Entities may contain inner hyphens (`South-Korea-2015A.xlsx`).

use std::path::Path;
use std::sync::LazyLock;

use panel_model::{SourceFile, YearSpan};
use regex::Regex;
use tracing::debug;

use crate::discovery::is_workbook;

static SOURCE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<entity>[A-Za-z]+(?:-[A-Za-z]+)*?)(?P<group>\d+)?-(?P<start>\d{4})(?:-(?P<end>\d{4}))?(?P<tags>[A-Za-z]+)?$",
    )
    .expect("Invalid source file name regex")
});

/// Parses a workbook path into its file-name facts.
///
/// Returns `None` for non-workbook extensions, names that do not follow the
/// grammar, and spans whose end precedes their start.
pub fn parse_source_name(path: &Path) -> Option<SourceFile> {
    if !is_workbook(path) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let caps = SOURCE_NAME_REGEX.captures(stem)?;

    let entity = caps.name("entity")?.as_str().to_string();
    let group_index = match caps.name("group") {
        Some(group) => Some(group.as_str().parse::<u32>().ok()?),
        None => None,
    };
    let start = caps.name("start")?.as_str().parse::<i32>().ok()?;
    let end = match caps.name("end") {
        Some(end) => end.as_str().parse::<i32>().ok()?,
        None => start,
    };
    let span = match YearSpan::new(start, end) {
        Ok(span) => span,
        Err(error) => {
            debug!(file = %path.display(), %error, "rejecting file name");
            return None;
        }
    };
    let tags = caps.name("tags").map(|tags| tags.as_str().to_string());

    Some(SourceFile {
        entity,
        group_index,
        span,
        tags,
        path: path.to_path_buf(),
    })
}

/// Company workbook: group index and tags both present (`US1-2015A.xlsx`).
pub fn parse_company_file(path: &Path) -> Option<SourceFile> {
    parse_source_name(path).filter(|file| file.group_index.is_some() && file.tags.is_some())
}

/// Variable-group workbook: tags present, no group index (`DK-2015B.xlsx`).
pub fn parse_variable_file(path: &Path) -> Option<SourceFile> {
    parse_source_name(path).filter(|file| file.group_index.is_none() && file.tags.is_some())
}

/// Merged span workbook: neither group index nor tags (`DK-2015-2017.xlsx`).
pub fn parse_span_file(path: &Path) -> Option<SourceFile> {
    parse_source_name(path).filter(|file| file.group_index.is_none() && file.tags.is_none())
}

/// Builds an output file name; the inverse of [`parse_source_name`].
///
/// The end year is omitted when it equals the start year.
pub fn build_output_name(entity: &str, span: YearSpan, tags: Option<&str>) -> String {
    format!("{entity}-{span}{}.xlsx", tags.unwrap_or_default())
}

/// Display key of a merge group, the output name without extension.
pub fn group_key(entity: &str, span: YearSpan, tags: Option<&str>) -> String {
    format!("{entity}-{span}{}", tags.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn parse(name: &str) -> Option<SourceFile> {
        parse_source_name(Path::new(name))
    }

    #[test]
    fn parses_company_file() {
        let file = parse("US1-2015A.xlsx").unwrap();
        assert_eq!(file.entity, "US");
        assert_eq!(file.group_index, Some(1));
        assert_eq!(file.span, YearSpan::single(2015));
        assert_eq!(file.tags.as_deref(), Some("A"));
        assert_eq!(file.path, PathBuf::from("US1-2015A.xlsx"));
    }

    #[test]
    fn parses_multi_year_and_hyphenated_entity() {
        let file = parse("South-Korea-2015-2018CD.xlsm").unwrap();
        assert_eq!(file.entity, "South-Korea");
        assert_eq!(file.group_index, None);
        assert_eq!(file.span, YearSpan::new(2015, 2018).unwrap());
        assert_eq!(file.tags.as_deref(), Some("CD"));
    }

    #[test]
    fn parses_span_file() {
        let file = parse_span_file(Path::new("data/Denmark-2015-2017.xlsx")).unwrap();
        assert_eq!(file.entity, "Denmark");
        assert_eq!(file.tags, None);
        assert!(parse_span_file(Path::new("Denmark-2015A.xlsx")).is_none());
    }

    #[test]
    fn stage_parsers_enforce_shape() {
        assert!(parse_company_file(Path::new("US3-2015A.xlsx")).is_some());
        assert!(parse_company_file(Path::new("US-2015A.xlsx")).is_none());
        assert!(parse_variable_file(Path::new("US-2015A.xlsx")).is_some());
        assert!(parse_variable_file(Path::new("US1-2015A.xlsx")).is_none());
    }

    #[test]
    fn rejects_unparseable_names() {
        assert!(parse("notes.xlsx").is_none());
        assert!(parse("US1-15A.xlsx").is_none());
        assert!(parse("US1-2015A.csv").is_none());
        assert!(parse("US-2017-2015A.xlsx").is_none());
        assert!(parse("US 1-2015A.xlsx").is_none());
    }

    #[test]
    fn output_name_omits_equal_end_year() {
        assert_eq!(
            build_output_name("US", YearSpan::single(2015), Some("A")),
            "US-2015A.xlsx"
        );
        assert_eq!(
            build_output_name("Denmark", YearSpan::new(2015, 2017).unwrap(), None),
            "Denmark-2015-2017.xlsx"
        );
    }

    proptest! {
        #[test]
        fn output_name_round_trips(
            entity in "[A-Z][a-z]{0,8}(-[A-Z][a-z]{0,8}){0,2}",
            start in 1990i32..2040,
            extra in 0i32..6,
            tags in proptest::option::of("[A-Z]{1,3}"),
        ) {
            let span = YearSpan::new(start, start + extra).unwrap();
            let name = build_output_name(&entity, span, tags.as_deref());
            let parsed = parse_source_name(Path::new(&name)).unwrap();
            prop_assert_eq!(parsed.entity, entity);
            prop_assert_eq!(parsed.group_index, None);
            prop_assert_eq!(parsed.span, span);
            prop_assert_eq!(parsed.tags, tags);
        }
    }
}
