//! Tag query and wildcard matching behavior

use logview::loader::RequestQueue;
use logview::query::{contains_tag, contains_tag_pattern, normalize, Matcher};
use logview::ReportData;
use std::path::Path;

const XY: &[&str] = &["x", "y"];

#[test]
fn normalization_ignores_case_spaces_and_underscores() {
    assert_eq!(normalize("Hello_World Again"), "helloworldagain");
    assert!(contains_tag(&["Needs Review"], "needs_review"));
    assert!(!contains_tag(&["review"], "re*"));
}

#[test]
fn wildcards() {
    let m = Matcher::new("foo*bar");
    assert!(m.matches("foobar"));
    assert!(m.matches("Foo Middle Bar"));
    assert!(!m.matches("foobarbaz"));

    let single = Matcher::new("t?st");
    assert!(single.matches("test"));
    assert!(!single.matches("teest"));

    assert!(Matcher::new("*").matches(""));
    assert!(Matcher::new("a*").matches("a\nb"));
}

#[test]
fn regex_metacharacters_are_literal() {
    assert!(Matcher::new("a.b").matches("a.b"));
    assert!(!Matcher::new("a.b").matches("axb"));
    assert!(Matcher::new("(x)+").matches("(x)+"));
    assert!(Matcher::new("[abc]").matches("[ABC]"));
}

#[test]
fn boolean_operators() {
    assert!(contains_tag_pattern(XY, "x AND y"));
    assert!(contains_tag_pattern(XY, "x & y"));
    assert!(!contains_tag_pattern(XY, "x AND z"));
    assert!(contains_tag_pattern(XY, "z OR y"));
    assert!(!contains_tag_pattern(XY, "z OR w"));
    assert!(contains_tag_pattern(XY, "x NOT z"));
    assert!(!contains_tag_pattern(XY, "x NOT y"));
}

#[test]
fn not_with_conjunction() {
    assert!(!contains_tag_pattern(XY, "x NOT y AND z"));
    assert!(contains_tag_pattern(XY, "y AND x NOT z"));
    assert!(!contains_tag_pattern(XY, "x NOT z NOT y"));
}

#[test]
fn leading_not() {
    let none: &[&str] = &[];
    assert!(contains_tag_pattern(none, "NOT a"));
    assert!(contains_tag_pattern(XY, "NOT a"));
    assert!(!contains_tag_pattern(XY, "NOT x"));
}

#[test]
fn operators_are_case_sensitive() {
    // lowercase "and" is part of the tag text
    assert!(!contains_tag_pattern(XY, "x and y"));
    assert!(contains_tag_pattern(&["x and y"], "x and y"));
}

#[test]
fn queries_against_report_tests() {
    let report = ReportData::from_path(
        Path::new("tests/fixtures/v2/output.json"),
        RequestQueue::new(),
    )
    .unwrap();
    let count = |query: &str| report.search_by_tag(query).unwrap().len();
    assert_eq!(count("smoke"), 2);
    assert_eq!(count("pay*"), 2);
    assert_eq!(count("smoke AND payment"), 1);
    assert_eq!(count("smoke OR slow"), 3);
    assert_eq!(count("NOT slow"), 2);
    assert_eq!(count("nothing"), 0);

    let stats = report.statistics().unwrap();
    let smoke = report
        .suite()
        .unwrap()
        .search_tests_by_tag(&stats.tag[0])
        .unwrap();
    assert_eq!(smoke.len(), 2);
}

#[test]
fn combined_tag_statistics() {
    let report = ReportData::from_path(
        Path::new("tests/fixtures/v2/output.json"),
        RequestQueue::new(),
    )
    .unwrap();
    let stat = report
        .combined_tag_stat("payment NOT smoke", Some("Cash only"))
        .unwrap();
    assert_eq!(stat.row.label, "Cash only");
    assert_eq!(stat.combined.as_deref(), Some("payment NOT smoke"));
    assert_eq!(stat.shown_info(), "(combined)");
    // the cash test is forced to FAIL by the failed suite teardown
    assert_eq!((stat.row.pass, stat.row.fail), (0, 1));

    let found = report.suite().unwrap().search_tests_by_tag(&stat).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "Pay With Cash");
}
