use super::*;
use crate::SourcePosition;

#[test]
fn reports_up_to_max_error_count() {
    let mut diagnostics = Diagnostics::new(2);
    assert!(diagnostics.error("first").emit());
    assert!(diagnostics.error("second").emit());
    assert!(!diagnostics.error("third").emit());
    assert_eq!(diagnostics.count(), 2);
}

#[test]
fn severity_counts() {
    let mut diagnostics = Diagnostics::new(10);
    diagnostics.warning("careful").emit();
    diagnostics.error("broken").emit();
    diagnostics.fatal("unrecoverable").emit();

    assert!(diagnostics.has_errors());
    assert!(diagnostics.has_fatal_errors());
    assert_eq!(diagnostics.warnings().count(), 1);
    assert_eq!(diagnostics.errors().count(), 2);
}

#[test]
fn builder_records_all_fields() {
    let mut diagnostics = Diagnostics::default();
    diagnostics
        .error("Expected person name")
        .at(SourcePosition::new(3, 5, 40))
        .context_path("workspace/model")
        .expected("string")
        .found("identifier")
        .emit();

    let diag = diagnostics.iter().next().unwrap();
    assert_eq!(diag.position, Some(SourcePosition::new(3, 5, 40)));
    assert_eq!(diag.context_path.as_deref(), Some("workspace/model"));
    assert_eq!(diag.expected.as_deref(), Some("string"));
    assert_eq!(diag.found.as_deref(), Some("identifier"));
}

#[test]
fn reset_clears_state() {
    let mut diagnostics = Diagnostics::default();
    diagnostics.error("boom").emit();
    assert!(!diagnostics.is_empty());
    diagnostics.reset();
    assert!(diagnostics.is_empty());
}

#[test]
fn extend_respects_cap() {
    let mut a = Diagnostics::new(2);
    a.error("a1").emit();
    let mut b = Diagnostics::new(10);
    b.error("b1").emit();
    b.error("b2").emit();
    a.extend(b);
    assert_eq!(a.count(), 2);
}

#[test]
fn severity_display_matches_lowercase_name() {
    insta::assert_snapshot!(format!("{}", Severity::Info), @"info");
    insta::assert_snapshot!(format!("{}", Severity::Warning), @"warning");
    insta::assert_snapshot!(format!("{}", Severity::Error), @"error");
    insta::assert_snapshot!(format!("{}", Severity::Fatal), @"fatal");
}

#[test]
fn diagnostic_display_includes_position_and_expectation() {
    let mut diagnostics = Diagnostics::default();
    diagnostics
        .error("Expected person name")
        .at(SourcePosition::new(3, 5, 40))
        .context_path("workspace/model")
        .expected("string")
        .found("identifier")
        .emit();
    let diag = diagnostics.iter().next().unwrap();
    insta::assert_snapshot!(
        format!("{diag}"),
        @"error at 3:5: Expected person name (expected string, found identifier) [workspace/model]"
    );
}
