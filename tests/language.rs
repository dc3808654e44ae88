//! Language resolution and tag matching tests.

use audiograft::{Language, is_undetermined};

#[test]
fn resolve_bibliographic_code() {
    let language = Language::resolve("fre").expect("fre should resolve");
    assert_eq!(language.code(), "fre");
    assert_eq!(language.name(), "French");
}

#[test]
fn resolve_terminology_code() {
    let language = Language::resolve("fra").expect("fra should resolve");
    assert_eq!(language.code(), "fre");
    assert_eq!(language.terminology_code(), "fra");
}

#[test]
fn resolve_short_code() {
    let language = Language::resolve("de").expect("de should resolve");
    assert_eq!(language.code(), "ger");
    assert_eq!(language.short_code(), Some("de"));
}

#[test]
fn resolve_english_name_case_insensitive() {
    assert_eq!(
        Language::resolve("japanese").expect("name should resolve").code(),
        "jpn",
    );
    assert_eq!(
        Language::resolve("ENGLISH").expect("name should resolve").code(),
        "eng",
    );
}

#[test]
fn resolve_rejects_unknown_input() {
    assert!(Language::resolve("klingon").is_none());
    assert!(Language::resolve("").is_none());
    assert!(Language::resolve("   ").is_none());
}

#[test]
fn resolved_aliases_compare_equal() {
    let a = Language::resolve("fre").unwrap();
    let b = Language::resolve("fra").unwrap();
    let c = Language::resolve("French").unwrap();
    assert_eq!(a, b);
    assert_eq!(b, c);
}

#[test]
fn matches_every_alias() {
    let french = Language::resolve("French").unwrap();
    assert!(french.matches_tag("fre"));
    assert!(french.matches_tag("fra"));
    assert!(french.matches_tag("fr"));
    assert!(french.matches_tag("FRA"));
    assert!(!french.matches_tag("eng"));
    assert!(!french.matches_tag("ger"));
}

#[test]
fn matches_bcp47_primary_subtag() {
    let french = Language::resolve("fr").unwrap();
    assert!(french.matches_tag("fr-CA"));
    assert!(french.matches_tag("fr_FR"));

    let portuguese = Language::resolve("por").unwrap();
    assert!(portuguese.matches_tag("pt-BR"));
}

#[test]
fn undetermined_never_matches() {
    let english = Language::resolve("eng").unwrap();
    assert!(!english.matches_tag("und"));
    assert!(!english.matches_tag(""));
}

#[test]
fn exact_code_distinguishes_aliases() {
    let french = Language::resolve("fre").unwrap();
    assert!(french.is_exact_code("fre"));
    assert!(french.is_exact_code("FRE"));
    assert!(!french.is_exact_code("fra"));
    assert!(!french.is_exact_code("fr"));
}

#[test]
fn undetermined_tags() {
    assert!(is_undetermined("und"));
    assert!(is_undetermined("UND"));
    assert!(is_undetermined(""));
    assert!(is_undetermined("  "));
    assert!(!is_undetermined("eng"));
}

#[test]
fn display_uses_name() {
    let language = Language::resolve("spa").unwrap();
    assert_eq!(format!("{language}"), "Spanish");
}
