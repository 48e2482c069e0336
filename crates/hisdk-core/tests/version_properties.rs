//! Property tests for the version model.
//!
//! Covers the parse/display round trip and the ordering laws over
//! `(major, minor, patch)`.

use hisdk_core::Version;
use proptest::prelude::*;
use std::cmp::Ordering;

fn label() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9]{0,7}"
}

fn version() -> impl Strategy<Value = Version> {
    (
        0u32..10,
        0u32..50,
        0u32..10,
        proptest::option::of(label()),
        proptest::option::of("[0-9a-f]{1,10}"),
    )
        .prop_map(|(major, minor, patch, build, revision)| {
            let mut version = Version::new(major, minor, patch);
            if let Some(build) = build {
                version = version.with_build(build);
                if let Some(revision) = revision {
                    version = version.with_revision(revision);
                }
            }
            version
        })
}

proptest! {
    #[test]
    fn numeric_strings_always_parse(
        major in 0u32..1000,
        minor in 0u32..1000,
        patch in proptest::option::of(0u32..1000),
    ) {
        let raw = match patch {
            Some(patch) => format!("{major}.{minor}.{patch}"),
            None => format!("{major}.{minor}"),
        };
        let parsed = Version::parse(&raw).expect("numeric version parses");
        prop_assert_eq!(parsed.major(), major);
        prop_assert_eq!(parsed.minor(), minor);
        prop_assert_eq!(parsed.patch(), patch.unwrap_or(0));
    }

    #[test]
    fn display_round_trips_every_field(v in version()) {
        let text = v.to_display_string();
        let back = Version::parse(&text).expect("display output parses");
        prop_assert_eq!(back.major(), v.major());
        prop_assert_eq!(back.minor(), v.minor());
        prop_assert_eq!(back.patch(), v.patch());
        prop_assert_eq!(back.build(), v.build());
        prop_assert_eq!(back.revision(), v.revision());
        prop_assert_eq!(back.to_display_string(), text);
    }

    #[test]
    fn parse_never_panics(raw in "\\PC{0,24}") {
        if let Ok(v) = Version::parse(&raw) {
            // Anything accepted must survive its own display form.
            let again = Version::parse(&v.to_display_string()).expect("reparse");
            prop_assert_eq!(again.build(), v.build());
            prop_assert_eq!(again.revision(), v.revision());
            prop_assert_eq!(again, v);
        }
    }

    #[test]
    fn non_numeric_major_is_rejected(major in "[a-zA-Z]{1,5}", minor in 0u32..100) {
        let raw = format!("{major}.{minor}");
        prop_assert!(Version::parse(&raw).is_err());
    }

    #[test]
    fn ordering_is_antisymmetric(a in version(), b in version()) {
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
    }

    #[test]
    fn ordering_is_transitive(a in version(), b in version(), c in version()) {
        if a <= b && b <= c {
            prop_assert!(a <= c);
        }
    }

    #[test]
    fn build_and_revision_never_affect_ordering(
        v in version(),
        build in label(),
        revision in "[0-9a-f]{1,10}",
    ) {
        let relabelled = Version::new(v.major(), v.minor(), v.patch())
            .with_build(build)
            .with_revision(revision);
        prop_assert_eq!(v.cmp(&relabelled), Ordering::Equal);
    }
}

#[test]
fn test_malformed_strings_fail() {
    for raw in ["", " ", "bad", "2", "x.40", "2.y", "2..1", ".2.40", "2.40-"] {
        assert!(Version::parse(raw).is_err(), "'{raw}' should not parse");
    }
}
