//! Property-based tests for the Lakeland migration
//!
//! 1. Empty and sentinel path entries normalize to nothing
//! 2. Normalized paths are fixed points of the normalizer
//! 3. Unknown roots are dropped without failing
//! 4. Provenance fingerprints are deterministic
//! 5. Validation accounts for every row, sequential or parallel

use lakeland_ingest_airtable::{validate_records, ValidateOptions};
use lakeland_migrate::paths::{default_root_prefixes, PathNormalizer, NO_FILE_SENTINEL};
use lakeland_model::digest::{provenance_fingerprint_v1, PROVENANCE_FINGERPRINT_V1_PREFIX};
use lakeland_model::SubjectSourceRecord;
use proptest::prelude::*;
use serde_json::{json, Value};

// ============================================================================
// Strategies
// ============================================================================

/// A path component as typed by data entry: no quotes, slashes or whitespace runs.
fn component_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,10}( [A-Za-z0-9_-]{1,10})?"
}

fn known_root_strategy() -> impl Strategy<Value = String> {
    let roots: Vec<String> = default_root_prefixes()
        .into_keys()
        .filter(|k| k != "Projects")
        .collect();
    prop::sample::select(roots)
}

fn batch_folder_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{6}"
}

/// A relative path whose first component is routed by the root table or the
/// digitization batch rule.
fn routable_path_strategy() -> impl Strategy<Value = String> {
    (
        prop_oneof![known_root_strategy(), batch_folder_strategy()],
        prop::collection::vec(component_strategy(), 1..4),
    )
        .prop_map(|(first, rest)| format!("{first}/{}", rest.join("/")))
}

#[derive(Debug, Clone)]
enum SubjectRow {
    Valid(String),
    MissingName,
    ListName,
}

fn subject_row_strategy() -> impl Strategy<Value = SubjectRow> {
    prop_oneof![
        3 => "[A-Z][a-z]{2,12}".prop_map(SubjectRow::Valid),
        1 => Just(SubjectRow::MissingName),
        1 => Just(SubjectRow::ListName),
    ]
}

fn subject_row(i: usize, row: &SubjectRow) -> Value {
    let mut value = json!({
        "Items": [],
        "airtable_createdTime": "2021-05-01T00:00:00.000Z",
        "airtable_id": format!("recS{i}"),
    });
    match row {
        SubjectRow::Valid(name) => value["Name"] = json!(name),
        SubjectRow::MissingName => {}
        SubjectRow::ListName => value["Name"] = json!(["a", "b"]),
    }
    value
}

// ============================================================================
// Path normalizer
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn sentinel_and_blank_entries_normalize_to_nothing(padding in " {0,3}") {
        let normalizer = PathNormalizer::default();
        prop_assert!(normalizer.normalize("").is_empty());
        prop_assert!(normalizer.normalize(NO_FILE_SENTINEL).is_empty());
        let quoted = format!("\"{}\"", NO_FILE_SENTINEL);
        prop_assert!(normalizer.normalize(&quoted).is_empty());
        let blank = format!("\"{}\"", padding);
        prop_assert!(normalizer.normalize(&blank).is_empty());
    }

    #[test]
    fn normalized_paths_are_fixed_points(paths in prop::collection::vec(routable_path_strategy(), 1..4)) {
        let normalizer = PathNormalizer::default();
        let raw = format!("\"{}\"", paths.join("\",\""));
        let normalized = normalizer.normalize(&raw);

        prop_assert_eq!(normalized.len(), paths.len());
        for path in &normalized {
            prop_assert_eq!(&normalizer.normalize(path), &vec![path.clone()]);
        }
    }

    #[test]
    fn output_keeps_fragment_order(paths in prop::collection::vec(routable_path_strategy(), 1..5)) {
        let normalizer = PathNormalizer::default();
        let raw = paths.join("\",\"");
        let normalized = normalizer.normalize(&raw);

        prop_assert_eq!(normalized.len(), paths.len());
        for (input, output) in paths.iter().zip(&normalized) {
            prop_assert!(output.ends_with(input.as_str()), "{} does not end with {}", output, input);
        }
    }

    #[test]
    fn unknown_roots_are_dropped(
        first in "[A-Z][a-z]{7,12}",
        rest in prop::collection::vec(component_strategy(), 0..3),
    ) {
        prop_assume!(!default_root_prefixes().contains_key(&first));
        let raw = std::iter::once(first).chain(rest).collect::<Vec<_>>().join("/");
        prop_assert!(PathNormalizer::default().normalize(&raw).is_empty());
    }
}

// ============================================================================
// Provenance
// ============================================================================

proptest! {
    #[test]
    fn fingerprint_is_deterministic(id in "rec[A-Za-z0-9]{14}", created in "[0-9T:.Z-]{0,24}") {
        let a = provenance_fingerprint_v1(&id, &created);
        let b = provenance_fingerprint_v1(&id, &created);
        prop_assert_eq!(&a, &b);
        prop_assert!(a.starts_with(PROVENANCE_FINGERPRINT_V1_PREFIX));
        prop_assert_eq!(a.len(), PROVENANCE_FINGERPRINT_V1_PREFIX.len() + 16);
    }

    #[test]
    fn fingerprint_separates_id_from_time(id in "[a-z]{1,8}", created in "[a-z]{1,8}") {
        // Moving characters across the boundary must change the fingerprint.
        let shifted_id = format!("{id}{}", &created[..1]);
        let shifted_created = &created[1..];
        prop_assert_ne!(
            provenance_fingerprint_v1(&id, &created),
            provenance_fingerprint_v1(&shifted_id, shifted_created)
        );
    }
}

// ============================================================================
// Validator
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_row_is_validated_or_reported(rows in prop::collection::vec(subject_row_strategy(), 0..40)) {
        let values: Vec<Value> = rows.iter().enumerate().map(|(i, r)| subject_row(i, r)).collect();

        let sequential =
            validate_records::<SubjectSourceRecord>(&values, ValidateOptions { parallel: false }).unwrap();
        let parallel =
            validate_records::<SubjectSourceRecord>(&values, ValidateOptions { parallel: true }).unwrap();

        let expected_ok = rows.iter().filter(|r| matches!(r, SubjectRow::Valid(_))).count();
        prop_assert_eq!(sequential.records.len(), expected_ok);
        prop_assert_eq!(sequential.records.len() + sequential.errors.len(), values.len());
        prop_assert_eq!(sequential, parallel);
    }

    #[test]
    fn one_unmapped_column_anywhere_is_drift(
        n in 1usize..50,
        at in any::<prop::sample::Index>(),
        label in "Zz [A-Za-z]{3,10}",
    ) {
        let mut values: Vec<Value> =
            (0..n).map(|i| subject_row(i, &SubjectRow::Valid("Farming".into()))).collect();
        values[at.index(n)][label.as_str()] = json!("x");

        let err = validate_records::<SubjectSourceRecord>(&values, ValidateOptions::default()).unwrap_err();
        prop_assert_eq!(err.field, label);
    }
}
