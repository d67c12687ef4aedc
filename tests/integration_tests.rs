//! Integration tests for the complete Lakeland migration
//!
//! These tests run the whole pipeline over Airtable exports written to a
//! temporary directory:
//! - export files → validation → v4 records → JSON output
//! - determinism across runs
//! - schema drift stopping dependent tables
//!
//! Run with: cargo test --test integration_tests

use std::path::Path;

use lakeland_migrate::{
    run_migration, write_outputs, MigrationConfig, MigrationOutcome, TableStatus,
    REPORT_FILE_NAME,
};
use lakeland_model::{DestinationTable, EntityRecord, SourceTable};
use serde_json::{json, Value};
use tempfile::tempdir;

// ============================================================================
// Fixtures
// ============================================================================

const CREATED: &str = "2021-02-14T18:03:11.000Z";

fn entities() -> Value {
    json!([
        {
            "Name": "Alice Greene",
            "Entity Category": "Person",
            "Date of Birth": "1931",
            "Accessions (as Donor)": ["recA1"],
            "Linked Oral Histories (as Interviewer)": ["recI1"],
            "Source Code": "LCHP-P-12",
            "airtable_createdTime": CREATED,
            "airtable_id": "recE1"
        },
        {
            "Name": "Lakeland Community Center",
            "Entity Category": "Place",
            "Address": "9601 Lakeland Rd",
            "Latitude": 38.9961,
            "Longitude": "-76.9277",
            "airtable_createdTime": CREATED,
            "airtable_id": "recE2"
        },
        {
            "Name": "Robert Brown",
            "Entity Category": "Person",
            "airtable_createdTime": CREATED,
            "airtable_id": "recE3"
        }
    ])
}

fn subjects() -> Value {
    json!([
        {
            "Name": "Urban Renewal",
            "Subject Category": "Topic",
            "Items": ["recI1"],
            "airtable_createdTime": CREATED,
            "airtable_id": "recS1"
        }
    ])
}

fn relationships() -> Value {
    json!([
        {
            "Name": "Alice Greene attended Lakeland Community Center",
            "Entity 1": ["recE1"],
            "Entity 2": ["recE2"],
            "Relationship Type": "attended",
            "Start Date": "1950",
            "airtable_createdTime": CREATED,
            "airtable_id": "recR1"
        },
        {
            "Name": "dangling",
            "Entity 1": ["recE1"],
            "Entity 2": ["recE404"],
            "Relationship Type": "knows",
            "airtable_createdTime": CREATED,
            "airtable_id": "recR2"
        }
    ])
}

fn accessions() -> Value {
    json!([
        {
            "ID": "LCHP-A-2019-001",
            "Date of Donation": "2019-06-01",
            "Donor Name (Form Entry)": "Alice Greene",
            "Donor Name (Linked)": ["recE1"],
            "Files": ["recF1", "recF2"],
            "# Files": 2,
            "Donation Grouping Title": "Greene family papers",
            "Legacy ID-UMD": "UMD-0001",
            "LDT Check (Temp)": "checked",
            "airtable_createdTime": CREATED,
            "airtable_id": "recA1"
        }
    ])
}

fn files() -> Value {
    json!([
        {
            "ID": "LCHP-F-0001",
            "Accession": ["recA1"],
            "File Path": "\"Photos/Greene/img1.jpg\",\"Documents/scan2.pdf\"",
            "File Format": ["image/jpeg"],
            "Part of Item": "LCHP-I-0001",
            "airtable_createdTime": CREATED,
            "airtable_id": "recF1"
        },
        {
            "ID": "LCHP-F-0002",
            "Donation Grouping": ["recA1"],
            "File Path": "NO FILE",
            "Virtual Location": "lakeland://oral-histories/greene.mp3",
            "airtable_createdTime": CREATED,
            "airtable_id": "recF2"
        },
        {
            "ID": "LCHP-F-0003",
            "Accession": ["recA1"],
            "File Path": "abc123/frame001.tif",
            "Part of Item": "recI1",
            "airtable_createdTime": CREATED,
            "airtable_id": "recF3"
        }
    ])
}

fn items() -> Value {
    json!([
        {
            "ID": "LCHP-I-0001",
            "Legacy ID-UMD": "UMD-I-0001",
            "Files": ["recF1", "recF2"],
            "Accession": ["recA1"],
            "Title": "Oral history with Alice Greene",
            "Date Created": "1998-07-04",
            "Category": ["Oral History", "Audio"],
            "Subjects": ["recS1"],
            "Interviewee(s)": ["recE3"],
            "Linked Places/Orgs": ["recE2"],
            "Lakeland Book Page": 12,
            "Lakeland Book": true,
            "airtable_createdTime": CREATED,
            "airtable_id": "recI1"
        },
        {
            "ID": ["LCHP-I-0002", "LCHP-I-0002b"],
            "Legacy ID-UMD": "",
            "Files": [],
            "airtable_createdTime": CREATED,
            "airtable_id": "recI2"
        }
    ])
}

fn write_exports(dir: &Path, overrides: &[(&str, Value)]) {
    let defaults = [
        ("Entities.json", entities()),
        ("subjects.json", subjects()),
        ("relationships.json", relationships()),
        ("accessions.json", accessions()),
        ("files.json", files()),
        ("items.json", items()),
    ];
    for (name, rows) in defaults {
        let rows = overrides
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
            .unwrap_or(rows);
        std::fs::write(dir.join(name), serde_json::to_string_pretty(&rows).unwrap()).unwrap();
    }
}

fn run(dir: &Path, parallel: bool) -> MigrationOutcome {
    let config = MigrationConfig {
        input_dir: dir.to_path_buf(),
        output_dir: dir.join("out"),
        parallel_validation: parallel,
        ..Default::default()
    };
    run_migration(&config).expect("migration runs")
}

fn names(list: &[EntityRecord]) -> Vec<&str> {
    list.iter().map(|e| e.name.as_str()).collect()
}

// ============================================================================
// Full run
// ============================================================================

#[test]
fn test_full_run_builds_every_destination_table() {
    let dir = tempdir().unwrap();
    write_exports(dir.path(), &[]);
    let outcome = run(dir.path(), false);
    let records = &outcome.records;

    assert!(!outcome.report.has_failures());
    assert_eq!(records.entities.len(), 3);
    assert_eq!(records.person_admin.len(), 2);
    assert_eq!(records.locations.len(), 1);
    assert_eq!(records.subjects.len(), 1);
    assert_eq!(records.entity_relationships.len(), 1);
    assert_eq!(records.donation_groupings.len(), 1);
    assert_eq!(records.files.len(), 3);
    assert_eq!(records.items.len(), 1);
    assert_eq!(records.item_legacy_info.len(), 1);
    assert_eq!(records.item_admin.len(), 1);

    let grouping = &records.donation_groupings[0];
    assert_eq!(grouping.idno, "LCHP-A-2019-001");
    assert_eq!(grouping.legacy_idno, "UMD-0001");
    assert_eq!(names(&grouping.linked_donors), vec!["Alice Greene"]);

    let location = &records.locations[0];
    assert_eq!(location.latitude, Some(38.9961));
    assert_eq!(location.longitude, Some(-76.9277));

    let file = &records.files[0];
    assert_eq!(file.donation_grouping_id, "LCHP-A-2019-001");
    assert_eq!(file.file_format, "image/jpeg");
    assert_eq!(file.locations.len(), 2);
    assert!(file.locations[0].ends_with("LCHP Accession 2021/Photos/Greene/img1.jpg"));
    assert!(file.locations[1].ends_with("LCHP Accession 2021/Documents/scan2.pdf"));
    // `NO FILE` drops the virtual location as well.
    assert!(records.files[1].locations.is_empty());
    assert_eq!(records.files[1].donation_grouping_id, "LCHP-A-2019-001");
    assert!(records.files[2].locations[0].contains("2019 Digitization Event"));

    // Listed by the item, or pointing at it through "Part of Item".
    let item_ids: Vec<&str> = records.files.iter().map(|f| f.item_id.as_str()).collect();
    assert_eq!(item_ids, vec!["LCHP-I-0001", "LCHP-I-0001", "LCHP-I-0001"]);

    let item = &records.items[0];
    assert_eq!(item.creation_year, Some(1998));
    assert_eq!(item.categories, vec!["Oral History", "Audio"]);
    assert_eq!(item.linked_files, vec!["LCHP-F-0001", "LCHP-F-0002"]);
    assert_eq!(item.linked_subjects[0].name, "Urban Renewal");
    assert_eq!(
        names(&item.linked_entities),
        vec!["Lakeland Community Center", "Robert Brown", "Alice Greene"]
    );
    assert_eq!(names(&item.linked_entities_as_interviewees), vec!["Robert Brown"]);

    let legacy = &records.item_legacy_info[0];
    assert_eq!(legacy.linked_item, "LCHP-I-0001");
    assert_eq!(
        legacy.legacy_associated_filenames,
        vec!["img1.jpg", "scan2.pdf"]
    );
    let admin = &records.item_admin[0];
    assert_eq!(admin.lakeland_book_page, Some(12));
    assert!(admin.lakeland_book);
    assert!(!admin.remove);
}

#[test]
fn test_item_with_donor_and_interviewer_roles_lists_entity_in_both() {
    let dir = tempdir().unwrap();
    write_exports(dir.path(), &[]);
    let outcome = run(dir.path(), false);
    let item = &outcome.records.items[0];

    assert_eq!(names(&item.linked_entities_as_donors), vec!["Alice Greene"]);
    assert_eq!(names(&item.linked_entities_as_interviewers), vec!["Alice Greene"]);
    assert!(names(&item.linked_entities).contains(&"Alice Greene"));
}

#[test]
fn test_row_and_reference_problems_are_reported_not_fatal() {
    let dir = tempdir().unwrap();
    write_exports(dir.path(), &[]);
    let report = run(dir.path(), false).report;

    let items = report.table(SourceTable::Items).unwrap();
    assert!(items.status.is_completed());
    assert_eq!(items.input_rows, 2);
    assert_eq!(items.validated, 1);
    assert_eq!(items.record_errors.len(), 1);
    assert_eq!(items.record_errors[0].external_id, "recI2");
    assert!(items.record_errors[0].hint.starts_with("(Item)"));

    let relationships = report.table(SourceTable::Relationships).unwrap();
    assert_eq!(relationships.build_errors.len(), 1);
    assert_eq!(relationships.unresolved.len(), 1);
    assert_eq!(relationships.unresolved[0].target_id, "recE404");

    for table in &report.tables {
        assert_eq!(
            table.input_rows,
            table.validated + table.record_errors.len(),
            "{}",
            table.table
        );
    }
}

#[test]
fn test_outputs_written_per_destination_table() {
    let dir = tempdir().unwrap();
    write_exports(dir.path(), &[]);
    let outcome = run(dir.path(), false);
    let out = dir.path().join("out");
    write_outputs(&outcome, &out).unwrap();

    for table in DestinationTable::ALL {
        let text = std::fs::read_to_string(out.join(table.file_name())).unwrap();
        let rows: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(rows.as_array().unwrap().len(), outcome.records.len(table));
    }

    let items: Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("items.json")).unwrap()).unwrap();
    assert_eq!(items[0]["external_id"], "recI1");
    assert!(items[0]["provenance_fingerprint"]
        .as_str()
        .unwrap()
        .starts_with("provfnv1a64:"));

    let report: Value =
        serde_json::from_str(&std::fs::read_to_string(out.join(REPORT_FILE_NAME)).unwrap())
            .unwrap();
    assert_eq!(report["tables"].as_array().unwrap().len(), 6);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_rerun_produces_identical_records() {
    let dir = tempdir().unwrap();
    write_exports(dir.path(), &[]);
    let first = run(dir.path(), false);
    let second = run(dir.path(), false);
    let parallel = run(dir.path(), true);

    assert_eq!(first.records, second.records);
    assert_eq!(first.records, parallel.records);
    for table in DestinationTable::ALL {
        assert_eq!(
            first.records.table_json(table).unwrap(),
            second.records.table_json(table).unwrap()
        );
    }
}

// ============================================================================
// Schema drift
// ============================================================================

#[test]
fn test_schema_drift_fails_table_and_skips_dependents() {
    let dir = tempdir().unwrap();
    let mut drifted = files();
    drifted[2]["Scanner Operator"] = json!("jd");
    write_exports(dir.path(), &[("files.json", drifted)]);

    let outcome = run(dir.path(), false);
    let report = &outcome.report;
    assert!(report.has_failures());

    match &report.table(SourceTable::Files).unwrap().status {
        TableStatus::Failed { reason } => assert!(reason.contains("Scanner Operator")),
        other => panic!("files should fail, got {other:?}"),
    }
    assert_eq!(
        report.table(SourceTable::Items).unwrap().status,
        TableStatus::Skipped {
            blocked_by: vec![SourceTable::Files]
        }
    );
    for independent in [
        SourceTable::Entities,
        SourceTable::Subjects,
        SourceTable::Relationships,
        SourceTable::Accessions,
    ] {
        assert!(report.table(independent).unwrap().status.is_completed());
    }
    assert!(outcome.records.files.is_empty());
    assert!(outcome.records.items.is_empty());
    assert_eq!(outcome.records.donation_groupings.len(), 1);
}

#[test]
fn test_missing_export_is_an_empty_table() {
    let dir = tempdir().unwrap();
    write_exports(dir.path(), &[]);
    std::fs::remove_file(dir.path().join("subjects.json")).unwrap();

    let outcome = run(dir.path(), false);
    assert!(!outcome.report.has_failures());
    assert_eq!(outcome.report.table(SourceTable::Subjects).unwrap().input_rows, 0);

    let item = &outcome.records.items[0];
    assert!(item.linked_subjects.is_empty());
    let unresolved = &outcome.report.table(SourceTable::Items).unwrap().unresolved;
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].target_table, SourceTable::Subjects);
}
