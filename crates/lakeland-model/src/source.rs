//! Source records: one immutable type per exported Airtable table.
//!
//! Records are deserialized from rows whose keys have already been renamed to
//! canonical field names and whose cells have been normalized (see
//! [`crate::value::FieldValue`]). Unknown canonical names are rejected so a
//! mapping that targets a field the record does not have fails loudly.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::value::{string_or_number, FieldValue, OneOrMany};

// ============================================================================
// Table registry
// ============================================================================

/// The closed set of exported tables a run understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    Accessions,
    Files,
    Items,
    Entities,
    Subjects,
    Relationships,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected input table `{0}`; are you running against the correct source data?")]
pub struct UnknownTableError(pub String);

impl SourceTable {
    pub const ALL: [SourceTable; 6] = [
        SourceTable::Accessions,
        SourceTable::Files,
        SourceTable::Items,
        SourceTable::Entities,
        SourceTable::Subjects,
        SourceTable::Relationships,
    ];

    /// Lowercase name, also the stem of the table's export file.
    pub fn name(self) -> &'static str {
        match self {
            SourceTable::Accessions => "accessions",
            SourceTable::Files => "files",
            SourceTable::Items => "items",
            SourceTable::Entities => "entities",
            SourceTable::Subjects => "subjects",
            SourceTable::Relationships => "relationships",
        }
    }

    /// Label used in error hints.
    pub fn entity_hint(self) -> &'static str {
        match self {
            SourceTable::Accessions => "Donor",
            SourceTable::Files => "File",
            SourceTable::Items => "Item",
            SourceTable::Entities => "Entity",
            SourceTable::Subjects => "Subject",
            SourceTable::Relationships => "Relationship",
        }
    }

    /// Resolve a table from a name or file name, case-insensitively.
    ///
    /// `"Accessions.json"`, `" items "` and `"DonationGroupings"` are all accepted.
    pub fn from_name(name: &str) -> Result<Self, UnknownTableError> {
        let lowered = name.trim().to_ascii_lowercase();
        let stem = lowered.strip_suffix(".json").unwrap_or(&lowered).trim();
        match stem {
            "accessions" | "donationgroupings" | "donation_groupings" => Ok(SourceTable::Accessions),
            "files" => Ok(SourceTable::Files),
            "items" => Ok(SourceTable::Items),
            "entities" => Ok(SourceTable::Entities),
            "subjects" => Ok(SourceTable::Subjects),
            "relationships" => Ok(SourceTable::Relationships),
            _ => Err(UnknownTableError(name.to_string())),
        }
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceTable {
    type Err = UnknownTableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceTable::from_name(s)
    }
}

// ============================================================================
// Record capability
// ============================================================================

/// Behaviour shared by every source record type.
pub trait SourceRecord: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
    const TABLE: SourceTable;

    /// Canonical fields that identify a row to a human, in display order.
    const HINT_FIELDS: &'static [&'static str];

    fn external_id(&self) -> &str;

    fn external_created_time(&self) -> &str;

    /// Short label naming this record and its distinguishing field.
    fn describe_for_error(&self) -> String;

    /// The same label computed from a renamed row that failed construction.
    fn describe_row(row: &Map<String, Value>) -> String {
        let parts: Vec<String> = Self::HINT_FIELDS
            .iter()
            .map(|field| {
                row.get(*field)
                    .cloned()
                    .map(FieldValue::normalize)
                    .map(|v| v.display())
                    .unwrap_or_else(|| "<missing>".to_string())
            })
            .collect();
        hint(Self::TABLE, &parts.join(" "))
    }
}

fn hint(table: SourceTable, label: &str) -> String {
    format!("({}) {}", table.entity_hint(), label)
}

macro_rules! provenance_accessors {
    () => {
        fn external_id(&self) -> &str {
            &self.external_id
        }

        fn external_created_time(&self) -> &str {
            &self.external_created_time
        }
    };
}

// ============================================================================
// Records
// ============================================================================

/// A row from the Accessions (DonationGroupings) table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessionSourceRecord {
    pub external_created_time: String,
    pub external_id: String,
    pub file_count: u32,
    pub donation_date: String,
    pub donor_name: String,
    pub file_array: OneOrMany<String>,
    pub idno: String,
    #[serde(default)]
    pub linked_entity_array: OneOrMany<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub legacy_idno_umd: String,
}

impl SourceRecord for AccessionSourceRecord {
    const TABLE: SourceTable = SourceTable::Accessions;
    const HINT_FIELDS: &'static [&'static str] = &["donor_name"];
    provenance_accessors!();

    fn describe_for_error(&self) -> String {
        hint(Self::TABLE, &self.donor_name)
    }
}

/// A row from the Files table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSourceRecord {
    pub external_created_time: String,
    pub external_id: String,
    pub idno: String,
    pub linked_accession: String,
    #[serde(default)]
    pub virtual_location: String,
    /// Raw path entry; may hold several quoted paths joined by `","`.
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub legacy_idno_lchp: String,
    #[serde(default)]
    pub legacy_checksum: String,
    #[serde(default)]
    pub file_format: OneOrMany<String>,
    #[serde(default)]
    pub part_of_item: String,
    #[serde(default)]
    pub linked_entity_as_source: OneOrMany<String>,
}

impl SourceRecord for FileSourceRecord {
    const TABLE: SourceTable = SourceTable::Files;
    const HINT_FIELDS: &'static [&'static str] = &["idno"];
    provenance_accessors!();

    fn describe_for_error(&self) -> String {
        hint(Self::TABLE, &self.idno)
    }
}

/// A row from the Items table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemSourceRecord {
    pub external_created_time: String,
    pub external_id: String,
    pub idno: String,
    pub legacy_idno_umd: String,
    pub linked_files_array: OneOrMany<String>,
    #[serde(default)]
    pub linked_accessions_array: OneOrMany<String>,
    #[serde(default)]
    pub file_count: Option<u32>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_date: String,
    #[serde(default)]
    pub obj_type: String,
    #[serde(default)]
    pub category: OneOrMany<String>,
    #[serde(default)]
    pub collection: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub lakeland_book_chapter: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub lakeland_book_page: String,
    #[serde(default)]
    pub legacy_idno_lchp: String,
    #[serde(default)]
    pub linked_entity_as_creator: OneOrMany<String>,
    #[serde(default)]
    pub linked_entity_source: OneOrMany<String>,
    #[serde(default)]
    pub linked_people: OneOrMany<String>,
    #[serde(default)]
    pub linked_places_orgs: OneOrMany<String>,
    #[serde(default)]
    pub linked_subjects: OneOrMany<String>,
    #[serde(default)]
    pub linked_entity_interviewers: OneOrMany<String>,
    #[serde(default)]
    pub linked_entity_interviewees: OneOrMany<String>,
    #[serde(default)]
    pub interview_summary_attachment: OneOrMany<Value>,
    #[serde(default)]
    pub lakeland_book: bool,
    #[serde(default)]
    pub lakeland_video: bool,
    #[serde(default)]
    pub remove: String,
}

impl SourceRecord for ItemSourceRecord {
    const TABLE: SourceTable = SourceTable::Items;
    const HINT_FIELDS: &'static [&'static str] = &["idno"];
    provenance_accessors!();

    fn describe_for_error(&self) -> String {
        hint(Self::TABLE, &self.idno)
    }
}

/// A row from the Entities table (people, places, organizations).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitySourceRecord {
    pub external_created_time: String,
    pub external_id: String,
    pub name: String,
    #[serde(default)]
    pub linked_items_array: OneOrMany<String>,
    #[serde(default)]
    pub linked_items_generic: OneOrMany<String>,
    #[serde(default)]
    pub linked_as_source: OneOrMany<String>,
    #[serde(default)]
    pub linked_as_interviewer: OneOrMany<String>,
    #[serde(default)]
    pub linked_as_interviewee: OneOrMany<String>,
    #[serde(default)]
    pub linked_as_recipient: OneOrMany<String>,
    #[serde(default)]
    pub linked_as_signatory: OneOrMany<String>,
    #[serde(default)]
    pub linked_place_as_subject: OneOrMany<String>,
    #[serde(default)]
    pub linked_to_place: OneOrMany<String>,
    #[serde(default)]
    pub linked_to_dobj_as_creator: OneOrMany<String>,
    #[serde(default)]
    pub linked_to_item_as_creator: OneOrMany<String>,
    #[serde(default)]
    pub linked_to_files_as_source: OneOrMany<String>,
    #[serde(default)]
    pub linked_to_acc_as_donor: OneOrMany<String>,
    #[serde(default)]
    pub auth_relations: OneOrMany<String>,
    #[serde(default)]
    pub auth_relations_2: OneOrMany<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub latitude: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub longitude: String,
    #[serde(default)]
    pub alt_name: String,
    #[serde(default)]
    pub bio_hist: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub lchp_source_code: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub date_of_death: String,
}

impl SourceRecord for EntitySourceRecord {
    const TABLE: SourceTable = SourceTable::Entities;
    const HINT_FIELDS: &'static [&'static str] = &["name"];
    provenance_accessors!();

    fn describe_for_error(&self) -> String {
        hint(Self::TABLE, &self.name)
    }
}

/// A row from the Subjects table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectSourceRecord {
    pub external_created_time: String,
    pub external_id: String,
    pub name: String,
    pub linked_items_array: OneOrMany<String>,
    #[serde(default)]
    pub category: String,
}

impl SourceRecord for SubjectSourceRecord {
    const TABLE: SourceTable = SourceTable::Subjects;
    const HINT_FIELDS: &'static [&'static str] = &["name"];
    provenance_accessors!();

    fn describe_for_error(&self) -> String {
        hint(Self::TABLE, &self.name)
    }
}

/// A row from the Relationships table: a pairwise link between Entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityRelationshipSourceRecord {
    pub external_created_time: String,
    pub external_id: String,
    pub name: String,
    pub entity_1: String,
    pub entity_2: String,
    pub relation_type: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub notes: String,
}

impl SourceRecord for EntityRelationshipSourceRecord {
    const TABLE: SourceTable = SourceTable::Relationships;
    const HINT_FIELDS: &'static [&'static str] = &["entity_1", "name"];
    provenance_accessors!();

    fn describe_for_error(&self) -> String {
        hint(Self::TABLE, &format!("{} {}", self.entity_1, self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_names_match_case_insensitively() {
        assert_eq!(SourceTable::from_name("Accessions.json"), Ok(SourceTable::Accessions));
        assert_eq!(SourceTable::from_name(" ITEMS "), Ok(SourceTable::Items));
        assert_eq!(
            SourceTable::from_name("DonationGroupings"),
            Ok(SourceTable::Accessions)
        );
        assert!(SourceTable::from_name("people").is_err());
    }

    #[test]
    fn row_hint_matches_record_hint() {
        let row = json!({
            "external_created_time": "2021-01-01T00:00:00.000Z",
            "external_id": "recR1",
            "name": "married to",
            "entity_1": "recE1",
            "entity_2": "recE2",
            "relation_type": "spouse",
        });
        let Value::Object(map) = row.clone() else { unreachable!() };
        let rec: EntityRelationshipSourceRecord = serde_json::from_value(row).unwrap();
        assert_eq!(
            EntityRelationshipSourceRecord::describe_row(&map),
            rec.describe_for_error()
        );
        assert_eq!(rec.describe_for_error(), "(Relationship) recE1 married to");
    }

    #[test]
    fn row_hint_marks_missing_fields() {
        let map = Map::new();
        assert_eq!(AccessionSourceRecord::describe_row(&map), "(Donor) <missing>");
    }

    #[test]
    fn unknown_canonical_field_is_rejected() {
        let row = json!({
            "external_created_time": "t",
            "external_id": "recS1",
            "name": "Churches",
            "linked_items_array": ["recI1"],
            "colour": "red",
        });
        let err = serde_json::from_value::<SubjectSourceRecord>(row).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn entity_coordinates_accept_numbers() {
        let row = json!({
            "external_created_time": "t",
            "external_id": "recE1",
            "name": "Lakeland Community Center",
            "latitude": 38.9901,
            "longitude": "-76.9285",
        });
        let rec: EntitySourceRecord = serde_json::from_value(row).unwrap();
        assert_eq!(rec.latitude, "38.9901");
        assert_eq!(rec.longitude, "-76.9285");
        assert!(rec.linked_as_interviewer.is_empty());
    }
}
