//! Records in the v4 destination data model.
//!
//! Field names here are the serialized names handed to persistence; do not
//! rename them without a schema version bump.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::digest::provenance_fingerprint_v1;
use crate::source::SourceRecord;

/// Origin of a migrated record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    pub external_id: String,
    pub external_created_time: String,
    pub provenance_fingerprint: String,
}

impl Provenance {
    pub fn new(external_id: &str, external_created_time: &str) -> Self {
        Self {
            external_id: external_id.to_string(),
            external_created_time: external_created_time.to_string(),
            provenance_fingerprint: provenance_fingerprint_v1(external_id, external_created_time),
        }
    }

    pub fn of<R: SourceRecord>(record: &R) -> Self {
        Self::new(record.external_id(), record.external_created_time())
    }
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationGroupingRecord {
    pub idno: String,
    #[serde(flatten)]
    pub provenance: Provenance,
    pub donor_name: String,
    pub donation_date: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub description: String,
    pub title: String,
    pub legacy_idno: String,
    /// External ids of the grouping's files, as recorded on the accession.
    pub file_ids: Vec<String>,
    pub linked_donors: Vec<EntityRecord>,
    pub donation_consent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub idno: String,
    #[serde(flatten)]
    pub provenance: Provenance,
    pub donation_grouping_id: String,
    /// Not every file has been itemized, so this may be empty.
    pub item_id: String,
    pub file_format: String,
    pub locations: Vec<String>,
    pub legacy_idno: String,
    pub legacy_checksum: String,
    pub linked_entities_as_sources: Vec<EntityRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub idno: String,
    #[serde(flatten)]
    pub provenance: Provenance,
    pub name: String,
    pub entity_type: String,
    pub alt_name: String,
    pub date_of_birth: String,
    pub date_of_death: String,
    pub bio_hist: String,
    pub legacy_idno_lchp: String,
    pub create_landing_page: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub idno: String,
    #[serde(flatten)]
    pub provenance: Provenance,
    pub name: String,
    pub subject_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub idno: String,
    #[serde(flatten)]
    pub provenance: Provenance,
    pub title: String,
    pub description: String,
    pub creation_date: String,
    pub creation_year: Option<i32>,
    pub item_type: String,
    pub categories: Vec<String>,
    pub collection: String,
    pub linked_entities: Vec<EntityRecord>,
    pub linked_entities_as_donors: Vec<EntityRecord>,
    pub linked_entities_as_sources: Vec<EntityRecord>,
    pub linked_entities_as_interviewers: Vec<EntityRecord>,
    pub linked_entities_as_interviewees: Vec<EntityRecord>,
    pub linked_entities_as_creators: Vec<EntityRecord>,
    pub linked_subjects: Vec<SubjectRecord>,
    /// `idno`s of the item's files.
    pub linked_files: Vec<String>,
    pub interview_summary_attachment: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemLegacyInfoRecord {
    pub idno: String,
    #[serde(flatten)]
    pub provenance: Provenance,
    pub linked_item: String,
    pub legacy_idno_umd: String,
    pub legacy_idno_lchp: String,
    pub legacy_associated_filenames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAdminRecord {
    pub idno: String,
    #[serde(flatten)]
    pub provenance: Provenance,
    pub linked_item: String,
    pub lakeland_book: bool,
    pub lakeland_book_chapter: String,
    pub lakeland_book_page: Option<u32>,
    pub lakeland_video: bool,
    pub remove: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub idno: String,
    #[serde(flatten)]
    pub provenance: Provenance,
    pub name: String,
    /// `idno`s of the entities at this location.
    pub linked_entities: Vec<String>,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonAdminRecord {
    pub idno: String,
    #[serde(flatten)]
    pub provenance: Provenance,
    pub name: String,
    pub linked_entities: Vec<String>,
    pub lchp_team_member: bool,
    pub title: String,
    pub affiliation: String,
    pub email_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRelationshipRecord {
    pub idno: String,
    #[serde(flatten)]
    pub provenance: Provenance,
    pub name: String,
    pub subject_entity: String,
    pub object_entity: String,
    pub relationship_predicate: String,
    pub relationship_start_date: String,
    pub relationship_end_date: String,
}

// ============================================================================
// Tables
// ============================================================================

/// Destination entity types, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationTable {
    DonationGroupings,
    Files,
    Items,
    ItemLegacyInfo,
    ItemAdmin,
    Subjects,
    Entities,
    Locations,
    PersonAdmin,
    EntityRelationships,
}

impl DestinationTable {
    pub const ALL: [DestinationTable; 10] = [
        DestinationTable::DonationGroupings,
        DestinationTable::Files,
        DestinationTable::Items,
        DestinationTable::ItemLegacyInfo,
        DestinationTable::ItemAdmin,
        DestinationTable::Subjects,
        DestinationTable::Entities,
        DestinationTable::Locations,
        DestinationTable::PersonAdmin,
        DestinationTable::EntityRelationships,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DestinationTable::DonationGroupings => "donation_groupings",
            DestinationTable::Files => "files",
            DestinationTable::Items => "items",
            DestinationTable::ItemLegacyInfo => "item_legacy_info",
            DestinationTable::ItemAdmin => "item_admin",
            DestinationTable::Subjects => "subjects",
            DestinationTable::Entities => "entities",
            DestinationTable::Locations => "locations",
            DestinationTable::PersonAdmin => "person_admin",
            DestinationTable::EntityRelationships => "entity_relationships",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.name())
    }
}

/// Any destination record, tagged with its table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum DestinationRecord {
    DonationGrouping(DonationGroupingRecord),
    File(FileRecord),
    Item(ItemRecord),
    ItemLegacyInfo(ItemLegacyInfoRecord),
    ItemAdmin(ItemAdminRecord),
    Subject(SubjectRecord),
    Entity(EntityRecord),
    Location(LocationRecord),
    PersonAdmin(PersonAdminRecord),
    EntityRelationship(EntityRelationshipRecord),
}

impl DestinationRecord {
    pub fn table(&self) -> DestinationTable {
        match self {
            DestinationRecord::DonationGrouping(_) => DestinationTable::DonationGroupings,
            DestinationRecord::File(_) => DestinationTable::Files,
            DestinationRecord::Item(_) => DestinationTable::Items,
            DestinationRecord::ItemLegacyInfo(_) => DestinationTable::ItemLegacyInfo,
            DestinationRecord::ItemAdmin(_) => DestinationTable::ItemAdmin,
            DestinationRecord::Subject(_) => DestinationTable::Subjects,
            DestinationRecord::Entity(_) => DestinationTable::Entities,
            DestinationRecord::Location(_) => DestinationTable::Locations,
            DestinationRecord::PersonAdmin(_) => DestinationTable::PersonAdmin,
            DestinationRecord::EntityRelationship(_) => DestinationTable::EntityRelationships,
        }
    }

    pub fn idno(&self) -> &str {
        &self.provenance_and_idno().1
    }

    pub fn provenance(&self) -> &Provenance {
        self.provenance_and_idno().0
    }

    fn provenance_and_idno(&self) -> (&Provenance, &String) {
        match self {
            DestinationRecord::DonationGrouping(r) => (&r.provenance, &r.idno),
            DestinationRecord::File(r) => (&r.provenance, &r.idno),
            DestinationRecord::Item(r) => (&r.provenance, &r.idno),
            DestinationRecord::ItemLegacyInfo(r) => (&r.provenance, &r.idno),
            DestinationRecord::ItemAdmin(r) => (&r.provenance, &r.idno),
            DestinationRecord::Subject(r) => (&r.provenance, &r.idno),
            DestinationRecord::Entity(r) => (&r.provenance, &r.idno),
            DestinationRecord::Location(r) => (&r.provenance, &r.idno),
            DestinationRecord::PersonAdmin(r) => (&r.provenance, &r.idno),
            DestinationRecord::EntityRelationship(r) => (&r.provenance, &r.idno),
        }
    }
}

/// Ordered destination collections, one per target entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DestinationRecords {
    pub donation_groupings: Vec<DonationGroupingRecord>,
    pub files: Vec<FileRecord>,
    pub items: Vec<ItemRecord>,
    pub item_legacy_info: Vec<ItemLegacyInfoRecord>,
    pub item_admin: Vec<ItemAdminRecord>,
    pub subjects: Vec<SubjectRecord>,
    pub entities: Vec<EntityRecord>,
    pub locations: Vec<LocationRecord>,
    pub person_admin: Vec<PersonAdminRecord>,
    pub entity_relationships: Vec<EntityRelationshipRecord>,
}

impl DestinationRecords {
    pub fn push(&mut self, record: DestinationRecord) {
        match record {
            DestinationRecord::DonationGrouping(r) => self.donation_groupings.push(r),
            DestinationRecord::File(r) => self.files.push(r),
            DestinationRecord::Item(r) => self.items.push(r),
            DestinationRecord::ItemLegacyInfo(r) => self.item_legacy_info.push(r),
            DestinationRecord::ItemAdmin(r) => self.item_admin.push(r),
            DestinationRecord::Subject(r) => self.subjects.push(r),
            DestinationRecord::Entity(r) => self.entities.push(r),
            DestinationRecord::Location(r) => self.locations.push(r),
            DestinationRecord::PersonAdmin(r) => self.person_admin.push(r),
            DestinationRecord::EntityRelationship(r) => self.entity_relationships.push(r),
        }
    }

    pub fn len(&self, table: DestinationTable) -> usize {
        match table {
            DestinationTable::DonationGroupings => self.donation_groupings.len(),
            DestinationTable::Files => self.files.len(),
            DestinationTable::Items => self.items.len(),
            DestinationTable::ItemLegacyInfo => self.item_legacy_info.len(),
            DestinationTable::ItemAdmin => self.item_admin.len(),
            DestinationTable::Subjects => self.subjects.len(),
            DestinationTable::Entities => self.entities.len(),
            DestinationTable::Locations => self.locations.len(),
            DestinationTable::PersonAdmin => self.person_admin.len(),
            DestinationTable::EntityRelationships => self.entity_relationships.len(),
        }
    }

    /// Serialize one collection as a JSON array (the persistence hook).
    pub fn table_json(&self, table: DestinationTable) -> serde_json::Result<Value> {
        match table {
            DestinationTable::DonationGroupings => serde_json::to_value(&self.donation_groupings),
            DestinationTable::Files => serde_json::to_value(&self.files),
            DestinationTable::Items => serde_json::to_value(&self.items),
            DestinationTable::ItemLegacyInfo => serde_json::to_value(&self.item_legacy_info),
            DestinationTable::ItemAdmin => serde_json::to_value(&self.item_admin),
            DestinationTable::Subjects => serde_json::to_value(&self.subjects),
            DestinationTable::Entities => serde_json::to_value(&self.entities),
            DestinationTable::Locations => serde_json::to_value(&self.locations),
            DestinationTable::PersonAdmin => serde_json::to_value(&self.person_admin),
            DestinationTable::EntityRelationships => {
                serde_json::to_value(&self.entity_relationships)
            }
        }
    }
}

impl Extend<DestinationRecord> for DestinationRecords {
    fn extend<I: IntoIterator<Item = DestinationRecord>>(&mut self, iter: I) {
        for record in iter {
            self.push(record);
        }
    }
}
