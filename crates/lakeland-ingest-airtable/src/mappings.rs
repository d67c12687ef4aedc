//! Field mapping tables: Airtable column label → canonical field name.
//!
//! Tables are append-only. When a column is renamed in the base, add the new
//! label and keep the old one pointing at the same canonical name so older
//! exports still replay. A canonical name starting with `_` marks a retired
//! column: it is known (no drift) but its value is discarded.

use lakeland_model::SourceTable;

/// Prefix marking a retired canonical field.
pub const RETIRED_FIELD_PREFIX: char = '_';

/// Static mapping for one source table.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub table: SourceTable,
    columns: &'static [(&'static str, &'static str)],
}

impl FieldMapping {
    /// Canonical name for a column label, if mapped.
    pub fn get(&self, column: &str) -> Option<&'static str> {
        self.columns
            .iter()
            .find(|(label, _)| *label == column)
            .map(|(_, canonical)| *canonical)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.columns.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

pub fn is_retired(canonical: &str) -> bool {
    canonical.starts_with(RETIRED_FIELD_PREFIX)
}

/// The mapping table for a source table.
pub fn mapping_for(table: SourceTable) -> FieldMapping {
    let columns = match table {
        SourceTable::Accessions => ACCESSIONS,
        SourceTable::Files => FILES,
        SourceTable::Items => ITEMS,
        SourceTable::Entities => ENTITIES,
        SourceTable::Subjects => SUBJECTS,
        SourceTable::Relationships => RELATIONSHIPS,
    };
    FieldMapping { table, columns }
}

const ACCESSIONS: &[(&str, &str)] = &[
    ("ID", "idno"),
    ("Description", "description"),
    ("Date of Donation", "donation_date"),
    ("Legacy ID-UMD", "legacy_idno_umd"),
    ("Donor Name (Form Entry)", "donor_name"),
    ("Donor Name (Linked)", "linked_entity_array"),
    ("Files", "file_array"),
    ("Donation Grouping Title", "title"),
    ("# Files", "file_count"),
    ("LDT Check (Temp)", "_ldt_check"),
    ("airtable_createdTime", "external_created_time"),
    ("airtable_id", "external_id"),
];

const FILES: &[(&str, &str)] = &[
    ("ID", "idno"),
    ("Accession", "linked_accession"),
    ("Donation Grouping", "linked_accession"),
    ("Virtual Location", "virtual_location"),
    ("File Path", "file_path"),
    ("Legacy ID-LCHP", "legacy_idno_lchp"),
    ("Legacy Checksum", "legacy_checksum"),
    ("File Format", "file_format"),
    ("Part of Item", "part_of_item"),
    ("Source (Linked)", "linked_entity_as_source"),
    ("airtable_createdTime", "external_created_time"),
    ("airtable_id", "external_id"),
];

const ITEMS: &[(&str, &str)] = &[
    ("ID", "idno"),
    ("Accession", "linked_accessions_array"),
    ("Donation Grouping", "linked_accessions_array"),
    ("File Count", "file_count"),
    ("Files", "linked_files_array"),
    ("Legacy ID-UMD", "legacy_idno_umd"),
    ("Legacy ID-LCHP", "legacy_idno_lchp"),
    ("Title", "title"),
    ("Description", "description"),
    ("Date Created", "created_date"),
    ("Object Type", "obj_type"),
    ("Category", "category"),
    ("Collection", "collection"),
    ("Lakeland Book Chapter", "lakeland_book_chapter"),
    ("Lakeland Book Page", "lakeland_book_page"),
    ("Creator (Linked)", "linked_entity_as_creator"),
    ("Source (Linked)", "linked_entity_source"),
    ("Linked People", "linked_people"),
    ("Linked Places/Orgs", "linked_places_orgs"),
    ("Subjects", "linked_subjects"),
    ("Interviewer(s)", "linked_entity_interviewers"),
    ("Interviewee(s)", "linked_entity_interviewees"),
    ("Interview Summary", "interview_summary_attachment"),
    ("Lakeland Book", "lakeland_book"),
    ("Lakeland Video", "lakeland_video"),
    ("Remove?", "remove"),
    ("airtable_createdTime", "external_created_time"),
    ("airtable_id", "external_id"),
];

const ENTITIES: &[(&str, &str)] = &[
    ("Name", "name"),
    ("Biography/History", "bio_hist"),
    ("Notes", "notes"),
    ("Entity Category", "category"),
    ("Alternate Name", "alt_name"),
    ("Address", "address"),
    ("Date of Birth", "date_of_birth"),
    ("Date of Death", "date_of_death"),
    ("Latitude", "latitude"),
    ("Authority Relationships", "auth_relations"),
    ("Authority Relationships 2", "auth_relations_2"),
    ("Linked Oral Histories (Interviewees)", "linked_as_interviewee"),
    ("Linked Oral Histories (as Interviewer)", "linked_as_interviewer"),
    ("Linked Digital Objects (to Place)", "linked_to_place"),
    ("Longitude", "longitude"),
    ("Linked Digital Objects (Creators)", "linked_to_dobj_as_creator"),
    ("Linked Digital Objects (as Recipients)", "linked_as_recipient"),
    ("Linked Digital Objects (to Signatories)", "linked_as_signatory"),
    ("Accessions (as Donor)", "linked_to_acc_as_donor"),
    ("Source Code", "lchp_source_code"),
    ("Linked Digital Objects (Source)", "linked_as_source"),
    ("Linked Files (as Source)", "linked_to_files_as_source"),
    ("Items", "linked_items_generic"),
    ("Linked Items (EntityAsSubject)", "linked_items_array"),
    ("Linked Items (Place as Subject)", "linked_place_as_subject"),
    ("Linked Items (as Creator)", "linked_to_item_as_creator"),
    ("airtable_createdTime", "external_created_time"),
    ("airtable_id", "external_id"),
];

const SUBJECTS: &[(&str, &str)] = &[
    ("Name", "name"),
    ("Subject Category", "category"),
    ("Items", "linked_items_array"),
    ("airtable_createdTime", "external_created_time"),
    ("airtable_id", "external_id"),
];

const RELATIONSHIPS: &[(&str, &str)] = &[
    ("Name", "name"),
    ("Entity 1", "entity_1"),
    ("Entity 2", "entity_2"),
    ("Relationship Type", "relation_type"),
    ("Start Date", "start_date"),
    ("End Date", "end_date"),
    ("Notes", "notes"),
    ("airtable_createdTime", "external_created_time"),
    ("airtable_id", "external_id"),
];
