//! Destination record building.
//!
//! The [`Builder`] turns validated source batches into v4 records, one table
//! at a time, and remembers what it has built so later tables can resolve
//! their cross-table references. Tables must therefore be fed in dependency
//! order (see [`crate::pipeline::RUN_ORDER`]); a reference to a row that was
//! not built is reported as an [`UnresolvedReference`] and dropped.

use std::collections::{HashMap, HashSet};
use std::fmt;

use lakeland_ingest_airtable::SourceBatch;
use lakeland_model::digest::derived_idno_v1;
use lakeland_model::{
    AccessionSourceRecord, DestinationRecord, DestinationTable, DonationGroupingRecord,
    EntityRecord, EntityRelationshipRecord, EntityRelationshipSourceRecord, EntitySourceRecord,
    FileRecord, FileSourceRecord, ItemAdminRecord, ItemLegacyInfoRecord, ItemRecord,
    ItemSourceRecord, LocationRecord, PersonAdminRecord, Provenance, SourceRecord, SourceTable,
    SubjectRecord, SubjectSourceRecord,
};
use serde::Serialize;

use crate::paths::PathNormalizer;

/// A cross-table id that did not resolve to a built record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    pub from_table: SourceTable,
    pub from_id: String,
    /// Field or role list the reference was dropped from.
    pub role: &'static str,
    pub target_table: SourceTable,
    pub target_id: String,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} references unknown {} {} ({})",
            self.from_table, self.from_id, self.target_table, self.target_id, self.role
        )
    }
}

/// A source record that could not become a destination record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("error building {} record {external_id} {hint}: {cause}", .table.name())]
pub struct BuildError {
    pub table: DestinationTable,
    pub external_id: String,
    pub hint: String,
    pub cause: String,
}

/// Records built from one source batch, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOutput {
    pub records: Vec<DestinationRecord>,
    pub errors: Vec<BuildError>,
    pub unresolved: Vec<UnresolvedReference>,
}

impl BuildOutput {
    fn push(&mut self, record: DestinationRecord) {
        self.records.push(record);
    }

    fn fail<R: SourceRecord>(&mut self, table: DestinationTable, record: &R, cause: String) {
        let err = BuildError {
            table,
            external_id: record.external_id().to_string(),
            hint: record.describe_for_error(),
            cause,
        };
        tracing::warn!(
            table = table.name(),
            external_id = %err.external_id,
            hint = %err.hint,
            cause = %err.cause,
            "record could not be built"
        );
        self.errors.push(err);
    }

    fn unresolved<R: SourceRecord>(
        &mut self,
        record: &R,
        role: &'static str,
        target_table: SourceTable,
        target_id: &str,
    ) {
        let warning = UnresolvedReference {
            from_table: R::TABLE,
            from_id: record.external_id().to_string(),
            role,
            target_table,
            target_id: target_id.to_string(),
        };
        tracing::warn!(
            from_table = %warning.from_table,
            from_id = %warning.from_id,
            role,
            target_table = %target_table,
            target_id,
            "dropping unresolved reference"
        );
        self.unresolved.push(warning);
    }
}

/// Entity-side role markers: the external ids of the rows an entity is linked
/// to in each role.
#[derive(Debug, Clone, Default)]
struct EntityRoles {
    as_source: HashSet<String>,
    as_interviewer: HashSet<String>,
    as_interviewee: HashSet<String>,
    as_item_creator: HashSet<String>,
    as_file_source: HashSet<String>,
    as_donor: HashSet<String>,
}

impl EntityRoles {
    fn from_source(e: &EntitySourceRecord) -> Self {
        let set = |ids: &lakeland_model::OneOrMany<String>| ids.iter().cloned().collect();
        Self {
            as_source: set(&e.linked_as_source),
            as_interviewer: set(&e.linked_as_interviewer),
            as_interviewee: set(&e.linked_as_interviewee),
            as_item_creator: set(&e.linked_to_item_as_creator),
            as_file_source: set(&e.linked_to_files_as_source),
            as_donor: set(&e.linked_to_acc_as_donor),
        }
    }

    fn linked_to_item(&self, item_id: &str) -> bool {
        self.as_source.contains(item_id)
            || self.as_interviewer.contains(item_id)
            || self.as_interviewee.contains(item_id)
            || self.as_item_creator.contains(item_id)
    }
}

#[derive(Debug, Clone)]
struct BuiltGrouping {
    idno: String,
    /// Donor entity external ids, in order.
    donors: Vec<String>,
}

#[derive(Debug, Clone)]
struct BuiltFile {
    idno: String,
    locations: Vec<String>,
}

/// Destination records built so far, keyed by source external id.
#[derive(Debug, Default)]
struct BuiltIndex {
    entity_order: Vec<String>,
    entities: HashMap<String, EntityRecord>,
    entity_roles: HashMap<String, EntityRoles>,
    subjects: HashMap<String, SubjectRecord>,
    groupings: HashMap<String, BuiltGrouping>,
    files: HashMap<String, BuiltFile>,
    /// Item external id → item idno.
    items: HashMap<String, String>,
    /// File external id → idno of the first Item that lists it.
    file_items: HashMap<String, String>,
    relationships: HashSet<String>,
}

impl BuiltIndex {
    /// Entities linked to `target` through the given role marker, in entity table order.
    fn entities_marked(
        &self,
        target: &str,
        marker: impl Fn(&EntityRoles) -> &HashSet<String>,
    ) -> Vec<String> {
        self.entity_order
            .iter()
            .filter(|id| {
                self.entity_roles
                    .get(*id)
                    .map_or(false, |roles| marker(roles).contains(target))
            })
            .cloned()
            .collect()
    }
}

/// Builds destination records table by table.
#[derive(Debug)]
pub struct Builder {
    normalizer: PathNormalizer,
    built: BuiltIndex,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new(PathNormalizer::default())
    }
}

fn push_unique(list: &mut Vec<String>, seen: &mut HashSet<String>, id: &str) {
    if seen.insert(id.to_string()) {
        list.push(id.to_string());
    }
}

fn ordered_union<'a>(lists: impl IntoIterator<Item = &'a lakeland_model::OneOrMany<String>>) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for list in lists {
        for id in list.iter() {
            push_unique(&mut out, &mut seen, id);
        }
    }
    out
}

fn parse_coordinate(raw: &str) -> Result<Option<f64>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = trimmed
        .parse::<f64>()
        .map_err(|e| format!("invalid coordinate `{trimmed}`: {e}"))?;
    if !value.is_finite() {
        return Err(format!("coordinate `{trimmed}` is not a finite number"));
    }
    Ok(Some(value))
}

/// Leading four-digit year of a free-text date, e.g. `1965` from `1965-04-01`.
fn creation_year(date: &str) -> Option<i32> {
    let head = date.trim().get(..4)?;
    if head.chars().all(|c| c.is_ascii_digit()) {
        head.parse().ok()
    } else {
        None
    }
}

fn file_name(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

impl Builder {
    pub fn new(normalizer: PathNormalizer) -> Self {
        Self {
            normalizer,
            built: BuiltIndex::default(),
        }
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    /// Build destination records for one validated table.
    pub fn build(&mut self, batch: &SourceBatch) -> BuildOutput {
        let mut out = BuildOutput::default();
        match batch {
            SourceBatch::Entities(v) => v.records.iter().for_each(|r| self.build_entity(r, &mut out)),
            SourceBatch::Subjects(v) => v.records.iter().for_each(|r| self.build_subject(r, &mut out)),
            SourceBatch::Relationships(v) => v
                .records
                .iter()
                .for_each(|r| self.build_relationship(r, &mut out)),
            SourceBatch::Accessions(v) => v
                .records
                .iter()
                .for_each(|r| self.build_donation_grouping(r, &mut out)),
            SourceBatch::Files(v) => v.records.iter().for_each(|r| self.build_file(r, &mut out)),
            SourceBatch::Items(v) => v.records.iter().for_each(|r| self.build_item(r, &mut out)),
        }

        tracing::info!(
            table = %batch.table(),
            built = out.records.len(),
            failed = out.errors.len(),
            unresolved = out.unresolved.len(),
            "built destination records"
        );
        out
    }

    /// Point each File at the idno of its Item once Items are built.
    ///
    /// An Item's `linked_files` takes precedence; otherwise a "Part of Item"
    /// link naming a built Item is translated to its idno. Files no built
    /// Item claims keep the raw link.
    pub fn link_files_to_items(&self, files: &mut [FileRecord]) -> usize {
        let mut linked = 0;
        for file in files.iter_mut() {
            let idno = self
                .built
                .file_items
                .get(&file.provenance.external_id)
                .or_else(|| self.built.items.get(file.item_id.trim()));
            if let Some(idno) = idno {
                file.item_id = idno.clone();
                linked += 1;
            } else if !file.item_id.is_empty() {
                tracing::debug!(
                    file = %file.idno,
                    item = %file.item_id,
                    "file not claimed by any built item"
                );
            }
        }
        linked
    }

    fn resolve_entities<R: SourceRecord>(
        &self,
        record: &R,
        role: &'static str,
        ids: &[String],
        out: &mut BuildOutput,
    ) -> Vec<EntityRecord> {
        ids.iter()
            .filter_map(|id| match self.built.entities.get(id) {
                Some(entity) => Some(entity.clone()),
                None => {
                    out.unresolved(record, role, SourceTable::Entities, id);
                    None
                }
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Entities (+ Location, PersonAdmin)
    // ------------------------------------------------------------------------

    fn build_entity(&mut self, e: &EntitySourceRecord, out: &mut BuildOutput) {
        if self.built.entities.contains_key(&e.external_id) {
            out.fail(DestinationTable::Entities, e, "duplicate external id".to_string());
            return;
        }

        let provenance = Provenance::of(e);
        let idno = derived_idno_v1("ent", &e.external_id, &e.external_created_time);
        let category = e.category.trim();
        let entity = EntityRecord {
            idno: idno.clone(),
            provenance: provenance.clone(),
            name: e.name.clone(),
            entity_type: if category.is_empty() {
                "unknown".to_string()
            } else {
                category.to_string()
            },
            alt_name: e.alt_name.clone(),
            date_of_birth: e.date_of_birth.clone(),
            date_of_death: e.date_of_death.clone(),
            bio_hist: e.bio_hist.clone(),
            legacy_idno_lchp: e.lchp_source_code.clone(),
            create_landing_page: false,
        };

        self.built.entity_order.push(e.external_id.clone());
        self.built
            .entities
            .insert(e.external_id.clone(), entity.clone());
        self.built
            .entity_roles
            .insert(e.external_id.clone(), EntityRoles::from_source(e));
        out.push(DestinationRecord::Entity(entity));

        let has_place = !e.address.trim().is_empty()
            || !e.latitude.trim().is_empty()
            || !e.longitude.trim().is_empty();
        if has_place {
            match (parse_coordinate(&e.latitude), parse_coordinate(&e.longitude)) {
                (Ok(latitude), Ok(longitude)) => {
                    out.push(DestinationRecord::Location(LocationRecord {
                        idno: derived_idno_v1("loc", &e.external_id, &e.external_created_time),
                        provenance: provenance.clone(),
                        name: e.name.clone(),
                        linked_entities: vec![idno.clone()],
                        address: e.address.clone(),
                        latitude,
                        longitude,
                    }));
                }
                (Err(cause), _) | (_, Err(cause)) => {
                    out.fail(DestinationTable::Locations, e, cause);
                }
            }
        }

        if category.eq_ignore_ascii_case("person") {
            out.push(DestinationRecord::PersonAdmin(PersonAdminRecord {
                idno: derived_idno_v1("per", &e.external_id, &e.external_created_time),
                provenance,
                name: e.name.clone(),
                linked_entities: vec![idno],
                lchp_team_member: false,
                title: String::new(),
                affiliation: String::new(),
                email_address: String::new(),
            }));
        }
    }

    // ------------------------------------------------------------------------
    // Subjects
    // ------------------------------------------------------------------------

    fn build_subject(&mut self, s: &SubjectSourceRecord, out: &mut BuildOutput) {
        if self.built.subjects.contains_key(&s.external_id) {
            out.fail(DestinationTable::Subjects, s, "duplicate external id".to_string());
            return;
        }

        let subject = SubjectRecord {
            idno: derived_idno_v1("sub", &s.external_id, &s.external_created_time),
            provenance: Provenance::of(s),
            name: s.name.clone(),
            subject_type: s.category.trim().to_string(),
        };
        self.built
            .subjects
            .insert(s.external_id.clone(), subject.clone());
        out.push(DestinationRecord::Subject(subject));
    }

    // ------------------------------------------------------------------------
    // Relationships
    // ------------------------------------------------------------------------

    fn build_relationship(&mut self, r: &EntityRelationshipSourceRecord, out: &mut BuildOutput) {
        if !self.built.relationships.insert(r.external_id.clone()) {
            out.fail(
                DestinationTable::EntityRelationships,
                r,
                "duplicate external id".to_string(),
            );
            return;
        }

        let mut endpoint = |role: &'static str, id: &str| match self.built.entities.get(id) {
            Some(entity) => Some(entity.idno.clone()),
            None => {
                out.unresolved(r, role, SourceTable::Entities, id);
                None
            }
        };
        let subject = endpoint("entity_1", &r.entity_1);
        let object = endpoint("entity_2", &r.entity_2);

        let (Some(subject_entity), Some(object_entity)) = (subject, object) else {
            out.fail(
                DestinationTable::EntityRelationships,
                r,
                "relationship endpoint does not resolve to an entity".to_string(),
            );
            return;
        };

        out.push(DestinationRecord::EntityRelationship(EntityRelationshipRecord {
            idno: derived_idno_v1("rel", &r.external_id, &r.external_created_time),
            provenance: Provenance::of(r),
            name: r.name.clone(),
            subject_entity,
            object_entity,
            relationship_predicate: r.relation_type.clone(),
            relationship_start_date: r.start_date.clone(),
            relationship_end_date: r.end_date.clone(),
        }));
    }

    // ------------------------------------------------------------------------
    // Accessions → DonationGroupings
    // ------------------------------------------------------------------------

    fn build_donation_grouping(&mut self, a: &AccessionSourceRecord, out: &mut BuildOutput) {
        if self.built.groupings.contains_key(&a.external_id) {
            out.fail(
                DestinationTable::DonationGroupings,
                a,
                "duplicate external id".to_string(),
            );
            return;
        }

        let mut donor_ids = Vec::new();
        let mut seen = HashSet::new();
        for id in a.linked_entity_array.iter() {
            push_unique(&mut donor_ids, &mut seen, id);
        }
        for id in self.built.entities_marked(&a.external_id, |r| &r.as_donor) {
            push_unique(&mut donor_ids, &mut seen, &id);
        }

        let linked_donors = self.resolve_entities(a, "linked_donors", &donor_ids, out);
        let resolved: Vec<String> = donor_ids
            .into_iter()
            .filter(|id| self.built.entities.contains_key(id))
            .collect();

        self.built.groupings.insert(
            a.external_id.clone(),
            BuiltGrouping {
                idno: a.idno.clone(),
                donors: resolved,
            },
        );

        out.push(DestinationRecord::DonationGrouping(DonationGroupingRecord {
            idno: a.idno.clone(),
            provenance: Provenance::of(a),
            donor_name: a.donor_name.clone(),
            donation_date: a.donation_date.clone(),
            donor_email: String::new(),
            donor_phone: String::new(),
            description: a.description.clone(),
            title: a.title.clone(),
            legacy_idno: a.legacy_idno_umd.clone(),
            file_ids: a.file_array.to_vec(),
            linked_donors,
            donation_consent: false,
        }));
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    fn build_file(&mut self, f: &FileSourceRecord, out: &mut BuildOutput) {
        if self.built.files.contains_key(&f.external_id) {
            out.fail(DestinationTable::Files, f, "duplicate external id".to_string());
            return;
        }

        let accession = f.linked_accession.trim();
        let donation_grouping_id = if accession.is_empty() {
            String::new()
        } else {
            match self.built.groupings.get(accession) {
                Some(grouping) => grouping.idno.clone(),
                None => {
                    out.unresolved(f, "donation_grouping_id", SourceTable::Accessions, accession);
                    String::new()
                }
            }
        };

        // `NO FILE` wins over everything, the virtual location included.
        let mut locations = Vec::new();
        if !PathNormalizer::marks_no_file(&f.file_path) {
            let virtual_location = f.virtual_location.trim();
            if !virtual_location.is_empty() {
                locations.push(virtual_location.to_string());
            }
            locations.extend(self.normalizer.normalize(&f.file_path));
        }

        let mut source_ids = f.linked_entity_as_source.to_vec();
        let mut seen: HashSet<String> = source_ids.iter().cloned().collect();
        for id in self.built.entities_marked(&f.external_id, |r| &r.as_file_source) {
            push_unique(&mut source_ids, &mut seen, &id);
        }
        let linked_entities_as_sources =
            self.resolve_entities(f, "linked_entities_as_sources", &source_ids, out);

        self.built.files.insert(
            f.external_id.clone(),
            BuiltFile {
                idno: f.idno.clone(),
                locations: locations.clone(),
            },
        );

        out.push(DestinationRecord::File(FileRecord {
            idno: f.idno.clone(),
            provenance: Provenance::of(f),
            donation_grouping_id,
            item_id: f.part_of_item.clone(),
            file_format: f.file_format.first().cloned().unwrap_or_default(),
            locations,
            legacy_idno: f.legacy_idno_lchp.clone(),
            legacy_checksum: f.legacy_checksum.clone(),
            linked_entities_as_sources,
        }));
    }

    // ------------------------------------------------------------------------
    // Items (+ ItemLegacyInfo, ItemAdmin)
    // ------------------------------------------------------------------------

    fn build_item(&mut self, item: &ItemSourceRecord, out: &mut BuildOutput) {
        if self.built.items.contains_key(&item.external_id) {
            out.fail(DestinationTable::Items, item, "duplicate external id".to_string());
            return;
        }
        self.built
            .items
            .insert(item.external_id.clone(), item.idno.clone());
        let item_id = item.external_id.as_str();

        let mut donor_ids = Vec::new();
        let mut donor_seen = HashSet::new();
        for accession in item.linked_accessions_array.iter() {
            match self.built.groupings.get(accession) {
                Some(grouping) => {
                    for donor in &grouping.donors {
                        push_unique(&mut donor_ids, &mut donor_seen, donor);
                    }
                }
                None => out.unresolved(
                    item,
                    "linked_accessions",
                    SourceTable::Accessions,
                    accession,
                ),
            }
        }

        // Flat list: item-side links first, then entities that point back at
        // this item from their own role markers, then donors.
        let mut flat = ordered_union([
            &item.linked_entity_as_creator,
            &item.linked_entity_source,
            &item.linked_people,
            &item.linked_places_orgs,
            &item.linked_entity_interviewers,
            &item.linked_entity_interviewees,
        ]);
        let mut seen: HashSet<String> = flat.iter().cloned().collect();
        for id in &self.built.entity_order {
            let linked = self
                .built
                .entity_roles
                .get(id)
                .map_or(false, |roles| roles.linked_to_item(item_id));
            if linked {
                push_unique(&mut flat, &mut seen, id);
            }
        }
        for id in &donor_ids {
            push_unique(&mut flat, &mut seen, id);
        }

        let linked_entities = self.resolve_entities(item, "linked_entities", &flat, out);

        let roles = |item_marker: &lakeland_model::OneOrMany<String>,
                     entity_marker: fn(&EntityRoles) -> &HashSet<String>|
         -> Vec<EntityRecord> {
            flat.iter()
                .filter(|id| {
                    item_marker.contains_str(id)
                        || self
                            .built
                            .entity_roles
                            .get(*id)
                            .map_or(false, |r| entity_marker(r).contains(item_id))
                })
                .filter_map(|id| self.built.entities.get(id).cloned())
                .collect()
        };
        let as_sources = roles(&item.linked_entity_source, |r| &r.as_source);
        let as_interviewers = roles(&item.linked_entity_interviewers, |r| &r.as_interviewer);
        let as_interviewees = roles(&item.linked_entity_interviewees, |r| &r.as_interviewee);
        let as_creators = roles(&item.linked_entity_as_creator, |r| &r.as_item_creator);

        let as_donors: Vec<EntityRecord> = donor_ids
            .iter()
            .filter_map(|id| self.built.entities.get(id).cloned())
            .collect();

        let linked_subjects: Vec<SubjectRecord> = item
            .linked_subjects
            .iter()
            .filter_map(|id| match self.built.subjects.get(id) {
                Some(subject) => Some(subject.clone()),
                None => {
                    out.unresolved(item, "linked_subjects", SourceTable::Subjects, id);
                    None
                }
            })
            .collect();

        for id in item.linked_files_array.iter() {
            if self.built.files.contains_key(id) && !self.built.file_items.contains_key(id) {
                self.built.file_items.insert(id.clone(), item.idno.clone());
            }
        }
        let files: Vec<&BuiltFile> = item
            .linked_files_array
            .iter()
            .filter_map(|id| match self.built.files.get(id) {
                Some(file) => Some(file),
                None => {
                    out.unresolved(item, "linked_files", SourceTable::Files, id);
                    None
                }
            })
            .collect();
        let linked_files: Vec<String> = files.iter().map(|f| f.idno.clone()).collect();
        let legacy_associated_filenames: Vec<String> = files
            .iter()
            .flat_map(|f| f.locations.iter())
            .filter_map(|path| file_name(path))
            .map(str::to_string)
            .collect();

        let provenance = Provenance::of(item);

        out.push(DestinationRecord::Item(ItemRecord {
            idno: item.idno.clone(),
            provenance: provenance.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            creation_date: item.created_date.clone(),
            creation_year: creation_year(&item.created_date),
            item_type: item.obj_type.clone(),
            categories: item.category.to_vec(),
            collection: item.collection.clone(),
            linked_entities,
            linked_entities_as_donors: as_donors,
            linked_entities_as_sources: as_sources,
            linked_entities_as_interviewers: as_interviewers,
            linked_entities_as_interviewees: as_interviewees,
            linked_entities_as_creators: as_creators,
            linked_subjects,
            linked_files,
            interview_summary_attachment: item.interview_summary_attachment.to_vec(),
        }));

        out.push(DestinationRecord::ItemLegacyInfo(ItemLegacyInfoRecord {
            idno: item.idno.clone(),
            provenance: provenance.clone(),
            linked_item: item.idno.clone(),
            legacy_idno_umd: item.legacy_idno_umd.clone(),
            legacy_idno_lchp: item.legacy_idno_lchp.clone(),
            legacy_associated_filenames,
        }));

        out.push(DestinationRecord::ItemAdmin(ItemAdminRecord {
            idno: item.idno.clone(),
            provenance,
            linked_item: item.idno.clone(),
            lakeland_book: item.lakeland_book,
            lakeland_book_chapter: item.lakeland_book_chapter.clone(),
            lakeland_book_page: item.lakeland_book_page.trim().parse().ok(),
            lakeland_video: item.lakeland_video,
            remove: !item.remove.trim().is_empty(),
        }));
    }
}
