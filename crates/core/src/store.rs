//! File-backed record store.
//!
//! ## Storage Layout
//!
//! Each model has a table directory named after its lowercased type name, holding one
//! YAML file per record:
//!
//! ```text
//! <data_dir>/
//!   coding/
//!     <id>.yaml
//!   organization/
//!     <id>.yaml
//!   patient/
//!     <id>.yaml
//! ```
//!
//! Files are written to a temporary sibling and renamed into place. All writes go through
//! one mutex, so uniqueness checks and the writes that follow them are atomic within a
//! process.
//!
//! ## Deletion
//!
//! Deleting a record first plans the whole operation: it collects the records that cascade,
//! refuses if any record outside that set links to it through a protected field or would
//! fail its own checks once detached, and only then detaches the remaining referrers and
//! removes the files.

use crate::config::CoreConfig;
use crate::constants::{RECORD_EXTENSION, TEMP_SUFFIX};
use crate::model::Model;
use crate::schema::{Link, OnDelete};
use crate::validation::validate_storage_id;
use crate::{CoreError, CoreResult};
use fhir::{
    wire, Coding, ContactDetail, ContactPoint, DomainResource, Extension, Id, Identifier,
    Instant, Meta, Organisation, Patient, Period, Reference, Resource, ResourceKey,
    StructureDefinition, ValueSet,
};
use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Referrers = Vec<(ResourceKey, Vec<Link>)>;

/// Type-erased operations on one registered model, used where the store follows links
/// across tables.
#[derive(Clone, Copy)]
pub struct ModelEntry {
    pub name: &'static str,
    scan: fn(&Store) -> CoreResult<Referrers>,
    check_detach: fn(&Store, &Id, &[Link]) -> CoreResult<()>,
    detach: fn(&Store, &Id, &[Link]) -> CoreResult<()>,
    read_json: fn(&Store, &Id) -> CoreResult<serde_json::Value>,
}

impl ModelEntry {
    pub fn of<M: Model>() -> Self {
        Self {
            name: M::NAME,
            scan: scan_links::<M>,
            check_detach: check_detach::<M>,
            detach: detach_links::<M>,
            read_json: read_json::<M>,
        }
    }
}

fn scan_links<M: Model>(store: &Store) -> CoreResult<Referrers> {
    Ok(store
        .list_records::<M>()?
        .into_iter()
        .filter_map(|record| record.key().map(|key| (key, record.links())))
        .collect())
}

/// The stored record with every one of `links` removed, or None if it held none of them.
fn unlinked<M: Model>(store: &Store, id: &Id, links: &[Link]) -> CoreResult<Option<M>> {
    let mut record: M = store.read_record(id)?;
    let mut changed = false;
    for link in links {
        changed |= record.unlink(link);
    }
    Ok(changed.then_some(record))
}

/// Fail with [`CoreError::DetachInvalid`] if dropping `links` would leave the record
/// failing its own checks.
fn check_detach<M: Model>(store: &Store, id: &Id, links: &[Link]) -> CoreResult<()> {
    let Some(first) = links.first() else {
        return Ok(());
    };
    let Some(record) = unlinked::<M>(store, id, links)? else {
        return Ok(());
    };
    match record.check() {
        Err(CoreError::Validation(errors)) => Err(CoreError::DetachInvalid {
            target: first.target.clone(),
            referrer: ResourceKey::new(M::NAME, id.clone()),
            errors,
        }),
        other => other,
    }
}

fn detach_links<M: Model>(store: &Store, id: &Id, links: &[Link]) -> CoreResult<()> {
    let Some(mut record) = unlinked::<M>(store, id, links)? else {
        return Ok(());
    };
    let previous = record.meta().cloned();
    if let Some(meta) = record.meta_mut() {
        stamp(meta, previous.as_ref());
    }
    store.write_record(&record)?;
    for link in links {
        tracing::info!(
            model = M::NAME,
            %id,
            field = link.field.name,
            target = %link.target,
            "detached link"
        );
    }
    Ok(())
}

fn read_json<M: Model>(store: &Store, id: &Id) -> CoreResult<serde_json::Value> {
    let record: M = store.read_record(id)?;
    wire::to_value(&record).map_err(CoreError::Encode)
}

/// Set version and timestamps for a write. `previous` is the stored metadata on update.
fn stamp(meta: &mut Meta, previous: Option<&Meta>) {
    let now = Instant::now();
    match previous {
        None => {
            meta.version_id = Some(Meta::default().next_version());
            meta.created = Some(now);
        }
        Some(previous) => {
            meta.version_id = Some(previous.next_version());
            meta.created = previous.created;
        }
    }
    meta.last_updated = Some(now);
}

/// Record store rooted at the configured data directory.
pub struct Store {
    cfg: Arc<CoreConfig>,
    models: Vec<ModelEntry>,
    write_lock: Mutex<()>,
}

impl Store {
    /// Open a store with every FHIR model registered. The data directory is created if
    /// missing.
    pub fn open(cfg: Arc<CoreConfig>) -> CoreResult<Self> {
        fs::create_dir_all(cfg.data_dir()).map_err(CoreError::StorageDirCreation)?;
        let mut store = Self {
            cfg,
            models: Vec::new(),
            write_lock: Mutex::new(()),
        };
        store.register::<Resource>();
        store.register::<DomainResource>();
        store.register::<Coding>();
        store.register::<Period>();
        store.register::<StructureDefinition>();
        store.register::<Identifier>();
        store.register::<ValueSet>();
        store.register::<ContactDetail>();
        store.register::<ContactPoint>();
        store.register::<Extension>();
        store.register::<Patient>();
        store.register::<Organisation>();
        Ok(store)
    }

    /// Register a model so that links to it are checked and followed on delete.
    pub fn register<M: Model>(&mut self) {
        if self.entry(M::NAME).is_none() {
            self.models.push(ModelEntry::of::<M>());
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Names of every model stored here.
    pub fn model_names(&self) -> Vec<&'static str> {
        self.models.iter().map(|m| m.name).collect()
    }

    fn entry(&self, name: &str) -> Option<&ModelEntry> {
        self.models.iter().find(|m| m.name == name)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn table_dir(&self, name: &str) -> PathBuf {
        self.cfg.data_dir().join(name.to_ascii_lowercase())
    }

    fn record_path(&self, name: &str, id: &Id) -> CoreResult<PathBuf> {
        validate_storage_id(id)?;
        Ok(self
            .table_dir(name)
            .join(format!("{id}.{RECORD_EXTENSION}")))
    }

    fn read_record<M: Model>(&self, id: &Id) -> CoreResult<M> {
        let path = self.record_path(M::NAME, id)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CoreError::NotFound(ResourceKey::new(M::NAME, id.clone())));
            }
            Err(e) => return Err(CoreError::FileRead(e)),
        };
        wire::parse_yaml(M::NAME, &text).map_err(|source| CoreError::Corrupt {
            key: ResourceKey::new(M::NAME, id.clone()),
            source,
        })
    }

    fn write_record<M: Model>(&self, record: &M) -> CoreResult<()> {
        let id = record
            .id()
            .ok_or_else(|| CoreError::InvalidInput(format!("{} record has no id", M::NAME)))?;
        let path = self.record_path(M::NAME, id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(CoreError::StorageDirCreation)?;
        }

        let yaml = wire::render_yaml(record).map_err(CoreError::Encode)?;
        let tmp = path.with_extension(format!("{RECORD_EXTENSION}{TEMP_SUFFIX}"));
        fs::write(&tmp, yaml).map_err(CoreError::FileWrite)?;
        fs::rename(&tmp, &path).map_err(CoreError::FileWrite)?;
        Ok(())
    }

    fn list_records<M: Model>(&self) -> CoreResult<Vec<M>> {
        let dir = self.table_dir(M::NAME);
        let entries = match fs::read_dir(&dir) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CoreError::FileRead(e)),
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION)
            {
                continue;
            }
            let contents = match fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) => {
                    tracing::warn!("failed to read record: {} - {}", path.display(), e);
                    continue;
                }
            };
            match wire::parse_yaml::<M>(M::NAME, &contents) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("failed to parse record: {} - {}", path.display(), e);
                }
            }
        }

        records.sort_by(|a, b| a.id().cmp(&b.id()));
        Ok(records)
    }

    fn check_unique<M: Model>(&self, record: &M) -> CoreResult<()> {
        let keys = record.unique_keys();
        if keys.is_empty() {
            return Ok(());
        }
        for other in self.list_records::<M>()? {
            if other.id() == record.id() {
                continue;
            }
            if let Some(key) = other.unique_keys().into_iter().find(|k| keys.contains(k)) {
                return Err(CoreError::UniqueViolation {
                    model: M::NAME,
                    key,
                });
            }
        }
        Ok(())
    }

    /// Every link to a locally stored type must point at an existing record.
    fn check_links<M: Model>(&self, record: &M) -> CoreResult<()> {
        for link in record.links() {
            if self.entry(&link.target.resource_type).is_some() && !self.exists(&link.target) {
                return Err(CoreError::DanglingLink {
                    field: link.field.name,
                    target: link.target,
                });
            }
        }
        Ok(())
    }

    /// Store a new record.
    ///
    /// A missing id is generated. The record is validated, its unique keys and links are
    /// checked, and its metadata starts at version 1.
    pub fn create<M: Model>(&self, mut record: M) -> CoreResult<M> {
        let _guard = self.lock();

        if record.id().is_none() {
            record.set_id(Id::generate());
        }
        let key = record
            .key()
            .ok_or_else(|| CoreError::InvalidInput(format!("{} record has no id", M::NAME)))?;
        let path = self.record_path(M::NAME, &key.id)?;

        record.check()?;
        if path.exists() {
            return Err(CoreError::Duplicate(key));
        }
        self.check_unique(&record)?;
        self.check_links(&record)?;

        if let Some(meta) = record.meta_mut() {
            stamp(meta, None);
        }
        self.write_record(&record)?;
        tracing::info!(model = M::NAME, id = %key.id, "created record");
        Ok(record)
    }

    pub fn get<M: Model>(&self, id: &Id) -> CoreResult<M> {
        self.read_record(id)
    }

    /// All records of a model, sorted by id. Unreadable files are skipped with a warning.
    pub fn list<M: Model>(&self) -> CoreResult<Vec<M>> {
        self.list_records()
    }

    /// Whether a record of a registered model exists under `key`.
    pub fn exists(&self, key: &ResourceKey) -> bool {
        self.entry(&key.resource_type).is_some()
            && self
                .record_path(&key.resource_type, &key.id)
                .is_ok_and(|path| path.is_file())
    }

    /// Replace a stored record.
    ///
    /// `meta.created` is kept from the stored record, the version is incremented and
    /// `lastUpdated` refreshed. If the incoming record carries a `versionId`, it must match
    /// the stored one.
    pub fn update<M: Model>(&self, mut record: M) -> CoreResult<M> {
        let _guard = self.lock();

        let key = record
            .key()
            .ok_or_else(|| CoreError::InvalidInput(format!("{} record has no id", M::NAME)))?;
        let stored: M = self.read_record(&key.id)?;

        record.check()?;
        let stored_meta = stored.meta().cloned();
        if let (Some(given), Some(stored_meta)) = (
            record.meta().and_then(|m| m.version_id.clone()),
            stored_meta.as_ref(),
        ) {
            if stored_meta.version_id.as_ref() != Some(&given) {
                return Err(CoreError::VersionConflict {
                    key,
                    current: stored_meta
                        .version_id
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    given: given.to_string(),
                });
            }
        }
        self.check_unique(&record)?;
        self.check_links(&record)?;

        if let Some(meta) = record.meta_mut() {
            stamp(meta, stored_meta.as_ref());
        }
        self.write_record(&record)?;
        tracing::info!(model = M::NAME, id = %key.id, "updated record");
        Ok(record)
    }

    /// Delete a record, applying the deletion policy of every link that points at it.
    ///
    /// Returns the keys of every deleted record: the record itself first, then anything
    /// that cascaded.
    pub fn delete<M: Model>(&self, id: &Id) -> CoreResult<Vec<ResourceKey>> {
        let _guard = self.lock();
        self.delete_key(ResourceKey::new(M::NAME, id.clone()))
    }

    fn delete_key(&self, start: ResourceKey) -> CoreResult<Vec<ResourceKey>> {
        if !self.exists(&start) {
            return Err(CoreError::NotFound(start));
        }

        let mut referrers: Referrers = Vec::new();
        for entry in &self.models {
            referrers.extend((entry.scan)(self)?);
        }

        let mut doomed = vec![start.clone()];
        let mut seen: BTreeSet<ResourceKey> = BTreeSet::from([start]);
        let mut queue: VecDeque<ResourceKey> = doomed.iter().cloned().collect();
        while let Some(target) = queue.pop_front() {
            for (referrer, links) in &referrers {
                let cascades = links
                    .iter()
                    .any(|l| l.target == target && l.field.on_delete == OnDelete::Cascade);
                if cascades && seen.insert(referrer.clone()) {
                    doomed.push(referrer.clone());
                    queue.push_back(referrer.clone());
                }
            }
        }

        let outside = referrers.iter().filter(|(key, _)| !seen.contains(key));
        for (referrer, links) in outside.clone() {
            if let Some(link) = links
                .iter()
                .find(|l| seen.contains(&l.target) && l.field.on_delete == OnDelete::Protect)
            {
                return Err(CoreError::Protected {
                    target: link.target.clone(),
                    referrer: referrer.clone(),
                    field: link.field.name,
                });
            }
        }

        let detaching: Vec<(&ModelEntry, &ResourceKey, Vec<Link>)> = outside
            .filter_map(|(referrer, links)| {
                let entry = self.entry(&referrer.resource_type)?;
                let links: Vec<Link> = links
                    .iter()
                    .filter(|l| seen.contains(&l.target) && l.field.on_delete == OnDelete::Detach)
                    .cloned()
                    .collect();
                (!links.is_empty()).then_some((entry, referrer, links))
            })
            .collect();

        // Nothing is written until every detached referrer is known to stay valid.
        for (entry, referrer, links) in &detaching {
            (entry.check_detach)(self, &referrer.id, links)?;
        }
        for (entry, referrer, links) in &detaching {
            (entry.detach)(self, &referrer.id, links)?;
        }

        for key in &doomed {
            let path = self.record_path(&key.resource_type, &key.id)?;
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(CoreError::FileDelete(e)),
            }
            tracing::info!(model = %key.resource_type, id = %key.id, "deleted record");
        }
        Ok(doomed)
    }

    /// Dereference a reference to the stored record, as JSON.
    ///
    /// Relative literal references (`Type/id`) and absolute ones under this store's base
    /// URL are local. Anything else cannot be resolved here.
    pub fn resolve(&self, reference: &Reference) -> CoreResult<serde_json::Value> {
        let literal = reference.reference.as_ref().ok_or_else(|| {
            CoreError::InvalidInput("reference has no literal reference to resolve".into())
        })?;
        self.resolve_literal(literal.as_str())
    }

    pub fn resolve_literal(&self, literal: &str) -> CoreResult<serde_json::Value> {
        let base = format!("{}/", self.cfg.base_url());
        let local = literal.strip_prefix(&base).unwrap_or(literal);
        let key = ResourceKey::parse(local).ok_or_else(|| {
            CoreError::InvalidInput(format!("'{literal}' is not a reference to a local record"))
        })?;
        self.resolve_key(&key)
    }

    pub fn resolve_key(&self, key: &ResourceKey) -> CoreResult<serde_json::Value> {
        let entry = self
            .entry(&key.resource_type)
            .ok_or_else(|| CoreError::UnknownModel(key.resource_type.clone()))?;
        (entry.read_json)(self, &key.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, ReferenceField};
    use fhir::{Code, Uri, Validate, ValidationErrors};
    use medux_types::{BoundedText, NonEmptyText};
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> Store {
        let cfg = CoreConfig::new(
            dir.path().to_path_buf(),
            NonEmptyText::new("medux.test").unwrap(),
            None,
        )
        .expect("config should be valid");
        Store::open(Arc::new(cfg)).expect("store should open")
    }

    fn id(value: &str) -> Id {
        Id::new(value).unwrap()
    }

    fn org(id_value: &str, name: &str) -> Organisation {
        let mut org = Organisation::named(BoundedText::new(name).unwrap());
        org.id = id(id_value);
        org
    }

    fn nhs_number(value: &str) -> Identifier {
        Identifier::new(
            Uri::new("https://fhir.nhs.uk/Id/nhs-number").unwrap(),
            BoundedText::new(value).unwrap(),
        )
    }

    fn org_ref(id_value: &str) -> Reference {
        Reference::to(&ResourceKey::new("Organization", id(id_value)))
    }

    #[test]
    fn create_assigns_id_and_metadata() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);

        let coding = Coding::new(None, Code::new("abc").unwrap());
        let created = store.create(coding).expect("create should succeed");
        let coding_id = created.id.clone().expect("id assigned");
        assert!(temp_dir
            .path()
            .join("coding")
            .join(format!("{coding_id}.yaml"))
            .is_file());

        let patient = store.create(Patient::new()).expect("create should succeed");
        assert_eq!(patient.meta.version_id.as_ref().map(Id::as_str), Some("1"));
        assert!(patient.meta.created.is_some());
        assert_eq!(patient.meta.created, patient.meta.last_updated);

        let loaded: Patient = store.get(&patient.id).expect("get should succeed");
        assert_eq!(loaded, patient);
    }

    #[test]
    fn list_is_sorted_by_id() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        for name in ["c", "a", "b"] {
            store.create(org(name, name)).expect("create should succeed");
        }

        let ids: Vec<String> = store
            .list::<Organisation>()
            .unwrap()
            .into_iter()
            .map(|o| o.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(store.list::<Patient>().unwrap().is_empty());
    }

    #[test]
    fn list_skips_unparsable_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        store.create(org("good", "Good")).unwrap();
        fs::write(
            temp_dir.path().join("organization").join("bad.yaml"),
            "resourceType: [",
        )
        .unwrap();

        assert_eq!(store.list::<Organisation>().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        store.create(org("o1", "One")).unwrap();

        let err = store.create(org("o1", "Other")).unwrap_err();
        assert!(matches!(err, CoreError::Duplicate(key) if key.to_string() == "Organization/o1"));
    }

    #[test]
    fn dot_ids_never_reach_the_filesystem() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        let err = store.create(org("..", "Escape")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn identifiers_are_unique_within_their_system() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);

        let mut first = Patient::new();
        first.identifier.push(nhs_number("9000000009"));
        store.create(first).unwrap();

        let mut second = Patient::new();
        second.identifier.push(nhs_number("9000000009"));
        let err = store.create(second).unwrap_err();
        match err {
            CoreError::UniqueViolation { model, key } => {
                assert_eq!(model, "Patient");
                assert!(key.ends_with("nhs-number|9000000009"));
            }
            other => panic!("expected UniqueViolation, got {other:?}"),
        }

        let mut third = Patient::new();
        third.identifier.push(nhs_number("9000000017"));
        assert!(store.create(third).is_ok());
    }

    #[test]
    fn value_set_canonical_url_and_version_are_unique() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        let url = Uri::new("http://example.org/fhir/ValueSet/colours").unwrap();

        let mut v1 = ValueSet::new(fhir::PublicationStatus::Active);
        v1.url = Some(url.clone());
        v1.version = Some(BoundedText::new("1").unwrap());
        store.create(v1.clone()).unwrap();

        let mut clash = v1.clone();
        clash.id = Id::generate();
        assert!(matches!(
            store.create(clash).unwrap_err(),
            CoreError::UniqueViolation { .. }
        ));

        let mut v2 = v1;
        v2.id = Id::generate();
        v2.version = Some(BoundedText::new("2").unwrap());
        assert!(store.create(v2).is_ok());
    }

    #[test]
    fn update_increments_version_and_keeps_created() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        let created = store.create(org("o1", "One")).unwrap();

        let mut edited = created.clone();
        edited.name = Some(BoundedText::new("One Renamed").unwrap());
        edited.meta.created = None;
        let updated = store.update(edited).expect("update should succeed");

        assert_eq!(updated.meta.version_id.as_ref().map(Id::as_str), Some("2"));
        assert_eq!(updated.meta.created, created.meta.created);
        assert!(updated.meta.last_updated >= created.meta.last_updated);

        let loaded: Organisation = store.get(&id("o1")).unwrap();
        assert_eq!(loaded.name.unwrap().as_str(), "One Renamed");
    }

    #[test]
    fn update_with_stale_version_is_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        let created = store.create(org("o1", "One")).unwrap();
        store.update(created.clone()).unwrap();

        let err = store.update(created).unwrap_err();
        match err {
            CoreError::VersionConflict { current, given, .. } => {
                assert_eq!(current, "2");
                assert_eq!(given, "1");
            }
            other => panic!("expected VersionConflict, got {other:?}"),
        }
    }

    #[test]
    fn update_of_missing_record_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        let err = store.update(org("ghost", "Ghost")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn links_to_missing_records_are_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);

        let mut patient = Patient::new();
        patient.managing_organization = Some(org_ref("missing"));
        let err = store.create(patient.clone()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::DanglingLink { field: "managingOrganization", .. }
        ));

        store.create(org("missing", "Found")).unwrap();
        assert!(store.create(patient).is_ok());
    }

    #[test]
    fn links_to_unregistered_types_are_not_checked() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);

        let mut domain = DomainResource::new();
        domain.contained.push(Reference::to(&ResourceKey::new(
            "Practitioner",
            id("pr1"),
        )));
        assert!(store.create(domain).is_ok());
    }

    #[test]
    fn protected_link_blocks_delete() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        store.create(org("trust", "Trust")).unwrap();
        let mut patient = Patient::new();
        patient.managing_organization = Some(org_ref("trust"));
        let patient = store.create(patient).unwrap();

        let err = store.delete::<Organisation>(&id("trust")).unwrap_err();
        match err {
            CoreError::Protected {
                referrer, field, ..
            } => {
                assert_eq!(referrer, ResourceKey::new("Patient", patient.id.clone()));
                assert_eq!(field, "managingOrganization");
            }
            other => panic!("expected Protected, got {other:?}"),
        }
        assert!(store.exists(&ResourceKey::new("Organization", id("trust"))));
    }

    #[test]
    fn security_coding_is_protected() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        let mut label = Coding::new(None, Code::new("R").unwrap());
        label.id = Some(id("restricted"));
        store.create(label).unwrap();

        let mut patient = Patient::new();
        patient.meta.security = Some(id("restricted"));
        store.create(patient).unwrap();

        assert!(matches!(
            store.delete::<Coding>(&id("restricted")).unwrap_err(),
            CoreError::Protected { field: "meta.security", .. }
        ));
    }

    #[test]
    fn detach_clears_the_link_and_bumps_the_referrer() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        store.create(org("trust", "Trust")).unwrap();
        let mut ward = org("ward", "Ward");
        ward.part_of = Some(org_ref("trust"));
        store.create(ward).unwrap();

        let deleted = store.delete::<Organisation>(&id("trust")).unwrap();
        assert_eq!(deleted, vec![ResourceKey::new("Organization", id("trust"))]);

        let ward: Organisation = store.get(&id("ward")).unwrap();
        assert!(ward.part_of.is_none());
        assert_eq!(ward.meta.version_id.as_ref().map(Id::as_str), Some("2"));
    }

    #[test]
    fn deleting_an_extension_removes_it_from_many_to_many_lists() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        let mut ext = Extension::new(Uri::new("http://example.org/ext/flag").unwrap());
        ext.id = Some(id("flag"));
        ext.value_boolean = Some(true);
        store.create(ext).unwrap();

        let mut coding = Coding::new(None, Code::new("abc").unwrap());
        coding.id = Some(id("c1"));
        coding.extension.push(id("flag"));
        store.create(coding).unwrap();

        store.delete::<Extension>(&id("flag")).unwrap();
        let coding: Coding = store.get(&id("c1")).unwrap();
        assert!(coding.extension.is_empty());
    }

    #[test]
    fn detach_that_would_invalidate_the_referrer_refuses_the_delete() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        let mut child = Extension::new(Uri::new("http://example.org/ext/child").unwrap());
        child.id = Some(id("child"));
        child.value_boolean = Some(true);
        store.create(child).unwrap();

        let mut parent = Extension::new(Uri::new("http://example.org/ext/parent").unwrap());
        parent.id = Some(id("parent"));
        parent.extension.push(id("child"));
        let parent = store.create(parent).unwrap();

        match store.delete::<Extension>(&id("child")).unwrap_err() {
            CoreError::DetachInvalid {
                target, referrer, ..
            } => {
                assert_eq!(target, ResourceKey::new("Extension", id("child")));
                assert_eq!(referrer, ResourceKey::new("Extension", id("parent")));
            }
            other => panic!("expected DetachInvalid, got {other:?}"),
        }

        assert!(store.exists(&ResourceKey::new("Extension", id("child"))));
        let stored: Extension = store.get(&id("parent")).unwrap();
        assert_eq!(stored.extension, parent.extension);
    }

    #[test]
    fn nested_identifier_assigners_are_links() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);

        let mut identifier = nhs_number("9000000009");
        identifier.assigner = Some(Box::new(org_ref("nhs")));
        let mut patient = Patient::new();
        patient.identifier.push(identifier);

        assert!(matches!(
            store.create(patient.clone()).unwrap_err(),
            CoreError::DanglingLink { field: "assigner", .. }
        ));

        store.create(org("nhs", "NHS England")).unwrap();
        let patient = store.create(patient).unwrap();

        store.delete::<Organisation>(&id("nhs")).unwrap();
        let loaded: Patient = store.get(&patient.id).unwrap();
        assert!(loaded.identifier[0].assigner.is_none());
        assert_eq!(loaded.meta.version_id.as_ref().map(Id::as_str), Some("2"));
    }

    #[test]
    fn unparsable_stored_record_is_corrupt() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        store.create(org("good", "Good")).unwrap();
        fs::write(
            temp_dir.path().join("organization").join("bad.yaml"),
            "resourceType: [",
        )
        .unwrap();

        match store.get::<Organisation>(&id("bad")).unwrap_err() {
            CoreError::Corrupt { key, .. } => assert_eq!(key.to_string(), "Organization/bad"),
            other => panic!("expected Corrupt, got {other:?}"),
        }
        assert!(matches!(
            store.resolve_literal("Organization/bad"),
            Err(CoreError::Corrupt { .. })
        ));
    }

    static ABOUT: ReferenceField =
        ReferenceField::new("about", "Patient", OnDelete::Cascade);

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct Note {
        #[serde(default)]
        id: Option<Id>,
        about: Reference,
    }

    impl Validate for Note {
        fn validate_at(&self, _path: &str, _errors: &mut ValidationErrors) {}
    }

    impl Model for Note {
        const NAME: &'static str = "Note";

        fn fields() -> &'static [FieldSchema] {
            &[]
        }

        fn id(&self) -> Option<&Id> {
            self.id.as_ref()
        }

        fn set_id(&mut self, id: Id) {
            self.id = Some(id);
        }

        fn references(&self) -> Vec<(&'static ReferenceField, &Reference)> {
            vec![(&ABOUT, &self.about)]
        }

        fn unlink(&mut self, _link: &Link) -> bool {
            false
        }
    }

    #[test]
    fn cascade_deletes_referrers_recursively_after_protect_checks() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = test_store(&temp_dir);
        store.register::<Note>();

        let patient = store.create(Patient::new()).unwrap();
        let patient_key = ResourceKey::new("Patient", patient.id.clone());
        let note = store
            .create(Note {
                id: Some(id("n1")),
                about: Reference::to(&patient_key),
            })
            .unwrap();

        let deleted = store.delete::<Patient>(&patient.id).unwrap();
        assert_eq!(
            deleted,
            vec![patient_key.clone(), ResourceKey::new("Note", id("n1"))]
        );
        assert!(!store.exists(&ResourceKey::new("Note", note.id.unwrap())));
    }

    #[test]
    fn resolve_follows_relative_and_local_absolute_references() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = test_store(&temp_dir);
        store.create(org("trust", "Trust")).unwrap();

        let json = store.resolve(&org_ref("trust")).unwrap();
        assert_eq!(json["name"], "Trust");
        assert_eq!(json["resourceType"], "Organization");

        let json = store
            .resolve_literal("https://medux.test/fhir/Organization/trust")
            .unwrap();
        assert_eq!(json["id"], "trust");

        assert!(matches!(
            store.resolve_literal("https://elsewhere.org/fhir/Organization/trust"),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            store.resolve_literal("Practitioner/p1"),
            Err(CoreError::UnknownModel(_))
        ));
        assert!(matches!(
            store.resolve_literal("Organization/nope"),
            Err(CoreError::NotFound(_))
        ));
    }
}
