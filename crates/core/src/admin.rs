//! Admin site: models registered for generic JSON editing.
//!
//! Each registered model is exposed through the object-safe [`AdminModel`] trait, so the
//! REST layer and the CLI can dispatch on a model name without knowing its Rust type.

use crate::model::Model;
use crate::schema::FieldSchema;
use crate::store::Store;
use crate::{CoreError, CoreResult};
use fhir::{
    wire, Coding, ContactDetail, ContactPoint, DomainResource, Extension, Id, Identifier,
    Organisation, Patient, Period, Resource, ResourceKey, StructureDefinition, ValueSet,
};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Field descriptions for one model.
#[derive(Clone, Debug, Serialize)]
pub struct ModelSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSchema],
}

/// Generic operations on one model, over its JSON form.
pub trait AdminModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn schema(&self) -> ModelSchema;

    fn list(&self, store: &Store) -> CoreResult<Vec<Value>>;

    fn get(&self, store: &Store, id: &Id) -> CoreResult<Value>;

    fn create(&self, store: &Store, body: Value) -> CoreResult<Value>;

    /// Replace the record `id`. A body id, if given, must equal `id`; a missing or blank
    /// one is taken from `id`.
    fn update(&self, store: &Store, id: &Id, body: Value) -> CoreResult<Value>;

    fn delete(&self, store: &Store, id: &Id) -> CoreResult<Vec<ResourceKey>>;

    /// Parse and validate `body` without storing it.
    fn check(&self, body: Value) -> CoreResult<()>;
}

fn encode<M: Model>(record: &M) -> CoreResult<Value> {
    wire::to_value(record).map_err(CoreError::Encode)
}

/// [`AdminModel`] for any stored [`Model`].
pub struct ModelAdmin<M>(PhantomData<fn() -> M>);

impl<M> ModelAdmin<M> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<M> Default for ModelAdmin<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> AdminModel for ModelAdmin<M> {
    fn name(&self) -> &'static str {
        M::NAME
    }

    fn schema(&self) -> ModelSchema {
        ModelSchema {
            name: M::NAME,
            fields: M::fields(),
        }
    }

    fn list(&self, store: &Store) -> CoreResult<Vec<Value>> {
        store.list::<M>()?.iter().map(encode).collect()
    }

    fn get(&self, store: &Store, id: &Id) -> CoreResult<Value> {
        encode(&store.get::<M>(id)?)
    }

    fn create(&self, store: &Store, body: Value) -> CoreResult<Value> {
        let record = M::from_json(body)?;
        encode(&store.create(record)?)
    }

    fn update(&self, store: &Store, id: &Id, mut body: Value) -> CoreResult<Value> {
        // Resources default a missing id to a fresh one, so the path id goes in first.
        if let Value::Object(map) = &mut body {
            let blank = match map.get("id") {
                None | Some(Value::Null) => true,
                Some(Value::String(given)) => given.trim().is_empty(),
                Some(_) => false,
            };
            if blank {
                map.insert("id".into(), Value::String(id.to_string()));
            }
        }
        let mut record = M::from_json(body)?;
        if let Some(given) = record.id() {
            if given != id {
                return Err(CoreError::InvalidInput(format!(
                    "body id '{given}' does not match '{id}'"
                )));
            }
        }
        record.set_id(id.clone());
        encode(&store.update(record)?)
    }

    fn delete(&self, store: &Store, id: &Id) -> CoreResult<Vec<ResourceKey>> {
        store.delete::<M>(id)
    }

    fn check(&self, body: Value) -> CoreResult<()> {
        M::from_json(body)?.check()
    }
}

/// Registry of admin models, in registration order.
#[derive(Clone, Default)]
pub struct AdminSite {
    models: Vec<Arc<dyn AdminModel>>,
}

impl AdminSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ten core models: the resource bases, the metadata resources and the
    /// general-purpose datatypes.
    pub fn core() -> Self {
        let mut site = Self::new();
        site.register::<Resource>();
        site.register::<DomainResource>();
        site.register::<Coding>();
        site.register::<Period>();
        site.register::<StructureDefinition>();
        site.register::<Identifier>();
        site.register::<ValueSet>();
        site.register::<ContactDetail>();
        site.register::<ContactPoint>();
        site.register::<Extension>();
        site
    }

    /// The core models plus Patient and Organization.
    pub fn full() -> Self {
        let mut site = Self::core();
        site.register::<Patient>();
        site.register::<Organisation>();
        site
    }

    /// Register `M`. Registering the same model twice has no effect.
    pub fn register<M: Model>(&mut self) {
        if self.model(M::NAME).is_none() {
            self.models.push(Arc::new(ModelAdmin::<M>::new()));
        }
    }

    pub fn registered(&self) -> Vec<&'static str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    /// Look up a model by name. Matching ignores ASCII case, so `valueset` finds
    /// `ValueSet`.
    pub fn model(&self, name: &str) -> Option<Arc<dyn AdminModel>> {
        self.models
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Like [`AdminSite::model`], failing with [`CoreError::UnknownModel`].
    pub fn require(&self, name: &str) -> CoreResult<Arc<dyn AdminModel>> {
        self.model(name)
            .ok_or_else(|| CoreError::UnknownModel(name.to_owned()))
    }
}
