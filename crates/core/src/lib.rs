//! # MedUX Core
//!
//! Storage and admin logic for the MedUX FHIR record store.
//!
//! This crate contains record persistence and the generic admin layer:
//! - a file-backed [`Store`] with one YAML file per record under `MEDUX_DATA_DIR`
//! - link fields with on-delete policies (protect, cascade, detach)
//! - unique keys (identifiers per system, canonical URL and version)
//! - the [`AdminSite`] registry of models editable as JSON
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest` and
//! `medux-cli`.

pub mod admin;
pub mod config;
pub mod constants;
pub mod error;
pub mod model;
pub mod records;
pub mod schema;
pub mod store;
pub mod validation;

pub use admin::{AdminModel, AdminSite, ModelAdmin, ModelSchema};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use model::Model;
pub use schema::{FieldSchema, Link, OnDelete, ReferenceField};
pub use store::Store;
