//! FHIR general-purpose datatypes.
//!
//! Every datatype is an Element: it may carry its own `id` and a list of links to stored
//! `Extension` records. Wire names follow FHIR JSON (camelCase) and unknown keys are
//! rejected.

pub mod address;
pub mod attachment;
pub mod coding;
pub mod contact;
pub mod extension;
pub mod identifier;
pub mod name;
pub mod period;
pub mod reference;

pub use address::Address;
pub use attachment::Attachment;
pub use coding::{CodeableConcept, Coding};
pub use contact::{ContactDetail, ContactPoint};
pub use extension::Extension;
pub use identifier::Identifier;
pub use name::HumanName;
pub use period::Period;
pub use reference::{Reference, ResourceKey};
