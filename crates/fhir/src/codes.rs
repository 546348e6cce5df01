//! Fixed code enumerations (required FHIR value set bindings).
//!
//! Each enumeration serialises to its FHIR code, exposes the full code list for schema
//! descriptions, and rejects anything outside the list when parsed.

use crate::fields::FieldError;

macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $code:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $code)] $variant ),+
        }

        impl $name {
            /// Every code accepted by this binding, in declaration order.
            pub const CODES: &'static [&'static str] = &[$($code),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $code ),+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $( $code => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = FieldError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_code(s).ok_or_else(|| FieldError::InvalidChoice {
                    value: s.to_owned(),
                    allowed: Self::CODES.join(", "),
                })
            }
        }
    };
}

code_enum! {
    /// <http://hl7.org/fhir/narrative-status>
    NarrativeStatus {
        Generated => "generated",
        Extensions => "extensions",
        Additional => "additional",
        Empty => "empty",
    }
}

code_enum! {
    /// Lifecycle status of a publishable metadata resource.
    PublicationStatus {
        Draft => "draft",
        Active => "active",
        Retired => "retired",
        Unknown => "unknown",
    }
}

code_enum! {
    /// Purpose of an identifier.
    IdentifierUse {
        Usual => "usual",
        Official => "official",
        Temp => "temp",
        Secondary => "secondary",
        Old => "old",
    }
}

code_enum! {
    /// Telecommunications form of a contact point.
    ContactPointSystem {
        Phone => "phone",
        Fax => "fax",
        Email => "email",
        Pager => "pager",
        Url => "url",
        Sms => "sms",
        Other => "other",
    }
}

code_enum! {
    /// Purpose of a contact point.
    ContactPointUse {
        Home => "home",
        Work => "work",
        Temp => "temp",
        Old => "old",
        Mobile => "mobile",
    }
}

code_enum! {
    /// Purpose of a human name.
    NameUse {
        /// Usual/preferred name.
        Usual => "usual",
        /// Official name.
        Official => "official",
        /// Temporary name.
        Temp => "temp",
        /// Nickname or informal name.
        Nickname => "nickname",
        /// Anonymous name.
        Anonymous => "anonymous",
        /// Old name (no longer in use).
        Old => "old",
        /// Maiden name.
        Maiden => "maiden",
    }
}

code_enum! {
    AddressUse {
        Home => "home",
        Work => "work",
        Temp => "temp",
        Old => "old",
        Billing => "billing",
    }
}

code_enum! {
    AddressType {
        Postal => "postal",
        Physical => "physical",
        Both => "both",
    }
}

code_enum! {
    AdministrativeGender {
        Male => "male",
        Female => "female",
        Other => "other",
        Unknown => "unknown",
    }
}

code_enum! {
    /// What a structure definition describes.
    StructureDefinitionKind {
        PrimitiveType => "primitive-type",
        ComplexType => "complex-type",
        Resource => "resource",
        Logical => "logical",
    }
}

code_enum! {
    /// How a structure definition relates to its base.
    TypeDerivationRule {
        Specialization => "specialization",
        Constraint => "constraint",
    }
}

code_enum! {
    /// Resource types modelled by this crate (wire names).
    ResourceType {
        Resource => "Resource",
        DomainResource => "DomainResource",
        Patient => "Patient",
        Organization => "Organization",
        ValueSet => "ValueSet",
        StructureDefinition => "StructureDefinition",
    }
}
