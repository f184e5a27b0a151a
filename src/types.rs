//! Closed, type-safe vocabularies for storage component declarations
//!
//! Every string the document uses to pick a component, a platform or a
//! concrete class is parsed into one of these enums at the validation
//! boundary. Unknown strings never travel further than that.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Top-level document keys, one per declarable component family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    #[strum(serialize = "sdmmc_host")]
    SdmmcHost,
    #[strum(serialize = "sd_mmc_card")]
    SdMmcCard,
    #[strum(serialize = "storage")]
    Storage,
}

impl ComponentKind {
    /// Families whose entries select their schema through a `platform` key
    pub fn is_platform_list(&self) -> bool {
        matches!(self, Self::Storage)
    }

    /// The concrete type of a family that has exactly one schema
    pub fn fixed_type(&self) -> Option<ComponentType> {
        match self {
            Self::SdmmcHost => Some(ComponentType::SdmmcHost),
            Self::SdMmcCard => Some(ComponentType::SdMmcCard),
            Self::Storage => None,
        }
    }
}

/// What part a component plays in the storage stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Role {
    /// Host controller the card sits on
    #[strum(serialize = "bus controller")]
    BusController,
    /// Hardware-facing component (e.g. an SD/MMC card)
    #[strum(serialize = "hardware backend")]
    HardwareBackend,
    /// Path-prefixed storage parameterized over a backend
    #[strum(serialize = "storage front-end")]
    StorageFrontend,
}

/// Concrete component classes the generated code instantiates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    #[strum(serialize = "sdmmc_host")]
    SdmmcHost,
    #[strum(serialize = "sd_mmc_card")]
    SdMmcCard,
    #[strum(serialize = "sd_mmc_storage")]
    SdMmcStorage,
}

impl ComponentType {
    pub fn role(&self) -> Role {
        match self {
            Self::SdmmcHost => Role::BusController,
            Self::SdMmcCard => Role::HardwareBackend,
            Self::SdMmcStorage => Role::StorageFrontend,
        }
    }

    /// Fully qualified class name in generated code
    pub fn cpp_class(&self) -> &'static str {
        match self {
            Self::SdmmcHost => "sd_mmc_card::SdmmcHost",
            Self::SdMmcCard => "sd_mmc_card::SdMmc",
            Self::SdMmcStorage => "sd_mmc_card::SD_MMC_Storage",
        }
    }

    /// The configured field that mounts this component in the storage
    /// namespace, if it is a front-end
    pub fn mount_field(&self) -> Option<&'static str> {
        match self.role() {
            Role::StorageFrontend => Some("path_prefix"),
            _ => None,
        }
    }
}

/// Discriminator values accepted in platform lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[strum(serialize = "sd_mmc")]
    SdMmc,
}

impl Platform {
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::SdMmc => ComponentType::SdMmcStorage,
        }
    }

    /// All known discriminator values, for error messages
    pub fn names() -> Vec<String> {
        Self::iter().map(|p| p.to_string()).collect()
    }
}

/// The shape a field value must have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    NonEmptyString,
    /// Mount prefix: non-empty, without the `://` separator
    PathPrefix,
    Integer { min: i64, max: i64 },
    Boolean,
    /// Identifier of another component of the given type
    Reference(ComponentType),
    /// A syntactically valid component identifier
    Identifier,
    /// A key/value mapping (one component entry)
    Mapping,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "a string"),
            Self::NonEmptyString => write!(f, "a non-empty string"),
            Self::PathPrefix => write!(f, "a non-empty path prefix without '://'"),
            Self::Integer { min, max } => write!(f, "an integer in {}..={}", min, max),
            Self::Boolean => write!(f, "a boolean"),
            Self::Reference(target) => write!(f, "the ID of a {}", target),
            Self::Identifier => write!(f, "an identifier ([A-Za-z_][A-Za-z0-9_]*)"),
            Self::Mapping => write!(f, "a mapping"),
        }
    }
}
