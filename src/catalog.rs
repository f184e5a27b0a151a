//! Built-in component schemas
//!
//! | Document key  | Platform | Type             | Role              |
//! |---------------|----------|------------------|-------------------|
//! | `sdmmc_host`  |          | `sdmmc_host`     | bus controller    |
//! | `sd_mmc_card` |          | `sd_mmc_card`    | hardware backend  |
//! | `storage`     | `sd_mmc` | `sd_mmc_storage` | storage front-end |
//!
//! The dependency chain is `sd_mmc_storage -> sd_mmc_card -> sdmmc_host`.
//! Platform dispatch is a closed match on `Platform`, so an unknown
//! discriminator is rejected when it is parsed, never at lookup time.

use std::collections::HashMap;
use strum::IntoEnumIterator;

use crate::schema::{ComponentSchema, FieldSpec};
use crate::types::{ComponentType, Platform, ValueKind};

/// Schemas for every known component type
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    schemas: HashMap<ComponentType, ComponentSchema>,
}

impl SchemaCatalog {
    /// Catalog with the built-in storage schemas
    pub fn builtin() -> Self {
        let schemas = ComponentType::iter()
            .map(|ty| (ty, builtin_schema(ty)))
            .collect();
        Self { schemas }
    }

    /// Schema of a fixed-type component.
    ///
    /// Every `ComponentType` has a built-in schema, so this always succeeds
    /// for catalogs made by `builtin`.
    pub fn get(&self, component_type: ComponentType) -> Option<&ComponentSchema> {
        self.schemas.get(&component_type)
    }

    /// Schema selected by a platform discriminator
    pub fn for_platform(&self, platform: Platform) -> Option<&ComponentSchema> {
        self.get(platform.component_type())
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_schema(component_type: ComponentType) -> ComponentSchema {
    let builder = ComponentSchema::builder(component_type);
    let builder = match component_type {
        ComponentType::SdmmcHost => builder
            .field(FieldSpec::required("slot", ValueKind::Integer { min: 0, max: 1 }))
            .field(FieldSpec::optional("mode_1bit", ValueKind::Boolean).with_default(false)),
        ComponentType::SdMmcCard => builder
            .field(FieldSpec::optional(
                "sdmmc_host_id",
                ValueKind::Reference(ComponentType::SdmmcHost),
            ))
            .field(FieldSpec::optional("format_if_mount_failed", ValueKind::Boolean)),
        ComponentType::SdMmcStorage => builder
            .platform(Platform::SdMmc)
            .field(FieldSpec::required("path_prefix", ValueKind::PathPrefix))
            .field(FieldSpec::required(
                "sd_mmc_id",
                ValueKind::Reference(ComponentType::SdMmcCard),
            )),
    };
    builder.build().expect("built-in schema should be valid") // Safe: hardcoded valid schema
}
