//! C++ rendering of an initialization sequence
//!
//! One statement per operation:
//!
//! ```text
//! auto *sd = new sd_mmc_card::SD_MMC_Storage();
//! App.register_component(sd);
//! sd->set_path_prefix("sd");
//! sd->set_sd_mmc(card0);
//! storage::StorageClient::add_storage(sd, "sd");
//! ```
//!
//! A storage front-end is mounted with `add_storage` once it is configured
//! and wired, before the next component is constructed.

use std::collections::HashMap;

use crate::engine::emitter::{InitOperation, InitSequence};
use crate::identifier::Identifier;
use crate::schema::FieldValue;
use crate::types::ComponentType;

/// Render the sequence as C++ statements, one per line.
pub fn render_cpp(sequence: &InitSequence) -> String {
    let mut types: HashMap<&Identifier, ComponentType> = HashMap::new();
    let mut lines = Vec::with_capacity(sequence.len());
    // add_storage for the component currently being set up
    let mut pending_mount: Option<String> = None;

    for op in sequence {
        match op {
            InitOperation::Construct { identifier, component_type } => {
                lines.extend(pending_mount.take());
                types.insert(identifier, *component_type);
                lines.push(format!(
                    "auto *{} = new {}();",
                    identifier,
                    component_type.cpp_class()
                ));
            }
            InitOperation::Register { identifier } => {
                lines.push(format!("App.register_component({});", identifier));
            }
            InitOperation::Configure { identifier, field, value } => {
                lines.push(format!(
                    "{}->set_{}({});",
                    identifier,
                    field,
                    cpp_literal(value)
                ));
                let mounts = types
                    .get(identifier)
                    .and_then(|ty| ty.mount_field())
                    .is_some_and(|mount| mount == field.as_str());
                if mounts {
                    pending_mount = Some(format!(
                        "storage::StorageClient::add_storage({}, {});",
                        identifier,
                        cpp_literal(value)
                    ));
                }
            }
            InitOperation::Wire { identifier, field, target } => {
                lines.push(format!("{}->set_{}({});", identifier, setter_name(field), target));
            }
        }
    }
    lines.extend(pending_mount);

    lines.join("\n")
}

/// `sd_mmc_id` -> `sd_mmc`
fn setter_name(field: &str) -> &str {
    field.strip_suffix("_id").unwrap_or(field)
}

fn cpp_literal(value: &FieldValue) -> String {
    match value {
        FieldValue::String(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    // Fixed-width octal so a following digit is not absorbed
                    c if c.is_ascii_control() => out.push_str(&format!("\\{:03o}", c as u32)),
                    c => out.push(c),
                }
            }
            out.push('"');
            out
        }
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Boolean(b) => b.to_string(),
    }
}
