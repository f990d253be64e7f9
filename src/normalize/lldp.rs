//! LLDP neighbor normalization.

use crate::catalog::{Command, ResourceKind};
use crate::config::ConnectionParams;
use crate::dispatch::RawResult;
use crate::metric::LineBuilder;

use super::{first_with_result, unsupported_shape, NormalizeError, Record};

/// Canonical LLDP neighbor record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LldpNeighbor {
    /// Local interface the neighbor was seen on.
    pub interface: String,
    pub local_parent_interface: Option<String>,
    pub remote_type: Option<String>,
    pub remote_chassis_id: Option<String>,
    pub remote_port_desc: Option<String>,
    pub remote_interface: Option<String>,
    pub remote_system_name: Option<String>,
}

impl LldpNeighbor {
    /// Line-protocol metric with the fixed tag/field partition for this
    /// resource kind.
    pub fn metric(&self) -> String {
        LineBuilder::new("lldp_neighbors")
            .tag("interface", &self.interface)
            .tag_opt(
                "local_parent_interface",
                self.local_parent_interface.as_ref(),
            )
            .tag_opt("remote_type", self.remote_type.as_ref())
            .tag_opt("remote_chassis_id", self.remote_chassis_id.as_ref())
            .tag_opt("remote_port_desc", self.remote_port_desc.as_ref())
            .tag_opt("remote_interface", self.remote_interface.as_ref())
            .tag_opt("remote_system_name", self.remote_system_name.as_ref())
            .field_opt("remote_interface", self.remote_interface.as_ref())
            .build()
    }
}

/// CLI-driver processor: flat template rows.
pub(super) fn from_cli(
    commands: &[Command],
    _conn: &ConnectionParams,
) -> Result<Vec<Record>, NormalizeError> {
    let resource = ResourceKind::LldpNeighbors;
    let (command, result) = first_with_result(commands, resource)?;

    let rows = match result {
        RawResult::Rows(rows) => rows,
        other => return Err(unsupported_shape(resource, command, other)),
    };

    let neighbors = rows
        .iter()
        .map(|row| LldpNeighbor {
            interface: row.str("local_interface").unwrap_or_default().to_string(),
            remote_system_name: row.str("neighbor").map(str::to_string),
            remote_interface: row.str("neighbor_interface").map(str::to_string),
            ..Default::default()
        })
        .map(Record::Lldp)
        .collect();

    Ok(neighbors)
}
