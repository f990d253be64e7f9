//! NETCONF table resolution.
//!
//! A "table" is a named, schema-bound query definition that fetches and
//! shapes structured rows from a device. Resolution is two-tier by design:
//! an operator-populated [`CustomTableRegistry`] is consulted first, then
//! the crate's [`StaticTableRegistry`] builtins, so operators can override
//! or add tables without modifying the builtins. Registration happens at
//! process start, never via runtime path discovery.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

/// Two-tier table lookup exhausted.
///
/// Both variants name the protocol and table involved so coverage gaps are
/// trackable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableLookupError {
    /// No registry knows the protocol at all.
    #[error("protocol '{protocol}' not found in custom nor builtin tables (table '{table}')")]
    ProtocolNotFound { protocol: String, table: String },

    /// The protocol resolved but the table is not defined under it.
    #[error("table '{table}' for protocol '{protocol}' not found in custom nor builtin tables")]
    TableNotFound { protocol: String, table: String },
}

/// A resolved table definition: data the NETCONF session executes, not code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Table name as registered.
    pub name: String,
    /// RPC the session issues to fetch the table's rows.
    pub rpc: String,
}

impl TableSpec {
    /// Create a table definition.
    pub fn new(name: impl Into<String>, rpc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rpc: rpc.into(),
        }
    }
}

/// Capability to resolve a named table under a protocol.
pub trait TableProvider: Send + Sync {
    /// Resolve `table` under `protocol`.
    ///
    /// # Errors
    /// [`TableLookupError`] distinguishing an unknown protocol from an
    /// unknown table within a known protocol.
    fn resolve(&self, protocol: &str, table: &str) -> Result<TableSpec, TableLookupError>;
}

fn lookup(
    tables: &HashMap<String, HashMap<String, TableSpec>>,
    protocol: &str,
    table: &str,
) -> Result<TableSpec, TableLookupError> {
    let module = tables
        .get(protocol)
        .ok_or_else(|| TableLookupError::ProtocolNotFound {
            protocol: protocol.to_string(),
            table: table.to_string(),
        })?;
    module
        .get(table)
        .cloned()
        .ok_or_else(|| TableLookupError::TableNotFound {
            protocol: protocol.to_string(),
            table: table.to_string(),
        })
}

/// Immutable registry of builtin table definitions.
#[derive(Debug, Default)]
pub struct StaticTableRegistry {
    tables: HashMap<String, HashMap<String, TableSpec>>,
}

impl StaticTableRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The builtin table set shipped with the crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(
            "bgp",
            TableSpec::new("BgpNeighborTable", "get-bgp-neighbor-information"),
        );
        registry.insert(
            "lldp",
            TableSpec::new("LldpNeighborTable", "get-lldp-neighbors-information"),
        );
        registry.insert(
            "interface",
            TableSpec::new("EthPortTable", "get-interface-information"),
        );
        registry
    }

    fn insert(&mut self, protocol: &str, spec: TableSpec) {
        self.tables
            .entry(protocol.to_string())
            .or_default()
            .insert(spec.name.clone(), spec);
    }

    /// Add a table definition under a protocol (construction-time only).
    pub fn with(mut self, protocol: &str, spec: TableSpec) -> Self {
        self.insert(protocol, spec);
        self
    }
}

impl TableProvider for StaticTableRegistry {
    fn resolve(&self, protocol: &str, table: &str) -> Result<TableSpec, TableLookupError> {
        lookup(&self.tables, protocol, table)
    }
}

/// Operator-populated table registry, consulted before the builtins.
///
/// Synchronized for access from concurrent per-device pollers.
#[derive(Debug, Default)]
pub struct CustomTableRegistry {
    tables: RwLock<HashMap<String, HashMap<String, TableSpec>>>,
}

impl CustomTableRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table definition under a protocol, replacing any previous
    /// definition with the same name.
    pub fn register(&self, protocol: &str, spec: TableSpec) {
        let mut tables = self.tables.write().expect("table registry lock poisoned");
        tracing::debug!(protocol, table = %spec.name, "Custom table registered");
        tables
            .entry(protocol.to_string())
            .or_default()
            .insert(spec.name.clone(), spec);
    }
}

impl TableProvider for CustomTableRegistry {
    fn resolve(&self, protocol: &str, table: &str) -> Result<TableSpec, TableLookupError> {
        let tables = self.tables.read().expect("table registry lock poisoned");
        lookup(&tables, protocol, table)
    }
}

/// Ordered two-tier resolver: custom definitions first, builtins second.
#[derive(Debug)]
pub struct TableResolver {
    custom: CustomTableRegistry,
    builtin: StaticTableRegistry,
}

impl TableResolver {
    /// Resolver over an empty custom registry and the builtin table set.
    pub fn new() -> Self {
        Self {
            custom: CustomTableRegistry::new(),
            builtin: StaticTableRegistry::builtin(),
        }
    }

    /// Resolver over explicit registries.
    pub fn with_registries(custom: CustomTableRegistry, builtin: StaticTableRegistry) -> Self {
        Self { custom, builtin }
    }

    /// The custom registry, for process-start registration.
    pub fn custom(&self) -> &CustomTableRegistry {
        &self.custom
    }
}

impl Default for TableResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TableProvider for TableResolver {
    fn resolve(&self, protocol: &str, table: &str) -> Result<TableSpec, TableLookupError> {
        match self.custom.resolve(protocol, table) {
            Ok(spec) => Ok(spec),
            // Any custom miss falls through to the builtins; the builtin
            // error is the one that names what is ultimately missing.
            Err(_) => self.builtin.resolve(protocol, table),
        }
    }
}
