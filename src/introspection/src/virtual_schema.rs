// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Compiled-in schemas that are never persisted.
//!
//! Virtual schemas, like `information_schema` itself, exist in every
//! database. Their tables are emitted in the order they are declared here,
//! which is the order users see documented, rather than sorted by name.

use once_cell::sync::Lazy;

use crate::descriptor::{DescriptorId, DescriptorState, PrivilegeDescriptor, TableDescriptor};

/// A virtual schema and its tables, in declaration order.
#[derive(Debug, Clone)]
pub struct VirtualSchema {
    id: DescriptorId,
    name: String,
    tables: Vec<TableDescriptor>,
}

impl VirtualSchema {
    pub fn id(&self) -> DescriptorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema's tables, in declaration order.
    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }
}

/// The set of virtual schemas known to the process.
///
/// IDs for virtual objects are allocated downward from `u32::MAX` so they
/// never collide with persisted descriptors.
#[derive(Debug, Clone)]
pub struct VirtualSchemaRegistry {
    schemas: Vec<VirtualSchema>,
    next_id: u32,
}

impl Default for VirtualSchemaRegistry {
    fn default() -> Self {
        VirtualSchemaRegistry {
            schemas: Vec::new(),
            next_id: u32::MAX,
        }
    }
}

impl VirtualSchemaRegistry {
    /// Returns an empty registry.
    pub fn new() -> VirtualSchemaRegistry {
        VirtualSchemaRegistry::default()
    }

    /// Returns the registry of built-in virtual schemas.
    pub fn builtin() -> &'static VirtualSchemaRegistry {
        &BUILTIN_REGISTRY
    }

    /// Appends a schema whose tables are emitted in the order of `tables`.
    pub fn with_schema<'a>(
        mut self,
        name: impl Into<String>,
        tables: impl IntoIterator<Item = &'a str>,
    ) -> VirtualSchemaRegistry {
        let schema_id = self.allocate_id();
        let tables: Vec<TableDescriptor> = tables
            .into_iter()
            .map(|table| TableDescriptor {
                id: self.allocate_id(),
                name: table.into(),
                parent_id: DescriptorId::INVALID,
                parent_schema_id: schema_id,
                state: DescriptorState::Public,
                temporary: false,
                columns: vec![],
                foreign_keys: vec![],
                privileges: PrivilegeDescriptor::default(),
            })
            .collect();
        self.schemas.push(VirtualSchema {
            id: schema_id,
            name: name.into(),
            tables,
        });
        self
    }

    fn allocate_id(&mut self) -> DescriptorId {
        let id = DescriptorId(self.next_id);
        self.next_id -= 1;
        id
    }

    /// The virtual schemas, in declaration order.
    pub fn schemas(&self) -> &[VirtualSchema] {
        &self.schemas
    }

    /// Looks up a virtual schema by name.
    pub fn schema(&self, name: &str) -> Option<&VirtualSchema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    /// Iterates over every virtual table together with its schema name, in
    /// emission order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableDescriptor)> {
        self.schemas
            .iter()
            .flat_map(|s| s.tables.iter().map(move |t| (s.name.as_str(), t)))
    }
}

static BUILTIN_REGISTRY: Lazy<VirtualSchemaRegistry> = Lazy::new(|| {
    VirtualSchemaRegistry::new()
        .with_schema("information_schema", INFORMATION_SCHEMA_TABLES.iter().copied())
        .with_schema("pg_catalog", PG_CATALOG_TABLES.iter().copied())
});

const INFORMATION_SCHEMA_TABLES: &[&str] = &[
    "administrable_role_authorizations",
    "applicable_roles",
    "character_sets",
    "check_constraints",
    "collation_character_set_applicability",
    "collations",
    "column_privileges",
    "column_udt_usage",
    "columns",
    "constraint_column_usage",
    "enabled_roles",
    "key_column_usage",
    "parameters",
    "referential_constraints",
    "role_table_grants",
    "routines",
    "schema_privileges",
    "schemata",
    "sequences",
    "session_variables",
    "statistics",
    "table_constraints",
    "table_privileges",
    "tables",
    "type_privileges",
    "user_privileges",
    "views",
];

const PG_CATALOG_TABLES: &[&str] = &[
    "pg_attribute",
    "pg_class",
    "pg_constraint",
    "pg_database",
    "pg_description",
    "pg_enum",
    "pg_index",
    "pg_namespace",
    "pg_proc",
    "pg_roles",
    "pg_settings",
    "pg_tables",
    "pg_type",
    "pg_views",
];
