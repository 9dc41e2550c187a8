// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Access to the raw catalog snapshot.
//!
//! The traversal engine never talks to storage directly. Everything it reads
//! comes through a [`CatalogReader`], which is expected to serve every call
//! from the same transaction so that repeated reads observe one snapshot.

use std::cell::Cell;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::descriptor::{DatabaseDescriptor, Descriptor, DescriptorId, SchemaDescriptor};
use crate::error::CollaboratorError;

/// A role or user known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub name: String,
    pub is_role: bool,
    pub no_login: bool,
    pub valid_until: Option<DateTime<Utc>>,
}

/// Membership of `member` in `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMembership {
    pub role: String,
    pub member: String,
    pub is_admin: bool,
}

/// Reads from the catalog within one transaction.
pub trait CatalogReader {
    /// Returns every descriptor visible to the transaction, in storage order.
    fn all_descriptors(&self) -> Result<Vec<Descriptor>, CollaboratorError>;

    /// Returns every database descriptor, in storage order.
    fn all_databases(&self) -> Result<Vec<DatabaseDescriptor>, CollaboratorError>;

    /// Returns the namespace entries for the schemas of `database`, keyed by
    /// schema ID. This includes schemas without descriptors: the public
    /// schema and temporary schemas.
    fn schema_names(
        &self,
        database: DescriptorId,
    ) -> Result<BTreeMap<DescriptorId, String>, CollaboratorError>;

    /// Returns the descriptors of the given user-defined schemas.
    fn schema_descriptors(
        &self,
        ids: &[DescriptorId],
    ) -> Result<Vec<SchemaDescriptor>, CollaboratorError>;

    /// Returns every role and user.
    fn roles(&self) -> Result<Vec<RoleRecord>, CollaboratorError>;

    /// Returns every role membership.
    fn role_memberships(&self) -> Result<Vec<RoleMembership>, CollaboratorError>;
}

/// A [`CatalogReader`] over a fully materialized snapshot.
///
/// Counts calls to [`CatalogReader::schema_names`] so callers can observe
/// how often the namespace is consulted.
#[derive(Debug, Default)]
pub struct SnapshotReader {
    descriptors: Vec<Descriptor>,
    namespace: BTreeMap<DescriptorId, BTreeMap<DescriptorId, String>>,
    roles: Vec<RoleRecord>,
    memberships: Vec<RoleMembership>,
    schema_name_reads: Cell<usize>,
}

impl SnapshotReader {
    /// Creates a reader over `descriptors`. The namespace is seeded with the
    /// schema descriptors found in the snapshot.
    pub fn new(descriptors: Vec<Descriptor>) -> SnapshotReader {
        let mut namespace: BTreeMap<_, BTreeMap<_, _>> = BTreeMap::new();
        for desc in &descriptors {
            match desc {
                Descriptor::Database(db) => {
                    namespace.entry(db.id).or_default();
                }
                Descriptor::Schema(sc) => {
                    namespace
                        .entry(sc.parent_id)
                        .or_default()
                        .insert(sc.id, sc.name.clone());
                }
                Descriptor::Table(_) | Descriptor::Type(_) => {}
            }
        }
        SnapshotReader {
            descriptors,
            namespace,
            ..Default::default()
        }
    }

    /// Adds a namespace entry for a schema without a descriptor.
    pub fn with_schema_name(
        mut self,
        database: DescriptorId,
        schema: DescriptorId,
        name: impl Into<String>,
    ) -> SnapshotReader {
        self.namespace
            .entry(database)
            .or_default()
            .insert(schema, name.into());
        self
    }

    pub fn with_roles(mut self, roles: Vec<RoleRecord>) -> SnapshotReader {
        self.roles = roles;
        self
    }

    pub fn with_role_memberships(mut self, memberships: Vec<RoleMembership>) -> SnapshotReader {
        self.memberships = memberships;
        self
    }

    /// The number of namespace reads served so far.
    pub fn schema_name_reads(&self) -> usize {
        self.schema_name_reads.get()
    }
}

impl CatalogReader for SnapshotReader {
    fn all_descriptors(&self) -> Result<Vec<Descriptor>, CollaboratorError> {
        Ok(self.descriptors.clone())
    }

    fn all_databases(&self) -> Result<Vec<DatabaseDescriptor>, CollaboratorError> {
        Ok(self
            .descriptors
            .iter()
            .filter_map(|desc| desc.as_database().cloned())
            .collect())
    }

    fn schema_names(
        &self,
        database: DescriptorId,
    ) -> Result<BTreeMap<DescriptorId, String>, CollaboratorError> {
        self.schema_name_reads.set(self.schema_name_reads.get() + 1);
        Ok(self.namespace.get(&database).cloned().unwrap_or_default())
    }

    fn schema_descriptors(
        &self,
        ids: &[DescriptorId],
    ) -> Result<Vec<SchemaDescriptor>, CollaboratorError> {
        ids.iter()
            .map(|id| {
                self.descriptors
                    .iter()
                    .find_map(|desc| desc.as_schema().filter(|sc| sc.id == *id))
                    .cloned()
                    .ok_or_else(|| CollaboratorError::new(format!("schema {id} has no descriptor")))
            })
            .collect()
    }

    fn roles(&self) -> Result<Vec<RoleRecord>, CollaboratorError> {
        Ok(self.roles.clone())
    }

    fn role_memberships(&self) -> Result<Vec<RoleMembership>, CollaboratorError> {
        Ok(self.memberships.clone())
    }
}
