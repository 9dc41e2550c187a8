// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! An index over one catalog snapshot.
//!
//! The index partitions an unordered descriptor snapshot by kind and fixes a
//! deterministic emission order for tables and types: by name, then by ID.
//! Introspection rows must be stable across repeated queries in a
//! transaction, and snapshots make no promise about their own order.
//!
//! The schema name map is the only mutable part. Temporary schemas have no
//! descriptor and are not in the initial map; their names are fetched on
//! demand and cached for the lifetime of the index.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use tracing::debug;

use crate::config::IntrospectionConfig;
use crate::descriptor::{
    DatabaseDescriptor, Descriptor, DescriptorId, ObjectKind, TableDescriptor, TypeDescriptor,
};
use crate::error::IntrospectionError;
use crate::reader::CatalogReader;

/// Descriptors of one snapshot, indexed by kind and ID.
#[derive(Debug)]
pub struct LookupIndex {
    databases: BTreeMap<DescriptorId, DatabaseDescriptor>,
    /// IDs of the traversed databases, in snapshot order.
    database_ids: Vec<DescriptorId>,
    schema_names: BTreeMap<DescriptorId, String>,
    /// Databases whose namespace has been fetched into `schema_names`.
    fetched_namespaces: BTreeSet<DescriptorId>,
    tables: BTreeMap<DescriptorId, TableDescriptor>,
    /// IDs of the traversed tables, ordered by (name, ID).
    table_ids: Vec<DescriptorId>,
    types: BTreeMap<DescriptorId, TypeDescriptor>,
    /// IDs of the traversed types, ordered by (name, ID).
    type_ids: Vec<DescriptorId>,
}

impl LookupIndex {
    /// Builds an index from `descriptors`.
    ///
    /// Every database, table and type of the snapshot is indexed, so parent
    /// and reference lookups can reach across databases. With a `scope`,
    /// only that database and its tables and types are traversed, and only
    /// its schema names are cached.
    pub fn new(
        descriptors: Vec<Descriptor>,
        scope: Option<&DatabaseDescriptor>,
        config: &IntrospectionConfig,
    ) -> LookupIndex {
        let in_scope = |db: DescriptorId| scope.map_or(true, |scope| scope.id == db);

        let mut databases = BTreeMap::new();
        let mut database_ids = Vec::new();
        let mut schema_names = BTreeMap::new();
        schema_names.insert(config.public_schema_id, config.public_schema_name.clone());
        let mut tables = BTreeMap::new();
        let mut types = BTreeMap::new();
        for desc in descriptors {
            match desc {
                Descriptor::Database(db) => {
                    let id = db.id;
                    if databases.insert(id, db).is_none() && in_scope(id) {
                        database_ids.push(id);
                    }
                }
                Descriptor::Schema(sc) => {
                    if in_scope(sc.parent_id) {
                        schema_names.insert(sc.id, sc.name);
                    }
                }
                Descriptor::Table(tb) => {
                    tables.insert(tb.id, tb);
                }
                Descriptor::Type(typ) => {
                    types.insert(typ.id, typ);
                }
            }
        }

        let table_ids = tables
            .values()
            .filter(|tb| in_scope(tb.parent_id))
            .sorted_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)))
            .map(|tb| tb.id)
            .collect();
        let type_ids = types
            .values()
            .filter(|typ| in_scope(typ.parent_id))
            .sorted_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)))
            .map(|typ| typ.id)
            .collect();

        LookupIndex {
            databases,
            database_ids,
            schema_names,
            fetched_namespaces: BTreeSet::new(),
            tables,
            table_ids,
            types,
            type_ids,
        }
    }

    /// IDs of the traversed databases, in snapshot order.
    pub fn database_ids(&self) -> &[DescriptorId] {
        &self.database_ids
    }

    /// IDs of the traversed tables, ordered by name and then ID.
    pub fn table_ids(&self) -> &[DescriptorId] {
        &self.table_ids
    }

    /// IDs of the traversed types, ordered by name and then ID.
    pub fn type_ids(&self) -> &[DescriptorId] {
        &self.type_ids
    }

    pub fn database(&self, id: DescriptorId) -> Result<&DatabaseDescriptor, IntrospectionError> {
        self.databases
            .get(&id)
            .ok_or_else(|| IntrospectionError::not_found(ObjectKind::Database, id))
    }

    pub fn table(&self, id: DescriptorId) -> Result<&TableDescriptor, IntrospectionError> {
        self.tables
            .get(&id)
            .ok_or_else(|| IntrospectionError::not_found(ObjectKind::Table, id))
    }

    pub fn typ(&self, id: DescriptorId) -> Result<&TypeDescriptor, IntrospectionError> {
        self.types
            .get(&id)
            .ok_or_else(|| IntrospectionError::not_found(ObjectKind::Type, id))
    }

    /// Returns the cached name of schema `id`, if known.
    pub fn cached_schema_name(&self, id: DescriptorId) -> Option<&str> {
        self.schema_names.get(&id).map(String::as_str)
    }

    /// Returns the name of schema `id`, failing if it is not cached.
    pub fn schema_name(&self, id: DescriptorId) -> Result<&str, IntrospectionError> {
        self.cached_schema_name(id)
            .ok_or_else(|| IntrospectionError::not_found(ObjectKind::Schema, id))
    }

    /// Fetches the namespace of `database` and caches every schema name not
    /// already known. Cached names are never replaced. Returns the number of
    /// newly cached names.
    pub fn load_schema_names<R>(
        &mut self,
        reader: &R,
        database: DescriptorId,
    ) -> Result<usize, IntrospectionError>
    where
        R: CatalogReader + ?Sized,
    {
        let names = reader
            .schema_names(database)
            .map_err(IntrospectionError::Read)?;
        self.fetched_namespaces.insert(database);
        let mut added = 0;
        for (id, name) in names {
            if let Entry::Vacant(e) = self.schema_names.entry(id) {
                e.insert(name);
                added += 1;
            }
        }
        debug!(%database, added, "loaded schema names");
        Ok(added)
    }

    /// Resolves the name of schema `id`, which lives in `database`.
    ///
    /// Only temporary schemas may be missing from the cache. For those the
    /// namespace of `database` is read at most once per index and cached; any
    /// name still unknown afterwards is an [`IntrospectionError::NotFound`].
    pub fn resolve_schema_name<R>(
        &mut self,
        reader: &R,
        database: DescriptorId,
        id: DescriptorId,
        temporary: bool,
    ) -> Result<&str, IntrospectionError>
    where
        R: CatalogReader + ?Sized,
    {
        if temporary
            && !self.schema_names.contains_key(&id)
            && !self.fetched_namespaces.contains(&database)
        {
            self.load_schema_names(reader, database)?;
        }
        self.schema_name(id)
    }

    /// Returns a resolver for on-demand table lookups against this index.
    pub fn resolver(&self) -> TableResolver<'_> {
        TableResolver {
            tables: &self.tables,
        }
    }
}

/// Looks up tables by ID within one snapshot.
///
/// The resolver performs no visibility filtering. It answers whether a table
/// exists in the snapshot; deciding what to expose is up to the caller.
#[derive(Debug, Clone, Copy)]
pub struct TableResolver<'a> {
    tables: &'a BTreeMap<DescriptorId, TableDescriptor>,
}

impl<'a> TableResolver<'a> {
    pub fn get_table_by_id(&self, id: DescriptorId) -> Result<&'a TableDescriptor, IntrospectionError> {
        self.tables
            .get(&id)
            .ok_or_else(|| IntrospectionError::not_found(ObjectKind::Table, id))
    }
}
