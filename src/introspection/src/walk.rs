// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Ordered, fail-fast traversal of the catalog.
//!
//! Every traversal hands each visible entity to a caller-supplied callback.
//! Traversals are generic over the callback's error type `E`: an `Err`
//! returned by the callback stops the walk and is returned to the caller
//! untouched, while errors raised by the engine itself are converted into
//! `E` through `From<IntrospectionError>`.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::IntrospectionConfig;
use crate::descriptor::{
    CatalogObject, DatabaseDescriptor, DescriptorId, SchemaDescriptor, TableDescriptor,
    TypeDescriptor,
};
use crate::error::IntrospectionError;
use crate::index::{LookupIndex, TableResolver};
use crate::reader::{CatalogReader, RoleMembership, RoleRecord};
use crate::virtual_schema::{VirtualSchema, VirtualSchemaRegistry};
use crate::visibility::{descriptor_is_visible, user_can_see_descriptor, AccessChecker};

/// Controls where virtual tables are emitted by table traversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualOpts {
    /// Emit the virtual tables once in every traversed database.
    Many,
    /// Emit the virtual tables in the scoped database only.
    CurrentDb,
    /// Do not emit virtual tables.
    Hide,
}

/// The kind of a [`ResolvedSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Temporary,
    Public,
    UserDefined,
    Virtual,
}

/// A schema as seen by [`CatalogWalker::for_each_schema`].
///
/// Schemas come from three places: bare namespace entries without a
/// descriptor (the public schema and temporary schemas), persisted
/// descriptors of user-defined schemas, and compiled-in virtual schemas.
#[derive(Debug, Clone)]
pub enum ResolvedSchema<'a> {
    Temporary { id: DescriptorId, name: String },
    Public { id: DescriptorId, name: String },
    UserDefined(&'a SchemaDescriptor),
    Virtual(&'a VirtualSchema),
}

impl ResolvedSchema<'_> {
    pub fn id(&self) -> DescriptorId {
        match self {
            ResolvedSchema::Temporary { id, .. } | ResolvedSchema::Public { id, .. } => *id,
            ResolvedSchema::UserDefined(desc) => desc.id,
            ResolvedSchema::Virtual(schema) => schema.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ResolvedSchema::Temporary { name, .. } | ResolvedSchema::Public { name, .. } => {
                name.as_str()
            }
            ResolvedSchema::UserDefined(desc) => desc.name.as_str(),
            ResolvedSchema::Virtual(schema) => schema.name(),
        }
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            ResolvedSchema::Temporary { .. } => SchemaKind::Temporary,
            ResolvedSchema::Public { .. } => SchemaKind::Public,
            ResolvedSchema::UserDefined(_) => SchemaKind::UserDefined,
            ResolvedSchema::Virtual(_) => SchemaKind::Virtual,
        }
    }

    /// The descriptor of a user-defined schema.
    pub fn descriptor(&self) -> Option<&SchemaDescriptor> {
        match self {
            ResolvedSchema::UserDefined(desc) => Some(*desc),
            _ => None,
        }
    }
}

/// Walks one catalog snapshot on behalf of one principal.
///
/// A walker holds no state of its own. Each traversal builds whatever index
/// it needs from the reader and drops it on return, so nothing is cached
/// across calls.
#[derive(Debug)]
pub struct CatalogWalker<'a, R: ?Sized, C: ?Sized> {
    reader: &'a R,
    checker: &'a C,
    registry: &'a VirtualSchemaRegistry,
    config: &'a IntrospectionConfig,
}

impl<'a, R, C> CatalogWalker<'a, R, C>
where
    R: CatalogReader + ?Sized,
    C: AccessChecker + ?Sized,
{
    pub fn new(
        reader: &'a R,
        checker: &'a C,
        registry: &'a VirtualSchemaRegistry,
        config: &'a IntrospectionConfig,
    ) -> Self {
        CatalogWalker {
            reader,
            checker,
            registry,
            config,
        }
    }

    /// Builds a lookup index over the current snapshot.
    pub fn lookup_index(
        &self,
        scope: Option<&DatabaseDescriptor>,
    ) -> Result<LookupIndex, IntrospectionError> {
        let descs = self
            .reader
            .all_descriptors()
            .map_err(IntrospectionError::Read)?;
        Ok(LookupIndex::new(descs, scope, self.config))
    }

    /// Returns the namespace entries of the schemas in `scope`, or of every
    /// database when there is no scope.
    pub fn schema_names(
        &self,
        scope: Option<&DatabaseDescriptor>,
    ) -> Result<BTreeMap<DescriptorId, String>, IntrospectionError> {
        if let Some(db) = scope {
            return self
                .reader
                .schema_names(db.id)
                .map_err(IntrospectionError::Read);
        }
        let mut names = BTreeMap::new();
        let dbs = self
            .reader
            .all_databases()
            .map_err(IntrospectionError::Read)?;
        for db in dbs {
            let schemas = self
                .reader
                .schema_names(db.id)
                .map_err(IntrospectionError::Read)?;
            names.extend(schemas);
        }
        Ok(names)
    }

    /// Calls `f` with `scope` or, without a scope, with every database in
    /// storage order. When `requires_privileges` is set, only databases the
    /// principal can see are visited.
    #[tracing::instrument(level = "debug", skip(self, scope, f))]
    pub fn for_each_database<E, F>(
        &self,
        scope: Option<&DatabaseDescriptor>,
        requires_privileges: bool,
        mut f: F,
    ) -> Result<(), E>
    where
        E: From<IntrospectionError>,
        F: FnMut(&DatabaseDescriptor) -> Result<(), E>,
    {
        if let Some(db) = scope {
            return f(db);
        }
        let dbs = self
            .reader
            .all_databases()
            .map_err(IntrospectionError::Read)?;
        for db in &dbs {
            if requires_privileges && !user_can_see_descriptor(self.checker, db, None, false)? {
                continue;
            }
            f(db)?;
        }
        Ok(())
    }

    /// Calls `f` with every schema of `database` the principal can see, in
    /// name order. Virtual schemas are included.
    #[tracing::instrument(level = "debug", skip_all, fields(database = %database.name))]
    pub fn for_each_schema<E, F>(&self, database: &DatabaseDescriptor, mut f: F) -> Result<(), E>
    where
        E: From<IntrospectionError>,
        F: FnMut(&ResolvedSchema<'_>) -> Result<(), E>,
    {
        let names = self
            .reader
            .schema_names(database.id)
            .map_err(IntrospectionError::Read)?;

        let mut schemas = Vec::with_capacity(names.len() + self.registry.schemas().len());
        let mut user_defined_ids = Vec::new();
        for (id, name) in names {
            if self.config.is_temporary_schema(&name) {
                schemas.push(ResolvedSchema::Temporary { id, name });
            } else if self.config.is_public_schema(&name) {
                schemas.push(ResolvedSchema::Public { id, name });
            } else {
                user_defined_ids.push(id);
            }
        }

        let user_defined = self
            .reader
            .schema_descriptors(&user_defined_ids)
            .map_err(IntrospectionError::Read)?;
        for desc in &user_defined {
            if user_can_see_descriptor(self.checker, desc, Some(database), false)? {
                schemas.push(ResolvedSchema::UserDefined(desc));
            }
        }

        schemas.extend(self.registry.schemas().iter().map(ResolvedSchema::Virtual));
        schemas.sort_by(|a, b| a.name().cmp(b.name()));

        for schema in &schemas {
            f(schema)?;
        }
        Ok(())
    }

    /// Calls `f` with every type the principal can see, with its database
    /// and schema name, ordered by type name.
    pub fn for_each_type<E, F>(&self, scope: Option<&DatabaseDescriptor>, mut f: F) -> Result<(), E>
    where
        E: From<IntrospectionError>,
        F: FnMut(&DatabaseDescriptor, &str, &TypeDescriptor) -> Result<(), E>,
    {
        self.for_each_type_with_lookup(scope, false, |db, schema, typ, _| f(db, schema, typ))
    }

    /// Like [`CatalogWalker::for_each_type`], but includes types still being
    /// added when `allow_adding` is set and hands `f` a resolver for
    /// on-demand table lookups.
    ///
    /// Types whose database is missing from the snapshot were orphaned by a
    /// concurrent drop and are skipped.
    #[tracing::instrument(level = "debug", skip(self, scope, f))]
    pub fn for_each_type_with_lookup<E, F>(
        &self,
        scope: Option<&DatabaseDescriptor>,
        allow_adding: bool,
        mut f: F,
    ) -> Result<(), E>
    where
        E: From<IntrospectionError>,
        F: FnMut(&DatabaseDescriptor, &str, &TypeDescriptor, &TableResolver<'_>) -> Result<(), E>,
    {
        let index = self.lookup_index(scope)?;
        let resolver = index.resolver();
        for &id in index.type_ids() {
            let typ = index.typ(id)?;
            if typ.is_dropped() {
                continue;
            }
            let Ok(db) = index.database(typ.parent_id) else {
                debug!(type_name = %typ.name, database = %typ.parent_id, "skipping orphaned type");
                continue;
            };
            let schema = index.schema_name(typ.parent_schema_id)?;
            if !user_can_see_descriptor(self.checker, typ, Some(db), allow_adding)? {
                continue;
            }
            f(db, schema, typ, &resolver)?;
        }
        Ok(())
    }

    /// Calls `f` with every public table the principal can see, with its
    /// database and schema name. See
    /// [`CatalogWalker::for_each_table_with_lookup`].
    pub fn for_each_table<E, F>(
        &self,
        scope: Option<&DatabaseDescriptor>,
        virtual_opts: VirtualOpts,
        mut f: F,
    ) -> Result<(), E>
    where
        E: From<IntrospectionError>,
        F: FnMut(&DatabaseDescriptor, &str, &TableDescriptor) -> Result<(), E>,
    {
        self.walk_tables(scope, virtual_opts, false, |db, schema, table, _| {
            f(db, schema, table)
        })
    }

    /// Like [`CatalogWalker::for_each_table`], but also includes tables that
    /// are still being added.
    pub fn for_each_table_all<E, F>(
        &self,
        scope: Option<&DatabaseDescriptor>,
        virtual_opts: VirtualOpts,
        mut f: F,
    ) -> Result<(), E>
    where
        E: From<IntrospectionError>,
        F: FnMut(&DatabaseDescriptor, &str, &TableDescriptor) -> Result<(), E>,
    {
        self.walk_tables(scope, virtual_opts, true, |db, schema, table, _| {
            f(db, schema, table)
        })
    }

    /// Calls `f` with every public table the principal can see, together
    /// with a resolver that looks up other tables of the same snapshot.
    /// Callers that render objects spanning several tables, like foreign
    /// keys, use the resolver to read the referenced table.
    ///
    /// Virtual tables come first, in the order the registry declares them.
    /// Persisted tables follow, ordered by name and then ID.
    pub fn for_each_table_with_lookup<E, F>(
        &self,
        scope: Option<&DatabaseDescriptor>,
        virtual_opts: VirtualOpts,
        f: F,
    ) -> Result<(), E>
    where
        E: From<IntrospectionError>,
        F: FnMut(&DatabaseDescriptor, &str, &TableDescriptor, &TableResolver<'_>) -> Result<(), E>,
    {
        self.walk_tables(scope, virtual_opts, false, f)
    }

    /// Like [`CatalogWalker::for_each_table_with_lookup`], but also includes
    /// tables that are still being added.
    pub fn for_each_table_all_with_lookup<E, F>(
        &self,
        scope: Option<&DatabaseDescriptor>,
        virtual_opts: VirtualOpts,
        f: F,
    ) -> Result<(), E>
    where
        E: From<IntrospectionError>,
        F: FnMut(&DatabaseDescriptor, &str, &TableDescriptor, &TableResolver<'_>) -> Result<(), E>,
    {
        self.walk_tables(scope, virtual_opts, true, f)
    }

    #[tracing::instrument(level = "debug", skip(self, scope, f))]
    fn walk_tables<E, F>(
        &self,
        scope: Option<&DatabaseDescriptor>,
        virtual_opts: VirtualOpts,
        allow_adding: bool,
        mut f: F,
    ) -> Result<(), E>
    where
        E: From<IntrospectionError>,
        F: FnMut(&DatabaseDescriptor, &str, &TableDescriptor, &TableResolver<'_>) -> Result<(), E>,
    {
        let mut index = self.lookup_index(scope)?;

        match virtual_opts {
            VirtualOpts::Many => {
                let resolver = index.resolver();
                for &db_id in index.database_ids() {
                    let db = index.database(db_id)?;
                    if !descriptor_is_visible(db, false) {
                        continue;
                    }
                    self.emit_virtual_tables(db, &resolver, &mut f)?;
                }
            }
            VirtualOpts::CurrentDb => match scope {
                Some(db) => self.emit_virtual_tables(db, &index.resolver(), &mut f)?,
                None => debug!("no current database; omitting virtual tables"),
            },
            VirtualOpts::Hide => {}
        }

        let table_ids = index.table_ids().to_vec();
        for id in table_ids {
            let (db_id, schema_id, temporary) = {
                let table = index.table(id)?;
                let Ok(db) = index.database(table.parent_id) else {
                    debug!(table = %table.name, database = %table.parent_id, "skipping orphaned table");
                    continue;
                };
                if table.is_dropped()
                    || !user_can_see_descriptor(self.checker, table, Some(db), allow_adding)?
                {
                    continue;
                }
                if index.cached_schema_name(table.parent_schema_id).is_none() && !table.temporary {
                    return Err(IntrospectionError::ConsistencyViolation(format!(
                        "schema id {} not found",
                        table.parent_schema_id
                    ))
                    .into());
                }
                (db.id, table.parent_schema_id, table.temporary)
            };

            match index.resolve_schema_name(self.reader, db_id, schema_id, temporary) {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {
                    debug!(table = %id, schema = %schema_id, "skipping table in dropped temporary schema");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let table = index.table(id)?;
            let db = index.database(db_id)?;
            let schema = index.schema_name(schema_id)?;
            f(db, schema, table, &index.resolver())?;
        }
        Ok(())
    }

    fn emit_virtual_tables<E, F>(
        &self,
        db: &DatabaseDescriptor,
        resolver: &TableResolver<'_>,
        f: &mut F,
    ) -> Result<(), E>
    where
        F: FnMut(&DatabaseDescriptor, &str, &TableDescriptor, &TableResolver<'_>) -> Result<(), E>,
    {
        for (schema, table) in self.registry.tables() {
            f(db, schema, table, resolver)?;
        }
        Ok(())
    }

    /// Calls `f` with every role and user.
    pub fn for_each_role<E, F>(&self, mut f: F) -> Result<(), E>
    where
        E: From<IntrospectionError>,
        F: FnMut(&RoleRecord) -> Result<(), E>,
    {
        let roles = self.reader.roles().map_err(IntrospectionError::Read)?;
        for role in &roles {
            f(role)?;
        }
        Ok(())
    }

    /// Calls `f` with every role membership.
    pub fn for_each_role_membership<E, F>(&self, mut f: F) -> Result<(), E>
    where
        E: From<IntrospectionError>,
        F: FnMut(&RoleMembership) -> Result<(), E>,
    {
        let memberships = self
            .reader
            .role_memberships()
            .map_err(IntrospectionError::Read)?;
        for membership in &memberships {
            f(membership)?;
        }
        Ok(())
    }
}
