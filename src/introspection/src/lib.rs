// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Catalog traversal for introspection tables.
//!
//! Introspection tables like `information_schema.tables` expose the
//! structure of the catalog as rows. This crate provides the traversal those
//! tables are built on: given one snapshot of catalog descriptors, it visits
//! databases, schemas, types and tables in a deterministic order, resolves
//! each object's parents, hides what the current principal may not see, and
//! hands every surviving object to a callback. Formatting rows is left to
//! the callback.
//!
//! The pieces, leaf first:
//!
//!   * [`descriptor`]: the records a snapshot is made of.
//!   * [`index::LookupIndex`]: a per-traversal index over one snapshot.
//!   * [`visibility`]: lifecycle and privilege based filtering.
//!   * [`walk::CatalogWalker`]: the traversals themselves.
//!   * [`index::TableResolver`]: on-demand table lookups for callbacks.
//!
//! A traversal never writes to the catalog and caches nothing beyond its own
//! call.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod index;
pub mod reader;
pub mod virtual_schema;
pub mod visibility;
pub mod walk;

pub use crate::config::IntrospectionConfig;
pub use crate::descriptor::{
    CatalogObject, DatabaseDescriptor, Descriptor, DescriptorId, DescriptorState, ObjectKind,
    Privilege, PrivilegeDescriptor, SchemaDescriptor, TableDescriptor, TypeDescriptor,
};
pub use crate::error::{CollaboratorError, IntrospectionError};
pub use crate::index::{LookupIndex, TableResolver};
pub use crate::reader::{CatalogReader, RoleMembership, RoleRecord, SnapshotReader};
pub use crate::virtual_schema::{VirtualSchema, VirtualSchemaRegistry};
pub use crate::visibility::{AccessChecker, RolePrincipal};
pub use crate::walk::{CatalogWalker, ResolvedSchema, SchemaKind, VirtualOpts};
