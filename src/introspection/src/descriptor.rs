// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Catalog descriptors.
//!
//! A descriptor is an immutable record describing a database, schema, table
//! or type as of one catalog snapshot. All kinds share one ID space and a
//! small set of common attributes, exposed through [`Descriptor`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use proptest_derive::Arbitrary;
use serde::{Deserialize, Serialize};

/// The ID of a descriptor. Databases, schemas, tables and types share a
/// single ID space.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Arbitrary,
)]
pub struct DescriptorId(pub u32);

impl DescriptorId {
    /// The parent ID recorded by objects without a parent, i.e. databases.
    pub const INVALID: DescriptorId = DescriptorId(0);
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lifecycle state of a descriptor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Arbitrary,
)]
#[serde(rename_all = "kebab-case")]
pub enum DescriptorState {
    /// Fully created and usable.
    Public,
    /// Still being created by a schema change.
    Adding,
    /// Dropped, awaiting garbage collection.
    Dropped,
}

serde_plain::derive_display_from_serialize!(DescriptorState);

/// The kind of a catalog object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    Database,
    Schema,
    Table,
    Type,
}

serde_plain::derive_display_from_serialize!(ObjectKind);

/// A privilege that can be granted on a catalog object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Arbitrary,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Privilege {
    All,
    Create,
    Drop,
    Grant,
    Select,
    Insert,
    Delete,
    Update,
    Usage,
    Zoneconfig,
    Connect,
}

serde_plain::derive_display_from_serialize!(Privilege);

/// The privileges granted on one object, keyed by grantee role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeDescriptor {
    /// The role that owns the object.
    pub owner: Option<String>,
    grants: BTreeMap<String, BTreeSet<Privilege>>,
}

impl PrivilegeDescriptor {
    /// Returns a privilege descriptor owned by `owner` with no grants.
    pub fn owned_by(owner: impl Into<String>) -> PrivilegeDescriptor {
        PrivilegeDescriptor {
            owner: Some(owner.into()),
            grants: BTreeMap::new(),
        }
    }

    /// Grants `privileges` on the object to `grantee`.
    pub fn grant(
        mut self,
        grantee: impl Into<String>,
        privileges: impl IntoIterator<Item = Privilege>,
    ) -> PrivilegeDescriptor {
        self.grants
            .entry(grantee.into())
            .or_default()
            .extend(privileges);
        self
    }

    /// Returns the privileges held directly by `grantee`.
    pub fn privileges_of(&self, grantee: &str) -> impl Iterator<Item = Privilege> + '_ {
        self.grants.get(grantee).into_iter().flatten().copied()
    }

    /// Iterates over every grantee and the privileges it holds.
    pub fn grants(&self) -> impl Iterator<Item = (&str, &BTreeSet<Privilege>)> {
        self.grants.iter().map(|(role, privs)| (role.as_str(), privs))
    }
}

/// A database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    pub id: DescriptorId,
    pub name: String,
    pub state: DescriptorState,
    pub privileges: PrivilegeDescriptor,
}

/// A user-defined schema. The public schema and temporary schemas have no
/// descriptor; they only exist as namespace entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub id: DescriptorId,
    pub name: String,
    pub parent_id: DescriptorId,
    pub state: DescriptorState,
    pub privileges: PrivilegeDescriptor,
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub nullable: bool,
}

/// An outbound foreign key of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    pub name: String,
    pub referenced_table_id: DescriptorId,
    pub referenced_columns: Vec<String>,
}

/// A table, view or sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub id: DescriptorId,
    pub name: String,
    pub parent_id: DescriptorId,
    pub parent_schema_id: DescriptorId,
    pub state: DescriptorState,
    /// Whether the table lives in a session-scoped temporary schema.
    pub temporary: bool,
    pub columns: Vec<ColumnDescriptor>,
    pub foreign_keys: Vec<ForeignKeyReference>,
    pub privileges: PrivilegeDescriptor,
}

/// A user-defined type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub id: DescriptorId,
    pub name: String,
    pub parent_id: DescriptorId,
    pub parent_schema_id: DescriptorId,
    pub state: DescriptorState,
    pub privileges: PrivilegeDescriptor,
}

/// Attributes shared by every descriptor kind.
pub trait CatalogObject: fmt::Debug {
    fn id(&self) -> DescriptorId;
    fn name(&self) -> &str;
    /// The ID of the owning database, or [`DescriptorId::INVALID`] for
    /// databases.
    fn parent_id(&self) -> DescriptorId;
    fn state(&self) -> DescriptorState;
    fn kind(&self) -> ObjectKind;
    fn privileges(&self) -> &PrivilegeDescriptor;

    fn is_public(&self) -> bool {
        self.state() == DescriptorState::Public
    }

    fn is_adding(&self) -> bool {
        self.state() == DescriptorState::Adding
    }

    fn is_dropped(&self) -> bool {
        self.state() == DescriptorState::Dropped
    }
}

macro_rules! impl_catalog_object {
    ($ty:ty, $kind:expr, |$s:ident| $parent:expr) => {
        impl CatalogObject for $ty {
            fn id(&self) -> DescriptorId {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn parent_id(&self) -> DescriptorId {
                let $s = self;
                $parent
            }

            fn state(&self) -> DescriptorState {
                self.state
            }

            fn kind(&self) -> ObjectKind {
                $kind
            }

            fn privileges(&self) -> &PrivilegeDescriptor {
                &self.privileges
            }
        }
    };
}

impl_catalog_object!(DatabaseDescriptor, ObjectKind::Database, |_d| {
    DescriptorId::INVALID
});
impl_catalog_object!(SchemaDescriptor, ObjectKind::Schema, |s| s.parent_id);
impl_catalog_object!(TableDescriptor, ObjectKind::Table, |t| t.parent_id);
impl_catalog_object!(TypeDescriptor, ObjectKind::Type, |t| t.parent_id);

/// A descriptor of any kind, as delivered by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Descriptor {
    Database(DatabaseDescriptor),
    Schema(SchemaDescriptor),
    Table(TableDescriptor),
    Type(TypeDescriptor),
}

impl Descriptor {
    /// Returns the kind-independent view of this descriptor.
    pub fn object(&self) -> &dyn CatalogObject {
        match self {
            Descriptor::Database(d) => d,
            Descriptor::Schema(s) => s,
            Descriptor::Table(t) => t,
            Descriptor::Type(t) => t,
        }
    }

    pub fn id(&self) -> DescriptorId {
        self.object().id()
    }

    pub fn name(&self) -> &str {
        self.object().name()
    }

    pub fn parent_id(&self) -> DescriptorId {
        self.object().parent_id()
    }

    pub fn state(&self) -> DescriptorState {
        self.object().state()
    }

    pub fn kind(&self) -> ObjectKind {
        self.object().kind()
    }

    pub fn as_database(&self) -> Option<&DatabaseDescriptor> {
        match self {
            Descriptor::Database(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_schema(&self) -> Option<&SchemaDescriptor> {
        match self {
            Descriptor::Schema(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableDescriptor> {
        match self {
            Descriptor::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeDescriptor> {
        match self {
            Descriptor::Type(t) => Some(t),
            _ => None,
        }
    }
}

impl From<DatabaseDescriptor> for Descriptor {
    fn from(d: DatabaseDescriptor) -> Descriptor {
        Descriptor::Database(d)
    }
}

impl From<SchemaDescriptor> for Descriptor {
    fn from(s: SchemaDescriptor) -> Descriptor {
        Descriptor::Schema(s)
    }
}

impl From<TableDescriptor> for Descriptor {
    fn from(t: TableDescriptor) -> Descriptor {
        Descriptor::Table(t)
    }
}

impl From<TypeDescriptor> for Descriptor {
    fn from(t: TypeDescriptor) -> Descriptor {
        Descriptor::Type(t)
    }
}
