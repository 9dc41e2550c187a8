// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Decides which descriptors the current principal may see.

use std::collections::BTreeSet;

use crate::descriptor::{CatalogObject, DatabaseDescriptor, Privilege};
use crate::error::{CollaboratorError, IntrospectionError};

/// Privilege checks on behalf of the principal issuing the introspection
/// query.
pub trait AccessChecker {
    /// Reports whether the principal holds any privilege on `object`.
    fn has_any_privilege(&self, object: &dyn CatalogObject) -> Result<bool, CollaboratorError>;

    /// Reports whether the principal holds `privilege` on `object`.
    fn has_privilege(
        &self,
        object: &dyn CatalogObject,
        privilege: Privilege,
    ) -> Result<bool, CollaboratorError>;
}

/// A principal identified by a role name, together with every role it is
/// transitively a member of.
#[derive(Debug, Clone)]
pub struct RolePrincipal {
    roles: BTreeSet<String>,
}

impl RolePrincipal {
    /// The role whose members bypass all privilege checks.
    pub const ADMIN_ROLE: &'static str = "admin";

    /// Creates a principal for `role` with no further memberships.
    pub fn new(role: impl Into<String>) -> RolePrincipal {
        RolePrincipal {
            roles: BTreeSet::from([role.into()]),
        }
    }

    /// Adds a role the principal is a member of.
    pub fn member_of(mut self, role: impl Into<String>) -> RolePrincipal {
        self.roles.insert(role.into());
        self
    }

    fn is_admin(&self) -> bool {
        self.roles.contains(Self::ADMIN_ROLE)
    }

    fn owns(&self, object: &dyn CatalogObject) -> bool {
        object
            .privileges()
            .owner
            .as_ref()
            .map_or(false, |owner| self.roles.contains(owner))
    }

    fn held<'a>(
        &'a self,
        object: &'a dyn CatalogObject,
    ) -> impl Iterator<Item = Privilege> + 'a {
        let privileges = object.privileges();
        self.roles
            .iter()
            .flat_map(move |role| privileges.privileges_of(role))
    }
}

impl AccessChecker for RolePrincipal {
    fn has_any_privilege(&self, object: &dyn CatalogObject) -> Result<bool, CollaboratorError> {
        if self.is_admin() || self.owns(object) {
            return Ok(true);
        }
        Ok(self.held(object).next().is_some())
    }

    fn has_privilege(
        &self,
        object: &dyn CatalogObject,
        privilege: Privilege,
    ) -> Result<bool, CollaboratorError> {
        if self.is_admin() || self.owns(object) {
            return Ok(true);
        }
        Ok(self
            .held(object)
            .any(|held| held == privilege || held == Privilege::All))
    }
}

/// Reports whether a descriptor's lifecycle state allows it to be exposed.
/// Dropped descriptors are never visible; descriptors still being added are
/// visible only when `allow_adding` is set.
pub fn descriptor_is_visible(desc: &dyn CatalogObject, allow_adding: bool) -> bool {
    desc.is_public() || (allow_adding && desc.is_adding())
}

/// Reports whether `checker` may see `desc`.
///
/// The descriptor must first be visible by state. It is then visible if the
/// principal holds any privilege on it or, when the parent database is
/// known, holds CONNECT on that database. CONNECT exposes the existence of
/// the database's objects, not their contents.
pub fn user_can_see_descriptor<C>(
    checker: &C,
    desc: &dyn CatalogObject,
    parent_database: Option<&DatabaseDescriptor>,
    allow_adding: bool,
) -> Result<bool, IntrospectionError>
where
    C: AccessChecker + ?Sized,
{
    if !descriptor_is_visible(desc, allow_adding) {
        return Ok(false);
    }
    if checker
        .has_any_privilege(desc)
        .map_err(IntrospectionError::PrivilegeCheck)?
    {
        return Ok(true);
    }
    match parent_database {
        Some(db) => checker
            .has_privilege(db, Privilege::Connect)
            .map_err(IntrospectionError::PrivilegeCheck),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::descriptor::{
        DescriptorId, DescriptorState, PrivilegeDescriptor, SchemaDescriptor,
    };

    fn database(privileges: PrivilegeDescriptor) -> DatabaseDescriptor {
        DatabaseDescriptor {
            id: DescriptorId(50),
            name: "shop".into(),
            state: DescriptorState::Public,
            privileges,
        }
    }

    fn schema(state: DescriptorState, privileges: PrivilegeDescriptor) -> SchemaDescriptor {
        SchemaDescriptor {
            id: DescriptorId(51),
            name: "sales".into(),
            parent_id: DescriptorId(50),
            state,
            privileges,
        }
    }

    #[test]
    fn state_gates_visibility() {
        let privs = PrivilegeDescriptor::default();
        let public = schema(DescriptorState::Public, privs.clone());
        let adding = schema(DescriptorState::Adding, privs.clone());
        let dropped = schema(DescriptorState::Dropped, privs);
        assert!(descriptor_is_visible(&public, false));
        assert!(!descriptor_is_visible(&adding, false));
        assert!(descriptor_is_visible(&adding, true));
        assert!(!descriptor_is_visible(&dropped, true));
    }

    #[test]
    fn dropped_hidden_even_from_admin() {
        let admin = RolePrincipal::new("root").member_of(RolePrincipal::ADMIN_ROLE);
        let dropped = schema(DescriptorState::Dropped, PrivilegeDescriptor::default());
        assert!(!user_can_see_descriptor(&admin, &dropped, None, true).unwrap());
    }

    #[test]
    fn visible_via_object_privilege() {
        let alice = RolePrincipal::new("alice");
        let sc = schema(
            DescriptorState::Public,
            PrivilegeDescriptor::owned_by("root").grant("alice", [Privilege::Usage]),
        );
        assert!(user_can_see_descriptor(&alice, &sc, None, false).unwrap());
        assert!(!user_can_see_descriptor(&RolePrincipal::new("bob"), &sc, None, false).unwrap());
    }

    #[test]
    fn visible_via_role_membership_and_ownership() {
        let sc = schema(
            DescriptorState::Public,
            PrivilegeDescriptor::owned_by("owners").grant("readers", [Privilege::Select]),
        );
        let reader = RolePrincipal::new("carol").member_of("readers");
        let owner = RolePrincipal::new("dave").member_of("owners");
        assert!(user_can_see_descriptor(&reader, &sc, None, false).unwrap());
        assert!(user_can_see_descriptor(&owner, &sc, None, false).unwrap());
    }

    #[test]
    fn visible_via_parent_connect() {
        let bob = RolePrincipal::new("bob");
        let sc = schema(DescriptorState::Public, PrivilegeDescriptor::owned_by("root"));
        let db = database(PrivilegeDescriptor::owned_by("root").grant("bob", [Privilege::Connect]));
        assert!(!user_can_see_descriptor(&bob, &sc, None, false).unwrap());
        assert!(user_can_see_descriptor(&bob, &sc, Some(&db), false).unwrap());

        // A non-CONNECT privilege on the parent is not enough.
        let db = database(PrivilegeDescriptor::owned_by("root").grant("bob", [Privilege::Create]));
        assert!(!user_can_see_descriptor(&bob, &sc, Some(&db), false).unwrap());

        let db = database(PrivilegeDescriptor::owned_by("root").grant("bob", [Privilege::All]));
        assert!(user_can_see_descriptor(&bob, &sc, Some(&db), false).unwrap());
    }

    #[derive(Default)]
    struct FailingChecker {
        calls: Cell<usize>,
    }

    impl AccessChecker for FailingChecker {
        fn has_any_privilege(&self, _: &dyn CatalogObject) -> Result<bool, CollaboratorError> {
            self.calls.set(self.calls.get() + 1);
            Err(CollaboratorError::new("role cache unavailable"))
        }

        fn has_privilege(
            &self,
            _: &dyn CatalogObject,
            _: Privilege,
        ) -> Result<bool, CollaboratorError> {
            unreachable!("any-privilege check fails first")
        }
    }

    #[test]
    fn privilege_failure_propagates() {
        let checker = FailingChecker::default();
        let sc = schema(DescriptorState::Public, PrivilegeDescriptor::default());
        let err = user_can_see_descriptor(&checker, &sc, None, false).unwrap_err();
        assert!(matches!(err, IntrospectionError::PrivilegeCheck(_)));
        assert_eq!(checker.calls.get(), 1);

        // Invisible descriptors never reach the privilege subsystem.
        let dropped = schema(DescriptorState::Dropped, PrivilegeDescriptor::default());
        assert!(!user_can_see_descriptor(&checker, &dropped, None, false).unwrap());
        assert_eq!(checker.calls.get(), 1);
    }
}
