// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Errors produced while walking the catalog.

use std::error::Error as StdError;
use std::fmt;

use crate::descriptor::{DescriptorId, ObjectKind};

/// An error raised by an external collaborator of the traversal engine, i.e.
/// the snapshot reader or the privilege subsystem.
#[derive(Debug)]
pub struct CollaboratorError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl CollaboratorError {
    /// Constructs an error from a bare message.
    pub fn new(message: impl Into<String>) -> CollaboratorError {
        CollaboratorError {
            message: message.into(),
            source: None,
        }
    }

    /// Constructs an error that wraps an underlying cause.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> CollaboratorError
    where
        E: StdError + Send + Sync + 'static,
    {
        CollaboratorError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The message describing the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for CollaboratorError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| -> &(dyn StdError + 'static) { e.as_ref() })
    }
}

/// The errors a catalog traversal can surface.
///
/// Only [`IntrospectionError::NotFound`] is ever absorbed by the traversal
/// itself, and only where a parent object disappeared between the snapshot
/// and the walk. Every other kind stops the walk.
#[derive(Debug, thiserror::Error)]
pub enum IntrospectionError {
    /// A referenced ID has no descriptor in the current snapshot.
    #[error("{kind} with id {id} does not exist")]
    NotFound { kind: ObjectKind, id: DescriptorId },
    /// The snapshot or the index built from it is inconsistent.
    #[error("internal error: {0}")]
    ConsistencyViolation(String),
    /// The privilege subsystem failed to answer a check.
    #[error("privilege check failed: {0}")]
    PrivilegeCheck(#[source] CollaboratorError),
    /// Reading from the catalog snapshot failed.
    #[error("failed to read catalog: {0}")]
    Read(#[source] CollaboratorError),
}

impl IntrospectionError {
    pub(crate) fn not_found(kind: ObjectKind, id: DescriptorId) -> IntrospectionError {
        IntrospectionError::NotFound { kind, id }
    }

    /// Reports whether this error indicates an expected absence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IntrospectionError::NotFound { .. })
    }

    /// Reports whether this error indicates catalog corruption.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(self, IntrospectionError::ConsistencyViolation(_))
    }
}
