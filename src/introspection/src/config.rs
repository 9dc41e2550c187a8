// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Naming conventions the traversal engine depends on.

use serde::{Deserialize, Serialize};

use crate::descriptor::DescriptorId;

/// Configuration of the introspection engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntrospectionConfig {
    /// Schemas whose name starts with this prefix are session-scoped
    /// temporary schemas.
    pub temporary_schema_prefix: String,
    /// The name of the implicit schema present in every database.
    pub public_schema_name: String,
    /// The well-known ID of the implicit public schema.
    pub public_schema_id: DescriptorId,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        IntrospectionConfig {
            temporary_schema_prefix: "pg_temp".into(),
            public_schema_name: "public".into(),
            public_schema_id: DescriptorId(29),
        }
    }
}

impl IntrospectionConfig {
    /// Parses a configuration from a JSON document. Omitted fields take their
    /// default values.
    pub fn from_json(json: &str) -> Result<IntrospectionConfig, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reports whether `name` names a temporary schema.
    pub fn is_temporary_schema(&self, name: &str) -> bool {
        name.starts_with(&self.temporary_schema_prefix)
    }

    /// Reports whether `name` names the public schema.
    pub fn is_public_schema(&self, name: &str) -> bool {
        name == self.public_schema_name
    }
}
