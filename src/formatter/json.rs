use std::fmt::Display;

use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, RoleBinding, RoleRef, Subject};
use serde::Serialize;

use crate::types::Action;

#[derive(Debug)]
pub struct Json {
    export: Export,
}

#[derive(Debug, Serialize)]
struct Export {
    #[serde(rename = "roleBindings", skip_serializing_if = "Option::is_none")]
    role_bindings: Option<Vec<BindingData>>,
    #[serde(rename = "clusterRoleBindings", skip_serializing_if = "Option::is_none")]
    cluster_role_bindings: Option<Vec<BindingData>>,
}

#[derive(Debug, Serialize)]
struct BindingData {
    name: String,
    #[serde(rename = "roleRef")]
    role_ref: RoleRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    subjects: Option<Vec<Subject>>,
}

impl From<RoleBinding> for BindingData {
    fn from(binding: RoleBinding) -> Self {
        Self {
            name: binding.metadata.name.unwrap_or_default(),
            role_ref: binding.role_ref,
            subjects: binding.subjects.filter(|subjects| !subjects.is_empty()),
        }
    }
}

impl From<ClusterRoleBinding> for BindingData {
    fn from(binding: ClusterRoleBinding) -> Self {
        Self {
            name: binding.metadata.name.unwrap_or_default(),
            role_ref: binding.role_ref,
            subjects: binding.subjects.filter(|subjects| !subjects.is_empty()),
        }
    }
}

impl Json {
    /// The `roleBindings` key is omitted for non-resource URL actions, which
    /// can only be granted through ClusterRoles; empty sections are omitted
    /// entirely.
    pub fn new(
        action: Action,
        role_bindings: Vec<RoleBinding>,
        cluster_role_bindings: Vec<ClusterRoleBinding>,
    ) -> Self {
        let role_bindings = (!action.resource.is_empty() && !role_bindings.is_empty()).then(|| {
            role_bindings
                .into_iter()
                .map(BindingData::from)
                .collect::<Vec<BindingData>>()
        });
        let cluster_role_bindings = (!cluster_role_bindings.is_empty()).then(|| {
            cluster_role_bindings
                .into_iter()
                .map(BindingData::from)
                .collect::<Vec<BindingData>>()
        });
        Self {
            export: Export {
                role_bindings,
                cluster_role_bindings,
            },
        }
    }
}

impl Display for Json {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(&self.export) {
            Ok(output) => f.write_str(&output),
            Err(_e) => Err(std::fmt::Error),
        }
    }
}
