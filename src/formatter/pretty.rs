use std::fmt::Display;

use comfy_table::{presets::NOTHING, Attribute, Cell, Table};
use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, RoleBinding, Subject};

use crate::types::Action;

/// Tabular report of the bindings granting an action. Wide mode adds a ROLE
/// column with the referenced role as `<Kind>/<Name>`.
#[derive(Debug)]
pub struct Pretty {
    action: Action,
    role_bindings: Vec<RoleBinding>,
    cluster_role_bindings: Vec<ClusterRoleBinding>,
    wide: bool,
}

impl Pretty {
    pub fn new(
        action: Action,
        role_bindings: Vec<RoleBinding>,
        cluster_role_bindings: Vec<ClusterRoleBinding>,
        wide: bool,
    ) -> Self {
        Self {
            action,
            role_bindings,
            cluster_role_bindings,
            wide,
        }
    }

    fn role_bindings_table(&self) -> Table {
        let columns: &[&str] = if self.wide {
            &["ROLEBINDING", "ROLE", "NAMESPACE", "SUBJECT", "TYPE", "SA-NAMESPACE"]
        } else {
            &["ROLEBINDING", "NAMESPACE", "SUBJECT", "TYPE", "SA-NAMESPACE"]
        };
        let mut table = new_section(columns);
        for binding in &self.role_bindings {
            let name = binding.metadata.name.as_deref().unwrap_or_default();
            let namespace = binding.metadata.namespace.as_deref().unwrap_or_default();
            for subject in binding.subjects.as_deref().unwrap_or_default() {
                let mut row = vec![name.to_string()];
                if self.wide {
                    row.push(format!(
                        "{}/{}",
                        binding.role_ref.kind, binding.role_ref.name
                    ));
                }
                row.push(namespace.to_string());
                row.extend(subject_columns(subject));
                table.add_row(row);
            }
        }
        table
    }

    fn cluster_role_bindings_table(&self) -> Table {
        let columns: &[&str] = if self.wide {
            &["CLUSTERROLEBINDING", "ROLE", "SUBJECT", "TYPE", "SA-NAMESPACE"]
        } else {
            &["CLUSTERROLEBINDING", "SUBJECT", "TYPE", "SA-NAMESPACE"]
        };
        let mut table = new_section(columns);
        for binding in &self.cluster_role_bindings {
            let name = binding.metadata.name.as_deref().unwrap_or_default();
            for subject in binding.subjects.as_deref().unwrap_or_default() {
                let mut row = vec![name.to_string()];
                if self.wide {
                    row.push(format!(
                        "{}/{}",
                        binding.role_ref.kind, binding.role_ref.name
                    ));
                }
                row.extend(subject_columns(subject));
                table.add_row(row);
            }
        }
        table
    }
}

fn new_section(columns: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(
        columns
            .iter()
            .map(|c| Cell::new(c).add_attribute(Attribute::Bold))
            .collect::<Vec<Cell>>(),
    );
    table
}

fn subject_columns(subject: &Subject) -> Vec<String> {
    vec![
        subject.name.clone(),
        subject.kind.clone(),
        subject.namespace.clone().unwrap_or_default(),
    ]
}

impl Display for Pretty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Non-resource URL permissions can only be granted through
        // ClusterRoles, so the RoleBindings section is skipped for them.
        if self.action.non_resource_url.is_empty() {
            if self.role_bindings.is_empty() {
                writeln!(
                    f,
                    "No subjects found with permissions to {} assigned through RoleBindings",
                    self.action
                )?;
            } else {
                writeln!(f, "{}", self.role_bindings_table())?;
            }
            writeln!(f)?;
        }

        if self.cluster_role_bindings.is_empty() {
            write!(
                f,
                "No subjects found with permissions to {} assigned through ClusterRoleBindings",
                self.action
            )
        } else {
            write!(f, "{}", self.cluster_role_bindings_table())
        }
    }
}
