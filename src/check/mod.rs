pub mod access;
pub mod namespace;

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::debug;

use crate::discovery;
use crate::matcher;
use crate::types::{Action, GroupResource, ResolvedAction};

use access::AccessChecker;
use namespace::NamespaceValidator;

/// RoleRef kind naming a namespaced Role.
pub const ROLE_KIND: &str = "Role";
/// RoleRef kind naming a cluster-wide ClusterRole.
pub const CLUSTER_ROLE_KIND: &str = "ClusterRole";

/// Resolves an [`Action`] and walks the cluster's RBAC state to find the
/// bindings that grant it.
pub struct WhoCan {
    client: Client,
    access: AccessChecker,
    namespaces: NamespaceValidator,
}

impl WhoCan {
    pub fn new(client: Client) -> Self {
        Self {
            access: AccessChecker::new(client.clone()),
            namespaces: NamespaceValidator::new(client.clone()),
            client,
        }
    }

    /// Probes whether the current identity may enumerate the RBAC objects
    /// the check needs, returning one warning per denied probe. Probes run
    /// in a deterministic order so warning lists are stable. A probe that
    /// errors aborts; a probe that is denied only warns.
    pub async fn check_api_access(&self, action: &Action) -> Result<Vec<String>> {
        let mut probes: Vec<(&str, &str, String)> = Vec::new();

        if action.namespace.is_empty() {
            probes.push(("list", "namespaces", String::new()));

            let namespaces = Api::<Namespace>::all(self.client.clone())
                .list(&ListParams::default())
                .await
                .context("listing namespaces")?;
            for namespace in namespaces.items {
                let name = namespace.metadata.name.unwrap_or_default();
                probes.push(("list", "roles", name.clone()));
                probes.push(("list", "rolebindings", name));
            }
        } else {
            probes.push(("list", "roles", action.namespace.clone()));
            probes.push(("list", "rolebindings", action.namespace.clone()));
        }

        let mut warnings = Vec::new();
        for (verb, resource, namespace) in probes {
            let allowed = self.access.is_allowed_to(verb, resource, &namespace).await?;
            if !allowed {
                warnings.push(denial_warning(verb, resource, &namespace));
            }
        }
        Ok(warnings)
    }

    /// Returns the RoleBindings and ClusterRoleBindings whose referenced
    /// Role or ClusterRole grants the action. In all-namespaces mode only
    /// cluster-scoped bindings are reported.
    pub async fn check(
        &self,
        action: &Action,
    ) -> Result<(Vec<RoleBinding>, Vec<ClusterRoleBinding>)> {
        self.validate(action).await?;

        let gr = if !action.resource.is_empty() {
            let index = discovery::discover(&self.client)
                .await
                .context("resolving resource")?;
            let gr = index
                .resolve(&action.verb, &action.resource, &action.sub_resource)
                .context("resolving resource")?;
            debug!(resource = %gr, "resolved resource");
            gr
        } else {
            GroupResource::default()
        };
        let resolved = ResolvedAction {
            action: action.clone(),
            gr,
        };

        let (role_names, cluster_role_names) = futures::try_join!(
            async {
                self.matching_roles(&resolved)
                    .await
                    .context("getting Roles")
            },
            async {
                self.matching_cluster_roles(&resolved)
                    .await
                    .context("getting ClusterRoles")
            },
        )?;
        debug!(
            roles = role_names.len(),
            cluster_roles = cluster_role_names.len(),
            "roles matching the action"
        );

        let role_bindings = self
            .role_bindings_for(action, &role_names, &cluster_role_names)
            .await
            .context("getting RoleBindings")?;
        let cluster_role_bindings = self
            .cluster_role_bindings_for(&cluster_role_names)
            .await
            .context("getting ClusterRoleBindings")?;

        Ok((role_bindings, cluster_role_bindings))
    }

    async fn validate(&self, action: &Action) -> Result<()> {
        if !action.non_resource_url.is_empty() && !action.sub_resource.is_empty() {
            bail!("--subresource cannot be used with NONRESOURCEURL");
        }
        self.namespaces
            .validate(&action.namespace)
            .await
            .context("validating namespace")
    }

    async fn matching_roles(&self, action: &ResolvedAction) -> Result<HashSet<String>> {
        // Namespaced Roles cannot grant anything in all-namespaces mode.
        if action.action.namespace.is_empty() {
            return Ok(HashSet::new());
        }
        let roles = Api::<Role>::namespaced(self.client.clone(), &action.action.namespace)
            .list(&ListParams::default())
            .await?;
        Ok(matching_role_names(roles.items, action))
    }

    async fn matching_cluster_roles(&self, action: &ResolvedAction) -> Result<HashSet<String>> {
        let cluster_roles = Api::<ClusterRole>::all(self.client.clone())
            .list(&ListParams::default())
            .await?;
        Ok(matching_cluster_role_names(cluster_roles.items, action))
    }

    async fn role_bindings_for(
        &self,
        action: &Action,
        role_names: &HashSet<String>,
        cluster_role_names: &HashSet<String>,
    ) -> Result<Vec<RoleBinding>> {
        if action.namespace.is_empty() {
            return Ok(Vec::new());
        }
        let bindings = Api::<RoleBinding>::namespaced(self.client.clone(), &action.namespace)
            .list(&ListParams::default())
            .await?;
        Ok(filter_role_bindings(
            bindings.items,
            role_names,
            cluster_role_names,
        ))
    }

    async fn cluster_role_bindings_for(
        &self,
        cluster_role_names: &HashSet<String>,
    ) -> Result<Vec<ClusterRoleBinding>> {
        let bindings = Api::<ClusterRoleBinding>::all(self.client.clone())
            .list(&ListParams::default())
            .await?;
        Ok(filter_cluster_role_bindings(bindings.items, cluster_role_names))
    }
}

fn denial_warning(verb: &str, resource: &str, namespace: &str) -> String {
    if namespace.is_empty() {
        format!("The user is not allowed to {verb} {resource}")
    } else {
        format!("The user is not allowed to {verb} {resource} in the {namespace} namespace")
    }
}

fn matching_role_names(roles: Vec<Role>, action: &ResolvedAction) -> HashSet<String> {
    roles
        .into_iter()
        .filter(|role| matcher::matches_role(role, action))
        .filter_map(|role| role.metadata.name)
        .collect()
}

fn matching_cluster_role_names(
    cluster_roles: Vec<ClusterRole>,
    action: &ResolvedAction,
) -> HashSet<String> {
    cluster_roles
        .into_iter()
        .filter(|role| matcher::matches_cluster_role(role, action))
        .filter_map(|role| role.metadata.name)
        .collect()
}

/// Retains bindings whose RoleRef names a matched Role or ClusterRole,
/// sorted by binding name for deterministic output.
fn filter_role_bindings(
    bindings: Vec<RoleBinding>,
    role_names: &HashSet<String>,
    cluster_role_names: &HashSet<String>,
) -> Vec<RoleBinding> {
    let mut kept: Vec<RoleBinding> = bindings
        .into_iter()
        .filter(|binding| match binding.role_ref.kind.as_str() {
            ROLE_KIND => role_names.contains(&binding.role_ref.name),
            CLUSTER_ROLE_KIND => cluster_role_names.contains(&binding.role_ref.name),
            _ => false,
        })
        .collect();
    kept.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
    kept
}

fn filter_cluster_role_bindings(
    bindings: Vec<ClusterRoleBinding>,
    cluster_role_names: &HashSet<String>,
) -> Vec<ClusterRoleBinding> {
    let mut kept: Vec<ClusterRoleBinding> = bindings
        .into_iter()
        .filter(|binding| cluster_role_names.contains(&binding.role_ref.name))
        .collect();
    kept.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
    kept
}
