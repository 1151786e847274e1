use anyhow::{bail, Result};
use futures::future::try_join_all;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResource;
use kube::Client;
use std::collections::HashMap;

use crate::matcher::WILDCARD;
use crate::types::GroupResource;

/// RBAC accepts `use` on pod security policies even though discovery does
/// not advertise it as a supported verb.
const PSP_RESOURCE: &str = "podsecuritypolicies";
const PSP_VERB: &str = "use";

fn split_group_version(group_version: &str) -> (Option<String>, String) {
    match group_version.split_once('/') {
        Some((group, version)) => (Some(group.to_string()), version.to_string()),
        None => (None, group_version.to_string()),
    }
}

/// A lookup index over the server's API resources, keyed by plural name,
/// singular name and short names. Subresources are indexed under their
/// composite `<plural>/<sub>` name. Candidates under a key keep discovery
/// order, so an unqualified lookup takes the preferred match the same way
/// kubectl's REST mapper does.
pub struct ResourceIndex {
    index: HashMap<String, Vec<APIResource>>,
}

impl ResourceIndex {
    pub fn new(resources: Vec<APIResource>) -> Self {
        let mut index: HashMap<String, Vec<APIResource>> = HashMap::new();
        for resource in resources {
            let mut keys = vec![resource.name.clone()];
            if !resource.singular_name.is_empty() {
                keys.push(resource.singular_name.clone());
            }
            if let Some(short_names) = &resource.short_names {
                keys.extend(short_names.iter().cloned());
            }
            for key in keys {
                index.entry(key).or_default().push(resource.clone());
            }
        }
        Self { index }
    }

    fn lookup(&self, name: &str, group: Option<&str>) -> Option<&APIResource> {
        let candidates = self.index.get(name)?;
        match group {
            Some(group) => candidates
                .iter()
                .find(|r| r.group.as_deref().unwrap_or_default() == group),
            None => candidates.first(),
        }
    }

    /// Maps a user-typed resource token to a canonical [`GroupResource`] and
    /// validates the verb against the resource's advertised verbs.
    ///
    /// The token may be a plural, a singular, a short name, or carry an
    /// explicit group qualifier after the first dot (`pods.metrics.k8s.io`).
    /// The wildcard resource skips resolution entirely, and the wildcard
    /// verb skips verb validation.
    pub fn resolve(&self, verb: &str, resource: &str, sub_resource: &str) -> Result<GroupResource> {
        if resource == WILDCARD {
            return Ok(GroupResource {
                group: String::new(),
                resource: WILDCARD.to_string(),
            });
        }

        let (name, group_hint) = match resource.split_once('.') {
            Some((name, group)) => (name, Some(group)),
            None => (resource, None),
        };

        let base = match self.lookup(name, group_hint) {
            Some(base) => base,
            None => bail!(no_resource_type(resource, sub_resource)),
        };
        let group = base.group.clone().unwrap_or_default();

        let target = if sub_resource.is_empty() {
            base
        } else {
            let composite = format!("{}/{}", base.name, sub_resource);
            match self.lookup(&composite, Some(group.as_str())) {
                Some(target) => target,
                None => bail!(no_resource_type(resource, sub_resource)),
            }
        };

        if verb != WILDCARD && !verb_supported_by(target, verb) {
            bail!(
                "the \"{}\" resource does not support the \"{}\" verb, only [{}]",
                target.name,
                verb,
                target.verbs.join(" ")
            );
        }

        Ok(GroupResource {
            group,
            resource: base.name.clone(),
        })
    }
}

fn no_resource_type(resource: &str, sub_resource: &str) -> String {
    let mut name = resource.to_string();
    if !sub_resource.is_empty() {
        name.push('/');
        name.push_str(sub_resource);
    }
    format!("the server doesn't have a resource type \"{name}\"")
}

fn verb_supported_by(resource: &APIResource, verb: &str) -> bool {
    if resource.name == PSP_RESOURCE && verb == PSP_VERB {
        return true;
    }
    resource.verbs.iter().any(|v| v == verb)
}

/// Fetches the preferred group-version resource lists from the server and
/// builds the lookup index. Core resources come before group resources so an
/// unqualified short name prefers the core group.
pub async fn discover(client: &Client) -> Result<ResourceIndex> {
    let api_groups = client.list_api_groups().await?;
    let core_api_versions = client.list_core_api_versions().await?;

    let core_lists = try_join_all(core_api_versions.versions.first().map(|version| {
        let version = version.clone();
        async move { client.list_core_api_resources(&version).await }
    }))
    .await?;
    let group_lists = try_join_all(
        api_groups
            .groups
            .iter()
            .filter_map(|g| g.preferred_version.clone())
            .map(|preferred| {
                let group_version = preferred.group_version;
                async move { client.list_api_group_resources(&group_version).await }
            }),
    )
    .await?;

    let resources = core_lists
        .iter()
        .chain(group_lists.iter())
        .flat_map(|list| {
            let (group, version) = split_group_version(&list.group_version);
            list.resources
                .iter()
                .map(|r| {
                    let mut resource = r.clone();
                    resource.group = group.clone();
                    resource.version = Some(version.clone());
                    resource
                })
                .collect::<Vec<APIResource>>()
        })
        .collect::<Vec<APIResource>>();

    Ok(ResourceIndex::new(resources))
}
