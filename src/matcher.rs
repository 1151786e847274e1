use k8s_openapi::api::rbac::v1::{ClusterRole, PolicyRule, Role};

use crate::types::ResolvedAction;

/// The RBAC wildcard. Matches any verb, API group or resource when it
/// appears in the corresponding list of a policy rule.
pub const WILDCARD: &str = "*";

/// Returns `true` if any rule of the given Role matches the action.
pub fn matches_role(role: &Role, action: &ResolvedAction) -> bool {
    role.rules
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|rule| matches(rule, action))
}

/// Returns `true` if any rule of the given ClusterRole matches the action.
pub fn matches_cluster_role(role: &ClusterRole, action: &ResolvedAction) -> bool {
    role.rules
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|rule| matches(rule, action))
}

/// Returns `true` if the policy rule grants the resolved action.
///
/// Non-resource URL actions match on verb plus exact URL equality. Resource
/// actions match on verb, API group, resource (with the subresource appended
/// as `<resource>/<sub>`) and resource name. A rule listing only the bare
/// resource does not grant access to its subresources.
pub fn matches(rule: &PolicyRule, action: &ResolvedAction) -> bool {
    if !action.action.non_resource_url.is_empty() {
        return matches_verb(rule, &action.action.verb)
            && matches_non_resource_url(rule, &action.action.non_resource_url);
    }

    let mut resource = action.gr.resource.clone();
    if !action.action.sub_resource.is_empty() {
        resource.push('/');
        resource.push_str(&action.action.sub_resource);
    }

    matches_verb(rule, &action.action.verb)
        && matches_resource(rule, &resource)
        && matches_api_group(rule, &action.gr.group)
        && matches_resource_name(rule, &action.action.resource_name)
}

fn matches_verb(rule: &PolicyRule, verb: &str) -> bool {
    rule.verbs.iter().any(|v| v == WILDCARD || v == verb)
}

fn matches_api_group(rule: &PolicyRule, group: &str) -> bool {
    rule.api_groups
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|g| g == WILDCARD || g == group)
}

fn matches_resource(rule: &PolicyRule, resource: &str) -> bool {
    rule.resources
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|r| r == WILDCARD || r == resource)
}

fn matches_resource_name(rule: &PolicyRule, name: &str) -> bool {
    let names = rule.resource_names.as_deref().unwrap_or_default();
    if names.is_empty() {
        // An unrestricted rule covers both named and unnamed queries.
        return true;
    }
    if name.is_empty() {
        // A restricted rule is still broader than a query without a name.
        return true;
    }
    names.iter().any(|n| n == name)
}

fn matches_non_resource_url(rule: &PolicyRule, url: &str) -> bool {
    rule.non_resource_urls
        .as_deref()
        .unwrap_or_default()
        .iter()
        .any(|u| u == url)
}

#[cfg(test)]
mod tests {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;
    use crate::types::{Action, GroupResource};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn rule(
        verbs: &[&str],
        api_groups: &[&str],
        resources: &[&str],
        resource_names: &[&str],
        non_resource_urls: &[&str],
    ) -> PolicyRule {
        PolicyRule {
            verbs: strings(verbs),
            api_groups: (!api_groups.is_empty()).then(|| strings(api_groups)),
            resources: (!resources.is_empty()).then(|| strings(resources)),
            resource_names: (!resource_names.is_empty()).then(|| strings(resource_names)),
            non_resource_urls: (!non_resource_urls.is_empty()).then(|| strings(non_resource_urls)),
        }
    }

    fn resolved(verb: &str, group: &str, resource: &str) -> ResolvedAction {
        ResolvedAction {
            action: Action {
                verb: verb.to_string(),
                resource: resource.to_string(),
                ..Default::default()
            },
            gr: GroupResource {
                group: group.to_string(),
                resource: resource.to_string(),
            },
        }
    }

    #[test]
    fn matches_table() {
        struct Case {
            scenario: &'static str,
            rule: PolicyRule,
            action: ResolvedAction,
            matches: bool,
        }

        let named = |name: &str| {
            let mut action = resolved("get", "", "services");
            action.action.resource_name = name.to_string();
            action
        };
        let with_sub = |sub: &str| {
            let mut action = resolved("update", "apps", "deployments");
            action.action.sub_resource = sub.to_string();
            action
        };
        let url = |verb: &str, url: &str| ResolvedAction {
            action: Action {
                verb: verb.to_string(),
                non_resource_url: url.to_string(),
                ..Default::default()
            },
            gr: GroupResource::default(),
        };

        let cases = vec![
            Case {
                scenario: "verb and resource listed",
                rule: rule(&["get", "list"], &[""], &["services"], &[], &[]),
                action: resolved("get", "", "services"),
                matches: true,
            },
            Case {
                scenario: "wildcard resource",
                rule: rule(&["get", "list"], &[""], &["*"], &[], &[]),
                action: resolved("get", "", "services"),
                matches: true,
            },
            Case {
                scenario: "wildcard verb",
                rule: rule(&["*"], &[""], &["services"], &[], &[]),
                action: resolved("get", "", "services"),
                matches: true,
            },
            Case {
                scenario: "wildcard api group",
                rule: rule(&["get"], &["*"], &["services"], &[], &[]),
                action: resolved("get", "", "services"),
                matches: true,
            },
            Case {
                scenario: "verb not listed",
                rule: rule(&["get", "list"], &[""], &["services"], &[], &[]),
                action: resolved("delete", "", "services"),
                matches: false,
            },
            Case {
                scenario: "group mismatch",
                rule: rule(&["get"], &["apps"], &["services"], &[], &[]),
                action: resolved("get", "", "services"),
                matches: false,
            },
            Case {
                scenario: "named query against unrestricted rule",
                rule: rule(&["get", "list"], &[""], &["services"], &[], &[]),
                action: named("mongodb"),
                matches: true,
            },
            Case {
                scenario: "named query against matching name list",
                rule: rule(&["get"], &[""], &["services"], &["mongodb", "nginx"], &[]),
                action: named("mongodb"),
                matches: true,
            },
            Case {
                scenario: "named query against non-matching name list",
                rule: rule(&["get"], &[""], &["services"], &["nginx"], &[]),
                action: named("mongodb"),
                matches: false,
            },
            Case {
                scenario: "unnamed query against restricted rule",
                rule: rule(&["get"], &[""], &["services"], &["mongodb"], &[]),
                action: named(""),
                matches: true,
            },
            Case {
                scenario: "subresource needs a composite entry",
                rule: rule(&["update"], &["apps"], &["deployments"], &[], &[]),
                action: with_sub("scale"),
                matches: false,
            },
            Case {
                scenario: "composite entry grants the subresource",
                rule: rule(&["update"], &["apps"], &["deployments/scale"], &[], &[]),
                action: with_sub("scale"),
                matches: true,
            },
            Case {
                scenario: "wildcard resource covers subresources",
                rule: rule(&["update"], &["apps"], &["*"], &[], &[]),
                action: with_sub("scale"),
                matches: true,
            },
            Case {
                scenario: "non-resource url exact match",
                rule: rule(&["get"], &[], &[], &[], &["/logs"]),
                action: url("get", "/logs"),
                matches: true,
            },
            Case {
                scenario: "non-resource url no prefix logic",
                rule: rule(&["get"], &[], &[], &[], &["/logs"]),
                action: url("get", "/logs/pods"),
                matches: false,
            },
            Case {
                scenario: "non-resource url wildcard verb",
                rule: rule(&["*"], &[], &[], &[], &["/healthz"]),
                action: url("get", "/healthz"),
                matches: true,
            },
            Case {
                scenario: "empty rule never matches",
                rule: rule(&[], &[], &[], &[], &[]),
                action: resolved("get", "", "services"),
                matches: false,
            },
        ];

        for case in cases {
            assert_eq!(
                matches(&case.rule, &case.action),
                case.matches,
                "scenario: {}",
                case.scenario
            );
        }
    }

    #[test]
    fn matcher_is_pure() {
        let rule = rule(&["get"], &[""], &["services"], &[], &[]);
        let action = resolved("get", "", "services");
        let first = matches(&rule, &action);
        for _ in 0..3 {
            assert_eq!(matches(&rule, &action), first);
        }
    }

    #[test]
    fn role_matches_when_any_rule_does() {
        let role = Role {
            metadata: ObjectMeta {
                name: Some("view-services".to_string()),
                ..Default::default()
            },
            rules: Some(vec![
                rule(&["get", "list"], &[""], &["services"], &[], &[]),
                rule(&["get", "list"], &["extensions"], &["deployments"], &[], &[]),
            ]),
        };
        let action = resolved("list", "extensions", "deployments");
        assert!(matches_role(&role, &action));
    }

    #[test]
    fn cluster_role_matches_subresource_rule() {
        let role = ClusterRole {
            metadata: ObjectMeta {
                name: Some("edit-deployments".to_string()),
                ..Default::default()
            },
            rules: Some(vec![
                rule(&["update", "patch", "delete"], &[""], &["deployments"], &[], &[]),
                rule(&["update"], &["extensions"], &["deployments/scale"], &[], &[]),
            ]),
            ..Default::default()
        };
        let mut action = resolved("update", "extensions", "deployments");
        action.action.sub_resource = "scale".to_string();
        assert!(matches_cluster_role(&role, &action));
    }

    #[test]
    fn role_without_rules_never_matches() {
        let role = Role {
            metadata: ObjectMeta::default(),
            rules: None,
        };
        assert!(!matches_role(&role, &resolved("get", "", "pods")));
    }
}
