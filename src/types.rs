use std::fmt::Display;

/// An action a subject can be given permission to, as requested on the
/// command line. Either `non_resource_url` is set, or `resource` is
/// (optionally with `sub_resource` and `resource_name`). An empty
/// `namespace` means all namespaces.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Action {
    pub verb: String,

    pub resource: String,
    pub resource_name: String,
    pub sub_resource: String,

    pub non_resource_url: String,

    pub namespace: String,
    pub all_namespaces: bool,
}

/// An API group paired with a plural resource name. The empty group is the
/// core group; `"*"` in either position is the RBAC wildcard.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupResource {
    pub group: String,
    pub resource: String,
}

/// An [`Action`] whose resource token has been mapped to a canonical
/// [`GroupResource`] through discovery.
#[derive(Clone, Debug)]
pub struct ResolvedAction {
    pub action: Action,
    pub gr: GroupResource,
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.non_resource_url.is_empty() {
            return write!(f, "{} {}", self.verb, self.non_resource_url);
        }
        write!(f, "{} {}", self.verb, self.resource)?;
        if !self.resource_name.is_empty() {
            write!(f, "/{}", self.resource_name)?;
        }
        Ok(())
    }
}

impl Display for GroupResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}
