use anyhow::Result;
use k8s_openapi::api::authorization::v1::{
    ResourceAttributes, SelfSubjectAccessReview, SelfSubjectAccessReviewSpec,
};
use kube::api::PostParams;
use kube::{Api, Client};

/// Asks the API server whether the current identity may perform an action.
/// One probe is one round-trip; nothing is cached.
pub struct AccessChecker {
    api: Api<SelfSubjectAccessReview>,
}

impl AccessChecker {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }

    /// An empty namespace probes cluster-wide.
    pub async fn is_allowed_to(&self, verb: &str, resource: &str, namespace: &str) -> Result<bool> {
        let review = SelfSubjectAccessReview {
            spec: SelfSubjectAccessReviewSpec {
                resource_attributes: Some(ResourceAttributes {
                    verb: Some(verb.to_string()),
                    resource: Some(resource.to_string()),
                    namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let created = self.api.create(&PostParams::default(), &review).await?;
        Ok(created.status.is_some_and(|status| status.allowed))
    }
}
