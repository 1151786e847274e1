use anyhow::{bail, Context, Result};
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client};

const PHASE_ACTIVE: &str = "Active";

/// Confirms a namespace exists and is active before it is used to scope a
/// query. The empty name (all namespaces) always validates.
pub struct NamespaceValidator {
    api: Api<Namespace>,
}

impl NamespaceValidator {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }

    pub async fn validate(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Ok(());
        }

        let namespace = match self.api.get(name).await {
            Ok(namespace) => namespace,
            Err(kube::Error::Api(response)) if response.reason == "NotFound" => {
                bail!("\"{name}\" not found")
            }
            Err(err) => return Err(err).context("getting namespace"),
        };

        let phase = namespace
            .status
            .and_then(|status| status.phase)
            .unwrap_or_default();
        if phase != PHASE_ACTIVE {
            bail!("invalid status: {phase}");
        }
        Ok(())
    }
}
