use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::debug;

use crate::types::Action;

pub const OUTPUT_WIDE: &str = "wide";
pub const OUTPUT_JSON: &str = "json";

const LONG_ABOUT: &str = "\
Shows which users, groups and service accounts can perform a given verb on a \
given resource type.

VERB is a logical Kubernetes API verb like 'get', 'list', 'watch', 'delete', etc.
TYPE is a Kubernetes resource. Shortcuts and API groups will be resolved, e.g. 'po' or 'pods.metrics.k8s.io'.
NAME is the name of a particular Kubernetes resource.
NONRESOURCEURL is a partial URL that starts with \"/\".";

const EXAMPLES: &str = "\
Examples:
  # List who can get pods from any of the available namespaces
  kubectl who-can get pods --all-namespaces

  # List who can create pods in the current namespace
  kubectl who-can create pods

  # List who can get pods specifying the API group
  kubectl who-can get pods.metrics.k8s.io

  # List who can get the service named \"mongodb\" in namespace \"bar\"
  kubectl who-can get svc/mongodb --namespace bar

  # List who can do everything with pods in the current namespace
  kubectl who-can '*' pods

  # List who can read pod logs
  kubectl who-can get pods --subresource=log

  # List who can access the URL /logs/
  kubectl who-can get /logs";

#[derive(Parser, Debug)]
#[command(
    name = "kubectl-who-can",
    version,
    about = "Shows which subjects have RBAC permissions to perform an action",
    long_about = LONG_ABOUT,
    override_usage = "kubectl who-can VERB (TYPE | TYPE/NAME | NONRESOURCEURL)",
    after_help = EXAMPLES,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// VERB (TYPE | TYPE/NAME | NONRESOURCEURL) and an optional resource NAME
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,

    /// If present, the namespace scope for the query
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// If true, check for subjects that can do the specified action in any of the available namespaces
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// SubResource such as pod/log or deployment/scale
    #[arg(long, default_value = "")]
    pub subresource: String,

    /// Output format. Either wide or json
    #[arg(short, long, default_value = "")]
    pub output: String,

    /// Path to the kubeconfig file to use for the query
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// The name of the kubeconfig context to use
    #[arg(long)]
    pub context: Option<String>,
}

impl Cli {
    /// Builds the [`Action`] to check from positional arguments and flags.
    ///
    /// `current_context_namespace` supplies the namespace of the current
    /// kubeconfig context; it is consulted only when neither
    /// `--all-namespaces` nor `--namespace` was given.
    pub fn action(
        &self,
        current_context_namespace: impl FnOnce() -> Result<String>,
    ) -> Result<Action> {
        if self.args.len() < 2 {
            bail!("you must specify two or three arguments: verb, resource, and optional resourceName");
        }

        let mut action = Action {
            verb: self.args[0].clone(),
            sub_resource: self.subresource.clone(),
            ..Default::default()
        };

        let target = &self.args[1];
        if target.starts_with('/') {
            action.non_resource_url = target.clone();
            debug!(url = %action.non_resource_url, "resolved non-resource URL");
        } else {
            match target.split_once('/') {
                Some((resource, name)) => {
                    action.resource = resource.to_string();
                    action.resource_name = name.to_string();
                }
                None => action.resource = target.clone(),
            }
            if let Some(name) = self.args.get(2) {
                action.resource_name = name.clone();
            }
            if !action.resource_name.is_empty() {
                debug!(name = %action.resource_name, "resolved resource name");
            }
        }

        if self.all_namespaces {
            action.all_namespaces = true;
            debug!("searching all namespaces");
            return Ok(action);
        }

        if let Some(namespace) = &self.namespace {
            if !namespace.is_empty() {
                action.namespace = namespace.clone();
                debug!(namespace = %action.namespace, "namespace from --namespace flag");
                return Ok(action);
            }
        }

        action.namespace =
            current_context_namespace().context("getting namespace from current context")?;
        debug!(namespace = %action.namespace, "namespace from current context");
        Ok(action)
    }

    /// Loads the client configuration, honouring `--kubeconfig` and
    /// `--context` and falling back to the standard inference chain
    /// (in-cluster environment, `KUBECONFIG`, default path).
    pub async fn kube_config(&self) -> Result<kube::Config> {
        let options = KubeConfigOptions {
            context: self.context.clone(),
            ..Default::default()
        };
        let config = match &self.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .with_context(|| format!("reading kubeconfig {}", path.display()))?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &options).await?
            }
            None if self.context.is_some() => kube::Config::from_kubeconfig(&options).await?,
            None => kube::Config::infer().await?,
        };
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("kubectl-who-can").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn requires_two_arguments() {
        let err = parse(&["list"])
            .action(|| Ok("default".to_string()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "you must specify two or three arguments: verb, resource, and optional resourceName"
        );
    }

    #[test]
    fn splits_resource_and_name() {
        let action = parse(&["get", "svc/mongodb", "-n", "bar"])
            .action(|| Ok("default".to_string()))
            .unwrap();
        assert_eq!(action.verb, "get");
        assert_eq!(action.resource, "svc");
        assert_eq!(action.resource_name, "mongodb");
        assert_eq!(action.namespace, "bar");
    }

    #[test]
    fn accepts_name_as_third_argument() {
        let action = parse(&["get", "svc", "mongodb"])
            .action(|| Ok("default".to_string()))
            .unwrap();
        assert_eq!(action.resource, "svc");
        assert_eq!(action.resource_name, "mongodb");
    }

    #[test]
    fn recognises_non_resource_url() {
        let action = parse(&["get", "/logs"])
            .action(|| Ok("default".to_string()))
            .unwrap();
        assert_eq!(action.non_resource_url, "/logs");
        assert!(action.resource.is_empty());
        assert!(action.resource_name.is_empty());
    }

    #[test]
    fn all_namespaces_wins_over_namespace_flag() {
        let action = parse(&["list", "pods", "-A", "-n", "foo"])
            .action(|| Ok("default".to_string()))
            .unwrap();
        assert!(action.all_namespaces);
        assert!(action.namespace.is_empty());
    }

    #[test]
    fn falls_back_to_current_context_namespace() {
        let action = parse(&["list", "pods"])
            .action(|| Ok("team-a".to_string()))
            .unwrap();
        assert!(!action.all_namespaces);
        assert_eq!(action.namespace, "team-a");
    }

    #[test]
    fn wraps_current_context_namespace_error() {
        let err = parse(&["list", "pods"])
            .action(|| Err(anyhow!("boom")))
            .unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "getting namespace from current context: boom"
        );
    }

    #[test]
    fn carries_subresource_flag() {
        let action = parse(&["update", "deployments", "--subresource", "scale", "-n", "default"])
            .action(|| Ok("default".to_string()))
            .unwrap();
        assert_eq!(action.sub_resource, "scale");
    }
}
