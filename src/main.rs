mod check;
mod cli;
mod discovery;
mod formatter;
mod matcher;
mod types;

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use kube::Client;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "kubectl_who_can=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    let config = cli.kube_config().await?;
    let default_namespace = config.default_namespace.clone();
    let action = cli.action(|| Ok(default_namespace))?;
    tracing::debug!(
        action = %action,
        namespace = %action.namespace,
        all_namespaces = action.all_namespaces,
        "checking who can"
    );
    let client = Client::try_from(config)?;

    let who_can = check::WhoCan::new(client);

    let warnings = who_can.check_api_access(&action).await?;
    let mut out = std::io::stdout().lock();
    formatter::print_warnings(&mut out, &warnings)?;

    let (role_bindings, cluster_role_bindings) = who_can.check(&action).await?;
    let report =
        formatter::Formatter::new(&cli.output, action, role_bindings, cluster_role_bindings)?;
    writeln!(out, "{report}")?;

    Ok(())
}
