mod json;
mod pretty;

use std::fmt::Display;
use std::io::{self, Write};

use anyhow::{bail, Result};
use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, RoleBinding};

use crate::cli::{OUTPUT_JSON, OUTPUT_WIDE};
use crate::types::Action;

#[derive(Debug)]
pub enum Formatter {
    Pretty(pretty::Pretty),
    Json(json::Json),
}

impl Formatter {
    pub fn new(
        output: &str,
        action: Action,
        role_bindings: Vec<RoleBinding>,
        cluster_role_bindings: Vec<ClusterRoleBinding>,
    ) -> Result<Self> {
        match output.to_lowercase().as_str() {
            OUTPUT_JSON => Ok(Formatter::Json(json::Json::new(
                action,
                role_bindings,
                cluster_role_bindings,
            ))),
            "" | OUTPUT_WIDE => Ok(Formatter::Pretty(pretty::Pretty::new(
                action,
                role_bindings,
                cluster_role_bindings,
                output == OUTPUT_WIDE,
            ))),
            other => bail!("invalid output format: {other}"),
        }
    }
}

impl Display for Formatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Formatter::Pretty(p) => p.fmt(f),
            Formatter::Json(j) => j.fmt(f),
        }
    }
}

/// Emits the warnings collected by the pre-flight access checks, if any.
pub fn print_warnings(out: &mut impl Write, warnings: &[String]) -> io::Result<()> {
    if warnings.is_empty() {
        return Ok(());
    }
    writeln!(
        out,
        "Warning: The list might not be complete due to missing permission(s):"
    )?;
    for warning in warnings {
        writeln!(out, "\t{warning}")?;
    }
    writeln!(out)
}
