//! `netweave apply`: reconcile network documents against the control plane.

use serde::Deserialize;

use netweave_api::PlaneClient;
use netweave_core::{NetworkSpec, Resolver, configure_network};

use crate::cli::{ApplyArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Apply every document in every file, in order.
///
/// A document with a configuration problem (bad reference, topology
/// mismatch, failed name resolution) is reported and skipped so the rest
/// of the batch still applies; control-plane failures abort immediately.
pub async fn handle(
    plane: &PlaneClient,
    args: &ApplyArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::use_color(&global.color);
    let mut resolver = Resolver::new();
    let mut total = 0;
    let mut failed = 0;

    for path in &args.files {
        let text = std::fs::read_to_string(path)?;
        for spec in parse_documents(path, &text)? {
            total += 1;
            match configure_network(plane, &mut resolver, &spec, args.dry_run).await {
                Ok(outcome) => {
                    if args.json {
                        println!("{}", output::outcome_json(&spec.name, &outcome));
                    } else if !global.quiet {
                        println!("{}", output::outcome_line(&spec.name, &outcome, color));
                    }
                }
                Err(err) if err.is_config_problem() => {
                    failed += 1;
                    eprintln!(
                        "{}",
                        output::failure_line(&spec.name, &err.to_string(), color)
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    if failed > 0 {
        return Err(CliError::ApplyIncomplete { failed, total });
    }
    Ok(())
}

/// Parse one file into network documents.
///
/// Accepts a YAML multi-document stream, a single document, or a top-level
/// array of documents (which also covers JSON input, YAML being a superset).
fn parse_documents(path: &std::path::Path, text: &str) -> Result<Vec<NetworkSpec>, CliError> {
    let invalid = |e: serde_yaml::Error| CliError::InvalidDocument {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let mut specs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document)?;
        match value {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::Sequence(documents) => {
                for entry in documents {
                    specs.push(serde_yaml::from_value(entry).map_err(invalid)?);
                }
            }
            other => specs.push(serde_yaml::from_value(other).map_err(invalid)?),
        }
    }
    Ok(specs)
}
