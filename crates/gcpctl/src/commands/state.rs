//! Local state file inspection

use gcpctl_core::StateStore;
use serde_json::{Value, json};
use tracing::debug;

use crate::cli::{OutputFormat, StateCommands};
use crate::connection::ConnectionManager;
use crate::error::{GcpCtlError, Result as CliResult};
use crate::output::print_output;

pub async fn handle_state_command(
    conn_mgr: &ConnectionManager,
    cmd: &StateCommands,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        StateCommands::List => handle_list(conn_mgr, output_format).await,
        StateCommands::Show { name } => handle_show(conn_mgr, name, output_format).await,
        StateCommands::Path => {
            println!("{}", conn_mgr.state_path()?.display());
            Ok(())
        }
    }
}

async fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let store = conn_mgr.state_store()?;
    let records = store.list().await?;
    debug!("{} tracked resources", records.len());

    let rows: Vec<Value> = records
        .into_iter()
        .map(|(name, record)| {
            json!({
                "name": name,
                "kind": record.kind,
                "remote_id": record.remote_id,
                "zone": record.zone,
                "created_at": record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
        })
        .collect();

    print_output(rows, output_format.into())?;
    Ok(())
}

async fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let store = conn_mgr.state_store()?;
    let record = store
        .get(name)
        .await?
        .ok_or_else(|| GcpCtlError::NotFound {
            kind: "tracked resource".to_string(),
            name: name.to_string(),
        })?;

    let mut data = serde_json::to_value(&record)?;
    data["name"] = json!(name);
    print_output(data, output_format.into())?;
    Ok(())
}
