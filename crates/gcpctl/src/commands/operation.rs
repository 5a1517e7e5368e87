//! `gcpctl operation wait`

use gcpctl_core::OperationHandle;
use serde_json::json;
use tracing::debug;

use crate::cli::{OperationCommands, OutputFormat};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::print_output;
use crate::progress::spinner;

pub async fn handle_operation_command(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    cmd: &OperationCommands,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        OperationCommands::Wait {
            operation,
            zone,
            global,
        } => {
            let lifecycle = conn_mgr
                .lifecycle(profile_name)
                .await?
                .with_progress(spinner(&format!("Waiting for {}", operation)));

            let handle = if *global {
                OperationHandle::global(operation)
            } else {
                let zone = zone.as_deref().unwrap_or(lifecycle.zone());
                OperationHandle::zonal(operation, zone)
            };
            debug!("Waiting on {:?}", handle);

            let done = lifecycle.wait(&handle).await?;
            let data = json!({
                "operation": done.name,
                "status": done.status.to_string(),
                "target_id": done.target_id,
                "target_link": done.target_link,
            });
            print_output(data, output_format.into())?;
            Ok(())
        }
    }
}
