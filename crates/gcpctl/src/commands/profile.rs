//! Profile management command implementations

use colored::Colorize;
use gcpctl_core::{CredentialStore, Profile, ProfileCredentials};
use serde_json::{Value, json};
use tracing::{debug, info, trace};

use crate::cli::{OutputFormat, ProfileCommands};
use crate::connection::ConnectionManager;
use crate::error::{GcpCtlError, Result as CliResult};
use crate::output::{self, print_output};

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<()> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format),
        Path => handle_path(conn_mgr, output_format),
        Show { name } => handle_show(conn_mgr, name, output_format),
        Set {
            name,
            project,
            zone,
            access_token,
            token_file,
            api_url,
            poll_timeout,
            poll_interval,
            #[cfg(feature = "secure-storage")]
            use_keyring,
        } => {
            #[cfg(feature = "secure-storage")]
            let use_keyring = *use_keyring;
            #[cfg(not(feature = "secure-storage"))]
            let use_keyring = false;

            let credentials = credentials_for(name, access_token, token_file, use_keyring)?;
            let profile = Profile {
                project: project.clone(),
                zone: zone.clone(),
                credentials,
                api_url: api_url.clone(),
                poll_timeout_secs: *poll_timeout,
                poll_interval_secs: *poll_interval,
            };
            handle_set(conn_mgr, name, profile)
        }
        Remove { name } => handle_remove(conn_mgr, name),
        Default { name } => handle_default(conn_mgr, name),
    }
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    debug!("Listing all configured profiles");
    let profiles = conn_mgr.config.list_profiles();
    trace!("Found {} profiles", profiles.len());
    let default = conn_mgr.config.default_profile.as_deref();

    match output_format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let rows: Vec<Value> = profiles
                .iter()
                .map(|(name, profile)| {
                    json!({
                        "name": name,
                        "project": profile.project,
                        "zone": profile.zone,
                        "credentials": credential_source(profile),
                        "is_default": default == Some(name.as_str()),
                    })
                })
                .collect();
            print_output(rows, output_format.into())?;
        }
        OutputFormat::Auto | OutputFormat::Table => {
            println!("Configuration file: {}", conn_mgr.config_file()?.display());
            println!();

            if profiles.is_empty() {
                println!("No profiles configured.");
                println!("Use 'gcpctl profile set' to create a profile.");
                return Ok(());
            }

            println!("{}", "Profiles:".bold());
            for (name, profile) in profiles {
                if default == Some(name.as_str()) {
                    println!("  {} {}", name.bold().cyan(), "(default)".green());
                } else {
                    println!("  {}", name.bold().cyan());
                }
                println!(
                    "    {} {}/{}",
                    "Project/zone:".dimmed(),
                    profile.project,
                    profile.zone
                );
            }
        }
    }
    Ok(())
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let path = conn_mgr.config_file()?;
    match output_format {
        OutputFormat::Json | OutputFormat::Yaml => {
            print_output(
                json!({ "config_path": path.display().to_string() }),
                output_format.into(),
            )?;
        }
        OutputFormat::Auto | OutputFormat::Table => println!("{}", path.display()),
    }
    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    debug!("Showing profile: {}", name);
    let profile = conn_mgr.config.profile(name)?;
    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);

    let mut data = json!({
        "name": name,
        "project": profile.project,
        "zone": profile.zone,
        "api_url": profile.api_url,
        "poll_timeout_secs": profile.poll_timeout_secs,
        "poll_interval_secs": profile.poll_interval_secs,
        "is_default": is_default,
    });
    match &profile.credentials {
        ProfileCredentials::AccessToken { access_token } => {
            data["access_token"] = json!(mask_token(access_token));
        }
        ProfileCredentials::TokenFile { token_file } => {
            data["token_file"] = json!(token_file);
        }
    }

    let format = match output_format {
        OutputFormat::Auto => output::OutputFormat::Table,
        other => other.into(),
    };
    print_output(data, format)?;
    Ok(())
}

fn handle_set(conn_mgr: &ConnectionManager, name: &str, profile: Profile) -> CliResult<()> {
    debug!("Setting profile: {}", name);
    profile.validate(name)?;

    let mut config = conn_mgr.config.clone();
    let replaced = config.profiles.contains_key(name);
    config.set_profile(name.to_string(), profile);
    let path = conn_mgr.save_config(&config)?;

    info!("Profile '{}' saved to {}", name, path.display());
    if replaced {
        println!("Profile '{}' updated in:", name);
    } else {
        println!("Profile '{}' saved successfully to:", name);
    }
    println!("  {}", path.display());

    if config.default_profile.is_none() && config.profiles.len() > 1 {
        println!();
        println!("Tip: Set as default with:");
        println!("  gcpctl profile default {}", name);
    }
    Ok(())
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    debug!("Removing profile: {}", name);

    let mut config = conn_mgr.config.clone();
    let removed = config
        .remove_profile(name)
        .ok_or_else(|| GcpCtlError::ProfileNotFound {
            name: name.to_string(),
        })?;

    if let Some(token) = removed.access_token()
        && CredentialStore::is_keyring_reference(token)
    {
        CredentialStore::new().delete_credential(token)?;
        debug!("Removed keyring entry for profile '{}'", name);
    }

    conn_mgr.save_config(&config)?;
    println!("Profile '{}' removed.", name);
    Ok(())
}

fn handle_default(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    let mut config = conn_mgr.config.clone();
    config.profile(name)?;
    config.default_profile = Some(name.to_string());
    conn_mgr.save_config(&config)?;
    println!("Default profile set to '{}'.", name);
    Ok(())
}

/// Build credentials from flags, prompting for a token when none was given
fn credentials_for(
    name: &str,
    access_token: &Option<String>,
    token_file: &Option<String>,
    use_keyring: bool,
) -> CliResult<ProfileCredentials> {
    if let Some(token_file) = token_file {
        return Ok(ProfileCredentials::TokenFile {
            token_file: token_file.clone(),
        });
    }

    let token = match access_token {
        Some(token) => token.clone(),
        None => rpassword::prompt_password("Access token: ").map_err(|e| {
            GcpCtlError::InvalidInput {
                message: format!("Failed to read access token: {}", e),
            }
        })?,
    };
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(GcpCtlError::InvalidInput {
            message: "access token must not be empty".to_string(),
        });
    }

    let access_token = if use_keyring {
        let store = CredentialStore::new();
        let reference = store.store_credential(&format!("{}-access-token", name), &token)?;
        println!("Access token stored in {}", store.storage_backend());
        reference
    } else {
        token
    };
    Ok(ProfileCredentials::AccessToken { access_token })
}

fn credential_source(profile: &Profile) -> &'static str {
    match &profile.credentials {
        ProfileCredentials::AccessToken { access_token }
            if CredentialStore::is_keyring_reference(access_token) =>
        {
            "keyring"
        }
        ProfileCredentials::AccessToken { .. } => "access-token",
        ProfileCredentials::TokenFile { .. } => "token-file",
    }
}

/// Keep keyring references readable, hide everything but a short prefix otherwise
fn mask_token(token: &str) -> String {
    if CredentialStore::is_keyring_reference(token) {
        return token.to_string();
    }
    let prefix: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("ya29.a0AfH6SMBx"), "ya29****");
        assert_eq!(mask_token("short"), "****");
        assert_eq!(mask_token("keyring:dev-access-token"), "keyring:dev-access-token");
    }

    #[test]
    fn test_token_file_wins() {
        let creds = credentials_for(
            "dev",
            &None,
            &Some("~/.config/gcpctl/token.json".to_string()),
            false,
        )
        .unwrap();
        assert!(matches!(creds, ProfileCredentials::TokenFile { .. }));
    }

    #[test]
    fn test_blank_token_rejected() {
        let err = credentials_for("dev", &Some("   ".to_string()), &None, false).unwrap_err();
        assert!(matches!(err, GcpCtlError::InvalidInput { .. }));
    }

    #[test]
    fn test_credential_source() {
        let profile = Profile::with_access_token("p", "z", "keyring:dev-access-token");
        assert_eq!(credential_source(&profile), "keyring");
        let profile = Profile::with_access_token("p", "z", "ya29.x");
        assert_eq!(credential_source(&profile), "access-token");
    }
}
