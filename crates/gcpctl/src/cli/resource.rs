//! Per-kind resource subcommands

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum InstanceCommands {
    /// Create an instance and wait until it exists
    #[command(after_help = "EXAMPLES:
    gcpctl instance create web-1 --image projects/debian-cloud/global/images/family/debian-12

    gcpctl instance create web-2 --image my-image --machine-type e2-small \\
        --network app-net --tag http-server --metadata startup=ready
")]
    Create {
        /// Instance name
        name: String,

        /// Boot disk source image
        #[arg(long)]
        image: String,

        #[arg(long, default_value = gcpctl_core::resource::DEFAULT_MACHINE_TYPE)]
        machine_type: String,

        #[arg(long, default_value = gcpctl_core::resource::DEFAULT_NETWORK)]
        network: String,

        /// Network tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Metadata entry as KEY=VALUE (repeatable)
        #[arg(long = "metadata", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,

        /// Do not attach an external NAT address
        #[arg(long)]
        no_external_ip: bool,

        /// Zone (defaults to the profile zone)
        #[arg(long)]
        zone: Option<String>,
    },

    /// Delete an instance and wait until it is gone
    Delete {
        name: String,

        #[arg(long)]
        zone: Option<String>,

        /// Treat an instance that no longer exists as deleted
        #[arg(long)]
        tolerate_missing: bool,
    },

    /// Print the internal IP of an instance
    Ip {
        name: String,

        /// Network interface index; by default the instance must have exactly one
        #[arg(long)]
        interface: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum NetworkCommands {
    /// Create a network
    Create {
        name: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a network
    Delete {
        name: String,

        #[arg(long)]
        tolerate_missing: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImageCommands {
    /// Create an image from a tarball already uploaded to object storage
    Create {
        name: String,

        /// URL of the staged `.tar.gz`, e.g. https://storage.googleapis.com/bucket/image.tar.gz
        #[arg(long)]
        source_url: String,
    },

    /// Delete an image
    Delete {
        name: String,

        #[arg(long)]
        tolerate_missing: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum FirewallCommands {
    /// Create a firewall rule named NETWORK-RULE
    #[command(after_help = "EXAMPLES:
    # Allow SSH and HTTP from anywhere to instances tagged 'web'
    gcpctl firewall create app-net web --allow tcp:22,80 \\
        --source-range 0.0.0.0/0 --target-tag web
")]
    Create {
        /// Network the rule applies to
        network: String,

        /// Rule name, prefixed with the network name on the platform
        rule: String,

        /// Allowed protocol and ports, e.g. tcp:22,80 or icmp (repeatable)
        #[arg(long, required = true)]
        allow: Vec<String>,

        #[arg(long = "source-range")]
        source_ranges: Vec<String>,

        #[arg(long = "source-tag")]
        source_tags: Vec<String>,

        #[arg(long = "target-tag")]
        target_tags: Vec<String>,
    },

    /// Delete the firewall rule NETWORK-RULE
    Delete {
        network: String,
        rule: String,

        #[arg(long)]
        tolerate_missing: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum DiskCommands {
    /// Create a persistent disk
    Create {
        name: String,

        #[arg(long)]
        size_gb: Option<u64>,

        /// Disk type, e.g. pd-standard or pd-ssd
        #[arg(long)]
        disk_type: Option<String>,

        #[arg(long)]
        source_image: Option<String>,

        #[arg(long)]
        zone: Option<String>,
    },

    /// Delete a persistent disk
    Delete {
        name: String,

        #[arg(long)]
        zone: Option<String>,

        #[arg(long)]
        tolerate_missing: bool,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("startup=ready").unwrap(),
            ("startup".to_string(), "ready".to_string())
        );
        assert_eq!(
            parse_key_value("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=value").is_err());
    }
}
