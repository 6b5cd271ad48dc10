// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wamux - multi-device WhatsApp session manager.
//!
//! This is the binary entry point.

mod admin;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wamux_core::{CreateApiKeyRequest, DeviceStatus};

/// Wamux - multi-device WhatsApp session manager.
#[derive(Parser, Debug)]
#[command(name = "wamux", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate configuration and print the effective values.
    Check,
    /// List session-store files in the stores directory.
    Sessions,
    /// Manage persisted device records.
    Devices {
        #[command(subcommand)]
        action: DevicesCommand,
    },
    /// Manage API keys.
    Keys {
        #[command(subcommand)]
        action: KeysCommand,
    },
    /// Run the session manager until SIGINT/SIGTERM.
    Serve,
}

#[derive(Subcommand, Debug)]
enum DevicesCommand {
    /// List device records, newest first.
    List {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        status: Option<DeviceStatus>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Create a device record.
    Create {
        name: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Soft-delete a device record by id.
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a key with full access. The key is printed once.
    Generate {
        name: String,
        #[arg(long)]
        owner: String,
        /// Days until the key expires; 0 never expires.
        #[arg(long, default_value_t = 0)]
        expires_in_days: u32,
        /// Requests per minute; 0 is unlimited.
        #[arg(long, default_value_t = 0)]
        rate_limit: u32,
    },
    /// List an owner's keys, newest first.
    List {
        #[arg(long)]
        owner: String,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete a key by id.
    Revoke {
        id: String,
        #[arg(long)]
        owner: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => wamux_config::load_and_validate_path(path),
        None => wamux_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            wamux_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    wamux::init_tracing(&config.app.log_level);

    let result = match cli.command {
        Some(Commands::Check) => admin::run_check(&config),
        Some(Commands::Sessions) => admin::run_sessions(&config).await,
        Some(Commands::Devices { action }) => match action {
            DevicesCommand::List {
                owner,
                status,
                skip,
                limit,
            } => admin::run_devices_list(config, owner, status, skip, limit).await,
            DevicesCommand::Create {
                name,
                owner,
                description,
            } => admin::run_devices_create(config, name, owner, description).await,
            DevicesCommand::Delete { id } => admin::run_devices_delete(config, id).await,
        },
        Some(Commands::Keys { action }) => match action {
            KeysCommand::Generate {
                name,
                owner,
                expires_in_days,
                rate_limit,
            } => {
                let request = CreateApiKeyRequest {
                    name,
                    permissions: Vec::new(),
                    rate_limit,
                    expires_in_days,
                };
                admin::run_keys_generate(config, owner, request).await
            }
            KeysCommand::List { owner, skip, limit } => {
                admin::run_keys_list(config, owner, skip, limit).await
            }
            KeysCommand::Revoke { id, owner } => admin::run_keys_revoke(config, id, owner).await,
        },
        Some(Commands::Serve) => serve::run_serve(config).await,
        None => {
            println!("wamux: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
