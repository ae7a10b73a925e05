//! Tether Control - operator CLI for the tether device agent.

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tether_common::rpc::{RpcMethod, StatusData};

#[derive(Parser)]
#[command(name = "tetherctl")]
#[command(about = "Control the tether device agent", long_about = None)]
#[command(version = tether_common::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon health and lock state
    Status,

    /// Lock the device
    Lock {
        /// Message shown on the lock surface
        #[arg(long, default_value = "")]
        message: String,
    },

    /// Unlock the device
    Unlock,

    /// Rewrite the lock message (only while locked)
    SetMessage {
        message: String,
    },

    /// Request an immediate location fix upload
    Locate,

    /// Wipe agent state back to provisioned-unlocked (debug installs)
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = client::socket_path();
    let mut client = client::TetherdClient::connect_to(&path).await?;

    match cli.command {
        Commands::Status => {
            let response = client.call(RpcMethod::Status, None).await?;
            let status: StatusData = serde_json::from_value(response.result.unwrap_or_default())?;
            print_status(&status);
        }
        Commands::Lock { message } => {
            let params = serde_json::json!({ "message": message });
            client.call(RpcMethod::Lock, Some(params)).await?;
            println!("{}", "Device locked.".red().bold());
        }
        Commands::Unlock => {
            client.call(RpcMethod::Unlock, None).await?;
            println!("{}", "Device unlocked.".green().bold());
        }
        Commands::SetMessage { message } => {
            let params = serde_json::json!({ "message": message });
            let response = client.call(RpcMethod::SetMessage, Some(params)).await?;
            let applied = response
                .result
                .as_ref()
                .and_then(|r| r.get("applied"))
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if applied {
                println!("Lock message updated.");
            } else {
                println!("{}", "Device is not locked; message unchanged.".yellow());
            }
        }
        Commands::Locate => {
            client.call(RpcMethod::Locate, None).await?;
            println!("Location fix queued for upload.");
        }
        Commands::Reset => {
            client.call(RpcMethod::Reset, None).await?;
            println!("{}", "Agent state cleared.".yellow().bold());
        }
    }
    Ok(())
}

fn print_status(status: &StatusData) {
    println!("tetherd v{} (pid {})", status.version, status.pid);
    println!("  uptime:       {}s", status.uptime_secs);
    if status.is_locked {
        println!("  lock state:   {}", "LOCKED".red().bold());
        if let Some(message) = &status.lock_message {
            println!("  message:      {}", message);
        }
        if let Some(at) = status.locked_at {
            println!("  locked at:    {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    } else {
        println!("  lock state:   {}", "unlocked".green());
    }
    println!(
        "  device owner: {}",
        if status.device_owner { "yes" } else { "no" }
    );
    if status.device_id.is_empty() {
        println!("  enrollment:   {}", "not enrolled".yellow());
    } else {
        println!(
            "  enrollment:   {} (tenant {}){}",
            status.device_id,
            status.tenant_id,
            if status.setup_complete { "" } else { " [setup incomplete]" }
        );
    }
    println!(
        "  push token:   {}",
        if status.push_token_registered {
            "registered"
        } else {
            "none"
        }
    );
}
