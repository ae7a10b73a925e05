//! Control socket server - the daemon's single ingestion point.
//!
//! Three producers share this socket: tetherctl (manual admin actions),
//! the platform push bridge (remote commands), and the platform event
//! bridge (boot / screen / token broadcasts). Protocol is
//! newline-delimited JSON-RPC 2.0. Persistence failures come back as RPC
//! errors so the push bridge can NACK and let the transport redeliver;
//! everything else acks.

use crate::context::AgentContext;
use crate::events::{CommandDisposition, EventHandler};
use crate::reconciler::TriggerOrigin;
use anyhow::{Context as _, Result};
use std::sync::Arc;
use tether_common::rpc::{
    CommandParams, LockParams, RpcMethod, RpcRequest, RpcResponse, TokenParams,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

const ERR_INVALID_PARAMS: i32 = -32602;
const ERR_PERSISTENCE: i32 = -32004;

/// Bind the socket and serve connections until the daemon exits.
pub async fn start_server(ctx: Arc<AgentContext>) -> Result<()> {
    let socket_path = ctx.config.socket_path.clone();
    if let Some(dir) = socket_path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .context("Failed to create socket directory")?;
    }
    // Remove a stale socket from a previous run.
    let _ = tokio::fs::remove_file(&socket_path).await;

    let listener = UnixListener::bind(&socket_path).context("Failed to bind control socket")?;

    // Owner-only: the bridge and tetherctl run as the same user.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    info!("Control socket listening on {}", socket_path.display());

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, ctx).await {
                        error!("Control connection error: {}", e);
                    }
                });
            }
            Err(e) => error!("Failed to accept control connection: {}", e),
        }
    }
}

async fn handle_connection(stream: UnixStream, ctx: Arc<AgentContext>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }

        let request: RpcRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid control request JSON: {}", e);
                continue;
            }
        };

        let response = dispatch(&ctx, request).await;
        let mut payload = serde_json::to_string(&response)?;
        payload.push('\n');
        writer.write_all(payload.as_bytes()).await?;
    }
    Ok(())
}

async fn dispatch(ctx: &Arc<AgentContext>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    match request.method {
        RpcMethod::Status => {
            let status = ctx.status().await;
            RpcResponse::success(id, serde_json::to_value(status).unwrap())
        }

        RpcMethod::Lock => {
            let params: LockParams = match parse_params(request.params) {
                Ok(params) => params,
                Err(e) => return RpcResponse::error(id, ERR_INVALID_PARAMS, e),
            };
            match ctx
                .reconciler
                .request_lock(&params.message, TriggerOrigin::Admin)
                .await
            {
                Ok(outcome) => RpcResponse::success(
                    id,
                    serde_json::json!({ "locked": true, "enforced": outcome.enforced }),
                ),
                Err(e) => RpcResponse::error(id, ERR_PERSISTENCE, e.to_string()),
            }
        }

        RpcMethod::Unlock => match ctx.reconciler.request_unlock(TriggerOrigin::Admin).await {
            Ok(_) => RpcResponse::success(id, serde_json::json!({ "locked": false })),
            Err(e) => RpcResponse::error(id, ERR_PERSISTENCE, e.to_string()),
        },

        RpcMethod::SetMessage => {
            let params: LockParams = match parse_params(request.params) {
                Ok(params) => params,
                Err(e) => return RpcResponse::error(id, ERR_INVALID_PARAMS, e),
            };
            match ctx
                .reconciler
                .set_message(&params.message, TriggerOrigin::Admin)
                .await
            {
                Ok(applied) => {
                    RpcResponse::success(id, serde_json::json!({ "applied": applied }))
                }
                Err(e) => RpcResponse::error(id, ERR_PERSISTENCE, e.to_string()),
            }
        }

        RpcMethod::Locate => {
            ctx.locator.locate_now();
            RpcResponse::success(id, serde_json::json!({ "queued": true }))
        }

        RpcMethod::Reset => match ctx.store.clear_all().await {
            Ok(()) => {
                // Converge enforcement onto the freshly cleared state.
                ctx.reconciler.sync_enforcement(TriggerOrigin::Admin).await;
                info!("Full data-clear completed");
                RpcResponse::success(id, serde_json::json!({ "status": "reset_complete" }))
            }
            Err(e) => RpcResponse::error(id, ERR_PERSISTENCE, e.to_string()),
        },

        RpcMethod::Command => {
            let params: CommandParams = match parse_params(request.params) {
                Ok(params) => params,
                Err(e) => return RpcResponse::error(id, ERR_INVALID_PARAMS, e),
            };
            match ctx.handler.on_command(&params.kind, params.payload).await {
                Ok(disposition) => RpcResponse::success(
                    id,
                    serde_json::json!({
                        "accepted": disposition == CommandDisposition::Applied
                    }),
                ),
                // NACK: the transport should redeliver this command.
                Err(e) => RpcResponse::error(id, ERR_PERSISTENCE, e.to_string()),
            }
        }

        RpcMethod::BootCompleted => {
            ctx.handler.on_boot().await;
            RpcResponse::success(id, serde_json::json!({ "handled": true }))
        }

        RpcMethod::ScreenOn => {
            ctx.handler.on_screen_on().await;
            RpcResponse::success(id, serde_json::json!({ "handled": true }))
        }

        RpcMethod::TokenRefresh => {
            let params: TokenParams = match parse_params(request.params) {
                Ok(params) => params,
                Err(e) => return RpcResponse::error(id, ERR_INVALID_PARAMS, e),
            };
            match ctx.handler.on_token_refresh(&params.token).await {
                Ok(()) => RpcResponse::success(id, serde_json::json!({ "handled": true })),
                Err(e) => RpcResponse::error(id, ERR_PERSISTENCE, e.to_string()),
            }
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<serde_json::Value>,
) -> Result<T, String> {
    let params = params.ok_or_else(|| "Missing params".to_string())?;
    serde_json::from_value(params).map_err(|e| format!("Invalid params: {}", e))
}
