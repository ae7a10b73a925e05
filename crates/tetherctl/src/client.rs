//! Unix socket client for communicating with tetherd.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tether_common::rpc::{RpcMethod, RpcRequest, RpcResponse, SOCKET_PATH};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub struct TetherdClient {
    stream: UnixStream,
}

impl TetherdClient {
    /// Connect to the daemon's control socket.
    pub async fn connect_to(socket_path: &Path) -> Result<Self> {
        if !socket_path.exists() {
            return Err(anyhow!(
                "tetherd is not running (no socket at {}).\n\
                 Start it with: systemctl start tetherd",
                socket_path.display()
            ));
        }

        let stream = UnixStream::connect(socket_path).await.map_err(|e| {
            anyhow!(
                "Cannot connect to tetherd: {}\n\
                 The daemon may have crashed; try: systemctl restart tetherd",
                e
            )
        })?;

        Ok(Self { stream })
    }

    /// Send one RPC request and read its response.
    pub async fn call(
        &mut self,
        method: RpcMethod,
        params: Option<serde_json::Value>,
    ) -> Result<RpcResponse> {
        let request = RpcRequest::new(method, params);
        let mut payload = serde_json::to_string(&request)?;
        payload.push('\n');
        self.stream.write_all(payload.as_bytes()).await?;

        let mut reader = BufReader::new(&mut self.stream);
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        if line.is_empty() {
            return Err(anyhow!("tetherd closed the connection"));
        }

        let response: RpcResponse = serde_json::from_str(&line)?;
        if let Some(error) = &response.error {
            return Err(anyhow!("daemon error {}: {}", error.code, error.message));
        }
        Ok(response)
    }
}

/// Socket override for development installs (TETHERD_SOCKET env var).
pub fn socket_path() -> PathBuf {
    std::env::var("TETHERD_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(SOCKET_PATH))
}
