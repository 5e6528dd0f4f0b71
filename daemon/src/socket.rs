//! Unix socket server for renderer clients

use crate::protocol::{Request, Response};
use crate::snapshot::Snapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tracing::{error, info, warn};

pub struct SocketServer {
    path: PathBuf,
    listener: UnixListener,
}

impl SocketServer {
    pub async fn bind(path: &Path) -> std::io::Result<Self> {
        let _ = std::fs::remove_file(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(path)?;
        info!("Socket server listening on {:?}", path);
        Ok(Self { path: path.to_path_buf(), listener })
    }

    pub async fn accept(&self) -> std::io::Result<UnixStream> {
        let (stream, _) = self.listener.accept().await?;
        Ok(stream)
    }

    pub fn socket_path() -> PathBuf {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/run/user/{}/vmwatch.sock", uid))
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn write_message(writer: &mut OwnedWriteHalf, response: &Response) -> std::io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.write_all((json + "\n").as_bytes()).await
}

/// Serve one client: answer requests line by line and push every newly
/// published snapshot until the client disconnects.
pub async fn handle_client<H>(
    stream: UnixStream,
    mut snapshots: watch::Receiver<Arc<Snapshot>>,
    handler: Arc<H>,
) where
    H: RequestHandler + Send + Sync + 'static,
{
    let (reader, mut writer) = stream.into_split();
    // next_line() keeps partial input buffered when a push wins the select
    let mut lines = BufReader::new(reader).lines();
    snapshots.borrow_and_update();
    let mut pushing = true;

    loop {
        tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(None) => break,
                    Ok(Some(line)) => {
                        let response = match serde_json::from_str::<Request>(line.trim()) {
                            Ok(request) => handler.handle(request).await,
                            Err(e) => {
                                warn!("Invalid request: {}", e);
                                Response::error(e)
                            }
                        };
                        if let Err(e) = write_message(&mut writer, &response).await {
                            error!("Failed to write response: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Read error: {}", e);
                        break;
                    }
                }
            }
            changed = snapshots.changed(), if pushing => {
                if changed.is_err() {
                    // publisher gone; keep answering requests
                    pushing = false;
                    continue;
                }
                let snapshot = Arc::clone(&snapshots.borrow_and_update());
                let push = Response::Snapshot { data: (*snapshot).clone() };
                if let Err(e) = write_message(&mut writer, &push).await {
                    error!("Failed to push snapshot: {}", e);
                    break;
                }
            }
        }
    }
}

#[async_trait::async_trait]
pub trait RequestHandler {
    async fn handle(&self, request: Request) -> Response;
}
