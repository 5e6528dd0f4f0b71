use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};
use vmwatch_daemon::{
    collector::LinuxProcessCollector,
    config::Config,
    monitor::Monitor,
    protocol::{Request, Response, StatusData},
    sampler::SamplingLoop,
    socket::{handle_client, RequestHandler, SocketServer},
};

struct DaemonState {
    sampler: SamplingLoop,
    config: Config,
}

#[async_trait::async_trait]
impl RequestHandler for DaemonState {
    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetSnapshot => Response::Snapshot {
                data: (*self.sampler.latest()).clone(),
            },

            Request::ListEntities => Response::Entities {
                data: self.sampler.latest().keys().cloned().collect(),
            },

            Request::GetStatus => {
                let snapshot = self.sampler.latest();
                Response::Status {
                    data: StatusData {
                        running: self.sampler.is_running(),
                        seq: snapshot.seq,
                        entity_count: snapshot.entities.len() as u32,
                        poll_interval_ms: self.config.general.poll_interval_ms,
                        window_capacity: self.config.general.window_capacity,
                        pattern: self.config.filter.pattern.clone(),
                    },
                }
            }

            Request::GetConfig => Response::Config {
                data: self.config.clone(),
            },

            Request::PauseMonitoring => Response::Ack {
                changed: self.sampler.stop(),
            },

            Request::ResumeMonitoring => Response::Ack {
                changed: self.sampler.start(self.config.poll_interval()),
            },
        }
    }
}

fn load_config() -> Config {
    let config_path = Config::config_path();
    if config_path.exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        info!("No config file found, using defaults");
        Config::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    info!("vmwatch starting...");

    let config = load_config();
    info!(
        "Watching processes matching {:?} every {} ms, keeping {} samples",
        config.filter.pattern, config.general.poll_interval_ms, config.general.window_capacity
    );

    let monitor = Monitor::new(
        Arc::new(LinuxProcessCollector::new()),
        config.name_filter(),
        config.general.window_capacity,
    );
    let sampler = SamplingLoop::new(monitor, config.sample_timeout());
    sampler.start(config.poll_interval());

    let server = SocketServer::bind(&SocketServer::socket_path()).await?;
    let state = Arc::new(DaemonState { sampler, config });

    info!("Ready, listening for renderer connections...");

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let state = Arc::clone(&state);
                    let snapshots = state.sampler.subscribe();
                    tokio::spawn(async move {
                        handle_client(stream, snapshots, state).await;
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    state.sampler.shutdown().await;
    Ok(())
}
