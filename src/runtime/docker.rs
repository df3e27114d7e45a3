//! `RuntimeClient` over the Docker Engine API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{Config, CreateContainerOptions, StartContainerOptions};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding};
use bollard::{API_DEFAULT_VERSION, Docker};
use futures::StreamExt;

use crate::config::DockerConfig;
use crate::runtime::error::{NotFoundKind, Result, RuntimeError};
use crate::runtime::image::ImageRef;
use crate::runtime::options::CreateOptions;
use crate::runtime::{ContainerInfo, PullProgress, PullReport, RuntimeClient};

/// Connect to the local Docker daemon.
///
/// Tries an explicitly configured socket first, then bollard's defaults
/// (`DOCKER_HOST` or the platform socket), then the per-user sockets used by
/// Docker Desktop and rootless installs. Connecting is lazy: when no
/// candidate answers a ping the default client is returned anyway, and the
/// first real call reports the transport error.
pub async fn connect_docker(config: &DockerConfig) -> Result<Docker> {
    if let Some(socket) = &config.socket {
        tracing::debug!("Connecting to Docker at configured socket {}", socket);
        return Docker::connect_with_socket(socket, config.timeout_secs, API_DEFAULT_VERSION)
            .map_err(|e| classify(e, NotFoundKind::Container));
    }

    let docker = Docker::connect_with_local_defaults()
        .map_err(|e| classify(e, NotFoundKind::Container))?
        .with_timeout(Duration::from_secs(config.timeout_secs));

    if docker.ping().await.is_ok() {
        return Ok(docker);
    }

    #[cfg(unix)]
    for candidate in fallback_sockets() {
        if !std::path::Path::new(&candidate).exists() {
            continue;
        }
        if let Ok(fallback) =
            Docker::connect_with_socket(&candidate, config.timeout_secs, API_DEFAULT_VERSION)
            && fallback.ping().await.is_ok()
        {
            tracing::debug!("Connected to Docker via fallback socket {}", candidate);
            return Ok(fallback);
        }
    }

    tracing::debug!("Docker did not answer ping; deferring errors to first request");
    Ok(docker)
}

#[cfg(unix)]
fn fallback_sockets() -> Vec<String> {
    let mut sockets = Vec::new();
    if let Some(home) = dirs::home_dir() {
        sockets.push(home.join(".docker/run/docker.sock").display().to_string());
    }
    if let Some(runtime_dir) = dirs::runtime_dir() {
        sockets.push(runtime_dir.join("docker.sock").display().to_string());
    }
    sockets
}

/// Translate a bollard error into a `RuntimeError`.
///
/// A 404 is reported as not-found of `not_found` kind, since the same status
/// means "no such container" on inspect and "no such image" on create.
fn classify(err: BollardError, not_found: NotFoundKind) -> RuntimeError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404,
            message,
        } => RuntimeError::NotFound {
            kind: not_found,
            message,
        },
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => RuntimeError::Remote {
            status: Some(status_code),
            message,
        },
        BollardError::IOError { err } => {
            RuntimeError::from_io(&err).unwrap_or_else(|| RuntimeError::Remote {
                status: None,
                message: err.to_string(),
            })
        }
        other => RuntimeError::connectivity_in_chain(&other).unwrap_or_else(|| {
            RuntimeError::Remote {
                status: None,
                message: other.to_string(),
            }
        }),
    }
}

/// Docker-backed runtime client.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connect using [`connect_docker`].
    pub async fn connect(config: &DockerConfig) -> Result<Self> {
        Ok(Self::new(connect_docker(config).await?))
    }

    /// Connect to an engine listening on plain HTTP, e.g. `tcp://127.0.0.1:2375`.
    pub fn connect_http(addr: &str, timeout_secs: u64) -> Result<Self> {
        let docker = Docker::connect_with_http(addr, timeout_secs, API_DEFAULT_VERSION)
            .map_err(|e| classify(e, NotFoundKind::Container))?;
        Ok(Self::new(docker))
    }

    /// Whether the daemon answers a ping.
    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| classify(e, NotFoundKind::Container))
    }

    fn container_config(options: &CreateOptions) -> Config<String> {
        let exposed_ports: HashMap<String, HashMap<(), ()>> = options
            .exposed_ports
            .keys()
            .map(|port| (port.clone(), HashMap::new()))
            .collect();

        let host_config = options.host_config.as_ref().map(|host| {
            let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = host
                .port_bindings
                .iter()
                .map(|(port, bindings)| {
                    let bindings = bindings
                        .iter()
                        .map(|b| PortBinding {
                            host_ip: b.host_ip.clone(),
                            host_port: b.host_port.clone(),
                        })
                        .collect();
                    (port.clone(), Some(bindings))
                })
                .collect();

            HostConfig {
                binds: if host.binds.is_empty() {
                    None
                } else {
                    Some(host.binds.clone())
                },
                port_bindings: if port_bindings.is_empty() {
                    None
                } else {
                    Some(port_bindings)
                },
                network_mode: host.network_mode.clone(),
                extra_hosts: if host.extra_hosts.is_empty() {
                    None
                } else {
                    Some(host.extra_hosts.clone())
                },
                ..Default::default()
            }
        });

        Config {
            image: options.image_ref().map(str::to_string),
            env: if options.env.is_empty() {
                None
            } else {
                Some(options.env.clone())
            },
            cmd: options.cmd.clone(),
            entrypoint: options.entrypoint.clone(),
            working_dir: options.working_dir.clone(),
            user: options.user.clone(),
            labels: if options.labels.is_empty() {
                None
            } else {
                Some(options.labels.clone().into_iter().collect())
            },
            exposed_ports: if exposed_ports.is_empty() {
                None
            } else {
                Some(exposed_ports)
            },
            host_config,
            ..Default::default()
        }
    }
}

#[async_trait]
impl RuntimeClient for DockerRuntime {
    async fn inspect_container(&self, id: &str) -> Result<ContainerInfo> {
        let response = self
            .docker
            .inspect_container(id, None)
            .await
            .map_err(|e| classify(e, NotFoundKind::Container))?;

        Ok(ContainerInfo {
            id: response.id.unwrap_or_else(|| id.to_string()),
            name: response.name.map(|n| n.trim_start_matches('/').to_string()),
            image: response.config.and_then(|c| c.image),
            running: response.state.and_then(|s| s.running).unwrap_or(false),
        })
    }

    async fn create_container(&self, options: &CreateOptions) -> Result<String> {
        let create_options: Option<CreateContainerOptions<String>> =
            options.name.as_ref().map(|name| CreateContainerOptions {
                name: name.clone(),
                ..Default::default()
            });

        let response = self
            .docker
            .create_container(create_options, Self::container_config(options))
            .await
            .map_err(|e| classify(e, NotFoundKind::Image))?;

        for warning in &response.warnings {
            tracing::warn!("Docker create warning: {}", warning);
        }

        Ok(response.id)
    }

    async fn pull_image(&self, image: &str) -> Result<PullReport> {
        let reference = ImageRef::parse(image).ok_or_else(|| RuntimeError::Remote {
            status: None,
            message: format!("invalid image reference '{}'", image),
        })?;

        let options = CreateImageOptions {
            from_image: reference.from_image(),
            tag: reference.pull_tag(),
            ..Default::default()
        };

        let mut report = PullReport {
            image: image.to_string(),
            records: Vec::new(),
        };
        let mut stream = self.docker.create_image(Some(options), None, None);

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(status) = &info.status {
                        tracing::trace!("Pull status: {}", status);
                    }
                    let error = info
                        .error
                        .or_else(|| info.error_detail.and_then(|d| d.message));
                    report.records.push(PullProgress {
                        status: info.status,
                        error,
                    });
                }
                Err(BollardError::DockerStreamError { error }) => {
                    report.records.push(PullProgress::error(error));
                    break;
                }
                Err(e) => return Err(classify(e, NotFoundKind::Image)),
            }
        }

        Ok(report)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        match self
            .docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            Err(BollardError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(classify(e, NotFoundKind::Container)),
        }
    }
}
