//! `LiveEngine` — `EngineOps` backed by a real Docker daemon via `bollard`.
//!
//! Grounded in the teacher's `docker::client::DockerClient` (connection
//! setup, 404 → domain-error mapping) and `docker::container`/`image`/
//! `shell` (per-operation wrappers), with the create/remove/prune flow
//! taken from the WarPlexTech `docker-maid` `update_container`/
//! `prune_images` reference since the teacher (a read-only log tailer)
//! never creates or prunes anything.

use std::time::Duration;

use bollard::Docker;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerCreateBody, ContainerInspectResponse};
use bollard::query_parameters::{
    CreateContainerOptions, ListContainersOptions, PruneImagesOptions, RemoveContainerOptions,
    RemoveImageOptions, RenameContainerOptions, StartContainerOptions, StopContainerOptions,
};
use futures_util::stream::StreamExt;

use super::error::EngineError;
use super::ops::{BoxFuture, EngineOps};
use super::types::{ContainerInfo, ExecResult, PruneResult};

#[derive(Debug, Clone)]
pub struct LiveEngine {
    client: Docker,
}

impl LiveEngine {
    pub fn connect(docker_host: Option<&str>) -> Result<Self, EngineError> {
        let client = match docker_host {
            Some(host) if !host.is_empty() => {
                let clean = host.trim_start_matches("unix://");
                Docker::connect_with_socket(clean, 120, bollard::API_DEFAULT_VERSION)
            }
            _ => Docker::connect_with_defaults(),
        }
        .map_err(|e| EngineError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client })
    }
}

fn map_not_found(id: &str, err: BollardError) -> EngineError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => EngineError::ContainerNotFound(id.to_string()),
        other => EngineError::Bollard(other),
    }
}

impl EngineOps for LiveEngine {
    fn list_containers<'a>(&'a self, all: bool) -> BoxFuture<'a, Vec<ContainerInfo>> {
        Box::pin(async move {
            let options = Some(ListContainersOptions {
                all,
                ..Default::default()
            });
            let summaries = self
                .client
                .list_containers(options)
                .await
                .map_err(EngineError::Bollard)?;

            let mut infos = Vec::with_capacity(summaries.len());
            for summary in summaries {
                if let Some(id) = summary.id.as_deref() {
                    let details = self
                        .client
                        .inspect_container(id, None)
                        .await
                        .map_err(EngineError::Bollard)?;
                    infos.push(ContainerInfo::from(details));
                }
            }
            Ok(infos)
        })
    }

    fn inspect_container<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ContainerInspectResponse> {
        Box::pin(async move {
            self.client
                .inspect_container(id, None)
                .await
                .map_err(|e| map_not_found(id, e))
        })
    }

    fn pull_image<'a>(&'a self, image: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            use bollard::query_parameters::CreateImageOptions;

            let (from_image, tag) = match image.rsplit_once(':') {
                Some((repo, tag)) if !tag.contains('/') => (repo.to_string(), tag.to_string()),
                _ => (image.to_string(), "latest".to_string()),
            };

            let options = Some(CreateImageOptions {
                from_image: Some(from_image),
                tag: Some(tag),
                ..Default::default()
            });

            let mut stream = self.client.create_image(options, None, None);
            while let Some(result) = stream.next().await {
                result.map_err(EngineError::Bollard)?;
            }
            Ok(())
        })
    }

    fn inspect_image<'a>(&'a self, image: &'a str) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let details = self
                .client
                .inspect_image(image)
                .await
                .map_err(|e| match e {
                    BollardError::DockerResponseServerError {
                        status_code: 404, ..
                    } => EngineError::ImageNotFound(image.to_string()),
                    other => EngineError::Bollard(other),
                })?;
            Ok(details.id.unwrap_or_default())
        })
    }

    fn create_container<'a>(
        &'a self,
        name: &'a str,
        body: ContainerCreateBody,
    ) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let options = CreateContainerOptions {
                name: Some(name.to_string()),
                ..Default::default()
            };
            let response = self
                .client
                .create_container(Some(options), body)
                .await
                .map_err(EngineError::Bollard)?;
            Ok(response.id)
        })
    }

    fn rename_container<'a>(&'a self, id: &'a str, new_name: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .rename_container(
                    id,
                    RenameContainerOptions {
                        name: new_name.to_string(),
                    },
                )
                .await
                .map_err(|e| map_not_found(id, e))
        })
    }

    fn start_container<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .start_container(id, None::<StartContainerOptions>)
                .await
                .map_err(|e| map_not_found(id, e))
        })
    }

    fn stop_container<'a>(&'a self, id: &'a str, timeout: Duration) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let options = Some(StopContainerOptions {
                t: Some(timeout.as_secs() as i32),
                ..Default::default()
            });
            self.client
                .stop_container(id, options)
                .await
                .map_err(|e| map_not_found(id, e))
        })
    }

    fn remove_container<'a>(&'a self, id: &'a str, force: bool) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let options = Some(RemoveContainerOptions {
                force,
                ..Default::default()
            });
            self.client
                .remove_container(id, options)
                .await
                .map_err(|e| map_not_found(id, e))
        })
    }

    fn exec<'a>(
        &'a self,
        id: &'a str,
        cmd: &'a [String],
        timeout: Duration,
    ) -> BoxFuture<'a, ExecResult> {
        Box::pin(async move {
            use bollard::exec::StartExecOptions;
            use bollard::models::ExecConfig;

            let config = ExecConfig {
                attach_stdout: Some(true),
                attach_stderr: Some(true),
                cmd: Some(cmd.to_vec()),
                ..Default::default()
            };

            let created = self
                .client
                .create_exec(id, config)
                .await
                .map_err(|e| map_not_found(id, e))?;

            let run = async {
                let start_options = Some(StartExecOptions {
                    detach: false,
                    ..Default::default()
                });
                if let bollard::exec::StartExecResults::Attached { mut output, .. } = self
                    .client
                    .start_exec(&created.id, start_options)
                    .await
                    .map_err(EngineError::Bollard)?
                {
                    while output.next().await.is_some() {}
                }

                let inspected = self
                    .client
                    .inspect_exec(&created.id)
                    .await
                    .map_err(EngineError::Bollard)?;
                Ok(inspected.exit_code)
            };

            match tokio::time::timeout(timeout, run).await {
                Ok(result) => Ok(ExecResult {
                    exit_code: result?,
                    timed_out: false,
                }),
                Err(_) => Ok(ExecResult {
                    exit_code: None,
                    timed_out: true,
                }),
            }
        })
    }

    fn remove_image<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .remove_image(id, None::<RemoveImageOptions>, None)
                .await
                .map_err(EngineError::Bollard)?;
            Ok(())
        })
    }

    fn prune_images<'a>(&'a self) -> BoxFuture<'a, PruneResult> {
        Box::pin(async move {
            let mut filters = std::collections::HashMap::new();
            filters.insert("dangling".to_string(), vec!["false".to_string()]);
            let options = Some(PruneImagesOptions {
                filters: Some(filters),
            });

            let response = self
                .client
                .prune_images(options)
                .await
                .map_err(EngineError::Bollard)?;

            Ok(PruneResult {
                images_deleted: response.images_deleted.unwrap_or_default().len(),
                space_reclaimed: response.space_reclaimed.unwrap_or_default() as u64,
            })
        })
    }
}
