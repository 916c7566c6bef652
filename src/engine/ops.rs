//! `EngineOps` — the capability set the rest of the crate depends on.
//!
//! Mirrors the shape of the teacher's `client::docker::DockerOps`: async
//! methods aren't object-safe, so each returns a boxed, pinned future
//! (`Pin<Box<dyn Future<...> + Send + 'a>>`) instead of using `async fn`.
//! This lets `inventory`, `action`, and `tests` all hold a
//! `&dyn EngineOps`/`Arc<dyn EngineOps>` and swap `LiveEngine` for
//! `FakeEngine` without any generic parameter threading through the crate.
//!
//! Deliberately narrower than the teacher's trait: Guerite only ever
//! inspects, creates, starts, stops, removes, execs into, and prunes —
//! it has no log-streaming or stats-polling callers, so those methods
//! were not carried over.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bollard::models::{ContainerCreateBody, ContainerInspectResponse};

use super::error::EngineError;
use super::types::{ContainerInfo, ExecResult, PruneResult};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, EngineError>> + Send + 'a>>;

pub trait EngineOps: Send + Sync {
    fn list_containers<'a>(&'a self, all: bool) -> BoxFuture<'a, Vec<ContainerInfo>>;

    fn inspect_container<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ContainerInspectResponse>;

    fn pull_image<'a>(&'a self, image: &'a str) -> BoxFuture<'a, ()>;

    /// Resolves `image` (a `repo:tag` reference) to the image id it
    /// currently points at locally. Called after `pull_image` to learn
    /// whether the pull actually moved the tag.
    fn inspect_image<'a>(&'a self, image: &'a str) -> BoxFuture<'a, String>;

    fn create_container<'a>(
        &'a self,
        name: &'a str,
        body: ContainerCreateBody,
    ) -> BoxFuture<'a, String>;

    fn rename_container<'a>(&'a self, id: &'a str, new_name: &'a str) -> BoxFuture<'a, ()>;

    fn start_container<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ()>;

    fn stop_container<'a>(&'a self, id: &'a str, timeout: Duration) -> BoxFuture<'a, ()>;

    fn remove_container<'a>(&'a self, id: &'a str, force: bool) -> BoxFuture<'a, ()>;

    fn exec<'a>(
        &'a self,
        id: &'a str,
        cmd: &'a [String],
        timeout: Duration,
    ) -> BoxFuture<'a, ExecResult>;

    fn remove_image<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ()>;

    fn prune_images<'a>(&'a self) -> BoxFuture<'a, PruneResult>;
}
