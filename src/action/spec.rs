//! Rebuilds a `ContainerCreateBody` from a live container's inspect
//! response, the way `docker-maid`'s `update_container` does: round-trip
//! the captured `Config` through JSON into `ContainerCreateBody`, then
//! graft the host config and networking config back on, since those two
//! live in separate top-level fields on the inspect response but aren't
//! part of `Config` itself.

use bollard::models::{ContainerCreateBody, ContainerInspectResponse, NetworkingConfig};

use super::error::ActionError;

/// Build the create-spec for the replacement container. `image` is the
/// reference to create it with: the post-pull reference for Update, the
/// container's current reference for Recreate/HealthRestart.
pub fn build_create_body(
    raw: &ContainerInspectResponse,
    image: &str,
) -> Result<ContainerCreateBody, ActionError> {
    let config = raw
        .config
        .clone()
        .ok_or_else(|| ActionError::SwapFailed("inspect response has no config".into()))?;
    let host_config = raw
        .host_config
        .clone()
        .ok_or_else(|| ActionError::SwapFailed("inspect response has no host config".into()))?;
    let networks = raw
        .network_settings
        .clone()
        .and_then(|settings| settings.networks);

    let mut body: ContainerCreateBody = serde_json::from_value(
        serde_json::to_value(&config)
            .map_err(|e| ActionError::SwapFailed(format!("serializing captured config: {e}")))?,
    )
    .map_err(|e| ActionError::SwapFailed(format!("rebuilding create body: {e}")))?;

    body.image = Some(image.to_string());
    body.host_config = Some(host_config);
    body.networking_config = Some(NetworkingConfig {
        endpoints_config: networks,
    });

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerConfig, HostConfig};

    #[test]
    fn rebuilds_body_with_overridden_image_and_host_config() {
        let raw = ContainerInspectResponse {
            config: Some(ContainerConfig {
                image: Some("nginx:1.24".to_string()),
                env: Some(vec!["FOO=bar".to_string()]),
                ..Default::default()
            }),
            host_config: Some(HostConfig {
                privileged: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };

        let body = build_create_body(&raw, "nginx:1.25").unwrap();
        assert_eq!(body.image.as_deref(), Some("nginx:1.25"));
        assert_eq!(body.env, Some(vec!["FOO=bar".to_string()]));
        assert!(body.host_config.is_some());
    }

    #[test]
    fn missing_config_errors() {
        let raw = ContainerInspectResponse::default();
        assert!(build_create_body(&raw, "nginx:1.25").is_err());
    }
}
