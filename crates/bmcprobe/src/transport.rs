use std::time::Duration;

use bmcprobe_core::explore::Fetch;
use bmcprobe_core::model::Controller;
use bmcprobe_core::obscure::obscure_default;
use bmcprobe_core::ProbeError;
use reqwest::Url;

use crate::prelude::*;

/// Authenticated HTTP access to one controller's Redfish service.
///
/// Certificate validation is disabled: management controllers ship with
/// self-signed certificates.
pub struct RedfishClient {
    client: reqwest::Client,
    base_url: Url,
}

impl RedfishClient {
    pub fn new(controller: &Controller, timeout: Option<Duration>) -> Result<Self> {
        use base64::Engine;
        use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};

        let base_url = Url::parse(&controller.base_url())
            .map_err(|e| eyre!("Invalid controller URL {}: {}", controller.base_url(), e))?;

        let auth_string = format!("{}:{}", controller.user(), controller.password());
        let auth_encoded = base64::engine::general_purpose::STANDARD.encode(&auth_string);

        let mut headers = HeaderMap::new();
        let mut auth_value = HeaderValue::from_str(&format!("Basic {auth_encoded}"))
            .map_err(|e| eyre!("Invalid header value: {}", e))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        log::debug!(
            "Connecting to {} as {}/{}",
            base_url,
            controller.user(),
            obscure_default(controller.password())
        );

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` against the service root.
    ///
    /// Absolute paths replace the base path, relative paths are appended.
    /// A link to another scheme, host or port is refused.
    pub fn resolve(&self, path: &str) -> Result<Url, ProbeError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ProbeError::Connection {
                path: path.to_string(),
                cause: format!("invalid path: {e}"),
            })?;

        if !same_origin(&self.base_url, &url) {
            return Err(ProbeError::Connection {
                path: path.to_string(),
                cause: format!(
                    "refusing to send credentials to {}",
                    url.origin().ascii_serialization()
                ),
            });
        }

        Ok(url)
    }
}

fn same_origin(base: &Url, url: &Url) -> bool {
    base.scheme() == url.scheme()
        && base.host_str() == url.host_str()
        && base.port_or_known_default() == url.port_or_known_default()
}

impl Fetch for RedfishClient {
    async fn fetch(&self, path: &str) -> bmcprobe_core::Result<serde_json::Value> {
        let url = self.resolve(path)?;
        log::debug!("{} + {} = {}", self.base_url, path, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProbeError::Connection {
                path: path.to_string(),
                cause: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Http {
                path: path.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.text().await.map_err(|e| ProbeError::Connection {
            path: path.to_string(),
            cause: e.to_string(),
        })?;

        serde_json::from_str(&body).map_err(|e| ProbeError::Parse {
            path: path.to_string(),
            cause: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use bmcprobe_core::explore::{ExploreState, Explorer};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// `root:calvin`
    const EXPECTED_AUTH: &str = "Basic cm9vdDpjYWx2aW4=";

    async fn service_root(headers: HeaderMap) -> Response {
        let authorized = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == EXPECTED_AUTH);
        if !authorized {
            return StatusCode::UNAUTHORIZED.into_response();
        }

        Json(json!({
            "@odata.id": "/redfish/v1",
            "RedfishVersion": "1.6.0",
            "Systems": {"@odata.id": "/redfish/v1/Systems"},
        }))
        .into_response()
    }

    /// Serve a small Redfish tree on a random local port.
    async fn spawn_mock() -> u16 {
        let app = Router::new()
            .route("/redfish/v1/", get(service_root))
            .route(
                "/redfish/v1/Systems",
                get(|| async {
                    Json(json!({"Members": [{"@odata.id": "/redfish/v1/Systems/System.Embedded.1"}]}))
                }),
            )
            .route(
                "/redfish/v1/Systems/System.Embedded.1",
                get(|| async {
                    Json(json!({
                        "Id": "System.Embedded.1",
                        "Model": "PowerEdge R640",
                        "MemorySummary": {"TotalSystemMemoryGiB": 64},
                    }))
                }),
            )
            .route(
                "/redfish/v1/Chassis/System.Embedded.1",
                get(|| async { Json(json!({"Manufacturer": "Dell Inc."})) }),
            )
            .route("/redfish/v1/Broken", get(|| async { "<html>not json</html>" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        port
    }

    fn client(port: u16, password: &str) -> RedfishClient {
        let controller = Controller::new("127.0.0.1", "root", password)
            .with_port(port)
            .with_scheme("http");
        RedfishClient::new(&controller, Some(Duration::from_secs(5))).unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let controller = Controller::new("10.0.0.5", "root", "calvin");
        let client = RedfishClient::new(&controller, None).unwrap();

        assert_eq!(
            client.resolve("Chassis/System.Embedded.1").unwrap().as_str(),
            "https://10.0.0.5/redfish/v1/Chassis/System.Embedded.1"
        );
        assert_eq!(
            client.resolve("/redfish/v1/Systems/1").unwrap().as_str(),
            "https://10.0.0.5/redfish/v1/Systems/1"
        );
        assert_eq!(
            client.resolve("/redfish/v1/").unwrap().as_str(),
            "https://10.0.0.5/redfish/v1/"
        );
    }

    #[test]
    fn test_base_url_keeps_custom_port() {
        let controller = Controller::new("bmc", "root", "calvin").with_port(8443);
        let client = RedfishClient::new(&controller, None).unwrap();

        assert_eq!(client.base_url().as_str(), "https://bmc:8443/redfish/v1/");
    }

    #[tokio::test]
    async fn test_fetch_success_sends_basic_auth() {
        let port = spawn_mock().await;

        let root = client(port, "calvin").fetch("/redfish/v1/").await.unwrap();

        assert_eq!(root["RedfishVersion"], "1.6.0");
    }

    #[tokio::test]
    async fn test_fetch_http_failure() {
        let port = spawn_mock().await;

        let err = client(port, "wrong").fetch("/redfish/v1/").await.unwrap_err();

        assert_eq!(
            err,
            ProbeError::Http {
                path: "/redfish/v1/".to_string(),
                status: 401,
                reason: "Unauthorized".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let port = spawn_mock().await;

        let err = client(port, "calvin").fetch("Managers").await.unwrap_err();

        assert!(matches!(err, ProbeError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_parse_failure() {
        let port = spawn_mock().await;

        let err = client(port, "calvin").fetch("Broken").await.unwrap_err();

        assert!(matches!(err, ProbeError::Parse { .. }));
    }

    #[test]
    fn test_resolve_refuses_other_origins() {
        let controller = Controller::new("10.0.0.5", "root", "calvin");
        let client = RedfishClient::new(&controller, None).unwrap();

        for link in [
            "//evil.example/redfish/v1/",
            "https://evil.example/redfish/v1/",
            "http://10.0.0.5/redfish/v1/",
            "https://10.0.0.5:8443/redfish/v1/",
        ] {
            let err = client.resolve(link).unwrap_err();
            assert!(matches!(err, ProbeError::Connection { .. }), "{link}");
        }
        assert_eq!(
            client.resolve("https://10.0.0.5:443/redfish/v1/Systems").unwrap().as_str(),
            "https://10.0.0.5/redfish/v1/Systems"
        );
    }

    /// Serve any path on a random local port, recording what was requested.
    async fn spawn_recorder() -> (u16, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let app = Router::new().fallback(move |uri: Uri| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(uri.to_string());
                Json(json!({"Name": "foreign"}))
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (port, seen)
    }

    #[tokio::test]
    async fn test_fetch_keeps_credentials_on_the_controller() {
        // Arrange
        let port = spawn_mock().await;
        let (foreign, seen) = spawn_recorder().await;
        let client = client(port, "calvin");

        // Act
        let relative = client.fetch(&format!("//127.0.0.1:{foreign}/steal")).await;
        let absolute = client
            .fetch(&format!("http://127.0.0.1:{foreign}/redfish/v1/"))
            .await;

        // Assert
        assert!(matches!(relative, Err(ProbeError::Connection { .. })));
        assert!(matches!(absolute, Err(ProbeError::Connection { .. })));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_connection_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = client(port, "calvin").fetch("/redfish/v1/").await.unwrap_err();

        assert!(matches!(err, ProbeError::Connection { .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_explore_over_http() {
        let port = spawn_mock().await;
        let mut explorer = Explorer::new(client(port, "calvin"));

        let state = explorer.explore().await;

        assert_eq!(state, ExploreState::Done);
        let inventory = explorer.inventory();
        assert_eq!(inventory.api_version.as_deref(), Some("1.6.0"));
        let system = &inventory.systems["System.Embedded.1"];
        assert_eq!(system.memory_gib, Some(64.0));
        assert_eq!(system.attributes.get_str("Model"), Some("PowerEdge R640"));
        assert!(system.processors.is_empty());
    }
}
