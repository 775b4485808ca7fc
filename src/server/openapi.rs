//! OpenAPI document advertised at `/v3/api-docs`.

use crate::config::{ConfigEnvironment, SERVER_URL_ENV, SERVER_URL_PROPERTY};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Placeholder URL that counts as "not configured".
const DEFAULT_LOCAL_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerEntry {
    pub url: String,
    pub description: String,
}

impl ServerEntry {
    fn new(url: impl Into<String>, description: &str) -> Self {
        Self {
            url: url.into(),
            description: description.to_string(),
        }
    }
}

/// Servers listed in the API document.
///
/// A configured public URL (`app.server.url`, else `APP_SERVER_URL`) comes
/// first; the local development server is always present.
pub fn server_entries(environment: &ConfigEnvironment, port: u16) -> Vec<ServerEntry> {
    let configured = environment
        .get_property(SERVER_URL_PROPERTY)
        .or_else(|| environment.env().get(SERVER_URL_ENV))
        .unwrap_or("");

    let mut servers = Vec::with_capacity(2);
    if !configured.is_empty() && configured != DEFAULT_LOCAL_URL {
        let url = configured.strip_suffix('/').unwrap_or(configured);
        info!("Advertising production server: {url}");
        servers.push(ServerEntry::new(url, "Production server"));
    } else {
        warn!("No production server URL configured. Using localhost only.");
    }

    servers.push(ServerEntry::new(
        format!("http://localhost:{port}"),
        "Local development server",
    ));
    servers
}

pub fn api_document(servers: &[ServerEntry]) -> Value {
    json!({
        "openapi": "3.0.1",
        "info": {
            "title": "Rewards API",
            "version": "1.0.0",
            "description": "Manage rewards for users with full CRUD operations.",
            "license": {
                "name": "Apache 2.0",
                "url": "https://www.apache.org/licenses/LICENSE-2.0.html"
            }
        },
        "servers": servers,
        "paths": {}
    })
}
