mod cors;
mod health;

use std::{any::Any, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    response::{IntoResponse, Response},
};
use musicgen::{MusicGenError, MusicService};
use resona_config::Config;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Port used when `server.listen_address` is not configured
const DEFAULT_PORT: u16 = 8000;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
    music: Arc<MusicService>,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the music service cannot be initialized, for
    /// example when the storage directory cannot be created
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)));

        let music = musicgen::build_service(config)?;

        let mut app = Router::new();

        // Health check
        if config.server.health.enabled {
            app = app.route(&config.server.health.path, axum::routing::get(health::health_handler));
        }

        // Music routes
        app = app.merge(musicgen::endpoint_router().with_state(Arc::clone(&music)));

        // Apply middleware layers (innermost first)

        // Unexpected handler faults become the usual JSON 500
        app = app.layer(CatchPanicLayer::custom(panic_response));

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        // CORS
        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        Ok(Self {
            router: app,
            listen_address,
            music,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener. Background
    /// downloads are not drained on this path.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered, then waits for
    /// in-flight audio downloads to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        self.music.shutdown().await;
        tracing::info!("audio downloads drained");

        Ok(())
    }
}

/// Render a handler panic with the same error body as every other failure
#[allow(clippy::needless_pass_by_value)]
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "request handler panicked");

    MusicGenError::InternalError(None).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    fn config(extra: &str, storage: &std::path::Path) -> Config {
        let toml = format!(
            "{extra}\n[music]\napi_token = \"r8_test\"\n\n[storage]\ndirectory = '{}'\n",
            storage.display()
        );
        Config::from_toml(&toml).unwrap()
    }

    #[tokio::test]
    async fn health_route_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(&config("[server.health]\npath = \"/healthz\"", dir.path())).unwrap();
        let router = server.into_router();

        let response = router
            .clone()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({"status": "healthy", "service": "music-generation"}));

        let response = router
            .oneshot(Request::get("/music/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn explode() -> StatusCode {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn handler_panic_renders_json_error() {
        let router = Router::new()
            .route("/boom", axum::routing::get(explode))
            .layer(CatchPanicLayer::custom(panic_response));

        let response = router
            .oneshot(Request::get("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[http::header::CONTENT_TYPE], "application/json");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "error": {"message": "Internal server error", "type": "internal_error", "code": 500}
            })
        );
    }

    #[tokio::test]
    async fn default_listen_address() {
        let dir = tempfile::tempdir().unwrap();
        let server = Server::new(&config("", dir.path())).unwrap();
        assert_eq!(server.listen_address(), SocketAddr::from(([0, 0, 0, 0], 8000)));
    }
}
