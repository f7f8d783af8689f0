//! HTTP surface with deferred startup.
//!
//! `new()` wires shared state, `start()` binds the listener and publishes
//! the advertised origin, `serve()` accepts requests until shutdown. Handles
//! created after `start()` carry the real bound address.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    health_handler, liveness_handler, query_handler, readiness_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::config::InvokerConfig;
use crate::registry::{ServiceHandleRegistry, SharedOrigin};
use crate::traits::LocalServiceLookup;

/// How long `serve()` waits for in-flight queries after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns the listener and serves the invoker endpoint.
pub struct NetworkModule {
    config: NetworkConfig,
    invoker: Arc<InvokerConfig>,
    listener: Option<TcpListener>,
    origin: Arc<SharedOrigin>,
    handles: Arc<ServiceHandleRegistry>,
    lookup: Arc<dyn LocalServiceLookup>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    ///
    /// Handles are stamped through `origin`, which `start()` updates with
    /// the bound address.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        invoker: InvokerConfig,
        lookup: Arc<dyn LocalServiceLookup>,
    ) -> Self {
        let origin = Arc::new(SharedOrigin::new(format!("{}:{}", config.host, config.port)));
        let handles = Arc::new(ServiceHandleRegistry::new(origin.clone()));
        Self {
            config,
            invoker: Arc::new(invoker),
            listener: None,
            origin,
            handles,
            lookup,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// The handle registry served by this module.
    #[must_use]
    pub fn handles(&self) -> Arc<ServiceHandleRegistry> {
        Arc::clone(&self.handles)
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the router. Request bodies above `max_body_bytes` are
    /// refused with 413.
    ///
    /// Routes:
    /// - `POST /{invoker_path}/query` -- handle list for a service query
    /// - `GET /health` -- detailed health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /health/ready` -- readiness probe
    pub fn build_router(&self) -> Router {
        let state = AppState {
            handles: Arc::clone(&self.handles),
            lookup: Arc::clone(&self.lookup),
            shutdown: Arc::clone(&self.shutdown),
            invoker: Arc::clone(&self.invoker),
            start_time: Instant::now(),
        };

        Router::new()
            .route(&self.invoker.query_route(), post(query_handler))
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the listener and publishes the advertised origin.
    ///
    /// Returns the bound address; its port differs from the configured one
    /// when port 0 was requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("cannot bind {addr}"))?;
        let bound = listener.local_addr()?;

        let origin = self.config.advertised_origin(bound);
        self.origin.set(origin.clone());
        info!(%bound, %origin, route = %self.invoker.query_route(), "invoker listener bound");

        self.listener = Some(listener);
        Ok(bound)
    }

    /// Serves until `shutdown` resolves, then drains in-flight queries.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or on a fatal
    /// I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .context("start() must be called before serve()")?;
        let router = self.build_router();
        let controller = Arc::clone(&self.shutdown);

        controller.set_ready();

        if let Some(tls) = &self.config.tls {
            serve_tls(listener, router, tls, shutdown).await?;
        } else {
            info!("serving plain HTTP");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await?;
        }

        drain(&controller).await;
        Ok(())
    }
}

/// Serves TLS using `axum-server` with rustls on the pre-bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &TlsConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .context("cannot load TLS certificates")?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!(%addr, "serving TLS");

    axum_server::from_tcp_rustls(std_listener, rustls)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

async fn drain(controller: &ShutdownController) {
    controller.trigger_shutdown();
    if controller.wait_for_drain(DRAIN_TIMEOUT).await {
        info!("all in-flight queries drained");
    } else {
        warn!(
            in_flight = controller.in_flight_count(),
            "drain timeout expired with queries still in flight"
        );
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::{Request, StatusCode};
    use invoker_core::ServiceQuery;
    use tower::ServiceExt;

    use super::*;
    use crate::network::HealthState;
    use crate::registry::LocalServices;
    use crate::traits::OriginAddress;

    fn module() -> NetworkModule {
        let config = NetworkConfig {
            host: "127.0.0.1".to_string(),
            ..NetworkConfig::default()
        };
        NetworkModule::new(config, InvokerConfig::default(), Arc::new(LocalServices::new()))
    }

    #[test]
    fn new_does_not_bind() {
        let module = module();
        assert!(module.listener.is_none());
        assert_eq!(module.origin.origin(), "127.0.0.1:0");
    }

    #[test]
    fn shared_state_is_shared() {
        let module = module();
        assert!(Arc::ptr_eq(&module.handles(), &module.handles()));
        assert!(Arc::ptr_eq(
            &module.shutdown_controller(),
            &module.shutdown_controller()
        ));
    }

    #[test]
    fn build_router_creates_router() {
        let _router = module().build_router();
    }

    fn query_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/invoker/query")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn oversized_query_body_is_refused_with_413() {
        let config = NetworkConfig {
            host: "127.0.0.1".to_string(),
            max_body_bytes: 32,
            ..NetworkConfig::default()
        };
        let module = NetworkModule::new(
            config,
            InvokerConfig::default(),
            Arc::new(LocalServices::new()),
        );
        module.shutdown_controller().set_ready();
        let router = module.build_router();

        let response = router
            .clone()
            .oneshot(query_request(vec![b' '; 256]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let small = serde_json::to_vec(&ServiceQuery::new("a", "B")).unwrap();
        assert!(small.len() <= 32);
        let response = router.oneshot(query_request(small)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn start_publishes_bound_origin() {
        let mut module = module();
        let bound = module.start().await.unwrap();
        assert!(bound.port() > 0);
        assert_eq!(module.origin.origin(), format!("127.0.0.1:{}", bound.port()));
    }

    #[tokio::test]
    async fn serve_without_start_is_an_error() {
        let err = module().serve(std::future::ready(())).await.unwrap_err();
        assert!(err.to_string().contains("start()"));
    }

    #[tokio::test]
    async fn serve_drains_and_stops_on_shutdown() {
        let mut module = module();
        module.start().await.unwrap();
        let controller = module.shutdown_controller();

        module.serve(std::future::ready(())).await.unwrap();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }
}
