//! Invoker node binary.
//!
//! Hosts a demo `Echo` service, exposes it on the invoker query endpoint and
//! serves until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use invoker_core::RequestContext;
use invoker_server::network::{NetworkConfig, NetworkModule};
use invoker_server::{
    builtin_handlers, InvocationError, InvokerConfig, LocalDefaultHandlerFactory, LocalServices,
    MicroserviceProxyFactory, StaticHandlerSource,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

invoker_server::service_contract! {
    /// Echoes its input back.
    pub trait Echo as EchoProxy {
        fn echo(message: String) -> String;
    }
}

struct EchoService {
    node_id: String,
}

#[async_trait]
impl Echo for EchoService {
    async fn echo(&self, message: String) -> Result<String, InvocationError> {
        Ok(format!("[{}] {message}", self.node_id))
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

/// Invoker node command line arguments.
#[derive(Parser, Debug)]
#[command(name = "invoker-node")]
#[command(about = "Exposes local microservices over the invoker HTTP endpoint")]
struct Args {
    /// Bind address
    #[arg(long, env = "INVOKER_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port (0 picks a free one)
    #[arg(long, env = "INVOKER_PORT", default_value_t = 8080)]
    port: u16,

    /// Host name stamped into exposed handles
    #[arg(long, env = "INVOKER_ADVERTISED_HOST")]
    advertised_host: Option<String>,

    /// Path segment of the query endpoint
    #[arg(long, env = "INVOKER_PATH", default_value = "invoker")]
    invoker_path: String,

    /// Node identifier used in logs and health output
    #[arg(long, env = "INVOKER_NODE_ID", default_value = "invoker-node")]
    node_id: String,

    /// Default proxied call timeout in milliseconds
    #[arg(long, env = "INVOKER_CALL_TIMEOUT_MS", default_value_t = 30_000)]
    call_timeout_ms: u64,

    /// Concurrent proxied invocations before load shedding
    #[arg(long, env = "INVOKER_MAX_CONCURRENT", default_value_t = 1000)]
    max_concurrent: u32,

    /// HTTP request timeout in seconds
    #[arg(long, env = "INVOKER_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Log output format
    #[arg(long, env = "INVOKER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "INVOKER_METRICS_PORT")]
    metrics_port: Option<u16>,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    if let Some(port) = args.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("cannot install Prometheus exporter")?;
        info!(%addr, "metrics exporter listening");
    }

    let invoker = InvokerConfig {
        node_id: args.node_id.clone(),
        default_call_timeout_ms: args.call_timeout_ms,
        max_concurrent_invocations: args.max_concurrent,
        invoker_path: args.invoker_path,
    };
    let network = NetworkConfig {
        host: args.host,
        port: args.port,
        advertised_host: args.advertised_host,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        ..NetworkConfig::default()
    };

    let services = Arc::new(LocalServices::new());
    services.export(
        "echo",
        Arc::new(EchoService {
            node_id: args.node_id,
        }) as Arc<dyn Echo>,
    );

    let handlers = StaticHandlerSource::new();
    for descriptor in builtin_handlers(&invoker) {
        handlers.register_method_handler(descriptor);
    }
    let proxies = MicroserviceProxyFactory::new(
        Arc::new(handlers),
        Arc::new(LocalDefaultHandlerFactory::new(services.clone())),
    );

    let echo = proxies
        .create_proxy::<dyn Echo>(RequestContext::new().with_service_name("echo"))
        .context("cannot create echo proxy")?;
    let reply = echo.echo("self-check".to_string()).await?;
    info!(%reply, "local proxy round trip ok");

    let mut module = NetworkModule::new(network, invoker, services);
    module.start().await?;

    module
        .serve(async {
            // If the signal handler cannot be installed, run until killed.
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            info!("shutdown requested");
        })
        .await
}
