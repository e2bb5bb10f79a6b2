use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref CALLS_EXECUTED: Counter = Counter::with_opts(
        Opts::new("harness_calls_executed_total", "Total committed contract calls")
    ).unwrap();

    pub static ref CALLS_REVERTED: Counter = Counter::with_opts(
        Opts::new("harness_calls_reverted_total", "Total reverted contract calls")
    ).unwrap();

    pub static ref CONTRACTS_DEPLOYED: Counter = Counter::with_opts(
        Opts::new("harness_contracts_deployed_total", "Total contracts deployed")
    ).unwrap();

    pub static ref BLOCK_NUMBER: Gauge = Gauge::with_opts(
        Opts::new("harness_block_number", "Current block number")
    ).unwrap();

    pub static ref GAS_PER_CALL: Histogram = Histogram::with_opts(
        HistogramOpts::new("harness_gas_per_call", "Gas used per committed call")
            .buckets(vec![1_000.0, 1_500.0, 2_000.0, 3_000.0, 5_000.0, 10_000.0, 50_000.0])
    ).unwrap();
}

pub fn register_metrics() {
    REGISTRY.register(Box::new(CALLS_EXECUTED.clone())).ok();
    REGISTRY.register(Box::new(CALLS_REVERTED.clone())).ok();
    REGISTRY.register(Box::new(CONTRACTS_DEPLOYED.clone())).ok();
    REGISTRY.register(Box::new(BLOCK_NUMBER.clone())).ok();
    REGISTRY.register(Box::new(GAS_PER_CALL.clone())).ok();
}

/// Record a committed call
pub fn record_call(gas_used: u64, block_number: u64) {
    CALLS_EXECUTED.inc();
    GAS_PER_CALL.observe(gas_used as f64);
    BLOCK_NUMBER.set(block_number as f64);
}

pub fn record_revert() {
    CALLS_REVERTED.inc();
}

pub fn record_deployment(block_number: u64) {
    CONTRACTS_DEPLOYED.inc();
    BLOCK_NUMBER.set(block_number as f64);
}

/// Align the block gauge with runtime state (startup, rollback)
pub fn set_block_number(block_number: u64) {
    BLOCK_NUMBER.set(block_number as f64);
}

/// Export metrics in Prometheus text format
pub fn gather_text() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_text() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub fn create_metrics_router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Start Prometheus metrics server
pub async fn start_metrics_server(port: u16) -> std::io::Result<()> {
    register_metrics();

    let app = create_metrics_router();
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("📊 Prometheus metrics server starting on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}
