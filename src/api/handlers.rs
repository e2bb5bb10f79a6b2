use axum::{
    extract::{State, Json, Path},
    routing::{get, post},
    Router, http::StatusCode,
    http::Method,
};
use tower_http::cors::{CorsLayer, Any};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use parking_lot::RwLock;
use crate::core::Address;
use crate::runtime::{
    resolve_account, Call, CallOutput, CommitError, Deployment, Receipt, Runtime, RuntimeStats,
};
use crate::storage::{RuntimeStorage, StorageError};

/// API state
pub struct ApiState {
    pub runtime: Arc<RwLock<Runtime>>,
    /// Committed state and receipts are written here when present
    pub storage: Option<Arc<RuntimeStorage>>,
}

impl ApiState {
    fn persist(&self, runtime: &Runtime, receipt: Option<&Receipt>) -> Result<(), StorageError> {
        if let Some(storage) = &self.storage {
            storage.save_state(runtime.state())?;
            if let Some(receipt) = receipt {
                storage.save_receipt(receipt)?;
            }
        }
        Ok(())
    }
}

/// Get runtime stats
async fn get_stats(
    State(state): State<Arc<ApiState>>,
) -> Json<RuntimeStats> {
    Json(state.runtime.read().stats())
}

/// List the deterministic signer accounts
async fn get_signers(
    State(state): State<Arc<ApiState>>,
) -> Json<Vec<Address>> {
    Json(state.runtime.read().signers().to_vec())
}

/// Deploy request. `deployer` is a signer index or an address.
#[derive(Deserialize)]
pub struct DeployRequest {
    pub deployer: String,
    pub deployment: Deployment,
}

#[derive(Serialize)]
pub struct DeployResponse {
    pub success: bool,
    pub address: Option<Address>,
    pub error: Option<String>,
}

impl DeployResponse {
    fn failed(status: StatusCode, error: String) -> (StatusCode, Json<Self>) {
        (status, Json(Self { success: false, address: None, error: Some(error) }))
    }
}

async fn deploy_contract(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<DeployRequest>,
) -> (StatusCode, Json<DeployResponse>) {
    let mut runtime = state.runtime.write();
    let deployer = match resolve_account(runtime.signers(), &req.deployer) {
        Ok(addr) => addr,
        Err(e) => return DeployResponse::failed(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let address = match runtime.commit(
        |rt| rt.deploy(deployer, req.deployment),
        |rt, _| state.persist(rt, None),
    ) {
        Ok(addr) => addr,
        Err(CommitError::Runtime(e)) => {
            return DeployResponse::failed(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(CommitError::Persist(e)) => {
            tracing::error!("Failed to persist deployment: {}", e);
            return DeployResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    (
        StatusCode::OK,
        Json(DeployResponse { success: true, address: Some(address), error: None }),
    )
}

/// State-changing call. `from` is a signer index or an address.
#[derive(Deserialize)]
pub struct ExecuteRequest {
    pub from: String,
    pub contract: Address,
    pub call: Call,
}

#[derive(Serialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub receipt: Option<Receipt>,
    pub error: Option<String>,
}

impl ExecuteResponse {
    fn failed(status: StatusCode, error: String) -> (StatusCode, Json<Self>) {
        (status, Json(Self { success: false, receipt: None, error: Some(error) }))
    }
}

async fn execute_call(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<ExecuteRequest>,
) -> (StatusCode, Json<ExecuteResponse>) {
    let mut runtime = state.runtime.write();
    let caller = match resolve_account(runtime.signers(), &req.from) {
        Ok(addr) => addr,
        Err(e) => return ExecuteResponse::failed(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let receipt = match runtime.commit(
        |rt| rt.execute(caller, req.contract, req.call),
        |rt, receipt| state.persist(rt, Some(receipt)),
    ) {
        Ok(receipt) => receipt,
        Err(CommitError::Runtime(e)) => {
            return ExecuteResponse::failed(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(CommitError::Persist(e)) => {
            tracing::error!("Failed to persist call, rolled back: {}", e);
            return ExecuteResponse::failed(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    (
        StatusCode::OK,
        Json(ExecuteResponse { success: true, receipt: Some(receipt), error: None }),
    )
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub contract: Address,
    pub call: Call,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub output: Option<CallOutput>,
    pub error: Option<String>,
}

async fn query_call(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<QueryRequest>,
) -> (StatusCode, Json<QueryResponse>) {
    match state.runtime.read().query(req.contract, &req.call) {
        Ok(output) => (
            StatusCode::OK,
            Json(QueryResponse { success: true, output: Some(output), error: None }),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(QueryResponse { success: false, output: None, error: Some(e.to_string()) }),
        ),
    }
}

/// Get a stored receipt by transaction hash
async fn get_receipt(
    State(state): State<Arc<ApiState>>,
    Path(hash): Path<String>,
) -> Result<Json<Receipt>, StatusCode> {
    let storage = state.storage.as_ref().ok_or(StatusCode::NOT_FOUND)?;
    match storage.load_receipt(&hash) {
        Ok(receipt) => Ok(Json(receipt)),
        Err(StorageError::ReceiptNotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to load receipt {}: {}", hash, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Create the API router
pub fn create_router(
    runtime: Arc<RwLock<Runtime>>,
    storage: Option<Arc<RuntimeStorage>>,
) -> Router {
    let state = Arc::new(ApiState { runtime, storage });

    // Configure CORS to allow requests from any origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/signers", get(get_signers))
        .route("/api/deploy", post(deploy_contract))
        .route("/api/execute", post(execute_call))
        .route("/api/query", post(query_call))
        .route("/api/receipt/:hash", get(get_receipt))
        .layer(cors)
        .with_state(state)
}

/// Start the API server
pub async fn start_server(
    runtime: Arc<RwLock<Runtime>>,
    storage: Option<Arc<RuntimeStorage>>,
    port: u16,
) -> std::io::Result<()> {
    let app = create_router(runtime, storage);
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("🚀 Token harness API server starting on {}", addr);
    tracing::info!("📡 Endpoints:");
    tracing::info!("   GET  /api/stats - Runtime statistics");
    tracing::info!("   GET  /api/signers - Development accounts");
    tracing::info!("   POST /api/deploy - Deploy a token contract");
    tracing::info!("   POST /api/execute - Execute a state-changing call");
    tracing::info!("   POST /api/query - Evaluate a read-only call");
    tracing::info!("   GET  /api/receipt/:hash - Fetch a receipt");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<RwLock<Runtime>>) {
        let runtime = Arc::new(RwLock::new(Runtime::new(RuntimeConfig::default())));
        (create_router(runtime.clone(), None), runtime)
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_deploy_execute_query() {
        let (app, runtime) = app();
        let owner = runtime.read().signers()[0];

        let (status, body) = post_json(
            &app,
            "/api/deploy",
            json!({
                "deployer": "0",
                "deployment": {"standard": "fungible", "name": "SimpleToken", "symbol": "STT", "decimals": "18"}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["address"].as_str().unwrap().to_string();

        let (status, body) = post_json(
            &app,
            "/api/execute",
            json!({
                "from": "0",
                "contract": token,
                "call": {"fungible": {"mint": {"to": owner.to_string(), "amount": 10000}}}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = post_json(
            &app,
            "/api/query",
            json!({
                "contract": token,
                "call": {"fungible": {"balanceOf": {"account": owner.to_string()}}}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"]["amount"], 10000);
    }

    #[tokio::test]
    async fn test_revert_is_bad_request() {
        let (app, runtime) = app();
        let (owner, other) = {
            let rt = runtime.read();
            (rt.signers()[0], rt.signers()[1])
        };
        let token = runtime
            .write()
            .deploy(
                owner,
                Deployment::Fungible { name: "T".into(), symbol: "T".into(), decimals: "0".into() },
            )
            .unwrap();

        let (status, body) = post_json(
            &app,
            "/api/execute",
            json!({
                "from": "0",
                "contract": token.to_string(),
                "call": {"fungible": {"transfer": {"to": other.to_string(), "amount": 1}}}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("Insufficient balance"));
    }

    #[test]
    fn test_signers_endpoint() {
        let (app, runtime) = app();
        let expected = runtime.read().signers().len();

        let response = tokio_test::block_on(
            app.oneshot(Request::builder().uri("/api/signers").body(Body::empty()).unwrap()),
        )
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = tokio_test::block_on(axum::body::to_bytes(response.into_body(), usize::MAX)).unwrap();
        let signers: Vec<Address> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(signers.len(), expected);
    }
}
