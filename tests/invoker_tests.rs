use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};

use sluice::invoker::{AnalysisInvoker, HttpInvoker, InvokeError};

async fn spawn_stub(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

#[tokio::test]
async fn start_analysis_posts_job_id_and_parses_handle() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route(
            "/analysis",
            post(
                |State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                    seen.lock().unwrap().push(body);
                    Json(json!({ "executionArn": "arn:test:started" }))
                },
            ),
        )
        .with_state(Arc::clone(&seen));
    let addr = spawn_stub(router).await;

    let invoker = HttpInvoker::new(format!("http://{addr}"));
    let execution = invoker.start_analysis("job-1").await.unwrap();
    assert_eq!(execution.execution_arn, "arn:test:started");

    let bodies = seen.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["uuid"], "job-1");
    // The options map rides along opaquely
    assert_eq!(bodies[0]["input"]["aiOptions"]["celeb"], true);
}

#[tokio::test]
async fn non_2xx_is_a_hard_failure_with_the_status_code() {
    let router = Router::new().route(
        "/analysis",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "draining") }),
    );
    let addr = spawn_stub(router).await;

    let invoker = HttpInvoker::new(format!("http://{addr}"));
    let err = invoker.start_analysis("job-1").await.unwrap_err();
    match err {
        InvokeError::Status { code, message } => {
            assert_eq!(code, 503);
            assert_eq!(message, "draining");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_execution_handle_is_malformed() {
    let router = Router::new().route(
        "/analysis",
        post(|| async { Json(json!({ "status": "ok" })) }),
    );
    let addr = spawn_stub(router).await;

    let invoker = HttpInvoker::new(format!("http://{addr}"));
    let err = invoker.start_analysis("job-1").await.unwrap_err();
    assert!(matches!(err, InvokeError::Malformed(_)));
}
