use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medsum_core::AppContext;
use medsum_core::config_file::Settings;
use medsum_onnx::OnnxModelProvider;
use medsum_pdf_mupdf::MupdfBackend;

mod handlers;
mod models;
mod state;
mod template;
mod upload;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::load();
    tracing::info!(
        summarizer = %settings.summarizer_dir.display(),
        ner = %settings.ner_dir.display(),
        "models load on first request"
    );

    let ctx = AppContext::new(
        Arc::new(MupdfBackend::new()),
        Arc::new(OnnxModelProvider::from_settings(&settings)),
    );
    let state = Arc::new(AppState::new(ctx, settings.max_upload_mb));

    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    println!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

fn app(state: Arc<AppState>) -> axum::Router {
    let body_limit =
        axum::extract::DefaultBodyLimit::max(state.max_upload_mb as usize * 1024 * 1024);

    axum::Router::new()
        .route("/", axum::routing::get(handlers::index::index))
        .route("/analyze", axum::routing::post(handlers::analyze::analyze))
        .route(
            "/analyze/stream",
            axum::routing::post(handlers::stream::stream),
        )
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use medsum_core::{
        AggregationStrategy, BackendError, EntityAnnotation, GenerationParams, ModelError,
        ModelProvider, PdfBackend, SummarizationModel, TokenClassifier,
    };

    const BOUNDARY: &str = "medsum-test-boundary";
    const PAPER: &str = "The patient exhibited symptoms of Type 2 Diabetes.\nCreative Commons License.\n";

    struct FixedPdf(Result<Vec<String>, String>);

    impl PdfBackend for FixedPdf {
        fn extract_pages(&self, _data: &[u8]) -> Result<Vec<String>, BackendError> {
            self.0.clone().map_err(BackendError::OpenError)
        }
    }

    struct EchoSummarizer;

    impl SummarizationModel for EchoSummarizer {
        fn generate(&self, text: &str, _params: &GenerationParams) -> Result<String, ModelError> {
            Ok(format!("Summary: {}", text))
        }
    }

    struct DiabetesTagger;

    impl TokenClassifier for DiabetesTagger {
        fn classify(
            &self,
            _text: &str,
            _aggregation: AggregationStrategy,
        ) -> Result<Vec<EntityAnnotation>, ModelError> {
            Ok(vec![EntityAnnotation::new(
                "Disease_disorder",
                "Type 2 Diabetes",
                0.987,
            )])
        }
    }

    #[derive(Default)]
    struct CountingProvider {
        loads: AtomicUsize,
        fail: bool,
    }

    impl ModelProvider for CountingProvider {
        fn load_summarizer(&self) -> Result<Arc<dyn SummarizationModel>, ModelError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ModelError::Load("no encoder_model.onnx".into()));
            }
            Ok(Arc::new(EchoSummarizer))
        }

        fn load_token_classifier(&self) -> Result<Arc<dyn TokenClassifier>, ModelError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(DiabetesTagger))
        }
    }

    fn test_state(pages: Result<Vec<String>, String>, provider: Arc<CountingProvider>) -> Arc<AppState> {
        let ctx = AppContext::new(Arc::new(FixedPdf(pages)), provider);
        Arc::new(AppState::new(ctx, 1))
    }

    fn paper_state() -> (Arc<AppState>, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider::default());
        (test_state(Ok(vec![PAPER.to_string()]), provider.clone()), provider)
    }

    fn multipart(disease: Option<&str>, pdf: Option<&[u8]>) -> Body {
        let mut body = Vec::new();
        if let Some(disease) = disease {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"disease_name\"\r\n\r\n{disease}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(pdf) = pdf {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"pdf\"; filename=\"paper.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(pdf);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn post(uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    async fn body_string(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// `(event, data)` pairs in stream order.
    fn sse_events(body: &str) -> Vec<(String, serde_json::Value)> {
        body.split("\n\n")
            .filter_map(|chunk| {
                let mut event = None;
                let mut data = None;
                for line in chunk.lines() {
                    if let Some(v) = line.strip_prefix("event:") {
                        event = Some(v.trim().to_string());
                    } else if let Some(v) = line.strip_prefix("data:") {
                        data = serde_json::from_str(v.trim()).ok();
                    }
                }
                Some((event?, data?))
            })
            .collect()
    }

    #[tokio::test]
    async fn index_serves_form() {
        let (state, provider) = paper_state();
        let resp = app(state)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.contains("name=\"disease_name\""));
        assert_eq!(provider.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn analyze_returns_summary_and_entities() {
        let (state, _) = paper_state();
        let resp = app(state)
            .oneshot(post(
                "/analyze",
                multipart(Some("Type 2 Diabetes"), Some(b"%PDF-1.4 fake")),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["status"], "Processing file for disease: Type 2 Diabetes");
        assert_eq!(
            json["summary"],
            "Summary: The patient exhibited symptoms of Type 2 Diabetes."
        );
        assert_eq!(json["entities"][0]["text"], "Type 2 Diabetes");
        assert_eq!(
            json["entities"][0]["line"],
            "- **Disease_disorder**: Type 2 Diabetes (score: 0.99)"
        );
        assert!(json["warning"].is_null());
    }

    #[tokio::test]
    async fn analyze_warns_on_empty_document() {
        let provider = Arc::new(CountingProvider::default());
        let state = test_state(Ok(vec!["\u{00a9}\u{00a9}".into(), "  \n".into()]), provider.clone());
        let resp = app(state)
            .oneshot(post("/analyze", multipart(Some("Flu"), Some(b"%PDF-1.4"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(json["warning"], "No valid text found in the PDF.");
        assert!(json["summary"].is_null());
        assert_eq!(json["entities"].as_array().unwrap().len(), 0);
        assert_eq!(provider.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn analyze_rejects_bad_forms() {
        let (state, _) = paper_state();

        let resp = app(state.clone())
            .oneshot(post("/analyze", multipart(None, Some(b"%PDF-1.4"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app(state.clone())
            .oneshot(post("/analyze", multipart(Some("Flu"), None)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app(state)
            .oneshot(post("/analyze", multipart(Some("Flu"), Some(b""))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(resp).await.contains("empty"));
    }

    #[tokio::test]
    async fn upload_bytes_are_judged_by_the_pdf_backend() {
        let (state, _) = paper_state();
        let resp = app(state)
            .oneshot(post(
                "/analyze",
                multipart(Some("Flu"), Some(b"\xEF\xBB\xBF%PDF-1.4 with a BOM")),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let provider = Arc::new(CountingProvider::default());
        let state = test_state(Err("no objects found".into()), provider.clone());
        let resp = app(state)
            .oneshot(post("/analyze", multipart(Some("Flu"), Some(b"GIF89a"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_string(resp).await.contains("invalid PDF document"));
        assert_eq!(provider.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn analyze_maps_pipeline_errors_to_status_codes() {
        let provider = Arc::new(CountingProvider::default());
        let state = test_state(Err("not a PDF".into()), provider);
        let resp = app(state)
            .oneshot(post("/analyze", multipart(Some("Flu"), Some(b"GIF89a"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let provider = Arc::new(CountingProvider {
            fail: true,
            ..Default::default()
        });
        let state = test_state(Ok(vec![PAPER.to_string()]), provider);
        let resp = app(state)
            .oneshot(post("/analyze", multipart(Some("Flu"), Some(b"%PDF-1.4"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn models_load_once_across_requests() {
        let (state, provider) = paper_state();
        for _ in 0..3 {
            let resp = app(state.clone())
                .oneshot(post("/analyze", multipart(Some("Flu"), Some(b"%PDF-1.4"))))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
        assert_eq!(provider.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stream_reports_each_stage() {
        let (state, _) = paper_state();
        let resp = app(state)
            .oneshot(post(
                "/analyze/stream",
                multipart(Some("Type 2 Diabetes"), Some(b"%PDF-1.4")),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let events = sse_events(&body_string(resp).await);
        let names: Vec<&str> = events.iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(
            names,
            ["status", "extraction_complete", "summary", "entities", "complete"]
        );
        assert_eq!(events[0].1["message"], "Processing file for disease: Type 2 Diabetes");
        assert_eq!(events[1].1["text_chars"], 50);
        assert_eq!(events[2].1["generated"], true);
        assert_eq!(events[3].1["entities"][0]["label"], "Disease_disorder");
        assert_eq!(events[4].1["result"]["disease_name"], "Type 2 Diabetes");
    }

    #[tokio::test]
    async fn stream_warns_and_completes_on_empty_document() {
        let provider = Arc::new(CountingProvider::default());
        let state = test_state(Ok(vec![String::new()]), provider.clone());
        let resp = app(state)
            .oneshot(post("/analyze/stream", multipart(Some("Flu"), Some(b"%PDF-1.4"))))
            .await
            .unwrap();

        let events = sse_events(&body_string(resp).await);
        let names: Vec<&str> = events.iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(names, ["status", "warning", "complete"]);
        assert_eq!(events[1].1["message"], "No valid text found in the PDF.");
        assert_eq!(provider.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stream_sends_error_event_on_model_failure() {
        let provider = Arc::new(CountingProvider {
            fail: true,
            ..Default::default()
        });
        let state = test_state(Ok(vec![PAPER.to_string()]), provider);
        let resp = app(state)
            .oneshot(post("/analyze/stream", multipart(Some("Flu"), Some(b"%PDF-1.4"))))
            .await
            .unwrap();

        let events = sse_events(&body_string(resp).await);
        let (last, data) = events.last().unwrap();
        assert_eq!(last, "error");
        assert!(
            data["message"]
                .as_str()
                .unwrap()
                .starts_with("Summarization failed")
        );
    }

    #[tokio::test]
    async fn stream_rejects_missing_disease_with_400() {
        let (state, _) = paper_state();
        let resp = app(state)
            .oneshot(post("/analyze/stream", multipart(Some("   "), Some(b"%PDF-1.4"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
