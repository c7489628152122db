//! HTTP Server for the stockfilter converter.
//!
//! Two front doors share one conversion: a form-based UI that answers with a
//! download page, and a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path                    | Description                              |
//! |--------|-------------------------|------------------------------------------|
//! | GET    | `/`                     | Upload form (shows `?flash=` notices)    |
//! | POST   | `/convert`              | Convert upload, render download page     |
//! | GET    | `/download/{filename}`  | Fetch a converted document until expiry  |
//! | POST   | `/api/convert`          | Convert upload, return JSON              |
//! | GET    | `/health`               | Health check                             |
//! | GET    | `/api/logs`             | SSE stream for real-time logs            |

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, Method},
    response::{sse::Event, Html, IntoResponse, Json, Redirect, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_warning, LOG_BROADCASTER};
use super::pages::{encode_path_segment, index_page, success_page, Flash};
use crate::config::AppConfig;
use crate::error::ServerError;
use crate::models::ConversionDocument;
use crate::store::{download_filename, sanitize_download_name, ExpiringStore};
use crate::transform::pipeline::convert_bytes;

/// Flash notices only need to survive one redirect.
const FLASH_TTL: Duration = Duration::from_secs(60);

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared router state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Converted documents keyed by download file name
    pub documents: Arc<ExpiringStore<String>>,
    pub flashes: Arc<ExpiringStore<Flash>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let download_ttl = config.download_ttl;
        Self {
            config: Arc::new(config),
            documents: Arc::new(ExpiringStore::new(download_ttl)),
            flashes: Arc::new(ExpiringStore::new(FLASH_TTL)),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/convert", post(convert_form))
        .route("/download/{*filename}", get(download))
        .route("/api/convert", post(convert_api))
        .route("/health", get(health))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let mode = config.mode;
    let state = AppState::new(config);

    spawn_purge_task(state.clone());

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Stockfilter server running on http://localhost:{}", port);
    println!("   GET  /              - Upload form");
    println!("   POST /convert       - Convert and download");
    println!("   POST /api/convert   - Convert, JSON response");
    println!("   GET  /api/logs      - SSE log stream");
    println!("   GET  /health        - Health check");
    println!();
    println!("📝 Existence filter: {}", mode);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_purge_task(state: AppState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = state.documents.purge_expired();
            state.flashes.purge_expired();
            if purged > 0 {
                log_info(format!("Expired {} unclaimed download(s)", purged));
            }
        }
    });
}

// =============================================================================
// Upload handling
// =============================================================================

/// Fields of a conversion form post
#[derive(Debug, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    /// `None` when no file (or an empty one) was sent
    pub bytes: Option<Vec<u8>>,
    /// Trimmed; `None` when blank
    pub sheet_name: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ServerError> {
    let mut upload = Upload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                upload.file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                upload.bytes = (!bytes.is_empty()).then(|| bytes.to_vec());
            }
            "sheet_name" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                let text = text.trim();
                upload.sheet_name = (!text.is_empty()).then(|| text.to_string());
            }
            _ => {}
        }
    }

    Ok(upload)
}

/// Run the blocking spreadsheet conversion off the async runtime.
async fn run_conversion(
    config: &AppConfig,
    bytes: Vec<u8>,
    sheet_name: Option<String>,
) -> Result<ConversionDocument, ServerError> {
    let options = config.convert_options(sheet_name);
    let document = tokio::task::spawn_blocking(move || convert_bytes(&bytes, &options))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    Ok(document)
}

fn log_upload(file_name: Option<&str>, sheet_name: Option<&str>, size: usize) {
    log_info(format!(
        "📄 NEW UPLOAD: {} ({} bytes, sheet: {})",
        file_name.unwrap_or("unknown"),
        size,
        sheet_name.unwrap_or("(default)")
    ));
}

// =============================================================================
// UI routes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub flash: Option<String>,
}

/// Upload form
async fn index(State(state): State<AppState>, Query(query): Query<IndexQuery>) -> Html<String> {
    let flash = query.flash.and_then(|key| state.flashes.take(&key));
    Html(index_page(flash.as_ref()))
}

/// Form upload: convert, keep the document for download, render the summary
async fn convert_form(State(state): State<AppState>, multipart: Multipart) -> Response {
    match read_upload(multipart).await {
        Ok(upload) => handle_form_upload(&state, upload).await,
        Err(e) => flash_redirect(&state, Flash::danger(format!("Error: {}", e))),
    }
}

pub async fn handle_form_upload(state: &AppState, upload: Upload) -> Response {
    let Upload { file_name, bytes, sheet_name } = upload;
    let Some(bytes) = bytes else {
        return flash_redirect(state, Flash::warning("Sube un archivo .xlsx"));
    };
    log_upload(file_name.as_deref(), sheet_name.as_deref(), bytes.len());

    let document = match run_conversion(&state.config, bytes, sheet_name).await {
        Ok(document) => document,
        Err(e) => return flash_redirect(state, Flash::danger(format!("Error: {}", e))),
    };

    let json = match document.to_json_pretty() {
        Ok(json) => json,
        Err(e) => return flash_redirect(state, Flash::danger(format!("Error: {}", e))),
    };

    let download_name = download_filename(file_name.as_deref());
    state.documents.insert(download_name.clone(), json);
    log_info(format!("💾 Ready for download: {}", download_name));

    Html(success_page(&document.meta, &download_name)).into_response()
}

/// Serve a stored document; repeat fetches work until the TTL runs out
async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let stored = sanitize_download_name(&filename)
        .and_then(|name| state.documents.get(&name).map(|json| (name, json)));

    match stored {
        Some((name, json)) => (
            [
                (header::CONTENT_TYPE, "application/json".to_string()),
                (header::CONTENT_DISPOSITION, content_disposition(&name)),
            ],
            json,
        )
            .into_response(),
        None => {
            log_warning(format!("Download not found: {}", filename));
            flash_redirect(&state, Flash::warning("Archivo no encontrado. Vuelve a convertir."))
        }
    }
}

/// `attachment` header with an ASCII fallback name and the UTF-8 name.
fn content_disposition(name: &str) -> String {
    let ascii: String = name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        encode_path_segment(name)
    )
}

fn flash_redirect(state: &AppState, flash: Flash) -> Response {
    let key = state.flashes.insert_new(flash);
    Redirect::to(&format!("/?flash={}", key)).into_response()
}

// =============================================================================
// API routes
// =============================================================================

/// API upload: convert and answer with the JSON document
async fn convert_api(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConversionDocument>, ServerError> {
    let upload = read_upload(multipart).await?;
    handle_api_upload(&state, upload).await.map(Json)
}

pub async fn handle_api_upload(
    state: &AppState,
    upload: Upload,
) -> Result<ConversionDocument, ServerError> {
    let Upload { file_name, bytes, sheet_name } = upload;
    let bytes = bytes.ok_or_else(|| ServerError::BadRequest("Sube un archivo .xlsx".to_string()))?;
    log_upload(file_name.as_deref(), sheet_name.as_deref(), bytes.len());

    run_conversion(&state.config, bytes, sheet_name).await.map_err(|e| {
        log_error(format!("Conversion failed: {}", e));
        e
    })
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "stockfilter",
        "version": env!("CARGO_PKG_VERSION"),
        "filterMode": state.config.mode.to_string(),
        "pendingDownloads": state.documents.len(),
        "endpoints": {
            "form": "POST /convert",
            "api": "POST /api/convert",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::status_for;
    use crate::transform::policy::FilterMode;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use rust_xlsxwriter::{Workbook, XlsxError};

    fn workbook(headers: &[&str], rows: &[&[&str]]) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, h) in headers.iter().enumerate() {
            sheet.write_string(0, c as u16, *h)?;
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                sheet.write_string(r as u32 + 1, c as u16, *v)?;
            }
        }
        Ok(workbook.save_to_buffer()?)
    }

    fn products() -> Vec<u8> {
        workbook(
            &[
                "EXISTENTE",
                "STOCK",
                "CODIGO",
                "CATEGORIA",
                "NOMBRE CONTIFICO",
                "PRECIO",
                "DESCRIPCION",
                "ENLACE WEB",
                "EXISTENCIAS",
            ],
            &[
                &["SI", "10", "A1", "X", " Widget ", "9.99", "d", "http://x", "4"],
                &["NO", "2", "A2", "X", "Otro", "1", "d", "http://y", "0"],
            ],
        )
        .unwrap()
    }

    fn upload(bytes: Option<Vec<u8>>) -> Upload {
        Upload {
            file_name: Some("inventario.xlsx".into()),
            bytes,
            sheet_name: None,
        }
    }

    fn location(response: &Response) -> String {
        response.headers()[header::LOCATION].to_str().unwrap().to_string()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_form_upload_then_download() {
        let state = AppState::new(AppConfig::default());

        let response = handle_form_upload(&state, upload(Some(products()))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("<strong>2</strong> productos"));
        assert!(html.contains("<strong>1 articulos en EXISTENCIA = SI</strong>"));
        assert_eq!(state.documents.len(), 1);

        let start = html.find("/download/").unwrap() + "/download/".len();
        let end = start + html[start..].find('"').unwrap();
        let name = html[start..end].to_string();
        assert!(name.starts_with("inventario-"));

        let response = download(State(state.clone()), Path(format!("../{}", name))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["meta"]["registros_filtrados"], 1);
        assert_eq!(json["data"][0]["NOMBRE CONTIFICO"], "Widget");
        assert_eq!(json["data"][0]["EXISTENCIAS"], "4");

        // The page auto-clicks the link; the visible button must still work
        let again = download(State(state.clone()), Path(name)).await;
        assert_eq!(again.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&body_text(again).await).unwrap();
        assert_eq!(json["meta"]["total_productos"], 2);
        assert_eq!(state.documents.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_download_redirects() {
        let config = AppConfig {
            download_ttl: Duration::from_millis(0),
            ..AppConfig::default()
        };
        let state = AppState::new(config);
        state.documents.insert("salida.json", "{}".to_string());
        tokio::time::sleep(Duration::from_millis(5)).await;

        let response = download(State(state), Path("salida.json".into())).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/?flash="));
    }

    #[tokio::test]
    async fn test_form_without_file_flashes_warning() {
        let state = AppState::new(AppConfig::default());

        let response = handle_form_upload(&state, upload(None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let key = location(&response).trim_start_matches("/?flash=").to_string();
        let html = index(State(state.clone()), Query(IndexQuery { flash: Some(key.clone()) })).await;
        assert!(html.0.contains("alert alert-warning"));
        assert!(html.0.contains("Sube un archivo .xlsx"));

        // Shown once
        let html = index(State(state), Query(IndexQuery { flash: Some(key) })).await;
        assert!(!html.0.contains("alert-warning"));
    }

    #[tokio::test]
    async fn test_form_conversion_error_flashes_danger() {
        let state = AppState::new(AppConfig::default());
        let bytes = workbook(&["EXISTENTE", "STOCK"], &[&["SI", "1"]]).unwrap();

        let response = handle_form_upload(&state, upload(Some(bytes))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let key = location(&response).trim_start_matches("/?flash=").to_string();
        let flash = state.flashes.take(&key).unwrap();
        assert!(flash.message.starts_with("Error: Faltan columnas en el Excel: CODIGO"));
        assert!(state.documents.is_empty());
    }

    #[tokio::test]
    async fn test_api_upload() {
        let state = AppState::new(AppConfig::default());
        let doc = handle_api_upload(&state, upload(Some(products()))).await.unwrap();
        assert_eq!(doc.meta.total, 2);
        assert_eq!(doc.meta.existence_count, 1);
        assert_eq!(doc.data[0].price, Some(9.99));
        assert!(state.documents.is_empty());
    }

    #[tokio::test]
    async fn test_api_errors() {
        let state = AppState::new(AppConfig::default().with_mode(FilterMode::Strict));

        let missing_file = handle_api_upload(&state, upload(None)).await.unwrap_err();
        assert_eq!(status_for(&missing_file), StatusCode::BAD_REQUEST);

        let bad_payload = handle_api_upload(&state, upload(Some(b"not a workbook".to_vec())))
            .await
            .unwrap_err();
        assert_eq!(status_for(&bad_payload), StatusCode::BAD_REQUEST);

        // rust_xlsxwriter names the sheet "Sheet1"; strict mode wants "Hoja 1"
        let no_sheet = handle_api_upload(&state, upload(Some(products()))).await.unwrap_err();
        assert_eq!(status_for(&no_sheet), StatusCode::NOT_FOUND);

        let response = no_sheet.into_response();
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["detail"].as_str().unwrap().contains("Hoja 1"));
    }

    #[tokio::test]
    async fn test_download_unknown_redirects() {
        let state = AppState::new(AppConfig::default());
        let response = download(State(state), Path("..".into())).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("año \"1\".json"),
            "attachment; filename=\"a_o _1_.json\"; filename*=UTF-8''a%C3%B1o%20%221%22.json"
        );
    }

    #[test]
    fn test_router_builds() {
        let _ = router(AppState::new(AppConfig::default()));
    }
}
