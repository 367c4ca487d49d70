//! Purpose: Provide the loopback demo host for the pair-list widget.
//! Exports: `ServeConfig`, `serve`.
//! Role: Axum server rendering a form page and accepting urlencoded submissions.
//! Invariants: Loopback-only unless explicitly allowed.
//! Invariants: Error envelopes are `{"error":{"kind","message","hint"?,"field"?}}`.
//! Notes: Submissions are parsed from the raw body so repeated parameters survive.

use axum::extract::{DefaultBodyLimit, Path as AxumPath, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pairfield::api::{
    Error, ErrorKind, PairListField, PairListWidget, SubmittedFields, escape_attr_value,
};

#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    pub allow_non_loopback: bool,
    pub max_body_bytes: u64,
    pub required: bool,
    pub widget: PairListWidget,
}

struct AppState {
    field: PairListField,
}

pub async fn serve(config: ServeConfig) -> Result<(), Error> {
    validate_config(&config)?;

    init_tracing();

    let max_body_bytes: usize = config
        .max_body_bytes
        .try_into()
        .map_err(|_| Error::new(ErrorKind::Usage).with_message("--max-body-bytes is too large"))?;

    let state = Arc::new(AppState {
        field: PairListField::new(config.widget).required(config.required),
    });
    let app = router(state, max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to bind server")
                .with_source(err)
        })?;
    info!(bind = %config.bind, "pairfield demo host listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("server failed")
                .with_source(err)
        })?;
    Ok(())
}

fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v0/fields/:name", get(form_page).post(submit_form))
        .route("/v0/fields/:name/render", post(render_fragment))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => addr.is_loopback(),
    }
}

fn validate_config(config: &ServeConfig) -> Result<(), Error> {
    if !is_loopback(config.bind.ip()) && !config.allow_non_loopback {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("non-loopback bind requires explicit opt-in")
            .with_hint("Re-run with --allow-non-loopback or use a loopback address."));
    }

    if config.max_body_bytes == 0 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes must be greater than zero")
            .with_hint("Use a positive value like 65536."));
    }

    if config.max_body_bytes > usize::MAX as u64 {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--max-body-bytes exceeds platform limits")
            .with_hint("Use a smaller value that fits in memory."));
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RenderRequest {
    value: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

async fn healthz() -> Response {
    Json(json!({ "ok": true })).into_response()
}

async fn form_page(
    State(state): State<Arc<AppState>>,
    AxumPath(name): AxumPath<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.field.render(&name, query.value.as_deref()) {
        Ok(fragment) => html_response(page_html(&name, fragment.as_str())),
        Err(err) => error_response(err),
    }
}

async fn submit_form(
    State(state): State<Arc<AppState>>,
    AxumPath(name): AxumPath<String>,
    body: Bytes,
) -> Response {
    let fields = SubmittedFields::from_urlencoded(&body);
    let result = state
        .field
        .value_from_submission(&fields, &name)
        .and_then(|value| {
            state.field.clean(&name, value.as_deref())?;
            Ok(value)
        });
    match result {
        Ok(value) => Json(json!({ "field": name, "value": value })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn render_fragment(
    State(state): State<Arc<AppState>>,
    AxumPath(name): AxumPath<String>,
    Json(payload): Json<RenderRequest>,
) -> Response {
    match state.field.render(&name, payload.value.as_deref()) {
        Ok(fragment) => {
            Json(json!({ "field": name, "html": fragment.into_string() })).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn page_html(name: &str, fragment: &str) -> String {
    let title = escape_attr_value(name);
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body><form method=\"post\">\n{fragment}\n<button type=\"submit\">Save</button></form></body></html>\n"
    )
}

fn html_response(body: String) -> Response {
    let mut response = body.into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

fn error_response(err: Error) -> Response {
    let status = match err.kind() {
        ErrorKind::Usage
        | ErrorKind::MalformedValue
        | ErrorKind::MalformedSubmission
        | ErrorKind::Required => StatusCode::BAD_REQUEST,
        ErrorKind::Io | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorEnvelope {
        error: ErrorBody {
            kind: format!("{:?}", err.kind()),
            message: err.message().unwrap_or("error").to_string(),
            hint: err.hint().map(str::to_string),
            field: err.field().map(str::to_string),
        },
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::{
        AppState, ErrorKind, PageQuery, RenderRequest, ServeConfig, form_page, render_fragment,
        serve, submit_form, validate_config,
    };
    use axum::body::to_bytes;
    use axum::extract::{Path as AxumPath, Query, State};
    use axum::http::StatusCode;
    use axum::response::Response;
    use axum::Json;
    use bytes::Bytes;
    use pairfield::api::{Attrs, LengthPolicy, PairListField, PairListWidget};
    use serde_json::Value;
    use std::sync::Arc;

    fn config(bind: &str) -> ServeConfig {
        ServeConfig {
            bind: bind.parse().expect("bind"),
            allow_non_loopback: false,
            max_body_bytes: 64 * 1024,
            required: false,
            widget: PairListWidget::new(),
        }
    }

    fn state(widget: PairListWidget) -> State<Arc<AppState>> {
        State(Arc::new(AppState {
            field: PairListField::new(widget),
        }))
    }

    fn required_state() -> State<Arc<AppState>> {
        State(Arc::new(AppState {
            field: PairListField::new(PairListWidget::new()).required(true),
        }))
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).expect("json")
    }

    #[tokio::test]
    async fn serve_rejects_non_loopback_bind() {
        let err = serve(config("0.0.0.0:0"))
            .await
            .expect_err("expected usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn non_loopback_allowed_with_flag() {
        let mut config = config("0.0.0.0:0");
        config.allow_non_loopback = true;
        validate_config(&config).expect("config ok");
    }

    #[test]
    fn body_limit_must_be_positive() {
        let mut config = config("127.0.0.1:0");
        config.max_body_bytes = 0;
        let err = validate_config(&config).expect_err("expected usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[tokio::test]
    async fn form_page_renders_fragment_inside_form() {
        let widget = PairListWidget::new().with_key_attrs(Attrs::new().with("class", "k"));
        let response = form_page(
            state(widget),
            AxumPath("tags".to_string()),
            Query(PageQuery {
                value: Some(r#"[["env","prod"]]"#.to_string()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains(r#"<form method="post">"#));
        assert!(html.contains(r#"name="json_key[tags]" value="env" class="k">"#));
        assert!(html.contains(r#"name="json_value[tags]" value="prod"><br/>"#));
    }

    #[tokio::test]
    async fn form_page_reports_malformed_value() {
        let response = form_page(
            state(PairListWidget::new()),
            AxumPath("tags".to_string()),
            Query(PageQuery {
                value: Some("[1]".to_string()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value = body_json(response).await;
        assert_eq!(value["error"]["kind"], "MalformedValue");
        assert_eq!(value["error"]["field"], "tags");
    }

    #[tokio::test]
    async fn submit_returns_encoded_value_or_null() {
        let body = Bytes::from_static(
            b"json_key%5Bf%5D=a&json_value%5Bf%5D=1&json_key%5Bf%5D=&json_value%5Bf%5D=2",
        );
        let response = submit_form(
            state(PairListWidget::new()),
            AxumPath("f".to_string()),
            body,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["value"], r#"[["a","1"]]"#);

        let response = submit_form(
            state(PairListWidget::new()),
            AxumPath("f".to_string()),
            Bytes::new(),
        )
        .await;
        let value = body_json(response).await;
        assert!(value["value"].is_null());
    }

    #[tokio::test]
    async fn strict_widget_rejects_mismatched_submission() {
        let widget = PairListWidget::new().with_length_policy(LengthPolicy::Reject);
        let response = submit_form(
            state(widget),
            AxumPath("f".to_string()),
            Bytes::from_static(b"json_key%5Bf%5D=a&json_key%5Bf%5D=b&json_value%5Bf%5D=1"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value = body_json(response).await;
        assert_eq!(value["error"]["kind"], "MalformedSubmission");
    }

    #[tokio::test]
    async fn required_field_rejects_blank_submission() {
        let response = submit_form(
            required_state(),
            AxumPath("f".to_string()),
            Bytes::from_static(b"json_key%5Bf%5D=&json_value%5Bf%5D=x"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value = body_json(response).await;
        assert_eq!(value["error"]["kind"], "Required");
        assert_eq!(value["error"]["field"], "f");

        let response = submit_form(required_state(), AxumPath("f".to_string()), Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = submit_form(
            required_state(),
            AxumPath("f".to_string()),
            Bytes::from_static(b"json_key%5Bf%5D=a&json_value%5Bf%5D=1"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn render_endpoint_returns_fragment_json() {
        let response = render_fragment(
            state(PairListWidget::new()),
            AxumPath("f".to_string()),
            Json(RenderRequest { value: None }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["html"], "");
        assert_eq!(value["field"], "f");
    }
}
