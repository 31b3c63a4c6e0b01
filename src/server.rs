//! HTTP process boundary: trigger a run, read accumulated logs.
//!
//! Two operations, mirroring what the frontend needs and nothing more:
//! - `POST /generate` runs the pipeline and returns the rendered HTML
//!   payload alongside the artifact path
//! - `GET /logs` returns the tail of the accumulated run log as plain text
//!
//! Log accumulation is an in-memory ring buffer fed by a second
//! `tracing-subscriber` writer, so the surface needs no log files on disk.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info};
use tracing_subscriber::fmt::MakeWriter;

use crate::pipeline::{Pipeline, RunOverrides};

/// Lines retained in memory.
const LOG_CAPACITY: usize = 500;
/// Lines served by `GET /logs`.
const LOG_TAIL: usize = 50;

/// Shared ring buffer of recent log lines.
#[derive(Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<LogState>>,
}

#[derive(Default)]
struct LogState {
    lines: VecDeque<String>,
    pending: String,
}

impl LogBuffer {
    pub fn new() -> Self {
        LogBuffer::default()
    }

    /// The most recent `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> String {
        let Ok(state) = self.inner.lock() else {
            return String::new();
        };
        let skip = state.lines.len().saturating_sub(n);
        let mut out = String::new();
        for line in state.lines.iter().skip(skip) {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    fn push_bytes(&self, buf: &[u8]) {
        let Ok(mut state) = self.inner.lock() else {
            return;
        };
        state.pending.push_str(&String::from_utf8_lossy(buf));
        while let Some(pos) = state.pending.find('\n') {
            let line: String = state.pending.drain(..=pos).collect();
            let line = line.trim_end().to_string();
            if !line.is_empty() {
                state.lines.push_back(line);
            }
            while state.lines.len() > LOG_CAPACITY {
                state.lines.pop_front();
            }
        }
    }
}

/// Per-event writer handed out to the subscriber.
pub struct LogWriter(LogBuffer);

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.push_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter(self.clone())
    }
}

/// State shared by every handler.
pub struct AppState {
    pub pipeline: Pipeline,
    pub logs: LogBuffer,
}

/// Optional knobs a frontend may send along with the trigger.
#[derive(Debug, Deserialize, Default)]
pub struct GenerateRequest {
    pub topic: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub article_type: Option<String>,
    pub length: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub file: String,
    pub article_html: String,
    pub word_count: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/logs", get(logs))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn generate(
    State(state): State<Arc<AppState>>,
    request: Option<Json<GenerateRequest>>,
) -> impl IntoResponse {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    debug!(?request, "Generate triggered");

    let overrides = RunOverrides {
        target_word_count: request.length,
        focus_keyword: request.keywords.and_then(|k| k.into_iter().next()),
    };
    match state.pipeline.run_with(overrides).await {
        Ok(report) => {
            info!(title = %report.title, words = report.word_count, "Run served");
            (
                StatusCode::OK,
                Json(GenerateResponse {
                    file: report.path.display().to_string(),
                    article_html: report.html,
                    word_count: report.word_count,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn logs(State(state): State<Arc<AppState>>) -> String {
    state.logs.tail(LOG_TAIL)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, bind_addr: &str) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "HTTP surface listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
