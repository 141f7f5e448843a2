use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use shell_core::{AttemptId, Origin, OriginKind};
use shell_logging::shell_debug;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::viewer::{ContentViewer, SignalSink};
use crate::{FailureKind, RenderedDocument, ViewerError, ViewerSignal};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    /// Transport-level ceiling; the loader's attempt timer normally fires first.
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
        }
    }
}

/// Headless viewer: remote origins over HTTP, local origins from disk.
///
/// Only one load is in flight at a time; starting a load or rendering a
/// static page cancels whatever was running. The most recent successful
/// document is kept for [`current_document`](Self::current_document).
pub struct FetchViewer {
    settings: Arc<FetchSettings>,
    client: reqwest::Client,
    inflight: Mutex<Option<(AttemptId, CancellationToken)>>,
    document: Arc<Mutex<Option<RenderedDocument>>>,
}

impl FetchViewer {
    pub fn new(settings: FetchSettings) -> Result<Self, ViewerError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| ViewerError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings: Arc::new(settings),
            client,
            inflight: Mutex::new(None),
            document: Arc::new(Mutex::new(None)),
        })
    }

    pub fn current_document(&self) -> Option<RenderedDocument> {
        self.document.lock().ok().and_then(|guard| guard.clone())
    }

    fn replace_inflight(&self, next: Option<(AttemptId, CancellationToken)>) {
        if let Ok(mut guard) = self.inflight.lock() {
            if let Some((_, token)) = std::mem::replace(&mut *guard, next) {
                token.cancel();
            }
        }
    }
}

impl ContentViewer for FetchViewer {
    fn load(&self, attempt: AttemptId, origin: &Origin, sink: Arc<dyn SignalSink>) {
        let token = CancellationToken::new();
        self.replace_inflight(Some((attempt, token.clone())));

        let client = self.client.clone();
        let settings = self.settings.clone();
        let document = self.document.clone();
        let origin = origin.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    shell_debug!("Load {} cancelled", attempt);
                    return;
                }
                result = fetch_origin(&client, &settings, attempt, &origin, sink.as_ref()) => result,
            };

            match result {
                Ok((body, content_type)) => {
                    if token.is_cancelled() {
                        return;
                    }
                    let content_len = body.len() as u64;
                    if let Ok(mut guard) = document.lock() {
                        *guard = Some(RenderedDocument {
                            origin: Some(origin),
                            content_type,
                            body,
                        });
                    }
                    sink.emit(ViewerSignal::Ready {
                        attempt,
                        content_len: Some(content_len),
                    });
                }
                Err(err) => sink.emit(ViewerSignal::Failed {
                    attempt,
                    details: err.to_string(),
                }),
            }
        });
    }

    fn cancel(&self, attempt: AttemptId) {
        if let Ok(mut guard) = self.inflight.lock() {
            if matches!(&*guard, Some((current, _)) if *current == attempt) {
                if let Some((_, token)) = guard.take() {
                    token.cancel();
                }
            }
        }
    }

    fn render_static(&self, html: &str, _sink: Arc<dyn SignalSink>) {
        self.replace_inflight(None);
        if let Ok(mut guard) = self.document.lock() {
            *guard = Some(RenderedDocument {
                origin: None,
                content_type: Some("text/html; charset=utf-8".to_string()),
                body: html.as_bytes().to_vec(),
            });
        }
    }
}

async fn fetch_origin(
    client: &reqwest::Client,
    settings: &FetchSettings,
    attempt: AttemptId,
    origin: &Origin,
    sink: &dyn SignalSink,
) -> Result<(Vec<u8>, Option<String>), ViewerError> {
    match origin.kind() {
        OriginKind::Remote => fetch_remote(client, settings, attempt, origin.locator(), sink).await,
        OriginKind::Local => {
            let body = read_local(settings, origin.locator()).await?;
            sink.emit(ViewerSignal::Progress {
                attempt,
                percent: 100,
            });
            Ok((body, None))
        }
    }
}

async fn fetch_remote(
    client: &reqwest::Client,
    settings: &FetchSettings,
    attempt: AttemptId,
    url: &str,
    sink: &dyn SignalSink,
) -> Result<(Vec<u8>, Option<String>), ViewerError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|err| ViewerError::new(FailureKind::InvalidOrigin, err.to_string()))?;

    let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ViewerError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }

    let expected_len = response.content_length();
    if let Some(content_len) = expected_len {
        if content_len > settings.max_bytes {
            return Err(too_large(settings.max_bytes, Some(content_len)));
        }
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    if let Some(ct) = content_type.as_deref() {
        if !is_content_type_allowed(settings, ct) {
            return Err(ViewerError::new(
                FailureKind::UnsupportedContentType {
                    content_type: ct.to_string(),
                },
                "unsupported content type",
            ));
        }
    }

    sink.emit(ViewerSignal::Progress {
        attempt,
        percent: 0,
    });

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = bytes.len() as u64 + chunk.len() as u64;
        if next_len > settings.max_bytes {
            return Err(too_large(settings.max_bytes, Some(next_len)));
        }
        bytes.extend_from_slice(&chunk);
        if let Some(total) = expected_len.filter(|total| *total > 0) {
            let percent = (next_len.saturating_mul(100) / total).min(100) as u8;
            sink.emit(ViewerSignal::Progress { attempt, percent });
        }
    }

    Ok((bytes, content_type))
}

async fn read_local(settings: &FetchSettings, locator: &str) -> Result<Vec<u8>, ViewerError> {
    let path = local_path(locator)?;
    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|err| ViewerError::new(FailureKind::Io, format!("{}: {err}", path.display())))?;
    if metadata.len() > settings.max_bytes {
        return Err(too_large(settings.max_bytes, Some(metadata.len())));
    }
    tokio::fs::read(&path)
        .await
        .map_err(|err| ViewerError::new(FailureKind::Io, format!("{}: {err}", path.display())))
}

fn local_path(locator: &str) -> Result<PathBuf, ViewerError> {
    if locator.starts_with("file:") {
        let url = Url::parse(locator)
            .map_err(|err| ViewerError::new(FailureKind::InvalidOrigin, err.to_string()))?;
        url.to_file_path().map_err(|()| {
            ViewerError::new(FailureKind::InvalidOrigin, format!("not a file path: {locator}"))
        })
    } else {
        Ok(PathBuf::from(locator))
    }
}

fn is_content_type_allowed(settings: &FetchSettings, content_type: &str) -> bool {
    let ct = content_type.split(';').next().unwrap_or(content_type).trim();
    settings
        .allowed_content_types
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ct))
}

fn too_large(max_bytes: u64, actual: Option<u64>) -> ViewerError {
    ViewerError::new(FailureKind::TooLarge { max_bytes, actual }, "response too large")
}

fn map_reqwest_error(err: reqwest::Error) -> ViewerError {
    if err.is_timeout() {
        return ViewerError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return ViewerError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    ViewerError::new(FailureKind::Network, err.to_string())
}
