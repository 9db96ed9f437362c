//! Bridges between async request/response bodies and the blocking core.
//!
//! Every store call runs under `spawn_blocking`. Uploads push one multipart
//! chunk at a time; downloads read one chunk ahead of the client through a
//! channel of capacity 1, starting with a chunk read before the headers.

use axum::{
    body::Body,
    extract::multipart::Field,
    http::{StatusCode, header},
    response::Response,
};
use gridx_core::{FileRecord, GridxError, UploadSession, Vault};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{ApiError, Result};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> gridx_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// Owns a session across awaits. If the request future is dropped, the
/// session's cleanup is moved onto the blocking pool.
struct SessionGuard(Option<UploadSession>);

impl SessionGuard {
    fn take(&mut self) -> Result<UploadSession> {
        self.0
            .take()
            .ok_or_else(|| ApiError::Internal("upload session already consumed".into()))
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(session) = self.0.take() {
            tracing::debug!(
                id = %session.id(),
                name = session.name(),
                "request dropped mid-upload"
            );
            match tokio::runtime::Handle::try_current() {
                Ok(rt) => {
                    rt.spawn_blocking(move || drop(session));
                }
                Err(_) => drop(session),
            }
        }
    }
}

pub(crate) async fn store_field(
    vault: Vault,
    name_hint: String,
    content_type: Option<String>,
    mut field: Field<'_>,
) -> Result<FileRecord> {
    let session = blocking(move || vault.begin_upload(&name_hint, content_type.as_deref())).await?;
    let mut guard = SessionGuard(Some(session));

    loop {
        match field.chunk().await {
            Ok(Some(bytes)) => {
                let mut session = guard.take()?;
                let session = blocking(move || session.push(&bytes).map(|()| session)).await?;
                guard.0 = Some(session);
            }
            Ok(None) => break,
            Err(e) => {
                let session = guard.take()?;
                let cause = e.to_string();
                let err = blocking(move || Ok(session.abort(cause))).await?;
                tracing::warn!(error = %err, "upload aborted");
                return Err(ApiError::Multipart(e));
            }
        }
    }

    let session = guard.take()?;
    let record = blocking(move || session.finish()).await?;
    tracing::info!(
        id = %record.id,
        name = %record.name,
        size = record.size_bytes,
        chunks = record.chunk_count,
        "file stored"
    );
    Ok(record)
}

/// The first chunk is read before any header is sent, so a file that is
/// broken from the start fails with a status code instead of a cut body.
pub(crate) async fn stream_file(vault: Vault, id_or_name: String) -> Result<Response> {
    let (reader, first) = blocking(move || {
        let mut reader = vault.download(&id_or_name)?;
        let first = reader.next_chunk()?;
        Ok((reader, first))
    })
    .await?;
    let record = reader.record().clone();

    let (tx, rx) = mpsc::channel::<std::result::Result<Vec<u8>, GridxError>>(1);
    tokio::task::spawn_blocking(move || {
        for chunk in first.map(Ok).into_iter().chain(reader) {
            let failed = chunk.is_err();
            if tx.blocking_send(chunk).is_err() {
                tracing::debug!("client went away mid-download");
                return;
            }
            if failed {
                return;
            }
        }
    });

    let content_type = record
        .content_type
        .as_deref()
        .unwrap_or(DEFAULT_CONTENT_TYPE);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, record.size_bytes.to_string())
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
