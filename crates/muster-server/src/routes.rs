//! RPC dispatch: one handler per method, each moving its request into
//! `spawn_blocking` and calling the matching `Backend` operation. The
//! handlers hold no business rules.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::error;

use muster_service::{Backend, ServiceError};
use muster_types::api::{
    AddEventRequest, AddUserRequest, DeleteEventRequest, UpdateEventRequest, UpdateUserRequest,
};

pub type SharedBackend = Arc<Backend>;

/// Every service failure surfaces as the same Internal status with the
/// message embedding the original cause, matching the upstream clients'
/// expectations.
pub struct AppError(ServiceError);

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let ServiceError::Internal(msg) = self.0;
        error!("request failed: {msg}");
        (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(AppError::from),
        Err(e) => Err(AppError(ServiceError::Internal(format!(
            "worker task failed: {e}"
        )))),
    }
}

// -- Users --

pub async fn add_user(
    State(backend): State<SharedBackend>,
    Json(req): Json<AddUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reply = run_blocking(move || backend.add_user(req)).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

pub async fn update_user(
    State(backend): State<SharedBackend>,
    Path(id): Path<u32>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reply = run_blocking(move || backend.update_user(id, req)).await?;
    Ok(Json(reply))
}

pub async fn get_user(
    State(backend): State<SharedBackend>,
    Path(id): Path<u32>,
) -> Result<impl IntoResponse, AppError> {
    let reply = run_blocking(move || backend.get_user(id)).await?;
    Ok(Json(reply))
}

pub async fn delete_user(
    State(backend): State<SharedBackend>,
    Path(id): Path<u32>,
) -> Result<impl IntoResponse, AppError> {
    let reply = run_blocking(move || backend.delete_user(id)).await?;
    Ok(Json(reply))
}

pub async fn list_users(State(backend): State<SharedBackend>) -> Response {
    let (tx, rx) = mpsc::channel(64);
    let worker = tokio::task::spawn_blocking(move || {
        backend.list_users(&mut |user| tx.blocking_send(user).is_ok())
    });
    stream_ndjson(rx, worker)
}

// -- Events --

pub async fn add_event(
    State(backend): State<SharedBackend>,
    Json(req): Json<AddEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reply = run_blocking(move || backend.add_event(req)).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

pub async fn update_event(
    State(backend): State<SharedBackend>,
    Path(id): Path<u64>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reply = run_blocking(move || backend.update_event(id, req)).await?;
    Ok(Json(reply))
}

pub async fn get_event(
    State(backend): State<SharedBackend>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let reply = run_blocking(move || backend.get_event(id)).await?;
    Ok(Json(reply))
}

pub async fn delete_event(
    State(backend): State<SharedBackend>,
    Path(id): Path<u64>,
    Query(req): Query<DeleteEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reply = run_blocking(move || backend.delete_event(id, req)).await?;
    Ok(Json(reply))
}

pub async fn list_events(State(backend): State<SharedBackend>) -> Response {
    let (tx, rx) = mpsc::channel(64);
    let worker = tokio::task::spawn_blocking(move || {
        backend.list_events(&mut |event| tx.blocking_send(event).is_ok())
    });
    stream_ndjson(rx, worker)
}

/// Bridges a blocking list worker to a streamed ndjson body: one JSON line
/// per row as it arrives, no buffering of the full result set. A store
/// error mid-stream aborts the body; the worker stops on its own when the
/// client goes away, because the sink's `blocking_send` starts failing.
fn stream_ndjson<T>(
    mut rx: mpsc::Receiver<T>,
    worker: tokio::task::JoinHandle<Result<(), ServiceError>>,
) -> Response
where
    T: Serialize + Send + 'static,
{
    let stream = async_stream::stream! {
        while let Some(item) = rx.recv().await {
            match serde_json::to_vec(&item) {
                Ok(mut line) => {
                    line.push(b'\n');
                    yield Ok::<Bytes, std::io::Error>(Bytes::from(line));
                }
                Err(e) => {
                    yield Err(std::io::Error::new(std::io::ErrorKind::Other, e));
                    return;
                }
            }
        }
        match worker.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("list stream failed: {e}");
                yield Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
            }
            Err(e) => {
                error!("list worker panicked: {e}");
                yield Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
            }
        }
    };

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(stream),
    )
        .into_response()
}
