//! Route table and request handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use lizard_common::{VolumeError, VolumeResult};
use lizard_volume::SharedDriver;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_http::trace::TraceLayer;

use super::types::{
    ActivateResponse, Capabilities, CapabilitiesResponse, CreateRequest, EmptyResponse,
    ErrorResponse, GetResponse, ListResponse, MountRequest, MountResponse, NameRequest,
    PathResponse, VolumeEntry, display, require_id, require_name,
};

/// Build the plugin API router around a shared driver.
pub fn app(driver: SharedDriver) -> Router {
    Router::new()
        .route("/Plugin.Activate", post(activate))
        .route("/VolumeDriver.Create", post(create))
        .route("/VolumeDriver.Remove", post(remove))
        .route("/VolumeDriver.Mount", post(mount))
        .route("/VolumeDriver.Unmount", post(unmount))
        .route("/VolumeDriver.Path", post(path))
        .route("/VolumeDriver.Get", post(get))
        .route("/VolumeDriver.List", post(list))
        .route("/VolumeDriver.Capabilities", post(capabilities))
        .layer(TraceLayer::new_for_http())
        .with_state(driver)
}

/// Decode a request body.
///
/// Docker does not always send a JSON content type, so the body is parsed
/// regardless of headers. An empty body decodes to the default request.
fn parse<T: DeserializeOwned + Default>(body: &[u8]) -> VolumeResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

/// Render an operation result. Failures are replied with status 200 and an
/// `Err` field, as the plugin protocol requires.
fn reply<T: Serialize>(endpoint: &str, result: VolumeResult<T>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            tracing::warn!(endpoint, error = %e, "Request failed");
            Json(ErrorResponse { err: e.to_string() }).into_response()
        }
    }
}

async fn activate() -> Json<ActivateResponse> {
    tracing::debug!("/Plugin.Activate");
    Json(ActivateResponse {
        implements: vec!["VolumeDriver"],
    })
}

async fn create(State(driver): State<SharedDriver>, body: Bytes) -> Response {
    let result = async {
        let req: CreateRequest = parse(&body)?;
        let name = require_name(req.name)?;
        let goal = req.opts.and_then(|o| o.replication_goal);

        driver.lock().await.create(&name, goal.as_deref()).await?;
        Ok::<_, VolumeError>(EmptyResponse {})
    };
    reply("/VolumeDriver.Create", result.await)
}

async fn remove(State(driver): State<SharedDriver>, body: Bytes) -> Response {
    let result = async {
        let req: NameRequest = parse(&body)?;
        let name = require_name(req.name)?;

        driver.lock().await.remove(&name).await?;
        Ok::<_, VolumeError>(EmptyResponse {})
    };
    reply("/VolumeDriver.Remove", result.await)
}

async fn mount(State(driver): State<SharedDriver>, body: Bytes) -> Response {
    let result = async {
        let req: MountRequest = parse(&body)?;
        let name = require_name(req.name)?;
        let id = require_id(req.id)?;

        let mountpoint = driver.lock().await.mount(&name, &id).await?;
        Ok::<_, VolumeError>(MountResponse {
            mountpoint: display(&mountpoint),
        })
    };
    reply("/VolumeDriver.Mount", result.await)
}

async fn unmount(State(driver): State<SharedDriver>, body: Bytes) -> Response {
    let result = async {
        let req: MountRequest = parse(&body)?;
        let name = require_name(req.name)?;
        let id = require_id(req.id)?;

        driver.lock().await.unmount(&name, &id).await?;
        Ok::<_, VolumeError>(EmptyResponse {})
    };
    reply("/VolumeDriver.Unmount", result.await)
}

async fn path(State(driver): State<SharedDriver>, body: Bytes) -> Response {
    let result = async {
        let req: NameRequest = parse(&body)?;
        let name = require_name(req.name)?;

        let mountpoint = driver.lock().await.path(&name).await?;
        Ok::<_, VolumeError>(PathResponse {
            mountpoint: mountpoint.as_deref().map(display),
        })
    };
    reply("/VolumeDriver.Path", result.await)
}

async fn get(State(driver): State<SharedDriver>, body: Bytes) -> Response {
    let result = async {
        let req: NameRequest = parse(&body)?;
        let name = require_name(req.name)?;

        let info = driver.lock().await.get(&name).await?;
        Ok::<_, VolumeError>(GetResponse {
            volume: info.into(),
        })
    };
    reply("/VolumeDriver.Get", result.await)
}

async fn list(State(driver): State<SharedDriver>) -> Response {
    let result = async {
        let volumes = driver.lock().await.list().await?;
        Ok::<_, VolumeError>(ListResponse {
            volumes: volumes.into_iter().map(VolumeEntry::from).collect(),
        })
    };
    reply("/VolumeDriver.List", result.await)
}

async fn capabilities(State(driver): State<SharedDriver>) -> Response {
    let result = async {
        let scope = driver.lock().await.capabilities().await?;
        Ok::<_, VolumeError>(CapabilitiesResponse {
            capabilities: Capabilities {
                scope: scope.to_string(),
            },
        })
    };
    reply("/VolumeDriver.Capabilities", result.await)
}
