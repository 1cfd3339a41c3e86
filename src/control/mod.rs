//! Control surface
//!
//! JSON-over-HTTP operations for a human operator: register an account,
//! read the status summary, stop all monitoring, list recent notifications.
//! Handlers are thin wrappers over `AccountRegistry` and `NotificationLog`.
//!
//! Created: 2026-10-16
//!
//! Routes:
//!     GET  /api/notifications : newest-first outcome records (max 50)
//!     GET  /api/status        : {status: text summary}
//!     POST /api/stop          : stop every session, free every slot
//!     POST /api/add-wallet    : {privateKey} → {success, message}

use crate::notify::NotificationLog;
use crate::registry::AccountRegistry;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, NormalizePath};
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{error, info};

/// Shared handler state
#[derive(Clone)]
pub struct ControlState {
    pub registry: Arc<AccountRegistry>,
    pub log: Arc<NotificationLog>,
    /// Runtime that owns the sessions; registrations are spawned onto it so
    /// their watch tasks outlive the HTTP worker that accepted the request
    pub runtime: Handle,
}

pub type ControlData = web::Data<ControlState>;

#[derive(Debug, Deserialize)]
pub struct AddWalletRequest {
    #[serde(rename = "privateKey", default)]
    pub private_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

async fn notifications_handler(state: ControlData) -> impl Responder {
    HttpResponse::Ok().json(state.log.recent())
}

async fn status_handler(state: ControlData) -> impl Responder {
    HttpResponse::Ok().json(StatusResponse {
        status: state.registry.status().to_string(),
    })
}

async fn stop_handler(state: ControlData) -> impl Responder {
    let stopped = state.registry.stop_all();
    info!("Control: stopped {} accounts", stopped);
    HttpResponse::Ok().json(ActionResponse::ok("All accounts stopped"))
}

async fn add_wallet_handler(
    state: ControlData,
    body: Option<web::Json<AddWalletRequest>>,
) -> impl Responder {
    let key = body
        .and_then(|b| b.into_inner().private_key)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());

    let Some(key) = key else {
        return HttpResponse::Ok().json(ActionResponse::failed("Please enter the private key"));
    };

    let registry = state.registry.clone();
    let result = state
        .runtime
        .spawn(async move { registry.register(&key).await })
        .await;

    let response = match result {
        Ok(Ok(account)) => ActionResponse::ok(format!("Account {} added", account.index)),
        Ok(Err(e)) => ActionResponse::failed(e.to_string()),
        Err(e) => {
            error!("Registration task failed: {}", e);
            ActionResponse::failed("Registration failed")
        }
    };
    HttpResponse::Ok().json(response)
}

/// Register the control routes on an app or scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/notifications", web::get().to(notifications_handler))
        .route("/api/status", web::get().to(status_handler))
        .route("/api/stop", web::post().to(stop_handler))
        .route("/api/add-wallet", web::post().to(add_wallet_handler));
}

fn no_cache_headers() -> DefaultHeaders {
    DefaultHeaders::new().add((header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"))
}

/// Build the control server; the caller awaits it and keeps its handle for shutdown
pub fn create_control_server(
    bind_address: &str,
    state: ControlState,
) -> std::io::Result<actix_web::dev::Server> {
    info!("Starting control server on {}", bind_address);

    Ok(HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(no_cache_headers())
            .app_data(web::Data::new(state.clone()))
            .configure(configure)
    })
    .workers(2)
    .bind(bind_address)?
    .shutdown_timeout(5)
    .run())
}
