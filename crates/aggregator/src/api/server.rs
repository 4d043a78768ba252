use actix_web::middleware::{Compress, NormalizePath, TrailingSlash};
use actix_web::{middleware, web, web::Data, App, HttpResponse, HttpServer};
use chrono::Duration;
use log::info;
use serde_json::json;
use std::sync::Arc;

use crate::api::routes::status::status_routes;
use crate::store::ClusterStore;
use crate::utils::loop_heartbeats::FetcherHeartbeats;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<ClusterStore>,
    pub(crate) expire_timeout: Duration,
    pub(crate) heartbeats: Arc<FetcherHeartbeats>,
}

pub(crate) fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "success": false,
        "error": "Resource not found"
    }))
}

pub async fn start_server(
    host: &str,
    port: u16,
    store: Arc<ClusterStore>,
    expire_timeout: Duration,
    heartbeats: Arc<FetcherHeartbeats>,
) -> std::io::Result<()> {
    info!("Starting aggregator API at http://{host}:{port}");
    let app_state = Data::new(AppState {
        store,
        expire_timeout,
        heartbeats,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .wrap(Compress::default())
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .service(web::resource("/health").route(web::get().to(
                |data: web::Data<AppState>| async move {
                    let health_status = data.heartbeats.health_status();
                    if health_status.healthy {
                        HttpResponse::Ok().json(health_status)
                    } else {
                        HttpResponse::InternalServerError().json(health_status)
                    }
                },
            )))
            .service(status_routes())
            .default_service(web::route().to(|| async { not_found() }))
    })
    .bind((host, port))?
    .run()
    .await
}
