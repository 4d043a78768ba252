use actix_web::middleware::{Compress, NormalizePath, TrailingSlash};
use actix_web::{middleware, web, web::Data, App, HttpResponse, HttpServer};
use log::info;
use serde_json::json;
use std::sync::Arc;

use crate::api::routes::status::status_routes;
use crate::collector::NodeCollector;
use crate::utils::loop_heartbeats::LoopHeartbeats;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) collector: Arc<NodeCollector>,
    pub(crate) password: String,
    pub(crate) heartbeats: Arc<LoopHeartbeats>,
}

/// Response for unknown routes and rejected credentials. The two must stay
/// byte-identical so a probe cannot tell the status endpoint exists.
pub(crate) fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "success": false,
        "error": "Resource not found"
    }))
}

pub async fn start_server(
    host: &str,
    port: u16,
    collector: Arc<NodeCollector>,
    password: String,
    heartbeats: Arc<LoopHeartbeats>,
) -> std::io::Result<()> {
    info!("Starting agent API at http://{host}:{port}");
    let app_state = Data::new(AppState {
        collector,
        password,
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
