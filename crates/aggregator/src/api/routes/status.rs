use actix_web::{
    web::{self, get, Data},
    HttpResponse, Scope,
};
use chrono::Utc;

use crate::api::server::AppState;

/// Cluster view for the dashboard. Unauthenticated; always covers every
/// configured host.
async fn get_status(app_state: Data<AppState>) -> HttpResponse {
    let snapshot = app_state
        .store
        .snapshot(Utc::now(), app_state.expire_timeout)
        .await;
    HttpResponse::Ok().json(snapshot)
}

pub(crate) fn status_routes() -> Scope {
    web::scope("/get-status").route("", get().to(get_status))
}
