use actix_web::{
    web::{self, post, Data},
    HttpResponse, Scope,
};
use shared::models::node::StatusRequest;

use crate::api::server::{not_found, AppState};

/// Status pull endpoint. Anything short of a well-formed body carrying the
/// right secret gets the generic 404.
async fn get_status(body: web::Bytes, app_state: Data<AppState>) -> HttpResponse {
    let request: StatusRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => return not_found(),
    };
    if request.passwd != app_state.password {
        return not_found();
    }

    HttpResponse::Ok().json(app_state.collector.status().await)
}

pub(crate) fn status_routes() -> Scope {
    web::scope("/get-status").route("", post().to(get_status))
}
