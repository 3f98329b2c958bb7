use actix_web::{HttpResponse, Responder, get};

#[utoipa::path(
    summary = "Health check",
    description = "Returns 200 while the service is able to answer requests.",
    responses(
        (status = 200, description = "Service is up", body = String)
    ),
    tag = "Health"
)]
#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("ok")
}
