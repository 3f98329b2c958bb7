use actix_web::web::Data;
use actix_web::{HttpResponse, Responder, get};
use utoipa::openapi::OpenApi;

#[get("/api-docs/openapi.json")]
pub async fn openapi_json(openapi: Data<OpenApi>) -> impl Responder {
    HttpResponse::Ok().json(openapi.get_ref())
}
