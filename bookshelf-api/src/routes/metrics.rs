use actix_web::web::ThinData;
use actix_web::{HttpResponse, Responder, get};
use metrics_exporter_prometheus::PrometheusHandle;

#[utoipa::path(
    summary = "Prometheus metrics",
    description = "Renders every recorded metric in the Prometheus text format.",
    responses(
        (status = 200, description = "Metrics rendered", body = String)
    ),
    tag = "Health"
)]
#[get("/metrics")]
pub async fn metrics(handle: ThinData<PrometheusHandle>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(handle.render())
}
