use actix_web::{get, web, Responder};

use crate::{routes::bill_route::IndexTemplate, services::BillService};

#[get("/")]
async fn default(service: web::Data<BillService>) -> impl Responder {
    IndexTemplate::empty(service.require_date_range()).into_response()
}
