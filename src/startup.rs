use std::net::TcpListener;

use actix_files::Files;
use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};

use crate::{
    routes::{bill_route, default_route, health_check_route},
    services::BillService,
};

pub fn run(listener: TcpListener, bill_service: BillService) -> Result<Server, std::io::Error> {
    let bill_service = web::Data::new(bill_service);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .service(Files::new("/static", "./templates/static").prefer_utf8(true))
            .service(health_check_route::health_check)
            .service(default_route::default)
            .service(bill_route::lookup)
            .service(bill_route::lookup_json)
            .app_data(bill_service.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
