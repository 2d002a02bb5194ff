use std::net::TcpListener;

use env_logger::Env;
use waterbill::{
    configuration::get_configuration,
    services::{BillService, PortalClient},
    startup::run,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration()?;

    let portal = PortalClient::new(
        configuration.portal,
        configuration.extraction.auth_marker.clone(),
    )?;
    let bill_service = BillService::new(
        portal,
        configuration.extraction,
        configuration.application.require_date_range,
    );

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    log::info!("Listening on {}", address);

    run(listener, bill_service)?.await?;

    Ok(())
}
