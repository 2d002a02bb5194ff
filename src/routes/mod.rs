pub mod bill_route;
pub mod default_route;
pub mod health_check_route;
