pub mod bill_service;
pub mod extraction;
pub mod portal_client;

pub use bill_service::*;
pub use extraction::*;
pub use portal_client::*;
