pub mod account_info;
pub mod bill_error;
pub mod bill_form;
pub mod bill_record;
pub mod credentials;
pub mod date_range;

pub use account_info::*;
pub use bill_error::*;
pub use bill_form::*;
pub use bill_record::*;
pub use credentials::*;
pub use date_range::*;
