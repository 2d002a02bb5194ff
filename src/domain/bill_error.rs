use actix_web::http::StatusCode;

/// Everything that can end a bill lookup. None of these are retried; the user
/// resubmits the form.
#[derive(Debug, thiserror::Error)]
pub enum BillError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Could not reach the billing portal: {0}")]
    TransportError(#[from] reqwest::Error),
    #[error("Portal did not accept the credentials")]
    AuthenticationFailed,
    #[error("Logged in but the account details could not be read")]
    AccountInfoMissing,
    #[error("No bill found for the selected period")]
    NoBillForRange,
}

impl BillError {
    /// Text shown to the person who submitted the form.
    pub fn user_message(&self) -> String {
        match self {
            BillError::InvalidInput(message) => message.clone(),
            BillError::TransportError(_) => {
                "Could not reach the billing portal, please try again.".to_string()
            }
            BillError::AuthenticationFailed => "Invalid credentials.".to_string(),
            BillError::AccountInfoMissing => "Account data unavailable.".to_string(),
            BillError::NoBillForRange => "No bill found for selected period.".to_string(),
        }
    }

    /// `NoBillForRange` is a legitimate answer, everything else is a failure.
    pub fn is_failure(&self) -> bool {
        !matches!(self, BillError::NoBillForRange)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BillError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            BillError::TransportError(_) => StatusCode::BAD_GATEWAY,
            BillError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            BillError::AccountInfoMissing => StatusCode::BAD_GATEWAY,
            BillError::NoBillForRange => StatusCode::OK,
        }
    }
}
