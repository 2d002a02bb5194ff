use serde::Deserialize;

use super::{BillError, Credentials, DateRange};

/// Fields posted by the lookup form. The HTML form uses `userid`/`password`
/// like the portal's own login page, the JSON API uses camelCase names.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct BillForm {
    #[serde(alias = "userid")]
    pub identifier: String,
    #[serde(alias = "password")]
    pub secret: String,
    #[serde(default, alias = "fromDate")]
    pub from_date: Option<String>,
    #[serde(default, alias = "toDate")]
    pub to_date: Option<String>,
}

impl BillForm {
    /// Runs before anything touches the network.
    pub fn validate(
        &self,
        require_date_range: bool,
    ) -> Result<(Credentials, Option<DateRange>), BillError> {
        let identifier = self.identifier.trim();
        if identifier.is_empty() {
            return Err(BillError::InvalidInput("Account ID is required.".to_string()));
        }
        if self.secret.is_empty() {
            return Err(BillError::InvalidInput("Password is required.".to_string()));
        }

        let from = non_blank(&self.from_date);
        let to = non_blank(&self.to_date);

        let range = match (from, to) {
            (Some(from), Some(to)) => {
                Some(DateRange::parse(from, to).map_err(BillError::InvalidInput)?)
            }
            (None, None) if require_date_range => {
                return Err(BillError::InvalidInput(
                    "Both a start and an end date are required.".to_string(),
                ))
            }
            (None, None) => None,
            _ => {
                return Err(BillError::InvalidInput(
                    "Provide both a start and an end date, or neither.".to_string(),
                ))
            }
        };

        let credentials = Credentials {
            identifier: identifier.to_string(),
            secret: self.secret.clone(),
        };

        Ok((credentials, range))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
