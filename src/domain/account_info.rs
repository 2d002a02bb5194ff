use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_number: String,
    pub name: String,
    pub meter_number: String,
    pub phone: String,
    pub address: String,
}

impl AccountInfo {
    /// Account number and name are the only fields every landing page shows.
    pub fn is_valid(&self) -> bool {
        !self.account_number.is_empty() && !self.name.is_empty()
    }

    pub fn display_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Account No", self.account_number.clone()),
            ("Name", self.name.clone()),
            ("Meter No", self.meter_number.clone()),
            ("Phone", self.phone.clone()),
            ("Address", self.address.clone()),
        ]
    }
}
