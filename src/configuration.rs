use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::services::ExtractionPolicy;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub portal: PortalSettings,
    pub extraction: ExtractionPolicy,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    /// Reject submissions that do not carry both dates.
    #[serde(default)]
    pub require_date_range: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PortalSettings {
    pub base_url: String,
    pub login_path: String,
    pub search_path: String,
    pub user_agent: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
    /// chrono format used when posting dates to the portal
    pub date_format: String,
    pub fields: PortalFormFields,
}

/// Names of the form fields the portal expects.
#[derive(Deserialize, Clone, Debug)]
pub struct PortalFormFields {
    pub identifier: String,
    pub secret: String,
    pub from_date: String,
    pub to_date: String,
}

impl PortalSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> anyhow::Result<Settings> {
    let base_path =
        std::env::current_dir().context("Failed to determine the current directory")?;
    let configuration_directory = base_path.join("configuration");

    let environment = Environment::try_from(
        std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "local".into()),
    )
    .map_err(anyhow::Error::msg)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // E.g. `APP_PORTAL__BASE_URL=http://...` sets `Settings.portal.base_url`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<Settings>()?)
}
