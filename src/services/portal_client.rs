use anyhow::{bail, Context};
use chrono::format::{Item, StrftimeItems};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE},
    Client,
};
use url::Url;

use crate::{
    configuration::PortalSettings,
    domain::{BillError, Credentials, DateRange},
    services::has_auth_marker,
};

/// Raw pages of one login + search cycle.
#[derive(Debug)]
pub struct PortalPages {
    pub landing: String,
    pub search: Option<String>,
}

/// Talks to the utility portal. Every call opens a fresh cookie session, so
/// nothing leaks between two users' lookups.
pub struct PortalClient {
    settings: PortalSettings,
    auth_marker: String,
    login_url: Url,
    search_url: Url,
}

impl PortalClient {
    pub fn new(settings: PortalSettings, auth_marker: String) -> anyhow::Result<Self> {
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("Invalid portal base url: {}", settings.base_url))?;
        let login_url = base_url
            .join(&settings.login_path)
            .context("Invalid portal login path")?;
        let search_url = base_url
            .join(&settings.search_path)
            .context("Invalid portal search path")?;

        if StrftimeItems::new(&settings.date_format).any(|item| matches!(item, Item::Error)) {
            bail!("Invalid portal date format: {}", settings.date_format);
        }
        if auth_marker.is_empty() {
            bail!("Authentication marker must not be empty");
        }

        Ok(PortalClient {
            settings,
            auth_marker,
            login_url,
            search_url,
        })
    }

    fn new_session(&self) -> Result<Client, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(self.settings.user_agent.clone())
            .default_headers(headers)
            .timeout(self.settings.timeout())
            .build()
    }

    /// Logs in and, when a range is given, runs the date search in the same
    /// session. The portal answers 200 even for bad credentials, so success is
    /// judged by the auth marker only.
    pub async fn login_and_search(
        &self,
        credentials: &Credentials,
        range: Option<&DateRange>,
    ) -> Result<PortalPages, BillError> {
        let client = self.new_session()?;
        let fields = &self.settings.fields;

        let login_form = [
            (fields.identifier.as_str(), credentials.identifier.as_str()),
            (fields.secret.as_str(), credentials.secret.as_str()),
        ];
        let response = client
            .post(self.login_url.clone())
            .form(&login_form)
            .send()
            .await?;
        let status = response.status();
        let landing = response.text().await?;

        if !has_auth_marker(&landing, &self.auth_marker) {
            log::warn!(
                "Login for {} answered {} without the auth marker",
                credentials.identifier,
                status
            );
            return Err(BillError::AuthenticationFailed);
        }
        log::info!("Logged in as {} ({})", credentials.identifier, status);

        let search = match range {
            Some(range) => {
                let from = range.from.format(&self.settings.date_format).to_string();
                let to = range.to.format(&self.settings.date_format).to_string();
                let search_form = [
                    (fields.from_date.as_str(), from.as_str()),
                    (fields.to_date.as_str(), to.as_str()),
                ];

                let response = client
                    .post(self.search_url.clone())
                    .form(&search_form)
                    .send()
                    .await?;
                log::info!(
                    "Searched bills {} - {} for {} ({})",
                    from,
                    to,
                    credentials.identifier,
                    response.status()
                );

                Some(response.text().await?)
            }
            None => None,
        };

        Ok(PortalPages { landing, search })
    }
}
