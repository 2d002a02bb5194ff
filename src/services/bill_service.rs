use uuid::Uuid;

use crate::{
    domain::{BillError, BillForm},
    services::{extract_pages, ExtractionPolicy, ExtractionResult, PortalClient},
};

/// One lookup: validate the form, log in, search, extract.
pub struct BillService {
    portal: PortalClient,
    policy: ExtractionPolicy,
    require_date_range: bool,
}

impl BillService {
    pub fn new(portal: PortalClient, policy: ExtractionPolicy, require_date_range: bool) -> Self {
        BillService {
            portal,
            policy,
            require_date_range,
        }
    }

    pub fn require_date_range(&self) -> bool {
        self.require_date_range
    }

    pub async fn fetch(&self, form: &BillForm) -> Result<ExtractionResult, BillError> {
        let request_id = Uuid::new_v4();

        let (credentials, range) = form.validate(self.require_date_range).map_err(|e| {
            log::info!("[{}] Rejected form: {}", request_id, e);
            e
        })?;

        log::info!(
            "[{}] Looking up bill for {} (range: {:?})",
            request_id,
            credentials.identifier,
            range
        );

        let pages = self
            .portal
            .login_and_search(&credentials, range.as_ref())
            .await
            .map_err(|e| {
                log::error!("[{}] Portal request failed: {}", request_id, e);
                e
            })?;

        let result = extract_pages(
            &pages.landing,
            pages.search.as_deref(),
            &self.policy,
            range.as_ref(),
        )
        .map_err(|e| {
            log::error!("[{}] Extraction failed: {}", request_id, e);
            BillError::from(e)
        })?;

        match result.selected_bill {
            Some(ref bill) => log::info!(
                "[{}] Found bill {} among {} rows",
                request_id,
                bill.bill_number,
                result.bills.len()
            ),
            None => log::info!("[{}] No bill for {}", request_id, credentials.identifier),
        }

        Ok(result)
    }
}
