use actix_web::{http::StatusCode, post, web, HttpResponse};
use askama::Template;
use serde::Serialize;

use crate::{
    domain::{AccountInfo, BillError, BillForm, BillRecord},
    services::{BillService, ExtractionResult, TraceEvent},
};

/// What the caller gets back, for both the HTML page and the JSON API.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BillResponse {
    pub account_info: Option<AccountInfo>,
    pub selected_bill: Option<BillRecord>,
    pub bills: Vec<BillRecord>,
    pub error: Option<String>,
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEvent>>,
    #[serde(skip)]
    status: StatusCode,
}

impl From<Result<ExtractionResult, BillError>> for BillResponse {
    fn from(outcome: Result<ExtractionResult, BillError>) -> Self {
        match outcome {
            Ok(result) => {
                let notice = result
                    .selected_bill
                    .is_none()
                    .then(|| BillError::NoBillForRange.user_message());

                BillResponse {
                    account_info: Some(result.account_info),
                    selected_bill: result.selected_bill,
                    bills: result.bills,
                    error: None,
                    notice,
                    trace: result.trace,
                    status: StatusCode::OK,
                }
            }
            Err(e) => {
                let message = e.user_message();
                let (error, notice) = match e.is_failure() {
                    true => (Some(message), None),
                    false => (None, Some(message)),
                };

                BillResponse {
                    account_info: None,
                    selected_bill: None,
                    bills: vec![],
                    error,
                    notice,
                    trace: None,
                    status: e.status_code(),
                }
            }
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    identifier: String,
    from_date: String,
    to_date: String,
    require_date_range: bool,
    account_rows: Vec<(&'static str, String)>,
    bill_rows: Vec<(&'static str, String)>,
    bills: Vec<BillRecord>,
    error: Option<String>,
    notice: Option<String>,
}

impl IndexTemplate {
    pub fn empty(require_date_range: bool) -> Self {
        IndexTemplate {
            identifier: String::new(),
            from_date: String::new(),
            to_date: String::new(),
            require_date_range,
            account_rows: vec![],
            bill_rows: vec![],
            bills: vec![],
            error: None,
            notice: None,
        }
    }

    /// Echoes the form back without the password.
    fn from_response(form: &BillForm, require_date_range: bool, response: BillResponse) -> Self {
        IndexTemplate {
            identifier: form.identifier.clone(),
            from_date: form.from_date.clone().unwrap_or_default(),
            to_date: form.to_date.clone().unwrap_or_default(),
            require_date_range,
            account_rows: response
                .account_info
                .map(|info| info.display_rows())
                .unwrap_or_default(),
            bill_rows: response
                .selected_bill
                .map(|bill| bill.display_rows())
                .unwrap_or_default(),
            bills: response.bills,
            error: response.error,
            notice: response.notice,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        match self.render() {
            Ok(body) => HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(body),
            Err(e) => {
                log::error!("Failed to render index page: {:?}", e);
                HttpResponse::InternalServerError().finish()
            }
        }
    }
}

#[post("/")]
async fn lookup(service: web::Data<BillService>, form: web::Form<BillForm>) -> HttpResponse {
    let response = BillResponse::from(service.fetch(&form).await);

    IndexTemplate::from_response(&form, service.require_date_range(), response).into_response()
}

#[post("/api/bill")]
async fn lookup_json(service: web::Data<BillService>, body: web::Json<BillForm>) -> HttpResponse {
    let response = BillResponse::from(service.fetch(&body).await);

    HttpResponse::build(response.status).json(response)
}
