use std::{net::TcpListener, time::Duration};

use waterbill::{
    configuration::{PortalFormFields, PortalSettings},
    services::{BillService, ExtractionPolicy, PortalClient, RecordSelection},
    startup::run,
};
use wiremock::{
    matchers::{any, body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const LANDING_PAGE: &str = r#"<html><body>
    <table><tr><td>
        <span>Account No:</span> <b>1234567</b>
        <span>Name:</span> <b>Rahim&nbsp;Uddin</b>
        <span>Meter No:</span> <b>M-0042</b>
        <span>Phone:</span> <b>01711000000</b>
        <span>Address:</span> <b>12 Road 5, Dhanmondi</b>
    </td></tr></table>
    <table>
        <tr><td>Bill No</td><td>Issue Date</td><td>Bill Month</td><td>Water Bill</td>
            <td>Sewer Bill</td><td>VAT</td><td>Bill Amt</td><td>Surcharge</td>
            <td>Total Bill</td><td>Paid Date</td><td>Paid Amt</td><td>Status</td>
            <td>Balance</td></tr>
        <tr><td>11111</td><td>01/12/2023</td><td>DEC-2023</td><td>90</td><td>18</td>
            <td>5</td><td>113</td><td>0</td><td>113</td><td>10/12/2023</td><td>113</td>
            <td>PAID</td><td>0</td></tr>
        <tr><td>12345</td><td>01/01/2024</td><td>JAN-2024</td><td>100</td><td>20</td>
            <td>6</td><td>126</td><td>0</td><td>126</td><td></td><td></td>
            <td>UNPAID</td><td>126</td></tr>
        <tr><td>Total</td><td></td><td></td><td></td><td></td><td></td><td></td>
            <td></td><td>239</td><td></td><td></td><td></td><td></td></tr>
    </table>
</body></html>"#;

const SEARCH_PAGE: &str = r#"<html><body>
    <table>
        <tr><th>Bill No</th><th>Bill Month</th></tr>
        <tr><td>55555</td><td>01/03/2024</td><td>MAR-2024</td><td>80</td><td>16</td>
            <td>4</td><td>100</td><td>0</td><td>100</td><td></td><td></td>
            <td>UNPAID</td><td>100</td></tr>
    </table>
</body></html>"#;

const LOGIN_FAILED_PAGE: &str =
    "<html><body><p>Invalid User ID or Password</p><form>User ID</form></body></html>";

struct TestApp {
    address: String,
    portal: MockServer,
}

fn portal_settings(base_url: &str) -> PortalSettings {
    PortalSettings {
        base_url: base_url.to_string(),
        login_path: "/login.php".to_string(),
        search_path: "/search.php".to_string(),
        user_agent: "Mozilla/5.0".to_string(),
        timeout_milliseconds: 2000,
        date_format: "%d/%m/%Y".to_string(),
        fields: PortalFormFields {
            identifier: "userId".to_string(),
            secret: "password".to_string(),
            from_date: "from_date".to_string(),
            to_date: "to_date".to_string(),
        },
    }
}

async fn spawn_app_with(base_url: Option<&str>, policy: ExtractionPolicy) -> TestApp {
    spawn_app_with_timeout(base_url, policy, 2000).await
}

async fn spawn_app_with_timeout(
    base_url: Option<&str>,
    policy: ExtractionPolicy,
    timeout_milliseconds: u64,
) -> TestApp {
    let portal = MockServer::start().await;
    let base_url = base_url.map(str::to_string).unwrap_or_else(|| portal.uri());

    let settings = PortalSettings {
        timeout_milliseconds,
        ..portal_settings(&base_url)
    };
    let portal_client = PortalClient::new(settings, policy.auth_marker.clone()).unwrap();
    let bill_service = BillService::new(portal_client, policy, false);

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let server = run(listener, bill_service).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        portal,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(None, ExtractionPolicy::default()).await
}

async fn mount_login(app: &TestApp, status: u16, body: &str) {
    Mock::given(method("POST"))
        .and(path("/login.php"))
        .and(body_string_contains("userId=1234567"))
        .and(body_string_contains("password=secret"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("Set-Cookie", "PHPSESSID=abc123; Path=/")
                .set_body_string(body),
        )
        .mount(&app.portal)
        .await;
}

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(format!("{}/health_check", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length());
}

#[tokio::test]
async fn form_page_is_served() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(&app.address)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains(r#"name="userid""#));
    assert!(body.contains(r#"name="password""#));
}

#[tokio::test]
async fn api_returns_latest_bill() {
    let app = spawn_app().await;
    mount_login(&app, 200, LANDING_PAGE).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/bill", app.address))
        .json(&serde_json::json!({ "identifier": "1234567", "secret": "secret" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 200);
    let json: serde_json::Value = response.json().await.unwrap();

    assert_eq!(json["error"], serde_json::Value::Null);
    assert_eq!(json["accountInfo"]["accountNumber"], "1234567");
    assert_eq!(json["accountInfo"]["name"], "Rahim Uddin");
    assert_eq!(json["accountInfo"]["address"], "12 Road 5, Dhanmondi");
    assert_eq!(json["selectedBill"]["billNumber"], "12345");
    assert_eq!(json["selectedBill"]["status"], "UNPAID");
    assert_eq!(json["selectedBill"]["balance"], "126");
    assert_eq!(json["bills"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn first_row_policy_is_honoured() {
    let policy = ExtractionPolicy {
        selection: RecordSelection::First,
        ..Default::default()
    };
    let app = spawn_app_with(None, policy).await;
    mount_login(&app, 200, LANDING_PAGE).await;

    let json: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/api/bill", app.address))
        .json(&serde_json::json!({ "identifier": "1234567", "secret": "secret" }))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .unwrap();

    assert_eq!(json["selectedBill"]["billNumber"], "11111");
}

#[tokio::test]
async fn html_form_renders_bill() {
    let app = spawn_app().await;
    mount_login(&app, 200, LANDING_PAGE).await;

    let response = reqwest::Client::new()
        .post(&app.address)
        .form(&[("userid", "1234567"), ("password", "secret")])
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("Rahim Uddin"));
    assert!(body.contains("JAN-2024"));
    assert!(body.contains("UNPAID"));
    assert!(!body.contains("secret"));
}

#[tokio::test]
async fn search_reuses_login_session() {
    let app = spawn_app().await;
    mount_login(&app, 200, LANDING_PAGE).await;
    Mock::given(method("POST"))
        .and(path("/search.php"))
        .and(header("cookie", "PHPSESSID=abc123"))
        .and(body_string_contains("from_date=01%2F03%2F2024"))
        .and(body_string_contains("to_date=31%2F03%2F2024"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
        .expect(1)
        .mount(&app.portal)
        .await;

    let json: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/api/bill", app.address))
        .json(&serde_json::json!({
            "identifier": "1234567",
            "secret": "secret",
            "fromDate": "01/03/2024",
            "toDate": "31-03-2024",
        }))
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .unwrap();

    assert_eq!(json["accountInfo"]["accountNumber"], "1234567");
    assert_eq!(json["selectedBill"]["billNumber"], "55555");
    assert_eq!(json["bills"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_search_is_a_notice_not_an_error() {
    let app = spawn_app().await;
    mount_login(&app, 200, LANDING_PAGE).await;
    Mock::given(method("POST"))
        .and(path("/search.php"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>No records</body></html>"),
        )
        .mount(&app.portal)
        .await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/bill", app.address))
        .json(&serde_json::json!({
            "identifier": "1234567",
            "secret": "secret",
            "fromDate": "01/01/2025",
            "toDate": "31/01/2025",
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 200);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["error"], serde_json::Value::Null);
    assert_eq!(json["notice"], "No bill found for selected period.");
    assert_eq!(json["selectedBill"], serde_json::Value::Null);
    assert_eq!(json["accountInfo"]["name"], "Rahim Uddin");
}

#[tokio::test]
async fn bad_credentials_are_rejected_even_with_error_status() {
    for status in [200, 500] {
        let app = spawn_app().await;
        mount_login(&app, status, LOGIN_FAILED_PAGE).await;

        let response = reqwest::Client::new()
            .post(format!("{}/api/bill", app.address))
            .json(&serde_json::json!({ "identifier": "1234567", "secret": "secret" }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(response.status().as_u16(), 401, "portal status {}", status);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["error"], "Invalid credentials.");
        assert_eq!(json["accountInfo"], serde_json::Value::Null);
    }
}

#[tokio::test]
async fn page_without_account_fields_is_account_data_unavailable() {
    let app = spawn_app().await;
    mount_login(&app, 200, "<html><body>Account No</body></html>").await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/bill", app.address))
        .json(&serde_json::json!({ "identifier": "1234567", "secret": "secret" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 502);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["error"], "Account data unavailable.");
}

#[tokio::test]
async fn invalid_dates_never_reach_the_portal() {
    let app = spawn_app().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_string(LANDING_PAGE))
        .expect(0)
        .mount(&app.portal)
        .await;

    let cases = [
        ("1/1/2024", "31/01/2024"),
        ("01/02/2024", "01/01/2024"),
        ("01/01/2024", ""),
        ("2024-01-01", "2024-01-31"),
    ];

    for (from, to) in cases {
        let response = reqwest::Client::new()
            .post(format!("{}/api/bill", app.address))
            .json(&serde_json::json!({
                "identifier": "1234567",
                "secret": "secret",
                "fromDate": from,
                "toDate": to,
            }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            response.status().as_u16(),
            400,
            "accepted range {:?} - {:?}",
            from,
            to
        );
    }
}

#[tokio::test]
async fn unreachable_portal_is_a_transport_error() {
    let app = spawn_app_with(Some("http://127.0.0.1:1"), ExtractionPolicy::default()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/bill", app.address))
        .json(&serde_json::json!({ "identifier": "1234567", "secret": "secret" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 502);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        json["error"],
        "Could not reach the billing portal, please try again."
    );
}

#[tokio::test]
async fn slow_portal_is_a_transport_error() {
    let app = spawn_app_with_timeout(None, ExtractionPolicy::default(), 200).await;
    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(LANDING_PAGE)
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&app.portal)
        .await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/bill", app.address))
        .json(&serde_json::json!({ "identifier": "1234567", "secret": "secret" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 502);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        json["error"],
        "Could not reach the billing portal, please try again."
    );
}

#[tokio::test]
async fn lookups_do_not_share_a_cookie_session() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Set-Cookie", "PHPSESSID=abc123; Path=/")
                .set_body_string(LANDING_PAGE),
        )
        .expect(2)
        .mount(&app.portal)
        .await;

    for identifier in ["111", "222"] {
        let response = reqwest::Client::new()
            .post(format!("{}/api/bill", app.address))
            .json(&serde_json::json!({ "identifier": identifier, "secret": "secret" }))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(response.status().as_u16(), 200);
    }

    let logins = app.portal.received_requests().await.unwrap();
    assert_eq!(logins.len(), 2);
    assert!(logins[1].body.starts_with(b"userId=222"));
    for login in &logins {
        assert!(
            login.headers.get("cookie").is_none(),
            "login carried a session cookie"
        );
    }
}
