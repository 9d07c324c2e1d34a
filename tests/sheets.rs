//! Sheets client against a fake token endpoint and Sheets API.

mod common;

use common::{TestServer, ACCESS_TOKEN, FORBIDDEN_SHEET};
use serde_json::json;
use shot2sheet::{RowSink, SheetError, SheetRow, SheetsClient};

fn row() -> SheetRow {
    SheetRow {
        link: "https://example.com/chat.png".into(),
        name: "Karan Patel".into(),
        phone: "+918954687354".into(),
        center: "Jagatpura".into(),
        source: "WhatsApp".into(),
    }
}

#[tokio::test]
async fn append_posts_one_row_with_bearer_token() {
    let server = TestServer::start().await;
    let client = SheetsClient::new(
        reqwest::Client::new(),
        &server.secrets("sheet-123"),
        &server.config(),
    );

    let receipt = client.append_row(&row()).await.unwrap();

    assert_eq!(receipt.updated_range.as_deref(), Some("Sheet1!A2:E2"));
    assert_eq!(receipt.updated_rows, Some(1));

    let tokens = server.token_requests();
    assert_eq!(tokens.len(), 1);
    assert_eq!(
        tokens[0].get("grant_type").map(String::as_str),
        Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
    );

    let appends = server.appends();
    assert_eq!(appends.len(), 1);
    let append = &appends[0];
    assert_eq!(append.spreadsheet_id, "sheet-123");
    assert_eq!(append.range, "Sheet1:append");
    assert!(append.query.contains("valueInputOption=USER_ENTERED"));
    assert!(append.query.contains("insertDataOption=INSERT_ROWS"));
    assert_eq!(
        append.authorization.as_deref(),
        Some(format!("Bearer {ACCESS_TOKEN}").as_str())
    );
    assert_eq!(
        append.body,
        json!({
            "majorDimension": "ROWS",
            "values": [[
                "https://example.com/chat.png",
                "Karan Patel",
                "+918954687354",
                "Jagatpura",
                "WhatsApp"
            ]]
        })
    );
}

#[tokio::test]
async fn custom_worksheet_is_the_append_range() {
    let server = TestServer::start().await;
    let config = shot2sheet::PipelineConfig::builder()
        .sheets_base_url(&server.base_url)
        .worksheet("Leads")
        .build()
        .unwrap();
    let client = SheetsClient::new(reqwest::Client::new(), &server.secrets("sheet-123"), &config);

    let receipt = client.append_row(&row()).await.unwrap();

    assert_eq!(server.appends()[0].range, "Leads:append");
    assert_eq!(receipt.updated_range.as_deref(), Some("Leads!A2:E2"));
}

#[tokio::test]
async fn permission_denied_surfaces_google_message() {
    let server = TestServer::start().await;
    let client = SheetsClient::new(
        reqwest::Client::new(),
        &server.secrets(FORBIDDEN_SHEET),
        &server.config(),
    );

    let err = client.append_row(&row()).await.unwrap_err();

    match err {
        SheetError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "PERMISSION_DENIED: The caller does not have permission");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_assertion_is_an_auth_failure() {
    let server = TestServer::start().await;
    let mut secrets = server.secrets("sheet-123");
    // A token URI that answers 404: the exchange must fail before any append.
    secrets.service_account.token_uri = server.url("/no-such-token-endpoint");
    let client = SheetsClient::new(reqwest::Client::new(), &secrets, &server.config());

    let err = client.append_row(&row()).await.unwrap_err();

    assert!(matches!(err, SheetError::Auth { status: 404, .. }), "got {err:?}");
    assert!(server.appends().is_empty());
}
