use actix_web::{
    http::{header, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
    HttpResponse,
};

use crate::{
    auth::{Role, TokenIssuer},
    config::AuthConfig,
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new("do-not-reuse-this-test-signing-key-0123456789")
}

pub fn issue_token(user_id: &str, role: Role) -> String {
    TokenIssuer::new(&get_auth_config()).issue_token(user_id, role, None).expect("Failed to sign token")
}

/// Sends the request against an app built from `configure`, with the test auth config installed. Error responses
/// are rendered the same way the live server renders them, so tests assert on status and body uniformly.
pub async fn send(req: TestRequest, token: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let mut req = req;
    if !token.is_empty() {
        req = req.insert_header((header::AUTHORIZATION, format!("Bearer {token}")));
    }
    let app = App::new().app_data(web::Data::new(get_auth_config())).configure(configure);
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = HttpResponse::from_error(e);
            let status = res.status();
            let body = actix_web::body::to_bytes(res.into_body()).await.unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub async fn get_request(token: &str, path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    send(TestRequest::get().uri(path), token, configure).await
}

pub async fn post_request(
    token: &str,
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    send(TestRequest::post().uri(path).set_json(body), token, configure).await
}

pub async fn patch_request(
    token: &str,
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    send(TestRequest::patch().uri(path).set_json(body), token, configure).await
}
