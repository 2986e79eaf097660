use std::sync::Arc;

use chrono::{Duration, Utc};
use federation_auth::callback::{
    CallbackContext, CallbackParams, CallbackProcessor, OutcomeStatus, RedirectTargets,
    SessionDirective, DEFAULT_IDENTITY_PROVIDERS_TARGET,
};
use federation_auth::claims::{self, ClaimType};
use federation_auth::error::ProviderResponseErrorKind;
use federation_auth::http::HttpClientConfig;
use federation_auth::oauth::providers::google;
use federation_auth::oauth::{AuthorizationState, Provider};
use federation_auth::policy::EmailDomainValidator;
use federation_auth::{ErrorKind, ProviderSettings};
use mockito::{Matcher, Mock, Server, ServerGuard};
use secrecy::SecretString;
use url::Url;

const CALLBACK: &str = "https://chat.example.com/authentication/callback";
const TOKEN_BODY: &str = r#"{"access_token":"tok","expires_in":3599,"token_type":"Bearer"}"#;

fn processor(server_url: &str, suffixes: &[&str]) -> CallbackProcessor {
    let settings = ProviderSettings::google("client-123", SecretString::from("shh".to_string()))
        .unwrap()
        .with_endpoints(
            Url::parse(&format!("{}/o/oauth2/auth", server_url)).unwrap(),
            Url::parse(&format!("{}/o/oauth2/token", server_url)).unwrap(),
            Url::parse(&format!("{}/oauth2/v2/userinfo", server_url)).unwrap(),
        );
    let provider = google::Provider::new(settings, HttpClientConfig::default()).unwrap();

    CallbackProcessor::new(
        Arc::new(provider),
        Arc::new(EmailDomainValidator::new(suffixes.iter().copied())),
        RedirectTargets::default(),
    )
}

fn stored_state() -> AuthorizationState {
    AuthorizationState::issue(Url::parse(CALLBACK).unwrap())
}

fn callback(code: Option<&str>, state: Option<&str>) -> CallbackParams {
    CallbackParams {
        code: code.map(str::to_string),
        state: state.map(str::to_string),
        ..Default::default()
    }
}

async fn token_mock(server: &mut ServerGuard, status: usize, body: &str, hits: usize) -> Mock {
    server
        .mock("POST", "/o/oauth2/token")
        .match_body(Matcher::UrlEncoded("code".into(), "auth-code".into()))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

async fn user_info_mock(server: &mut ServerGuard, status: usize, body: &str, hits: usize) -> Mock {
    server
        .mock("GET", "/oauth2/v2/userinfo")
        .match_query(Matcher::UrlEncoded("access_token".into(), "tok".into()))
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(hits)
        .create_async()
        .await
}

#[tokio::test]
async fn test_successful_sign_in() {
    let mut server = Server::new_async().await;
    let token = token_mock(&mut server, 200, TOKEN_BODY, 1).await;
    let profile = user_info_mock(
        &mut server,
        200,
        r#"{"id":"u1","email":"a@ok.com","given_name":"Ada","gender":"female"}"#,
        1,
    )
    .await;

    let state = stored_state();
    let params = callback(Some("auth-code"), Some(&state.nonce));
    let outcome = processor(&server.url(), &[".ok.com"])
        .process(&params, Some(state), &CallbackContext::default())
        .await;

    token.assert_async().await;
    profile.assert_async().await;
    assert_eq!(outcome.status, OutcomeStatus::Authenticated);
    assert_eq!(outcome.redirect_target, "/");
    assert!(outcome.alert.is_none());

    let claims = outcome.claims().unwrap();
    assert_eq!(claims::find(claims, ClaimType::Identifier), Some("u1"));
    assert_eq!(claims::find(claims, ClaimType::Email), Some("a@ok.com"));
    assert_eq!(claims::find(claims, ClaimType::Name), Some("Ada"));
    assert_eq!(claims::find(claims, ClaimType::AuthMethod), Some("google"));
}

#[tokio::test]
async fn test_token_endpoint_failure() {
    let mut server = Server::new_async().await;
    let _token = token_mock(&mut server, 500, "{}", 1).await;
    let profile = user_info_mock(&mut server, 200, r#"{"id":"u1"}"#, 0).await;

    let state = stored_state();
    let params = callback(Some("auth-code"), Some(&state.nonce));
    let outcome = processor(&server.url(), &[])
        .process(&params, Some(state), &CallbackContext::default())
        .await;

    profile.assert_async().await;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert!(outcome.alert.is_some());
    assert!(outcome.claims().is_none());
    assert_eq!(outcome.session, SessionDirective::Unchanged);
    assert_eq!(
        outcome.error_kind,
        Some(ErrorKind::ProviderResponse(
            ProviderResponseErrorKind::UnexpectedStatus(500)
        ))
    );
}

#[tokio::test]
async fn test_profile_without_id() {
    let mut server = Server::new_async().await;
    let _token = token_mock(&mut server, 200, TOKEN_BODY, 1).await;
    let _profile = user_info_mock(&mut server, 200, r#"{"email":"a@ok.com"}"#, 1).await;

    let state = stored_state();
    let params = callback(Some("auth-code"), Some(&state.nonce));
    let outcome = processor(&server.url(), &[])
        .process(&params, Some(state), &CallbackContext::default())
        .await;

    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert!(outcome.claims().is_none());
    assert_eq!(
        outcome.error_kind,
        Some(ErrorKind::ProviderResponse(
            ProviderResponseErrorKind::MissingField("id")
        ))
    );
}

#[tokio::test]
async fn test_email_outside_allowed_domains_is_rejected() {
    let mut server = Server::new_async().await;
    let _token = token_mock(&mut server, 200, TOKEN_BODY, 1).await;
    let _profile = user_info_mock(&mut server, 200, r#"{"id":"u1","email":"a@bad.com"}"#, 1).await;

    let state = stored_state();
    let params = callback(Some("auth-code"), Some(&state.nonce));
    let context = CallbackContext {
        already_authenticated: true,
        return_url: None,
    };
    let outcome = processor(&server.url(), &[".ok.com"])
        .process(&params, Some(state), &context)
        .await;

    assert_eq!(outcome.status, OutcomeStatus::Rejected);
    assert_eq!(outcome.session, SessionDirective::SignOut);
    assert_eq!(outcome.redirect_target, "/");
    assert_eq!(outcome.error_kind, Some(ErrorKind::PolicyRejected));
    assert!(outcome.claims().is_none());
}

#[tokio::test]
async fn test_missing_code_and_error_is_protocol_error() {
    let mut server = Server::new_async().await;
    let token = token_mock(&mut server, 200, TOKEN_BODY, 0).await;

    let state = stored_state();
    let params = callback(None, Some(&state.nonce));
    let outcome = processor(&server.url(), &[])
        .process(&params, Some(state), &CallbackContext::default())
        .await;

    token.assert_async().await;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Protocol));
    assert!(outcome.alert.is_some());
}

#[tokio::test]
async fn test_provider_error_skips_network_calls() {
    let mut server = Server::new_async().await;
    let token = token_mock(&mut server, 200, TOKEN_BODY, 0).await;
    let profile = user_info_mock(&mut server, 200, r#"{"id":"u1"}"#, 0).await;

    let state = stored_state();
    let params = CallbackParams {
        code: Some("auth-code".to_string()),
        state: Some(state.nonce.clone()),
        error: Some("access_denied".to_string()),
        error_description: None,
    };
    let outcome = processor(&server.url(), &[])
        .process(&params, Some(state), &CallbackContext::default())
        .await;

    token.assert_async().await;
    profile.assert_async().await;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.error_kind, Some(ErrorKind::ProviderDenied));
    assert_eq!(outcome.redirect_target, "/");
    assert!(outcome.alert.unwrap().message.contains("access_denied"));
}

#[tokio::test]
async fn test_provider_error_text_is_sanitized() {
    let server = Server::new_async().await;
    let params = CallbackParams {
        error: Some("access_denied".to_string()),
        error_description: Some(format!("line\r\nbreak{}", "x".repeat(400))),
        ..Default::default()
    };
    let outcome = processor(&server.url(), &[])
        .process(&params, Some(stored_state()), &CallbackContext::default())
        .await;

    let message = outcome.alert.unwrap().message;
    assert!(!message.contains('\n'));
    assert!(message.contains("linebreak"));
    assert!(message.len() < 300);
}

#[tokio::test]
async fn test_state_mismatch_is_rejected_even_with_valid_code() {
    let mut server = Server::new_async().await;
    let token = token_mock(&mut server, 200, TOKEN_BODY, 0).await;

    let params = callback(Some("auth-code"), Some("forged"));
    let outcome = processor(&server.url(), &[])
        .process(&params, Some(stored_state()), &CallbackContext::default())
        .await;

    token.assert_async().await;
    assert_eq!(outcome.status, OutcomeStatus::Rejected);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Security));
    assert_eq!(outcome.session, SessionDirective::SignOut);
    assert!(outcome.claims().is_none());
}

#[tokio::test]
async fn test_forged_state_without_code_is_rejected() {
    let mut server = Server::new_async().await;
    let token = token_mock(&mut server, 200, TOKEN_BODY, 0).await;

    for params in [callback(None, Some("forged")), callback(None, None)] {
        let outcome = processor(&server.url(), &[])
            .process(&params, Some(stored_state()), &CallbackContext::default())
            .await;

        assert_eq!(outcome.status, OutcomeStatus::Rejected);
        assert_eq!(outcome.error_kind, Some(ErrorKind::Security));
        assert_eq!(outcome.session, SessionDirective::SignOut);
        assert!(outcome.claims().is_none());
    }
    token.assert_async().await;
}

#[tokio::test]
async fn test_out_of_range_token_lifetime_fails_the_flow() {
    let mut server = Server::new_async().await;
    let _token = token_mock(
        &mut server,
        200,
        r#"{"access_token":"tok","expires_in":9000000000000000000,"token_type":"Bearer"}"#,
        1,
    )
    .await;
    let profile = user_info_mock(&mut server, 200, r#"{"id":"u1"}"#, 0).await;

    let state = stored_state();
    let params = callback(Some("auth-code"), Some(&state.nonce));
    let outcome = processor(&server.url(), &[])
        .process(&params, Some(state), &CallbackContext::default())
        .await;

    profile.assert_async().await;
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(
        outcome.error_kind,
        Some(ErrorKind::ProviderResponse(
            ProviderResponseErrorKind::MissingField("expires_in")
        ))
    );
    assert!(outcome.claims().is_none());
}

#[tokio::test]
async fn test_missing_stored_state_is_rejected() {
    let server = Server::new_async().await;
    let params = callback(Some("auth-code"), Some("anything"));
    let outcome = processor(&server.url(), &[])
        .process(&params, None, &CallbackContext::default())
        .await;

    assert_eq!(outcome.status, OutcomeStatus::Rejected);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Security));
}

#[tokio::test]
async fn test_expired_state_is_rejected() {
    let server = Server::new_async().await;
    let mut state = stored_state();
    state.created_at = Utc::now() - Duration::minutes(30);
    let params = callback(Some("auth-code"), Some(&state.nonce));

    let outcome = processor(&server.url(), &[])
        .process(&params, Some(state), &CallbackContext::default())
        .await;

    assert_eq!(outcome.status, OutcomeStatus::Rejected);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Security));
}

#[tokio::test]
async fn test_linking_redirects_to_identity_providers() {
    let mut server = Server::new_async().await;
    let _token = token_mock(&mut server, 200, TOKEN_BODY, 1).await;
    let _profile = user_info_mock(&mut server, 200, r#"{"id":"u1"}"#, 1).await;

    let state = stored_state();
    let params = callback(Some("auth-code"), Some(&state.nonce));
    let context = CallbackContext {
        already_authenticated: true,
        return_url: None,
    };
    let outcome = processor(&server.url(), &[])
        .process(&params, Some(state), &context)
        .await;

    assert_eq!(outcome.status, OutcomeStatus::Authenticated);
    assert_eq!(outcome.redirect_target, DEFAULT_IDENTITY_PROVIDERS_TARGET);
}

#[tokio::test]
async fn test_return_url_is_honoured_only_when_local() {
    let mut server = Server::new_async().await;
    let _token = token_mock(&mut server, 200, TOKEN_BODY, 2).await;
    let _profile = user_info_mock(&mut server, 200, r#"{"id":"u1"}"#, 2).await;
    let processor = processor(&server.url(), &[]);

    let state = stored_state();
    let params = callback(Some("auth-code"), Some(&state.nonce));
    let context = CallbackContext {
        already_authenticated: false,
        return_url: Some("/rooms/general".to_string()),
    };
    let outcome = processor.process(&params, Some(state), &context).await;
    assert_eq!(outcome.redirect_target, "/rooms/general");

    let state = stored_state();
    let params = callback(Some("auth-code"), Some(&state.nonce));
    let context = CallbackContext {
        already_authenticated: false,
        return_url: Some("https://evil.example.com/".to_string()),
    };
    let outcome = processor.process(&params, Some(state), &context).await;
    assert_eq!(outcome.redirect_target, "/");
}

#[tokio::test]
async fn test_unreachable_provider_is_network_failure() {
    let state = stored_state();
    let params = callback(Some("auth-code"), Some(&state.nonce));
    // Nothing listens on port 1.
    let outcome = processor("http://127.0.0.1:1", &[])
        .process(&params, Some(state), &CallbackContext::default())
        .await;

    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.error_kind, Some(ErrorKind::Network));
    assert_eq!(outcome.session, SessionDirective::Unchanged);
}

#[tokio::test]
async fn test_redirect_round_trips_through_callback() {
    let mut server = Server::new_async().await;
    let _token = token_mock(&mut server, 200, TOKEN_BODY, 1).await;
    let _profile = user_info_mock(&mut server, 200, r#"{"id":"u1"}"#, 1).await;
    let processor = processor(&server.url(), &[]);

    let request = processor.provider().build_authorize_url(CALLBACK).unwrap();
    let returned_state = request
        .url
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap();

    let params = callback(Some("auth-code"), Some(&returned_state));
    let outcome = processor
        .process(&params, Some(request.state), &CallbackContext::default())
        .await;

    assert_eq!(outcome.status, OutcomeStatus::Authenticated);
}
