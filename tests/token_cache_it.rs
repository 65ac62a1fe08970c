// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use url::Url;
// self
use imagery_proxy::{
	auth::{ClientCredentials, TokenCache, UpstreamAuthClient},
	error::{Error, TransportError},
	http::ReqwestHttpClient,
};

const CLIENT_ID: &str = "imagery-client";
const CLIENT_SECRET: &str = "imagery-secret";
const BASIC_AUTH: &str = "Basic aW1hZ2VyeS1jbGllbnQ6aW1hZ2VyeS1zZWNyZXQ=";

fn build_cache(server: &MockServer) -> TokenCache {
	let auth_base =
		Url::parse(&server.url("/identity/")).expect("Mock identity base should parse.");
	let exchange = UpstreamAuthClient::new(
		&auth_base,
		&ClientCredentials::new(CLIENT_ID, CLIENT_SECRET),
		ReqwestHttpClient::default(),
	)
	.expect("Upstream auth client should build.");

	TokenCache::new(Arc::new(exchange))
}

#[tokio::test]
async fn exchange_posts_client_credentials_with_basic_auth() {
	let server = MockServer::start_async().await;
	let cache = build_cache(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/identity/connect/token")
				.header("authorization", BASIC_AUTH)
				.header("content-type", "application/x-www-form-urlencoded")
				.form_urlencoded_tuple("grant_type", "client_credentials")
				.form_urlencoded_tuple("scope", "api:imagery");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"upstream-token\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
			);
		})
		.await;
	let issued = cache.token().await.expect("Token exchange should succeed.");

	assert_eq!(issued.access_token.expose(), "upstream-token");
	assert_eq!(issued.expires_in, 3600);

	let cached = cache.token().await.expect("Cached token request should succeed.");

	assert_eq!(cached.access_token.expose(), "upstream-token");
	assert!(cached.expires_in <= 3600 && cached.expires_in >= 3590);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn concurrent_callers_share_one_exchange() {
	let server = MockServer::start_async().await;
	let cache = Arc::new(build_cache(&server));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/identity/connect/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(200))
				.body(
					"{\"access_token\":\"shared-token\",\"token_type\":\"Bearer\",\"expires_in\":900}",
				);
		})
		.await;
	let calls = (0..8).map(|_| {
		let cache = cache.clone();

		async move { cache.token().await }
	});
	let results = futures::future::join_all(calls).await;

	for result in results {
		let issued = result.expect("Concurrent token request should succeed.");

		assert_eq!(issued.access_token.expose(), "shared-token");
	}

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn short_lived_tokens_are_renewed_on_every_call() {
	let server = MockServer::start_async().await;
	let cache = build_cache(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/identity/connect/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"brief-token\",\"token_type\":\"Bearer\",\"expires_in\":30}",
			);
		})
		.await;

	cache.token().await.expect("First token request should succeed.");
	cache.token().await.expect("Second token request should succeed.");

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn error_field_in_success_body_is_an_auth_failure() {
	let server = MockServer::start_async().await;
	let cache = build_cache(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/identity/connect/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_scope\"}");
		})
		.await;
	let err = cache.token().await.expect_err("An error body should fail the exchange.");

	assert!(
		matches!(
			&err,
			Error::UpstreamAuth { reason, status: Some(200) } if reason == "invalid_scope"
		),
		"unexpected error: {err:?}"
	);
	assert_eq!(err.to_string(), "Authentication error: invalid_scope.");
	assert!(cache.current().await.is_none());

	mock.assert_async().await;
}

#[tokio::test]
async fn rejected_credentials_report_status() {
	let server = MockServer::start_async().await;
	let cache = build_cache(&server);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/identity/connect/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\"}");
		})
		.await;
	let err = cache.token().await.expect_err("Rejected credentials should fail the exchange.");

	assert!(
		matches!(
			&err,
			Error::UpstreamAuth { reason, status: Some(400) } if reason == "invalid_client"
		),
		"unexpected error: {err:?}"
	);
}

#[tokio::test]
async fn failed_renewal_leaves_slot_empty_until_next_success() {
	let server = MockServer::start_async().await;
	let cache = build_cache(&server);
	let failing = server
		.mock_async(|when, then| {
			when.method(POST).path("/identity/connect/token");
			then.status(500).body("upstream exploded");
		})
		.await;
	let err = cache.token().await.expect_err("A 500 from the token endpoint should fail.");

	assert!(matches!(err, Error::Transport(_)), "unexpected error: {err:?}");
	assert!(cache.current().await.is_none());

	failing.delete_async().await;

	let recovering = server
		.mock_async(|when, then| {
			when.method(POST).path("/identity/connect/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"second-try\",\"token_type\":\"Bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let issued = cache.token().await.expect("The next call should exchange again.");

	assert_eq!(issued.access_token.expose(), "second-try");
	assert!(cache.current().await.is_some());

	recovering.assert_async().await;
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_failure() {
	let auth_base =
		Url::parse("http://127.0.0.1:9/identity/").expect("Identity base should parse.");
	let exchange = UpstreamAuthClient::new(
		&auth_base,
		&ClientCredentials::new(CLIENT_ID, CLIENT_SECRET),
		ReqwestHttpClient::default(),
	)
	.expect("Upstream auth client should build.");
	let cache = TokenCache::new(Arc::new(exchange));
	let err = cache.token().await.expect_err("An unreachable endpoint should fail.");

	assert!(
		matches!(err, Error::Transport(TransportError::Network { .. })),
		"unexpected error: {err:?}"
	);
}
