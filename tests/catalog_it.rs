// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use imagery_proxy::{
	auth::TokenSecret,
	catalog::{Coordinate, ProductCatalog},
	error::{Error, TransportError},
	http::ReqwestHttpClient,
	imagery::UrlBuilder,
};

fn product(title: &str, constraint_type: &str, date: &str, in_area: bool) -> Value {
	let (south, west) = if in_area { (-32.5, 115.5) } else { (-34.5, 150.5) };
	let bottom_left = json!({ "latitude": south, "longitude": west });
	let top_right = json!({ "latitude": south + 1., "longitude": west + 1. });

	json!({
		"title": title,
		"constraintType": constraint_type,
		"constraintDate": date,
		"boundingBox": { "bottomLeft": bottom_left, "topRight": top_right },
		"_links": { "self": { "href": format!("https://api.example.com/v1/{title}") } },
	})
}

fn polygon() -> Value {
	json!({
		"bounds": {
			"type": "Polygon",
			"coordinates": [[
				[115.5, -32.5],
				[116.5, -32.5],
				[116.5, -31.5],
				[115.5, -31.5],
				[115.5, -32.5],
			]],
		},
	})
}

fn urls(server: &MockServer) -> UrlBuilder {
	UrlBuilder::with_token(server.url("/v1/"), &TokenSecret::new("tok"))
}

fn catalog() -> ProductCatalog {
	ProductCatalog::new(ReqwestHttpClient::default(), Coordinate::PERTH)
}

#[tokio::test]
async fn loads_area_products_newest_first() {
	let server = MockServer::start_async().await;
	let index = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/").query_param("access_token", "tok");
			then.status(200).json_body(json!({
				"products": [
					product("A", "UpTo", "2021-01-01", true),
					product("B", "Best", "2019-05-01", true),
					product("C", "Only", "2022-01-01", false),
					product("D", "Only", "2020-01-15T00:00:00Z", true),
				],
			}));
		})
		.await;
	let detail_b = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/B").query_param("access_token", "tok");
			then.status(200).json_body(polygon());
		})
		.await;
	let detail_d = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/D").query_param("access_token", "tok");
			then.status(200).json_body(polygon());
		})
		.await;
	let products = catalog().products(&urls(&server)).await.expect("Catalog load should succeed.");

	assert_eq!(products.iter().map(|p| p.title()).collect::<Vec<_>>(), ["D", "B"]);
	assert_eq!(products[0].bounds.kind, "Polygon");
	assert_eq!(products[0].bounds.coordinates[0].len(), 5);

	let links = products[1].summary.links.as_ref().expect("Links should pass through.");

	assert_eq!(links.self_link.href, "https://api.example.com/v1/B");

	index.assert_calls_async(1).await;
	detail_b.assert_calls_async(1).await;
	detail_d.assert_calls_async(1).await;
}

#[tokio::test]
async fn detail_miss_drops_only_that_product() {
	let server = MockServer::start_async().await;
	let _index = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/");
			then.status(200).json_body(json!({
				"products": [
					product("B", "Best", "2019-05-01", true),
					product("D", "Only", "2020-01-15", true),
				],
			}));
		})
		.await;
	let _detail_b = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/B");
			then.status(200).json_body(polygon());
		})
		.await;
	let detail_d = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/D");
			then.status(404).body("not found");
		})
		.await;
	let products = catalog().products(&urls(&server)).await.expect("Catalog load should succeed.");

	assert_eq!(products.iter().map(|p| p.title()).collect::<Vec<_>>(), ["B"]);

	detail_d.assert_calls_async(1).await;
}

#[tokio::test]
async fn index_failure_is_not_memoized() {
	let server = MockServer::start_async().await;
	let catalog = catalog();
	let failing = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/");
			then.status(503).body("maintenance");
		})
		.await;
	let err =
		catalog.products(&urls(&server)).await.expect_err("A 503 index should fail the load.");

	assert!(
		matches!(
			&err,
			Error::Transport(TransportError::Status { status: 503, url }) if !url.contains("tok")
		),
		"unexpected error: {err:?}"
	);
	assert!(catalog.cached().is_none());

	failing.delete_async().await;

	let recovered = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/");
			then.status(200).json_body(json!({ "products": [] }));
		})
		.await;
	let products = catalog.products(&urls(&server)).await.expect("The retry should load.");

	assert!(products.is_empty());
	assert!(catalog.cached().is_some());

	recovered.assert_calls_async(1).await;
}

#[tokio::test]
async fn malformed_index_fails_the_load() {
	let server = MockServer::start_async().await;
	let _index = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/");
			then.status(200).json_body(json!({ "products": [{ "title": 7 }] }));
		})
		.await;
	let err = catalog().products(&urls(&server)).await.expect_err("Malformed JSON should fail.");

	assert!(
		matches!(err, Error::Transport(TransportError::Decode { .. })),
		"unexpected error: {err:?}"
	);
}

#[tokio::test]
async fn memoized_catalog_ignores_later_builders() {
	let server = MockServer::start_async().await;
	let catalog = catalog();
	let index = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/");
			then.status(200).json_body(json!({
				"products": [product("B", "Best", "2019-05-01", true)],
			}));
		})
		.await;
	let _detail = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/B");
			then.status(200).json_body(polygon());
		})
		.await;
	let first = catalog.products(&urls(&server)).await.expect("First load should succeed.");
	let elsewhere = UrlBuilder::with_token("http://127.0.0.1:9/v1/", &TokenSecret::new("other"));
	let second = catalog.products(&elsewhere).await.expect("Memoized load should succeed.");

	assert_eq!(first, second);

	index.assert_calls_async(1).await;
}
