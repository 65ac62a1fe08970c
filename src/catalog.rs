//! Area-filtered product catalog, fetched once and memoized for the process lifetime.
//!
//! Loading runs four steps: fetch the upstream index, keep `Only`/`Best` products covering the
//! reference point, enrich each survivor with its boundary polygon concurrently, then order by
//! constraint date with the newest first. A failed index fetch fails the whole load and nothing is
//! memoized, so the next call starts over. A failed detail lookup only drops that product.

pub mod product;

pub use product::*;

// crates.io
use futures::future;
// self
use crate::{
	_prelude::*,
	http::ReqwestHttpClient,
	imagery::UrlBuilder,
	obs::{OpKind, OpSpan},
};

/// Memoized catalog of products covering a reference point.
#[derive(Debug)]
pub struct ProductCatalog {
	http_client: ReqwestHttpClient,
	reference_point: Coordinate,
	cached: OnceCell<Arc<[ProductDetails]>>,
}
impl ProductCatalog {
	/// Creates an empty catalog filtering around `reference_point`.
	pub fn new(http_client: ReqwestHttpClient, reference_point: Coordinate) -> Self {
		Self { http_client, reference_point, cached: OnceCell::new() }
	}

	/// Returns the catalog, loading it through `urls` on the first successful call.
	///
	/// Later calls return the memoized sequence without contacting upstream, whatever builder
	/// they pass. Concurrent first calls share one load.
	pub async fn products(&self, urls: &UrlBuilder) -> Result<Arc<[ProductDetails]>> {
		let products = self
			.cached
			.get_or_try_init(|| {
				OpSpan::new(OpKind::CatalogLoad, "products").observe(self.load(urls))
			})
			.await?;

		Ok(products.clone())
	}

	/// Returns the memoized catalog without loading it.
	pub fn cached(&self) -> Option<Arc<[ProductDetails]>> {
		self.cached.get().cloned()
	}

	async fn load(&self, urls: &UrlBuilder) -> Result<Arc<[ProductDetails]>> {
		let index = self.fetch_index(urls).await?;
		let total = index.len();
		let in_area = filter_to_area(index, self.reference_point);
		let mut products = self.fetch_details(urls, in_area).await;

		sort_by_recency(&mut products);

		tracing::info!(total, kept = products.len(), "loaded product catalog");

		Ok(products.into())
	}

	async fn fetch_index(&self, urls: &UrlBuilder) -> Result<Vec<ProductSummary>> {
		let index =
			self.http_client.get_json::<product::ProductIndex>(&urls.build("", None)).await?;

		Ok(index.products)
	}

	async fn fetch_details(
		&self,
		urls: &UrlBuilder,
		products: Vec<ProductSummary>,
	) -> Vec<ProductDetails> {
		let lookups = products.into_iter().map(|summary| async move {
			let url = urls.build(&summary.title, None);

			match self.http_client.get_json::<product::ProductDetailBody>(&url).await {
				Ok(body) => Some(ProductDetails { summary, bounds: body.bounds }),
				Err(source) => {
					let cause = source.to_string();
					let miss =
						Error::EnrichmentMiss { title: summary.title, source: Box::new(source) };

					tracing::warn!(error = %miss, %cause, "dropping product");

					None
				},
			}
		});

		future::join_all(lookups).await.into_iter().flatten().collect()
	}
}

/// Keeps area-scoped (`Only`/`Best`) products whose bounding box contains `point`.
pub fn filter_to_area(products: Vec<ProductSummary>, point: Coordinate) -> Vec<ProductSummary> {
	products
		.into_iter()
		.filter(|product| {
			product.constraint_type.is_area_scoped() && product.bounding_box.contains(point)
		})
		.collect()
}

/// Orders products newest first; equal dates keep their relative order.
pub fn sort_by_recency(products: &mut [ProductDetails]) {
	products.sort_by(|a, b| b.summary.constraint_date.cmp(&a.summary.constraint_date));
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn summary(title: &str, kind: ConstraintType, in_area: bool, date: &str) -> ProductSummary {
		let (south_west, north_east) = if in_area {
			(Coordinate::new(-32.5, 115.5), Coordinate::new(-31.5, 116.5))
		} else {
			(Coordinate::new(-34.5, 150.5), Coordinate::new(-33.5, 151.5))
		};

		ProductSummary {
			title: title.into(),
			constraint_type: kind,
			constraint_date: date.parse().expect("Fixture dates should parse."),
			bounding_box: BoundingBox { south_west, north_east },
			links: None,
			extra: Default::default(),
		}
	}

	fn details(title: &str, date: &str) -> ProductDetails {
		ProductDetails {
			summary: summary(title, ConstraintType::Only, true, date),
			bounds: Polygon { kind: "Polygon".into(), coordinates: Vec::new() },
		}
	}

	#[test]
	fn filter_keeps_area_scoped_products_covering_the_point() {
		let products = vec![
			summary("A", ConstraintType::UpTo, true, "2019-05-01"),
			summary("B", ConstraintType::Best, true, "2019-05-01"),
			summary("C", ConstraintType::Only, false, "2019-05-01"),
		];
		let kept = filter_to_area(products, Coordinate::PERTH);

		assert_eq!(kept.iter().map(|p| p.title.as_str()).collect::<Vec<_>>(), ["B"]);
	}

	#[test]
	fn sort_orders_newest_first_and_keeps_ties_stable() {
		let mut products = vec![
			details("May", "2019-05-01"),
			details("June-a", "2019-06-01"),
			details("June-b", "2019-06-01T00:00:00Z"),
		];

		sort_by_recency(&mut products);

		assert_eq!(
			products.iter().map(ProductDetails::title).collect::<Vec<_>>(),
			["June-a", "June-b", "May"]
		);
	}

	#[test]
	fn empty_index_filters_to_empty() {
		assert!(filter_to_area(Vec::new(), Coordinate::PERTH).is_empty());
	}
}
