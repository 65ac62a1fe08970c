//! Product catalog records as served by the upstream imagery index.

// std
use std::cmp::Ordering;
// crates.io
use serde::{Deserializer, Serializer, de};
use time::{
	Date, PrimitiveDateTime, format_description::well_known::Rfc3339, macros::format_description,
};
// self
use crate::_prelude::*;

/// Geographic coordinate in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
	/// Latitude, positive north.
	pub latitude: f64,
	/// Longitude, positive east.
	pub longitude: f64,
}
impl Coordinate {
	/// Perth, Western Australia; the demo's area of interest.
	pub const PERTH: Self = Self::new(-31.9510894, 115.8869623);

	/// Creates a coordinate from latitude and longitude.
	pub const fn new(latitude: f64, longitude: f64) -> Self {
		Self { latitude, longitude }
	}
}

/// Axis-aligned bounding box (`bottomLeft` is south-west, `topRight` is north-east).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
	/// South-west corner.
	#[serde(rename = "bottomLeft")]
	pub south_west: Coordinate,
	/// North-east corner.
	#[serde(rename = "topRight")]
	pub north_east: Coordinate,
}
impl BoundingBox {
	/// Returns `true` when `point` lies inside the box, edges included.
	pub fn contains(&self, point: Coordinate) -> bool {
		self.south_west.longitude <= point.longitude
			&& point.longitude <= self.north_east.longitude
			&& self.south_west.latitude <= point.latitude
			&& point.latitude <= self.north_east.latitude
	}
}

/// How a composite product constrains which captures it includes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintType {
	/// Only captures from the constraint date.
	Only,
	/// Latest captures up to the constraint date.
	UpTo,
	/// Best capture available at each location.
	Best,
	/// Constraint type this client does not recognize.
	#[serde(other)]
	Other,
}
impl ConstraintType {
	/// `Only` and `Best` products carry their own footprint; `UpTo` products span everything.
	pub fn is_area_scoped(self) -> bool {
		matches!(self, Self::Only | Self::Best)
	}
}

/// Constraint date, ordered by instant and serialized back exactly as received.
#[derive(Clone, Debug)]
pub struct ConstraintDate {
	raw: String,
	instant: OffsetDateTime,
}
impl ConstraintDate {
	/// Instant the date denotes; dates without a time are midnight UTC.
	pub fn instant(&self) -> OffsetDateTime {
		self.instant
	}

	/// Text as received from upstream.
	pub fn as_str(&self) -> &str {
		&self.raw
	}
}
impl FromStr for ConstraintDate {
	type Err = time::error::Parse;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		let instant = match OffsetDateTime::parse(raw, &Rfc3339) {
			Ok(instant) => instant,
			Err(rfc3339) => parse_naive(raw).ok_or(rfc3339)?,
		};

		Ok(Self { raw: raw.to_owned(), instant })
	}
}
impl PartialEq for ConstraintDate {
	fn eq(&self, other: &Self) -> bool {
		self.instant == other.instant
	}
}
impl Eq for ConstraintDate {}
impl PartialOrd for ConstraintDate {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for ConstraintDate {
	fn cmp(&self, other: &Self) -> Ordering {
		self.instant.cmp(&other.instant)
	}
}
impl Display for ConstraintDate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.raw)
	}
}
impl Serialize for ConstraintDate {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.raw)
	}
}
impl<'de> Deserialize<'de> for ConstraintDate {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		raw.parse().map_err(de::Error::custom)
	}
}

/// Offset-less datetimes and plain dates are taken as UTC.
fn parse_naive(raw: &str) -> Option<OffsetDateTime> {
	let seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
	let fractional =
		format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
	let date = format_description!("[year]-[month]-[day]");

	PrimitiveDateTime::parse(raw, seconds)
		.or_else(|_| PrimitiveDateTime::parse(raw, fractional))
		.map(PrimitiveDateTime::assume_utc)
		.or_else(|_| Date::parse(raw, date).map(|day| day.midnight().assume_utc()))
		.ok()
}

/// Hypermedia links attached to an index entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductLinks {
	/// Link to the product's own resource.
	#[serde(rename = "self")]
	pub self_link: Link,
}

/// Single hypermedia link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
	/// Target URL.
	pub href: String,
}

/// Entry of the upstream product index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
	/// Unique product title, also its path below the API base.
	pub title: String,
	/// Constraint applied when compositing captures.
	pub constraint_type: ConstraintType,
	/// Date the constraint refers to.
	pub constraint_date: ConstraintDate,
	/// Footprint of the product.
	pub bounding_box: BoundingBox,
	/// Links supplied by the index.
	#[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
	pub links: Option<ProductLinks>,
	/// Remaining index fields, served back unchanged.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

/// GeoJSON polygon (`[ring][position][lng, lat, ...]`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
	/// GeoJSON geometry type; `Polygon` for product bounds.
	#[serde(rename = "type")]
	pub kind: String,
	/// Linear rings; the first is the exterior.
	pub coordinates: Vec<Vec<Vec<f64>>>,
}

/// Index entry enriched with its boundary polygon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
	/// Fields copied from the index entry.
	#[serde(flatten)]
	pub summary: ProductSummary,
	/// Exact product boundary.
	pub bounds: Polygon,
}
impl ProductDetails {
	/// Product title.
	pub fn title(&self) -> &str {
		&self.summary.title
	}
}

/// Body of `GET <base>`.
#[derive(Debug, Deserialize)]
pub(crate) struct ProductIndex {
	pub products: Vec<ProductSummary>,
}

/// Body of `GET <base><title>`; only the boundary is used.
#[derive(Debug, Deserialize)]
pub(crate) struct ProductDetailBody {
	pub bounds: Polygon,
}
