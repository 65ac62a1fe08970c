//! Map click to tile/pixel addressing.
//!
//! The map widget addresses tiles top-down (XYZ): row 0 is the northernmost row. Some imagery
//! deployments serve TMS tiles, where row 0 is the southernmost row, so the resolver flips the
//! row index when [`TileScheme::Tms`] is selected.

// std
use std::{
	f64::consts::PI,
	ops::{Add, Div, Mul, Sub},
};
// self
use crate::{_prelude::*, catalog::Coordinate};

/// Pixel-space point at a given zoom level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	/// Horizontal coordinate, increasing east.
	pub x: f64,
	/// Vertical coordinate, increasing south.
	pub y: f64,
}
impl Point {
	/// Creates a point.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Floors both axes.
	pub fn floor(self) -> Self {
		Self::new(self.x.floor(), self.y.floor())
	}

	/// Rounds both axes.
	pub fn round(self) -> Self {
		Self::new(self.x.round(), self.y.round())
	}
}
impl Add for Point {
	type Output = Self;

	fn add(self, rhs: Self) -> Self {
		Self::new(self.x + rhs.x, self.y + rhs.y)
	}
}
impl Sub for Point {
	type Output = Self;

	fn sub(self, rhs: Self) -> Self {
		Self::new(self.x - rhs.x, self.y - rhs.y)
	}
}
impl Mul<f64> for Point {
	type Output = Self;

	fn mul(self, rhs: f64) -> Self {
		Self::new(self.x * rhs, self.y * rhs)
	}
}
impl Div<f64> for Point {
	type Output = Self;

	fn div(self, rhs: f64) -> Self {
		Self::new(self.x / rhs, self.y / rhs)
	}
}

/// Projects geographic coordinates to pixel coordinates at a zoom level.
pub trait Projection
where
	Self: Send + Sync,
{
	/// Pixel position of `at` in the whole-world layer at `zoom`.
	fn lat_lng_to_point(&self, at: Coordinate, zoom: u8) -> Point;
}

/// Spherical Web Mercator (EPSG:3857) with 256 px at zoom 0, as used by slippy maps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WebMercator;
impl WebMercator {
	/// Earth radius used by the spherical projection, in metres.
	pub const EARTH_RADIUS: f64 = 6_378_137.;
	/// Latitudes beyond this are clamped so the world stays square.
	pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

	/// Layer size in pixels at `zoom`.
	pub fn scale(zoom: u8) -> f64 {
		256. * 2_f64.powi(i32::from(zoom))
	}
}
impl Projection for WebMercator {
	fn lat_lng_to_point(&self, at: Coordinate, zoom: u8) -> Point {
		let d = PI / 180.;
		let lat = at.latitude.clamp(-Self::MAX_LATITUDE, Self::MAX_LATITUDE);
		let sin = (lat * d).sin();
		let projected_x = Self::EARTH_RADIUS * at.longitude * d;
		let projected_y = Self::EARTH_RADIUS * ((1. + sin) / (1. - sin)).ln() / 2.;
		let k = 0.5 / (PI * Self::EARTH_RADIUS);
		let scale = Self::scale(zoom);

		Point::new(scale * (k * projected_x + 0.5), scale * (-k * projected_y + 0.5))
	}
}

/// Row-numbering convention of the upstream tile endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileScheme {
	/// Row 0 at the top (north); the map widget's own convention.
	Xyz,
	/// Row 0 at the bottom (south).
	#[default]
	Tms,
}

/// Tile index plus the pixel offset inside that tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileAddress {
	/// Zoom level.
	pub zoom: u8,
	/// Tile column.
	pub tile_x: i64,
	/// Tile row in the upstream scheme.
	pub tile_y: i64,
	/// Pixel column inside the tile.
	pub pixel_x: i64,
	/// Pixel row inside the tile.
	pub pixel_y: i64,
}
impl TileAddress {
	/// Path of the per-pixel info endpoint for `product`.
	pub fn info_path(&self, product: &str) -> String {
		format!(
			"{product}/tiles/{}/{}/{}/info/{}/{}",
			self.zoom, self.tile_x, self.tile_y, self.pixel_x, self.pixel_y
		)
	}
}

/// Converts map clicks into [`TileAddress`]es.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileResolver {
	/// Tile edge length in pixels.
	pub tile_size: u32,
	/// Upstream row convention.
	pub scheme: TileScheme,
}
impl TileResolver {
	/// Tile edge length used by the imagery API.
	pub const DEFAULT_TILE_SIZE: u32 = 256;

	/// Creates a resolver for `scheme` with 256 px tiles.
	pub fn new(scheme: TileScheme) -> Self {
		Self { tile_size: Self::DEFAULT_TILE_SIZE, scheme }
	}

	/// Overrides the tile edge length.
	pub fn with_tile_size(mut self, tile_size: u32) -> Self {
		self.tile_size = tile_size;

		self
	}

	/// Resolves a click at `click` on a map showing `zoom` with the given `pixel_origin`.
	pub fn resolve(
		&self,
		click: Coordinate,
		zoom: u8,
		pixel_origin: Point,
		projection: &dyn Projection,
	) -> TileAddress {
		let size = f64::from(self.tile_size);
		let layer_point = projection.lat_lng_to_point(click, zoom).floor();
		let tile = (layer_point / size).floor();
		let tile_corner = tile * size - pixel_origin;
		let tile_pixel = layer_point - pixel_origin - tile_corner;
		let tile_y = match self.scheme {
			TileScheme::Xyz => tile.y as i64,
			TileScheme::Tms => tile_rows(zoom).saturating_sub(tile.y as i64).saturating_sub(1),
		};

		TileAddress {
			zoom,
			tile_x: tile.x as i64,
			tile_y,
			pixel_x: tile_pixel.x as i64,
			pixel_y: tile_pixel.y as i64,
		}
	}
}
impl Default for TileResolver {
	fn default() -> Self {
		Self::new(TileScheme::default())
	}
}

/// Number of tile rows at `zoom`, saturating once `2^zoom` no longer fits an `i64`.
fn tile_rows(zoom: u8) -> i64 {
	1_i64.checked_shl(u32::from(zoom)).filter(|rows| *rows > 0).unwrap_or(i64::MAX)
}

/// Viewport state the resolver needs from the map widget.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
	/// Current zoom level.
	pub zoom: u8,
	/// Layer pixel shown at the viewport's top-left corner.
	pub pixel_origin: Point,
}
impl ViewState {
	/// View of a `viewport` (width, height in pixels) centered on `center`.
	pub fn centered(
		center: Coordinate,
		zoom: u8,
		viewport: Point,
		projection: &dyn Projection,
	) -> Self {
		let pixel_origin = (projection.lat_lng_to_point(center, zoom) - viewport / 2.).round();

		Self { zoom, pixel_origin }
	}
}
