#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic data model shared across the building optimizer.
//!
//! Bounding boxes, polygon rings, districts, point features and heatmap
//! points. Everything except [`District`] is request-scoped: values are
//! recomputed from the map services on every request and never persisted.
//! Districts are mirrored into the population store by the database crate.

pub mod catalog;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
}

impl LatLng {
    /// Creates a new coordinate pair.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns `true` for `(0.0, 0.0)`, the value centroid computation
    /// yields when there are no usable vertices.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

/// A geographic bounding box in WGS84 coordinates.
///
/// Always satisfies `south < north` and `west < east`; degenerate boxes
/// cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern latitude boundary.
    pub south: f64,
    /// Northern latitude boundary.
    pub north: f64,
    /// Western longitude boundary.
    pub west: f64,
    /// Eastern longitude boundary.
    pub east: f64,
}

impl BoundingBox {
    /// Creates a bounding box, returning `None` when the box is degenerate
    /// or any edge is not a finite number.
    #[must_use]
    pub fn new(south: f64, north: f64, west: f64, east: f64) -> Option<Self> {
        let finite = [south, north, west, east].iter().all(|v| v.is_finite());
        if !finite || south >= north || west >= east {
            return None;
        }

        Some(Self {
            south,
            north,
            west,
            east,
        })
    }

    /// Parses the Nominatim `boundingbox` field, an array of four decimal
    /// strings ordered `[south, north, west, east]`.
    #[must_use]
    pub fn from_nominatim<S: AsRef<str>>(parts: &[S]) -> Option<Self> {
        if parts.len() != 4 {
            return None;
        }

        let mut values = [0.0_f64; 4];
        for (slot, part) in values.iter_mut().zip(parts) {
            *slot = part.as_ref().trim().parse().ok()?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Formats the box as an Overpass QL bbox filter: `(south,west,north,east)`.
    #[must_use]
    pub fn overpass_filter(&self) -> String {
        format!("({},{},{},{})", self.south, self.west, self.north, self.east)
    }

    /// Returns `true` if the point lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: LatLng) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lng)
    }
}

/// A closed polygon ring with at least three vertices.
///
/// The closing edge is implicit. Rings taken from `GeoJSON` keep the
/// repeated closing vertex their source carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ring(Vec<LatLng>);

impl Ring {
    /// Minimum number of vertices in a ring.
    pub const MIN_POINTS: usize = 3;

    /// Wraps a vertex list, returning `None` if it has fewer than
    /// [`Self::MIN_POINTS`] vertices.
    #[must_use]
    pub fn new(points: Vec<LatLng>) -> Option<Self> {
        (points.len() >= Self::MIN_POINTS).then_some(Self(points))
    }

    /// The ring's vertices in order.
    #[must_use]
    pub fn points(&self) -> &[LatLng] {
        &self.0
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never `true` for a constructed ring.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An administrative district within a city.
///
/// Serialized in the shape the map frontend expects: flat `lat`/`lng`
/// for the centroid, `geometry` for the rings, `osm_id` for the external
/// identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    /// Normalized district name, unique within a city.
    pub name: String,
    /// Arithmetic centroid of all polygon vertices.
    #[serde(flatten)]
    pub centroid: LatLng,
    /// People per square kilometre.
    pub population_density: u32,
    /// Boundary rings.
    #[serde(rename = "geometry")]
    pub polygons: Vec<Ring>,
    /// Identifier assigned by the upstream map service.
    #[serde(rename = "osm_id")]
    pub external_id: String,
}

/// Category of a point feature fetched from the spatial query service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureCategory {
    /// `amenity=school`
    School,
    /// `building=residential` and `building=apartments`
    Residential,
    /// Shops, markets, restaurants, hospitals and banks.
    Commercial,
}

impl FeatureCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::School, Self::Residential, Self::Commercial]
    }
}

/// A single point of interest, normalized from a node, way or relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFeature {
    /// Latitude of the node, or of the way/relation center.
    pub lat: f64,
    /// Longitude of the node, or of the way/relation center.
    pub lng: f64,
    /// Feature category.
    #[serde(rename = "type")]
    pub category: FeatureCategory,
    /// Tag value that selected the feature (`apartments`, `mall`, ...).
    pub subtype: String,
    /// Base heatmap intensity, nominally in `[0, 1]`.
    pub intensity: f64,
    /// Display name, when the feature has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A weighted point for heatmap rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapPoint {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Rendering weight, never below 0.1.
    pub weight: f64,
}

/// Kinds of public building the optimizer can place.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BuildingType {
    /// School
    School,
    /// Hospital
    Hospital,
    /// Kindergarten
    Kindergarten,
    /// Pharmacy
    Pharmacy,
    /// Shopping center
    ShoppingCenter,
    /// Park
    Park,
}

impl BuildingType {
    /// Human-readable label used in history listings and AI prompts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::School => "School",
            Self::Hospital => "Hospital",
            Self::Kindergarten => "Kindergarten",
            Self::Pharmacy => "Pharmacy",
            Self::ShoppingCenter => "Shopping center",
            Self::Park => "Park",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::School,
            Self::Hospital,
            Self::Kindergarten,
            Self::Pharmacy,
            Self::ShoppingCenter,
            Self::Park,
        ]
    }
}
