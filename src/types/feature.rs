//! Spatial features supplied by the feature provider (usually organisation units).

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Equatorial radius of the WGS84 ellipsoid in metres, used for geodesic areas.
const EARTH_RADIUS: f64 = 6_378_137.0;

/// A longitude/latitude pair in degrees.
pub type Position = [f64; 2];

/// A GeoJSON geometry. Only the types the reduction pipeline understands are
/// supported.
///
/// # Examples
///
/// ```
/// use climate_data::Geometry;
///
/// let json = r#"{"type":"Point","coordinates":[36.8,-1.3]}"#;
/// let point: Geometry = serde_json::from_str(json).unwrap();
/// assert_eq!(point, Geometry::Point([36.8, -1.3]));
/// assert_eq!(point.area(), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// Returns `true` for `Polygon` and `MultiPolygon`.
    pub fn is_polygonal(&self) -> bool {
        !matches!(self, Geometry::Point(_))
    }

    /// Geodesic area in square metres. Points have no area.
    ///
    /// Uses the spherical excess of each ring on a sphere with the WGS84
    /// equatorial radius. Holes are subtracted from their outer ring.
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Point(_) => 0.0,
            Geometry::Polygon(rings) => polygon_area(rings),
            Geometry::MultiPolygon(polygons) => {
                polygons.iter().map(|rings| polygon_area(rings)).sum()
            }
        }
    }
}

fn polygon_area(rings: &[Vec<Position>]) -> f64 {
    let mut rings = rings.iter();
    let Some(outer) = rings.next() else {
        return 0.0;
    };
    let holes: f64 = rings.map(|ring| ring_area(ring).abs()).sum();
    ring_area(outer).abs() - holes
}

// Rings are closed: the last position repeats the first.
fn ring_area(coords: &[Position]) -> f64 {
    let len = coords.len().saturating_sub(1);
    if len <= 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..len {
        let lower = coords[i];
        let middle = coords[if i + 1 == len { 0 } else { i + 1 }];
        let upper = coords[(i + 2) % len];
        total += (upper[0].to_radians() - lower[0].to_radians()) * middle[1].to_radians().sin();
    }
    total * EARTH_RADIUS * EARTH_RADIUS / 2.0
}

/// A uniquely identified geometry values are extracted for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub geometry: Geometry,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }
}

#[derive(Deserialize)]
struct RawFeatureCollection {
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    id: Option<Value>,
    geometry: Option<Value>,
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
}

impl RawFeature {
    fn id(&self) -> Option<String> {
        let id = self.id.as_ref().or_else(|| self.properties.get("id"))?;
        match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Parses a GeoJSON `FeatureCollection` into the ordered feature list used by
/// the pipeline.
///
/// The feature id is read from the feature itself, falling back to
/// `properties.id`. Features without an id, without a geometry or with a
/// geometry type other than `Point`, `Polygon` or `MultiPolygon` are skipped.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if `json` is not a feature collection.
pub fn features_from_geojson(json: &str) -> Result<Vec<Feature>, serde_json::Error> {
    let collection: RawFeatureCollection = serde_json::from_str(json)?;
    let features = collection
        .features
        .into_iter()
        .filter_map(|raw| {
            let id = raw.id()?;
            let geometry = raw.geometry?;
            match serde_json::from_value::<Geometry>(geometry) {
                Ok(geometry) => Some(Feature { id, geometry }),
                Err(e) => {
                    warn!("Skipping feature {} with unsupported geometry: {}", id, e);
                    None
                }
            }
        })
        .collect();
    Ok(features)
}
