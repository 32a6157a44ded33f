//! Chooses the spatial scale regions are reduced at.
//!
//! A polygon smaller than one pixel may contain no pixel centre, in which case
//! order-statistic reducers return nothing for it. Reducing such regions at a
//! finer scale keeps at least one sample inside them.

use crate::engine::error::EngineError;
use crate::engine::expression::Expression;
use crate::engine::{evaluate_number, Engine};
use crate::reducers::reducer::Reducer;
use crate::types::feature::{Feature, Geometry};
use log::debug;
use tokio_util::sync::CancellationToken;

/// What a reduction runs over.
#[derive(Debug, Clone, Copy)]
pub enum ScaleTarget<'a> {
    /// Many features reduced with one reducer.
    Features(&'a [Feature]),
    /// A single geometry.
    Geometry(&'a Geometry),
}

/// `sqrt(area) / 2` when `area` is smaller than one `baseline` pixel, else
/// `baseline`.
///
/// # Examples
///
/// ```
/// use climate_data::scale::corrected_scale;
///
/// assert_eq!(corrected_scale(1000.0, 10_000.0), 50.0);
/// assert_eq!(corrected_scale(1000.0, 5_000_000.0), 1000.0);
/// ```
pub fn corrected_scale(baseline: f64, area: f64) -> f64 {
    if area > 0.0 && area < baseline * baseline {
        area.sqrt() / 2.0
    } else {
        baseline
    }
}

/// Scale to reduce `target` with `reducer`, given the dataset's nominal scale.
///
/// Features only get a corrected scale for order-statistic reducers, based on
/// the smallest polygon with a non-zero area. A single polygon geometry is corrected for every
/// reducer. Points keep the baseline.
pub fn resolve(baseline: f64, reducer: Reducer, target: ScaleTarget<'_>) -> f64 {
    match target {
        ScaleTarget::Features(features) if reducer.is_order_statistic() => features
            .iter()
            .filter(|f| f.geometry.is_polygonal())
            .map(|f| f.geometry.area())
            .filter(|area| *area > 0.0)
            .min_by(f64::total_cmp)
            .map_or(baseline, |area| corrected_scale(baseline, area)),
        ScaleTarget::Features(_) => baseline,
        ScaleTarget::Geometry(geometry) if geometry.is_polygonal() => {
            corrected_scale(baseline, geometry.area())
        }
        ScaleTarget::Geometry(_) => baseline,
    }
}

/// Reads the nominal scale of the first image of `collection` and resolves
/// the scale for `target`.
pub async fn resolve_scale<E: Engine + ?Sized>(
    engine: &E,
    cancel: &CancellationToken,
    collection: &Expression,
    reducer: Reducer,
    target: ScaleTarget<'_>,
) -> Result<f64, EngineError> {
    let baseline = nominal_scale(engine, cancel, collection).await?;
    let scale = resolve(baseline, reducer, target);
    if scale < baseline {
        debug!(
            "Reducing with {} at {:.1} m instead of the nominal {:.1} m",
            reducer, scale, baseline
        );
    }
    Ok(scale)
}

pub(crate) async fn nominal_scale<E: Engine + ?Sized>(
    engine: &E,
    cancel: &CancellationToken,
    collection: &Expression,
) -> Result<f64, EngineError> {
    evaluate_number(engine, &collection.clone().first().nominal_scale(), cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{MockEngine, MockImage};
    use std::error::Error;

    // About 110 m x 110 m at the equator
    fn small_square() -> Geometry {
        Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [0.001, 0.0],
            [0.001, 0.001],
            [0.0, 0.001],
            [0.0, 0.0],
        ]])
    }

    fn large_square() -> Geometry {
        Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.0, 0.0],
        ]])
    }

    #[test]
    fn test_small_polygon_gets_finer_scale() {
        let features = vec![
            Feature::new("small", small_square()),
            Feature::new("large", large_square()),
            Feature::new("point", Geometry::Point([0.5, 0.5])),
        ];
        let area = small_square().area();
        let scale = resolve(1000.0, Reducer::Max, ScaleTarget::Features(&features));
        assert!((scale - area.sqrt() / 2.0).abs() < 1e-9);
        assert!(scale < 100.0);
    }

    #[test]
    fn test_collapsed_polygon_does_not_disable_correction() {
        let collapsed = Geometry::Polygon(vec![vec![
            [0.5, 0.5],
            [0.6, 0.5],
            [0.5, 0.5],
        ]]);
        assert_eq!(collapsed.area(), 0.0);
        let features = vec![
            Feature::new("collapsed", collapsed),
            Feature::new("small", small_square()),
        ];
        let alone = vec![Feature::new("small", small_square())];
        let scale = resolve(1000.0, Reducer::Max, ScaleTarget::Features(&features));
        assert_eq!(
            scale,
            resolve(1000.0, Reducer::Max, ScaleTarget::Features(&alone))
        );
        assert!(scale < 100.0);
    }

    #[test]
    fn test_mean_over_features_keeps_baseline() {
        let features = vec![Feature::new("small", small_square())];
        assert_eq!(
            resolve(1000.0, Reducer::Mean, ScaleTarget::Features(&features)),
            1000.0
        );
    }

    #[test]
    fn test_single_geometry() {
        let small = small_square();
        assert!(resolve(1000.0, Reducer::Mean, ScaleTarget::Geometry(&small)) < 1000.0);
        let large = large_square();
        assert_eq!(
            resolve(1000.0, Reducer::Min, ScaleTarget::Geometry(&large)),
            1000.0
        );
        let point = Geometry::Point([0.0, 0.0]);
        assert_eq!(
            resolve(1000.0, Reducer::Mean, ScaleTarget::Geometry(&point)),
            1000.0
        );
    }

    #[tokio::test]
    async fn test_resolve_scale_reads_nominal_scale() -> Result<(), Box<dyn Error>> {
        let engine = MockEngine::default().with_collection(
            "c",
            vec![MockImage::daily("2023-01-01", &[("b", 1.0)]).with_scale(5565.97)],
        );
        let features = vec![Feature::new("large", large_square())];
        let scale = resolve_scale(
            &engine,
            &CancellationToken::new(),
            &Expression::image_collection("c"),
            Reducer::Min,
            ScaleTarget::Features(&features),
        )
        .await?;
        assert_eq!(scale, 5565.97);
        assert_eq!(engine.evaluated(), ["nominalScale"]);
        Ok(())
    }
}
