use crate::engine::expression::Expression;
use crate::engine::Engine;
use crate::error::ClimateDataError;
use crate::pipeline::{malformed, number, properties, Context};
use crate::reducers::composer::{compose, CompositeReducer, Weighting};
use crate::reducers::reducer::Reducer;
use crate::scale::ScaleTarget;
use crate::types::dataset::DatasetDescriptor;
use crate::types::feature::Geometry;
use crate::types::filter::{CalendarField, FilterClause};
use crate::types::period::PeriodSpec;
use crate::types::record::{ClimateNormal, NamedValues};
use std::collections::BTreeMap;

/// Scale in metres points are sampled at.
const POINT_SCALE: f64 = 1.0;

/// Averages every calendar month over the years of `period` and reduces the
/// twelve monthly means over `geometry`. Always returns twelve normals in
/// month order; months without images have no values.
pub(crate) async fn climate_normals<E: Engine + ?Sized>(
    ctx: &Context<'_, E>,
    dataset: &DatasetDescriptor,
    period: &PeriodSpec,
    geometry: &Geometry,
) -> Result<Vec<ClimateNormal>, ClimateDataError> {
    period.validate()?;
    let id = dataset.dataset_id.as_str();
    let bands = dataset.bands();
    let spatial = compose(&dataset.reducer, &bands, Weighting::Weighted)?;
    let years = period.years();

    let collection = Expression::image_collection(id)
        .select(&bands)
        .filter(FilterClause::calendar_range(
            *years.start(),
            *years.end(),
            CalendarField::Year,
        ));
    ctx.require_images(id, period, &collection).await?;
    let scale = if geometry.is_polygonal() {
        ctx.scale(
            id,
            &collection,
            dataset.reducer.primary()?,
            ScaleTarget::Geometry(geometry),
        )
        .await?
    } else {
        POINT_SCALE
    };

    let monthly_mean = CompositeReducer::single(Reducer::Mean, Weighting::Weighted, &bands);
    let months = Expression::from_images(
        (1..=12)
            .map(|month| {
                collection
                    .clone()
                    .filter(FilterClause::calendar_range(month, month, CalendarField::Month))
                    .reduce(monthly_mean.clone())
                    .set("month", month)
            })
            .collect(),
    );
    let reduced = months.reduce_region(geometry, spatial.clone(), scale, true, None, &["month"]);
    let rows = ctx.fetch_all(id, &reduced).await?;

    let mut by_month: BTreeMap<u32, NamedValues> = BTreeMap::new();
    for row in &rows {
        let props = properties(id, row)?;
        let month = number(props, "month")
            .filter(|m| (1.0..=12.0).contains(m))
            .ok_or_else(|| malformed(id, "normal without a valid month"))? as u32;
        let values = spatial
            .outputs
            .iter()
            .map(|output| (output.clone(), number(props, output).map(|v| dataset.parse_value(v))))
            .collect();
        by_month.insert(month, values);
    }

    Ok((1..=12)
        .map(|month| ClimateNormal {
            month,
            values: by_month.remove(&month).unwrap_or_else(|| {
                spatial.outputs.iter().map(|o| (o.clone(), None)).collect()
            }),
        })
        .collect())
}
