use crate::engine::expression::Expression;
use crate::engine::Engine;
use crate::error::ClimateDataError;
use crate::pipeline::{malformed, number, properties, source_collection, text, Context};
use crate::reducers::composer::{CompositeReducer, Weighting};
use crate::reducers::reducer::Reducer;
use crate::types::dataset::DatasetDescriptor;
use crate::types::feature::Geometry;
use crate::types::filter::{CalendarField, FilterClause};
use crate::types::period::PeriodSpec;
use crate::types::record::ProjectionRecord;

/// Downscaled CMIP6 models projections are computed for.
pub const CMIP6_MODELS: [&str; 10] = [
    "ACCESS-CM2",
    "ACCESS-ESM1-5",
    "BCC-CSM2-MR",
    "CESM2",
    "CESM2-WACCM",
    "CMCC-CM2-SR5",
    "CMCC-ESM2",
    "CNRM-CM6-1",
    "CNRM-ESM2-1",
    "CanESM5",
];

/// Yearly means of every model in [`CMIP6_MODELS`] under `scenario`, reduced
/// over `geometry`. Records are ordered by model, then year.
pub(crate) async fn climate_projections<E: Engine + ?Sized>(
    ctx: &Context<'_, E>,
    dataset: &DatasetDescriptor,
    period: &PeriodSpec,
    geometry: &Geometry,
    scenario: &str,
) -> Result<Vec<ProjectionRecord>, ClimateDataError> {
    let id = dataset.dataset_id.as_str();
    let bands = dataset.bands();
    let [band] = bands.as_slice() else {
        return Err(ClimateDataError::InvalidDataset {
            dataset_id: id.to_string(),
            reason: "projections need exactly one band".to_string(),
        });
    };

    let collection = source_collection(id, &bands, period)?
        .filter(FilterClause::eq("scenario", scenario));
    ctx.require_images(id, period, &collection).await?;
    let scale = ctx.nominal_scale(id, &collection).await?;

    let yearly_mean = CompositeReducer::single(Reducer::Mean, Weighting::Weighted, &bands);
    let images = CMIP6_MODELS
        .iter()
        .flat_map(|model| period.years().map(move |year| (*model, year)))
        .map(|(model, year)| {
            collection
                .clone()
                .filter(FilterClause::eq("model", model))
                .filter(FilterClause::calendar_range(year, year, CalendarField::Year))
                .reduce(yearly_mean.clone())
                .set("model", model)
                .set("year", year)
        })
        .collect();
    let reduced = Expression::from_images(images).reduce_region(
        geometry,
        yearly_mean.clone(),
        scale,
        true,
        None,
        &["model", "year"],
    );
    let rows = ctx.fetch_all(id, &reduced).await?;

    rows.iter()
        .map(|row| {
            let props = properties(id, row)?;
            Ok(ProjectionRecord {
                year: number(props, "year")
                    .ok_or_else(|| malformed(id, "projection without year"))?
                    as i32,
                model: text(props, "model")
                    .ok_or_else(|| malformed(id, "projection without model"))?,
                value: number(props, band).map(|v| dataset.parse_value(v)),
            })
        })
        .collect()
}
