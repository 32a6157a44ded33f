use crate::types::dataset::DatasetDescriptor;
use crate::types::feature::Feature;
use crate::types::filter::FilterClause;
use crate::types::period::PeriodSpec;

const DELIMITER: &str = "|";

/// Builds the key callers cache imported values under.
///
/// The key joins the feature id, dataset id, comma-joined band names and the
/// first and last day of the period, followed by one `type(arg,...)` entry
/// per filter clause. It depends on nothing else, so equal inputs always
/// give equal keys.
///
/// # Examples
///
/// ```
/// use climate_data::{build_key, datasets, Feature, Geometry, PeriodSpec};
///
/// let feature = Feature::new("O6uvpzGd5pu", Geometry::Point([-11.8, 8.4]));
/// let dataset = datasets::find("UCSB-CHG/CHIRPS/DAILY").unwrap().dataset;
/// let period = PeriodSpec::for_range("2023-01-01", "2023-01-31").unwrap();
/// assert_eq!(
///     build_key(&feature, &dataset, &period, None),
///     "O6uvpzGd5pu|UCSB-CHG/CHIRPS/DAILY|precipitation|2023-01-01|2023-01-31"
/// );
/// ```
pub fn build_key(
    feature: &Feature,
    dataset: &DatasetDescriptor,
    period: &PeriodSpec,
    filter: Option<&[FilterClause]>,
) -> String {
    let mut segments = vec![
        feature.id.clone(),
        dataset.dataset_id.clone(),
        dataset.bands().join(","),
        period.start.to_string(),
        period.end.to_string(),
    ];
    segments.extend(
        filter
            .unwrap_or_default()
            .iter()
            .map(|clause| format!("{}({})", clause.type_name(), clause.arguments().join(","))),
    );
    segments.join(DELIMITER)
}
