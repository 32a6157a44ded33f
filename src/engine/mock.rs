//! An in-memory engine for tests. Images are spatially uniform, so a spatial
//! reduction of one band yields the band value itself.

use crate::engine::error::EngineError;
use crate::engine::expression::{Expression, PeriodStamp};
use crate::engine::Engine;
use crate::reducers::composer::CompositeReducer;
use crate::reducers::reducer::Reducer;
use crate::types::filter::{CalendarField, FilterClause, FilterValue};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use ordered_float::OrderedFloat;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const DEFAULT_SCALE: f64 = 11_132.0;

#[derive(Debug, Clone)]
pub(crate) struct MockImage {
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub bands: Vec<(String, f64)>,
    pub properties: Map<String, Value>,
    pub scale: f64,
}

impl MockImage {
    pub fn new(time_start: DateTime<Utc>, duration: Duration, bands: &[(&str, f64)]) -> Self {
        Self {
            time_start,
            time_end: time_start + duration,
            bands: bands.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
            properties: Map::new(),
            scale: DEFAULT_SCALE,
        }
    }

    pub fn daily(date: &str, bands: &[(&str, f64)]) -> Self {
        let start = date
            .parse::<NaiveDate>()
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        Self::new(start, Duration::days(1), bands)
    }

    pub fn hourly(start: DateTime<Utc>, bands: &[(&str, f64)]) -> Self {
        Self::new(start, Duration::hours(1), bands)
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    fn band(&self, name: &str) -> Option<f64> {
        self.bands.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    fn to_json(&self) -> Value {
        let mut properties = self.properties.clone();
        properties.insert(
            "system:time_start".to_string(),
            json!(self.time_start.timestamp_millis()),
        );
        let bands: Vec<&str> = self.bands.iter().map(|(n, _)| n.as_str()).collect();
        json!({"type": "Image", "bands": bands, "properties": properties})
    }
}

enum Node {
    Images(Vec<MockImage>),
    Image(MockImage),
    Rows(Vec<Value>),
    Number(f64),
}

#[derive(Default)]
pub(crate) struct MockEngine {
    collections: HashMap<String, Vec<MockImage>>,
    tables: HashMap<String, Vec<Value>>,
    delays: HashMap<usize, std::time::Duration>,
    failing_offset: Option<usize>,
    to_list_calls: AtomicUsize,
    evaluated: Mutex<Vec<&'static str>>,
}

impl MockEngine {
    pub fn with_collection(mut self, id: &str, images: Vec<MockImage>) -> Self {
        self.collections.insert(id.to_string(), images);
        self
    }

    /// A collection of precomputed elements, returned as is.
    pub fn with_table(mut self, id: &str, rows: Vec<Value>) -> Self {
        self.tables.insert(id.to_string(), rows);
        self
    }

    /// Delays the list page starting at `offset`.
    pub fn with_delay(mut self, offset: usize, delay: std::time::Duration) -> Self {
        self.delays.insert(offset, delay);
        self
    }

    pub fn failing_at_offset(mut self, offset: usize) -> Self {
        self.failing_offset = Some(offset);
        self
    }

    pub fn to_list_calls(&self) -> usize {
        self.to_list_calls.load(Ordering::SeqCst)
    }

    /// Outermost operation of every evaluation, in call order.
    pub fn evaluated(&self) -> Vec<&'static str> {
        self.evaluated.lock().unwrap().clone()
    }

    fn eval(&self, expression: &Expression) -> Result<Node, EngineError> {
        Ok(match expression {
            Expression::ImageCollection { id } => match self.tables.get(id) {
                Some(rows) => Node::Rows(rows.clone()),
                None => Node::Images(self.collections.get(id).cloned().ok_or_else(|| {
                    EngineError::Evaluation(format!(
                        "ImageCollection.load: Image collection asset '{}' not found.",
                        id
                    ))
                })?),
            },
            Expression::Select { input, bands } => Node::Images(
                self.images(input)?
                    .into_iter()
                    .map(|mut image| {
                        image.bands.retain(|(name, _)| bands.contains(name));
                        image
                    })
                    .collect(),
            ),
            Expression::FilterDate { input, start, end } => Node::Images(
                self.images(input)?
                    .into_iter()
                    .filter(|i| i.time_start >= *start && i.time_start < *end)
                    .collect(),
            ),
            Expression::Filter { input, filter } => Node::Images(
                self.images(input)?
                    .into_iter()
                    .filter(|i| matches_filter(i, filter))
                    .collect(),
            ),
            Expression::First { input } => {
                Node::Image(self.images(input)?.into_iter().next().ok_or_else(|| {
                    EngineError::Evaluation("Image.first: collection is empty".to_string())
                })?)
            }
            Expression::NominalScale { input } => Node::Number(self.image(input)?.scale),
            Expression::Size { input } => Node::Number(match self.eval(input)? {
                Node::Images(images) => images.len() as f64,
                Node::Rows(rows) => rows.len() as f64,
                _ => return Err(not_a_collection(input)),
            }),
            Expression::Reduce { input, reducer } => {
                Node::Image(reduce_images(&self.images(input)?, reducer))
            }
            Expression::Set { input, properties } => {
                let mut image = self.image(input)?;
                for (key, value) in properties {
                    let millis = value.as_i64().and_then(DateTime::from_timestamp_millis);
                    match (key.as_str(), millis) {
                        ("system:time_start", Some(at)) => image.time_start = at,
                        ("system:time_end", Some(at)) => image.time_end = at,
                        _ => {}
                    }
                    image.properties.insert(key.clone(), value.clone());
                }
                Node::Image(image)
            }
            Expression::FromImages { images } => Node::Images(
                images
                    .iter()
                    .map(|e| self.image(e))
                    .collect::<Result<_, _>>()?,
            ),
            Expression::Composite {
                input,
                windows,
                reducer,
            } => {
                let images = self.images(input)?;
                Node::Images(
                    windows
                        .iter()
                        .filter_map(|window| {
                            let inside: Vec<MockImage> = images
                                .iter()
                                .filter(|i| i.time_start >= window.start && i.time_start < window.end)
                                .cloned()
                                .collect();
                            if inside.is_empty() {
                                return None;
                            }
                            let mut image = reduce_images(&inside, reducer);
                            image.time_start = window.start;
                            image.time_end = window.end;
                            image
                                .properties
                                .insert("system:index".to_string(), json!(window.index));
                            Some(image)
                        })
                        .collect(),
                )
            }
            Expression::ReduceRegions {
                input,
                features,
                reducer,
                period,
                ..
            } => {
                let mut rows = Vec::new();
                for image in self.images(input)? {
                    let value = image
                        .bands
                        .first()
                        .and_then(|(_, v)| aggregate(*reducer, &[*v]));
                    let stamp = stamp(&image, period)?;
                    for feature in features {
                        rows.push(json!({
                            "type": "Feature",
                            "geometry": null,
                            "properties": {"ou": feature.id, "period": stamp, "value": value},
                        }));
                    }
                }
                Node::Rows(rows)
            }
            Expression::ReduceRegion {
                input,
                reducer,
                period,
                properties,
                ..
            } => {
                let mut rows = Vec::new();
                for image in self.images(input)? {
                    let mut props = Map::new();
                    for assignment in reducer.assignments() {
                        let value = match &assignment.band {
                            Some(band) => image.band(band),
                            None => image.bands.first().map(|(_, v)| *v),
                        };
                        let value = value.and_then(|v| aggregate(assignment.reducer, &[v]));
                        props.insert(assignment.output, json!(value));
                    }
                    if let Some(period) = period {
                        props.insert("period".to_string(), json!(stamp(&image, period)?));
                    }
                    for key in properties {
                        if let Some(value) = image.properties.get(key) {
                            props.insert(key.clone(), value.clone());
                        }
                    }
                    rows.push(json!({"type": "Feature", "geometry": null, "properties": props}));
                }
                Node::Rows(rows)
            }
            Expression::ToList {
                input,
                count,
                offset,
            } => {
                let elements = match self.eval(input)? {
                    Node::Rows(rows) => rows,
                    Node::Images(images) => images.iter().map(MockImage::to_json).collect(),
                    _ => return Err(not_a_collection(input)),
                };
                Node::Rows(elements.into_iter().skip(*offset).take(*count).collect())
            }
        })
    }

    fn images(&self, expression: &Expression) -> Result<Vec<MockImage>, EngineError> {
        match self.eval(expression)? {
            Node::Images(images) => Ok(images),
            _ => Err(not_a_collection(expression)),
        }
    }

    fn image(&self, expression: &Expression) -> Result<MockImage, EngineError> {
        match self.eval(expression)? {
            Node::Image(image) => Ok(image),
            _ => Err(EngineError::Evaluation(format!(
                "{}: expected an image",
                expression.op_name()
            ))),
        }
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn evaluate(&self, expression: &Expression) -> Result<Value, EngineError> {
        self.evaluated.lock().unwrap().push(expression.op_name());
        if let Expression::ToList { offset, .. } = expression {
            self.to_list_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(offset) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing_offset == Some(*offset) {
                return Err(EngineError::Evaluation(
                    "User memory limit exceeded.".to_string(),
                ));
            }
        }
        Ok(match self.eval(expression)? {
            Node::Number(n) => json!(n),
            Node::Rows(rows) => Value::Array(rows),
            Node::Images(images) => Value::Array(images.iter().map(MockImage::to_json).collect()),
            Node::Image(image) => image.to_json(),
        })
    }
}

fn not_a_collection(expression: &Expression) -> EngineError {
    EngineError::Evaluation(format!("{}: expected a collection", expression.op_name()))
}

fn stamp(image: &MockImage, period: &PeriodStamp) -> Result<String, EngineError> {
    let tz: Tz = period
        .time_zone
        .parse()
        .map_err(|_| EngineError::Evaluation(format!("Unknown time zone '{}'", period.time_zone)))?;
    Ok(image
        .time_start
        .with_timezone(&tz)
        .format(&period.format)
        .to_string())
}

fn reduce_images(images: &[MockImage], reducer: &CompositeReducer) -> MockImage {
    let template = images.first();
    let mut reduced = MockImage {
        time_start: template.map_or(DateTime::UNIX_EPOCH, |i| i.time_start),
        time_end: template.map_or(DateTime::UNIX_EPOCH, |i| i.time_end),
        bands: Vec::new(),
        properties: Map::new(),
        scale: template.map_or(DEFAULT_SCALE, |i| i.scale),
    };
    let Some(template) = template else {
        return reduced;
    };
    let values = |band: &str| -> Vec<f64> { images.iter().filter_map(|i| i.band(band)).collect() };
    for assignment in reducer.assignments() {
        match &assignment.band {
            Some(band) => {
                if let Some(v) = aggregate(assignment.reducer, &values(band)) {
                    reduced.bands.push((assignment.output, v));
                }
            }
            None => {
                for (band, _) in &template.bands {
                    if let Some(v) = aggregate(assignment.reducer, &values(band)) {
                        let name = match reducer.as_single() {
                            Some(_) => band.clone(),
                            None => format!("{}_{}", band, assignment.output),
                        };
                        reduced.bands.push((name, v));
                    }
                }
            }
        }
    }
    reduced
}

pub(crate) fn aggregate(reducer: Reducer, values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return (reducer == Reducer::Count).then_some(0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let mut sorted: Vec<OrderedFloat<f64>> = values.iter().copied().map(OrderedFloat).collect();
    sorted.sort();
    Some(match reducer {
        Reducer::Mean => mean,
        Reducer::Min => sorted[0].0,
        Reducer::Max => sorted[sorted.len() - 1].0,
        Reducer::Sum => values.iter().sum(),
        Reducer::Median => {
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                (sorted[mid - 1].0 + sorted[mid].0) / 2.0
            } else {
                sorted[mid].0
            }
        }
        Reducer::Mode => {
            let mut counts: BTreeMap<OrderedFloat<f64>, usize> = BTreeMap::new();
            for v in &sorted {
                *counts.entry(*v).or_default() += 1;
            }
            let top = counts.values().copied().max().unwrap_or(0);
            counts
                .into_iter()
                .find(|(_, count)| *count == top)
                .map_or(mean, |(v, _)| v.0)
        }
        Reducer::Count => n,
        Reducer::StdDev => variance.sqrt(),
        Reducer::Variance => variance,
        Reducer::First => values[0],
        Reducer::Last => values[values.len() - 1],
    })
}

fn value_equals(value: &FilterValue, candidate: &Value) -> bool {
    match value {
        FilterValue::Number(n) => candidate.as_f64() == Some(*n),
        FilterValue::Text(s) => candidate.as_str() == Some(s.as_str()),
    }
}

fn matches_filter(image: &MockImage, filter: &FilterClause) -> bool {
    match filter {
        FilterClause::Date { start, end } => {
            let date = image.time_start.date_naive();
            date >= *start && date < *end
        }
        FilterClause::CalendarRange { start, end, field } => {
            let value = match field {
                CalendarField::Year => image.time_start.year(),
                CalendarField::Month => image.time_start.month() as i32,
                CalendarField::DayOfYear => image.time_start.ordinal() as i32,
            };
            if start <= end {
                (*start..=*end).contains(&value)
            } else {
                value >= *start || value <= *end
            }
        }
        FilterClause::Eq { property, value } => image
            .properties
            .get(property)
            .is_some_and(|candidate| value_equals(value, candidate)),
        FilterClause::ListContains { property, value } => image
            .properties
            .get(property)
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(|c| value_equals(value, c))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate() {
        let values = [4.0, 1.0, 3.0, 3.0];
        assert_eq!(aggregate(Reducer::Mean, &values), Some(2.75));
        assert_eq!(aggregate(Reducer::Median, &values), Some(3.0));
        assert_eq!(aggregate(Reducer::Mode, &values), Some(3.0));
        assert_eq!(aggregate(Reducer::Min, &values), Some(1.0));
        assert_eq!(aggregate(Reducer::Last, &values), Some(3.0));
        assert_eq!(aggregate(Reducer::Mean, &[]), None);
        assert_eq!(aggregate(Reducer::Count, &[]), Some(0.0));
    }
}
