use serde::{Deserialize, Serialize};

/// One reduced value for a feature and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedRecord {
    pub feature_id: String,
    /// Period label in the requested calendar, e.g. `20230101` or `2023W1`.
    pub period: String,
    /// `None` when the engine returned no value for the region.
    pub value: Option<f64>,
}

/// Named outputs of a composite reducer, in output order.
pub type NamedValues = Vec<(String, Option<f64>)>;

fn first_value(values: &NamedValues) -> Option<f64> {
    values.first().and_then(|(_, v)| *v)
}

fn named_value(values: &NamedValues, name: &str) -> Option<f64> {
    values
        .iter()
        .find(|(n, _)| n == name)
        .and_then(|(_, v)| *v)
}

/// One period of a time series over a single geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub period: String,
    pub values: NamedValues,
}

impl TimeSeriesRecord {
    /// The first output, which is the only one for single-reducer datasets.
    pub fn value(&self) -> Option<f64> {
        first_value(&self.values)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        named_value(&self.values, name)
    }
}

/// The long-term average of one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateNormal {
    /// 1 to 12.
    pub month: u32,
    pub values: NamedValues,
}

impl ClimateNormal {
    pub fn value(&self) -> Option<f64> {
        first_value(&self.values)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        named_value(&self.values, name)
    }
}

/// The yearly mean of one climate model under one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRecord {
    pub year: i32,
    pub model: String,
    pub value: Option<f64>,
}
