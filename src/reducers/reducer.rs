//! The fixed registry of reducers the engine understands.

use crate::reducers::error::ReducerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A server-side reducer, aggregating many pixel or image values into one.
///
/// # Examples
///
/// ```
/// use climate_data::Reducer;
///
/// assert_eq!("stdDev".parse::<Reducer>().unwrap(), Reducer::StdDev);
/// assert_eq!(Reducer::Max.to_string(), "max");
/// assert!("average".parse::<Reducer>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reducer {
    Mean,
    Min,
    Max,
    Sum,
    Median,
    Mode,
    Count,
    StdDev,
    Variance,
    First,
    Last,
}

impl Reducer {
    pub const ALL: [Reducer; 11] = [
        Reducer::Mean,
        Reducer::Min,
        Reducer::Max,
        Reducer::Sum,
        Reducer::Median,
        Reducer::Mode,
        Reducer::Count,
        Reducer::StdDev,
        Reducer::Variance,
        Reducer::First,
        Reducer::Last,
    ];

    /// The name the engine knows the reducer by.
    pub fn name(&self) -> &'static str {
        match self {
            Reducer::Mean => "mean",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Sum => "sum",
            Reducer::Median => "median",
            Reducer::Mode => "mode",
            Reducer::Count => "count",
            Reducer::StdDev => "stdDev",
            Reducer::Variance => "variance",
            Reducer::First => "first",
            Reducer::Last => "last",
        }
    }

    /// Order-statistic reducers return nothing for a region when no pixel
    /// centre falls inside it.
    pub fn is_order_statistic(&self) -> bool {
        matches!(self, Reducer::Min | Reducer::Max)
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Reducer {
    type Err = ReducerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reducer::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| ReducerError::UnknownReducer(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_round_trips_names() {
        for reducer in Reducer::ALL {
            assert_eq!(reducer.name().parse::<Reducer>().unwrap(), reducer);
            assert_eq!(
                serde_json::to_value(reducer).unwrap(),
                serde_json::Value::String(reducer.name().to_string())
            );
        }
    }

    #[test]
    fn test_order_statistics() {
        assert!(Reducer::Min.is_order_statistic());
        assert!(Reducer::Max.is_order_statistic());
        assert!(!Reducer::Mean.is_order_statistic());
    }
}
