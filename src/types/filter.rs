//! Ad-hoc collection filters a caller can add to a time series request.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date part a [`FilterClause::CalendarRange`] compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalendarField {
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "day_of_year")]
    DayOfYear,
}

impl CalendarField {
    pub fn name(&self) -> &'static str {
        match self {
            CalendarField::Year => "year",
            CalendarField::Month => "month",
            CalendarField::DayOfYear => "day_of_year",
        }
    }
}

/// A property value compared by equality filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Number(n) => write!(f, "{}", n),
            FilterValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

/// A predicate on the images of a collection, evaluated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterClause {
    /// Images starting in `[start, end)`.
    Date { start: NaiveDate, end: NaiveDate },
    /// Images whose `field` lies in `start..=end`.
    CalendarRange {
        start: i32,
        end: i32,
        field: CalendarField,
    },
    /// Images whose property equals `value`.
    Eq { property: String, value: FilterValue },
    /// Images whose list property contains `value`.
    ListContains { property: String, value: FilterValue },
}

impl FilterClause {
    pub fn eq(property: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        FilterClause::Eq {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn calendar_range(start: i32, end: i32, field: CalendarField) -> Self {
        FilterClause::CalendarRange { start, end, field }
    }

    /// The filter type, as used in cache keys.
    pub fn type_name(&self) -> &'static str {
        match self {
            FilterClause::Date { .. } => "date",
            FilterClause::CalendarRange { .. } => "calendarRange",
            FilterClause::Eq { .. } => "eq",
            FilterClause::ListContains { .. } => "listContains",
        }
    }

    /// The ordered argument list, as used in cache keys.
    pub fn arguments(&self) -> Vec<String> {
        match self {
            FilterClause::Date { start, end } => vec![start.to_string(), end.to_string()],
            FilterClause::CalendarRange { start, end, field } => {
                vec![start.to_string(), end.to_string(), field.name().to_string()]
            }
            FilterClause::Eq { property, value } | FilterClause::ListContains { property, value } => {
                vec![property.clone(), value.to_string()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_are_ordered() {
        let clause = FilterClause::calendar_range(6, 8, CalendarField::Month);
        assert_eq!(clause.type_name(), "calendarRange");
        assert_eq!(clause.arguments(), ["6", "8", "month"]);
        let eq = FilterClause::eq("scenario", "ssp245");
        assert_eq!(eq.arguments(), ["scenario", "ssp245"]);
    }

    #[test]
    fn test_clause_json_shape() -> Result<(), serde_json::Error> {
        let clause: FilterClause = serde_json::from_str(
            r#"{"type":"calendarRange","start":1991,"end":2020,"field":"year"}"#,
        )?;
        assert_eq!(
            clause,
            FilterClause::calendar_range(1991, 2020, CalendarField::Year)
        );
        let eq: FilterClause =
            serde_json::from_str(r#"{"type":"eq","property":"model","value":"CESM2"}"#)?;
        assert_eq!(eq, FilterClause::eq("model", "CESM2"));
        Ok(())
    }
}
