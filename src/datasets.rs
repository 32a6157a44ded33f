//! Built-in dataset catalogue and presets.

use crate::reducers::composer::ReducerSpec;
use crate::reducers::reducer::Reducer;
use crate::types::dataset::{DatasetDescriptor, TimeZoneDataset};
use crate::types::period_type::PeriodType;
use crate::utils;

const ERA5_LAND_DAILY: &str = "ECMWF/ERA5_LAND/DAILY_AGGR";
const ERA5_LAND_HOURLY: &str = "ECMWF/ERA5_LAND/HOURLY";
const ERA5_LAND_MONTHLY: &str = "ECMWF/ERA5_LAND/MONTHLY_AGGR";
const ERA5_HEAT: &str = "projects/climate-engine-pro/assets/ce-era5-heat";
const CHIRPS_DAILY: &str = "UCSB-CHG/CHIRPS/DAILY";
const CMIP6: &str = "NASA/GDDP-CMIP6";

pub const ERA5_RESOLUTION: &str = "Approximately 31 km (0.25°)";
pub const ERA5_LAND_RESOLUTION: &str = "Approximately 9 km (0.1°)";
pub const CHIRPS_RESOLUTION: &str = "Approximately 5 km (0.05°)";

const ERA5_LAND_BANDS: [&str; 5] = [
    "temperature_2m",
    "temperature_2m_min",
    "temperature_2m_max",
    "dewpoint_temperature_2m",
    "total_precipitation_sum",
];

/// A dataset offered for import, with its display metadata.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Unique id, usually `{dataset_id}/{band}`.
    pub id: &'static str,
    pub name: &'static str,
    pub short_name: &'static str,
    pub description: &'static str,
    pub resolution: &'static str,
    /// How values of the data element aggregate, e.g. `Average` or `Sum`.
    pub aggregation_type: &'static str,
    pub data_element_code: &'static str,
    pub dataset: DatasetDescriptor,
}

fn era5_land_hourly(band: Option<&str>, period_reducer: Reducer) -> TimeZoneDataset {
    TimeZoneDataset::builder()
        .dataset_id(ERA5_LAND_HOURLY)
        .maybe_band(band)
        .period_reducer(period_reducer)
        .build()
}

fn era5_land(
    band: &str,
    reducer: Reducer,
    hourly_band: &str,
    hourly_reducer: Reducer,
) -> DatasetDescriptor {
    DatasetDescriptor::builder()
        .dataset_id(ERA5_LAND_DAILY)
        .band(band)
        .reducer(ReducerSpec::single(reducer))
        .time_zone(era5_land_hourly(Some(hourly_band), hourly_reducer))
        .build()
}

fn era5_heat(band: &str, reducer: Reducer) -> DatasetDescriptor {
    DatasetDescriptor::builder()
        .dataset_id(ERA5_HEAT)
        .band(band)
        .reducer(ReducerSpec::single(reducer))
        .value_parser(utils::temperature)
        .build()
}

/// Every dataset the import flow offers.
pub fn catalogue() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            id: "ECMWF/ERA5_LAND/DAILY_AGGR/temperature_2m",
            name: "Air temperature (ERA5-Land)",
            short_name: "Air temperature",
            description: "Average air temperature in °C at 2 m above the surface",
            resolution: ERA5_LAND_RESOLUTION,
            aggregation_type: "Average",
            data_element_code: "ERA5_LAND_TEMPERATURE",
            dataset: DatasetDescriptor {
                value_parser: Some(utils::temperature),
                ..era5_land("temperature_2m", Reducer::Mean, "temperature_2m", Reducer::Mean)
            },
        },
        CatalogEntry {
            id: "ECMWF/ERA5_LAND/DAILY_AGGR/temperature_2m_max",
            name: "Max air temperature (ERA5-Land)",
            short_name: "Max air temperature",
            description: "Maximum air temperature in °C at 2 m above the surface",
            resolution: ERA5_LAND_RESOLUTION,
            aggregation_type: "Max",
            data_element_code: "ERA5_LAND_TEMPERATURE_MAX",
            dataset: DatasetDescriptor {
                value_parser: Some(utils::temperature),
                ..era5_land("temperature_2m_max", Reducer::Max, "temperature_2m", Reducer::Max)
            },
        },
        CatalogEntry {
            id: "ECMWF/ERA5_LAND/DAILY_AGGR/temperature_2m_min",
            name: "Min temperature (ERA5-Land)",
            short_name: "Min air temperature",
            description: "Minimum air temperature in °C at 2 m above the surface",
            resolution: ERA5_LAND_RESOLUTION,
            aggregation_type: "Min",
            data_element_code: "ERA5_LAND_TEMPERATURE_MIN",
            dataset: DatasetDescriptor {
                value_parser: Some(utils::temperature),
                ..era5_land("temperature_2m_min", Reducer::Min, "temperature_2m", Reducer::Min)
            },
        },
        CatalogEntry {
            id: "ECMWF/ERA5_LAND/DAILY_AGGR/total_precipitation_sum",
            name: "Precipitation (ERA5-Land)",
            short_name: "Precipitation (ERA5)",
            description: "Total precipitation in mm",
            resolution: ERA5_LAND_RESOLUTION,
            aggregation_type: "Sum",
            data_element_code: "ERA5_LAND_PRECIPITATION",
            dataset: DatasetDescriptor {
                value_parser: Some(utils::precipitation),
                ..era5_land(
                    "total_precipitation_sum",
                    Reducer::Mean,
                    "total_precipitation",
                    Reducer::Sum,
                )
            },
        },
        CatalogEntry {
            id: "UCSB-CHG/CHIRPS/DAILY",
            name: "Precipitation (CHIRPS)",
            short_name: "Precipitation (CHIRPS)",
            description: "Precipitation in mm",
            resolution: CHIRPS_RESOLUTION,
            aggregation_type: "Sum",
            data_element_code: "CHIRPS_PRECIPITATION",
            dataset: DatasetDescriptor::builder()
                .dataset_id(CHIRPS_DAILY)
                .band("precipitation")
                .period_reducer(Reducer::Sum)
                .build(),
        },
        CatalogEntry {
            id: "ECMWF/ERA5_LAND/DAILY_AGGR/dewpoint_temperature_2m",
            name: "Dewpoint temperature (ERA5-Land)",
            short_name: "Dewpoint temperature",
            description: "Temperature in °C at 2 m above the surface to which the air would have to be cooled for saturation to occur.",
            resolution: ERA5_LAND_RESOLUTION,
            aggregation_type: "Average",
            data_element_code: "ERA5_LAND_DEWPOINT_TEMPERATURE",
            dataset: DatasetDescriptor {
                value_parser: Some(utils::temperature),
                ..era5_land(
                    "dewpoint_temperature_2m",
                    Reducer::Mean,
                    "dewpoint_temperature_2m",
                    Reducer::Mean,
                )
            },
        },
        CatalogEntry {
            id: "ECMWF/ERA5_LAND/DAILY_AGGR/relative_humidity_2m",
            name: "Relative humidity (ERA5-Land)",
            short_name: "Relative humidity",
            description: "Percentage of water vapor in the air compared to the total amount of vapor that can exist in the air at its current temperature. Calculated using air temperature and dewpoint temperature at 2 m above surface.",
            resolution: ERA5_LAND_RESOLUTION,
            aggregation_type: "Average",
            data_element_code: "ERA5_LAND_RELATIVE_HUMIDITY",
            dataset: relative_humidity(),
        },
        CatalogEntry {
            id: "projects/climate-engine-pro/assets/ce-era5-heat/utci_mean",
            name: "Heat stress (ERA5-HEAT)",
            short_name: "Heat stress",
            description: "Average felt temperature in °C",
            resolution: ERA5_RESOLUTION,
            aggregation_type: "Average",
            data_element_code: "ERA5_HEAT_UTCI",
            dataset: era5_heat("utci_mean", Reducer::Mean),
        },
        CatalogEntry {
            id: "projects/climate-engine-pro/assets/ce-era5-heat/utci_max",
            name: "Max heat stress (ERA5-HEAT)",
            short_name: "Max heat stress",
            description: "Maximum felt temperature in °C",
            resolution: ERA5_RESOLUTION,
            aggregation_type: "Max",
            data_element_code: "ERA5_HEAT_UTCI_MAX",
            dataset: era5_heat("utci_max", Reducer::Max),
        },
        CatalogEntry {
            id: "projects/climate-engine-pro/assets/ce-era5-heat/utci_min",
            name: "Min heat stress (ERA5-HEAT)",
            short_name: "Min heat stress",
            description: "Minimum felt temperature in °C",
            resolution: ERA5_RESOLUTION,
            aggregation_type: "Min",
            data_element_code: "ERA5_HEAT_UTCI_MIN",
            dataset: era5_heat("utci_min", Reducer::Min),
        },
    ]
}

/// Looks up a catalogue entry by id.
pub fn find(id: &str) -> Option<CatalogEntry> {
    catalogue().into_iter().find(|entry| entry.id == id)
}

/// Relative humidity joined from dewpoint and air temperature, in that order.
pub fn relative_humidity() -> DatasetDescriptor {
    DatasetDescriptor::builder()
        .dataset_id(ERA5_LAND_DAILY)
        .band(["dewpoint_temperature_2m", "temperature_2m"])
        .bands_parser(utils::relative_humidity_from_bands)
        .time_zone(era5_land_hourly(None, Reducer::Mean))
        .build()
}

/// All ERA5-Land daily bands, reduced with mean.
pub fn era5_daily() -> DatasetDescriptor {
    DatasetDescriptor::builder()
        .dataset_id(ERA5_LAND_DAILY)
        .band(ERA5_LAND_BANDS)
        .build()
}

pub fn era5_monthly() -> DatasetDescriptor {
    DatasetDescriptor::builder()
        .dataset_id(ERA5_LAND_MONTHLY)
        .band(ERA5_LAND_BANDS)
        .period_type(PeriodType::Monthly)
        .build()
}

pub fn era5_monthly_normals() -> DatasetDescriptor {
    DatasetDescriptor::builder()
        .dataset_id(ERA5_LAND_MONTHLY)
        .band([
            "temperature_2m",
            "dewpoint_temperature_2m",
            "total_precipitation_sum",
        ])
        .period_type(PeriodType::Monthly)
        .build()
}

pub fn era5_monthly_temperatures() -> DatasetDescriptor {
    DatasetDescriptor::builder()
        .dataset_id(ERA5_LAND_MONTHLY)
        .band(["temperature_2m"])
        .period_type(PeriodType::Monthly)
        .build()
}

/// UTCI mean, min and max, each band with its own reducer.
pub fn era5_heat_daily() -> DatasetDescriptor {
    DatasetDescriptor::builder()
        .dataset_id(ERA5_HEAT)
        .band(["utci_mean", "utci_min", "utci_max"])
        .reducer(ReducerSpec::combined(
            &[Reducer::Mean, Reducer::Min, Reducer::Max],
            false,
        ))
        .build()
}

/// [`era5_heat_daily`] rolled up into months.
pub fn era5_heat_monthly() -> DatasetDescriptor {
    DatasetDescriptor {
        aggregation_period: Some(PeriodType::Monthly),
        ..era5_heat_daily()
    }
}

/// Daily near-surface air temperature of the NEX-GDDP-CMIP6 downscaled models.
pub fn cmip6_temperature() -> DatasetDescriptor {
    DatasetDescriptor::builder()
        .dataset_id(CMIP6)
        .band("tas")
        .value_parser(utils::temperature)
        .build()
}
