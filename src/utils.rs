//! Unit conversions applied to raw band values.

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - 273.15
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Kelvin to degrees Celsius with one decimal.
pub fn temperature(kelvin: f64) -> f64 {
    round_one_decimal(kelvin_to_celsius(kelvin))
}

/// Metres of water to millimetres.
pub fn precipitation(metres: f64) -> f64 {
    metres * 1000.0
}

/// Relative humidity in percent from air and dewpoint temperature in °C,
/// using the Magnus approximation.
pub fn relative_humidity(temperature: f64, dewpoint: f64) -> f64 {
    const B: f64 = 17.625;
    const C: f64 = 243.04;
    100.0 * ((B * dewpoint) / (C + dewpoint)).exp() / ((B * temperature) / (C + temperature)).exp()
}

/// Joins `[dewpoint, temperature]`, both in kelvin, into relative humidity
/// with one decimal. Any other band count yields `NaN`.
pub fn relative_humidity_from_bands(values: &[f64]) -> f64 {
    match values {
        [dewpoint, temperature] => round_one_decimal(relative_humidity(
            kelvin_to_celsius(*temperature),
            kelvin_to_celsius(*dewpoint),
        )),
        _ => f64::NAN,
    }
}
