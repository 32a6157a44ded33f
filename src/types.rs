pub mod dataset;
pub mod feature;
pub mod filter;
pub mod period;
pub mod period_type;
pub mod record;
pub mod traits;
