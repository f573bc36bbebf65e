//! Domain types shared by the maintainer and the upstream sources.

mod date_range;
mod series_id;

pub use date_range::DateRange;
pub use series_id::SeriesId;
