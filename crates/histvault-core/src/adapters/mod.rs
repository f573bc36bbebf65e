//! History source adapters.

mod fixture;
mod ifeng;

pub use fixture::StaticSource;
pub use ifeng::{market_symbol, parse_akdaily, IfengAdapter, IFENG_STOCK_COLUMNS};
