pub mod interval;
pub mod precision;
