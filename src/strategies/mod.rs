pub mod signals;
pub mod swing;
pub mod traits;
