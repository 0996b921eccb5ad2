pub mod binance;
pub mod discord;
pub mod messages;
pub mod notify;
pub mod traits;
