pub mod bootstrap;
pub mod engine;
pub mod executor;
pub mod ledger;
