pub mod analytics;
pub mod chart;
pub mod exchange;
pub mod holding;
pub mod insight;
pub mod market;
pub mod order_book;
pub mod portfolio;
pub mod settings;
pub mod transaction;
