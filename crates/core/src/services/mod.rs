pub mod analytics_service;
pub mod chart_service;
pub mod insight_service;
pub mod ledger_service;
pub mod market_service;
pub mod order_book_service;
