pub mod chart_service;
pub mod market_service;
