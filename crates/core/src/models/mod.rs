pub mod asset;
pub mod chart;
pub mod load_state;
pub mod price;
pub mod settings;
