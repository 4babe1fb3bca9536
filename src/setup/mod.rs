pub mod bootstrap;
pub mod wizard;

pub use bootstrap::ensure_weather_tool;
pub use wizard::run_setup_wizard;
