pub mod cancel;
pub mod facilities;
pub mod geo;
pub mod logging;
pub mod time;
