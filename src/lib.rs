pub mod constants;
pub mod engine;
pub mod logging;
pub mod quiz;
pub mod render;
pub mod rng;
pub mod save_store;
pub mod types;
pub mod world;
