pub mod data;

pub use data::{demo_catalog, load_seed_data};
