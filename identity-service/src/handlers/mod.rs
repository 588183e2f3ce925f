pub mod apps;
pub mod health;

pub use health::health_check;
