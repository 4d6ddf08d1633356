pub mod executor;

pub use executor::SqlxExecutor;
