pub mod pool;
mod repo;

pub use repo::*;
