pub mod assess;
pub mod cache;
pub mod config;
pub mod error;
pub mod expected;
pub mod fetch;
pub mod io;
pub mod paths;
pub mod report;
pub mod rules;
pub mod score;
pub mod text;
pub mod types;
pub mod work_item;

pub use error::{Result, WiqError};
