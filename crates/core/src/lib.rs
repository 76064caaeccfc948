#![forbid(unsafe_code)]

pub mod adaptive;
pub mod completion;
pub mod error;
pub mod mastery;
pub mod model;
pub mod pool;
pub mod progression;
pub mod resume;
pub mod time;

pub use error::Error;
pub use time::Clock;
