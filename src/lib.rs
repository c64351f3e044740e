#[macro_export]
macro_rules! profile {
  ($name:expr) => {{
    let _span = tracing::span!(tracing::Level::DEBUG, $name);
    let _enter = _span.enter();
  }};
}

pub mod classify;
pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod provider;
pub mod report;
pub mod reviewer;
