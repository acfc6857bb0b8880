//! swagcheck-runner: loads descriptions and runs synthesized scenarios over HTTP

pub mod dispatch;
pub mod loader;
pub mod runner;

pub use dispatch::{DispatchError, Dispatcher, HttpDispatcher};
pub use loader::load_description;
pub use runner::{RunnerError, SuiteRunner};
