#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod error;
pub mod init;
pub mod models;
pub mod prelude;
pub mod registry;
pub mod sensor;
pub mod service;

pub use twilight_gateway as gateway;
pub use twilight_http as http;
