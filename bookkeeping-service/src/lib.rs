pub mod config;
pub mod graphql;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::Application;
