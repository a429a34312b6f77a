pub mod cache;
pub mod clock;
pub mod configuration;
pub mod contracts;
pub mod error_mediator;
pub mod handler;
pub mod mediator;
pub mod middleware;
pub mod normalizer;
