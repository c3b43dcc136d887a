pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod publish;
pub mod ridership;
pub mod turnstile;
