pub mod account_normalizer;
pub mod action_merger;
pub mod balance_formatter;
pub mod error;
pub mod keys;
