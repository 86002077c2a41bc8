pub mod common;
pub mod service;
