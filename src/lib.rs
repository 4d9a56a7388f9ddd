pub mod catalog;
pub mod code_extract;
pub mod config;
pub mod fingerprint;
pub mod logging;
pub mod merge;
pub mod scanner;
pub mod status;
