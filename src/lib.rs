// Re-export modules for both the binary and tests
pub mod control;
pub mod filter;
pub mod logger;
pub mod parse;
pub mod pump;
pub mod runtime;
pub mod window;
