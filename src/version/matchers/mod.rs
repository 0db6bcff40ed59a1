//! Ecosystem-specific version matchers

pub mod npm;

pub use npm::NpmVersionMatcher;
