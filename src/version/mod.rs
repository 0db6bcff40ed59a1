//! Version layer: parsing, ordering, constraint matching and upgrade selection
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   semver    │────▶│ constraint  │────▶│   upgrade   │
//! │ (parse/cmp) │     │ (satisfies) │     │  (select)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                   ▲
//!                            ▼                   │
//!                     ┌─────────────┐     ┌─────────────┐
//!                     │   Matcher   │     │  Registry   │
//!                     │ (vs latest) │     │   (fetch)   │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`semver`]: `Version`, its total order and parsing
//! - [`constraint`]: operator-prefixed constraints and membership checks
//! - [`upgrade`]: best-upgrade selection for a constraint
//! - [`matcher`]: Version matching trait and ecosystem-specific implementations
//! - [`registry`]: Registry trait for fetching versions from remote sources
//! - [`registries`]: Concrete registry implementations (npm)
//! - [`error`]: Error types for parsing and registry operations
//! - [`types`]: Common types like `PackageVersions`
//!
//! Everything below `registry` is pure and synchronous; the functions hold no
//! state and can be called from any number of tasks at once.

pub mod constraint;
pub mod error;
pub mod matcher;
pub mod matchers;
pub mod registries;
pub mod registry;
pub mod semver;
pub mod types;
pub mod upgrade;

pub use constraint::{Constraint, Operator, parse_constraint, satisfies};
pub use error::{RegistryError, VersionError};
pub use semver::{Version, compare, parse_version};
pub use upgrade::{UpgradeDecision, select_best_upgrade};
