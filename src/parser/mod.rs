//! Manifest layer
//! - types.rs: Common types (Dependency, DependencyKind, Ecosystem)
//! - package_json.rs: package.json reader/writer, backup and diff
//! - package_lock.rs: installed versions from package-lock.json
//! - error.rs: ManifestError

pub mod error;
pub mod package_json;
pub mod package_lock;
pub mod types;

pub use error::ManifestError;
pub use package_json::{PackageJson, create_backup, find_package_json, generate_diff};
pub use package_lock::PackageLock;
pub use types::{Dependency, DependencyKind, Ecosystem};
