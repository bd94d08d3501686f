//! Background Task Module
//!
//! Cooperative cancellation and fan-in for handler work.
//!
//! # Module Structure
//!
//! ```text
//! tasks/
//! ├── mod.rs    - Module exports
//! ├── scope.rs  - RequestScope and TaskScope
//! └── runner.rs - TaskRunner and run_unit
//! ```

pub mod runner;
pub mod scope;

pub use runner::{run_unit, TaskRunner};
pub use scope::{RequestScope, TaskScope};
