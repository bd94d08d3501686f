//! Server Module
//!
//! This module contains the code that loads configuration, builds the shared
//! state and assembles the Axum application.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Configuration loading and database connection
//! └── init.rs         - Server initialization and app creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: `ServerConfig::from_env` reads and validates every key
//! 2. **Datastore**: PostgreSQL pool with migrations applied
//! 3. **State Creation**: token codec, datastore and rate limiter in one `AppState`
//! 4. **Background Tasks**: idle rate limit buckets are swept periodically
//! 5. **Router Creation**: routes, session guards and the governor layers
//!
//! # Example
//!
//! ```rust,no_run
//! use snippets::backend::server::{create_app, ServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! let app = create_app(config).await?;
//! # Ok(())
//! # }
//! ```

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use config::{ConfigError, ServerConfig};
pub use init::{create_app, StartupError};
pub use state::AppState;
