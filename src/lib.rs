//! Wingit Realtime - Main Library
//!
//! Re-exports the workspace libraries and the helpers shared by the
//! binaries.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **wingit**: Realtime session, presence, notification sound (re-exported from workspace)
//! - **livesockets**: WebSocket transport (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use wingit_realtime::bin_common::{load_config_from_env, ConfigType};
//! use wingit_realtime::wingit::SessionProvider;
//! ```

// Re-export workspace libraries for convenience
pub use livesockets;
pub use wingit;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
    pub use runner::{BinaryRunner, Command, RunConfig};
}
