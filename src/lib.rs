// httpx - A fluent HTTP request builder for Rust
//
// This library assembles outbound requests through chained configuration
// calls and executes them against a pluggable transport with bounded retry.

// Re-export core functionality
pub use httpx_client::*;

// Prelude for common imports
pub mod prelude {
    pub use httpx_client::prelude::*;
}
