//! Observability setup shared by binaries and tests embedding the auction
//! engine. Initialization logic for logging lives here so every entry point
//! configures the tracing subscriber the same way.

pub mod tracing;
