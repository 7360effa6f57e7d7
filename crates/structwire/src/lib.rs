//! Fixed-layout struct messages for telemetry and control links.
//!
//! structwire describes binary messages as ordered structs of primitives,
//! arrays, bit fields and nested structs, decodes identifier-framed
//! streams of them into reusable instances, and exposes every leaf value
//! as a named channel.
//!
//! # Crate Structure
//!
//! - [`primitives`]: primitive kinds, byte order, live value holders
//! - [`protocol`]: struct schemas, enums, JSON schema definitions
//! - [`receiver`]: identifier framing and dispatch (behind `receiver` feature)
//! - [`env`]: channel environments (behind `env` feature)

/// Re-export primitive types.
pub mod primitives {
    pub use structwire_primitives::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use structwire_protocol::*;
}

/// Re-export receiver types (requires `receiver` feature).
#[cfg(feature = "receiver")]
pub mod receiver {
    pub use structwire_receiver::*;
}

/// Re-export channel environment types (requires `env` feature).
#[cfg(feature = "env")]
pub mod env {
    pub use structwire_env::*;
}
