//! Capability-scoped tool surface.
//!
//! Every state change enters through [`ToolRouter::call`]: the caller's role is
//! checked against its capability set, arguments are decoded, and the call is
//! dispatched to the matching use case.

pub mod args;
pub mod capabilities;
pub mod error;
pub mod operation;
pub mod role;
pub mod router;

pub use capabilities::{Capabilities, CapabilityError};
pub use error::{ErrorKind, ToolError};
pub use operation::Operation;
pub use role::Role;
pub use router::ToolRouter;
