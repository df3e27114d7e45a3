//! dropdock: named drops that reconcile containers against a Docker daemon.
//!
//! ```text
//!   dropdock perform container up -- web.yml -n dewey
//!        │
//!        ▼
//!   ┌───────────┐  build once   ┌──────────────┐
//!   │ Performer │ ────────────► │ ContainerDrop│
//!   └───────────┘  (registry)   └──────┬───────┘
//!                                      │ apply
//!                                      ▼
//!   ┌───────────┐   _id        ┌──────────────┐  inspect/create/pull
//!   │  Scope    │ ◄──────────► │    State     │ ───────────────────► Docker
//!   │ (storage) │              └──────────────┘     (RuntimeClient)
//!   └───────────┘
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod drops;
pub mod error;
pub mod performer;
pub mod runtime;
pub mod scope;
pub mod state;
pub mod testing;

pub use config::Config;
pub use context::DropContext;
pub use error::{Error, Result};
pub use performer::{Capability, DropRegistry, Performer};
pub use scope::Scope;
pub use state::{ContainerSpec, State};
