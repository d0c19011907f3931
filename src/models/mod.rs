//! Core data models.

mod aggregate;
mod ids;
mod provenance;
mod session;
mod workout;

pub use aggregate::*;
pub use ids::*;
pub use provenance::*;
pub use session::*;
pub use workout::*;
