//! dw-shadow - Shadow schema manager and apply engine for Driftway
//!
//! Shadow tables decouple a migration script from the live schema: a script
//! edits an isolated mirror of the columns it cares about and the engine
//! reconciles the mirror back into the original table, whether the original
//! exists yet or not. The [`ShadowSchemaManager`] owns the `use` / backup /
//! restore side of the protocol; the [`ApplyEngine`] owns reconciliation.

pub mod apply;
pub mod catalog;
pub mod error;
pub mod manager;
pub mod population;

pub use apply::ApplyEngine;
pub use catalog::ShadowCatalog;
pub use error::{ShadowError, ShadowResult};
pub use manager::ShadowSchemaManager;
pub use population::PopulationRecord;
