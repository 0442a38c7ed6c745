//! Repository methods on `KindredService`, one module per concern.

pub mod batch;
pub mod record;
pub mod schema;
pub mod sequence;
