pub mod batch;
pub mod record;
pub mod schema;

pub use batch::BatchCommands;
pub use record::RecordCommands;
pub use schema::SchemaCommands;
