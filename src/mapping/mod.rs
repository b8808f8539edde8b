pub(crate) mod store;

pub use store::{MappingRecord, MappingStore};
