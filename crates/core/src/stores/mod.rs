pub mod elastic;
pub mod memory;

pub use elastic::ElasticStore;
pub use memory::MemoryStore;
