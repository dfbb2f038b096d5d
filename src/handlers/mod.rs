pub mod collections;
pub mod lookup;
pub mod system;
