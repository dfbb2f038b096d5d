pub mod count;
pub mod list;
pub mod repair;
pub mod token;
