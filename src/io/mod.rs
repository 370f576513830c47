pub mod events;
pub mod store;
pub mod stream;
