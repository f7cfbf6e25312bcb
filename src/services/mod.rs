pub mod backend;
pub mod mock;
pub mod notify;
pub mod wizard;
