pub mod network;
pub mod visibility;
