pub mod addons;
pub mod storage;
