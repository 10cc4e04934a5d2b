pub mod addon;
pub mod model;
pub mod ports;
pub mod ticket;
