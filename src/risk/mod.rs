pub mod limits;
pub mod statistics;
