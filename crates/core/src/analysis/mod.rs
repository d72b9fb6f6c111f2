pub mod assistant;
pub mod report;
pub mod risk;
pub mod summary;
