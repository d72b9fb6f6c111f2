pub mod budget;
pub mod contract;
pub mod investment;
pub mod savings;
