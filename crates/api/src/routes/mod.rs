pub mod analysis;
pub mod budget;
pub mod investments;
pub mod prices;
pub mod savings;
