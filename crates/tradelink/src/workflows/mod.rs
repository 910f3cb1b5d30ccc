pub mod marketplace;
pub mod registration;
