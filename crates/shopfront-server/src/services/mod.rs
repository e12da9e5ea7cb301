pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod email;
pub mod orders;
