pub mod account;
pub mod cards;
pub mod common;
pub mod transactions;
pub mod users;
