pub mod account;
pub mod card;
pub mod response;
pub mod transaction;
pub mod user;
