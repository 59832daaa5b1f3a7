pub mod auth;
pub mod basket;
pub mod catalog;
pub mod crud;
pub mod customer;
pub mod delivery;
pub mod order;
pub mod payment;
