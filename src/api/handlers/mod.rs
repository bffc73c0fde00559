pub mod access;
pub mod admin;
pub mod auth;
pub mod checkout;
pub mod donations;
pub mod root;
pub mod webhook;
