pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod fulfillment;
pub mod mail;
pub mod payments;
pub mod pdf;
pub mod pricing;
pub mod repository;
