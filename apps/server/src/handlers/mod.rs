pub mod admin;
pub mod client;
pub mod cron;
pub mod health;
