pub mod config;
pub mod error;
pub mod token;
pub mod guard;
pub mod complaint;
pub mod storage;
pub mod handlers;
pub mod upload;
pub mod db;
