pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod evidence;
pub mod logs;
pub mod session;
