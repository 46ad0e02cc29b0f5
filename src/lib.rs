pub mod access_log;
pub mod config;
pub mod db;
pub mod domain;
pub mod init;
pub mod logger;
pub mod policy;
pub mod tail;
