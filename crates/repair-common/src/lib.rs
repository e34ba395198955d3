pub mod api;
pub mod cms;
pub mod error;
pub mod redis;
