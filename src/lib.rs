// Library exports for the babysit process supervisor

pub mod cli;
pub mod config;
pub mod daemon;
pub mod error;
pub mod http;
pub mod logs;
pub mod process;
pub mod redeploy;
pub mod status;
