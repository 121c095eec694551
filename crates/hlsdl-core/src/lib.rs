pub mod config;
pub mod logging;

pub mod assemble;
pub mod batch;
pub mod control;
pub mod fetcher;
pub mod http;
pub mod pipeline;
pub mod playlist;
pub mod probe;
pub mod retry;
pub mod scheduler;
pub mod segment;
pub mod storage;
