pub mod dynamic_config;
pub mod file_exchange;
pub mod topic_stream;
