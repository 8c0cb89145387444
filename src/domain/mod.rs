pub mod barrier;
pub mod batch;
pub mod client_factory;
pub mod clients;
pub mod decode;
pub mod engine;
pub mod job;
pub mod job_client;
pub mod registry;
pub mod solve;
pub mod validate;
