//! # Optimization Job Service Client
//!
//! A Rust client SDK for submitting optimization jobs to a remote job service,
//! polling their status and downloading their outputs.
//!
//! ## Example
//!
//! ```no_run
//! use oaas_job_sdk::{ExecutionStatus, JobApiClient, JobRequestBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = JobApiClient::new("http://localhost:9000/")?.with_api_key("key");
//!
//!     let request = JobRequestBuilder::new()
//!         .input("model.mod", std::fs::read("truck.mod")?)
//!         .input("model.json", std::fs::read("problem.json")?)
//!         .parameter("oaas.client.problem.id", "Problem #0")
//!         .output("solution.json")
//!         .build()?;
//!
//!     let job_id = client.submit(&request).await?;
//!     loop {
//!         let info = client.job_info(&job_id).await?;
//!         if info.execution_status == ExecutionStatus::Processed {
//!             break;
//!         }
//!         tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!     }
//!     let solution = client.download_attachment(&job_id, "solution.json").await?;
//!     println!("{}", String::from_utf8_lossy(&solution));
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod client;
pub mod builder;
pub mod error;

pub use client::{JobApiClient, API_KEY_HEADER};
pub use types::{
    Attachment, AttachmentDecl, ExecutionStatus, FailureInfo, JobCreationData, JobId, JobInfo,
    JobRequest, Parameters,
};
pub use builder::{JobRequestBuilder, TIME_LIMIT_PARAMETER};
pub use error::{JobApiError, Result};
