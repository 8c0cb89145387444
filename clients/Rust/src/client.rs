use crate::error::{JobApiError, Result};
use crate::types::{JobCreationData, JobId, JobInfo, JobRequest};
use reqwest::header::LOCATION;
use reqwest::{Client, Response, Url};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-IBM-Client-Id";

/// HTTP client for interacting with the optimization job service
#[derive(Debug, Clone)]
pub struct JobApiClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl JobApiClient {
    /// Create a new job service client
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the job API (e.g., "https://host/job_manager/rest/v1/")
    ///
    /// # Example
    ///
    /// ```no_run
    /// use oaas_job_sdk::JobApiClient;
    ///
    /// let client = JobApiClient::new("http://localhost:9000/job_manager/rest/v1/").unwrap();
    /// ```
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new job service client with custom reqwest client
    ///
    /// This allows you to configure timeouts, connection pool size, proxies, etc.
    pub fn with_client(base_url: impl AsRef<str>, client: Client) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url.as_ref()).map_err(|e| JobApiError::InvalidUrl(e.to_string()))?;
        // Relative joins below must extend the path, not replace its last segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            api_key: None,
        })
    }

    /// Set the API key sent with every request
    ///
    /// # Example
    ///
    /// ```no_run
    /// use oaas_job_sdk::JobApiClient;
    ///
    /// let client = JobApiClient::new("http://localhost:9000/")
    ///     .unwrap()
    ///     .with_api_key("your-api-key");
    /// ```
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| JobApiError::InvalidUrl(e.to_string()))
    }

    fn authorize(&self, req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref api_key) => req_builder.header(API_KEY_HEADER, api_key),
            None => req_builder,
        }
    }

    /// Create a job, upload its attachments and start it
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use oaas_job_sdk::{JobApiClient, JobRequestBuilder};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = JobApiClient::new("http://localhost:9000/")?;
    ///
    /// let request = JobRequestBuilder::new()
    ///     .input("model.mod", std::fs::read("truck.mod")?)
    ///     .input("model.json", br#"{"Hubs": []}"#.to_vec())
    ///     .output("solution.json")
    ///     .build()?;
    ///
    /// let job_id = client.submit(&request).await?;
    /// println!("Job {} started", job_id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(&self, request: &JobRequest) -> Result<JobId> {
        let job_id = self.create_job(&request.creation_data()).await?;
        if let Err(e) = self.upload_and_execute(&job_id, request).await {
            // Best-effort cleanup, the upload or execute error is what gets reported
            let _ = self.delete_job(&job_id).await;
            return Err(e);
        }
        Ok(job_id)
    }

    async fn upload_and_execute(&self, job_id: &JobId, request: &JobRequest) -> Result<()> {
        for attachment in &request.attachments {
            self.upload_attachment(job_id, &attachment.name, attachment.data.clone())
                .await?;
        }
        self.execute(job_id).await
    }

    /// `POST /jobs`
    pub async fn create_job(&self, data: &JobCreationData) -> Result<JobId> {
        let url = self.url("jobs")?;
        let response = self.authorize(self.client.post(url).json(data)).send().await?;
        let response = check(response).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| JobApiError::ParseError("Missing Location header".to_string()))?;
        let id = location
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| JobApiError::ParseError(format!("Bad job location {}", location)))?;

        Ok(JobId(id.to_string()))
    }

    /// `PUT /jobs/{id}/attachments/{name}/blob`
    pub async fn upload_attachment(&self, job_id: &JobId, name: &str, data: Vec<u8>) -> Result<()> {
        let url = self.url(&format!("jobs/{}/attachments/{}/blob", job_id, name))?;
        let req_builder = self
            .client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data);
        let response = self.authorize(req_builder).send().await?;
        check(response).await?;
        Ok(())
    }

    /// `POST /jobs/{id}/execute`
    pub async fn execute(&self, job_id: &JobId) -> Result<()> {
        let url = self.url(&format!("jobs/{}/execute", job_id))?;
        let response = self.authorize(self.client.post(url)).send().await?;
        check(response).await?;
        Ok(())
    }

    /// `GET /jobs/{id}`
    pub async fn job_info(&self, job_id: &JobId) -> Result<JobInfo> {
        let url = self.url(&format!("jobs/{}", job_id))?;
        let response = self.authorize(self.client.get(url)).send().await?;
        let response = check(response).await?;

        response
            .json()
            .await
            .map_err(|e| JobApiError::ParseError(e.to_string()))
    }

    /// `GET /jobs/{id}/attachments/{name}/blob`
    pub async fn download_attachment(&self, job_id: &JobId, name: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!("jobs/{}/attachments/{}/blob", job_id, name))?;
        let response = self.authorize(self.client.get(url)).send().await?;
        let response = check(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// `DELETE /jobs/{id}`
    pub async fn delete_job(&self, job_id: &JobId) -> Result<()> {
        let url = self.url(&format!("jobs/{}", job_id))?;
        let response = self.authorize(self.client.delete(url)).send().await?;
        check(response).await?;
        Ok(())
    }
}

async fn check(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(match status {
        401 => JobApiError::AuthenticationFailed,
        429 => JobApiError::JobLimitReached(error_text),
        403 if error_text.to_lowercase().contains("limit") => {
            JobApiError::JobLimitReached(error_text)
        }
        403 => JobApiError::AuthenticationFailed,
        _ => JobApiError::ApiError {
            status,
            message: error_text,
        },
    })
}
