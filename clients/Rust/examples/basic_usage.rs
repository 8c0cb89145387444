use oaas_job_sdk::{ExecutionStatus, JobApiClient, JobRequestBuilder};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::var("OAAS_BASE_URL")?;
    let api_key = std::env::var("OAAS_API_KEY")?;
    let model_file = std::env::var("OAAS_MODEL_FILE")?;

    let client = JobApiClient::new(base_url)?.with_api_key(api_key);

    // A tiny network: one spoke pair through one hub, one truck type
    let problem = serde_json::json!({
        "Parameters": {"maxTrucks": 100, "maxVolume": 5000},
        "Hubs": [{"name": "G"}],
        "Spokes": [
            {"name": "A", "minDepTime": 360, "maxArrTime": 1080},
            {"name": "B", "minDepTime": 400, "maxArrTime": 1150}
        ],
        "TruckTypes": [
            {"truckType": "SmallTruck", "capacity": 400, "costPerMile": 10, "milesPerHour": 55}
        ],
        "LoadTimes": [],
        "Routes": [],
        "Shipments": []
    });

    let request = JobRequestBuilder::new()
        .input("model.mod", std::fs::read(model_file)?)
        .input("model.json", serde_json::to_vec(&problem)?)
        .parameter("oaas.client.problem.id", "example")
        .output("solution.json")
        .timeout(Duration::from_secs(300))
        .build()?;

    println!("Submitting job...");
    let job_id = client.submit(&request).await?;
    println!("Job {} submitted", job_id);

    let info = loop {
        let info = client.job_info(&job_id).await?;
        println!("  Status: {:?}", info.execution_status);
        if info.execution_status.is_terminal() {
            break info;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    };

    if info.execution_status == ExecutionStatus::Processed {
        let output = client.download_attachment(&job_id, "solution.json").await?;
        println!("{}", String::from_utf8_lossy(&output));
    } else if let Some(failure) = info.failure_info {
        println!("Job failed: {}", failure.message);
    }

    client.delete_job(&job_id).await?;
    Ok(())
}
