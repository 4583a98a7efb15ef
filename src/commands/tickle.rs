use ib_gateway::{GatewayManager, IbApiClient};

pub async fn run(manager: &GatewayManager) -> anyhow::Result<()> {
    let api = IbApiClient::new(manager.clone())?;
    let response = api.tickle().await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
