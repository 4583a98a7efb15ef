use ib_gateway::GatewayManager;

pub async fn run(manager: &GatewayManager) -> anyhow::Result<()> {
    manager.stop().await?;
    println!("Gateway references cleared. The gateway process, if any, is still running");
    println!("and will be adopted by the next start.");
    Ok(())
}
