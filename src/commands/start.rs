use ib_gateway::GatewayManager;

pub async fn run(manager: &GatewayManager, quick: bool) -> anyhow::Result<()> {
    if quick {
        manager.quick_start().await?;
        if manager.is_ready() {
            println!("Gateway ready at {}", manager.gateway_url());
        } else {
            println!("Gateway startup continuing in the background");
        }
        return Ok(());
    }

    manager.ensure_ready().await?;
    println!("Gateway ready at {}", manager.gateway_url());
    Ok(())
}
