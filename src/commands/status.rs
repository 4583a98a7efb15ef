use ib_gateway::GatewayManager;

pub async fn run(manager: &GatewayManager, json: bool, logs: bool) -> anyhow::Result<()> {
    // Passive: adopt a gateway if one is already running, but never launch.
    let _ = manager.discover().await;
    let status = manager.status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("Gateway status:");
        println!("{:-<40}", "");
        println!("  mode:     {}", status.mode);
        println!(
            "  state:    {}",
            if status.ready {
                "ready"
            } else if status.starting {
                "starting"
            } else {
                "not running"
            }
        );
        println!("  port:     {}", status.port);
        println!("  url:      {}", status.url);
        if let Some(pid) = status.pid {
            println!("  pid:      {}", pid);
        }
        if let Some(started_at) = status.started_at {
            println!("  started:  {}", started_at.to_rfc3339());
        }
    }

    if logs {
        let tail = manager.recent_output();
        if tail.is_empty() {
            println!("\n(no captured gateway output; not launched by this process)");
        } else {
            println!("\nRecent gateway output:");
            for line in tail {
                println!("  {}", line);
            }
        }
    }

    Ok(())
}
