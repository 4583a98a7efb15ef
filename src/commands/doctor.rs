use ib_gateway::GatewayManager;

/// Check each expectation of the installation layout and report it. Exits
/// non-zero when something required is missing.
pub fn run(manager: &GatewayManager) -> anyhow::Result<()> {
    let install = manager.install();
    println!("Checking gateway installation at {}", install.root().display());

    let mut healthy = true;
    let checks: [(&str, bool); 4] = [
        ("installation directory", install.root().is_dir()),
        ("router jar", install.jar().is_file()),
        ("config file (root/conf.yaml)", install.conf_file().is_file()),
        ("runtime libraries", install.runtime_lib_dir().is_dir()),
    ];
    for (label, ok) in checks {
        println!("  {} {}", if ok { "+" } else { "x" }, label);
        healthy &= ok;
    }

    match install.runtime_java() {
        Ok(path) => println!("  + bundled java ({})", path.display()),
        Err(e) => {
            println!("  x bundled java: {}", e);
            healthy = false;
        }
    }

    if healthy {
        println!("Installation looks complete.");
        Ok(())
    } else {
        anyhow::bail!("gateway installation is incomplete");
    }
}
