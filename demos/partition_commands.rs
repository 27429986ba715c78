//! Example: Arm and disarm partitions.

use satel_integra::{ArmMode, AsyncSatel, SatelConfig, SatelError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let code = "1234";
    let config = SatelConfig::builder()
        .host("192.168.0.100")
        .partitions(vec![1])
        .build();

    let satel = AsyncSatel::connect(config).await?;

    for part in satel.partitions().await {
        println!(
            "Partition {}: {}",
            part.id,
            part.alarm_state()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );
    }

    // Mode 1 is usually configured as "stay"
    println!("\nArming partition 1 in mode 1...");
    match satel.arm(code, &[1], ArmMode::Mode1).await {
        Ok(()) => println!("Partition 1 armed (mode 1)"),
        Err(SatelError::Rejected(result)) => println!("Arm command rejected: {}", result),
        Err(e) => println!("Error arming partition 1: {}", e),
    }

    // Wait a bit then disarm
    tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

    println!("\nDisarming partition 1...");
    match satel.disarm(code, &[1]).await {
        Ok(()) => println!("Partition 1 disarmed"),
        Err(SatelError::Rejected(result)) => println!("Disarm command rejected: {}", result),
        Err(e) => println!("Error disarming partition 1: {}", e),
    }

    satel.close().await;
    Ok(())
}
