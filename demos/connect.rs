//! Example: Connect to a Satel panel and print device status.

use satel_integra::{AsyncSatel, SatelConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = SatelConfig::builder()
        .host("192.168.0.100")
        .port(7094)
        .integration_key("my-integration-key")
        .monitored_zones(vec![1, 2, 3, 4])
        .monitored_outputs(vec![16, 17])
        .partitions(vec![1, 2])
        .read_names(true)
        .build();

    println!("Connecting to panel...");
    let satel = AsyncSatel::connect(config).await?;

    println!("\n--- Panel ---");
    println!("  {}", satel.read_version().await?);
    println!("  Clock: {}", satel.read_time().await?);

    let zones = satel.zones().await;
    println!("\n--- Zones ({}) ---", zones.len());
    for zone in &zones {
        println!(
            "  Zone {:3}: {:16} violated={:?} tamper={:?} alarm={:?} bypassed={:?}",
            zone.id,
            zone.name.as_deref().unwrap_or("-"),
            zone.violated.value(),
            zone.tamper.value(),
            zone.alarm.value(),
            zone.bypassed.value(),
        );
    }

    let partitions = satel.partitions().await;
    println!("\n--- Partitions ({}) ---", partitions.len());
    for part in &partitions {
        let state = part
            .alarm_state()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "  Partition {:2}: {:16} {}",
            part.id,
            part.name.as_deref().unwrap_or("-"),
            state,
        );
    }

    let outputs = satel.outputs().await;
    println!("\n--- Outputs ({}) ---", outputs.len());
    for output in &outputs {
        println!(
            "  Output {:3}: {:16} active={:?}",
            output.id,
            output.name.as_deref().unwrap_or("-"),
            output.active.value(),
        );
    }

    println!("\nPress Ctrl+C to disconnect...");
    tokio::signal::ctrl_c().await?;
    satel.close().await;
    println!("Disconnected.");

    Ok(())
}
