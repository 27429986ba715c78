//! Example: Subscribe to zone and partition events and print changes.

use satel_integra::{AsyncSatel, SatelConfig, SatelEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = SatelConfig::builder()
        .host("192.168.0.100")
        .monitored_zones((1..=16).collect::<Vec<_>>())
        .partitions(vec![1])
        .build();

    // Connects in the background and keeps reconnecting
    let satel = AsyncSatel::start(config);
    let mut events = satel.subscribe();

    println!("Listening for zone events (Ctrl+C to stop)...\n");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(SatelEvent::ZoneChanged { zone_id, attribute, active, previous }) => {
                        let sign = if active { '+' } else { '-' };
                        match previous {
                            Some(_) => println!("Zone {}: {} {}", zone_id, sign, attribute),
                            None => println!("Zone {}: {} {} (initial)", zone_id, sign, attribute),
                        }
                    }
                    Ok(SatelEvent::PartitionChanged { partition_id, state, .. }) => {
                        println!("Partition {}: {}", partition_id, state);
                    }
                    Ok(SatelEvent::Disconnected) => {
                        println!("Panel disconnected, waiting for reconnection...");
                    }
                    Ok(SatelEvent::PartitionReport { .. }) => {}
                    Ok(event) => {
                        println!("Event: {:?}", event);
                    }
                    Err(e) => {
                        println!("Event channel error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nDisconnecting...");
                break;
            }
        }
    }

    satel.close().await;
    Ok(())
}
