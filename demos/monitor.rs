use std::env;
use std::time::Duration;

use myplaceiq::{DEFAULT_PORT, MessageLogMode, MyPlaceIqClient, Snapshot};

fn print_snapshot(snapshot: &Snapshot) {
    for (aircon_id, aircon) in &snapshot.aircons {
        println!(
            "[{aircon_id}] {} | {} | mode: {} | actual: {} | heat: {} | cool: {}",
            aircon.name,
            if aircon.is_on { "ON" } else { "OFF" },
            aircon.mode,
            fmt_temp(aircon.actual_temperature),
            fmt_temp(aircon.target_temperature_heat),
            fmt_temp(aircon.target_temperature_cool),
        );
        for (zone_id, zone) in snapshot.visible_zones(aircon_id) {
            println!(
                "  [{zone_id}] {} | {} | temp: {}",
                zone.name,
                if zone.is_on { "open" } else { "closed" },
                fmt_temp(zone.temperature_sensor_value),
            );
        }
    }
}

fn fmt_temp(t: Option<f64>) -> String {
    t.map(|t| format!("{t:.1}\u{00b0}C")).unwrap_or_else(|| "-".into())
}

#[tokio::main]
async fn main() -> myplaceiq::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let host = args
        .get(1)
        .expect("usage: monitor <host> <client_id> <client_secret> [--log]");
    let client_id = args.get(2).expect("client_id required");
    let client_secret = args.get(3).expect("client_secret required");
    let log = args.iter().any(|a| a == "--log");

    let mut builder = MyPlaceIqClient::builder(host, DEFAULT_PORT)
        .client_id(client_id)
        .client_secret(client_secret)
        .poll_interval(Duration::from_secs(15))
        .on_snapshot(|snapshot| {
            println!("--- snapshot ---");
            print_snapshot(snapshot);
        });

    if log {
        builder = builder.message_log(MessageLogMode::Diffed, "monitor.ndjson");
        println!("Logging wire traffic to monitor.ndjson");
    }

    let mut client = builder.build()?;

    println!("Connecting to {host}...");
    client.connect().await?;
    println!("Connected. Polling for updates (Ctrl-C to stop)...");

    loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        if !client.is_available() {
            eprintln!("hub unavailable, showing stale state");
        }
    }
}
