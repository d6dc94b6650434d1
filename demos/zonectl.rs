use std::env;

use myplaceiq::{DEFAULT_PORT, Intent, Mode, MyPlaceIqClient};

const USAGE: &str = "usage: zonectl <host> <client_id> <client_secret> <action> <id> [value]
actions:
  toggle-aircon <aircon_id>
  toggle-zone <zone_id>
  set-mode <aircon_id> <heat|cool|dry|fan>
  set-temp-aircon <aircon_id> <degrees>
  set-temp-zone <zone_id> <degrees>";

#[tokio::main]
async fn main() -> myplaceiq::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let (host, client_id, client_secret, action, id) = match (
        args.get(1),
        args.get(2),
        args.get(3),
        args.get(4),
        args.get(5),
    ) {
        (Some(h), Some(c), Some(s), Some(a), Some(i)) => (h, c, s, a.as_str(), i),
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    let mut client = MyPlaceIqClient::builder(host, DEFAULT_PORT)
        .client_id(client_id)
        .client_secret(client_secret)
        .build()?;
    client.connect().await?;

    let intent = match action {
        "toggle-aircon" => Intent::ToggleAircon {
            aircon_id: id.clone(),
        },
        "toggle-zone" => Intent::ToggleZone {
            zone_id: id.clone(),
        },
        "set-mode" => {
            let mode = args
                .get(6)
                .and_then(|m| Mode::from_wire_str(m))
                .unwrap_or_else(|| {
                    eprintln!("{USAGE}");
                    std::process::exit(2);
                });
            Intent::SetAirconMode {
                aircon_id: id.clone(),
                mode,
            }
        }
        "set-temp-aircon" | "set-temp-zone" => {
            let value: f64 = args
                .get(6)
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    eprintln!("{USAGE}");
                    std::process::exit(2);
                });
            Intent::SetTemperature {
                entity_id: id.clone(),
                is_zone: action == "set-temp-zone",
                value,
            }
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    client.send_intent(intent).await?;
    println!("Command sent.");

    // give the follow-up refresh a moment, then show the settled state
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    let snapshot = client.current_snapshot();
    if let Some(aircon) = snapshot.aircon(id) {
        println!(
            "{}: on={} mode={} heat={:?} cool={:?}",
            aircon.name,
            aircon.is_on,
            aircon.mode,
            aircon.target_temperature_heat,
            aircon.target_temperature_cool
        );
    } else if let Some(zone) = snapshot.zone(id) {
        println!(
            "{}: open={} heat={:?} cool={:?}",
            zone.name, zone.is_on, zone.target_temperature_heat, zone.target_temperature_cool
        );
    }

    client.close().await;
    Ok(())
}
