//! # TWG Bridge CLI
//!
//! Command-line utilities for inspecting status documents and driving
//! controller outputs by hand.

use anyhow::{Context, Result};
use rumqttc::{Event, Outgoing};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use twg_bridge_adapter_mqtt::{connect, MqttConfig, MqttPublisher};
use twg_bridge_core::{
    ChangeListener, DeviceConfig, Dispatch, ObservedValue, PublishError, Publisher, Registry,
    OUT_COUNT_RANGE,
};
use twg_bridge_proto::{encode_output_command, DeviceTopics};
use uuid::Uuid;

/// How long `switch` waits for the command to leave the client.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "topics" => {
            if args.len() < 3 {
                eprintln!("Usage: twg-bridge topics <base_topic>");
                std::process::exit(1);
            }
            let topics = DeviceTopics::new(&args[2]);
            println!("state:   {}", topics.state());
            println!("command: {}", topics.command());
        }
        "encode" => {
            if args.len() < 5 {
                eprintln!("Usage: twg-bridge encode <device_id> <out> <on|off>");
                std::process::exit(1);
            }
            let out = parse_out(&args[3])?;
            let on = parse_switch(&args[4])?;
            let payload = encode_output_command(&args[2], out, on)?;
            println!("{}", String::from_utf8_lossy(&payload));
        }
        "inspect" => {
            if args.len() < 3 {
                eprintln!("Usage: twg-bridge inspect <file> [device_id] [out_count]");
                std::process::exit(1);
            }
            let device_id = args.get(3).map_or("inspect", String::as_str);
            let out_count = match args.get(4) {
                Some(count) => count.parse().context("Invalid out_count")?,
                None => 8,
            };
            let device = DeviceConfig::new(device_id, "inspect", out_count)?;
            for (name, unique_id, value) in inspect_file(Path::new(&args[2]), device)? {
                println!("{unique_id:<40} {name:<18} {value}");
            }
        }
        "switch" => {
            if args.len() < 7 {
                eprintln!(
                    "Usage: twg-bridge switch <broker> <base_topic> <device_id> <out> <on|off>"
                );
                std::process::exit(1);
            }
            let out = parse_out(&args[5])?;
            let on = parse_switch(&args[6])?;
            let device = switch_target(&args[4], &args[3], out)?;

            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(switch(&args[2], device, out, on))?;
            println!("sent: {} out {out} -> {}", args[4], if on { "on" } else { "off" });
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn parse_out(value: &str) -> Result<u32> {
    value
        .parse()
        .with_context(|| format!("Invalid output index '{value}'"))
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => anyhow::bail!("Invalid state '{other}', expected on or off"),
    }
}

/// Device addressed by `switch`.
///
/// The board's real output count is unknown here, so the device is given
/// the largest supported count once `out` itself is checked.
fn switch_target(device_id: &str, base_topic: &str, out: u32) -> Result<DeviceConfig> {
    if !OUT_COUNT_RANGE.contains(&out) {
        anyhow::bail!(
            "Output {out} out of range {}..={}",
            OUT_COUNT_RANGE.start(),
            OUT_COUNT_RANGE.end()
        );
    }
    DeviceConfig::new(device_id, base_topic, *OUT_COUNT_RANGE.end())
        .context("Invalid device configuration")
}

/// Publisher for offline inspection; nothing is ever sent.
struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&self, topic: &str, _payload: Vec<u8>) -> Result<(), PublishError> {
        Err(PublishError::Transport(format!(
            "offline, not publishing to {topic}"
        )))
    }
}

/// Point name, unique id and value.
type PointRow = (String, String, ObservedValue);

/// Dispatch a saved status document to the standard points of `device`.
///
/// Returns `(name, unique_id, value)` for every point, in catalogue order.
fn inspect_file(path: &Path, device: DeviceConfig) -> Result<Vec<PointRow>> {
    let payload =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let listener: Arc<dyn ChangeListener> = Arc::new(|_: &str, _: &ObservedValue| {});
    let specs = device.standard_points();
    let device_id = device.device_id().to_string();
    let mut registry = Registry::with_standard_points(device, Arc::new(NoopPublisher), &listener);

    if registry.dispatch(&payload) == Dispatch::Dropped {
        anyhow::bail!("{} is not a valid status document", path.display());
    }

    Ok(specs
        .into_iter()
        .map(|spec| {
            let value = registry
                .current_value(&spec.id)
                .cloned()
                .unwrap_or_default();
            let unique_id = spec.id.unique_id(&device_id);
            (spec.name, unique_id, value)
        })
        .collect())
}

async fn switch(broker: &str, device: DeviceConfig, out: u32, on: bool) -> Result<()> {
    let (client, mut eventloop) = connect(&MqttConfig {
        broker: broker.to_string(),
        client_id: format!("twg-bridge-cli-{}", Uuid::new_v4()),
        ..MqttConfig::default()
    })?;

    let listener: Arc<dyn ChangeListener> = Arc::new(|_: &str, _: &ObservedValue| {});
    let registry =
        Registry::with_standard_points(device, Arc::new(MqttPublisher::new(client)), &listener);
    registry.request_output_change(out, on)?;

    // Drive the event loop until the publish has been written
    tokio::time::timeout(SEND_TIMEOUT, async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Publish(_))) => return Ok(()),
                Ok(_) => {}
                Err(e) => return Err(anyhow::anyhow!("MQTT connection failed: {e}")),
            }
        }
    })
    .await
    .context("Timed out waiting to send command")?
}

fn print_help() {
    println!(
        r#"TWG Bridge CLI

USAGE:
    twg-bridge <COMMAND> [OPTIONS]

COMMANDS:
    topics <base_topic>                      Show the state and command topics
    encode <device_id> <out> <on|off>        Print an output command payload
    inspect <file> [device_id] [out_count]   Show every point read from a status document
    switch <broker> <base_topic> <device_id> <out> <on|off>
                                             Publish an output command
    help                                     Show this help message

EXAMPLES:
    twg-bridge topics plant/twg1
    twg-bridge encode Twg_Test_Mqtt 3 on
    twg-bridge inspect status.json Twg_Test_Mqtt 16
    twg-bridge switch tcp://localhost:1883 twg Twg_Test_Mqtt 3 off
"#
    );
}
