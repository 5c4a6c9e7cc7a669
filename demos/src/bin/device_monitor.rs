//! Демо: несколько узлов следят за подключением устройства.
//!
//! Команды читаются из stdin (или из `--script`):
//! - `1` — устройство подключено;
//! - `2` — устройство отключено;
//! - `s` — состояние узлов и статистика брокера;
//! - `q` — выход.

use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use clap::Parser;
use rand::Rng;
use serde::{Deserialize, Serialize};

use postbox::{
    global, init_global, init_logging, Message, PostboxResult, ScopedSubscription, Settings,
    SubscriberId,
};

const CONNECTED: &str = "deviceConnectedNotification";
const DISCONNECTED: &str = "deviceDisconnectedNotification";

#[derive(Parser, Debug)]
#[command(name = "device-monitor", version, about = "Notification bus demo: device connect/disconnect")]
struct Args {
    /// Число узлов-наблюдателей.
    #[arg(short, long, default_value_t = 9)]
    nodes: usize,

    /// Команды через запятую вместо stdin, например `1,2,s`.
    #[arg(short, long, value_delimiter = ',')]
    script: Option<Vec<String>>,

    /// Файл конфигурации (toml/json/yaml).
    #[arg(short, long, env = "POSTBOX_CONFIG")]
    config: Option<PathBuf>,
}

/// Данные уведомления о подключении.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceData {
    my_info: String,
    my_value: f64,
}

/// Узел, который помнит, доступно ли устройство.
struct DeviceNode {
    name: String,
    device_available: Arc<AtomicBool>,
    _subscriptions: Vec<ScopedSubscription>,
}

impl DeviceNode {
    fn new(name: String) -> Self {
        let owner = SubscriberId::next();
        let device_available = Arc::new(AtomicBool::new(false));
        let broker = global();

        let (node, flag) = (name.clone(), device_available.clone());
        let connected = broker.subscribe_scoped(owner, CONNECTED, move |msg: &mut Message| {
            tracing::info!(node = %node, "onDeviceConnectedNotif()");
            flag.store(true, Ordering::Relaxed);
            report_data(&node, msg);
            Ok(())
        });

        let (node, flag) = (name.clone(), device_available.clone());
        let disconnected = broker.subscribe_scoped(owner, DISCONNECTED, move |msg: &mut Message| {
            tracing::info!(node = %node, "onDeviceDisconnectedNotif()");
            flag.store(false, Ordering::Relaxed);
            report_data(&node, msg);
            Ok(())
        });

        Self {
            name,
            device_available,
            _subscriptions: vec![connected, disconnected],
        }
    }

    fn status(&self) -> &'static str {
        if self.device_available.load(Ordering::Relaxed) {
            "Device Connected"
        } else {
            "Device Disconnected"
        }
    }
}

/// Узел ожидает `DeviceData`; чужую форму сообщения он логирует и
/// продолжает работу.
fn report_data(
    node: &str,
    msg: &Message,
) {
    match msg.extension::<DeviceData>() {
        Ok(data) => tracing::info!(node, "{} {}", data.my_info, data.my_value),
        Err(e) => {
            tracing::error!(node, error = %e, "type conversion error!");
            for (key, value) in &msg.payload {
                tracing::info!(node, key = %key, value = %value, "payload field");
            }
        }
    }
}

fn connect_device() -> PostboxResult<()> {
    tracing::info!("## Device Connected! ##");
    let data = DeviceData {
        my_info: "device #".to_string(),
        my_value: rand::thread_rng().gen::<f64>(),
    };
    let mut msg = Message::from_data(&data)?.with_extension(data);
    global().publish(CONNECTED, &mut msg)?;
    Ok(())
}

fn disconnect_device() -> PostboxResult<()> {
    tracing::info!("## Device Disconnected! ##");
    let mut msg = Message::new()
        .with("myThing", 1)
        .with("myOhterThing", "banana");
    global().publish(DISCONNECTED, &mut msg)?;
    Ok(())
}

fn print_status(nodes: &[DeviceNode]) {
    for node in nodes {
        println!("{:<10} {}", node.name, node.status());
    }
    let stats = global().stats();
    println!(
        "published={} delivered={} no_listeners={} failures={}",
        stats.publish_count, stats.delivered_count, stats.no_listener_count, stats.observer_failures
    );
}

/// Выполняет одну команду; `false` означает выход.
fn execute(
    command: &str,
    nodes: &[DeviceNode],
) -> PostboxResult<bool> {
    match command.trim() {
        "1" => connect_device()?,
        "2" => disconnect_device()?,
        "s" => print_status(nodes),
        "q" => return Ok(false),
        "" => {}
        other => println!("unknown command '{other}': use 1, 2, s or q"),
    }
    Ok(true)
}

fn main() -> PostboxResult<()> {
    let args = Args::parse();
    let settings = Settings::load_from(args.config.as_deref())?;
    let _logging = init_logging(&settings.logging)?;
    init_global(settings.broker)?;

    // До появления узлов никто не слушает: это уведомление попадёт в лог.
    disconnect_device()?;

    let nodes: Vec<DeviceNode> = (0..args.nodes)
        .map(|i| DeviceNode::new(format!("MyNode{i}")))
        .collect();
    tracing::info!(nodes = nodes.len(), channels = ?global().channels(), "scene populated");

    match args.script {
        Some(commands) => {
            for command in &commands {
                if !execute(command, &nodes)? {
                    break;
                }
            }
        }
        None => {
            println!("Press '1' to connect device. Press '2' to disconnect device. 's' status, 'q' quit.");
            for line in io::stdin().lock().lines() {
                if !execute(&line?, &nodes)? {
                    break;
                }
            }
        }
    }

    print_status(&nodes);
    Ok(())
}
