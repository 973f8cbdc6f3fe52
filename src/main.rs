use bus::{Bus, DeltaCommand, DeltaEvent, ReplyRouter};
use live_dom::{EngineConfig, LiveDom};
use runtime_delta::start_delta_runtime;
use std::error::Error;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use vdom::{Batch, VNode};

const CONFIG_ENV: &str = "DELTADOM_CONFIG";
const OUTLINE_CAP: usize = 10_000;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config() -> Result<EngineConfig, Box<dyn Error>> {
    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            log::debug!("loading config from {}", Path::new(&path).display());
            EngineConfig::load(path)?
        }
        None => EngineConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn load_tree(path: &str) -> Result<LiveDom, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    let root: VNode = serde_json::from_str(&text)?;
    Ok(LiveDom::from_vnode(&root)?)
}

fn run(tree_path: &str, batches_path: &str) -> Result<(), Box<dyn Error>> {
    let config = load_config()?;
    let dom = load_tree(tree_path)?;
    let batches = Batch::many_from_json(&std::fs::read_to_string(batches_path)?)?;

    let (bus, cmd_rx) = Bus::new();
    let Bus {
        cmd_tx,
        evt_rx,
        evt_tx,
    } = bus;
    // No routes: every ack surfaces on the event channel.
    let router = ReplyRouter::new().with_fallback(evt_tx);
    let runtime = start_delta_runtime(dom, config, cmd_rx, router);

    for batch in batches {
        cmd_tx.send(DeltaCommand::ApplyBatch(batch))?;
    }
    drop(cmd_tx);

    let mut failed = 0usize;
    while let Ok(event) = evt_rx.recv() {
        match event {
            DeltaEvent::Reply { origin, ack } => {
                if !ack.success {
                    failed += 1;
                }
                log::debug!("reply for {origin}");
                println!("{}", ack.to_json()?);
            }
            DeltaEvent::Stopped { stats } => log::info!("{stats:?}"),
        }
    }

    let dom = runtime
        .join()
        .map_err(|_| "delta runtime panicked")?;
    for line in dom.outline(OUTLINE_CAP) {
        println!("{line}");
    }
    if failed > 0 {
        return Err(format!("{failed} batch(es) failed").into());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let args: Vec<String> = std::env::args().collect();
    let [_, tree_path, batches_path] = args.as_slice() else {
        return Err("usage: deltadom <tree.json> <batches.json>".into());
    };
    run(tree_path, batches_path)
}
