mod dish;

use anyhow::Result;
use cellframe_core::{FrameConfig, FrameOp, frame_inst_lib};
use cellframe_tags::Tag;
use cellframe_vm::{Function, Program};
use dish::Dish;
use tracing::{info, warn};

const DEMO_TICKS: u64 = 200;
const REPORT_EVERY: u64 = 20;

fn main() -> Result<()> {
    init_tracing();
    let mut dish = bootstrap_dish()?;
    info!(
        width = dish.manager().config().grid_width,
        height = dish.manager().config().grid_height,
        "Starting cellframe dish"
    );

    let ticks = std::env::var("CF_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEMO_TICKS);
    let mut last = None;
    for _ in 0..ticks {
        let summary = dish.step()?;
        if summary.tick.0 % REPORT_EVERY == 0 {
            info!(
                tick = summary.tick.0,
                live = summary.live,
                births = summary.births,
                deaths = summary.deaths,
                refunds = summary.refunds,
                resource = summary.resource,
                pending = summary.pending,
                "dish summary"
            );
        }
        last = Some(summary);
    }

    match last {
        Some(summary) if summary.live > 0 => info!(
            tick = summary.tick.0,
            live = summary.live,
            "Run finished"
        ),
        Some(summary) => warn!(tick = summary.tick.0, "Population died out"),
        None => warn!("No ticks were run"),
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn bootstrap_dish() -> Result<Dish> {
    let config = FrameConfig {
        grid_width: 24,
        grid_height: 24,
        env_trig_freq: 2,
        ..FrameConfig::default()
    };
    let program = founder_program(config.nlev)?;
    let mut dish = Dish::new(config)?;

    let width = dish.manager().config().grid_width as usize;
    for row in [6, 18] {
        for col in [6, 18] {
            dish.seed(row * width + col, &program, 64.0);
        }
    }
    Ok(dish)
}

/// Founders share with poorer neighbours, greet live ones and reproduce
/// straight ahead when they can afford it.
fn founder_program(nlev: usize) -> Result<Program<FrameOp>> {
    let lib = frame_inst_lib(nlev);
    let update = Tag::new(0);
    let body = [
        ("QueryIsLive", [0, 1, 0]),
        ("If", [1, 0, 0]),
        ("SendSmallFracResource", [0, 0, 0]),
        ("Output", [2, 0, 0]),
        ("SendMsgExternal", [0, 0, 0]),
        ("Close", [0, 0, 0]),
        ("QueryOwnStockpile", [3, 0, 0]),
        ("TryReproduce-Lev0", [0, 0, 0]),
        ("IncrCellAge-Lev0", [4, 0, 0]),
    ]
    .into_iter()
    .map(|(name, args)| lib.inst(name, args, update))
    .collect::<Result<Vec<_>, _>>()?;
    Ok(Program::new(vec![Function::new(update, body)])?)
}
