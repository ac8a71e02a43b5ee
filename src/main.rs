//! Ember demo host
//!
//! Registers a small game-flavored system catalog, composes a runtime from
//! it, and drives the result for a few frames.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ember_ecs::{Store, System, TickContext};
use ember_runtime::{
    Catalog, CatalogEntry, CompositionProfile, FrameDriver, Phase, RuntimeBuilder, RuntimeInstance,
};

/// Counters the demo systems accumulate into the shared store.
#[derive(Debug, Default)]
struct FrameStats {
    chunks_streamed: u32,
    simulation_steps: u32,
    frames_presented: u32,
}

/// Managed: remembers which chunks it already streamed in.
#[derive(Default)]
struct StreamChunks {
    loaded: u32,
}

impl StreamChunks {
    const WORLD_CHUNKS: u32 = 4;
}

impl System for StreamChunks {
    fn run(&mut self, ctx: &mut TickContext) {
        if self.loaded >= Self::WORLD_CHUNKS {
            return;
        }
        self.loaded += 1;
        if let Some(stats) = ctx.store_mut().get_mut::<FrameStats>() {
            stats.chunks_streamed = self.loaded;
        }
    }
}

/// Managed: integrates at a fixed step, carrying the remainder across
/// frames.
#[derive(Default)]
struct IntegrateBodies {
    accumulated: f32,
}

impl IntegrateBodies {
    const STEP: f32 = 1.0 / 120.0;
}

impl System for IntegrateBodies {
    fn run(&mut self, ctx: &mut TickContext) {
        self.accumulated += ctx.delta();
        while self.accumulated >= Self::STEP {
            self.accumulated -= Self::STEP;
            if let Some(stats) = ctx.store_mut().get_mut::<FrameStats>() {
                stats.simulation_steps += 1;
            }
        }
    }
}

/// Managed: plans one goal per frame for the demo NPC crowd.
#[derive(Default)]
struct PlanGoals {
    queued: u32,
}

impl System for PlanGoals {
    fn run(&mut self, _ctx: &mut TickContext) {
        self.queued = (self.queued + 1) % 8;
    }
}

/// Unmanaged: wall-clock bookkeeping lives entirely in the store.
fn advance_clock(ctx: &mut TickContext) {
    let elapsed = ctx.store().get::<f32>().copied().unwrap_or(0.0);
    let delta = ctx.delta();
    ctx.store_mut().insert(elapsed + delta);
}

/// Unmanaged: counts presented frames.
fn submit_frame(ctx: &mut TickContext) {
    if let Some(stats) = ctx.store_mut().get_mut::<FrameStats>() {
        stats.frames_presented += 1;
    }
}

/// Unmanaged: excluded by name below; composing it in would be a bug.
fn draw_debug_overlays(_ctx: &mut TickContext) {
    unreachable!("debug overlays are excluded from the demo composition");
}

fn build_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .register(
            CatalogEntry::managed("world::stream_chunks", Phase::Initialize.default_category(), || {
                Box::new(StreamChunks::default())
            })
            .in_phase(Phase::Initialize),
        )
        .register(
            CatalogEntry::managed("physics::integrate_bodies", Phase::Simulate.default_category(), || {
                Box::new(IntegrateBodies::default())
            })
            .in_phase(Phase::Simulate),
        )
        .register(
            CatalogEntry::unmanaged("time::advance_clock", Phase::Simulate.default_category(), advance_clock)
                .in_phase(Phase::Simulate),
        )
        .register(
            CatalogEntry::unmanaged("render::submit_frame", Phase::Present.default_category(), submit_frame)
                .in_phase(Phase::Present),
        )
        .register(
            CatalogEntry::unmanaged("render::draw_debug_overlays", Phase::Present.default_category(), draw_debug_overlays)
                .in_phase(Phase::Present),
        )
        .register(CatalogEntry::managed("npc::plan_goals", "game.ai", || {
            Box::new(PlanGoals::default())
        }));
    catalog
}

/// Owns the composed runtime and ticks it.
#[derive(Default)]
struct DemoDriver {
    runtime: Option<RuntimeInstance>,
}

impl FrameDriver for DemoDriver {
    fn attach(&mut self, runtime: RuntimeInstance) {
        info!(runtime = %runtime.id(), "runtime attached to frame driver");
        self.runtime = Some(runtime);
    }
}

impl DemoDriver {
    fn run_frames(&self, frames: u32, ctx: &mut TickContext) {
        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };
        for _ in 0..frames {
            ctx.advance(1.0 / 60.0);
            for phase in Phase::ALL {
                runtime.run_phase(phase, ctx);
            }
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    info!("Starting Ember demo host...");

    let catalog = build_catalog();
    let profile = CompositionProfile::load(Path::new("composition.toml"));

    let builder = profile.apply(
        RuntimeBuilder::new(&catalog)
            .select_all_defaults()
            .include_category("game.ai")
            .exclude_name("render::draw_debug_overlays")
            .append_managed(Phase::Simulate, "npc::plan_goals"),
    );

    let mut driver = DemoDriver::default();
    builder
        .build_attached(&mut driver)
        .context("Failed to compose the demo runtime")?;

    let mut store = Store::new();
    store.insert(FrameStats::default());
    let mut ctx = TickContext::with_store(store);

    driver.run_frames(60, &mut ctx);

    let stats = ctx
        .store()
        .get::<FrameStats>()
        .context("frame stats missing from the store")?;
    info!(?stats, frames = ctx.tick(), "demo finished");
    Ok(())
}
