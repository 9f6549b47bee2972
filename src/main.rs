//! Island Raid entry point
//!
//! Headless native host: runs one spawn to completion and logs what the render
//! sampler sees.

#[cfg(not(target_arch = "wasm32"))]
mod host {
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    use crossbeam_channel::RecvTimeoutError;
    use island_raid::backdrop::{self, FileBackdrop};
    use island_raid::sim::BoardPhase;
    use island_raid::{RenderFrame, RenderSink, Settings, SimResult, Simulation};

    /// Upper bound on a run
    const RUN_LIMIT: Duration = Duration::from_secs(120);
    /// Log one frame summary every this many frames
    const FRAME_LOG_INTERVAL: u64 = 1000;
    /// Width added by the resize delivered mid-run
    const RESIZE_GROWTH: f32 = 100.0;

    struct LogSink {
        frames: u64,
    }

    impl RenderSink for LogSink {
        fn present(&mut self, frame: &RenderFrame) {
            self.frames += 1;
            if self.frames % FRAME_LOG_INTERVAL != 0 {
                return;
            }
            let boards: Vec<String> = frame
                .boards
                .iter()
                .map(|b| format!("#{} ({:.0}, {:.0})", b.id, b.hull.origin.x, b.hull.origin.y))
                .collect();
            log::debug!(
                "Frame {}: arena {:.0}x{:.0}, boards [{}]",
                frame.sequence,
                frame.arena.size.x,
                frame.arena.size.y,
                boards.join(", ")
            );
        }
    }

    fn load_settings() -> Settings {
        let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
            log::info!("No settings file given, using defaults");
            return Settings::default();
        };
        match Settings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Could not load {}: {}; using defaults", path.display(), e);
                Settings::default()
            }
        }
    }

    pub fn run() -> SimResult<()> {
        let settings = load_settings();
        if let Some(path) = &settings.backdrop_path {
            backdrop::load_once(&FileBackdrop(path.clone()));
        }

        let mut sim = Simulation::new(&settings)?;
        sim.start_render(Box::new(LogSink { frames: 0 }))?;
        sim.spawn(&mut settings.sampler())?;

        let started = Instant::now();
        let mut resized = false;
        while !sim.is_settled() {
            if started.elapsed() > RUN_LIMIT {
                log::warn!("Run limit reached before every board returned");
                break;
            }
            match sim.tick_events().recv_timeout(Duration::from_millis(100)) {
                Ok(tick) if !resized && tick.phase == BoardPhase::InboundStarted => {
                    // First board heading home: the host window grows
                    resized = true;
                    let size = sim.arena().size();
                    sim.on_arena_resize(size.x + RESIZE_GROWTH, size.y)?;
                }
                Ok(_) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let frames = sim.stop_render();
        for board in sim.boards() {
            log::info!(
                "Board {} ended at {:?} ({:?})",
                board.id(),
                board.position(),
                board.phase()
            );
        }
        log::info!(
            "Run finished in {:.2?} with {} frames sampled",
            started.elapsed(),
            frames
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Island Raid (native) starting...");

    if let Err(e) = host::run() {
        log::error!("Simulation failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No browser host
}
