//! Shield Push headless runner
//!
//! Plays one scripted round natively and logs what happens. Usage:
//!
//! ```text
//! shield-push [config.json] [seed]
//! ```

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use glam::Vec2;
    use shield_push::SimConfig;
    use shield_push::config::ViewportSizing;
    use shield_push::consts::TICKS_PER_SECOND;
    use shield_push::sim::{GamePhase, ObserverError, SimEvent, Simulation};

    env_logger::init();
    log::info!("Shield Push (native) starting...");

    let mut args = std::env::args().skip(1);
    let (width, height) = (1280.0, 720.0);
    let config = match args.next() {
        Some(path) => SimConfig::load(&path).unwrap_or_else(|e| {
            log::error!("{}; using defaults", e);
            SimConfig::default()
        }),
        None => SimConfig::for_viewport(width, height),
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(12345);

    let mut sim = Simulation::new(config, seed);
    sim.observers.subscribe(|event: &SimEvent| -> Result<(), ObserverError> {
        if event.is_terminal() {
            log::info!("Round over: {:?}", event);
        }
        Ok(())
    });
    let field = ViewportSizing::for_viewport(width, height).playfield_rect(width, height);
    sim.assign_region(field.x, field.y, field.width, field.height);
    sim.begin();

    // Both agents charge at each other; agent 0 boosts after one second
    let max_ticks = TICKS_PER_SECOND * 60;
    for t in 0..max_ticks {
        let agents = sim.state.agent_ids();
        let positions: Vec<Vec2> = agents
            .iter()
            .filter_map(|&id| sim.state.body(id).map(|b| b.pos))
            .collect();
        if let [a, b] = positions[..] {
            sim.input.set_direction(0, (b - a).normalize_or_zero());
            sim.input.set_direction(1, (a - b).normalize_or_zero());
        }
        if t == TICKS_PER_SECOND {
            sim.boost(0);
        }

        for event in sim.step() {
            log::debug!("tick {}: {:?}", sim.state.time_ticks, event);
        }
        if sim.state.phase == GamePhase::GameOver {
            break;
        }
    }

    for agent in sim.state.agents() {
        log::info!(
            "Agent {} recoil {:.2}",
            agent.id,
            agent.recoil_accumulator()
        );
    }
    match sim.state.snapshot().to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Snapshot failed: {}", e),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Embedders drive `Simulation` directly on the web
}
