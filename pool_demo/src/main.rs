//! Headless asteroid field driving the prefab pools
//!
//! Rocks and bullets are spawned from pooled prefabs, drift for a while and
//! are recycled when they expire. Pass a `.toml` or `.ron` pool config path
//! as the first argument to override the defaults.

use prefab_pool::foundation::collections::NodeId;
use prefab_pool::foundation::logging;
use prefab_pool::prelude::*;
use rand::Rng;
use std::error::Error;

const FRAMES: usize = 600;
const FRAME_TIME: f32 = 1.0 / 60.0;
const ROCK_SPAWN_INTERVAL: usize = 6;
const BULLET_SPAWN_INTERVAL: usize = 15;
const ROCK_LIFETIME: f32 = 2.5;
const BULLET_LIFETIME: f32 = 0.75;
const FIELD_EXTENT: f32 = 40.0;
const TRIM_EVERY: usize = 120;
const IDLE_RETAIN: usize = 8;

const ROCK_KEY: &str = "prefabs/asteroid";
const BULLET_KEY: &str = "prefabs/bullet";

/// Prototype data cloned into every instance
#[derive(Debug, Clone)]
struct Body {
    name: &'static str,
    radius: f32,
}

struct Projectile {
    instance: NodeId,
    velocity: Vec3,
    remaining: f32,
}

struct AsteroidField {
    pools: PoolManager<MemoryScene<Body>, MapResolver<Body>>,
    live: Vec<Projectile>,
}

impl AsteroidField {
    fn new(config: PoolConfig) -> Self {
        let resolver = MapResolver::new()
            .with(ROCK_KEY, Body { name: "asteroid", radius: 2.0 })
            .with(BULLET_KEY, Body { name: "bullet", radius: 0.1 });
        let mut pools = PoolManager::with_config(MemoryScene::new(), resolver, config);

        pools.subscribe_instantiate(|scene: &mut MemoryScene<Body>, event: &InstantiateEvent<NodeId>| {
            if let Some(node) = scene.node(event.instance) {
                log::trace!("New {} instance {:?} (radius {})", node.value.name, event.instance, node.value.radius);
            }
        });

        Self {
            pools,
            live: Vec::new(),
        }
    }

    fn initialize(&mut self) -> PoolResult<()> {
        log::info!("Preloading pools...");
        self.pools.preload()?;
        for key in [ROCK_KEY, BULLET_KEY] {
            log::info!("{}: {} idle after preload", key, self.pools.idle_count(key));
        }
        Ok(())
    }

    fn spawn(&mut self, key: &str, speed: f32, lifetime: f32) -> PoolResult<()> {
        let mut rng = rand::thread_rng();
        let position = Vec3::new(
            rng.gen_range(-FIELD_EXTENT..FIELD_EXTENT),
            rng.gen_range(-FIELD_EXTENT..FIELD_EXTENT),
            0.0,
        );
        let heading = rng.gen_range(0.0..std::f32::consts::TAU);
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), heading);
        let velocity = Vec3::new(heading.cos(), heading.sin(), 0.0) * speed;

        let instance = self.pools.spawn(key, &Placement::at(position).with_rotation(rotation))?;
        self.live.push(Projectile {
            instance,
            velocity,
            remaining: lifetime,
        });
        Ok(())
    }

    fn update(&mut self, delta_time: f32) -> PoolResult<usize> {
        let mut expired = Vec::new();
        for projectile in &mut self.live {
            projectile.remaining -= delta_time;
            if projectile.remaining <= 0.0 {
                expired.push(projectile.instance);
            } else if let Some(node) = self.pools.scene_mut().node_mut(projectile.instance) {
                node.pose.position += projectile.velocity * delta_time;
            }
        }

        self.live.retain(|projectile| projectile.remaining > 0.0);
        for instance in &expired {
            self.pools.recycle(*instance)?;
        }
        Ok(expired.len())
    }

    fn report(&self) {
        for key in [ROCK_KEY, BULLET_KEY] {
            if let Some(stats) = self.pools.pool_stats(key) {
                log::info!(
                    "{}: idle {} lent {} | created {} destroyed {} spawned {} recycled {} peak {}",
                    key,
                    self.pools.idle_count(key),
                    self.pools.lent_count(key),
                    stats.created,
                    stats.destroyed,
                    stats.spawned,
                    stats.recycled,
                    stats.peak_lent
                );
            }
        }
    }

    fn shutdown(&mut self) {
        let recycled = self.pools.recycle_all(ROCK_KEY) + self.pools.recycle_all(BULLET_KEY);
        self.live.clear();
        log::info!("Recycled {} live instances on shutdown", recycled);

        self.report();
        self.pools.unload_all();
        log::info!(
            "Scene holds {} nodes after unload ({} instantiated, {} destroyed in total)",
            self.pools.scene().node_count(),
            self.pools.scene().instantiated_count(),
            self.pools.scene().destroyed_count()
        );
    }
}

fn load_config() -> Result<PoolConfig, Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading pool config from {}", path);
            PoolConfig::load_from_file(&path)?
        }
        None => PoolConfig::default()
            .with_auto_load_warning(false)
            .with_preload(ROCK_KEY, 32)
            .with_preload(BULLET_KEY, 16),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    let config = load_config()?;
    let mut field = AsteroidField::new(config);
    field.initialize()?;

    let mut recycled = 0;
    for frame in 1..=FRAMES {
        if frame % ROCK_SPAWN_INTERVAL == 0 {
            field.spawn(ROCK_KEY, 8.0, ROCK_LIFETIME)?;
        }
        if frame % BULLET_SPAWN_INTERVAL == 0 {
            field.spawn(BULLET_KEY, 60.0, BULLET_LIFETIME)?;
        }
        recycled += field.update(FRAME_TIME)?;

        if frame % TRIM_EVERY == 0 {
            let trimmed = field.pools.cleanup(ROCK_KEY, IDLE_RETAIN) + field.pools.cleanup(BULLET_KEY, IDLE_RETAIN);
            log::debug!("Frame {}: trimmed {} idle instances", frame, trimmed);
            field.report();
        }
    }

    log::info!("Simulated {} frames, recycled {} instances", FRAMES, recycled);
    field.shutdown();
    Ok(())
}
