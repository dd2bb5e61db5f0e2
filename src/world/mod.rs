//! World Module
//!
//! A minimal in-memory simulation state. Pedestrians walk in a straight line
//! toward their target; this stands in for a real locomotion model so the
//! server can be run and tested on its own.

mod scenario;

pub use scenario::{parse_scenario, Scenario};

use std::collections::BTreeMap;

use crate::bridge::Simulation;
use crate::error::Result;
use crate::protocol::Vec2;

/// Default pedestrian radius (meters)
pub const DEFAULT_RADIUS: f64 = 0.2;

/// A simulated pedestrian
#[derive(Debug, Clone, PartialEq)]
pub struct Pedestrian {
    pub id: i32,
    pub position: Vec2,
    /// Free-flow speed (m/s)
    pub speed: f64,
    pub target: Vec2,
    pub radius: f64,
    /// Velocity during the last step
    pub velocity: Vec2,
}

impl Pedestrian {
    pub fn new(id: i32, position: Vec2, speed: f64, target: Vec2) -> Self {
        Self {
            id,
            position,
            speed,
            target,
            radius: DEFAULT_RADIUS,
            velocity: Vec2::default(),
        }
    }

    /// Heading in degrees, 0 = north, clockwise
    pub fn angle(&self) -> f64 {
        if self.velocity.length() == 0.0 {
            return 0.0;
        }
        let degrees = self.velocity.x.atan2(self.velocity.y).to_degrees();
        if degrees < 0.0 {
            degrees + 360.0
        } else {
            degrees
        }
    }

    fn walk(&mut self, dt: f64) {
        let remaining = self.position.distance(self.target);
        let reach = self.speed * dt;

        if remaining <= reach || remaining == 0.0 {
            self.velocity = if dt > 0.0 {
                Vec2::new(
                    (self.target.x - self.position.x) / dt,
                    (self.target.y - self.position.y) / dt,
                )
            } else {
                Vec2::default()
            };
            self.position = self.target;
            return;
        }

        let scale = reach / remaining;
        let step = Vec2::new(
            (self.target.x - self.position.x) * scale,
            (self.target.y - self.position.y) * scale,
        );
        self.position = Vec2::new(self.position.x + step.x, self.position.y + step.y);
        self.velocity = Vec2::new(step.x / dt, step.y / dt);
    }
}

/// Simulation state served to remote controllers
#[derive(Debug, Clone)]
pub struct World {
    sim_time: f64,
    step_length: f64,
    pedestrians: BTreeMap<i32, Pedestrian>,
    scenario_name: Option<String>,
}

impl World {
    pub fn new(step_length: f64) -> Self {
        Self {
            sim_time: 0.0,
            step_length,
            pedestrians: BTreeMap::new(),
            scenario_name: None,
        }
    }

    /// Build a world from scenario text
    pub fn from_scenario(name: &str, content: &str, default_step_length: f64) -> Result<Self> {
        let mut world = World::new(default_step_length);
        world.load_scenario(name, content)?;
        Ok(world)
    }

    /// Add or replace a pedestrian
    pub fn add_pedestrian(&mut self, pedestrian: Pedestrian) {
        self.pedestrians.insert(pedestrian.id, pedestrian);
    }

    pub fn pedestrian(&self, id: i32) -> Option<&Pedestrian> {
        self.pedestrians.get(&id)
    }

    pub fn pedestrian_mut(&mut self, id: i32) -> Option<&mut Pedestrian> {
        self.pedestrians.get_mut(&id)
    }

    /// Pedestrians ordered by id
    pub fn pedestrians(&self) -> impl Iterator<Item = &Pedestrian> {
        self.pedestrians.values()
    }

    pub fn pedestrian_count(&self) -> usize {
        self.pedestrians.len()
    }

    pub fn set_step_length(&mut self, seconds: f64) {
        self.step_length = seconds;
    }

    pub fn scenario_name(&self) -> Option<&str> {
        self.scenario_name.as_deref()
    }
}

impl Simulation for World {
    fn step(&mut self) {
        let dt = self.step_length;
        for pedestrian in self.pedestrians.values_mut() {
            pedestrian.walk(dt);
        }
        self.sim_time += dt;
    }

    fn sim_time(&self) -> f64 {
        self.sim_time
    }

    fn step_length(&self) -> f64 {
        self.step_length
    }

    fn load_scenario(&mut self, name: &str, content: &str) -> Result<()> {
        let parsed = parse_scenario(content)?;

        self.sim_time = 0.0;
        if let Some(step_length) = parsed.step_length {
            self.step_length = step_length;
        }
        self.pedestrians = parsed
            .pedestrians
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        self.scenario_name = Some(name.to_string());

        tracing::info!(
            scenario = name,
            pedestrians = self.pedestrians.len(),
            step_length = self.step_length,
            "scenario loaded"
        );
        Ok(())
    }
}
