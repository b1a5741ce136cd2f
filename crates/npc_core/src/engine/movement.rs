//! Per-actor movement handler.
//!
//! Wraps routed (navigation-mesh) movement and raw kinematic placement behind
//! one small surface: set destination, poll arrival, warp, stop, rotate
//! toward. Arrival is latched so the runner can deliver its arrival callback
//! exactly once per destination; the latch re-arms on the next
//! `set_destination` or `warp`.

use log::debug;
use nalgebra::{Point3, UnitQuaternion};

use crate::engine::nav::Navigator;
use crate::engine::types::{Transform, ARRIVAL_EPSILON};

#[derive(Debug, Default)]
pub struct MovementHandler {
    route: Vec<Point3<f32>>,
    next_index: usize,
    destination: Option<Point3<f32>>,
    speed: f32,
    arrival_reported: bool,
}

impl MovementHandler {
    pub fn new(speed: f32) -> Self {
        Self { speed, ..Default::default() }
    }

    /// Ask the navigator for a route and start walking it. Returns false when
    /// no route exists; the handler is left stopped in that case.
    pub fn set_destination(
        &mut self,
        from: Point3<f32>,
        to: Point3<f32>,
        nav: &dyn Navigator,
    ) -> bool {
        match nav.route(from, to) {
            Some(route) => {
                self.route = route;
                self.next_index = 0;
                self.destination = Some(to);
                self.arrival_reported = false;
                true
            }
            None => {
                debug!("no route from {from:?} to {to:?}");
                self.stop();
                false
            }
        }
    }

    /// Raw kinematic placement; clears any in-flight route.
    pub fn warp(&mut self, transform: &mut Transform, target: Transform) {
        *transform = target;
        self.stop();
        self.arrival_reported = false;
    }

    /// Raw kinematic placement: position and facing only, any in-flight
    /// route keeps going from the new position.
    pub fn set_position_and_rotation(
        &self,
        transform: &mut Transform,
        position: Point3<f32>,
        rotation: UnitQuaternion<f32>,
    ) {
        transform.position = position;
        transform.rotation = rotation;
    }

    pub fn stop(&mut self) {
        self.route.clear();
        self.next_index = 0;
        self.destination = None;
    }

    pub fn is_moving(&self) -> bool {
        self.destination.is_some() && self.next_index < self.route.len()
    }

    pub fn destination(&self) -> Option<Point3<f32>> {
        self.destination
    }

    pub fn is_at_destination(&self, transform: &Transform) -> bool {
        match self.destination {
            Some(dest) => {
                self.next_index >= self.route.len()
                    && transform.distance_to(dest) <= ARRIVAL_EPSILON
            }
            None => false,
        }
    }

    /// True exactly once per arrival. Re-armed by `set_destination`/`warp`.
    pub fn poll_arrival(&mut self, transform: &Transform) -> bool {
        if self.arrival_reported || !self.is_at_destination(transform) {
            return false;
        }
        self.arrival_reported = true;
        true
    }

    pub fn rotate_toward(&self, transform: &mut Transform, target: Point3<f32>) {
        transform.face_toward(target);
    }

    /// Advance along the current route. Called once per tick by the world.
    pub fn tick(&mut self, transform: &mut Transform, dt: f32) {
        if self.destination.is_none() {
            return;
        }
        let mut budget = self.speed * dt;
        while budget > 0.0 {
            let Some(&next) = self.route.get(self.next_index) else {
                break;
            };
            transform.face_toward(next);
            let before = transform.distance_to(next);
            if transform.move_toward(next, budget) {
                budget -= before;
                self.next_index += 1;
            } else {
                break;
            }
        }
    }
}
