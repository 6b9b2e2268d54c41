#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-entity movement state machine driving paths across the map.
//!
//! A [`Pathfindable`] owns one entity's navigation state: its world position,
//! the waypoints it is consuming, and the occupancy reservations it holds on
//! the map. The map never references the entity back; it only sees the opaque
//! [`EntityId`] in its occupancy index.
//!
//! Occupancy transfers tile by tile: the next waypoint is claimed before the
//! entity steps toward it and the previous tile is released the moment the
//! waypoint is reached, so other entities can route through vacated tiles
//! immediately instead of waiting for the whole path to finish.

use gridpath_core::{EntityId, Event, GridDimensions, TileCoord};
use gridpath_map::{query, Map};

/// Re-search attempts allowed per destination before giving up.
const MAX_REPLANS: u32 = 3;

/// Ring radius searched for a reachable stand-in when the goal itself
/// cannot be entered.
const FALLBACK_RADIUS: u32 = 3;

/// Distance under which a waypoint counts as reached, in world units.
const ARRIVAL_EPSILON: f64 = 1e-6;

/// Observable navigation state of an entity.
///
/// `Arrived` and `Blocked` are terminal outcomes of one journey; they decay
/// to `Idle` at the start of the next update so observers see them for
/// exactly one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathState {
    /// No destination is being pursued.
    Idle,
    /// The entity is consuming waypoints toward its destination.
    Moving,
    /// The entity reached the final waypoint last tick.
    Arrived,
    /// The entity abandoned its path after repeated re-routes last tick.
    Blocked,
}

/// Movement state machine for a single entity.
#[derive(Debug)]
pub struct Pathfindable {
    entity: EntityId,
    speed: f64,
    diagonal: bool,
    state: PathState,
    position: (f64, f64),
    tile: TileCoord,
    claimed: Option<TileCoord>,
    path: Vec<TileCoord>,
    index: usize,
    destination: Option<TileCoord>,
    replans: u32,
}

impl Pathfindable {
    /// Places a new entity on the map, reserving its starting tile.
    ///
    /// Returns `None` when the starting tile cannot be entered; nothing is
    /// reserved in that case.
    pub fn spawn(
        map: &mut Map,
        entity: EntityId,
        at: TileCoord,
        speed: f64,
        diagonal: bool,
    ) -> Option<Self> {
        if map.is_blocked(at, Some(entity)) {
            return None;
        }
        map.occupy(entity, &[at]);
        Some(Self {
            entity,
            speed,
            diagonal,
            state: PathState::Idle,
            position: tile_center(query::dimensions(map), at),
            tile: at,
            claimed: None,
            path: Vec::new(),
            index: 0,
            destination: None,
            replans: 0,
        })
    }

    /// Identifier under which the entity reserves tiles.
    #[must_use]
    pub const fn entity(&self) -> EntityId {
        self.entity
    }

    /// Current navigation state.
    #[must_use]
    pub const fn state(&self) -> PathState {
        self.state
    }

    /// Tile the entity currently occupies.
    #[must_use]
    pub const fn tile(&self) -> TileCoord {
        self.tile
    }

    /// World position of the entity's center.
    #[must_use]
    pub const fn position(&self) -> (f64, f64) {
        self.position
    }

    /// Remaining waypoints of the active path, for renderers.
    #[must_use]
    pub fn path(&self) -> &[TileCoord] {
        &self.path[self.index.min(self.path.len())..]
    }

    /// Requests a route to the provided goal tile.
    ///
    /// When the goal itself cannot be entered, a free tile ring around it is
    /// searched for a reachable stand-in. On failure the entity stays idle
    /// and [`Event::DestinationUnreachable`] is emitted; `false` is returned.
    pub fn set_destination(&mut self, map: &mut Map, goal: TileCoord, out: &mut Vec<Event>) -> bool {
        self.abandon_claim(map);
        self.path.clear();
        self.index = 0;
        self.replans = 0;
        self.destination = None;

        if goal == self.tile {
            self.state = PathState::Arrived;
            out.push(Event::DestinationReached {
                entity: self.entity,
                at: self.tile,
            });
            return true;
        }

        let target = self.select_target(map, goal);
        let path = target.and_then(|target| {
            map.compute_path(self.entity, self.tile, target, self.diagonal)
        });

        match (target, path) {
            (Some(target), Some(path)) if path.is_empty() => {
                debug_assert_eq!(target, self.tile);
                self.state = PathState::Arrived;
                out.push(Event::DestinationReached {
                    entity: self.entity,
                    at: self.tile,
                });
                true
            }
            (Some(target), Some(path)) => {
                out.push(Event::PathAssigned {
                    entity: self.entity,
                    goal: target,
                    length: path.len(),
                });
                self.path = path;
                self.destination = Some(target);
                self.state = PathState::Moving;
                true
            }
            _ => {
                self.state = PathState::Idle;
                out.push(Event::DestinationUnreachable {
                    entity: self.entity,
                    goal,
                });
                false
            }
        }
    }

    /// Advances the entity toward its next waypoint.
    ///
    /// `extrp` is the elapsed time in seconds; the entity covers at most
    /// `speed * extrp` world units. Waypoints that became blocked since the
    /// path was computed trigger a local re-search to the unchanged
    /// destination, capped at a small number of attempts per destination.
    pub fn update(&mut self, map: &mut Map, extrp: f64, out: &mut Vec<Event>) {
        if matches!(self.state, PathState::Arrived | PathState::Blocked) {
            self.state = PathState::Idle;
        }
        if self.state != PathState::Moving {
            return;
        }

        let dimensions = query::dimensions(map);
        let mut budget = self.speed * extrp;

        while budget > ARRIVAL_EPSILON {
            let Some(waypoint) = self.path.get(self.index).copied() else {
                self.finish(out);
                return;
            };

            if self.claimed != Some(waypoint) {
                if map.is_blocked(waypoint, Some(self.entity)) {
                    if !self.replan(map, out) {
                        return;
                    }
                    continue;
                }
                map.occupy(self.entity, &[waypoint]);
                self.claimed = Some(waypoint);
            }

            let target = tile_center(dimensions, waypoint);
            let dx = target.0 - self.position.0;
            let dy = target.1 - self.position.1;
            let distance = (dx * dx + dy * dy).sqrt();

            if distance <= budget + ARRIVAL_EPSILON {
                self.position = target;
                budget -= distance;
                self.arrive_at(map, waypoint, out);
                if self.state != PathState::Moving {
                    return;
                }
            } else {
                self.position.0 += dx / distance * budget;
                self.position.1 += dy / distance * budget;
                return;
            }
        }
    }

    /// Moves the entity instantly to the provided tile.
    ///
    /// The active path is dropped and occupancy transfers transactionally:
    /// either the entity ends up reserving exactly the new tile, or (when
    /// the tile cannot be entered) nothing changes and `false` is returned.
    pub fn teleport(&mut self, map: &mut Map, to: TileCoord) -> bool {
        if to != self.tile && map.is_blocked(to, Some(self.entity)) {
            return false;
        }

        self.abandon_claim(map);
        self.path.clear();
        self.index = 0;
        self.destination = None;
        self.state = PathState::Idle;

        if to != self.tile {
            map.occupy(self.entity, &[to]);
            map.release(self.entity, &[self.tile]);
            self.tile = to;
        }
        self.position = tile_center(query::dimensions(map), to);
        true
    }

    /// Removes the entity from the map, releasing every reservation it holds.
    pub fn despawn(mut self, map: &mut Map) {
        self.abandon_claim(map);
        map.release(self.entity, &[self.tile]);
    }

    fn select_target(&self, map: &Map, goal: TileCoord) -> Option<TileCoord> {
        if !map.is_blocked(goal, Some(self.entity)) {
            return Some(goal);
        }
        map.free_tile_around(self.entity, goal, 1, 1, FALLBACK_RADIUS)
    }

    fn arrive_at(&mut self, map: &mut Map, waypoint: TileCoord, out: &mut Vec<Event>) {
        map.release(self.entity, &[self.tile]);
        out.push(Event::EntityMoved {
            entity: self.entity,
            from: self.tile,
            to: waypoint,
        });
        self.tile = waypoint;
        self.claimed = None;
        self.index += 1;

        if self.index >= self.path.len() {
            self.finish(out);
        }
    }

    fn finish(&mut self, out: &mut Vec<Event>) {
        self.state = PathState::Arrived;
        self.destination = None;
        out.push(Event::DestinationReached {
            entity: self.entity,
            at: self.tile,
        });
    }

    fn replan(&mut self, map: &mut Map, out: &mut Vec<Event>) -> bool {
        self.replans += 1;
        let rerouted = if self.replans > MAX_REPLANS {
            None
        } else {
            self.destination.and_then(|destination| {
                map.compute_path(self.entity, self.tile, destination, self.diagonal)
            })
        };

        match rerouted {
            Some(path) if !path.is_empty() => {
                self.path = path;
                self.index = 0;
                true
            }
            Some(_) => {
                // Empty route: the entity already stands on the destination.
                self.finish(out);
                false
            }
            None => {
                self.state = PathState::Blocked;
                self.destination = None;
                self.path.clear();
                self.index = 0;
                out.push(Event::PathBlocked {
                    entity: self.entity,
                    at: self.tile,
                });
                false
            }
        }
    }

    fn abandon_claim(&mut self, map: &mut Map) {
        if let Some(claimed) = self.claimed.take() {
            map.release(self.entity, &[claimed]);
        }
    }
}

fn tile_center(dimensions: GridDimensions, tile: TileCoord) -> (f64, f64) {
    (
        (f64::from(tile.column()) + 0.5) * f64::from(dimensions.tile_width()),
        (f64::from(tile.row()) + 0.5) * f64::from(dimensions.tile_height()),
    )
}
