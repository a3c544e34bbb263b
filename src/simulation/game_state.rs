//! Per-round board state and the iteration algorithm
//!
//! A game state owns an arena of cars for one round. Queues on the board hold
//! arena slots, so copying a neighbourhood for lookahead is a plain clone that
//! shares nothing with the live round or its protocol.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::board::{Board, CarSlot, CostBoard};
use super::car::{ConflictView, SimCar};
use super::config::SimConfig;
use super::context::SimContext;
use super::error::{Result, SimError};
use super::grid;
use super::protocol::{Conflict, Protocol};
use super::trips::TripGenerator;
use super::types::{CarId, Position};

/// Board dimensions and the per-iteration cost of high-priority cars
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardParams {
    pub width: i32,
    pub height: i32,
    pub high_cost: f64,
}

impl BoardParams {
    pub fn new(width: i32, height: i32, high_cost: f64) -> Self {
        Self {
            width,
            height,
            high_cost,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.width(), config.height(), config.high_cost)
    }
}

/// Outcome imposed on every conflict a position takes part in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Forced {
    Win(Position),
    Lose(Position),
}

#[derive(Debug, Clone)]
pub struct GameState {
    params: BoardParams,
    cars: Vec<SimCar>,
    board: Board,
    cost_board: CostBoard,
    /// Slots of cars still traveling at the start of the last iteration
    active: Vec<CarSlot>,
    arrived: Vec<CarSlot>,
    /// (winning position, position its head car moved to) for the last iteration
    moves: Vec<(Position, Position)>,
    total_cost: f64,
    focal: Option<CarSlot>,
    focal_cost: f64,
    optimal_cost: f64,
    num_travelling: usize,
    iteration: usize,
}

impl GameState {
    /// Starts a round: hands every car a fresh trip and places it on the board
    ///
    /// Car order is shuffled each round. Protocols with fixed per-round
    /// actions collect them here.
    pub fn new_round(
        params: BoardParams,
        round_id: usize,
        mut cars: Vec<SimCar>,
        focal_car: Option<CarId>,
        protocol: &mut Protocol,
        trips: &mut dyn TripGenerator,
        ctx: &mut SimContext,
    ) -> Result<Self> {
        ctx.shuffle(&mut cars);
        for car in cars.iter_mut() {
            let trip = trips.next_car_trip(round_id, car.id, ctx)?;
            trip.validate(car.id, params.width, params.height)?;
            car.init_trip(trip);
        }

        let mut game = Self::from_cars(params, cars)?;
        game.focal = focal_car.and_then(|id| game.cars.iter().position(|car| car.id == id));

        if protocol.fixed_actions_per_round() {
            protocol.init_round(round_id);
            for car in &game.cars {
                let eligible = protocol.can_bid_high(car.id)?;
                let action = car.action(eligible, &ConflictView::solo(car.position), ctx);
                protocol.set_car_round_action(car.id, action)?;
            }
        }

        Ok(game)
    }

    /// Builds a state from cars that already carry their trip
    pub fn from_cars(params: BoardParams, cars: Vec<SimCar>) -> Result<Self> {
        let mut board = Board::new(params.width, params.height);
        let mut cost_board = CostBoard::new(params.width, params.height);
        let mut active = Vec::with_capacity(cars.len());
        let mut arrived = Vec::new();

        for (slot, car) in cars.iter().enumerate() {
            if car.has_arrived() {
                arrived.push(slot);
                continue;
            }
            if !board.enqueue(car.position, slot) {
                return Err(SimError::MalformedRoute {
                    car_id: car.id,
                    reason: format!("position {} is off the board", car.position),
                });
            }
            if let Some(cost) = cost_board.get_mut(car.position) {
                *cost += car.cost(params.high_cost);
            }
            active.push(slot);
        }

        let optimal_cost = cars.iter().map(|car| car.lower_bound_cost(params.high_cost)).sum();
        let num_travelling = active.len();

        Ok(Self {
            params,
            cars,
            board,
            cost_board,
            active,
            arrived,
            moves: Vec::new(),
            total_cost: 0.0,
            focal: None,
            focal_cost: 0.0,
            optimal_cost,
            num_travelling,
            iteration: 0,
        })
    }

    /// Runs one iteration of the round
    pub fn update_state(&mut self, protocol: &mut Protocol, ctx: &mut SimContext) -> Result<()> {
        self.step(protocol, ctx, None)?;
        debug!(
            "iteration {}: {} moves, {} cars travelling, total cost {:.1}",
            self.iteration,
            self.moves.len(),
            self.num_travelling,
            self.total_cost
        );
        Ok(())
    }

    pub(crate) fn step(&mut self, protocol: &mut Protocol, ctx: &mut SimContext, forced: Option<Forced>) -> Result<()> {
        let high_cost = self.params.high_cost;

        // Charge every car still on the road
        let cars = &self.cars;
        self.active.retain(|&slot| !cars[slot].has_arrived());
        for &slot in &self.active {
            self.total_cost += self.cars[slot].cost(high_cost);
        }
        if let Some(focal) = self.focal {
            let car = &self.cars[focal];
            if !car.has_arrived() {
                self.focal_cost += car.cost(high_cost);
            }
        }

        // Group cars by the cell they want next
        let mut desired: Vec<Option<Position>> = vec![None; self.cars.len()];
        let mut groups: BTreeMap<Position, Vec<CarSlot>> = BTreeMap::new();
        for &slot in &self.active {
            let next_position = self.cars[slot].next_position()?;
            desired[slot] = Some(next_position);
            groups.entry(next_position).or_default().push(slot);
        }

        let mut win_positions = BTreeSet::new();
        for (next_position, contenders) in &groups {
            let position_0 = self.cars[contenders[0]].position;
            let mut position_1 = None;
            for &slot in contenders {
                let position = self.cars[slot].position;
                if position == position_0 {
                    continue;
                }
                match position_1 {
                    None => position_1 = Some(position),
                    Some(existing) if existing != position => {
                        return Err(SimError::TooManySides(*next_position));
                    }
                    Some(_) => {}
                }
            }

            let count_0 = contenders
                .iter()
                .filter(|&&slot| self.cars[slot].position == position_0)
                .count();
            let view = ConflictView {
                position_0,
                count_0,
                position_1,
                count_1: contenders.len() - count_0,
            };

            let mut actions = Vec::with_capacity(contenders.len());
            let mut actions_0 = Vec::with_capacity(count_0);
            let mut actions_1 = Vec::with_capacity(view.count_1);
            for &slot in contenders {
                let car = &self.cars[slot];
                let action = if protocol.fixed_actions_per_round() {
                    protocol.car_round_action(car.id)?
                } else {
                    let eligible = protocol.can_bid_high(car.id)?;
                    car.action(eligible, &view, ctx)
                };
                actions.push(action);
                if car.position == position_0 {
                    actions_0.push(action);
                } else {
                    actions_1.push(action);
                }
            }

            let conflict = Conflict {
                position_0,
                actions_0: &actions_0,
                position_1,
                actions_1: &actions_1,
            };
            let win_position = match forced {
                Some(Forced::Win(position)) if conflict.involves(position) => Some(position),
                Some(Forced::Lose(position)) if conflict.involves(position) => conflict.opponent(position),
                _ => Some(protocol.win_position(&conflict, self, ctx)?),
            };
            let Some(win_position) = win_position else {
                continue;
            };
            win_positions.insert(win_position);

            for (&slot, &action) in contenders.iter().zip(&actions) {
                let car = &self.cars[slot];
                protocol.update_car_reward(car.id, car.position, win_position, action, &conflict)?;
            }
        }

        // Advance exactly the head car of every winning queue
        self.moves.clear();
        for position in win_positions {
            let slot = self.board.dequeue(position).ok_or(SimError::EmptyQueue(position))?;
            let car = &mut self.cars[slot];
            let next_position = desired[slot].ok_or(SimError::RouteExhausted(car.id))?;
            car.update_position(next_position);

            if car.has_arrived() {
                self.arrived.push(slot);
            } else if !self.board.enqueue(next_position, slot) {
                return Err(SimError::MalformedRoute {
                    car_id: car.id,
                    reason: format!("route leaves the board at {}", next_position),
                });
            }
            self.moves.push((position, next_position));
        }

        self.num_travelling = 0;
        for &slot in &self.active {
            let car = &self.cars[slot];
            if car.has_arrived() {
                continue;
            }
            self.num_travelling += 1;
            if let Some(cost) = self.cost_board.get_mut(car.position) {
                *cost += car.cost(high_cost);
            }
        }
        self.iteration += 1;
        Ok(())
    }

    /// True once every car of the round has arrived
    pub fn is_end(&self) -> bool {
        self.num_travelling == 0
    }

    /// Copy of every queue a `horizon`-step lookahead from `position` can touch
    pub fn neighborhood_copy(&self, position: Position, horizon: usize) -> Result<GameState> {
        if grid::is_intersection(position) {
            return Err(SimError::IntersectionCopy(position));
        }

        let mut cars = Vec::new();
        for nearby in grid::positions_within_distance(position, horizon) {
            if let Some(queue) = self.board.queue(nearby) {
                cars.extend(queue.iter().map(|&slot| self.cars[slot].clone()));
            }
        }
        Self::from_cars(self.params, cars)
    }

    pub fn high_cost(&self) -> f64 {
        self.params.high_cost
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn cost_board(&self) -> &CostBoard {
        &self.cost_board
    }

    pub fn moves(&self) -> &[(Position, Position)] {
        &self.moves
    }

    pub fn cars(&self) -> &[SimCar] {
        &self.cars
    }

    pub fn car(&self, slot: CarSlot) -> &SimCar {
        &self.cars[slot]
    }

    /// Cars queued at `position`, head first
    pub fn queue_cars(&self, position: Position) -> impl Iterator<Item = &SimCar> + '_ {
        self.board
            .queue(position)
            .into_iter()
            .flatten()
            .map(move |&slot| &self.cars[slot])
    }

    pub fn head_slot(&self, position: Position) -> Option<CarSlot> {
        self.board.head(position)
    }

    pub fn queue_len(&self, position: Position) -> usize {
        self.board.queue_len(position)
    }

    /// Per-iteration cost of every car queued at `position`
    pub fn queue_cost(&self, position: Position) -> f64 {
        self.queue_cars(position).map(|car| car.cost(self.params.high_cost)).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Cost accrued by the focal car, if one is tracked
    pub fn focal_cost(&self) -> Option<f64> {
        self.focal.map(|_| self.focal_cost)
    }

    /// Lower bound on the round's cost: every car drives straight through
    pub fn optimal_cost(&self) -> f64 {
        self.optimal_cost
    }

    pub fn competitive_ratio(&self) -> f64 {
        if self.optimal_cost > 0.0 {
            self.total_cost / self.optimal_cost
        } else {
            1.0
        }
    }

    pub fn arrived_count(&self) -> usize {
        self.arrived.len()
    }

    pub fn cars_on_board(&self) -> usize {
        self.board.car_count()
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Hands the roster back once the round is over
    pub fn into_cars(self) -> Vec<SimCar> {
        self.cars
    }
}
