//! Multi-round driver
//!
//! The roster and the protocol live for the whole simulation, so rewards
//! earned in one round decide who may escalate in the next.

use std::fmt;

use log::{info, warn};

use super::car::SimCar;
use super::config::SimConfig;
use super::context::SimContext;
use super::error::Result;
use super::game_state::{BoardParams, GameState};
use super::protocol::Protocol;
use super::render::IterationObserver;
use super::trips::TripGenerator;
use super::types::CarId;

/// Metrics of one completed round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round_id: usize,
    pub iterations: usize,
    pub total_cost: f64,
    pub optimal_cost: f64,
    pub competitive_ratio: f64,
    /// Ledger total over every car after the round
    pub total_reward: f64,
    pub my_car_cost: Option<f64>,
    pub my_car_reward: Option<f64>,
}

/// Averages over every round of a run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSummary {
    pub num_rounds: usize,
    pub num_cars: usize,
    pub mean_competitive_ratio: f64,
    /// Mean reward per car per round
    pub mean_reward: f64,
    pub my_car_mean_cost: Option<f64>,
    pub my_car_mean_reward: Option<f64>,
}

impl SimulationSummary {
    fn from_reports(reports: &[RoundReport], num_cars: usize) -> Self {
        let num_rounds = reports.len();
        let mean = |values: Vec<f64>| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };

        let mean_competitive_ratio = mean(reports.iter().map(|r| r.competitive_ratio).collect());
        let mean_reward = if num_cars == 0 {
            0.0
        } else {
            mean(reports.iter().map(|r| r.total_reward).collect()) / num_cars as f64
        };
        let my_car_costs: Option<Vec<f64>> = reports.iter().map(|r| r.my_car_cost).collect();
        let my_car_rewards: Option<Vec<f64>> = reports.iter().map(|r| r.my_car_reward).collect();

        Self {
            num_rounds,
            num_cars,
            mean_competitive_ratio,
            mean_reward,
            my_car_mean_cost: my_car_costs.filter(|c| !c.is_empty()).map(mean),
            my_car_mean_reward: my_car_rewards.filter(|r| !r.is_empty()).map(mean),
        }
    }
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MEAN COST: {:.3}\tMEAN REWARD: {:.3}",
            self.mean_competitive_ratio, self.mean_reward
        )?;
        if let (Some(cost), Some(reward)) = (self.my_car_mean_cost, self.my_car_mean_reward) {
            write!(f, "\tMY CAR COST: {:.3}\tMY CAR REWARD: {:.3}", cost, reward)?;
        }
        Ok(())
    }
}

pub struct Simulator {
    config: SimConfig,
    protocol: Protocol,
    cars: Vec<SimCar>,
    my_car: Option<CarId>,
    trips: Box<dyn TripGenerator>,
    ctx: SimContext,
    observers: Vec<Box<dyn IterationObserver>>,
    reports: Vec<RoundReport>,
}

impl Simulator {
    /// Builds a simulator whose randomness comes from the configured seed
    pub fn new(config: SimConfig, trips: Box<dyn TripGenerator>) -> Result<Self> {
        let ctx = SimContext::new(config.seed, config.verbosity);
        Self::with_context(config, trips, ctx)
    }

    pub fn with_context(config: SimConfig, trips: Box<dyn TripGenerator>, mut ctx: SimContext) -> Result<Self> {
        config.validate()?;
        let protocol = Protocol::new(&config, &mut ctx)?;

        let my_car = config.my_car_id().map(CarId);
        let cars = (0..config.num_cars)
            .map(|id| {
                let kind = match config.my_car_kind {
                    Some(kind) if my_car == Some(CarId(id)) => kind,
                    _ => config.car_kind,
                };
                SimCar::new(CarId(id), kind)
            })
            .collect();

        info!("simulator created: {}", config);
        Ok(Self {
            config,
            protocol,
            cars,
            my_car,
            trips,
            ctx,
            observers: Vec::new(),
            reports: Vec::new(),
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn IterationObserver>) {
        self.observers.push(observer);
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn cars(&self) -> &[SimCar] {
        &self.cars
    }

    pub fn reports(&self) -> &[RoundReport] {
        &self.reports
    }

    /// Runs every configured round and averages the per-round metrics
    pub fn run(&mut self) -> Result<SimulationSummary> {
        if self.config.num_rounds == 0 || self.config.num_cars == 0 {
            warn!(
                "nothing to simulate ({} rounds, {} cars)",
                self.config.num_rounds, self.config.num_cars
            );
        }

        for round_id in 0..self.config.num_rounds {
            let report = self.run_round(round_id)?;
            self.reports.push(report);
        }

        let summary = SimulationSummary::from_reports(&self.reports, self.config.num_cars);
        info!("CONFIGURATION: {}", self.config);
        info!("{}", summary);
        Ok(summary)
    }

    /// Plays one round until every car has arrived
    pub fn run_round(&mut self, round_id: usize) -> Result<RoundReport> {
        let cars = std::mem::take(&mut self.cars);
        let mut game = GameState::new_round(
            BoardParams::from_config(&self.config),
            round_id,
            cars,
            self.my_car,
            &mut self.protocol,
            self.trips.as_mut(),
            &mut self.ctx,
        )?;
        for observer in self.observers.iter_mut() {
            observer.round_started(round_id, &game);
        }

        let mut iteration_id = 0;
        while !game.is_end() {
            game.update_state(&mut self.protocol, &mut self.ctx)?;
            iteration_id += 1;
            for observer in self.observers.iter_mut() {
                observer.iteration_finished(round_id, iteration_id, &game);
            }
        }
        for observer in self.observers.iter_mut() {
            observer.round_finished(round_id, &game);
        }

        if game.optimal_cost() == 0.0 {
            warn!("round {}: lower bound cost is zero, competitive ratio reported as 1", round_id);
        }
        let my_car_reward = match self.my_car {
            Some(car_id) => Some(self.protocol.car_reward(car_id)?),
            None => None,
        };
        let report = RoundReport {
            round_id,
            iterations: iteration_id,
            total_cost: game.total_cost(),
            optimal_cost: game.optimal_cost(),
            competitive_ratio: game.competitive_ratio(),
            total_reward: self.protocol.total_reward(self.config.num_cars),
            my_car_cost: game.focal_cost(),
            my_car_reward,
        };

        info!(
            "Round {}\tTotal reward = {:.3}\tTotal cost = {:.3} (ratio {:.3})",
            round_id, report.total_reward, report.total_cost, report.competitive_ratio
        );
        if let (Some(cost), Some(reward)) = (report.my_car_cost, report.my_car_reward) {
            info!("\tMy car reward = {:.3}\tMy car cost = {:.3}", reward, cost);
        }

        self.cars = game.into_cars();
        Ok(report)
    }
}
