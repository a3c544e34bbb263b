//! Round engine tests
//!
//! Checks queue movement, cost accounting, route validation and rendering
//! through the public simulation API

use std::cell::Cell;
use std::rc::Rc;

use traffic_auction::simulation::{
    render_board, BoardParams, CarId, CarKind, Direction, GameState, IterationObserver, Leg, Position, Priority,
    Protocol, ProtocolKind, RandomTrips, RouteStyle, ScriptedTrips, SimConfig, SimContext, SimError, SimCar,
    Simulator, Trip,
};

fn placed_car(id: usize, trip: Trip) -> SimCar {
    let mut car = SimCar::new(CarId(id), CarKind::Truthful);
    car.init_trip(trip);
    car
}

fn crossing_trip(origin: Position, direction: Direction, steps: u32) -> Trip {
    let destination = origin.offset(direction, steps as i32);
    Trip::new(origin, destination, vec![Leg::new(direction, steps)], Priority::Low)
}

fn small_config(protocol: ProtocolKind, num_cars: usize, num_roads: usize) -> SimConfig {
    SimConfig {
        protocol,
        num_cars,
        num_roads,
        num_rounds: 1,
        seed: Some(7),
        ..SimConfig::default()
    }
}

/// Asserts board + arrived == roster after every iteration and counts iterations
struct ConservationCheck {
    iterations: Rc<Cell<usize>>,
}

impl IterationObserver for ConservationCheck {
    fn round_started(&mut self, _round_id: usize, game: &GameState) {
        assert_eq!(game.cars_on_board() + game.arrived_count(), game.cars().len());
    }

    fn iteration_finished(&mut self, _round_id: usize, _iteration_id: usize, game: &GameState) {
        assert_eq!(game.cars_on_board() + game.arrived_count(), game.cars().len());
        assert!(game.moves().len() <= game.cars().len());
        self.iterations.set(self.iterations.get() + 1);
    }
}

#[test]
fn test_two_car_conflict_costs_one_extra_iteration() {
    let trips = ScriptedTrips::parse("2\n1\nleft 1 0\ntop 1 0\n").unwrap();
    let config = small_config(ProtocolKind::Random, 2, 1);
    let mut simulator = Simulator::new(config, Box::new(trips)).unwrap();

    let summary = simulator.run().unwrap();
    let report = &simulator.reports()[0];

    assert_eq!(report.iterations, 3);
    assert_eq!(report.optimal_cost, 4.0);
    assert_eq!(report.total_cost, 5.0);
    assert_eq!(report.competitive_ratio, 1.25);
    assert_eq!(summary.mean_competitive_ratio, 1.25);
    assert_eq!(summary.mean_reward, 0.0);
}

#[test]
fn test_loser_waits_behind_the_intersection() {
    let params = BoardParams::new(3, 3, 3.0);
    let cars = vec![
        placed_car(0, crossing_trip(Position::new(0, 1), Direction::Right, 2)),
        placed_car(1, crossing_trip(Position::new(1, 0), Direction::Down, 2)),
    ];
    let mut game = GameState::from_cars(params, cars).unwrap();
    let config = small_config(ProtocolKind::Random, 2, 1);
    let mut ctx = SimContext::seeded(11);
    let mut protocol = Protocol::new(&config, &mut ctx).unwrap();

    game.update_state(&mut protocol, &mut ctx).unwrap();

    assert_eq!(game.moves().len(), 1);
    let (winner, next) = game.moves()[0];
    assert_eq!(next, Position::new(1, 1));
    let loser = if winner == Position::new(0, 1) {
        Position::new(1, 0)
    } else {
        Position::new(0, 1)
    };
    assert_eq!(game.queue_len(loser), 1);
    assert_eq!(game.queue_len(winner), 0);
    assert_eq!(game.total_cost(), 2.0);

    while !game.is_end() {
        game.update_state(&mut protocol, &mut ctx).unwrap();
    }
    assert_eq!(game.arrived_count(), 2);
    assert_eq!(game.cars_on_board(), 0);
    assert_eq!(game.total_cost(), 5.0);
}

#[test]
fn test_queue_is_served_in_arrival_order() {
    let params = BoardParams::new(3, 3, 3.0);
    let cars = (0..3)
        .map(|id| placed_car(id, crossing_trip(Position::new(0, 1), Direction::Right, 2)))
        .collect();
    let mut game = GameState::from_cars(params, cars).unwrap();
    let config = small_config(ProtocolKind::Random, 3, 1);
    let mut ctx = SimContext::seeded(3);
    let mut protocol = Protocol::new(&config, &mut ctx).unwrap();

    game.update_state(&mut protocol, &mut ctx).unwrap();
    let ids = |game: &GameState, position| game.queue_cars(position).map(|car| car.id).collect::<Vec<_>>();
    assert_eq!(ids(&game, Position::new(1, 1)), vec![CarId(0)]);
    assert_eq!(ids(&game, Position::new(0, 1)), vec![CarId(1), CarId(2)]);

    game.update_state(&mut protocol, &mut ctx).unwrap();
    assert_eq!(ids(&game, Position::new(1, 1)), vec![CarId(1)]);
    assert_eq!(ids(&game, Position::new(0, 1)), vec![CarId(2)]);
    assert_eq!(game.arrived_count(), 1);
}

#[test]
fn test_cars_are_conserved_every_iteration() {
    for protocol in [
        ProtocolKind::Random,
        ProtocolKind::Vcg,
        ProtocolKind::Button,
        ProtocolKind::Optimal(1),
        ProtocolKind::Optimal(2),
        ProtocolKind::OptimalRandom,
    ] {
        let config = SimConfig {
            protocol,
            car_kind: CarKind::StatisticallyAggressive,
            num_cars: 30,
            num_roads: 3,
            num_rounds: 2,
            high_priority_probability: 0.25,
            seed: Some(5),
            ..SimConfig::default()
        };
        let trips = RandomTrips::new(config.width(), config.height(), 0.25, config.seed)
            .with_style(RouteStyle::Turning);
        let iterations = Rc::new(Cell::new(0));
        let mut simulator = Simulator::new(config, Box::new(trips)).unwrap();
        simulator.add_observer(Box::new(ConservationCheck {
            iterations: Rc::clone(&iterations),
        }));

        let summary = simulator.run().unwrap();
        assert_eq!(summary.num_rounds, 2);
        assert!(summary.mean_competitive_ratio >= 1.0, "{}: {}", protocol, summary);
        let reported: usize = simulator.reports().iter().map(|r| r.iterations).sum();
        assert_eq!(iterations.get(), reported);
    }
}

#[test]
fn test_same_seed_reproduces_the_run() {
    let run = || {
        let config = SimConfig {
            protocol: ProtocolKind::OptimalRandom,
            car_kind: CarKind::Random,
            num_cars: 40,
            num_roads: 3,
            num_rounds: 3,
            seed: Some(42),
            ..SimConfig::default()
        };
        let trips = RandomTrips::new(config.width(), config.height(), config.high_priority_probability, config.seed);
        let mut simulator = Simulator::new(config, Box::new(trips)).unwrap();
        simulator.run().unwrap();
        simulator.reports().to_vec()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_focal_car_is_reported() {
    let config = SimConfig {
        protocol: ProtocolKind::Vcg,
        my_car_kind: Some(CarKind::Aggressive),
        num_cars: 20,
        num_roads: 2,
        num_rounds: 3,
        seed: Some(9),
        ..SimConfig::default()
    };
    let trips = RandomTrips::new(config.width(), config.height(), config.high_priority_probability, config.seed);
    let mut simulator = Simulator::new(config, Box::new(trips)).unwrap();

    let summary = simulator.run().unwrap();
    assert!(summary.my_car_mean_cost.is_some());
    assert!(summary.my_car_mean_reward.is_some());
    assert!(simulator
        .cars()
        .iter()
        .any(|car| car.id == CarId(19) && car.kind == CarKind::Aggressive));
    for report in simulator.reports() {
        assert!(report.my_car_cost.unwrap() > 0.0);
    }
}

#[test]
fn test_malformed_route_aborts_before_the_round() {
    let bad = Trip::new(
        Position::new(0, 1),
        Position::new(2, 1),
        vec![Leg::new(Direction::Right, 1)],
        Priority::Low,
    );
    let config = small_config(ProtocolKind::Random, 1, 1);
    let mut simulator = Simulator::new(config, Box::new(ScriptedTrips::new(1, vec![bad]))).unwrap();

    let err = simulator.run().unwrap_err();
    assert!(matches!(err, SimError::MalformedRoute { car_id: CarId(0), .. }));
    assert!(err.is_configuration());
}

#[test]
fn test_route_leaving_the_board_is_rejected() {
    let trip = crossing_trip(Position::new(0, 1), Direction::Right, 5);
    let err = trip.validate(CarId(4), 3, 3).unwrap_err();
    assert!(matches!(err, SimError::MalformedRoute { car_id: CarId(4), .. }));

    let zero = Trip::new(Position::new(0, 1), Position::new(0, 1), vec![Leg::new(Direction::Right, 0)], Priority::Low);
    assert!(zero.validate(CarId(0), 3, 3).is_err());
}

#[test]
fn test_contra_flow_route_is_a_configuration_error() {
    // y = 1 flows right, so driving left on it is rejected before the round
    let against = crossing_trip(Position::new(2, 1), Direction::Left, 2);
    let err = against.validate(CarId(2), 3, 3).unwrap_err();
    assert!(matches!(err, SimError::MalformedRoute { car_id: CarId(2), .. }));

    let trips = ScriptedTrips::new(
        1,
        vec![
            crossing_trip(Position::new(0, 1), Direction::Right, 2),
            crossing_trip(Position::new(1, 0), Direction::Down, 2),
            against,
        ],
    );
    let mut simulator = Simulator::new(small_config(ProtocolKind::Random, 3, 1), Box::new(trips)).unwrap();
    let err = simulator.run().unwrap_err();
    assert!(matches!(err, SimError::MalformedRoute { car_id: CarId(2), .. }));
    assert!(err.is_configuration());
    assert!(simulator.reports().is_empty());
}

#[test]
fn test_off_road_route_is_rejected() {
    let trip = crossing_trip(Position::new(2, 1), Direction::Down, 2);
    assert!(matches!(
        trip.validate(CarId(0), 3, 3),
        Err(SimError::MalformedRoute { car_id: CarId(0), .. })
    ));

    let parked_off_road = Trip::new(Position::new(2, 2), Position::new(2, 2), Vec::new(), Priority::Low);
    assert!(parked_off_road.validate(CarId(0), 3, 3).is_err());
}

#[test]
fn test_route_around_a_block_is_not_simple() {
    let route = vec![
        Leg::new(Direction::Up, 3),
        Leg::new(Direction::Right, 2),
        Leg::new(Direction::Down, 2),
        Leg::new(Direction::Left, 2),
    ];
    let looping = Trip::new(Position::new(3, 4), Position::new(3, 3), route, Priority::Low);
    let err = looping.validate(CarId(1), 9, 9).unwrap_err();
    assert!(matches!(err, SimError::MalformedRoute { ref reason, .. } if reason.contains("twice")));
}

#[test]
fn test_oversized_leg_is_rejected_without_overflow() {
    let trip = Trip::new(
        Position::new(0, 1),
        Position::new(0, 1),
        vec![Leg::new(Direction::Left, 1 << 31)],
        Priority::Low,
    );
    assert!(matches!(
        trip.validate(CarId(0), 3, 3),
        Err(SimError::MalformedRoute { car_id: CarId(0), .. })
    ));

    let trip = Trip::new(
        Position::new(0, 1),
        Position::new(0, 1),
        vec![Leg::new(Direction::Right, u32::MAX)],
        Priority::Low,
    );
    assert!(trip.validate(CarId(0), 3, 3).is_err());
}

#[test]
fn test_turn_follows_the_street_it_enters() {
    // Down x = 1 into (1, 1), then right along y = 1
    let turning = Trip::new(
        Position::new(1, 0),
        Position::new(4, 1),
        vec![Leg::new(Direction::Down, 1), Leg::new(Direction::Right, 3)],
        Priority::Low,
    );
    assert!(turning.validate(CarId(0), 5, 5).is_ok());

    // y = 3 flows left, so turning right onto it is rejected
    let wrong_way = Trip::new(
        Position::new(1, 0),
        Position::new(4, 3),
        vec![Leg::new(Direction::Down, 3), Leg::new(Direction::Right, 3)],
        Priority::Low,
    );
    assert!(wrong_way.validate(CarId(0), 5, 5).is_err());
}

#[test]
fn test_arrived_car_has_no_next_position() {
    let mut car = placed_car(0, crossing_trip(Position::new(0, 1), Direction::Right, 2));
    assert_eq!(car.next_position().unwrap(), Position::new(1, 1));
    car.update_position(Position::new(1, 1));
    car.update_position(Position::new(2, 1));

    assert!(car.has_arrived());
    assert!(car.route.is_empty());
    assert_eq!(car.next_position().unwrap_err(), SimError::RouteExhausted(CarId(0)));
}

#[test]
fn test_car_starting_at_destination_is_already_arrived() {
    let params = BoardParams::new(3, 3, 3.0);
    let parked = placed_car(0, Trip::new(Position::new(0, 1), Position::new(0, 1), Vec::new(), Priority::High));
    let game = GameState::from_cars(params, vec![parked]).unwrap();

    assert!(game.is_end());
    assert_eq!(game.arrived_count(), 1);
    assert_eq!(game.optimal_cost(), 0.0);
    assert_eq!(game.competitive_ratio(), 1.0);
}

#[test]
fn test_cost_board_accumulates_waiting_cost() {
    let params = BoardParams::new(3, 3, 3.0);
    let mut high = crossing_trip(Position::new(0, 1), Direction::Right, 2);
    high.priority = Priority::High;
    let cars = vec![
        placed_car(0, high.clone()),
        placed_car(1, high),
    ];
    let mut game = GameState::from_cars(params, cars).unwrap();
    assert_eq!(game.cost_board().get(Position::new(0, 1)), Some(&6.0));

    let config = small_config(ProtocolKind::Random, 2, 1);
    let mut ctx = SimContext::seeded(1);
    let mut protocol = Protocol::new(&config, &mut ctx).unwrap();
    game.update_state(&mut protocol, &mut ctx).unwrap();

    assert_eq!(game.cost_board().get(Position::new(0, 1)), Some(&9.0));
    assert_eq!(game.cost_board().get(Position::new(1, 1)), Some(&3.0));
    assert_eq!(game.total_cost(), 6.0);
}

#[test]
fn test_render_board_shows_queues_and_flow() {
    let params = BoardParams::new(3, 3, 3.0);
    let cars = (0..2)
        .map(|id| placed_car(id, crossing_trip(Position::new(0, 1), Direction::Right, 2)))
        .collect();
    let game = GameState::from_cars(params, cars).unwrap();

    let rendered = render_board(&game);
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[1], "    .     ");
    assert_eq!(lines[2], "  2 . . ->");
    assert!(lines[4].contains('v'));
}
