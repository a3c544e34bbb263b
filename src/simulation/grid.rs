//! Street grid geometry
//!
//! The road network is a grid of one-way streets laid over integer cells:
//! - cells with both coordinates odd are intersections
//! - cells with exactly one odd coordinate are road segments
//! - cells with both coordinates even are off-road
//!
//! Vertical streets run on odd x (x % 4 == 1 flows down, x % 4 == 3 flows up).
//! Horizontal streets run on odd y (y % 4 == 1 flows right, y % 4 == 3 flows left).

use std::collections::BTreeSet;

use super::types::{Direction, Position};

fn is_odd(value: i32) -> bool {
    value.rem_euclid(2) == 1
}

pub fn is_intersection(position: Position) -> bool {
    is_odd(position.x) && is_odd(position.y)
}

pub fn is_road(position: Position) -> bool {
    is_odd(position.x) || is_odd(position.y)
}

pub fn in_bounds(position: Position, width: i32, height: i32) -> bool {
    position.x >= 0 && position.y >= 0 && position.x < width && position.y < height
}

/// Flow direction of the street running through `position`
///
/// Intersections report the direction of their vertical street. Off-road
/// cells have none.
pub fn street_direction(position: Position) -> Option<Direction> {
    if is_odd(position.x) {
        if position.x.rem_euclid(4) == 1 {
            Some(Direction::Down)
        } else {
            Some(Direction::Up)
        }
    } else if is_odd(position.y) {
        if position.y.rem_euclid(4) == 1 {
            Some(Direction::Right)
        } else {
            Some(Direction::Left)
        }
    } else {
        None
    }
}

/// Walks `cells` along the street through `position` (negative walks upstream)
pub fn next_along_street(position: Position, cells: i32) -> Option<Position> {
    street_direction(position).map(|direction| position.offset(direction, cells))
}

/// The other segment feeding the intersection just ahead of `position`
pub fn competing_position(position: Position) -> Option<Position> {
    let direction = street_direction(position)?;
    let intersection = position.offset(direction, 1);

    if direction.is_horizontal() {
        // Crossing street is vertical
        if intersection.x.rem_euclid(4) == 1 {
            Some(Position::new(intersection.x, intersection.y - 1))
        } else {
            Some(Position::new(intersection.x, intersection.y + 1))
        }
    } else if intersection.y.rem_euclid(4) == 1 {
        Some(Position::new(intersection.x - 1, intersection.y))
    } else {
        Some(Position::new(intersection.x + 1, intersection.y))
    }
}

/// Every cell a lookahead of `distance` iterations from `position` can touch
///
/// Walks forward along the street, and for each segment reached pulls in the
/// competing queue plus everything upstream of it within the remaining budget.
pub fn positions_within_distance(position: Position, distance: usize) -> BTreeSet<Position> {
    let mut positions = BTreeSet::new();
    for travelled in 0..=distance {
        let Some(current) = next_along_street(position, travelled as i32) else {
            continue;
        };
        positions.insert(current);
        if !is_intersection(current) {
            if let Some(rival) = competing_position(current) {
                add_upstream(rival, travelled as i32, &mut positions);
            }
        }
    }
    positions
}

fn add_upstream(position: Position, distance: i32, positions: &mut BTreeSet<Position>) {
    if !positions.insert(position) {
        return;
    }
    if let Some(rival) = competing_position(position) {
        add_upstream(rival, distance, positions);
    }
    if distance <= 0 {
        return;
    }

    if let Some(previous_intersection) = next_along_street(position, -1) {
        positions.insert(previous_intersection);
    }
    if let Some(previous) = next_along_street(position, -2) {
        add_upstream(previous, distance - 2, positions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_marks_intersections_and_segments() {
        assert!(is_intersection(Position::new(1, 3)));
        assert!(!is_intersection(Position::new(1, 2)));
        assert!(is_road(Position::new(2, 1)));
        assert!(!is_road(Position::new(2, 2)));
    }

    #[test]
    fn streets_alternate_direction() {
        assert_eq!(street_direction(Position::new(1, 0)), Some(Direction::Down));
        assert_eq!(street_direction(Position::new(3, 4)), Some(Direction::Up));
        assert_eq!(street_direction(Position::new(0, 1)), Some(Direction::Right));
        assert_eq!(street_direction(Position::new(4, 3)), Some(Direction::Left));
        assert_eq!(street_direction(Position::new(2, 2)), None);
    }

    #[test]
    fn competing_positions_are_symmetric() {
        let left_feeder = Position::new(0, 1);
        let top_feeder = Position::new(1, 0);
        assert_eq!(competing_position(left_feeder), Some(top_feeder));
        assert_eq!(competing_position(top_feeder), Some(left_feeder));

        let segment = Position::new(2, 1);
        let rival = competing_position(segment).unwrap();
        assert_eq!(rival, Position::new(3, 2));
        assert_eq!(competing_position(rival), Some(segment));
    }

    #[test]
    fn zero_distance_neighbourhood_is_the_conflict_pair() {
        let positions = positions_within_distance(Position::new(0, 1), 0);
        let expected: BTreeSet<_> = [Position::new(0, 1), Position::new(1, 0)].into_iter().collect();
        assert_eq!(positions, expected);
    }

    #[test]
    fn neighbourhood_reaches_the_next_conflict() {
        let positions = positions_within_distance(Position::new(0, 1), 2);
        assert!(positions.contains(&Position::new(1, 1)));
        assert!(positions.contains(&Position::new(2, 1)));
        assert!(positions.contains(&Position::new(3, 2)));
        assert!(positions.contains(&Position::new(3, 3)));
    }
}
