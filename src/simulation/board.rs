//! Dense per-cell storage for the board and the cost heat map

use std::collections::VecDeque;

use super::grid;
use super::types::Position;

/// Index of a car inside a game state's car arena
pub type CarSlot = usize;

/// A value for every cell of a `width` x `height` board
#[derive(Debug, Clone)]
pub struct Grid<T> {
    width: i32,
    height: i32,
    cells: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: i32, height: i32) -> Self {
        let len = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            cells: vec![T::default(); len],
        }
    }
}

impl<T> Grid<T> {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, position: Position) -> bool {
        grid::in_bounds(position, self.width, self.height)
    }

    fn index(&self, position: Position) -> Option<usize> {
        self.contains(position)
            .then(|| (position.x * self.height + position.y) as usize)
    }

    pub fn get(&self, position: Position) -> Option<&T> {
        self.index(position).map(|index| &self.cells[index])
    }

    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        self.index(position).map(move |index| &mut self.cells[index])
    }
}

/// Queue of cars (arena slots) waiting at every position
pub type Board = Grid<VecDeque<CarSlot>>;

/// Accumulated per-iteration cost of the cars queued at every position
pub type CostBoard = Grid<f64>;

impl Board {
    pub fn queue(&self, position: Position) -> Option<&VecDeque<CarSlot>> {
        self.get(position)
    }

    pub fn queue_len(&self, position: Position) -> usize {
        self.get(position).map_or(0, VecDeque::len)
    }

    pub fn head(&self, position: Position) -> Option<CarSlot> {
        self.get(position).and_then(|queue| queue.front().copied())
    }

    /// Appends a car to the back of the queue; false if the position is off the board
    pub fn enqueue(&mut self, position: Position, slot: CarSlot) -> bool {
        match self.get_mut(position) {
            Some(queue) => {
                queue.push_back(slot);
                true
            }
            None => false,
        }
    }

    pub fn dequeue(&mut self, position: Position) -> Option<CarSlot> {
        self.get_mut(position).and_then(VecDeque::pop_front)
    }

    pub fn car_count(&self) -> usize {
        self.cells.iter().map(VecDeque::len).sum()
    }
}
