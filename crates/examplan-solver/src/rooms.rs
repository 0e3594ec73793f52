//! Room allocation
//!
//! First-fit over the caller's room order: the first room that seats every
//! student of the exam and is not yet used in the slot wins.

use crate::assignment::Assignment;
use examplan_core::{Exam, Room};

#[derive(Clone, Copy, Debug)]
pub struct RoomAllocator<'a> {
    rooms: &'a [Room],
}

impl<'a> RoomAllocator<'a> {
    pub fn new(rooms: &'a [Room]) -> Self {
        Self { rooms }
    }

    /// Find a free room for `exam` in `slot`
    pub fn find_room(&self, exam: &Exam, slot: usize, assignment: &Assignment<'_>) -> Option<&'a Room> {
        self.rooms
            .iter()
            .find(|room| room.fits(exam) && !assignment.is_room_used(slot, &room.id))
    }

    /// Capacity of the biggest room
    pub fn largest_capacity(&self) -> Option<u32> {
        self.rooms.iter().map(|r| r.capacity).max()
    }

    pub fn rooms(&self) -> &'a [Room] {
        self.rooms
    }
}
