//! Working assignment of exams to (slot, room)
//!
//! The search mutates this in place and undoes every tentative booking when
//! it backtracks, so `assign` followed by `unassign` restores the exact prior
//! state.

use examplan_core::{Exam, Room};
use std::collections::BTreeMap;

/// An exam booked into a slot and room
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Booking<'a> {
    pub exam: &'a Exam,
    pub slot: usize,
    pub room: &'a Room,
}

/// Partial or complete mapping exam -> (slot, room)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignment<'a> {
    bookings: BTreeMap<&'a str, Booking<'a>>,
    /// Room ids in use, per slot
    rooms_by_slot: BTreeMap<usize, Vec<&'a str>>,
}

impl<'a> Assignment<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Book `exam` into `slot` and `room`, replacing any earlier booking of the exam
    pub fn assign(&mut self, exam: &'a Exam, slot: usize, room: &'a Room) {
        self.unassign(&exam.id);
        self.bookings.insert(&exam.id, Booking { exam, slot, room });
        self.rooms_by_slot.entry(slot).or_default().push(&room.id);
    }

    /// Remove the booking for an exam
    pub fn unassign(&mut self, exam_id: &str) -> Option<Booking<'a>> {
        let booking = self.bookings.remove(exam_id)?;
        if let Some(rooms) = self.rooms_by_slot.get_mut(&booking.slot) {
            if let Some(pos) = rooms.iter().position(|r| *r == booking.room.id) {
                rooms.remove(pos);
            }
            if rooms.is_empty() {
                self.rooms_by_slot.remove(&booking.slot);
            }
        }
        Some(booking)
    }

    pub fn get(&self, exam_id: &str) -> Option<&Booking<'a>> {
        self.bookings.get(exam_id)
    }

    /// Room ids already used in `slot`
    pub fn rooms_in(&self, slot: usize) -> impl Iterator<Item = &'a str> + '_ {
        self.rooms_by_slot.get(&slot).into_iter().flatten().copied()
    }

    /// Check if `room_id` is taken in `slot`
    pub fn is_room_used(&self, slot: usize, room_id: &str) -> bool {
        self.rooms_in(slot).any(|r| r == room_id)
    }

    /// Bookings ordered by exam id
    pub fn iter(&self) -> impl Iterator<Item = &Booking<'a>> + '_ {
        self.bookings.values()
    }
}
