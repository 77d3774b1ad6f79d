// Copyright (C) 2017 Jesse Jones
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 3, or (at your option)
// any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program; if not, write to the Free Software Foundation,
// Inc., 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301, USA.
use crate::error::*;
use crate::simulation::*;
use crate::specs::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Work scheduled on the `EventQueue`. Callbacks run with exclusive access to
/// the `Simulation` and may schedule more callbacks.
pub type Callback = Box<dyn FnOnce(&mut Simulation, &SimulatedPoint) -> SimResult<()>>;

/// Selects which pending events a drain will fire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DrainMode
{
	/// Events before and at the point. The point may not be behind the watermark.
	Current,

	/// Events strictly before the point. The point may not be behind the watermark.
	Earlier,

	/// Like Current but skips the watermark check. Only for bootstrapping a run.
	CurrentCatchUp,

	/// Like Earlier but skips the watermark check. Only for bootstrapping a run.
	EarlierCatchUp,
}

impl DrainMode
{
	pub fn includes_current(self) -> bool
	{
		match self {
			DrainMode::Current | DrainMode::CurrentCatchUp => true,
			DrainMode::Earlier | DrainMode::EarlierCatchUp => false,
		}
	}

	pub fn is_strict(self) -> bool
	{
		match self {
			DrainMode::Current | DrainMode::Earlier => true,
			DrainMode::CurrentCatchUp | DrainMode::EarlierCatchUp => false,
		}
	}
}

/// Time ordered queue of callbacks. Callbacks scheduled for the same time
/// fire in the order they were enqueued.
pub struct EventQueue
{
	pending: BinaryHeap<ScheduledCallback>,
	watermark: f64,
	pub(crate) draining: bool,
	next_sequence: u64,
}

impl EventQueue
{
	pub fn new(start_time: f64) -> EventQueue
	{
		EventQueue {
			pending: BinaryHeap::new(),
			watermark: start_time,
			draining: false,
			next_sequence: 0,
		}
	}

	/// Adds a callback without running it. Returns the sequence number used
	/// to break ties with other callbacks at the same time.
	pub fn enqueue(&mut self, time: f64, callback: Callback) -> SimResult<u64>
	{
		if time.is_nan() || time < self.watermark {
			return Err(Fault::InvalidScheduling {requested: time, watermark: self.watermark});
		}

		let sequence = self.next_sequence;
		self.next_sequence += 1;
		self.pending.push(ScheduledCallback {time, sequence, callback});
		Ok(sequence)
	}

	pub fn count(&self) -> usize
	{
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.pending.is_empty()
	}

	/// Latest time that has been dispatched.
	pub fn watermark(&self) -> f64
	{
		self.watermark
	}

	pub fn is_draining(&self) -> bool
	{
		self.draining
	}

	pub fn peek_time(&self) -> Option<f64>
	{
		self.pending.peek().map(|e| e.time)
	}

	/// Removes the next callback if it is due at time and advances the watermark.
	pub(crate) fn pop_due(&mut self, time: f64, include_current: bool) -> SimResult<Option<(f64, Callback)>>
	{
		let due = match self.pending.peek() {
			Some(e) => e.time < time || (include_current && e.time == time),
			None => false,
		};
		if !due {
			return Ok(None);
		}

		match self.pending.pop() {
			Some(e) => {
				if e.time < self.watermark {
					return Err(Fault::TimeOrderingViolation {operation: "dispatch", requested: e.time, watermark: self.watermark});
				}
				self.watermark = e.time;
				Ok(Some((e.time, e.callback)))
			},
			None => Ok(None)
		}
	}
}

struct ScheduledCallback
{
	time: f64,
	sequence: u64,
	callback: Callback,
}

impl PartialEq for ScheduledCallback
{
	fn eq(&self, other: &ScheduledCallback) -> bool
	{
		self.sequence == other.sequence
	}
}

impl Eq for ScheduledCallback {}

impl PartialOrd for ScheduledCallback
{
	fn partial_cmp(&self, other: &ScheduledCallback) -> Option<Ordering>
	{
		Some(self.cmp(other))
	}
}

impl Ord for ScheduledCallback
{
	fn cmp(&self, other: &ScheduledCallback) -> Ordering
	{
		// reversed because BinaryHeap returns the largest values first
		other.time.total_cmp(&self.time).then_with(|| other.sequence.cmp(&self.sequence))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn noop() -> Callback
	{
		Box::new(|_, _| Ok(()))
	}

	#[test]
	fn pops_in_time_then_insertion_order()
	{
		let mut queue = EventQueue::new(0.0);
		let a = queue.enqueue(5.0, noop()).unwrap();
		let b = queue.enqueue(2.0, noop()).unwrap();
		let c = queue.enqueue(2.0, noop()).unwrap();
		assert!(a < b && b < c);
		assert_eq!(queue.count(), 3);

		let mut times = Vec::new();
		while let Some((t, _)) = queue.pop_due(10.0, true).unwrap() {
			times.push(t);
		}
		assert_eq!(times, vec![2.0, 2.0, 5.0]);
		assert_eq!(queue.watermark(), 5.0);
	}

	#[test]
	fn current_entries_need_current_mode()
	{
		let mut queue = EventQueue::new(0.0);
		queue.enqueue(3.0, noop()).unwrap();
		assert!(queue.pop_due(3.0, false).unwrap().is_none());
		assert!(queue.pop_due(3.0, true).unwrap().is_some());
	}

	#[test]
	fn rejects_scheduling_behind_watermark()
	{
		let mut queue = EventQueue::new(0.0);
		queue.enqueue(4.0, noop()).unwrap();
		queue.pop_due(4.0, true).unwrap();

		match queue.enqueue(3.5, noop()) {
			Err(Fault::InvalidScheduling {requested, watermark}) => {
				assert_eq!(requested, 3.5);
				assert_eq!(watermark, 4.0);
			},
			_ => panic!("expected InvalidScheduling"),
		}
		assert!(queue.enqueue(f64::NAN, noop()).is_err());
		assert!(queue.enqueue(4.0, noop()).is_ok());
	}

	#[test]
	fn modes()
	{
		assert!(DrainMode::Current.includes_current());
		assert!(DrainMode::CurrentCatchUp.includes_current());
		assert!(!DrainMode::Earlier.includes_current());
		assert!(DrainMode::Earlier.is_strict());
		assert!(!DrainMode::EarlierCatchUp.is_strict());
	}
}
