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

//! Queueing disciplines used to pick which waiting process a resource serves
//! next. New disciplines can be added by implementing [`WaitList`] and using
//! `Simulation::new_resource_with`.
use crate::process::*;
use rand::Rng;
use rand::RngCore;
use std::collections::VecDeque;

/// Smaller values are served first.
pub type Priority = i64;

/// A process blocked in a resource request.
#[derive(Clone, Debug, PartialEq)]
pub struct Waiter
{
	pub process: ProcessId,
	pub amount: usize,
	pub priority: Priority,

	/// Increases with each request made on the resource.
	pub arrival: u64,
}

pub trait WaitList
{
	/// Used when logging.
	fn name(&self) -> &'static str;

	fn push(&mut self, waiter: Waiter);

	/// The waiter that will be served next. Repeated calls return the same
	/// waiter until the list changes.
	fn front(&mut self, rng: &mut dyn RngCore) -> Option<&Waiter>;

	fn pop_front(&mut self, rng: &mut dyn RngCore) -> Option<Waiter>;

	/// Used for cancellation and timeouts.
	fn remove(&mut self, process: ProcessId) -> Option<Waiter>;

	fn len(&self) -> usize;

	fn is_empty(&self) -> bool
	{
		self.len() == 0
	}
}

/// The built in disciplines.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy
{
	/// First come, first served.
	Fcfs,

	/// Last come, first served.
	Lcfs,

	/// Service in random order.
	Siro,

	/// Lowest priority value first, first come first served within a priority.
	StaticPriority,
}

impl Strategy
{
	pub fn new_wait_list(self) -> Box<dyn WaitList>
	{
		match self {
			Strategy::Fcfs => Box::new(FcfsList::new()),
			Strategy::Lcfs => Box::new(LcfsList::new()),
			Strategy::Siro => Box::new(SiroList::new()),
			Strategy::StaticPriority => Box::new(PriorityList::new()),
		}
	}

	pub fn parse(text: &str) -> Option<Strategy>
	{
		match text {
			"fcfs" => Some(Strategy::Fcfs),
			"lcfs" => Some(Strategy::Lcfs),
			"siro" => Some(Strategy::Siro),
			"priority" => Some(Strategy::StaticPriority),
			_ => None,
		}
	}
}

pub struct FcfsList
{
	waiters: VecDeque<Waiter>,
}

impl FcfsList
{
	pub fn new() -> FcfsList
	{
		FcfsList {waiters: VecDeque::new()}
	}
}

impl WaitList for FcfsList
{
	fn name(&self) -> &'static str
	{
		"fcfs"
	}

	fn push(&mut self, waiter: Waiter)
	{
		self.waiters.push_back(waiter);
	}

	fn front(&mut self, _rng: &mut dyn RngCore) -> Option<&Waiter>
	{
		self.waiters.front()
	}

	fn pop_front(&mut self, _rng: &mut dyn RngCore) -> Option<Waiter>
	{
		self.waiters.pop_front()
	}

	fn remove(&mut self, process: ProcessId) -> Option<Waiter>
	{
		let index = self.waiters.iter().position(|w| w.process == process)?;
		self.waiters.remove(index)
	}

	fn len(&self) -> usize
	{
		self.waiters.len()
	}
}

pub struct LcfsList
{
	waiters: Vec<Waiter>,	// newest at the end
}

impl LcfsList
{
	pub fn new() -> LcfsList
	{
		LcfsList {waiters: Vec::new()}
	}
}

impl WaitList for LcfsList
{
	fn name(&self) -> &'static str
	{
		"lcfs"
	}

	fn push(&mut self, waiter: Waiter)
	{
		self.waiters.push(waiter);
	}

	fn front(&mut self, _rng: &mut dyn RngCore) -> Option<&Waiter>
	{
		self.waiters.last()
	}

	fn pop_front(&mut self, _rng: &mut dyn RngCore) -> Option<Waiter>
	{
		self.waiters.pop()
	}

	fn remove(&mut self, process: ProcessId) -> Option<Waiter>
	{
		let index = self.waiters.iter().position(|w| w.process == process)?;
		Some(self.waiters.remove(index))
	}

	fn len(&self) -> usize
	{
		self.waiters.len()
	}
}

/// The next waiter is drawn uniformly from the run's generator. The draw is
/// kept until a waiter is added or removed so that a waiter that doesn't fit
/// blocks the list the same way it would with the other disciplines.
pub struct SiroList
{
	waiters: Vec<Waiter>,
	chosen: Option<usize>,
}

impl SiroList
{
	pub fn new() -> SiroList
	{
		SiroList {waiters: Vec::new(), chosen: None}
	}

	fn choose(&mut self, rng: &mut dyn RngCore) -> Option<usize>
	{
		if self.waiters.is_empty() {
			return None;
		}
		if self.chosen.is_none() {
			self.chosen = Some(rng.gen_range(0..self.waiters.len()));
		}
		self.chosen
	}
}

impl WaitList for SiroList
{
	fn name(&self) -> &'static str
	{
		"siro"
	}

	fn push(&mut self, waiter: Waiter)
	{
		self.waiters.push(waiter);
		self.chosen = None;
	}

	fn front(&mut self, rng: &mut dyn RngCore) -> Option<&Waiter>
	{
		let index = self.choose(rng)?;
		self.waiters.get(index)
	}

	fn pop_front(&mut self, rng: &mut dyn RngCore) -> Option<Waiter>
	{
		let index = self.choose(rng)?;
		self.chosen = None;
		Some(self.waiters.swap_remove(index))
	}

	fn remove(&mut self, process: ProcessId) -> Option<Waiter>
	{
		let index = self.waiters.iter().position(|w| w.process == process)?;
		self.chosen = None;
		Some(self.waiters.swap_remove(index))
	}

	fn len(&self) -> usize
	{
		self.waiters.len()
	}
}

pub struct PriorityList
{
	waiters: VecDeque<Waiter>,	// sorted by (priority, arrival)
}

impl PriorityList
{
	pub fn new() -> PriorityList
	{
		PriorityList {waiters: VecDeque::new()}
	}
}

impl WaitList for PriorityList
{
	fn name(&self) -> &'static str
	{
		"priority"
	}

	fn push(&mut self, waiter: Waiter)
	{
		let index = self.waiters.iter()
			.position(|w| w.priority > waiter.priority)
			.unwrap_or(self.waiters.len());
		self.waiters.insert(index, waiter);
	}

	fn front(&mut self, _rng: &mut dyn RngCore) -> Option<&Waiter>
	{
		self.waiters.front()
	}

	fn pop_front(&mut self, _rng: &mut dyn RngCore) -> Option<Waiter>
	{
		self.waiters.pop_front()
	}

	fn remove(&mut self, process: ProcessId) -> Option<Waiter>
	{
		let index = self.waiters.iter().position(|w| w.process == process)?;
		self.waiters.remove(index)
	}

	fn len(&self) -> usize
	{
		self.waiters.len()
	}
}
