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

//! Preemptible resources remember who holds their units. When a request can't
//! be satisfied the resource may take units away from holders with a worse
//! (larger) priority. Those holders are suspended until the units come back:
//! a hold in progress is frozen and any other wake up is deferred.
use crate::error::*;
use crate::logging::*;
use crate::process::*;
use crate::resource::*;
use crate::simulation::*;
use crate::strategy::*;
use std::cmp::min;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Holder
{
	pub(crate) process: ProcessId,
	pub(crate) priority: Priority,
	pub(crate) amount: usize,
	pub(crate) sequence: u64,
}

pub(crate) struct PreemptionState
{
	pub(crate) holders: Vec<Holder>,
	pub(crate) preempted: Vec<Holder>,	// sequence is when the holder was preempted
	next_sequence: u64,
}

pub(crate) enum Restore
{
	Nothing,
	Blocked,
	Restored,
}

impl PreemptionState
{
	fn new() -> PreemptionState
	{
		PreemptionState {holders: Vec::new(), preempted: Vec::new(), next_sequence: 0}
	}

	/// Returns the new number of holders.
	pub(crate) fn add_holder(&mut self, process: ProcessId, amount: usize, priority: Priority) -> usize
	{
		let sequence = self.bump();
		self.holders.push(Holder {process, priority, amount, sequence});
		self.holders.len()
	}

	fn bump(&mut self) -> u64
	{
		let sequence = self.next_sequence;
		self.next_sequence += 1;
		sequence
	}

	/// Sequence numbers of the holders to preempt so that amount units are
	/// available, worst priority first and the most recent grant within a
	/// priority. Empty if preemption can't free enough units.
	fn choose_victims(&self, requester: ProcessId, available: usize, amount: usize, priority: Priority) -> Vec<u64>
	{
		let mut candidates: Vec<&Holder> = self.holders.iter()
			.filter(|h| h.priority > priority && h.process != requester)
			.collect();
		candidates.sort_by(|a, b| b.priority.cmp(&a.priority).then(b.sequence.cmp(&a.sequence)));

		let mut freed = available;
		let mut victims = Vec::new();
		for holder in candidates {
			if freed >= amount {
				break;
			}
			freed += holder.amount;
			victims.push(holder.sequence);
		}

		if freed >= amount {victims} else {Vec::new()}
	}

	/// Index of the preempted entry to restore next: best priority first and
	/// the most recently preempted within a priority.
	fn next_preempted(&self) -> Option<usize>
	{
		self.preempted.iter()
			.enumerate()
			.min_by(|(_, a), (_, b)| a.priority.cmp(&b.priority).then(b.sequence.cmp(&a.sequence)))
			.map(|(index, _)| index)
	}
}

impl Simulation
{
	pub fn new_preemptible_resource(&mut self, name: &str, strategy: Strategy, max_count: usize, initial: usize) -> SimResult<ResourceId>
	{
		self.add_resource(name, strategy.new_wait_list(), max_count, initial, Some(PreemptionState::new()))
	}

	/// The processes holding units of a preemptible resource in the order
	/// they were granted. Empty for ordinary resources.
	pub fn holders(&self, id: ResourceId) -> SimResult<Vec<ProcessId>>
	{
		let resource = self.resources.get(id.0).ok_or(Fault::UnknownResource(id))?;
		Ok(match resource.preemption {
			Some(ref state) => state.holders.iter().map(|h| h.process).collect(),
			None => Vec::new(),
		})
	}

	pub(crate) fn held_by(&self, id: ResourceId, process: ProcessId) -> usize
	{
		match self.resources[id.0].preemption {
			Some(ref state) => state.holders.iter().filter(|h| h.process == process).map(|h| h.amount).sum(),
			None => 0,
		}
	}

	/// Removes amount units from the process's holdings, newest grants first.
	/// Returns the new number of holders.
	pub(crate) fn drop_holdings(&mut self, id: ResourceId, process: ProcessId, amount: usize) -> usize
	{
		match self.resources[id.0].preemption.as_mut() {
			Some(state) => {
				let mut remaining = amount;
				let mut index = state.holders.len();
				while index > 0 && remaining > 0 {
					index -= 1;
					if state.holders[index].process == process {
						let taken = min(remaining, state.holders[index].amount);
						state.holders[index].amount -= taken;
						remaining -= taken;
						if state.holders[index].amount == 0 {
							state.holders.remove(index);
						}
					}
				}
				state.holders.len()
			},
			None => 0,
		}
	}

	/// True if a preempted holder that is at least as important as priority
	/// is waiting for its units.
	pub(crate) fn behind_preempted(&self, id: ResourceId, priority: Priority) -> bool
	{
		match self.resources[id.0].preemption {
			Some(ref state) => state.preempted.iter().any(|h| h.priority <= priority),
			None => false,
		}
	}

	/// Preempts holders and grants requester amount units. Returns false (and
	/// changes nothing) if that isn't possible.
	pub(crate) fn preempt_for(&mut self, id: ResourceId, requester: ProcessId, amount: usize, priority: Priority) -> SimResult<bool>
	{
		let sequences = {
			let resource = &self.resources[id.0];
			match resource.preemption {
				Some(ref state) => state.choose_victims(requester, resource.available, amount, priority),
				None => return Ok(false),
			}
		};
		if sequences.is_empty() {
			return Ok(false);
		}

		let mut victims = Vec::new();
		if let Some(state) = self.resources[id.0].preemption.as_mut() {
			for sequence in sequences {
				if let Some(index) = state.holders.iter().position(|h| h.sequence == sequence) {
					let mut holder = state.holders.remove(index);
					holder.sequence = state.bump();
					state.preempted.push(holder.clone());
					victims.push(holder);
				}
			}
		}

		let name = self.resources[id.0].name.clone();
		for victim in victims.iter() {
			self.log(LogLevel::Debug, &name, &format!("process {} preempted by process {}", victim.process, requester));
			self.force_suspend(victim.process);
		}

		// the freed units go straight to the requester
		let freed: usize = victims.iter().map(|v| v.amount).sum();
		let available = self.resources[id.0].available + freed;
		self.grant_units(id, Some(requester), amount, priority, available);
		for victim in victims {
			self.notify(id, ResourceChange::Preempted(victim.process));
		}
		Ok(true)
	}

	/// Gives units back to the best preempted holder if they fit.
	pub(crate) fn restore_next(&mut self, id: ResourceId) -> SimResult<Restore>
	{
		let entry = {
			let resource = &mut self.resources[id.0];
			let available = resource.available;
			let state = match resource.preemption.as_mut() {
				Some(state) => state,
				None => return Ok(Restore::Nothing),
			};
			let index = match state.next_preempted() {
				Some(index) => index,
				None => return Ok(Restore::Nothing),
			};
			if state.preempted[index].amount > available {
				return Ok(Restore::Blocked);
			}
			state.preempted.remove(index)
		};

		let name = self.resources[id.0].name.clone();
		self.log(LogLevel::Debug, &name, &format!("restored process {}", entry.process));
		self.take_units(id, Some(entry.process), entry.amount, entry.priority);
		self.notify(id, ResourceChange::Restored(entry.process));
		self.lift_preemption(entry.process)?;
		Ok(Restore::Restored)
	}

	/// Drops a cancelled process from every preempted stack.
	pub(crate) fn forget_preempted(&mut self, process: ProcessId) -> SimResult<()>
	{
		let mut affected = Vec::new();
		for (index, resource) in self.resources.iter_mut().enumerate() {
			if let Some(state) = resource.preemption.as_mut() {
				let before = state.preempted.len();
				state.preempted.retain(|h| h.process != process);
				if state.preempted.len() != before {
					affected.push(ResourceId(index));
				}
			}
		}

		self.processes[process.0].preemptions = 0;
		for id in affected {
			self.grant_waiting(id)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::config::*;
	use crate::context::*;
	use crate::signal::*;
	use crate::specs::*;
	use std::cell::RefCell;
	use std::rc::Rc;

	type Log = Rc<RefCell<Vec<(String, &'static str, f64)>>>;

	fn new_sim() -> Simulation
	{
		let mut config = Config::new();
		config.log_level = LogLevel::Error;
		Simulation::new(Specs::new(0.0, 100.0, 1.0).with_seed(5), config).unwrap()
	}

	// Requests one unit, holds it for service time, and then releases it.
	struct Worker
	{
		resource: ResourceId,
		priority: Priority,
		service: f64,
		step: u32,
		log: Log,
	}

	impl Activity for Worker
	{
		fn resume(&mut self, ctx: &mut Context, _wake: Wake) -> SimResult<Suspend>
		{
			self.step += 1;
			match self.step {
				1 => Ok(Suspend::request(self.resource).priority(self.priority)),
				2 => {
					self.log.borrow_mut().push((ctx.name().to_string(), "granted", ctx.now()));
					Ok(Suspend::hold(self.service))
				},
				_ => {
					self.log.borrow_mut().push((ctx.name().to_string(), "done", ctx.now()));
					ctx.release(self.resource, 1)?;
					Ok(Suspend::Finish)
				},
			}
		}
	}

	fn worker(sim: &mut Simulation, name: &str, start: f64, resource: ResourceId, priority: Priority, service: f64, log: &Log) -> ProcessId
	{
		let activity = Worker {resource, priority, service, step: 0, log: log.clone()};
		sim.spawn_at(start, name, activity).unwrap()
	}

	fn entry(name: &str, what: &'static str, time: f64) -> (String, &'static str, f64)
	{
		(name.to_string(), what, time)
	}

	#[test]
	fn preempted_holder_is_restored_first()
	{
		let mut sim = new_sim();
		let machine = sim.new_preemptible_resource("machine", Strategy::StaticPriority, 1, 1).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));
		let changes = Rc::new(RefCell::new(Vec::new()));
		let c = changes.clone();
		sim.subscribe(machine, move |n| {
			match n.change {
				ResourceChange::Preempted(_) | ResourceChange::Restored(_) => c.borrow_mut().push((n.time, n.change.clone())),
				_ => (),
			}
		}).unwrap();

		let a = worker(&mut sim, "A", 0.0, machine, 5, 10.0, &log);
		worker(&mut sim, "B", 2.0, machine, 1, 3.0, &log);
		worker(&mut sim, "C", 3.0, machine, 3, 1.0, &log);

		sim.run_until(4.0).unwrap();
		assert!(sim.is_preempted(a).unwrap());
		assert_eq!(sim.resource(machine).unwrap().preempted, 1);

		sim.run().unwrap();
		assert!(!sim.is_preempted(a).unwrap());
		assert_eq!(*log.borrow(), vec![
			entry("A", "granted", 0.0),
			entry("B", "granted", 2.0),
			entry("B", "done", 5.0),
			entry("A", "done", 13.0),	// 8 units of the hold were left when A was preempted
			entry("C", "granted", 13.0),
			entry("C", "done", 14.0)]);
		assert_eq!(*changes.borrow(), vec![
			(2.0, ResourceChange::Preempted(a)),
			(5.0, ResourceChange::Restored(a))]);
		assert_eq!(sim.resource(machine).unwrap().available, 1);
	}

	#[test]
	fn equal_priority_does_not_preempt()
	{
		let mut sim = new_sim();
		let machine = sim.new_preemptible_resource("machine", Strategy::Fcfs, 1, 1).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));
		worker(&mut sim, "A", 0.0, machine, 2, 4.0, &log);
		worker(&mut sim, "B", 1.0, machine, 2, 4.0, &log);
		sim.run().unwrap();

		assert_eq!(*log.borrow(), vec![
			entry("A", "granted", 0.0),
			entry("A", "done", 4.0),
			entry("B", "granted", 4.0),
			entry("B", "done", 8.0)]);
	}

	#[test]
	fn most_recent_holder_is_preempted_first()
	{
		let mut sim = new_sim();
		let machines = sim.new_preemptible_resource("machines", Strategy::Fcfs, 2, 2).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));
		let a = worker(&mut sim, "A", 0.0, machines, 5, 10.0, &log);
		let b = worker(&mut sim, "B", 1.0, machines, 5, 10.0, &log);
		worker(&mut sim, "C", 2.0, machines, 0, 1.0, &log);

		sim.run_until(2.5).unwrap();
		assert!(!sim.is_preempted(a).unwrap());
		assert!(sim.is_preempted(b).unwrap());
		assert_eq!(sim.holders(machines).unwrap().len(), 2);
	}

	#[test]
	fn deferred_wakes_are_delivered_after_restoration()
	{
		let mut sim = new_sim();
		let machine = sim.new_preemptible_resource("machine", Strategy::Fcfs, 1, 1).unwrap();
		let bell = sim.new_signal("bell");
		let wakes = Rc::new(RefCell::new(Vec::new()));

		let w = wakes.clone();
		sim.spawn_fn("A", move |ctx, wake| {
			w.borrow_mut().push((ctx.now(), wake.clone()));
			match wake {
				Wake::Start => Ok(Suspend::request(machine).priority(5)),
				Wake::Granted(_) => Ok(Suspend::wait(bell)),
				_ => {
					ctx.release(machine, 1)?;
					Ok(Suspend::Finish)
				},
			}
		}).unwrap();

		let log = Rc::new(RefCell::new(Vec::new()));
		worker(&mut sim, "B", 2.0, machine, 1, 4.0, &log);
		sim.schedule(3.0, move |sim, _| {sim.trigger(bell, Payload::Int(1))?; Ok(())}).unwrap();
		sim.run().unwrap();

		assert_eq!(*wakes.borrow(), vec![
			(0.0, Wake::Start),
			(0.0, Wake::Granted(machine)),
			(6.0, Wake::Signal(Payload::Int(1)))]);
	}

	#[test]
	fn blocked_restoration_holds_back_the_wait_list()
	{
		let mut sim = new_sim();
		let machines = sim.new_preemptible_resource("machines", Strategy::Fcfs, 2, 2).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));

		let l = log.clone();
		let a = sim.spawn_fn("A", move |ctx, wake| {
			match wake {
				Wake::Start => Ok(Suspend::request(machines).amount(2).priority(5)),
				Wake::Granted(_) => Ok(Suspend::hold(10.0)),
				_ => {
					l.borrow_mut().push(entry("A", "done", ctx.now()));
					ctx.release(machines, 2)?;
					Ok(Suspend::Finish)
				},
			}
		}).unwrap();

		// B takes both units at t=1 and gives them back one at a time
		let mut step = 0;
		sim.schedule(1.0, move |sim, _| {
			sim.spawn_fn("B", move |ctx, _| {
				step += 1;
				match step {
					1 => Ok(Suspend::request(machines).amount(2).priority(1)),
					2 => Ok(Suspend::hold(4.0)),
					3 => {
						ctx.release(machines, 1)?;
						Ok(Suspend::hold(1.0))
					},
					_ => {
						ctx.release(machines, 1)?;
						Ok(Suspend::Finish)
					},
				}
			})?;
			Ok(())
		}).unwrap();
		worker(&mut sim, "C", 2.0, machines, 9, 1.0, &log);

		sim.run_until(5.5).unwrap();
		let view = sim.resource(machines).unwrap();
		assert_eq!((view.available, view.waiting, view.preempted), (1, 1, 1));	// C would fit but A comes first

		sim.run().unwrap();
		assert!(!sim.is_preempted(a).unwrap());
		assert_eq!(*log.borrow(), vec![
			entry("A", "done", 15.0),
			entry("C", "granted", 15.0),
			entry("C", "done", 16.0)]);
	}

	#[test]
	fn newer_requesters_wait_behind_preempted_holders()
	{
		let mut sim = new_sim();
		let machines = sim.new_preemptible_resource("machines", Strategy::Fcfs, 2, 2).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));

		let l = log.clone();
		let a = sim.spawn_fn("A", move |ctx, wake| {
			match wake {
				Wake::Start => Ok(Suspend::request(machines).amount(2).priority(5)),
				Wake::Granted(_) => {
					l.borrow_mut().push(entry("A", "granted", ctx.now()));
					Ok(Suspend::hold(10.0))
				},
				_ => {
					l.borrow_mut().push(entry("A", "done", ctx.now()));
					ctx.release(machines, 2)?;
					Ok(Suspend::Finish)
				},
			}
		}).unwrap();
		worker(&mut sim, "B", 1.0, machines, 1, 2.0, &log);
		worker(&mut sim, "C", 2.0, machines, 9, 1.0, &log);

		// B only needed one of A's units but C still has to wait for A
		sim.run_until(2.5).unwrap();
		let view = sim.resource(machines).unwrap();
		assert_eq!((view.available, view.waiting, view.preempted), (1, 1, 1));

		sim.run().unwrap();
		assert!(!sim.is_preempted(a).unwrap());
		assert_eq!(*log.borrow(), vec![
			entry("A", "granted", 0.0),
			entry("B", "granted", 1.0),
			entry("B", "done", 3.0),
			entry("A", "done", 12.0),
			entry("C", "granted", 12.0),
			entry("C", "done", 13.0)]);
	}

	#[test]
	fn preemption_changes_the_count_once()
	{
		let mut sim = new_sim();
		let machine = sim.new_preemptible_resource("machine", Strategy::Fcfs, 1, 1).unwrap();
		let changes = Rc::new(RefCell::new(Vec::new()));
		let c = changes.clone();
		sim.subscribe(machine, move |n| {
			if n.time == 1.0 {
				c.borrow_mut().push(n.change.clone());
			}
		}).unwrap();

		let log = Rc::new(RefCell::new(Vec::new()));
		let a = worker(&mut sim, "A", 0.0, machine, 5, 10.0, &log);
		worker(&mut sim, "B", 1.0, machine, 1, 4.0, &log);
		sim.run_until(2.0).unwrap();

		assert_eq!(*changes.borrow(), vec![
			ResourceChange::Available(0),
			ResourceChange::Holders(1),
			ResourceChange::Preempted(a)]);
	}

	#[test]
	fn held_and_available_units_add_up()
	{
		let mut sim = new_sim();
		let machines = sim.new_preemptible_resource("machines", Strategy::StaticPriority, 2, 2).unwrap();
		let counts = Rc::new(RefCell::new(Vec::new()));
		let c = counts.clone();
		sim.subscribe(machines, move |n| c.borrow_mut().push((n.change.clone(), n.available + n.held))).unwrap();

		let log = Rc::new(RefCell::new(Vec::new()));
		worker(&mut sim, "A", 0.0, machines, 5, 10.0, &log);
		worker(&mut sim, "E", 0.0, machines, 5, 10.0, &log);
		worker(&mut sim, "B", 1.0, machines, 1, 2.0, &log);
		worker(&mut sim, "C", 2.0, machines, 0, 1.0, &log);
		sim.run().unwrap();

		let counts = counts.borrow();
		let preempted = counts.iter().filter(|c| matches!(c.0, ResourceChange::Preempted(_))).count();
		let restored = counts.iter().filter(|c| matches!(c.0, ResourceChange::Restored(_))).count();
		assert_eq!((preempted, restored), (2, 2));
		for (change, total) in counts.iter() {
			assert_eq!(*total, 2, "after {:?}", change);
		}
		assert_eq!(*log.borrow(), vec![
			entry("A", "granted", 0.0),
			entry("E", "granted", 0.0),
			entry("B", "granted", 1.0),
			entry("C", "granted", 2.0),
			entry("B", "done", 3.0),
			entry("C", "done", 3.0),
			entry("A", "done", 11.0),
			entry("E", "done", 12.0)]);
	}

	#[test]
	fn cancelled_victims_are_forgotten()
	{
		let mut sim = new_sim();
		let machine = sim.new_preemptible_resource("machine", Strategy::Fcfs, 1, 1).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));
		let a = worker(&mut sim, "A", 0.0, machine, 5, 10.0, &log);
		worker(&mut sim, "B", 1.0, machine, 1, 4.0, &log);
		worker(&mut sim, "C", 3.5, machine, 9, 1.0, &log);
		sim.schedule(3.0, move |sim, _| sim.cancel(a)).unwrap();
		sim.run().unwrap();

		assert_eq!(*log.borrow(), vec![
			entry("A", "granted", 0.0),
			entry("B", "granted", 1.0),
			entry("B", "done", 5.0),
			entry("C", "granted", 5.0),
			entry("C", "done", 6.0)]);
		assert_eq!(sim.resource(machine).unwrap().preempted, 0);
	}

	#[test]
	fn only_holders_can_release()
	{
		let mut sim = new_sim();
		let machine = sim.new_preemptible_resource("machine", Strategy::Fcfs, 2, 2).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));
		worker(&mut sim, "A", 0.0, machine, 0, 10.0, &log);
		sim.spawn_fn("thief", move |ctx, wake| {
			match wake {
				Wake::Start => Ok(Suspend::hold(1.0)),
				_ => {
					ctx.release(machine, 1)?;
					Ok(Suspend::Finish)
				},
			}
		}).unwrap();

		match sim.run() {
			Err(Fault::ResourceOveruse {resource, amount, held, ..}) => {
				assert_eq!(resource, "machine");
				assert_eq!(amount, 1);
				assert_eq!(held, 0);
			},
			other => panic!("expected ResourceOveruse, not {:?}", other),
		}
	}

	#[test]
	fn requests_need_a_process()
	{
		let mut sim = new_sim();
		let machine = sim.new_preemptible_resource("machine", Strategy::Fcfs, 1, 1).unwrap();
		match sim.try_request(machine, 1, 0) {
			Err(Fault::NoCurrentProcess(operation)) => assert_eq!(operation, "request"),
			other => panic!("expected NoCurrentProcess, not {:?}", other),
		}
	}
}
