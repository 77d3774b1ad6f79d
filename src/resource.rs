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

//! Resources are counting semaphores: processes request units, suspend until
//! enough are available, and release them when done. Which waiter is served
//! next is decided by the resource's [`WaitList`].
use crate::error::*;
use crate::logging::*;
use crate::preemption::*;
use crate::process::*;
use crate::simulation::*;
use crate::strategy::*;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ResourceId(pub usize);

impl fmt::Display for ResourceId
{
	fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result
	{
		write!(formatter, "{}", self.0)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResourceChange
{
	/// New number of available units.
	Available(usize),

	/// New wait list length.
	WaitList(usize),

	/// New number of holders, only used by preemptible resources.
	Holders(usize),

	/// Available units dropped to zero.
	Depleted,

	/// Every unit is available again.
	Full,

	Preempted(ProcessId),
	Restored(ProcessId),
}

/// Sent to subscribers whenever a resource changes.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification
{
	pub time: f64,
	pub resource: ResourceId,
	pub change: ResourceChange,

	/// Counts after the change.
	pub available: usize,
	pub held: usize,
}

pub type Listener = Box<dyn FnMut(&Notification)>;

/// Snapshot of a resource.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceView
{
	pub name: String,
	pub strategy: &'static str,
	pub max_count: usize,
	pub available: usize,
	pub waiting: usize,
	pub holders: usize,

	/// Units granted to holders, only used by preemptible resources.
	pub held: usize,
	pub preempted: usize,
}

pub(crate) struct ResourceState
{
	pub(crate) name: String,
	pub(crate) max_count: usize,
	pub(crate) available: usize,
	pub(crate) wait_list: Box<dyn WaitList>,
	pub(crate) preemption: Option<PreemptionState>,
	pub(crate) listeners: Vec<Listener>,
	next_arrival: u64,
}

impl ResourceState
{
	fn held(&self) -> usize
	{
		match self.preemption {
			Some(ref state) => state.holders.iter().map(|h| h.amount).sum(),
			None => 0,
		}
	}
}

impl Simulation
{
	pub fn new_resource(&mut self, name: &str, strategy: Strategy, max_count: usize, initial: usize) -> SimResult<ResourceId>
	{
		self.add_resource(name, strategy.new_wait_list(), max_count, initial, None)
	}

	/// Like new_resource except that the caller provides the discipline.
	pub fn new_resource_with(&mut self, name: &str, wait_list: Box<dyn WaitList>, max_count: usize, initial: usize) -> SimResult<ResourceId>
	{
		self.add_resource(name, wait_list, max_count, initial, None)
	}

	pub(crate) fn add_resource(&mut self, name: &str, wait_list: Box<dyn WaitList>, max_count: usize, initial: usize, preemption: Option<PreemptionState>) -> SimResult<ResourceId>
	{
		assert!(!name.is_empty(), "name should not be empty");
		if max_count == 0 || initial > max_count {
			return Err(Fault::InvalidCapacity {resource: name.to_string(), requested: initial, max_count});
		}

		let id = ResourceId(self.resources.len());
		self.resources.push(ResourceState {
			name: name.to_string(),
			max_count,
			available: initial,
			wait_list,
			preemption,
			listeners: Vec::new(),
			next_arrival: 0,
		});
		self.note_name(name);
		Ok(id)
	}

	pub fn resource(&self, id: ResourceId) -> SimResult<ResourceView>
	{
		let resource = self.resources.get(id.0).ok_or(Fault::UnknownResource(id))?;
		let (holders, preempted) = match resource.preemption {
			Some(ref state) => (state.holders.len(), state.preempted.len()),
			None => (0, 0),
		};
		let held = resource.held();
		Ok(ResourceView {
			name: resource.name.clone(),
			strategy: resource.wait_list.name(),
			max_count: resource.max_count,
			available: resource.available,
			waiting: resource.wait_list.len(),
			holders,
			held,
			preempted,
		})
	}

	/// Listener is called after every change to the resource.
	pub fn subscribe<F>(&mut self, id: ResourceId, listener: F) -> SimResult<()>
		where F: FnMut(&Notification) + 'static
	{
		let resource = self.resources.get_mut(id.0).ok_or(Fault::UnknownResource(id))?;
		resource.listeners.push(Box::new(listener));
		Ok(())
	}

	/// Gives back units on behalf of the running process (if any). Preemptible
	/// resources must be released from the process that holds the units.
	pub fn release(&mut self, id: ResourceId, amount: usize) -> SimResult<()>
	{
		let holder = self.current;
		self.release_by(holder, id, amount)
	}

	/// Grabs units without suspending. Returns false if they aren't available.
	pub fn try_request(&mut self, id: ResourceId, amount: usize, priority: Priority) -> SimResult<bool>
	{
		let holder = self.current;
		self.admit(holder, id, amount, priority)
	}

	pub(crate) fn release_by(&mut self, holder: Option<ProcessId>, id: ResourceId, amount: usize) -> SimResult<()>
	{
		let (available, max_count) = {
			let resource = self.resources.get(id.0).ok_or(Fault::UnknownResource(id))?;
			(resource.available, resource.max_count)
		};
		if amount == 0 {
			return Err(self.capacity_fault(id, amount));
		}

		let holders = if self.resources[id.0].preemption.is_some() {
			let process = holder.ok_or(Fault::NoCurrentProcess("release"))?;
			let held = self.held_by(id, process);
			if amount > held || available + amount > max_count {
				return Err(self.overuse_fault(id, amount, held));
			}
			Some(self.drop_holdings(id, process, amount))
		} else if available + amount > max_count {
			return Err(self.overuse_fault(id, amount, max_count - available));
		} else {
			None
		};

		let name = self.resources[id.0].name.clone();
		self.log(LogLevel::Excessive, &name, &format!("released {}", amount));
		self.set_available(id, available + amount);
		if let Some(holders) = holders {
			self.notify(id, ResourceChange::Holders(holders));
		}
		self.grant_waiting(id)
	}

	/// Grants units if they are available (or can be preempted). Never suspends.
	pub(crate) fn admit(&mut self, process: Option<ProcessId>, id: ResourceId, amount: usize, priority: Priority) -> SimResult<bool>
	{
		self.check_amount(id, amount)?;
		let preemptible = self.resources[id.0].preemption.is_some();
		if preemptible && process.is_none() {
			return Err(Fault::NoCurrentProcess("request"));
		}

		// preempted holders get their units back before anyone who isn't more important
		if preemptible && self.behind_preempted(id, priority) {
			return Ok(false);
		}

		if self.resources[id.0].available >= amount {
			self.take_units(id, process, amount, priority);
			return Ok(true);
		}

		match process {
			Some(process) if preemptible => self.preempt_for(id, process, amount, priority),
			_ => Ok(false),
		}
	}

	/// Either grants the units or puts the process on the wait list.
	pub(crate) fn request(&mut self, process: ProcessId, id: ResourceId, amount: usize, priority: Priority) -> SimResult<bool>
	{
		if self.admit(Some(process), id, amount, priority)? {
			return Ok(true);
		}

		let len = {
			let resource = &mut self.resources[id.0];
			let arrival = resource.next_arrival;
			resource.next_arrival += 1;
			resource.wait_list.push(Waiter {process, amount, priority, arrival});
			resource.wait_list.len()
		};
		let name = self.resources[id.0].name.clone();
		self.log(LogLevel::Excessive, &name, &format!("process {} is waiting for {}", process, amount));
		self.notify(id, ResourceChange::WaitList(len));
		Ok(false)
	}

	pub(crate) fn remove_waiter(&mut self, id: ResourceId, process: ProcessId)
	{
		let len = match self.resources.get_mut(id.0) {
			Some(resource) => match resource.wait_list.remove(process) {
				Some(_) => resource.wait_list.len(),
				None => return,
			},
			None => return,
		};
		self.notify(id, ResourceChange::WaitList(len));
	}

	/// Serves the preempted stack and then the wait list while the next
	/// entry fits.
	pub(crate) fn grant_waiting(&mut self, id: ResourceId) -> SimResult<()>
	{
		loop {
			match self.restore_next(id)? {
				Restore::Restored => continue,
				Restore::Blocked => return Ok(()),
				Restore::Nothing => (),
			}

			let (waiter, len) = {
				let rng = &mut self.rng;
				let resource = &mut self.resources[id.0];
				let fits = match resource.wait_list.front(rng) {
					Some(waiter) => waiter.amount <= resource.available,
					None => false,
				};
				if !fits {
					return Ok(());
				}
				match resource.wait_list.pop_front(rng) {
					Some(waiter) => (waiter, resource.wait_list.len()),
					None => return Ok(()),
				}
			};

			self.notify(id, ResourceChange::WaitList(len));
			self.take_units(id, Some(waiter.process), waiter.amount, waiter.priority);
			self.processes[waiter.process.0].waiting = Waiting::Nothing;
			self.schedule_resume(waiter.process, Wake::Granted(id))?;
		}
	}

	pub(crate) fn take_units(&mut self, id: ResourceId, process: Option<ProcessId>, amount: usize, priority: Priority)
	{
		let available = self.resources[id.0].available;
		self.grant_units(id, process, amount, priority, available);
	}

	/// Grants amount units out of available, which may include units that
	/// were just preempted but not yet counted.
	pub(crate) fn grant_units(&mut self, id: ResourceId, process: Option<ProcessId>, amount: usize, priority: Priority, available: usize)
	{
		assert!(amount <= available, "taking {} units with {} available", amount, available);

		let holders = match (self.resources[id.0].preemption.as_mut(), process) {
			(Some(state), Some(process)) => Some(state.add_holder(process, amount, priority)),
			(Some(_), None) => panic!("preemptible resources need a process to hold units"),
			(None, _) => None,
		};

		let name = self.resources[id.0].name.clone();
		match process {
			Some(process) => self.log(LogLevel::Excessive, &name, &format!("granted {} to process {}", amount, process)),
			None => self.log(LogLevel::Excessive, &name, &format!("granted {}", amount)),
		}
		self.set_available(id, available - amount);
		if let Some(holders) = holders {
			self.notify(id, ResourceChange::Holders(holders));
		}
	}

	pub(crate) fn set_available(&mut self, id: ResourceId, available: usize)
	{
		let (old, max_count) = {
			let resource = &mut self.resources[id.0];
			let old = resource.available;
			resource.available = available;
			(old, resource.max_count)
		};
		assert!(available <= max_count, "available {} is over the max count {}", available, max_count);

		self.notify(id, ResourceChange::Available(available));
		if available == 0 && old != 0 {
			self.notify(id, ResourceChange::Depleted);
		}
		if available == max_count && old != max_count {
			self.notify(id, ResourceChange::Full);
		}
	}

	pub(crate) fn notify(&mut self, id: ResourceId, change: ResourceChange)
	{
		let resource = &mut self.resources[id.0];
		let notification = Notification {
			time: self.point.time,
			resource: id,
			change,
			available: resource.available,
			held: resource.held(),
		};
		for listener in resource.listeners.iter_mut() {
			listener(&notification);
		}
	}

	fn check_amount(&self, id: ResourceId, amount: usize) -> SimResult<()>
	{
		let resource = self.resources.get(id.0).ok_or(Fault::UnknownResource(id))?;
		if amount == 0 || amount > resource.max_count {
			return Err(self.capacity_fault(id, amount));
		}
		Ok(())
	}

	fn capacity_fault(&self, id: ResourceId, amount: usize) -> Fault
	{
		let resource = &self.resources[id.0];
		Fault::InvalidCapacity {resource: resource.name.clone(), requested: amount, max_count: resource.max_count}
	}

	fn overuse_fault(&self, id: ResourceId, amount: usize, held: usize) -> Fault
	{
		let resource = &self.resources[id.0];
		Fault::ResourceOveruse {
			resource: resource.name.clone(),
			amount,
			available: resource.available,
			max_count: resource.max_count,
			held,
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::config::*;
	use crate::specs::*;
	use std::cell::RefCell;
	use std::rc::Rc;

	fn new_sim() -> Simulation
	{
		let mut config = Config::new();
		config.log_level = LogLevel::Error;
		Simulation::new(Specs::new(0.0, 100.0, 1.0).with_seed(11), config).unwrap()
	}

	type Log = Rc<RefCell<Vec<(String, f64)>>>;

	// Requests one unit, holds it for service time, and then releases it.
	fn customer(sim: &mut Simulation, name: &str, arrival: f64, resource: ResourceId, priority: Priority, service: f64, log: &Log)
	{
		let log = log.clone();
		let name = name.to_string();
		sim.schedule(arrival, move |sim, _| {
			let mut step = 0;
			sim.spawn_fn(&name.clone(), move |ctx, wake| {
				step += 1;
				match step {
					1 => Ok(Suspend::request(resource).priority(priority)),
					2 => {
						assert_eq!(wake, Wake::Granted(resource));
						log.borrow_mut().push((name.clone(), ctx.now()));
						Ok(Suspend::hold(service))
					},
					_ => {
						ctx.release(resource, 1)?;
						Ok(Suspend::Finish)
					},
				}
			})?;
			Ok(())
		}).unwrap();
	}

	fn names(log: &Log) -> Vec<String>
	{
		log.borrow().iter().map(|e| e.0.clone()).collect()
	}

	#[test]
	fn fcfs_grants_in_arrival_order()
	{
		let mut sim = new_sim();
		let teller = sim.new_resource("teller", Strategy::Fcfs, 1, 1).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));
		customer(&mut sim, "p1", 0.0, teller, 0, 4.0, &log);
		customer(&mut sim, "p2", 1.0, teller, 0, 4.0, &log);
		customer(&mut sim, "p3", 2.0, teller, 0, 4.0, &log);
		sim.run().unwrap();

		assert_eq!(*log.borrow(), vec![
			("p1".to_string(), 0.0),
			("p2".to_string(), 4.0),
			("p3".to_string(), 8.0)]);
		assert_eq!(sim.resource(teller).unwrap().available, 1);
	}

	#[test]
	fn lcfs_serves_the_newest()
	{
		let mut sim = new_sim();
		let teller = sim.new_resource("teller", Strategy::Lcfs, 1, 1).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));
		customer(&mut sim, "p1", 0.0, teller, 0, 4.0, &log);
		customer(&mut sim, "p2", 1.0, teller, 0, 4.0, &log);
		customer(&mut sim, "p3", 2.0, teller, 0, 4.0, &log);
		sim.run().unwrap();

		assert_eq!(names(&log), vec!["p1", "p3", "p2"]);
	}

	#[test]
	fn static_priority_serves_the_best()
	{
		let mut sim = new_sim();
		let teller = sim.new_resource("teller", Strategy::StaticPriority, 1, 1).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));
		customer(&mut sim, "first", 0.0, teller, 9, 4.0, &log);
		customer(&mut sim, "low", 1.0, teller, 5, 4.0, &log);
		customer(&mut sim, "high", 2.0, teller, 1, 4.0, &log);
		customer(&mut sim, "high-too", 3.0, teller, 1, 4.0, &log);
		sim.run().unwrap();

		assert_eq!(names(&log), vec!["first", "high", "high-too", "low"]);
	}

	#[test]
	fn siro_runs_repeat_with_the_same_seed()
	{
		let run = || {
			let mut sim = new_sim();
			let teller = sim.new_resource("teller", Strategy::Siro, 1, 1).unwrap();
			let log = Rc::new(RefCell::new(Vec::new()));
			for i in 0..6 {
				customer(&mut sim, &format!("p{}", i), 0.0, teller, 0, 1.0, &log);
			}
			sim.run().unwrap();
			names(&log)
		};

		let first = run();
		assert_eq!(first.len(), 6);
		assert_eq!(first, run());
	}

	#[test]
	fn count_invariant_holds()
	{
		let mut sim = new_sim();
		let pool = sim.new_resource("pool", Strategy::Fcfs, 3, 3).unwrap();
		let outstanding = Rc::new(RefCell::new(0usize));
		let served = Rc::new(RefCell::new(0));
		for i in 0..8 {
			let o = outstanding.clone();
			let s = served.clone();
			sim.schedule(i as f64*0.5, move |sim, _| {
				sim.spawn_fn(&format!("p{}", i), move |ctx, wake| {
					match wake {
						Wake::Start => Ok(Suspend::request(pool)),
						Wake::Granted(_) => {
							*o.borrow_mut() += 1;
							Ok(Suspend::hold(2.0))
						},
						_ => {
							*o.borrow_mut() -= 1;
							*s.borrow_mut() += 1;
							ctx.release(pool, 1)?;
							Ok(Suspend::Finish)
						},
					}
				})?;
				Ok(())
			}).unwrap();
		}

		// every event lands on a multiple of 0.5 so these see settled counts
		let totals = Rc::new(RefCell::new(Vec::new()));
		for k in 0..20 {
			let o = outstanding.clone();
			let t = totals.clone();
			sim.schedule(k as f64*0.5 + 0.25, move |sim, _| {
				let view = sim.resource(pool)?;
				t.borrow_mut().push(view.available + *o.borrow());
				Ok(())
			}).unwrap();
		}

		let seen = Rc::new(RefCell::new(Vec::new()));
		let s = seen.clone();
		sim.subscribe(pool, move |n| s.borrow_mut().push(n.available)).unwrap();
		sim.run().unwrap();

		assert_eq!(totals.borrow().len(), 20);
		assert!(totals.borrow().iter().all(|&total| total == 3));
		assert!(seen.borrow().iter().all(|&count| count <= 3));
		assert_eq!(*served.borrow(), 8);
		assert_eq!(sim.resource(pool).unwrap().available, 3);
	}

	#[test]
	fn head_of_line_blocks()
	{
		let mut sim = new_sim();
		let pool = sim.new_resource("pool", Strategy::Fcfs, 3, 1).unwrap();
		let order = Rc::new(RefCell::new(Vec::new()));

		for (name, amount) in [("big", 3), ("medium", 2)].iter() {
			let order = order.clone();
			let name = name.to_string();
			let amount = *amount;
			sim.spawn_fn(&name.clone(), move |ctx, wake| {
				match wake {
					Wake::Start => Ok(Suspend::request(pool).amount(amount)),
					_ => {
						order.borrow_mut().push((name.clone(), ctx.now()));
						Ok(Suspend::Finish)
					}
				}
			}).unwrap();
		}
		sim.schedule(2.0, move |sim, _| sim.release(pool, 1)).unwrap();
		sim.schedule(3.0, move |sim, _| sim.release(pool, 1)).unwrap();

		// medium fits at t=2 but has to wait behind big
		sim.run_until(2.5).unwrap();
		let view = sim.resource(pool).unwrap();
		assert_eq!((view.available, view.waiting), (2, 2));

		sim.run_until(5.0).unwrap();
		assert_eq!(*order.borrow(), vec![("big".to_string(), 3.0)]);
		let view = sim.resource(pool).unwrap();
		assert_eq!((view.available, view.waiting), (0, 1));
	}

	#[test]
	fn request_timeout_leaves_the_wait_list()
	{
		let mut sim = new_sim();
		let teller = sim.new_resource("teller", Strategy::Fcfs, 1, 0).unwrap();
		let wakes = Rc::new(RefCell::new(Vec::new()));

		let w = wakes.clone();
		sim.spawn_fn("impatient", move |ctx, wake| {
			w.borrow_mut().push((ctx.now(), wake.clone()));
			match wake {
				Wake::Start => Ok(Suspend::request(teller).within(3.0)),
				_ => Ok(Suspend::Finish),
			}
		}).unwrap();
		sim.schedule(5.0, move |sim, _| sim.release(teller, 1)).unwrap();
		sim.run().unwrap();

		assert_eq!(*wakes.borrow(), vec![(0.0, Wake::Start), (3.0, Wake::TimedOut)]);
		let view = sim.resource(teller).unwrap();
		assert_eq!(view.waiting, 0);
		assert_eq!(view.available, 1);
	}

	#[test]
	fn grant_beats_the_timeout()
	{
		let mut sim = new_sim();
		let teller = sim.new_resource("teller", Strategy::Fcfs, 1, 0).unwrap();
		let wakes = Rc::new(RefCell::new(Vec::new()));

		let w = wakes.clone();
		sim.spawn_fn("patient", move |ctx, wake| {
			w.borrow_mut().push((ctx.now(), wake.clone()));
			match wake {
				Wake::Start => Ok(Suspend::request(teller).within(3.0)),
				_ => Ok(Suspend::hold(10.0)),
			}
		}).unwrap();
		sim.schedule(1.0, move |sim, _| sim.release(teller, 1)).unwrap();
		sim.run_until(20.0).unwrap();

		assert_eq!(*wakes.borrow(), vec![(0.0, Wake::Start), (1.0, Wake::Granted(teller)), (11.0, Wake::Time)]);
	}

	#[test]
	fn overuse_is_reported()
	{
		let mut sim = new_sim();
		let teller = sim.new_resource("teller", Strategy::Fcfs, 2, 1).unwrap();
		sim.release(teller, 1).unwrap();
		match sim.release(teller, 1) {
			Err(Fault::ResourceOveruse {resource, amount, available, max_count, ..}) => {
				assert_eq!(resource, "teller");
				assert_eq!(amount, 1);
				assert_eq!(available, 2);
				assert_eq!(max_count, 2);
			},
			other => panic!("expected ResourceOveruse, not {:?}", other),
		}
	}

	#[test]
	fn capacity_is_checked()
	{
		let mut sim = new_sim();
		assert!(sim.new_resource("none", Strategy::Fcfs, 0, 0).is_err());
		assert!(sim.new_resource("over", Strategy::Fcfs, 2, 3).is_err());

		let teller = sim.new_resource("teller", Strategy::Fcfs, 2, 2).unwrap();
		match sim.try_request(teller, 3, 0) {
			Err(Fault::InvalidCapacity {requested, max_count, ..}) => {
				assert_eq!(requested, 3);
				assert_eq!(max_count, 2);
			},
			other => panic!("expected InvalidCapacity, not {:?}", other),
		}
		assert!(sim.try_request(teller, 0, 0).is_err());
		assert!(sim.try_request(ResourceId(5), 1, 0).is_err());
	}

	#[test]
	fn notifications_track_changes()
	{
		let mut sim = new_sim();
		let teller = sim.new_resource("teller", Strategy::Fcfs, 1, 1).unwrap();
		let changes = Rc::new(RefCell::new(Vec::new()));
		let c = changes.clone();
		sim.subscribe(teller, move |n| c.borrow_mut().push((n.time, n.change.clone()))).unwrap();

		let log = Rc::new(RefCell::new(Vec::new()));
		customer(&mut sim, "p1", 0.0, teller, 0, 2.0, &log);
		customer(&mut sim, "p2", 1.0, teller, 0, 2.0, &log);
		sim.run().unwrap();

		assert_eq!(*changes.borrow(), vec![
			(0.0, ResourceChange::Available(0)),
			(0.0, ResourceChange::Depleted),
			(1.0, ResourceChange::WaitList(1)),
			(2.0, ResourceChange::Available(1)),
			(2.0, ResourceChange::Full),
			(2.0, ResourceChange::WaitList(0)),
			(2.0, ResourceChange::Available(0)),
			(2.0, ResourceChange::Depleted),
			(4.0, ResourceChange::Available(1)),
			(4.0, ResourceChange::Full)]);
	}

	#[test]
	fn cancelled_waiters_are_skipped()
	{
		let mut sim = new_sim();
		let teller = sim.new_resource("teller", Strategy::Fcfs, 1, 0).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));
		customer(&mut sim, "p1", 0.0, teller, 0, 1.0, &log);
		customer(&mut sim, "p2", 0.0, teller, 0, 1.0, &log);
		sim.run_until(1.0).unwrap();
		assert_eq!(sim.resource(teller).unwrap().waiting, 2);

		sim.cancel(ProcessId(0)).unwrap();
		assert_eq!(sim.resource(teller).unwrap().waiting, 1);
		sim.release(teller, 1).unwrap();
		sim.run().unwrap();

		assert_eq!(names(&log), vec!["p2"]);
	}
}
