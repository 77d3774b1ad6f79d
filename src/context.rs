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
use crate::logging::*;
use crate::process::*;
use crate::resource::*;
use crate::signal::*;
use crate::simulation::*;
use crate::specs::*;
use crate::strategy::*;
use rand_xorshift::XorShiftRng;

/// Encapsulates information related to the process currently being executed.
pub struct Context<'a>
{
	sim: &'a mut Simulation,
	id: ProcessId,
}

impl<'a> Context<'a>
{
	pub(crate) fn new(sim: &'a mut Simulation, id: ProcessId) -> Context<'a>
	{
		Context {sim, id}
	}

	/// The process being executed.
	pub fn id(&self) -> ProcessId
	{
		self.id
	}

	pub fn name(&self) -> &str
	{
		&self.sim.processes[self.id.0].name
	}

	pub fn now(&self) -> f64
	{
		self.sim.now()
	}

	pub fn point(&self) -> SimulatedPoint
	{
		self.sim.point()
	}

	pub fn specs(&self) -> &Specs
	{
		self.sim.specs()
	}

	/// The run's generator. Use this for anything random so that seeded
	/// runs are reproducible.
	pub fn rng(&mut self) -> &mut XorShiftRng
	{
		self.sim.rng()
	}

	/// Escape hatch for things without a Context wrapper.
	pub fn simulation(&mut self) -> &mut Simulation
	{
		self.sim
	}

	pub fn spawn<A>(&mut self, name: &str, activity: A) -> SimResult<ProcessId>
		where A: Activity + 'static
	{
		self.sim.spawn(name, activity)
	}

	pub fn spawn_fn<F>(&mut self, name: &str, activity: F) -> SimResult<ProcessId>
		where F: FnMut(&mut Context, Wake) -> SimResult<Suspend> + 'static
	{
		self.sim.spawn_fn(name, activity)
	}

	pub fn cancel(&mut self, id: ProcessId) -> SimResult<()>
	{
		self.sim.cancel(id)
	}

	pub fn reactivate(&mut self, id: ProcessId) -> SimResult<()>
	{
		self.sim.reactivate(id)
	}

	pub fn process_state(&self, id: ProcessId) -> SimResult<ProcessState>
	{
		self.sim.process_state(id)
	}

	pub fn trigger(&mut self, signal: SignalId, payload: Payload) -> SimResult<usize>
	{
		self.sim.trigger(signal, payload)
	}

	/// Gives back units this process was granted.
	pub fn release(&mut self, resource: ResourceId, amount: usize) -> SimResult<()>
	{
		self.sim.release_by(Some(self.id), resource, amount)
	}

	/// Grabs units without suspending. Returns false if they aren't available.
	pub fn try_request(&mut self, resource: ResourceId, amount: usize, priority: Priority) -> SimResult<bool>
	{
		self.sim.admit(Some(self.id), resource, amount, priority)
	}

	pub fn resource(&self, resource: ResourceId) -> SimResult<ResourceView>
	{
		self.sim.resource(resource)
	}

	pub fn schedule<F>(&mut self, time: f64, callback: F) -> SimResult<u64>
		where F: FnOnce(&mut Simulation, &SimulatedPoint) -> SimResult<()> + 'static
	{
		self.sim.schedule(time, callback)
	}

	pub fn schedule_after<F>(&mut self, delay: f64, callback: F) -> SimResult<u64>
		where F: FnOnce(&mut Simulation, &SimulatedPoint) -> SimResult<()> + 'static
	{
		self.sim.schedule_after(delay, callback)
	}

	/// Error for the running process, e.g. `return Err(ctx.fault("out of parts"))`.
	pub fn fault(&self, message: &str) -> Fault
	{
		Fault::Model {process: self.name().to_string(), message: message.to_string()}
	}

	/// Normally the log_info! style macros are used instead of this.
	pub fn log(&self, level: LogLevel, message: &str)
	{
		self.sim.log(level, self.name(), message);
	}

	pub fn log_error(&self, message: &str)
	{
		self.log(LogLevel::Error, message);
	}

	pub fn log_warning(&self, message: &str)
	{
		self.log(LogLevel::Warning, message);
	}

	pub fn log_info(&self, message: &str)
	{
		self.log(LogLevel::Info, message);
	}

	pub fn log_debug(&self, message: &str)
	{
		self.log(LogLevel::Debug, message);
	}

	pub fn log_excessive(&self, message: &str)
	{
		self.log(LogLevel::Excessive, message);
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::config::*;
	use crate::strategy::*;
	use std::cell::RefCell;
	use std::rc::Rc;

	#[test]
	fn context_knows_the_running_process()
	{
		let mut config = Config::new();
		config.log_level = LogLevel::Error;
		let mut sim = Simulation::new(Specs::new(0.0, 10.0, 1.0).with_seed(3), config).unwrap();
		let seen = Rc::new(RefCell::new(Vec::new()));

		let s = seen.clone();
		let id = sim.spawn_fn("inspector", move |ctx, _| {
			s.borrow_mut().push((ctx.id(), ctx.name().to_string(), ctx.point().phase));
			let current = ctx.simulation().current_process();
			assert_eq!(current, Some(ctx.id()));
			log_debug!(ctx, "inspected at {}", ctx.now());
			Ok(Suspend::Finish)
		}).unwrap();
		sim.run().unwrap();

		assert_eq!(*seen.borrow(), vec![(id, "inspector".to_string(), -1)]);
		assert_eq!(sim.current_process(), None);
	}

	#[test]
	fn try_request_and_release()
	{
		let mut config = Config::new();
		config.log_level = LogLevel::Error;
		let mut sim = Simulation::new(Specs::new(0.0, 10.0, 1.0).with_seed(3), config).unwrap();
		let pumps = sim.new_resource("pumps", Strategy::Fcfs, 2, 2).unwrap();
		let results = Rc::new(RefCell::new(Vec::new()));

		let r = results.clone();
		sim.spawn_fn("car", move |ctx, _| {
			r.borrow_mut().push(ctx.try_request(pumps, 2, 0)?);
			r.borrow_mut().push(ctx.try_request(pumps, 1, 0)?);
			assert_eq!(ctx.resource(pumps)?.available, 0);
			ctx.release(pumps, 2)?;
			Ok(Suspend::Finish)
		}).unwrap();
		sim.run().unwrap();

		assert_eq!(*results.borrow(), vec![true, false]);
		assert_eq!(sim.resource(pumps).unwrap().available, 2);
	}
}
