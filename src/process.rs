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

//! Processes are long running simulated activities. Each one is a state machine
//! (an [`Activity`]) that the scheduler resumes when whatever it was waiting on
//! happens. A step runs to completion and then says where the process suspends
//! next using a [`Suspend`]. Resumptions always go through the event queue so
//! only one step (or one event callback) ever runs at a time.
use crate::context::*;
use crate::error::*;
use crate::logging::*;
use crate::resource::*;
use crate::signal::*;
use crate::simulation::*;
use crate::strategy::*;
use std::fmt;

/// To make lifetime management easier processes are referenced using a small
/// integer instead of a rust reference.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ProcessId(pub usize);

impl fmt::Display for ProcessId
{
	fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result
	{
		write!(formatter, "{}", self.0)
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessState
{
	/// Running or scheduled to run at the current time.
	Runnable,
	WaitingOnTime,
	WaitingOnEvent,
	WaitingOnResource,
	Passivated,
	Cancelled,
	Finished,
}

impl ProcessState
{
	pub fn is_terminal(self) -> bool
	{
		self == ProcessState::Cancelled || self == ProcessState::Finished
	}
}

/// Why a process is being resumed.
#[derive(Clone, Debug, PartialEq)]
pub enum Wake
{
	/// First step of the process.
	Start,

	/// A hold finished.
	Time,

	/// The signal the process was waiting on was triggered.
	Signal(Payload),

	/// The requested units were granted. Note that this also happens
	/// within the same step if the resource had enough units available.
	Granted(ResourceId),

	/// A wait or request with a timeout ran out of time. The process is no
	/// longer waiting on the signal or resource.
	TimedOut,

	/// Another process called reactivate.
	Reactivated,
}

/// Where a process suspends after a step.
#[derive(Clone, Debug, PartialEq)]
pub enum Suspend
{
	/// Wait for a duration of simulated time.
	Hold(f64),

	/// Wait until the signal is triggered or the timeout elapses.
	Wait {signal: SignalId, timeout: Option<f64>},

	/// Wait until amount units of the resource are granted. Lower priority
	/// values are served first by priority queues and preempt worse holders
	/// of preemptible resources.
	Request {resource: ResourceId, amount: usize, priority: Priority, timeout: Option<f64>},

	/// Wait until another process calls reactivate.
	Passivate,

	Finish,
}

impl Suspend
{
	pub fn hold(duration: f64) -> Suspend
	{
		Suspend::Hold(duration)
	}

	pub fn wait(signal: SignalId) -> Suspend
	{
		Suspend::Wait {signal, timeout: None}
	}

	pub fn wait_within(signal: SignalId, timeout: f64) -> Suspend
	{
		Suspend::Wait {signal, timeout: Some(timeout)}
	}

	pub fn request(resource: ResourceId) -> Suspend
	{
		Suspend::Request {resource, amount: 1, priority: 0, timeout: None}
	}

	/// Sets the number of units for a request.
	pub fn amount(self, amount: usize) -> Suspend
	{
		match self {
			Suspend::Request {resource, priority, timeout, ..} => Suspend::Request {resource, amount, priority, timeout},
			_ => panic!("amount is only used with requests, not {:?}", self),
		}
	}

	/// Sets the priority for a request.
	pub fn priority(self, priority: Priority) -> Suspend
	{
		match self {
			Suspend::Request {resource, amount, timeout, ..} => Suspend::Request {resource, amount, priority, timeout},
			_ => panic!("priority is only used with requests, not {:?}", self),
		}
	}

	/// Adds a timeout to a request.
	pub fn within(self, timeout: f64) -> Suspend
	{
		match self {
			Suspend::Request {resource, amount, priority, ..} => Suspend::Request {resource, amount, priority, timeout: Some(timeout)},
			Suspend::Wait {signal, ..} => Suspend::Wait {signal, timeout: Some(timeout)},
			_ => panic!("timeouts are only used with waits and requests, not {:?}", self),
		}
	}
}

/// The behavior of a process. Each call runs one step: the process reacts to
/// wake and returns the point at which it suspends next.
pub trait Activity
{
	fn resume(&mut self, ctx: &mut Context, wake: Wake) -> SimResult<Suspend>;
}

impl<A: Activity + ?Sized> Activity for Box<A>
{
	fn resume(&mut self, ctx: &mut Context, wake: Wake) -> SimResult<Suspend>
	{
		(**self).resume(ctx, wake)
	}
}

/// Adapts a closure into an `Activity`, see `Simulation::spawn_fn`.
pub struct FnActivity<F>(pub F);

impl<F> Activity for FnActivity<F>
	where F: FnMut(&mut Context, Wake) -> SimResult<Suspend>
{
	fn resume(&mut self, ctx: &mut Context, wake: Wake) -> SimResult<Suspend>
	{
		(self.0)(ctx, wake)
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Waiting
{
	Nothing,
	Signal(SignalId),
	Resource(ResourceId),
}

pub(crate) struct ProcessSlot
{
	pub(crate) name: String,
	pub(crate) state: ProcessState,

	/// None while the process is running a step or once it is done.
	pub(crate) activity: Option<Box<dyn Activity>>,

	/// Bumped whenever the process suspends or a resumption is committed.
	/// Queued resumptions that carry an older generation are ignored.
	pub(crate) generation: u64,

	pub(crate) wake_at: Option<f64>,
	pub(crate) waiting: Waiting,

	/// Number of preemptible resources that currently have this process
	/// on their preempted stack.
	pub(crate) preemptions: u32,

	/// Remaining hold time of a preempted process.
	pub(crate) frozen: Option<f64>,

	/// Resumption that arrived while the process was preempted.
	pub(crate) deferred: Option<Wake>,
}

pub(crate) enum Next
{
	Parked,
	Continue(Wake),
}

impl Simulation
{
	/// Adds a process that will start at the current time.
	pub fn spawn<A>(&mut self, name: &str, activity: A) -> SimResult<ProcessId>
		where A: Activity + 'static
	{
		let now = self.now();
		self.spawn_at(now, name, activity)
	}

	/// Adds a process implemented with a closure.
	///
	/// # Examples
	///
	/// ```rust,ignore
	/// let mut served = false;
	/// sim.spawn_fn("customer", move |ctx, wake| {
	/// 	match wake {
	/// 		Wake::Start => Ok(Suspend::request(tellers)),
	/// 		Wake::Granted(_) if !served => {served = true; Ok(Suspend::hold(5.0))},
	/// 		_ => {ctx.release(tellers, 1)?; Ok(Suspend::Finish)},
	/// 	}
	/// })?;
	/// ```
	pub fn spawn_fn<F>(&mut self, name: &str, activity: F) -> SimResult<ProcessId>
		where F: FnMut(&mut Context, Wake) -> SimResult<Suspend> + 'static
	{
		self.spawn(name, FnActivity(activity))
	}

	pub fn spawn_at<A>(&mut self, time: f64, name: &str, activity: A) -> SimResult<ProcessId>
		where A: Activity + 'static
	{
		assert!(!name.is_empty(), "name should not be empty");

		let id = ProcessId(self.processes.len());
		self.queue.enqueue(time, Box::new(move |sim, _| sim.resume_callback(id, 0, Wake::Start)))?;
		self.processes.push(ProcessSlot {
			name: name.to_string(),
			state: ProcessState::Runnable,
			activity: Some(Box::new(activity)),
			generation: 0,
			wake_at: None,
			waiting: Waiting::Nothing,
			preemptions: 0,
			frozen: None,
			deferred: None,
		});
		self.note_name(name);
		Ok(id)
	}

	pub fn process_state(&self, id: ProcessId) -> SimResult<ProcessState>
	{
		self.processes.get(id.0).map(|p| p.state).ok_or(Fault::UnknownProcess(id))
	}

	pub fn process_name(&self, id: ProcessId) -> SimResult<&str>
	{
		self.processes.get(id.0).map(|p| p.name.as_str()).ok_or(Fault::UnknownProcess(id))
	}

	/// True if a preemptible resource took units away from the process and
	/// hasn't given them back yet.
	pub fn is_preempted(&self, id: ProcessId) -> SimResult<bool>
	{
		self.processes.get(id.0).map(|p| p.preemptions > 0).ok_or(Fault::UnknownProcess(id))
	}

	/// The process whose step is executing, if any.
	pub fn current_process(&self) -> Option<ProcessId>
	{
		self.current
	}

	/// Stops the process for good. Anything already scheduled for it is
	/// ignored when it fires. Resources the process holds are not released.
	pub fn cancel(&mut self, id: ProcessId) -> SimResult<()>
	{
		let waiting = {
			let slot = self.processes.get_mut(id.0).ok_or(Fault::UnknownProcess(id))?;
			if slot.state.is_terminal() {
				return Ok(());
			}

			slot.state = ProcessState::Cancelled;
			slot.generation += 1;
			slot.activity = None;
			slot.wake_at = None;
			slot.frozen = None;
			slot.deferred = None;
			std::mem::replace(&mut slot.waiting, Waiting::Nothing)
		};

		let name = self.processes[id.0].name.clone();
		self.log(LogLevel::Debug, &name, "cancelled");

		match waiting {
			Waiting::Nothing => (),
			Waiting::Signal(signal) => self.remove_signal_waiter(signal, id),
			Waiting::Resource(resource) => {
				self.remove_waiter(resource, id);
				self.grant_waiting(resource)?;
			},
		}
		self.forget_preempted(id)
	}

	/// Resumes a passivated process at the current time.
	pub fn reactivate(&mut self, id: ProcessId) -> SimResult<()>
	{
		let slot = self.processes.get(id.0).ok_or(Fault::UnknownProcess(id))?;
		if slot.state != ProcessState::Passivated {
			return Err(Fault::InvalidReactivation {process: slot.name.clone(), state: slot.state});
		}
		self.schedule_resume(id, Wake::Reactivated)
	}

	/// Commits to resuming the process at the current time.
	pub(crate) fn schedule_resume(&mut self, id: ProcessId, wake: Wake) -> SimResult<()>
	{
		let now = self.now();
		let generation = {
			let slot = &mut self.processes[id.0];
			slot.generation += 1;
			slot.state = ProcessState::Runnable;
			slot.wake_at = None;
			slot.generation
		};
		self.queue.enqueue(now, Box::new(move |sim, _| sim.resume_callback(id, generation, wake)))?;
		Ok(())
	}

	fn schedule_timeout(&mut self, id: ProcessId, generation: u64, timeout: f64) -> SimResult<()>
	{
		let at = self.checked_delay(timeout)?;
		self.queue.enqueue(at, Box::new(move |sim, _| sim.timeout_callback(id, generation)))?;
		Ok(())
	}

	fn checked_delay(&self, delay: f64) -> SimResult<f64>
	{
		let now = self.now();
		if !(delay >= 0.0) || !delay.is_finite() {
			return Err(Fault::InvalidScheduling {requested: now + delay, watermark: now});
		}
		Ok(now + delay)
	}

	fn is_stale(&self, id: ProcessId, generation: u64) -> bool
	{
		let slot = &self.processes[id.0];
		slot.generation != generation || slot.state.is_terminal()
	}

	fn resume_callback(&mut self, id: ProcessId, generation: u64, wake: Wake) -> SimResult<()>
	{
		if self.is_stale(id, generation) {
			let name = self.processes[id.0].name.clone();
			self.log(LogLevel::Excessive, &name, &format!("ignoring stale {:?}", wake));
			return Ok(());
		}

		if self.processes[id.0].preemptions > 0 {
			self.processes[id.0].deferred = Some(wake);
			return Ok(());
		}
		self.run_step(id, wake)
	}

	fn timeout_callback(&mut self, id: ProcessId, generation: u64) -> SimResult<()>
	{
		if self.is_stale(id, generation) {
			return Ok(());
		}

		let waiting = std::mem::replace(&mut self.processes[id.0].waiting, Waiting::Nothing);
		match waiting {
			Waiting::Nothing => (),
			Waiting::Signal(signal) => self.remove_signal_waiter(signal, id),
			Waiting::Resource(resource) => {
				self.remove_waiter(resource, id);
				self.grant_waiting(resource)?;
			},
		}

		let name = self.processes[id.0].name.clone();
		self.log(LogLevel::Debug, &name, "timed out");
		if self.processes[id.0].preemptions > 0 {
			self.processes[id.0].generation += 1;
			self.processes[id.0].deferred = Some(Wake::TimedOut);
			return Ok(());
		}
		self.run_step(id, Wake::TimedOut)
	}

	/// Runs steps of the process until it parks somewhere.
	pub(crate) fn run_step(&mut self, id: ProcessId, wake: Wake) -> SimResult<()>
	{
		let mut wake = wake;
		loop {
			let mut activity = match self.processes[id.0].activity.take() {
				Some(activity) => activity,
				None => return Ok(()),
			};
			self.processes[id.0].state = ProcessState::Runnable;

			let name = self.processes[id.0].name.clone();
			if wake == Wake::Start {
				self.log(LogLevel::Debug, &name, "started");
			} else {
				self.log(LogLevel::Excessive, &name, &format!("resuming with {:?}", wake));
			}

			let previous = self.current.replace(id);
			let result = {
				let mut ctx = Context::new(self, id);
				activity.resume(&mut ctx, wake)
			};
			self.current = previous;

			if self.processes[id.0].state == ProcessState::Cancelled {
				return result.map(|_| ());
			}

			let suspend = match result {
				Ok(suspend) => suspend,
				Err(fault) => {
					self.processes[id.0].state = ProcessState::Finished;
					self.log(LogLevel::Error, &name, &format!("failed: {}", fault));
					return Err(fault);
				}
			};

			self.processes[id.0].activity = Some(activity);
			match self.suspend(id, suspend)? {
				Next::Parked => return Ok(()),
				Next::Continue(next) => wake = next,
			}
		}
	}

	fn suspend(&mut self, id: ProcessId, suspend: Suspend) -> SimResult<Next>
	{
		self.processes[id.0].generation += 1;
		let generation = self.processes[id.0].generation;

		match suspend {
			Suspend::Hold(duration) => {
				let at = self.checked_delay(duration)?;
				self.queue.enqueue(at, Box::new(move |sim, _| sim.resume_callback(id, generation, Wake::Time)))?;
				let slot = &mut self.processes[id.0];
				slot.state = ProcessState::WaitingOnTime;
				slot.wake_at = Some(at);
				Ok(Next::Parked)
			},
			Suspend::Wait {signal, timeout} => {
				self.add_signal_waiter(signal, id)?;
				self.processes[id.0].state = ProcessState::WaitingOnEvent;
				self.processes[id.0].waiting = Waiting::Signal(signal);
				if let Some(timeout) = timeout {
					self.schedule_timeout(id, generation, timeout)?;
				}
				Ok(Next::Parked)
			},
			Suspend::Request {resource, amount, priority, timeout} => {
				if self.request(id, resource, amount, priority)? {
					return Ok(Next::Continue(Wake::Granted(resource)));
				}
				self.processes[id.0].state = ProcessState::WaitingOnResource;
				self.processes[id.0].waiting = Waiting::Resource(resource);
				if let Some(timeout) = timeout {
					self.schedule_timeout(id, generation, timeout)?;
				}
				Ok(Next::Parked)
			},
			Suspend::Passivate => {
				self.processes[id.0].state = ProcessState::Passivated;
				let name = self.processes[id.0].name.clone();
				self.log(LogLevel::Excessive, &name, "passivated");
				Ok(Next::Parked)
			},
			Suspend::Finish => {
				let slot = &mut self.processes[id.0];
				slot.state = ProcessState::Finished;
				slot.activity = None;
				let name = slot.name.clone();
				self.log(LogLevel::Debug, &name, "finished");
				Ok(Next::Parked)
			},
		}
	}

	/// Stops a process that lost its units to a better priority requester.
	/// A hold in progress is frozen until the units are given back.
	pub(crate) fn force_suspend(&mut self, id: ProcessId)
	{
		let now = self.now();
		let slot = &mut self.processes[id.0];
		slot.preemptions += 1;
		if slot.preemptions == 1 && slot.state == ProcessState::WaitingOnTime {
			if let Some(at) = slot.wake_at.take() {
				slot.frozen = Some(at - now);
				slot.generation += 1;
			}
		}
	}

	/// Undoes force_suspend once the process is off every preempted stack.
	pub(crate) fn lift_preemption(&mut self, id: ProcessId) -> SimResult<()>
	{
		let (frozen, deferred) = {
			let slot = &mut self.processes[id.0];
			assert!(slot.preemptions > 0, "process {} isn't preempted", slot.name);
			slot.preemptions -= 1;
			if slot.preemptions > 0 || slot.state.is_terminal() {
				return Ok(());
			}
			(slot.frozen.take(), slot.deferred.take())
		};

		if let Some(remaining) = frozen {
			let at = self.now() + remaining;
			let generation = {
				let slot = &mut self.processes[id.0];
				slot.generation += 1;
				slot.wake_at = Some(at);
				slot.generation
			};
			self.queue.enqueue(at, Box::new(move |sim, _| sim.resume_callback(id, generation, Wake::Time)))?;
		} else if let Some(wake) = deferred {
			self.schedule_resume(id, wake)?;
		}
		Ok(())
	}
}
