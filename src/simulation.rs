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
use crate::config::*;
use crate::error::*;
use crate::logging::*;
use crate::process::*;
use crate::queue::*;
use crate::resource::*;
use crate::signal::*;
use crate::specs::*;
use rand_xorshift::XorShiftRng;
use std::cmp::max;

/// This is the top-level data structure. It owns the event queue along with
/// every process, resource, and signal. Once a model is set up the simulation
/// dispatches events until the stop time.
pub struct Simulation
{
	pub(crate) specs: Specs,
	pub(crate) config: Config,
	precision: usize,	// number of decimal places to include when logging, derived from specs.dt
	pub(crate) queue: EventQueue,
	pub(crate) point: SimulatedPoint,
	pub(crate) processes: Vec<ProcessSlot>,	// indexed by ProcessId
	pub(crate) resources: Vec<ResourceState>,	// indexed by ResourceId
	pub(crate) signals: Vec<SignalState>,	// indexed by SignalId
	pub(crate) current: Option<ProcessId>,
	pub(crate) rng: XorShiftRng,
	initialized: bool,
	next_iteration: i64,
	max_name_len: usize,
}

impl Simulation
{
	pub fn new(specs: Specs, config: Config) -> SimResult<Simulation>
	{
		specs.validate()?;

		let precision = (-specs.dt.log10()).ceil().max(0.0) as usize;
		let rng = specs.new_rng();
		let point = specs.integration_point(0, 0);
		let queue = EventQueue::new(specs.start_time);
		Ok(Simulation {
			specs,
			config,
			precision,
			queue,
			point,
			processes: Vec::new(),
			resources: Vec::new(),
			signals: Vec::new(),
			current: None,
			rng,
			initialized: false,
			next_iteration: 0,
			max_name_len: "simulation".len(),
		})
	}

	/// Current simulated time.
	pub fn now(&self) -> f64
	{
		self.point.time
	}

	pub fn point(&self) -> SimulatedPoint
	{
		self.point
	}

	pub fn specs(&self) -> &Specs
	{
		&self.specs
	}

	pub fn config(&self) -> &Config
	{
		&self.config
	}

	/// Use this if you want to do something random when setting up the model.
	pub fn rng(&mut self) -> &mut XorShiftRng
	{
		&mut self.rng
	}

	pub fn queue(&self) -> &EventQueue
	{
		&self.queue
	}

	pub fn pending_events(&self) -> usize
	{
		self.queue.count()
	}

	/// Runs callback once the simulation reaches time.
	pub fn schedule<F>(&mut self, time: f64, callback: F) -> SimResult<u64>
		where F: FnOnce(&mut Simulation, &SimulatedPoint) -> SimResult<()> + 'static
	{
		self.queue.enqueue(time, Box::new(callback))
	}

	pub fn schedule_after<F>(&mut self, delay: f64, callback: F) -> SimResult<u64>
		where F: FnOnce(&mut Simulation, &SimulatedPoint) -> SimResult<()> + 'static
	{
		let now = self.now();
		if !(delay >= 0.0) || !delay.is_finite() {
			return Err(Fault::InvalidScheduling {requested: now + delay, watermark: now});
		}
		self.schedule(now + delay, callback)
	}

	/// Fires the pending events that are due at point. Calls made while a
	/// drain is already in progress do nothing.
	pub fn drain(&mut self, point: &SimulatedPoint, mode: DrainMode) -> SimResult<()>
	{
		if self.queue.draining {
			return Ok(());
		}

		let watermark = self.queue.watermark();
		if mode.is_strict() && point.time < watermark {
			return Err(Fault::TimeOrderingViolation {operation: "drain", requested: point.time, watermark});
		}

		self.queue.draining = true;
		let result = self.dispatch_events(point, mode.includes_current());
		self.queue.draining = false;

		if point.time >= self.queue.watermark() {
			self.point = *point;
		}
		result
	}

	fn dispatch_events(&mut self, point: &SimulatedPoint, include_current: bool) -> SimResult<()>
	{
		while let Some((time, callback)) = self.queue.pop_due(point.time, include_current)? {
			self.point = self.specs.event_point(time);
			self.log(LogLevel::Excessive, "simulation", &format!("dispatching event at {}", time));

			let event_point = self.point;
			callback(self, &event_point)?;
		}
		Ok(())
	}

	/// Catches up on anything scheduled before the start time.
	pub fn init(&mut self) -> SimResult<()>
	{
		if !self.initialized {
			self.initialized = true;
			let start = self.specs.integration_point(0, 0);
			self.drain(&start, DrainMode::EarlierCatchUp)?;
		}
		Ok(())
	}

	/// Advances to the next integration iteration. Returns false once the
	/// last iteration has been processed.
	pub fn step(&mut self) -> SimResult<bool>
	{
		self.init()?;
		if self.next_iteration > self.specs.last_iteration() {
			return Ok(false);
		}

		// last_iteration rounds so the final iteration can land a bit past the stop time
		let point = self.specs.integration_point(self.next_iteration, 0);
		if point.time > self.specs.stop_time + 1.0e-9*self.specs.dt {
			return Ok(false);
		}
		self.next_iteration += 1;
		self.drain(&point, DrainMode::Current)?;
		Ok(true)
	}

	/// Dispatches events until the stop time. Events scheduled after the stop
	/// time are left on the queue.
	pub fn run(&mut self) -> SimResult<()>
	{
		self.log(LogLevel::Info, "simulation", &format!("running from {} to {}", self.specs.start_time, self.specs.stop_time));
		while self.step()? {
		}

		let stop = self.specs.event_point(self.specs.stop_time);
		if stop.time > self.queue.watermark() || self.queue.peek_time() == Some(stop.time) {
			self.drain(&stop, DrainMode::Current)?;
		}

		self.log(LogLevel::Info, "simulation", &format!("finished with {} events pending", self.queue.count()));
		Ok(())
	}

	/// Dispatches events up to and including time.
	pub fn run_until(&mut self, time: f64) -> SimResult<()>
	{
		self.init()?;
		let point = self.specs.event_point(time);
		self.drain(&point, DrainMode::Current)?;

		let next = ((time - self.specs.start_time)/self.specs.dt).floor() as i64 + 1;
		self.next_iteration = max(self.next_iteration, next);
		Ok(())
	}

	// Names are padded to the longest name so that log messages line up.
	pub(crate) fn note_name(&mut self, name: &str)
	{
		self.max_name_len = max(name.chars().count(), self.max_name_len);
	}

	pub(crate) fn log(&self, level: LogLevel, name: &str, message: &str)
	{
		if level <= self.config.level_for(name) {
			let t = self.point.time;
			let path = self.logged_name(name);
			if self.config.colorize {
				let begin_escape = match level {
					LogLevel::Error		=> &self.config.error_escape_code,
					LogLevel::Warning	=> &self.config.warning_escape_code,
					LogLevel::Info		=> &self.config.info_escape_code,
					LogLevel::Debug		=> &self.config.debug_escape_code,
					LogLevel::Excessive	=> &self.config.excessive_escape_code,
				};
				print!("{0}{1:.2$}   {3} {4}{5}\n", begin_escape, t, self.precision, path, message, end_escape());
			} else {
				let prefix = match level {
					LogLevel::Error		=> "Error",
					LogLevel::Warning	=> "Warn ",
					LogLevel::Info		=> "Info ",
					LogLevel::Debug		=> "Debug",
					LogLevel::Excessive	=> "Exces",
				};
				print!("{0:.1$}  {2} {3}  {4}\n", t, self.precision, prefix, path, message);
			}
		}
	}

	fn logged_name(&self, name: &str) -> String
	{
		let limit = self.config.max_log_path;
		if limit > 0 && self.max_name_len > limit {
			let len = name.chars().count();
			if len > limit {
				let tail: String = name.chars().skip(len - limit).collect();
				format!("…{}", tail)
			} else {
				format!("{0:<1$}", name, limit)
			}
		} else {
			format!("{0:<1$}", name, self.max_name_len)
		}
	}
}

fn end_escape() -> &'static str
{
	"\x1b[0m"
}
