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
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use std::fmt;

/// Integration method. The kernel itself doesn't integrate anything but the
/// method fixes how many phases each iteration has and where they fall.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method
{
	Euler,
	RungeKutta2,
	RungeKutta4,
}

/// Where the random numbers used by the run come from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GeneratorKind
{
	/// Seeded from the wall clock. Runs will not be reproducible.
	Entropy,

	/// Seeded with a fixed value: two runs with the same seed and the same
	/// model produce the same results.
	Seeded(u64),
}

/// Immutable run configuration. All simulated points are derived from these.
#[derive(Clone, Debug, PartialEq)]
pub struct Specs
{
	pub start_time: f64,
	pub stop_time: f64,

	/// Integration step size.
	pub dt: f64,

	/// Defaults to Euler.
	pub method: Method,

	/// Defaults to Entropy.
	pub generator: GeneratorKind,
}

/// A point in simulated time. Integration points have a phase in
/// [0, phase_count), discrete event points always use phase -1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatedPoint
{
	pub time: f64,
	pub iteration: i64,
	pub phase: i32,
}

impl Specs
{
	pub fn new(start_time: f64, stop_time: f64, dt: f64) -> Specs
	{
		Specs {
			start_time,
			stop_time,
			dt,
			method: Method::Euler,
			generator: GeneratorKind::Entropy,
		}
	}

	pub fn with_seed(mut self, seed: u64) -> Specs
	{
		self.generator = GeneratorKind::Seeded(seed);
		self
	}

	pub fn with_method(mut self, method: Method) -> Specs
	{
		self.method = method;
		self
	}

	pub fn validate(&self) -> SimResult<()>
	{
		if !self.start_time.is_finite() || !self.stop_time.is_finite() {
			return Err(Fault::InvalidSpecs(format!("start ({}) and stop ({}) times must be finite", self.start_time, self.stop_time)));
		}
		if !(self.dt > 0.0) || !self.dt.is_finite() {
			return Err(Fault::InvalidSpecs(format!("dt ({}) is not positive", self.dt)));
		}
		if self.stop_time < self.start_time {
			return Err(Fault::InvalidSpecs(format!("stop time ({}) is before start time ({})", self.stop_time, self.start_time)));
		}
		Ok(())
	}

	pub fn phase_count(&self) -> i32
	{
		match self.method {
			Method::Euler => 1,
			Method::RungeKutta2 => 2,
			Method::RungeKutta4 => 4,
		}
	}

	/// Index of the last integration iteration.
	pub fn last_iteration(&self) -> i64
	{
		((self.stop_time - self.start_time)/self.dt).round() as i64
	}

	/// Time of an integration point. A negative phase means the start of
	/// the iteration.
	pub fn basic_time(&self, iteration: i64, phase: i32) -> f64
	{
		let base = self.start_time + (iteration as f64)*self.dt;
		if phase < 0 {
			base
		} else {
			base + self.phase_delta(phase)
		}
	}

	pub fn integration_point(&self, iteration: i64, phase: i32) -> SimulatedPoint
	{
		assert!(phase >= 0 && phase < self.phase_count(), "phase {} is out of range for {:?}", phase, self.method);
		SimulatedPoint {time: self.basic_time(iteration, phase), iteration, phase}
	}

	/// Point used when dispatching an event scheduled at time.
	pub fn event_point(&self, time: f64) -> SimulatedPoint
	{
		let iteration = ((time - self.start_time)/self.dt).floor() as i64;
		SimulatedPoint {time, iteration, phase: -1}
	}

	pub(crate) fn new_rng(&self) -> XorShiftRng
	{
		let seed = match self.generator {
			GeneratorKind::Seeded(seed) => seed,
			GeneratorKind::Entropy => time::OffsetDateTime::now_utc().nanosecond() as u64,
		};
		XorShiftRng::seed_from_u64(seed)
	}

	fn phase_delta(&self, phase: i32) -> f64
	{
		match (self.method, phase) {
			(Method::Euler, _) => 0.0,
			(Method::RungeKutta2, 0) => 0.0,
			(Method::RungeKutta2, _) => self.dt,
			(Method::RungeKutta4, 0) => 0.0,
			(Method::RungeKutta4, 1) | (Method::RungeKutta4, 2) => self.dt/2.0,
			(Method::RungeKutta4, _) => self.dt,
		}
	}
}

impl SimulatedPoint
{
	pub fn is_event_point(&self) -> bool
	{
		self.phase < 0
	}
}

impl fmt::Display for SimulatedPoint
{
	fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result
	{
		write!(formatter, "t={} (n={}, ph={})", self.time, self.iteration, self.phase)
	}
}
