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

//! Signals are what processes wait on when they wait for an event: some other
//! process or callback triggers the signal and every process waiting on it
//! is resumed with the trigger's `Payload`.
use crate::error::*;
use crate::logging::*;
use crate::process::*;
use crate::simulation::*;
use std::fmt;

/// Signals are referenced using a small integer, like processes and resources.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SignalId(pub usize);

impl fmt::Display for SignalId
{
	fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result
	{
		write!(formatter, "{}", self.0)
	}
}

/// Value delivered to processes when a signal is triggered.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload
{
	Empty,
	Int(i64),
	Float(f64),
	Text(String),
}

pub(crate) struct SignalState
{
	pub(crate) name: String,
	pub(crate) waiters: Vec<ProcessId>,
	pub(crate) triggered: u64,
}

impl Simulation
{
	pub fn new_signal(&mut self, name: &str) -> SignalId
	{
		assert!(!name.is_empty(), "name should not be empty");
		let id = SignalId(self.signals.len());
		self.signals.push(SignalState {name: name.to_string(), waiters: Vec::new(), triggered: 0});
		self.note_name(name);
		id
	}

	pub fn signal_name(&self, id: SignalId) -> SimResult<&str>
	{
		self.signals.get(id.0).map(|s| s.name.as_str()).ok_or(Fault::UnknownSignal(id))
	}

	/// Number of processes currently waiting on the signal.
	pub fn signal_waiters(&self, id: SignalId) -> SimResult<usize>
	{
		self.signals.get(id.0).map(|s| s.waiters.len()).ok_or(Fault::UnknownSignal(id))
	}

	/// Resumes every process waiting on the signal with payload. The processes
	/// run at the current time, in the order they started waiting. Returns the
	/// number of processes that were resumed.
	pub fn trigger(&mut self, id: SignalId, payload: Payload) -> SimResult<usize>
	{
		let waiters = match self.signals.get_mut(id.0) {
			Some(signal) => {
				signal.triggered += 1;
				std::mem::take(&mut signal.waiters)
			},
			None => return Err(Fault::UnknownSignal(id)),
		};

		let name = self.signals[id.0].name.clone();
		self.log(LogLevel::Excessive, &name, &format!("triggered with {:?}, waking {} processes", payload, waiters.len()));

		for &process in waiters.iter() {
			self.processes[process.0].waiting = Waiting::Nothing;
			self.schedule_resume(process, Wake::Signal(payload.clone()))?;
		}
		Ok(waiters.len())
	}

	pub(crate) fn add_signal_waiter(&mut self, id: SignalId, process: ProcessId) -> SimResult<()>
	{
		match self.signals.get_mut(id.0) {
			Some(signal) => {signal.waiters.push(process); Ok(())},
			None => Err(Fault::UnknownSignal(id)),
		}
	}

	pub(crate) fn remove_signal_waiter(&mut self, id: SignalId, process: ProcessId)
	{
		if let Some(signal) = self.signals.get_mut(id.0) {
			signal.waiters.retain(|&p| p != process);
		}
	}
}
