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
use crate::process::*;
use crate::resource::*;
use crate::signal::*;
use thiserror::Error;

/// Faults abort the run: they mean either the model or the kernel is broken.
/// Expected outcomes like cancellation or a timeout are reported through
/// `ProcessState` and `Wake` instead.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Fault
{
	#[error("InvalidScheduling: can't schedule at t={requested} when the queue is already at t={watermark}")]
	InvalidScheduling {requested: f64, watermark: f64},

	#[error("TimeOrderingViolation: {operation} at t={requested} but the queue is already at t={watermark}")]
	TimeOrderingViolation {operation: &'static str, requested: f64, watermark: f64},

	#[error("ResourceOveruse: releasing {amount} from {resource} with {available} of {max_count} available and {held} held")]
	ResourceOveruse {resource: String, amount: usize, available: usize, max_count: usize, held: usize},

	#[error("InvalidReactivation: process {process} is {state:?}, not Passivated")]
	InvalidReactivation {process: String, state: ProcessState},

	#[error("InvalidCapacity: {resource} can't handle {requested} with a max count of {max_count}")]
	InvalidCapacity {resource: String, requested: usize, max_count: usize},

	#[error("invalid specs: {0}")]
	InvalidSpecs(String),

	#[error("unknown process {0}")]
	UnknownProcess(ProcessId),

	#[error("unknown resource {0}")]
	UnknownResource(ResourceId),

	#[error("unknown signal {0}")]
	UnknownSignal(SignalId),

	#[error("{0} needs to be called from a running process")]
	NoCurrentProcess(&'static str),

	/// Returned by activities for failures in the model itself.
	#[error("process {process} failed: {message}")]
	Model {process: String, message: String},
}

pub type SimResult<T> = Result<T, Fault>;
