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

//! Discrete event simulation kernel. A [`Simulation`] owns a time ordered
//! event queue, processes (state machines resumed by the queue), signals, and
//! counting resources with pluggable queueing disciplines and optional
//! preemption. Models are built by spawning processes and running the
//! simulation from the start time to the stop time given by its [`Specs`].
#[macro_use]
pub mod logging;

pub mod config;
pub mod context;
pub mod error;
pub mod preemption;
pub mod process;
pub mod queue;
pub mod resource;
pub mod signal;
pub mod simulation;
pub mod specs;
pub mod strategy;

pub use config::*;
pub use context::*;
pub use error::*;
pub use logging::*;
pub use process::*;
pub use queue::*;
pub use resource::*;
pub use signal::*;
pub use simulation::*;
pub use specs::*;
pub use strategy::*;
