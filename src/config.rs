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
use crate::logging::*;
use glob::Pattern;

/// Used to configure how the `Simulation` reports what it is doing. The
/// simulated clock itself is configured with `Specs`.
pub struct Config
{
	/// Defaults to Info.
	pub log_level: LogLevel,

	/// Overrides log_level for processes, resources, and signals with
	/// names that match the glob. The first match wins.
	pub log_levels: Vec<(Pattern, LogLevel)>,

	/// Names longer than this are truncated when logging. Defaults to 0
	/// which means names are padded to the longest name instead.
	pub max_log_path: usize,

	/// Use escape sequences to color code stdout.
	/// Defaults to true.
	pub colorize: bool,

	/// Used when logging to stdout when colorize is on.
	/// Defaults to bright red. See See https://en.wikipedia.org/wiki/ANSI_escape_code#Colors
	/// and https://aweirdimagination.net/2015/02/21/256-color-terminals for information on
	/// color escape codes.
	pub error_escape_code: String,

	/// Used when logging to stdout when colorize is on.
	/// Defaults to red.
	pub warning_escape_code: String,

	/// Used when logging to stdout when colorize is on.
	/// Defaults to bold black.
	pub info_escape_code: String,

	/// Used when logging to stdout when colorize is on.
	/// Defaults to black.
	pub debug_escape_code: String,

	/// Used when logging to stdout when colorize is on.
	/// Defaults to light gray.
	pub excessive_escape_code: String,
}

impl Config
{
	pub fn new() -> Config
	{
		Config {
			log_level: LogLevel::Info,
			log_levels: Vec::new(),
			max_log_path: 0,
			colorize: true,
			error_escape_code: "\x1b[31;1m".to_string(),
			warning_escape_code: "\x1b[31m".to_string(),
			info_escape_code: "\x1b[30;1m".to_string(),
			debug_escape_code: "".to_string(),
			excessive_escape_code: "\x1b[1;38;5;244m".to_string(),
		}
	}

	/// Handles --log-level=LEVEL. Returns an error message on failure.
	pub fn parse_log_level(&mut self, text: &str) -> Option<String>
	{
		match LogLevel::parse(text) {
			Some(level) => {self.log_level = level; None},
			None => Some(format!("--log-level should be {}", log_levels())),
		}
	}

	/// Handles --log=LEVEL:GLOB arguments. Returns an error message on failure.
	pub fn parse_log_levels(&mut self, values: Vec<&str>) -> Option<String>
	{
		for value in values {
			let parts: Vec<&str> = value.splitn(2, ':').collect();
			if parts.len() != 2 {
				return Some(format!("--log value '{}' should be LEVEL:GLOB", value));
			}

			let level = match LogLevel::parse(parts[0]) {
				Some(level) => level,
				None => return Some(format!("--log level '{}' should be {}", parts[0], log_levels())),
			};

			match Pattern::new(parts[1]) {
				Ok(pattern) => self.log_levels.push((pattern, level)),
				Err(e) => return Some(format!("--log glob '{}' is malformed: {}", parts[1], e)),
			}
		}
		None
	}

	/// Returns the level to use for the named process, resource, or signal.
	pub fn level_for(&self, name: &str) -> LogLevel
	{
		for &(ref pattern, level) in self.log_levels.iter() {
			if pattern.matches(name) {
				return level;
			}
		}
		self.log_level
	}
}

impl Default for Config
{
	fn default() -> Config
	{
		Config::new()
	}
}
