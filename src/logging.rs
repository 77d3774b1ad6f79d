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
#![macro_use]

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum LogLevel
{
	Error,	// update log_levels if this changes
	Warning,
	Info,
	Debug,
	Excessive
}

/// For use in --help messages.
pub fn log_levels() -> &'static str
{
	"error, warning, info, debug, or excessive"
}

impl LogLevel
{
	pub fn parse(text: &str) -> Option<LogLevel>
	{
		match text {
			"error" => Some(LogLevel::Error),
			"warning" => Some(LogLevel::Warning),
			"info" => Some(LogLevel::Info),
			"debug" => Some(LogLevel::Debug),
			"excessive" => Some(LogLevel::Excessive),
			_ => None,
		}
	}
}

/// Generic macro that calls the `Context` log method. More often you'll use one of
/// the other macros like log_info!.
#[macro_export]
macro_rules! log_at
{
	($context:expr, $level:expr, $msg:expr) => ($context.log($level, $msg));
	($context:expr, $level:expr, $fmt:expr, $($arg:tt)*) => ($context.log($level, &format!($fmt, $($arg)*)));
}

#[macro_export]
macro_rules! log_error
{
	($context:expr) => ($context.log($crate::LogLevel::Error, ""));
	($context:expr, $msg:expr) => ($context.log($crate::LogLevel::Error, $msg));
	($context:expr, $fmt:expr, $($arg:tt)*) => ($context.log($crate::LogLevel::Error, &format!($fmt, $($arg)*)));
}

#[macro_export]
macro_rules! log_warning
{
	($context:expr) => ($context.log($crate::LogLevel::Warning, ""));
	($context:expr, $msg:expr) => ($context.log($crate::LogLevel::Warning, $msg));
	($context:expr, $fmt:expr, $($arg:tt)*) => ($context.log($crate::LogLevel::Warning, &format!($fmt, $($arg)*)));
}

/// # Examples
///
/// ```rust,ignore
/// #[macro_use]
/// extern crate simkern;
///
/// log_info!(ctx);						// logs an empty line
/// log_info!(ctx, "hello");			// logs a string
/// log_info!(ctx, "x = {:?}", x);	// logs using a format string
/// ```
#[macro_export]
macro_rules! log_info
{
	($context:expr) => ($context.log($crate::LogLevel::Info, ""));
	($context:expr, $msg:expr) => ($context.log($crate::LogLevel::Info, $msg));
	($context:expr, $fmt:expr, $($arg:tt)*) => ($context.log($crate::LogLevel::Info, &format!($fmt, $($arg)*)));
}

#[macro_export]
macro_rules! log_debug
{
	($context:expr) => ($context.log($crate::LogLevel::Debug, ""));
	($context:expr, $msg:expr) => ($context.log($crate::LogLevel::Debug, $msg));
	($context:expr, $fmt:expr, $($arg:tt)*) => ($context.log($crate::LogLevel::Debug, &format!($fmt, $($arg)*)));
}

#[macro_export]
macro_rules! log_excessive
{
	($context:expr) => ($context.log($crate::LogLevel::Excessive, ""));
	($context:expr, $msg:expr) => ($context.log($crate::LogLevel::Excessive, $msg));
	($context:expr, $fmt:expr, $($arg:tt)*) => ($context.log($crate::LogLevel::Excessive, &format!($fmt, $($arg)*)));
}
