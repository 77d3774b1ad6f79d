//! Customers arrive at a bank at random and wait in line for one of the
//! tellers. Customers who wait too long give up and leave. At the end the
//! simulation reports how many customers were served and how long they waited.
#[macro_use]
extern crate clap;
extern crate rand;
#[macro_use]
extern crate simkern;

use clap::{App, ArgMatches};
use rand::Rng;
use simkern::*;
use std::cell::RefCell;
use std::fmt::Display;
use std::io::{Write, stderr};
use std::process;
use std::rc::Rc;
use std::str::FromStr;

#[derive(Clone)]
struct LocalConfig
{
	tellers: usize,
	arrival_mean: f64,
	service_mean: f64,
	patience: f64,
	strategy: Strategy,
	stop_time: f64,
	seed: Option<u64>,
}

impl LocalConfig
{
	fn new() -> LocalConfig
	{
		// These are the defaults: all of them can be overriden using command line options.
		LocalConfig {
			tellers: 2,
			arrival_mean: 2.0,
			service_mean: 3.5,
			patience: 10.0,
			strategy: Strategy::Fcfs,
			stop_time: 480.0,
			seed: None,
		}
	}
}

#[derive(Default)]
struct Stats
{
	arrived: u32,
	served: u32,
	reneged: u32,
	total_wait: f64,
	max_wait: f64,
	longest_line: usize,
}

fn exponential(rng: &mut impl Rng, mean: f64) -> f64
{
	-mean*(1.0 - rng.gen::<f64>()).ln()
}

fn fatal_err(message: &str) -> !
{
	let _ = writeln!(&mut stderr(), "{}", message);
	process::exit(1);
}

// Min and max are inclusive.
fn match_num<T>(matches: &ArgMatches, name: &str, min: T, max: T) -> T
		where T: Copy + Display + FromStr + PartialOrd
{
	match value_t!(matches.value_of(name), T) {
		Ok(value) if value < min => fatal_err(&format!("--{} should be greater than {}", name, min)),
		Ok(value) if value > max => fatal_err(&format!("--{} should be less than {}", name, max)),
		Ok(value) => value,
		_ => fatal_err(&format!("--{} should be a number", name)),
	}
}

struct Customer
{
	tellers: ResourceId,
	service_mean: f64,
	patience: f64,
	arrived: f64,
	stats: Rc<RefCell<Stats>>,
}

impl Activity for Customer
{
	fn resume(&mut self, ctx: &mut Context, wake: Wake) -> SimResult<Suspend>
	{
		match wake {
			Wake::Start => {
				self.arrived = ctx.now();
				self.stats.borrow_mut().arrived += 1;
				log_debug!(ctx, "arrived");
				Ok(Suspend::request(self.tellers).within(self.patience))
			},
			Wake::Granted(_) => {
				let wait = ctx.now() - self.arrived;
				{
					let mut stats = self.stats.borrow_mut();
					stats.served += 1;
					stats.total_wait += wait;
					stats.max_wait = stats.max_wait.max(wait);
				}
				log_debug!(ctx, "waited {:.1}", wait);

				let service = exponential(ctx.rng(), self.service_mean);
				Ok(Suspend::hold(service))
			},
			Wake::Time => {
				ctx.release(self.tellers, 1)?;
				log_excessive!(ctx, "done");
				Ok(Suspend::Finish)
			},
			Wake::TimedOut => {
				self.stats.borrow_mut().reneged += 1;
				log_info!(ctx, "gave up after {:.1}", ctx.now() - self.arrived);
				Ok(Suspend::Finish)
			},
			_ => Err(ctx.fault(&format!("unexpected {:?}", wake))),
		}
	}
}

// Spawns customers until the bank closes.
struct Door
{
	local: LocalConfig,
	tellers: ResourceId,
	count: u32,
	stats: Rc<RefCell<Stats>>,
}

impl Activity for Door
{
	fn resume(&mut self, ctx: &mut Context, wake: Wake) -> SimResult<Suspend>
	{
		if wake != Wake::Start {
			self.count += 1;
			let customer = Customer {
				tellers: self.tellers,
				service_mean: self.local.service_mean,
				patience: self.local.patience,
				arrived: 0.0,
				stats: self.stats.clone(),
			};
			ctx.spawn(&format!("customer-{}", self.count), customer)?;
		}

		let delay = exponential(ctx.rng(), self.local.arrival_mean);
		Ok(Suspend::hold(delay))
	}
}

fn create_sim(local: LocalConfig, config: Config) -> SimResult<(Simulation, Rc<RefCell<Stats>>)>
{
	let mut specs = Specs::new(0.0, local.stop_time, 1.0);
	if let Some(seed) = local.seed {
		specs = specs.with_seed(seed);
	}

	let mut sim = Simulation::new(specs, config)?;
	let tellers = sim.new_resource("tellers", local.strategy, local.tellers, local.tellers)?;
	let stats = Rc::new(RefCell::new(Stats::default()));

	let s = stats.clone();
	sim.subscribe(tellers, move |n| {
		if let ResourceChange::WaitList(len) = n.change {
			let mut stats = s.borrow_mut();
			stats.longest_line = stats.longest_line.max(len);
		}
	})?;

	let door = Door {local, tellers, count: 0, stats: stats.clone()};
	sim.spawn("door", door)?;
	Ok((sim, stats))
}

fn parse_options() -> (LocalConfig, Config)
{
	let mut local = LocalConfig::new();
	let mut config = Config::new();

	// see https://docs.rs/clap/2.34.0/clap/struct.Arg.html#method.from_usage for syntax
	let usage = format!(
		"--arrivals=[TIME] 'Mean time between customer arrivals [{default_arrivals}]'
		--log=[LEVEL:GLOB]... 'Overrides --log-level, glob is used to match process and resource names'
		--log-level=[LEVEL] 'Default log level: {log_levels} [{default_level}]'
		--no-colors 'Don't color code console output'
		--patience=[TIME] 'How long customers will wait in line [{default_patience}]'
		--seed=[N] 'Random number generator seed [random]'
		--service=[TIME] 'Mean time tellers spend with a customer [{default_service}]'
		--stop=[TIME] 'How long the bank stays open [{default_stop}]'
		--strategy=[NAME] 'How the line is served: fcfs, lcfs, siro, or priority [fcfs]'
		--tellers=[N] 'Number of tellers [{default_tellers}]'",
		default_arrivals = local.arrival_mean,
		default_patience = local.patience,
		default_service = local.service_mean,
		default_stop = local.stop_time,
		default_tellers = local.tellers,
		default_level = format!("{:?}", config.log_level).to_lowercase(),
		log_levels = log_levels());

	let matches = App::new("bank")
		.version("1.0")
		.author("Jesse Jones <jesse9jones@gmail.com>")
		.about("Simulates customers waiting in line for bank tellers.")
		.args_from_usage(&usage)
	.get_matches();

	if matches.is_present("arrivals") {
		local.arrival_mean = match_num(&matches, "arrivals", 0.01, 1000.0);
	}

	if matches.is_present("patience") {
		local.patience = match_num(&matches, "patience", 0.0, 1.0e6);
	}

	if matches.is_present("service") {
		local.service_mean = match_num(&matches, "service", 0.01, 1000.0);
	}

	if matches.is_present("stop") {
		local.stop_time = match_num(&matches, "stop", 1.0, 1.0e6);
	}

	if matches.is_present("tellers") {
		local.tellers = match_num(&matches, "tellers", 1, 100);
	}

	if matches.is_present("seed") {
		local.seed = Some(match_num(&matches, "seed", 1, u64::MAX));
	}

	if let Some(name) = matches.value_of("strategy") {
		match Strategy::parse(name) {
			Some(strategy) => local.strategy = strategy,
			None => fatal_err("--strategy should be fcfs, lcfs, siro, or priority"),
		}
	}

	if let Some(level) = matches.value_of("log-level") {
		if let Some(e) = config.parse_log_level(level) {
			fatal_err(&e);
		}
	}

	if let Some(values) = matches.values_of("log") {
		if let Some(e) = config.parse_log_levels(values.collect()) {
			fatal_err(&e);
		}
	}

	config.colorize = !matches.is_present("no-colors");

	(local, config)
}

fn main()
{
	let (local, config) = parse_options();

	let (mut sim, stats) = match create_sim(local, config) {
		Ok(result) => result,
		Err(e) => fatal_err(&e.to_string()),
	};
	if let Err(e) = sim.run() {
		fatal_err(&e.to_string());
	}

	let stats = stats.borrow();
	let mean = if stats.served > 0 {stats.total_wait/(stats.served as f64)} else {0.0};
	println!("arrived: {}", stats.arrived);
	println!("served:  {}", stats.served);
	println!("reneged: {}", stats.reneged);
	println!("wait:    {:.2} mean, {:.2} max", mean, stats.max_wait);
	println!("line:    {} longest", stats.longest_line);
}
