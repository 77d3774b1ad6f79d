//! A workshop with several machines and a single repairman. Machines break
//! down at random and need the repairman to get going again. When he isn't
//! fixing machines the repairman does less important jobs which are put
//! aside (and resumed later) whenever a machine breaks.
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

const REPAIR_PRIORITY: Priority = 1;
const JOB_PRIORITY: Priority = 2;

#[derive(Clone)]
struct LocalConfig
{
	machines: usize,
	failure_mean: f64,
	repair_time: f64,
	job_time: f64,
	stop_time: f64,
	seed: Option<u64>,
}

impl LocalConfig
{
	fn new() -> LocalConfig
	{
		// These are the defaults: all of them can be overriden using command line options.
		LocalConfig {
			machines: 10,
			failure_mean: 300.0,
			repair_time: 30.0,
			job_time: 30.0,
			stop_time: 4.0*7.0*24.0*60.0,
			seed: None,
		}
	}
}

#[derive(Default)]
struct Stats
{
	repairs: u32,
	downtime: f64,
	jobs: u32,
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

#[derive(Clone, Copy, Debug, PartialEq)]
enum MachineState
{
	Working,
	Broken(f64),	// time it broke
	Repairing(f64),
}

struct Machine
{
	repairman: ResourceId,
	failure_mean: f64,
	repair_time: f64,
	state: MachineState,
	stats: Rc<RefCell<Stats>>,
}

impl Activity for Machine
{
	fn resume(&mut self, ctx: &mut Context, wake: Wake) -> SimResult<Suspend>
	{
		match (self.state, wake) {
			(MachineState::Working, Wake::Start) => {
				let ttf = -self.failure_mean*(1.0 - ctx.rng().gen::<f64>()).ln();
				Ok(Suspend::hold(ttf))
			},
			(MachineState::Working, Wake::Time) => {
				log_debug!(ctx, "broke");
				self.state = MachineState::Broken(ctx.now());
				Ok(Suspend::request(self.repairman).priority(REPAIR_PRIORITY))
			},
			(MachineState::Broken(broke), Wake::Granted(_)) => {
				self.state = MachineState::Repairing(broke);
				Ok(Suspend::hold(self.repair_time))
			},
			(MachineState::Repairing(broke), Wake::Time) => {
				ctx.release(self.repairman, 1)?;
				{
					let mut stats = self.stats.borrow_mut();
					stats.repairs += 1;
					stats.downtime += ctx.now() - broke;
				}
				log_debug!(ctx, "repaired after {:.1}", ctx.now() - broke);

				self.state = MachineState::Working;
				let ttf = -self.failure_mean*(1.0 - ctx.rng().gen::<f64>()).ln();
				Ok(Suspend::hold(ttf))
			},
			(state, wake) => Err(ctx.fault(&format!("got {:?} while {:?}", wake, state))),
		}
	}
}

// Unimportant work that the repairman does whenever no machine is broken.
// Preemption freezes a job in progress so each job always takes job_time.
struct OtherJobs
{
	repairman: ResourceId,
	job_time: f64,
	stats: Rc<RefCell<Stats>>,
}

impl Activity for OtherJobs
{
	fn resume(&mut self, ctx: &mut Context, wake: Wake) -> SimResult<Suspend>
	{
		match wake {
			Wake::Start => Ok(Suspend::request(self.repairman).priority(JOB_PRIORITY)),
			Wake::Granted(_) => Ok(Suspend::hold(self.job_time)),
			Wake::Time => {
				ctx.release(self.repairman, 1)?;
				self.stats.borrow_mut().jobs += 1;
				log_excessive!(ctx, "finished a job");
				Ok(Suspend::request(self.repairman).priority(JOB_PRIORITY))
			},
			_ => Err(ctx.fault(&format!("unexpected {:?}", wake))),
		}
	}
}

fn create_sim(local: LocalConfig, config: Config) -> SimResult<(Simulation, Rc<RefCell<Stats>>)>
{
	let mut specs = Specs::new(0.0, local.stop_time, 1.0);
	if let Some(seed) = local.seed {
		specs = specs.with_seed(seed);
	}

	let mut sim = Simulation::new(specs, config)?;
	let repairman = sim.new_preemptible_resource("repairman", Strategy::StaticPriority, 1, 1)?;
	let stats = Rc::new(RefCell::new(Stats::default()));

	for i in 0..local.machines {
		let machine = Machine {
			repairman,
			failure_mean: local.failure_mean,
			repair_time: local.repair_time,
			state: MachineState::Working,
			stats: stats.clone(),
		};
		sim.spawn(&format!("machine-{}", i), machine)?;
	}
	sim.spawn("other-jobs", OtherJobs {repairman, job_time: local.job_time, stats: stats.clone()})?;

	Ok((sim, stats))
}

fn parse_options() -> (LocalConfig, Config)
{
	let mut local = LocalConfig::new();
	let mut config = Config::new();

	// see https://docs.rs/clap/2.34.0/clap/struct.Arg.html#method.from_usage for syntax
	let usage = format!(
		"--failures=[TIME] 'Mean time between machine failures [{default_failures}]'
		--jobs=[TIME] 'How long each of the other jobs takes [{default_jobs}]'
		--log=[LEVEL:GLOB]... 'Overrides --log-level, glob is used to match process and resource names'
		--log-level=[LEVEL] 'Default log level: {log_levels} [{default_level}]'
		--machines=[N] 'Number of machines in the shop [{default_machines}]'
		--no-colors 'Don't color code console output'
		--repair=[TIME] 'How long repairs take [{default_repair}]'
		--seed=[N] 'Random number generator seed [random]'
		--stop=[TIME] 'How long to run the shop [{default_stop}]'",
		default_failures = local.failure_mean,
		default_jobs = local.job_time,
		default_machines = local.machines,
		default_repair = local.repair_time,
		default_stop = local.stop_time,
		default_level = format!("{:?}", config.log_level).to_lowercase(),
		log_levels = log_levels());

	let matches = App::new("machine_shop")
		.version("1.0")
		.author("Jesse Jones <jesse9jones@gmail.com>")
		.about("Simulates machines that break down and a repairman who fixes them.")
		.args_from_usage(&usage)
	.get_matches();

	if matches.is_present("failures") {
		local.failure_mean = match_num(&matches, "failures", 1.0, 1.0e6);
	}

	if matches.is_present("jobs") {
		local.job_time = match_num(&matches, "jobs", 0.1, 1.0e6);
	}

	if matches.is_present("machines") {
		local.machines = match_num(&matches, "machines", 1, 1000);
	}

	if matches.is_present("repair") {
		local.repair_time = match_num(&matches, "repair", 0.1, 1.0e6);
	}

	if matches.is_present("stop") {
		local.stop_time = match_num(&matches, "stop", 1.0, 1.0e8);
	}

	if matches.is_present("seed") {
		local.seed = Some(match_num(&matches, "seed", 1, u64::MAX));
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
	let machines = local.machines;

	let (mut sim, stats) = match create_sim(local, config) {
		Ok(result) => result,
		Err(e) => fatal_err(&e.to_string()),
	};
	if let Err(e) = sim.run() {
		fatal_err(&e.to_string());
	}

	let stats = stats.borrow();
	let mean = if stats.repairs > 0 {stats.downtime/(stats.repairs as f64)} else {0.0};
	println!("machines:   {}", machines);
	println!("repairs:    {}", stats.repairs);
	println!("downtime:   {:.1} mean", mean);
	println!("other jobs: {}", stats.jobs);
}
