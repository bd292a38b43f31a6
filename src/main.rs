use feldspar::observation::{ObserverError, ObserverEvent};
use feldspar::time::{Duration, Scale};
use feldspar::{Atomic, Component, Coupled, Input, Output, Port, Simulation, SimulationOptions};
use log::info;
use std::env;

/// Emits a job identifier on every period.
#[derive(Debug)]
struct Generator {
    component: Component,
    output: Port<Output, usize>,
    period: Duration,
    count: usize,
}

impl Generator {
    fn new(name: &str, period: Duration) -> Self {
        let mut component = Component::new(name);
        let output = component.add_out_port::<usize>("output");
        Self {
            component,
            output,
            period,
            count: 0,
        }
    }
}

impl Atomic for Generator {
    fn get_component(&self) -> &Component {
        &self.component
    }

    fn get_component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn lambda(&self) {
        self.output.add_value(self.count);
    }

    fn delta_int(&mut self) {
        self.count += 1;
    }

    fn delta_ext(&mut self, _elapsed: Duration) {}

    fn ta(&self) -> Duration {
        self.period
    }
}

/// Serves one job at a time. Jobs arriving while the server is busy are lost.
#[derive(Debug)]
struct Server {
    component: Component,
    input: Port<Input, usize>,
    output: Port<Output, usize>,
    processing: Duration,
    /// Remaining service time of the current job.
    sigma: Duration,
    job: Option<usize>,
}

impl Server {
    fn new(name: &str, processing: Duration) -> Self {
        let mut component = Component::new(name);
        let input = component.add_in_port::<usize>("input");
        let output = component.add_out_port::<usize>("output");
        Self {
            component,
            input,
            output,
            processing,
            sigma: Duration::INFINITY,
            job: None,
        }
    }
}

impl Atomic for Server {
    fn get_component(&self) -> &Component {
        &self.component
    }

    fn get_component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn lambda(&self) {
        if let Some(job) = self.job {
            self.output.add_value(job);
        }
    }

    fn delta_int(&mut self) {
        self.job = None;
        self.sigma = Duration::INFINITY;
    }

    fn delta_ext(&mut self, elapsed: Duration) {
        match self.job {
            None => {
                self.job = self.input.get_values().first().copied();
                self.sigma = self.processing;
            }
            // busy: the arriving job is lost, the current one keeps going
            Some(_) => self.sigma = self.sigma - elapsed,
        }
    }

    fn ta(&self) -> Duration {
        self.sigma
    }
}

/// The binary crate of feldspar runs a generator-server pipeline.
/// USAGE:
/// `cargo run <PERIOD> <PROCESSING> <DURATION>`
/// - `<PERIOD>` is the generator period in base units (default 3).
/// - `<PROCESSING>` is the server processing time in base units (default 5).
/// - `<DURATION>` is the simulated duration bound in base units (default 100).
fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let parse = |i: usize, default: i64| -> i64 {
        args.get(i)
            .map(|arg| arg.parse().expect("argument could not be parsed"))
            .unwrap_or(default)
    };
    let period = Duration::new(parse(1, 3), Scale::BASE);
    let processing = Duration::new(parse(2, 5), Scale::BASE);
    let duration = Duration::new(parse(3, 100), Scale::BASE);

    let generator = Generator::new("generator", period);
    let server = Server::new("server", processing);
    let served = server.output.clone();
    served
        .observe(|event: &ObserverEvent| -> Result<(), ObserverError> {
            info!("served {} at {}", event.payload.as_deref().unwrap_or("?"), event.time);
            Ok(())
        })
        .expect("server output is observable");

    let mut pipeline = Coupled::new("pipeline");
    pipeline.add_out_port::<usize>("served");
    pipeline.add_component(Box::new(generator));
    pipeline.add_component(Box::new(server));
    pipeline.add_ic("generator", "output", "server", "input");
    pipeline.add_eoc("server", "output", "served");

    let options = SimulationOptions {
        duration,
        ..SimulationOptions::default()
    };
    let mut simulation = Simulation::new(pipeline, options).expect("pipeline is well formed");
    simulation.simulate().expect("simulation completed");

    let stats = simulation.transition_stats();
    println!("Simulation ended at t={}", simulation.time());
    println!(
        "Transitions: {} internal, {} external, {} confluent",
        stats.internal, stats.external, stats.confluent
    );
}
