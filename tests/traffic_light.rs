use feldspar::time::{Duration, Scale, TimePoint};
use feldspar::{Atomic, Component, Coupled, Input, Output, Port, Simulation, SimulationOptions};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Red,
    Green,
    Orange,
    Manual,
}

/// Cycles red -> green -> orange until an operator pins it to manual mode.
#[derive(Debug)]
struct TrafficLight {
    component: Component,
    to_manual: Port<Input, ()>,
    current: Port<Output, Phase>,
    phase: Phase,
    history: Rc<RefCell<Vec<Phase>>>,
}

impl TrafficLight {
    fn new(name: &str, history: Rc<RefCell<Vec<Phase>>>) -> Self {
        let mut component = Component::new(name);
        let to_manual = component.add_in_port::<()>("to_manual");
        let current = component.add_out_port::<Phase>("current");
        Self {
            component,
            to_manual,
            current,
            phase: Phase::Red,
            history,
        }
    }
}

impl Atomic for TrafficLight {
    fn get_component(&self) -> &Component {
        &self.component
    }

    fn get_component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn lambda(&self) {
        self.current.add_value(self.phase);
    }

    fn delta_int(&mut self) {
        self.phase = match self.phase {
            Phase::Red => Phase::Green,
            Phase::Green => Phase::Orange,
            Phase::Orange => Phase::Red,
            Phase::Manual => Phase::Manual,
        };
        self.history.borrow_mut().push(self.phase);
    }

    fn delta_ext(&mut self, _elapsed: Duration) {
        if !self.to_manual.is_empty() {
            self.phase = Phase::Manual;
            self.history.borrow_mut().push(self.phase);
        }
    }

    fn ta(&self) -> Duration {
        let units = match self.phase {
            Phase::Red => 60,
            Phase::Green => 50,
            Phase::Orange => 10,
            Phase::Manual => return Duration::INFINITY,
        };
        Duration::new(units, Scale::BASE)
    }
}

/// Emits a single unit value after a delay.
#[derive(Debug)]
struct Trigger {
    component: Component,
    output: Port<Output, ()>,
    delay: Duration,
    spent: bool,
}

impl Trigger {
    fn new(name: &str, delay: Duration) -> Self {
        let mut component = Component::new(name);
        let output = component.add_out_port::<()>("output");
        Self {
            component,
            output,
            delay,
            spent: false,
        }
    }
}

impl Atomic for Trigger {
    fn get_component(&self) -> &Component {
        &self.component
    }

    fn get_component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    fn lambda(&self) {
        self.output.add_value(());
    }

    fn delta_int(&mut self) {
        self.spent = true;
    }

    fn delta_ext(&mut self, _elapsed: Duration) {}

    fn ta(&self) -> Duration {
        if self.spent {
            Duration::INFINITY
        } else {
            self.delay
        }
    }
}

#[test]
fn test_phases_cycle_in_order() {
    let history = Rc::new(RefCell::new(Vec::new()));
    let light = TrafficLight::new("light", history.clone());
    let options = SimulationOptions {
        duration: Duration::new(1_000, Scale::BASE),
        ..SimulationOptions::default()
    };
    let mut simulation = Simulation::new(light, options).unwrap();
    simulation.simulate().unwrap();

    // red:60 + green:50 + orange:10 per cycle; eight full cycles fit
    let stats = simulation.transition_stats();
    assert_eq!(stats.internal, 24);
    assert_eq!(stats.external, 0);
    assert_eq!(*simulation.time(), TimePoint::new(960, Scale::BASE));

    let seen = history.borrow();
    let expected: Vec<Phase> = [Phase::Green, Phase::Orange, Phase::Red]
        .into_iter()
        .cycle()
        .take(24)
        .collect();
    assert_eq!(*seen, expected);
}

#[test]
fn test_manual_override_pins_the_light() {
    let history = Rc::new(RefCell::new(Vec::new()));
    let mut crossing = Coupled::new("crossing");
    crossing.add_component(Box::new(TrafficLight::new("light", history.clone())));
    crossing.add_component(Box::new(Trigger::new(
        "operator",
        Duration::new(30, Scale::BASE),
    )));
    crossing.add_ic("operator", "output", "light", "to_manual");

    let options = SimulationOptions {
        duration: Duration::new(1_000, Scale::BASE),
        ..SimulationOptions::default()
    };
    let mut simulation = Simulation::new(crossing, options).unwrap();
    simulation.simulate().unwrap();

    // the light was still red at t=30; the override pins it and nothing is
    // ever scheduled again
    assert_eq!(*history.borrow(), [Phase::Manual]);
    let stats = simulation.transition_stats();
    assert_eq!(stats.external, 1);
    assert_eq!(stats.internal, 1);
    assert_eq!(*simulation.time(), TimePoint::new(30, Scale::BASE));
}
