use super::port::AbstractPort;
use super::{Component, Input, Output, Port};
use crate::errors::SimulationError;
use crate::scheduling::{EventSet, SchedulerKind, TimeCache};
use crate::simulation::Simulator;
use crate::RcHash;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{Debug, Display, Formatter, Result};
use std::rc::Rc;

/// Helper type for keeping track of couplings and avoiding duplicates.
type CouplingsMap = HashMap<RcHash, HashSet<RcHash>>;

/// A directed coupling: messages on `from` are appended to `to` when routed.
#[derive(Debug)]
pub(crate) struct Coupling {
    pub(crate) from: Rc<dyn AbstractPort>,
    pub(crate) to: Rc<dyn AbstractPort>,
    /// Child owning the source port; `None` when it is the coupled model itself.
    pub(crate) source: Option<usize>,
    /// Child owning the destination port; `None` when it is the coupled model itself.
    pub(crate) target: Option<usize>,
}

/// Coupled DEVS model. Doubles as the coordinator of its children: it owns
/// the event set scheduling them, the time cache their elapsed durations are
/// recomputed from, and the synchronization set of children that must
/// transition in the current cycle.
#[derive(Debug)]
pub struct Coupled {
    /// Component wrapped by the coupled model.
    pub(crate) component: Component,
    /// Keys are IDs of subcomponents, and values are indices of [`Coupled::comps`].
    comps_map: HashMap<String, usize>,
    /// Components of the DEVS coupled model.
    pub(crate) comps: Vec<Box<dyn Simulator>>,
    /// External input couplings (map form for duplicate detection).
    eic_map: CouplingsMap,
    /// Internal couplings (map form for duplicate detection).
    ic_map: CouplingsMap,
    /// External output couplings (map form for duplicate detection).
    eoc_map: CouplingsMap,
    /// External input couplings (serialized for routing).
    pub(crate) eics: Vec<Coupling>,
    /// Internal couplings (serialized for routing).
    pub(crate) ics: Vec<Coupling>,
    /// External output couplings (serialized for routing).
    pub(crate) eocs: Vec<Coupling>,
    /// Event set scheduling the children, keyed by [`Coupled::comps`] indices.
    pub(crate) scheduler: Box<dyn EventSet>,
    /// Reset points from which child elapsed durations are recomputed.
    pub(crate) cache: TimeCache,
    /// Children to transition this cycle. The flag records whether the child
    /// fired as imminent (true) or was only influenced by routed inputs.
    pub(crate) synchronize: BTreeMap<usize, bool>,
}

impl Coupled {
    /// Creates a new coupled DEVS model.
    pub fn new(name: &str) -> Self {
        Self {
            component: Component::new(name),
            comps_map: HashMap::new(),
            comps: Vec::new(),
            eic_map: HashMap::new(),
            ic_map: HashMap::new(),
            eoc_map: HashMap::new(),
            eics: Vec::new(),
            ics: Vec::new(),
            eocs: Vec::new(),
            scheduler: SchedulerKind::default().create(),
            cache: TimeCache::default(),
            synchronize: BTreeMap::new(),
        }
    }

    /// Replaces the event-set backend of this coordinator and of every nested
    /// coupled model. Only meaningful before initialization.
    pub fn select_scheduler(&mut self, kind: SchedulerKind) {
        self.scheduler = kind.create();
        for comp in &mut self.comps {
            comp.set_scheduler(kind);
        }
    }

    /// Adds a new input port of type [`Port<Input, T>`] and returns a reference to it.
    /// It panics if there is already an input port with the same name.
    pub fn add_in_port<T: 'static + Clone + Debug>(&mut self, name: &str) -> Port<Input, T> {
        let port = self.component.add_in_port::<T>(name);
        port.0.set_unobservable();
        port
    }

    /// Adds a new output port of type [`Port<Output, T>`] and returns a reference to it.
    /// It panics if there is already an output port with the same name.
    pub fn add_out_port<T: 'static + Clone + Debug>(&mut self, name: &str) -> Port<Output, T> {
        let port = self.component.add_out_port::<T>(name);
        // ports of coupled models are not externally observable
        port.0.set_unobservable();
        port
    }

    /// Adds a new component to the coupled model.
    /// If there is already a component with the same name as the new component, it panics.
    pub fn add_component<T: 'static + Simulator>(&mut self, component: Box<T>) {
        let component_name = component.get_name();
        if self.comps_map.contains_key(component_name) {
            panic!("coupled model already contains component with the name provided")
        }
        self.comps_map
            .insert(component_name.to_string(), self.comps.len());
        self.comps.push(component);
    }

    /// Returns a reference to a component with the provided name.
    /// If the coupled model does not contain any model with that name, it panics.
    fn get_component(&self, name: &str) -> &dyn Simulator {
        self.comps[self.comp_index(name)].as_ref()
    }

    fn comp_index(&self, name: &str) -> usize {
        *self
            .comps_map
            .get(name)
            .expect("coupled model does not contain component with the name provided")
    }

    /// Helper function to add a new coupling to a coupled model.
    fn add_coupling(
        coup_map: &mut CouplingsMap,
        coup_vec: &mut Vec<Coupling>,
        from: Rc<dyn AbstractPort>,
        to: Rc<dyn AbstractPort>,
        source: Option<usize>,
        target: Option<usize>,
    ) {
        if !from.is_compatible(&*to) {
            panic!("ports are incompatible");
        }
        let sources = coup_map.entry(RcHash(to.clone())).or_default();
        if !sources.insert(RcHash(from.clone())) {
            panic!("duplicate coupling");
        }
        coup_vec.push(Coupling {
            from,
            to,
            source,
            target,
        });
    }

    /// Adds a new EIC to the model.
    /// You must provide the input port name of the coupled model,
    /// the receiving component name, and its input port name.
    /// This method panics if:
    /// - the origin port does not exist.
    /// - the destination component does not exist.
    /// - the destination port does not exist.
    /// - ports are not compatible.
    /// - coupling already exists.
    pub fn add_eic(&mut self, port_from: &str, component_to: &str, port_to: &str) {
        let from = self.component.get_in_port(port_from);
        let target = self.comp_index(component_to);
        let to = self.comps[target].get_component().get_in_port(port_to);
        Self::add_coupling(&mut self.eic_map, &mut self.eics, from, to, None, Some(target));
    }

    /// Adds a new IC to the model.
    /// You must provide the sending component name, its output port name,
    /// the receiving component name, and its input port name.
    /// This method panics if:
    /// - the origin component does not exist.
    /// - the origin port does not exist.
    /// - the destination component does not exist.
    /// - the destination port does not exist.
    /// - ports are not compatible.
    /// - coupling already exists.
    pub fn add_ic(
        &mut self,
        component_from: &str,
        port_from: &str,
        component_to: &str,
        port_to: &str,
    ) {
        let source = self.comp_index(component_from);
        let target = self.comp_index(component_to);
        let from = self.comps[source].get_component().get_out_port(port_from);
        let to = self.comps[target].get_component().get_in_port(port_to);
        Self::add_coupling(
            &mut self.ic_map,
            &mut self.ics,
            from,
            to,
            Some(source),
            Some(target),
        );
    }

    /// Adds a new EOC to the model.
    /// You must provide the sending component name, its output port name,
    /// and the output port name of the coupled model.
    /// This method panics if:
    /// - the origin component does not exist.
    /// - the origin port does not exist.
    /// - the destination port does not exist.
    /// - ports are not compatible.
    /// - coupling already exists.
    pub fn add_eoc(&mut self, component_from: &str, port_from: &str, port_to: &str) {
        let source = self.comp_index(component_from);
        let from = self.comps[source].get_component().get_out_port(port_from);
        let to = self.component.get_out_port(port_to);
        Self::add_coupling(&mut self.eoc_map, &mut self.eocs, from, to, Some(source), None);
    }

    /// Looks up a child's output port by name, for observer attachment.
    pub fn find_output_port(
        &self,
        component: &str,
        port: &str,
    ) -> std::result::Result<Rc<dyn AbstractPort>, SimulationError> {
        let no_such_port = || SimulationError::NoSuchPort {
            model: component.to_string(),
            port: port.to_string(),
        };
        let idx = self.comps_map.get(component).ok_or_else(&no_such_port)?;
        self.comps[*idx]
            .get_component()
            .try_get_out_port(port)
            .ok_or_else(&no_such_port)
    }

    /// Checks that every coupling endpoint is still owned by the component it
    /// was recorded for, and recurses into the children.
    pub(crate) fn validate_structure(&self) -> std::result::Result<(), SimulationError> {
        for coupling in self.eics.iter().chain(&self.ics).chain(&self.eocs) {
            let source = self.endpoint_component(coupling.source);
            let source_owns = match coupling.source {
                Some(_) => source.owns_out_port(&coupling.from),
                None => source.owns_in_port(&coupling.from),
            };
            if !source_owns {
                return Err(SimulationError::InvalidPortHost {
                    model: source.get_name().to_string(),
                    port: coupling.from.get_name().to_string(),
                });
            }
            let target = self.endpoint_component(coupling.target);
            let target_owns = match coupling.target {
                Some(_) => target.owns_in_port(&coupling.to),
                None => target.owns_out_port(&coupling.to),
            };
            if !target_owns {
                return Err(SimulationError::InvalidPortHost {
                    model: target.get_name().to_string(),
                    port: coupling.to.get_name().to_string(),
                });
            }
        }
        for comp in &self.comps {
            comp.validate()?;
        }
        Ok(())
    }

    /// Component owning a coupling endpoint: a child, or the coupled model
    /// itself.
    fn endpoint_component(&self, idx: Option<usize>) -> &Component {
        match idx {
            Some(i) => self.comps[i].get_component(),
            None => &self.component,
        }
    }
}

impl Display for Coupled {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.component.get_name())
    }
}
