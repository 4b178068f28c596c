use crate::application::scheduler::{RunOptions, Scheduler};
use crate::domain::socket::{InputSocket, OutputSocket, SocketPath, SocketSchema};
use crate::error::{validation_codes, ComponentError, PipelineError, ValidationIssue};
use crate::types::{PipelineOutputs, RunInputs, SocketValues};
use crate::Component;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

/// Loop bound used when none is configured
pub const DEFAULT_MAX_LOOP_ITERATIONS: usize = 100;

/// A directed edge from an output socket to an input socket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Producing component
    pub sender: String,

    /// Output socket on the producer
    pub sender_socket: String,

    /// Consuming component
    pub receiver: String,

    /// Input socket on the consumer
    pub receiver_socket: String,

    /// Feedback edge of a bounded loop; excluded from the acyclicity check
    pub is_loop: bool,
}

impl Connection {
    /// `"sender.socket"`
    pub fn sender_path(&self) -> String {
        format!("{}.{}", self.sender, self.sender_socket)
    }

    /// `"receiver.socket"`
    pub fn receiver_path(&self) -> String {
        format!("{}.{}", self.receiver, self.receiver_socket)
    }
}

/// A component instance together with its lifecycle guards
pub(crate) struct ComponentSlot {
    name: String,
    instance: Arc<dyn Component>,
    schema: SocketSchema,
    warmed: OnceCell<Result<(), ComponentError>>,
    run_lock: Mutex<()>,
}

impl ComponentSlot {
    fn new(name: String, instance: Arc<dyn Component>) -> Self {
        let schema = instance.sockets();
        Self {
            name,
            instance,
            schema,
            warmed: OnceCell::new(),
            run_lock: Mutex::new(()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn instance(&self) -> &Arc<dyn Component> {
        &self.instance
    }

    pub(crate) fn schema(&self) -> &SocketSchema {
        &self.schema
    }

    /// Warm the component up on first use
    ///
    /// `warm_up` is attempted once; a failure is kept and returned again
    /// on every later call.
    pub(crate) async fn warm_up(&self) -> Result<(), ComponentError> {
        self.warmed
            .get_or_init(|| self.instance.warm_up())
            .await
            .clone()
    }

    /// Run the component; two invocations of one slot never overlap
    pub(crate) async fn invoke(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let _guard = self.run_lock.lock().await;
        self.warm_up().await?;
        self.instance.run(inputs).await
    }
}

/// A graph of named components connected by typed sockets
pub struct Pipeline {
    components: BTreeMap<String, Arc<ComponentSlot>>,
    connections: Vec<Connection>,
    max_loop_iterations: usize,
    metadata: Map<String, Value>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("connections", &self.connections)
            .field("max_loop_iterations", &self.max_loop_iterations)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self {
            components: BTreeMap::new(),
            connections: Vec::new(),
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
            metadata: Map::new(),
        }
    }

    /// Set the loop bound
    pub fn with_max_loop_iterations(mut self, max_loop_iterations: usize) -> Self {
        self.max_loop_iterations = max_loop_iterations;
        self
    }

    /// Attach free-form metadata
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Maximum number of times a loop entry may run in one run
    pub fn max_loop_iterations(&self) -> usize {
        self.max_loop_iterations
    }

    /// Free-form metadata
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Mutable free-form metadata
    pub fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.metadata
    }

    /// Add a component under a unique name
    pub fn add_component<C>(&mut self, name: impl Into<String>, instance: C) -> Result<(), PipelineError>
    where
        C: Component + 'static,
    {
        self.add_shared_component(name, Arc::new(instance))
    }

    /// Add an already shared component instance under a unique name
    pub fn add_shared_component(
        &mut self,
        name: impl Into<String>,
        instance: Arc<dyn Component>,
    ) -> Result<(), PipelineError> {
        let name = name.into();
        if name.is_empty() || name.contains('.') {
            return Err(PipelineError::InvalidComponentName(name));
        }
        if self.components.contains_key(&name) {
            return Err(PipelineError::DuplicateName(name));
        }

        debug!(
            component = %name,
            component_type = %instance.component_type(),
            "Adding component"
        );
        let slot = ComponentSlot::new(name.clone(), instance);
        self.components.insert(name, Arc::new(slot));
        Ok(())
    }

    /// Look up a component instance
    pub fn component(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.components.get(name).map(|slot| slot.instance().clone())
    }

    /// Socket declaration captured when the component was added
    pub fn sockets(&self, name: &str) -> Option<&SocketSchema> {
        self.components.get(name).map(|slot| slot.schema())
    }

    /// Component names in lexical order
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the pipeline has no components
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Connections in the order they were declared
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub(crate) fn slot(&self, name: &str) -> Option<&Arc<ComponentSlot>> {
        self.components.get(name)
    }

    /// Slots following [`Pipeline::topological_order`]
    pub(crate) fn slots_in_order(&self) -> Vec<Arc<ComponentSlot>> {
        self.topological_order()
            .iter()
            .filter_map(|name| self.components.get(name).cloned())
            .collect()
    }

    /// Connect `"component[.socket]"` to `"component[.socket]"`
    pub fn connect(&mut self, sender: &str, receiver: &str) -> Result<(), PipelineError> {
        self.add_connection(sender, receiver, false)
    }

    /// Connect a feedback edge that closes a bounded loop
    pub fn connect_loop(&mut self, sender: &str, receiver: &str) -> Result<(), PipelineError> {
        self.add_connection(sender, receiver, true)
    }

    fn add_connection(&mut self, sender: &str, receiver: &str, is_loop: bool) -> Result<(), PipelineError> {
        let sender_path = SocketPath::parse(sender);
        let receiver_path = SocketPath::parse(receiver);

        let sender_slot = self
            .slot(&sender_path.component)
            .ok_or_else(|| PipelineError::UnknownComponent(sender_path.component.clone()))?;
        let receiver_slot = self
            .slot(&receiver_path.component)
            .ok_or_else(|| PipelineError::UnknownComponent(receiver_path.component.clone()))?;

        let output = resolve_output(sender_slot, sender_path.socket.as_deref())?;
        let input = resolve_input(receiver_slot, receiver_path.socket.as_deref())?;

        let connection = Connection {
            sender: sender_path.component.clone(),
            sender_socket: output.name.clone(),
            receiver: receiver_path.component.clone(),
            receiver_socket: input.name.clone(),
            is_loop,
        };

        if !input.socket_type.accepts(&output.socket_type) {
            return Err(PipelineError::TypeMismatch {
                sender: connection.sender_path(),
                receiver: connection.receiver_path(),
                sender_type: output.socket_type.to_string(),
                receiver_type: input.socket_type.to_string(),
            });
        }

        let joinable = input.joinable;
        for existing in self.connections.iter().filter(|c| {
            c.receiver == connection.receiver && c.receiver_socket == connection.receiver_socket
        }) {
            if existing.sender == connection.sender && existing.sender_socket == connection.sender_socket {
                return Err(PipelineError::DuplicateConnection {
                    sender: connection.sender_path(),
                    receiver: connection.receiver_path(),
                });
            }
            if !joinable {
                return Err(PipelineError::SocketOccupied {
                    receiver: connection.receiver_path(),
                    existing: existing.sender_path(),
                });
            }
        }

        debug!(
            sender = %connection.sender_path(),
            receiver = %connection.receiver_path(),
            is_loop,
            "Connecting components"
        );
        self.connections.push(connection);
        Ok(())
    }

    /// Check the graph structure: cycles outside declared loops, loop
    /// connections that close no cycle. Every issue is reported.
    pub fn validate(&self) -> Result<(), PipelineError> {
        into_result(self.structural_issues())
    }

    /// Structural check plus the run-time inputs: unknown targets,
    /// conflicting values and required sockets left without a value.
    pub fn validate_inputs(&self, inputs: &RunInputs) -> Result<(), PipelineError> {
        let mut issues = self.structural_issues();
        issues.extend(self.input_issues(inputs));
        into_result(issues)
    }

    fn structural_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = self.cycle_issues();

        for connection in self.connections.iter().filter(|c| c.is_loop) {
            let closes_cycle = connection.receiver == connection.sender
                || self.reaches(&connection.receiver, &connection.sender);
            if !closes_cycle {
                issues.push(ValidationIssue::at(
                    validation_codes::LOOP_NOT_CLOSED,
                    connection.receiver_path(),
                    format!(
                        "Loop connection '{}' -> '{}' does not lead back to its sender",
                        connection.sender_path(),
                        connection.receiver_path()
                    ),
                ));
            }
        }

        issues
    }

    fn input_issues(&self, inputs: &RunInputs) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let mut targets: Vec<_> = inputs.iter().collect();
        targets.sort_by(|a, b| a.0.cmp(b.0));
        for (component, values) in targets {
            let Some(slot) = self.components.get(component) else {
                issues.push(ValidationIssue::at(
                    validation_codes::UNKNOWN_COMPONENT,
                    component.clone(),
                    format!("Run inputs target unknown component '{}'", component),
                ));
                continue;
            };

            let mut sockets: Vec<_> = values.keys().collect();
            sockets.sort();
            for socket in sockets {
                let path = format!("{}.{}", component, socket);
                match slot.schema().input(socket) {
                    None => issues.push(ValidationIssue::at(
                        validation_codes::UNKNOWN_SOCKET,
                        path,
                        format!("Component '{}' has no input socket '{}'", component, socket),
                    )),
                    Some(input) if !input.joinable && self.has_forward_producer(component, socket) => {
                        issues.push(ValidationIssue::at(
                            validation_codes::INPUT_CONFLICT,
                            path,
                            format!("Input socket '{}.{}' is already fed by a connection", component, socket),
                        ))
                    }
                    Some(_) => {}
                }
            }
        }

        for (name, slot) in &self.components {
            for input in slot
                .schema()
                .inputs
                .iter()
                .filter(|s| s.required && s.default.is_none())
            {
                // A loop edge cannot deliver before its receiver has run once
                let connected = self.has_forward_producer(name, &input.name);
                let supplied = inputs
                    .get(name)
                    .map_or(false, |values| values.contains_key(&input.name));
                if !connected && !supplied {
                    issues.push(ValidationIssue::at(
                        validation_codes::DANGLING_INPUT,
                        format!("{}.{}", name, input.name),
                        format!(
                            "Required input '{}.{}' has no producer and no run-time value",
                            name, input.name
                        ),
                    ));
                }
            }
        }

        issues
    }

    fn has_forward_producer(&self, component: &str, socket: &str) -> bool {
        self.connections.iter().any(|c| {
            !c.is_loop && c.receiver == component && c.receiver_socket == socket
        })
    }

    /// Forward adjacency over non-loop connections
    fn forward_edges(&self) -> HashMap<&str, Vec<&str>> {
        let mut graph: HashMap<&str, Vec<&str>> = HashMap::with_capacity(self.components.len());
        for connection in self.connections.iter().filter(|c| !c.is_loop) {
            graph
                .entry(connection.sender.as_str())
                .or_default()
                .push(connection.receiver.as_str());
        }
        graph
    }

    /// Whether `to` is reachable from `from` over non-loop connections
    fn reaches(&self, from: &str, to: &str) -> bool {
        let graph = self.forward_edges();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            for &next in graph.get(node).into_iter().flatten() {
                if next == to {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    fn cycle_issues(&self) -> Vec<ValidationIssue> {
        let graph = self.forward_edges();
        let mut visited = HashSet::with_capacity(self.components.len());
        let mut path_set = HashSet::new();
        let mut cycles = Vec::new();

        for name in self.components.keys() {
            find_cycles(
                name.as_str(),
                &graph,
                &mut visited,
                &mut path_set,
                &mut Vec::new(),
                &mut cycles,
            );
        }

        cycles
            .into_iter()
            .map(|cycle| {
                let mut formatted = cycle.join(" → ");
                formatted.push_str(" → ");
                formatted.push_str(&cycle[0]);
                ValidationIssue::at(
                    validation_codes::CIRCULAR_DEPENDENCY,
                    cycle[0].clone(),
                    format!(
                        "Cycle outside a declared loop: {} (mark the feedback connection as a loop)",
                        formatted
                    ),
                )
            })
            .collect()
    }

    /// Component names in dependency order over non-loop connections
    ///
    /// Independent components are ordered by name so the order is stable.
    pub fn topological_order(&self) -> Vec<String> {
        let mut in_degree: BTreeMap<&str, usize> =
            self.components.keys().map(|name| (name.as_str(), 0)).collect();
        let graph = self.forward_edges();
        for receivers in graph.values() {
            for receiver in receivers {
                if let Some(degree) = in_degree.get_mut(receiver) {
                    *degree += 1;
                }
            }
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order = Vec::with_capacity(self.components.len());

        while let Some(name) = ready.pop_first() {
            order.push(name.to_string());
            for &receiver in graph.get(name).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(receiver) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(receiver);
                    }
                }
            }
        }

        // Components stuck in an undeclared cycle go last; validation rejects them anyway
        if order.len() < self.components.len() {
            let placed: HashSet<String> = order.iter().cloned().collect();
            order.extend(self.components.keys().filter(|n| !placed.contains(*n)).cloned());
        }
        order
    }

    /// Warm up every component that has not been warmed up yet
    pub async fn warm_up(&self) -> Result<(), PipelineError> {
        for slot in self.components.values() {
            slot.warm_up()
                .await
                .map_err(|cause| PipelineError::ComponentExecution {
                    component: slot.name().to_string(),
                    cause,
                })?;
        }
        Ok(())
    }

    /// Run the pipeline with the default scheduler and options
    pub async fn run(&self, inputs: RunInputs) -> Result<PipelineOutputs, PipelineError> {
        Scheduler::default()
            .run(self, inputs, &RunOptions::default())
            .await
    }
}

fn into_result(issues: Vec<ValidationIssue>) -> Result<(), PipelineError> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::GraphValidation(issues))
    }
}

fn resolve_output<'a>(slot: &'a ComponentSlot, socket: Option<&str>) -> Result<&'a OutputSocket, PipelineError> {
    let outputs = &slot.schema().outputs;
    match socket {
        Some(name) => slot.schema().output(name).ok_or_else(|| PipelineError::UnknownSocket {
            component: slot.name().to_string(),
            direction: "output",
            socket: name.to_string(),
        }),
        None => match outputs.as_slice() {
            [only] => Ok(only),
            _ => Err(PipelineError::AmbiguousSocket {
                component: slot.name().to_string(),
                direction: "output",
                candidates: outputs.iter().map(|s| s.name.clone()).collect(),
            }),
        },
    }
}

fn resolve_input<'a>(slot: &'a ComponentSlot, socket: Option<&str>) -> Result<&'a InputSocket, PipelineError> {
    let inputs = &slot.schema().inputs;
    match socket {
        Some(name) => slot.schema().input(name).ok_or_else(|| PipelineError::UnknownSocket {
            component: slot.name().to_string(),
            direction: "input",
            socket: name.to_string(),
        }),
        None => match inputs.as_slice() {
            [only] => Ok(only),
            _ => Err(PipelineError::AmbiguousSocket {
                component: slot.name().to_string(),
                direction: "input",
                candidates: inputs.iter().map(|s| s.name.clone()).collect(),
            }),
        },
    }
}

/// Depth-first search that records every cycle it walks into
fn find_cycles<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    path_set: &mut HashSet<&'a str>,
    current_path: &mut Vec<&'a str>,
    cycles: &mut Vec<Vec<String>>,
) {
    if visited.contains(node) {
        return;
    }

    if path_set.contains(node) {
        if let Some(cycle_start) = current_path.iter().position(|&n| n == node) {
            cycles.push(
                current_path[cycle_start..]
                    .iter()
                    .map(|&s| s.to_string())
                    .collect(),
            );
        }
        return;
    }

    path_set.insert(node);
    current_path.push(node);

    if let Some(next) = graph.get(node) {
        for &receiver in next {
            find_cycles(receiver, graph, visited, path_set, current_path, cycles);
        }
    }

    path_set.remove(node);
    current_path.pop();
    visited.insert(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::socket::SocketType;
    use crate::types::DataPacket;
    use crate::ComponentBase;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Minimal component with configurable sockets
    struct Stub {
        schema: SocketSchema,
    }

    impl Stub {
        fn new(inputs: Vec<InputSocket>, outputs: Vec<(&str, SocketType)>) -> Self {
            let mut schema = SocketSchema::new();
            for input in inputs {
                schema = schema.with_input(input);
            }
            for (name, ty) in outputs {
                schema = schema.with_output(name, ty);
            }
            Self { schema }
        }

        fn text() -> Self {
            Self::new(
                vec![InputSocket::required("text", SocketType::String)],
                vec![("text", SocketType::String)],
            )
        }
    }

    impl ComponentBase for Stub {
        fn component_type(&self) -> &str {
            "Stub"
        }

        fn sockets(&self) -> SocketSchema {
            self.schema.clone()
        }
    }

    #[async_trait]
    impl Component for Stub {
        async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
            Ok(inputs)
        }
    }

    #[test]
    fn test_add_component_rejects_duplicates_and_dots() {
        let mut pipeline = Pipeline::new();
        pipeline.add_component("a", Stub::text()).unwrap();
        assert_eq!(
            pipeline.add_component("a", Stub::text()),
            Err(PipelineError::DuplicateName("a".to_string()))
        );
        assert!(matches!(
            pipeline.add_component("a.b", Stub::text()),
            Err(PipelineError::InvalidComponentName(_))
        ));
        assert!(matches!(
            pipeline.add_component("", Stub::text()),
            Err(PipelineError::InvalidComponentName(_))
        ));
    }

    #[test]
    fn test_connect_infers_single_sockets() {
        let mut pipeline = Pipeline::new();
        pipeline.add_component("a", Stub::text()).unwrap();
        pipeline.add_component("b", Stub::text()).unwrap();
        pipeline.connect("a", "b").unwrap();

        assert_eq!(
            pipeline.connections()[0],
            Connection {
                sender: "a".to_string(),
                sender_socket: "text".to_string(),
                receiver: "b".to_string(),
                receiver_socket: "text".to_string(),
                is_loop: false,
            }
        );
    }

    #[test]
    fn test_connect_ambiguous_socket() {
        let mut pipeline = Pipeline::new();
        pipeline
            .add_component(
                "router",
                Stub::new(
                    vec![InputSocket::required("text", SocketType::String)],
                    vec![("a", SocketType::String), ("b", SocketType::String)],
                ),
            )
            .unwrap();
        pipeline.add_component("sink", Stub::text()).unwrap();

        let err = pipeline.connect("router", "sink").unwrap_err();
        assert_eq!(
            err,
            PipelineError::AmbiguousSocket {
                component: "router".to_string(),
                direction: "output",
                candidates: vec!["a".to_string(), "b".to_string()],
            }
        );
        pipeline.connect("router.a", "sink").unwrap();
    }

    #[test]
    fn test_connect_type_mismatch() {
        let mut pipeline = Pipeline::new();
        pipeline
            .add_component(
                "numbers",
                Stub::new(vec![], vec![("value", SocketType::Number)]),
            )
            .unwrap();
        pipeline.add_component("b", Stub::text()).unwrap();

        let err = pipeline.connect("numbers", "b").unwrap_err();
        assert!(matches!(err, PipelineError::TypeMismatch { .. }));
        assert!(pipeline.connections().is_empty());
    }

    #[test]
    fn test_connect_unknown_targets() {
        let mut pipeline = Pipeline::new();
        pipeline.add_component("a", Stub::text()).unwrap();
        assert_eq!(
            pipeline.connect("a", "missing"),
            Err(PipelineError::UnknownComponent("missing".to_string()))
        );
        assert!(matches!(
            pipeline.connect("a.nope", "a"),
            Err(PipelineError::UnknownSocket { direction: "output", .. })
        ));
    }

    #[test]
    fn test_second_producer_is_rejected() {
        let mut pipeline = Pipeline::new();
        pipeline.add_component("a", Stub::text()).unwrap();
        pipeline.add_component("b", Stub::text()).unwrap();
        pipeline.add_component("c", Stub::text()).unwrap();
        pipeline.connect("b", "c").unwrap();

        let err = pipeline.connect("a", "c").unwrap_err();
        assert_eq!(
            err,
            PipelineError::SocketOccupied {
                receiver: "c.text".to_string(),
                existing: "b.text".to_string(),
            }
        );
    }

    #[test]
    fn test_joinable_accepts_many_producers_but_not_duplicates() {
        let mut pipeline = Pipeline::new();
        pipeline.add_component("a", Stub::text()).unwrap();
        pipeline.add_component("b", Stub::text()).unwrap();
        pipeline
            .add_component(
                "join",
                Stub::new(
                    vec![InputSocket::required("text", SocketType::String).joinable()],
                    vec![("text", SocketType::String)],
                ),
            )
            .unwrap();
        pipeline.connect("a", "join").unwrap();
        pipeline.connect("b", "join").unwrap();

        assert!(matches!(
            pipeline.connect("a", "join"),
            Err(PipelineError::DuplicateConnection { .. })
        ));
        assert_eq!(pipeline.connections().len(), 2);
    }

    #[test]
    fn test_validate_reports_every_cycle() {
        let mut pipeline = Pipeline::new();
        for name in ["a", "b", "c", "d"] {
            pipeline.add_component(name, Stub::text()).unwrap();
        }
        pipeline.connect("a", "b").unwrap();
        pipeline.connect("b", "a").unwrap();
        pipeline.connect("c", "d").unwrap();
        pipeline.connect("d", "c").unwrap();

        let err = pipeline.validate().unwrap_err();
        let codes: Vec<_> = err.issues().iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                validation_codes::CIRCULAR_DEPENDENCY,
                validation_codes::CIRCULAR_DEPENDENCY
            ]
        );
    }

    #[test]
    fn test_declared_loop_is_valid() {
        let mut pipeline = Pipeline::new();
        pipeline.add_component("a", Stub::text()).unwrap();
        pipeline.add_component("b", Stub::text()).unwrap();
        pipeline
            .add_component(
                "entry",
                Stub::new(
                    vec![InputSocket::required("text", SocketType::String).joinable()],
                    vec![("text", SocketType::String)],
                ),
            )
            .unwrap();
        pipeline.connect("entry", "a").unwrap();
        pipeline.connect("a", "b").unwrap();
        pipeline.connect_loop("b", "entry").unwrap();

        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_loop_that_closes_no_cycle() {
        let mut pipeline = Pipeline::new();
        pipeline.add_component("a", Stub::text()).unwrap();
        pipeline.add_component("b", Stub::text()).unwrap();
        pipeline.connect_loop("a", "b").unwrap();

        let err = pipeline.validate().unwrap_err();
        assert_eq!(err.issues()[0].code, validation_codes::LOOP_NOT_CLOSED);
    }

    #[test]
    fn test_validate_inputs_collects_all_issues() {
        let mut pipeline = Pipeline::new();
        pipeline.add_component("a", Stub::text()).unwrap();
        pipeline.add_component("b", Stub::text()).unwrap();
        pipeline.add_component("c", Stub::text()).unwrap();
        pipeline.connect("a", "b").unwrap();

        let mut inputs: RunInputs = HashMap::new();
        inputs.insert(
            "b".to_string(),
            HashMap::from([("text".to_string(), DataPacket::from_string("x"))]),
        );
        inputs.insert("ghost".to_string(), HashMap::new());

        let err = pipeline.validate_inputs(&inputs).unwrap_err();
        let codes: Vec<_> = err.issues().iter().map(|i| i.code).collect();
        assert!(codes.contains(&validation_codes::INPUT_CONFLICT));
        assert!(codes.contains(&validation_codes::UNKNOWN_COMPONENT));
        // a.text and c.text are both dangling
        assert_eq!(
            codes
                .iter()
                .filter(|c| **c == validation_codes::DANGLING_INPUT)
                .count(),
            2
        );
    }

    #[test]
    fn test_topological_order_is_stable() {
        let mut pipeline = Pipeline::new();
        for name in ["z", "y", "x"] {
            pipeline.add_component(name, Stub::text()).unwrap();
        }
        pipeline.connect("z", "y").unwrap();
        assert_eq!(pipeline.topological_order(), vec!["x", "z", "y"]);
    }
}
