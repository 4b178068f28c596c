use crate::{
    application::cancellation::CancellationToken,
    domain::events::{PipelineEvent, RunEventHandler, TracingEventHandler},
    domain::pipeline::{ComponentSlot, Pipeline},
    ComponentError, DataPacket, PipelineError, PipelineOutputs, RunInputs, SocketValues,
};
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;

/// Per-run options
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Invoke independent components of the same wave concurrently
    pub parallel: bool,

    /// Checked before every wave and between sequential invocations
    pub cancellation: Option<CancellationToken>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            cancellation: None,
        }
    }
}

impl RunOptions {
    /// Invoke one component at a time
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            cancellation: None,
        }
    }

    /// Attach a cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Runs a pipeline in dependency order
///
/// A run proceeds in passes. Each pass walks the components wave by
/// wave (a wave holds the components whose longest dependency chain has
/// the same length) and invokes those that are ready and were reached by
/// at least one fresh delivery. Values travelling over loop connections
/// are held back until the pass ends; if any exist, the loop region is
/// re-armed and another pass starts.
#[derive(Clone)]
pub struct Scheduler {
    event_handler: Arc<dyn RunEventHandler>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Arc::new(TracingEventHandler))
    }
}

impl Scheduler {
    /// Create a scheduler reporting to the given event handler
    pub fn new(event_handler: Arc<dyn RunEventHandler>) -> Self {
        Self { event_handler }
    }

    /// Run the pipeline once with the given inputs
    ///
    /// Returns every emitted output socket keyed by component. Components
    /// that were never reached are absent.
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        inputs: RunInputs,
        options: &RunOptions,
    ) -> Result<PipelineOutputs, PipelineError> {
        pipeline.validate_inputs(&inputs)?;

        let run_id = Uuid::new_v4();
        let started = Instant::now();
        self.event_handler
            .handle_event(PipelineEvent::RunStarted {
                run_id,
                components: pipeline.len(),
            })
            .await;

        let plan = ExecutionPlan::new(pipeline);
        let mut state = RunState::new(inputs);

        match self
            .execute(run_id, pipeline, &plan, &mut state, options)
            .await
        {
            Ok(()) => {
                self.event_handler
                    .handle_event(PipelineEvent::RunCompleted {
                        run_id,
                        duration: started.elapsed(),
                    })
                    .await;
                Ok(state.outputs)
            }
            Err(e) => {
                self.event_handler
                    .handle_event(PipelineEvent::RunFailed {
                        run_id,
                        error: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        run_id: Uuid,
        pipeline: &Pipeline,
        plan: &ExecutionPlan,
        state: &mut RunState,
        options: &RunOptions,
    ) -> Result<(), PipelineError> {
        let connections = pipeline.connections();
        let mut armed: HashSet<usize> = (0..plan.order.len()).collect();
        let mut pass = 0;

        loop {
            for wave in &plan.waves {
                check_cancelled(options)?;

                let mut batch = Vec::new();
                for &idx in wave.iter().filter(|idx| armed.contains(idx)) {
                    match collect_inputs(pipeline, plan, state, idx, pass)? {
                        Some(inputs) => batch.push((idx, inputs)),
                        None => {
                            self.event_handler
                                .handle_event(PipelineEvent::ComponentSkipped {
                                    run_id,
                                    component: plan.order[idx].clone(),
                                    pass,
                                })
                                .await;
                        }
                    }
                }

                for (idx, _) in &batch {
                    if plan.loop_entries.contains(idx) {
                        let visits = state.entry_visits.entry(*idx).or_insert(0);
                        *visits += 1;
                        if *visits > pipeline.max_loop_iterations() {
                            return Err(PipelineError::LoopLimitExceeded {
                                component: plan.order[*idx].clone(),
                                max_iterations: pipeline.max_loop_iterations(),
                            });
                        }
                    }
                }

                let results = if options.parallel && batch.len() > 1 {
                    join_all(
                        batch
                            .into_iter()
                            .map(|(idx, inputs)| self.invoke(run_id, plan.slot(idx), idx, inputs, pass)),
                    )
                    .await
                } else {
                    let mut results = Vec::with_capacity(batch.len());
                    for (idx, inputs) in batch {
                        check_cancelled(options)?;
                        let result = self
                            .invoke(run_id, plan.slot(idx), idx, inputs, pass)
                            .await;
                        let failed = result.is_err();
                        results.push(result);
                        if failed {
                            break;
                        }
                    }
                    results
                };

                for result in results {
                    let (idx, produced) = result?;
                    route(pipeline, plan, state, idx, produced);
                }
            }

            if state.feedback.is_empty() {
                return Ok(());
            }

            pass += 1;
            let entries: BTreeSet<usize> = state
                .feedback
                .keys()
                .map(|ci| plan.index[&connections[*ci].receiver])
                .collect();
            armed = plan.downstream_of(pipeline, &entries);

            debug!(pass, armed = armed.len(), "Re-arming loop region");
            self.event_handler
                .handle_event(PipelineEvent::LoopReentered {
                    run_id,
                    entries: entries.iter().map(|idx| plan.order[*idx].clone()).collect(),
                    pass,
                })
                .await;

            state.fresh.clear();
            // A socket fed by a loop only takes what arrives in this pass
            state.deliveries.retain(|ci, _| {
                let connection = &connections[*ci];
                let receiver = plan.index[&connection.receiver];
                !connection.is_loop
                    && !armed.contains(&plan.index[&connection.sender])
                    && !plan.is_loop_socket(receiver, &connection.receiver_socket)
            });
            for idx in &armed {
                state.outputs.remove(&plan.order[*idx]);
            }
            for (ci, value) in state.feedback.drain() {
                state.deliveries.insert(ci, value);
                state.fresh.insert(ci);
            }
        }
    }

    async fn invoke(
        &self,
        run_id: Uuid,
        slot: &ComponentSlot,
        idx: usize,
        inputs: SocketValues,
        pass: usize,
    ) -> Result<(usize, SocketValues), PipelineError> {
        let component = slot.name().to_string();
        self.event_handler
            .handle_event(PipelineEvent::ComponentStarted {
                run_id,
                component: component.clone(),
                pass,
            })
            .await;

        let started = Instant::now();
        let result = slot
            .invoke(inputs)
            .await
            .and_then(|outputs| check_declared(slot, outputs));

        match result {
            Ok(outputs) => {
                let mut emitted: Vec<String> = outputs.keys().cloned().collect();
                emitted.sort();
                self.event_handler
                    .handle_event(PipelineEvent::ComponentCompleted {
                        run_id,
                        component,
                        pass,
                        outputs: emitted,
                        duration: started.elapsed(),
                    })
                    .await;
                Ok((idx, outputs))
            }
            Err(cause) => {
                self.event_handler
                    .handle_event(PipelineEvent::ComponentFailed {
                        run_id,
                        component: component.clone(),
                        error: cause.to_string(),
                    })
                    .await;
                Err(PipelineError::ComponentExecution { component, cause })
            }
        }
    }
}

/// Static view of the graph computed once per run
struct ExecutionPlan {
    /// Components in topological order
    slots: Vec<Arc<ComponentSlot>>,
    /// Their names, same order
    order: Vec<String>,
    index: HashMap<String, usize>,
    /// Indices into `order`, grouped by dependency depth
    waves: Vec<Vec<usize>>,
    /// Incoming connection indices per component, in connection order
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
    /// Receivers of loop connections
    loop_entries: HashSet<usize>,
    /// Input sockets fed by a loop connection, per receiver
    loop_sockets: HashMap<usize, HashSet<String>>,
}

impl ExecutionPlan {
    fn new(pipeline: &Pipeline) -> Self {
        let slots = pipeline.slots_in_order();
        let order: Vec<String> = slots.iter().map(|slot| slot.name().to_string()).collect();
        let index: HashMap<String, usize> = order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut incoming = vec![Vec::new(); order.len()];
        let mut outgoing = vec![Vec::new(); order.len()];
        let mut loop_entries = HashSet::new();
        let mut loop_sockets: HashMap<usize, HashSet<String>> = HashMap::new();
        for (ci, connection) in pipeline.connections().iter().enumerate() {
            let receiver = index[&connection.receiver];
            incoming[receiver].push(ci);
            outgoing[index[&connection.sender]].push(ci);
            if connection.is_loop {
                loop_entries.insert(receiver);
                loop_sockets
                    .entry(receiver)
                    .or_default()
                    .insert(connection.receiver_socket.clone());
            }
        }

        // Predecessors always precede their receivers in `order`
        let mut depth = vec![0usize; order.len()];
        for idx in 0..order.len() {
            for &ci in &incoming[idx] {
                let connection = &pipeline.connections()[ci];
                if !connection.is_loop {
                    let sender = index[&connection.sender];
                    depth[idx] = depth[idx].max(depth[sender] + 1);
                }
            }
        }

        let wave_count = depth.iter().max().map_or(0, |d| d + 1);
        let mut waves = vec![Vec::new(); wave_count];
        for (idx, d) in depth.iter().enumerate() {
            waves[*d].push(idx);
        }

        trace!(components = order.len(), waves = waves.len(), "Execution plan ready");
        Self {
            slots,
            order,
            index,
            waves,
            incoming,
            outgoing,
            loop_entries,
            loop_sockets,
        }
    }

    fn slot(&self, idx: usize) -> &ComponentSlot {
        &self.slots[idx]
    }

    fn is_loop_socket(&self, idx: usize, socket: &str) -> bool {
        self.loop_sockets
            .get(&idx)
            .map_or(false, |sockets| sockets.contains(socket))
    }

    /// Entries plus everything reachable from them over non-loop connections
    fn downstream_of(&self, pipeline: &Pipeline, entries: &BTreeSet<usize>) -> HashSet<usize> {
        let mut reached: HashSet<usize> = entries.iter().copied().collect();
        let mut queue: VecDeque<usize> = entries.iter().copied().collect();
        while let Some(idx) = queue.pop_front() {
            for &ci in &self.outgoing[idx] {
                let connection = &pipeline.connections()[ci];
                if connection.is_loop {
                    continue;
                }
                let receiver = self.index[&connection.receiver];
                if reached.insert(receiver) {
                    queue.push_back(receiver);
                }
            }
        }
        reached
    }
}

/// Mutable run state
struct RunState {
    /// Values supplied by the caller; they persist for the whole run
    sticky: RunInputs,
    /// Latest value per connection index
    deliveries: HashMap<usize, DataPacket>,
    /// Connections that delivered during the current pass
    fresh: HashSet<usize>,
    /// Loop deliveries waiting for the next pass
    feedback: HashMap<usize, DataPacket>,
    outputs: PipelineOutputs,
    entry_visits: HashMap<usize, usize>,
}

impl RunState {
    fn new(inputs: RunInputs) -> Self {
        Self {
            sticky: inputs,
            deliveries: HashMap::new(),
            fresh: HashSet::new(),
            feedback: HashMap::new(),
            outputs: PipelineOutputs::new(),
            entry_visits: HashMap::new(),
        }
    }
}

fn check_cancelled(options: &RunOptions) -> Result<(), PipelineError> {
    match &options.cancellation {
        Some(token) if token.is_cancelled() => Err(PipelineError::Cancelled),
        _ => Ok(()),
    }
}

/// Gather the inputs of a component, or `None` when it does not run this pass
fn collect_inputs(
    pipeline: &Pipeline,
    plan: &ExecutionPlan,
    state: &RunState,
    idx: usize,
    pass: usize,
) -> Result<Option<SocketValues>, PipelineError> {
    let name = &plan.order[idx];
    let slot = plan.slot(idx);
    let connections = pipeline.connections();
    let incoming = &plan.incoming[idx];
    let supplied = state.sticky.get(name);

    let triggered = if incoming.is_empty() {
        pass == 0
    } else {
        incoming.iter().any(|ci| state.fresh.contains(ci))
            || (pass == 0 && supplied.map_or(false, |values| !values.is_empty()))
    };
    if !triggered {
        return Ok(None);
    }

    let mut values = SocketValues::new();
    for socket in &slot.schema().inputs {
        let delivered: Vec<DataPacket> = incoming
            .iter()
            .filter(|ci| connections[**ci].receiver_socket == socket.name)
            .filter_map(|ci| state.deliveries.get(ci).cloned())
            .collect();
        // Run-time values seed a loop socket in the first pass only
        let given = if pass > 0 && plan.is_loop_socket(idx, &socket.name) {
            None
        } else {
            supplied.and_then(|values| values.get(&socket.name)).cloned()
        };

        let value = if socket.joinable {
            let mut all: Vec<DataPacket> = given.into_iter().collect();
            all.extend(delivered);
            if all.is_empty() {
                None
            } else {
                let joined = slot
                    .instance()
                    .join_inputs(&socket.name, all)
                    .map_err(|cause| PipelineError::ComponentExecution {
                        component: name.clone(),
                        cause,
                    })?;
                Some(joined)
            }
        } else {
            delivered.into_iter().next().or(given)
        };

        match value.or_else(|| socket.default.clone()) {
            Some(value) => {
                values.insert(socket.name.clone(), value);
            }
            None if socket.required => return Ok(None),
            None => {}
        }
    }

    Ok(Some(values))
}

fn check_declared(slot: &ComponentSlot, outputs: SocketValues) -> Result<SocketValues, ComponentError> {
    if let Some(undeclared) = outputs.keys().find(|socket| slot.schema().output(socket).is_none()) {
        return Err(ComponentError::UndeclaredOutput(undeclared.clone()));
    }
    Ok(outputs)
}

/// Record what a component produced and hand it to the connected receivers
fn route(pipeline: &Pipeline, plan: &ExecutionPlan, state: &mut RunState, idx: usize, produced: SocketValues) {
    let connections = pipeline.connections();
    for &ci in &plan.outgoing[idx] {
        let connection = &connections[ci];
        if let Some(value) = produced.get(&connection.sender_socket) {
            if connection.is_loop {
                state.feedback.insert(ci, value.clone());
            } else {
                state.deliveries.insert(ci, value.clone());
                state.fresh.insert(ci);
            }
        }
    }
    state.outputs.insert(plan.order[idx].clone(), produced);
}
