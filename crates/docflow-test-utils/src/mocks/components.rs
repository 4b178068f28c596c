//! Components with predictable behavior for exercising the scheduler.

use async_trait::async_trait;
use docflow_core::{
    Component, ComponentBase, ComponentError, DataPacket, InputSocket, SocketSchema, SocketType,
    SocketValues,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared counters recording how often components were touched
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    runs: Arc<AtomicUsize>,
    warm_ups: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl CallCounter {
    /// Create a zeroed counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `run` calls
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Number of `warm_up` calls
    pub fn warm_ups(&self) -> usize {
        self.warm_ups.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `run` calls observed
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn warmed(&self) {
        self.warm_ups.fetch_add(1, Ordering::SeqCst);
    }

    async fn track<T>(&self, delay: Option<Duration>, result: T) -> T {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn single(socket: &str, value: DataPacket) -> SocketValues {
    SocketValues::from([(socket.to_string(), value)])
}

/// Emits a fixed value on `value`; has no inputs
pub struct ConstantSource {
    value: DataPacket,
    socket_type: SocketType,
    counter: CallCounter,
}

impl ConstantSource {
    /// Emit `value` typed as `socket_type`
    pub fn new(value: Value, socket_type: SocketType) -> Self {
        Self {
            value: DataPacket::new(value),
            socket_type,
            counter: CallCounter::new(),
        }
    }

    /// Emit a string
    pub fn text(value: &str) -> Self {
        Self::new(json!(value), SocketType::String)
    }

    /// Emit a number
    pub fn number(value: f64) -> Self {
        Self::new(json!(value), SocketType::Number)
    }

    /// Record calls on `counter`
    pub fn with_counter(mut self, counter: CallCounter) -> Self {
        self.counter = counter;
        self
    }
}

impl ComponentBase for ConstantSource {
    fn component_type(&self) -> &str {
        "ConstantSource"
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new().with_output("value", self.socket_type.clone())
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("value".to_string(), self.value.as_value().clone());
        params.insert("socket_type".to_string(), json!(self.socket_type.to_string()));
        params
    }
}

#[async_trait]
impl Component for ConstantSource {
    async fn warm_up(&self) -> Result<(), ComponentError> {
        self.counter.warmed();
        Ok(())
    }

    async fn run(&self, _inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        self.counter
            .track(None, Ok(single("value", self.value.clone())))
            .await
    }
}

/// Copies `value` to `value`, optionally after a delay
pub struct Passthrough {
    socket_type: SocketType,
    delay: Option<Duration>,
    counter: CallCounter,
}

impl Passthrough {
    /// Forward values of `socket_type`
    pub fn new(socket_type: SocketType) -> Self {
        Self {
            socket_type,
            delay: None,
            counter: CallCounter::new(),
        }
    }

    /// Forward anything
    pub fn any() -> Self {
        Self::new(SocketType::Any)
    }

    /// Sleep before returning
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Record calls on `counter`
    pub fn with_counter(mut self, counter: CallCounter) -> Self {
        self.counter = counter;
        self
    }
}

impl ComponentBase for Passthrough {
    fn component_type(&self) -> &str {
        "Passthrough"
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("socket_type".to_string(), json!(self.socket_type.to_string()));
        params
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new()
            .with_input(InputSocket::required("value", self.socket_type.clone()))
            .with_output("value", self.socket_type.clone())
    }
}

#[async_trait]
impl Component for Passthrough {
    async fn warm_up(&self) -> Result<(), ComponentError> {
        self.counter.warmed();
        Ok(())
    }

    async fn run(&self, mut inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let value = inputs
            .remove("value")
            .ok_or_else(|| ComponentError::MissingInput("value".to_string()))?;
        self.counter
            .track(self.delay, Ok(single("value", value)))
            .await
    }
}

/// Always fails
pub struct Failing {
    message: String,
    counter: CallCounter,
}

impl Failing {
    /// Fail with `message`
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            counter: CallCounter::new(),
        }
    }

    /// Record calls on `counter`
    pub fn with_counter(mut self, counter: CallCounter) -> Self {
        self.counter = counter;
        self
    }
}

impl ComponentBase for Failing {
    fn component_type(&self) -> &str {
        "Failing"
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("message".to_string(), json!(self.message));
        params
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new()
            .with_input(InputSocket::required("value", SocketType::Any))
            .with_output("value", SocketType::Any)
    }
}

#[async_trait]
impl Component for Failing {
    async fn run(&self, _inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        self.counter
            .track(None, Err(ComponentError::Other(self.message.clone())))
            .await
    }
}

/// Adds one to `value`; emits on `again` below the threshold and on `done` once reached
pub struct ThresholdLoop {
    threshold: f64,
    counter: CallCounter,
}

impl ThresholdLoop {
    /// Stop once the value reaches `threshold`
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            counter: CallCounter::new(),
        }
    }

    /// Record calls on `counter`
    pub fn with_counter(mut self, counter: CallCounter) -> Self {
        self.counter = counter;
        self
    }
}

impl ComponentBase for ThresholdLoop {
    fn component_type(&self) -> &str {
        "ThresholdLoop"
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("threshold".to_string(), json!(self.threshold));
        params
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new()
            .with_input(InputSocket::required("value", SocketType::Number))
            .with_output("again", SocketType::Number)
            .with_output("done", SocketType::Number)
    }
}

#[async_trait]
impl Component for ThresholdLoop {
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let value = inputs
            .get("value")
            .and_then(DataPacket::as_f64)
            .ok_or_else(|| ComponentError::InvalidInput("value must be a number".to_string()))?
            + 1.0;
        let socket = if value >= self.threshold {
            "done"
        } else {
            "again"
        };
        self.counter
            .track(None, Ok(single(socket, DataPacket::from_f64(value))))
            .await
    }
}

/// Routes `value` to `low` or `high` depending on a threshold
pub struct ThresholdRouter {
    threshold: f64,
}

impl ThresholdRouter {
    /// Values strictly below `threshold` go to `low`
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl ComponentBase for ThresholdRouter {
    fn component_type(&self) -> &str {
        "ThresholdRouter"
    }

    fn init_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("threshold".to_string(), json!(self.threshold));
        params
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new()
            .with_input(InputSocket::required("value", SocketType::Number))
            .with_output("low", SocketType::Number)
            .with_output("high", SocketType::Number)
    }
}

#[async_trait]
impl Component for ThresholdRouter {
    async fn run(&self, mut inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let value = inputs
            .remove("value")
            .ok_or_else(|| ComponentError::MissingInput("value".to_string()))?;
        let number = value
            .as_f64()
            .ok_or_else(|| ComponentError::InvalidInput("value must be a number".to_string()))?;
        let socket = if number < self.threshold { "low" } else { "high" };
        Ok(single(socket, value))
    }
}

/// Sums every number delivered to its joinable `values` socket
#[derive(Default)]
pub struct Sum {
    counter: CallCounter,
}

impl Sum {
    /// Create a summing component
    pub fn new() -> Self {
        Self::default()
    }

    /// Record calls on `counter`
    pub fn with_counter(mut self, counter: CallCounter) -> Self {
        self.counter = counter;
        self
    }
}

impl ComponentBase for Sum {
    fn component_type(&self) -> &str {
        "Sum"
    }

    fn sockets(&self) -> SocketSchema {
        SocketSchema::new()
            .with_input(InputSocket::required("values", SocketType::Number).joinable())
            .with_output("sum", SocketType::Number)
    }
}

#[async_trait]
impl Component for Sum {
    async fn run(&self, inputs: SocketValues) -> Result<SocketValues, ComponentError> {
        let values = inputs
            .get("values")
            .and_then(DataPacket::as_array)
            .ok_or_else(|| ComponentError::MissingInput("values".to_string()))?;
        let sum: f64 = values.iter().filter_map(Value::as_f64).sum();
        self.counter
            .track(None, Ok(single("sum", DataPacket::from_f64(sum))))
            .await
    }
}
