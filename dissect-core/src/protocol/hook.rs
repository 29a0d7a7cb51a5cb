//! Record delivery to subscribers.
//!
//! A [`Dissector`] runs each capture through the layer chain and hands every
//! successfully decoded record to the subscribers registered in [`Hooks`].
//! Records are borrowed for the duration of one delivery only.

use std::fmt;

use tracing::trace;

use super::{
    default_registry, parse_packet_with, Capture, ChainConfig, ParseResult, ProtocolRegistry,
    Record,
};

/// Receiver of decoded records.
pub trait Subscriber: Send + Sync {
    fn on_record(&self, protocol: &'static str, record: &Record);
}

impl<F> Subscriber for F
where
    F: Fn(&'static str, &Record) + Send + Sync,
{
    fn on_record(&self, protocol: &'static str, record: &Record) {
        self(protocol, record)
    }
}

/// Ordered list of subscribers, optionally filtered by protocol name.
#[derive(Default)]
pub struct Hooks {
    subscribers: Vec<(Option<&'static str>, Box<dyn Subscriber>)>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive records from every layer.
    pub fn subscribe<S: Subscriber + 'static>(&mut self, subscriber: S) {
        self.subscribers.push((None, Box::new(subscriber)));
    }

    /// Receive records from one protocol only.
    pub fn subscribe_to<S: Subscriber + 'static>(&mut self, protocol: &'static str, subscriber: S) {
        self.subscribers.push((Some(protocol), Box::new(subscriber)));
    }

    /// Deliver one record to every matching subscriber, in registration order.
    pub fn deliver(&self, protocol: &'static str, record: &Record) {
        for (filter, subscriber) in &self.subscribers {
            if filter.map_or(true, |name| name == protocol) {
                subscriber.on_record(protocol, record);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filters: Vec<_> = self
            .subscribers
            .iter()
            .map(|(filter, _)| filter.unwrap_or("*"))
            .collect();
        f.debug_struct("Hooks").field("subscribers", &filters).finish()
    }
}

/// Registry, subscribers and chain limits bundled together.
#[derive(Debug)]
pub struct Dissector {
    registry: ProtocolRegistry,
    hooks: Hooks,
    config: ChainConfig,
}

impl Dissector {
    pub fn new(registry: ProtocolRegistry) -> Self {
        Self::with_config(registry, ChainConfig::default())
    }

    pub fn with_config(registry: ProtocolRegistry, config: ChainConfig) -> Self {
        Self {
            registry,
            hooks: Hooks::new(),
            config,
        }
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Decode one capture and deliver its records, outermost layer first.
    ///
    /// Layers that failed carry no record and are not delivered; their
    /// results are still returned.
    pub fn dissect<'a>(&self, capture: &Capture<'a>) -> Vec<(&'static str, ParseResult<'a>)> {
        let results = parse_packet_with(&self.registry, capture, &self.config);
        for &(name, ref result) in &results {
            if let Some(record) = &result.record {
                trace!(protocol = name, "delivering record");
                self.hooks.deliver(name, record);
            }
        }
        results
    }
}

impl Default for Dissector {
    fn default() -> Self {
        Self::new(default_registry())
    }
}
