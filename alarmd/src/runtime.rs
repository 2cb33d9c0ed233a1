//! AlarmSystem: wires the scheduler, hand-off queue, consumer and display board

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use eyre::Context;
use tracing::{debug, error, info};

use crate::config::{Config, EventsConfig};
use crate::display::{Consumer, DisplayBoard};
use crate::domain::{AlarmRequest, RequestKind};
use crate::error::AlarmError;
use crate::events::{AlarmEvent, ConsoleSink, EventBus, EventLogger};
use crate::handoff::HandoffQueue;
use crate::protocol::RequestParser;
use crate::scheduler::{Scheduler, SubmitOutcome};

/// Build the event bus described by the `events` config section
pub fn event_bus(config: &EventsConfig) -> eyre::Result<EventBus> {
    let mut bus = EventBus::new();
    if config.console {
        bus = bus.with_sink(Arc::new(ConsoleSink::new()));
    }
    if let Some(path) = &config.log_path {
        let logger = EventLogger::open(path).context(format!("Failed to open event log {}", path.display()))?;
        bus = bus.with_sink(Arc::new(logger));
    }
    Ok(bus)
}

/// A running alarm pipeline
///
/// Owns the dispatch and consumer threads; dropping it shuts everything down.
pub struct AlarmSystem {
    scheduler: Arc<Scheduler>,
    queue: Arc<HandoffQueue<AlarmRequest>>,
    board: Arc<DisplayBoard>,
    parser: RequestParser,
    events: EventBus,
    dispatcher: Option<JoinHandle<Result<(), AlarmError>>>,
    consumer: Option<JoinHandle<usize>>,
}

impl AlarmSystem {
    /// Start the pipeline using the sinks named in `config`
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        config.validate()?;
        let events = event_bus(&config.events)?;
        Ok(Self::start(config, events)?)
    }

    /// Start the dispatch and consumer threads
    pub fn start(config: &Config, events: EventBus) -> Result<Self, AlarmError> {
        debug!(capacity = config.queue.capacity, "AlarmSystem::start: called");
        let scheduler = Arc::new(Scheduler::new(events.clone()));
        let queue = Arc::new(HandoffQueue::new(config.queue.capacity));
        let board = Arc::new(DisplayBoard::new(config.display.poll_interval(), events.clone()));

        let dispatcher = {
            let scheduler = scheduler.clone();
            let queue = queue.clone();
            thread::Builder::new()
                .name("dispatch".to_string())
                .spawn(move || scheduler.run(&queue))?
        };

        let consumer = {
            let consumer = Consumer::new(queue.clone(), board.clone(), events.clone());
            thread::Builder::new()
                .name("consumer".to_string())
                .spawn(move || consumer.run())?
        };

        info!("AlarmSystem::start: pipeline running");
        Ok(Self {
            scheduler,
            queue,
            board,
            parser: RequestParser::new(config.request.max_message_len),
            events,
            dispatcher: Some(dispatcher),
            consumer: Some(consumer),
        })
    }

    /// Submit a request
    ///
    /// A Start is rejected when its id is pending or already displayed.
    pub fn submit(&self, request: AlarmRequest) -> Result<SubmitOutcome, AlarmError> {
        debug!(id = %request.id, kind = ?request.kind, "AlarmSystem::submit: called");
        if request.kind == RequestKind::Start && self.board.contains(request.id) {
            self.events.emit(AlarmEvent::RequestRejected {
                alarm_id: Some(request.id),
                reason: "alarm id already displayed".to_string(),
            });
            return Err(AlarmError::DuplicateId(request.id));
        }
        self.scheduler.submit(request)
    }

    /// Parse and submit one input line; `Ok(None)` for a blank line
    pub fn handle_line(&self, line: &str) -> Result<Option<SubmitOutcome>, AlarmError> {
        let request = match self.parser.parse(line) {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(None),
            Err(e) => {
                if let AlarmError::InvalidRequest(reason) = &e {
                    self.events.emit(AlarmEvent::RequestRejected {
                        alarm_id: None,
                        reason: reason.clone(),
                    });
                }
                return Err(e);
            }
        };
        self.submit(request).map(Some)
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn board(&self) -> &Arc<DisplayBoard> {
        &self.board
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Stop all threads and wait for them; safe to call more than once
    pub fn shutdown(&mut self) {
        if self.dispatcher.is_none() && self.consumer.is_none() {
            return;
        }
        debug!("AlarmSystem::shutdown: called");

        self.scheduler.shutdown();
        // Closing the queue also releases a dispatcher blocked on a full queue
        self.queue.close();

        if let Some(handle) = self.dispatcher.take() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "AlarmSystem::shutdown: dispatch loop failed"),
                Err(_) => error!("AlarmSystem::shutdown: dispatch thread panicked"),
            }
        }
        if let Some(handle) = self.consumer.take() {
            match handle.join() {
                Ok(applied) => debug!(applied, "AlarmSystem::shutdown: consumer stopped"),
                Err(_) => error!("AlarmSystem::shutdown: consumer thread panicked"),
            }
        }

        self.board.shutdown();
        info!(stats = ?self.scheduler.stats(), "AlarmSystem::shutdown: complete");
    }
}

impl Drop for AlarmSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
