use crate::gestures::dispatch::{Backends, DispatchConfig, EventDispatcher};
use crate::gestures::engine::{ClassifierConfig, GestureClassifier, GestureError};
use crate::gestures::landmarks::{Handedness, Point3};
use crate::gestures::mapping::{MotionMapping, MotionMappingConfig, SharedMotionMapping};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct GestureServiceConfig {
    pub debug_logging: bool,
    pub frame_interval_ms: u64,
    /// Frames from the other hand are treated as if no hand were visible.
    pub preferred_hand: Option<Handedness>,
    pub classifier: ClassifierConfig,
    pub dispatch: DispatchConfig,
}

impl Default for GestureServiceConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            frame_interval_ms: 33,
            preferred_hand: None,
            classifier: ClassifierConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

/// Raw hand frame as delivered by the landmark detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandFrame {
    pub landmarks: Vec<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handedness: Option<Handedness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl HandFrame {
    pub fn new(points: &[Point3]) -> Self {
        Self {
            landmarks: points.iter().map(|p| [p.x, p.y, p.z]).collect(),
            handedness: None,
            confidence: None,
        }
    }

    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = Some(handedness);
        self
    }

    pub fn points(&self) -> Vec<Point3> {
        self.landmarks.iter().copied().map(Point3::from).collect()
    }
}

/// Everything a landmark source can push to the worker. Also the line
/// format of the host protocol read from stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerInput {
    Hand(HandFrame),
    NoHand,
    Mapping(MotionMappingConfig),
    Clipboard { text: String },
    Stop,
}

pub trait LandmarkSource: Send {
    fn install(&mut self, sender: Sender<TrackerInput>) -> anyhow::Result<()>;
    fn uninstall(&mut self) -> anyhow::Result<()>;
    fn is_installed(&self) -> bool;
}

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
}

/// Owns the frame loop: pulls [`TrackerInput`] from a [`LandmarkSource`],
/// classifies hand frames and drives the actuators on a worker thread.
pub struct GestureService {
    config: GestureServiceConfig,
    mapping: SharedMotionMapping,
    source: Box<dyn LandmarkSource>,
    backends: Backends,
    worker: Option<WorkerHandle>,
}

impl GestureService {
    pub fn new(
        config: GestureServiceConfig,
        mapping: SharedMotionMapping,
        source: Box<dyn LandmarkSource>,
        backends: Backends,
    ) -> Self {
        Self {
            config,
            mapping,
            source,
            backends,
            worker: None,
        }
    }

    pub fn config(&self) -> &GestureServiceConfig {
        &self.config
    }

    pub fn mapping(&self) -> SharedMotionMapping {
        self.mapping.clone()
    }

    /// Safe to call while running; the next frame sees the new table.
    pub fn update_mapping(&self, mapping: MotionMapping) {
        self.mapping.update(mapping);
    }

    /// Restarts the worker when the effective config changed.
    pub fn update_config(&mut self, config: GestureServiceConfig) -> anyhow::Result<()> {
        if self.config == config {
            return Ok(());
        }
        let should_restart = self.worker.is_some();
        self.config = config;
        if should_restart {
            self.stop_running();
            self.start_running()?;
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn start(&mut self) -> anyhow::Result<()> {
        self.start_running()
    }

    pub fn stop(&mut self) {
        self.stop_running();
    }

    /// Blocks until the worker exits on its own, which happens when the
    /// source sends [`TrackerInput::Stop`] or drops its sender.
    pub fn wait(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join.join().is_err() {
                tracing::error!("gesture worker panicked");
            }
        }
        if self.source.is_installed() {
            if let Err(err) = self.source.uninstall() {
                tracing::error!(?err, "failed to uninstall landmark source");
            }
        }
    }

    fn start_running(&mut self) -> anyhow::Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        self.config.classifier.validate()?;

        let (input_tx, input_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();

        self.source.install(input_tx)?;

        let config = self.config.clone();
        let mapping = self.mapping.clone();
        let backends = self.backends.clone();
        let join = thread::Builder::new()
            .name("gesture-worker".into())
            .spawn(move || worker_loop(config, mapping, backends, input_rx, stop_rx));
        let join = match join {
            Ok(join) => join,
            Err(err) => {
                if let Err(uninstall_err) = self.source.uninstall() {
                    tracing::error!(?uninstall_err, "failed to uninstall landmark source");
                }
                return Err(anyhow!("failed to spawn gesture worker: {err}"));
            }
        };
        self.worker = Some(WorkerHandle { stop_tx, join });
        tracing::info!("gesture service started");
        Ok(())
    }

    fn stop_running(&mut self) {
        if self.worker.is_none() && !self.source.is_installed() {
            return;
        }

        if let Err(err) = self.source.uninstall() {
            tracing::error!(?err, "failed to uninstall landmark source");
        }

        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            if worker.join.join().is_err() {
                tracing::error!("gesture worker panicked");
            }
            tracing::info!("gesture service stopped");
        }
    }
}

impl Drop for GestureService {
    fn drop(&mut self) {
        self.stop_running();
    }
}

fn worker_loop(
    config: GestureServiceConfig,
    mapping: SharedMotionMapping,
    backends: Backends,
    input_rx: Receiver<TrackerInput>,
    stop_rx: Receiver<()>,
) {
    let poll_interval = Duration::from_millis(config.frame_interval_ms.max(1));
    let mut classifier = GestureClassifier::new(config.classifier, mapping.clone());
    let mut dispatcher = EventDispatcher::from_backends(config.dispatch.clone(), &backends);
    dispatcher.status("gesture tracking started");

    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match input_rx.recv_timeout(poll_interval) {
            Ok(TrackerInput::Stop) => {
                tracing::info!("stop requested by landmark source");
                break;
            }
            Ok(input) => handle_input(&config, &mapping, &mut classifier, &mut dispatcher, input),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    let closed = classifier.on_hand_lost();
    dispatcher.dispatch_hand_lost(&closed);
    dispatcher.release_all();
    dispatcher.status("gesture tracking stopped");
}

fn handle_input(
    config: &GestureServiceConfig,
    mapping: &SharedMotionMapping,
    classifier: &mut GestureClassifier,
    dispatcher: &mut EventDispatcher,
    input: TrackerInput,
) {
    match input {
        TrackerInput::Hand(frame) => {
            if let (Some(preferred), Some(seen)) = (config.preferred_hand, frame.handedness) {
                if preferred != seen {
                    let closed = classifier.on_hand_lost();
                    dispatcher.dispatch_hand_lost(&closed);
                    return;
                }
            }
            match classifier.classify_points(&frame.points()) {
                Ok((snapshot, classification)) => {
                    let snapshot = match frame.confidence {
                        Some(confidence) => snapshot.with_confidence(confidence),
                        None => snapshot,
                    };
                    if config.debug_logging {
                        tracing::debug!(
                            event = %classification.event,
                            closed = classification.closed.len(),
                            fingers = ?snapshot.extended_fingers(),
                            "frame classified"
                        );
                    }
                    dispatcher.dispatch_classification(&classification, &snapshot);
                }
                Err(GestureError::MalformedSnapshot { closed, .. }) => {
                    dispatcher.dispatch_hand_lost(&closed);
                }
                Err(err) => tracing::error!(?err, "failed to classify frame"),
            }
        }
        TrackerInput::NoHand => {
            let closed = classifier.on_hand_lost();
            dispatcher.dispatch_hand_lost(&closed);
        }
        TrackerInput::Mapping(update) => {
            mapping.update_from(&update);
            dispatcher.status("motion mapping updated");
        }
        TrackerInput::Clipboard { text } => {
            if let Err(err) = dispatcher.copy_to_clipboard(&text) {
                tracing::warn!(?err, "failed to copy text to clipboard");
            }
        }
        TrackerInput::Stop => {}
    }
}

/// Reads host protocol lines (one JSON [`TrackerInput`] per line) on a
/// background thread. Unparseable lines are logged and skipped.
pub struct LineLandmarkSource {
    reader: Option<Box<dyn BufRead + Send>>,
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl LineLandmarkSource {
    pub fn new(reader: Box<dyn BufRead + Send>) -> Self {
        Self {
            reader: Some(reader),
            stop: Arc::new(AtomicBool::new(false)),
            join: None,
        }
    }

    pub fn stdin() -> Self {
        Self::new(Box::new(std::io::BufReader::new(std::io::stdin())))
    }
}

pub fn parse_host_line(line: &str) -> anyhow::Result<Option<TrackerInput>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

impl LandmarkSource for LineLandmarkSource {
    fn install(&mut self, sender: Sender<TrackerInput>) -> anyhow::Result<()> {
        if self.join.is_some() {
            return Ok(());
        }
        let reader = self
            .reader
            .take()
            .ok_or_else(|| anyhow!("landmark input stream already consumed"))?;
        self.stop.store(false, Ordering::SeqCst);
        let stop = Arc::clone(&self.stop);
        let join = thread::Builder::new()
            .name("landmark-reader".into())
            .spawn(move || {
                for line in reader.lines() {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let line = match line {
                        Ok(line) => line,
                        Err(err) => {
                            tracing::error!(?err, "failed to read landmark input");
                            break;
                        }
                    };
                    match parse_host_line(&line) {
                        Ok(Some(input)) => {
                            if sender.send(input).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(err) => tracing::warn!(?err, "skipping malformed host message"),
                    }
                }
                tracing::debug!("landmark input closed");
            })?;
        self.join = Some(join);
        Ok(())
    }

    /// The reader thread may be parked in a blocking read; it is detached
    /// and exits at its next line or at end of input.
    fn uninstall(&mut self) -> anyhow::Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            if join.is_finished() && join.join().is_err() {
                return Err(anyhow!("landmark reader panicked"));
            }
        }
        Ok(())
    }

    fn is_installed(&self) -> bool {
        self.join.is_some()
    }
}

#[derive(Clone)]
pub struct MockLandmarkSource {
    state: Arc<MockSourceState>,
}

#[derive(Default)]
struct MockSourceState {
    install_count: AtomicUsize,
    uninstall_count: AtomicUsize,
    sender: Mutex<Option<Sender<TrackerInput>>>,
}

impl MockLandmarkSource {
    pub fn new() -> (Self, MockLandmarkHandle) {
        let state = Arc::new(MockSourceState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockLandmarkHandle { state },
        )
    }
}

impl LandmarkSource for MockLandmarkSource {
    fn install(&mut self, sender: Sender<TrackerInput>) -> anyhow::Result<()> {
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_none() {
            self.state.install_count.fetch_add(1, Ordering::SeqCst);
            *guard = Some(sender);
        }
        Ok(())
    }

    fn uninstall(&mut self) -> anyhow::Result<()> {
        let mut guard = self.state.sender.lock().map_err(|_| anyhow!("lock"))?;
        if guard.is_some() {
            self.state.uninstall_count.fetch_add(1, Ordering::SeqCst);
        }
        *guard = None;
        Ok(())
    }

    fn is_installed(&self) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard.is_some(),
            Err(_) => false,
        }
    }
}

pub struct MockLandmarkHandle {
    state: Arc<MockSourceState>,
}

impl MockLandmarkHandle {
    pub fn install_count(&self) -> usize {
        self.state.install_count.load(Ordering::SeqCst)
    }

    pub fn uninstall_count(&self) -> usize {
        self.state.uninstall_count.load(Ordering::SeqCst)
    }

    pub fn emit(&self, input: TrackerInput) -> bool {
        match self.state.sender.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|sender| sender.send(input).is_ok())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Drops the sender so the worker sees the source disconnect.
    pub fn disconnect(&self) {
        if let Ok(mut guard) = self.state.sender.lock() {
            *guard = None;
        }
    }
}
