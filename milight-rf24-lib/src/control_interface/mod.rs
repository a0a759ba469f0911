pub mod queue;

use std::future::pending;
use std::pin::Pin;

use log::{debug, info, trace, warn};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep, Sleep};

use crate::control_interface::queue::{Counter, SendQueue};
use crate::led::led_color::Rgb;
use crate::protocol::button::Button;
use crate::protocol::codec::{decode, encode, DecodedEvent, Packet};
use crate::protocol::command::{Command, CommandError, RemoteId, Zone};
use crate::util::config::ControllerConfig;
use crate::util::traits::{LineReceiver, Transport};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("controller is already open")]
    AlreadyOpen,
    #[error("controller has been shut down")]
    Closed,
    #[error("transport failed: {0:#}")]
    Transport(anyhow::Error),
    #[error("controller task failed: {0}")]
    Task(#[from] JoinError),
}

/// What the send loop reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendPayload {
    /// The packet is about to be written.
    Packet(Packet),
    /// The queue ran dry; emitted once per drain.
    QueueFinished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    Sending(SendPayload),
    Received(DecodedEvent),
}

enum Request {
    Open(oneshot::Sender<Result<(), ControllerError>>),
    Send {
        id: RemoteId,
        zone: Zone,
        command: Command,
    },
    Shutdown,
}

/// Handle to a bridge board.
///
/// All state lives in a task spawned by [`Controller::new`]; the handle only
/// passes requests to it. Commands may be queued before [`Controller::open`],
/// they go out once the bridge has warmed up.
pub struct Controller {
    requests: mpsc::UnboundedSender<Request>,
    events: broadcast::Sender<ControllerEvent>,
    task: Option<JoinHandle<()>>,
}

impl Controller {
    /// Spawns the controller task. Must be called inside a tokio runtime.
    pub fn new<T: Transport>(transport: T, config: ControllerConfig) -> Self {
        let (requests, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let task = ControllerTask {
            transport,
            config,
            queue: SendQueue::new(),
            counter: Counter::default(),
            ready: false,
            opened: false,
            events: events.clone(),
            lines: None,
            warm_up: None,
            pacing: None,
        };

        Controller {
            requests,
            events,
            task: Some(tokio::spawn(task.run(receiver))),
        }
    }

    /// Opens the transport and starts the warm-up. Returns as soon as the
    /// transport is open; the handshake follows after the warm-up delay.
    pub async fn open(&self) -> Result<(), ControllerError> {
        let (reply, response) = oneshot::channel();
        self.request(Request::Open(reply))?;
        response.await.map_err(|_| ControllerError::Closed)?
    }

    pub fn set_color(&self, id: &RemoteId, zone: u8, rgb: Rgb) -> Result<(), ControllerError> {
        self.send(id, zone, Command::SetColor(rgb))
    }

    pub fn set_brightness(
        &self,
        id: &RemoteId,
        zone: u8,
        percent: u8,
    ) -> Result<(), ControllerError> {
        self.send(id, zone, Command::SetBrightness { percent })
    }

    pub fn send_button(
        &self,
        id: &RemoteId,
        zone: u8,
        button: Button,
        long_press: bool,
    ) -> Result<(), ControllerError> {
        self.send(id, zone, Command::SendButton { button, long_press })
    }

    /// Like [`Controller::send_button`], for a raw four bit button code.
    pub fn send_button_code(
        &self,
        id: &RemoteId,
        zone: u8,
        code: u8,
        long_press: bool,
    ) -> Result<(), ControllerError> {
        let button = Button::try_from(code)?;
        self.send_button(id, zone, button, long_press)
    }

    pub fn send_disco_mode(&self, id: &RemoteId, zone: u8, mode: u8) -> Result<(), ControllerError> {
        self.send(id, zone, Command::disco_mode(mode)?)
    }

    /// Validates `command` and queues it.
    pub fn send(&self, id: &RemoteId, zone: u8, command: Command) -> Result<(), ControllerError> {
        let zone = Zone::new(zone)?;
        command.validate()?;
        self.request(Request::Send {
            id: id.clone(),
            zone,
            command,
        })
    }

    /// Events emitted from now on, in emission order.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Stops the task. Pending timers are cancelled and queued packets are
    /// dropped. Later calls on this handle fail with `Closed`.
    pub async fn shutdown(&mut self) -> Result<(), ControllerError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        // the task may already be gone; joining is enough then
        let _ = self.requests.send(Request::Shutdown);
        task.await?;
        Ok(())
    }

    fn request(&self, request: Request) -> Result<(), ControllerError> {
        if self.task.is_none() {
            return Err(ControllerError::Closed);
        }
        self.requests
            .send(request)
            .map_err(|_| ControllerError::Closed)
    }
}

type Timer = Option<Pin<Box<Sleep>>>;

struct ControllerTask<T> {
    transport: T,
    config: ControllerConfig,
    queue: SendQueue,
    counter: Counter,
    /// The transport reported ready.
    ready: bool,
    /// The warm-up is over and the handshake was written.
    opened: bool,
    events: broadcast::Sender<ControllerEvent>,
    lines: Option<LineReceiver>,
    warm_up: Timer,
    pacing: Timer,
}

impl<T: Transport> ControllerTask<T> {
    async fn run(mut self, mut requests: mpsc::UnboundedReceiver<Request>) {
        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(Request::Open(reply)) => {
                        let _ = reply.send(self.open());
                    }
                    Some(Request::Send { id, zone, command }) => self.enqueue(&id, zone, &command),
                    Some(Request::Shutdown) | None => break,
                },
                line = next_line(&mut self.lines) => match line {
                    Some(line) => self.receive(&line),
                    None => {
                        warn!("Bridge line stream closed");
                        self.lines = None;
                    }
                },
                _ = expire(&mut self.warm_up) => {
                    self.warm_up = None;
                    self.finish_warm_up();
                }
                _ = expire(&mut self.pacing) => {
                    self.pacing = None;
                    self.send_next();
                }
            }
        }
        info!("Controller stopped, {} packet(s) dropped", self.queue.len());
    }

    fn open(&mut self) -> Result<(), ControllerError> {
        if self.ready {
            return Err(ControllerError::AlreadyOpen);
        }
        let lines = self.transport.open().map_err(ControllerError::Transport)?;
        self.lines = Some(lines);
        self.ready = true;
        self.warm_up = Some(Box::pin(sleep(self.config.warm_up)));
        info!("Bridge ready, warming up for {:?}", self.config.warm_up);
        Ok(())
    }

    fn finish_warm_up(&mut self) {
        let handshake = self.config.handshake.clone();
        self.write(handshake.as_bytes());
        self.opened = true;
        info!("Handshake sent, {} packet(s) queued", self.queue.len());
        self.kick();
    }

    fn enqueue(&mut self, id: &RemoteId, zone: Zone, command: &Command) {
        let counter = self.counter.advance();
        match encode(id, zone, command, counter) {
            Ok(packet) => {
                trace!("Queued {}", packet);
                self.queue.enqueue(packet);
                self.kick();
            }
            Err(err) => warn!("Dropping command {:?}: {}", command, err),
        }
    }

    fn kick(&mut self) {
        if self.queue.begin_drain(self.opened) {
            self.send_next();
        }
    }

    fn send_next(&mut self) {
        match self.queue.pop_next() {
            Some(packet) => {
                debug!(
                    "Sending packet {} (counter {}, {} repeats)",
                    packet.command_line(),
                    packet.counter(),
                    packet.repeats()
                );
                self.emit(ControllerEvent::Sending(SendPayload::Packet(packet.clone())));
                self.write(packet.as_bytes());
                self.pacing = Some(Box::pin(sleep(self.config.pacing)));
            }
            None => {
                debug!("Send queue finished");
                self.emit(ControllerEvent::Sending(SendPayload::QueueFinished));
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        if let Err(err) = self.transport.write(bytes) {
            warn!("Failed to write to bridge: {:#}", err);
            return;
        }
        if let Err(err) = self.transport.flush() {
            warn!("Failed to flush bridge: {:#}", err);
        }
    }

    fn receive(&mut self, line: &str) {
        match decode(line) {
            Some(event) => {
                debug!("Received {}", event);
                self.emit(ControllerEvent::Received(event));
            }
            None => trace!("Ignoring line {:?}", line),
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // no subscribers is not an error
        let _ = self.events.send(event);
    }
}

async fn next_line(lines: &mut Option<LineReceiver>) -> Option<String> {
    match lines {
        Some(lines) => lines.recv().await,
        None => pending().await,
    }
}

async fn expire(timer: &mut Timer) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}
