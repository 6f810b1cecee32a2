//! WebSocket server adapter.
//!
//! Implements [`ClientTransportPort`]: connection lifecycle and inbound
//! text frames become [`ClientEvent`]s drained by the poll loop, and
//! `send_all` broadcasts one text frame to every live session.
//!
//! - **`target_os = "espidf"`** — an `EspHttpServer` WebSocket endpoint;
//!   handler callbacks run on the httpd task and only enqueue events, so
//!   all state mutation stays on the poll-loop thread.
//! - **host** — events are injected by tests and broadcasts are recorded.

use log::{debug, warn};

use crate::app::ports::{ClientEvent, ClientTransportPort};

#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex};

#[cfg(target_os = "espidf")]
use esp_idf_svc::http::server::{
    ws::EspHttpWsDetachedSender, Configuration as HttpConfig, EspHttpServer,
};
#[cfg(target_os = "espidf")]
use esp_idf_svc::ws::FrameType;

/// Hard cap on concurrent sessions; a controller serves at most a handful
/// of dashboards.
pub const MAX_CLIENTS: usize = 4;

/// Bounded event backlog between the httpd task and the poll loop.
const EVENT_QUEUE_CAP: usize = 16;

#[cfg(target_os = "espidf")]
struct Shared {
    events: heapless::Deque<ClientEvent, EVENT_QUEUE_CAP>,
    sessions: heapless::Vec<(u8, EspHttpWsDetachedSender), MAX_CLIENTS>,
}

pub struct WsServer {
    #[cfg(target_os = "espidf")]
    _server: EspHttpServer<'static>,
    #[cfg(target_os = "espidf")]
    shared: Arc<Mutex<Shared>>,
    #[cfg(not(target_os = "espidf"))]
    events: heapless::Deque<ClientEvent, EVENT_QUEUE_CAP>,
    #[cfg(not(target_os = "espidf"))]
    broadcasts: Vec<String>,
}

impl WsServer {
    #[cfg(not(target_os = "espidf"))]
    pub fn new(_port: u16) -> Result<Self, crate::error::Error> {
        Ok(Self {
            events: heapless::Deque::new(),
            broadcasts: Vec::new(),
        })
    }

    #[cfg(target_os = "espidf")]
    pub fn new(port: u16) -> Result<Self, crate::error::Error> {
        let shared = Arc::new(Mutex::new(Shared {
            events: heapless::Deque::new(),
            sessions: heapless::Vec::new(),
        }));

        let config = HttpConfig {
            http_port: port,
            ..HttpConfig::default()
        };
        let mut server =
            EspHttpServer::new(&config).map_err(|_| crate::error::Error::Init("http server"))?;

        let handler_shared = Arc::clone(&shared);
        server
            .ws_handler("/", move |ws| -> Result<(), esp_idf_svc::sys::EspError> {
                let Ok(mut shared) = handler_shared.lock() else {
                    return Ok(());
                };
                let id = ws.session() as u8;

                if ws.is_new() {
                    if let Ok(sender) = ws.create_detached_sender() {
                        if shared.sessions.push((id, sender)).is_err() {
                            warn!("WS: session table full, dropping client {id}");
                            return Ok(());
                        }
                    }
                    push_event(&mut shared.events, ClientEvent::Connected(id));
                    return Ok(());
                }

                if ws.is_closed() {
                    shared.sessions.retain(|(sid, _)| *sid != id);
                    push_event(&mut shared.events, ClientEvent::Disconnected(id));
                    return Ok(());
                }

                // Text frame: copy out and hand to the poll loop.
                let (_frame_type, len) = ws.recv(&mut [])?;
                let mut buf = vec![0u8; len];
                ws.recv(&mut buf)?;
                match String::from_utf8(buf) {
                    Ok(text) => push_event(&mut shared.events, ClientEvent::Message(id, text)),
                    Err(_) => debug!("WS: dropping non-UTF-8 frame from client {id}"),
                }
                Ok(())
            })
            .map_err(|_| crate::error::Error::Init("ws handler"))?;

        Ok(Self {
            _server: server,
            shared,
        })
    }

    // ── Host test hooks ───────────────────────────────────────

    /// Inject a client event, as if the httpd task had queued it.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_push_event(&mut self, event: ClientEvent) {
        push_event(&mut self.events, event);
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn broadcasts(&self) -> &[String] {
        &self.broadcasts
    }
}

fn push_event(
    queue: &mut heapless::Deque<ClientEvent, EVENT_QUEUE_CAP>,
    event: ClientEvent,
) {
    if queue.push_back(event).is_err() {
        // Backlog full: the poll loop has stalled; newest event loses.
        warn!("WS: event queue full, dropping event");
    }
}

impl ClientTransportPort for WsServer {
    #[cfg(not(target_os = "espidf"))]
    fn poll_event(&mut self) -> Option<ClientEvent> {
        self.events.pop_front()
    }

    #[cfg(target_os = "espidf")]
    fn poll_event(&mut self) -> Option<ClientEvent> {
        self.shared.lock().ok()?.events.pop_front()
    }

    #[cfg(not(target_os = "espidf"))]
    fn send_all(&mut self, text: &str) {
        debug!("broadcast (sim): {text}");
        self.broadcasts.push(text.to_owned());
    }

    #[cfg(target_os = "espidf")]
    fn send_all(&mut self, text: &str) {
        let Ok(mut shared) = self.shared.lock() else {
            return;
        };
        let mut dead: heapless::Vec<u8, MAX_CLIENTS> = heapless::Vec::new();
        for (id, sender) in &mut shared.sessions {
            if sender.send(FrameType::Text(false), text.as_bytes()).is_err() {
                debug!("WS: send to client {id} failed, pruning session");
                let _ = dead.push(*id);
            }
        }
        shared.sessions.retain(|(sid, _)| !dead.contains(sid));
    }
}
