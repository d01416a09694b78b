//! Readiness-driven TCP reactor.
//!
//! The reactor owns the listening socket and a map from client handle to
//! [`Locker`] slot. Worker threads block in [`TcpReactor::run`]; the
//! multiplexer hands each readiness event to exactly one of them, and the
//! per-client slot guarantees a client is never advanced by two workers at
//! once. A worker that finds a slot contended simply drops the event - the
//! re-arm performed by the current owner will surface anything it missed.

use std::collections::HashMap;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Error;
use crate::net::socket::Socket;
use crate::server::locker::Locker;
use crate::server::poller::{Events, Poller, CLIENT_INTEREST, LISTENER_INTEREST};

const MAX_READY: usize = 64;

/// Callbacks driven by the reactor for one client connection.
///
/// Implementations hold all per-connection state. The reactor guarantees
/// calls for one client never overlap.
pub trait ClientEvents: Send {
    /// The connection was just accepted.
    fn connected(&mut self, client: &mut Socket);

    /// Bytes may be waiting on the socket. `half_closed` reports that the
    /// peer finished writing. Returns whether the connection should stay
    /// registered.
    fn data_available(&mut self, client: &mut Socket, half_closed: bool) -> bool;

    /// The peer closed its writing half.
    fn shutdown(&mut self, client: &mut Socket);
}

/// Builds the per-connection listener for each accepted client.
pub type EventsFactory = Box<dyn Fn() -> Box<dyn ClientEvents> + Send + Sync>;

struct ClientHandle {
    socket: Socket,
    events: Box<dyn ClientEvents>,
}

/// Accepts connections and multiplexes their readiness events across any
/// number of worker threads.
pub struct TcpReactor {
    listener: Socket,
    poller: Poller,
    clients: Mutex<HashMap<RawFd, Arc<Locker<ClientHandle>>>>,
    factory: Option<EventsFactory>,
}

impl TcpReactor {
    /// Wraps a bound, non-blocking listening socket.
    pub fn new(listener: Socket) -> Result<Self, Error> {
        Ok(Self {
            listener,
            poller: Poller::new()?,
            clients: Mutex::new(HashMap::new()),
            factory: None,
        })
    }

    /// Starts listening and registers the listener with the multiplexer.
    ///
    /// The listener stays armed permanently; clients are armed one-shot.
    pub fn initialize(&mut self, backlog: i32, factory: EventsFactory) -> Result<(), Error> {
        if self.factory.is_some() {
            return Err(Error::Runtime("server already listening".into()));
        }
        self.listener.listen(backlog)?;
        self.poller.add(self.listener.handle(), LISTENER_INTEREST)?;
        self.factory = Some(factory);
        tracing::debug!(address = %self.listener.address(), backlog, "listener armed");
        Ok(())
    }

    /// The address the listener is actually bound to.
    pub fn local_address(&self) -> Result<crate::net::addr::SocketAddress, Error> {
        Ok(self.listener.local_address()?)
    }

    /// Drives the readiness loop until a reactor-level fault.
    ///
    /// May be entered from any number of threads against the same
    /// instance. Faults from the multiplexer control operations are fatal;
    /// faults from individual clients or accepts are not.
    pub fn run(&self) -> Result<(), Error> {
        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| Error::Runtime("reactor is not initialized".into()))?;
        let mut ready = Events::with_capacity(MAX_READY);
        loop {
            self.poller.wait(&mut ready, -1)?;
            for event in ready.iter() {
                if event.fd == self.listener.handle() {
                    self.accept_pending(factory)?;
                } else {
                    self.client_event(event.fd, event.half_closed)?;
                }
            }
        }
    }

    /// Drains the accept queue. An accept fault ends the drain but not the
    /// reactor.
    fn accept_pending(&self, factory: &EventsFactory) -> Result<(), Error> {
        loop {
            let mut client = match self.listener.accept(true) {
                Ok(Some(client)) => client,
                Ok(None) => return Ok(()),
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                    return Ok(());
                }
            };
            let fd = client.handle();
            let mut events = (factory)();
            events.connected(&mut client);
            tracing::debug!(client = fd, peer = %client.address(), "client connected");
            let slot = Arc::new(Locker::new(ClientHandle {
                socket: client,
                events,
            }));
            self.lock_clients().insert(fd, slot);
            // Registration goes last so no event can arrive before the map
            // knows the client.
            if let Err(err) = self.poller.add(fd, CLIENT_INTEREST) {
                self.lock_clients().remove(&fd);
                return Err(err.into());
            }
        }
    }

    fn client_event(&self, fd: RawFd, half_closed: bool) -> Result<(), Error> {
        if half_closed {
            // No further events can fire for this client; drop the
            // registration before anyone else sees it.
            let _ = self.poller.remove(fd);
        }
        let slot = match self.lock_clients().get(&fd) {
            Some(slot) => Arc::clone(slot),
            None => return Ok(()),
        };
        let mut handle = match slot.try_take() {
            Some(handle) => handle,
            // Another worker is mid-flight on this client; its re-arm will
            // surface whatever triggered us.
            None => return Ok(()),
        };

        let alive = handle.events.data_available(&mut handle.socket, half_closed);
        if alive && !half_closed && !handle.socket.is_invalid() {
            slot.put_back(handle);
            self.poller.rearm(fd, CLIENT_INTEREST)?;
        } else {
            if !half_closed {
                let _ = self.poller.remove(fd);
            }
            self.lock_clients().remove(&fd);
            drop(handle); // closes the socket
            tracing::debug!(client = fd, "client removed");
        }
        Ok(())
    }

    fn lock_clients(&self) -> MutexGuard<'_, HashMap<RawFd, Arc<Locker<ClientHandle>>>> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }
}
