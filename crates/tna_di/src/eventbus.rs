//! An injectable publish/subscribe bus.
//!
//! [`Eventbus`] carries [`BusEvent`]s, an action paired with a payload, over
//! a `tokio::sync::broadcast` channel. Consumers can:
//!
//! - run a handler for every event of one action with [`Eventbus::on`]
//! - wait for the next event of one action with [`Eventbus::once`]
//! - pull events of one action at their own pace with [`Eventbus::action`]
//!
//! Destroying the bus closes the channel and aborts every handler task, so
//! pending `once` futures resolve to `None` and no handler outlives the
//! container.
//!
//! # Example
//!
//! ```
//! use tna_di::eventbus::Eventbus;
//! use tna_di::prelude::*;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut tester = StepTester::<Eventbus<&'static str, u32>>::new(StepTesterOptions::new())?;
//! let bus = tester.get_ready().await?;
//!
//! let next = bus.once("tick");
//! bus.emit("tick", 5);
//! assert_eq!(next.await, Some(5));
//! # Ok::<(), DiError>(())
//! # }).unwrap();
//! ```

use core::fmt::{Debug, Display};
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::Mutex;
use tna_logger::Logger;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::AbortHandle;

use crate::component::{Component, HookError, HookResult, OnDestroy};
use crate::metadata::{DescriptorBuilder, Dependencies, Injectable};

/// Events buffered per receiver before slow receivers start lagging.
const CAPACITY: usize = 256;

/// Identifies an action. Compared by equality.
pub trait BusAction: Clone + PartialEq + Display + Send + Sync + 'static {}

impl<T: Clone + PartialEq + Display + Send + Sync + 'static> BusAction for T {}

/// Payload carried with an action.
pub trait BusData: Clone + Debug + Send + Sync + 'static {}

impl<T: Clone + Debug + Send + Sync + 'static> BusData for T {}

/// An action together with its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent<A, D> {
    /// What happened.
    pub action: A,
    /// Data attached to it.
    pub data: D,
}

type Listeners = Mutex<HashMap<u64, AbortHandle>>;

/// Broadcasts events to handlers and receivers registered for their action.
///
/// Registered under the name `Eventbus` regardless of `A` and `D`.
pub struct Eventbus<A, D> {
    logger: Logger,
    sender: Mutex<Option<broadcast::Sender<BusEvent<A, D>>>>,
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
}

impl<A: BusAction, D: BusData> Eventbus<A, D> {
    fn new(logger: Logger) -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self {
            logger,
            sender: Mutex::new(Some(sender)),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Publishes an event and returns how many receivers saw it.
    ///
    /// Nothing is delivered once the bus is destroyed.
    pub fn emit(&self, action: A, data: D) -> usize {
        self.send(BusEvent { action, data })
    }

    /// Publishes a prebuilt event. See [`Eventbus::emit`].
    pub fn send(&self, event: BusEvent<A, D>) -> usize {
        self.logger
            .spam(format_args!("{} >> {:?}", event.action, event.data));
        let sender = self.sender.lock();
        sender
            .as_ref()
            .and_then(|sender| sender.send(event).ok())
            .unwrap_or(0)
    }

    /// Subscribes to every event, whatever its action.
    ///
    /// Returns `None` once the bus is destroyed.
    pub fn events(&self) -> Option<broadcast::Receiver<BusEvent<A, D>>> {
        self.sender.lock().as_ref().map(broadcast::Sender::subscribe)
    }

    /// Subscribes to the payloads of `action`.
    pub fn action(&self, action: A) -> ActionReceiver<A, D> {
        ActionReceiver {
            action,
            receiver: self.events(),
        }
    }

    /// Runs `handler` on a task for every payload of `action`.
    ///
    /// Must be called inside a tokio runtime. The handler stops when the
    /// returned [`Subscription`] is cancelled or the bus is destroyed.
    pub fn on<F>(&self, action: A, handler: F) -> Subscription
    where
        F: Fn(D) + Send + 'static,
    {
        self.logger
            .info(format_args!("registering handler for {action}"));
        let mut receiver = self.action(action);
        let task = tokio::spawn(async move {
            while let Some(data) = receiver.recv().await {
                handler(data);
            }
        });

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, task.abort_handle());
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Resolves with the next payload of `action`, or `None` if the bus is
    /// destroyed first.
    ///
    /// The subscription starts when `once` is called, not when the future is
    /// first polled, so an event emitted in between is not missed.
    pub fn once(&self, action: A) -> impl Future<Output = Option<D>> + Send + use<A, D> {
        self.logger
            .info(format_args!("registering handler for one {action}"));
        let mut receiver = self.action(action);
        async move { receiver.recv().await }
    }

    /// Number of handlers registered with [`Eventbus::on`] and still active.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|_, task| !task.is_finished());
        listeners.len()
    }

    fn close(&self) -> usize {
        self.sender.lock().take();
        let listeners: Vec<_> = self.listeners.lock().drain().collect();
        for (_, task) in &listeners {
            task.abort();
        }
        listeners.len()
    }
}

/// Payloads of a single action, in emission order.
pub struct ActionReceiver<A, D> {
    action: A,
    receiver: Option<broadcast::Receiver<BusEvent<A, D>>>,
}

impl<A: BusAction, D: BusData> ActionReceiver<A, D> {
    /// Waits for the next payload. Returns `None` once the bus is closed.
    ///
    /// Events dropped because this receiver lagged behind are skipped.
    pub async fn recv(&mut self) -> Option<D> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) if event.action == self.action => return Some(event.data),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Handle to a handler registered with [`Eventbus::on`].
///
/// Dropping the handle keeps the handler running.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Stops the handler. Returns `false` if it had already stopped.
    pub fn unsubscribe(self) -> bool {
        let task = self
            .listeners
            .upgrade()
            .and_then(|listeners| listeners.lock().remove(&self.id));
        task.is_some_and(|task| {
            task.abort();
            true
        })
    }
}

impl<A: BusAction, D: BusData> Component for Eventbus<A, D> {
    fn as_on_destroy(&self) -> Option<&dyn OnDestroy> {
        Some(self)
    }
}

#[async_trait]
impl<A: BusAction, D: BusData> OnDestroy for Eventbus<A, D> {
    async fn on_destroy(&self) -> HookResult {
        let stopped = self.close();
        self.logger
            .info(format_args!("closed, stopped {stopped} handlers"));
        Ok(())
    }
}

impl<A: BusAction, D: BusData> Injectable for Eventbus<A, D> {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.consumes::<Logger>()
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self::new(deps.take_logger()?))
    }
}
