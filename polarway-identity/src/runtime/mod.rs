//! ActorRuntime — process-local virtual actor host
//!
//! Every actor is a tokio task draining a bounded mpsc mailbox, one
//! message at a time. Callers never hold a task directly: they address an
//! actor by `(ActorType, id)` and the registry activates it on first use,
//! and again if the previous activation has gone away.
//!
//! ```text
//!   handle.call(..) ──► Registry ──(DashMap: address → Sender)──► mailbox
//!                         │                                        │
//!                         └── activate on miss ──► tokio::spawn(run)
//! ```
//!
//! An address keeps its registry slot until its task has exited, so a
//! shutdown or idle deactivation never overlaps with the next activation.
//!
//! Turn-based concurrency: no two messages for the same address run
//! concurrently; different addresses run fully in parallel.

pub mod ids;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::config::IdentityStoreConfig;
use crate::error::{IdentityError, Result};
use crate::index::IndexServices;
use crate::role::{RoleActor, RoleHandle};
use crate::state::{InMemoryStateStore, StateStore};
use crate::user::{UserActor, UserHandle};

use self::ids::{ActorAddress, ActorType};

const SEND_ATTEMPTS: usize = 3;

/// A single-writer unit of state driven by its mailbox
#[async_trait]
pub(crate) trait Actor: Send + 'static {
    type Msg: Send + 'static;

    fn address(&self) -> &ActorAddress;

    /// Process one message, replying through the message's oneshot
    async fn handle(&mut self, msg: Self::Msg);
}

/// Main event loop shared by every actor type
async fn run<A: Actor>(
    mut actor: A,
    mut rx: mpsc::Receiver<A::Msg>,
    idle_timeout: Option<Duration>,
) {
    debug!(actor = %actor.address(), "Actor activated");
    loop {
        let next = match idle_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, rx.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    // Refuse new sends, then finish whatever is already queued
                    rx.close();
                    while let Some(msg) = rx.recv().await {
                        actor.handle(msg).await;
                    }
                    debug!(actor = %actor.address(), "Actor deactivated (idle)");
                    return;
                }
            },
            None => rx.recv().await,
        };
        match next {
            Some(msg) => actor.handle(msg).await,
            None => break,
        }
    }
    debug!(actor = %actor.address(), "Actor stopped");
}

/// One activation's slot in the registry
///
/// `tx` is `None` once the registry has let go of the mailbox; the slot
/// stays until the task behind it has exited.
struct Activation<M> {
    generation: u64,
    tx: Option<mpsc::Sender<M>>,
    exited: watch::Receiver<bool>,
}

impl<M> Activation<M> {
    fn live(&self) -> Option<&mpsc::Sender<M>> {
        self.tx.as_ref().filter(|tx| !tx.is_closed())
    }
}

type Mailboxes<M> = DashMap<ActorAddress, Activation<M>>;

/// Held by the actor task; removes its slot and wakes waiters on exit
struct Deregister<M> {
    mailboxes: Weak<Mailboxes<M>>,
    address: ActorAddress,
    generation: u64,
    _exited: watch::Sender<bool>,
}

impl<M> Drop for Deregister<M> {
    fn drop(&mut self) {
        if let Some(mailboxes) = self.mailboxes.upgrade() {
            mailboxes.remove_if(&self.address, |_, slot| slot.generation == self.generation);
        }
    }
}

/// Activation table for one actor implementation
pub(crate) struct Registry<A: Actor> {
    mailboxes: Arc<Mailboxes<A::Msg>>,
    generations: AtomicU64,
    capacity: usize,
    idle_timeout: Option<Duration>,
}

impl<A: Actor> Registry<A> {
    pub(crate) fn new(config: &IdentityStoreConfig) -> Self {
        Self {
            mailboxes: Arc::new(DashMap::new()),
            generations: AtomicU64::new(0),
            capacity: config.mailbox_capacity.max(1),
            idle_timeout: config.actor_idle_timeout,
        }
    }

    fn spawn(
        &self,
        address: &ActorAddress,
        actor: A,
    ) -> (mpsc::Sender<A::Msg>, Activation<A::Msg>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let (exited_tx, exited) = watch::channel(false);
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let deregister = Deregister {
            mailboxes: Arc::downgrade(&self.mailboxes),
            address: address.clone(),
            generation,
            _exited: exited_tx,
        };
        let idle_timeout = self.idle_timeout;
        tokio::spawn(async move {
            let _deregister = deregister;
            run(actor, rx, idle_timeout).await;
        });
        let activation = Activation {
            generation,
            tx: Some(tx.clone()),
            exited,
        };
        (tx, activation)
    }

    /// Live mailbox for `address`, activating the actor when needed
    ///
    /// An activation that is shutting down still owns the address: we wait
    /// for its task to exit before starting the next one.
    async fn mailbox(
        &self,
        address: &ActorAddress,
        activate: &impl Fn() -> A,
    ) -> mpsc::Sender<A::Msg> {
        loop {
            let mut exited = match self.mailboxes.entry(address.clone()) {
                Entry::Occupied(entry) => match entry.get().live() {
                    Some(tx) => return tx.clone(),
                    None => entry.get().exited.clone(),
                },
                Entry::Vacant(entry) => {
                    let (tx, activation) = self.spawn(address, activate());
                    entry.insert(activation);
                    return tx;
                }
            };
            debug!(actor = %address, "Waiting for previous activation to exit");
            // Resolves with an error once the old task drops its sender
            let _ = exited.wait_for(|done| *done).await;
        }
    }

    /// Send a request and await its reply
    pub(crate) async fn call<T>(
        &self,
        address: &ActorAddress,
        activate: impl Fn() -> A,
        request: impl FnOnce(oneshot::Sender<Result<T>>) -> A::Msg,
    ) -> Result<T> {
        if address.actor_id.trim().is_empty() {
            return Err(IdentityError::InvalidArgument(format!(
                "blank {} actor id",
                address.actor_type
            )));
        }

        let (reply, rx) = oneshot::channel();
        let mut msg = request(reply);
        for _ in 0..SEND_ATTEMPTS {
            let sent = self.mailbox(address, &activate).await.send(msg).await;
            match sent {
                Ok(()) => {
                    return rx.await.map_err(|_| {
                        IdentityError::InfrastructureUnavailable(format!("{address} dropped"))
                    })?;
                }
                // Closed between lookup and send
                Err(mpsc::error::SendError(returned)) => msg = returned,
            }
        }
        Err(IdentityError::InfrastructureUnavailable(address.to_string()))
    }

    pub(crate) fn active(&self) -> usize {
        self.mailboxes
            .iter()
            .filter(|slot| slot.live().is_some())
            .count()
    }

    /// Let go of every mailbox; each actor drains its queue and exits
    pub(crate) fn clear(&self) {
        for mut slot in self.mailboxes.iter_mut() {
            slot.tx = None;
        }
    }
}

// ─── Runtime ───

/// Hosts user, role and index actors over one state store
///
/// Dropping the runtime (or calling [`ActorRuntime::shutdown`]) drops
/// every mailbox; actors finish queued calls and exit.
pub struct ActorRuntime {
    config: IdentityStoreConfig,
    state: Arc<dyn StateStore>,
    indices: IndexServices,
    pub(crate) users: Registry<UserActor>,
    pub(crate) roles: Registry<RoleActor>,
}

impl ActorRuntime {
    /// Create a runtime persisting through `state`
    pub fn new(config: IdentityStoreConfig, state: Arc<dyn StateStore>) -> Arc<Self> {
        let indices = IndexServices::new(&config, Arc::clone(&state));
        let runtime = Arc::new(Self {
            users: Registry::new(&config),
            roles: Registry::new(&config),
            indices,
            state,
            config,
        });
        info!(
            mailbox_capacity = runtime.config.mailbox_capacity,
            idle_timeout = ?runtime.config.actor_idle_timeout,
            "ActorRuntime started"
        );
        runtime
    }

    /// Runtime over a fresh [`InMemoryStateStore`]
    pub fn in_memory(config: IdentityStoreConfig) -> Arc<Self> {
        Self::new(config, Arc::new(InMemoryStateStore::new()))
    }

    /// Runtime over the Delta `actor_state` table under `config.base_path`
    #[cfg(feature = "delta")]
    pub async fn with_delta(config: IdentityStoreConfig) -> Result<Arc<Self>> {
        let state = crate::state::DeltaStateStore::new(config.clone()).await?;
        Ok(Self::new(config, Arc::new(state)))
    }

    pub fn config(&self) -> &IdentityStoreConfig {
        &self.config
    }

    pub fn state_store(&self) -> &Arc<dyn StateStore> {
        &self.state
    }

    /// Typed access to every index actor
    pub fn indices(&self) -> &IndexServices {
        &self.indices
    }

    /// Handle to the user entity actor `id`
    pub fn user(self: &Arc<Self>, id: impl Into<String>) -> UserHandle {
        UserHandle::new(
            Arc::clone(self),
            ActorAddress::new(ActorType::UserIdentity, id),
        )
    }

    /// Handle to the role entity actor `id`
    pub fn role(self: &Arc<Self>, id: impl Into<String>) -> RoleHandle {
        RoleHandle::new(
            Arc::clone(self),
            ActorAddress::new(ActorType::RoleIdentity, id),
        )
    }

    /// Number of live activations across all actor types
    pub fn active_actors(&self) -> usize {
        self.users.active() + self.roles.active() + self.indices.active()
    }

    /// Drop every mailbox; the next call re-activates from persisted state
    /// once the previous activation has finished its queue
    pub fn shutdown(&self) {
        self.users.clear();
        self.roles.clear();
        self.indices.clear();
        info!("ActorRuntime stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Live and peak instance counts per address
    #[derive(Default)]
    struct Instances {
        live: AtomicUsize,
        peak: AtomicUsize,
    }

    struct Counter {
        address: ActorAddress,
        count: u32,
        instances: Arc<Instances>,
    }

    impl Drop for Counter {
        fn drop(&mut self) {
            self.instances.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    enum CounterMsg {
        Bump { reply: oneshot::Sender<Result<u32>> },
        SlowBump {
            delay: Duration,
            reply: oneshot::Sender<Result<u32>>,
        },
    }

    #[async_trait]
    impl Actor for Counter {
        type Msg = CounterMsg;

        fn address(&self) -> &ActorAddress {
            &self.address
        }

        async fn handle(&mut self, msg: CounterMsg) {
            match msg {
                CounterMsg::Bump { reply } => {
                    self.count += 1;
                    let _ = reply.send(Ok(self.count));
                }
                CounterMsg::SlowBump { delay, reply } => {
                    tokio::time::sleep(delay).await;
                    self.count += 1;
                    let _ = reply.send(Ok(self.count));
                }
            }
        }
    }

    fn address(id: &str) -> ActorAddress {
        ActorAddress::new(ActorType::UserIdentities, id)
    }

    fn tracked(id: &str, instances: Arc<Instances>) -> impl Fn() -> Counter {
        let id = id.to_string();
        move || {
            let live = instances.live.fetch_add(1, Ordering::SeqCst) + 1;
            instances.peak.fetch_max(live, Ordering::SeqCst);
            Counter {
                address: address(&id),
                count: 0,
                instances: Arc::clone(&instances),
            }
        }
    }

    fn counter(id: &str) -> impl Fn() -> Counter {
        tracked(id, Arc::default())
    }

    async fn bump(registry: &Registry<Counter>, id: &str) -> Result<u32> {
        registry
            .call(&address(id), counter(id), |reply| CounterMsg::Bump { reply })
            .await
    }

    #[tokio::test]
    async fn test_calls_are_serialized_per_address() {
        let registry = Arc::new(Registry::<Counter>::new(&IdentityStoreConfig::new("/tmp")));

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move { bump(&registry, "a").await.unwrap() }));
        }
        let mut seen: Vec<u32> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=50).collect::<Vec<_>>());

        assert_eq!(bump(&registry, "b").await.unwrap(), 1);
        assert_eq!(registry.active(), 2);
    }

    #[tokio::test]
    async fn test_blank_id_is_rejected() {
        let registry = Registry::<Counter>::new(&IdentityStoreConfig::new("/tmp"));
        let err = bump(&registry, "  ").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidArgument(_)));
        assert_eq!(registry.active(), 0);
        assert!(registry.mailboxes.is_empty());
    }

    #[tokio::test]
    async fn test_idle_actor_deactivates_and_reactivates() {
        let config = IdentityStoreConfig::new("/tmp")
            .with_actor_idle_timeout(Duration::from_millis(20));
        let registry = Registry::<Counter>::new(&config);

        assert_eq!(bump(&registry, "a").await.unwrap(), 1);
        assert_eq!(bump(&registry, "a").await.unwrap(), 2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(registry.active(), 0);
        assert!(registry.mailboxes.is_empty());

        // Fresh activation: the counter has no persisted state
        assert_eq!(bump(&registry, "a").await.unwrap(), 1);
        assert_eq!(registry.active(), 1);
    }

    #[tokio::test]
    async fn test_idle_slots_are_released() {
        let config = IdentityStoreConfig::new("/tmp")
            .with_actor_idle_timeout(Duration::from_millis(20));
        let registry = Registry::<Counter>::new(&config);

        for i in 0..500 {
            bump(&registry, &format!("k{i}")).await.unwrap();
        }
        assert_eq!(registry.mailboxes.len(), 500);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(registry.active(), 0);
        assert!(registry.mailboxes.is_empty());
    }

    #[tokio::test]
    async fn test_clear_stops_actors() {
        let registry = Registry::<Counter>::new(&IdentityStoreConfig::new("/tmp"));
        bump(&registry, "a").await.unwrap();
        registry.clear();
        assert_eq!(registry.active(), 0);
        assert_eq!(bump(&registry, "a").await.unwrap(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.mailboxes.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_waits_for_busy_activation_before_reactivating() {
        let registry = Arc::new(Registry::<Counter>::new(&IdentityStoreConfig::new("/tmp")));
        let instances = Arc::new(Instances::default());

        let slow = {
            let registry = Arc::clone(&registry);
            let activate = tracked("a", Arc::clone(&instances));
            tokio::spawn(async move {
                registry
                    .call(&address("a"), activate, |reply| CounterMsg::SlowBump {
                        delay: Duration::from_millis(50),
                        reply,
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.clear();

        let fresh = registry
            .call(
                &address("a"),
                tracked("a", Arc::clone(&instances)),
                |reply| CounterMsg::Bump { reply },
            )
            .await
            .unwrap();

        assert_eq!(slow.await.unwrap().unwrap(), 1);
        assert_eq!(fresh, 1);
        assert_eq!(instances.peak.load(Ordering::SeqCst), 1);
    }
}
