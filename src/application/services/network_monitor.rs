use crate::application::ports::{ConnectivityProbe, NetworkStateStore};
use crate::application::services::notification_bus::{EventBus, Subscription};
use crate::domain::entities::NetworkTransition;
use crate::domain::value_objects::NetworkState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Tracks connectivity and raises an event on every online/offline edge.
///
/// The offline flag is persisted so a process that went down while offline
/// starts offline and reports the reconnect as a transition.
pub struct NetworkMonitor {
    state: RwLock<NetworkState>,
    store: Arc<dyn NetworkStateStore>,
    probe: Arc<dyn ConnectivityProbe>,
    transitions: EventBus<NetworkTransition>,
}

impl NetworkMonitor {
    pub async fn initialize(
        store: Arc<dyn NetworkStateStore>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Arc<Self> {
        let was_offline = match store.load_was_offline().await {
            Ok(flag) => flag,
            Err(err) => {
                tracing::warn!(
                    target: "sync::network",
                    error = %err,
                    "could not read persisted network state"
                );
                None
            }
        };

        let initial = if was_offline == Some(true) {
            NetworkState::Offline
        } else {
            NetworkState::from_online(probe.is_online().await)
        };

        tracing::info!(
            target: "sync::network",
            state = initial.as_str(),
            restored = was_offline.is_some(),
            "network monitor initialized"
        );

        let monitor = Arc::new(Self {
            state: RwLock::new(initial),
            store,
            probe,
            transitions: EventBus::new(),
        });
        monitor.persist(initial).await;
        monitor
    }

    pub async fn current(&self) -> NetworkState {
        *self.state.read().await
    }

    pub async fn is_online(&self) -> bool {
        self.current().await.is_online()
    }

    pub fn subscribe(&self) -> Subscription<NetworkTransition> {
        self.transitions.subscribe()
    }

    /// Applies an observed connectivity value. Returns the transition when
    /// the state actually changed.
    pub async fn observe(&self, online: bool) -> Option<NetworkTransition> {
        let next = NetworkState::from_online(online);
        {
            let mut state = self.state.write().await;
            if *state == next {
                return None;
            }
            *state = next;
        }

        self.persist(next).await;

        let transition = if online {
            NetworkTransition::BecameOnline
        } else {
            NetworkTransition::WentOffline
        };
        tracing::info!(target: "sync::network", transition = ?transition, "network state changed");
        self.transitions.publish(transition);
        Some(transition)
    }

    pub async fn poll(&self) -> Option<NetworkTransition> {
        let online = self.probe.is_online().await;
        self.observe(online).await
    }

    /// Polls the probe on a fixed interval until the handle is aborted.
    pub fn watch(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.poll().await;
            }
        })
    }

    async fn persist(&self, state: NetworkState) {
        if let Err(err) = self.store.save_was_offline(!state.is_online()).await {
            tracing::warn!(
                target: "sync::network",
                error = %err,
                "could not persist network state"
            );
        }
    }
}
