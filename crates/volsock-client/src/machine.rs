//! The sync client state machine.
//!
//! Owns everything one tab knows about its relay connection: group, state,
//! retry delay, pending timer, and the echoes it expects from surfaces it
//! just wrote to. Socket I/O and timers live in the driver; this type only
//! turns events into effects, so its behavior is deterministic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use volsock_common::{GroupId, Message};
use volsock_config::ReconnectConfig;

use crate::backoff::RetryDelay;
use crate::surface::{SurfaceHost, SurfaceId, VolumeObserver};
use crate::types::{ClientEvent, ConnectionState, Effect, SyncOptions};

pub struct SyncClient {
    group: GroupId,
    state: ConnectionState,
    retry: RetryDelay,
    reconnect_pending: bool,
    options: SyncOptions,
    host: Arc<dyn SurfaceHost>,
    observer_tx: mpsc::UnboundedSender<ClientEvent>,
    /// Volumes written to surfaces whose change event has not come back yet.
    echoes: HashMap<SurfaceId, f64>,
}

impl SyncClient {
    /// `observer_tx` is where installed surface observers deliver their
    /// `LocalVolumeChanged` events.
    pub fn new(
        group: GroupId,
        reconnect: &ReconnectConfig,
        options: SyncOptions,
        host: Arc<dyn SurfaceHost>,
        observer_tx: mpsc::UnboundedSender<ClientEvent>,
    ) -> Self {
        Self {
            group,
            state: ConnectionState::Disconnected,
            retry: RetryDelay::new(reconnect),
            reconnect_pending: false,
            options,
            host,
            observer_tx,
            echoes: HashMap::new(),
        }
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry.current()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Process one event and return the effects it calls for, in order.
    pub fn handle(&mut self, event: ClientEvent) -> Vec<Effect> {
        match event {
            ClientEvent::ConnectRequested => self.on_connect_requested(),
            ClientEvent::Opened => self.on_opened(),
            ClientEvent::Closed => self.on_closed(),
            ClientEvent::Message(text) => self.on_message(&text),
            ClientEvent::LocalVolumeChanged { surface, volume } => {
                self.on_local_change(surface, volume)
            }
        }
    }

    fn on_connect_requested(&mut self) -> Vec<Effect> {
        self.reconnect_pending = false;
        if self.state != ConnectionState::Disconnected {
            debug!(state = ?self.state, "Connect requested while not disconnected, ignoring");
            return Vec::new();
        }
        self.state = ConnectionState::Connecting;
        vec![Effect::Connect]
    }

    fn on_opened(&mut self) -> Vec<Effect> {
        if self.state != ConnectionState::Connecting {
            debug!(state = ?self.state, "Unexpected open, ignoring");
            return Vec::new();
        }
        self.state = ConnectionState::Connected;
        self.retry.reset();
        self.echoes.clear();
        info!(group = %self.group, "VolSock connection established");

        let mut effects = vec![Effect::Send(Message::init(self.group.clone()))];
        for surface in self.host.surfaces() {
            surface.observe(VolumeObserver::new(surface.id(), self.observer_tx.clone()));
            if self.options.announce_on_connect {
                effects.push(Effect::Send(Message::set_volume(surface.volume())));
            }
        }
        effects
    }

    fn on_closed(&mut self) -> Vec<Effect> {
        if self.state == ConnectionState::Disconnected {
            debug!("Close while already disconnected, ignoring");
            return Vec::new();
        }
        self.state = ConnectionState::Disconnected;
        info!("VolSock connection lost");

        if self.reconnect_pending {
            return Vec::new();
        }
        let delay = self.retry.next_delay();
        self.reconnect_pending = true;
        vec![Effect::ScheduleReconnect(delay)]
    }

    fn on_message(&mut self, text: &str) -> Vec<Effect> {
        if self.state != ConnectionState::Connected {
            debug!(state = ?self.state, "Frame while not connected, dropping");
            return Vec::new();
        }
        match Message::decode(text) {
            Ok(Message::SetVolume { volume }) => {
                self.apply_remote_volume(volume);
            }
            Ok(Message::Init { group, .. }) => {
                debug!(group = %group, "Ignoring init from relay");
            }
            Ok(Message::Unknown) => {
                debug!(text = %text, "Ignoring unknown command");
            }
            Err(e) => {
                warn!(error = %e, "Discarding malformed frame");
            }
        }
        Vec::new()
    }

    fn apply_remote_volume(&mut self, volume: f64) {
        debug!(volume, "Applying remote volume");
        for surface in self.host.surfaces() {
            if self.options.suppress_echo && surface.volume() != volume {
                self.echoes.insert(surface.id(), volume);
            }
            surface.set_volume(volume);
        }
    }

    fn on_local_change(&mut self, surface: SurfaceId, volume: f64) -> Vec<Effect> {
        if let Some(expected) = self.echoes.remove(&surface) {
            if expected == volume {
                trace!(surface = %surface, volume, "Echo of remote volume, not re-sending");
                return Vec::new();
            }
        }
        if !(0.0..=1.0).contains(&volume) {
            debug!(surface = %surface, volume, "Surface reported an out-of-range volume, dropping");
            return Vec::new();
        }
        if self.state != ConnectionState::Connected {
            debug!(surface = %surface, volume, "Not connected, dropping local change");
            return Vec::new();
        }
        vec![Effect::Send(Message::set_volume(volume))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MemoryHost, MemorySurface, VideoSurface};

    struct Harness {
        client: SyncClient,
        host: Arc<MemoryHost>,
        rx: mpsc::UnboundedReceiver<ClientEvent>,
    }

    impl Harness {
        fn new(reconnect: ReconnectConfig, options: SyncOptions) -> Self {
            let host = MemoryHost::new();
            let (tx, rx) = mpsc::unbounded_channel();
            let client = SyncClient::new(
                GroupId::from("g1"),
                &reconnect,
                options,
                host.clone(),
                tx,
            );
            Self { client, host, rx }
        }

        /// Fresh retry delay of zero, no announcements, echo suppression on.
        fn fresh() -> Self {
            Self::new(
                ReconnectConfig {
                    initial_ms: 0,
                    ..ReconnectConfig::default()
                },
                SyncOptions {
                    announce_on_connect: false,
                    suppress_echo: true,
                },
            )
        }

        fn surface(&self, id: u64, volume: f64) -> Arc<MemorySurface> {
            let surface = MemorySurface::new(SurfaceId(id), volume);
            self.host.add(surface.clone());
            surface
        }

        fn connect(&mut self) -> Vec<Effect> {
            assert_eq!(self.client.handle(ClientEvent::ConnectRequested), vec![Effect::Connect]);
            self.client.handle(ClientEvent::Opened)
        }

        /// Feed every observer notification queued so far back into the client.
        fn drain(&mut self) -> Vec<Effect> {
            let mut effects = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                effects.extend(self.client.handle(event));
            }
            effects
        }

        fn fail_once(&mut self) -> Duration {
            let effects = self.client.handle(ClientEvent::Closed);
            let delay = match effects.as_slice() {
                [Effect::ScheduleReconnect(d)] => *d,
                other => panic!("expected one reconnect, got {other:?}"),
            };
            assert_eq!(self.client.handle(ClientEvent::ConnectRequested), vec![Effect::Connect]);
            delay
        }
    }

    fn ms(d: Duration) -> u128 {
        d.as_millis()
    }

    #[test]
    fn starts_disconnected() {
        let h = Harness::fresh();
        assert_eq!(h.client.state(), ConnectionState::Disconnected);
        assert_eq!(h.client.group().as_str(), "g1");
        assert!(!h.client.reconnect_pending());
    }

    #[test]
    fn connect_request_moves_to_connecting() {
        let mut h = Harness::fresh();
        assert_eq!(h.client.handle(ClientEvent::ConnectRequested), vec![Effect::Connect]);
        assert_eq!(h.client.state(), ConnectionState::Connecting);
    }

    #[test]
    fn open_sends_init_and_observes_surfaces() {
        let mut h = Harness::fresh();
        let a = h.surface(1, 1.0);
        let b = h.surface(2, 0.5);

        let effects = h.connect();
        assert_eq!(effects, vec![Effect::Send(Message::init(GroupId::from("g1")))]);
        assert_eq!(h.client.state(), ConnectionState::Connected);
        assert!(a.is_observed());
        assert!(b.is_observed());
    }

    #[test]
    fn open_announces_current_volumes_when_enabled() {
        let mut h = Harness::new(ReconnectConfig::default(), SyncOptions::default());
        h.surface(1, 0.7);

        let effects = h.connect();
        assert_eq!(
            effects,
            vec![
                Effect::Send(Message::init(GroupId::from("g1"))),
                Effect::Send(Message::set_volume(0.7)),
            ]
        );
    }

    #[test]
    fn open_resets_retry_delay() {
        let mut h = Harness::fresh();
        h.client.handle(ClientEvent::ConnectRequested);
        for _ in 0..4 {
            h.fail_once();
        }
        assert!(h.client.retry_delay() > Duration::ZERO);
        h.client.handle(ClientEvent::Opened);
        assert_eq!(h.client.retry_delay(), Duration::ZERO);
    }

    #[test]
    fn backoff_is_monotonic_up_to_cap() {
        let mut h = Harness::fresh();
        h.client.handle(ClientEvent::ConnectRequested);
        let delays: Vec<u128> = (0..9).map(|_| ms(h.fail_once())).collect();
        assert_eq!(
            delays,
            vec![250, 5_000, 10_000, 15_000, 20_000, 25_000, 30_000, 30_000, 30_000]
        );
    }

    #[test]
    fn first_failure_without_success_uses_nominal_delay() {
        let mut h = Harness::new(ReconnectConfig::default(), SyncOptions::default());
        h.client.handle(ClientEvent::ConnectRequested);
        assert_eq!(ms(h.fail_once()), 5_000);
        assert_eq!(ms(h.fail_once()), 10_000);
    }

    #[test]
    fn success_resets_backoff_to_floor() {
        let mut h = Harness::fresh();
        h.client.handle(ClientEvent::ConnectRequested);
        for _ in 0..8 {
            h.fail_once();
        }
        h.client.handle(ClientEvent::Opened);
        assert_eq!(ms(h.fail_once()), 250);
        assert_eq!(ms(h.fail_once()), 5_000);
    }

    #[test]
    fn repeated_closes_arm_one_timer() {
        let mut h = Harness::fresh();
        h.connect();

        let first = h.client.handle(ClientEvent::Closed);
        assert_eq!(first, vec![Effect::ScheduleReconnect(Duration::from_millis(250))]);
        assert!(h.client.reconnect_pending());

        for _ in 0..3 {
            assert!(h.client.handle(ClientEvent::Closed).is_empty());
        }
        // The ignored closes did not grow the delay either.
        assert_eq!(h.client.retry_delay(), Duration::from_millis(5_000));
    }

    #[test]
    fn connect_request_while_connecting_is_ignored() {
        let mut h = Harness::fresh();
        h.client.handle(ClientEvent::ConnectRequested);
        assert!(h.client.handle(ClientEvent::ConnectRequested).is_empty());
        assert_eq!(h.client.state(), ConnectionState::Connecting);
    }

    #[test]
    fn timer_firing_clears_pending_flag() {
        let mut h = Harness::fresh();
        h.connect();
        h.client.handle(ClientEvent::Closed);
        assert!(h.client.reconnect_pending());
        h.client.handle(ClientEvent::ConnectRequested);
        assert!(!h.client.reconnect_pending());
        assert_eq!(h.client.state(), ConnectionState::Connecting);
    }

    #[test]
    fn open_while_disconnected_is_ignored() {
        let mut h = Harness::fresh();
        assert!(h.client.handle(ClientEvent::Opened).is_empty());
        assert_eq!(h.client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn local_change_is_sent_when_connected() {
        let mut h = Harness::fresh();
        let a = h.surface(1, 1.0);
        h.connect();

        a.set_volume(0.4);
        assert_eq!(h.drain(), vec![Effect::Send(Message::set_volume(0.4))]);
    }

    #[test]
    fn invalid_local_volume_is_not_sent() {
        let mut h = Harness::fresh();
        h.surface(1, 1.0);
        h.connect();

        for volume in [f64::NAN, f64::INFINITY, -0.1, 1.5] {
            let effects = h.client.handle(ClientEvent::LocalVolumeChanged {
                surface: SurfaceId(1),
                volume,
            });
            assert!(effects.is_empty(), "volume {volume} produced effects");
        }
        assert_eq!(h.client.state(), ConnectionState::Connected);

        let effects = h.client.handle(ClientEvent::LocalVolumeChanged {
            surface: SurfaceId(1),
            volume: 1.0,
        });
        assert_eq!(effects, vec![Effect::Send(Message::set_volume(1.0))]);
    }

    #[test]
    fn local_change_is_dropped_when_disconnected() {
        let mut h = Harness::fresh();
        let a = h.surface(1, 1.0);
        h.connect();
        h.client.handle(ClientEvent::Closed);

        a.set_volume(0.4);
        assert!(h.drain().is_empty());
        assert_eq!(h.client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn remote_volume_applies_to_every_surface() {
        let mut h = Harness::fresh();
        let a = h.surface(1, 1.0);
        let b = h.surface(2, 0.2);
        h.connect();

        let effects = h
            .client
            .handle(ClientEvent::Message(r#"{"cmd":"setvolume","volume":0.4}"#.into()));
        assert!(effects.is_empty());
        assert_eq!(a.volume(), 0.4);
        assert_eq!(b.volume(), 0.4);
    }

    #[test]
    fn remote_volume_reaches_surfaces_added_after_init() {
        let mut h = Harness::fresh();
        h.connect();
        let late = h.surface(9, 1.0);

        h.client
            .handle(ClientEvent::Message(r#"{"cmd":"setvolume","volume":0.3}"#.into()));
        assert_eq!(late.volume(), 0.3);
        assert!(!late.is_observed());
    }

    #[test]
    fn round_trip_over_range() {
        for v in [0.0, 0.01, 0.25, 0.5, 0.999, 1.0] {
            let mut h = Harness::fresh();
            let a = h.surface(1, 0.6);
            h.connect();
            let frame = Message::set_volume(v).encode().unwrap();
            h.client.handle(ClientEvent::Message(frame));
            assert_eq!(a.volume(), v);
        }
    }

    #[test]
    fn applied_volume_is_not_echoed_back() {
        let mut h = Harness::fresh();
        let a = h.surface(1, 1.0);
        h.connect();

        h.client
            .handle(ClientEvent::Message(r#"{"cmd":"setvolume","volume":0.4}"#.into()));
        assert!(h.drain().is_empty());

        // A later user change still goes out.
        a.set_volume(0.9);
        assert_eq!(h.drain(), vec![Effect::Send(Message::set_volume(0.9))]);
    }

    #[test]
    fn user_change_back_to_remote_value_is_sent() {
        let mut h = Harness::fresh();
        let a = h.surface(1, 1.0);
        h.connect();

        h.client
            .handle(ClientEvent::Message(r#"{"cmd":"setvolume","volume":0.4}"#.into()));
        h.drain();
        a.set_volume(0.8);
        a.set_volume(0.4);
        assert_eq!(
            h.drain(),
            vec![
                Effect::Send(Message::set_volume(0.8)),
                Effect::Send(Message::set_volume(0.4)),
            ]
        );
    }

    #[test]
    fn echo_is_resent_when_suppression_disabled() {
        let mut h = Harness::new(
            ReconnectConfig::default(),
            SyncOptions {
                announce_on_connect: false,
                suppress_echo: false,
            },
        );
        h.surface(1, 1.0);
        h.connect();

        h.client
            .handle(ClientEvent::Message(r#"{"cmd":"setvolume","volume":0.4}"#.into()));
        assert_eq!(h.drain(), vec![Effect::Send(Message::set_volume(0.4))]);
        // Applying the same value again raises nothing: no amplification.
        h.client
            .handle(ClientEvent::Message(r#"{"cmd":"setvolume","volume":0.4}"#.into()));
        assert!(h.drain().is_empty());
    }

    #[test]
    fn applying_same_volume_twice_is_idempotent() {
        let mut h = Harness::fresh();
        let a = h.surface(1, 1.0);
        h.connect();

        for _ in 0..2 {
            h.client
                .handle(ClientEvent::Message(r#"{"cmd":"setvolume","volume":0.55}"#.into()));
        }
        assert_eq!(a.volume(), 0.55);
        assert_eq!(h.client.state(), ConnectionState::Connected);
        assert!(h.drain().is_empty());
    }

    #[test]
    fn malformed_frames_change_nothing() {
        let mut h = Harness::fresh();
        let a = h.surface(1, 0.6);
        h.connect();

        for frame in [
            "not json",
            "",
            "[]",
            r#"{"cmd":"setvolume"}"#,
            r#"{"cmd":"setvolume","volume":"loud"}"#,
            r#"{"cmd":"setvolume","volume":2.0}"#,
            r#"{"volume":0.1}"#,
        ] {
            let effects = h.client.handle(ClientEvent::Message(frame.into()));
            assert!(effects.is_empty(), "frame {frame:?} produced effects");
        }
        assert_eq!(a.volume(), 0.6);
        assert_eq!(h.client.state(), ConnectionState::Connected);
        assert!(h.drain().is_empty());
    }

    #[test]
    fn unknown_command_is_ignored() {
        let mut h = Harness::fresh();
        let a = h.surface(1, 0.6);
        h.connect();

        let effects = h
            .client
            .handle(ClientEvent::Message(r#"{"cmd":"setmuted","muted":true}"#.into()));
        assert!(effects.is_empty());
        assert_eq!(a.volume(), 0.6);
    }

    #[test]
    fn frames_while_connecting_are_dropped() {
        let mut h = Harness::fresh();
        let a = h.surface(1, 0.6);
        h.client.handle(ClientEvent::ConnectRequested);

        h.client
            .handle(ClientEvent::Message(r#"{"cmd":"setvolume","volume":0.1}"#.into()));
        assert_eq!(a.volume(), 0.6);
    }

    #[test]
    fn scenario_drop_then_two_failed_attempts() {
        let mut h = Harness::fresh();
        let a = h.surface(1, 1.0);
        let init = h.connect();
        assert_eq!(init, vec![Effect::Send(Message::init(GroupId::from("g1")))]);

        a.set_volume(0.4);
        assert_eq!(h.drain(), vec![Effect::Send(Message::set_volume(0.4))]);

        assert_eq!(ms(h.fail_once()), 250);
        assert_eq!(ms(h.fail_once()), 5_000);
    }
}
