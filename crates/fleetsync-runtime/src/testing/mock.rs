//! In-memory stand-ins for the directory, process table and clock.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use fleetsync_core::discovery::directory_query_name;
use fleetsync_core::{
    Clock, DiscoveryError, EnvironmentSnapshot, MembershipSet, RestartError, Timestamp,
};

use crate::directory::{PeerDirectory, TxtSource};
use crate::process::{ProcessController, RestartOutcome};

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }

    pub fn set(&self, to: Timestamp) {
        *self.now.lock().unwrap() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}

/// Directory returning a settable peer list, with injectable failures.
#[derive(Debug)]
pub struct ScriptedDirectory {
    app_name: String,
    peers: Mutex<Vec<String>>,
    pending_failures: AtomicUsize,
    resolves: AtomicUsize,
}

impl ScriptedDirectory {
    pub fn new(app_name: impl Into<String>, peers: &[&str]) -> Self {
        Self {
            app_name: app_name.into(),
            peers: Mutex::new(peers.iter().map(|p| p.to_string()).collect()),
            pending_failures: AtomicUsize::new(0),
            resolves: AtomicUsize::new(0),
        }
    }

    /// Replace the peers returned from now on.
    pub fn set_peers(&self, peers: &[&str]) {
        *self.peers.lock().unwrap() = peers.iter().map(|p| p.to_string()).collect();
    }

    /// Make the next resolution time out.
    pub fn fail_next(&self) {
        self.pending_failures.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of resolutions attempted.
    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> Result<EnvironmentSnapshot, DiscoveryError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(DiscoveryError::Timeout {
                name: directory_query_name(&self.app_name),
                timeout_ms: 1000,
            });
        }

        Ok(EnvironmentSnapshot {
            app_name: self.app_name.clone(),
            region: "ams".to_string(),
            host: "fly-local-6pn".to_string(),
            node_id: "test-node".to_string(),
            ipv4: Ipv4Addr::UNSPECIFIED,
            ipv6: Ipv6Addr::UNSPECIFIED,
            peers: MembershipSet::new(self.peers.lock().unwrap().clone()),
            timestamp: Utc::now(),
        })
    }
}

impl PeerDirectory for ScriptedDirectory {
    fn resolve(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<EnvironmentSnapshot, DiscoveryError>> + Send + '_>> {
        let result = self.snapshot();
        Box::pin(async move { result })
    }
}

/// TXT source returning fixed records and recording queries.
#[derive(Debug, Clone)]
pub struct StaticTxtSource {
    records: Arc<Mutex<Option<Vec<String>>>>,
    queries: Arc<Mutex<Vec<(IpAddr, String)>>>,
}

impl StaticTxtSource {
    pub fn new(records: Vec<String>) -> Self {
        Self {
            records: Arc::new(Mutex::new(Some(records))),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A source whose every lookup times out.
    pub fn failing() -> Self {
        Self {
            records: Arc::new(Mutex::new(None)),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replace the records returned from now on.
    pub fn set_records(&self, records: Vec<String>) {
        *self.records.lock().unwrap() = Some(records);
    }

    /// Queries seen so far.
    pub fn queries(&self) -> Vec<(IpAddr, String)> {
        self.queries.lock().unwrap().clone()
    }
}

impl TxtSource for StaticTxtSource {
    fn lookup<'a>(
        &'a self,
        nameserver: IpAddr,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, DiscoveryError>> + Send + 'a>> {
        self.queries
            .lock()
            .unwrap()
            .push((nameserver, name.to_string()));

        let result = match self.records.lock().unwrap().clone() {
            Some(records) => Ok(records),
            None => Err(DiscoveryError::Timeout {
                name: name.to_string(),
                timeout_ms: 1000,
            }),
        };
        Box::pin(async move { result })
    }
}

/// Process controller that records restart requests instead of acting on them.
#[derive(Debug, Default)]
pub struct RecordingController {
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<String>>,
}

impl RecordingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following restart fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(message.into());
    }

    /// Process names restart was requested for, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessController for RecordingController {
    fn restart<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RestartOutcome, RestartError>> + Send + 'a>> {
        self.calls.lock().unwrap().push(name.to_string());

        let result = match self.failure.lock().unwrap().clone() {
            Some(message) => Err(RestartError::Terminate {
                pids: vec![1],
                message,
            }),
            None => Ok(RestartOutcome::Signalled { pids: vec![1] }),
        };
        Box::pin(async move { result })
    }
}
