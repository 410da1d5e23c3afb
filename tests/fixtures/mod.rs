// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-landscape
//!
//! Deterministic landscape documents and fake collaborators. Nothing here
//! touches the network: probes answer from a fixed set of reachable
//! locations.
#![allow(dead_code)]

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use cim_landscape::aspects::Aspects;
use cim_landscape::config::{ConfigurationSource, LandscapeSettings, StaticSource};
use cim_landscape::domain::{DeviceExtension, LandscapeDevice};
use cim_landscape::interfaces::{
    CommandAgentFactory, CommandContext, CommandOutput, ConnectivityProbe, SystemContext,
};
use cim_landscape::{Landscape, LandscapeBuilder, LandscapeResult};

/// Probe answering from a fixed set of reachable `host:port` locations
#[derive(Debug, Default)]
pub struct FakeProbe {
    reachable: BTreeSet<String>,
    probed: Mutex<Vec<String>>,
}

impl FakeProbe {
    /// Nothing is reachable
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reaching(locations: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            reachable: locations.iter().map(|s| s.to_string()).collect(),
            probed: Mutex::new(Vec::new()),
        })
    }

    /// Every location probed so far, in order
    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().clone()
    }
}

impl ConnectivityProbe for FakeProbe {
    fn probe(&self, location: &str, _timeout: Duration) -> io::Result<()> {
        self.probed.lock().push(location.to_string());
        if self.reachable.contains(location) {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, location.to_string()))
        }
    }
}

/// Agent factory whose sessions answer every command with one exit status
#[derive(Debug)]
pub struct FakeAgents {
    status: i32,
    stderr: String,
    opened: Mutex<Vec<String>>,
}

impl FakeAgents {
    pub fn answering(status: i32, stderr: &str) -> Arc<Self> {
        Arc::new(Self {
            status,
            stderr: stderr.to_string(),
            opened: Mutex::new(Vec::new()),
        })
    }

    /// Devices a session was opened on, in order
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

impl CommandAgentFactory for FakeAgents {
    fn open_session(
        &self,
        device: &LandscapeDevice,
        _extension: &DeviceExtension,
        _user: Option<&str>,
    ) -> LandscapeResult<Box<dyn SystemContext>> {
        self.opened.lock().push(device.identity().to_string());
        Ok(Box::new(FakeSession {
            status: self.status,
            stderr: self.stderr.clone(),
        }))
    }
}

struct FakeSession {
    status: i32,
    stderr: String,
}

impl CommandContext for FakeSession {
    fn run_cmd(&self, _command: &str, _aspects: &Aspects) -> LandscapeResult<CommandOutput> {
        Ok(CommandOutput {
            status: self.status,
            stdout: String::new(),
            stderr: self.stderr.clone(),
        })
    }
}

impl SystemContext for FakeSession {
    fn file_exists(&self, _path: &str) -> LandscapeResult<bool> {
        Ok(false)
    }

    fn directory_exists(&self, _path: &str) -> LandscapeResult<bool> {
        Ok(false)
    }
}

/// Source that blocks in `load_landscape` until released
pub struct BlockingSource {
    inner: StaticSource,
    entered: Mutex<Option<Sender<()>>>,
    release: Mutex<Receiver<()>>,
}

impl BlockingSource {
    pub fn new(landscape: Value, entered: Sender<()>, release: Receiver<()>) -> Self {
        Self {
            inner: StaticSource::new(landscape),
            entered: Mutex::new(Some(entered)),
            release: Mutex::new(release),
        }
    }
}

impl ConfigurationSource for BlockingSource {
    fn load_landscape(&self) -> LandscapeResult<Option<Value>> {
        if let Some(entered) = self.entered.lock().take() {
            let _ = entered.send(());
        }
        let _ = self.release.lock().recv();
        self.inner.load_landscape()
    }

    fn load_topology(&self) -> LandscapeResult<Option<Value>> {
        self.inner.load_topology()
    }
}

/// Settings that probe once with a short timeout and write nothing
pub fn quiet_settings() -> LandscapeSettings {
    LandscapeSettings {
        presence_aspects: Aspects::single(Duration::from_millis(50)),
        ..LandscapeSettings::default()
    }
}

/// Isolated landscape over `document` with `probe`
pub fn landscape_with(document: Value, probe: Arc<FakeProbe>) -> Landscape {
    LandscapeBuilder::new()
        .with_settings(quiet_settings())
        .with_source(StaticSource::new(document))
        .with_probe(probe)
        .build()
        .expect("landscape builds")
}

/// Single SSH host `node-a` on the default port
pub fn minimal_pod() -> Value {
    json!({
        "pod": {
            "devices": [
                {"deviceType": "ssh", "identifier": "node-a"}
            ]
        }
    })
}

/// Two SSH hosts, one serial concentrator, one power switch and credentials
pub fn lab_pod() -> Value {
    json!({
        "credentials": [
            {"identifier": "pdu-admin", "category": "basic", "username": "admin", "password": "1234"},
            {"identifier": "lab-ssh", "category": ["ssh"], "username": "lab", "password": "lab"}
        ],
        "pod": {
            "environment": {"label": "rack-7", "features": ["gpu"]},
            "devices": [
                {
                    "deviceType": "ssh", "identifier": "node-a", "host": "10.0.0.1",
                    "role": "server", "group": "rack-1", "features": ["gpu"],
                    "serial": {"name": "ts-1", "port": "1"},
                    "power": {"name": "pdu-1", "switch": 1}
                },
                {
                    "deviceType": "ssh", "identifier": "node-b", "host": "10.0.0.2",
                    "role": "client", "group": "rack-1",
                    "serial": {"name": "ts-1", "port": 2},
                    "power": {"name": "pdu-1", "switch": 2}
                }
            ],
            "serial": [
                {"name": "ts-1", "serialType": "network/tcpserial", "host": "10.0.0.9",
                 "ports": {"1": 7001, "2": 7002}}
            ],
            "power": [
                {"name": "pdu-1", "powerType": "DliPowerSwitch", "model": "DIN4",
                 "host": "10.0.0.7", "credential": "pdu-admin"}
            ]
        }
    })
}

/// Topology agreeing with [`lab_pod`]
pub fn lab_topology() -> Value {
    json!({"groups": {"rack-1": ["node-a", "node-b"]}})
}

/// Every location of [`lab_pod`]
pub const LAB_LOCATIONS: &[&str] = &["10.0.0.1:22", "10.0.0.2:22", "10.0.0.9:7001", "10.0.0.9:7002", "10.0.0.7:80"];
