// Copyright (c) 2025 - Cowboy AI, Inc.
//! Capability interfaces for external collaborators
//!
//! The landscape never talks to a device directly. Commands go through a
//! [`CommandAgentFactory`], reachability goes through a
//! [`ConnectivityProbe`], and coordinators find device records through a
//! [`DeviceResolver`].

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use crate::aspects::Aspects;
use crate::domain::{DeviceExtension, DeviceRef, LandscapeDevice};
use crate::errors::LandscapeResult;

/// Result of a command run by an agent
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Something that can run a command
pub trait CommandContext: Send + Sync {
    fn run_cmd(&self, command: &str, aspects: &Aspects) -> LandscapeResult<CommandOutput>;
}

/// A command session on a device, with file system queries
pub trait SystemContext: CommandContext {
    fn file_exists(&self, path: &str) -> LandscapeResult<bool>;

    fn directory_exists(&self, path: &str) -> LandscapeResult<bool>;
}

/// Opens command sessions on devices
pub trait CommandAgentFactory: Send + Sync {
    fn open_session(
        &self,
        device: &LandscapeDevice,
        extension: &DeviceExtension,
        user: Option<&str>,
    ) -> LandscapeResult<Box<dyn SystemContext>>;
}

/// Single reachability attempt against a location
pub trait ConnectivityProbe: Send + Sync {
    fn probe(&self, location: &str, timeout: Duration) -> io::Result<()>;
}

/// TCP connect probe
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

impl ConnectivityProbe for TcpProbe {
    fn probe(&self, location: &str, timeout: Duration) -> io::Result<()> {
        let mut last_err = io::Error::new(
            io::ErrorKind::NotFound,
            format!("{location} resolved to no address"),
        );

        for addr in location.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(_) => return Ok(()),
                Err(err) => last_err = err,
            }
        }

        Err(last_err)
    }
}

/// Resolves device handles to device records
pub trait DeviceResolver: Send + Sync {
    fn resolve(&self, device: &DeviceRef) -> Option<Arc<LandscapeDevice>>;
}
