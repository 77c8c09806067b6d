//! Machine identity from the host

use testbridge_core::MachineIdentity;

/// Name used when the host name cannot be read
pub const FALLBACK_MACHINE_NAME: &str = "localhost";

/// The machine this process runs on, as reported by the OS
#[derive(Debug, Clone, Copy, Default)]
pub struct HostMachine;

impl MachineIdentity for HostMachine {
    fn machine_name(&self) -> String {
        host_name().unwrap_or_else(|| FALLBACK_MACHINE_NAME.to_string())
    }
}

fn host_name() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
