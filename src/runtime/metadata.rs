//! Pod/container identity.
//!
//! Explicit configuration wins; otherwise the Kubernetes downward-API
//! variables, then what the host itself reports (hostname, the IPv4
//! address of the outbound interface).

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use crate::config::AppConfig;

const UNKNOWN: &str = "unknown";

/// Identity of the running process, attached to every log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeMetadata {
    pub hostname: String,
    pub pod_name: String,
    pub pod_ip: String,
    pub node_name: String,
    pub namespace: String,
    pub app_version: String,
    pub environment: String,
}

impl RuntimeMetadata {
    /// Collect metadata from the configuration and the process environment.
    pub fn discover(config: &AppConfig) -> Self {
        Self::discover_with(
            config,
            |key| std::env::var(key).ok(),
            os_hostname,
            interface_ipv4,
        )
    }

    /// Same as [`RuntimeMetadata::discover`] with explicit sources.
    pub fn discover_with<E, H, I>(config: &AppConfig, env: E, hostname: H, interface_ip: I) -> Self
    where
        E: Fn(&str) -> Option<String>,
        H: FnOnce() -> Option<String>,
        I: FnOnce() -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.is_empty());
        let rt = &config.runtime;

        let hostname = rt
            .pod_hostname
            .clone()
            .or_else(hostname)
            .unwrap_or_else(|| UNKNOWN.to_string());

        // In Kubernetes the hostname is normally the pod name.
        let pod_name = rt
            .pod_name
            .clone()
            .or_else(|| lookup("POD_NAME"))
            .unwrap_or_else(|| hostname.clone());

        Self {
            pod_ip: rt
                .pod_ip
                .clone()
                .or_else(|| lookup("POD_IP"))
                .or_else(interface_ip)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            node_name: rt
                .node_name
                .clone()
                .or_else(|| lookup("NODE_NAME"))
                .unwrap_or_default(),
            namespace: rt
                .namespace
                .clone()
                .or_else(|| lookup("POD_NAMESPACE"))
                .unwrap_or_default(),
            app_version: config.app.version.clone(),
            environment: config.app.environment.clone(),
            hostname,
            pod_name,
        }
    }

    /// `namespace/pod` when a namespace is known, else the pod name.
    pub fn identifier(&self) -> String {
        if self.namespace.is_empty() {
            self.pod_name.clone()
        } else {
            format!("{}/{}", self.namespace, self.pod_name)
        }
    }

    /// Root span carrying this identity; everything logged inside it
    /// inherits the fields.
    pub fn span(&self, app_name: &str) -> tracing::Span {
        tracing::info_span!(
            "agent",
            app = %app_name,
            pod = %self.identifier(),
            hostname = %self.hostname,
            pod_ip = %self.pod_ip,
            node_name = %self.node_name,
            app_version = %self.app_version,
            environment = %self.environment,
        )
    }

    pub fn log(&self) {
        tracing::info!(
            hostname = %self.hostname,
            pod_name = %self.pod_name,
            pod_ip = %self.pod_ip,
            node_name = %self.node_name,
            namespace = %self.namespace,
            app_version = %self.app_version,
            environment = %self.environment,
            "Runtime metadata initialized"
        );
    }
}

fn os_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
}

/// Source address the OS would use for outbound traffic. Connecting a UDP
/// socket only selects a route; nothing is sent.
fn interface_ipv4() -> Option<String> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(10, 254, 254, 254), 1)).ok()?;
    routable_ipv4(socket.local_addr().ok()?.ip())
}

fn routable_ipv4(ip: IpAddr) -> Option<String> {
    match ip {
        IpAddr::V4(v4) if !v4.is_loopback() && !v4.is_unspecified() => Some(v4.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_doubles_as_pod_name() {
        let config = AppConfig::default();
        let meta = RuntimeMetadata::discover_with(&config, |_| None, || Some("worker-1".into()), || None);

        assert_eq!(meta.hostname, "worker-1");
        assert_eq!(meta.pod_name, "worker-1");
        assert_eq!(meta.pod_ip, "unknown");
        assert_eq!(meta.identifier(), "worker-1");
        assert_eq!(meta.environment, "dev");
    }

    #[test]
    fn test_downward_api_variables() {
        let config = AppConfig::default();
        let meta = RuntimeMetadata::discover_with(
            &config,
            |key| match key {
                "POD_NAME" => Some("cdc-agent-7f9c".into()),
                "POD_IP" => Some("10.1.2.3".into()),
                "POD_NAMESPACE" => Some("data".into()),
                _ => None,
            },
            || Some("ignored-host".into()),
            || Some("192.168.0.9".into()),
        );

        assert_eq!(meta.pod_name, "cdc-agent-7f9c");
        assert_eq!(meta.pod_ip, "10.1.2.3");
        assert_eq!(meta.identifier(), "data/cdc-agent-7f9c");
    }

    #[test]
    fn test_configuration_wins() {
        let mut config = AppConfig::default();
        config.runtime.pod_hostname = Some("configured".into());
        config.runtime.namespace = Some("ops".into());

        let meta = RuntimeMetadata::discover_with(
            &config,
            |key| (key == "POD_NAMESPACE").then(|| "data".to_string()),
            || None,
            || None,
        );

        assert_eq!(meta.hostname, "configured");
        assert_eq!(meta.namespace, "ops");
        assert_eq!(meta.identifier(), "ops/configured");
    }

    #[test]
    fn test_pod_ip_falls_back_to_interface_address() {
        let config = AppConfig::default();
        let meta = RuntimeMetadata::discover_with(
            &config,
            |_| None,
            || Some("worker-1".into()),
            || Some("10.4.0.17".into()),
        );

        assert_eq!(meta.pod_ip, "10.4.0.17");
    }

    #[test]
    fn test_only_routable_ipv4_counts() {
        assert_eq!(routable_ipv4("10.4.0.17".parse().unwrap()).as_deref(), Some("10.4.0.17"));
        assert_eq!(routable_ipv4("127.0.0.1".parse().unwrap()), None);
        assert_eq!(routable_ipv4("0.0.0.0".parse().unwrap()), None);
        assert_eq!(routable_ipv4("fe80::1".parse().unwrap()), None);
    }
}
