//! Host description for the run report.

use report_doc::Node;
use tracing::info;

/// Static facts about the machine the loads ran on.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemInfo {
    pub hostname: String,
    pub kernel: String,
    pub os: String,
    pub cpu_cores: usize,
    pub memory_mb: u64,
}

impl SystemInfo {
    /// Probe the running host. Missing facts are reported as `unknown`.
    pub fn collect() -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        let kernel = sysinfo::System::kernel_version().unwrap_or_else(|| "unknown".to_string());
        let os = sysinfo::System::long_os_version().unwrap_or_else(|| "unknown".to_string());
        let cpu_cores = num_cpus::get();

        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        let memory_mb = sys.total_memory() / 1024 / 1024;

        info!(
            "Host {} ({}), kernel {}, {} CPU(s), {} MB memory",
            hostname, os, kernel, cpu_cores, memory_mb
        );

        Self {
            hostname,
            kernel,
            os,
            cpu_cores,
            memory_mb,
        }
    }

    /// `<system>` report fragment.
    pub fn to_node(&self) -> Node {
        let mut node = Node::new("system");
        node.push_child(Node::leaf("hostname", &self.hostname));
        node.push_child(Node::leaf("kernel", &self.kernel));
        node.push_child(Node::leaf("os", &self.os));
        node.push_child(Node::leaf("cpu_cores", self.cpu_cores.to_string()));
        node.push_child(
            Node::leaf("memory", self.memory_mb.to_string()).with_attribute("unit", "MB"),
        );
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_reports_cores() {
        let info = SystemInfo::collect();
        assert!(info.cpu_cores >= 1);
        assert!(!info.hostname.is_empty());
    }

    #[test]
    fn test_node_layout() {
        let info = SystemInfo {
            hostname: "bench01".to_string(),
            kernel: "6.8.0-rt".to_string(),
            os: "Linux".to_string(),
            cpu_cores: 8,
            memory_mb: 16_000,
        };
        let node = info.to_node();
        assert_eq!(node.name(), "system");
        assert_eq!(node.find("hostname").unwrap().text(), Some("bench01"));
        assert_eq!(node.find("cpu_cores").unwrap().text(), Some("8"));
        let mem = node.find("memory").unwrap();
        assert_eq!(mem.text(), Some("16000"));
        assert_eq!(mem.attribute("unit"), Some("MB"));
    }
}
