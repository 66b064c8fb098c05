//! Which backends this build can run, best first.

use std::fmt;

use super::Backend;

/// One row of the backend listing.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    pub backend: Backend,
    /// Short label shown in the listing.
    pub label: &'static str,
    /// Library present and a device reachable.
    pub available: bool,
    /// Auto-selection rank; an unavailable backend ranks 0.
    pub rank: u32,
    pub summary: &'static str,
}

impl BackendInfo {
    fn host() -> Self {
        Self {
            backend: Backend::Cpu,
            label: "CPU",
            available: true,
            rank: 10,
            summary: "Host memory with imageproc Canny",
        }
    }

    #[cfg(feature = "npp")]
    fn npp() -> Self {
        let available = super::NppAccelerator::is_available();
        Self {
            backend: Backend::Npp,
            label: "NPP",
            available,
            rank: if available { 150 } else { 0 },
            summary: "NVIDIA GPU via NPP and the CUDA runtime",
        }
    }
}

impl fmt::Display for BackendInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.available { '+' } else { '-' };
        write!(f, "[{}] {}: {}", mark, self.label, self.summary)
    }
}

/// Every backend compiled into this build, highest rank first.
pub fn detect_backends() -> Vec<BackendInfo> {
    let mut found = vec![BackendInfo::host()];
    #[cfg(feature = "npp")]
    found.push(BackendInfo::npp());
    found.sort_by_key(|b| std::cmp::Reverse(b.rank));
    found
}

/// Highest-ranked available backend; the host backend always qualifies.
pub fn select_best_backend() -> Backend {
    detect_backends()
        .into_iter()
        .find(|b| b.available)
        .map_or(Backend::Cpu, |b| b.backend)
}

/// One line per backend, as printed by `--probe`.
pub fn describe_backends() -> String {
    detect_backends().iter().map(|b| format!("{}\n", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_listed_and_available() {
        let cpu = detect_backends().into_iter().find(|b| b.backend == Backend::Cpu).unwrap();
        assert!(cpu.available);
        assert_eq!(cpu.to_string(), "[+] CPU: Host memory with imageproc Canny");
        assert!(describe_backends().contains("[+] CPU"));
    }

    #[test]
    fn test_ranked_best_first() {
        let backends = detect_backends();
        assert!(backends.windows(2).all(|w| w[0].rank >= w[1].rank));
        assert!(select_best_backend().is_available());
    }

    #[test]
    fn test_unavailable_marked() {
        let info = BackendInfo { available: false, rank: 0, ..BackendInfo::host() };
        assert!(info.to_string().starts_with("[-] CPU"));
    }
}
