/// Namespaces reserved by Kubernetes itself.
pub const SYSTEM_NAMESPACES: [&str; 3] = ["kube-system", "kube-public", "kube-node-lease"];

/// Selects the namespaces whose objects the controller acts on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scope {
    /// If non-empty, only these namespaces are in scope.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_system: bool,
}

// === impl Scope ===

impl Scope {
    pub fn contains(&self, namespace: &str) -> bool {
        if !self.include_system && SYSTEM_NAMESPACES.contains(&namespace) {
            return false;
        }
        (self.include.is_empty() || self.include.iter().any(|ns| ns == namespace))
            && !self.exclude.iter().any(|ns| ns == namespace)
    }
}
