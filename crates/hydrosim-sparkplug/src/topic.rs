//! ---
//! hydro_section: "02-messaging-ipc-data-model"
//! hydro_subsection: "module"
//! hydro_type: "source"
//! hydro_scope: "code"
//! hydro_description: "Sparkplug B schema helpers and protocol codecs."
//! hydro_version: "v0.1.0"
//! hydro_owner: "tbd"
//! ---
/// Sparkplug B namespace prefix for all node topics.
pub const NAMESPACE: &str = "spBv1.0";

/// Retained presence value published after a successful connect.
pub const STATE_ONLINE: &str = "ONLINE";

/// Retained presence value registered as the broker-delivered last will.
pub const STATE_OFFLINE: &str = "OFFLINE";

/// Topic addresses for one edge node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTopics {
    group_id: String,
    edge_node_id: String,
}

impl NodeTopics {
    pub fn new(group_id: impl Into<String>, edge_node_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            edge_node_id: edge_node_id.into(),
        }
    }

    /// Birth frame channel, published once per session.
    pub fn nbirth(&self) -> String {
        format!("{NAMESPACE}/{}/NBIRTH/{}", self.group_id, self.edge_node_id)
    }

    /// Periodic data frame channel.
    pub fn ndata(&self) -> String {
        format!("{NAMESPACE}/{}/NDATA/{}", self.group_id, self.edge_node_id)
    }

    /// Presence channel carrying a retained last-known state value.
    pub fn state(&self) -> String {
        format!("{NAMESPACE}/{}/STATE/{}", self.group_id, self.edge_node_id)
    }
}
