//! Hidden network provider port (interface).

use crate::domain::HiddenNetwork;

/// Port listing hidden networks that should be probed for.
pub trait HiddenNetworkProvider: Send + Sync {
    /// `auto_join_only` restricts the list to networks eligible for auto-join.
    fn retrieve_hidden_network_list(&self, auto_join_only: bool) -> Vec<HiddenNetwork>;
}
