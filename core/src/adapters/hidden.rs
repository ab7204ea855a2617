//! Fixed hidden network list.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::HiddenNetwork;
use crate::ports::HiddenNetworkProvider;

/// Hidden network provider returning a configured list.
#[derive(Debug, Default)]
pub struct StaticHiddenNetworks {
    networks: Vec<HiddenNetwork>,
    retrievals: AtomicUsize,
}

impl StaticHiddenNetworks {
    pub fn new<I, S>(ssids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            networks: ssids.into_iter().map(HiddenNetwork::new).collect(),
            retrievals: AtomicUsize::new(0),
        }
    }

    /// How many times the list was asked for.
    pub fn retrievals(&self) -> usize {
        self.retrievals.load(Ordering::SeqCst)
    }
}

impl HiddenNetworkProvider for StaticHiddenNetworks {
    fn retrieve_hidden_network_list(&self, _auto_join_only: bool) -> Vec<HiddenNetwork> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        self.networks.clone()
    }
}
