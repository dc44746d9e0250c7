use crate::config::HelperConfig;
use crate::helper::{RegionHelper, RegionHelperDelegate};
use crate::location::ManualLocationProvider;
use crate::region::{RegionFetchService, RegionStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Remembers whether the helper asked for a manual region choice.
#[derive(Default)]
pub struct SelectionFlag {
    needed: AtomicBool,
}

impl SelectionFlag {
    pub fn is_needed(&self) -> bool {
        self.needed.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.needed.store(false, Ordering::SeqCst);
    }
}

impl RegionHelperDelegate for SelectionFlag {
    fn show_region_list(&self, _helper: &RegionHelper) {
        self.needed.store(true, Ordering::SeqCst);
    }
}

pub struct AppState {
    pub helper: Arc<RegionHelper>,
    pub provider: Arc<ManualLocationProvider>,
    pub selection: Arc<SelectionFlag>,
}

impl AppState {
    /// Build a started helper fed by client-posted locations.
    pub fn new(
        fetch_service: Arc<dyn RegionFetchService>,
        store: Arc<dyn RegionStore>,
        config: HelperConfig,
    ) -> Arc<Self> {
        let provider = Arc::new(ManualLocationProvider::new());
        let selection = Arc::new(SelectionFlag::default());
        let helper = RegionHelper::with_config(provider.clone(), fetch_service, store, config);
        helper.set_delegate(&selection);
        helper.start();

        Arc::new(Self {
            helper,
            provider,
            selection,
        })
    }
}
