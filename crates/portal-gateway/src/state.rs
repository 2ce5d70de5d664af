use std::sync::Arc;

use portal_redirector::Redirector;
use portal_shortener::Shortener;

use crate::reachability::UrlProbe;

#[derive(Clone)]
pub struct AppState {
    pub shortener: Arc<dyn Shortener>,
    pub redirector: Arc<dyn Redirector>,
    /// `None` when the reachability check is disabled.
    pub probe: Option<Arc<dyn UrlProbe>>,
}

impl AppState {
    pub fn new(
        shortener: Arc<dyn Shortener>,
        redirector: Arc<dyn Redirector>,
        probe: Option<Arc<dyn UrlProbe>>,
    ) -> Self {
        Self {
            shortener,
            redirector,
            probe,
        }
    }
}
