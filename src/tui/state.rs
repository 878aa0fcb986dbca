use crate::model::MonitorConfig;
use crate::render::{DashboardView, RenderTarget, RunRow};
use std::time::Duration;

pub struct UiState {
    pub tab: usize,
    pub view: DashboardView,
    /// Index into `view.rows()`; meaningless while the listing shows a message.
    pub selected: usize,
    pub in_flight: bool,
    pub last_refresh: Option<String>,
    pub info: String,

    pub endpoint_url: String,
    pub poll_interval: Option<Duration>,
}

impl UiState {
    pub fn new(cfg: &MonitorConfig) -> Self {
        Self {
            tab: 0,
            view: DashboardView::loading(),
            selected: 0,
            in_flight: false,
            last_refresh: None,
            info: String::new(),
            endpoint_url: cfg.endpoint_url.clone(),
            poll_interval: cfg.poll_interval,
        }
    }

    pub fn selected_row(&self) -> Option<&RunRow> {
        self.view.rows().get(self.selected)
    }

    pub fn select_next(&mut self) {
        let len = self.view.rows().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

impl RenderTarget for UiState {
    fn present(&mut self, view: DashboardView) {
        // Keep the cursor on the same run when it is still listed.
        let keep = self.selected_row().map(|r| r.id.clone());
        self.view = view;
        self.selected = keep
            .and_then(|id| self.view.rows().iter().position(|r| r.id == id))
            .unwrap_or(0);
    }
}
