use crate::refresh_loop::VisibleItemsProvider;
use crate::task_registry::{TaskId, TaskRegistry};

/// A scroll window of `rows` entries starting at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub offset: usize,
    pub rows: usize,
}

impl Viewport {
    pub fn new(rows: usize) -> Self {
        Self {
            offset: 0,
            rows: rows.max(1),
        }
    }

    pub fn visible_range(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.offset.min(len);
        let end = start.saturating_add(self.rows).min(len);
        start..end
    }

    pub fn is_visible(&self, index: usize) -> bool {
        index >= self.offset && index < self.offset.saturating_add(self.rows)
    }

    /// Returns true when the window moved.
    pub fn scroll_down(&mut self, len: usize) -> bool {
        let max_offset = len.saturating_sub(self.rows);
        if self.offset >= max_offset {
            return false;
        }
        self.offset += 1;
        true
    }

    pub fn scroll_up(&mut self) -> bool {
        if self.offset == 0 {
            return false;
        }
        self.offset -= 1;
        true
    }

    pub fn over<'a>(&self, registry: &'a TaskRegistry) -> VisibleRows<'a> {
        VisibleRows {
            viewport: *self,
            registry,
        }
    }
}

/// The viewport bound to the registry it scrolls over.
pub struct VisibleRows<'a> {
    viewport: Viewport,
    registry: &'a TaskRegistry,
}

impl VisibleItemsProvider for VisibleRows<'_> {
    fn visible_item_ids(&self) -> Vec<TaskId> {
        self.viewport
            .visible_range(self.registry.len())
            .filter_map(|index| self.registry.at(index).map(|task| task.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Viewport;
    use crate::refresh_loop::VisibleItemsProvider;
    use crate::task_registry::{TaskId, TaskRegistry};
    use std::time::SystemTime;

    fn registry_with(count: usize) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for idx in 0..count {
            registry
                .add_task(&format!("task {idx}"), SystemTime::UNIX_EPOCH)
                .expect("add");
        }
        registry
    }

    #[test]
    fn window_reports_only_rows_on_screen() {
        let registry = registry_with(5);
        let mut viewport = Viewport::new(2);
        assert_eq!(viewport.over(&registry).visible_item_ids(), vec![TaskId(1), TaskId(2)]);

        assert!(viewport.scroll_down(registry.len()));
        assert_eq!(viewport.over(&registry).visible_item_ids(), vec![TaskId(2), TaskId(3)]);
    }

    #[test]
    fn scrolling_clamps_to_list_bounds() {
        let registry = registry_with(3);
        let mut viewport = Viewport::new(2);
        assert!(!viewport.scroll_up());
        assert!(viewport.scroll_down(registry.len()));
        assert!(!viewport.scroll_down(registry.len()));
        assert_eq!(viewport.offset, 1);

        let mut roomy = Viewport::new(10);
        assert!(!roomy.scroll_down(registry.len()));
    }

    #[test]
    fn empty_registry_has_no_visible_rows() {
        let registry = TaskRegistry::new();
        let viewport = Viewport::new(4);
        assert!(viewport.over(&registry).visible_item_ids().is_empty());
    }
}
