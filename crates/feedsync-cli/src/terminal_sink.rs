//! View sink that prints to the terminal
//!
//! The terminal cannot move lines that were already printed, so the sink
//! keeps its own row list for scroll geometry and prints each operation as
//! one line. Every entry or separator counts as one row.

use feedsync_client::{ScrollMetrics, SinkError, SinkResult, ViewSink};
use feedsync_core::{Entry, EntryId, EntryPatch, FeedViewState, NotificationSection};
use parking_lot::Mutex;
use std::sync::Arc;

const ROW_PX: u32 = 20;

#[derive(Debug)]
struct Screen {
    rows: Vec<EntryId>,
    separators: u32,
    scroll_top: u32,
    visible_rows: u32,
}

impl Screen {
    fn metrics(&self) -> ScrollMetrics {
        let rows = self.rows.len() as u32 + self.separators;
        ScrollMetrics {
            scroll_top: self.scroll_top,
            scroll_height: rows * ROW_PX,
            client_height: self.visible_rows * ROW_PX,
        }
    }

    fn require(&self, id: &EntryId) -> SinkResult<usize> {
        self.rows
            .iter()
            .position(|row| row == id)
            .ok_or_else(|| SinkError::missing(id.to_string()))
    }
}

/// Terminal sink; clones share the same screen
#[derive(Debug, Clone)]
pub struct TerminalSink {
    screen: Arc<Mutex<Screen>>,
}

impl TerminalSink {
    pub fn new(visible_rows: u32) -> Self {
        Self {
            screen: Arc::new(Mutex::new(Screen {
                rows: Vec::new(),
                separators: 0,
                scroll_top: 0,
                visible_rows: visible_rows.max(1),
            })),
        }
    }

    /// Move the simulated viewport to the oldest entry
    pub fn scroll_to_top(&self) {
        self.screen.lock().scroll_top = 0;
    }
}

fn line_of(entry: &Entry) -> String {
    format!("{:>8}  {}", entry.id, plain_text(entry.payload.as_str()))
}

/// Drop markup tags and collapse whitespace
fn plain_text(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl ViewSink for TerminalSink {
    fn prepend_entries(&mut self, batch: &[Entry]) -> SinkResult<()> {
        {
            let mut screen = self.screen.lock();
            let below = std::mem::replace(
                &mut screen.rows,
                batch.iter().map(|e| e.id.clone()).collect(),
            );
            screen.rows.extend(below);
        }
        println!("--- {} older ---", batch.len());
        for entry in batch {
            println!(" {}", line_of(entry));
        }
        Ok(())
    }

    fn insert_entry(&mut self, entry: &Entry, before: &EntryId) -> SinkResult<()> {
        {
            let mut screen = self.screen.lock();
            let index = screen.require(before)?;
            screen.rows.insert(index, entry.id.clone());
        }
        println!(" {}  (before {before})", line_of(entry));
        Ok(())
    }

    fn append_entry(&mut self, entry: &Entry, stick_to_bottom: bool) -> SinkResult<()> {
        {
            let mut screen = self.screen.lock();
            screen.rows.push(entry.id.clone());
            if stick_to_bottom {
                screen.scroll_top = screen.metrics().bottom_offset();
            }
        }
        println!(" {}", line_of(entry));
        Ok(())
    }

    fn update_entry(&mut self, id: &EntryId, patch: &EntryPatch) -> SinkResult<()> {
        self.screen.lock().require(id)?;
        let mut changes = Vec::new();
        if let Some(status) = &patch.status {
            changes.push(format!("status={status}"));
        }
        if let Some(finished) = patch.finished {
            changes.push(format!("finished={finished}"));
        }
        if let Some(unread) = patch.unread_count {
            changes.push(format!("unread={unread}"));
        }
        if let Some(preview) = &patch.preview {
            let author = patch.preview_author.as_deref().unwrap_or("");
            changes.push(format!("last={author}: {preview}"));
        }
        if let Some(date) = &patch.date_label {
            changes.push(format!("at={date}"));
        }
        println!("~{id:>8}  {}", changes.join(" "));
        Ok(())
    }

    fn insert_separator(&mut self, before: &EntryId, label: &str) -> SinkResult<()> {
        let mut screen = self.screen.lock();
        screen.require(before)?;
        screen.separators += 1;
        println!("=== {label} ===");
        Ok(())
    }

    fn set_channel_indicator(&mut self, element_key: &str, active: bool) -> SinkResult<()> {
        let mark = if active { "*" } else { "-" };
        println!("[{mark}] {element_key}");
        Ok(())
    }

    fn set_feed_state(&mut self, state: FeedViewState) -> SinkResult<()> {
        if state == FeedViewState::Empty {
            println!("(no entries yet)");
        }
        Ok(())
    }

    fn set_section_state(
        &mut self,
        section: NotificationSection,
        state: FeedViewState,
    ) -> SinkResult<()> {
        if state == FeedViewState::Empty {
            println!("({} is empty)", section.element_key());
        }
        Ok(())
    }

    fn focus_entry(&mut self, id: &EntryId) -> SinkResult<()> {
        let mut screen = self.screen.lock();
        let index = screen.require(id)? as u32;
        let visible = screen.visible_rows;
        if index * ROW_PX < screen.scroll_top || index >= screen.scroll_top / ROW_PX + visible {
            screen.scroll_top = index.saturating_sub(visible / 2) * ROW_PX;
        }
        println!(">{id:>8}  <- focus");
        Ok(())
    }

    fn set_loading(&mut self, loading: bool) -> SinkResult<()> {
        if loading {
            println!("(loading...)");
        }
        Ok(())
    }

    fn set_load_more_visible(&mut self, visible: bool) -> SinkResult<()> {
        if visible {
            println!("(type `more` for older entries)");
        }
        Ok(())
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        self.screen.lock().metrics()
    }

    fn set_scroll_top(&mut self, scroll_top: u32) {
        let mut screen = self.screen.lock();
        screen.scroll_top = scroll_top.min(screen.metrics().bottom_offset());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_core::{EntryFields, Payload, SortKey};

    fn entry(id: &str) -> Entry {
        Entry {
            id: EntryId::new(id),
            sort_key: SortKey(1),
            payload: Payload::new(format!("<li><b>{id}</b> hello</li>")),
            separator_label: None,
            is_boundary_focus_target: false,
            section: None,
            fields: EntryFields::default(),
        }
    }

    #[test]
    fn test_plain_text_strips_markup() {
        assert_eq!(plain_text("<li><b>sam</b>  hi\nthere</li>"), "sam hi there");
    }

    #[test]
    fn test_rows_drive_geometry() {
        let mut sink = TerminalSink::new(2);
        sink.prepend_entries(&[entry("a"), entry("b")]).unwrap();
        sink.append_entry(&entry("c"), true).unwrap();
        sink.insert_separator(&EntryId::new("a"), "Today").unwrap();

        let metrics = sink.scroll_metrics();
        assert_eq!(metrics.scroll_height, 4 * ROW_PX);
        assert_eq!(metrics.scroll_top, ROW_PX);

        sink.scroll_to_top();
        assert_eq!(sink.scroll_metrics().scroll_top, 0);
    }

    #[test]
    fn test_focus_scrolls_entry_into_view() {
        let mut sink = TerminalSink::new(2);
        let batch: Vec<Entry> = ["a", "b", "c", "d", "e", "f"].into_iter().map(entry).collect();
        sink.prepend_entries(&batch).unwrap();
        sink.set_scroll_top(sink.scroll_metrics().bottom_offset());
        assert_eq!(sink.scroll_metrics().scroll_top, 4 * ROW_PX);

        sink.focus_entry(&EntryId::new("b")).unwrap();
        assert_eq!(sink.scroll_metrics().scroll_top, 0);
        assert!(sink.focus_entry(&EntryId::new("zz")).is_err());
    }

    #[test]
    fn test_unknown_target_is_an_error() {
        let mut sink = TerminalSink::new(10);
        assert!(sink.insert_entry(&entry("x"), &EntryId::new("y")).is_err());
        assert!(sink
            .update_entry(&EntryId::new("y"), &EntryPatch::default())
            .is_err());
    }
}
