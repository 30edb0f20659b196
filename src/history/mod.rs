//! Per-context undo/redo over configuration snapshots and file moves.
//!
//! Each editor tab owns an independent pair of LIFO stacks. Entries are
//! either whole-document snapshots, file deletions (restorable from
//! stored content) or image deletions (restorable from the trash
//! folder), and every entry carries an ordered list of file moves that
//! is replayed in lock-step with it.
//!
//! The manager owns only serialized copies of state; the live documents
//! belong to the coordinator, reached through [`HistoryHost`].

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;

/// UTF-8 BOM prepended when restoring deleted config files.
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// The fixed set of editor tabs, each with its own undo/redo stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditContext {
    General,
    Profile,
    Data,
    Map,
    Key,
}

impl EditContext {
    pub const ALL: [EditContext; 5] = [
        EditContext::General,
        EditContext::Profile,
        EditContext::Data,
        EditContext::Map,
        EditContext::Key,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EditContext::General => "general",
            EditContext::Profile => "profile",
            EditContext::Data => "data",
            EditContext::Map => "map",
            EditContext::Key => "key",
        }
    }
}

/// Serialized state captured for one context.
///
/// Config payloads are the document's INI text, immutable once
/// captured. The data variant additionally snapshots the rule-file
/// directory listing so file creation/deletion/rename can be reconciled
/// on restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextState {
    General {
        main_config: String,
    },
    Profile {
        profile_config: String,
        selected_section: Option<String>,
    },
    Data {
        pose_file: String,
        pose_config: Option<String>,
        selected_section: Option<String>,
        file_list: Vec<String>,
    },
    Map {
        pose_id_map: String,
        selected_key: Option<String>,
    },
    Key {
        key_map: String,
    },
}

/// One recorded file move, undone as dst→src and redone as src→dst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMove {
    pub src: Utf8PathBuf,
    pub dst: Utf8PathBuf,
}

/// What a history entry reverses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A config mutation; undo restores the captured state.
    Snapshot(ContextState),
    /// A deleted rule file; undo rewrites it from the stored content.
    FileDelete { path: Utf8PathBuf, content: String },
    /// An image moved to trash; undo moves it back.
    ImageDelete {
        path: Utf8PathBuf,
        trash_path: Utf8PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub kind: EntryKind,
    pub file_moves: Vec<FileMove>,
}

/// The coordinator-side collaborator the manager calls back into.
///
/// Capture and restore work on the live documents and on disk; the
/// manager never touches them directly. `refresh` tells the host to
/// rebuild listing/selection state after a file or image was restored
/// or re-deleted.
pub trait HistoryHost {
    fn capture_state(&self, context: EditContext) -> ContextState;
    fn restore_state(&mut self, context: EditContext, state: &ContextState) -> Result<()>;
    fn refresh(&mut self, context: EditContext);
}

#[derive(Debug, Default)]
struct ContextStacks {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
}

/// Bounded per-context undo/redo stacks.
#[derive(Debug)]
pub struct HistoryManager {
    stacks: IndexMap<EditContext, ContextStacks>,
    max_history: usize,
}

impl HistoryManager {
    pub fn new(max_history: usize) -> Self {
        let mut stacks = IndexMap::new();
        for context in EditContext::ALL {
            stacks.insert(context, ContextStacks::default());
        }
        Self { stacks, max_history }
    }

    /// Change the undo bound at runtime. The new bound is enforced at
    /// the next push, not retroactively.
    pub fn set_max_history(&mut self, max_history: usize) {
        self.max_history = max_history;
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    fn stack_mut(&mut self, context: EditContext) -> &mut ContextStacks {
        self.stacks.entry(context).or_default()
    }

    fn push_undo(&mut self, context: EditContext, entry: HistoryEntry) {
        let max = self.max_history;
        let stack = self.stack_mut(context);
        stack.undo.push(entry);
        while stack.undo.len() > max {
            stack.undo.remove(0);
        }
        stack.redo.clear();
    }

    /// Capture the current state of a context before a mutation.
    pub fn snapshot(&mut self, context: EditContext, host: &impl HistoryHost) {
        let state = host.capture_state(context);
        self.push_undo(
            context,
            HistoryEntry {
                kind: EntryKind::Snapshot(state),
                file_moves: Vec::new(),
            },
        );
        tracing::debug!(
            "Snapshot pushed for '{}' (depth {})",
            context.as_str(),
            self.undo_depth(context)
        );
    }

    /// Record a rule-file deletion with its full content for restore.
    pub fn push_file_delete(&mut self, context: EditContext, path: Utf8PathBuf, content: String) {
        self.push_undo(
            context,
            HistoryEntry {
                kind: EntryKind::FileDelete { path, content },
                file_moves: Vec::new(),
            },
        );
    }

    /// Record an image soft-delete (move into the trash folder).
    pub fn push_image_delete(
        &mut self,
        context: EditContext,
        path: Utf8PathBuf,
        trash_path: Utf8PathBuf,
    ) {
        self.push_undo(
            context,
            HistoryEntry {
                kind: EntryKind::ImageDelete { path, trash_path },
                file_moves: Vec::new(),
            },
        );
    }

    /// Attach a file move to the most recent undo entry of a context.
    ///
    /// Caller contract: invoke immediately after the `snapshot()` (or
    /// delete push) the move belongs to, before any other push for the
    /// same context. No-op when the stack is empty.
    pub fn register_file_move(&mut self, context: EditContext, src: Utf8PathBuf, dst: Utf8PathBuf) {
        let stack = self.stack_mut(context);
        if let Some(entry) = stack.undo.last_mut() {
            entry.file_moves.push(FileMove { src, dst });
        }
    }

    pub fn can_undo(&self, context: EditContext) -> bool {
        self.stacks.get(&context).is_some_and(|s| !s.undo.is_empty())
    }

    pub fn can_redo(&self, context: EditContext) -> bool {
        self.stacks.get(&context).is_some_and(|s| !s.redo.is_empty())
    }

    pub fn undo_depth(&self, context: EditContext) -> usize {
        self.stacks.get(&context).map_or(0, |s| s.undo.len())
    }

    pub fn redo_depth(&self, context: EditContext) -> usize {
        self.stacks.get(&context).map_or(0, |s| s.redo.len())
    }

    /// Undo the newest entry of a context. Returns false when there is
    /// nothing to undo. Side-effect replay is best-effort; the entry
    /// always moves to the redo stack.
    pub fn undo(&mut self, context: EditContext, host: &mut impl HistoryHost) -> bool {
        let Some(entry) = self.stack_mut(context).undo.pop() else {
            return false;
        };

        // Reverse the file moves first so restored configs see the
        // restored layout.
        for file_move in entry.file_moves.iter().rev() {
            replay_move(&file_move.dst, &file_move.src);
        }

        let redo_entry = match entry.kind {
            EntryKind::FileDelete { ref path, ref content } => {
                restore_deleted_file(path, content);
                host.refresh(context);
                entry.clone()
            }
            EntryKind::ImageDelete { ref path, ref trash_path } => {
                replay_move(trash_path, path);
                host.refresh(context);
                entry.clone()
            }
            EntryKind::Snapshot(ref state) => {
                // The current state becomes the redo target. It carries
                // the popped entry's file moves so a redo replays them
                // forward and reproduces the layout exactly.
                let current = host.capture_state(context);
                if let Err(e) = host.restore_state(context, state) {
                    tracing::warn!("Undo restore failed for '{}': {:#}", context.as_str(), e);
                }
                HistoryEntry {
                    kind: EntryKind::Snapshot(current),
                    file_moves: entry.file_moves.clone(),
                }
            }
        };

        self.stack_mut(context).redo.push(redo_entry);
        true
    }

    /// Redo the newest undone entry of a context. Symmetric to
    /// [`HistoryManager::undo`].
    pub fn redo(&mut self, context: EditContext, host: &mut impl HistoryHost) -> bool {
        let Some(entry) = self.stack_mut(context).redo.pop() else {
            return false;
        };

        for file_move in &entry.file_moves {
            replay_move(&file_move.src, &file_move.dst);
        }

        let undo_entry = match entry.kind {
            EntryKind::FileDelete { ref path, .. } => {
                delete_file(path);
                host.refresh(context);
                entry.clone()
            }
            EntryKind::ImageDelete { ref path, ref trash_path } => {
                replay_move(path, trash_path);
                host.refresh(context);
                entry.clone()
            }
            EntryKind::Snapshot(ref state) => {
                let current = host.capture_state(context);
                if let Err(e) = host.restore_state(context, state) {
                    tracing::warn!("Redo restore failed for '{}': {:#}", context.as_str(), e);
                }
                HistoryEntry {
                    kind: EntryKind::Snapshot(current),
                    file_moves: entry.file_moves.clone(),
                }
            }
        };

        // No eviction here: the redo stack is bounded by prior undo
        // depth, and this push mirrors an entry that already fit.
        self.stack_mut(context).undo.push(undo_entry);
        true
    }
}

/// Move a file, creating the destination's parent as needed. Missing
/// sources are skipped: a prior external deletion must not abort the
/// rest of the replay.
fn replay_move(from: &Utf8Path, to: &Utf8Path) {
    if !from.exists() {
        tracing::warn!("File move replay skipped, source missing: {}", from);
        return;
    }
    if let Some(parent) = to.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!("Failed to create directory {}: {}", parent, e);
                return;
            }
        }
    }
    if let Err(e) = fs::rename(from, to) {
        tracing::warn!("Failed to replay file move {} -> {}: {}", from, to, e);
    }
}

fn restore_deleted_file(path: &Utf8Path, content: &str) {
    let mut bytes = Vec::from(UTF8_BOM);
    bytes.extend_from_slice(content.as_bytes());
    if let Err(e) = fs::write(path, bytes) {
        tracing::warn!("Failed to restore deleted file {}: {}", path, e);
    }
}

fn delete_file(path: &Utf8Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!("Failed to re-delete file {}: {}", path, e);
    }
}
