//! Moves MP3 tags out of the user text frames the tool writes them into.
//!
//! Keys such as `COMM` or `WOAS` passed as `-metadata` end up as `TXXX:COMM`
//! and `TXXX:WOAS`. The tag library rewrites them as the proper frames.

use std::path::Path;

use super::error::TagError;
use super::tag_editor::{TagEditor, TagValue};

/// `(user frame, proper frame)` pairs that are moved.
pub const MOVED_FRAMES: &[(&str, &str)] = &[
    ("TXXX:WOAS", "WOAS"),
    ("TXXX:USLT", "USLT"),
    ("TXXX:COMM", "COMM"),
    ("TXXX:TCMP", "TCMP"),
];

/// User frames that are dropped outright.
pub const DROPPED_FRAMES: &[&str] = &["TXXX:comment"];

/// Rewrites misplaced frames in `path`. Returns how many frames changed.
///
/// Only the first value of a user frame is carried over. Blocking.
pub fn repair_mp3_frames(editor: &dyn TagEditor, path: &Path) -> Result<usize, TagError> {
    let mut tags = editor.load(path)?;
    let mut changed = 0;

    for (from, to) in MOVED_FRAMES {
        let Some(value) = tags.get(from) else {
            continue;
        };
        if let TagValue::Text(values) = value {
            if let Some(first) = values.into_iter().next() {
                tags.set(to, TagValue::Text(vec![first]))?;
            }
        }
        tags.remove(from)?;
        changed += 1;
    }

    for field in DROPPED_FRAMES {
        if tags.get(field).is_some() {
            tags.remove(field)?;
            changed += 1;
        }
    }

    if changed > 0 {
        tags.save()?;
    }
    Ok(changed)
}
