use tracing::info;

use crate::annotations::AnnotationIndex;
use crate::capture::{Frame, FrameSource};
use crate::error::Result;
use crate::render::FrameRenderer;

/// Decode up to playback frame `target` and draw its annotations.
///
/// With `exact` only records placed on `target` itself are drawn; otherwise
/// the held active group is. Returns `None` if the source ends first.
pub fn render_snapshot<S: FrameSource>(
    mut source: S,
    index: &AnnotationIndex,
    renderer: &mut FrameRenderer,
    target: u64,
    exact: bool,
) -> Result<Option<Frame>> {
    let mut position = 0u64;
    while let Some(frame) = source.next_frame()? {
        if position == target {
            let active = if exact {
                index.group_at(target)
            } else {
                index.active_group(target)
            };
            info!("Frame {}: {} active boxes", target, active.len());
            return renderer.render(frame, active).map(Some);
        }
        position += 1;
    }
    Ok(None)
}
