// src/store/writer.rs

//! The pixel writer: composes one received bucket into the addressed
//! plane and, for anchor buckets, runs the progress and update
//! bookkeeping the host repaints against.
//!
//! The wire's rows are top-left origin; planes are bottom-left. The copy
//! flips Y so row `y` of a bucket lands at `H - 1 - (y + yo)`.

use log::{debug, trace, warn};

use super::plane::Plane;
use super::{RenderPass, Rect, Store};
use crate::error::OutOfRange;
use crate::wire::BucketPixels;

impl Store {
    /// Applies one PIXELS message. The write lock is held for the whole
    /// copy plus its bookkeeping; the payload was decoded into owned
    /// buffers before this call, so no socket read happens under the lock.
    pub fn write_bucket(&self, bucket: &BucketPixels, pass: &mut RenderPass) {
        pass.active_ms = bucket.elapsed_ms;

        if bucket.pixels.len() != bucket.sample_count() {
            warn!(
                "bucket for {} carries {} samples, declared {}; dropped",
                bucket.aov,
                bucket.pixels.len(),
                bucket.sample_count()
            );
            return;
        }

        let mut state = self.write_state();
        let enable_aovs = state.enable_aovs;
        let capturing = state.capturing;

        // Track the AOV set of the current render iteration. With AOVs
        // disabled only the first-seen name survives and later names are
        // dropped before touching any frame.
        let newly_seen = !pass.active_aovs.contains(&bucket.aov);
        if newly_seen {
            if enable_aovs || pass.active_aovs.is_empty() {
                pass.active_aovs.push(bucket.aov.clone());
            } else if pass.active_aovs.len() > 1 {
                pass.active_aovs.truncate(1);
            }
        }
        if !enable_aovs && pass.active_aovs.first() != Some(&bucket.aov) {
            trace!("AOVs disabled, dropping bucket for {}", bucket.aov);
            return;
        }

        let Some(s_index) = pass.session else {
            warn!("pixels before any open header, bucket dropped");
            return;
        };
        let Some(session) = state.sessions.get_mut(s_index) else {
            debug!("session slot {} gone (store cleared?), bucket dropped", s_index);
            return;
        };
        let Some(frame) = session.frames.get_mut(pass.frame_index) else {
            debug!("frame slot {} gone, bucket dropped", pass.frame_index);
            return;
        };

        // A renderer may re-resolve between the header and the first
        // bucket; adopt the declared resolution via the resize transition.
        let declared = (bucket.xres as u32, bucket.yres as u32);
        if frame.dimensions() != declared {
            frame.set_resolution(declared.0, declared.1);
        }

        // A changed AOV set shows up on the first buckets of a new pass:
        // the n-th distinct name of the pass must match the n-th cached
        // plane. On a mismatch the frame drops to its anchor and readiness
        // resets while the new set is rebuilt. A name past the end of the
        // cached list is plain growth, not a mismatch.
        if newly_seen {
            let position = pass.active_aovs.len() - 1;
            if let Some(cached) = frame.plane_names().get(position) {
                if cached != &bucket.aov {
                    debug!(
                        "AOV set changed ({} arrived where {} was cached), dropping to the anchor",
                        bucket.aov, cached
                    );
                    frame.truncate_to_anchor();
                    frame.set_ready(false);
                }
            }
        }

        if !frame.has_plane(&bucket.aov) {
            if enable_aovs || frame.is_empty() {
                frame.add_plane(bucket.aov.clone(), bucket.spp);
            }
        }

        let (width, height) = frame.dimensions();
        let Some(plane) = frame.plane_mut(&bucket.aov) else {
            debug!("no plane for {}, bucket dropped", bucket.aov);
            return;
        };

        if let Err(e) = copy_bucket(plane, bucket, height) {
            // Fatal only to this bucket; the frame stays valid.
            warn!("bucket copy aborted: {}", e);
            return;
        }
        frame.set_ready(true);

        // Progress, memory, time and the redraw flag fire only on the
        // anchor AOV, and not at all while the host is capturing.
        if capturing || !frame.is_anchor(&bucket.aov) {
            return;
        }

        pass.remaining_area -= i64::from(bucket.bucket_w) * i64::from(bucket.bucket_h);
        let image_area = i64::from(width) * i64::from(height);
        if image_area > 0 {
            frame.set_progress(100 - pass.remaining_area * 100 / image_area);
        }
        frame.record_ram(bucket.ram_bytes);

        // Subtract the delta carried over from the previous interactive
        // iteration so a restarted clock never reads backwards.
        let elapsed = if pass.delta_ms > bucket.elapsed_ms {
            bucket.elapsed_ms
        } else {
            bucket.elapsed_ms - pass.delta_ms
        };
        frame.set_elapsed(elapsed);

        let bbox = Rect::new(
            bucket.bucket_xo,
            height as i32 - bucket.bucket_yo - bucket.bucket_h,
            bucket.bucket_xo + bucket.bucket_w,
            height as i32 - bucket.bucket_yo,
        );
        self.publish(&mut state, bbox);
    }
}

/// Copies a bucket into its plane, flipping Y and routing channels: with
/// spp 4 channels 0..2 land in the color storage and channel 3 in alpha;
/// with spp 1 the single channel lands in the scalar storage.
fn copy_bucket(
    plane: &mut Plane,
    bucket: &BucketPixels,
    frame_height: u32,
) -> Result<(), OutOfRange> {
    let w = bucket.bucket_w as usize;
    let h = bucket.bucket_h as usize;
    let spp = bucket.spp as usize;
    let xo = bucket.bucket_xo as u32;
    let yo = bucket.bucket_yo as u32;
    let (plane_w, plane_h) = plane.dimensions();

    for x in 0..w {
        for y in 0..h {
            let offset = (y * w + x) * spp;
            let dst_x = xo + x as u32;
            let src_y = yo + y as u32;
            if src_y >= frame_height {
                return Err(OutOfRange {
                    x: dst_x,
                    y: src_y,
                    channel: 0,
                    width: plane_w,
                    height: plane_h,
                });
            }
            let dst_y = frame_height - 1 - src_y;
            for c in 0..spp {
                plane.set(dst_x, dst_y, c, bucket.pixels[offset + c])?;
            }
        }
    }
    Ok(())
}
