// src/store/tests.rs

//! Tests for the framebuffer store: the session state machine, the pixel
//! writer's flip and anchor bookkeeping, and the frame-lookup rules.

use super::*;
use crate::wire::{pack_version, AovName, BucketPixels, SessionHeader};
use test_log::test;

fn header(session_id: i32, xres: i32, yres: i32, frame: f32) -> SessionHeader {
    SessionHeader {
        session_id,
        xres,
        yres,
        region_area: i64::from(xres) * i64::from(yres),
        version: pack_version(7, 3, 4, 1),
        frame,
        cam_fov: 0.0,
        cam_matrix: [0.0; 16],
        samples: [3, 2, 2, 0, 0, 0],
    }
}

fn bucket(xres: i32, yres: i32, xo: i32, yo: i32, w: i32, h: i32, spp: i32, aov: &str) -> BucketPixels {
    BucketPixels {
        xres,
        yres,
        bucket_xo: xo,
        bucket_yo: yo,
        bucket_w: w,
        bucket_h: h,
        spp,
        ram_bytes: 0,
        elapsed_ms: 0,
        aov: AovName::from(aov),
        pixels: (0..(w * h * spp) as usize).map(|i| i as f32).collect(),
    }
}

fn filled(xres: i32, yres: i32, aov: &str, value: f32) -> BucketPixels {
    BucketPixels {
        pixels: vec![value; (xres * yres * 4) as usize],
        ..bucket(xres, yres, 0, 0, xres, yres, 4, aov)
    }
}

#[test]
fn open_creates_a_session_with_one_frame() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);

    let state = store.read_state();
    assert_eq!(state.sessions.len(), 1);
    assert_eq!(state.sessions[0].id(), 42);
    assert_eq!(state.sessions[0].frame_numbers(), vec![1.0]);
    assert_eq!(state.sessions[0].frames()[0].dimensions(), (4, 2));
    assert!(!state.sessions[0].frames()[0].is_ready());
}

#[test]
fn reopening_the_same_frame_reuses_it() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);

    let state = store.read_state();
    assert_eq!(state.sessions.len(), 1);
    assert_eq!(state.sessions[0].frames().len(), 1);
}

#[test]
fn an_unseen_session_id_creates_a_new_session() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.open_session(&header(43, 4, 2, 1.0), &mut pass);

    let state = store.read_state();
    assert_eq!(state.sessions.len(), 2);
    assert_eq!(state.sessions[1].id(), 43);
}

#[test]
fn a_full_anchor_write_reaches_progress_100() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.write_bucket(&filled(4, 2, "RGBA", 0.5), &mut pass);

    let state = store.read_state();
    let frame = &state.sessions[0].frames()[0];
    assert!(frame.is_ready());
    assert_eq!(frame.progress(), 100);
    assert_eq!(frame.channels(), vec![(AovName::from("RGBA"), 4)]);
    drop(state);

    assert_eq!(store.update_counter(), 1);
    assert_eq!(store.last_bbox(), Rect::new(0, 0, 4, 2));
}

#[test]
fn the_counter_advances_only_on_anchor_buckets() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);

    store.write_bucket(&bucket(4, 2, 0, 0, 2, 2, 4, "RGBA"), &mut pass);
    assert_eq!(store.update_counter(), 1);

    store.write_bucket(&bucket(4, 2, 0, 0, 2, 2, 1, "Z"), &mut pass);
    assert_eq!(store.update_counter(), 1);

    store.write_bucket(&bucket(4, 2, 2, 0, 2, 2, 4, "RGBA"), &mut pass);
    assert_eq!(store.update_counter(), 2);

    // The Z plane is readable even though it never drives progress.
    let state = store.read_state();
    let frame = &state.sessions[0].frames()[0];
    assert!(frame.has_plane(&AovName::from("Z")));
    assert_eq!(frame.progress(), 100);
}

#[test]
fn capturing_suppresses_update_publication() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.set_capturing(true);
    store.write_bucket(&filled(4, 2, "RGBA", 0.5), &mut pass);

    assert_eq!(store.update_counter(), 0);
    // Pixels still land while capturing; only the notification is held.
    let state = store.read_state();
    assert!(state.sessions[0].frames()[0].is_ready());
}

#[test]
fn the_writer_flips_y_and_splits_alpha() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);

    // A 2x2 RGBA bucket at (1, 0). Wire rows are top-left origin, so
    // source row y lands on plane row H - 1 - y.
    store.write_bucket(&bucket(4, 2, 1, 0, 2, 2, 4, "RGBA"), &mut pass);

    let state = store.read_state();
    let frame = &state.sessions[0].frames()[0];
    let plane = frame.plane(&AovName::from("RGBA")).unwrap();

    // src (x, y) channel c carries (y*2 + x)*4 + c.
    assert_eq!(plane.get(1, 1, 0), 0.0); // src (0,0) r
    assert_eq!(plane.get(2, 1, 1), 5.0); // src (1,0) g
    assert_eq!(plane.get(1, 0, 2), 10.0); // src (0,1) b
    assert_eq!(plane.get(2, 0, 3), 15.0); // src (1,1) alpha
    // Pixels the bucket never touched stay zero.
    assert_eq!(plane.get(0, 0, 0), 0.0);
    assert_eq!(plane.get(3, 1, 2), 0.0);
}

#[test]
fn scalar_planes_take_single_channel_buckets() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.write_bucket(&bucket(4, 2, 0, 0, 4, 2, 1, "Z"), &mut pass);

    let state = store.read_state();
    let plane = state.sessions[0].frames()[0]
        .plane(&AovName::from("Z"))
        .unwrap();
    assert_eq!(plane.spp(), 1);
    // src (2, 0) carries 2.0 and lands on plane row 1 after the flip; a
    // scalar plane answers every channel with its value.
    assert_eq!(plane.get(2, 1, 0), 2.0);
    assert_eq!(plane.get(2, 1, 2), 2.0);
}

#[test]
fn resize_zero_fills_and_clears_readiness() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.write_bucket(&filled(4, 2, "RGBA", 0.5), &mut pass);

    store.open_session(&header(42, 8, 2, 1.0), &mut pass);

    let state = store.read_state();
    let frame = &state.sessions[0].frames()[0];
    assert_eq!(frame.dimensions(), (8, 2));
    assert!(!frame.is_ready());
    // Identity survives, content does not.
    let plane = frame.plane(&AovName::from("RGBA")).unwrap();
    assert_eq!(plane.dimensions(), (8, 2));
    for y in 0..2 {
        for x in 0..8 {
            assert_eq!(plane.get(x, y, 0), 0.0);
        }
    }
    drop(state);

    // The next bucket flips readiness back on.
    store.write_bucket(&filled(8, 2, "RGBA", 0.25), &mut pass);
    let state = store.read_state();
    assert!(state.sessions[0].frames()[0].is_ready());
}

#[test]
fn multiframe_appends_in_insertion_order_and_clones_planes() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 3.0), &mut pass);
    store.write_bucket(&filled(4, 2, "RGBA", 0.5), &mut pass);
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.open_session(&header(42, 4, 2, 2.0), &mut pass);

    let state = store.read_state();
    let session = &state.sessions[0];
    // Insertion order, not sorted.
    assert_eq!(session.frame_numbers(), vec![3.0, 1.0, 2.0]);
    // The appended frames carried the previous frame's planes.
    for frame in session.frames() {
        assert!(frame.has_plane(&AovName::from("RGBA")));
    }
}

#[test]
fn single_frame_mode_keeps_one_slot() {
    let store = Store::new();
    store.set_multiframe(false);
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.write_bucket(&filled(4, 2, "RGBA", 0.5), &mut pass);
    store.open_session(&header(42, 4, 2, 2.0), &mut pass);

    let state = store.read_state();
    let session = &state.sessions[0];
    assert_eq!(session.frames().len(), 1);
    assert_eq!(session.frame_numbers(), vec![2.0]);
    // The slot was carried forward from the displayed frame.
    assert!(session.frames()[0].has_plane(&AovName::from("RGBA")));
}

#[test]
fn an_aov_set_change_drops_the_frame_to_its_anchor() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.write_bucket(&bucket(4, 2, 0, 0, 4, 2, 4, "RGBA"), &mut pass);
    store.write_bucket(&bucket(4, 2, 0, 0, 4, 2, 1, "Z"), &mut pass);

    // Second iteration renders {RGBA, N}. The first N bucket arrives
    // where Z was cached: the stale planes drop to the anchor right
    // there, mid-pass, and the new set is rebuilt from the bucket.
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.write_bucket(&bucket(4, 2, 0, 0, 4, 2, 4, "RGBA"), &mut pass);
    store.write_bucket(&bucket(4, 2, 0, 0, 4, 2, 3, "N"), &mut pass);

    let state = store.read_state();
    let frame = &state.sessions[0].frames()[0];
    assert_eq!(
        frame.channels(),
        vec![(AovName::from("RGBA"), 4), (AovName::from("N"), 3)]
    );
    assert!(!frame.has_plane(&AovName::from("Z")));
    // The N write landed after the reset, so the frame reads again.
    assert!(frame.is_ready());
}

#[test]
fn a_matching_aov_set_survives_a_new_pass() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.write_bucket(&bucket(4, 2, 0, 0, 4, 2, 4, "RGBA"), &mut pass);
    store.write_bucket(&bucket(4, 2, 0, 0, 4, 2, 1, "Z"), &mut pass);

    // Same names in the same order: nothing resets.
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.write_bucket(&bucket(4, 2, 0, 0, 2, 2, 4, "RGBA"), &mut pass);
    store.write_bucket(&bucket(4, 2, 0, 0, 2, 2, 1, "Z"), &mut pass);

    let state = store.read_state();
    let frame = &state.sessions[0].frames()[0];
    assert_eq!(
        frame.channels(),
        vec![(AovName::from("RGBA"), 4), (AovName::from("Z"), 1)]
    );
    assert!(frame.is_ready());
}

#[test]
fn disabled_aovs_keep_only_the_first_seen() {
    let store = Store::new();
    store.set_enable_aovs(false);
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.write_bucket(&bucket(4, 2, 0, 0, 4, 2, 4, "RGBA"), &mut pass);
    store.write_bucket(&bucket(4, 2, 0, 0, 4, 2, 1, "Z"), &mut pass);

    let state = store.read_state();
    let frame = &state.sessions[0].frames()[0];
    assert!(frame.has_plane(&AovName::from("RGBA")));
    assert!(!frame.has_plane(&AovName::from("Z")));
    drop(state);
    assert_eq!(store.update_counter(), 1);
}

#[test]
fn peak_ram_is_monotonic() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);

    let mut first = bucket(4, 2, 0, 0, 2, 2, 4, "RGBA");
    first.ram_bytes = 512 * 1024 * 1024;
    store.write_bucket(&first, &mut pass);

    let mut second = bucket(4, 2, 2, 0, 2, 2, 4, "RGBA");
    second.ram_bytes = 256 * 1024 * 1024;
    store.write_bucket(&second, &mut pass);

    let state = store.read_state();
    let status = state.sessions[0].frames()[0].status();
    assert_eq!(status.ram_mb, 256);
    assert_eq!(status.peak_ram_mb, 512);
}

#[test]
fn elapsed_time_is_delta_corrected_across_restarts() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);

    let mut first = filled(4, 2, "RGBA", 0.5);
    first.elapsed_ms = 5_000;
    store.write_bucket(&first, &mut pass);

    // Interactive restart: the renderer's clock keeps running, the
    // per-iteration delta keeps the reported time from accumulating.
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    let mut second = filled(4, 2, "RGBA", 0.5);
    second.elapsed_ms = 6_000;
    store.write_bucket(&second, &mut pass);

    let state = store.read_state();
    assert_eq!(state.sessions[0].frames()[0].status().elapsed_ms, 1_000);
    drop(state);

    // A fully restarted clock reads below the delta and is taken as is.
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    let mut third = filled(4, 2, "RGBA", 0.5);
    third.elapsed_ms = 500;
    store.write_bucket(&third, &mut pass);

    let state = store.read_state();
    assert_eq!(state.sessions[0].frames()[0].status().elapsed_ms, 500);
}

#[test]
fn progress_is_clamped_to_100() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    let mut h = header(42, 4, 2, 1.0);
    h.region_area = 4; // Smaller than the buckets that will arrive.
    store.open_session(&h, &mut pass);

    store.write_bucket(&filled(4, 2, "RGBA", 0.5), &mut pass);

    let state = store.read_state();
    let progress = state.sessions[0].frames()[0].progress();
    assert!((0..=100).contains(&progress));
}

#[test]
fn camera_changes_are_pushed_when_live_camera_is_on() {
    let store = Store::new();
    store.set_live_camera(true);
    let (tx, rx) = std::sync::mpsc::channel();
    store.set_camera_sink(tx);

    let mut pass = RenderPass::default();
    let mut h = header(42, 4, 2, 1.0);
    h.cam_fov = 54.4;
    h.cam_matrix[0] = 1.0;
    store.open_session(&h, &mut pass);

    let update = rx.try_recv().expect("camera update");
    assert_eq!(update.frame, 1.0);
    assert_eq!(update.camera.fov, 54.4);

    // An identical header does not push again.
    store.open_session(&h, &mut pass);
    assert!(rx.try_recv().is_err());
}

#[test]
fn version_and_samples_reach_the_status_line() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);

    let state = store.read_state();
    let status = state.sessions[0].frames()[0].status();
    assert_eq!(status.version, "7.3.4.1");
    assert_eq!(status.samples, "3/2/2/0/0/0");
}

#[test]
fn clear_all_empties_and_pushes_one_final_update() {
    let store = Store::new();
    let mut pass = RenderPass::default();
    store.open_session(&header(42, 4, 2, 1.0), &mut pass);
    store.write_bucket(&filled(4, 2, "RGBA", 0.5), &mut pass);

    store.clear_all();
    assert_eq!(store.read_state().sessions.len(), 0);
    assert_eq!(store.update_counter(), 1);
    assert_eq!(store.last_bbox(), Rect::default());

    // A bucket aimed at the cleared slot is dropped quietly.
    store.write_bucket(&filled(4, 2, "RGBA", 0.5), &mut pass);
    assert_eq!(store.update_counter(), 1);
}

#[test]
fn nearest_frame_index_follows_the_lookup_rules() {
    let frames = [3.0, 1.0, 2.0];
    // Exact match wins.
    assert_eq!(nearest_frame_index(&frames, 2.0), 2);
    // Largest frame at or below the time.
    assert_eq!(nearest_frame_index(&frames, 2.5), 2);
    assert_eq!(nearest_frame_index(&frames, 10.0), 0);
    // All frames above: the smallest one.
    assert_eq!(nearest_frame_index(&frames, 0.5), 1);
    // Empty list maps to 0.
    assert_eq!(nearest_frame_index(&[], 5.0), 0);
}
