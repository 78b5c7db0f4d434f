// src/wire/codec.rs

//! Byte-level encoding and decoding of wire messages.
//!
//! All scalars are little-endian regardless of host order. Decoders
//! validate declared sizes before allocating and never read past the
//! declared payload, so a malformed message costs at most one bounded
//! buffer. Everything here works over plain `Read`/`Write`; sockets,
//! retries and session policy live in `net`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use super::{
    AovName, BucketPixels, MessageKind, SessionHeader, CAM_MATRIX_LEN, ECHO_ID, MAX_AOV_NAME_LEN,
    MAX_BUCKET_SAMPLES, SAMPLE_KINDS,
};
use crate::error::ProtocolError;

/// Reads the next 4-byte kind tag.
pub fn read_kind<R: Read>(r: &mut R) -> Result<MessageKind, ProtocolError> {
    let tag = r.read_i32::<LittleEndian>()?;
    MessageKind::from_tag(tag).ok_or(ProtocolError::UnknownKind(tag))
}

/// Writes a 4-byte kind tag.
pub fn write_kind<W: Write>(w: &mut W, kind: MessageKind) -> std::io::Result<()> {
    w.write_i32::<LittleEndian>(kind.tag())
}

/// Server side of the OPEN handshake: echo an image id back to the sender.
pub fn write_echo<W: Write>(w: &mut W) -> std::io::Result<()> {
    w.write_i32::<LittleEndian>(ECHO_ID)
}

/// Client side of the OPEN handshake: the id the server handed back.
pub fn read_echo<R: Read>(r: &mut R) -> std::io::Result<i32> {
    r.read_i32::<LittleEndian>()
}

/// Decodes the OPEN payload that follows the echo exchange.
pub fn read_header<R: Read>(r: &mut R) -> Result<SessionHeader, ProtocolError> {
    let session_id = r.read_i32::<LittleEndian>()?;
    let xres = r.read_i32::<LittleEndian>()?;
    let yres = r.read_i32::<LittleEndian>()?;
    let region_area = r.read_i64::<LittleEndian>()?;
    let version = r.read_i32::<LittleEndian>()?;
    let frame = r.read_f32::<LittleEndian>()?;
    let cam_fov = r.read_f32::<LittleEndian>()?;

    let mut cam_matrix = [0.0f32; CAM_MATRIX_LEN];
    r.read_f32_into::<LittleEndian>(&mut cam_matrix)?;

    let mut samples = [0i32; SAMPLE_KINDS];
    r.read_i32_into::<LittleEndian>(&mut samples)?;

    if xres <= 0 || yres <= 0 {
        return Err(ProtocolError::Malformed("non-positive resolution"));
    }

    Ok(SessionHeader {
        session_id,
        xres,
        yres,
        region_area,
        version,
        frame,
        cam_fov,
        cam_matrix,
        samples,
    })
}

/// Encodes the OPEN payload (sender side).
pub fn write_header<W: Write>(w: &mut W, header: &SessionHeader) -> std::io::Result<()> {
    w.write_i32::<LittleEndian>(header.session_id)?;
    w.write_i32::<LittleEndian>(header.xres)?;
    w.write_i32::<LittleEndian>(header.yres)?;
    w.write_i64::<LittleEndian>(header.region_area)?;
    w.write_i32::<LittleEndian>(header.version)?;
    w.write_f32::<LittleEndian>(header.frame)?;
    w.write_f32::<LittleEndian>(header.cam_fov)?;
    for value in &header.cam_matrix {
        w.write_f32::<LittleEndian>(*value)?;
    }
    for value in &header.samples {
        w.write_i32::<LittleEndian>(*value)?;
    }
    Ok(())
}

/// Decodes a PIXELS payload, echo id included.
///
/// Size limits are checked against the declared counts before the name or
/// pixel buffers are allocated, and the bucket rectangle must sit inside
/// the declared resolution.
pub fn read_pixels<R: Read>(r: &mut R) -> Result<BucketPixels, ProtocolError> {
    let _id = r.read_i32::<LittleEndian>()?;
    let xres = r.read_i32::<LittleEndian>()?;
    let yres = r.read_i32::<LittleEndian>()?;
    let bucket_xo = r.read_i32::<LittleEndian>()?;
    let bucket_yo = r.read_i32::<LittleEndian>()?;
    let bucket_w = r.read_i32::<LittleEndian>()?;
    let bucket_h = r.read_i32::<LittleEndian>()?;
    let spp = r.read_i32::<LittleEndian>()?;
    let ram_bytes = r.read_i64::<LittleEndian>()?;
    let elapsed_ms = r.read_i32::<LittleEndian>()?;
    let name_len = r.read_u64::<LittleEndian>()?;

    if xres <= 0 || yres <= 0 {
        return Err(ProtocolError::Malformed("non-positive resolution"));
    }
    if bucket_w <= 0 || bucket_h <= 0 {
        return Err(ProtocolError::Malformed("non-positive bucket size"));
    }
    if !matches!(spp, 1 | 3 | 4) {
        return Err(ProtocolError::Malformed("unsupported samples-per-pixel"));
    }
    if name_len == 0 {
        return Err(ProtocolError::Malformed("empty AOV name"));
    }
    if name_len > MAX_AOV_NAME_LEN {
        return Err(ProtocolError::NameTooLong(name_len));
    }

    let sample_count = bucket_w as u64 * bucket_h as u64 * spp as u64;
    if sample_count > MAX_BUCKET_SAMPLES {
        return Err(ProtocolError::OversizedBucket(sample_count));
    }

    let outside_x = bucket_xo < 0 || bucket_xo as i64 + bucket_w as i64 > xres as i64;
    let outside_y = bucket_yo < 0 || bucket_yo as i64 + bucket_h as i64 > yres as i64;
    if outside_x || outside_y {
        return Err(ProtocolError::BucketOutOfRange {
            x: bucket_xo,
            y: bucket_yo,
            w: bucket_w,
            h: bucket_h,
            xres,
            yres,
        });
    }

    let mut name = vec![0u8; name_len as usize];
    r.read_exact(&mut name)?;

    let mut pixels = vec![0.0f32; sample_count as usize];
    r.read_f32_into::<LittleEndian>(&mut pixels)?;

    Ok(BucketPixels {
        xres,
        yres,
        bucket_xo,
        bucket_yo,
        bucket_w,
        bucket_h,
        spp,
        ram_bytes,
        elapsed_ms,
        aov: AovName::new(name),
        pixels,
    })
}

/// Encodes a full PIXELS message, kind tag and echo id included.
pub fn write_pixels<W: Write>(w: &mut W, id: i32, bucket: &BucketPixels) -> std::io::Result<()> {
    write_kind(w, MessageKind::Pixels)?;
    w.write_i32::<LittleEndian>(id)?;
    w.write_i32::<LittleEndian>(bucket.xres)?;
    w.write_i32::<LittleEndian>(bucket.yres)?;
    w.write_i32::<LittleEndian>(bucket.bucket_xo)?;
    w.write_i32::<LittleEndian>(bucket.bucket_yo)?;
    w.write_i32::<LittleEndian>(bucket.bucket_w)?;
    w.write_i32::<LittleEndian>(bucket.bucket_h)?;
    w.write_i32::<LittleEndian>(bucket.spp)?;
    w.write_i64::<LittleEndian>(bucket.ram_bytes)?;
    w.write_i32::<LittleEndian>(bucket.elapsed_ms)?;

    // The sender always appends the terminating NUL the C strings carried.
    let name = bucket.aov.as_bytes();
    w.write_u64::<LittleEndian>(name.len() as u64 + 1)?;
    w.write_all(name)?;
    w.write_all(&[0])?;

    for value in &bucket.pixels {
        w.write_f32::<LittleEndian>(*value)?;
    }
    Ok(())
}

/// Decodes the CLOSE payload: the echoed image id.
pub fn read_close<R: Read>(r: &mut R) -> Result<i32, ProtocolError> {
    Ok(r.read_i32::<LittleEndian>()?)
}

/// Encodes a full CLOSE message.
pub fn write_close<W: Write>(w: &mut W, id: i32) -> std::io::Result<()> {
    write_kind(w, MessageKind::Close)?;
    w.write_i32::<LittleEndian>(id)
}

/// Encodes the QUIT sentinel. No payload follows the tag.
pub fn write_quit<W: Write>(w: &mut W) -> std::io::Result<()> {
    write_kind(w, MessageKind::Quit)
}
