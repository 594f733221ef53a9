//! Frame acquisition abstraction.
//!
//! The camera pipeline (capture, pixel conversion, line extraction) lives
//! outside this crate. The control loop only needs the four calls below, made
//! strictly in order: request, poll until not pending, decode, query.

/// Frame acquisition and line centroid extraction.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rs_linefollow::traits::FrameGrabber;
///
/// struct Ov7670 { /* DMA buffer, flags */ }
///
/// impl FrameGrabber for Ov7670 {
///     fn request_capture(&mut self) { /* arm VSYNC interrupt */ }
///     fn is_capture_pending(&mut self) -> bool { /* DMA still running? */ false }
///     fn decode_frame(&mut self) { /* RGB565 -> brightness */ }
///     fn line_centroid(&mut self, row: u16) -> i32 { /* dark pixel mean */ 40 }
/// }
/// ```
pub trait FrameGrabber {
    /// Start a capture. Fire-and-forget.
    fn request_capture(&mut self);

    /// Returns true until the requested capture has completed.
    fn is_capture_pending(&mut self) -> bool;

    /// Post-capture processing of the frame just captured.
    fn decode_frame(&mut self);

    /// Horizontal centroid of the line on the given scan row, in pixels.
    fn line_centroid(&mut self, row: u16) -> i32;
}
