/// The screen-writer boundary.
///
/// The core never writes to the terminal directly: widgets produce a body
/// (and the session a help footer) as strings with embedded ANSI styling, and
/// whatever implements this trait draws them. Implementations must preserve
/// the embedded escape sequences.
pub trait Renderer {
    fn draw(&mut self, body: &str, footer: Option<&str>);
}

/// One drawn frame, as captured by [`CaptureRenderer`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub body: String,
    pub footer: Option<String>,
}

/// Records every frame instead of drawing. The test-side renderer.
#[derive(Clone, Debug, Default)]
pub struct CaptureRenderer {
    frames: Vec<Frame>,
}

impl CaptureRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Renderer for CaptureRenderer {
    fn draw(&mut self, body: &str, footer: Option<&str>) {
        self.frames.push(Frame {
            body: body.to_string(),
            footer: footer.map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_renderer_records_frames_in_order() {
        let mut r = CaptureRenderer::new();
        r.draw("first", None);
        r.draw("second", Some("help"));
        assert_eq!(r.frame_count(), 2);
        assert_eq!(r.last().unwrap().body, "second");
        assert_eq!(r.last().unwrap().footer.as_deref(), Some("help"));
    }
}
