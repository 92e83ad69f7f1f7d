//! Output-side format negotiation and the render callback seam.

use parking_lot::Mutex;
use tessera_core::{
    AtomicFlag, AudioFormat, ObservableValue, PcmBuffer, PcmFormat, SampleRate, SubscriptionId,
};
use tessera_player::{RenderHost, RenderingHandler};
use tracing::debug;

/// The format the player renders in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RendererFormat {
    pub sample_rate: SampleRate,
    pub pcm_format: PcmFormat,
    pub channel_count: usize,
}

impl RendererFormat {
    pub fn is_empty(&self) -> bool {
        self.sample_rate == 0 || self.channel_count == 0
    }

    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate, self.pcm_format, self.channel_count)
    }
}

pub type RendererFormatHandler = Box<dyn Fn(&RendererFormat) + Send + Sync>;

/// The renderer as seen by the coordinator.
pub trait Renderer: Send + Sync {
    /// Overrides the output sample rate. Zero follows the output.
    fn set_rendering_sample_rate(&self, sample_rate: SampleRate);

    /// Overrides the output pcm format. `None` follows the output.
    fn set_rendering_pcm_format(&self, pcm_format: Option<PcmFormat>);

    fn set_is_rendering(&self, is_rendering: bool);

    fn is_rendering(&self) -> bool;

    fn format(&self) -> RendererFormat;

    fn observe_format(&self, handler: RendererFormatHandler, sync: bool) -> SubscriptionId;

    fn unobserve_format(&self, id: SubscriptionId) -> bool;
}

#[derive(Debug, Default)]
struct Overrides {
    sample_rate: SampleRate,
    pcm_format: Option<PcmFormat>,
    output: Option<AudioFormat>,
}

impl Overrides {
    fn effective_format(&self) -> RendererFormat {
        let Some(output) = self.output else {
            return RendererFormat::default();
        };
        RendererFormat {
            sample_rate: if self.sample_rate > 0 {
                self.sample_rate
            } else {
                output.sample_rate
            },
            pcm_format: self.pcm_format.unwrap_or(output.pcm_format),
            channel_count: output.channel_count,
        }
    }
}

/// A renderer driven by whoever owns the output buffer.
///
/// An audio callback (or a test) calls [`render`](Self::render) once per
/// cycle; the installed player handler fills the buffer.
pub struct InProcessRenderer {
    overrides: Mutex<Overrides>,
    format: ObservableValue<RendererFormat>,
    is_rendering: AtomicFlag,
    handler: Mutex<Option<RenderingHandler>>,
}

impl InProcessRenderer {
    pub fn new(output_format: Option<AudioFormat>) -> Self {
        let overrides = Overrides {
            output: output_format,
            ..Overrides::default()
        };
        let format = overrides.effective_format();
        Self {
            overrides: Mutex::new(overrides),
            format: ObservableValue::new(format),
            is_rendering: AtomicFlag::new(false),
            handler: Mutex::new(None),
        }
    }

    /// Reports a new output (device) format, or its loss with `None`.
    pub fn set_output_format(&self, output_format: Option<AudioFormat>) {
        self.update(|overrides| overrides.output = output_format);
    }

    pub fn output_format(&self) -> Option<AudioFormat> {
        self.overrides.lock().output
    }

    /// A buffer in the current rendering format, or `None` while the format is empty.
    pub fn output_buffer(&self, frame_capacity: usize) -> Option<PcmBuffer> {
        let format = self.format.get();
        (!format.is_empty()).then(|| PcmBuffer::new(format.audio_format(), frame_capacity))
    }

    /// Runs one render cycle into `out`.
    ///
    /// `out` is cleared first. Returns false when not rendering, when no
    /// handler is installed, or when the handler is being replaced.
    pub fn render(&self, out: &mut PcmBuffer) -> bool {
        if !self.is_rendering.get() {
            return false;
        }
        out.clear();

        let Some(mut guard) = self.handler.try_lock() else {
            return false;
        };
        match guard.as_mut() {
            Some(handler) => {
                handler(out);
                true
            }
            None => false,
        }
    }

    pub fn has_rendering_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    fn update(&self, apply: impl FnOnce(&mut Overrides)) {
        let format = {
            let mut overrides = self.overrides.lock();
            apply(&mut overrides);
            overrides.effective_format()
        };
        if self.format.set(format) {
            debug!(
                sample_rate = format.sample_rate,
                pcm_format = ?format.pcm_format,
                channels = format.channel_count,
                "renderer format changed"
            );
        }
    }
}

impl Default for InProcessRenderer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Renderer for InProcessRenderer {
    fn set_rendering_sample_rate(&self, sample_rate: SampleRate) {
        self.update(|overrides| overrides.sample_rate = sample_rate);
    }

    fn set_rendering_pcm_format(&self, pcm_format: Option<PcmFormat>) {
        self.update(|overrides| overrides.pcm_format = pcm_format);
    }

    fn set_is_rendering(&self, is_rendering: bool) {
        if self.is_rendering.swap(is_rendering) != is_rendering {
            debug!(is_rendering, "renderer rendering state changed");
        }
    }

    fn is_rendering(&self) -> bool {
        self.is_rendering.get()
    }

    fn format(&self) -> RendererFormat {
        self.format.get()
    }

    fn observe_format(&self, handler: RendererFormatHandler, sync: bool) -> SubscriptionId {
        self.format.subscribe(handler, sync)
    }

    fn unobserve_format(&self, id: SubscriptionId) -> bool {
        self.format.unsubscribe(id)
    }
}

impl RenderHost for InProcessRenderer {
    fn set_rendering_handler(&self, handler: Option<RenderingHandler>) {
        *self.handler.lock() = handler;
    }
}
