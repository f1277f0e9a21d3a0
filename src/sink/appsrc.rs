//! GStreamer pipeline fed through a named appsrc element

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use tracing::{debug, info};

use crate::error::SinkError;
use crate::frame::{PackedFrame, PixelFormat};
use crate::sink::FrameSink;

/// Build the full pipeline description: our appsrc followed by the user's elements
pub fn pipeline_description<S: AsRef<str>>(appsrc_name: &str, downstream: &[S]) -> String {
    let mut description = format!("appsrc do-timestamp=TRUE is-live=TRUE name={}", appsrc_name);
    for part in downstream {
        description.push(' ');
        description.push_str(part.as_ref());
    }
    description
}

/// Sink backed by a parsed GStreamer pipeline and its appsrc
pub struct AppSrcSink {
    pipeline: gst::Element,
    appsrc: gst_app::AppSrc,
}

impl AppSrcSink {
    /// Parse `description` and look up the appsrc named `appsrc_name` inside it
    pub fn launch(description: &str, appsrc_name: &str) -> Result<Self, SinkError> {
        gst::init()
            .map_err(|e| SinkError::InvalidPipeline(format!("failed to initialize GStreamer: {}", e)))?;

        info!("Pipeline: {}", description);

        let pipeline = gst::parse::launch(description)
            .map_err(|e| SinkError::InvalidPipeline(format!("{}: {}", description, e)))?;

        let appsrc = pipeline
            .clone()
            .downcast::<gst::Bin>()
            .map_err(|_| SinkError::InvalidPipeline(format!("{}: not a bin", description)))?
            .by_name(appsrc_name)
            .ok_or_else(|| {
                SinkError::InvalidPipeline(format!("no element with name `{}`", appsrc_name))
            })?
            .downcast::<gst_app::AppSrc>()
            .map_err(|_| {
                SinkError::InvalidPipeline(format!("element `{}` is not an appsrc", appsrc_name))
            })?;

        Ok(Self { pipeline, appsrc })
    }
}

impl FrameSink for AppSrcSink {
    fn negotiate(&self, format: PixelFormat, width: u32, height: u32) -> Result<(), SinkError> {
        let video_format = match format {
            PixelFormat::Rgba => gst_video::VideoFormat::Rgba,
        };
        let width = i32::try_from(width)
            .map_err(|_| SinkError::Negotiation(format!("width {} out of range", width)))?;
        let height = i32::try_from(height)
            .map_err(|_| SinkError::Negotiation(format!("height {} out of range", height)))?;

        // Frames arrive on producer cadence, so the framerate is variable
        let caps = gst_video::VideoCapsBuilder::new()
            .format(video_format)
            .width(width)
            .height(height)
            .framerate(gst::Fraction::new(0, 1))
            .build();

        debug!("Setting appsrc caps: {}", caps);
        self.appsrc.set_caps(Some(&caps));
        Ok(())
    }

    fn activate(&self) -> Result<(), SinkError> {
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| SinkError::Activation(format!("{:?}", e)))?;
        Ok(())
    }

    fn push(&self, frame: PackedFrame) -> Result<(), SinkError> {
        let buffer = gst::Buffer::from_slice(frame.into_bytes());
        self.appsrc
            .push_buffer(buffer)
            .map_err(|flow| SinkError::Rejected(format!("{:?}", flow)))?;
        Ok(())
    }

    fn end_of_stream(&self) -> Result<(), SinkError> {
        self.appsrc
            .end_of_stream()
            .map_err(|flow| SinkError::Rejected(format!("{:?}", flow)))?;
        Ok(())
    }

    fn deactivate(&self) -> Result<(), SinkError> {
        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| SinkError::Deactivation(format!("{:?}", e)))?;
        Ok(())
    }
}

impl Drop for AppSrcSink {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}
