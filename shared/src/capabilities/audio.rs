use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::playback::SessionId;

/// Commands for the shell's single media element.
///
/// `Play` resolves once the element has actually started (or failed to).
/// `Poll` resolves on the next animation frame with the current position.
/// `Stop` is fire-and-forget: the element is paused and released at once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum AudioOperation {
    Play { session: SessionId, source: String },
    Poll { session: SessionId },
    Stop { session: SessionId },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum AudioOutput {
    Started,
    Status {
        elapsed_secs: f64,
        /// `NaN` or `0` while the duration is unknown.
        duration_secs: f64,
        ended: bool,
    },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum AudioError {
    #[error("source could not be loaded: {message}")]
    Source { message: String },

    #[error("unsupported media: {message}")]
    Codec { message: String },

    #[error("playback was blocked by the browser")]
    NotAllowed,

    #[error("media error: {message}")]
    Media { message: String },
}

pub type AudioResult = Result<AudioOutput, AudioError>;

impl Operation for AudioOperation {
    type Output = AudioResult;
}

#[derive(Clone)]
pub struct Audio<E> {
    context: CapabilityContext<AudioOperation, E>,
}

impl<Ev> Capability<Ev> for Audio<Ev> {
    type Operation = AudioOperation;
    type MappedSelf<MappedEv> = Audio<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Audio::new(self.context.map_event(f))
    }
}

impl<E> Audio<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<AudioOperation, E>) -> Self {
        Self { context }
    }

    pub fn play<F>(&self, session: SessionId, source: String, callback: F)
    where
        F: FnOnce(AudioResult) -> E + Send + 'static,
    {
        self.request(AudioOperation::Play { session, source }, callback);
    }

    pub fn poll<F>(&self, session: SessionId, callback: F)
    where
        F: FnOnce(AudioResult) -> E + Send + 'static,
    {
        self.request(AudioOperation::Poll { session }, callback);
    }

    pub fn stop(&self, session: SessionId) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(AudioOperation::Stop { session }).await;
        });
    }

    fn request<F>(&self, operation: AudioOperation, callback: F)
    where
        F: FnOnce(AudioResult) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(callback(result));
        });
    }
}
