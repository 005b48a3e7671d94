//! Effects the core asks the shell to perform.
//!
//! Render is Crux's built-in capability; fetch, audio and delay are thin
//! request/response wrappers over shell primitives.

mod audio;
mod delay;
mod fetch;

pub use self::audio::{Audio, AudioError, AudioOperation, AudioOutput, AudioResult};
pub use self::delay::{Delay, DelayOperation, DelayOutput};
pub use self::fetch::{Fetch, FetchOperation};
pub use crux_core::render::Render;

// The Effect derive refers to the app and its event by name.
#[allow(unused_imports)]
use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub fetch: Fetch<Event>,
    pub audio: Audio<Event>,
    pub delay: Delay<Event>,
}
