//! The narrow interface between the runner and whatever draws the dialogue.

use std::collections::HashMap;

use crate::tree::AudioClip;

/// Opaque handle to an instantiated answer widget, chosen by the adapter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct OptionHandle(pub u64);

/// One answer as shown to the player: a positional label ("A.", "B.", ...)
/// and the answer text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub choice: String,
    pub answer: String,
}

/// A UI surface the dialogue is shown on.
pub trait PresentationAdapter {
    fn set_speaker_name(&mut self, text: &str);

    /// Replaces the displayed body text.
    fn set_body_text(&mut self, text: &str);

    /// Starts the voice-over, replacing anything already playing.
    fn play_clip(&mut self, clip: &AudioClip, volume: f32);

    fn stop_clip(&mut self);

    /// Fire-and-forget sound cue that doesn't interrupt the voice-over.
    fn play_one_shot(&mut self, _clip: &AudioClip, _volume: f32) {}

    fn set_open_state(&mut self, is_open: bool, use_animation: bool);

    fn set_continue_indicator_visible(&mut self, visible: bool);

    fn set_auto_advance_indicator_visible(&mut self, visible: bool);

    /// Shows the question and one widget per option, in order.
    fn instantiate_answer_options(&mut self, question: &str, options: &[AnswerOption]) -> Vec<OptionHandle>;

    /// Removes widgets created by `instantiate_answer_options`, along with
    /// the question.
    fn destroy_answer_options(&mut self, handles: &[OptionHandle]);
}

impl<P: PresentationAdapter + ?Sized> PresentationAdapter for Box<P> {
    fn set_speaker_name(&mut self, text: &str) {
        (**self).set_speaker_name(text)
    }

    fn set_body_text(&mut self, text: &str) {
        (**self).set_body_text(text)
    }

    fn play_clip(&mut self, clip: &AudioClip, volume: f32) {
        (**self).play_clip(clip, volume)
    }

    fn stop_clip(&mut self) {
        (**self).stop_clip()
    }

    fn play_one_shot(&mut self, clip: &AudioClip, volume: f32) {
        (**self).play_one_shot(clip, volume)
    }

    fn set_open_state(&mut self, is_open: bool, use_animation: bool) {
        (**self).set_open_state(is_open, use_animation)
    }

    fn set_continue_indicator_visible(&mut self, visible: bool) {
        (**self).set_continue_indicator_visible(visible)
    }

    fn set_auto_advance_indicator_visible(&mut self, visible: bool) {
        (**self).set_auto_advance_indicator_visible(visible)
    }

    fn instantiate_answer_options(&mut self, question: &str, options: &[AnswerOption]) -> Vec<OptionHandle> {
        (**self).instantiate_answer_options(question, options)
    }

    fn destroy_answer_options(&mut self, handles: &[OptionHandle]) {
        (**self).destroy_answer_options(handles)
    }
}

/// Several surfaces (a flat screen canvas, a headset canvas, a world-space
/// panel, ...) driven as one.
#[derive(Default)]
pub struct Surfaces {
    surfaces: Vec<Box<dyn PresentationAdapter>>,
    next_handle: u64,
    // Our handle -> the matching handle on each surface, by surface index.
    handles: HashMap<OptionHandle, Vec<Option<OptionHandle>>>,
}

impl Surfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_surface(mut self, surface: impl PresentationAdapter + 'static) -> Self {
        self.push(surface);
        self
    }

    pub fn push(&mut self, surface: impl PresentationAdapter + 'static) {
        self.surfaces.push(Box::new(surface));
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    fn each(&mut self, mut f: impl FnMut(&mut dyn PresentationAdapter)) {
        for surface in &mut self.surfaces {
            f(surface.as_mut());
        }
    }
}

impl PresentationAdapter for Surfaces {
    fn set_speaker_name(&mut self, text: &str) {
        self.each(|surface| surface.set_speaker_name(text));
    }

    fn set_body_text(&mut self, text: &str) {
        self.each(|surface| surface.set_body_text(text));
    }

    fn play_clip(&mut self, clip: &AudioClip, volume: f32) {
        self.each(|surface| surface.play_clip(clip, volume));
    }

    fn stop_clip(&mut self) {
        self.each(|surface| surface.stop_clip());
    }

    fn play_one_shot(&mut self, clip: &AudioClip, volume: f32) {
        self.each(|surface| surface.play_one_shot(clip, volume));
    }

    fn set_open_state(&mut self, is_open: bool, use_animation: bool) {
        self.each(|surface| surface.set_open_state(is_open, use_animation));
    }

    fn set_continue_indicator_visible(&mut self, visible: bool) {
        self.each(|surface| surface.set_continue_indicator_visible(visible));
    }

    fn set_auto_advance_indicator_visible(&mut self, visible: bool) {
        self.each(|surface| surface.set_auto_advance_indicator_visible(visible));
    }

    fn instantiate_answer_options(&mut self, question: &str, options: &[AnswerOption]) -> Vec<OptionHandle> {
        let per_surface: Vec<Vec<OptionHandle>> = self
            .surfaces
            .iter_mut()
            .map(|surface| surface.instantiate_answer_options(question, options))
            .collect();

        (0..options.len())
            .map(|i| {
                let handle = OptionHandle(self.next_handle);
                self.next_handle += 1;
                let inner = per_surface.iter().map(|handles| handles.get(i).copied()).collect();
                self.handles.insert(handle, inner);
                handle
            })
            .collect()
    }

    fn destroy_answer_options(&mut self, handles: &[OptionHandle]) {
        let mut per_surface = vec![Vec::new(); self.surfaces.len()];
        for handle in handles {
            if let Some(inner) = self.handles.remove(handle) {
                for (i, surface_handle) in inner.into_iter().enumerate() {
                    if let (Some(surface_handle), Some(list)) = (surface_handle, per_surface.get_mut(i)) {
                        list.push(surface_handle);
                    }
                }
            }
        }
        for (surface, handles) in self.surfaces.iter_mut().zip(per_surface) {
            surface.destroy_answer_options(&handles);
        }
    }
}
