//! Processors that ship inside the application itself.
//!
//! The I/O endpoints give every graph somewhere to source and sink audio and
//! MIDI without loading external binaries; the tone generator and gain stage
//! are small real processors used for wiring and testing sessions.

use serde::{Deserialize, Serialize};

use patchbay_catalog::PluginDescriptor;

use crate::format::{HostError, PluginFormat};
use crate::instance::{ParamValue, PluginInstance};

/// Format tag carried by every builtin descriptor.
pub const BUILTIN_FORMAT: &str = "Builtin";

const AUDIO_INPUT_ID: &str = "builtin:audio-input";
const AUDIO_OUTPUT_ID: &str = "builtin:audio-output";
const MIDI_INPUT_ID: &str = "builtin:midi-input";
const MIDI_OUTPUT_ID: &str = "builtin:midi-output";
const TONE_GENERATOR_ID: &str = "builtin:tone-generator";
const GAIN_ID: &str = "builtin:gain";

pub fn audio_input_descriptor() -> PluginDescriptor {
    endpoint_descriptor("Audio Input", AUDIO_INPUT_ID, 1, 0, 2)
}

pub fn audio_output_descriptor() -> PluginDescriptor {
    endpoint_descriptor("Audio Output", AUDIO_OUTPUT_ID, 2, 2, 0)
}

pub fn midi_input_descriptor() -> PluginDescriptor {
    endpoint_descriptor("Midi Input", MIDI_INPUT_ID, 3, 0, 0)
}

pub fn midi_output_descriptor() -> PluginDescriptor {
    endpoint_descriptor("Midi Output", MIDI_OUTPUT_ID, 4, 0, 0)
}

pub fn tone_generator_descriptor() -> PluginDescriptor {
    PluginDescriptor::new("Tone Generator", BUILTIN_FORMAT, TONE_GENERATOR_ID, 5)
        .with_category("Synth")
        .with_manufacturer("Patchbay")
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_channels(0, 2)
        .instrument(true)
}

pub fn gain_descriptor() -> PluginDescriptor {
    PluginDescriptor::new("Gain", BUILTIN_FORMAT, GAIN_ID, 6)
        .with_category("Effect")
        .with_manufacturer("Patchbay")
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_channels(2, 2)
}

/// Catalog entries for everything the builtin format can create.
pub fn builtin_descriptors() -> Vec<PluginDescriptor> {
    vec![
        audio_input_descriptor(),
        audio_output_descriptor(),
        midi_input_descriptor(),
        midi_output_descriptor(),
        tone_generator_descriptor(),
        gain_descriptor(),
    ]
}

fn endpoint_descriptor(
    name: &str,
    id: &str,
    uid: u32,
    inputs: u32,
    outputs: u32,
) -> PluginDescriptor {
    PluginDescriptor::new(name, BUILTIN_FORMAT, id, uid)
        .with_category("I/O")
        .with_manufacturer("Patchbay")
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_channels(inputs, outputs)
}

/// Hosting backend for the builtin processors.
///
/// Instances are created from the canonical descriptors above rather than
/// the one passed in, so stale catalog entries heal on load.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFormat;

impl PluginFormat for BuiltinFormat {
    fn name(&self) -> &str {
        BUILTIN_FORMAT
    }

    fn can_handle(&self, descriptor: &PluginDescriptor) -> bool {
        descriptor.format == BUILTIN_FORMAT
    }

    fn create_instance(
        &self,
        descriptor: &PluginDescriptor,
    ) -> Result<Box<dyn PluginInstance>, HostError> {
        let instance: Box<dyn PluginInstance> = match descriptor.file_or_identifier.as_str() {
            AUDIO_INPUT_ID => Box::new(IoEndpoint::new(audio_input_descriptor())),
            AUDIO_OUTPUT_ID => Box::new(IoEndpoint::new(audio_output_descriptor())),
            MIDI_INPUT_ID => Box::new(IoEndpoint::new(midi_input_descriptor())),
            MIDI_OUTPUT_ID => Box::new(IoEndpoint::new(midi_output_descriptor())),
            TONE_GENERATOR_ID => Box::new(ToneGenerator::new()),
            GAIN_ID => Box::new(GainStage::new()),
            other => return Err(HostError::UnknownPlugin(other.to_string())),
        };
        Ok(instance)
    }
}

/// Parameterless audio or MIDI terminal.
#[derive(Debug)]
struct IoEndpoint {
    descriptor: PluginDescriptor,
}

impl IoEndpoint {
    fn new(descriptor: PluginDescriptor) -> Self {
        Self { descriptor }
    }
}

impl PluginInstance for IoEndpoint {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &[ParamValue] {
        &[]
    }

    fn set_parameter(&mut self, _index: usize, _value: f32) {}

    fn save_state(&self) -> Vec<u8> {
        Vec::new()
    }

    fn restore_state(&mut self, _state: &[u8]) -> bool {
        true
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ToneState {
    frequency: f32,
    level: f32,
    program: usize,
}

#[derive(Debug)]
struct ToneGenerator {
    descriptor: PluginDescriptor,
    params: Vec<ParamValue>,
    programs: Vec<String>,
    program: usize,
}

impl ToneGenerator {
    const FREQUENCY: usize = 0;
    const LEVEL: usize = 1;

    fn new() -> Self {
        Self {
            descriptor: tone_generator_descriptor(),
            params: vec![
                ParamValue::new("Frequency", 20.0, 20_000.0, 440.0),
                ParamValue::new("Level", 0.0, 1.0, 0.25),
            ],
            programs: vec![
                "Sine".to_string(),
                "Triangle".to_string(),
                "Square".to_string(),
            ],
            program: 0,
        }
    }
}

impl PluginInstance for ToneGenerator {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &[ParamValue] {
        &self.params
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if let Some(param) = self.params.get_mut(index) {
            param.set(value);
        }
    }

    fn programs(&self) -> &[String] {
        &self.programs
    }

    fn current_program(&self) -> usize {
        self.program
    }

    fn set_current_program(&mut self, index: usize) {
        if index < self.programs.len() {
            self.program = index;
        }
    }

    fn save_state(&self) -> Vec<u8> {
        serde_json::to_vec(&ToneState {
            frequency: self.params[Self::FREQUENCY].value,
            level: self.params[Self::LEVEL].value,
            program: self.program,
        })
        .unwrap_or_default()
    }

    fn restore_state(&mut self, state: &[u8]) -> bool {
        match serde_json::from_slice::<ToneState>(state) {
            Ok(saved) => {
                self.params[Self::FREQUENCY].set(saved.frequency);
                self.params[Self::LEVEL].set(saved.level);
                self.set_current_program(saved.program);
                true
            }
            Err(_) => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GainState {
    gain: f32,
}

#[derive(Debug)]
struct GainStage {
    descriptor: PluginDescriptor,
    params: Vec<ParamValue>,
}

impl GainStage {
    fn new() -> Self {
        Self {
            descriptor: gain_descriptor(),
            params: vec![ParamValue::new("Gain", 0.0, 2.0, 1.0)],
        }
    }
}

impl PluginInstance for GainStage {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn parameters(&self) -> &[ParamValue] {
        &self.params
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if let Some(param) = self.params.get_mut(index) {
            param.set(value);
        }
    }

    fn save_state(&self) -> Vec<u8> {
        serde_json::to_vec(&GainState {
            gain: self.params[0].value,
        })
        .unwrap_or_default()
    }

    fn restore_state(&mut self, state: &[u8]) -> bool {
        match serde_json::from_slice::<GainState>(state) {
            Ok(saved) => {
                self.params[0].set(saved.gain);
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn create(id: &str) -> Box<dyn PluginInstance> {
        let descriptor = builtin_descriptors()
            .into_iter()
            .find(|descriptor| descriptor.file_or_identifier == id)
            .unwrap();
        BuiltinFormat.create_instance(&descriptor).unwrap()
    }

    #[test]
    fn descriptors_are_unique_and_builtin() {
        let descriptors = builtin_descriptors();
        for (i, a) in descriptors.iter().enumerate() {
            assert_eq!(a.format, BUILTIN_FORMAT);
            for b in &descriptors[i + 1..] {
                assert!(!a.is_duplicate_of(b));
            }
        }
    }

    #[test]
    fn endpoints_have_no_parameters_or_state() {
        let mut input = create(AUDIO_INPUT_ID);
        assert!(input.parameters().is_empty());
        assert!(input.save_state().is_empty());
        assert!(input.restore_state(b""));
        assert_eq!(input.descriptor().num_output_channels, 2);
    }

    #[test]
    fn tone_generator_state_round_trips() {
        let mut tone = create(TONE_GENERATOR_ID);
        tone.set_parameter(0, 880.0);
        tone.set_parameter(1, 0.5);
        tone.set_current_program(2);
        let state = tone.save_state();

        let mut restored = create(TONE_GENERATOR_ID);
        assert!(restored.restore_state(&state));
        assert_eq!(restored.parameters()[0].value, 880.0);
        assert_eq!(restored.parameters()[1].value, 0.5);
        assert_eq!(restored.current_program(), 2);
    }

    #[test]
    fn garbage_state_is_rejected_and_values_kept() {
        let mut gain = create(GAIN_ID);
        gain.set_parameter(0, 1.5);
        assert!(!gain.restore_state(b"not json"));
        assert_eq!(gain.parameters()[0].value, 1.5);
    }

    #[test]
    fn parameters_clamp_to_their_range() {
        let mut tone = create(TONE_GENERATOR_ID);
        tone.set_parameter(0, 1_000_000.0);
        assert_eq!(tone.parameters()[0].value, 20_000.0);
        tone.set_parameter(1, -3.0);
        assert_eq!(tone.parameters()[1].value, 0.0);
    }

    #[test]
    fn out_of_range_program_is_ignored() {
        let mut tone = create(TONE_GENERATOR_ID);
        tone.set_current_program(1);
        tone.set_current_program(99);
        assert_eq!(tone.current_program(), 1);
    }

    #[test]
    fn unknown_builtin_id_is_an_error() {
        let descriptor = PluginDescriptor::new("Mystery", BUILTIN_FORMAT, "builtin:mystery", 42);
        assert!(matches!(
            BuiltinFormat.create_instance(&descriptor),
            Err(HostError::UnknownPlugin(_))
        ));
    }
}
