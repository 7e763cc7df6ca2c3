//! Pipeline wiring validation
//!
//! Stage wiring is checked as pure data before any GL object exists, so a
//! bad pipeline configuration fails with a named slot instead of a blank
//! screen.

use crate::assets::ShaderStage;
use crate::render::RenderError;

/// Validate the wiring of an ordered stage chain.
///
/// Every input slot of a stage must match, by name and kind, exactly one
/// output slot of the stage before it. The first stage must not declare
/// inputs, since there is nothing upstream to produce them.
pub fn validate_wiring(stages: &[(String, ShaderStage)]) -> Result<(), RenderError> {
    if stages.is_empty() {
        return Err(RenderError::EmptyPipeline);
    }

    for (name, stage) in stages {
        for i in 0..stage.outs.len() {
            let output = &stage.outs[i].name;
            if stage.outs[i + 1..].iter().any(|slot| slot.name == *output) {
                return Err(RenderError::DuplicateOutput {
                    stage: name.clone(),
                    output: output.clone(),
                });
            }
        }
    }

    let (first_name, first) = &stages[0];
    if let Some(slot) = first.ins.first() {
        return Err(RenderError::UnmatchedInput {
            stage: first_name.clone(),
            input: slot.name.clone(),
        });
    }

    for pair in stages.windows(2) {
        let (_, producer) = &pair[0];
        let (consumer_name, consumer) = &pair[1];
        for input in &consumer.ins {
            let Some(output) = producer.outs.iter().find(|out| out.name == input.name) else {
                return Err(RenderError::UnmatchedInput {
                    stage: consumer_name.clone(),
                    input: input.name.clone(),
                });
            };
            if output.kind != input.kind {
                return Err(RenderError::SlotKindMismatch {
                    stage: consumer_name.clone(),
                    input: input.name.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{SlotKind, StageSlot};

    fn stage(ins: &[(&str, SlotKind)], outs: &[(&str, SlotKind)]) -> ShaderStage {
        ShaderStage {
            vertex: String::new(),
            fragment: String::new(),
            uniforms: Vec::new(),
            ins: ins
                .iter()
                .map(|(name, kind)| StageSlot {
                    name: (*name).to_string(),
                    kind: *kind,
                })
                .collect(),
            outs: outs
                .iter()
                .map(|(name, kind)| StageSlot {
                    name: (*name).to_string(),
                    kind: *kind,
                })
                .collect(),
        }
    }

    fn named(stages: Vec<ShaderStage>) -> Vec<(String, ShaderStage)> {
        stages
            .into_iter()
            .enumerate()
            .map(|(i, s)| (format!("stage{i}"), s))
            .collect()
    }

    #[test]
    fn test_empty_pipeline_is_rejected() {
        assert!(matches!(
            validate_wiring(&[]),
            Err(RenderError::EmptyPipeline)
        ));
    }

    #[test]
    fn test_single_stage_with_no_slots_is_valid() {
        let stages = named(vec![stage(&[], &[])]);
        assert!(validate_wiring(&stages).is_ok());
    }

    #[test]
    fn test_matched_chain_is_valid() {
        let stages = named(vec![
            stage(
                &[],
                &[("scene", SlotKind::Color), ("depth", SlotKind::Depth)],
            ),
            stage(
                &[("scene", SlotKind::Color), ("depth", SlotKind::Depth)],
                &[("blurred", SlotKind::Color)],
            ),
            stage(&[("blurred", SlotKind::Color)], &[]),
        ]);
        assert!(validate_wiring(&stages).is_ok());
    }

    #[test]
    fn test_unmatched_input_names_the_slot() {
        let stages = named(vec![
            stage(&[], &[("scene", SlotKind::Color)]),
            stage(&[("bloom", SlotKind::Color)], &[]),
        ]);
        match validate_wiring(&stages) {
            Err(RenderError::UnmatchedInput { stage, input }) => {
                assert_eq!(stage, "stage1");
                assert_eq!(input, "bloom");
            }
            other => panic!("expected UnmatchedInput, got {other:?}"),
        }
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let stages = named(vec![
            stage(&[], &[("scene", SlotKind::Color)]),
            stage(&[("scene", SlotKind::Depth)], &[]),
        ]);
        assert!(matches!(
            validate_wiring(&stages),
            Err(RenderError::SlotKindMismatch { .. })
        ));
    }

    #[test]
    fn test_first_stage_may_not_consume() {
        let stages = named(vec![stage(&[("scene", SlotKind::Color)], &[])]);
        assert!(matches!(
            validate_wiring(&stages),
            Err(RenderError::UnmatchedInput { .. })
        ));
    }

    #[test]
    fn test_duplicate_output_is_rejected() {
        let stages = named(vec![stage(
            &[],
            &[("scene", SlotKind::Color), ("scene", SlotKind::Color)],
        )]);
        assert!(matches!(
            validate_wiring(&stages),
            Err(RenderError::DuplicateOutput { .. })
        ));
    }

    #[test]
    fn test_matching_is_pairwise_not_global() {
        // stage2 consumes what stage0 produced, but only adjacency counts.
        let stages = named(vec![
            stage(&[], &[("scene", SlotKind::Color)]),
            stage(&[("scene", SlotKind::Color)], &[("lit", SlotKind::Color)]),
            stage(&[("scene", SlotKind::Color)], &[]),
        ]);
        assert!(matches!(
            validate_wiring(&stages),
            Err(RenderError::UnmatchedInput { .. })
        ));
    }

}
