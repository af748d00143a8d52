//! Scripted evaluator
//!
//! A stand-in for a physics backend that records every command it
//! receives and can be told to misbehave at a chosen frame.

use kinebake_core::{BodyState, Evaluator, MotionError, MotionResult, PoseCommand, Vec3};

/// Injected misbehaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `set_state` fails on this call
    RejectAt(usize),
    /// `read_body_states` reports one body too few after this call
    DropBodyAt(usize),
}

/// Evaluator with a fixed, simple body layout
///
/// Body 0 sits exactly at the commanded root pose. Body `k > 0` hangs
/// `0.1 * k` below the root in the root frame and is pushed along the root
/// x axis by joint `(k - 1) % J`.
pub struct ScriptedEvaluator {
    body_names: Vec<String>,
    joint_names: Vec<String>,
    commands: Vec<PoseCommand>,
    states: Option<Vec<BodyState>>,
    fault: Option<Fault>,
}

impl ScriptedEvaluator {
    pub fn new(bodies: usize, joints: usize) -> Self {
        ScriptedEvaluator {
            body_names: (0..bodies).map(|i| format!("body_{}", i)).collect(),
            joint_names: (0..joints).map(|i| format!("joint_{}", i)).collect(),
            commands: Vec::new(),
            states: None,
            fault: None,
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Number of `set_state` calls so far, failed ones included
    pub fn calls(&self) -> usize {
        self.commands.len()
    }

    /// Every command received, in call order
    pub fn commands(&self) -> &[PoseCommand] {
        &self.commands
    }

    fn place(&self, command: &PoseCommand) -> Vec<BodyState> {
        let joints = command.joint_positions.len();
        (0..self.body_names.len())
            .map(|k| {
                let mut local = Vec3::new(0.0, 0.0, -0.1 * k as f64);
                if k > 0 && joints > 0 {
                    local.x += command.joint_positions[(k - 1) % joints];
                }
                BodyState::at(
                    command.root_position + command.root_orientation.rotate(local),
                    command.root_orientation,
                )
            })
            .collect()
    }
}

impl Evaluator for ScriptedEvaluator {
    fn body_names(&self) -> &[String] {
        &self.body_names
    }

    fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    fn set_state(&mut self, command: &PoseCommand) -> MotionResult<()> {
        let call = self.commands.len();
        self.commands.push(command.clone());

        if self.fault == Some(Fault::RejectAt(call)) {
            self.states = None;
            return Err(MotionError::EvaluatorRejected(format!(
                "scripted rejection on call {}",
                call
            )));
        }

        let mut states = self.place(command);
        if self.fault == Some(Fault::DropBodyAt(call)) {
            states.pop();
        }
        self.states = Some(states);
        Ok(())
    }

    fn read_body_states(&self) -> MotionResult<Vec<BodyState>> {
        self.states.clone().ok_or(MotionError::StateNotResolved)
    }
}
