//! Waterfall dialog — a fixed sequence of steps, one per time it regains control.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::context::{DialogContext, DialogTurnResult, TurnContext};
use super::dialog::Dialog;
use super::stack::FrameState;
use crate::error::DialogError;

/// What a step wants to happen next.
#[derive(Debug, Clone, PartialEq)]
pub enum StepDirective {
    /// Push a child dialog; the waterfall resumes at the next step when it ends.
    BeginChildDialog {
        dialog_id: String,
        options: Option<Value>,
    },
    /// Finish the waterfall with this result.
    EndDialog(Option<Value>),
}

impl StepDirective {
    pub fn begin(dialog_id: impl Into<String>) -> Self {
        Self::BeginChildDialog {
            dialog_id: dialog_id.into(),
            options: None,
        }
    }

    pub fn begin_with(dialog_id: impl Into<String>, options: Value) -> Self {
        Self::BeginChildDialog {
            dialog_id: dialog_id.into(),
            options: Some(options),
        }
    }

    pub fn end() -> Self {
        Self::EndDialog(None)
    }
}

/// What a step function gets to look at.
pub struct WaterfallStepContext<'t> {
    /// Zero-based step index.
    pub index: usize,
    /// Options the waterfall was begun with.
    pub options: Option<Value>,
    /// Result of the child dialog the previous step began. `None` for step 0.
    pub result: Option<Value>,
    pub turn: &'t mut TurnContext,
}

impl WaterfallStepContext<'_> {
    /// Deserialize the previous step's result.
    pub fn result_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, DialogError> {
        let value = self.result.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }
}

/// A single waterfall step.
pub type WaterfallStep =
    Box<dyn Fn(&mut WaterfallStepContext<'_>) -> Result<StepDirective, DialogError> + Send + Sync>;

/// Persisted state of an active waterfall frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterfallState {
    /// Index of the step that last ran.
    pub step: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

/// A linear sequence of named steps.
pub struct WaterfallDialog {
    id: String,
    steps: Vec<(String, WaterfallStep)>,
}

impl WaterfallDialog {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
        }
    }

    /// Append a named step.
    pub fn step<F>(mut self, name: impl Into<String>, step: F) -> Self
    where
        F: Fn(&mut WaterfallStepContext<'_>) -> Result<StepDirective, DialogError>
            + Send
            + Sync
            + 'static,
    {
        self.steps.push((name.into(), Box::new(step)));
        self
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|(name, _)| name.as_str())
    }

    fn state<'s>(&self, dc: &'s mut DialogContext<'_>) -> Result<&'s mut WaterfallState, DialogError> {
        match dc.active_state_mut()? {
            FrameState::Waterfall(state) => Ok(state),
            _ => Err(DialogError::StateMismatch {
                dialog_id: self.id.clone(),
            }),
        }
    }

    /// Run step `index`; past the last step the waterfall ends with `result`.
    fn run_step(
        &self,
        dc: &mut DialogContext<'_>,
        index: usize,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let Some((name, step)) = self.steps.get(index) else {
            return dc.end_dialog(result);
        };

        let state = self.state(dc)?;
        state.step = index;
        let options = state.options.clone();
        debug!(dialog_id = %self.id, step = %name, index, "Running waterfall step");

        let mut step_ctx = WaterfallStepContext {
            index,
            options,
            result,
            turn: &mut *dc.turn,
        };
        match step(&mut step_ctx)? {
            StepDirective::BeginChildDialog { dialog_id, options } => {
                dc.begin_dialog(&dialog_id, options)
            }
            StepDirective::EndDialog(result) => dc.end_dialog(result),
        }
    }
}

impl std::fmt::Debug for WaterfallDialog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaterfallDialog")
            .field("id", &self.id)
            .field("steps", &self.step_names().collect::<Vec<_>>())
            .finish()
    }
}

impl Dialog for WaterfallDialog {
    fn id(&self) -> &str {
        &self.id
    }

    fn initial_state(&self, options: Option<Value>) -> Result<FrameState, DialogError> {
        Ok(FrameState::Waterfall(WaterfallState { step: 0, options }))
    }

    fn begin(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, DialogError> {
        self.run_step(dc, 0, None)
    }

    fn resume(
        &self,
        dc: &mut DialogContext<'_>,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, DialogError> {
        let next = self.state(dc)?.step + 1;
        self.run_step(dc, next, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogs::context::Outbound;
    use crate::dialogs::prompt::PromptOptions;
    use crate::dialogs::set::DialogSet;
    use crate::dialogs::stack::DialogStackState;
    use serde_json::json;

    fn ask_name() -> Value {
        serde_json::to_value(PromptOptions {
            prompt: "Имя?".into(),
            retry_prompt: None,
            choices: vec![],
        })
        .unwrap()
    }

    fn greeter() -> WaterfallDialog {
        WaterfallDialog::new("greet")
            .step("ask", |_| Ok(StepDirective::begin_with("text", ask_name())))
            .step("greet", |step| {
                let name: String = step.result_as()?;
                step.turn.send_text(format!("Привет, {name}!"));
                Ok(StepDirective::EndDialog(Some(json!(name))))
            })
    }

    #[test]
    fn steps_advance_once_per_resume() {
        let mut set = DialogSet::with_default_prompts();
        set.add(greeter()).unwrap();
        let mut stack = DialogStackState::new();

        let mut turn = TurnContext::new("c1", "");
        let result = set
            .create_context(&mut stack, &mut turn)
            .begin_dialog("greet", None)
            .unwrap();
        assert_eq!(result, DialogTurnResult::Waiting);
        assert_eq!(stack.frames()[0].state, FrameState::Waterfall(WaterfallState::default()));
        assert_eq!(stack.depth(), 2);

        let mut turn = TurnContext::new("c1", "Оля");
        let result = set
            .create_context(&mut stack, &mut turn)
            .continue_dialog()
            .unwrap();
        assert_eq!(result, DialogTurnResult::Complete(Some(json!("Оля"))));
        assert_eq!(turn.outbound(), [Outbound::Text("Привет, Оля!".into())]);
        assert!(stack.is_empty());
    }

    #[test]
    fn step_zero_has_no_result_and_sees_options() {
        let mut set = DialogSet::new();
        set.add(WaterfallDialog::new("echo").step("only", |step| {
            assert_eq!(step.index, 0);
            assert!(step.result.is_none());
            Ok(StepDirective::EndDialog(step.options.clone()))
        }))
        .unwrap();
        let mut stack = DialogStackState::new();
        let mut turn = TurnContext::new("c1", "");

        let result = set
            .create_context(&mut stack, &mut turn)
            .begin_dialog("echo", Some(json!({"a": 1})))
            .unwrap();
        assert_eq!(result, DialogTurnResult::Complete(Some(json!({"a": 1}))));
    }

    #[test]
    fn child_waterfall_result_flows_to_parent() {
        let mut set = DialogSet::with_default_prompts();
        set.add(greeter()).unwrap();
        set.add(
            WaterfallDialog::new("outer")
                .step("delegate", |_| Ok(StepDirective::begin("greet")))
                .step("finish", |step| {
                    let name: String = step.result_as()?;
                    step.turn.send_text(format!("Готово: {name}"));
                    Ok(StepDirective::end())
                }),
        )
        .unwrap();
        let mut stack = DialogStackState::new();

        let mut turn = TurnContext::new("c1", "");
        set.create_context(&mut stack, &mut turn)
            .begin_dialog("outer", None)
            .unwrap();
        assert_eq!(stack.depth(), 3);

        let mut turn = TurnContext::new("c1", "Иван");
        let result = set
            .create_context(&mut stack, &mut turn)
            .continue_dialog()
            .unwrap();
        assert_eq!(result, DialogTurnResult::Complete(None));
        let texts: Vec<_> = turn.outbound().iter().filter_map(Outbound::text).collect();
        assert_eq!(texts, ["Привет, Иван!", "Готово: Иван"]);
    }

    #[test]
    fn unknown_child_is_an_error() {
        let mut set = DialogSet::new();
        set.add(WaterfallDialog::new("root").step("go", |_| Ok(StepDirective::begin("nope"))))
            .unwrap();
        let mut stack = DialogStackState::new();
        let mut turn = TurnContext::new("c1", "");

        let err = set
            .create_context(&mut stack, &mut turn)
            .begin_dialog("root", None)
            .unwrap_err();
        assert!(matches!(err, DialogError::UnknownDialog { ref id } if id == "nope"));
    }

    #[test]
    fn debug_lists_step_names() {
        let rendered = format!("{:?}", greeter());
        assert!(rendered.contains("\"ask\""));
        assert!(rendered.contains("\"greet\""));
    }
}
