/// Choice resolver — holds an unresolved choice point and applies the
/// selected option's flag merge and position change in one step.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::content::{ContentError, ContentStore};
use crate::schema::scene::{Choice, SceneId};
use crate::schema::state::NarrativeState;

#[derive(Debug, Error)]
pub enum ChoiceError {
    #[error("no choice is awaiting a selection")]
    NoPendingChoice,
    #[error("selection refers to a choice that is no longer active")]
    StaleTicket,
    #[error("option {index} is out of range for a choice with {len} options")]
    OptionOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Identifies one presentation of a choice. Selections carrying an older
/// ticket are ignored, so a late or repeated selection event can never
/// apply to a later choice. Serializes as a bare number for hosts that
/// round-trip it through JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoiceTicket(u64);

/// What the selection UI needs to render a choice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceView {
    pub ticket: ChoiceTicket,
    pub prompt: String,
    pub options: Vec<String>,
}

/// Where the narrative goes after a resolved choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Position was reset to line 0 of this scene.
    Transition(SceneId),
    /// Position moved past the choice line in the current scene.
    Continue,
}

#[derive(Debug, Clone)]
struct Pending {
    ticket: ChoiceTicket,
    choice: Choice,
}

#[derive(Debug, Clone, Default)]
pub struct ChoiceResolver {
    pending: Option<Pending>,
    issued: u64,
}

impl ChoiceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend on `choice`. Replaces any earlier unresolved choice.
    pub fn present(&mut self, choice: &Choice) -> ChoiceView {
        self.issued += 1;
        let ticket = ChoiceTicket(self.issued);
        self.pending = Some(Pending {
            ticket,
            choice: choice.clone(),
        });
        debug!(prompt = %choice.prompt, options = choice.options.len(), "choice presented");
        Self::view_of(ticket, choice)
    }

    pub fn view(&self) -> Option<ChoiceView> {
        self.pending
            .as_ref()
            .map(|p| Self::view_of(p.ticket, &p.choice))
    }

    fn view_of(ticket: ChoiceTicket, choice: &Choice) -> ChoiceView {
        ChoiceView {
            ticket,
            prompt: choice.prompt.clone(),
            options: choice.options.iter().map(|o| o.text.clone()).collect(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply option `index` of the pending choice to `state`.
    ///
    /// Nothing is mutated unless the whole resolution succeeds: the ticket
    /// and index are checked and the option's target looked up before the
    /// flags are merged and the position moved. On success the choice is
    /// no longer pending, so only the first selection is honored.
    pub fn resolve(
        &mut self,
        ticket: ChoiceTicket,
        index: usize,
        content: &ContentStore,
        state: &mut NarrativeState,
    ) -> Result<Resolution, ChoiceError> {
        let pending = self.pending.as_ref().ok_or(ChoiceError::NoPendingChoice)?;
        if pending.ticket != ticket {
            return Err(ChoiceError::StaleTicket);
        }
        let len = pending.choice.options.len();
        let option = pending
            .choice
            .options
            .get(index)
            .ok_or(ChoiceError::OptionOutOfRange { index, len })?;
        if let Some(next) = &option.next {
            content.get_scene(next)?;
        }

        state.merge_flags(&option.set);
        let resolution = match &option.next {
            Some(next) => {
                state.set_position(next.clone(), 0);
                Resolution::Transition(next.clone())
            }
            None => {
                state.set_line(state.line_index() + 1);
                Resolution::Continue
            }
        };
        debug!(option = index, ?resolution, "choice resolved");
        self.pending = None;
        Ok(resolution)
    }

    /// Drop the pending choice without resolving it.
    pub fn abandon(&mut self) {
        self.pending = None;
    }
}
