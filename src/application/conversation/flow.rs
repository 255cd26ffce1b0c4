//! Flow registry - the static table of dialogues the bot can run

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashMap;

use crate::application::errors::FlowError;
use crate::domain::entities::CountryCode;

/// Every entry point the bot understands.
///
/// Flows with an empty state list run to completion on entry and never
/// create a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowId {
    Start,
    About,
    ConfigurePanel,
    AddAdmin,
    AdminsList,
    RemoveAdmin,
    SetSpecialLimit,
    ShowSpecialLimits,
    CountryCode,
    SetExceptUser,
    RemoveExceptUser,
    ShowExceptUsers,
    SetGeneralLimit,
    SetCheckInterval,
    SetTimeToActive,
    Backup,
}

/// One step of a dialogue, waiting for a single input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowState {
    ConfirmOverwrite,
    Domain,
    PanelUsername,
    PanelPassword,
    ChatId,
    LimitUsername,
    LimitNumber,
    CountryChoice,
    ExceptUsername,
    GeneralLimit,
    CheckInterval,
    ActiveWindow,
}

impl FlowState {
    /// Name under which the validated input is kept in the session
    pub fn field(self) -> &'static str {
        match self {
            FlowState::ConfirmOverwrite => "confirm",
            FlowState::Domain => "domain",
            FlowState::PanelUsername => "username",
            FlowState::PanelPassword => "password",
            FlowState::ChatId => "chat_id",
            FlowState::LimitUsername => "limit_user",
            FlowState::LimitNumber => "limit",
            FlowState::CountryChoice => "country",
            FlowState::ExceptUsername => "except_user",
            FlowState::GeneralLimit => "general_limit",
            FlowState::CheckInterval => "check_interval",
            FlowState::ActiveWindow => "active_window",
        }
    }

    pub fn validator(self) -> Validator {
        match self {
            FlowState::ConfirmOverwrite => Validator::Confirmation,
            FlowState::Domain
            | FlowState::PanelUsername
            | FlowState::PanelPassword
            | FlowState::LimitUsername
            | FlowState::ExceptUsername => Validator::NonEmpty,
            FlowState::ChatId => Validator::Digits { max: i64::MAX as u64 },
            FlowState::LimitNumber | FlowState::GeneralLimit => Validator::Digits { max: u32::MAX as u64 },
            FlowState::CheckInterval | FlowState::ActiveWindow => Validator::Digits { max: u64::MAX },
            FlowState::CountryChoice => Validator::CountryChoice,
        }
    }
}

/// A validated input value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(u64),
    Confirmed(bool),
    Country(CountryCode),
}

/// Affirmative answers to the overwrite question. Compared lowercased.
const AFFIRMATIVE: &[&str] = &["yes", "y", "بله"];

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("static regex"));

/// Input check attached to a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// Never fails: anything that is not an affirmative token is a decline
    Confirmation,
    /// Trimmed, non-empty text
    NonEmpty,
    /// Pure ASCII digits, no sign or decimal point, not above `max`
    Digits { max: u64 },
    /// Never fails: unknown choices map to no country filter
    CountryChoice,
}

impl Validator {
    /// `retry` names the command the user should send to start over.
    pub fn validate(self, raw: &str, retry: &'static str) -> Result<FieldValue, FlowError> {
        let input = raw.trim();
        match self {
            Validator::Confirmation => {
                let answer = input.to_lowercase();
                Ok(FieldValue::Confirmed(AFFIRMATIVE.contains(&answer.as_str())))
            }
            Validator::NonEmpty => {
                if input.is_empty() {
                    Err(FlowError::validation(raw, retry))
                } else {
                    Ok(FieldValue::Text(input.to_string()))
                }
            }
            Validator::Digits { max } => {
                if !DIGITS.is_match(input) {
                    return Err(FlowError::validation(input, retry));
                }
                match input.parse::<u64>() {
                    Ok(n) if n <= max => Ok(FieldValue::Number(n)),
                    _ => Err(FlowError::validation(input, retry)),
                }
            }
            Validator::CountryChoice => Ok(FieldValue::Country(CountryCode::from_choice(input))),
        }
    }
}

/// Static description of one dialogue
#[derive(Debug)]
pub struct FlowDefinition {
    pub id: FlowId,
    /// Slash command that enters the flow, without the slash
    pub command: &'static str,
    pub requires_admin: bool,
    pub states: &'static [FlowState],
}

impl FlowDefinition {
    pub fn first_state(&self) -> Option<FlowState> {
        self.states.first().copied()
    }

    /// The state after `state`, or `None` when `state` is terminal
    pub fn successor(&self, state: FlowState) -> Option<FlowState> {
        let pos = self.states.iter().position(|s| *s == state)?;
        self.states.get(pos + 1).copied()
    }

    pub fn is_stateless(&self) -> bool {
        self.states.is_empty()
    }
}

const fn flow(id: FlowId, command: &'static str, states: &'static [FlowState]) -> FlowDefinition {
    FlowDefinition { id, command, requires_admin: true, states }
}

static REGISTRY: Lazy<FlowRegistry> = Lazy::new(|| {
    use FlowState::*;
    FlowRegistry::new(vec![
        flow(FlowId::Start, "start", &[]),
        FlowDefinition { id: FlowId::About, command: "spernet", requires_admin: false, states: &[] },
        flow(FlowId::ConfigurePanel, "create_config", &[ConfirmOverwrite, Domain, PanelUsername, PanelPassword]),
        flow(FlowId::AddAdmin, "add_admin", &[ChatId]),
        flow(FlowId::AdminsList, "admins_list", &[]),
        flow(FlowId::RemoveAdmin, "remove_admin", &[ChatId]),
        flow(FlowId::SetSpecialLimit, "set_special_limit", &[LimitUsername, LimitNumber]),
        flow(FlowId::ShowSpecialLimits, "show_special_limit", &[]),
        flow(FlowId::CountryCode, "country_code", &[CountryChoice]),
        flow(FlowId::SetExceptUser, "set_except_user", &[ExceptUsername]),
        flow(FlowId::RemoveExceptUser, "remove_except_user", &[ExceptUsername]),
        flow(FlowId::ShowExceptUsers, "show_except_users", &[]),
        flow(FlowId::SetGeneralLimit, "set_general_limit_number", &[GeneralLimit]),
        flow(FlowId::SetCheckInterval, "set_check_interval", &[CheckInterval]),
        flow(FlowId::SetTimeToActive, "set_time_to_active_users", &[ActiveWindow]),
        flow(FlowId::Backup, "backup", &[]),
    ])
});

/// Lookup table from command token and flow id to definitions
#[derive(Debug)]
pub struct FlowRegistry {
    flows: Vec<FlowDefinition>,
    by_command: HashMap<&'static str, usize>,
}

impl FlowRegistry {
    fn new(flows: Vec<FlowDefinition>) -> Self {
        let by_command = flows
            .iter()
            .enumerate()
            .map(|(i, f)| (f.command, i))
            .collect();
        Self { flows, by_command }
    }

    /// The process-wide registry
    pub fn global() -> &'static FlowRegistry {
        &REGISTRY
    }

    pub fn by_command(&self, command: &str) -> Option<&FlowDefinition> {
        self.by_command.get(command).map(|&i| &self.flows[i])
    }

    /// Every `FlowId` is registered, so this lookup always succeeds.
    pub fn get(&self, id: FlowId) -> &FlowDefinition {
        self.flows
            .iter()
            .find(|f| f.id == id)
            .unwrap_or(&self.flows[0])
    }

    pub fn all(&self) -> impl Iterator<Item = &FlowDefinition> {
        self.flows.iter()
    }
}
