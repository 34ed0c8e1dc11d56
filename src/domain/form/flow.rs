//! Stage transition table.
//!
//! [`STAGE_TABLE`] declares, per stage, the field it fills, the kind of input
//! it accepts, the validator applied, and the prompts shown. [`FormFlow`]
//! reads the table under a set of [`FlowCapabilities`], which switch the
//! optional stages on or off instead of keeping separate form variants.

use serde::{Deserialize, Serialize};

use super::errors::FormError;
use super::fields::{FieldKey, FieldValue, FormFields};
use super::messages::{Button, Reply, ReplyMarkup};
use super::prompts::{self, NO_VALUE, YES_VALUE};
use super::stage::Stage;
use super::validators::TextRule;

/// A button offered by a choice stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceOption {
    /// Button id delivered back by the gateway.
    pub id: &'static str,
    pub label: &'static str,
    /// Value stored in the stage's field.
    pub value: &'static str,
    /// Stage to jump to instead of the next one in order.
    pub jump: Option<Stage>,
    /// Fields set to [`FieldValue::Empty`] when this option is picked.
    pub clears: &'static [FieldKey],
}

/// Input a stage accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Text(TextRule),
    Choice(&'static [ChoiceOption]),
    Location,
    /// Photos/videos, plus the finish button.
    Media,
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpec {
    pub stage: Stage,
    pub field: Option<FieldKey>,
    pub expect: Expect,
    pub prompt: &'static str,
    /// Shown with the prompt's keyboard when the answer is rejected.
    pub retry: &'static str,
}

impl StageSpec {
    /// Validates a typed answer and names the field it fills.
    ///
    /// Only meaningful for [`Expect::Text`] stages.
    pub fn parse_text(&self, raw: &str) -> Result<(FieldKey, FieldValue), FormError> {
        let (Expect::Text(rule), Some(field)) = (self.expect, self.field) else {
            return Err(FormError::NoAnswerField(self.stage));
        };
        let value = rule
            .apply(field.as_str(), raw)
            .map_err(|e| FormError::validation(self.stage, e))?;
        let value = match rule {
            TextRule::Quantity => FieldValue::Quantity(value),
            _ => FieldValue::Text(value),
        };
        Ok((field, value))
    }
}

const CADASTR_OPTIONS: &[ChoiceOption] = &[
    ChoiceOption {
        id: prompts::BTN_CADASTR_YES,
        label: "✅ Кадастр есть",
        value: YES_VALUE,
        jump: None,
        clears: &[],
    },
    ChoiceOption {
        id: prompts::BTN_CADASTR_NO,
        label: "❌ Кадастр нет",
        value: NO_VALUE,
        jump: None,
        clears: &[],
    },
];

const TRANSFORMER_OPTIONS: &[ChoiceOption] = &[
    ChoiceOption {
        id: prompts::BTN_TRANSFORMER_YES,
        label: "✅ Трансформатор есть",
        value: YES_VALUE,
        jump: None,
        clears: &[],
    },
    ChoiceOption {
        id: prompts::BTN_TRANSFORMER_NO,
        label: "❌ Трансформатор нет",
        value: NO_VALUE,
        jump: Some(Stage::Location),
        clears: &[FieldKey::TransformerPower, FieldKey::FreePower, FieldKey::Station],
    },
];

const fn station(id: &'static str, label: &'static str) -> ChoiceOption {
    ChoiceOption {
        id,
        label,
        value: label,
        jump: None,
        clears: &[],
    }
}

const STATION_OPTIONS: &[ChoiceOption] = &[
    station("station_20kwt", "20кВт"),
    station("station_60kwt", "60кВт"),
    station("station_80kwt", "80кВт"),
    station("station_120kwt", "120кВт"),
    station("station_160kwt", "160кВт"),
];

/// Indexed by [`Stage::ordinal`].
pub static STAGE_TABLE: [StageSpec; 12] = [
    StageSpec {
        stage: Stage::ManagerName,
        field: Some(FieldKey::ManagerName),
        expect: Expect::Text(TextRule::FreeText),
        prompt: prompts::MANAGER_NAME,
        retry: prompts::MANAGER_NAME_RETRY,
    },
    StageSpec {
        stage: Stage::ContactName,
        field: Some(FieldKey::ContactName),
        expect: Expect::Text(TextRule::FreeText),
        prompt: prompts::CONTACT_NAME,
        retry: prompts::CONTACT_NAME_RETRY,
    },
    StageSpec {
        stage: Stage::Phone,
        field: Some(FieldKey::Phone),
        expect: Expect::Text(TextRule::Phone),
        prompt: prompts::PHONE,
        retry: prompts::PHONE_RETRY,
    },
    StageSpec {
        stage: Stage::Address,
        field: Some(FieldKey::Address),
        expect: Expect::Text(TextRule::FreeText),
        prompt: prompts::ADDRESS,
        retry: prompts::ADDRESS_RETRY,
    },
    StageSpec {
        stage: Stage::CadastrNumber,
        field: Some(FieldKey::HasCadastr),
        expect: Expect::Choice(CADASTR_OPTIONS),
        prompt: prompts::CADASTR,
        retry: prompts::CHOICE_RETRY,
    },
    StageSpec {
        stage: Stage::HasTransformer,
        field: Some(FieldKey::HasTransformer),
        expect: Expect::Choice(TRANSFORMER_OPTIONS),
        prompt: prompts::TRANSFORMER,
        retry: prompts::CHOICE_RETRY,
    },
    StageSpec {
        stage: Stage::TransformerPower,
        field: Some(FieldKey::TransformerPower),
        expect: Expect::Text(TextRule::Quantity),
        prompt: prompts::TRANSFORMER_POWER,
        retry: prompts::TRANSFORMER_POWER_RETRY,
    },
    StageSpec {
        stage: Stage::FreePower,
        field: Some(FieldKey::FreePower),
        expect: Expect::Text(TextRule::Quantity),
        prompt: prompts::FREE_POWER,
        retry: prompts::FREE_POWER_RETRY,
    },
    StageSpec {
        stage: Stage::Station,
        field: Some(FieldKey::Station),
        expect: Expect::Choice(STATION_OPTIONS),
        prompt: prompts::STATION,
        retry: prompts::CHOICE_RETRY,
    },
    StageSpec {
        stage: Stage::Location,
        field: Some(FieldKey::LocationLink),
        expect: Expect::Location,
        prompt: prompts::LOCATION,
        retry: prompts::LOCATION_RETRY,
    },
    StageSpec {
        stage: Stage::LocationInfo,
        field: Some(FieldKey::LocationInfo),
        expect: Expect::Text(TextRule::FreeText),
        prompt: prompts::LOCATION_INFO,
        retry: prompts::LOCATION_INFO_RETRY,
    },
    StageSpec {
        stage: Stage::MediaUpload,
        field: None,
        expect: Expect::Media,
        prompt: prompts::MEDIA,
        retry: prompts::MEDIA_RETRY,
    },
];

/// Switches for the optional parts of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCapabilities {
    /// Ask for (or prefill) the manager name before the form.
    pub manager_name_required: bool,
    /// Ask for a free-text location description after the location.
    pub location_info: bool,
    /// Accept more than one attachment before finishing.
    pub multi_upload: bool,
}

impl Default for FlowCapabilities {
    fn default() -> Self {
        Self {
            manager_name_required: true,
            location_info: true,
            multi_upload: true,
        }
    }
}

impl FlowCapabilities {
    /// The short variant: no manager step, no location notes, one attachment.
    pub fn minimal() -> Self {
        Self {
            manager_name_required: false,
            location_info: false,
            multi_upload: false,
        }
    }
}

/// The transition table under a fixed set of capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormFlow {
    capabilities: FlowCapabilities,
}

impl FormFlow {
    pub fn new(capabilities: FlowCapabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> FlowCapabilities {
        self.capabilities
    }

    pub fn spec(&self, stage: Stage) -> &'static StageSpec {
        &STAGE_TABLE[stage.ordinal()]
    }

    pub fn is_enabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::ManagerName => self.capabilities.manager_name_required,
            Stage::LocationInfo => self.capabilities.location_info,
            _ => true,
        }
    }

    /// Where a fresh session begins.
    pub fn entry_stage(&self, manager_known: bool) -> Stage {
        if self.is_enabled(Stage::ManagerName) && !manager_known {
            Stage::ManagerName
        } else {
            Stage::ContactName
        }
    }

    /// The next enabled stage in forward order, `None` after the media stage.
    pub fn next_stage(&self, stage: Stage) -> Option<Stage> {
        Stage::ALL
            .iter()
            .skip(stage.ordinal() + 1)
            .copied()
            .find(|s| self.is_enabled(*s))
    }

    /// `stage` itself if enabled, else the next enabled one.
    fn first_enabled_from(&self, stage: Stage) -> Option<Stage> {
        if self.is_enabled(stage) {
            Some(stage)
        } else {
            self.next_stage(stage)
        }
    }

    /// Looks up the option behind a button id on a choice stage.
    pub fn choice(&self, stage: Stage, button_id: &str) -> Option<&'static ChoiceOption> {
        match self.spec(stage).expect {
            Expect::Choice(options) => options.iter().find(|o| o.id == button_id),
            _ => None,
        }
    }

    /// Stage following a choice, honouring the option's jump.
    pub fn after_choice(&self, stage: Stage, option: &ChoiceOption) -> Option<Stage> {
        match option.jump {
            Some(target) => self.first_enabled_from(target),
            None => self.next_stage(stage),
        }
    }

    /// Prompt for `stage`, with the keyboard it needs.
    pub fn prompt(&self, stage: Stage) -> Reply {
        let spec = self.spec(stage);
        Reply::html(spec.prompt).with_markup(self.markup(spec))
    }

    /// Correction notice for `stage`, with the same keyboard as the prompt.
    pub fn retry_prompt(&self, stage: Stage) -> Reply {
        let spec = self.spec(stage);
        Reply::html(spec.retry).with_markup(self.markup(spec))
    }

    fn markup(&self, spec: &StageSpec) -> ReplyMarkup {
        match spec.expect {
            Expect::Choice(options) => ReplyMarkup::Inline(
                options
                    .iter()
                    .map(|o| Button::new(o.id, o.label))
                    .collect(),
            ),
            Expect::Location => prompts::location_keyboard(),
            Expect::Media => ReplyMarkup::Inline(vec![prompts::finish_button()]),
            // the location keyboard is one-shot; dismiss it on the next text stage
            Expect::Text(_) if spec.stage == Stage::LocationInfo => ReplyMarkup::RemoveKeyboard,
            Expect::Text(_) => ReplyMarkup::None,
        }
    }

    /// Fields the record needs for the branch the answers took.
    ///
    /// Transformer sub-fields are always required to be present (the "no"
    /// branch sets them empty), and must be non-blank on the "yes" branch.
    pub fn missing_fields(&self, fields: &FormFields) -> Vec<FieldKey> {
        let mut required = vec![
            FieldKey::ContactName,
            FieldKey::Phone,
            FieldKey::Address,
            FieldKey::HasCadastr,
            FieldKey::HasTransformer,
            FieldKey::TransformerPower,
            FieldKey::FreePower,
            FieldKey::Station,
            FieldKey::LocationLink,
        ];
        if self.capabilities.manager_name_required {
            required.insert(0, FieldKey::ManagerName);
        }
        if self.capabilities.location_info {
            required.push(FieldKey::LocationInfo);
        }

        let has_transformer = matches!(
            fields.get(FieldKey::HasTransformer),
            Some(FieldValue::Choice(v)) if v == YES_VALUE
        );

        required
            .into_iter()
            .filter(|key| match fields.get(*key) {
                None => true,
                Some(value) => {
                    let sub_field = matches!(
                        key,
                        FieldKey::TransformerPower | FieldKey::FreePower | FieldKey::Station
                    );
                    (sub_field && has_transformer && value.is_blank())
                        || (!sub_field && value.is_blank())
                }
            })
            .collect()
    }
}
