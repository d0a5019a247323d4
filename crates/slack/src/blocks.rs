use serde::Serialize;

use rollcall_core::WorkLocation;

pub const LOCATION_SELECT_ACTION_ID: &str = "location-select";
pub const SIGN_IN_ACTION_ID: &str = "sign-in";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { action_id: action_id.into(), text: TextObject::plain(label), value: None }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: TextObject,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StaticSelectElement {
    pub action_id: String,
    pub placeholder: TextObject,
    pub options: Vec<SelectOption>,
}

impl StaticSelectElement {
    pub fn new(action_id: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            placeholder: TextObject::plain(placeholder),
            options: Vec::new(),
        }
    }

    pub fn option(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(SelectOption { text: TextObject::plain(label), value: value.into() });
        self
    }
}

/// Interactive element attached to a section block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Accessory {
    #[serde(rename = "button")]
    Button(ButtonElement),
    #[serde(rename = "static_select")]
    StaticSelect(StaticSelectElement),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        block_id: String,
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        let (text, accessory) = builder.build();
        self.blocks.push(Block::Section { block_id: block_id.into(), text, accessory });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
    accessory: Option<Accessory>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.accessory = Some(Accessory::Button(button));
        self
    }

    pub fn static_select(&mut self, select: StaticSelectElement) -> &mut Self {
        self.accessory = Some(Accessory::StaticSelect(select));
        self
    }

    fn build(self) -> (TextObject, Option<Accessory>) {
        (self.text.unwrap_or_else(|| TextObject::plain("")), self.accessory)
    }
}

/// Greeting plus the three-location picker, sent when a sign-in trigger
/// message arrives.
pub fn location_prompt_message(user_id: &str) -> MessageTemplate {
    let greeting = format!("Hi <@{user_id}>,\nLet's get you signed up for the day");

    let mut select = StaticSelectElement::new(LOCATION_SELECT_ACTION_ID, "Select work location");
    for location in WorkLocation::ALL {
        select = select.option(location.label(), location.label());
    }

    MessageBuilder::new(greeting.clone())
        .section("attendance.greeting.v1", |section| {
            section.mrkdwn(greeting.clone());
        })
        .section("attendance.location.v1", |section| {
            section.mrkdwn("Please select your work location").static_select(select);
        })
        .build()
}

/// Replaces the location prompt with a confirmation button carrying the
/// selected location as its value.
pub fn sign_in_prompt_message(location: WorkLocation) -> MessageTemplate {
    MessageBuilder::new("Ready to start your day? Sign In Now.")
        .section("attendance.confirm.v1", |section| {
            section
                .mrkdwn("Ready to start your day? Sign In Now.")
                .button(ButtonElement::new(SIGN_IN_ACTION_ID, "Sign In").value(location.label()));
        })
        .build()
}

pub fn already_signed_in_message() -> MessageTemplate {
    MessageBuilder::new("You have already signed in for today.")
        .section("attendance.result.v1", |section| {
            section.mrkdwn("You have already signed in for today.");
        })
        .build()
}

pub fn signed_in_message(user_id: &str) -> MessageTemplate {
    let text = format!("<@{user_id}> you have signed in for today. Have a great day ahead!");
    MessageBuilder::new(text.clone())
        .section("attendance.result.v1", |section| {
            section.mrkdwn(text.clone());
        })
        .build()
}

#[cfg(test)]
mod tests {
    use rollcall_core::WorkLocation;

    use super::{
        already_signed_in_message, location_prompt_message, sign_in_prompt_message,
        signed_in_message, Accessory, Block, MessageBuilder, TextObject,
    };

    #[test]
    fn location_prompt_offers_the_three_exact_labels() {
        let message = location_prompt_message("U123");

        let Block::Section { accessory: Some(Accessory::StaticSelect(select)), .. } =
            &message.blocks[1]
        else {
            panic!("expected a static select accessory on the second section");
        };

        assert_eq!(select.action_id, "location-select");
        let labels: Vec<&str> =
            select.options.iter().map(|option| option.text.content()).collect();
        assert_eq!(labels, vec!["Work From Home", "Work from Office", "Client Location"]);

        // Values mirror labels so the selection round-trips unchanged.
        for option in &select.options {
            assert_eq!(option.text.content(), option.value);
        }
    }

    #[test]
    fn location_prompt_greets_the_triggering_user() {
        let message = location_prompt_message("U777");
        assert!(message.fallback_text.contains("<@U777>"));
        assert!(matches!(
            &message.blocks[0],
            Block::Section { text: TextObject::Mrkdwn { text }, .. } if text.contains("<@U777>")
        ));
    }

    #[test]
    fn confirmation_button_carries_the_selected_location_verbatim() {
        let message = sign_in_prompt_message(WorkLocation::WorkFromHome);

        let Block::Section { accessory: Some(Accessory::Button(button)), .. } = &message.blocks[0]
        else {
            panic!("expected a button accessory");
        };

        assert_eq!(button.action_id, "sign-in");
        assert_eq!(button.value.as_deref(), Some("Work From Home"));
        assert_eq!(button.text.content(), "Sign In");
    }

    #[test]
    fn result_messages_use_the_legacy_wording() {
        assert_eq!(
            already_signed_in_message().fallback_text,
            "You have already signed in for today."
        );
        assert_eq!(
            signed_in_message("U9").fallback_text,
            "<@U9> you have signed in for today. Have a great day ahead!"
        );
    }

    #[test]
    fn blocks_serialize_with_slack_wire_type_tags() {
        let message = MessageBuilder::new("fallback")
            .section("attendance.test.v1", |section| {
                section
                    .mrkdwn("*hello*")
                    .button(super::ButtonElement::new("sign-in", "Sign In").value("Client Location"));
            })
            .build();

        let json = serde_json::to_value(&message.blocks).expect("blocks serialize");
        assert_eq!(json[0]["type"], "section");
        assert_eq!(json[0]["text"]["type"], "mrkdwn");
        assert_eq!(json[0]["accessory"]["type"], "button");
        assert_eq!(json[0]["accessory"]["text"]["type"], "plain_text");
        assert_eq!(json[0]["accessory"]["value"], "Client Location");
    }

    #[test]
    fn static_select_serializes_options_with_plain_text_labels() {
        let message = location_prompt_message("U1");
        let json = serde_json::to_value(&message.blocks).expect("blocks serialize");

        assert_eq!(json[1]["accessory"]["type"], "static_select");
        assert_eq!(json[1]["accessory"]["placeholder"]["text"], "Select work location");
        assert_eq!(json[1]["accessory"]["options"][0]["text"]["type"], "plain_text");
        assert_eq!(json[1]["accessory"]["options"][2]["value"], "Client Location");
    }
}
