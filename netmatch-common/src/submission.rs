//! Submission record model and form-response codec
//!
//! The attendee form posts an ordered list of question/answer pairs. The codec
//! maps the six known question prompts onto [`Submission`] fields by exact,
//! case-sensitive string equality. Unknown prompts are ignored, and known
//! prompts that are absent decode to an empty string.

use serde::{Deserialize, Deserializer, Serialize};

/// One attendee's recorded profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Stable identity; unique key of the submission store
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    /// What the attendee brings
    pub value_in: String,
    /// What the attendee is looking for
    pub value_out: String,
    /// Interests / ice-breaker
    pub ice_break: String,
    pub linkedin_url: String,
    /// Creation time recorded at intake
    pub timestamp: String,
}

impl Submission {
    /// Case-insensitive exact comparison against a first/last name pair
    pub fn has_name(&self, first: &str, last: &str) -> bool {
        self.first_name.to_lowercase() == first.to_lowercase()
            && self.last_name.to_lowercase() == last.to_lowercase()
    }
}

/// A single question/answer pair as submitted by the form
///
/// A `null` question or answer reads as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub question: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl QuestionResponse {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Raw response envelope (the form's `formData` object)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub responses: Vec<QuestionResponse>,
}

/// Submission field targeted by a known question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionField {
    FirstName,
    LastName,
    LinkedinUrl,
    ValueIn,
    ValueOut,
    IceBreak,
}

pub const QUESTION_FIRST_NAME: &str = "First Name";
pub const QUESTION_LAST_NAME: &str = "Last Name";
pub const QUESTION_LINKEDIN: &str = "LinkedIn Profile";
pub const QUESTION_VALUE_IN: &str = "What do you bring?";
pub const QUESTION_VALUE_OUT: &str = "What are you looking for at this event?";
pub const QUESTION_ICE_BREAK: &str = "Help break the ice! What kind of stuff is your spice?";

/// Question prompt to field table, as worded by the form
pub const QUESTION_FIELDS: [(&str, SubmissionField); 6] = [
    (QUESTION_FIRST_NAME, SubmissionField::FirstName),
    (QUESTION_LAST_NAME, SubmissionField::LastName),
    (QUESTION_LINKEDIN, SubmissionField::LinkedinUrl),
    (QUESTION_VALUE_IN, SubmissionField::ValueIn),
    (QUESTION_VALUE_OUT, SubmissionField::ValueOut),
    (QUESTION_ICE_BREAK, SubmissionField::IceBreak),
];

/// Answer to the first response whose question equals `question` exactly
fn answer_for<'a>(responses: &'a [QuestionResponse], question: &str) -> Option<&'a str> {
    responses
        .iter()
        .find(|r| r.question == question)
        .map(|r| r.answer.as_str())
}

/// Decode a response envelope into a [`Submission`]
///
/// `user_id` and `timestamp` are passed through unchanged (empty when the
/// envelope carries none; callers validate presence before decoding).
pub fn decode(envelope: &ResponseEnvelope) -> Submission {
    let mut submission = Submission {
        user_id: envelope.user_id.clone().unwrap_or_default(),
        timestamp: envelope.timestamp.clone().unwrap_or_default(),
        first_name: String::new(),
        last_name: String::new(),
        value_in: String::new(),
        value_out: String::new(),
        ice_break: String::new(),
        linkedin_url: String::new(),
    };

    for (question, field) in QUESTION_FIELDS {
        let answer = answer_for(&envelope.responses, question)
            .unwrap_or_default()
            .to_string();
        let slot = match field {
            SubmissionField::FirstName => &mut submission.first_name,
            SubmissionField::LastName => &mut submission.last_name,
            SubmissionField::LinkedinUrl => &mut submission.linkedin_url,
            SubmissionField::ValueIn => &mut submission.value_in,
            SubmissionField::ValueOut => &mut submission.value_out,
            SubmissionField::IceBreak => &mut submission.ice_break,
        };
        *slot = answer;
    }

    submission
}
