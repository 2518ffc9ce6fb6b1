mod actor;
mod answer;
mod assessment;
mod ids;
mod question;
pub mod result;

pub use actor::{Actor, ActorRole};
pub use answer::{Answer, AnswerSet, AnswerValue};
pub use assessment::{Assessment, AssessmentError};
pub use ids::{ActorId, AssessmentId, OptionId, ParseIdError, QuestionId, SubmissionId};
pub use question::{
    ChoiceOption, PresentedKind, PresentedOption, PresentedQuestion, Question, QuestionError,
    QuestionKind,
};
pub use result::{PayloadError, ResultPayload, SessionResult, SubmitTrigger};
