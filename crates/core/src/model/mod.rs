mod availability;
mod block;
mod difficulty;
mod ids;
mod request;
mod session;
mod settings;
mod stored;

pub use availability::{BlockAvailability, QuestionAvailability};
pub use block::{BlockProgress, BlockProgressError};
pub use difficulty::{Difficulty, DifficultyParseError, PerDifficulty};
pub use ids::{BlockId, IdError, LessonTemplateId, QuestionId};
pub use request::{QuestionRequest, QuestionRequestError};
pub use session::{SessionStage, SessionState, SessionStateError};
pub use settings::{PracticeSettings, PracticeSettingsDraft, SettingsError};
pub use stored::{DifficultyMode, SessionStatus, StoredBlockProgress, StoredSession};
