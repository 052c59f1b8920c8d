pub mod achievement;
pub mod completion;
pub mod settings;
pub mod workout;

pub use achievement::{Badge, BadgeType, WeeklyGoal};
pub use completion::{CompletionEvent, ExerciseCompletion, ExerciseEventDetail, WorkoutCompletion};
pub use settings::{AppSettings, StepData};
pub use workout::{Exercise, ExerciseType, NewExercise, Workout};

/// Generate a fresh record id
pub fn new_id() -> String {
  uuid::Uuid::new_v4().to_string()
}
