// Task domain types
//
// Tasks are long-running media jobs (rendering, audio generation) whose
// status is driven by external workers and streamed to the project owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::record::EventRecord;

/// Kind of media job a task represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Render the final project video.
    RenderVideo,
    /// Generate a voice-over or soundtrack.
    GeneratingAudio,
    /// Build a slideshow video from project images.
    CreateSlideshow,
}

impl TaskKind {
    /// Title used when describing the task to a user.
    pub fn title(&self) -> &'static str {
        match self {
            TaskKind::RenderVideo => "Render video",
            TaskKind::GeneratingAudio => "Generating audio",
            TaskKind::CreateSlideshow => "Create slideshow",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::RenderVideo => "render_video",
            TaskKind::GeneratingAudio => "generating_audio",
            TaskKind::CreateSlideshow => "create_slideshow",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "render_video" => Ok(TaskKind::RenderVideo),
            "generating_audio" => Ok(TaskKind::GeneratingAudio),
            "create_slideshow" => Ok(TaskKind::CreateSlideshow),
            other => Err(format!("unknown task kind: {other}")),
        }
    }
}

/// Task execution status.
/// - `pending`: queued, not picked up by a worker yet
/// - `running`: a worker is processing the task
/// - `finished`: completed successfully
/// - `error`: the worker reported a failure
/// - `canceled`: stopped before completion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Finished,
    Error,
    Canceled,
}

impl TaskStatus {
    /// Statuses replayed to a client that connects without a resume cursor.
    pub const ACTIVE: [TaskStatus; 2] = [TaskStatus::Pending, TaskStatus::Running];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Finished => "finished",
            TaskStatus::Error => "error",
            TaskStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Finished | TaskStatus::Error | TaskStatus::Canceled
        )
    }

    /// Phrase appended to the task title in status-change notifications.
    pub fn change_phrase(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "is pending",
            TaskStatus::Running => "is now in progress",
            TaskStatus::Finished => "completed successfully",
            TaskStatus::Error => "failed",
            TaskStatus::Canceled => "was cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "finished" => Ok(TaskStatus::Finished),
            "error" => Ok(TaskStatus::Error),
            "canceled" => Ok(TaskStatus::Canceled),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Task - a media job owned by the user of its project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Task {
    /// Unique identifier for the task.
    pub id: Uuid,
    /// User who receives updates for this task.
    pub owner_id: Uuid,
    /// Project the task belongs to.
    pub project_id: Uuid,
    /// What the task does.
    pub kind: TaskKind,
    /// Current execution status.
    pub status: TaskStatus,
    /// Progress percentage (0-100).
    pub progress: i32,
    /// Error message reported by the worker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Worker input parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Worker output (e.g. storage key of the rendered video).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// User-facing message describing the task's current status,
    /// e.g. "Render video completed successfully".
    pub fn status_message(&self) -> String {
        format!("{} {}", self.kind.title(), self.status.change_phrase())
    }
}

impl EventRecord for Task {
    const KIND: &'static str = "Task";

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
