//! Normalization of task snapshots returned by `GET /v3/tasks/{id}`.
//!
//! Result payloads differ per task type: videos carry `video_url`, images
//! `image_url`, music nests `audio_url` inside `items`, and some tasks only
//! report a generic `output_url`. [`normalize`] folds all of these into one
//! [`NormalizedTask`].

use std::fmt;

use serde_json::Value;

/// Marker shown when a cost field is missing.
pub const UNKNOWN_COST: &str = "N/A";

/// Lifecycle state of a remote task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Queued,
    Executing,
    Completed,
    Failed,
    /// Any state this client does not know about, kept verbatim.
    Other(String),
}

impl TaskStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => TaskStatus::Pending,
            "queued" => TaskStatus::Queued,
            "executing" => TaskStatus::Executing,
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            other => TaskStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Queued => "queued",
            TaskStatus::Executing => "executing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Other(s) => s,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            TaskStatus::Pending | TaskStatus::Queued | TaskStatus::Executing
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Image,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Audio => "Audio URL",
            MediaKind::Video => "Video URL",
            MediaKind::Image => "Image URL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUrl {
    pub kind: MediaKind,
    pub url: String,
}

/// Uniform view of a task snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTask {
    pub task_id: String,
    pub task_type: String,
    pub status: TaskStatus,
    /// Display form of `estimated_cost`; `None` when absent.
    pub estimated_cost: Option<String>,
    /// Display form of `actual_cost`; `None` when absent or unknown.
    pub actual_cost: Option<String>,
    pub error_message: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

/// Normalize a raw task response. Missing fields never fail: a completed
/// task without any media URL simply has none.
pub fn normalize(task_id: &str, raw: &Value) -> NormalizedTask {
    let result = raw.get("result").filter(|r| r.is_object());

    let output_url = result.and_then(|r| str_field(r, "output_url"));
    let video_url = result
        .and_then(|r| str_field(r, "video_url"))
        .or_else(|| output_url.clone());
    let mut image_url = result
        .and_then(|r| str_field(r, "image_url"))
        .or_else(|| output_url.clone());

    // Only the first item is consulted.
    let first_item = result
        .and_then(|r| r.get("items"))
        .and_then(Value::as_array)
        .and_then(|items| items.first());
    let audio_url = first_item.and_then(|item| str_field(item, "audio_url"));
    if image_url.is_none() {
        image_url = first_item.and_then(|item| str_field(item, "image_url"));
    }

    NormalizedTask {
        task_id: task_id.to_string(),
        task_type: str_field(raw, "type").unwrap_or_else(|| "unknown".to_string()),
        status: TaskStatus::parse(
            raw.get("status").and_then(Value::as_str).unwrap_or("unknown"),
        ),
        estimated_cost: raw.get("estimated_cost").and_then(scalar_text),
        actual_cost: raw
            .get("actual_cost")
            .and_then(scalar_text)
            .filter(|c| c != UNKNOWN_COST && !c.eq_ignore_ascii_case("unknown")),
        error_message: str_field(raw, "error_message"),
        video_url,
        image_url,
        audio_url,
    }
}

impl NormalizedTask {
    /// The single media URL worth showing: audio, then video, then image.
    pub fn primary_media(&self) -> Option<MediaUrl> {
        [
            (MediaKind::Audio, &self.audio_url),
            (MediaKind::Video, &self.video_url),
            (MediaKind::Image, &self.image_url),
        ]
        .into_iter()
        .find_map(|(kind, url)| {
            url.as_ref().map(|url| MediaUrl {
                kind,
                url: url.clone(),
            })
        })
    }

    /// Multi-line, human-readable status report.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Task: {}", self.task_id),
            format!("Type: {}", self.task_type),
            format!("Status: {}", self.status),
            format!(
                "Estimated Cost: ${}",
                self.estimated_cost.as_deref().unwrap_or(UNKNOWN_COST)
            ),
        ];

        if let Some(actual) = &self.actual_cost {
            lines.push(format!("Actual Cost: ${}", actual));
        }

        match &self.status {
            TaskStatus::Completed => {
                if let Some(media) = self.primary_media() {
                    lines.push(format!("\n{}: {}", media.kind.label(), media.url));
                }
            }
            TaskStatus::Failed => {
                if let Some(msg) = &self.error_message {
                    lines.push(format!("\nError: {}", msg));
                }
            }
            status if status.is_in_progress() => {
                lines.push(format!(
                    "\nTask is still {}. Check again shortly.",
                    status
                ));
            }
            _ => {}
        }

        lines.join("\n")
    }
}

/// Non-empty string field.
fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Strings verbatim, numbers in JSON form; null and empty are absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_music_task_uses_audio_from_first_item() {
        let raw = json!({
            "status": "completed",
            "type": "music",
            "estimated_cost": 0.68,
            "result": {"items": [{"audio_url": "u1"}, {"audio_url": "u2"}]}
        });
        let task = normalize("t-1", &raw);
        assert_eq!(task.audio_url.as_deref(), Some("u1"));

        let summary = task.summary();
        assert!(summary.contains("Audio URL: u1"));
        assert!(!summary.contains("u2"));
        assert!(!summary.contains("Video URL"));
        assert!(!summary.contains("Image URL"));
    }

    #[test]
    fn test_video_url_preferred_over_output_url() {
        let raw = json!({
            "status": "completed",
            "result": {"video_url": "v.mp4", "output_url": "o.bin"}
        });
        let task = normalize("t", &raw);
        assert_eq!(task.video_url.as_deref(), Some("v.mp4"));
        assert_eq!(task.image_url.as_deref(), Some("o.bin"));
        assert_eq!(
            task.primary_media(),
            Some(MediaUrl {
                kind: MediaKind::Video,
                url: "v.mp4".into()
            })
        );
    }

    #[test]
    fn test_image_from_items_when_no_top_level_image() {
        let raw = json!({
            "status": "completed",
            "type": "image",
            "result": {"items": [{"image_url": "i.png"}]}
        });
        let task = normalize("t", &raw);
        assert_eq!(task.image_url.as_deref(), Some("i.png"));
        assert!(task.summary().contains("Image URL: i.png"));
    }

    #[test]
    fn test_audio_wins_when_several_present() {
        let raw = json!({
            "status": "completed",
            "result": {
                "video_url": "v.mp4",
                "image_url": "i.png",
                "items": [{"audio_url": "a.mp3"}]
            }
        });
        let media = normalize("t", &raw).primary_media().unwrap();
        assert_eq!(media.kind, MediaKind::Audio);
        assert_eq!(media.url, "a.mp3");
    }

    #[test]
    fn test_completed_without_media_is_not_an_error() {
        let raw = json!({"status": "completed", "result": null});
        let task = normalize("t", &raw);
        assert!(task.primary_media().is_none());
        let summary = task.summary();
        assert!(summary.contains("Status: completed"));
        assert!(!summary.contains("URL"));
    }

    #[test]
    fn test_failed_surfaces_error_message() {
        let raw = json!({"status": "failed", "error_message": "content policy"});
        assert!(normalize("t", &raw).summary().contains("Error: content policy"));
    }

    #[test]
    fn test_in_progress_advisory_has_no_urls() {
        for status in ["pending", "queued", "executing"] {
            let raw = json!({"status": status, "result": {"video_url": "v.mp4"}});
            let summary = normalize("t", &raw).summary();
            assert!(summary.contains(&format!("Task is still {status}")));
            assert!(!summary.contains("v.mp4"));
        }
    }

    #[test]
    fn test_cost_fields() {
        let raw = json!({"status": "completed", "estimated_cost": 4.8, "actual_cost": "N/A"});
        let task = normalize("t", &raw);
        assert_eq!(task.estimated_cost.as_deref(), Some("4.8"));
        assert!(task.actual_cost.is_none());
        assert!(!task.summary().contains("Actual Cost"));

        let raw = json!({"status": "completed", "actual_cost": 2.4});
        let task = normalize("t", &raw);
        let summary = task.summary();
        assert!(summary.contains("Estimated Cost: $N/A"));
        assert!(summary.contains("Actual Cost: $2.4"));
    }

    #[test]
    fn test_missing_fields_default_to_unknown() {
        let task = normalize("abc", &json!({}));
        assert_eq!(task.task_type, "unknown");
        assert_eq!(task.status, TaskStatus::Other("unknown".into()));
        assert!(task.summary().starts_with("Task: abc\nType: unknown\nStatus: unknown"));
    }
}
