use astroguide_rpc::{MessageRole, TaskSnapshot};

/// One rendered transcript bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: MessageRole,
    pub text: String,
}

/// Merges the stored histories of several tasks (oldest first) into one
/// deduplicated, role-alternating transcript.
///
/// Later tasks replay earlier turns, so each incoming message is checked
/// against the most recent entry of its role: identical user text and
/// duplicate or already-contained agent text are dropped. A surviving
/// message either continues the current same-role bubble (user text joins
/// with a newline, agent supersets replace, anything else appends) or
/// opens a new entry on a role transition. Deterministic: re-running over
/// the same task list yields the same transcript.
pub fn merge_task_histories(tasks: &[TaskSnapshot]) -> Vec<TranscriptEntry> {
    let mut transcript: Vec<TranscriptEntry> = Vec::new();
    for task in tasks {
        let Some(history) = task.history.as_ref() else {
            continue;
        };
        for message in history {
            let text = message.text_content();
            if text.is_empty() {
                continue;
            }
            merge_message(&mut transcript, message.role, &text);
        }
    }
    transcript
}

fn merge_message(transcript: &mut Vec<TranscriptEntry>, role: MessageRole, text: &str) {
    if is_replay(transcript, role, text) {
        return;
    }

    if transcript.last().map(|entry| entry.role) != Some(role) {
        transcript.push(TranscriptEntry {
            role,
            text: text.to_string(),
        });
        return;
    }

    if let Some(last) = transcript.last_mut() {
        match role {
            MessageRole::User => {
                last.text.push('\n');
                last.text.push_str(text);
            }
            MessageRole::Agent => {
                if text.contains(last.text.as_str()) {
                    // Superseding accumulation stored alongside its partials.
                    last.text = text.to_string();
                } else {
                    last.text.push_str(text);
                }
            }
        }
    }
}

/// True when the message duplicates content already emitted for its role.
fn is_replay(transcript: &[TranscriptEntry], role: MessageRole, text: &str) -> bool {
    let Some(previous) = transcript.iter().rev().find(|entry| entry.role == role) else {
        return false;
    };
    match role {
        // Server-side echo of an earlier user turn; joined bubbles are
        // matched line-wise so continuations replay cleanly too.
        MessageRole::User => {
            previous.text == text || previous.text.split('\n').any(|line| line == text)
        }
        MessageRole::Agent => previous.text == text || previous.text.contains(text),
    }
}

#[cfg(test)]
mod tests {
    use astroguide_rpc::{MessageRole, TaskSnapshot};
    use serde_json::json;

    use super::{merge_task_histories, TranscriptEntry};

    fn task(id: &str, history: serde_json::Value) -> TaskSnapshot {
        serde_json::from_value(json!({
            "id": id,
            "contextId": "ctx-1",
            "status": {"state": "completed"},
            "history": history,
        }))
        .expect("task fixture")
    }

    fn message(role: &str, text: &str) -> serde_json::Value {
        json!({"role": role, "parts": [{"kind": "text", "text": text}], "kind": "message"})
    }

    fn entry(role: MessageRole, text: &str) -> TranscriptEntry {
        TranscriptEntry {
            role,
            text: text.to_string(),
        }
    }

    #[test]
    fn functional_overlapping_task_histories_merge_without_duplicates() {
        let tasks = vec![
            task("task-1", json!([message("user", "Hi"), message("agent", "Hello!")])),
            task(
                "task-2",
                json!([
                    message("user", "Hi"),
                    message("agent", "Hello!"),
                    message("user", "Tell me more"),
                ]),
            ),
        ];

        let transcript = merge_task_histories(&tasks);
        assert_eq!(
            transcript,
            vec![
                entry(MessageRole::User, "Hi"),
                entry(MessageRole::Agent, "Hello!"),
                entry(MessageRole::User, "Tell me more"),
            ]
        );
    }

    #[test]
    fn consecutive_user_messages_with_new_text_join_the_same_bubble() {
        let tasks = vec![task(
            "task-1",
            json!([message("user", "What is that?"), message("user", "The bright one.")]),
        )];
        let transcript = merge_task_histories(&tasks);
        assert_eq!(
            transcript,
            vec![entry(MessageRole::User, "What is that?\nThe bright one.")]
        );
    }

    #[test]
    fn joined_user_bubble_replays_are_still_deduplicated() {
        let tasks = vec![
            task(
                "task-1",
                json!([
                    message("user", "What is that?"),
                    message("user", "The bright one."),
                    message("agent", "That is Vega."),
                ]),
            ),
            task(
                "task-2",
                json!([
                    message("user", "What is that?"),
                    message("user", "The bright one."),
                    message("agent", "That is Vega."),
                    message("user", "Thanks"),
                ]),
            ),
        ];
        let transcript = merge_task_histories(&tasks);
        assert_eq!(
            transcript,
            vec![
                entry(MessageRole::User, "What is that?\nThe bright one."),
                entry(MessageRole::Agent, "That is Vega."),
                entry(MessageRole::User, "Thanks"),
            ]
        );
    }

    #[test]
    fn agent_superset_replaces_the_partial_it_supersedes() {
        let tasks = vec![task(
            "task-1",
            json!([
                message("user", "Describe it"),
                message("agent", "Vega is a bright"),
                message("agent", "Vega is a bright A-type star."),
            ]),
        )];
        let transcript = merge_task_histories(&tasks);
        assert_eq!(transcript[1], entry(MessageRole::Agent, "Vega is a bright A-type star."));
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn agent_subset_of_emitted_text_is_skipped() {
        let tasks = vec![task(
            "task-1",
            json!([
                message("agent", "The sky is clear tonight."),
                message("agent", "sky is clear"),
            ]),
        )];
        let transcript = merge_task_histories(&tasks);
        assert_eq!(
            transcript,
            vec![entry(MessageRole::Agent, "The sky is clear tonight.")]
        );
    }

    #[test]
    fn unrelated_consecutive_agent_text_appends_to_the_bubble() {
        let tasks = vec![task(
            "task-1",
            json!([
                message("agent", "Slewing the mount. "),
                message("agent", "Plate solve complete."),
            ]),
        )];
        let transcript = merge_task_histories(&tasks);
        assert_eq!(
            transcript,
            vec![entry(
                MessageRole::Agent,
                "Slewing the mount. Plate solve complete."
            )]
        );
    }

    #[test]
    fn unit_tasks_without_history_and_empty_messages_contribute_nothing() {
        let tasks = vec![
            serde_json::from_value::<TaskSnapshot>(json!({
                "id": "task-0",
                "status": {"state": "completed"},
            }))
            .expect("task fixture"),
            task(
                "task-1",
                json!([
                    json!({"role": "user", "parts": [], "kind": "message"}),
                    message("user", "Hi"),
                ]),
            ),
        ];
        let transcript = merge_task_histories(&tasks);
        assert_eq!(transcript, vec![entry(MessageRole::User, "Hi")]);
    }

    #[test]
    fn regression_merge_is_idempotent_across_reruns() {
        let tasks = vec![
            task("task-1", json!([message("user", "Hi"), message("agent", "Hello!")])),
            task(
                "task-2",
                json!([
                    message("user", "Hi"),
                    message("agent", "Hello!"),
                    message("user", "Tell me more"),
                    message("agent", "Gladly."),
                ]),
            ),
        ];
        let first = merge_task_histories(&tasks);
        let second = merge_task_histories(&tasks);
        assert_eq!(first, second);
    }
}
