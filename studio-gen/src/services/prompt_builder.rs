//! Transcript and summary prompt assembly
//!
//! Pure functions: no I/O, no clock, no randomness. The same session and
//! messages always produce byte-identical output.

use crate::models::{Message, SessionDescriptor};

/// Separator between transcript turns
const TURN_SEPARATOR: &str = "\n\n";

/// Render messages as `Host: ...` / `Guest: ...` turns in chronological order
///
/// Messages are ordered by `timestamp`; equal timestamps keep their input order.
pub fn build_transcript(messages: &[Message]) -> String {
    let mut ordered: Vec<&Message> = messages.iter().collect();
    ordered.sort_by_key(|m| m.timestamp);

    ordered
        .iter()
        .map(|m| format!("{}: {}", m.speaker().label(), m.text))
        .collect::<Vec<_>>()
        .join(TURN_SEPARATOR)
}

/// Build the summary request prompt for a session
pub fn build_summary_prompt(descriptor: &SessionDescriptor, messages: &[Message]) -> String {
    let transcript = build_transcript(messages);

    format!(
        "Please analyze this podcast interview transcript and provide a comprehensive summary.

**Interview Details:**
- Host Style: {host_style}
- Interview Mode: {mode}
- Duration: {duration} minutes

**Transcript:**
{transcript}

**Please provide:**

1. **Executive Summary** (2-3 sentences): The main theme and purpose of the conversation

2. **Key Topics Discussed** (bullet points): 3-5 major topics that were covered

3. **Notable Quotes** (if any): 1-2 memorable or insightful quotes from the conversation

4. **Insights & Takeaways** (bullet points): 2-3 key insights or lessons from the discussion

5. **Emotional Tone**: Brief description of the overall mood and energy of the conversation

Format the summary in a clear, well-structured way using markdown.
",
        host_style = descriptor.host_style,
        mode = descriptor.mode,
        duration = descriptor.duration_minutes,
        transcript = transcript,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn descriptor() -> SessionDescriptor {
        SessionDescriptor {
            host_style: "curious".to_string(),
            mode: "interview".to_string(),
            duration_minutes: 25,
        }
    }

    fn messages() -> Vec<Message> {
        let session_id = Uuid::new_v4();
        vec![
            Message::new(session_id, "user", "I build boats.", 200),
            Message::new(session_id, "ai", "What do you do?", 100),
            Message::new(session_id, "moderator", "Time check.", 300),
        ]
    }

    #[test]
    fn test_transcript_order_and_labels() {
        assert_eq!(
            build_transcript(&messages()),
            "Host: What do you do?\n\nGuest: I build boats.\n\nGuest: Time check."
        );
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let session_id = Uuid::new_v4();
        let input = vec![
            Message::new(session_id, "ai", "first", 5),
            Message::new(session_id, "user", "second", 5),
        ];
        assert_eq!(build_transcript(&input), "Host: first\n\nGuest: second");
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let messages = messages();
        let a = build_summary_prompt(&descriptor(), &messages);
        let b = build_summary_prompt(&descriptor(), &messages);
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_contains_descriptor_and_sections() {
        let prompt = build_summary_prompt(&descriptor(), &messages());
        assert!(prompt.starts_with("Please analyze this podcast interview transcript"));
        assert!(prompt.contains("- Host Style: curious\n"));
        assert!(prompt.contains("- Interview Mode: interview\n"));
        assert!(prompt.contains("- Duration: 25 minutes\n"));
        assert!(prompt.contains("**Transcript:**\nHost: What do you do?"));
        assert!(prompt.contains("5. **Emotional Tone**"));
    }

    #[test]
    fn test_empty_transcript() {
        assert_eq!(build_transcript(&[]), "");
    }
}
