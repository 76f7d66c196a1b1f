use std::time::Duration;

use async_trait::async_trait;
use redgreenblue_plugin_api::{PluginCapabilities, PluginResult, RewritePlugin, RewriteRequest};

const DEFAULT_DELAY: Duration = Duration::from_secs(2);
const EMPTY_RESPONSE: &str = "No text to process.";

/// Builtin plugin that simulates an AI backend with canned rewrites.
///
/// Responses depend on a rough classification of the submitted text, so demo
/// documents (shopping lists, emails, meeting notes) produce believable diffs.
#[derive(Debug, Clone)]
pub struct MockRewriter {
    delay: Duration,
}

impl MockRewriter {
    /// Construct a rewriter with the default simulated latency.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_delay(DEFAULT_DELAY)
    }

    /// Construct a rewriter that answers after `delay`.
    #[must_use]
    pub const fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockRewriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RewritePlugin for MockRewriter {
    fn id(&self) -> &'static str {
        "mock"
    }

    fn label(&self) -> &'static str {
        "Simulated AI"
    }

    fn capabilities(&self) -> PluginCapabilities {
        PluginCapabilities::new(true, false)
    }

    async fn rewrite(&self, request: RewriteRequest) -> PluginResult<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(mock_response(&request.text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    Shopping,
    Email,
    Meeting,
    General,
}

fn mock_response(text: &str) -> String {
    if text.trim().is_empty() {
        return EMPTY_RESPONSE.to_string();
    }

    let lower = text.to_lowercase();
    if is_email_demo(&lower) {
        return email_response(text);
    }
    if is_shopping_demo(&lower) {
        return shopping_response(text);
    }
    if is_meeting_demo(&lower) {
        return meeting_response(text);
    }

    match detect_kind(text) {
        ContentKind::Shopping => shopping_response(text),
        ContentKind::Email => email_response(text),
        ContentKind::Meeting => meeting_response(text),
        ContentKind::General => general_response(text),
    }
}

fn is_email_demo(lower: &str) -> bool {
    lower.contains("sarah") && lower.contains("project") && lower.contains("professional")
}

fn is_shopping_demo(lower: &str) -> bool {
    lower.contains("milk") && lower.contains("banana") && lower.contains("organize")
}

fn is_meeting_demo(lower: &str) -> bool {
    lower.contains("meeting is scheduled") && lower.contains("formal")
}

fn detect_kind(text: &str) -> ContentKind {
    let lower = text.to_lowercase();
    let contains_any = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

    if contains_any(&["buy", "get", "store", "milk", "eggs", "bread"]) || has_list_marker(text) {
        ContentKind::Shopping
    } else if contains_any(&["email", "message", "send", "dear", "hi ", "hello"]) {
        ContentKind::Email
    } else if contains_any(&["meeting", "agenda", "action items", "discussed", "attendees"]) {
        ContentKind::Meeting
    } else {
        ContentKind::General
    }
}

fn has_list_marker(text: &str) -> bool {
    text.lines().any(|line| {
        let mut chars = line.trim_start().chars();
        matches!(chars.next(), Some('-' | '•' | '*'))
            && chars.next().is_some_and(char::is_whitespace)
    })
}

fn shopping_response(text: &str) -> String {
    if is_shopping_demo(&text.to_lowercase()) {
        return "## Dairy\n- [ ] milk\n\n## Produce\n- [ ] bananas".to_string();
    }

    [
        "# Shopping List",
        "",
        "## Groceries",
        "- Organic milk (1 gallon)",
        "- Free-range eggs (dozen)",
        "- Whole grain bread",
        "- Fresh vegetables (carrots, lettuce)",
        "",
        "## Household",
        "- Paper towels",
        "- Dish soap",
        "",
        "## Total Items: 6",
    ]
    .join("\n")
}

fn email_response(text: &str) -> String {
    if is_email_demo(&text.to_lowercase()) {
        return [
            "Dear Sarah,",
            "",
            "I hope this message finds you well.",
            "I wanted to reach out about the project deadline.",
            "Due to some technical challenges we've encountered, we may need to extend the deadline by a few days to ensure quality delivery.",
            "Please let me know your availability to discuss this further.",
            "",
            "Best regards,",
            "[Your name]",
        ]
        .join("\n");
    }

    let opening = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("I would like to follow up on our conversation");

    format!(
        "Dear [Recipient],\n\n\
         I hope this message finds you well. I wanted to reach out regarding the matter we discussed previously.\n\n\
         {opening}\n\n\
         I look forward to hearing your thoughts on this.\n\n\
         Best regards,\n\
         [Your Name]"
    )
}

fn meeting_response(text: &str) -> String {
    if is_meeting_demo(&text.to_lowercase()) {
        return [
            "The meeting is scheduled for tomorrow.",
            "Please bring your notes and laptop.",
            "We'll discuss the quarterly goals.",
            "Looking forward to the discussion.",
            "",
            "Best regards,",
            "Sarah",
        ]
        .join("\n");
    }

    let first_topic = text
        .lines()
        .next()
        .filter(|line| !line.is_empty())
        .unwrap_or("Main topics covered");

    format!(
        "# Meeting Summary\n\n\
         **Attendees:** Team members\n\n\
         ## Key Discussion Points\n\
         - {first_topic}\n\
         - Progress updates from each team member\n\
         - Upcoming milestones and deadlines\n\n\
         ## Action Items\n\
         1. Review documentation by end of week\n\
         2. Schedule follow-up meeting\n\
         3. Share updates with stakeholders\n\n\
         ## Next Steps\n\
         Follow up on action items by next meeting."
    )
}

fn general_response(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(polish_sentence)
        .collect::<Vec<_>>()
        .join(" ")
}

fn polish_sentence(line: &str) -> String {
    let mut chars = line.chars();
    let mut sentence = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    if !sentence.ends_with(['.', '!', '?']) {
        sentence.push('.');
    }
    sentence
}
