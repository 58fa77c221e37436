//! Layered prompt assembly.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use kfa_models::VideoContext;

use crate::template::TemplateStore;

/// Fixed system instruction: analysis persona and document requirements.
pub const SYSTEM_PROMPT: &str = r#"You are a professional video content analyst who produces well-structured, visually polished analysis documents.

## Core Task
You must actually watch and analyze the content of the video, including:
- People, objects, scenes, and on-screen text
- Events, actions, and dialogue
- Software interfaces, code, and interaction flows in screen recordings
- Any other visible information and context

## Document Style Requirements
1. Structured headings:
   - Every H2 heading must start with an emoji (for example: 📋 Overview, 🎯 Goals, 📊 Analysis, 🔍 Findings, ⏱️ Timeline, ✅ Summary).
   - Use a clear heading hierarchy (H1 through H4).

2. Required visual diagrams (Mermaid):
   - The main analysis document must contain at least two Mermaid diagrams.
   - Pick diagram types that fit the content: graph TB/LR for structure, sequenceDiagram for interactions, timeline for event sequences, mindmap for concepts, flowchart for decisions.
   - Every code fence (including mermaid) must be properly closed with triple backticks.

3. Tables where they help:
   - Use Markdown tables for comparisons, classifications, lists, and statistics.

4. Code snippets where they help:
   - If the video involves programming, include relevant commented snippets; otherwise omit this section.

5. Closing summary:
   - End the document with a summary or recommendations grounded in the video content.

## Analysis Principles
1. Stay faithful to the content; never invent events that did not occur.
2. Go beyond description: explain meaning, intent, and value.
3. Annotate important events with their approximate time in the video.
4. Use the terminology of the video's domain (technical, business, educational)."#;

/// Fixed output contract: the literal JSON shape the model must emit.
pub const OUTPUT_FORMAT_PROMPT: &str = r#"Respond with the analysis strictly in the following JSON format:
{
    "videoAnalysisMarkdown": "Complete analysis document based on the actual video content. Must contain emoji headings and at least two Mermaid diagrams; use tables and code as needed.",
    "audioAnalysisMarkdown": "Description of dialogue or speech in the audio track (if any)",
    "summaryMarkdown": "One-sentence core summary of the video (for list display, at least 10 characters)",
    "keyFindings": [
        {
            "sequenceOrder": 0,
            "category": "technical|action|visual",
            "title": "Finding title",
            "content": "Concise description grounded in the video content",
            "confidenceScore": 90,
            "relatedTimestamps": [0.0]
        }
    ],
    "timestampEvents": [
        {
            "timestampSeconds": 0.0,
            "eventType": "technical|action|visual|highlight",
            "title": "Short event title",
            "description": "Event description",
            "importanceScore": 8
        }
    ],
    "analysisMetadata": [
        {"key": "content_type", "value": "type of video content", "dataType": "string"}
    ]
}"#;

/// Separator between prompt layers.
const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Builds the outbound prompt from fixed and per-request layers.
///
/// Assembly order never changes: system instruction, category task
/// template, video context, output contract. The only I/O is the
/// template lookup; a missing or failing store drops that layer and the
/// rest of the prompt is unaffected.
pub struct PromptAssembler {
    templates: Option<Arc<dyn TemplateStore>>,
}

impl PromptAssembler {
    /// Create an assembler with a template store.
    pub fn new(templates: Arc<dyn TemplateStore>) -> Self {
        Self {
            templates: Some(templates),
        }
    }

    /// Create an assembler without a template store; the task layer is
    /// always omitted.
    pub fn without_templates() -> Self {
        Self { templates: None }
    }

    /// Build the full prompt for one analysis request.
    pub async fn build(
        &self,
        category: &str,
        context: Option<&VideoContext>,
        variables: &HashMap<String, String>,
    ) -> String {
        let mut parts: Vec<String> = vec![SYSTEM_PROMPT.to_string()];

        if let Some(store) = &self.templates {
            match store.default_for_category(category).await {
                Ok(Some(template)) => {
                    let task = template.render(variables);
                    parts.push(format!("**Analysis task:**\n{task}"));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Template lookup failed for category '{}': {}", category, e);
                }
            }
        }

        if let Some(ctx) = context {
            if !ctx.is_empty() {
                parts.push(render_context(ctx));
            }
        }

        parts.push(OUTPUT_FORMAT_PROMPT.to_string());

        parts.join(SECTION_SEPARATOR)
    }
}

/// Render only the facts present in the context; absent facts are
/// omitted, not zero-filled.
fn render_context(ctx: &VideoContext) -> String {
    let mut lines = vec!["**Video information:**".to_string()];

    if let Some(duration) = ctx.duration_seconds {
        lines.push(format!("- Duration: {duration:.1} seconds"));
    }
    if let Some(count) = ctx.keyframe_count {
        lines.push(format!("- Keyframe count: {count}"));
    }
    if let Some(mb) = ctx.file_size_mb() {
        lines.push(format!("- File size: {mb:.2} MB"));
    }
    if let (Some(w), Some(h)) = (ctx.width, ctx.height) {
        lines.push(format!("- Resolution: {w}x{h}"));
    }

    lines.join("\n")
}
