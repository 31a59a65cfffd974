//! Export assembly
//!
//! Pure functions turning a session into a shareable document. Missing
//! artifacts are omitted, never an error; stored gherkin is reproduced
//! verbatim and pending scenarios appear as bare title placeholders.

use crate::domain::ArtifactKind;
use crate::session::Session;

/// Output formats for the assembled export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Confluence-style wiki markup
    WikiMarkup,
    Markdown,
    /// Standalone HTML page
    HtmlReport,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "wiki" | "confluence" => Some(ExportFormat::WikiMarkup),
            "markdown" | "md" => Some(ExportFormat::Markdown),
            "html" => Some(ExportFormat::HtmlReport),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::WikiMarkup => "wiki",
            ExportFormat::Markdown => "md",
            ExportFormat::HtmlReport => "html",
        }
    }
}

/// Assemble the export document for a session
pub fn assemble(format: ExportFormat, session: &Session) -> String {
    let sections = collect_sections(session);
    match format {
        ExportFormat::Markdown => render_markdown(session, &sections),
        ExportFormat::WikiMarkup => render_wiki(session, &sections),
        ExportFormat::HtmlReport => render_html(session, &sections),
    }
}

/// Assemble the Gherkin feature file: feature header, description, then
/// every scenario in creation order
///
/// Stored gherkin blocks are embedded byte for byte, never re-indented.
/// Scenarios without stored gherkin contribute a bare `Scenario: <title>`
/// line so the file always lists the full intended coverage.
pub fn feature_file(session: &Session) -> String {
    let mut out = format!("Feature: {}\n", session.original_story.title);
    for line in session.working_text().lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    for scenario in &session.scenarios {
        out.push('\n');
        match scenario.gherkin.as_deref() {
            Some(gherkin) => {
                out.push_str(gherkin);
                if !gherkin.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => {
                out.push_str(&format!("Scenario: {}\n", scenario.title));
            }
        }
    }
    out
}

struct Section {
    heading: &'static str,
    body: String,
    /// Rendered inside a code/preformatted block
    preformatted: bool,
}

fn collect_sections(session: &Session) -> Vec<Section> {
    let mut sections = vec![Section {
        heading: "História",
        body: session.working_text().to_string(),
        preformatted: false,
    }];

    if let Some(analysis) = &session.complexity {
        sections.push(Section {
            heading: "Complexidade",
            body: format!("{}\n\n{}", analysis.complexity, analysis.justification),
            preformatted: false,
        });
    }

    if !session.conversation.is_empty() {
        sections.push(Section {
            heading: "Conversa de Refinamento",
            body: session.conversation.render_transcript(),
            preformatted: true,
        });
    }

    if !session.scenarios.is_empty() {
        sections.push(Section {
            heading: "Cenários",
            body: feature_file(session),
            preformatted: true,
        });
    }

    for (kind, heading) in [
        (ArtifactKind::TestScenarios, "Cenários de Teste"),
        (ArtifactKind::Checklist, "Checklist do PO"),
        (ArtifactKind::StepDefinitions, "Step Definitions"),
        (ArtifactKind::Prototype, "Protótipo"),
        (ArtifactKind::TranscriptAnalysis, "Análise da Transcrição"),
    ] {
        if let Some(value) = session.artifacts.value(kind) {
            sections.push(Section {
                heading,
                body: value.to_string(),
                preformatted: matches!(kind, ArtifactKind::StepDefinitions | ArtifactKind::Prototype),
            });
        }
    }

    sections
}

fn render_markdown(session: &Session, sections: &[Section]) -> String {
    let mut out = format!("# {}\n", session.original_story.title);
    for section in sections {
        out.push_str(&format!("\n## {}\n\n", section.heading));
        if section.preformatted {
            out.push_str("```\n");
            out.push_str(section.body.trim_end());
            out.push_str("\n```\n");
        } else {
            out.push_str(section.body.trim_end());
            out.push('\n');
        }
    }
    out
}

fn render_wiki(session: &Session, sections: &[Section]) -> String {
    let mut out = format!("h1. {}\n", session.original_story.title);
    for section in sections {
        out.push_str(&format!("\nh2. {}\n\n", section.heading));
        if section.preformatted {
            out.push_str("{code}\n");
            out.push_str(section.body.trim_end());
            out.push_str("\n{code}\n");
        } else {
            out.push_str(section.body.trim_end());
            out.push('\n');
        }
    }
    out
}

fn render_html(session: &Session, sections: &[Section]) -> String {
    let title = escape_html(&session.original_story.title);
    let mut out = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<h1>{}</h1>\n",
        title, title
    );
    for section in sections {
        out.push_str(&format!("<h2>{}</h2>\n", escape_html(section.heading)));
        let body = escape_html(section.body.trim_end());
        if section.preformatted {
            out.push_str(&format!("<pre>{}</pre>\n", body));
        } else {
            out.push_str(&format!("<p>{}</p>\n", body.replace('\n', "<br>\n")));
        }
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
